//! Package sources: fetching, unpacking and reading package files.

pub mod extract;
pub mod fetch;
pub mod gem;

pub use extract::{extract, InstallTarget};
pub use fetch::{fetch, ArtifactKind, FetchedArtifact, Fetcher, NetFetcher};
pub use gem::read_gem_spec;

//! Core data structures for insturl.
//!
//! This module contains the foundational types used throughout insturl:
//! - Source descriptors and package format detection
//! - Gem versions and package specs
//! - The restricted gemspec reader
//! - The scoped install workspace
//! - The install error type

pub mod errors;
pub mod gemspec;
pub mod source;
pub mod spec;
pub mod version;
pub mod workspace;

pub use errors::{ErrorKind, InstallError};
pub use gemspec::{read_gemspec, GemspecError};
pub use source::{detect_format, FetchMode, PackageFormat, SourceDescriptor};
pub use spec::PackageSpec;
pub use version::Version;
pub use workspace::Workspace;

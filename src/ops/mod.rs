//! High-level operations.
//!
//! This module contains the implementation of insturl commands.

pub mod guard;
pub mod insturl;
pub mod locate;

pub use guard::check_not_installed;
pub use insturl::{InstallOptions, InstallOutcome, Installer, Stage};
pub use locate::{locate_spec, LocatedSpec};

//! The duplicate-installation guard.

use crate::core::errors::InstallError;
use crate::core::spec::PackageSpec;
use crate::rubygems::InstalledSet;

/// Fail if exactly this name and version is already installed.
///
/// With `override_existing` set the registry is not consulted at all. Other
/// installed versions of the same gem never block.
pub fn check_not_installed(
    spec: &PackageSpec,
    installed: &dyn InstalledSet,
    override_existing: bool,
) -> Result<(), InstallError> {
    if override_existing {
        tracing::debug!("Skipping installed check for {}", spec);
        return Ok(());
    }

    let versions = installed
        .installed_versions(spec.name())
        .map_err(|source| InstallError::RegistryQuery {
            name: spec.name().to_string(),
            source,
        })?;
    tracing::debug!(
        "Installed versions of {}: {:?}",
        spec.name(),
        versions.iter().map(|v| v.as_str()).collect::<Vec<_>>()
    );

    if versions.iter().any(|v| v == spec.version()) {
        return Err(InstallError::AlreadyInstalled {
            name: spec.name().to_string(),
            version: spec.version().to_string(),
        });
    }

    Ok(())
}

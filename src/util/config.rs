//! Configuration file support for insturl.
//!
//! insturl reads two optional configuration files:
//! - Global: `config.toml` in the platform config directory
//!   (e.g. `~/.config/insturl/config.toml`) - user-wide defaults
//! - Project: `.insturl/config.toml` in the current directory
//!
//! Project config takes precedence over global config.
//!
//! ```toml
//! [tools]
//! gem = "/opt/ruby/bin/gem"
//!
//! [net]
//! timeout = 120
//! user_agent = "insturl"
//!
//! [install]
//! override = false
//! tmpdir = "/var/tmp"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// Default HTTP timeout for downloads.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// insturl configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// External tool locations
    pub tools: ToolsConfig,

    /// Network settings
    pub net: NetConfig,

    /// Install defaults
    pub install: InstallConfig,
}

/// External tool locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Path to the `gem` executable (None = `$GEM`, then `PATH`)
    pub gem: Option<PathBuf>,
}

/// Network-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    /// HTTP timeout in seconds
    pub timeout: Option<u64>,

    /// User-Agent header for downloads
    pub user_agent: Option<String>,
}

impl NetConfig {
    /// Effective HTTP timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Effective User-Agent header.
    pub fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("insturl/{}", env!("CARGO_PKG_VERSION")))
    }
}

/// Install defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// Install even if the same version is already installed
    #[serde(rename = "override")]
    pub override_existing: Option<bool>,

    /// Parent directory for temporary workspaces (None = system temp dir)
    pub tmpdir: Option<PathBuf>,
}

impl InstallConfig {
    /// Effective `override` setting.
    pub fn override_existing(&self) -> bool {
        self.override_existing.unwrap_or(false)
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.tools.gem.is_some() {
            self.tools.gem = other.tools.gem;
        }

        if other.net.timeout.is_some() {
            self.net.timeout = other.net.timeout;
        }
        if other.net.user_agent.is_some() {
            self.net.user_agent = other.net.user_agent;
        }

        if other.install.override_existing.is_some() {
            self.install.override_existing = other.install.override_existing;
        }
        if other.install.tmpdir.is_some() {
            self.install.tmpdir = other.install.tmpdir;
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.insturl/config.toml)
/// 2. Global config
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }

    config.merge(Config::load_or_default(project_path));

    config
}

/// Get the global config path.
pub fn global_config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "insturl", "insturl").map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Get the project config path (.insturl/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".insturl").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.tools.gem.is_none());
        assert!(!config.install.override_existing());
        assert_eq!(config.net.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert!(config.net.user_agent().starts_with("insturl/"));
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");

        std::fs::write(
            &config_path,
            r#"
[tools]
gem = "/opt/ruby/bin/gem"

[net]
timeout = 30
user_agent = "custom"

[install]
override = true
tmpdir = "/var/tmp"
"#,
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.tools.gem, Some(PathBuf::from("/opt/ruby/bin/gem")));
        assert_eq!(config.net.timeout(), Duration::from_secs(30));
        assert_eq!(config.net.user_agent(), "custom");
        assert!(config.install.override_existing());
        assert_eq!(config.install.tmpdir, Some(PathBuf::from("/var/tmp")));
    }

    #[test]
    fn test_config_invalid_falls_back() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(&config_path, "[net]\ntimeout = \"soon\"\n").unwrap();

        assert!(Config::load(&config_path).is_err());
        let config = Config::load_or_default(&config_path);
        assert!(config.net.timeout.is_none());
    }

    #[test]
    fn test_load_config_precedence() {
        let tmp = TempDir::new().unwrap();
        let global_path = tmp.path().join("global.toml");
        let project_path = tmp.path().join("project.toml");

        std::fs::write(
            &global_path,
            "[tools]\ngem = \"/usr/bin/gem\"\n\n[net]\ntimeout = 10\n",
        )
        .unwrap();
        std::fs::write(&project_path, "[net]\ntimeout = 20\n").unwrap();

        let config = load_config(Some(&global_path), &project_path);

        // Project config should override timeout
        assert_eq!(config.net.timeout, Some(20));
        // Global gem should be preserved
        assert_eq!(config.tools.gem, Some(PathBuf::from("/usr/bin/gem")));
    }

    #[test]
    fn test_project_config_turns_override_off() {
        let tmp = TempDir::new().unwrap();
        let global_path = tmp.path().join("global.toml");
        let project_path = tmp.path().join("project.toml");

        std::fs::write(&global_path, "[install]\noverride = true\n").unwrap();
        std::fs::write(&project_path, "[install]\noverride = false\n").unwrap();
        assert!(!load_config(Some(&global_path), &project_path).install.override_existing());

        std::fs::write(&project_path, "[net]\ntimeout = 5\n").unwrap();
        assert!(load_config(Some(&global_path), &project_path).install.override_existing());
    }

    #[test]
    fn test_load_config_missing_files() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(None, &tmp.path().join("missing.toml"));
        assert!(config.tools.gem.is_none());
    }
}

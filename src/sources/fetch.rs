//! Retrieval of package content into the workspace.
//!
//! A [`Fetcher`] knows how to clone a repository and how to download a
//! single file. [`fetch`] decides which of the two a package format needs
//! and where in the workspace the result lands.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use git2::build::RepoBuilder;
use git2::{Cred, CredentialType, FetchOptions, RemoteCallbacks};
use url::Url;

use crate::core::errors::InstallError;
use crate::core::source::{url_file_name, PackageFormat, SourceDescriptor};
use crate::util::config::NetConfig;
use crate::util::shell::Shell;

/// Directory name used for clones whose URL has no usable basename.
const DEFAULT_CHECKOUT_DIR: &str = "checkout";

/// File name used for downloads whose URL has no usable basename.
const DEFAULT_DOWNLOAD_FILE: &str = "download";

/// Retrieves remote content.
pub trait Fetcher {
    /// Clone the repository at `url` into `dest`, which must not exist yet.
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()>;

    /// Download the file at `url` to `dest`.
    fn download(&self, url: &str, dest: &Path) -> Result<()>;
}

/// What a fetch produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    File,
    Directory,
}

/// A fetched file or directory inside the workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedArtifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
}

/// Fetch `source` into `workspace_dir` according to its format.
pub fn fetch(
    fetcher: &dyn Fetcher,
    source: &SourceDescriptor,
    format: PackageFormat,
    workspace_dir: &Path,
) -> Result<FetchedArtifact, InstallError> {
    let url = source.url();
    let fetch_failed = |source: anyhow::Error| InstallError::FetchFailed {
        url: url.to_string(),
        source,
    };

    match format {
        PackageFormat::Git => {
            let dest = workspace_dir.join(checkout_dir_name(source));
            tracing::info!("Cloning {} into {}", url, dest.display());
            fetcher.clone_repo(url, &dest).map_err(fetch_failed)?;
            Ok(FetchedArtifact {
                kind: ArtifactKind::Directory,
                path: dest,
            })
        }
        PackageFormat::GemFile | PackageFormat::TarGz | PackageFormat::Zip => {
            let dest = workspace_dir.join(download_file_name(source));
            tracing::info!("Downloading {} to {}", url, dest.display());
            fetcher.download(url, &dest).map_err(fetch_failed)?;
            Ok(FetchedArtifact {
                kind: ArtifactKind::File,
                path: dest,
            })
        }
    }
}

fn checkout_dir_name(source: &SourceDescriptor) -> String {
    source
        .file_name()
        .map(|name| {
            PackageFormat::Git
                .strip_suffix(&name)
                .map(str::to_string)
                .unwrap_or(name)
        })
        .filter(|name| is_plain_name(name))
        .unwrap_or_else(|| DEFAULT_CHECKOUT_DIR.to_string())
}

fn download_file_name(source: &SourceDescriptor) -> String {
    source
        .file_name()
        .filter(|name| is_plain_name(name))
        .unwrap_or_else(|| DEFAULT_DOWNLOAD_FILE.to_string())
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".."
}

/// Fetcher backed by git2 and a blocking HTTP client.
pub struct NetFetcher {
    client: reqwest::blocking::Client,
    shell: Option<Arc<Shell>>,
}

impl NetFetcher {
    /// Create a fetcher using the network settings from config.
    pub fn new(net: &NetConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(net.timeout())
            .user_agent(net.user_agent())
            .build()
            .context("failed to create HTTP client")?;

        Ok(NetFetcher {
            client,
            shell: None,
        })
    }

    /// Report download progress through `shell`.
    pub fn with_shell(mut self, shell: Arc<Shell>) -> Self {
        self.shell = Some(shell);
        self
    }

    fn download_http(&self, url: &str, dest: &Path) -> Result<()> {
        let mut response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("failed to download {}", url))?;

        if !response.status().is_success() {
            bail!("HTTP {}", response.status());
        }

        let total = response.content_length().unwrap_or(0);
        let label = url_file_name(url).unwrap_or_else(|| url.to_string());
        let progress = self
            .shell
            .as_ref()
            .map(|shell| shell.bytes_progress(&label, total));

        let mut file = File::create(dest)
            .with_context(|| format!("failed to create {}", dest.display()))?;
        let mut buf = [0u8; 8192];
        loop {
            let n = response
                .read(&mut buf)
                .with_context(|| format!("failed to read response body from {}", url))?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n])
                .with_context(|| format!("failed to write {}", dest.display()))?;
            if let Some(progress) = progress.as_ref() {
                progress.inc(n as u64);
            }
        }

        if let Some(progress) = progress {
            progress.finish();
        }

        tracing::debug!("Downloaded {} bytes from {}", file_len(dest), url);
        Ok(())
    }
}

impl Fetcher for NetFetcher {
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()> {
        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(auth_callbacks());

        let remote = normalize_scp_url(url);
        RepoBuilder::new()
            .fetch_options(fetch_options)
            .clone(&remote, dest)
            .with_context(|| format!("failed to clone {}", url))?;
        Ok(())
    }

    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        match Url::parse(url) {
            Ok(parsed) if parsed.scheme().len() > 1 => match parsed.scheme() {
                "http" | "https" => self.download_http(url, dest),
                "file" => {
                    let path = parsed
                        .to_file_path()
                        .map_err(|_| anyhow::anyhow!("invalid file URL: {}", url))?;
                    copy_local(&path, dest)
                }
                scheme => bail!("unsupported URL scheme `{}`", scheme),
            },
            // Plain paths, including Windows drive letters
            _ => copy_local(Path::new(url), dest),
        }
    }
}

/// Upper bound on credential callbacks per clone; libgit2 keeps asking
/// after each rejected credential.
const MAX_AUTH_ATTEMPTS: usize = 4;

/// Credentials from the ssh agent and the git credential helpers.
fn auth_callbacks() -> RemoteCallbacks<'static> {
    let mut attempts = 0;
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |url, username_from_url, allowed| {
        attempts += 1;
        if attempts > MAX_AUTH_ATTEMPTS {
            return Err(git2::Error::from_str("authentication failed"));
        }

        if allowed.contains(CredentialType::SSH_KEY) {
            return Cred::ssh_key_from_agent(username_from_url.unwrap_or("git"));
        }
        if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
            let config = git2::Config::open_default()?;
            return Cred::credential_helper(&config, url, username_from_url);
        }
        if allowed.contains(CredentialType::DEFAULT) {
            return Cred::default();
        }
        Err(git2::Error::from_str("no supported authentication method"))
    });
    callbacks
}

/// Rewrite scp-style remotes (`git@host:org/repo.git`) as `ssh://` URLs.
fn normalize_scp_url(url: &str) -> String {
    if url.contains("://") || Path::new(url).is_absolute() {
        return url.to_string();
    }
    match url.split_once(':') {
        Some((user_host, path))
            if user_host.contains('@') && !user_host.contains('/') && !path.is_empty() =>
        {
            format!("ssh://{}/{}", user_host, path.trim_start_matches('/'))
        }
        _ => url.to_string(),
    }
}

fn copy_local(src: &Path, dest: &Path) -> Result<()> {
    std::fs::copy(src, dest)
        .with_context(|| format!("failed to copy {} to {}", src.display(), dest.display()))?;
    Ok(())
}

fn file_len(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ErrorKind;
    use crate::core::source::FetchMode;
    use crate::test_support::MockFetcher;
    use tempfile::TempDir;

    #[test]
    fn test_fetch_download_uses_url_basename() {
        let tmp = TempDir::new().unwrap();
        let fetcher = MockFetcher::new().with_file("http://example.com/bar.gem?x=1", b"gem");
        let source = SourceDescriptor::new("http://example.com/bar.gem?x=1", FetchMode::Auto);

        let artifact = fetch(&fetcher, &source, PackageFormat::GemFile, tmp.path()).unwrap();

        assert_eq!(artifact.kind, ArtifactKind::File);
        assert_eq!(artifact.path, tmp.path().join("bar.gem"));
        assert_eq!(std::fs::read(&artifact.path).unwrap(), b"gem");
    }

    #[test]
    fn test_fetch_clone_strips_git_suffix() {
        let tmp = TempDir::new().unwrap();
        let fetcher = MockFetcher::new().with_repo(
            "https://github.com/org/foo.git",
            vec![("foo.gemspec", "spec")],
        );
        let source = SourceDescriptor::new("https://github.com/org/foo.git", FetchMode::Auto);

        let artifact = fetch(&fetcher, &source, PackageFormat::Git, tmp.path()).unwrap();

        assert_eq!(artifact.kind, ArtifactKind::Directory);
        assert_eq!(artifact.path, tmp.path().join("foo"));
        assert!(artifact.path.join("foo.gemspec").is_file());
        assert_eq!(fetcher.clones(), vec!["https://github.com/org/foo.git".to_string()]);
        assert!(fetcher.downloads().is_empty());
    }

    #[test]
    fn test_checkout_dir_fallback() {
        let source = SourceDescriptor::new("https://example.com/", FetchMode::GitClone);
        assert_eq!(checkout_dir_name(&source), "checkout");

        let source = SourceDescriptor::new("https://example.com/org/repo", FetchMode::GitClone);
        assert_eq!(checkout_dir_name(&source), "repo");
    }

    #[test]
    fn test_fetch_failure_maps_to_fetch_failed() {
        let tmp = TempDir::new().unwrap();
        let fetcher = MockFetcher::new();
        let source = SourceDescriptor::new("http://example.com/missing.zip", FetchMode::Auto);

        let err = fetch(&fetcher, &source, PackageFormat::Zip, tmp.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FetchFailed);
        assert!(err.to_string().contains("http://example.com/missing.zip"));
    }

    #[test]
    fn test_net_fetcher_copies_local_files() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("foo-1.0.gem");
        std::fs::write(&src, b"payload").unwrap();

        let fetcher = NetFetcher::new(&NetConfig::default()).unwrap();

        let dest = tmp.path().join("copy.gem");
        fetcher.download(src.to_str().unwrap(), &dest).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"payload");

        let file_url = Url::from_file_path(&src).unwrap();
        let dest = tmp.path().join("copy2.gem");
        fetcher.download(file_url.as_str(), &dest).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"payload");
    }

    #[test]
    fn test_net_fetcher_rejects_unknown_scheme() {
        let tmp = TempDir::new().unwrap();
        let fetcher = NetFetcher::new(&NetConfig::default()).unwrap();
        let err = fetcher
            .download("ftp://example.com/foo.gem", &tmp.path().join("foo.gem"))
            .unwrap_err();
        assert!(err.to_string().contains("ftp"));
    }

    #[test]
    fn test_scp_remotes_become_ssh_urls() {
        assert_eq!(
            normalize_scp_url("git@github.com:org/foo.git"),
            "ssh://git@github.com/org/foo.git"
        );
        assert_eq!(
            normalize_scp_url("ssh://git@github.com/org/foo.git"),
            "ssh://git@github.com/org/foo.git"
        );
        assert_eq!(
            normalize_scp_url("https://github.com/org/foo.git"),
            "https://github.com/org/foo.git"
        );
        assert_eq!(normalize_scp_url("/srv/git/foo.git"), "/srv/git/foo.git");
        assert_eq!(normalize_scp_url("foo.git"), "foo.git");
    }

    #[test]
    fn test_net_fetcher_clones_local_repository() {
        let tmp = TempDir::new().unwrap();
        let origin = tmp.path().join("origin");
        let repo = git2::Repository::init(&origin).unwrap();
        std::fs::write(origin.join("foo.gemspec"), "spec").unwrap();

        let mut index = repo.index().unwrap();
        index.add_path(Path::new("foo.gemspec")).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = git2::Signature::now("insturl", "insturl@example.com").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
            .unwrap();

        let fetcher = NetFetcher::new(&NetConfig::default()).unwrap();
        let dest = tmp.path().join("clone");
        fetcher.clone_repo(origin.to_str().unwrap(), &dest).unwrap();
        assert!(dest.join("foo.gemspec").is_file());
    }
}

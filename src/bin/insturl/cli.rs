//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand};
use insturl::util::shell::ColorChoice;

/// insturl - install a gem from a URL
#[derive(Parser)]
#[command(name = "insturl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Coloring: auto, always, never
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    pub color: ColorChoice,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Install a gem from a URL
    #[command(long_about = INSTALL_ABOUT)]
    Install(InstallArgs),
}

const INSTALL_ABOUT: &str = "\
Install a gem from a URL.

If --git is given or the URL ends with .git, the URL is cloned as a git
repository. Otherwise it is downloaded as a package file (.gem, .tar.gz,
.tgz or .zip).

A .gem is installed directly. Repositories and archives must have exactly
one *.gemspec file in their top level directory; a gem is built from it and
then installed.

Examples:
  insturl install https://example.com/foo.git
  insturl install https://example.com/foo-1.0.gem
  insturl install https://example.com/foo-1.0.tar.gz";

#[derive(Args)]
pub struct InstallArgs {
    /// Location of the package or git repository
    pub url: Option<String>,

    /// Clone the URL with git regardless of its suffix
    #[arg(long)]
    pub git: bool,

    /// Install even if the same version is already installed
    #[arg(long = "override")]
    pub override_existing: bool,
}

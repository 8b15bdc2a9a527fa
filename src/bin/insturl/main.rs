//! insturl CLI - install a gem from a URL

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use insturl::util::diagnostic::{emit, Diagnostic};
use insturl::util::Shell;

fn main() {
    let cli = Cli::parse();

    // Set up logging; RUST_LOG wins when set
    let default_filter = if cli.verbose {
        "insturl=debug"
    } else {
        "insturl=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let shell = Arc::new(Shell::from_flags(cli.quiet, cli.verbose, cli.color));

    if let Err(e) = run(cli, &shell) {
        emit(&Diagnostic::from_error(&e), shell.use_color());
        std::process::exit(1);
    }
}

fn run(cli: Cli, shell: &Arc<Shell>) -> Result<()> {
    match cli.command {
        Commands::Install(args) => commands::install::execute(args, shell),
    }
}

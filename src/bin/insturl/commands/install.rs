//! `insturl install` command

use std::sync::Arc;

use anyhow::Result;

use crate::cli::InstallArgs;
use insturl::ops::{InstallOptions, Installer};
use insturl::rubygems::GemCommand;
use insturl::sources::NetFetcher;
use insturl::util::shell::{Shell, Status};
use insturl::util::GlobalContext;

pub fn execute(args: InstallArgs, shell: &Arc<Shell>) -> Result<()> {
    let ctx = GlobalContext::new()?;
    tracing::debug!(
        "Running in {} (project config {})",
        ctx.cwd().display(),
        ctx.project_config_path().display()
    );
    let config = ctx.config();

    let options = InstallOptions {
        override_existing: args.override_existing || config.install.override_existing(),
        use_repository_mode: args.git,
        workspace_root: config.install.tmpdir.clone(),
    };

    let fetcher = NetFetcher::new(&config.net)?.with_shell(Arc::clone(shell));
    let gem = GemCommand::from_config(&config.tools);

    let url = args.url.unwrap_or_default();
    let span = shell.span(Status::Info, format!("installing from {}", url.trim()));

    let outcome = Installer::new(&fetcher, &gem, &gem, options)
        .with_shell(Arc::clone(shell))
        .install(&url)?;

    span.finish_with_message(format!("installing {}", outcome.spec));
    Ok(())
}

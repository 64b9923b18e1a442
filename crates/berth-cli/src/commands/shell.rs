//! `berth shell` and `berth attach`.

use std::path::Path;

use anyhow::Result;
use berth_core::{ArcUi, ShellConfig};

/// Shell session options from the command line.
#[derive(Debug, Default)]
pub(crate) struct ShellArgs {
    pub(crate) plugin: String,
    pub(crate) service: Option<String>,
    pub(crate) user: Option<String>,
    pub(crate) command: Vec<String>,
}

impl ShellArgs {
    /// Only the fields given on the command line; defaults are applied by
    /// the orchestrator.
    pub(crate) fn overrides(&self) -> ShellConfig {
        let mut config = ShellConfig::empty();
        if let Some(service) = &self.service {
            config = config.with_service(service.as_str());
        }
        if let Some(user) = &self.user {
            config = config.with_user(user.as_str());
        }
        if !self.command.is_empty() {
            config = config.with_command(self.command.iter().map(String::as_str));
        }
        config
    }
}

/// Open an interactive shell through the named plugin.
pub(crate) async fn run_shell(manifest: &Path, args: &ShellArgs, ui: ArcUi) -> Result<()> {
    let mut orchestrator = super::load_orchestrator(manifest, ui)?;
    orchestrator.shell(&args.plugin, args.overrides()).await?;
    Ok(())
}

/// Attach to the running environment through the named plugin.
pub(crate) async fn run_attach(manifest: &Path, args: &ShellArgs, ui: ArcUi) -> Result<()> {
    let mut orchestrator = super::load_orchestrator(manifest, ui)?;
    orchestrator.attach(&args.plugin, args.overrides()).await?;
    Ok(())
}

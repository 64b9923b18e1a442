//! `berth build` and `berth publish`.

use std::path::Path;

use anyhow::Result;
use berth_core::{ArcUi, BuilderConfig, Category};

use crate::theme::Theme;

/// Which builder operation to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BuildAction {
    Build,
    Publish,
}

/// Run `action` over every build plugin in manifest order.
pub(crate) async fn run_build(
    manifest: &Path,
    image: Option<String>,
    action: BuildAction,
    ui: ArcUi,
) -> Result<()> {
    let mut orchestrator = super::load_orchestrator(manifest, ui)?;
    let count = orchestrator.category_plugins(Category::Build).len();
    if count == 0 {
        println!("{}", Theme::warning("No build plugins declared in the manifest"));
        return Ok(());
    }

    let config = BuilderConfig::new(image.unwrap_or_default());
    match action {
        BuildAction::Build => {
            orchestrator.build(&config).await?;
            println!("{}", Theme::success(&format!("Built with {count} plugin(s)")));
        },
        BuildAction::Publish => {
            orchestrator.publish(&config).await?;
            println!("{}", Theme::success(&format!("Published with {count} plugin(s)")));
        },
    }
    Ok(())
}

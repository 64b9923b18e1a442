//! `berth cleanup`: reclaim space left behind by earlier runs.

use std::path::Path;

use anyhow::Result;
use berth_core::ArcUi;

/// Remove exited containers and dangling images.
pub(crate) async fn run_cleanup(docker: Option<&Path>, ui: ArcUi) -> Result<()> {
    ui.stage("Cleanup");
    ui.step("Removing exited containers and dangling images");
    berth_plugins::compose::cleanup(docker).await?;
    ui.info("Docker images and containers cleaned up");
    Ok(())
}

//! `berth plugins`: list registered plugin names.

use anyhow::Result;

use crate::theme::Theme;

/// Print every plugin name that manifest entries may refer to.
pub(crate) fn list_plugins() -> Result<()> {
    let registry = super::builtin_registry()?;
    println!("{}", Theme::header("Available plugins"));
    for name in registry.names() {
        println!("  {name}");
    }
    Ok(())
}

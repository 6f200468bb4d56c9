//! Plugin listings: `mass-driver drivers|forges|sources|scanners`.

use anyhow::Result;
use console::style;

use mass_driver::plugins::registry::{self, PluginKind};

pub fn cmd_plugins(kind: PluginKind, info: Option<&str>) -> Result<()> {
    if let Some(name) = info {
        let entry = registry::find(kind, name)?;
        println!("{} {}", style(entry.name).bold(), entry.description);
        return Ok(());
    }

    let entries = registry::entries(kind);
    println!("Available {}s:", kind.as_str());
    for entry in entries {
        println!("  {:<20} {}", style(entry.name).cyan(), entry.description);
    }
    Ok(())
}

//! `mass-driver review-pr`: bulk status of pull requests.

use anyhow::{Context, Result};
use console::style;

use mass_driver::plugins::registry;
use mass_driver::plugins::sources::read_lines;
use mass_driver::review::review;

use super::super::ReviewArgs;

pub fn cmd_review(args: &ReviewArgs) -> Result<()> {
    let config = match &args.forge_config {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read forge config {}", path.display()))?;
            toml::from_str::<toml::Table>(&content)
                .with_context(|| format!("Invalid forge config {}", path.display()))?
        }
        None => toml::Table::new(),
    };
    let forge = registry::load_forge(&args.forge, config)?;

    let mut prs = args.pr.clone();
    if let Some(file) = &args.pr_filelist {
        prs.extend(read_lines(file)?);
    }

    let report = review(&prs, forge.as_ref());
    println!("In summary: {} unique PRs, of which...", report.total);
    for group in &report.groups {
        println!(
            "- {:03} ({:04.2}%) {}",
            group.count,
            group.percent,
            style(&group.status).bold()
        );
    }
    for group in &report.groups {
        println!("{}", style(format!("For {}:", group.status)).bold());
        for pr in &group.prs {
            println!("  {}", pr);
        }
    }
    Ok(())
}

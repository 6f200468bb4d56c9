//! Human summaries of an [`ActivityOutcome`], fresh or loaded from disk.
//!
//! Builders return plain lines so they can be asserted on; `print_*` adds
//! the terminal styling.

use console::style;
use std::collections::BTreeMap;

use crate::model::{ActivityOutcome, PatchOutcome, Phase, PhaseError, PrOutcome, RepoOutcome};
use crate::ui::icons::{CHECK, CROSS, PR, PROGRESS, SEARCH};

/// `(count, percent, label)` rows, most frequent first, ties by label.
pub fn count_rows(groups: &BTreeMap<String, Vec<String>>) -> Vec<(usize, f64, String)> {
    let total: usize = groups.values().map(Vec::len).sum();
    let mut rows: Vec<(usize, f64, String)> = groups
        .iter()
        .filter(|(_, repos)| !repos.is_empty())
        .map(|(label, repos)| {
            let count = repos.len();
            (count, count as f64 * 100.0 / total as f64, label.clone())
        })
        .collect();
    rows.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.2.cmp(&b.2)));
    rows
}

fn format_counts(activity: &str, groups: &BTreeMap<String, Vec<String>>) -> Vec<String> {
    let total: usize = groups.values().map(Vec::len).sum();
    let mut lines = vec![
        format!("{} results:", capitalize(activity)),
        format!("{} repos processed, of which...", total),
    ];
    lines.extend(
        count_rows(groups)
            .into_iter()
            .map(|(count, percent, label)| format!("- {:03} ({:04.2}%) {}", count, percent, label)),
    );
    lines
}

fn format_details(activity: &str, groups: &BTreeMap<String, Vec<String>>) -> Vec<String> {
    let mut lines = Vec::new();
    let rows = count_rows(groups);
    if !rows.is_empty() {
        lines.push(format!("Now, repo list grouped by {} outcome", activity));
    }
    for (_, _, label) in rows {
        lines.push(format!("For {}:", label));
        let mut repos = groups[&label].clone();
        repos.sort();
        lines.extend(repos);
    }
    lines
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Every repo the run started with, whatever phase it reached since.
pub fn source_summary(outcome: &ActivityOutcome) -> String {
    let discovered = outcome.repos.len();
    let failed = outcome
        .repos
        .values()
        .filter(|r| r.source.error.is_some())
        .count();
    if failed == 0 {
        format!("Source results: discovered {} repos", discovered)
    } else {
        format!(
            "Source results: discovered {} repos, {} with source errors",
            discovered, failed
        )
    }
}

/// Repo ids grouped by patch outcome.
pub fn patch_groups(outcome: &ActivityOutcome) -> BTreeMap<String, Vec<String>> {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for repo in outcome.repos.values() {
        if let Some(patch) = &repo.patch {
            groups
                .entry(patch.outcome.to_string())
                .or_default()
                .push(repo.repo_id.clone());
        }
    }
    groups
}

/// Repo ids grouped by PR outcome.
pub fn forge_groups(outcome: &ActivityOutcome) -> BTreeMap<String, Vec<String>> {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for repo in outcome.repos.values() {
        if let Some(forge) = &repo.forge {
            groups
                .entry(forge.outcome.to_string())
                .or_default()
                .push(repo.repo_id.clone());
        }
    }
    groups
}

/// Sorted URLs of the PRs created.
pub fn created_prs(outcome: &ActivityOutcome) -> Vec<String> {
    let mut prs: Vec<String> = outcome
        .repos
        .values()
        .filter_map(|r| r.forge.as_ref())
        .filter(|f| f.outcome == PrOutcome::PrCreated)
        .filter_map(|f| f.pr_html_url.clone())
        .collect();
    prs.sort();
    prs
}

pub fn migration_summary(outcome: &ActivityOutcome, details: bool) -> Vec<String> {
    let groups = patch_groups(outcome);
    let mut lines = format_counts("migration", &groups);
    if details {
        lines.extend(format_details("migration", &groups));
    }
    lines
}

pub fn forge_summary(outcome: &ActivityOutcome, details: bool) -> Vec<String> {
    let groups = forge_groups(outcome);
    let mut lines = format_counts("forge", &groups);
    let prs = created_prs(outcome);
    lines.push(format!("{} PRs created:", prs.len()));
    lines.extend(prs);
    if details {
        lines.extend(format_details("forge", &groups));
    }
    lines
}

fn cascade_line(error: &PhaseError, phase: Phase) -> String {
    if error.phase == phase {
        format!("Error was: {}", error)
    } else {
        format!("Error is cascaded from previous phase {}", error.phase)
    }
}

/// Trace one repo through its phases: where it stopped and why.
pub fn explain(repo: &RepoOutcome) -> Vec<String> {
    let mut lines = vec![
        format!("Detailed results for repo ID '{}'...", repo.repo_id),
        format!("Latest phase: '{}'", repo.status),
    ];
    match &repo.error {
        None => lines.push("No overall error logged".to_string()),
        Some(error) => {
            lines.push(format!(
                "Overall error signaled! Error was at phase: {}",
                error.phase
            ));
            if error.phase == Phase::Clone {
                lines.push(format!("Clone failure, error was: {}", error));
            }
        }
    }

    match &repo.clone {
        Some(clone) => lines.push(format!("Cloned OK, to path {}", clone.cloned_path.display())),
        None => lines.push("No clone activity attempted".to_string()),
    }

    match &repo.scan {
        Some(scan) => lines.push(format!("Scanned OK, with {} scanners", scan.len())),
        None => lines.push("No scan activity attempted".to_string()),
    }

    match &repo.patch {
        Some(patch) => {
            lines.push(format!("Proceeded to Patch, with outcome {}", patch.outcome));
            if let Some(details) = &patch.details {
                lines.push(format!("Details: {}", details));
            }
            if patch.outcome == PatchOutcome::PatchError
                && let Some(error) = &patch.error
            {
                lines.push(cascade_line(error, Phase::Patch));
            }
        }
        None => lines.push("No patch activity attempted".to_string()),
    }

    match &repo.forge {
        Some(forge) => {
            lines.push(format!("Proceeded to Forge, with outcome {}", forge.outcome));
            if let Some(url) = &forge.pr_html_url {
                lines.push(format!("PR: {}", url));
            }
            if forge.outcome == PrOutcome::PrFailed
                && let Some(error) = &forge.error
            {
                lines.push(cascade_line(error, Phase::Forge));
            }
        }
        None => lines.push("No forge activity attempted".to_string()),
    }
    lines
}

fn print_section(title: String, lines: &[String]) {
    println!();
    println!("{}{}", PROGRESS, style(title).bold());
    for line in lines {
        println!("  {}", line);
    }
}

/// Print every summary relevant to `outcome`.
pub fn print_all(outcome: &ActivityOutcome, details: bool) {
    print_section(source_summary(outcome), &[]);
    if outcome.repos.values().any(|r| r.patch.is_some()) {
        let lines = migration_summary(outcome, details);
        print_section(lines[0].clone(), &lines[1..]);
    }
    if outcome.repos.values().any(|r| r.forge.is_some()) {
        let lines = forge_summary(outcome, details);
        print_section(format!("{}{}", PR, lines[0]), &lines[1..]);
    }
}

pub fn print_explain(repo: &RepoOutcome) {
    let icon = if repo.error.is_none() { &CHECK } else { &CROSS };
    let lines = explain(repo);
    println!("{}{}{}", SEARCH, icon, style(&lines[0]).bold());
    for line in &lines[1..] {
        println!("  {}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClonedRepo, PatchResult, PrResult, SourcedRepo};
    use std::path::PathBuf;

    fn repo(id: &str) -> RepoOutcome {
        RepoOutcome::sourced(SourcedRepo::new(id, &format!("git@example.com:org/{id}.git")))
    }

    fn cloned(mut repo: RepoOutcome) -> RepoOutcome {
        repo.status = Phase::Clone;
        repo.clone = Some(ClonedRepo {
            source: repo.source.clone(),
            cloned_path: PathBuf::from(format!("/tmp/{}", repo.repo_id)),
            current_branch: "main".into(),
            commit_hash: "0".repeat(40),
        });
        repo
    }

    fn patched(mut repo: RepoOutcome, outcome: PatchOutcome) -> RepoOutcome {
        repo.status = Phase::Patch;
        repo.patch = Some(PatchResult::new(outcome));
        repo
    }

    fn sample() -> ActivityOutcome {
        let mut outcome = ActivityOutcome::default();
        let mut ok = patched(cloned(repo("a")), PatchOutcome::PatchedOk);
        ok.status = Phase::Forge;
        ok.forge = Some(PrResult::created("https://forge/a/pull/1".into()));
        let mut failed = patched(cloned(repo("b")), PatchOutcome::PatchedOk);
        let error = PhaseError::new(Phase::Forge, "Error", "forge down");
        failed.status = Phase::Forge;
        failed.forge = Some(PrResult::failed(error.clone()));
        failed.error = Some(error);
        for r in [
            ok,
            failed,
            patched(cloned(repo("c")), PatchOutcome::AlreadyPatched),
            patched(cloned(repo("d")), PatchOutcome::AlreadyPatched),
            repo("e"),
        ] {
            outcome.repos.insert(r.repo_id.clone(), r);
        }
        outcome
    }

    #[test]
    fn migration_counts_most_frequent_first() {
        let lines = migration_summary(&sample(), true);
        assert_eq!(lines[0], "Migration results:");
        assert_eq!(lines[1], "4 repos processed, of which...");
        assert_eq!(lines[2], "- 002 (50.00%) ALREADY_PATCHED");
        assert_eq!(lines[3], "- 002 (50.00%) PATCHED_OK");
        assert!(lines.contains(&"For PATCHED_OK:".to_string()));
    }

    #[test]
    fn forge_summary_lists_created_prs() {
        let lines = forge_summary(&sample(), false);
        assert!(lines.contains(&"1 PRs created:".to_string()));
        assert!(lines.contains(&"https://forge/a/pull/1".to_string()));
        assert!(lines.contains(&"- 001 (50.00%) PR_FAILED".to_string()));
    }

    #[test]
    fn source_summary_counts_every_repo_after_the_pass() {
        let mut outcome = sample();
        assert_eq!(source_summary(&outcome), "Source results: discovered 5 repos");

        let mut unsourced = SourcedRepo::new("f", "git@example.com:org/f.git");
        unsourced.error = Some(PhaseError::new(Phase::Source, "LookupError", "archived"));
        outcome
            .repos
            .insert("f".into(), RepoOutcome::sourced(unsourced));
        assert_eq!(
            source_summary(&outcome),
            "Source results: discovered 6 repos, 1 with source errors"
        );
    }

    #[test]
    fn explain_distinguishes_cascaded_errors() {
        let mut broken = repo("x");
        let clone_error = PhaseError::new(Phase::Clone, "GitError", "no such repo");
        broken.status = Phase::Patch;
        broken.error = Some(clone_error.clone());
        broken.patch = Some(PatchResult::failed(clone_error));

        let lines = explain(&broken);
        assert!(lines.contains(&"Overall error signaled! Error was at phase: CLONE".to_string()));
        assert!(lines.contains(&"No clone activity attempted".to_string()));
        assert!(lines.contains(&"Error is cascaded from previous phase CLONE".to_string()));

        let outcome = sample();
        let lines = explain(outcome.get("b").unwrap());
        assert!(lines.contains(&"Error was: Error at phase FORGE: forge down".to_string()));
        assert!(lines.contains(&"Cloned OK, to path /tmp/b".to_string()));
    }
}

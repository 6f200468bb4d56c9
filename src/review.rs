//! Review aggregator: bulk status lookup of pull requests, grouped by status.
//!
//! PRs need not come from this tool. Each unique URL is looked up once; a
//! failed lookup lands in the [`ERROR_STATUS`] bucket instead of stopping
//! the review.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{error, info, warn};

use crate::executor::guarded;
use crate::model::Phase;
use crate::plugins::Forge;

/// Bucket for PRs whose status could not be fetched.
pub const ERROR_STATUS: &str = "error fetching status";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusGroup {
    pub status: String,
    /// Sorted PR URLs
    pub prs: Vec<String>,
    pub count: usize,
    /// Share of all unique PRs, 0-100
    pub percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReviewReport {
    /// Number of unique PRs looked up
    pub total: usize,
    /// Forge-declared statuses first (most complete first), then any
    /// statuses the forge did not declare, then [`ERROR_STATUS`]
    pub groups: Vec<StatusGroup>,
}

impl ReviewReport {
    pub fn by_status(&self) -> BTreeMap<String, Vec<String>> {
        self.groups
            .iter()
            .map(|g| (g.status.clone(), g.prs.clone()))
            .collect()
    }

    pub fn group(&self, status: &str) -> Option<&StatusGroup> {
        self.groups.iter().find(|g| g.status == status)
    }
}

/// Look up every unique PR of `pr_urls` on `forge`.
pub fn review<S: AsRef<str>>(pr_urls: &[S], forge: &dyn Forge) -> ReviewReport {
    let unique: BTreeSet<&str> = pr_urls
        .iter()
        .map(|u| u.as_ref().trim())
        .filter(|u| !u.is_empty())
        .collect();
    let total = unique.len();

    let mut by_status: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (index, pr_url) in unique.into_iter().enumerate() {
        info!("[{:03}/{:03}] Fetching PR status...", index + 1, total);
        let status = match guarded(Phase::Forge, || forge.pr_status(pr_url)) {
            Ok(status) => status,
            Err(e) => {
                error!("Error when fetching PR status {}. Issue was: {}", pr_url, e);
                ERROR_STATUS.to_string()
            }
        };
        by_status.entry(status).or_default().push(pr_url.to_string());
    }

    let groups = ordered_statuses(&forge.pr_statuses(), &by_status)
        .into_iter()
        .filter_map(|status| {
            let prs = by_status.remove(&status)?;
            let count = prs.len();
            Some(StatusGroup {
                status,
                prs,
                count,
                percent: count as f64 * 100.0 / total as f64,
            })
        })
        .collect();
    ReviewReport { total, groups }
}

fn ordered_statuses(declared: &[String], observed: &BTreeMap<String, Vec<String>>) -> Vec<String> {
    let mut order: Vec<String> = declared
        .iter()
        .filter(|s| observed.contains_key(*s))
        .cloned()
        .collect();

    let unlisted: Vec<&String> = observed
        .keys()
        .filter(|s| s.as_str() != ERROR_STATUS && !declared.contains(*s))
        .collect();
    if !unlisted.is_empty() {
        warn!(
            "Forge reported statuses it does not declare ({}): their ordering is not guaranteed",
            unlisted
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        order.extend(unlisted.into_iter().cloned());
    }

    if observed.contains_key(ERROR_STATUS) && !order.iter().any(|s| s == ERROR_STATUS) {
        order.push(ERROR_STATUS.to_string());
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::PrRequest;
    use crate::plugins::forges::DummyForge;

    #[derive(Debug)]
    struct FlakyForge;

    impl Forge for FlakyForge {
        fn create_pr(&self, _request: &PrRequest<'_>) -> anyhow::Result<String> {
            anyhow::bail!("read-only")
        }

        fn pr_status(&self, pr_url: &str) -> anyhow::Result<String> {
            match pr_url {
                "A" => Ok("merged".into()),
                "B" => Ok("draft".into()),
                "C" => Ok("abandoned".into()),
                _ => anyhow::bail!("HTTP 502"),
            }
        }

        fn pr_statuses(&self) -> Vec<String> {
            vec!["merged".into(), "open".into()]
        }
    }

    #[derive(Debug)]
    struct PanickingForge;

    impl Forge for PanickingForge {
        fn create_pr(&self, _request: &PrRequest<'_>) -> anyhow::Result<String> {
            anyhow::bail!("read-only")
        }

        fn pr_status(&self, pr_url: &str) -> anyhow::Result<String> {
            if pr_url == "B" {
                panic!("status endpoint blew up");
            }
            Ok("open".into())
        }

        fn pr_statuses(&self) -> Vec<String> {
            vec!["open".into()]
        }
    }

    #[test]
    fn panicking_lookup_is_reported_and_the_rest_continue() {
        let report = review(&["A", "B", "C"], &PanickingForge);
        assert_eq!(report.total, 3);
        assert_eq!(report.group("open").unwrap().prs, ["A", "C"]);
        assert_eq!(report.group(ERROR_STATUS).unwrap().prs, ["B"]);
    }

    #[test]
    fn duplicates_are_counted_once() {
        let mut forge = DummyForge::default();
        forge.statuses.insert("A".into(), "merged".into());
        forge.statuses.insert("B".into(), "open".into());

        let report = review(&["A", "A", "B"], &forge);
        assert_eq!(report.total, 2);
        assert_eq!(
            report.by_status(),
            BTreeMap::from([
                ("merged".to_string(), vec!["A".to_string()]),
                ("open".to_string(), vec!["B".to_string()]),
            ])
        );
        assert_eq!(report.group("merged").unwrap().count, 1);
        assert_eq!(report.group("merged").unwrap().percent, 50.0);
    }

    #[test]
    fn declared_order_then_unlisted_then_errors() {
        let report = review(&["D", "C", "B", "A", "E"], &FlakyForge);
        let order: Vec<&str> = report.groups.iter().map(|g| g.status.as_str()).collect();
        assert_eq!(order, ["merged", "abandoned", "draft", ERROR_STATUS]);

        let errors = report.group(ERROR_STATUS).unwrap();
        assert_eq!(errors.prs, ["D", "E"]);
        assert_eq!(errors.percent, 40.0);
    }

    #[test]
    fn empty_input_gives_empty_report() {
        let report = review::<&str>(&[], &DummyForge::default());
        assert_eq!(report, ReviewReport::default());
    }
}

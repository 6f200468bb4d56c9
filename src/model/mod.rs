//! Data model: the per-repo unit of truth and the batch outcome built from it.

pub mod outcome;
pub mod phase;
pub mod repo;

pub use outcome::{
    ActivityOutcome, PatchOutcome, PatchResult, PhaseError, PrOutcome, PrResult, RepoOutcome,
    SCAN_ERROR_KEY, ScanResult,
};
pub use phase::Phase;
pub use repo::{BranchName, ClonedRepo, IndexedRepos, RepoId, SourcedRepo, index_urls};

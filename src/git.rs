//! Git primitives the per-repo phases rely on: clone-or-reuse, branch
//! switching, committing to a dedicated branch, pushing, and remote lookups.
//!
//! Nothing here knows about activities or outcomes; callers wrap these
//! results into phase errors themselves.

use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{
    BranchType, Commit, Cred, CredentialType, Direction, FetchOptions, IndexAddOption,
    PushOptions, RemoteCallbacks, Repository, Signature, StatusOptions,
};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info};

use crate::errors::GitError;

pub type Result<T> = std::result::Result<T, GitError>;

/// Default on-disk clone cache, relative to the working directory.
pub const DEFAULT_CACHE: &str = ".mass_driver/repos";

/// Cache directory used when nothing else claims the repo's organisation.
const LOCAL_ORG: &str = "local";

static URL_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://[^/]*/(?P<path>.+)$").expect("static regex")
});
static SCP_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[^@/\s]+@)?[^:/\s]+:(?P<path>[^/].*)$").expect("static regex")
});

/// Optional commit author override.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitAuthor {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl CommitAuthor {
    /// An override only exists if at least one of name/email was given.
    pub fn from_parts(name: Option<String>, email: Option<String>) -> Option<Self> {
        if name.is_none() && email.is_none() {
            None
        } else {
            Some(Self { name, email })
        }
    }
}

/// Resolve the clone cache folder.
///
/// With `cache` the given (or default) folder is reused across runs; without
/// it a fresh folder is made under the OS temp dir and left there on exit.
pub fn cache_folder(cache: bool, cache_dir: Option<&Path>) -> anyhow::Result<PathBuf> {
    use anyhow::Context;

    let folder = if cache {
        cache_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE))
    } else {
        let folder =
            std::env::temp_dir().join(format!("mass-driver-{}.cache", uuid::Uuid::new_v4()));
        info!(
            "Using repo cache folder: {}/ (Won't wipe it on exit!)",
            folder.display()
        );
        folder
    };
    std::fs::create_dir_all(&folder)
        .with_context(|| format!("Failed to create cache folder {}", folder.display()))?;
    Ok(folder)
}

/// Derive the `(organisation, repo name)` cache key of a clone URL.
///
/// - `git@github.com:org/repo.git` → `(org, repo)`
/// - `https://host/group/sub/repo` → `(sub, repo)`
/// - `/some/local/repo` → `(local, repo)`
pub fn cache_key(url: &str) -> (String, String) {
    let path = URL_PATH
        .captures(url)
        .or_else(|| SCP_PATH.captures(url))
        .and_then(|c| c.name("path"))
        .map(|m| m.as_str())
        .unwrap_or(url);

    let segments: Vec<&str> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| s.strip_suffix(".git").unwrap_or(s))
        .collect();

    let is_remote = path != url;
    match segments.as_slice() {
        [.., org, name] if is_remote => (org.to_string(), name.to_string()),
        [.., name] => (LOCAL_ORG.to_string(), name.to_string()),
        [] => (LOCAL_ORG.to_string(), "repo".to_string()),
    }
}

fn is_local_url(url: &str) -> bool {
    url.starts_with("file://") || Path::new(url).exists()
}

pub fn open(path: &Path) -> Result<Repository> {
    Repository::open(path).map_err(|source| GitError::OpenFailed {
        path: path.to_path_buf(),
        source,
    })
}

/// Open `url` in place if it is a local directory, otherwise clone it into
/// the cache, reusing an existing clone on cache hit.
pub fn clone_if_remote(url: &str, cache: &Path) -> Result<Repository> {
    let local = Path::new(url);
    if local.is_dir() {
        debug!("Given an existing (local) repo: no cloning");
        return open(local);
    }

    let (org, name) = cache_key(url);
    let target = cache.join(org).join(name);
    if target.is_dir() {
        debug!("Given a URL we cloned already: no cloning");
        return open(&target);
    }

    info!("Cache miss: cloning {} into {}", url, target.display());
    let mut fetch = FetchOptions::new();
    fetch.remote_callbacks(remote_callbacks());
    if !is_local_url(url) {
        fetch.depth(1);
    }
    RepoBuilder::new()
        .fetch_options(fetch)
        .clone(url, &target)
        .map_err(|source| GitError::CloneFailed {
            url: url.to_string(),
            path: target.clone(),
            source,
        })
}

/// Optionally switch to `branch` (local, else tracked from `origin`), then
/// optionally fast-forward pull.
pub fn switch_branch_then_pull(repo: &Repository, pull: bool, branch: Option<&str>) -> Result<()> {
    if let Some(branch) = branch {
        checkout_branch(repo, branch)?;
    }
    if pull {
        pull_current(repo)?;
    }
    Ok(())
}

fn checkout_branch(repo: &Repository, name: &str) -> Result<()> {
    let branch = match repo.find_branch(name, BranchType::Local) {
        Ok(branch) => branch,
        Err(_) => {
            let remote_name = format!("origin/{}", name);
            let remote = repo
                .find_branch(&remote_name, BranchType::Remote)
                .map_err(|_| GitError::BranchNotFound(name.to_string()))?;
            let commit = remote.get().peel_to_commit()?;
            let mut local = repo.branch(name, &commit, false)?;
            local.set_upstream(Some(&remote_name))?;
            local
        }
    };

    let refname = branch
        .get()
        .name()
        .ok_or_else(|| GitError::BranchNotFound(name.to_string()))?
        .to_string();
    let target = branch.get().peel(git2::ObjectType::Commit)?;
    repo.checkout_tree(&target, Some(CheckoutBuilder::new().safe()))?;
    repo.set_head(&refname)?;
    Ok(())
}

fn pull_current(repo: &Repository) -> Result<()> {
    let branch = current_branch(repo)?;
    let mut remote = repo.find_remote("origin").map_err(|_| GitError::NoRemote)?;
    let mut fetch = FetchOptions::new();
    fetch.remote_callbacks(remote_callbacks());
    remote.fetch(&[branch.as_str()], Some(&mut fetch), None)?;

    let fetch_head = repo.find_reference("FETCH_HEAD")?;
    let fetched = repo.reference_to_annotated_commit(&fetch_head)?;
    let (analysis, _) = repo.merge_analysis(&[&fetched])?;
    if analysis.is_up_to_date() {
        return Ok(());
    }
    if !analysis.is_fast_forward() {
        return Err(GitError::NonFastForward(branch));
    }

    let refname = format!("refs/heads/{}", branch);
    let mut reference = repo.find_reference(&refname)?;
    reference.set_target(fetched.id(), "mass-driver: fast-forward pull")?;
    repo.set_head(&refname)?;
    repo.checkout_head(Some(CheckoutBuilder::default().force()))?;
    Ok(())
}

/// Name of the checked-out branch.
pub fn current_branch(repo: &Repository) -> Result<String> {
    let head = repo.head().map_err(|_| GitError::NoCurrentBranch)?;
    if !head.is_branch() {
        return Err(GitError::NoCurrentBranch);
    }
    head.shorthand()
        .map(str::to_string)
        .ok_or(GitError::NoCurrentBranch)
}

/// HEAD commit id (None for unborn branches).
pub fn head_sha(repo: &Repository) -> Option<String> {
    head_commit(repo).map(|c| c.id().to_string())
}

fn head_commit(repo: &Repository) -> Option<Commit<'_>> {
    repo.head().ok().and_then(|head| head.peel_to_commit().ok())
}

/// Whether the working tree has staged, unstaged or untracked changes.
pub fn is_dirty(repo: &Repository) -> Result<bool> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false);
    let statuses = repo.statuses(Some(&mut opts))?;
    Ok(statuses
        .iter()
        .any(|entry| !entry.status().is_ignored() && entry.status() != git2::Status::CURRENT))
}

/// Create and check out `branch_name` from HEAD, stage everything, commit.
///
/// The working tree must be dirty: committing a clean tree is a caller bug
/// and fails with [`GitError::NothingToCommit`]. Returns the new commit id.
pub fn commit(
    repo: &Repository,
    branch_name: &str,
    message: &str,
    author: Option<&CommitAuthor>,
) -> Result<String> {
    if !is_dirty(repo)? {
        return Err(GitError::NothingToCommit);
    }

    let parent = head_commit(repo);
    if let Some(parent) = &parent {
        repo.branch(branch_name, parent, false)?;
    }
    // Moving HEAD keeps the index and working tree as they are, like `checkout -b`
    repo.set_head(&format!("refs/heads/{}", branch_name))?;

    let mut index = repo.index()?;
    index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
    index.update_all(["*"].iter(), None)?;
    index.write()?;
    let tree = repo.find_tree(index.write_tree()?)?;

    let committer = default_signature(repo)?;
    let author_sig = match author {
        Some(author) => Signature::now(
            author
                .name
                .as_deref()
                .or(committer.name())
                .unwrap_or("mass-driver"),
            author
                .email
                .as_deref()
                .or(committer.email())
                .unwrap_or("mass-driver@localhost"),
        )?,
        None => committer.clone(),
    };

    let parents: Vec<&Commit<'_>> = parent.iter().collect();
    let oid = repo.commit(
        Some("HEAD"),
        &author_sig,
        &committer,
        message,
        &tree,
        &parents,
    )?;
    Ok(oid.to_string())
}

fn default_signature(repo: &Repository) -> Result<Signature<'static>> {
    match repo.signature() {
        Ok(sig) => Ok(sig),
        Err(_) => Ok(Signature::now("mass-driver", "mass-driver@localhost")?),
    }
}

/// The remote PRs are raised against: `origin`, else the only remote.
fn forge_remote(repo: &Repository) -> Result<git2::Remote<'_>> {
    if let Ok(origin) = repo.find_remote("origin") {
        return Ok(origin);
    }
    let names = repo.remotes()?;
    match names.len() {
        0 => Err(GitError::NoRemote),
        1 => {
            let name = names.get(0).ok_or(GitError::NoRemote)?;
            Ok(repo.find_remote(name)?)
        }
        n => Err(GitError::AmbiguousRemote(n)),
    }
}

/// URL of the repo's remote, used to identify it on the forge.
pub fn remote_url(repo: &Repository) -> Result<String> {
    let remote = forge_remote(repo)?;
    remote
        .url()
        .map(str::to_string)
        .ok_or(GitError::NoRemote)
}

/// Push local `branch_name` to the same name on the remote.
pub fn push(repo: &Repository, branch_name: &str) -> Result<()> {
    let mut remote = forge_remote(repo)?;
    let mut callbacks = remote_callbacks();
    callbacks.push_update_reference(|refname, status| match status {
        Some(msg) => Err(git2::Error::from_str(&format!(
            "push of {} rejected: {}",
            refname, msg
        ))),
        None => Ok(()),
    });
    let mut opts = PushOptions::new();
    opts.remote_callbacks(callbacks);
    let refspec = format!("refs/heads/{0}:refs/heads/{0}", branch_name);
    remote.push(&[refspec.as_str()], Some(&mut opts))?;
    Ok(())
}

/// Default branch of the remote, from `origin/HEAD` or by asking the remote.
pub fn default_branch(repo: &Repository) -> Result<String> {
    if let Ok(reference) = repo.find_reference("refs/remotes/origin/HEAD")
        && let Some(target) = reference.symbolic_target()
        && let Some(branch) = target.strip_prefix("refs/remotes/origin/")
    {
        return Ok(branch.to_string());
    }

    let mut remote = forge_remote(repo).map_err(|_| GitError::NoDefaultBranch)?;
    let connection = remote.connect_auth(Direction::Fetch, Some(remote_callbacks()), None)?;
    let default = connection.default_branch()?;
    let name = default.as_str().ok_or(GitError::NoDefaultBranch)?;
    name.strip_prefix("refs/heads/")
        .map(str::to_string)
        .ok_or(GitError::NoDefaultBranch)
}

fn remote_callbacks<'a>() -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(|url, username, allowed| {
        if allowed.contains(CredentialType::SSH_KEY)
            && let Some(user) = username
        {
            return Cred::ssh_key_from_agent(user);
        }
        if allowed.contains(CredentialType::USER_PASS_PLAINTEXT)
            && let Ok(config) = git2::Config::open_default()
        {
            return Cred::credential_helper(&config, url, username);
        }
        Cred::default()
    });
    callbacks
}

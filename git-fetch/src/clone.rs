//! Clones or updates a single repository checkout and pins it to a ref.
//!
//! Idempotent: re-running against an existing checkout fetches and resets
//! rather than re-cloning, so a workspace pipeline re-run is safe.

use crate::credentials::build_callbacks;
use crate::errors::{GitFetchError, Result};
use git2::{build::CheckoutBuilder, build::RepoBuilder, FetchOptions, Repository, SubmoduleUpdateOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Outcome of a clone-or-update-and-checkout run, enough to populate a
/// `CheckoutSummary` without the caller re-opening the repository.
#[derive(Debug, Clone)]
pub struct CheckoutResult {
    pub path: PathBuf,
    pub commit_sha: String,
    pub cloned: bool,
}

/// Clones `url` into `target_dir` if absent, or fetches into the existing
/// checkout, then detaches `HEAD` at `git_ref` (branch, tag, or commit sha).
/// When `update_submodules` is set, every submodule is initialized and
/// updated after the checkout; a submodule failure is logged and does not
/// fail the overall checkout.
#[instrument(skip(token), fields(%url, %git_ref, target = %target_dir.display()))]
pub fn fetch_checkout_blocking(url: &str, git_ref: &str, token: Option<String>, target_dir: &Path, update_submodules: bool) -> Result<CheckoutResult> {
    let cloned = !target_dir.join(".git").exists();
    let repo = if cloned {
        if let Some(parent) = target_dir.parent() {
            std::fs::create_dir_all(parent)?;
        }
        info!("cloning fresh checkout");
        clone_fresh(url, token, target_dir)?
    } else {
        debug!("reusing existing checkout");
        let repo = Repository::open(target_dir)?;
        fetch_origin(&repo, token)?;
        repo
    };

    let commit_sha = checkout_ref(&repo, git_ref)?;
    info!(commit = %commit_sha, "checked out ref");

    if update_submodules {
        if let Err(e) = update_all_submodules(&repo) {
            warn!(error = %e, "submodule update failed, continuing with checkout as-is");
        }
    }

    Ok(CheckoutResult {
        path: target_dir.to_path_buf(),
        commit_sha,
        cloned,
    })
}

fn update_all_submodules(repo: &Repository) -> Result<()> {
    for mut submodule in repo.submodules()? {
        let name = submodule.name().unwrap_or("<unnamed>").to_string();
        debug!(submodule = %name, "updating submodule");
        submodule.update(true, Some(&mut SubmoduleUpdateOptions::new()))?;
    }
    Ok(())
}

fn clone_fresh(url: &str, token: Option<String>, target_dir: &Path) -> Result<Repository> {
    let callbacks = build_callbacks(token);
    let mut fetch_opts = FetchOptions::new();
    fetch_opts.remote_callbacks(callbacks);

    let mut builder = RepoBuilder::new();
    builder.fetch_options(fetch_opts);

    match builder.clone(url, target_dir) {
        Ok(repo) => Ok(repo),
        Err(e) => {
            warn!(error = %e, "clone failed");
            Err(e.into())
        }
    }
}

fn fetch_origin(repo: &Repository, token: Option<String>) -> Result<()> {
    let mut remote = repo.find_remote("origin")?;
    let callbacks = build_callbacks(token);
    let mut fetch_opts = FetchOptions::new();
    fetch_opts.remote_callbacks(callbacks);

    remote.fetch(&["+refs/heads/*:refs/remotes/origin/*", "+refs/tags/*:refs/tags/*"], Some(&mut fetch_opts), None)?;
    Ok(())
}

fn checkout_ref(repo: &Repository, git_ref: &str) -> Result<String> {
    let candidates = [
        git_ref.to_string(),
        format!("origin/{git_ref}"),
        format!("refs/remotes/origin/{git_ref}"),
        format!("refs/tags/{git_ref}"),
    ];

    let mut last_err = None;
    for candidate in &candidates {
        match repo.revparse_single(candidate) {
            Ok(object) => {
                let commit = object.peel_to_commit()?;
                repo.set_head_detached(commit.id())?;
                let mut checkout = CheckoutBuilder::new();
                checkout.force();
                repo.checkout_head(Some(&mut checkout))?;
                return Ok(commit.id().to_string());
            }
            Err(e) => last_err = Some(e),
        }
    }

    Err(last_err.map(GitFetchError::from).unwrap_or_else(|| GitFetchError::NoCredentials(git_ref.to_string())))
}

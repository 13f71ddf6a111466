//! Fetches and pins a single repository checkout to a ref, for the
//! workspace pipeline's per-repo sequential loop (§4.7 step 1).
//!
//! All git I/O is blocking (libgit2 underneath); every entry point here runs
//! it inside `spawn_blocking` so it never stalls the async runtime.

pub mod clone;
pub mod credentials;
pub mod errors;

pub use clone::CheckoutResult;
pub use errors::{GitFetchError, Result};

use std::path::{Path, PathBuf};
use tokio::task;

/// Async wrapper around [`clone::fetch_checkout_blocking`].
pub async fn fetch_checkout(url: String, git_ref: String, token: Option<String>, target_dir: PathBuf, update_submodules: bool) -> Result<CheckoutResult> {
    task::spawn_blocking(move || clone::fetch_checkout_blocking(&url, &git_ref, token, &target_dir, update_submodules)).await?
}

/// Resolves the on-disk checkout directory for a repo under a workspace's
/// repo cache directory.
pub fn checkout_dir(repo_cache_dir: &Path, repo_name: &str) -> PathBuf {
    repo_cache_dir.join(repo_name)
}

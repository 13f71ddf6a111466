//! Bounded-concurrency fetch/checkout stage (§4.7 step 1, §5): every enabled
//! repo's `git2` clone-or-fetch runs through a semaphore-limited pool instead
//! of inline in the sequential repo loop, so a large workspace doesn't clone
//! repos one at a time. Everything downstream of the fetch (extraction,
//! indexing, graph/vector writes) stays strictly sequential per repo.

use startup_config::RepoSpec;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::instrument;

/// Runs `fetch_checkout` for every enabled repo in `repos`, at most `jobs`
/// at a time. Disabled repos are skipped (absent from the returned map).
/// A repo's own fetch failure is captured as `Err(message)` rather than
/// aborting the whole prefetch, so one unreachable remote doesn't block
/// every other repo's fetch.
#[instrument(skip(repos), fields(repo_count = repos.len(), jobs))]
pub async fn prefetch_checkouts(
    repos: &[RepoSpec],
    repo_cache_dir: &Path,
    jobs: usize,
    update_submodules: bool,
) -> HashMap<String, std::result::Result<git_fetch::CheckoutResult, String>> {
    let jobs = jobs.max(1);
    let semaphore = Arc::new(Semaphore::new(jobs));

    let mut handles = Vec::with_capacity(repos.len());
    for repo in repos.iter().filter(|r| r.enabled) {
        let repo_name = repo.repo_name.clone();
        let git_url = repo.git_url.clone();
        let git_ref = repo.git_ref.clone();
        let token = repo.resolve_token().ok();
        let target_dir = git_fetch::checkout_dir(repo_cache_dir, &repo.repo_name);
        let semaphore = Arc::clone(&semaphore);

        let handle = tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
            git_fetch::fetch_checkout(git_url, git_ref, token, target_dir, update_submodules).await.map_err(|e| e.to_string())
        });
        handles.push((repo_name, handle));
    }

    let mut outcomes = HashMap::with_capacity(handles.len());
    for (repo_name, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            // A panicked fetch task still needs to surface as a per-repo
            // failure rather than vanishing from the report.
            Err(join_err) => Err(join_err.to_string()),
        };
        outcomes.insert(repo_name, result);
    }
    outcomes
}

//! Workspace-wide orchestration (§4.7): pre-fetches every repo's checkout
//! with bounded concurrency, then drives the per-repo sequential loop, then —
//! once, after every repo has been attempted — builds the workspace symbol
//! catalog and drives the Graph Writer over every repo's parsed symbols
//! together.

use crate::errors::Result;
use crate::fetch::prefetch_checkouts;
use crate::model::{RepoStatus, RunReport};
use crate::repo_stage::{process_repo, RepoStageConfig};
use graph_writer::{build_graph, GraphStore, GraphWriter};
use scip_reader::ParseResult;
use startup_config::WorkspaceManifest;
use symbol_mapper::MapperConfig;
use tracing::{info, warn};
use vector_writer::{EmbeddingProvider, VectorStore, VectorWriter};
use workspace_catalog::build_workspace_symbol_catalog;

/// Run-level knobs that aren't properties of any one repo: how many fetches
/// run concurrently, whether submodules are updated, and whether a single
/// repo failure should abort the rest of the run.
#[derive(Debug, Clone)]
pub struct PipelineRunOptions {
    pub jobs: usize,
    pub fail_fast: bool,
    pub update_submodules: bool,
}

impl Default for PipelineRunOptions {
    fn default() -> Self {
        Self {
            jobs: 4,
            fail_fast: false,
            update_submodules: false,
        }
    }
}

/// Runs every enabled repo in `manifest.repos`. The fetch/checkout step
/// (§4.7 step 1) runs concurrently across repos, bounded by
/// `options.jobs`; everything after that — extraction, indexing, vector and
/// graph writes — stays strictly sequential per repo (§5: "repo processing
/// itself remains sequential... concurrency is an implementation detail of
/// individual blocking steps, not of the repo loop").
///
/// # Steps
/// 1. Prefetch every enabled repo's checkout, `options.jobs` at a time.
/// 2. For each repo in manifest order: optional entity extraction + vector
///    write, optional compdb normalize + `scip-clang` + SCIP Reader parse.
/// 3. Build the workspace symbol catalog from every repo's kept symbols.
/// 4. Build and write the property graph in one batched pass, if any repo
///    asked for graph ingestion and at least one repo's parse succeeded.
pub async fn run_workspace_pipeline<S, V, E>(
    manifest: &WorkspaceManifest,
    stage_cfg: &RepoStageConfig,
    mapper_config: &MapperConfig,
    options: &PipelineRunOptions,
    graph_writer: Option<&GraphWriter<S>>,
    vector_writer: Option<&VectorWriter<V, E>>,
) -> Result<RunReport>
where
    S: GraphStore,
    V: VectorStore,
    E: EmbeddingProvider,
{
    let mut report = RunReport::new(manifest.workspace_name.clone());

    let mut checkouts = prefetch_checkouts(&manifest.repos, &stage_cfg.repo_cache_dir, options.jobs, options.update_submodules).await;

    let mut parse_results: Vec<(String, ParseResult)> = Vec::new();

    for repo in &manifest.repos {
        info!(repo = %repo.repo_name, "processing repo");
        let checkout = checkouts.remove(&repo.repo_name).unwrap_or_else(|| Err("repo was not scheduled for fetch".to_string()));
        let output = process_repo(repo, checkout, stage_cfg, mapper_config, vector_writer).await?;

        let failed = output.summary.status == RepoStatus::Failed;
        if let Some(parsed) = output.parse_result {
            parse_results.push((repo.repo_name.clone(), parsed));
        }
        report.repos.push(output.summary);

        if failed && options.fail_fast {
            warn!(repo = %repo.repo_name, "fail-fast: aborting remaining repos after this failure");
            break;
        }
    }

    if let Some(writer) = graph_writer {
        if !parse_results.is_empty() {
            let catalog = build_workspace_symbol_catalog(&parse_results, None, mapper_config);
            report.workspace_conflicts = catalog.conflicts.clone();
            let built = build_graph(&parse_results, &catalog, mapper_config);
            let stats = writer.write(built).await;
            report.graph_ingestion = Some(stats);
        } else {
            info!("no repo produced a usable parse result; skipping graph write");
        }
    }

    report.finalize_status();
    Ok(report)
}

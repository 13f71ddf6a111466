//! The per-repo sequential pipeline: fetch → checkout → optional entity
//! extraction/vector write → optional compdb normalize + scip-clang +
//! SCIP Reader parse (§4.7 step 1-4).

use crate::errors::{PipelineError, Result};
use crate::model::{CheckoutSummary, RepoStatus, RepoSummary, ScipParseStats};
use crate::scip_indexer::{run_scip_clang, ScipIndexerConfig, ScipIndexerFailure};
use entity_extractor::{EntityExtractor, LineScanExtractor};
use scip_reader::ParseResult;
use startup_config::RepoSpec;
use std::path::{Path, PathBuf};
use symbol_mapper::MapperConfig;
use tracing::{info, warn};
use vector_writer::{EmbeddingProvider, VectorStore, VectorWriteStats, VectorWriter};

pub struct RepoStageConfig {
    pub repo_cache_dir: PathBuf,
    pub entities_dir: PathBuf,
    pub index_dir: PathBuf,
    pub host_is_windows: bool,
    pub scip_indexer: ScipIndexerConfig,
}

pub struct RepoStageOutput {
    pub summary: RepoSummary,
    pub parse_result: Option<ParseResult>,
    pub vector_stats: Option<VectorWriteStats>,
}

/// Runs every step for one repo against an already-resolved checkout
/// (fetched ahead of time by [`crate::fetch::prefetch_checkouts`], possibly
/// concurrently with other repos' fetches). Never returns `Err` for a
/// per-repo failure (fetch failure, missing compdb, etc.) — those are
/// recorded on the returned `RepoSummary` so one bad repo doesn't abort the
/// workspace run unless the caller is running in fail-fast mode. Only a
/// manifest/config-level problem that can't be attributed to a specific
/// repo step should surface as `Err`.
pub async fn process_repo<V, E>(
    repo: &RepoSpec,
    checkout: std::result::Result<git_fetch::CheckoutResult, String>,
    stage_cfg: &RepoStageConfig,
    mapper_config: &MapperConfig,
    vector_writer: Option<&VectorWriter<V, E>>,
) -> Result<RepoStageOutput>
where
    V: VectorStore,
    E: EmbeddingProvider,
{
    let mut summary = RepoSummary::new(repo.repo_name.clone());

    if !repo.enabled {
        summary.status = RepoStatus::Skipped;
        return Ok(RepoStageOutput {
            summary,
            parse_result: None,
            vector_stats: None,
        });
    }

    let checkout_result = match checkout {
        Ok(result) => result,
        Err(e) => {
            warn!(repo = %repo.repo_name, error = %e, "fetch failed, skipping repo");
            summary.checkout = Some(CheckoutSummary {
                ref_requested: repo.git_ref.clone(),
                commit_sha: None,
                cloned: false,
            });
            summary.status = RepoStatus::Failed;
            summary.error = Some(format!("fetch failed: {e}"));
            return Ok(RepoStageOutput {
                summary,
                parse_result: None,
                vector_stats: None,
            });
        }
    };
    summary.checkout = Some(CheckoutSummary {
        ref_requested: repo.git_ref.clone(),
        commit_sha: Some(checkout_result.commit_sha.clone()),
        cloned: checkout_result.cloned,
    });

    let source_root = checkout_result.path.join(&repo.source_subdir);
    let mut errors: Vec<String> = Vec::new();

    let mut vector_stats = None;
    if repo.run_vector {
        match LineScanExtractor.extract(&repo.repo_name, &source_root) {
            Ok(entities) => {
                summary.entities_serialized = entities.len();
                let entities_path = stage_cfg.entities_dir.join(format!("{}.jsonl", repo.repo_name));
                if let Err(e) = entity_extractor::write_entities_jsonl(&entities_path, &entities) {
                    errors.push(format!("failed to write entities jsonl: {e}"));
                }
                if let Some(writer) = vector_writer {
                    let stats = writer.write(entities).await;
                    vector_stats = Some(stats.clone());
                    summary.vector_stats = Some(stats);
                }
            }
            Err(e) => {
                errors.push(format!("entity extraction failed: {e}"));
            }
        }
    }

    let mut parse_result = None;
    if repo.run_graph {
        match index_repo(repo, stage_cfg, &source_root, mapper_config).await {
            Ok(result) => {
                summary.scip_parse = Some(ScipParseStats::from(&result));
                parse_result = Some(result);
            }
            Err(e) => {
                errors.push(e.to_string());
            }
        }
    }

    if !errors.is_empty() {
        summary.status = RepoStatus::Failed;
        summary.error = Some(errors.join("; "));
    }

    Ok(RepoStageOutput {
        summary,
        parse_result,
        vector_stats,
    })
}

async fn index_repo(repo: &RepoSpec, stage_cfg: &RepoStageConfig, source_root: &Path, mapper_config: &MapperConfig) -> Result<ParseResult> {
    let mut merged: Option<ParseResult> = None;

    for (i, compdb_relative) in repo.compdb_paths.iter().enumerate() {
        let compdb_path = source_root.join(compdb_relative);

        let (normalized_path, stats) = compile_db_normalizer::normalize_compile_db_file(&compdb_path, source_root, stage_cfg.host_is_windows)
            .map_err(|source| PipelineError::CompileDb {
                repo: repo.repo_name.clone(),
                source,
            })?;
        info!(
            repo = %repo.repo_name,
            compdb = %compdb_path.display(),
            rewritten = stats.rewritten_entries,
            dropped = stats.dropped_missing_file,
            "normalized compile database"
        );

        let scip_out = stage_cfg.index_dir.join(&repo.repo_name).join(format!("{i}.scip"));
        run_scip_clang(&stage_cfg.scip_indexer, &normalized_path, &scip_out).await.map_err(|failure| match failure {
            ScipIndexerFailure::Timeout { seconds } => PipelineError::ScipIndexerTimeout {
                repo: repo.repo_name.clone(),
                seconds,
            },
            ScipIndexerFailure::Spawn(message) | ScipIndexerFailure::ExitFailure(message) => PipelineError::ScipIndexer {
                repo: repo.repo_name.clone(),
                message,
            },
        })?;

        let bytes = tokio::fs::read(&scip_out).await.map_err(|e| PipelineError::ScipIndexer {
            repo: repo.repo_name.clone(),
            message: e.to_string(),
        })?;
        let parsed = scip_reader::parse_scip_index(&bytes, &repo.repo_name, mapper_config).map_err(|source| PipelineError::ScipParse {
            repo: repo.repo_name.clone(),
            source,
        })?;

        merged = Some(match merged {
            None => parsed,
            Some(mut acc) => {
                acc.symbols.extend(parsed.symbols);
                acc.references.extend(parsed.references);
                acc.document_count += parsed.document_count;
                acc.external_symbol_count += parsed.external_symbol_count;
                acc.dropped_symbol_count += parsed.dropped_symbol_count;
                acc.dropped_reference_count += parsed.dropped_reference_count;
                acc
            }
        });
    }

    merged.ok_or_else(|| PipelineError::ScipIndexer {
        repo: repo.repo_name.clone(),
        message: "no compdb_paths configured".to_string(),
    })
}

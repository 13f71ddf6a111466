use chrono::{DateTime, Utc};
use graph_writer::GraphWriteStats;
use serde::Serialize;
use uuid::Uuid;
use vector_writer::VectorWriteStats;
use workspace_catalog::SymbolConflict;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    PartialFailure,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepoStatus {
    Ok,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSummary {
    pub ref_requested: String,
    pub commit_sha: Option<String>,
    pub cloned: bool,
}

/// Lightweight counters mirrored from `scip_reader::ParseResult`, kept
/// separate from the full parse result: symbols/references aren't run-report
/// material once they've been folded into the graph write.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScipParseStats {
    pub symbols_parsed: usize,
    pub references_parsed: usize,
    pub document_count: usize,
    pub external_symbol_count: usize,
    pub dropped_symbol_count: usize,
    pub dropped_reference_count: usize,
}

impl From<&scip_reader::ParseResult> for ScipParseStats {
    fn from(result: &scip_reader::ParseResult) -> Self {
        Self {
            symbols_parsed: result.symbols.len(),
            references_parsed: result.references.len(),
            document_count: result.document_count,
            external_symbol_count: result.external_symbol_count,
            dropped_symbol_count: result.dropped_symbol_count,
            dropped_reference_count: result.dropped_reference_count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RepoSummary {
    pub repo_name: String,
    pub checkout: Option<CheckoutSummary>,
    pub entities_serialized: usize,
    pub vector_stats: Option<VectorWriteStats>,
    pub scip_parse: Option<ScipParseStats>,
    pub status: RepoStatus,
    pub error: Option<String>,
}

impl RepoSummary {
    pub fn new(repo_name: String) -> Self {
        Self {
            repo_name,
            checkout: None,
            entities_serialized: 0,
            vector_stats: None,
            scip_parse: None,
            status: RepoStatus::Ok,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub pipeline: String,
    pub status: RunStatus,
    pub timestamp_utc: DateTime<Utc>,
    pub repos: Vec<RepoSummary>,
    pub workspace_conflicts: Vec<SymbolConflict>,
    pub graph_ingestion: Option<GraphWriteStats>,
}

impl RunReport {
    pub fn new(pipeline: String) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            pipeline,
            status: RunStatus::Success,
            timestamp_utc: Utc::now(),
            repos: Vec::new(),
            workspace_conflicts: Vec::new(),
            graph_ingestion: None,
        }
    }

    pub fn repos_with_errors(&self) -> usize {
        self.repos.iter().filter(|r| r.status == RepoStatus::Failed).count()
    }

    /// Derives the overall run status from what actually happened: any repo
    /// failure downgrades to `PartialFailure`; every attempted repo failing
    /// downgrades further to `Failed`.
    pub fn finalize_status(&mut self) {
        let attempted = self.repos.iter().filter(|r| r.status != RepoStatus::Skipped).count();
        let failed = self.repos_with_errors();
        self.status = if failed == 0 {
            RunStatus::Success
        } else if attempted > 0 && failed == attempted {
            RunStatus::Failed
        } else {
            RunStatus::PartialFailure
        };
    }
}

//! Drives the whole workspace indexing run: per-repo fetch/extract/index,
//! then one global graph-write pass (§4.7).

pub mod errors;
pub mod fetch;
pub mod model;
pub mod pipeline;
pub mod repo_stage;
pub mod scip_indexer;

pub use errors::{PipelineError, Result};
pub use fetch::prefetch_checkouts;
pub use model::{CheckoutSummary, RepoStatus, RepoSummary, RunReport, RunStatus, ScipParseStats};
pub use pipeline::{run_workspace_pipeline, PipelineRunOptions};
pub use repo_stage::{process_repo, RepoStageConfig, RepoStageOutput};
pub use scip_indexer::{ScipIndexerConfig, ScipIndexerFailure};

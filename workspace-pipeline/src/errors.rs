use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("repo '{repo}': {source}")]
    GitFetch {
        repo: String,
        #[source]
        source: git_fetch::GitFetchError,
    },

    #[error("repo '{repo}': {source}")]
    CompileDb {
        repo: String,
        #[source]
        source: compile_db_normalizer::CompileDbError,
    },

    #[error("repo '{repo}': scip-clang invocation failed: {message}")]
    ScipIndexer { repo: String, message: String },

    #[error("repo '{repo}': scip-clang invocation timed out after {seconds}s")]
    ScipIndexerTimeout { repo: String, seconds: u64 },

    #[error("repo '{repo}': {source}")]
    ScipParse {
        repo: String,
        #[source]
        source: scip_reader::ScipReaderError,
    },

    #[error("repo '{repo}': {source}")]
    Extract {
        repo: String,
        #[source]
        source: entity_extractor::ExtractError,
    },

    #[error("manifest invalid: {0}")]
    Config(#[from] startup_config::ConfigError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Converts this crate's error into the closed-set `EngineError` kinds at
/// the pipeline boundary (§7), so the binary only ever has to match on six
/// variants regardless of which per-crate error actually fired.
impl From<PipelineError> for engine_errors::EngineError {
    fn from(err: PipelineError) -> Self {
        let message = err.to_string();
        match &err {
            PipelineError::GitFetch { .. } => engine_errors::EngineError::ExternalToolFailure {
                tool: "git".to_string(),
                message,
            },
            PipelineError::CompileDb { .. } => engine_errors::EngineError::ParseError(message),
            PipelineError::ScipIndexer { .. } | PipelineError::ScipIndexerTimeout { .. } => {
                engine_errors::EngineError::ExternalToolFailure {
                    tool: "scip-clang".to_string(),
                    message,
                }
            }
            PipelineError::ScipParse { .. } | PipelineError::Extract { .. } => engine_errors::EngineError::ParseError(message),
            PipelineError::Config(_) => engine_errors::EngineError::ConfigInvalid(message),
        }
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("manifest not found: {0}")]
    ManifestNotFound(String),

    #[error("failed to parse manifest at {path}: {source}")]
    ManifestParse {
        path: String,
        #[source]
        source: ManifestParseSource,
    },

    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("strict config validation failed: {0}")]
    StrictValidation(String),

    #[error("missing required environment variable: {0}")]
    MissingEnv(String),
}

#[derive(Debug, Error)]
pub enum ManifestParseSource {
    #[error(transparent)]
    Yaml(#[from] serde_yml::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

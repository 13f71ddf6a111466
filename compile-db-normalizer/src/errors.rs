use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileDbError {
    #[error("failed to read compile database at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write normalized compile database at {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed compile database: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("incompatible toolchain: {0}")]
    IncompatibleToolchain(String),
}

pub type Result<T> = std::result::Result<T, CompileDbError>;

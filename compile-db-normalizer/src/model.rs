use serde::{Deserialize, Serialize};

/// One entry of a JSON Compilation Database, per the Clang compile-commands
/// format: exactly one of `command`/`arguments` is present in practice, but
/// both are accepted on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileCommandEntry {
    pub directory: String,
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Vec<String>>,
}

/// Counts produced by a normalization pass, surfaced to the pipeline's
/// per-repo summary.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NormalizeStats {
    pub total_entries: usize,
    pub rewritten_entries: usize,
    pub dropped_missing_file: usize,
    pub anchor_segments: Vec<String>,
}

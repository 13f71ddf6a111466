//! Invokes the external `scip-clang` indexer as a subprocess against a
//! normalized compile database, bounded by a configurable timeout (§5:
//! "every subprocess carries a configurable timeout").
//!
//! `scip-clang` itself is out of scope here — this crate only shells out to
//! whatever binary the caller names and reads back the `.scip` file it
//! produces.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct ScipIndexerConfig {
    pub binary: String,
    pub timeout: Duration,
    pub extra_args: Vec<String>,
}

impl Default for ScipIndexerConfig {
    fn default() -> Self {
        Self {
            binary: "scip-clang".to_string(),
            timeout: Duration::from_secs(600),
            extra_args: Vec::new(),
        }
    }
}

/// Distinguishes a timeout from every other way the subprocess can fail, so
/// callers can surface the dedicated timeout error instead of a generic one.
#[derive(Debug)]
pub enum ScipIndexerFailure {
    Spawn(String),
    Timeout { seconds: u64 },
    ExitFailure(String),
}

/// Runs `scip-clang --compdb-path <compdb_path> --output <out_path>`,
/// returning `out_path` on success.
pub async fn run_scip_clang(cfg: &ScipIndexerConfig, compdb_path: &Path, out_path: &Path) -> Result<PathBuf, ScipIndexerFailure> {
    if let Some(parent) = out_path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| ScipIndexerFailure::Spawn(e.to_string()))?;
    }

    let mut command = Command::new(&cfg.binary);
    command
        .arg("--compdb-path")
        .arg(compdb_path)
        .arg("--output")
        .arg(out_path)
        .args(&cfg.extra_args);

    debug!(binary = %cfg.binary, compdb = %compdb_path.display(), out = %out_path.display(), "invoking scip-clang");

    let run = tokio::time::timeout(cfg.timeout, command.output());
    let output = match run.await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Err(ScipIndexerFailure::Spawn(format!("failed to spawn scip-clang: {e}"))),
        Err(_) => return Err(ScipIndexerFailure::Timeout { seconds: cfg.timeout.as_secs() }),
    };

    if !output.status.success() {
        warn!(status = ?output.status, stderr = %String::from_utf8_lossy(&output.stderr), "scip-clang exited non-zero");
        return Err(ScipIndexerFailure::ExitFailure(format!(
            "scip-clang exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    Ok(out_path.to_path_buf())
}

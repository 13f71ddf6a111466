//! Normalizes a `compile_commands.json` captured on one host so it resolves
//! against a checkout on this one, and refuses compile databases that were
//! captured with a toolchain this host cannot emulate.

mod errors;
mod model;
mod rewrite;
mod toolchain;

pub use errors::{CompileDbError, Result};
pub use model::{CompileCommandEntry, NormalizeStats};
pub use rewrite::rewrite_compile_db;
pub use toolchain::detect_incompatible_windows_toolchain;

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Reads `compdb_path`, rewrites every entry under `project_root`, and
/// writes the result to a sibling `*.normalized.json` file. Returns that
/// file's path and the rewrite counters, or a fatal error if the database
/// was captured with an MSVC toolchain this host can't emulate.
pub fn normalize_compile_db_file(compdb_path: &Path, project_root: &Path, host_is_windows: bool) -> Result<(PathBuf, NormalizeStats)> {
    let raw = fs::read_to_string(compdb_path).map_err(|source| CompileDbError::Read {
        path: compdb_path.display().to_string(),
        source,
    })?;
    let entries: Vec<CompileCommandEntry> = serde_json::from_str(&raw)?;

    if let Some(diagnostic) = detect_incompatible_windows_toolchain(&entries, host_is_windows) {
        return Err(CompileDbError::IncompatibleToolchain(diagnostic));
    }

    let (rewritten, stats) = rewrite_compile_db(entries, project_root);
    if stats.dropped_missing_file > 0 {
        warn!(dropped = stats.dropped_missing_file, "dropped compile database entries with no matching file on disk");
    }

    let out_path = sibling_normalized_path(compdb_path);
    let serialized = serde_json::to_string_pretty(&rewritten)?;
    fs::write(&out_path, serialized).map_err(|source| CompileDbError::Write {
        path: out_path.display().to_string(),
        source,
    })?;

    info!(
        total = stats.total_entries,
        rewritten = stats.rewritten_entries,
        dropped = stats.dropped_missing_file,
        out = %out_path.display(),
        "normalized compile database"
    );
    Ok((out_path, stats))
}

fn sibling_normalized_path(compdb_path: &Path) -> PathBuf {
    let stem = compdb_path.file_stem().and_then(|s| s.to_str()).unwrap_or("compile_commands");
    let ext = compdb_path.extension().and_then(|s| s.to_str()).unwrap_or("json");
    compdb_path.with_file_name(format!("{stem}.normalized.{ext}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn normalizes_a_file_end_to_end() {
        let tmp = tempfile::tempdir().unwrap();
        let source_root = tmp.path().join("repo_webrtc");
        let expected_file = source_root.join("api").join("audio").join("audio_frame.cc");
        fs::create_dir_all(expected_file.parent().unwrap()).unwrap();
        fs::write(&expected_file, "// test").unwrap();

        let payload = serde_json::json!([{
            "directory": "F:/webrtc_m89_mi/out/debug",
            "file": "F:/webrtc_m89_mi/api/audio/audio_frame.cc",
            "command": "clang++ -IF:/webrtc_m89_mi src.cc",
        }]);
        let compdb_path = tmp.path().join("compile_commands.json");
        fs::write(&compdb_path, payload.to_string()).unwrap();

        let (out_path, stats) = normalize_compile_db_file(&compdb_path, &source_root, false).unwrap();
        assert_ne!(out_path, compdb_path);
        assert_eq!(stats.dropped_missing_file, 0);

        let rewritten: Vec<CompileCommandEntry> = serde_json::from_str(&fs::read_to_string(out_path).unwrap()).unwrap();
        assert_eq!(rewritten[0].file, expected_file.to_string_lossy());
    }

    #[test]
    fn refuses_msvc_toolchain_on_non_windows_host() {
        let tmp = tempfile::tempdir().unwrap();
        let entries: Vec<_> = (0..20)
            .map(|_| serde_json::json!({"directory": "C:/repo", "file": "a.cc", "command": "C:\\VS\\cl.exe /c a.cc"}))
            .collect();
        let compdb_path = tmp.path().join("compile_commands.json");
        fs::write(&compdb_path, serde_json::Value::Array(entries).to_string()).unwrap();

        let result = normalize_compile_db_file(&compdb_path, tmp.path(), false);
        assert!(matches!(result, Err(CompileDbError::IncompatibleToolchain(_))));
    }
}

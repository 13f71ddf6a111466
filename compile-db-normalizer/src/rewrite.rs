//! Rewrites a compile database captured on a Windows build host so its paths
//! resolve under a POSIX checkout of the same source tree.
//!
//! The distilled contract is silent on the exact matching order, so this
//! follows the reference indexer's documented resolution: a direct join of
//! the rebased relative path onto the project root is tried first; failing
//! that, leading path segments are stripped one at a time until a join lands
//! on a file that actually exists on disk, or the entry is dropped.

use crate::model::{CompileCommandEntry, NormalizeStats};
use std::path::{Path, PathBuf};

pub fn is_windows_drive_path(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'/' || bytes[2] == b'\\')
}

fn split_segments(s: &str) -> Vec<String> {
    s.split(['/', '\\']).filter(|seg| !seg.is_empty()).map(str::to_string).collect()
}

fn normalize_segments(segments: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(segments.len());
    for seg in segments {
        match seg.as_str() {
            "." => {}
            ".." => {
                out.pop();
            }
            _ => out.push(seg),
        }
    }
    out
}

fn common_prefix_len_ci(paths: &[Vec<String>]) -> usize {
    let Some(first) = paths.first() else { return 0 };
    let mut len = first.len();
    for path in &paths[1..] {
        let mut shared = 0;
        for (a, b) in first.iter().zip(path.iter()) {
            if a.eq_ignore_ascii_case(b) {
                shared += 1;
            } else {
                break;
            }
        }
        len = len.min(shared);
    }
    len
}

fn strip_prefix_ci(segments: &[String], prefix: &[String]) -> Vec<String> {
    let matches = segments.len() >= prefix.len()
        && segments.iter().zip(prefix.iter()).all(|(a, b)| a.eq_ignore_ascii_case(b));
    if matches {
        segments[prefix.len()..].to_vec()
    } else {
        segments.to_vec()
    }
}

fn resolve_existing(root: &Path, relative: &[String]) -> Option<PathBuf> {
    for strip in 0..relative.len() {
        let tail = &relative[strip..];
        if tail.is_empty() {
            break;
        }
        let mut candidate = root.to_path_buf();
        for seg in tail {
            candidate.push(seg);
        }
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}

/// Resolves the `file` field of one entry to an on-disk path under
/// `project_root`, or `None` if no segment-stripping depth matches anything.
fn resolve_file(entry: &CompileCommandEntry, anchor: &[String], project_root: &Path) -> Option<PathBuf> {
    let project_root_segments = split_segments(&project_root.to_string_lossy());

    let (is_windows, absolute_segments) = if is_windows_drive_path(&entry.file) {
        (true, split_segments(&entry.file))
    } else if Path::new(&entry.file).is_absolute() {
        (false, split_segments(&entry.file))
    } else {
        let base = if is_windows_drive_path(&entry.directory) {
            strip_prefix_ci(&split_segments(&entry.directory), anchor)
        } else {
            split_segments(&entry.directory)
        };
        let mut combined = base;
        combined.extend(split_segments(&entry.file));
        let combined = normalize_segments(combined);
        (is_windows_drive_path(&entry.directory), combined)
    };

    let relative = if is_windows {
        strip_prefix_ci(&absolute_segments, anchor)
    } else {
        strip_prefix_ci(&absolute_segments, &project_root_segments)
    };

    resolve_existing(project_root, &relative)
}

fn ci_replace(haystack: &str, needle: &str, replacement: &str) -> String {
    if needle.is_empty() {
        return haystack.to_string();
    }
    let lower_hay = haystack.to_lowercase();
    let lower_needle = needle.to_lowercase();
    let mut out = String::with_capacity(haystack.len());
    let mut rest = haystack;
    let mut rest_lower = lower_hay.as_str();
    while let Some(idx) = rest_lower.find(&lower_needle) {
        out.push_str(&rest[..idx]);
        out.push_str(replacement);
        rest = &rest[idx + needle.len()..];
        rest_lower = &rest_lower[idx + needle.len()..];
    }
    out.push_str(rest);
    out
}

fn rewrite_anchor_occurrences(s: &str, anchor: &[String], project_root: &str) -> String {
    if anchor.is_empty() {
        return s.to_string();
    }
    let forward = anchor.join("/");
    let backward = anchor.join("\\");
    let rewritten = ci_replace(s, &forward, project_root);
    ci_replace(&rewritten, &backward, project_root)
}

/// Rewrites every Windows-drive path in `entries` to resolve under
/// `project_root`, dropping entries whose `file` cannot be located on disk.
pub fn rewrite_compile_db(entries: Vec<CompileCommandEntry>, project_root: &Path) -> (Vec<CompileCommandEntry>, NormalizeStats) {
    let mut stats = NormalizeStats {
        total_entries: entries.len(),
        ..Default::default()
    };

    let mut windows_paths = Vec::new();
    for entry in &entries {
        if is_windows_drive_path(&entry.directory) {
            windows_paths.push(split_segments(&entry.directory));
        }
        if is_windows_drive_path(&entry.file) {
            windows_paths.push(split_segments(&entry.file));
        }
    }
    let anchor_len = common_prefix_len_ci(&windows_paths);
    let anchor: Vec<String> = windows_paths.first().map(|p| p[..anchor_len].to_vec()).unwrap_or_default();
    stats.anchor_segments = anchor.clone();

    let project_root_str = project_root.to_string_lossy().to_string();
    let mut kept = Vec::with_capacity(entries.len());

    for entry in entries {
        let had_windows_path = is_windows_drive_path(&entry.directory) || is_windows_drive_path(&entry.file) || !entry.file.starts_with('/');

        let Some(resolved_file) = resolve_file(&entry, &anchor, project_root) else {
            stats.dropped_missing_file += 1;
            continue;
        };

        let directory = if is_windows_drive_path(&entry.directory) {
            rewrite_anchor_occurrences(&entry.directory, &anchor, &project_root_str)
        } else {
            entry.directory
        };
        let command = entry.command.map(|c| rewrite_anchor_occurrences(&c, &anchor, &project_root_str));
        let arguments = entry
            .arguments
            .map(|args| args.into_iter().map(|a| rewrite_anchor_occurrences(&a, &anchor, &project_root_str)).collect());

        if had_windows_path {
            stats.rewritten_entries += 1;
        }

        kept.push(CompileCommandEntry {
            directory,
            file: resolved_file.to_string_lossy().to_string(),
            command,
            arguments,
        });
    }

    (kept, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn entry(directory: &str, file: &str, command: Option<&str>) -> CompileCommandEntry {
        CompileCommandEntry {
            directory: directory.to_string(),
            file: file.to_string(),
            command: command.map(str::to_string),
            arguments: None,
        }
    }

    #[test]
    fn rewrites_windows_paths_for_posix() {
        let tmp = tempfile::tempdir().unwrap();
        let source_root = tmp.path().join("repo_webrtc");
        let expected_file = source_root.join("api").join("audio").join("audio_frame.cc");
        fs::create_dir_all(expected_file.parent().unwrap()).unwrap();
        fs::write(&expected_file, "// test").unwrap();

        let entries = vec![entry(
            "F:/webrtc_m89_mi/out/debug",
            "F:/webrtc_m89_mi/api/audio/audio_frame.cc",
            Some("clang++ -IF:/webrtc_m89_mi src.cc"),
        )];

        let (rewritten, stats) = rewrite_compile_db(entries, &source_root);
        assert_eq!(stats.dropped_missing_file, 0);
        assert_eq!(rewritten.len(), 1);
        assert_eq!(rewritten[0].directory, source_root.join("out").join("debug").to_string_lossy());
        assert_eq!(rewritten[0].file, expected_file.to_string_lossy());
        assert!(rewritten[0].command.as_ref().unwrap().contains(&source_root.to_string_lossy().to_string()));
    }

    #[test]
    fn strips_nonexistent_top_level_segment() {
        let tmp = tempfile::tempdir().unwrap();
        let source_root = tmp.path().join("repo_project_cloud");
        let target = source_root
            .join("rtc_engine")
            .join("rtc_apps")
            .join("common")
            .join("source")
            .join("common")
            .join("utils")
            .join("thread_util.cpp");
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, "// test").unwrap();

        let entries = vec![entry(
            "F:/another_repo/out/debug",
            "F:/nxg_cloud/rtc_engine/rtc_apps/common/source/common/utils/thread_util.cpp",
            None,
        )];

        let (rewritten, _stats) = rewrite_compile_db(entries, &source_root);
        assert_eq!(rewritten.len(), 1);
        assert_eq!(rewritten[0].file, target.to_string_lossy());
    }

    #[test]
    fn drops_missing_file_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let source_root = tmp.path().join("repo");
        let existing = source_root.join("src").join("exists.cc");
        fs::create_dir_all(existing.parent().unwrap()).unwrap();
        fs::write(&existing, "// exists").unwrap();

        let entries = vec![
            entry("F:/repo/out/debug", "F:/repo/src/exists.cc", None),
            entry("F:/repo/out/debug", "F:/repo/src/missing.cc", None),
        ];

        let (rewritten, stats) = rewrite_compile_db(entries, &source_root);
        assert_eq!(rewritten.len(), 1);
        assert_eq!(stats.dropped_missing_file, 1);
        assert_eq!(rewritten[0].file, existing.to_string_lossy());
    }

    #[test]
    fn rebases_relative_files_against_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let source_root = tmp.path().join("repo_webrtc");
        fs::create_dir_all(source_root.join("out").join("debug")).unwrap();
        let target = source_root.join("video").join("quality_threshold.cc");
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, "// exists").unwrap();

        let directory = source_root.join("out").join("debug").to_string_lossy().to_string();
        let entries = vec![entry(&directory, "../../video/quality_threshold.cc", None)];

        let (rewritten, _stats) = rewrite_compile_db(entries, &source_root);
        assert_eq!(rewritten.len(), 1);
        assert_eq!(rewritten[0].file, target.to_string_lossy());
    }
}

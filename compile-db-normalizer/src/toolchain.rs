//! Refuses to index a compile database that was captured with the MSVC
//! toolchain (`cl.exe`/`clang-cl.exe`) when running on a non-Windows host:
//! `scip-clang` cannot emulate MSVC's argument dialect there, so indexing
//! would silently misparse nearly every translation unit.

use crate::model::CompileCommandEntry;

fn invokes_cl_toolchain(entry: &CompileCommandEntry) -> bool {
    let looks_like_cl = |s: &str| {
        let lower = s.to_lowercase();
        lower.contains("cl.exe") || lower.contains("clang-cl.exe") || lower.contains("clang-cl ")
    };
    if let Some(cmd) = &entry.command {
        if looks_like_cl(cmd) {
            return true;
        }
    }
    if let Some(args) = &entry.arguments {
        if let Some(first) = args.first() {
            if looks_like_cl(first) {
                return true;
            }
        }
    }
    false
}

/// Returns a fatal diagnostic when a majority of `entries` invoke an MSVC
/// toolchain and the current host is not Windows. `None` otherwise.
pub fn detect_incompatible_windows_toolchain(entries: &[CompileCommandEntry], host_is_windows: bool) -> Option<String> {
    if host_is_windows || entries.is_empty() {
        return None;
    }

    let hits = entries.iter().filter(|e| invokes_cl_toolchain(e)).count();
    if hits * 2 > entries.len() {
        Some(format!(
            "{hits} of {} compile database entries invoke an MSVC toolchain (cl.exe/clang-cl.exe); \
             scip-clang cannot emulate MSVC argument parsing on this host",
            entries.len()
        ))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cl_entry() -> CompileCommandEntry {
        CompileCommandEntry {
            directory: "C:/repo".to_string(),
            file: "a.cc".to_string(),
            command: Some("C:\\VS\\cl.exe /c a.cc".to_string()),
            arguments: None,
        }
    }

    #[test]
    fn flags_majority_cl_toolchain_on_non_windows_host() {
        let entries: Vec<_> = (0..20).map(|_| cl_entry()).collect();
        let msg = detect_incompatible_windows_toolchain(&entries, false);
        assert!(msg.is_some());
    }

    #[test]
    fn stays_quiet_on_windows_host() {
        let entries: Vec<_> = (0..20).map(|_| cl_entry()).collect();
        assert!(detect_incompatible_windows_toolchain(&entries, true).is_none());
    }

    #[test]
    fn stays_quiet_when_clang_dominates() {
        let entries = vec![
            CompileCommandEntry {
                directory: "/repo".to_string(),
                file: "a.cc".to_string(),
                command: Some("clang++ -c a.cc".to_string()),
                arguments: None,
            },
            cl_entry(),
        ];
        assert!(detect_incompatible_windows_toolchain(&entries, false).is_none());
    }
}

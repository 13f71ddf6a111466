//! Assigns a single owner repo to every symbol locally defined anywhere in
//! the workspace, using a deterministic precedence rule: explicit override,
//! then SCIP package-name hint, then first-seen input order.

use scip_reader::ParseResult;
use std::collections::HashMap;
use symbol_mapper::{parse_scip_symbol, Disposition, MapperConfig, ScipKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    Override,
    PackageHint,
    StableOrder,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SymbolConflict {
    pub scip_symbol: String,
    pub candidate_repos: Vec<String>,
    pub chosen_owner: String,
    pub reason: ConflictReason,
}

#[derive(Debug, Clone, Default)]
pub struct WorkspaceSymbolCatalog {
    pub owner_repo: HashMap<String, String>,
    pub owner_file: HashMap<(String, String), String>,
    pub conflicts: Vec<SymbolConflict>,
}

impl WorkspaceSymbolCatalog {
    pub fn resolve_owner_repo(&self, scip_symbol: &str) -> Option<&str> {
        self.owner_repo.get(scip_symbol).map(String::as_str)
    }

    pub fn resolve_owner_file(&self, owner_repo: &str, scip_symbol: &str) -> Option<&str> {
        self.owner_file
            .get(&(owner_repo.to_string(), scip_symbol.to_string()))
            .map(String::as_str)
    }
}

/// Builds the catalog from an ordered `(repo_name, ParseResult)` list.
/// `owner_overrides` maps `scip_symbol -> repo_name` for operator-specified
/// pins; a pin only applies if the named repo is among the candidates.
pub fn build_workspace_symbol_catalog(
    parse_results: &[(String, ParseResult)],
    owner_overrides: Option<&HashMap<String, String>>,
    config: &MapperConfig,
) -> WorkspaceSymbolCatalog {
    let mut candidates: HashMap<String, Vec<(String, String)>> = HashMap::new();

    for (repo_name, result) in parse_results {
        for sym in &result.symbols {
            if sym.disposition != Disposition::Keep {
                continue;
            }
            let entry = candidates.entry(sym.scip_symbol.clone()).or_default();
            if !entry.iter().any(|(r, _)| r == repo_name) {
                entry.push((repo_name.clone(), sym.file_path.clone()));
            }
        }
    }

    let mut catalog = WorkspaceSymbolCatalog::default();

    for (scip_symbol, repo_candidates) in candidates {
        let chosen = resolve_owner(&scip_symbol, &repo_candidates, owner_overrides, config);
        let (owner_repo, owner_file, reason) = chosen;

        catalog.owner_repo.insert(scip_symbol.clone(), owner_repo.clone());
        catalog
            .owner_file
            .insert((owner_repo.clone(), scip_symbol.clone()), owner_file);

        if repo_candidates.len() > 1 {
            catalog.conflicts.push(SymbolConflict {
                scip_symbol,
                candidate_repos: repo_candidates.into_iter().map(|(r, _)| r).collect(),
                chosen_owner: owner_repo,
                reason,
            });
        }
    }

    catalog
}

fn resolve_owner(
    scip_symbol: &str,
    repo_candidates: &[(String, String)],
    owner_overrides: Option<&HashMap<String, String>>,
    config: &MapperConfig,
) -> (String, String, ConflictReason) {
    if let Some(overrides) = owner_overrides {
        if let Some(override_owner) = overrides.get(scip_symbol) {
            if let Some((repo, file)) = repo_candidates.iter().find(|(r, _)| r == override_owner) {
                return (repo.clone(), file.clone(), ConflictReason::Override);
            }
        }
    }

    if let Ok(parsed) = parse_scip_symbol(scip_symbol, ScipKind::Unspecified, config) {
        if parsed.package_name != "." {
            if let Some((repo, file)) = repo_candidates.iter().find(|(r, _)| *r == parsed.package_name) {
                return (repo.clone(), file.clone(), ConflictReason::PackageHint);
            }
        }
    }

    let (repo, file) = repo_candidates.first().expect("at least one candidate");
    (repo.clone(), file.clone(), ConflictReason::StableOrder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scip_reader::SymbolDef;

    fn symbol_def(symbol: &str, file: &str, disposition: Disposition) -> SymbolDef {
        SymbolDef {
            scip_symbol: symbol.to_string(),
            file_path: file.to_string(),
            kind: ScipKind::Class,
            display_name: symbol.to_string(),
            definition_range: None,
            relationships: Vec::new(),
            disposition,
        }
    }

    #[test]
    fn conflict_resolved_by_stable_order() {
        let results = vec![
            (
                "repo_a".to_string(),
                ParseResult {
                    symbols: vec![symbol_def("cxx . . . common/Node#", "node.cpp", Disposition::Keep)],
                    ..Default::default()
                },
            ),
            (
                "repo_b".to_string(),
                ParseResult {
                    symbols: vec![symbol_def("cxx . . . common/Node#", "node.cpp", Disposition::Keep)],
                    ..Default::default()
                },
            ),
        ];

        let catalog = build_workspace_symbol_catalog(&results, None, &MapperConfig::default());
        assert_eq!(
            catalog.resolve_owner_repo("cxx . . . common/Node#"),
            Some("repo_a")
        );
        assert_eq!(catalog.conflicts.len(), 1);
        assert_eq!(catalog.conflicts[0].reason, ConflictReason::StableOrder);
    }

    #[test]
    fn override_takes_precedence() {
        let results = vec![
            (
                "repo_a".to_string(),
                ParseResult {
                    symbols: vec![symbol_def("cxx . . . common/Node#", "node.cpp", Disposition::Keep)],
                    ..Default::default()
                },
            ),
            (
                "repo_b".to_string(),
                ParseResult {
                    symbols: vec![symbol_def("cxx . . . common/Node#", "node.cpp", Disposition::Keep)],
                    ..Default::default()
                },
            ),
        ];
        let mut overrides = HashMap::new();
        overrides.insert("cxx . . . common/Node#".to_string(), "repo_b".to_string());

        let catalog = build_workspace_symbol_catalog(&results, Some(&overrides), &MapperConfig::default());
        assert_eq!(
            catalog.resolve_owner_repo("cxx . . . common/Node#"),
            Some("repo_b")
        );
        assert_eq!(catalog.conflicts[0].reason, ConflictReason::Override);
    }

    #[test]
    fn no_conflict_when_single_candidate() {
        let results = vec![(
            "repo_a".to_string(),
            ParseResult {
                symbols: vec![symbol_def("cxx . . . app/Widget#", "widget.cpp", Disposition::Keep)],
                ..Default::default()
            },
        )];
        let catalog = build_workspace_symbol_catalog(&results, None, &MapperConfig::default());
        assert!(catalog.conflicts.is_empty());
    }
}

//! Turns `SymbolDef`/`Reference` records plus the workspace catalog into
//! deduplicated, type-validated nodes and edges.

use crate::model::{allowed_pair, DefinedInEdge, FileNode, GraphEdge, GraphNode, RelationshipType};
use identity_contract::{build_identity_key, EntityType};
use scip_reader::{ParseResult, SymbolDef};
use std::collections::{HashMap, HashSet};
use symbol_mapper::{
    parse_scip_symbol, qualified_entity_name, resolve_owner_repo, to_global_uri, Disposition, MapperConfig, ScipKind,
};
use workspace_catalog::WorkspaceSymbolCatalog;

#[derive(Debug, Clone, Default)]
pub struct DropCounters {
    pub malformed_uri: usize,
    pub calls_from_file: usize,
    pub impossible_type_pair: usize,
    pub relationship_unclassified: usize,
    pub reference_unclassified: usize,
}

impl DropCounters {
    pub fn as_named(&self) -> Vec<(&'static str, usize)> {
        vec![
            ("malformed_uri", self.malformed_uri),
            ("calls_from_file", self.calls_from_file),
            ("impossible_type_pair", self.impossible_type_pair),
            ("relationship_unclassified", self.relationship_unclassified),
            ("reference_unclassified", self.reference_unclassified),
        ]
    }
}

#[derive(Debug, Default)]
pub struct BuildOutput {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub defined_in: Vec<DefinedInEdge>,
    pub files: Vec<FileNode>,
    pub nodes_prepared: usize,
    pub edges_prepared: usize,
    pub drops: DropCounters,
}

struct Endpoint {
    owner_repo: String,
    entity_type: EntityType,
    #[allow(dead_code)]
    is_external: bool,
}

/// Resolves a symbol's owning repo and entity type using the workspace
/// catalog, falling back to namespace-based owner resolution (stub) when the
/// symbol has no locally-kept definition anywhere in the workspace.
fn resolve_endpoint(scip_symbol: &str, current_repo: &str, catalog: &WorkspaceSymbolCatalog, config: &MapperConfig) -> Option<Endpoint> {
    let parsed = parse_scip_symbol(scip_symbol, ScipKind::Unspecified, config).ok()?;
    match catalog.resolve_owner_repo(scip_symbol) {
        Some(owner) => Some(Endpoint {
            owner_repo: owner.to_string(),
            entity_type: parsed.entity_type,
            is_external: false,
        }),
        None => Some(Endpoint {
            owner_repo: resolve_owner_repo(scip_symbol, current_repo, config),
            entity_type: parsed.entity_type,
            is_external: true,
        }),
    }
}

fn build_node(current_repo: &str, sym: &SymbolDef, config: &MapperConfig) -> Option<GraphNode> {
    let (owner_repo, file_path, is_external) = if sym.disposition == Disposition::Stub {
        (resolve_owner_repo(&sym.scip_symbol, current_repo, config), "<external>".to_string(), true)
    } else {
        (current_repo.to_string(), sym.file_path.clone(), false)
    };

    let parsed = parse_scip_symbol(&sym.scip_symbol, sym.kind, config).ok()?;
    let global_uri = to_global_uri(
        &sym.scip_symbol,
        if is_external { None } else { Some(file_path.as_str()) },
        &owner_repo,
        sym.kind,
        false,
        config,
    )?;
    let identity_key = build_identity_key(&global_uri, None);

    Some(GraphNode {
        global_uri,
        identity_key,
        owner_repo,
        ingestion_repo: current_repo.to_string(),
        file_path,
        entity_type: parsed.entity_type,
        entity_name: qualified_entity_name(&parsed),
        scip_symbol: sym.scip_symbol.clone(),
        function_sig_hash: parsed.function_sig_hash,
        is_external,
    })
}

fn upsert_node(nodes: &mut Vec<GraphNode>, index: &mut HashMap<(String, String), usize>, node: GraphNode) {
    let key = node.key();
    match index.get(&key) {
        Some(&i) => {
            if nodes[i].is_external && !node.is_external {
                nodes[i] = node;
            }
        }
        None => {
            index.insert(key, nodes.len());
            nodes.push(node);
        }
    }
}

type EdgeKey = (RelationshipType, (String, String), (String, String));

#[allow(clippy::too_many_arguments)]
fn push_edge(
    edges: &mut Vec<GraphEdge>,
    edge_seen: &mut HashSet<EdgeKey>,
    drops: &mut DropCounters,
    rt: RelationshipType,
    src_symbol: &str,
    src: &Endpoint,
    tgt_symbol: &str,
    tgt: &Endpoint,
) {
    if !allowed_pair(rt, src.entity_type, tgt.entity_type) {
        drops.impossible_type_pair += 1;
        return;
    }
    let edge = GraphEdge {
        relationship_type: rt,
        src_owner_repo: src.owner_repo.clone(),
        src_scip_symbol: src_symbol.to_string(),
        src_entity_type: src.entity_type,
        tgt_owner_repo: tgt.owner_repo.clone(),
        tgt_scip_symbol: tgt_symbol.to_string(),
        tgt_entity_type: tgt.entity_type,
    };
    if edge_seen.insert(edge.key()) {
        edges.push(edge);
    }
}

fn implementation_relationship(src: EntityType, tgt: EntityType) -> Option<RelationshipType> {
    use EntityType::*;
    if src == Function && tgt == Function {
        Some(RelationshipType::Overrides)
    } else if matches!(src, Class | Struct) && matches!(tgt, Class | Struct) {
        Some(RelationshipType::Inherits)
    } else {
        None
    }
}

/// Builds the full node/edge set from every repo's parse result. Called
/// exactly once, globally, after every repo in the workspace has been
/// parsed (see the pipeline's orchestration).
pub fn build_graph(parse_results: &[(String, ParseResult)], catalog: &WorkspaceSymbolCatalog, config: &MapperConfig) -> BuildOutput {
    let mut out = BuildOutput::default();
    let mut node_index: HashMap<(String, String), usize> = HashMap::new();
    let mut edge_seen: HashSet<EdgeKey> = HashSet::new();
    let mut file_seen: HashSet<FileNode> = HashSet::new();

    for (repo_name, result) in parse_results {
        for sym in &result.symbols {
            if sym.disposition == Disposition::Drop {
                continue;
            }
            out.nodes_prepared += 1;
            match build_node(repo_name, sym, config) {
                Some(node) => upsert_node(&mut out.nodes, &mut node_index, node),
                None => out.drops.malformed_uri += 1,
            }
        }
    }

    for node in out.nodes.clone() {
        if node.is_external {
            continue;
        }
        let file = FileNode {
            repo_name: node.ingestion_repo.clone(),
            path: node.file_path.clone(),
        };
        if file_seen.insert(file.clone()) {
            out.files.push(file.clone());
        }
        out.defined_in.push(DefinedInEdge {
            owner_repo: node.owner_repo,
            scip_symbol: node.scip_symbol,
            file_repo: file.repo_name,
            file_path: file.path,
        });
    }

    for (repo_name, result) in parse_results {
        for sym in &result.symbols {
            if sym.disposition == Disposition::Drop {
                continue;
            }
            let Some(src_endpoint) = resolve_endpoint(&sym.scip_symbol, repo_name, catalog, config) else {
                continue;
            };

            for rel in &sym.relationships {
                let Some(tgt_endpoint) = resolve_endpoint(&rel.target_symbol, repo_name, catalog, config) else {
                    out.drops.malformed_uri += 1;
                    continue;
                };

                let mut classified = false;
                if rel.is_implementation {
                    if let Some(rt) = implementation_relationship(src_endpoint.entity_type, tgt_endpoint.entity_type) {
                        classified = true;
                        out.edges_prepared += 1;
                        push_edge(
                            &mut out.edges,
                            &mut edge_seen,
                            &mut out.drops,
                            rt,
                            &sym.scip_symbol,
                            &src_endpoint,
                            &rel.target_symbol,
                            &tgt_endpoint,
                        );
                    }
                }
                if rel.is_type_definition
                    && matches!(tgt_endpoint.entity_type, EntityType::Class | EntityType::Struct)
                    && matches!(src_endpoint.entity_type, EntityType::Function | EntityType::Class | EntityType::Struct)
                {
                    classified = true;
                    out.edges_prepared += 1;
                    push_edge(
                        &mut out.edges,
                        &mut edge_seen,
                        &mut out.drops,
                        RelationshipType::UsesType,
                        &sym.scip_symbol,
                        &src_endpoint,
                        &rel.target_symbol,
                        &tgt_endpoint,
                    );
                }
                if !classified {
                    out.drops.relationship_unclassified += 1;
                }
            }
        }

        for reference in &result.references {
            let Some(enclosing) = &reference.enclosing_symbol else {
                out.drops.calls_from_file += 1;
                continue;
            };
            let Some(enclosing_endpoint) = resolve_endpoint(enclosing, repo_name, catalog, config) else {
                out.drops.malformed_uri += 1;
                continue;
            };
            let Some(target_endpoint) = resolve_endpoint(&reference.scip_symbol, repo_name, catalog, config) else {
                out.drops.malformed_uri += 1;
                continue;
            };

            let rt = if matches!(target_endpoint.entity_type, EntityType::Class | EntityType::Struct) {
                Some(RelationshipType::UsesType)
            } else if enclosing_endpoint.entity_type == EntityType::Function && target_endpoint.entity_type == EntityType::Function {
                Some(RelationshipType::Calls)
            } else {
                None
            };

            out.edges_prepared += 1;
            match rt {
                Some(rt) => push_edge(
                    &mut out.edges,
                    &mut edge_seen,
                    &mut out.drops,
                    rt,
                    enclosing,
                    &enclosing_endpoint,
                    &reference.scip_symbol,
                    &target_endpoint,
                ),
                None => out.drops.reference_unclassified += 1,
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use scip_reader::{QuadRange, ScipRelationship};

    fn def(symbol: &str, file: &str, kind: ScipKind, disposition: Disposition) -> SymbolDef {
        SymbolDef {
            scip_symbol: symbol.to_string(),
            file_path: file.to_string(),
            kind,
            display_name: symbol.to_string(),
            definition_range: Some(QuadRange {
                start_line: 1,
                start_col: 0,
                end_line: 10,
                end_col: 1,
            }),
            relationships: Vec::new(),
            disposition,
        }
    }

    #[test]
    fn inherits_edge_from_implementation_relationship() {
        let base = "scip-clang . . . app/Base#";
        let derived = "scip-clang . . . app/Derived#";
        let mut derived_def = def(derived, "derived.cpp", ScipKind::Class, Disposition::Keep);
        derived_def.relationships.push(ScipRelationship {
            target_symbol: base.to_string(),
            is_reference: false,
            is_implementation: true,
            is_type_definition: false,
            is_definition: false,
        });
        let base_def = def(base, "base.cpp", ScipKind::Class, Disposition::Keep);

        let results = vec![(
            "repo_a".to_string(),
            ParseResult {
                symbols: vec![base_def, derived_def],
                ..Default::default()
            },
        )];
        let catalog = workspace_catalog::build_workspace_symbol_catalog(&results, None, &MapperConfig::default());
        let out = build_graph(&results, &catalog, &MapperConfig::default());

        assert_eq!(out.nodes.len(), 2);
        assert_eq!(out.edges.len(), 1);
        assert_eq!(out.edges[0].relationship_type, RelationshipType::Inherits);
    }

    #[test]
    fn call_reference_rejected_without_enclosing_symbol() {
        let caller = def("scip-clang . . . app/Main#run().", "main.cpp", ScipKind::Function, Disposition::Keep);
        let results = vec![(
            "repo_a".to_string(),
            ParseResult {
                symbols: vec![caller],
                references: vec![scip_reader::Reference {
                    scip_symbol: "scip-clang . . . app/Helper#go().".to_string(),
                    file_path: "main.cpp".to_string(),
                    enclosing_symbol: None,
                    role: scip_reader::RefRole::Call,
                    line: 5,
                }],
                ..Default::default()
            },
        )];
        let catalog = workspace_catalog::build_workspace_symbol_catalog(&results, None, &MapperConfig::default());
        let out = build_graph(&results, &catalog, &MapperConfig::default());

        assert_eq!(out.edges.len(), 0);
        assert_eq!(out.drops.calls_from_file, 1);
    }

    #[test]
    fn stub_target_edge_uses_resolved_owner() {
        let caller = def("scip-clang . . . app/Main#run().", "main.cpp", ScipKind::Function, Disposition::Keep);
        let results = vec![(
            "repo_a".to_string(),
            ParseResult {
                symbols: vec![caller],
                references: vec![scip_reader::Reference {
                    scip_symbol: "scip-clang . . . webrtc/RtpSender#send().".to_string(),
                    file_path: "main.cpp".to_string(),
                    enclosing_symbol: Some("scip-clang . . . app/Main#run().".to_string()),
                    role: scip_reader::RefRole::Call,
                    line: 5,
                }],
                ..Default::default()
            },
        )];
        let catalog = workspace_catalog::build_workspace_symbol_catalog(&results, None, &MapperConfig::default());
        let out = build_graph(&results, &catalog, &MapperConfig::default());

        assert_eq!(out.edges.len(), 1);
        assert_eq!(out.edges[0].relationship_type, RelationshipType::Calls);
        assert_eq!(out.edges[0].tgt_owner_repo, "repo_a");
    }
}

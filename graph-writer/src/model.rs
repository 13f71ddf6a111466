//! Graph node/edge types. Nodes are keyed by `(owner_repo, scip_symbol)`;
//! edges carry a label drawn from the closed relationship-type set.

use identity_contract::EntityType;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// The closed set of graph relationship types. Avoid renaming variants: the
/// string form is part of the Cypher this crate emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    Inherits,
    Overrides,
    Calls,
    UsesType,
    DefinedIn,
}

impl Display for RelationshipType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RelationshipType::Inherits => "INHERITS",
            RelationshipType::Overrides => "OVERRIDES",
            RelationshipType::Calls => "CALLS",
            RelationshipType::UsesType => "USES_TYPE",
            RelationshipType::DefinedIn => "DEFINED_IN",
        };
        f.write_str(s)
    }
}

/// A graph-side entity node. `owner_repo` is the catalog-resolved owner,
/// which may differ from `ingestion_repo` (the repo whose index run
/// produced this symbol) when the symbol is a stub from a monitored
/// namespace owned elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub global_uri: String,
    pub identity_key: String,
    pub owner_repo: String,
    pub ingestion_repo: String,
    pub file_path: String,
    pub entity_type: EntityType,
    pub entity_name: String,
    pub scip_symbol: String,
    pub function_sig_hash: Option<String>,
    pub is_external: bool,
}

impl GraphNode {
    pub fn key(&self) -> (String, String) {
        (self.owner_repo.clone(), self.scip_symbol.clone())
    }
}

/// A synthetic node representing a source file, used as the target of
/// `DEFINED_IN` edges.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileNode {
    pub repo_name: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub relationship_type: RelationshipType,
    pub src_owner_repo: String,
    pub src_scip_symbol: String,
    pub src_entity_type: EntityType,
    pub tgt_owner_repo: String,
    pub tgt_scip_symbol: String,
    pub tgt_entity_type: EntityType,
}

impl GraphEdge {
    pub fn key(&self) -> (RelationshipType, (String, String), (String, String)) {
        (
            self.relationship_type,
            (self.src_owner_repo.clone(), self.src_scip_symbol.clone()),
            (self.tgt_owner_repo.clone(), self.tgt_scip_symbol.clone()),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinedInEdge {
    pub owner_repo: String,
    pub scip_symbol: String,
    pub file_repo: String,
    pub file_path: String,
}

/// Validates that a relationship type is permitted between the given
/// endpoint entity types. `DEFINED_IN` is not checked here: its target is
/// always a `FileNode`, not an entity node, so it has no type pair.
pub fn allowed_pair(rel: RelationshipType, src: EntityType, tgt: EntityType) -> bool {
    use EntityType::*;
    match rel {
        RelationshipType::Inherits => matches!(src, Class | Struct) && matches!(tgt, Class | Struct),
        RelationshipType::Overrides => src == Function && tgt == Function,
        RelationshipType::Calls => src == Function && tgt == Function,
        RelationshipType::UsesType => matches!(src, Function | Class | Struct) && matches!(tgt, Class | Struct),
        RelationshipType::DefinedIn => true,
    }
}

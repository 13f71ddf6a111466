//! Neo4j-backed `GraphStore`, issuing batched `UNWIND $rows AS row MERGE ...`
//! Cypher over the bolt protocol via `neo4rs`.

use super::GraphStore;
use crate::errors::GraphWriteError;
use crate::model::{DefinedInEdge, FileNode, GraphEdge, GraphNode, RelationshipType};
use async_trait::async_trait;
use identity_contract::EntityType;
use neo4rs::{query, BoltList, BoltMap, BoltType, Graph};

pub struct Neo4jGraphStore {
    graph: Graph,
}

impl Neo4jGraphStore {
    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self, GraphWriteError> {
        let graph = Graph::new(uri, user, password)
            .await
            .map_err(|e| GraphWriteError::StoreUnavailable(e.to_string()))?;
        Ok(Self { graph })
    }
}

fn entity_label(entity_type: EntityType) -> &'static str {
    match entity_type {
        EntityType::Class => "Class",
        EntityType::Struct => "Struct",
        EntityType::Function => "Function",
    }
}

fn bolt_str(s: &str) -> BoltType {
    BoltType::String(s.into())
}

fn bolt_opt_str(s: &Option<String>) -> BoltType {
    match s {
        Some(v) => bolt_str(v),
        None => BoltType::Null(neo4rs::BoltNull),
    }
}

fn node_row(node: &GraphNode) -> BoltType {
    let mut row = BoltMap::new();
    row.put("owner_repo".into(), bolt_str(&node.owner_repo));
    row.put("scip_symbol".into(), bolt_str(&node.scip_symbol));
    row.put("global_uri".into(), bolt_str(&node.global_uri));
    row.put("identity_key".into(), bolt_str(&node.identity_key));
    row.put("ingestion_repo".into(), bolt_str(&node.ingestion_repo));
    row.put("file_path".into(), bolt_str(&node.file_path));
    row.put("entity_type".into(), bolt_str(entity_label(node.entity_type)));
    row.put("entity_name".into(), bolt_str(&node.entity_name));
    row.put("function_sig_hash".into(), bolt_opt_str(&node.function_sig_hash));
    row.put("is_external".into(), BoltType::Boolean(node.is_external.into()));
    BoltType::Map(row)
}

fn edge_row(edge: &GraphEdge) -> BoltType {
    let mut row = BoltMap::new();
    row.put("src_owner_repo".into(), bolt_str(&edge.src_owner_repo));
    row.put("src_scip_symbol".into(), bolt_str(&edge.src_scip_symbol));
    row.put("tgt_owner_repo".into(), bolt_str(&edge.tgt_owner_repo));
    row.put("tgt_scip_symbol".into(), bolt_str(&edge.tgt_scip_symbol));
    BoltType::Map(row)
}

fn file_row(file: &FileNode) -> BoltType {
    let mut row = BoltMap::new();
    row.put("repo_name".into(), bolt_str(&file.repo_name));
    row.put("path".into(), bolt_str(&file.path));
    BoltType::Map(row)
}

fn defined_in_row(edge: &DefinedInEdge) -> BoltType {
    let mut row = BoltMap::new();
    row.put("owner_repo".into(), bolt_str(&edge.owner_repo));
    row.put("scip_symbol".into(), bolt_str(&edge.scip_symbol));
    row.put("file_repo".into(), bolt_str(&edge.file_repo));
    row.put("file_path".into(), bolt_str(&edge.file_path));
    BoltType::Map(row)
}

fn rows_param(rows: Vec<BoltType>) -> BoltType {
    BoltType::List(BoltList::from(rows))
}

#[async_trait]
impl GraphStore for Neo4jGraphStore {
    async fn recreate(&self) -> Result<(), GraphWriteError> {
        self.graph
            .run(query("MATCH (n) DETACH DELETE n"))
            .await
            .map_err(|e| GraphWriteError::Other(e.to_string()))
    }

    async fn ensure_schema(&self) -> Result<(), GraphWriteError> {
        let statements = [
            "CREATE CONSTRAINT entity_owner_symbol IF NOT EXISTS FOR (n:Entity) REQUIRE (n.owner_repo, n.scip_symbol) IS UNIQUE",
            "CREATE INDEX entity_global_uri IF NOT EXISTS FOR (n:Entity) ON (n.global_uri)",
            "CREATE INDEX entity_entity_type IF NOT EXISTS FOR (n:Entity) ON (n.entity_type)",
            "CREATE INDEX entity_owner_repo IF NOT EXISTS FOR (n:Entity) ON (n.owner_repo)",
            "CREATE INDEX entity_file_path IF NOT EXISTS FOR (n:Entity) ON (n.file_path)",
            "CREATE CONSTRAINT file_repo_path IF NOT EXISTS FOR (f:File) REQUIRE (f.repo_name, f.path) IS UNIQUE",
        ];
        for stmt in statements {
            self.graph
                .run(query(stmt))
                .await
                .map_err(|e| GraphWriteError::Other(e.to_string()))?;
        }
        Ok(())
    }

    async fn merge_nodes(&self, entity_type: EntityType, nodes: &[GraphNode]) -> Result<usize, GraphWriteError> {
        if nodes.is_empty() {
            return Ok(0);
        }
        let label = entity_label(entity_type);
        let cypher = format!(
            "UNWIND $rows AS row \
             MERGE (n:Entity:{label} {{owner_repo: row.owner_repo, scip_symbol: row.scip_symbol}}) \
             SET n.global_uri = row.global_uri, \
                 n.identity_key = row.identity_key, \
                 n.file_path = row.file_path, \
                 n.entity_type = row.entity_type, \
                 n.entity_name = row.entity_name, \
                 n.function_sig_hash = row.function_sig_hash, \
                 n.is_external = row.is_external, \
                 n.ingestion_repo = coalesce(n.ingestion_repo, row.ingestion_repo)",
        );
        let rows: Vec<BoltType> = nodes.iter().map(node_row).collect();
        let count = rows.len();
        self.graph
            .run(query(&cypher).param("rows", rows_param(rows)))
            .await
            .map_err(to_write_error)?;
        Ok(count)
    }

    async fn merge_edges(&self, relationship_type: RelationshipType, edges: &[GraphEdge]) -> Result<usize, GraphWriteError> {
        if edges.is_empty() {
            return Ok(0);
        }
        let cypher = format!(
            "UNWIND $rows AS row \
             MATCH (s:Entity {{owner_repo: row.src_owner_repo, scip_symbol: row.src_scip_symbol}}) \
             MATCH (t:Entity {{owner_repo: row.tgt_owner_repo, scip_symbol: row.tgt_scip_symbol}}) \
             MERGE (s)-[:{relationship_type}]->(t)",
        );
        let rows: Vec<BoltType> = edges.iter().map(edge_row).collect();
        let count = rows.len();
        self.graph
            .run(query(&cypher).param("rows", rows_param(rows)))
            .await
            .map_err(to_write_error)?;
        Ok(count)
    }

    async fn merge_files(&self, files: &[FileNode]) -> Result<usize, GraphWriteError> {
        if files.is_empty() {
            return Ok(0);
        }
        let cypher = "UNWIND $rows AS row MERGE (f:File {repo_name: row.repo_name, path: row.path})";
        let rows: Vec<BoltType> = files.iter().map(file_row).collect();
        let count = rows.len();
        self.graph
            .run(query(cypher).param("rows", rows_param(rows)))
            .await
            .map_err(to_write_error)?;
        Ok(count)
    }

    async fn merge_defined_in(&self, edges: &[DefinedInEdge]) -> Result<usize, GraphWriteError> {
        if edges.is_empty() {
            return Ok(0);
        }
        let cypher = "UNWIND $rows AS row \
             MATCH (n:Entity {owner_repo: row.owner_repo, scip_symbol: row.scip_symbol}) \
             MATCH (f:File {repo_name: row.file_repo, path: row.file_path}) \
             MERGE (n)-[:DEFINED_IN]->(f)";
        let rows: Vec<BoltType> = edges.iter().map(defined_in_row).collect();
        let count = rows.len();
        self.graph
            .run(query(cypher).param("rows", rows_param(rows)))
            .await
            .map_err(to_write_error)?;
        Ok(count)
    }
}

fn to_write_error(err: neo4rs::Error) -> GraphWriteError {
    let msg = err.to_string();
    let transient = msg.contains("timeout") || msg.contains("connection") || msg.contains("unavailable");
    if transient {
        GraphWriteError::Transient(msg)
    } else {
        GraphWriteError::Other(msg)
    }
}

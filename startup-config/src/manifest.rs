//! Workspace manifest contract: the set of repositories a single indexing
//! run covers, and the workspace-wide store controls (§6).

use crate::errors::{ConfigError, ManifestParseSource, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

fn default_true() -> bool {
    true
}

fn default_source_subdir() -> String {
    ".".to_string()
}

fn default_repo_cache_dir() -> String {
    "output/workspace_repos".to_string()
}

fn default_index_dir() -> String {
    "output/workspace_scip".to_string()
}

fn default_entities_dir() -> String {
    "output/workspace_entities".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoSpec {
    pub repo_name: String,
    pub git_url: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub token_env: String,
    pub compdb_paths: Vec<String>,
    #[serde(default = "default_source_subdir")]
    pub source_subdir: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub run_vector: bool,
    #[serde(default = "default_true")]
    pub run_graph: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QdrantWorkspaceConfig {
    #[serde(default)]
    pub recreate_collection: bool,
    #[serde(default)]
    pub collection_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Neo4jWorkspaceConfig {
    #[serde(default)]
    pub recreate_graph: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceManifest {
    pub workspace_name: String,
    pub repos: Vec<RepoSpec>,
    #[serde(default = "default_repo_cache_dir")]
    pub repo_cache_dir: String,
    #[serde(default = "default_index_dir")]
    pub index_dir: String,
    #[serde(default = "default_entities_dir")]
    pub entities_dir: String,
    #[serde(default)]
    pub qdrant: QdrantWorkspaceConfig,
    #[serde(default)]
    pub neo4j: Neo4jWorkspaceConfig,
}

impl RepoSpec {
    fn validate(&self) -> Result<()> {
        if self.repo_name.trim().is_empty() {
            return Err(ConfigError::InvalidManifest("repo.repo_name is required".to_string()));
        }
        if self.git_url.trim().is_empty() {
            return Err(ConfigError::InvalidManifest(format!("repo '{}': git_url is required", self.repo_name)));
        }
        if self.git_ref.trim().is_empty() {
            return Err(ConfigError::InvalidManifest(format!("repo '{}': ref is required", self.repo_name)));
        }
        if self.token_env.trim().is_empty() {
            return Err(ConfigError::InvalidManifest(format!("repo '{}': token_env is required", self.repo_name)));
        }
        if self.compdb_paths.is_empty() {
            return Err(ConfigError::InvalidManifest(format!(
                "repo '{}': compdb_paths must be a non-empty list",
                self.repo_name
            )));
        }
        if self.compdb_paths.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigError::InvalidManifest(format!("repo '{}': compdb_paths contains an empty path", self.repo_name)));
        }
        Ok(())
    }

    /// Reads the repo's credential from its named env var, failing loudly
    /// rather than silently falling back to an anonymous clone.
    pub fn resolve_token(&self) -> Result<String> {
        std::env::var(&self.token_env).map_err(|_| ConfigError::MissingEnv(self.token_env.clone()))
    }

    pub fn resolve_compdb_path(&self, repo_checkout_dir: &Path) -> std::path::PathBuf {
        // `compdb_paths` entries are repo-relative by convention; callers that
        // need to iterate every configured path should map this over each one.
        let raw = Path::new(&self.compdb_paths[0]);
        if raw.is_absolute() {
            raw.to_path_buf()
        } else {
            repo_checkout_dir.join(raw)
        }
    }
}

fn load_payload(path: &Path) -> Result<WorkspaceManifest> {
    if !path.is_file() {
        return Err(ConfigError::ManifestNotFound(path.display().to_string()));
    }
    let text = fs::read_to_string(path).map_err(|e| ConfigError::InvalidManifest(e.to_string()))?;

    let is_json = path.extension().and_then(|e| e.to_str()).map(|e| e.eq_ignore_ascii_case("json")).unwrap_or(false);

    if is_json {
        serde_json::from_str(&text).map_err(|e| ConfigError::ManifestParse {
            path: path.display().to_string(),
            source: ManifestParseSource::Json(e),
        })
    } else {
        serde_yml::from_str(&text).map_err(|e| ConfigError::ManifestParse {
            path: path.display().to_string(),
            source: ManifestParseSource::Yaml(e),
        })
    }
}

/// Loads and validates a workspace manifest from a YAML or JSON file.
pub fn load_workspace_manifest(path: &Path) -> Result<WorkspaceManifest> {
    let manifest = load_payload(path)?;

    if manifest.workspace_name.trim().is_empty() {
        return Err(ConfigError::InvalidManifest("workspace_name is required".to_string()));
    }
    if manifest.repos.is_empty() {
        return Err(ConfigError::InvalidManifest("repos must be a non-empty list".to_string()));
    }

    let mut seen = HashSet::new();
    for repo in &manifest.repos {
        repo.validate()?;
        if !seen.insert(repo.repo_name.clone()) {
            return Err(ConfigError::InvalidManifest(format!("duplicate repo_name in manifest: {}", repo.repo_name)));
        }
    }

    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn loads_a_minimal_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("workspace.yaml");
        fs::write(
            &path,
            r#"
workspace_name: demo
repos:
  - repo_name: core
    git_url: https://example.com/core.git
    ref: main
    token_env: CORE_TOKEN
    compdb_paths:
      - build/compile_commands.json
"#,
        )
        .unwrap();

        let manifest = load_workspace_manifest(&path).unwrap();
        assert_eq!(manifest.workspace_name, "demo");
        assert_eq!(manifest.repos.len(), 1);
        assert_eq!(manifest.repos[0].git_ref, "main");
        assert!(manifest.repos[0].enabled);
    }

    #[test]
    fn rejects_duplicate_repo_names() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("workspace.yaml");
        fs::write(
            &path,
            r#"
workspace_name: demo
repos:
  - repo_name: core
    git_url: https://example.com/core.git
    ref: main
    token_env: CORE_TOKEN
    compdb_paths: ["build/compile_commands.json"]
  - repo_name: core
    git_url: https://example.com/core2.git
    ref: main
    token_env: CORE_TOKEN
    compdb_paths: ["build/compile_commands.json"]
"#,
        )
        .unwrap();

        let err = load_workspace_manifest(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidManifest(_)));
    }

    #[test]
    fn rejects_empty_compdb_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("workspace.yaml");
        fs::write(
            &path,
            r#"
workspace_name: demo
repos:
  - repo_name: core
    git_url: https://example.com/core.git
    ref: main
    token_env: CORE_TOKEN
    compdb_paths: []
"#,
        )
        .unwrap();

        let err = load_workspace_manifest(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidManifest(_)));
    }
}

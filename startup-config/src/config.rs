//! Process-wide startup configuration: store endpoints/credentials and the
//! strict/non-strict validation mode, resolved from the environment (and,
//! where a docker-compose file is present and env vars are silent, from the
//! deployment topology it describes).

use crate::compose::{env_flag, load_docker_compose_config, resolve_neo4j_auth, resolve_service_port};
use crate::errors::{ConfigError, Result};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub neo4j_uri: String,
    pub neo4j_user: String,
    pub neo4j_password: String,
    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
    pub embedding_endpoint: String,
    pub embedding_model: String,
    pub embedding_api_key: Option<String>,
    pub vector_dimension: usize,
    pub strict_validation: bool,
    pub use_mock_embedding: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            neo4j_uri: "bolt://127.0.0.1:7687".to_string(),
            neo4j_user: "neo4j".to_string(),
            neo4j_password: "testpassword123".to_string(),
            qdrant_url: "http://127.0.0.1:6334".to_string(),
            qdrant_api_key: None,
            embedding_endpoint: "http://127.0.0.1:11434".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_api_key: None,
            vector_dimension: 1536,
            strict_validation: false,
            use_mock_embedding: false,
        }
    }
}

impl EngineConfig {
    /// Resolves configuration from environment variables, falling back to a
    /// docker-compose file (if given) for anything an env var didn't cover,
    /// and finally to hardcoded defaults. `STRICT_CONFIG_VALIDATION=1` turns
    /// every fallback along that chain into a hard error instead.
    pub fn load_from_env_or_compose(compose_path: Option<&Path>) -> Result<Self> {
        let mut cfg = Self {
            strict_validation: crate::compose::resolve_strict_config_validation(),
            use_mock_embedding: env_flag("USE_MOCK_EMBEDDING", false),
            ..Self::default()
        };

        let compose = match compose_path {
            Some(path) => Some(load_docker_compose_config(path, cfg.strict_validation).map_err(|e| ConfigError::StrictValidation(e.to_string()))?),
            None => None,
        };

        if let Ok(uri) = std::env::var("NEO4J_URI") {
            cfg.neo4j_uri = uri;
        } else if let Some(compose) = &compose {
            if let Ok(port) = resolve_service_port(compose, "neo4j", 7687, 7687, cfg.strict_validation) {
                cfg.neo4j_uri = format!("bolt://127.0.0.1:{port}");
            }
        }

        if let Ok(auth) = std::env::var("NEO4J_AUTH") {
            if let Some((user, pass)) = auth.split_once('/') {
                cfg.neo4j_user = user.to_string();
                cfg.neo4j_password = pass.to_string();
            }
        } else if let Some(compose) = &compose {
            if let Ok((user, pass)) = resolve_neo4j_auth(compose, &cfg.neo4j_user, &cfg.neo4j_password, cfg.strict_validation) {
                cfg.neo4j_user = user;
                cfg.neo4j_password = pass;
            }
        }

        if let Ok(url) = std::env::var("QDRANT_URL") {
            cfg.qdrant_url = url;
        } else if let Some(compose) = &compose {
            if let Ok(port) = resolve_service_port(compose, "qdrant", 6334, 6334, cfg.strict_validation) {
                cfg.qdrant_url = format!("http://127.0.0.1:{port}");
            }
        }
        cfg.qdrant_api_key = std::env::var("QDRANT_API_KEY").ok();

        if let Ok(endpoint) = std::env::var("EMBEDDING_ENDPOINT") {
            cfg.embedding_endpoint = endpoint;
        }
        if let Ok(model) = std::env::var("EMBEDDING_MODEL") {
            cfg.embedding_model = model;
        }
        cfg.embedding_api_key = std::env::var("EMBEDDING_API_KEY").ok();
        if let Ok(dim) = std::env::var("VECTOR_DIMENSION") {
            cfg.vector_dimension = dim.parse().map_err(|_| ConfigError::InvalidManifest("VECTOR_DIMENSION must be an integer".to_string()))?;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.vector_dimension == 0 {
            return Err(ConfigError::InvalidManifest("vector_dimension must be non-zero".to_string()));
        }
        if self.neo4j_uri.trim().is_empty() {
            return Err(ConfigError::InvalidManifest("neo4j_uri must not be empty".to_string()));
        }
        if self.qdrant_url.trim().is_empty() {
            return Err(ConfigError::InvalidManifest("qdrant_url must not be empty".to_string()));
        }
        if self.strict_validation && !self.use_mock_embedding && self.embedding_api_key.is_none() {
            return Err(ConfigError::MissingEnv("EMBEDDING_API_KEY".to_string()));
        }
        Ok(())
    }

    pub fn default_compose_path() -> PathBuf {
        PathBuf::from("docker-compose.yml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_internally_consistent() {
        let cfg = EngineConfig::default();
        assert!(cfg.validate().is_ok());
    }
}

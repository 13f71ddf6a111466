//! Strict/non-strict docker-compose parsing, used by runtime startup checks
//! to derive deployment-topology endpoints (service ports, Neo4j auth) when
//! no explicit override is set via environment variables.
//!
//! Non-strict mode (the default) logs a warning and falls back to the
//! caller's default on any parse or lookup failure. Strict mode
//! (`STRICT_CONFIG_VALIDATION=1`) turns every one of those into a hard
//! error, for deployments that want to fail fast on a malformed compose
//! file rather than silently run with guessed defaults.

use serde_yml::Value;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("docker compose file not found: {0}")]
    NotFound(String),
    #[error("failed to parse docker compose yaml at {path}: {source}")]
    Parse { path: String, source: serde_yml::Error },
    #[error("docker compose file is empty: {0}")]
    Empty(String),
    #[error("unexpected docker compose payload type at {0}")]
    WrongType(String),
    #[error("docker-compose missing 'services' section")]
    MissingServices,
    #[error("docker-compose missing service '{0}'")]
    MissingService(String),
    #[error("service '{0}' has invalid 'ports' section")]
    InvalidPorts(String),
    #[error("service '{service}' has no mapping for container port {container_port}")]
    NoPortMapping { service: String, container_port: u16 },
    #[error("neo4j.environment must be list or dict")]
    InvalidEnvironment,
    #[error("NEO4J_AUTH must be '<username>/<password>'")]
    MalformedNeo4jAuth,
    #[error("NEO4J_AUTH contains empty username or password")]
    EmptyNeo4jAuth,
    #[error("NEO4J_AUTH not found in neo4j service environment")]
    MissingNeo4jAuth,
}

pub fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(raw) => matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

pub fn resolve_strict_config_validation() -> bool {
    env_flag("STRICT_CONFIG_VALIDATION", false)
}

/// Loads and parses a docker-compose file. Non-strict: returns an empty
/// mapping on any failure, after logging a warning. Strict: propagates the
/// failure as a `ComposeError`.
pub fn load_docker_compose_config(compose_path: &Path, strict: bool) -> Result<Value, ComposeError> {
    let text = match std::fs::read_to_string(compose_path) {
        Ok(t) => t,
        Err(_) => {
            let msg = format!("docker compose file not found: {}", compose_path.display());
            if strict {
                return Err(ComposeError::NotFound(compose_path.display().to_string()));
            }
            warn!("{msg}; continuing with defaults");
            return Ok(Value::Mapping(Default::default()));
        }
    };

    let payload: Value = match serde_yml::from_str(&text) {
        Ok(v) => v,
        Err(source) => {
            if strict {
                return Err(ComposeError::Parse {
                    path: compose_path.display().to_string(),
                    source,
                });
            }
            warn!(path = %compose_path.display(), "failed to parse docker compose yaml; continuing with defaults");
            return Ok(Value::Mapping(Default::default()));
        }
    };

    match &payload {
        Value::Null => {
            if strict {
                return Err(ComposeError::Empty(compose_path.display().to_string()));
            }
            warn!(path = %compose_path.display(), "docker compose file is empty; continuing with defaults");
            Ok(Value::Mapping(Default::default()))
        }
        Value::Mapping(_) => Ok(payload),
        _ => {
            if strict {
                return Err(ComposeError::WrongType(compose_path.display().to_string()));
            }
            warn!(path = %compose_path.display(), "unexpected docker compose payload type; continuing with defaults");
            Ok(Value::Mapping(Default::default()))
        }
    }
}

pub fn get_service_config(compose: &Value, service_name: &str, strict: bool) -> Result<Value, ComposeError> {
    let services = compose.get("services");
    let Some(services) = services.filter(|v| v.is_mapping()) else {
        if strict {
            return Err(ComposeError::MissingServices);
        }
        warn!("docker-compose missing 'services' section; using defaults");
        return Ok(Value::Mapping(Default::default()));
    };

    let service = services.get(service_name);
    let Some(service) = service.filter(|v| v.is_mapping()) else {
        if strict {
            return Err(ComposeError::MissingService(service_name.to_string()));
        }
        warn!(service = service_name, "docker-compose missing service; using defaults");
        return Ok(Value::Mapping(Default::default()));
    };
    Ok(service.clone())
}

fn parse_port_mapping(mapping: &Value) -> Option<(u16, u16)> {
    let text = match mapping {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let text = text.trim().trim_matches('"').trim_matches('\'');
    let text = text.split('/').next().unwrap_or(text);

    if !text.contains(':') {
        return text.parse::<u16>().ok().map(|p| (p, p));
    }

    let parts: Vec<&str> = text.split(':').collect();
    if parts.len() < 2 {
        return None;
    }
    let host_port = parts[parts.len() - 2].parse::<u16>().ok()?;
    let container_port = parts[parts.len() - 1].parse::<u16>().ok()?;
    Some((host_port, container_port))
}

pub fn resolve_service_port(compose: &Value, service_name: &str, container_port: u16, default_port: u16, strict: bool) -> Result<u16, ComposeError> {
    let service = get_service_config(compose, service_name, strict)?;
    let Some(ports) = service.get("ports").filter(|v| v.is_sequence()) else {
        if strict {
            return Err(ComposeError::InvalidPorts(service_name.to_string()));
        }
        warn!(service = service_name, default_port, "invalid or missing 'ports' section; using default");
        return Ok(default_port);
    };

    for mapping in ports.as_sequence().into_iter().flatten() {
        if let Some((host, container)) = parse_port_mapping(mapping) {
            if container == container_port {
                return Ok(host);
            }
        }
    }

    if strict {
        return Err(ComposeError::NoPortMapping {
            service: service_name.to_string(),
            container_port,
        });
    }
    warn!(service = service_name, container_port, default_port, "no port mapping found; using default");
    Ok(default_port)
}

pub fn resolve_neo4j_auth(compose: &Value, default_username: &str, default_password: &str, strict: bool) -> Result<(String, String), ComposeError> {
    let service = get_service_config(compose, "neo4j", strict)?;
    let env_value = service.get("environment");

    let entries: Vec<String> = match env_value {
        Some(Value::Sequence(items)) => items.iter().filter_map(value_to_string).collect(),
        Some(Value::Mapping(map)) => map
            .iter()
            .filter_map(|(k, v)| Some(format!("{}={}", value_to_string(k)?, value_to_string(v).unwrap_or_default())))
            .collect(),
        Some(other) if !matches!(other, Value::Null) => {
            if strict {
                return Err(ComposeError::InvalidEnvironment);
            }
            warn!("neo4j.environment must be list or dict; using default auth");
            return Ok((default_username.to_string(), default_password.to_string()));
        }
        _ => Vec::new(),
    };

    for entry in &entries {
        let Some(raw) = entry.strip_prefix("NEO4J_AUTH=") else {
            continue;
        };
        let Some((username, password)) = raw.split_once('/') else {
            if strict {
                return Err(ComposeError::MalformedNeo4jAuth);
            }
            warn!("NEO4J_AUTH must be '<username>/<password>'; using default auth");
            return Ok((default_username.to_string(), default_password.to_string()));
        };
        if username.is_empty() || password.is_empty() {
            if strict {
                return Err(ComposeError::EmptyNeo4jAuth);
            }
            warn!("NEO4J_AUTH contains empty username or password; using default auth");
            return Ok((default_username.to_string(), default_password.to_string()));
        }
        return Ok((username.to_string(), password.to_string()));
    }

    if strict {
        return Err(ComposeError::MissingNeo4jAuth);
    }
    warn!("NEO4J_AUTH not found in neo4j service environment; using default auth");
    Ok((default_username.to_string(), default_password.to_string()))
}

fn value_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Validates that every service in `required_services` is present in the
/// compose file, returning a summary of what was found missing.
pub fn validate_startup_config(compose_path: &Path, required_services: &[&str], strict: bool) -> Result<BTreeMap<String, Vec<String>>, ComposeError> {
    let compose = load_docker_compose_config(compose_path, strict)?;
    let services = compose.get("services").and_then(|v| v.as_mapping());

    let mut missing = Vec::new();
    for service in required_services {
        let present = services.map(|m| m.iter().any(|(k, _)| k.as_str() == Some(*service))).unwrap_or(false);
        if !present {
            missing.push(service.to_string());
        }
    }

    if !missing.is_empty() {
        if strict {
            return Err(ComposeError::MissingServices);
        }
        warn!(missing = ?missing, "missing services in docker-compose; defaults may be used");
    }

    let mut summary = BTreeMap::new();
    summary.insert("missing_services".to_string(), missing);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_compose(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("docker-compose.yml");
        fs::write(
            &path,
            r#"
services:
  neo4j:
    ports:
      - "7688:7687"
    environment:
      - NEO4J_AUTH=neo4j/supersecret
  qdrant:
    ports:
      - "6333:6333"
"#,
        )
        .unwrap();
        path
    }

    #[test]
    fn resolves_mapped_port() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_compose(tmp.path());
        let compose = load_docker_compose_config(&path, true).unwrap();
        let port = resolve_service_port(&compose, "neo4j", 7687, 7687, true).unwrap();
        assert_eq!(port, 7688);
    }

    #[test]
    fn resolves_neo4j_auth_from_environment() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_compose(tmp.path());
        let compose = load_docker_compose_config(&path, true).unwrap();
        let (user, pass) = resolve_neo4j_auth(&compose, "neo4j", "testpassword123", true).unwrap();
        assert_eq!(user, "neo4j");
        assert_eq!(pass, "supersecret");
    }

    #[test]
    fn non_strict_mode_falls_back_on_missing_file() {
        let compose = load_docker_compose_config(Path::new("/does/not/exist.yml"), false).unwrap();
        assert!(compose.as_mapping().unwrap().is_empty());
    }

    #[test]
    fn strict_mode_errors_on_missing_file() {
        let err = load_docker_compose_config(Path::new("/does/not/exist.yml"), true).unwrap_err();
        assert!(matches!(err, ComposeError::NotFound(_)));
    }
}

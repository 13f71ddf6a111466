//! Global URI contract: the cross-store identity scheme for code entities.
//!
//! Layout: `RepoName::FilePath::EntityType::EntityName[::sig_<hex>]`. See
//! `build_global_uri` / `parse_global_uri` for the construction and recovery
//! halves of the contract, and `make_signature_hash` for the overload
//! discriminator.

use once_cell::sync::Lazy;
use regex::Regex;
use sha1::{Digest, Sha1};
use std::fmt;
use thiserror::Error;

pub const URI_SEPARATOR: &str = "::";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum EntityType {
    Class,
    Struct,
    Function,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityType::Class => "Class",
            EntityType::Struct => "Struct",
            EntityType::Function => "Function",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for EntityType {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Class" => Ok(EntityType::Class),
            "Struct" => Ok(EntityType::Struct),
            "Function" => Ok(EntityType::Function),
            other => Err(IdentityError::UnknownEntityType(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("malformed global uri: {0}")]
    MalformedUri(String),
    #[error("unknown entity type: {0}")]
    UnknownEntityType(String),
}

pub type Result<T> = std::result::Result<T, IdentityError>;

static SCOPE_SEPARATOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*::\s*").unwrap());
static DESTRUCTOR_SPACING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"::\s*~").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static SIG_HASH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^sig_[0-9a-f]{8,40}$").unwrap());

/// Strips outer whitespace, collapses internal runs to single spaces,
/// removes whitespace around `::`, and rewrites `::  ~Name` as `::~Name`.
/// Idempotent: re-canonicalizing an already-canonical name is a no-op.
pub fn canonicalize_name(raw: &str) -> String {
    let trimmed = raw.trim();
    let collapsed = WHITESPACE_RE.replace_all(trimmed, " ");
    let scope_tight = SCOPE_SEPARATOR_RE.replace_all(&collapsed, "::");
    let dtor_tight = DESTRUCTOR_SPACING_RE.replace_all(&scope_tight, "::~");
    dtor_tight.into_owned()
}

/// `sig_<hex12..40>` derived from a SHA-1 of the canonicalized signature
/// source (text after the first `{` or `;` is discarded before hashing).
pub fn make_signature_hash(sig_source: &str, length: usize) -> String {
    let length = length.clamp(8, 40);
    let body_end = sig_source
        .find(['{', ';'])
        .unwrap_or(sig_source.len());
    let truncated = &sig_source[..body_end];
    let canonical = canonicalize_name(truncated);
    let canonical = if canonical.is_empty() {
        "<empty-signature>".to_string()
    } else {
        canonical
    };

    let mut hasher = Sha1::new();
    hasher.update(canonical.as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    format!("sig_{}", &hex[..length.min(hex.len())])
}

/// Builds a Global URI. When `entity_type == Function` and `function_sig_hash`
/// is supplied, appends it as a trailing `::sig_<hex>` segment.
pub fn build_global_uri(
    repo: &str,
    file_path: &str,
    entity_type: EntityType,
    entity_name: &str,
    function_sig_hash: Option<&str>,
) -> String {
    let canonical_name = canonicalize_name(entity_name);
    let base = format!(
        "{}{}{}{}{}{}{}",
        repo, URI_SEPARATOR, file_path, URI_SEPARATOR, entity_type, URI_SEPARATOR, canonical_name
    );
    match (entity_type, function_sig_hash) {
        (EntityType::Function, Some(hash)) if !hash.is_empty() => {
            format!("{}{}{}", base, URI_SEPARATOR, hash)
        }
        _ => base,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalUriParts {
    pub repo_name: String,
    pub file_path: String,
    pub entity_type: EntityType,
    pub entity_name: String,
    pub signature_hash: Option<String>,
}

/// Splits a Global URI back into its parts. Requires at least four `::`
/// segments. If the entity type is `Function` and the final segment matches
/// `sig_[0-9a-f]{8,40}`, it is peeled off as `signature_hash`.
pub fn parse_global_uri(uri: &str) -> Result<GlobalUriParts> {
    let parts: Vec<&str> = uri.split(URI_SEPARATOR).collect();
    if parts.len() < 4 {
        return Err(IdentityError::MalformedUri(uri.to_string()));
    }

    let repo_name = parts[0].to_string();
    let file_path = parts[1].to_string();
    let entity_type: EntityType = parts[2].parse()?;

    let mut name_parts = parts[3..].to_vec();
    let mut signature_hash = None;
    if entity_type == EntityType::Function {
        if let Some(last) = name_parts.last() {
            if SIG_HASH_RE.is_match(last) {
                signature_hash = Some((*last).to_string());
                name_parts.pop();
            }
        }
    }

    if name_parts.is_empty() {
        return Err(IdentityError::MalformedUri(uri.to_string()));
    }

    Ok(GlobalUriParts {
        repo_name,
        file_path,
        entity_type,
        entity_name: name_parts.join(URI_SEPARATOR),
        signature_hash,
    })
}

/// `identity_key = global_uri` or, when a signature hash is present,
/// `global_uri::signature_hash`.
pub fn build_identity_key(global_uri: &str, signature_hash: Option<&str>) -> String {
    match signature_hash {
        Some(hash) if !hash.is_empty() => format!("{}{}{}", global_uri, URI_SEPARATOR, hash),
        _ => global_uri.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_is_idempotent() {
        let raw = "  Foo :: Bar  ::~Baz   qux  ";
        let once = canonicalize_name(raw);
        let twice = canonicalize_name(&once);
        assert_eq!(once, twice);
        assert_eq!(once, "Foo::Bar::~Baz qux");
    }

    #[test]
    fn roundtrip_without_signature() {
        let uri = build_global_uri("repo_a", "math.cpp", EntityType::Class, "Widget", None);
        let parts = parse_global_uri(&uri).unwrap();
        assert_eq!(parts.repo_name, "repo_a");
        assert_eq!(parts.file_path, "math.cpp");
        assert_eq!(parts.entity_type, EntityType::Class);
        assert_eq!(parts.entity_name, "Widget");
        assert!(parts.signature_hash.is_none());
    }

    #[test]
    fn roundtrip_with_signature() {
        let hash = make_signature_hash("int add(int a, int b)", 12);
        let uri = build_global_uri(
            "repo_a",
            "math.cpp",
            EntityType::Function,
            "add",
            Some(&hash),
        );
        let parts = parse_global_uri(&uri).unwrap();
        assert_eq!(parts.entity_name, "add");
        assert_eq!(parts.signature_hash.as_deref(), Some(hash.as_str()));
    }

    #[test]
    fn qualified_name_with_scope_survives_roundtrip() {
        let uri = build_global_uri("repo_a", "foo.cpp", EntityType::Function, "Outer::inner", None);
        let parts = parse_global_uri(&uri).unwrap();
        assert_eq!(parts.entity_name, "Outer::inner");
    }

    #[test]
    fn malformed_uri_rejected() {
        assert!(parse_global_uri("repo::file::Function").is_err());
    }

    #[test]
    fn overloads_get_distinct_identity_keys_and_ids() {
        let uri = build_global_uri("repo_a", "math.cpp", EntityType::Function, "add", None);
        let h1 = make_signature_hash("int add(int)", 12);
        let h2 = make_signature_hash("int add(double)", 12);
        assert_ne!(h1, h2);
        let k1 = build_identity_key(&uri, Some(&h1));
        let k2 = build_identity_key(&uri, Some(&h2));
        assert_ne!(k1, k2);

        let id1 = uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_URL, k1.as_bytes());
        let id2 = uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_URL, k2.as_bytes());
        assert_ne!(id1, id2);
    }

    #[test]
    fn empty_signature_source_hashes_placeholder() {
        let h = make_signature_hash("", 12);
        let h2 = make_signature_hash("   ", 12);
        assert_eq!(h, h2);
    }
}

//! Parses SCIP symbol strings into structured parts and classifies them as
//! keep/drop/stub based on namespace configuration.
//!
//! The descriptor-tail grammar is walked left to right; see `parse_descriptor`
//! for the character-level state machine.

use identity_contract::{build_global_uri, make_signature_hash, EntityType};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SymbolError {
    #[error("local symbol")]
    Local,
    #[error("file-scope symbol")]
    FileScope,
    #[error("macro symbol")]
    Macro,
    #[error("unparseable descriptor: {0}")]
    Unparseable(String),
}

pub type Result<T> = std::result::Result<T, SymbolError>;

/// SCIP `SymbolInformation.Kind`, narrowed to the values this engine cares
/// about. Translating the real protobuf enum into this type is the SCIP
/// Reader's job, keeping this crate protobuf-agnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScipKind {
    Namespace,
    Variable,
    Parameter,
    TypeParameter,
    Field,
    Enum,
    EnumMember,
    Macro,
    TypeAlias,
    Struct,
    Union,
    Class,
    Function,
    Method,
    Unspecified,
    Other(i32),
}

impl ScipKind {
    fn is_droppable(&self) -> bool {
        matches!(
            self,
            ScipKind::Namespace
                | ScipKind::Variable
                | ScipKind::Parameter
                | ScipKind::TypeParameter
                | ScipKind::Field
                | ScipKind::Enum
                | ScipKind::EnumMember
                | ScipKind::Macro
                | ScipKind::TypeAlias
        )
    }

    fn is_struct_like(&self) -> bool {
        matches!(self, ScipKind::Struct | ScipKind::Union)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedScipSymbol {
    pub scheme: String,
    pub package_manager: String,
    pub package_name: String,
    pub package_version: String,
    pub namespace_parts: Vec<String>,
    pub entity_type: EntityType,
    pub entity_name: String,
    pub function_sig_hash: Option<String>,
    pub is_external: bool,
    pub first_namespace: Option<String>,
}

static DISAMBIG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-zA-Z_-]{4,64}$").unwrap());

const DESCRIPTOR_DELIMITERS: &[char] = &['/', '#', '.', '!', '('];

fn derive_function_sig_hash(disambig: &str) -> String {
    if DISAMBIG_RE.is_match(disambig) {
        format!("sig_{}", disambig.to_lowercase())
    } else {
        make_signature_hash(disambig, 12)
    }
}

struct DescriptorOutcome {
    namespace_parts: Vec<String>,
    entity_type: EntityType,
    entity_name: String,
    function_sig_hash: Option<String>,
}

fn parse_descriptor(descriptor: &str, kind: ScipKind) -> Result<DescriptorOutcome> {
    let chars: Vec<char> = descriptor.chars().collect();
    let mut i = 0usize;
    let mut namespace_parts: Vec<String> = Vec::new();
    let mut entity_type = EntityType::Class;
    let mut entity_name = String::new();
    let mut function_sig_hash: Option<String> = None;

    if chars.is_empty() {
        return Err(SymbolError::Unparseable(descriptor.to_string()));
    }

    while i < chars.len() {
        let name: String;
        if chars[i] == '`' {
            i += 1;
            let start = i;
            while i < chars.len() && chars[i] != '`' {
                i += 1;
            }
            name = chars[start..i].iter().collect();
            if i < chars.len() {
                i += 1; // closing backtick
            } else {
                return Err(SymbolError::Unparseable(descriptor.to_string()));
            }
        } else {
            let start = i;
            while i < chars.len() && !DESCRIPTOR_DELIMITERS.contains(&chars[i]) {
                i += 1;
            }
            name = chars[start..i].iter().collect();
        }

        if i >= chars.len() {
            return Err(SymbolError::Unparseable(descriptor.to_string()));
        }

        let delim = chars[i];
        i += 1;

        match delim {
            '/' => namespace_parts.push(name),
            '#' => {
                entity_type = if kind.is_struct_like() {
                    EntityType::Struct
                } else {
                    EntityType::Class
                };
                if i < chars.len() {
                    namespace_parts.push(name);
                } else {
                    entity_name = name;
                }
            }
            '(' => {
                let dstart = i;
                while i < chars.len() && chars[i] != ')' {
                    i += 1;
                }
                let disambig: String = chars[dstart..i].iter().collect();
                if i < chars.len() {
                    i += 1; // ')'
                }
                if i < chars.len() && chars[i] == '.' {
                    i += 1;
                }
                entity_type = EntityType::Function;
                entity_name = name;
                function_sig_hash = Some(derive_function_sig_hash(&disambig));
            }
            '.' => {
                entity_type = EntityType::Function;
                entity_name = name;
            }
            '!' => return Err(SymbolError::Macro),
            _ => unreachable!("delimiter set is exhaustive"),
        }
    }

    if entity_name.is_empty() {
        return Err(SymbolError::Unparseable(descriptor.to_string()));
    }

    Ok(DescriptorOutcome {
        namespace_parts,
        entity_type,
        entity_name,
        function_sig_hash,
    })
}

#[derive(Debug, Clone)]
pub struct MapperConfig {
    pub ignored_namespaces: HashSet<String>,
    pub monitored_namespaces: HashSet<String>,
    pub monitored_namespace_owner_repos: HashMap<String, String>,
}

impl Default for MapperConfig {
    fn default() -> Self {
        let ignored = [
            "std",
            "__gnu_cxx",
            "__cxxabiv1",
            "__gnu_debug",
            "boost",
            "__sanitizer",
            "__asan",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let monitored = ["YAML", "webrtc", "rtc", "game_hook", "common", "models"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        Self {
            ignored_namespaces: ignored,
            monitored_namespaces: monitored,
            monitored_namespace_owner_repos: HashMap::new(),
        }
    }
}

/// Parses a raw SCIP symbol string. Local symbols (`"local "` prefix),
/// file-scope symbols (`<file>/...`), and macros are rejected up front.
pub fn parse_scip_symbol(symbol: &str, kind: ScipKind, config: &MapperConfig) -> Result<ParsedScipSymbol> {
    if symbol.starts_with("local ") {
        return Err(SymbolError::Local);
    }
    if symbol.starts_with("<file>/") {
        return Err(SymbolError::FileScope);
    }

    let mut tokens = symbol.splitn(5, ' ');
    let scheme = tokens.next().unwrap_or_default().to_string();
    let package_manager = tokens.next().unwrap_or_default().to_string();
    let package_name = tokens.next().unwrap_or_default().to_string();
    let package_version = tokens.next().unwrap_or_default().to_string();
    let descriptor = tokens.next().unwrap_or_default();

    if package_version.is_empty() || descriptor.is_empty() {
        return Err(SymbolError::Unparseable(symbol.to_string()));
    }

    let outcome = parse_descriptor(descriptor, kind)?;
    let first_namespace = outcome.namespace_parts.first().cloned();

    let is_package_local = package_name == ".";
    let is_monitored = first_namespace
        .as_deref()
        .map(|ns| config.monitored_namespaces.contains(ns))
        .unwrap_or(false);
    let is_external = !is_package_local || !is_monitored;

    Ok(ParsedScipSymbol {
        scheme,
        package_manager,
        package_name,
        package_version,
        namespace_parts: outcome.namespace_parts,
        entity_type: outcome.entity_type,
        entity_name: outcome.entity_name,
        function_sig_hash: outcome.function_sig_hash,
        is_external,
        first_namespace,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Keep,
    Drop,
    Stub,
}

/// `classify_symbol`: decides the fate of a SCIP symbol from its namespace
/// and whether it was locally defined anywhere in this parse run.
pub fn classify_symbol(
    scip_symbol: &str,
    kind: ScipKind,
    is_local_definition: bool,
    config: &MapperConfig,
) -> Disposition {
    let parsed = match kind_droppable_precheck(scip_symbol, kind, config) {
        Some(d) => return d,
        None => match parse_scip_symbol(scip_symbol, kind, config) {
            Ok(p) => p,
            Err(_) => return Disposition::Drop,
        },
    };

    let Some(ns) = parsed.first_namespace.as_deref() else {
        return Disposition::Keep;
    };

    if config.ignored_namespaces.contains(ns) {
        return Disposition::Drop;
    }
    if config.monitored_namespaces.contains(ns) {
        return if is_local_definition {
            Disposition::Keep
        } else {
            Disposition::Stub
        };
    }
    Disposition::Keep
}

/// Kind-driven drop check that short-circuits parsing. `None` means "kind
/// doesn't force a drop, proceed to parse and classify by namespace."
fn kind_droppable_precheck(_symbol: &str, kind: ScipKind, _config: &MapperConfig) -> Option<Disposition> {
    if kind.is_droppable() {
        Some(Disposition::Drop)
    } else {
        None
    }
}

pub fn should_drop_symbol(scip_symbol: &str, is_local_definition: bool) -> bool {
    classify_symbol(
        scip_symbol,
        ScipKind::Unspecified,
        is_local_definition,
        &MapperConfig::default(),
    ) == Disposition::Drop
}

/// Resolves the repo that owns a monitored-namespace symbol, falling back to
/// `current_repo` when no explicit owner mapping exists.
pub fn resolve_owner_repo(scip_symbol: &str, current_repo: &str, config: &MapperConfig) -> String {
    match parse_scip_symbol(scip_symbol, ScipKind::Unspecified, config) {
        Ok(parsed) => parsed
            .first_namespace
            .as_deref()
            .and_then(|ns| config.monitored_namespace_owner_repos.get(ns))
            .cloned()
            .unwrap_or_else(|| current_repo.to_string()),
        Err(_) => current_repo.to_string(),
    }
}

pub fn qualified_entity_name(parsed: &ParsedScipSymbol) -> String {
    full_entity_name(parsed)
}

fn full_entity_name(parsed: &ParsedScipSymbol) -> String {
    if parsed.namespace_parts.is_empty() {
        parsed.entity_name.clone()
    } else {
        format!("{}::{}", parsed.namespace_parts.join("::"), parsed.entity_name)
    }
}

/// Converts a SCIP symbol into its Global URI. External symbols with no
/// known file path are anchored to `<external>`.
pub fn to_global_uri(
    scip_symbol: &str,
    file_path: Option<&str>,
    repo: &str,
    kind: ScipKind,
    include_function_sig: bool,
    config: &MapperConfig,
) -> Option<String> {
    let parsed = parse_scip_symbol(scip_symbol, kind, config).ok()?;
    let name = full_entity_name(&parsed);
    let sig = if include_function_sig {
        parsed.function_sig_hash.as_deref()
    } else {
        None
    };
    let file = file_path.unwrap_or("<external>");
    Some(build_global_uri(repo, file, parsed.entity_type, &name, sig))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> MapperConfig {
        MapperConfig::default()
    }

    #[test]
    fn ignored_namespace_drops() {
        let symbol = "scip-clang . . . std/vector#";
        assert_eq!(
            classify_symbol(symbol, ScipKind::Struct, true, &cfg()),
            Disposition::Drop
        );
    }

    #[test]
    fn monitored_non_local_is_stub() {
        let symbol = "scip-clang . . . webrtc/RtpSender#";
        assert_eq!(
            classify_symbol(symbol, ScipKind::Class, false, &cfg()),
            Disposition::Stub
        );
    }

    #[test]
    fn monitored_local_is_keep() {
        let symbol = "scip-clang . . . webrtc/RtpSender#";
        assert_eq!(
            classify_symbol(symbol, ScipKind::Class, true, &cfg()),
            Disposition::Keep
        );
    }

    #[test]
    fn unmonitored_unignored_is_keep() {
        let symbol = "scip-clang . . . app/Widget#";
        assert_eq!(
            classify_symbol(symbol, ScipKind::Class, false, &cfg()),
            Disposition::Keep
        );
    }

    #[test]
    fn droppable_kind_drops_regardless_of_namespace() {
        let symbol = "scip-clang . . . app/Widget#field.";
        assert_eq!(
            classify_symbol(symbol, ScipKind::Field, true, &cfg()),
            Disposition::Drop
        );
    }

    #[test]
    fn local_prefixed_symbol_drops() {
        let symbol = "local 5";
        assert_eq!(
            classify_symbol(symbol, ScipKind::Variable, true, &cfg()),
            Disposition::Drop
        );
    }

    #[test]
    fn macro_drops() {
        let symbol = "scip-clang . . . MY_MACRO!";
        assert!(parse_scip_symbol(symbol, ScipKind::Macro, &cfg()).is_err());
    }

    #[test]
    fn function_descriptor_parses_and_hashes() {
        let symbol = "scip-clang . . . app/Math#add(aaaa1111).";
        let parsed = parse_scip_symbol(symbol, ScipKind::Method, &cfg()).unwrap();
        assert_eq!(parsed.entity_type, EntityType::Function);
        assert_eq!(parsed.entity_name, "add");
        assert_eq!(parsed.function_sig_hash.as_deref(), Some("sig_aaaa1111"));
        assert_eq!(parsed.namespace_parts, vec!["app".to_string(), "Math".to_string()]);
    }

    #[test]
    fn backtick_escaped_names_consumed_verbatim() {
        let symbol = "scip-clang . . . `operator ==`().";
        let parsed = parse_scip_symbol(symbol, ScipKind::Function, &cfg()).unwrap();
        assert_eq!(parsed.entity_name, "operator ==");
    }

    #[test]
    fn to_global_uri_builds_expected_shape() {
        let symbol = "scip-clang . . . app/Widget#";
        let uri = to_global_uri(symbol, Some("widget.cpp"), "repo_a", ScipKind::Class, false, &cfg()).unwrap();
        assert_eq!(uri, "repo_a::widget.cpp::Class::app::Widget");
    }
}

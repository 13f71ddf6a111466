//! Fixes the shape of the entity records the external AST extractor hands to
//! the Vector Writer, and provides a minimal line-scanning reference
//! extractor so the pipeline runs end-to-end without the real clang/
//! tree-sitter frontend.

use identity_contract::{build_global_uri, build_identity_key, make_signature_hash, EntityType};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("serde json error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ExtractError>;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EntityRecord {
    pub global_uri: String,
    pub repo_name: String,
    pub file_path: String,
    pub entity_type: EntityType,
    pub entity_name: String,
    pub docstring: Option<String>,
    pub code_text: String,
    pub start_line: usize,
    pub end_line: usize,
    pub is_templated: bool,
    pub function_sig_hash: Option<String>,
}

impl EntityRecord {
    pub fn identity_key(&self) -> String {
        build_identity_key(&self.global_uri, self.function_sig_hash.as_deref())
    }
}

pub trait EntityExtractor {
    fn extract(&self, repo_name: &str, root: &Path) -> Result<Vec<EntityRecord>>;
}

static CLASS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(template\s*<[^>]*>\s*)?(class|struct)\s+([A-Za-z_]\w*)").unwrap());
static FUNCTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(template\s*<[^>]*>\s*)?[A-Za-z_][\w:<>,\s\*&]*\s[\*&]?([A-Za-z_]\w*)\s*\(([^;{]*)\)\s*\{?\s*$")
        .unwrap()
});

const SOURCE_EXTENSIONS: &[&str] = &["cpp", "cc", "cxx", "h", "hpp", "hh"];

/// Naive whole-file line scanner standing in for the real AST extractor.
/// Recognizes top-level `class`/`struct` headers and function-looking
/// signatures; entity bodies run from the matched line to the next blank
/// line or closing brace at column 0, whichever comes first.
pub struct LineScanExtractor;

impl EntityExtractor for LineScanExtractor {
    fn extract(&self, repo_name: &str, root: &Path) -> Result<Vec<EntityRecord>> {
        let mut raw = Vec::new();
        visit_files(root, &mut |path| {
            if !is_source_file(path) {
                return Ok(());
            }
            let rel = path
                .strip_prefix(root)
                .unwrap_or(path)
                .to_string_lossy()
                .replace('\\', "/");
            let contents = std::fs::read_to_string(path).map_err(|e| ExtractError::Io {
                path: path.display().to_string(),
                source: e,
            })?;
            raw.extend(scan_file(repo_name, &rel, &contents));
            Ok(())
        })?;
        Ok(dedupe_function_overloads(raw))
    }
}

fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SOURCE_EXTENSIONS.contains(&e))
        .unwrap_or(false)
}

fn visit_files(dir: &Path, visitor: &mut impl FnMut(&Path) -> Result<()>) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }
    let entries = std::fs::read_dir(dir).map_err(|e| ExtractError::Io {
        path: dir.display().to_string(),
        source: e,
    })?;
    for entry in entries {
        let entry = entry.map_err(|e| ExtractError::Io {
            path: dir.display().to_string(),
            source: e,
        })?;
        let path = entry.path();
        if path.is_dir() {
            if path.file_name().and_then(|n| n.to_str()) == Some(".git") {
                continue;
            }
            visit_files(&path, visitor)?;
        } else {
            visitor(&path)?;
        }
    }
    Ok(())
}

struct RawEntity {
    file_path: String,
    entity_type: EntityType,
    entity_name: String,
    docstring: Option<String>,
    code_text: String,
    start_line: usize,
    end_line: usize,
    is_templated: bool,
    signature_source: Option<String>,
}

fn scan_file(repo_name: &str, rel_path: &str, contents: &str) -> Vec<(String, RawEntity)> {
    let lines: Vec<&str> = contents.lines().collect();
    let mut out = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        if let Some(caps) = CLASS_RE.captures(line) {
            let name = caps.get(3).unwrap().as_str().to_string();
            let is_templated = caps.get(1).is_some();
            let entity_type = if &caps[2] == "struct" {
                EntityType::Struct
            } else {
                EntityType::Class
            };
            let end = find_block_end(&lines, idx);
            let code_text = lines[idx..=end].join("\n");
            let docstring = leading_comment(&lines, idx);
            out.push((
                repo_name.to_string(),
                RawEntity {
                    file_path: rel_path.to_string(),
                    entity_type,
                    entity_name: name,
                    docstring,
                    code_text,
                    start_line: idx + 1,
                    end_line: end + 1,
                    is_templated,
                    signature_source: None,
                },
            ));
            continue;
        }

        if let Some(caps) = FUNCTION_RE.captures(line) {
            let name = caps.get(2).unwrap().as_str().to_string();
            if name == "if" || name == "for" || name == "while" || name == "switch" {
                continue;
            }
            let is_templated = caps.get(1).is_some();
            let signature = format!("{}({})", name, caps.get(3).map(|m| m.as_str()).unwrap_or(""));
            let end = find_block_end(&lines, idx);
            let code_text = lines[idx..=end].join("\n");
            let docstring = leading_comment(&lines, idx);
            out.push((
                repo_name.to_string(),
                RawEntity {
                    file_path: rel_path.to_string(),
                    entity_type: EntityType::Function,
                    entity_name: name,
                    docstring,
                    code_text,
                    start_line: idx + 1,
                    end_line: end + 1,
                    is_templated,
                    signature_source: Some(signature),
                },
            ));
        }
    }

    out
}

fn leading_comment(lines: &[&str], idx: usize) -> Option<String> {
    if idx == 0 {
        return None;
    }
    let prev = lines[idx - 1].trim();
    if prev.starts_with("///") || prev.starts_with("//!") || prev.starts_with("//") {
        Some(prev.trim_start_matches('/').trim().to_string())
    } else {
        None
    }
}

fn find_block_end(lines: &[&str], start: usize) -> usize {
    let mut depth = 0i32;
    let mut seen_open = false;
    for (offset, line) in lines.iter().enumerate().skip(start) {
        for ch in line.chars() {
            match ch {
                '{' => {
                    depth += 1;
                    seen_open = true;
                }
                '}' => depth -= 1,
                _ => {}
            }
        }
        if seen_open && depth <= 0 {
            return offset;
        }
    }
    start
}

/// Assigns distinct `function_sig_hash` values to overloads sharing
/// `(repo, file, name)`, salting deterministically on collision.
fn dedupe_function_overloads(raw: Vec<(String, RawEntity)>) -> Vec<EntityRecord> {
    let mut used_hashes: HashMap<(String, String, String), Vec<String>> = HashMap::new();
    let mut out = Vec::with_capacity(raw.len());

    for (repo_name, entity) in raw {
        let function_sig_hash = entity.signature_source.as_ref().map(|sig_source| {
            let key = (repo_name.clone(), entity.file_path.clone(), entity.entity_name.clone());
            let seen = used_hashes.entry(key).or_default();
            let mut candidate = make_signature_hash(sig_source, 12);
            let mut salt = 0u32;
            while seen.contains(&candidate) {
                salt += 1;
                candidate = make_signature_hash(&format!("{sig_source}#{salt}"), 12);
            }
            seen.push(candidate.clone());
            candidate
        });

        let global_uri = build_global_uri(
            &repo_name,
            &entity.file_path,
            entity.entity_type,
            &entity.entity_name,
            None,
        );

        out.push(EntityRecord {
            global_uri,
            repo_name,
            file_path: entity.file_path,
            entity_type: entity.entity_type,
            entity_name: entity.entity_name,
            docstring: entity.docstring,
            code_text: entity.code_text,
            start_line: entity.start_line,
            end_line: entity.end_line,
            is_templated: entity.is_templated,
            function_sig_hash,
        });
    }

    out
}

/// Reads newline-delimited `EntityRecord`s from a JSONL file.
pub fn read_entities_jsonl(path: &Path) -> Result<Vec<EntityRecord>> {
    let contents = std::fs::read_to_string(path).map_err(|e| ExtractError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let mut out = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        out.push(serde_json::from_str(line)?);
    }
    Ok(out)
}

pub fn write_entities_jsonl(path: &Path, entities: &[EntityRecord]) -> Result<()> {
    use std::io::Write;
    let mut file = std::fs::File::create(path).map_err(|e| ExtractError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    for entity in entities {
        let line = serde_json::to_string(entity)?;
        writeln!(file, "{line}").map_err(|e| ExtractError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overloads_in_same_file_get_distinct_hashes() {
        let source = "int add(int a) {\n    return a;\n}\n\nint add(double a) {\n    return (int)a;\n}\n";
        let dir = std::env::temp_dir().join(format!("entity-extractor-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("math.cpp"), source).unwrap();

        let entities = LineScanExtractor.extract("repo_a", &dir).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        let adds: Vec<_> = entities.iter().filter(|e| e.entity_name == "add").collect();
        assert_eq!(adds.len(), 2);
        assert_ne!(adds[0].function_sig_hash, adds[1].function_sig_hash);
        assert_eq!(adds[0].global_uri, adds[1].global_uri);
        assert_ne!(adds[0].identity_key(), adds[1].identity_key());
    }

    #[test]
    fn class_declaration_is_captured() {
        let source = "class Widget {\npublic:\n    void draw();\n};\n";
        let dir = std::env::temp_dir().join(format!("entity-extractor-test-cls-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("widget.h"), source).unwrap();

        let entities = LineScanExtractor.extract("repo_a", &dir).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert!(entities.iter().any(|e| e.entity_name == "Widget" && e.entity_type == EntityType::Class));
    }

    #[test]
    fn leading_line_comment_is_captured_as_docstring() {
        let source = "// draws the widget\nvoid draw() {\n}\n";
        let dir = std::env::temp_dir().join(format!("entity-extractor-test-doc-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("widget.cpp"), source).unwrap();

        let entities = LineScanExtractor.extract("repo_a", &dir).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        let draw = entities.iter().find(|e| e.entity_name == "draw").unwrap();
        assert_eq!(draw.docstring.as_deref(), Some("draws the widget"));
    }

    #[test]
    fn jsonl_roundtrip_preserves_records() {
        let record = EntityRecord {
            global_uri: "repo_a::math.cpp::Function::add".to_string(),
            repo_name: "repo_a".to_string(),
            file_path: "math.cpp".to_string(),
            entity_type: EntityType::Function,
            entity_name: "add".to_string(),
            docstring: None,
            code_text: "int add(int a) { return a; }".to_string(),
            start_line: 1,
            end_line: 1,
            is_templated: false,
            function_sig_hash: Some("sig_aaaa1111".to_string()),
        };
        let dir = std::env::temp_dir().join(format!("entity-extractor-jsonl-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("entities.jsonl");
        write_entities_jsonl(&path, &[record.clone()]).unwrap();
        let read_back = read_entities_jsonl(&path).unwrap();
        std::fs::remove_dir_all(&dir).ok();
        assert_eq!(read_back, vec![record]);
    }
}

//! Deserializes a SCIP protobuf index into `SymbolDef`/`Reference` records,
//! attributing each reference to its innermost enclosing definition via a
//! sweep-line scope algorithm (see `build_enclosing_scope_map`).

use protobuf::Message;
use scip::types::symbol_information::Kind as ProtoKind;
use scip::types::Index as ScipIndex;
use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap, HashMap, HashSet};
use symbol_mapper::{classify_symbol, should_drop_symbol, Disposition, MapperConfig, ScipKind};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ScipReaderError {
    #[error("malformed scip protobuf: {0}")]
    Protobuf(#[from] protobuf::Error),
    #[error("metadata-only scip index (zero documents and zero external symbols): the compile database was not executable on this host")]
    EmptyIndex,
}

pub type Result<T> = std::result::Result<T, ScipReaderError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScipRelationship {
    pub target_symbol: String,
    pub is_reference: bool,
    pub is_implementation: bool,
    pub is_type_definition: bool,
    pub is_definition: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuadRange {
    pub start_line: i32,
    pub start_col: i32,
    pub end_line: i32,
    pub end_col: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolDef {
    pub scip_symbol: String,
    pub file_path: String,
    pub kind: ScipKind,
    pub display_name: String,
    pub definition_range: Option<QuadRange>,
    pub relationships: Vec<ScipRelationship>,
    pub disposition: Disposition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefRole {
    Read,
    Write,
    Call,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub scip_symbol: String,
    pub file_path: String,
    pub enclosing_symbol: Option<String>,
    pub role: RefRole,
    pub line: i32,
}

#[derive(Debug, Clone, Default)]
pub struct ParseResult {
    pub symbols: Vec<SymbolDef>,
    pub references: Vec<Reference>,
    pub document_count: usize,
    pub external_symbol_count: usize,
    pub dropped_symbol_count: usize,
    pub dropped_reference_count: usize,
}

const DEFINITION: i32 = 0x1;
const WRITE_ACCESS: i32 = 0x4;
const READ_ACCESS: i32 = 0x8;

fn infer_role(symbol_roles: i32) -> RefRole {
    if symbol_roles & WRITE_ACCESS != 0 {
        RefRole::Write
    } else if symbol_roles & READ_ACCESS != 0 {
        RefRole::Read
    } else {
        RefRole::Call
    }
}

fn map_kind(kind: &protobuf::EnumOrUnknown<ProtoKind>) -> ScipKind {
    match kind.enum_value() {
        Ok(ProtoKind::Namespace) => ScipKind::Namespace,
        Ok(ProtoKind::Variable) => ScipKind::Variable,
        Ok(ProtoKind::Parameter) => ScipKind::Parameter,
        Ok(ProtoKind::TypeParameter) => ScipKind::TypeParameter,
        Ok(ProtoKind::Field) => ScipKind::Field,
        Ok(ProtoKind::Enum) => ScipKind::Enum,
        Ok(ProtoKind::EnumMember) => ScipKind::EnumMember,
        Ok(ProtoKind::Macro) => ScipKind::Macro,
        Ok(ProtoKind::TypeAlias) => ScipKind::TypeAlias,
        Ok(ProtoKind::Struct) => ScipKind::Struct,
        Ok(ProtoKind::Union) => ScipKind::Union,
        Ok(ProtoKind::Class) => ScipKind::Class,
        Ok(ProtoKind::Function) => ScipKind::Function,
        Ok(ProtoKind::Method) => ScipKind::Method,
        Ok(ProtoKind::UnspecifiedKind) => ScipKind::Unspecified,
        Ok(other) => ScipKind::Other(other.value()),
        Err(raw) => ScipKind::Other(raw),
    }
}

fn normalize_quad(range: &[i32]) -> Option<QuadRange> {
    if range.len() < 3 {
        return None;
    }
    if range.len() == 4 {
        Some(QuadRange {
            start_line: range[0],
            start_col: range[1],
            end_line: range[2],
            end_col: range[3],
        })
    } else {
        Some(QuadRange {
            start_line: range[0],
            start_col: range[1],
            end_line: range[0],
            end_col: range[2],
        })
    }
}

fn occurrence_line_bounds(occ: &scip::types::Occurrence) -> Option<(i32, i32)> {
    let range_data: &[i32] = if !occ.enclosing_range.is_empty() {
        &occ.enclosing_range
    } else {
        &occ.range
    };
    if range_data.len() < 3 {
        return None;
    }
    let start_line = range_data[0];
    let end_line = if range_data.len() == 4 { range_data[2] } else { start_line };
    Some((start_line, end_line))
}

#[derive(Debug, Clone)]
struct Span {
    start: i32,
    end: i32,
    width: i32,
    symbol: String,
}

struct HeapItem {
    width: i32,
    start: i32,
    symbol: String,
    end: i32,
}

impl PartialEq for HeapItem {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width
            && self.start == other.start
            && self.symbol == other.symbol
            && self.end == other.end
    }
}
impl Eq for HeapItem {}

impl Ord for HeapItem {
    /// Mirrors Python's `heapq` min-heap over `(width, -start, symbol, end)`:
    /// the smallest width wins, ties broken by the latest start, then the
    /// lexicographically smallest symbol, then the smallest end. Since
    /// `BinaryHeap` is a max-heap, every comparison below is inverted so
    /// that `peek()` returns the same element Python's heap top would.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .width
            .cmp(&self.width)
            .then_with(|| self.start.cmp(&other.start))
            .then_with(|| other.symbol.cmp(&self.symbol))
            .then_with(|| other.end.cmp(&self.end))
    }
}
impl PartialOrd for HeapItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Builds a line -> innermost enclosing definition symbol map using a
/// sweep-line over definition spans, resolving only the requested query
/// lines. O((N+Q) log N) where N is span count and Q is query-line count.
fn build_enclosing_scope_map(spans: &[Span], reference_lines: &BTreeSet<i32>) -> HashMap<i32, String> {
    let mut scope_map = HashMap::new();
    if spans.is_empty() || reference_lines.is_empty() {
        return scope_map;
    }

    let mut sorted_spans = spans.to_vec();
    sorted_spans.sort_by_key(|s| s.start);

    let mut heap: BinaryHeap<HeapItem> = BinaryHeap::new();
    let mut span_idx = 0usize;

    for &line in reference_lines.iter() {
        while span_idx < sorted_spans.len() && sorted_spans[span_idx].start <= line {
            let s = &sorted_spans[span_idx];
            heap.push(HeapItem {
                width: s.width,
                start: s.start,
                symbol: s.symbol.clone(),
                end: s.end,
            });
            span_idx += 1;
        }

        while let Some(top) = heap.peek() {
            if top.end < line {
                heap.pop();
            } else {
                break;
            }
        }

        if let Some(top) = heap.peek() {
            scope_map.insert(line, top.symbol.clone());
        }
    }

    scope_map
}

fn collect_local_definition_symbols(index: &ScipIndex) -> HashSet<String> {
    let mut symbols = HashSet::new();
    for doc in &index.documents {
        for occ in &doc.occurrences {
            if occ.symbol.is_empty() || occ.symbol.starts_with("local ") {
                continue;
            }
            if occ.symbol_roles & DEFINITION != 0 {
                symbols.insert(occ.symbol.clone());
            }
        }
    }
    symbols
}

fn collect_definition_ranges(doc: &scip::types::Document) -> HashMap<String, QuadRange> {
    let mut ranges = HashMap::new();
    for occ in &doc.occurrences {
        if occ.symbol.is_empty() || occ.symbol_roles & DEFINITION == 0 {
            continue;
        }
        if ranges.contains_key(&occ.symbol) {
            continue;
        }
        if let Some(q) = normalize_quad(&occ.range) {
            ranges.insert(occ.symbol.clone(), q);
        }
    }
    ranges
}

/// Parses a serialized SCIP index. `repo_name` is not encoded in SCIP itself
/// but threaded through by callers building Global URIs downstream.
pub fn parse_scip_index(bytes: &[u8], _repo_name: &str, config: &MapperConfig) -> Result<ParseResult> {
    let index = ScipIndex::parse_from_bytes(bytes)?;

    if index.documents.is_empty() && index.external_symbols.is_empty() {
        return Err(ScipReaderError::EmptyIndex);
    }

    info!(
        documents = index.documents.len(),
        externals = index.external_symbols.len(),
        "parsing scip index"
    );

    let local_definition_symbols = collect_local_definition_symbols(&index);

    let mut symbols = Vec::new();
    let mut references = Vec::new();
    let mut dropped_syms = 0usize;
    let mut dropped_refs = 0usize;

    for doc in &index.documents {
        let file_path = doc.relative_path.clone();

        let reference_lines: BTreeSet<i32> = doc
            .occurrences
            .iter()
            .filter(|occ| occ.range.len() >= 3 && occ.symbol_roles & DEFINITION == 0)
            .map(|occ| occ.range[0])
            .collect();

        let spans: Vec<Span> = doc
            .occurrences
            .iter()
            .filter(|occ| occ.symbol_roles & DEFINITION != 0 && !occ.symbol.is_empty())
            .filter_map(|occ| {
                let (start, end) = occurrence_line_bounds(occ)?;
                let width = (end - start).max(0);
                Some(Span {
                    start,
                    end,
                    width,
                    symbol: occ.symbol.clone(),
                })
            })
            .collect();

        let scope_map = build_enclosing_scope_map(&spans, &reference_lines);
        let definition_ranges = collect_definition_ranges(doc);

        for sym_info in &doc.symbols {
            if sym_info.symbol.starts_with("local ") {
                continue;
            }

            let kind = map_kind(&sym_info.kind);
            let is_local = local_definition_symbols.contains(&sym_info.symbol);
            let disposition = classify_symbol(&sym_info.symbol, kind, is_local, config);
            if disposition == Disposition::Drop {
                dropped_syms += 1;
                continue;
            }
            if disposition == Disposition::Stub {
                debug!(symbol = %sym_info.symbol, "treating symbol as stub");
            }

            let mut rels = Vec::new();
            for rel in &sym_info.relationships {
                let tgt_local = local_definition_symbols.contains(&rel.symbol);
                let tgt_disp = classify_symbol(&rel.symbol, ScipKind::Unspecified, tgt_local, config);
                if tgt_disp == Disposition::Drop {
                    continue;
                }
                if tgt_disp == Disposition::Stub {
                    debug!(src = %sym_info.symbol, target = %rel.symbol, "relationship target is stub");
                }
                rels.push(ScipRelationship {
                    target_symbol: rel.symbol.clone(),
                    is_reference: rel.is_reference,
                    is_implementation: rel.is_implementation,
                    is_type_definition: rel.is_type_definition,
                    is_definition: rel.is_definition,
                });
            }

            symbols.push(SymbolDef {
                scip_symbol: sym_info.symbol.clone(),
                file_path: file_path.clone(),
                kind,
                display_name: sym_info.display_name.clone(),
                definition_range: definition_ranges.get(&sym_info.symbol).copied(),
                relationships: rels,
                disposition,
            });
        }

        for occ in &doc.occurrences {
            let is_def = occ.symbol_roles & DEFINITION != 0;
            if is_def || occ.symbol.is_empty() || occ.symbol.starts_with("local ") {
                continue;
            }

            let occ_local = local_definition_symbols.contains(&occ.symbol);
            let occ_disp = classify_symbol(&occ.symbol, ScipKind::Unspecified, occ_local, config);
            if occ_disp == Disposition::Drop {
                dropped_refs += 1;
                continue;
            }
            if occ_disp == Disposition::Stub {
                debug!(symbol = %occ.symbol, "reference target resolved as stub");
            }

            let line = if occ.range.len() >= 3 { occ.range[0] } else { -1 };
            let enclosing_sym = scope_map.get(&line).cloned();
            if let Some(enclosing) = &enclosing_sym {
                let enclosing_local = local_definition_symbols.contains(enclosing);
                if should_drop_symbol(enclosing, enclosing_local) {
                    dropped_refs += 1;
                    continue;
                }
            }

            if occ.range.len() < 3 {
                continue;
            }

            references.push(Reference {
                scip_symbol: occ.symbol.clone(),
                file_path: file_path.clone(),
                enclosing_symbol: enclosing_sym,
                role: infer_role(occ.symbol_roles),
                line,
            });
        }
    }

    info!(
        symbols = symbols.len(),
        references = references.len(),
        dropped_symbols = dropped_syms,
        dropped_references = dropped_refs,
        "scip index parsed"
    );

    Ok(ParseResult {
        symbols,
        references,
        document_count: index.documents.len(),
        external_symbol_count: index.external_symbols.len(),
        dropped_symbol_count: dropped_syms,
        dropped_reference_count: dropped_refs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use protobuf::{EnumOrUnknown, Message, MessageField};
    use scip::types::{Document, Index, Metadata, Occurrence, SymbolInformation, ToolInfo};

    fn empty_index_bytes() -> Vec<u8> {
        let index = Index::new();
        index.write_to_bytes().unwrap()
    }

    fn fixture_index(symbol: &str, kind: ProtoKind) -> Vec<u8> {
        let mut index = Index::new();
        let mut metadata = Metadata::new();
        let mut tool_info = ToolInfo::new();
        tool_info.name = "test-indexer".to_string();
        metadata.tool_info = MessageField::some(tool_info);
        index.metadata = MessageField::some(metadata);

        let mut doc = Document::new();
        doc.relative_path = "widget.cpp".to_string();

        let mut def_occ = Occurrence::new();
        def_occ.symbol = symbol.to_string();
        def_occ.symbol_roles = DEFINITION;
        def_occ.range = vec![10, 0, 60, 1];
        doc.occurrences.push(def_occ);

        let mut sym_info = SymbolInformation::new();
        sym_info.symbol = symbol.to_string();
        sym_info.kind = EnumOrUnknown::new(kind);
        sym_info.display_name = "Widget".to_string();
        doc.symbols.push(sym_info);

        index.documents.push(doc);
        index.write_to_bytes().unwrap()
    }

    #[test]
    fn metadata_only_index_is_fatal() {
        let bytes = empty_index_bytes();
        let err = parse_scip_index(&bytes, "repo_a", &MapperConfig::default()).unwrap_err();
        assert!(matches!(err, ScipReaderError::EmptyIndex));
    }

    #[test]
    fn keeps_unmonitored_class_symbol() {
        let symbol = "scip-clang . . . app/Widget#";
        let bytes = fixture_index(symbol, ProtoKind::Class);
        let result = parse_scip_index(&bytes, "repo_a", &MapperConfig::default()).unwrap();
        assert_eq!(result.symbols.len(), 1);
        assert_eq!(result.symbols[0].disposition, Disposition::Keep);
    }

    #[test]
    fn drops_ignored_namespace_symbol() {
        let symbol = "scip-clang . . . std/vector#";
        let bytes = fixture_index(symbol, ProtoKind::Class);
        let result = parse_scip_index(&bytes, "repo_a", &MapperConfig::default()).unwrap();
        assert_eq!(result.symbols.len(), 0);
        assert_eq!(result.dropped_symbol_count, 1);
    }

    #[test]
    fn scope_map_resolves_to_innermost_span() {
        let outer = Span {
            start: 0,
            end: 1_000_000,
            width: 1_000_000,
            symbol: "outer".to_string(),
        };
        let inner = Span {
            start: 50,
            end: 60,
            width: 10,
            symbol: "inner".to_string(),
        };
        let lines: BTreeSet<i32> = [55].into_iter().collect();
        let map = build_enclosing_scope_map(&[outer, inner], &lines);
        assert_eq!(map.get(&55).map(String::as_str), Some("inner"));
    }

    #[test]
    fn role_inference_matches_bit_precedence() {
        assert_eq!(infer_role(WRITE_ACCESS), RefRole::Write);
        assert_eq!(infer_role(READ_ACCESS), RefRole::Read);
        assert_eq!(infer_role(0), RefRole::Call);
    }
}

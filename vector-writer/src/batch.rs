//! Dual-budget batching: flush when either the entity-count budget or the
//! total-character budget is exceeded, whichever comes first.

use crate::model::embedding_text;
use entity_extractor::EntityRecord;

pub const DEFAULT_MAX_BATCH_ENTITIES: usize = 100;
pub const DEFAULT_MAX_BATCH_CHARS: usize = 32_000;

pub fn batch_entities(entities: &[EntityRecord], max_entities: usize, max_chars: usize) -> Vec<Vec<EntityRecord>> {
    let mut batches = Vec::new();
    let mut current: Vec<EntityRecord> = Vec::new();
    let mut current_chars = 0usize;

    for entity in entities {
        let text_len = embedding_text(entity).chars().count();
        let would_exceed_count = current.len() + 1 > max_entities;
        let would_exceed_chars = !current.is_empty() && current_chars + text_len > max_chars;

        if would_exceed_count || would_exceed_chars {
            if !current.is_empty() {
                batches.push(std::mem::take(&mut current));
                current_chars = 0;
            }
        }

        current_chars += text_len;
        current.push(entity.clone());
    }

    if !current.is_empty() {
        batches.push(current);
    }

    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use identity_contract::EntityType;

    fn entity(name: &str, code_len: usize) -> EntityRecord {
        EntityRecord {
            global_uri: format!("repo::file.cpp::Function::{name}"),
            repo_name: "repo".to_string(),
            file_path: "file.cpp".to_string(),
            entity_type: EntityType::Function,
            entity_name: name.to_string(),
            docstring: None,
            code_text: "x".repeat(code_len),
            start_line: 1,
            end_line: 2,
            is_templated: false,
            function_sig_hash: None,
        }
    }

    #[test]
    fn splits_on_count_budget() {
        let entities: Vec<_> = (0..5).map(|i| entity(&format!("f{i}"), 10)).collect();
        let batches = batch_entities(&entities, 2, 10_000);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), 2);
        assert_eq!(batches[2].len(), 1);
    }

    #[test]
    fn splits_on_char_budget() {
        let entities = vec![entity("a", 60), entity("b", 60)];
        let batches = batch_entities(&entities, 100, 100);
        assert_eq!(batches.len(), 2);
    }

    #[test]
    fn single_oversized_entity_still_forms_its_own_batch() {
        let entities = vec![entity("big", 500)];
        let batches = batch_entities(&entities, 100, 100);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 1);
    }
}

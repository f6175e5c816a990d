//! ============================================================================
//! Result Normalizer & Ranker
//! ============================================================================
//! The remote store answers with either a bare array or an object wrapping a
//! `results` field. Both shapes normalize through one tagged union; anything
//! else becomes an empty list. Merging is deterministic: first-scope wins on
//! duplicate ids, then descending score, then truncation.
//! ============================================================================

use serde::Deserialize;
use serde_json::Value;

use crate::types::MemoryItem;

/// Accepted response envelopes
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ResultsEnvelope {
    Wrapped { results: Vec<Value> },
    Bare(Vec<Value>),
}

/// Normalize a raw backend response into memory items. Entries that fail to
/// deserialize are skipped rather than failing the batch; unrecognized
/// envelope shapes normalize to empty.
pub fn normalize(response: Value) -> Vec<MemoryItem> {
    let entries = match serde_json::from_value::<ResultsEnvelope>(response) {
        Ok(ResultsEnvelope::Wrapped { results }) => results,
        Ok(ResultsEnvelope::Bare(items)) => items,
        Err(_) => return Vec::new(),
    };

    entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value::<MemoryItem>(entry).ok())
        .collect()
}

/// Merge two scoped result sets: concatenate first-then-second, deduplicate
/// by id keeping the first occurrence, sort by descending score (missing
/// score counts as 0), truncate to `limit`.
pub fn merge_ranked(
    first: Vec<MemoryItem>,
    second: Vec<MemoryItem>,
    limit: usize,
) -> Vec<MemoryItem> {
    let mut seen = std::collections::HashSet::new();
    let mut combined: Vec<MemoryItem> = Vec::with_capacity(first.len() + second.len());

    for item in first.into_iter().chain(second) {
        if seen.insert(item.id.clone()) {
            combined.push(item);
        }
    }

    // Stable sort keeps the scope-A-first order among equal scores
    combined.sort_by(|a, b| {
        b.score
            .unwrap_or(0.0)
            .total_cmp(&a.score.unwrap_or(0.0))
    });
    combined.truncate(limit);
    combined
}

/// Sort by most-recent timestamp (updated_at preferred, then created_at,
/// empty string if neither) and truncate. Lexicographic comparison is
/// correct only for ISO-8601 timestamps, which is what the backend emits.
pub fn sort_recent(mut items: Vec<MemoryItem>, limit: usize) -> Vec<MemoryItem> {
    items.sort_by(|a, b| b.recency_key().cmp(a.recency_key()));
    items.truncate(limit);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(id: &str, score: Option<f64>) -> MemoryItem {
        MemoryItem {
            id: id.to_string(),
            memory: format!("memory {}", id),
            score,
            created_at: None,
            updated_at: None,
            metadata: None,
        }
    }

    fn dated(id: &str, created: Option<&str>, updated: Option<&str>) -> MemoryItem {
        MemoryItem {
            id: id.to_string(),
            memory: format!("memory {}", id),
            score: None,
            created_at: created.map(String::from),
            updated_at: updated.map(String::from),
            metadata: None,
        }
    }

    #[test]
    fn test_normalize_bare_array() {
        let items = normalize(json!([
            {"id": "a", "memory": "one"},
            {"id": "b", "memory": "two", "score": 0.5}
        ]));
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].score, Some(0.5));
    }

    #[test]
    fn test_normalize_wrapped_object() {
        let items = normalize(json!({"results": [{"id": "a", "memory": "one"}], "relations": []}));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "a");
    }

    #[test]
    fn test_normalize_garbage_is_empty() {
        assert!(normalize(json!("nope")).is_empty());
        assert!(normalize(json!({"items": []})).is_empty());
        assert!(normalize(json!(null)).is_empty());
        assert!(normalize(json!(42)).is_empty());
    }

    #[test]
    fn test_normalize_skips_malformed_entries() {
        let items = normalize(json!([
            {"id": "a", "memory": "good"},
            {"memory": "missing id"},
            {"id": "b", "memory": "also good"}
        ]));
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "a");
        assert_eq!(items[1].id, "b");
    }

    #[test]
    fn test_merge_first_scope_wins_duplicates() {
        // user has {a:0.9}, project has {a:0.5, b:0.7};
        // merged at limit=2 this must be [a:0.9, b:0.7]
        let user = vec![item("a", Some(0.9))];
        let project = vec![item("a", Some(0.5)), item("b", Some(0.7))];

        let merged = merge_ranked(user, project, 2);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id, "a");
        assert_eq!(merged[0].score, Some(0.9));
        assert_eq!(merged[1].id, "b");
    }

    #[test]
    fn test_merge_no_duplicates_and_sorted() {
        let merged = merge_ranked(
            vec![item("x", Some(0.2)), item("y", None)],
            vec![item("z", Some(0.8)), item("x", Some(0.99))],
            10,
        );
        let ids: Vec<&str> = merged.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["z", "x", "y"]);
        // Non-increasing scores, None treated as 0
        let scores: Vec<f64> = merged.iter().map(|m| m.score.unwrap_or(0.0)).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_merge_respects_limit() {
        let many: Vec<MemoryItem> = (0..20).map(|i| item(&format!("m{}", i), None)).collect();
        assert_eq!(merge_ranked(many, Vec::new(), 5).len(), 5);
    }

    #[test]
    fn test_sort_recent_prefers_updated_at() {
        let items = vec![
            dated("old", Some("2024-01-01T00:00:00Z"), None),
            dated("newest", Some("2024-01-01T00:00:00Z"), Some("2025-05-01T00:00:00Z")),
            dated("mid", Some("2025-01-01T00:00:00Z"), None),
            dated("undated", None, None),
        ];
        let sorted = sort_recent(items, 3);
        let ids: Vec<&str> = sorted.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["newest", "mid", "old"]);
    }
}

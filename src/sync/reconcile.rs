use tracing::warn;

use crate::entity::{Note, RawDocument, TaskGroup};
use crate::schema::{validate_note, validate_task_group, ValidationError};

/// Validate every document in a batch, keeping store order and dropping
/// (and logging) the ones that fail.
pub fn reconcile<T, F>(kind: &str, batch: &[RawDocument], validate: F) -> Vec<T>
where
    F: Fn(&RawDocument) -> Result<T, ValidationError>,
{
    batch
        .iter()
        .filter_map(|doc| match validate(doc) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(kind, id = %doc.id, issues = %e, "dropping invalid document");
                None
            }
        })
        .collect()
}

pub fn reconcile_notes(batch: &[RawDocument]) -> Vec<Note> {
    reconcile("note", batch, |doc| validate_note(Some(&doc.id), &doc.fields))
}

pub fn reconcile_groups(batch: &[RawDocument]) -> Vec<TaskGroup> {
    reconcile("task group", batch, |doc| {
        validate_task_group(&doc.id, &doc.fields)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_invalid_document_is_dropped() {
        let batch = vec![
            RawDocument::new(
                "g1",
                json!({ "name": "Work", "tasks": [{ "id": "t1", "title": "Ship", "completed": false }] }),
            ),
            RawDocument::new("g2", json!({ "name": "", "tasks": [] })),
        ];

        let groups = reconcile_groups(&batch);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].id, "g1");
    }

    #[test]
    fn test_store_order_is_preserved() {
        let note = |title: &str| {
            json!({
                "title": title,
                "content": "x",
                "createdAt": { "seconds": 0, "nanoseconds": 0 }
            })
        };
        let batch = vec![
            RawDocument::new("b", note("second")),
            RawDocument::new("bad", json!({ "title": "no content" })),
            RawDocument::new("a", note("first")),
        ];

        let notes = reconcile_notes(&batch);
        let ids: Vec<_> = notes.iter().filter_map(|n| n.id.as_deref()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_empty_batch() {
        assert!(reconcile_notes(&[]).is_empty());
    }
}

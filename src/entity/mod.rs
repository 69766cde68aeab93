mod note;
mod task;
mod timestamp;

pub use note::{Note, NoteColor, NoteDraft};
pub use task::{NewTask, Task, TaskGroup};
pub use timestamp::{normalize_time, WireTimestamp};

/// A raw document as delivered by the store: its id plus an untyped field record.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    pub id: String,
    pub fields: serde_json::Value,
}

impl RawDocument {
    pub fn new(id: impl Into<String>, fields: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

use thiserror::Error;

use crate::auth::AuthError;
use crate::schema::ValidationError;

#[derive(Error, Debug)]
pub enum StickyError {
    #[error("Not in a stickyboard project. Run 'stickyboard init' first.")]
    NotInitialized,

    #[error("Already initialized. Remove .stickyboard/ to reinitialize.")]
    AlreadyInitialized,

    #[error("Not signed in. Run 'stickyboard login' first.")]
    NotSignedIn,

    #[error("Document not found: {collection}/{id}")]
    DocumentNotFound { collection: String, id: String },

    #[error("Task group not found: {0}")]
    GroupNotFound(String),

    #[error("Task not found: {task_id} in group {group_id}")]
    TaskNotFound { group_id: String, task_id: String },

    #[error("Note not found: {0}")]
    NoteNotFound(String),

    #[error("Note has not been saved yet")]
    NoteNotPersisted,

    #[error("Invalid document: {0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Auth(#[from] AuthError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Change applied but not saved to disk: {0}")]
    NotSaved(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Loro error: {0}")]
    Loro(#[from] loro::LoroError),

    #[error("Loro encode error: {0}")]
    LoroEncode(#[from] loro::LoroEncodeError),
}

impl StickyError {
    /// The store took the write even though the call failed.
    pub fn write_applied(&self) -> bool {
        matches!(self, StickyError::NotSaved(_))
    }
}

pub type Result<T> = std::result::Result<T, StickyError>;

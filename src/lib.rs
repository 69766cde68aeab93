pub mod auth;
pub mod cli;
pub mod config;
pub mod entity;
pub mod error;
pub mod schema;
pub mod storage;
pub mod sync;

pub use auth::{LocalAuth, Session};
pub use config::Config;
pub use error::{Result, StickyError};
pub use storage::{DocumentStore, LoroDocumentStore};
pub use sync::{NoteWall, TaskBoard};

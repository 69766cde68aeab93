//! Keeping local collections in step with the store.
//!
//! Snapshots flow in through [`reconcile`] and replace local state wholesale.
//! User edits flow out through [`TaskBoard`] and [`NoteWall`], which apply them
//! locally first, write to the store, and roll back if the write fails.

mod board;
mod editor;
pub mod mutate;
mod pending;
pub mod reconcile;
mod wall;
mod watch;

pub use board::TaskBoard;
pub use editor::{EditState, NoteEditor};
pub use mutate::NoteEdit;
pub use pending::PendingWrites;
pub use wall::NoteWall;
pub use watch::CollectionWatch;

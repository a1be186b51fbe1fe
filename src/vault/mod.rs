//! Markdown Vault Host
//!
//! Read-only filesystem implementation of the collaborators the backlink views need.

pub mod daily;
pub mod indexer;
pub mod provider;
pub mod watcher;

pub use daily::{DailyNoteMode, DailyNoteSkip};
pub use indexer::{index_vault, IndexStats, NoteIndex, VaultError, VaultIndex};
pub use provider::SharedVault;
pub use watcher::{VaultChangeEvent, VaultWatcher};

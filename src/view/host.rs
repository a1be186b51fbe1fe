//! Host Collaborators
//!
//! The narrow interfaces the coordinator consumes from, and emits to, its host.

use futures::future::BoxFuture;
use serde::Serialize;
use thiserror::Error;

use super::instance::PaneView;
use crate::backlinks::ResolvedLinks;

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Note not found: {0}")]
    NotFound(String),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

impl Serialize for ContentError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Host-maintained link index, queried read-only
pub trait LinkIndex: Send + Sync {
    fn resolved_links(&self) -> ResolvedLinks;
}

/// Asynchronous note reads; each path may fail on its own
pub trait ContentProvider: Send + Sync {
    fn read<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<String, ContentError>>;
}

/// Aliases a note declares in its frontmatter
pub trait AliasProvider: Send + Sync {
    fn declared_aliases(&self, path: &str) -> Vec<String>;
}

/// Notes that should never get a backlink view
pub trait SkipPredicate: Send + Sync {
    fn should_skip(&self, path: &str) -> bool;
}

/// Receives rendered views
pub trait ViewSink: Send + Sync {
    fn render(&self, view: &PaneView);
    fn teardown(&self, pane_id: &str);
}

/// Opens a linked note
pub trait Navigator: Send + Sync {
    fn open_link(&self, path: &str, new_tab: bool);
}

/// Discards everything
pub struct NullSink;

impl ViewSink for NullSink {
    fn render(&self, _view: &PaneView) {}
    fn teardown(&self, _pane_id: &str) {}
}

impl Navigator for NullSink {
    fn open_link(&self, _path: &str, _new_tab: bool) {}
}

//! Pane Views
//!
//! Per-pane backlink views and the coordinator that keeps them in sync with
//! pane events.

pub mod coordinator;
pub mod host;
pub mod instance;

pub use coordinator::{
    Collaborators, Outcome, PaneEvent, ViewCoordinator, ViewRegistry, FILTER_DEBOUNCE,
};
pub use host::{
    AliasProvider, ContentError, ContentProvider, LinkIndex, Navigator, NullSink, SkipPredicate,
    ViewSink,
};
pub use instance::{BlockView, PaneView, ViewInstance, ViewState};

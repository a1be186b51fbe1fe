// Backlink Blocks Library
// Exports core modules for use by hosts and the CLI binary

pub mod backlinks;
pub mod settings;
pub mod vault;
pub mod view;

// Re-export commonly used types for hosts
pub use backlinks::{
    find_sources_linking_to, segment, segment_sources, AliasScanner, Block, Boundary,
    BoundaryStrategy, FilterQuery, FilterSortEngine, ReferenceMatch, ReferenceMatcher,
    ResolvedLinks, SortConfig, TargetNote,
};

pub use settings::{
    HeaderStyle, JsonSettingsStore, MemorySettingsStore, Settings, SettingsError, SettingsStore,
    Theme,
};

pub use vault::{
    index_vault, DailyNoteMode, DailyNoteSkip, IndexStats, SharedVault, VaultChangeEvent,
    VaultError, VaultIndex, VaultWatcher,
};

pub use view::{
    AliasProvider, BlockView, Collaborators, ContentError, ContentProvider, LinkIndex, Navigator,
    NullSink, Outcome, PaneEvent, PaneView, SkipPredicate, ViewCoordinator,
    ViewInstance, ViewRegistry, ViewSink, ViewState, FILTER_DEBOUNCE,
};

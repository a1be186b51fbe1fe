//! Backlink Aggregation
//!
//! Source notes that link to a target, read from the host's resolved-link index.

use std::collections::{BTreeMap, BTreeSet};

/// Source path -> set of target paths it links to
pub type ResolvedLinks = BTreeMap<String, BTreeSet<String>>;

/// Sources linking to `target_path`, in index order, each path once.
/// Recomputed from the snapshot on every call.
pub fn find_sources_linking_to(target_path: &str, index: &ResolvedLinks) -> Vec<String> {
    let mut seen = BTreeSet::new();
    index
        .iter()
        .filter(|(_, targets)| targets.contains(target_path))
        .filter(|(source, _)| seen.insert(source.as_str()))
        .map(|(source, _)| source.clone())
        .collect()
}

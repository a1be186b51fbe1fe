//! Block Segmenter
//!
//! Carves a referencing note into excerpts, one per reference to the target.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::aliases::AliasScanner;
use super::boundary::BoundaryStrategy;
use super::matcher::{file_stem, ReferenceMatcher};
use crate::view::host::ContentProvider;

/// One excerpt of a source note shown in a pane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Note the excerpt was taken from
    pub source_path: String,
    /// Byte range in the source content
    pub start_offset: usize,
    pub end_offset: usize,
    /// Source text of the whole span; heading filtering happens at render time
    pub content: String,
    pub title: String,
    pub is_collapsed: bool,
    pub is_visible: bool,
    /// Alias tokens the excerpt's references use for the target
    pub aliases_found: Vec<String>,
    /// Position in discovery order, used as the last sort tie-break
    pub discovery_index: usize,
}

/// Segment one source note's content. `discovery_index` is left at 0;
/// the caller numbers blocks across all sources.
pub fn segment(
    content: &str,
    source_path: &str,
    matcher: &ReferenceMatcher,
    strategy: BoundaryStrategy,
    aliases: &AliasScanner,
) -> Vec<Block> {
    let references = matcher.find_references(content);
    let title = file_stem(source_path).to_string();

    references
        .iter()
        .enumerate()
        .filter_map(|(i, reference)| {
            let next = references.get(i + 1).map(|r| r.offset);
            let boundary = strategy.determine_boundary(content, reference, next);
            if !strategy.is_valid_block(content, &boundary) {
                return None;
            }
            let excerpt = strategy.excerpt(content, &boundary);
            let aliases_found = aliases.tokens_in(&content[boundary.start..boundary.end]);
            Some(Block {
                source_path: source_path.to_string(),
                start_offset: boundary.start,
                end_offset: boundary.end,
                content: excerpt,
                title: title.clone(),
                is_collapsed: false,
                is_visible: true,
                aliases_found,
                discovery_index: 0,
            })
        })
        .collect()
}

/// Read every source and segment it, in source order. A failed read
/// contributes no blocks.
pub async fn segment_sources(
    provider: &dyn ContentProvider,
    sources: &[String],
    matcher: &ReferenceMatcher,
    strategy: BoundaryStrategy,
    aliases: &AliasScanner,
) -> Vec<Block> {
    let mut blocks = Vec::new();

    for path in sources {
        match provider.read(path).await {
            Ok(content) => {
                let found = segment(&content, path, matcher, strategy, aliases);
                debug!(path = %path, blocks = found.len(), "Segmented source");
                blocks.extend(found);
            }
            Err(e) => {
                warn!(path = %path, error = %e, "Failed to read backlink source, skipping");
            }
        }
    }

    for (i, block) in blocks.iter_mut().enumerate() {
        block.discovery_index = i;
    }
    blocks
}

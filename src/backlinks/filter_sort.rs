//! Filter & Sort Engine
//!
//! Orders a pane's blocks and marks which ones pass the text and alias filters.
//! Never re-segments and never touches block content.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::aliases::AliasScanner;
use super::matcher::file_stem;
use super::segmenter::Block;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortConfig {
    pub descending: bool,
    /// Sort on the full source path instead of the note name
    pub by_full_path: bool,
}

/// Everything the engine needs for one pass
#[derive(Debug, Clone, Copy)]
pub struct FilterQuery<'a> {
    pub filter_text: &'a str,
    pub alias_filter: Option<&'a str>,
    pub declared_aliases: &'a [String],
    pub sort: SortConfig,
}

pub struct FilterSortEngine;

impl FilterSortEngine {
    /// Sort `blocks` in place and set `is_visible` on each.
    pub fn apply(blocks: &mut [Block], query: &FilterQuery<'_>, aliases: &AliasScanner) {
        blocks.sort_by(|a, b| Self::compare(a, b, query.sort));

        let needle = query.filter_text.to_lowercase();
        for block in blocks.iter_mut() {
            let alias_ok =
                aliases.block_matches_alias(block, query.alias_filter, query.declared_aliases);
            let text_ok = needle.is_empty()
                || block.content.to_lowercase().contains(&needle)
                || block.title.to_lowercase().contains(&needle);
            block.is_visible = alias_ok && text_ok;
        }
    }

    fn compare(a: &Block, b: &Block, sort: SortConfig) -> Ordering {
        let key = |block: &Block| -> String {
            if sort.by_full_path {
                block.source_path.clone()
            } else {
                file_stem(&block.source_path).to_string()
            }
        };

        let ordering = key(a).cmp(&key(b)).then_with(|| a.content.cmp(&b.content));
        let ordering = if sort.descending { ordering.reverse() } else { ordering };
        // Discovery order always breaks remaining ties
        ordering.then_with(|| a.discovery_index.cmp(&b.discovery_index))
    }
}

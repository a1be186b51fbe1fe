//! Alias Extraction
//!
//! Finds the aliases other notes use when linking the target (`[[Note|alias]]`)
//! and answers alias-filter membership for blocks.

use regex::Regex;
use std::collections::BTreeSet;

use super::matcher::{name_pattern, TargetNote, SUBPATH};
use super::segmenter::Block;

/// Alias patterns for one target note
#[derive(Debug, Clone)]
pub struct AliasScanner {
    /// Reference followed by a pipe list; group 1 holds the list
    aliased: Option<Regex>,
    /// Reference with no pipe at all
    bare: Option<Regex>,
    basename: String,
}

impl AliasScanner {
    pub fn new(target: &TargetNote) -> Self {
        let names = target
            .name_variants()
            .iter()
            .map(|n| name_pattern(n))
            .collect::<Vec<_>>()
            .join("|");
        let aliased = Regex::new(&format!(r"\[\[(?:{}){}\|([^\]\n]+)\]\]", names, SUBPATH)).ok();
        let bare = Regex::new(&format!(r"\[\[(?:{}){}\]\]", names, SUBPATH)).ok();
        Self { aliased, bare, basename: target.basename.clone() }
    }

    /// Alias tokens in first-appearance order, no duplicates
    pub fn tokens_in(&self, text: &str) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut tokens = Vec::new();
        let Some(aliased) = &self.aliased else { return tokens };

        for caps in aliased.captures_iter(text) {
            let Some(list) = caps.get(1) else { continue };
            for token in list.as_str().split('|').map(str::trim).filter(|t| !t.is_empty()) {
                if seen.insert(token.to_string()) {
                    tokens.push(token.to_string());
                }
            }
        }
        tokens
    }

    pub fn has_bare_reference(&self, text: &str) -> bool {
        self.bare.as_ref().is_some_and(|re| re.is_match(text))
    }

    /// Aliases used across `blocks` that the note does not declare itself,
    /// sorted and unique. The note's own name never counts as an alias.
    pub fn extract_unsaved_aliases(&self, blocks: &[Block], declared: &[String]) -> Vec<String> {
        let unsaved: BTreeSet<String> = blocks
            .iter()
            .flat_map(|b| self.tokens_in(&b.content))
            .filter(|t| !declared.contains(t) && *t != self.basename)
            .collect();
        unsaved.into_iter().collect()
    }

    /// Whether a block passes the alias filter. Comparison is exact and
    /// case-sensitive.
    pub fn block_matches_alias(
        &self,
        block: &Block,
        alias: Option<&str>,
        declared: &[String],
    ) -> bool {
        let Some(alias) = alias else { return true };

        if declared.iter().any(|d| d == alias) && self.has_bare_reference(&block.content) {
            return true;
        }
        self.tokens_in(&block.content).iter().any(|t| t == alias)
    }
}

//! Reference Matcher
//!
//! Finds `[[wikilink]]` references to one target note inside another note's text.

use regex::Regex;
use std::collections::BTreeMap;

/// One textual occurrence of a link to the target note
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceMatch {
    /// Byte offset of the opening `[[`
    pub offset: usize,
    /// Byte offset one past the closing `]]`
    pub end: usize,
    /// The full reference text, brackets included
    pub raw_text: String,
    /// Everything after the first pipe, if the reference carries an alias
    pub alias_text: Option<String>,
}

/// The note a pane is showing, as seen by the matcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetNote {
    /// Vault-relative path, e.g. `folder/Note.md`
    pub path: String,
    /// File name without extension, e.g. `Note`
    pub basename: String,
    /// Aliases declared in the note's own frontmatter
    pub declared_aliases: Vec<String>,
}

impl TargetNote {
    pub fn new(path: impl Into<String>, declared_aliases: Vec<String>) -> Self {
        let path = path.into();
        let basename = file_stem(&path).to_string();
        Self { path, basename, declared_aliases }
    }

    /// Every spelling a link to this note may use, longest first
    pub fn name_variants(&self) -> Vec<String> {
        let without_ext = strip_md(&self.path).to_string();
        let mut variants = vec![
            self.path.clone(),
            without_ext,
            format!("{}.md", self.basename),
            self.basename.clone(),
        ];
        variants.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        variants.dedup();
        variants
    }
}

/// File name without directories or `.md` extension
pub fn file_stem(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    strip_md(name)
}

fn strip_md(path: &str) -> &str {
    path.strip_suffix(".md").unwrap_or(path)
}

/// Regex fragment matching one spelling of the note name, metacharacters escaped.
/// The name is matched case-insensitively, the alias part is not.
pub(crate) fn name_pattern(name: &str) -> String {
    format!("(?i:{})", regex::escape(name))
}

/// Subpath (`#Heading`, `#^block`) allowed between name and alias
pub(crate) const SUBPATH: &str = r"(?:#[^\]|\n]*)?";

/// Compiled reference patterns for one target note
#[derive(Debug, Clone)]
pub struct ReferenceMatcher {
    patterns: Vec<Regex>,
}

impl ReferenceMatcher {
    pub fn new(target: &TargetNote) -> Self {
        let patterns = target
            .name_variants()
            .iter()
            .filter_map(|name| {
                let pattern = format!(
                    r"\[\[{}{}(?:\|([^\]\n]*))?\]\]",
                    name_pattern(name),
                    SUBPATH
                );
                Regex::new(&pattern).ok()
            })
            .collect();
        Self { patterns }
    }

    /// All references in document order. Two patterns hitting the same
    /// occurrence count once.
    pub fn find_references(&self, content: &str) -> Vec<ReferenceMatch> {
        let mut by_offset: BTreeMap<usize, ReferenceMatch> = BTreeMap::new();

        for pattern in &self.patterns {
            for caps in pattern.captures_iter(content) {
                let Some(whole) = caps.get(0) else { continue };
                by_offset.entry(whole.start()).or_insert_with(|| ReferenceMatch {
                    offset: whole.start(),
                    end: whole.end(),
                    raw_text: whole.as_str().to_string(),
                    alias_text: caps.get(1).map(|m| m.as_str().to_string()),
                });
            }
        }

        by_offset.into_values().collect()
    }

    pub fn contains_reference(&self, content: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(content))
    }
}

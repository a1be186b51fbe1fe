//! Block Boundary Strategies
//!
//! Decide where an excerpt starts and ends around one reference match.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::matcher::ReferenceMatch;

lazy_static! {
    /// Markdown thematic break on a line of its own, LF or CRLF
    static ref HORIZONTAL_RULE: Regex = Regex::new(r"(?m)^ {0,3}(?:-{3,}|\*{3,}|_{3,})[ \t]*\r?$")
        .expect("horizontal rule pattern is valid");
    /// Heading line with one to five leading markers
    static ref HEADING: Regex = Regex::new(r"^#{1,5}[ \t]+\S").expect("heading pattern is valid");
}

/// Byte range of an excerpt within its source content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    pub start: usize,
    pub end: usize,
}

/// Boundary policy, selected by a settings string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BoundaryStrategy {
    /// From the reference line up to the next rule, next reference, or end of note
    #[default]
    Default,
    /// Same span as Default, rendered with heading lines only
    HeadersOnly,
    /// Only the line holding the reference
    TopLine,
    /// Legacy: first line of the note, wherever the reference is
    SingleLine,
}

impl BoundaryStrategy {
    /// Unknown names fall back to `Default`
    pub fn from_config(name: &str) -> Self {
        match name {
            "HeadersOnly" => BoundaryStrategy::HeadersOnly,
            "TopLine" => BoundaryStrategy::TopLine,
            "SingleLine" => BoundaryStrategy::SingleLine,
            _ => BoundaryStrategy::Default,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BoundaryStrategy::Default => "Default",
            BoundaryStrategy::HeadersOnly => "HeadersOnly",
            BoundaryStrategy::TopLine => "TopLine",
            BoundaryStrategy::SingleLine => "SingleLine",
        }
    }

    /// `next_reference` is the offset of the following reference to the same
    /// note in this content, if any.
    pub fn determine_boundary(
        &self,
        content: &str,
        reference: &ReferenceMatch,
        next_reference: Option<usize>,
    ) -> Boundary {
        match self {
            BoundaryStrategy::Default | BoundaryStrategy::HeadersOnly => {
                let start = line_start(content, reference.offset);
                let rule = HORIZONTAL_RULE
                    .find_at(content, reference.end.min(content.len()))
                    .map(|m| m.start());
                let end = [rule, next_reference]
                    .into_iter()
                    .flatten()
                    .filter(|&at| at > reference.offset)
                    .min()
                    .unwrap_or(content.len());
                Boundary { start, end }
            }
            BoundaryStrategy::TopLine => Boundary {
                start: line_start(content, reference.offset),
                end: line_end(content, reference.offset),
            },
            BoundaryStrategy::SingleLine => Boundary {
                start: 0,
                end: line_end(content, 0),
            },
        }
    }

    pub fn is_valid_block(&self, content: &str, boundary: &Boundary) -> bool {
        boundary.start < boundary.end && boundary.end <= content.len()
    }

    /// Full source text of a boundary
    pub fn excerpt(&self, content: &str, boundary: &Boundary) -> String {
        content[boundary.start..boundary.end].to_string()
    }

    /// Display text for an excerpt. Only `HeadersOnly` reshapes it.
    pub fn rendered(&self, excerpt: &str) -> String {
        match self {
            BoundaryStrategy::HeadersOnly => headings_only(excerpt),
            _ => excerpt.to_string(),
        }
    }
}

pub fn is_heading(line: &str) -> bool {
    HEADING.is_match(line)
}

/// Keep heading lines, joined by newlines
pub fn headings_only(text: &str) -> String {
    text.lines().filter(|l| is_heading(l)).collect::<Vec<_>>().join("\n")
}

fn line_start(content: &str, at: usize) -> usize {
    content[..at].rfind('\n').map(|i| i + 1).unwrap_or(0)
}

/// End of the line holding `at`, excluding the line terminator
fn line_end(content: &str, at: usize) -> usize {
    match content[at..].find('\n') {
        Some(i) => {
            let end = at + i;
            if content[..end].ends_with('\r') {
                end - 1
            } else {
                end
            }
        }
        None => content.len(),
    }
}

//! Backlink Excerpts
//!
//! Pure algorithms that turn referencing notes into ordered, filterable excerpts.

pub mod aggregator;
pub mod aliases;
pub mod boundary;
pub mod filter_sort;
pub mod matcher;
pub mod segmenter;

pub use aggregator::{find_sources_linking_to, ResolvedLinks};
pub use aliases::AliasScanner;
pub use boundary::{Boundary, BoundaryStrategy};
pub use filter_sort::{FilterQuery, FilterSortEngine, SortConfig};
pub use matcher::{ReferenceMatch, ReferenceMatcher, TargetNote};
pub use segmenter::{segment, segment_sources, Block};

//! View Instance
//!
//! The excerpt collection and UI state of one open pane, and the view-models
//! handed to the renderer.

use serde::{Deserialize, Serialize};

use crate::backlinks::boundary::is_heading;
use crate::backlinks::{
    AliasScanner, Block, BoundaryStrategy, FilterQuery, FilterSortEngine, ReferenceMatcher,
    SortConfig, TargetNote,
};
use crate::settings::{HeaderStyle, Settings, Theme};

/// Whether the view is currently mounted in its pane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewState {
    Attached,
    Detached,
}

/// One rendered block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockView {
    pub source_path: String,
    pub title: String,
    pub header: Option<String>,
    pub content: String,
    pub is_collapsed: bool,
    pub is_visible: bool,
    pub aliases_found: Vec<String>,
}

/// Everything the renderer needs for one pane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaneView {
    pub pane_id: String,
    pub target_path: String,
    pub state: ViewState,
    pub blocks: Vec<BlockView>,
    pub declared_aliases: Vec<String>,
    pub unsaved_aliases: Vec<String>,
    pub alias_filter: Option<String>,
    pub filter_text: String,
    pub sort_descending: bool,
    pub sort_by_full_path: bool,
    pub theme: Theme,
    pub visible_count: usize,
}

#[derive(Debug, Clone, Copy)]
struct DisplayOptions {
    header_style: HeaderStyle,
    hide_backlink_line: bool,
    hide_first_header: bool,
    theme: Theme,
}

impl DisplayOptions {
    fn from_settings(settings: &Settings) -> Self {
        Self {
            header_style: settings.header_style(),
            hide_backlink_line: settings.hide_backlink_line,
            hide_first_header: settings.hide_first_header,
            theme: settings.theme(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ViewInstance {
    pub pane_id: String,
    pub target: TargetNote,
    pub blocks: Vec<Block>,
    pub unsaved_aliases: Vec<String>,
    pub filter_text: String,
    pub alias_filter: Option<String>,
    pub sort: SortConfig,
    pub blocks_collapsed_default: bool,
    pub state: ViewState,
    /// Strategy the current blocks were segmented with
    strategy: BoundaryStrategy,
    matcher: ReferenceMatcher,
    aliases: AliasScanner,
    display: DisplayOptions,
}

impl ViewInstance {
    pub fn new(pane_id: &str, target: TargetNote, blocks: Vec<Block>, settings: &Settings) -> Self {
        let mut instance = Self {
            pane_id: pane_id.to_string(),
            matcher: ReferenceMatcher::new(&target),
            aliases: AliasScanner::new(&target),
            target,
            blocks: Vec::new(),
            unsaved_aliases: Vec::new(),
            filter_text: String::new(),
            alias_filter: None,
            sort: settings.sort_config(),
            blocks_collapsed_default: settings.blocks_collapsed,
            state: ViewState::Attached,
            strategy: settings.boundary_strategy(),
            display: DisplayOptions::from_settings(settings),
        };
        instance.replace_blocks(blocks);
        instance
    }

    /// Swap in freshly segmented blocks, keeping filter and sort state
    pub fn replace_blocks(&mut self, mut blocks: Vec<Block>) {
        for block in &mut blocks {
            block.is_collapsed = self.blocks_collapsed_default;
        }
        self.unsaved_aliases = self
            .aliases
            .extract_unsaved_aliases(&blocks, &self.target.declared_aliases);
        self.blocks = blocks;
        self.refresh();
    }

    /// Take display settings from a newer snapshot
    pub fn apply_settings(&mut self, settings: &Settings) {
        self.display = DisplayOptions::from_settings(settings);
        self.blocks_collapsed_default = settings.blocks_collapsed;
    }

    /// Re-run filter and sort over the existing blocks
    pub fn refresh(&mut self) {
        let query = FilterQuery {
            filter_text: &self.filter_text,
            alias_filter: self.alias_filter.as_deref(),
            declared_aliases: &self.target.declared_aliases,
            sort: self.sort,
        };
        FilterSortEngine::apply(&mut self.blocks, &query, &self.aliases);
    }

    pub fn set_filter_text(&mut self, text: &str) {
        self.filter_text = text.to_string();
        self.refresh();
    }

    pub fn set_alias_filter(&mut self, alias: Option<String>) {
        self.alias_filter = alias;
        self.refresh();
    }

    pub fn set_sort(&mut self, sort: SortConfig) {
        self.sort = sort;
        self.refresh();
    }

    /// Returns false for an out-of-range index
    pub fn toggle_collapsed(&mut self, index: usize) -> bool {
        match self.blocks.get_mut(index) {
            Some(block) => {
                block.is_collapsed = !block.is_collapsed;
                true
            }
            None => false,
        }
    }

    pub fn set_all_collapsed(&mut self, collapsed: bool) {
        for block in &mut self.blocks {
            block.is_collapsed = collapsed;
        }
    }

    pub fn visible_count(&self) -> usize {
        self.blocks.iter().filter(|b| b.is_visible).count()
    }

    pub fn render(&self) -> PaneView {
        PaneView {
            pane_id: self.pane_id.clone(),
            target_path: self.target.path.clone(),
            state: self.state,
            blocks: self.blocks.iter().map(|b| self.render_block(b)).collect(),
            declared_aliases: self.target.declared_aliases.clone(),
            unsaved_aliases: self.unsaved_aliases.clone(),
            alias_filter: self.alias_filter.clone(),
            filter_text: self.filter_text.clone(),
            sort_descending: self.sort.descending,
            sort_by_full_path: self.sort.by_full_path,
            theme: self.display.theme,
            visible_count: self.visible_count(),
        }
    }

    fn render_block(&self, block: &Block) -> BlockView {
        let header = match self.display.header_style {
            HeaderStyle::Default => Some(
                block.source_path.strip_suffix(".md").unwrap_or(&block.source_path).to_string(),
            ),
            HeaderStyle::Minimal => Some(block.title.clone()),
            HeaderStyle::Hidden => None,
        };

        BlockView {
            source_path: block.source_path.clone(),
            title: block.title.clone(),
            header,
            content: self.render_content(&block.content),
            is_collapsed: block.is_collapsed,
            is_visible: block.is_visible,
            aliases_found: block.aliases_found.clone(),
        }
    }

    fn render_content(&self, content: &str) -> String {
        let shaped = self.strategy.rendered(content);
        let mut lines: Vec<&str> = shaped.lines().collect();
        if self.display.hide_first_header && lines.first().is_some_and(|l| is_heading(l)) {
            lines.remove(0);
        }
        if self.display.hide_backlink_line {
            lines.retain(|l| !self.matcher.contains_reference(l));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backlinks::segment;

    fn instance(settings: &Settings, sources: &[(&str, &str)]) -> ViewInstance {
        let target = TargetNote::new("Note.md", vec!["N".to_string()]);
        let matcher = ReferenceMatcher::new(&target);
        let aliases = AliasScanner::new(&target);
        let mut blocks = Vec::new();
        for (path, content) in sources {
            blocks.extend(segment(content, path, &matcher, settings.boundary_strategy(), &aliases));
        }
        for (i, b) in blocks.iter_mut().enumerate() {
            b.discovery_index = i;
        }
        ViewInstance::new("pane-1", target, blocks, settings)
    }

    #[test]
    fn test_new_applies_settings() {
        let settings =
            Settings { blocks_collapsed: true, sort_descending: true, ..Settings::default() };
        let view = instance(&settings, &[("a.md", "[[Note|n1]] a"), ("b.md", "[[Note]] b")]);
        assert!(view.blocks.iter().all(|b| b.is_collapsed));
        assert_eq!(view.blocks[0].source_path, "b.md");
        assert_eq!(view.unsaved_aliases, vec!["n1"]);
    }

    #[test]
    fn test_replace_blocks_keeps_filters() {
        let mut view = instance(&Settings::default(), &[("a.md", "[[Note|n1]] a")]);
        view.set_alias_filter(Some("n1".to_string()));
        view.set_filter_text("zzz");
        assert_eq!(view.visible_count(), 0);

        let fresh = view.blocks.clone();
        view.replace_blocks(fresh);
        assert_eq!(view.alias_filter.as_deref(), Some("n1"));
        assert_eq!(view.filter_text, "zzz");
        assert_eq!(view.visible_count(), 0);
    }

    #[test]
    fn test_render_hides_backlink_line_and_first_header() {
        let settings = Settings {
            hide_backlink_line: true,
            hide_first_header: true,
            header_style: "Minimal".to_string(),
            ..Settings::default()
        };
        let view = instance(&settings, &[("dir/a.md", "# Top [[Note]]\nbody\nsee [[Note]]")]);
        let rendered = view.render();
        // Second reference ends the first block and starts another
        assert_eq!(rendered.blocks.len(), 2);
        assert_eq!(rendered.blocks[0].content, "body\nsee ");
        assert_eq!(rendered.blocks[0].header.as_deref(), Some("a"));
        assert_eq!(view.blocks[0].content, "# Top [[Note]]\nbody\nsee ");
    }

    #[test]
    fn test_headers_only_renders_headings_and_keeps_aliases() {
        let settings = Settings {
            block_boundary_strategy: "HeadersOnly".to_string(),
            ..Settings::default()
        };
        let source = "# Heading\nmet [[Note|foo]] today\n## Next";
        let mut view = instance(&settings, &[("s.md", source)]);
        assert_eq!(view.unsaved_aliases, vec!["foo"]);

        view.set_alias_filter(Some("foo".to_string()));
        assert_eq!(view.visible_count(), 1);
        view.set_filter_text("today");
        assert_eq!(view.visible_count(), 1);

        let rendered = view.render();
        assert_eq!(rendered.blocks[0].content, "## Next");
        assert_eq!(view.blocks[0].content, "met [[Note|foo]] today\n## Next");
    }

    #[test]
    fn test_header_styles() {
        let view = instance(&Settings::default(), &[("dir/a.md", "[[Note]]")]);
        assert_eq!(view.render().blocks[0].header.as_deref(), Some("dir/a"));

        let hidden = Settings { header_style: "Hidden".to_string(), ..Settings::default() };
        let view = instance(&hidden, &[("dir/a.md", "[[Note]]")]);
        assert_eq!(view.render().blocks[0].header, None);
    }

    #[test]
    fn test_toggle_collapsed_out_of_range() {
        let mut view = instance(&Settings::default(), &[("a.md", "[[Note]]")]);
        assert!(view.toggle_collapsed(0));
        assert!(view.blocks[0].is_collapsed);
        assert!(!view.toggle_collapsed(5));
        view.set_all_collapsed(false);
        assert!(!view.blocks[0].is_collapsed);
    }
}

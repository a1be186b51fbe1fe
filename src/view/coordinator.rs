//! View Lifecycle Coordinator
//!
//! Keeps one backlink view per open pane in step with pane events.
//!
//! Per pane: ABSENT -> ATTACHED <-> DETACHED -> torn down (ABSENT again).
//! Recomputations read note content asynchronously; each one carries a
//! generation number and only the latest request for a pane may commit.

use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::host::{AliasProvider, ContentProvider, LinkIndex, Navigator, SkipPredicate, ViewSink};
use super::instance::{PaneView, ViewInstance, ViewState};
use crate::backlinks::{
    find_sources_linking_to, segment_sources, AliasScanner, Block, ReferenceMatcher, TargetNote,
};
use crate::settings::{Settings, SettingsStore};

/// Quiet window before typed filter text is applied
pub const FILTER_DEBOUNCE: Duration = Duration::from_millis(120);

/// Everything the coordinator talks to
#[derive(Clone)]
pub struct Collaborators {
    pub links: Arc<dyn LinkIndex>,
    pub content: Arc<dyn ContentProvider>,
    pub aliases: Arc<dyn AliasProvider>,
    pub skip: Arc<dyn SkipPredicate>,
    pub sink: Arc<dyn ViewSink>,
    pub navigator: Arc<dyn Navigator>,
    pub settings_store: Arc<dyn SettingsStore>,
}

/// External events the coordinator reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaneEvent {
    /// A pane opened a file or gained focus with one
    FileOpened { pane_id: String, path: String },
    /// Edit/preview switch on a pane showing `path`
    ModeChanged { pane_id: String, path: String },
    /// The set of open panes after a layout change
    PanesChanged { open: Vec<String> },
    /// Host is unloading
    Unload,
}

/// What handling an event did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// File matched the skip predicate; pane has no view
    Skipped,
    /// New view created
    Attached,
    /// Existing view remounted without recomputation
    Reattached,
    /// Existing view rebuilt from fresh content
    Recomputed,
    /// A newer request superseded this one; result discarded
    Stale,
    /// This many views were torn down
    TornDown(usize),
    /// Nothing to do (unknown pane, no view)
    Ignored,
}

struct PendingRecompute {
    generation: u64,
    target_path: String,
}

/// Pane id -> view, plus in-flight bookkeeping
#[derive(Default)]
pub struct ViewRegistry {
    views: HashMap<String, ViewInstance>,
    pending: HashMap<String, PendingRecompute>,
    filter_inputs: HashMap<String, u64>,
    next_generation: u64,
}

impl ViewRegistry {
    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn contains(&self, pane_id: &str) -> bool {
        self.views.contains_key(pane_id)
    }

    pub fn get(&self, pane_id: &str) -> Option<&ViewInstance> {
        self.views.get(pane_id)
    }

    fn begin(&mut self, pane_id: &str, target_path: &str) -> u64 {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.pending.insert(
            pane_id.to_string(),
            PendingRecompute { generation, target_path: target_path.to_string() },
        );
        generation
    }

    fn is_latest(&self, pane_id: &str, generation: u64) -> bool {
        self.pending.get(pane_id).is_some_and(|p| p.generation == generation)
    }

    fn remove(&mut self, pane_id: &str) -> Option<ViewInstance> {
        self.pending.remove(pane_id);
        self.filter_inputs.remove(pane_id);
        self.views.remove(pane_id)
    }
}

pub struct ViewCoordinator {
    host: Collaborators,
    settings: RwLock<Settings>,
    registry: Mutex<ViewRegistry>,
}

impl ViewCoordinator {
    pub fn new(host: Collaborators) -> Self {
        let settings = host.settings_store.load();
        Self {
            host,
            settings: RwLock::new(settings),
            registry: Mutex::new(ViewRegistry::default()),
        }
    }

    pub async fn handle(&self, event: PaneEvent) -> Outcome {
        match event {
            PaneEvent::FileOpened { pane_id, path } => self.on_file_opened(&pane_id, &path).await,
            PaneEvent::ModeChanged { pane_id, path } => self.on_mode_changed(&pane_id, &path).await,
            PaneEvent::PanesChanged { open } => Outcome::TornDown(self.on_panes_changed(&open)),
            PaneEvent::Unload => Outcome::TornDown(self.unload()),
        }
    }

    /// Pane opened or focused a file
    pub async fn on_file_opened(&self, pane_id: &str, path: &str) -> Outcome {
        if self.host.skip.should_skip(path) {
            self.teardown(pane_id);
            debug!(pane_id = %pane_id, path = %path, "Skipping backlink view");
            return Outcome::Skipped;
        }

        let reattached = {
            let mut registry = self.registry.lock();
            let same_target = registry
                .views
                .get(pane_id)
                .is_some_and(|v| v.target.path == path);
            if same_target {
                // Any in-flight request for another file is superseded
                registry.pending.remove(pane_id);
                registry.views.get_mut(pane_id).map(|view| {
                    view.state = ViewState::Attached;
                    view.render()
                })
            } else {
                None
            }
        };

        if let Some(view) = reattached {
            debug!(pane_id = %pane_id, path = %path, "Reattached backlink view");
            self.host.sink.render(&view);
            return Outcome::Reattached;
        }

        self.recompute(pane_id, path).await
    }

    /// Edit/preview switch: rebuild, or tear down if the file is now skipped
    pub async fn on_mode_changed(&self, pane_id: &str, path: &str) -> Outcome {
        let known = {
            let registry = self.registry.lock();
            registry.views.contains_key(pane_id) || registry.pending.contains_key(pane_id)
        };
        if !known {
            return Outcome::Ignored;
        }

        if self.host.skip.should_skip(path) {
            return Outcome::TornDown(usize::from(self.teardown(pane_id)));
        }

        self.recompute(pane_id, path).await
    }

    /// Rebuild a pane's view for its current target, e.g. after the link
    /// index changed
    pub async fn refresh(&self, pane_id: &str) -> Outcome {
        let target = self.registry.lock().views.get(pane_id).map(|v| v.target.path.clone());
        match target {
            Some(path) => self.on_mode_changed(pane_id, &path).await,
            None => Outcome::Ignored,
        }
    }

    /// Tear down every view whose pane is no longer open
    pub fn on_panes_changed(&self, open: &[String]) -> usize {
        let open: HashSet<&str> = open.iter().map(String::as_str).collect();
        let closed: Vec<String> = {
            let registry = self.registry.lock();
            registry
                .views
                .keys()
                .chain(registry.pending.keys())
                .filter(|id| !open.contains(id.as_str()))
                .cloned()
                .collect::<HashSet<_>>()
                .into_iter()
                .collect()
        };

        closed.iter().filter(|id| self.teardown(id)).count()
    }

    /// Tear down everything
    pub fn unload(&self) -> usize {
        let ids: Vec<String> = {
            let registry = self.registry.lock();
            registry
                .views
                .keys()
                .chain(registry.pending.keys())
                .cloned()
                .collect::<HashSet<_>>()
                .into_iter()
                .collect()
        };
        let count = ids.iter().filter(|id| self.teardown(id)).count();
        info!(count = count, "Unloaded backlink views");
        count
    }

    /// Pane hidden but still open; blocks are kept for reattachment
    pub fn detach(&self, pane_id: &str) -> bool {
        let mut registry = self.registry.lock();
        match registry.views.get_mut(pane_id) {
            Some(view) => {
                view.state = ViewState::Detached;
                true
            }
            None => false,
        }
    }

    /// Remove a pane's view and cancel its in-flight work. Returns whether a
    /// view existed.
    fn teardown(&self, pane_id: &str) -> bool {
        let removed = self.registry.lock().remove(pane_id);
        match removed {
            Some(_) => {
                info!(pane_id = %pane_id, "Tore down backlink view");
                self.host.sink.teardown(pane_id);
                true
            }
            None => false,
        }
    }

    async fn recompute(&self, pane_id: &str, path: &str) -> Outcome {
        let generation = self.registry.lock().begin(pane_id, path);
        let settings = self.settings.read().clone();

        let (target, blocks) = self.compute(path, &settings).await;

        let (outcome, view) = {
            let mut registry = self.registry.lock();
            if !registry.is_latest(pane_id, generation) {
                debug!(
                    pane_id = %pane_id,
                    path = %path,
                    generation = generation,
                    "Discarding stale backlink result"
                );
                return Outcome::Stale;
            }
            registry.pending.remove(pane_id);

            let previous = registry.views.remove(pane_id);
            let mut instance = ViewInstance::new(pane_id, target, blocks, &settings);
            let outcome = match previous {
                Some(old) => {
                    if old.target.path == instance.target.path {
                        instance.filter_text = old.filter_text;
                        instance.alias_filter = old.alias_filter;
                        instance.sort = old.sort;
                        instance.refresh();
                    }
                    Outcome::Recomputed
                }
                None => Outcome::Attached,
            };
            let view = instance.render();
            registry.views.insert(pane_id.to_string(), instance);
            (outcome, view)
        };

        info!(pane_id = %pane_id, path = %path, blocks = view.blocks.len(), "Backlink view ready");
        self.host.sink.render(&view);
        outcome
    }

    async fn compute(&self, path: &str, settings: &Settings) -> (TargetNote, Vec<Block>) {
        let target = TargetNote::new(path, self.host.aliases.declared_aliases(path));
        let matcher = ReferenceMatcher::new(&target);
        let scanner = AliasScanner::new(&target);
        let sources = find_sources_linking_to(path, &self.host.links.resolved_links());

        let blocks = segment_sources(
            self.host.content.as_ref(),
            &sources,
            &matcher,
            settings.boundary_strategy(),
            &scanner,
        )
        .await;

        debug!(
            path = %path,
            sources = sources.len(),
            blocks = blocks.len(),
            "Computed backlink blocks"
        );
        (target, blocks)
    }

    /// Mutate one view and push the result to the sink. None for an unknown pane.
    fn update_view<R>(&self, pane_id: &str, f: impl FnOnce(&mut ViewInstance) -> R) -> Option<R> {
        let (result, view) = {
            let mut registry = self.registry.lock();
            let instance = registry.views.get_mut(pane_id)?;
            let result = f(instance);
            (result, instance.render())
        };
        self.host.sink.render(&view);
        Some(result)
    }

    /// Typed filter input. Only the last input within the debounce window
    /// is applied; returns whether this one was.
    pub async fn input_filter_text(&self, pane_id: &str, text: &str) -> bool {
        let ticket = {
            let mut registry = self.registry.lock();
            if !registry.views.contains_key(pane_id) {
                return false;
            }
            let counter = registry.filter_inputs.entry(pane_id.to_string()).or_insert(0);
            *counter += 1;
            *counter
        };

        tokio::time::sleep(FILTER_DEBOUNCE).await;

        let latest = self.registry.lock().filter_inputs.get(pane_id).copied();
        if latest != Some(ticket) {
            debug!(pane_id = %pane_id, "Filter input coalesced");
            return false;
        }
        self.apply_filter_text(pane_id, text)
    }

    pub fn apply_filter_text(&self, pane_id: &str, text: &str) -> bool {
        self.update_view(pane_id, |v| v.set_filter_text(text)).is_some()
    }

    pub fn set_alias_filter(&self, pane_id: &str, alias: Option<String>) -> bool {
        self.update_view(pane_id, |v| v.set_alias_filter(alias)).is_some()
    }

    pub fn toggle_sort_direction(&self, pane_id: &str) -> bool {
        let sort = self.update_view(pane_id, |v| {
            let mut sort = v.sort;
            sort.descending = !sort.descending;
            v.set_sort(sort);
            sort
        });
        match sort {
            Some(sort) => {
                self.persist(|s| s.sort_descending = sort.descending);
                true
            }
            None => false,
        }
    }

    pub fn toggle_sort_by_full_path(&self, pane_id: &str) -> bool {
        let sort = self.update_view(pane_id, |v| {
            let mut sort = v.sort;
            sort.by_full_path = !sort.by_full_path;
            v.set_sort(sort);
            sort
        });
        match sort {
            Some(sort) => {
                self.persist(|s| s.sort_by_full_path = sort.by_full_path);
                true
            }
            None => false,
        }
    }

    pub fn toggle_block_collapsed(&self, pane_id: &str, index: usize) -> bool {
        self.update_view(pane_id, |v| v.toggle_collapsed(index)).unwrap_or(false)
    }

    pub fn set_all_collapsed(&self, pane_id: &str, collapsed: bool) -> bool {
        self.update_view(pane_id, |v| v.set_all_collapsed(collapsed)).is_some()
    }

    /// Open the source note of the block at `index`
    pub fn activate_link(&self, pane_id: &str, index: usize, new_tab: bool) -> bool {
        let path = {
            let registry = self.registry.lock();
            registry
                .views
                .get(pane_id)
                .and_then(|v| v.blocks.get(index))
                .map(|b| b.source_path.clone())
        };
        match path {
            Some(path) => {
                self.host.navigator.open_link(&path, new_tab);
                true
            }
            None => false,
        }
    }

    /// New settings snapshot. Display options reach live views at once; the
    /// boundary strategy is used from the next recomputation on.
    pub fn update_settings(&self, settings: Settings) {
        *self.settings.write() = settings.clone();
        let views: Vec<PaneView> = {
            let mut registry = self.registry.lock();
            registry
                .views
                .values_mut()
                .map(|view| {
                    view.apply_settings(&settings);
                    view.render()
                })
                .collect()
        };
        for view in &views {
            self.host.sink.render(view);
        }
    }

    pub fn settings(&self) -> Settings {
        self.settings.read().clone()
    }

    fn persist(&self, change: impl FnOnce(&mut Settings)) {
        let snapshot = {
            let mut settings = self.settings.write();
            change(&mut settings);
            settings.clone()
        };
        if let Err(e) = self.host.settings_store.save(&snapshot) {
            warn!(error = %e, "Failed to save settings");
        }
    }

    pub fn view(&self, pane_id: &str) -> Option<PaneView> {
        self.registry.lock().get(pane_id).map(ViewInstance::render)
    }

    pub fn pane_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.registry.lock().views.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn view_count(&self) -> usize {
        self.registry.lock().len()
    }

    /// Target of the newest unfinished request for a pane
    pub fn pending_target(&self, pane_id: &str) -> Option<String> {
        self.registry.lock().pending.get(pane_id).map(|p| p.target_path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backlinks::ResolvedLinks;
    use crate::settings::MemorySettingsStore;
    use crate::view::host::ContentError;
    use futures::future::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// In-memory vault with injectable failures and read gates
    #[derive(Default)]
    struct FakeHost {
        links: Mutex<ResolvedLinks>,
        files: Mutex<HashMap<String, String>>,
        aliases: Mutex<HashMap<String, Vec<String>>>,
        gates: Mutex<HashMap<String, Arc<Notify>>>,
        skipped: Mutex<HashSet<String>>,
        reads: AtomicUsize,
        rendered: Mutex<Vec<PaneView>>,
        torn_down: Mutex<Vec<String>>,
        opened: Mutex<Vec<(String, bool)>>,
    }

    impl FakeHost {
        fn add_note(&self, path: &str, content: &str, links_to: &[&str]) {
            self.files.lock().insert(path.to_string(), content.to_string());
            self.links
                .lock()
                .insert(path.to_string(), links_to.iter().map(|t| t.to_string()).collect());
        }

        fn gate(&self, path: &str) -> Arc<Notify> {
            let gate = Arc::new(Notify::new());
            self.gates.lock().insert(path.to_string(), gate.clone());
            gate
        }
    }

    impl LinkIndex for FakeHost {
        fn resolved_links(&self) -> ResolvedLinks {
            self.links.lock().clone()
        }
    }

    impl ContentProvider for FakeHost {
        fn read<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<String, ContentError>> {
            Box::pin(async move {
                self.reads.fetch_add(1, Ordering::SeqCst);
                let gate = self.gates.lock().get(path).cloned();
                if let Some(gate) = gate {
                    gate.notified().await;
                }
                self.files
                    .lock()
                    .get(path)
                    .cloned()
                    .ok_or_else(|| ContentError::NotFound(path.to_string()))
            })
        }
    }

    impl AliasProvider for FakeHost {
        fn declared_aliases(&self, path: &str) -> Vec<String> {
            self.aliases.lock().get(path).cloned().unwrap_or_default()
        }
    }

    impl SkipPredicate for FakeHost {
        fn should_skip(&self, path: &str) -> bool {
            self.skipped.lock().contains(path)
        }
    }

    impl ViewSink for FakeHost {
        fn render(&self, view: &PaneView) {
            self.rendered.lock().push(view.clone());
        }

        fn teardown(&self, pane_id: &str) {
            self.torn_down.lock().push(pane_id.to_string());
        }
    }

    impl Navigator for FakeHost {
        fn open_link(&self, path: &str, new_tab: bool) {
            self.opened.lock().push((path.to_string(), new_tab));
        }
    }

    fn setup() -> (Arc<FakeHost>, Arc<MemorySettingsStore>, ViewCoordinator) {
        let host = Arc::new(FakeHost::default());
        host.add_note(
            "src/one.md",
            "intro\n[[Target]] first mention\nmore\n---\nafter",
            &["Target.md"],
        );
        host.add_note("src/two.md", "[[Target|tgt]] second", &["Target.md", "Other.md"]);
        host.add_note("Other.md", "unrelated", &[]);
        let store = Arc::new(MemorySettingsStore::default());
        let coordinator = ViewCoordinator::new(Collaborators {
            links: host.clone(),
            content: host.clone(),
            aliases: host.clone(),
            skip: host.clone(),
            sink: host.clone(),
            navigator: host.clone(),
            settings_store: store.clone(),
        });
        (host, store, coordinator)
    }

    #[tokio::test]
    async fn test_open_attaches_view() {
        let (host, _, coord) = setup();
        let outcome = coord.on_file_opened("p1", "Target.md").await;
        assert_eq!(outcome, Outcome::Attached);

        let view = coord.view("p1").unwrap();
        assert_eq!(view.blocks.len(), 2);
        assert_eq!(view.blocks[0].source_path, "src/one.md");
        assert_eq!(view.blocks[0].content, "[[Target]] first mention\nmore\n");
        assert_eq!(view.unsaved_aliases, vec!["tgt"]);
        assert_eq!(host.rendered.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_reattach_does_not_recompute() {
        let (host, _, coord) = setup();
        coord.on_file_opened("p1", "Target.md").await;
        let reads = host.reads.load(Ordering::SeqCst);

        assert!(coord.detach("p1"));
        assert_eq!(coord.view("p1").unwrap().state, ViewState::Detached);

        let outcome = coord.on_file_opened("p1", "Target.md").await;
        assert_eq!(outcome, Outcome::Reattached);
        assert_eq!(host.reads.load(Ordering::SeqCst), reads);
        assert_eq!(coord.view("p1").unwrap().state, ViewState::Attached);
    }

    #[tokio::test]
    async fn test_two_panes_are_independent() {
        let (host, _, coord) = setup();
        coord.on_file_opened("left", "Target.md").await;
        coord.on_file_opened("right", "Target.md").await;
        assert_eq!(coord.pane_ids(), vec!["left".to_string(), "right".to_string()]);

        assert!(coord.apply_filter_text("left", "second"));
        assert!(coord.set_alias_filter("right", Some("tgt".to_string())));
        assert!(coord.toggle_sort_direction("right"));

        let left = coord.view("left").unwrap();
        let right = coord.view("right").unwrap();
        assert_eq!(left.filter_text, "second");
        assert_eq!(left.alias_filter, None);
        assert!(!left.sort_descending);
        assert_eq!(right.filter_text, "");
        assert!(right.sort_descending);

        let torn = coord.on_panes_changed(&["right".to_string()]);
        assert_eq!(torn, 1);
        assert!(coord.view("left").is_none());
        assert_eq!(coord.view("right").unwrap(), right);
        assert_eq!(*host.torn_down.lock(), vec!["left".to_string()]);
    }

    #[tokio::test]
    async fn test_refresh_picks_up_new_sources() {
        let (host, _, coord) = setup();
        assert_eq!(coord.refresh("p1").await, Outcome::Ignored);

        coord.on_file_opened("p1", "Target.md").await;
        assert!(coord.apply_filter_text("p1", "mention"));
        host.add_note("new.md", "[[Target]] fresh mention", &["Target.md"]);

        assert_eq!(coord.refresh("p1").await, Outcome::Recomputed);
        let view = coord.view("p1").unwrap();
        assert_eq!(view.blocks.len(), 3);
        assert_eq!(view.filter_text, "mention");
        assert_eq!(view.visible_count, 2);
    }

    #[tokio::test]
    async fn test_skip_predicate() {
        let (host, _, coord) = setup();
        host.skipped.lock().insert("2024-01-01.md".to_string());

        assert_eq!(coord.on_file_opened("p1", "2024-01-01.md").await, Outcome::Skipped);
        assert_eq!(coord.view_count(), 0);

        coord.on_file_opened("p1", "Target.md").await;
        assert_eq!(coord.on_file_opened("p1", "2024-01-01.md").await, Outcome::Skipped);
        assert!(coord.view("p1").is_none());
    }

    #[tokio::test]
    async fn test_headers_only_view_keeps_alias_data() {
        let (host, _, coord) = setup();
        host.add_note(
            "src/three.md",
            "# Intro\nmet [[Target|tgt2]] today\n## Next",
            &["Target.md"],
        );
        coord.update_settings(Settings {
            block_boundary_strategy: "HeadersOnly".to_string(),
            ..Settings::default()
        });

        assert_eq!(coord.on_file_opened("p1", "Target.md").await, Outcome::Attached);
        let view = coord.view("p1").unwrap();
        assert_eq!(view.unsaved_aliases, vec!["tgt", "tgt2"]);
        let three = view.blocks.iter().find(|b| b.source_path == "src/three.md").unwrap();
        assert_eq!(three.content, "## Next");

        assert!(coord.set_alias_filter("p1", Some("tgt2".to_string())));
        let view = coord.view("p1").unwrap();
        assert_eq!(view.visible_count, 1);
        let visible: Vec<&str> =
            view.blocks.iter().filter(|b| b.is_visible).map(|b| b.source_path.as_str()).collect();
        assert_eq!(visible, vec!["src/three.md"]);
    }

    #[tokio::test]
    async fn test_mode_change_recomputes_with_new_settings() {
        let (_, _, coord) = setup();
        coord.on_file_opened("p1", "Target.md").await;
        coord.apply_filter_text("p1", "mention");

        coord.update_settings(Settings {
            block_boundary_strategy: "TopLine".to_string(),
            ..Settings::default()
        });
        let outcome = coord.on_mode_changed("p1", "Target.md").await;
        assert_eq!(outcome, Outcome::Recomputed);

        let view = coord.view("p1").unwrap();
        assert_eq!(view.blocks[0].content, "[[Target]] first mention");
        assert_eq!(view.filter_text, "mention");
        assert_eq!(view.visible_count, 1);
    }

    #[tokio::test]
    async fn test_update_settings_restyles_live_views() {
        let (host, _, coord) = setup();
        coord.on_file_opened("p1", "Target.md").await;
        assert_eq!(coord.view("p1").unwrap().blocks[0].header.as_deref(), Some("src/one"));

        coord.update_settings(Settings {
            header_style: "Hidden".to_string(),
            block_boundary_strategy: "TopLine".to_string(),
            ..Settings::default()
        });

        let view = coord.view("p1").unwrap();
        assert_eq!(view.blocks[0].header, None);
        // Boundaries wait for the next recomputation
        assert_eq!(view.blocks[0].content, "[[Target]] first mention\nmore");
        assert_eq!(host.rendered.lock().last().unwrap(), &view);
    }

    #[tokio::test]
    async fn test_mode_change_tears_down_when_skipped() {
        let (host, _, coord) = setup();
        coord.on_file_opened("p1", "Target.md").await;
        host.skipped.lock().insert("Target.md".to_string());

        assert_eq!(coord.on_mode_changed("p1", "Target.md").await, Outcome::TornDown(1));
        assert!(coord.view("p1").is_none());
    }

    #[tokio::test]
    async fn test_mode_change_on_unknown_pane_is_ignored() {
        let (_, _, coord) = setup();
        assert_eq!(coord.on_mode_changed("nope", "Target.md").await, Outcome::Ignored);
        assert_eq!(coord.view_count(), 0);
    }

    #[tokio::test]
    async fn test_newer_target_supersedes_in_flight() {
        let (host, _, coord) = setup();
        host.add_note("src/three.md", "[[Next]] here", &["Next.md"]);
        let gate = host.gate("src/one.md");

        let first = coord.on_file_opened("p1", "Target.md");
        let second = async {
            let outcome = coord.on_file_opened("p1", "Next.md").await;
            gate.notify_one();
            outcome
        };
        let (first, second) = tokio::join!(first, second);

        assert_eq!(second, Outcome::Attached);
        assert_eq!(first, Outcome::Stale);
        assert_eq!(coord.view("p1").unwrap().target_path, "Next.md");
        assert_eq!(coord.pending_target("p1"), None);
    }

    #[tokio::test]
    async fn test_teardown_discards_in_flight() {
        let (host, _, coord) = setup();
        let gate = host.gate("src/one.md");

        let open = coord.on_file_opened("p1", "Target.md");
        let close = async {
            tokio::task::yield_now().await;
            assert_eq!(coord.pending_target("p1").as_deref(), Some("Target.md"));
            let torn = coord.on_panes_changed(&[]);
            gate.notify_one();
            torn
        };
        let (outcome, torn) = tokio::join!(open, close);

        assert_eq!(outcome, Outcome::Stale);
        assert_eq!(torn, 0);
        assert!(coord.view("p1").is_none());
    }

    #[tokio::test]
    async fn test_failed_read_degrades() {
        let (host, _, coord) = setup();
        host.files.lock().remove("src/one.md");
        coord.on_file_opened("p1", "Target.md").await;
        let view = coord.view("p1").unwrap();
        assert_eq!(view.blocks.len(), 1);
        assert_eq!(view.blocks[0].source_path, "src/two.md");
    }

    #[tokio::test]
    async fn test_unload_tears_down_all() {
        let (host, _, coord) = setup();
        coord.on_file_opened("a", "Target.md").await;
        coord.on_file_opened("b", "Other.md").await;
        assert_eq!(coord.handle(PaneEvent::Unload).await, Outcome::TornDown(2));
        assert_eq!(coord.view_count(), 0);
        assert_eq!(host.torn_down.lock().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_filter_input_is_debounced() {
        let (_, _, coord) = setup();
        coord.on_file_opened("p1", "Target.md").await;

        let typing = async {
            let first = coord.input_filter_text("p1", "s");
            let second = async {
                tokio::time::sleep(Duration::from_millis(30)).await;
                coord.input_filter_text("p1", "se").await
            };
            let third = async {
                tokio::time::sleep(Duration::from_millis(60)).await;
                coord.input_filter_text("p1", "sec").await
            };
            tokio::join!(first, second, third)
        };
        let (first, second, third) = typing.await;

        assert!(!first);
        assert!(!second);
        assert!(third);
        let view = coord.view("p1").unwrap();
        assert_eq!(view.filter_text, "sec");
        assert_eq!(view.visible_count, 1);
    }

    #[tokio::test]
    async fn test_sort_toggles_are_persisted() {
        let (_, store, coord) = setup();
        coord.on_file_opened("p1", "Target.md").await;

        assert!(coord.toggle_sort_direction("p1"));
        assert!(coord.toggle_sort_by_full_path("p1"));
        let saved = store.load();
        assert!(saved.sort_descending);
        assert!(saved.sort_by_full_path);
        assert!(!coord.toggle_sort_direction("missing"));
    }

    #[tokio::test]
    async fn test_collapse_and_activate() {
        let (host, _, coord) = setup();
        coord.on_file_opened("p1", "Target.md").await;

        assert!(coord.toggle_block_collapsed("p1", 1));
        assert!(coord.view("p1").unwrap().blocks[1].is_collapsed);
        assert!(!coord.toggle_block_collapsed("p1", 9));
        assert!(coord.set_all_collapsed("p1", true));
        assert!(coord.view("p1").unwrap().blocks.iter().all(|b| b.is_collapsed));

        assert!(coord.activate_link("p1", 1, true));
        assert_eq!(*host.opened.lock(), vec![("src/two.md".to_string(), true)]);
        assert!(!coord.activate_link("p1", 7, false));
    }
}

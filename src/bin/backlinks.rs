//! Backlinks CLI
//!
//! Shows the backlink excerpts of a note in a markdown vault as JSON.

use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use backlink_blocks_lib::{
    find_sources_linking_to, Collaborators, DailyNoteMode, DailyNoteSkip, JsonSettingsStore,
    LinkIndex, MemorySettingsStore, Navigator, NullSink, Outcome, PaneView, SettingsStore,
    SharedVault, VaultWatcher, ViewCoordinator, ViewSink,
};

/// Pane id used for the single view the CLI drives
const CLI_PANE: &str = "cli";

#[derive(Parser)]
#[command(name = "backlinks")]
#[command(about = "Backlink excerpts for notes in a markdown vault", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the backlink view of a note
    Show {
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Print declared and undeclared aliases of a note
    Aliases {
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Print the notes linking to a note
    Sources {
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Print a fresh view every time the vault changes
    Watch {
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        view: ViewArgs,
    },
}

#[derive(Args)]
struct TargetArgs {
    /// Note path, path without .md, or title
    note: String,
    /// Vault directory
    #[arg(short, long, default_value = ".")]
    vault: PathBuf,
}

#[derive(Args)]
struct ViewArgs {
    /// Boundary strategy: Default, HeadersOnly, TopLine, SingleLine
    #[arg(short, long)]
    strategy: Option<String>,
    /// Case-insensitive text filter
    #[arg(short, long)]
    filter: Option<String>,
    /// Only blocks using this alias
    #[arg(short, long)]
    alias: Option<String>,
    /// Sort descending
    #[arg(long)]
    descending: bool,
    /// Sort on full path instead of file name
    #[arg(long)]
    full_path: bool,
    /// Skip daily notes
    #[arg(long)]
    exclude_daily: bool,
    /// Settings file (default: config dir)
    #[arg(long)]
    settings: Option<PathBuf>,
}

// ============ Output Types ============

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AliasesOutput {
    path: String,
    declared: Vec<String>,
    unsaved: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SourcesOutput {
    path: String,
    sources: Vec<String>,
}

#[derive(Serialize)]
struct ErrorOutput {
    error: String,
}

/// Prints every rendered view as one JSON line once live. Renders while the
/// view is being set up are dropped.
#[derive(Default)]
struct JsonLinesSink {
    live: AtomicBool,
}

impl JsonLinesSink {
    fn go_live(&self) {
        self.live.store(true, Ordering::SeqCst);
    }
}

impl ViewSink for JsonLinesSink {
    fn render(&self, view: &PaneView) {
        if !self.live.load(Ordering::SeqCst) {
            return;
        }
        match serde_json::to_string(view) {
            Ok(json) => println!("{}", json),
            Err(e) => tracing::warn!(error = %e, "Failed to serialize view"),
        }
    }

    fn teardown(&self, pane_id: &str) {
        tracing::debug!(pane_id = %pane_id, "View torn down");
    }
}

/// Links are only printed, there is nowhere to open them
struct NoNavigation;

impl Navigator for NoNavigation {
    fn open_link(&self, path: &str, new_tab: bool) {
        tracing::info!(path = %path, new_tab = new_tab, "Link activation ignored");
    }
}

// ============ Main ============

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Show { target, view } => handle_show(target, view).await,
        Commands::Aliases { target } => handle_aliases(target).await,
        Commands::Sources { target } => handle_sources(target),
        Commands::Watch { target, view } => handle_watch(target, view).await,
    };

    match result {
        Ok(Some(json)) => println!("{}", json),
        Ok(None) => {}
        Err(e) => {
            let error = ErrorOutput { error: format!("{:#}", e) };
            match serde_json::to_string(&error) {
                Ok(json) => println!("{}", json),
                Err(_) => eprintln!("{:#}", e),
            }
            std::process::exit(1);
        }
    }
}

// ============ Handlers ============

fn open_vault(target: &TargetArgs) -> anyhow::Result<(SharedVault, String)> {
    let (vault, stats) = SharedVault::open(&target.vault)
        .with_context(|| format!("Cannot index vault {}", target.vault.display()))?;
    for error in &stats.errors {
        tracing::warn!(error = %error, "Note skipped during indexing");
    }
    let path = vault
        .resolve(&target.note)
        .ok_or_else(|| anyhow!("Note not found: {}", target.note))?;
    Ok((vault, path))
}

fn build_coordinator(
    vault: &SharedVault,
    args: &ViewArgs,
    sink: Arc<dyn ViewSink>,
) -> ViewCoordinator {
    let store: Arc<dyn SettingsStore> = match &args.settings {
        Some(path) => Arc::new(JsonSettingsStore::new(path)),
        None => match JsonSettingsStore::default_location() {
            Ok(store) => Arc::new(store),
            Err(e) => {
                tracing::warn!(error = %e, "No settings location, using defaults");
                Arc::new(MemorySettingsStore::default())
            }
        },
    };

    let mut settings = store.load();
    if let Some(strategy) = &args.strategy {
        settings.block_boundary_strategy = strategy.clone();
    }
    settings.sort_descending |= args.descending;
    settings.sort_by_full_path |= args.full_path;

    let skip = if args.exclude_daily {
        DailyNoteSkip::new(DailyNoteMode::ExcludeDaily)
    } else {
        DailyNoteSkip::from_settings(&settings)
    };

    let vault = Arc::new(vault.clone());
    ViewCoordinator::new(Collaborators {
        links: vault.clone(),
        content: vault.clone(),
        aliases: vault,
        skip: Arc::new(skip),
        sink,
        navigator: Arc::new(NoNavigation),
        // CLI overrides are not written back
        settings_store: Arc::new(MemorySettingsStore::new(settings)),
    })
}

async fn open_view(
    coordinator: &ViewCoordinator,
    path: &str,
    args: &ViewArgs,
) -> anyhow::Result<PaneView> {
    match coordinator.on_file_opened(CLI_PANE, path).await {
        Outcome::Skipped => return Err(anyhow!("Note is excluded from backlink views: {}", path)),
        outcome => tracing::debug!(outcome = ?outcome, "Opened view"),
    }
    if let Some(alias) = &args.alias {
        coordinator.set_alias_filter(CLI_PANE, Some(alias.clone()));
    }
    if let Some(filter) = &args.filter {
        coordinator.apply_filter_text(CLI_PANE, filter);
    }
    coordinator
        .view(CLI_PANE)
        .ok_or_else(|| anyhow!("No view for {}", path))
}

async fn handle_show(target: TargetArgs, args: ViewArgs) -> anyhow::Result<Option<String>> {
    let (vault, path) = open_vault(&target)?;
    let coordinator = build_coordinator(&vault, &args, Arc::new(NullSink));
    let view = open_view(&coordinator, &path, &args).await?;
    Ok(Some(serde_json::to_string(&view)?))
}

async fn handle_aliases(target: TargetArgs) -> anyhow::Result<Option<String>> {
    let (vault, path) = open_vault(&target)?;
    let args = ViewArgs {
        strategy: None,
        filter: None,
        alias: None,
        descending: false,
        full_path: false,
        exclude_daily: false,
        settings: None,
    };
    let coordinator = build_coordinator(&vault, &args, Arc::new(NullSink));
    let view = open_view(&coordinator, &path, &args).await?;
    let output = AliasesOutput {
        path,
        declared: view.declared_aliases,
        unsaved: view.unsaved_aliases,
    };
    Ok(Some(serde_json::to_string(&output)?))
}

fn handle_sources(target: TargetArgs) -> anyhow::Result<Option<String>> {
    let (vault, path) = open_vault(&target)?;
    let sources = find_sources_linking_to(&path, &vault.resolved_links());
    Ok(Some(serde_json::to_string(&SourcesOutput { path, sources })?))
}

async fn handle_watch(target: TargetArgs, args: ViewArgs) -> anyhow::Result<Option<String>> {
    let (vault, path) = open_vault(&target)?;
    let sink = Arc::new(JsonLinesSink::default());
    let coordinator = build_coordinator(&vault, &args, sink.clone());
    let view = open_view(&coordinator, &path, &args).await?;
    println!("{}", serde_json::to_string(&view)?);
    sink.go_live();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _watcher = VaultWatcher::start(vault, move |event| {
        let _ = tx.send(event);
    })?;

    loop {
        tokio::select! {
            Some(event) = rx.recv() => {
                tracing::info!(
                    paths = event.paths.len(),
                    reindexed = event.reindexed,
                    "Vault changed"
                );
                coordinator.refresh(CLI_PANE).await;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    coordinator.unload();
    Ok(None)
}

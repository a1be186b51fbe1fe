//! Vault Indexer
//!
//! Scans a directory of markdown notes and builds the resolved-link index and
//! the declared-alias table the backlink views read from.
//! Read-only: never modifies the vault.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::backlinks::ResolvedLinks;

#[derive(Error, Debug)]
pub enum VaultError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid vault path: {0}")]
    InvalidPath(String),
    #[error("Watcher error: {0}")]
    Watch(#[from] notify::Error),
}

impl Serialize for VaultError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Indexed note metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteIndex {
    /// Relative path from vault root, `/`-separated
    pub path: String,
    /// Note title (filename without .md)
    pub title: String,
    /// Raw link targets `[[target]]`, alias and subpath removed
    pub links: Vec<String>,
    /// Aliases declared in frontmatter
    pub aliases: Vec<String>,
    pub modified: DateTime<Utc>,
}

/// Full vault index
#[derive(Debug, Clone, Default)]
pub struct VaultIndex {
    pub vault_path: PathBuf,
    /// Indexed notes by path
    pub notes: BTreeMap<String, NoteIndex>,
    /// Lowercased title to path mapping for link resolution
    pub title_to_path: HashMap<String, String>,
    /// Source path -> resolved target paths
    pub resolved: ResolvedLinks,
    pub last_indexed: DateTime<Utc>,
}

impl VaultIndex {
    pub fn new(vault_path: PathBuf) -> Self {
        Self {
            vault_path,
            notes: BTreeMap::new(),
            title_to_path: HashMap::new(),
            resolved: ResolvedLinks::new(),
            last_indexed: Utc::now(),
        }
    }

    /// Index a single note file
    fn index_note(&mut self, path: &Path) -> Result<(), VaultError> {
        let content = fs::read_to_string(path)?;
        let relative_path = path
            .strip_prefix(&self.vault_path)
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_else(|_| path.to_string_lossy().to_string());

        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| relative_path.clone());

        let modified: DateTime<Utc> = fs::metadata(path)?
            .modified()
            .map(|t| t.into())
            .unwrap_or_else(|_| Utc::now());

        let note = NoteIndex {
            path: relative_path.clone(),
            title: title.clone(),
            links: extract_links(&content),
            aliases: extract_aliases(&content),
            modified,
        };

        self.title_to_path
            .entry(title.to_lowercase())
            .or_insert_with(|| relative_path.clone());
        self.notes.insert(relative_path, note);
        Ok(())
    }

    /// Resolve every note's links (second pass)
    fn build_resolved_links(&mut self) {
        let resolved: ResolvedLinks = self
            .notes
            .values()
            .map(|note| {
                let targets: BTreeSet<String> =
                    note.links.iter().filter_map(|l| self.resolve_link(l)).collect();
                (note.path.clone(), targets)
            })
            .filter(|(_, targets)| !targets.is_empty())
            .collect();
        self.resolved = resolved;
    }

    /// Resolve a link target to a note path
    pub fn resolve_link(&self, link: &str) -> Option<String> {
        let target = link.trim();

        if self.notes.contains_key(target) {
            return Some(target.to_string());
        }

        let with_md = format!("{}.md", target);
        if self.notes.contains_key(&with_md) {
            return Some(with_md);
        }

        let stem = target.rsplit('/').next().unwrap_or(target);
        let stem = stem.strip_suffix(".md").unwrap_or(stem);
        self.title_to_path.get(&stem.to_lowercase()).cloned()
    }

    pub fn declared_aliases(&self, path: &str) -> Vec<String> {
        self.notes.get(path).map(|n| n.aliases.clone()).unwrap_or_default()
    }
}

/// Extract [[link]] targets from content
fn extract_links(content: &str) -> Vec<String> {
    let mut links = Vec::new();
    let mut rest = content;

    while let Some(open) = rest.find("[[") {
        let after = &rest[open + 2..];
        let Some(close) = after.find("]]") else { break };
        let inner = &after[..close];
        if !inner.contains('\n') {
            let target = inner.split(['|', '#']).next().unwrap_or(inner).trim();
            if !target.is_empty() {
                links.push(target.to_string());
            }
        }
        rest = &after[close + 2..];
    }

    links
}

/// Frontmatter `aliases` / `alias`, as a list or a comma-separated string
fn extract_aliases(content: &str) -> Vec<String> {
    let Some(yaml) = frontmatter(content) else { return Vec::new() };
    let Ok(serde_yaml::Value::Mapping(map)) = serde_yaml::from_str::<serde_yaml::Value>(yaml) else {
        return Vec::new();
    };

    let value = ["aliases", "alias"]
        .iter()
        .find_map(|key| map.get(*key));

    match value {
        Some(serde_yaml::Value::Sequence(items)) => items
            .iter()
            .filter_map(|v| match v {
                serde_yaml::Value::String(s) => Some(s.trim().to_string()),
                serde_yaml::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Some(serde_yaml::Value::String(s)) => s
            .split(',')
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

fn frontmatter(content: &str) -> Option<&str> {
    let body = content.strip_prefix("---")?;
    let body = body.strip_prefix("\r\n").or_else(|| body.strip_prefix('\n'))?;
    let end = body.find("\n---")?;
    Some(&body[..end])
}

/// Validate and index a vault directory
pub fn index_vault(vault_path: &Path) -> Result<(VaultIndex, IndexStats), VaultError> {
    if !vault_path.exists() {
        return Err(VaultError::InvalidPath("Path does not exist".to_string()));
    }
    let canonical_path = vault_path
        .canonicalize()
        .map_err(|_| VaultError::InvalidPath("Cannot resolve path".to_string()))?;
    if !canonical_path.is_dir() {
        return Err(VaultError::InvalidPath("Path is not a directory".to_string()));
    }

    let mut index = VaultIndex::new(canonical_path.clone());
    let mut stats = IndexStats::default();
    index_directory(&canonical_path, &mut index, &mut stats)?;

    index.build_resolved_links();
    index.last_indexed = Utc::now();
    stats.last_indexed = index.last_indexed;

    info!(vault = %canonical_path.display(), notes = stats.notes_indexed, "Indexed vault");
    Ok((index, stats))
}

/// Recursively index a directory
fn index_directory(
    dir: &Path,
    index: &mut VaultIndex,
    stats: &mut IndexStats,
) -> Result<(), VaultError> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    entries.sort();

    for path in entries {
        // Skip hidden files and .obsidian
        if path
            .file_name()
            .map(|n| n.to_string_lossy().starts_with('.'))
            .unwrap_or(false)
        {
            continue;
        }

        if path.is_dir() {
            index_directory(&path, index, stats)?;
        } else if path.extension().map(|e| e == "md").unwrap_or(false) {
            match index.index_note(&path) {
                Ok(()) => stats.notes_indexed += 1,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Failed to index note");
                    stats.errors.push(format!("{}: {}", path.display(), e));
                }
            }
        }
    }

    Ok(())
}

/// Index statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    pub notes_indexed: u32,
    pub errors: Vec<String>,
    pub last_indexed: DateTime<Utc>,
}

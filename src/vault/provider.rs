//! Filesystem Host
//!
//! Serves link index, declared aliases and note content from an indexed vault.

use futures::future::BoxFuture;
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;

use super::indexer::{index_vault, IndexStats, VaultError, VaultIndex};
use crate::backlinks::ResolvedLinks;
use crate::view::host::{AliasProvider, ContentError, ContentProvider, LinkIndex};

/// Vault index shared between the coordinator and the watcher
#[derive(Clone)]
pub struct SharedVault {
    index: Arc<RwLock<VaultIndex>>,
}

impl SharedVault {
    pub fn open(vault_path: &Path) -> Result<(Self, IndexStats), VaultError> {
        let (index, stats) = index_vault(vault_path)?;
        Ok((Self { index: Arc::new(RwLock::new(index)) }, stats))
    }

    /// Rebuild the index from disk and swap it in
    pub fn reindex(&self) -> Result<IndexStats, VaultError> {
        let vault_path = self.index.read().vault_path.clone();
        let (index, stats) = index_vault(&vault_path)?;
        *self.index.write() = index;
        Ok(stats)
    }

    pub fn snapshot(&self) -> VaultIndex {
        self.index.read().clone()
    }

    /// Resolve a user-supplied note name (path, path without `.md`, or title)
    pub fn resolve(&self, name: &str) -> Option<String> {
        self.index.read().resolve_link(name)
    }
}

impl LinkIndex for SharedVault {
    fn resolved_links(&self) -> ResolvedLinks {
        self.index.read().resolved.clone()
    }
}

impl AliasProvider for SharedVault {
    fn declared_aliases(&self, path: &str) -> Vec<String> {
        self.index.read().declared_aliases(path)
    }
}

impl ContentProvider for SharedVault {
    fn read<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<String, ContentError>> {
        Box::pin(async move {
            let vault_path = self.index.read().vault_path.clone();
            let full_path = vault_path.join(path);

            // Validate the resolved path stays within the vault
            let canonical_path = tokio::fs::canonicalize(&full_path).await?;
            if !canonical_path.starts_with(&vault_path) {
                return Err(ContentError::InvalidPath(path.to_string()));
            }
            Ok(tokio::fs::read_to_string(&canonical_path).await?)
        })
    }
}

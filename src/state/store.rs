// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

use super::StateDocument;
use crate::errors::StateStoreError;

/// Durable home of the state document between operations.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Loads the current document. A store that has never been written
    /// returns an empty document.
    async fn load(&self) -> Result<StateDocument, StateStoreError>;

    async fn save(&self, document: &StateDocument) -> Result<(), StateStoreError>;
}

/// Keeps the document in memory. Used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    document: Mutex<Option<StateDocument>>,
    unavailable: bool,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: StateDocument) -> Self {
        Self {
            document: Mutex::new(Some(document)),
            unavailable: false,
        }
    }

    /// A store whose every call fails.
    pub fn unavailable() -> Self {
        Self {
            document: Mutex::new(None),
            unavailable: true,
        }
    }

    /// Last saved (or seeded) document.
    pub fn snapshot(&self) -> Option<StateDocument> {
        self.document.lock().clone()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> Result<StateDocument, StateStoreError> {
        if self.unavailable {
            return Err(StateStoreError::Unavailable("memory store is offline".into()));
        }
        Ok(self.document.lock().clone().unwrap_or_default())
    }

    async fn save(&self, document: &StateDocument) -> Result<(), StateStoreError> {
        if self.unavailable {
            return Err(StateStoreError::Unavailable("memory store is offline".into()));
        }
        *self.document.lock() = Some(document.clone());
        Ok(())
    }
}

/// Pretty-printed JSON file on local disk.
///
/// Saves go to a sibling temporary file first and are renamed into place.
#[derive(Debug, Clone)]
pub struct JsonFileStateStore {
    path: PathBuf,
}

impl JsonFileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl StateStore for JsonFileStateStore {
    async fn load(&self) -> Result<StateDocument, StateStoreError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StateDocument::default())
            }
            Err(err) => return Err(err.into()),
        };
        let document: StateDocument = serde_json::from_str(&text)?;
        document.check_schema()?;
        Ok(document)
    }

    async fn save(&self, document: &StateDocument) -> Result<(), StateStoreError> {
        let text = serde_json::to_string_pretty(document)?;
        let staging = self.staging_path();
        tokio::fs::write(&staging, text).await?;
        tokio::fs::rename(&staging, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Address;
    use crate::state::ResourceObject;
    use serde_json::json;

    fn sample() -> StateDocument {
        StateDocument {
            serial: 3,
            ..StateDocument::default()
        }
        .with_resource(
            "mem_x.a",
            ResourceObject::new(json!({ "id": "a" }), Address::new("provider.mem")),
        )
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStateStore::new(dir.path().join("state.json"));
        let doc = store.load().await.unwrap();
        assert!(doc.is_empty());
        assert_eq!(doc.serial, 0);
    }

    #[tokio::test]
    async fn test_file_store_saves_and_loads() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStateStore::new(dir.path().join("state.json"));
        store.save(&sample()).await.unwrap();
        assert_eq!(store.load().await.unwrap(), sample());
        assert!(!dir.path().join("state.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_file_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "not json").unwrap();
        let store = JsonFileStateStore::new(path);
        assert!(matches!(
            store.load().await,
            Err(StateStoreError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStateStore::new();
        assert!(store.load().await.unwrap().is_empty());
        store.save(&sample()).await.unwrap();
        assert_eq!(store.snapshot(), Some(sample()));

        let offline = MemoryStateStore::unavailable();
        assert!(matches!(offline.load().await, Err(StateStoreError::Unavailable(_))));
    }
}

//! Durable state storage
//!
//! The whole assistant state is the unit of persistence. Saves are
//! synchronous from the caller's perspective: `receive` does not return
//! until the write has completed or failed.

use async_trait::async_trait;
use netminder_core::{NetminderError, Result};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::fs;
use tracing::debug;

use crate::assistant::AssistantState;

/// Save/load for the assistant state
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Persist the full state; must not return until the write is durable
    async fn save(&self, state: &AssistantState) -> Result<()>;

    /// Load the previously saved state, if any
    async fn load(&self) -> Result<Option<AssistantState>>;
}

/// Pretty-printed JSON file storage
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn save(&self, state: &AssistantState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&self.path, json).await?;

        debug!("Saved assistant state to {:?}", self.path);
        Ok(())
    }

    async fn load(&self) -> Result<Option<AssistantState>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).await?;
        let state = serde_json::from_str(&content)
            .map_err(|e| NetminderError::Store(format!("Corrupt state file: {}", e)))?;

        debug!("Loaded assistant state from {:?}", self.path);
        Ok(Some(state))
    }
}

/// In-memory store for tests. Serializes through JSON so round-trip
/// fidelity is exercised the same way as the file store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn save(&self, state: &AssistantState) -> Result<()> {
        let json = serde_json::to_string(state)?;
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(json);
        Ok(())
    }

    async fn load(&self) -> Result<Option<AssistantState>> {
        let slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        match slot.as_deref() {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }
}

// Copyright (C) 2025, 2026 Hashpool Developers (see AUTHORS)
//
// This file is part of Hashpool
//
// Hashpool is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Hashpool is distributed in the hope that it will be useful, but WITHOUT ANY
// WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// Hashpool. If not, see <https://www.gnu.org/licenses/>.

pub mod rocks;

use crate::shares::Share;
use crate::utils::time_provider::TimeProvider;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Error type for share store operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// A share with this id is already persisted. The processor treats this
    /// as idempotent acceptance, so `save` racing `exists` stays safe.
    #[error("share already exists: {0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// The persistence capability the pipeline consumes: idempotent existence
/// checks and writes keyed by share id. Implementations must be safe for
/// concurrent use; duplicate saves must either succeed idempotently or fail
/// with `StoreError::Conflict`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShareStore: Send + Sync {
    async fn exists(&self, share_id: &str) -> Result<bool, StoreError>;
    async fn save(&self, share: &Share) -> Result<(), StoreError>;
}

/// In-memory share store for tests and single-node development. Entries
/// older than the ttl are dropped lazily on reads.
pub struct MemoryShareStore {
    entries: RwLock<HashMap<String, Share>>,
    ttl: Duration,
    clock: Arc<dyn TimeProvider>,
}

impl MemoryShareStore {
    pub fn new(ttl: Duration, clock: Arc<dyn TimeProvider>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    fn cleanup(&self) {
        let cutoff = self
            .clock
            .seconds_since_epoch()
            .saturating_sub(self.ttl.as_secs());
        self.entries
            .write()
            .retain(|_, share| share.timestamp >= cutoff);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl ShareStore for MemoryShareStore {
    async fn exists(&self, share_id: &str) -> Result<bool, StoreError> {
        self.cleanup();
        Ok(self.entries.read().contains_key(share_id))
    }

    async fn save(&self, share: &Share) -> Result<(), StoreError> {
        let mut entries = self.entries.write();
        if entries.contains_key(&share.id) {
            return Err(StoreError::Conflict(share.id.clone()));
        }
        entries.insert(share.id.clone(), share.clone());
        Ok(())
    }
}

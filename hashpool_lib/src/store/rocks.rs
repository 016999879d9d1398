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

use super::{ShareStore, StoreError};
use crate::shares::Share;
use async_trait::async_trait;
use parking_lot::Mutex;
use rocksdb::{ColumnFamily, Options, DB};
use tracing::debug;

const SHARE_CF: &str = "share";

impl From<rocksdb::Error> for StoreError {
    fn from(e: rocksdb::Error) -> Self {
        StoreError::Database(format!("{e:?}"))
    }
}

/// RocksDB-backed share store. Shares are stored in their own column family,
/// keyed by share id, serialized as JSON.
///
/// Writes are serialized through `write_lock`: the duplicate-suppression
/// contract needs the existence check and the insert to be one atomic step,
/// otherwise two racing saves for the same id could both observe "absent"
/// and both report success. Reads stay lock-free.
pub struct RocksShareStore {
    db: DB,
    write_lock: Mutex<()>,
}

impl RocksShareStore {
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        let db = DB::open_cf(&opts, path, [SHARE_CF])?;
        debug!(path, "share store opened");
        Ok(Self {
            db,
            write_lock: Mutex::new(()),
        })
    }

    fn share_cf(&self) -> Result<&ColumnFamily, StoreError> {
        self.db
            .cf_handle(SHARE_CF)
            .ok_or_else(|| StoreError::Database("share column family missing".to_string()))
    }

    /// Fetch a persisted share by id.
    pub fn get(&self, share_id: &str) -> Result<Option<Share>, StoreError> {
        let cf = self.share_cf()?;
        match self.db.get_cf(cf, share_id.as_bytes())? {
            Some(bytes) => {
                let share = serde_json::from_slice(&bytes)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                Ok(Some(share))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ShareStore for RocksShareStore {
    async fn exists(&self, share_id: &str) -> Result<bool, StoreError> {
        let cf = self.share_cf()?;
        Ok(self.db.get_cf(cf, share_id.as_bytes())?.is_some())
    }

    async fn save(&self, share: &Share) -> Result<(), StoreError> {
        let cf = self.share_cf()?;
        let bytes =
            serde_json::to_vec(share).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let _write = self.write_lock.lock();
        if self.db.get_cf(cf, share.id.as_bytes())?.is_some() {
            return Err(StoreError::Conflict(share.id.clone()));
        }
        self.db.put_cf(cf, share.id.as_bytes(), bytes)?;
        Ok(())
    }
}

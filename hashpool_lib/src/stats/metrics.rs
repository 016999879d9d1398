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

use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

/// In-process counters for the share pipeline, snapshotted by the stats
/// endpoint.
#[derive(Debug)]
pub struct PoolMetrics {
    pub accepted_shares: u64,
    pub rejected_shares: u64,
    pub duplicate_shares: u64,
    /// Shares that proceeded with a WARN-level fraud verdict attached
    pub suspicious_shares: u64,
    /// Sum of difficulty across accepted shares
    pub total_difficulty: f64,
    /// Timestamp of the last accepted share
    pub last_share_at: Option<SystemTime>,
    pub start_time: Instant,
}

impl Default for PoolMetrics {
    fn default() -> Self {
        Self {
            accepted_shares: 0,
            rejected_shares: 0,
            duplicate_shares: 0,
            suspicious_shares: 0,
            total_difficulty: 0.0,
            last_share_at: None,
            start_time: Instant::now(),
        }
    }
}

impl PoolMetrics {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn record_share_accepted(&mut self, difficulty: f64) {
        self.accepted_shares += 1;
        self.total_difficulty += difficulty;
        self.last_share_at = Some(SystemTime::now());
    }

    pub fn record_share_rejected(&mut self) {
        self.rejected_shares += 1;
    }

    pub fn record_share_duplicate(&mut self) {
        self.duplicate_shares += 1;
    }

    pub fn record_suspicious(&mut self) {
        self.suspicious_shares += 1;
    }

    /// Export current counters as a json value.
    pub fn snapshot(&self) -> serde_json::Value {
        let last_share = match self.last_share_at {
            Some(time) => time
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            None => 0,
        };
        serde_json::json!({
            "accepted_shares": self.accepted_shares,
            "rejected_shares": self.rejected_shares,
            "duplicate_shares": self.duplicate_shares,
            "suspicious_shares": self.suspicious_shares,
            "total_difficulty": self.total_difficulty,
            "last_share_at": last_share,
            "uptime_secs": self.start_time.elapsed().as_secs(),
        })
    }
}

pub type PoolMetricsWithGuard = Arc<RwLock<PoolMetrics>>;

/// Construct a new pool metrics with rw lock and arc wrappers
pub fn build_metrics() -> PoolMetricsWithGuard {
    Arc::new(RwLock::new(PoolMetrics::default()))
}

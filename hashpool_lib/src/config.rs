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

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// The hostname the HTTP API binds to
    pub hostname: String,
    /// The port the HTTP API binds to
    pub port: u16,
    /// Bearer token required on mutating API routes
    pub auth_token: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PoolConfig {
    /// Lifetime of a dispatched job in seconds
    #[serde(default = "default_job_ttl_secs")]
    pub job_ttl_secs: u64,
    /// How often the expired-job sweeper runs, in seconds
    #[serde(default = "default_job_gc_interval_secs")]
    pub job_gc_interval_secs: u64,
    /// Minimum seconds between two submissions from the same worker
    #[serde(default = "default_worker_min_interval_secs")]
    pub worker_min_interval_secs: u64,
    /// Maximum age of a share timestamp relative to the server clock, in seconds
    #[serde(default = "default_share_max_age_secs")]
    pub share_max_age_secs: u64,
    /// Deadline for a single share-store call, in milliseconds
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            job_ttl_secs: default_job_ttl_secs(),
            job_gc_interval_secs: default_job_gc_interval_secs(),
            worker_min_interval_secs: default_worker_min_interval_secs(),
            share_max_age_secs: default_share_max_age_secs(),
            store_timeout_ms: default_store_timeout_ms(),
        }
    }
}

impl PoolConfig {
    pub fn job_ttl(&self) -> Duration {
        Duration::from_secs(self.job_ttl_secs)
    }

    pub fn job_gc_interval(&self) -> Duration {
        Duration::from_secs(self.job_gc_interval_secs)
    }

    pub fn worker_min_interval(&self) -> Duration {
        Duration::from_secs(self.worker_min_interval_secs)
    }

    pub fn share_max_age(&self) -> Duration {
        Duration::from_secs(self.share_max_age_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

fn default_job_ttl_secs() -> u64 {
    30
}

fn default_job_gc_interval_secs() -> u64 {
    15
}

fn default_worker_min_interval_secs() -> u64 {
    2
}

fn default_share_max_age_secs() -> u64 {
    300
}

fn default_store_timeout_ms() -> u64 {
    2000
}

#[derive(Debug, Deserialize, Clone)]
pub struct FraudConfig {
    /// Sliding window over which submissions are counted, in seconds
    #[serde(default = "default_fraud_window_secs")]
    pub window_secs: u64,
    /// Maximum submissions per /24 subnet per window before greylisting
    #[serde(default = "default_subnet_max")]
    pub subnet_max: usize,
    /// Hash reuse count within the window that raises a warning
    #[serde(default = "default_hash_warn")]
    pub hash_warn: usize,
    /// Hash reuse count within the window that blocks the share
    #[serde(default = "default_hash_block")]
    pub hash_block: usize,
    /// How long a greylisted subnet stays blocked, in seconds
    #[serde(default = "default_greylist_ttl_secs")]
    pub greylist_ttl_secs: u64,
    /// Tolerated clock skew between client and server, in seconds
    #[serde(default = "default_clock_skew_secs")]
    pub clock_skew_secs: u64,
    /// How often the inspector sweeper runs, in seconds
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for FraudConfig {
    fn default() -> Self {
        Self {
            window_secs: default_fraud_window_secs(),
            subnet_max: default_subnet_max(),
            hash_warn: default_hash_warn(),
            hash_block: default_hash_block(),
            greylist_ttl_secs: default_greylist_ttl_secs(),
            clock_skew_secs: default_clock_skew_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl FraudConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

fn default_fraud_window_secs() -> u64 {
    15
}

fn default_subnet_max() -> usize {
    20
}

fn default_hash_warn() -> usize {
    3
}

fn default_hash_block() -> usize {
    10
}

fn default_greylist_ttl_secs() -> u64 {
    180
}

fn default_clock_skew_secs() -> u64 {
    120
}

fn default_sweep_interval_secs() -> u64 {
    90
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Path to the RocksDB share store
    pub path: String,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct LoggingConfig {
    /// Log to file if specified
    pub file: Option<String>,
    /// Log to console (defaults to true)
    pub console: Option<bool>,
    /// Log level (defaults to "info")
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub fraud: FraudConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn load(path: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("HASHPOOL").separator("_"))
            .build()?
            .try_deserialize()
    }

    pub fn with_hostname(mut self, hostname: String) -> Self {
        self.server.hostname = hostname;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.server.port = port;
        self
    }

    pub fn with_auth_token(mut self, auth_token: String) -> Self {
        self.server.auth_token = auth_token;
        self
    }

    pub fn with_store_path(mut self, store_path: String) -> Self {
        self.store.path = store_path;
        self
    }

    pub fn with_job_ttl_secs(mut self, job_ttl_secs: u64) -> Self {
        self.pool.job_ttl_secs = job_ttl_secs;
        self
    }

    pub fn with_worker_min_interval_secs(mut self, secs: u64) -> Self {
        self.pool.worker_min_interval_secs = secs;
        self
    }
}

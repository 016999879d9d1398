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

use crate::config::{FraudConfig, PoolConfig};
use crate::fraud::FraudInspector;
use crate::jobs::{Job, JobManager};
use crate::payout::{BalanceStore, PayoutClient};
use crate::shares::hasher::{Sha256Hasher, ShareHasher};
use crate::shares::processor::ShareProcessor;
use crate::shares::{Share, ShareResult};
use crate::stats::metrics::{build_metrics, PoolMetricsWithGuard};
use crate::store::ShareStore;
use crate::utils::time_provider::{SystemTimeProvider, TimeProvider};
use crate::workers::{RegistryError, Worker, WorkerRegistry};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Composes the job manager, fraud inspector, worker registry and share
/// processor behind one surface, and owns the background sweepers.
///
/// The facade's lifetime bounds everything it owns: dropping it (after
/// `shutdown`) tears down both sweepers.
pub struct Pool {
    jobs: Arc<JobManager>,
    workers: Arc<WorkerRegistry>,
    fraud: Arc<FraudInspector>,
    processor: ShareProcessor,
    metrics: PoolMetricsWithGuard,
    payout: Option<Arc<dyn PayoutClient>>,
    clock: Arc<dyn TimeProvider>,
    pool_config: PoolConfig,
    fraud_config: FraudConfig,
    shutdown_tx: watch::Sender<bool>,
}

/// Builder for [`Pool`]. The share store is the only required capability;
/// clock and hasher default to the production implementations.
pub struct PoolBuilder {
    pool_config: PoolConfig,
    fraud_config: FraudConfig,
    share_store: Option<Arc<dyn ShareStore>>,
    balance_store: Option<Arc<dyn BalanceStore>>,
    payout_client: Option<Arc<dyn PayoutClient>>,
    clock: Option<Arc<dyn TimeProvider>>,
    hasher: Option<Arc<dyn ShareHasher>>,
}

impl Default for PoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PoolBuilder {
    pub fn new() -> Self {
        Self {
            pool_config: PoolConfig::default(),
            fraud_config: FraudConfig::default(),
            share_store: None,
            balance_store: None,
            payout_client: None,
            clock: None,
            hasher: None,
        }
    }

    pub fn pool_config(mut self, pool_config: PoolConfig) -> Self {
        self.pool_config = pool_config;
        self
    }

    pub fn fraud_config(mut self, fraud_config: FraudConfig) -> Self {
        self.fraud_config = fraud_config;
        self
    }

    pub fn share_store(mut self, share_store: Arc<dyn ShareStore>) -> Self {
        self.share_store = Some(share_store);
        self
    }

    pub fn balance_store(mut self, balance_store: Arc<dyn BalanceStore>) -> Self {
        self.balance_store = Some(balance_store);
        self
    }

    pub fn payout_client(mut self, payout_client: Arc<dyn PayoutClient>) -> Self {
        self.payout_client = Some(payout_client);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn TimeProvider>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn hasher(mut self, hasher: Arc<dyn ShareHasher>) -> Self {
        self.hasher = Some(hasher);
        self
    }

    pub fn build(self) -> Result<Pool, String> {
        let store = self
            .share_store
            .ok_or_else(|| "share store is required".to_string())?;
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemTimeProvider) as Arc<dyn TimeProvider>);
        let hasher = self
            .hasher
            .unwrap_or_else(|| Arc::new(Sha256Hasher) as Arc<dyn ShareHasher>);

        let jobs = Arc::new(JobManager::new(self.pool_config.job_ttl(), clock.clone()));
        let workers = Arc::new(WorkerRegistry::new(self.pool_config.worker_min_interval()));
        let fraud = Arc::new(FraudInspector::new(self.fraud_config.clone(), clock.clone()));
        let metrics = build_metrics();

        let processor = ShareProcessor::new(
            jobs.clone(),
            workers.clone(),
            fraud.clone(),
            store,
            self.balance_store,
            metrics.clone(),
            hasher,
            clock.clone(),
            self.pool_config.share_max_age(),
            self.pool_config.store_timeout(),
        );

        let (shutdown_tx, _) = watch::channel(false);

        Ok(Pool {
            jobs,
            workers,
            fraud,
            processor,
            metrics,
            payout: self.payout_client,
            clock,
            pool_config: self.pool_config,
            fraud_config: self.fraud_config,
            shutdown_tx,
        })
    }
}

impl Pool {
    pub fn builder() -> PoolBuilder {
        PoolBuilder::new()
    }

    /// Run a submitted share through the validation pipeline.
    pub async fn process_share(&self, share: Share) -> ShareResult {
        self.processor.process(share).await
    }

    /// Create and register a fresh job for the given block height.
    pub fn dispatch_job(&self, block_height: u64) -> Job {
        self.jobs.create(block_height)
    }

    pub fn active_jobs(&self) -> Vec<Job> {
        self.jobs.active_jobs()
    }

    pub fn register_worker(&self, id: &str) -> Result<(), RegistryError> {
        self.workers.add(id)
    }

    pub fn disconnect_worker(&self, id: &str) -> bool {
        self.workers.set_connected(id, false)
    }

    pub fn remove_worker(&self, id: &str) {
        self.workers.remove(id)
    }

    pub fn worker(&self, id: &str) -> Option<Worker> {
        self.workers.get(id)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn connected_worker_count(&self) -> usize {
        self.workers.connected_count()
    }

    pub fn metrics(&self) -> PoolMetricsWithGuard {
        self.metrics.clone()
    }

    pub fn payout_client(&self) -> Option<Arc<dyn PayoutClient>> {
        self.payout.clone()
    }

    /// Server wall-clock seconds, from the injected clock.
    pub fn now_secs(&self) -> u64 {
        self.clock.seconds_since_epoch()
    }

    /// Launch the two background sweepers: expired-job GC and fraud window
    /// cleanup. Both stop when `shutdown` fires.
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::with_capacity(2);

        let jobs = self.jobs.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let gc_interval = self.pool_config.job_gc_interval();
        handles.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(gc_interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = jobs.expire_sweep();
                        if removed > 0 {
                            debug!(removed, "job sweeper removed expired jobs");
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        info!("job sweeper stopping");
                        break;
                    }
                }
            }
        }));

        let fraud = self.fraud.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let sweep_interval = self.fraud_config.sweep_interval();
        handles.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        fraud.sweep();
                    }
                    _ = shutdown_rx.changed() => {
                        info!("fraud sweeper stopping");
                        break;
                    }
                }
            }
        }));

        handles
    }

    /// Fire the cancellation signal the sweepers (and the API server) watch.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// A receiver on the facade's cancellation signal, for collaborators
    /// that shut down alongside it.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }
}

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

use super::hasher::{meets_target, ShareHasher};
use super::{Share, ShareResult};
use crate::fraud::{FraudInspector, ThreatLevel};
use crate::jobs::JobManager;
use crate::payout::BalanceStore;
use crate::stats::metrics::PoolMetricsWithGuard;
use crate::store::{ShareStore, StoreError};
use crate::utils::time_provider::TimeProvider;
use crate::workers::{SubmissionGate, WorkerRegistry};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

pub const DESC_BASIC_VALIDATION: &str = "basic validation failed";
pub const DESC_JOB_NOT_ACTIVE: &str = "job not active or expired";
pub const DESC_WORKER_NOT_ACTIVE: &str = "worker not active";
pub const DESC_RATE_LIMIT: &str = "rate limit exceeded";
pub const DESC_INVALID_HASH: &str = "invalid hash";
pub const DESC_PERSIST_FAILED: &str = "failed to persist share";
pub const DESC_TIMED_OUT: &str = "timed out";
pub const DESC_ACCEPTED: &str = "share accepted";

/// Runs the fixed validation pipeline over submitted shares and is the sole
/// mutator of accepted-share state.
///
/// Gate order is load-bearing: shape, job binding, fraud screen, per-worker
/// rate limit, cryptographic target, duplicate suppression, persistence,
/// credit. Every submission yields exactly one `ShareResult`, and no core
/// lock is ever held across a store call.
pub struct ShareProcessor {
    jobs: Arc<JobManager>,
    workers: Arc<WorkerRegistry>,
    fraud: Arc<FraudInspector>,
    store: Arc<dyn ShareStore>,
    balances: Option<Arc<dyn BalanceStore>>,
    metrics: PoolMetricsWithGuard,
    hasher: Arc<dyn ShareHasher>,
    clock: Arc<dyn TimeProvider>,
    share_max_age: Duration,
    store_timeout: Duration,
}

impl ShareProcessor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        jobs: Arc<JobManager>,
        workers: Arc<WorkerRegistry>,
        fraud: Arc<FraudInspector>,
        store: Arc<dyn ShareStore>,
        balances: Option<Arc<dyn BalanceStore>>,
        metrics: PoolMetricsWithGuard,
        hasher: Arc<dyn ShareHasher>,
        clock: Arc<dyn TimeProvider>,
        share_max_age: Duration,
        store_timeout: Duration,
    ) -> Self {
        Self {
            jobs,
            workers,
            fraud,
            store,
            balances,
            metrics,
            hasher,
            clock,
            share_max_age,
            store_timeout,
        }
    }

    /// Process one submission through every gate.
    pub async fn process(&self, mut share: Share) -> ShareResult {
        let started = Instant::now();
        let now_secs = self.clock.seconds_since_epoch();
        let mut suspicious = false;

        // Gate 1: shape
        if let Err(reason) = share.validate_shape(now_secs, self.share_max_age.as_secs()) {
            debug!(worker_id = %share.worker_id, %reason, "share failed shape validation");
            return self
                .reject(
                    ShareResult::rejected(DESC_BASIC_VALIDATION).with_error(reason.to_string()),
                    started,
                    suspicious,
                )
                .await;
        }
        if share.id.is_empty() {
            share.id = share.derived_id();
        }

        // Gate 2: job binding
        let job = match self.jobs.lookup(&share.job_id) {
            Some(job) => job,
            None => {
                debug!(job_id = %share.job_id, "share references inactive job");
                return self
                    .reject(ShareResult::rejected(DESC_JOB_NOT_ACTIVE), started, suspicious)
                    .await;
            }
        };

        // Gate 3: fraud screen
        let verdict = self.fraud.evaluate(
            &share.worker_id,
            &share.ip,
            &share.nonce,
            &share.hash,
            share.timestamp,
        );
        match verdict.level {
            ThreatLevel::Block => {
                info!(worker_id = %share.worker_id, ip = %share.ip, reason = verdict.reason,
                    "share blocked by antifraud");
                return self
                    .reject(
                        ShareResult::rejected(format!("blocked by antifraud: {}", verdict.reason)),
                        started,
                        suspicious,
                    )
                    .await;
            }
            ThreatLevel::Warn => {
                warn!(worker_id = %share.worker_id, reason = verdict.reason, "suspicious share");
                self.metrics.write().await.record_suspicious();
                suspicious = true;
            }
            ThreatLevel::None => {}
        }

        // Per-worker rate limit, between the fraud screen and the crypto gate
        match self.workers.record_submission(&share.worker_id, now_secs) {
            SubmissionGate::Allowed => {}
            SubmissionGate::Inactive => {
                return self
                    .reject(
                        ShareResult::rejected(DESC_WORKER_NOT_ACTIVE),
                        started,
                        suspicious,
                    )
                    .await;
            }
            SubmissionGate::RateLimited => {
                return self
                    .reject(ShareResult::rejected(DESC_RATE_LIMIT), started, suspicious)
                    .await;
            }
        }

        // Gate 4: cryptographic target. The client-supplied hash field is
        // informational; this digest is authoritative.
        let digest = self.hasher.digest_hex(&job.data, &share.nonce);
        if !meets_target(&digest, &job.target) {
            debug!(job_id = %job.id, %digest, target = %job.target, "share digest above target");
            return self
                .reject(
                    ShareResult::rejected(DESC_INVALID_HASH).with_hash(digest),
                    started,
                    suspicious,
                )
                .await;
        }

        // Gate 5: duplicate suppression. Duplicates are accepted so worker
        // retries after a dropped response stay safe, but never re-credited.
        match timeout(self.store_timeout, self.store.exists(&share.id)).await {
            Err(_) => {
                return self
                    .reject(ShareResult::rejected(DESC_TIMED_OUT), started, suspicious)
                    .await;
            }
            Ok(Err(e)) => {
                // A failed existence check is not terminal: the save below
                // still enforces uniqueness through the conflict error.
                warn!(share_id = %share.id, error = %e, "share existence check failed");
            }
            Ok(Ok(true)) => {
                debug!(share_id = %share.id, "duplicate share ignored");
                self.metrics.write().await.record_share_duplicate();
                return finalize(ShareResult::duplicate(Some(digest)), started, suspicious);
            }
            Ok(Ok(false)) => {}
        }

        // Gate 6: persist
        match timeout(self.store_timeout, self.store.save(&share)).await {
            Err(_) => {
                return self
                    .reject(ShareResult::rejected(DESC_TIMED_OUT), started, suspicious)
                    .await;
            }
            Ok(Err(StoreError::Conflict(_))) => {
                debug!(share_id = %share.id, "save conflict treated as duplicate");
                self.metrics.write().await.record_share_duplicate();
                return finalize(ShareResult::duplicate(Some(digest)), started, suspicious);
            }
            Ok(Err(e)) => {
                error!(share_id = %share.id, error = %e, "failed to persist share");
                return self
                    .reject(
                        ShareResult::rejected(DESC_PERSIST_FAILED).with_error(e.to_string()),
                        started,
                        suspicious,
                    )
                    .await;
            }
            Ok(Ok(())) => {}
        }

        // Gate 7: credit
        self.workers.credit(&share.worker_id, &share.id, now_secs);
        if let Some(balances) = &self.balances {
            if let Err(e) = balances.add_balance(&share.worker_id, share.difficulty).await {
                // the share is already persisted; crediting errors must not
                // turn an accepted share into a rejection
                error!(worker_id = %share.worker_id, error = %e, "balance credit failed");
            }
        }
        self.metrics
            .write()
            .await
            .record_share_accepted(share.difficulty);

        info!(share_id = %share.id, worker_id = %share.worker_id, "share accepted");
        finalize(ShareResult::accepted(DESC_ACCEPTED, digest), started, suspicious)
    }

    async fn reject(
        &self,
        result: ShareResult,
        started: Instant,
        suspicious: bool,
    ) -> ShareResult {
        self.metrics.write().await.record_share_rejected();
        finalize(result, started, suspicious)
    }
}

fn finalize(mut result: ShareResult, started: Instant, suspicious: bool) -> ShareResult {
    result.latency_ms = started.elapsed().as_millis() as u64;
    result.suspicious = suspicious;
    result
}

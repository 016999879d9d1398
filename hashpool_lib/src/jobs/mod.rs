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

use crate::utils::random_hex;
use crate::utils::time_provider::TimeProvider;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Baseline share target: 64 hex chars, four leading zeros.
const TARGET_BASELINE: &str = "0000ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff";
/// Tighter target handed out at every tenth block height.
const TARGET_TIGHT: &str = "00000fffffffffffffffffffffffffffffffffffffffffffffffffffffffffff";

/// A unit of work handed to miners: opaque template bytes plus the target
/// threshold a share digest must stay below. Bounded lifetime; a job is never
/// re-created under the same id.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: String,
    pub data: String,
    pub target: String,
    /// Seconds since Unix epoch
    pub created_at: u64,
    pub expires_at: u64,
    pub block_height: u64,
    pub active: bool,
}

impl Job {
    pub fn is_expired(&self, now_secs: u64) -> bool {
        now_secs > self.expires_at
    }
}

/// Derive the share target for a block height.
///
/// Deterministic in the height so job difficulty is reproducible in pool
/// accounting: every tenth height gets the tighter target, everything else
/// the baseline.
pub fn target_for_height(block_height: u64) -> &'static str {
    if block_height % 10 == 0 {
        TARGET_TIGHT
    } else {
        TARGET_BASELINE
    }
}

/// Issues jobs, stores them keyed by id, and expires them.
///
/// Lookup answers "is this job still active" only: callers cannot
/// distinguish an unknown job from an expired one.
pub struct JobManager {
    jobs: RwLock<HashMap<String, Job>>,
    ttl: Duration,
    clock: Arc<dyn TimeProvider>,
}

impl JobManager {
    pub fn new(ttl: Duration, clock: Arc<dyn TimeProvider>) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    /// Create and register a fresh job for the given block height.
    pub fn create(&self, block_height: u64) -> Job {
        let now = self.clock.seconds_since_epoch();
        let job = Job {
            // 128-bit random id; collisions are not a practical concern
            id: format!("job-{}", random_hex(16)),
            // opaque block-template bytes: template body plus entropy seed
            data: format!("{}{}", random_hex(32), random_hex(16)),
            target: target_for_height(block_height).to_string(),
            created_at: now,
            expires_at: now + self.ttl.as_secs(),
            block_height,
            active: true,
        };

        self.jobs.write().insert(job.id.clone(), job.clone());
        debug!(job_id = %job.id, block_height, "new job created");
        job
    }

    /// Return the job only while it is still active. Unknown and expired
    /// jobs are both reported as absent.
    pub fn lookup(&self, job_id: &str) -> Option<Job> {
        let now = self.clock.seconds_since_epoch();
        self.jobs
            .read()
            .get(job_id)
            .filter(|job| !job.is_expired(now))
            .cloned()
    }

    /// Drop every job past its expiry. Returns the number removed.
    pub fn expire_sweep(&self) -> usize {
        let now = self.clock.seconds_since_epoch();
        let mut jobs = self.jobs.write();
        let before = jobs.len();
        jobs.retain(|_, job| !job.is_expired(now));
        let removed = before - jobs.len();
        if removed > 0 {
            debug!(removed, "expired jobs removed");
        }
        removed
    }

    /// Snapshot of all still-active jobs, for the transport to expose.
    pub fn active_jobs(&self) -> Vec<Job> {
        let now = self.clock.seconds_since_epoch();
        self.jobs
            .read()
            .values()
            .filter(|job| !job.is_expired(now))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::time_provider::TestTimeProvider;

    fn manager_at(seconds: u64, ttl: Duration) -> (JobManager, TestTimeProvider) {
        let clock = TestTimeProvider::at_epoch_seconds(seconds);
        let manager = JobManager::new(ttl, Arc::new(clock.clone()));
        (manager, clock)
    }

    #[test]
    fn test_create_produces_well_formed_job() {
        let (manager, _) = manager_at(1_700_000_000, Duration::from_secs(30));
        let job = manager.create(101);

        assert!(job.id.starts_with("job-"));
        assert_eq!(job.id.len(), "job-".len() + 32);
        assert_eq!(job.data.len(), 96);
        assert_eq!(job.target.len(), 64);
        assert_eq!(job.created_at, 1_700_000_000);
        assert_eq!(job.expires_at, 1_700_000_030);
        assert!(job.active);
    }

    #[test]
    fn test_create_assigns_unique_ids() {
        let (manager, _) = manager_at(1_700_000_000, Duration::from_secs(30));
        let a = manager.create(1);
        let b = manager.create(1);
        assert_ne!(a.id, b.id);
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_target_policy_is_deterministic() {
        assert_eq!(target_for_height(100), TARGET_TIGHT);
        assert_eq!(target_for_height(101), TARGET_BASELINE);
        assert_eq!(target_for_height(101), target_for_height(101));
    }

    #[test]
    fn test_lookup_returns_active_job() {
        let (manager, _) = manager_at(1_700_000_000, Duration::from_secs(30));
        let job = manager.create(7);
        let found = manager.lookup(&job.id).unwrap();
        assert_eq!(found.id, job.id);
        assert_eq!(found.target, job.target);
    }

    #[test]
    fn test_lookup_hides_expired_job() {
        let (manager, clock) = manager_at(1_700_000_000, Duration::from_secs(30));
        let job = manager.create(7);

        clock.advance(Duration::from_secs(31));
        assert!(manager.lookup(&job.id).is_none());
        // indistinguishable from a job that never existed
        assert!(manager.lookup("job-0000").is_none());
    }

    #[test]
    fn test_lookup_at_exact_expiry_is_still_active() {
        let (manager, clock) = manager_at(1_700_000_000, Duration::from_secs(30));
        let job = manager.create(7);

        clock.advance(Duration::from_secs(30));
        assert!(manager.lookup(&job.id).is_some());
    }

    #[test]
    fn test_expire_sweep_drops_only_expired() {
        let (manager, clock) = manager_at(1_700_000_000, Duration::from_secs(30));
        let old = manager.create(1);

        clock.advance(Duration::from_secs(20));
        let fresh = manager.create(2);

        clock.advance(Duration::from_secs(15)); // old at +35s, fresh at +15s
        assert_eq!(manager.expire_sweep(), 1);
        assert!(manager.lookup(&old.id).is_none());
        assert!(manager.lookup(&fresh.id).is_some());
    }

    #[test]
    fn test_active_jobs_excludes_expired() {
        let (manager, clock) = manager_at(1_700_000_000, Duration::from_secs(30));
        manager.create(1);
        clock.advance(Duration::from_secs(40));
        manager.create(2);

        let active = manager.active_jobs();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].block_height, 2);
        // sweep not yet run, expired entry still occupies the map
        assert_eq!(manager.len(), 2);
    }
}

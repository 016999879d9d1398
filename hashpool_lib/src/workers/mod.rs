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

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// A connected mining client and its submission history.
#[derive(Debug, Clone, Serialize)]
pub struct Worker {
    pub id: String,
    pub connected: bool,
    /// Seconds since epoch of the last submission that passed the rate gate
    pub last_submission: Option<u64>,
    pub accepted_shares: u64,
    /// Ids of this worker's accepted shares
    pub share_ids: Vec<String>,
}

impl Worker {
    fn new(id: String) -> Self {
        Self {
            id,
            connected: true,
            last_submission: None,
            accepted_shares: 0,
            share_ids: Vec::new(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("worker id must not be empty")]
    EmptyWorkerId,
}

/// Outcome of the per-worker submission gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionGate {
    Allowed,
    /// Less than the minimum interval since this worker's last submission
    RateLimited,
    /// The worker was explicitly disconnected
    Inactive,
}

/// The live mapping of worker id to worker record. Owns worker lifetimes and
/// the per-worker rate-limit state; removing a worker removes both.
pub struct WorkerRegistry {
    workers: RwLock<HashMap<String, Worker>>,
    min_interval: Duration,
}

impl WorkerRegistry {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            workers: RwLock::new(HashMap::new()),
            min_interval,
        }
    }

    pub fn add(&self, id: &str) -> Result<(), RegistryError> {
        if id.is_empty() {
            return Err(RegistryError::EmptyWorkerId);
        }
        let mut workers = self.workers.write();
        workers
            .entry(id.to_string())
            .and_modify(|worker| worker.connected = true)
            .or_insert_with(|| Worker::new(id.to_string()));
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Worker> {
        self.workers.read().get(id).cloned()
    }

    pub fn remove(&self, id: &str) {
        self.workers.write().remove(id);
    }

    /// Mark a worker connected or disconnected. Returns false for unknown ids.
    pub fn set_connected(&self, id: &str, connected: bool) -> bool {
        let mut workers = self.workers.write();
        match workers.get_mut(id) {
            Some(worker) => {
                worker.connected = connected;
                true
            }
            None => false,
        }
    }

    /// The rate-limit gate: atomically check the time since this worker's
    /// last submission and record the new one.
    ///
    /// Unknown worker ids are registered on the spot (a submission is proof
    /// of a live client); explicitly disconnected workers are refused. The
    /// check-and-record is one critical section, so two submissions closer
    /// than the minimum interval cannot both pass regardless of interleaving.
    pub fn record_submission(&self, id: &str, now_secs: u64) -> SubmissionGate {
        let mut workers = self.workers.write();
        let worker = workers
            .entry(id.to_string())
            .or_insert_with(|| Worker::new(id.to_string()));

        if !worker.connected {
            return SubmissionGate::Inactive;
        }
        if let Some(last) = worker.last_submission {
            if now_secs.saturating_sub(last) < self.min_interval.as_secs() {
                debug!(worker_id = %id, "submission inside minimum interval");
                return SubmissionGate::RateLimited;
            }
        }
        worker.last_submission = Some(now_secs);
        SubmissionGate::Allowed
    }

    /// Credit an accepted share to the worker.
    pub fn credit(&self, id: &str, share_id: &str, now_secs: u64) {
        let mut workers = self.workers.write();
        if let Some(worker) = workers.get_mut(id) {
            worker.accepted_shares += 1;
            worker.share_ids.push(share_id.to_string());
            worker.last_submission = Some(now_secs);
        }
    }

    pub fn time_since_last(&self, id: &str, now_secs: u64) -> Option<Duration> {
        self.workers
            .read()
            .get(id)?
            .last_submission
            .map(|last| Duration::from_secs(now_secs.saturating_sub(last)))
    }

    pub fn len(&self) -> usize {
        self.workers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.read().is_empty()
    }

    pub fn connected_count(&self) -> usize {
        self.workers
            .read()
            .values()
            .filter(|worker| worker.connected)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000;

    fn registry() -> WorkerRegistry {
        WorkerRegistry::new(Duration::from_secs(2))
    }

    #[test]
    fn test_add_get_remove() {
        let registry = registry();
        registry.add("w1").unwrap();
        let worker = registry.get("w1").unwrap();
        assert!(worker.connected);
        assert_eq!(worker.accepted_shares, 0);

        registry.remove("w1");
        assert!(registry.get("w1").is_none());
    }

    #[test]
    fn test_add_empty_id_is_rejected() {
        let registry = registry();
        assert!(matches!(
            registry.add(""),
            Err(RegistryError::EmptyWorkerId)
        ));
    }

    #[test]
    fn test_add_reconnects_existing_worker() {
        let registry = registry();
        registry.add("w1").unwrap();
        registry.set_connected("w1", false);
        registry.add("w1").unwrap();
        assert!(registry.get("w1").unwrap().connected);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_record_submission_registers_unknown_worker() {
        let registry = registry();
        assert_eq!(registry.record_submission("w1", NOW), SubmissionGate::Allowed);
        assert_eq!(registry.get("w1").unwrap().last_submission, Some(NOW));
    }

    #[test]
    fn test_record_submission_rate_limits_inside_interval() {
        let registry = registry();
        assert_eq!(registry.record_submission("w1", NOW), SubmissionGate::Allowed);
        assert_eq!(
            registry.record_submission("w1", NOW + 1),
            SubmissionGate::RateLimited
        );
        // the rejected attempt must not push the interval forward
        assert_eq!(
            registry.record_submission("w1", NOW + 2),
            SubmissionGate::Allowed
        );
    }

    #[test]
    fn test_record_submission_refuses_disconnected_worker() {
        let registry = registry();
        registry.add("w1").unwrap();
        registry.set_connected("w1", false);
        assert_eq!(
            registry.record_submission("w1", NOW),
            SubmissionGate::Inactive
        );
    }

    #[test]
    fn test_rate_limit_is_per_worker() {
        let registry = registry();
        assert_eq!(registry.record_submission("w1", NOW), SubmissionGate::Allowed);
        assert_eq!(registry.record_submission("w2", NOW), SubmissionGate::Allowed);
    }

    #[test]
    fn test_credit_updates_counters_and_share_list() {
        let registry = registry();
        registry.add("w1").unwrap();
        registry.credit("w1", "share-a", NOW);
        registry.credit("w1", "share-b", NOW + 5);

        let worker = registry.get("w1").unwrap();
        assert_eq!(worker.accepted_shares, 2);
        assert_eq!(worker.share_ids, vec!["share-a", "share-b"]);
        assert_eq!(worker.last_submission, Some(NOW + 5));
    }

    #[test]
    fn test_remove_clears_rate_limit_state() {
        let registry = registry();
        registry.record_submission("w1", NOW);
        registry.remove("w1");
        // a fresh record for the same id starts with no interval history
        assert_eq!(
            registry.record_submission("w1", NOW + 1),
            SubmissionGate::Allowed
        );
    }

    #[test]
    fn test_time_since_last() {
        let registry = registry();
        registry.record_submission("w1", NOW);
        assert_eq!(
            registry.time_since_last("w1", NOW + 7),
            Some(Duration::from_secs(7))
        );
        assert_eq!(registry.time_since_last("ghost", NOW), None);
    }

    #[test]
    fn test_connected_count() {
        let registry = registry();
        registry.add("w1").unwrap();
        registry.add("w2").unwrap();
        registry.set_connected("w2", false);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.connected_count(), 1);
    }
}

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

//! End-to-end pipeline tests driving the pool facade with the real SHA-256
//! primitive and the in-memory share store.

use hashpool_lib::config::{FraudConfig, PoolConfig};
use hashpool_lib::pool::Pool;
use hashpool_lib::shares::hasher::{meets_target, Sha256Hasher, ShareHasher};
use hashpool_lib::shares::{Share, ShareStatus};
use hashpool_lib::store::MemoryShareStore;
use hashpool_lib::utils::time_provider::{TestTimeProvider, TimeProvider};
use std::sync::Arc;
use std::time::Duration;

const NOW: u64 = 1_700_000_000;

struct TestPool {
    pool: Pool,
    store: Arc<MemoryShareStore>,
    clock: TestTimeProvider,
}

fn build_pool(pool_config: PoolConfig) -> TestPool {
    let clock = TestTimeProvider::at_epoch_seconds(NOW);
    let clock_arc: Arc<dyn TimeProvider> = Arc::new(clock.clone());
    let store = Arc::new(MemoryShareStore::new(
        Duration::from_secs(3600),
        clock_arc.clone(),
    ));
    let pool = Pool::builder()
        .pool_config(pool_config)
        .fraud_config(FraudConfig::default())
        .share_store(store.clone())
        .clock(clock_arc)
        .build()
        .unwrap();
    TestPool { pool, store, clock }
}

/// Find nonces whose digest over this job's data clears the job target.
fn solving_nonces(data: &str, target: &str, count: usize) -> Vec<String> {
    let hasher = Sha256Hasher;
    (0u64..)
        .map(|i| format!("{i:08x}"))
        .filter(|nonce| meets_target(&hasher.digest_hex(data, nonce), target))
        .take(count)
        .collect()
}

fn share(job_id: &str, worker: &str, nonce: &str, timestamp: u64, ip: &str) -> Share {
    Share {
        id: String::new(),
        job_id: job_id.to_string(),
        worker_id: worker.to_string(),
        nonce: nonce.to_string(),
        hash: String::new(),
        difficulty: 1.0,
        timestamp,
        ip: ip.to_string(),
    }
}

#[test_log::test(tokio::test)]
async fn test_happy_path_share_is_accepted_and_credited() {
    let t = build_pool(PoolConfig::default());
    let job = t.pool.dispatch_job(101);
    let nonce = &solving_nonces(&job.data, &job.target, 1)[0];

    let result = t
        .pool
        .process_share(share(&job.id, "w1", nonce, NOW, "10.0.0.1"))
        .await;

    assert!(result.valid, "{result:?}");
    assert_eq!(result.status, ShareStatus::Accepted);
    // the reported digest is the authoritative recomputation and beats the target
    let digest = result.hash.unwrap();
    assert_eq!(digest, Sha256Hasher.digest_hex(&job.data, nonce));
    assert!(meets_target(&digest, &job.target));
    assert_eq!(t.pool.worker("w1").unwrap().accepted_shares, 1);
    assert_eq!(t.store.len(), 1);
}

#[tokio::test]
async fn test_share_against_expired_job_is_rejected() {
    let t = build_pool(PoolConfig {
        job_ttl_secs: 1,
        ..PoolConfig::default()
    });
    let job = t.pool.dispatch_job(101);
    let nonce = &solving_nonces(&job.data, &job.target, 1)[0];

    t.clock.advance(Duration::from_secs(2));
    let now = t.clock.seconds_since_epoch();
    let result = t
        .pool
        .process_share(share(&job.id, "w1", nonce, now, "10.0.0.1"))
        .await;

    assert!(!result.valid);
    assert_eq!(result.status, ShareStatus::Invalid);
    assert_eq!(result.description, "job not active or expired");
}

#[tokio::test]
async fn test_duplicate_share_accepted_once_credited_once() {
    let t = build_pool(PoolConfig::default());
    let job = t.pool.dispatch_job(101);
    let nonce = &solving_nonces(&job.data, &job.target, 1)[0];

    let first = t
        .pool
        .process_share(share(&job.id, "w1", nonce, NOW, "10.0.0.1"))
        .await;

    t.clock.advance(Duration::from_secs(3));
    let now = t.clock.seconds_since_epoch();
    let second = t
        .pool
        .process_share(share(&job.id, "w1", nonce, now, "10.0.0.1"))
        .await;

    // both submissions report success, only one save and one credit
    assert!(first.valid);
    assert!(second.valid);
    assert_eq!(second.status, ShareStatus::Duplicate);
    assert_eq!(second.description, "duplicate share ignored");
    assert_eq!(t.store.len(), 1);
    assert_eq!(t.pool.worker("w1").unwrap().accepted_shares, 1);
}

#[test_log::test(tokio::test)]
async fn test_subnet_rate_limit_greylists_and_recovers() {
    // long job ttl so every rejection below is the inspector's doing
    let t = build_pool(PoolConfig {
        job_ttl_secs: 600,
        ..PoolConfig::default()
    });
    let job = t.pool.dispatch_job(101);
    let nonce = &solving_nonces(&job.data, &job.target, 1)[0];

    // 20 distinct workers across one /24 go through cleanly
    for i in 0..20 {
        let ip = format!("10.0.0.{}", i + 1);
        let result = t
            .pool
            .process_share(share(&job.id, &format!("w{i}"), nonce, NOW, &ip))
            .await;
        assert!(result.valid, "submission {i}: {result:?}");
    }

    // the 21st within the window trips the subnet limit
    let result = t
        .pool
        .process_share(share(&job.id, "w20", nonce, NOW, "10.0.0.99"))
        .await;
    assert!(!result.valid);
    assert_eq!(
        result.description,
        "blocked by antifraud: rate limit subnet/24 exceeded"
    );

    // while greylisted, even slow traffic from the subnet is refused
    t.clock.advance(Duration::from_secs(60));
    let now = t.clock.seconds_since_epoch();
    let result = t
        .pool
        .process_share(share(&job.id, "w21", nonce, now, "10.0.0.150"))
        .await;
    assert!(!result.valid);
    assert_eq!(result.description, "blocked by antifraud: subnet greylisted");

    // a different /24 is unaffected
    let result = t
        .pool
        .process_share(share(&job.id, "w22", nonce, now, "10.0.1.1"))
        .await;
    assert!(result.valid, "{result:?}");

    // after the greylist ttl the subnet is clean again
    t.clock.advance(Duration::from_secs(150));
    let now = t.clock.seconds_since_epoch();
    let result = t
        .pool
        .process_share(share(&job.id, "w23", nonce, now, "10.0.0.7"))
        .await;
    assert!(result.valid, "{result:?}");
}

#[tokio::test]
async fn test_nonce_reuse_is_flagged_but_accepted() {
    let t = build_pool(PoolConfig::default());
    let job = t.pool.dispatch_job(101);
    let nonce = &solving_nonces(&job.data, &job.target, 1)[0];

    let first = t
        .pool
        .process_share(share(&job.id, "w1", nonce, NOW, "10.0.0.1"))
        .await;
    assert!(first.valid);
    assert!(!first.suspicious);

    // resubmit the same nonce under a fresh client-assigned id so duplicate
    // suppression stays out of the picture
    t.clock.advance(Duration::from_secs(3));
    let now = t.clock.seconds_since_epoch();
    let mut retry = share(&job.id, "w1", nonce, now, "10.0.0.1");
    retry.id = "client-retry-1".to_string();
    let second = t.pool.process_share(retry).await;

    assert!(second.valid, "{second:?}");
    assert_eq!(second.status, ShareStatus::Accepted);
    assert!(second.suspicious);
}

#[tokio::test]
async fn test_clock_skew_rejected_at_shape_gate() {
    let t = build_pool(PoolConfig::default());
    let job = t.pool.dispatch_job(101);
    let nonce = &solving_nonces(&job.data, &job.target, 1)[0];

    let result = t
        .pool
        .process_share(share(&job.id, "w1", nonce, NOW - 600, "10.0.0.1"))
        .await;

    assert!(!result.valid);
    assert_eq!(result.description, "basic validation failed");
}

#[tokio::test]
async fn test_rate_limit_monotonicity_for_one_worker() {
    let t = build_pool(PoolConfig::default());
    let job = t.pool.dispatch_job(101);
    let nonces = solving_nonces(&job.data, &job.target, 3);

    let first = t
        .pool
        .process_share(share(&job.id, "w1", &nonces[0], NOW, "10.0.0.1"))
        .await;
    assert!(first.valid);

    // inside the minimum interval: rejected
    t.clock.advance(Duration::from_secs(1));
    let now = t.clock.seconds_since_epoch();
    let second = t
        .pool
        .process_share(share(&job.id, "w1", &nonces[1], now, "10.0.0.1"))
        .await;
    assert!(!second.valid);
    assert_eq!(second.description, "rate limit exceeded");

    // at the interval boundary: accepted
    t.clock.advance(Duration::from_secs(1));
    let now = t.clock.seconds_since_epoch();
    let third = t
        .pool
        .process_share(share(&job.id, "w1", &nonces[2], now, "10.0.0.1"))
        .await;
    assert!(third.valid, "{third:?}");

    assert_eq!(t.pool.worker("w1").unwrap().accepted_shares, 2);
}

#[tokio::test]
async fn test_digest_above_target_is_rejected() {
    let t = build_pool(PoolConfig::default());
    let job = t.pool.dispatch_job(101);

    // find a nonce whose digest does NOT clear the target
    let hasher = Sha256Hasher;
    let losing = (0u64..)
        .map(|i| format!("{i:08x}"))
        .find(|nonce| !meets_target(&hasher.digest_hex(&job.data, nonce), &job.target))
        .unwrap();

    let result = t
        .pool
        .process_share(share(&job.id, "w1", &losing, NOW, "10.0.0.1"))
        .await;

    assert!(!result.valid);
    assert_eq!(result.description, "invalid hash");
    assert_eq!(t.store.len(), 0);
}

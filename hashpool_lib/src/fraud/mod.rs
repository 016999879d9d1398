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

use crate::config::FraudConfig;
use crate::utils::time_provider::TimeProvider;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::debug;

pub const REASON_CLOCK_SKEW: &str = "clock skew out of tolerance";
pub const REASON_SUBNET_RATE: &str = "rate limit subnet/24 exceeded";
pub const REASON_NONCE_REUSE: &str = "nonce reuse by miner within window";
pub const REASON_HASH_REUSE_BLOCK: &str = "hash reuse over hard threshold";
pub const REASON_HASH_REUSE_WARN: &str = "hash reuse approaching threshold";
pub const REASON_GREYLISTED: &str = "subnet greylisted";

/// Severity of a fraud verdict. Only `Block` rejects the share; `Warn` is
/// attached to the result and logged but the share proceeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ThreatLevel {
    None,
    Warn,
    Block,
}

/// The inspector's output for one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub level: ThreatLevel,
    pub reason: &'static str,
}

impl Verdict {
    pub fn clean() -> Self {
        Self {
            level: ThreatLevel::None,
            reason: "",
        }
    }

    fn warn(reason: &'static str) -> Self {
        Self {
            level: ThreatLevel::Warn,
            reason,
        }
    }

    fn block(reason: &'static str) -> Self {
        Self {
            level: ThreatLevel::Block,
            reason,
        }
    }

    pub fn is_block(&self) -> bool {
        self.level == ThreatLevel::Block
    }
}

/// All windowed counters, owned exclusively by the inspector. Timestamps are
/// seconds since Unix epoch from the injected clock.
#[derive(Debug, Default)]
struct FraudState {
    /// subnet key -> submission times within the window, oldest first
    subnet_window: HashMap<String, VecDeque<u64>>,
    /// worker id -> nonce -> most recent submission time within the window
    nonce_window: HashMap<String, HashMap<String, u64>>,
    /// share hash -> submission times within the window, oldest first
    hash_window: HashMap<String, VecDeque<u64>>,
    /// subnet key -> time the subnet was greylisted
    greylist: HashMap<String, u64>,
}

/// Time-windowed, subnet-aware abuse detector.
///
/// Every operation takes the single state lock for its whole duration so the
/// counters stay mutually consistent. The lists are bounded by the window, so
/// the critical section stays short even under sustained load.
pub struct FraudInspector {
    state: Mutex<FraudState>,
    config: FraudConfig,
    clock: Arc<dyn TimeProvider>,
}

impl FraudInspector {
    pub fn new(config: FraudConfig, clock: Arc<dyn TimeProvider>) -> Self {
        Self {
            state: Mutex::new(FraudState::default()),
            config,
            clock,
        }
    }

    /// Score one submission. Checks run in a fixed order; the first `Block`
    /// wins, otherwise the first `Warn` raised is reported.
    pub fn evaluate(
        &self,
        worker_id: &str,
        ip: &str,
        nonce: &str,
        hash: &str,
        timestamp: u64,
    ) -> Verdict {
        let now = self.clock.seconds_since_epoch();
        let window = self.config.window_secs;
        let mut warn: Option<Verdict> = None;

        if timestamp == 0 || now.abs_diff(timestamp) > self.config.clock_skew_secs {
            warn = Some(Verdict::warn(REASON_CLOCK_SKEW));
        }

        let subnet = subnet_key(ip);
        let mut state = self.state.lock();

        // Subnet rate: record first, then judge.
        let times = state.subnet_window.entry(subnet.clone()).or_default();
        prune_window(times, now, window);
        times.push_back(now);
        if times.len() > self.config.subnet_max {
            state.greylist.insert(subnet.clone(), now);
            debug!(%subnet, "subnet over rate limit, greylisted");
            return Verdict::block(REASON_SUBNET_RATE);
        }

        // Nonce reuse per miner. The nonce is recorded whether or not it was
        // already present, so repeated reuse keeps the entry fresh.
        let nonces = state.nonce_window.entry(worker_id.to_string()).or_default();
        nonces.retain(|_, seen_at| now.saturating_sub(*seen_at) <= window);
        let reused = nonces.insert(nonce.to_string(), now).is_some();
        if reused && warn.is_none() {
            warn = Some(Verdict::warn(REASON_NONCE_REUSE));
        }

        // Hash reuse, skipped when the client did not report a hash.
        if !hash.is_empty() {
            let times = state.hash_window.entry(hash.to_string()).or_default();
            prune_window(times, now, window);
            times.push_back(now);
            if times.len() >= self.config.hash_block {
                return Verdict::block(REASON_HASH_REUSE_BLOCK);
            }
            if times.len() >= self.config.hash_warn && warn.is_none() {
                warn = Some(Verdict::warn(REASON_HASH_REUSE_WARN));
            }
        }

        if let Some(added) = state.greylist.get(&subnet) {
            if now.saturating_sub(*added) <= self.config.greylist_ttl_secs {
                return Verdict::block(REASON_GREYLISTED);
            }
        }

        warn.unwrap_or_else(Verdict::clean)
    }

    /// Drop greylist entries past their ttl and purge window entries that
    /// hold nothing recent. After a quiet period the state is empty apart
    /// from still-valid greylist entries.
    pub fn sweep(&self) -> usize {
        let now = self.clock.seconds_since_epoch();
        let window = self.config.window_secs;
        let mut state = self.state.lock();
        let before = state.greylist.len();

        let greylist_ttl = self.config.greylist_ttl_secs;
        state
            .greylist
            .retain(|_, added| now.saturating_sub(*added) <= greylist_ttl);
        let removed = before - state.greylist.len();

        state.subnet_window.retain(|_, times| {
            prune_window(times, now, window);
            !times.is_empty()
        });
        state.nonce_window.retain(|_, nonces| {
            nonces.retain(|_, seen_at| now.saturating_sub(*seen_at) <= window);
            !nonces.is_empty()
        });
        state.hash_window.retain(|_, times| {
            prune_window(times, now, window);
            !times.is_empty()
        });

        if removed > 0 {
            debug!(removed, "greylist entries expired");
        }
        removed
    }

    /// True while the subnet of `ip` is under a valid greylist entry.
    pub fn is_greylisted(&self, ip: &str) -> bool {
        let now = self.clock.seconds_since_epoch();
        let subnet = subnet_key(ip);
        let state = self.state.lock();
        state
            .greylist
            .get(&subnet)
            .is_some_and(|added| now.saturating_sub(*added) <= self.config.greylist_ttl_secs)
    }

    #[cfg(test)]
    fn state_sizes(&self) -> (usize, usize, usize, usize) {
        let state = self.state.lock();
        (
            state.subnet_window.len(),
            state.nonce_window.len(),
            state.hash_window.len(),
            state.greylist.len(),
        )
    }
}

fn prune_window(times: &mut VecDeque<u64>, now: u64, window_secs: u64) {
    while let Some(front) = times.front() {
        if now.saturating_sub(*front) > window_secs {
            times.pop_front();
        } else {
            break;
        }
    }
}

/// The rate-limit key for a submitter address: the /24 network for IPv4, the
/// canonical address for IPv6, the raw string when unparseable.
pub fn subnet_key(ip: &str) -> String {
    let trimmed = ip.trim();
    match trimmed.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => {
            let octets = v4.octets();
            format!("{}.{}.{}.0", octets[0], octets[1], octets[2])
        }
        Ok(IpAddr::V6(v6)) => v6.to_string(),
        Err(_) => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::time_provider::TestTimeProvider;
    use std::time::Duration;

    const NOW: u64 = 1_700_000_000;

    fn inspector() -> (FraudInspector, TestTimeProvider) {
        let clock = TestTimeProvider::at_epoch_seconds(NOW);
        let inspector = FraudInspector::new(FraudConfig::default(), Arc::new(clock.clone()));
        (inspector, clock)
    }

    fn nonce_for(i: usize) -> String {
        format!("{i:08x}")
    }

    #[test]
    fn test_clean_submission_yields_no_threat() {
        let (inspector, _) = inspector();
        let verdict = inspector.evaluate("w1", "10.0.0.1", "00000000", "", NOW);
        assert_eq!(verdict, Verdict::clean());
    }

    #[test]
    fn test_clock_skew_warns_but_does_not_block() {
        let (inspector, _) = inspector();
        let verdict = inspector.evaluate("w1", "10.0.0.1", "00000000", "", NOW - 150);
        assert_eq!(verdict.level, ThreatLevel::Warn);
        assert_eq!(verdict.reason, REASON_CLOCK_SKEW);

        let verdict = inspector.evaluate("w2", "10.0.0.2", "00000001", "", 0);
        assert_eq!(verdict.level, ThreatLevel::Warn);
        assert_eq!(verdict.reason, REASON_CLOCK_SKEW);
    }

    #[test]
    fn test_clock_skew_within_tolerance_is_clean() {
        let (inspector, _) = inspector();
        let verdict = inspector.evaluate("w1", "10.0.0.1", "00000000", "", NOW - 120);
        assert_eq!(verdict, Verdict::clean());
    }

    #[test]
    fn test_subnet_rate_limit_blocks_21st_in_window() {
        let (inspector, _) = inspector();
        // distinct workers and nonces across the same /24
        for i in 0..20 {
            let ip = format!("10.0.0.{}", i + 1);
            let verdict = inspector.evaluate(&format!("w{i}"), &ip, &nonce_for(i), "", NOW);
            assert_eq!(verdict.level, ThreatLevel::None, "submission {i} clean");
        }
        let verdict = inspector.evaluate("w20", "10.0.0.99", &nonce_for(20), "", NOW);
        assert_eq!(verdict.level, ThreatLevel::Block);
        assert_eq!(verdict.reason, REASON_SUBNET_RATE);
        assert!(inspector.is_greylisted("10.0.0.77"));
    }

    #[test]
    fn test_greylist_blocks_after_window_drains() {
        let (inspector, clock) = inspector();
        for i in 0..21 {
            inspector.evaluate(&format!("w{i}"), "10.0.0.1", &nonce_for(i), "", NOW);
        }

        // window empties but the greylist entry is younger than its ttl
        clock.advance(Duration::from_secs(60));
        let now = clock.seconds_since_epoch();
        let verdict = inspector.evaluate("late", "10.0.0.200", &nonce_for(99), "", now);
        assert_eq!(verdict.level, ThreatLevel::Block);
        assert_eq!(verdict.reason, REASON_GREYLISTED);
    }

    #[test]
    fn test_greylist_expires_after_ttl() {
        let (inspector, clock) = inspector();
        for i in 0..21 {
            inspector.evaluate(&format!("w{i}"), "10.0.0.1", &nonce_for(i), "", NOW);
        }

        clock.advance(Duration::from_secs(181));
        let now = clock.seconds_since_epoch();
        assert!(!inspector.is_greylisted("10.0.0.1"));
        let verdict = inspector.evaluate("late", "10.0.0.5", &nonce_for(50), "", now);
        assert_eq!(verdict.level, ThreatLevel::None);
    }

    #[test]
    fn test_other_subnet_is_unaffected_by_greylist() {
        let (inspector, _) = inspector();
        for i in 0..21 {
            inspector.evaluate(&format!("w{i}"), "10.0.0.1", &nonce_for(i), "", NOW);
        }
        let verdict = inspector.evaluate("other", "10.0.1.1", &nonce_for(77), "", NOW);
        assert_eq!(verdict.level, ThreatLevel::None);
    }

    #[test]
    fn test_nonce_reuse_warns_within_window() {
        let (inspector, _) = inspector();
        assert_eq!(
            inspector
                .evaluate("w1", "10.0.0.1", "deadbeef", "", NOW)
                .level,
            ThreatLevel::None
        );
        let verdict = inspector.evaluate("w1", "10.0.0.1", "deadbeef", "", NOW);
        assert_eq!(verdict.level, ThreatLevel::Warn);
        assert_eq!(verdict.reason, REASON_NONCE_REUSE);
    }

    #[test]
    fn test_nonce_reuse_by_other_miner_is_clean() {
        let (inspector, _) = inspector();
        inspector.evaluate("w1", "10.0.0.1", "deadbeef", "", NOW);
        let verdict = inspector.evaluate("w2", "10.0.0.2", "deadbeef", "", NOW);
        assert_eq!(verdict.level, ThreatLevel::None);
    }

    #[test]
    fn test_nonce_reuse_forgotten_after_window() {
        let (inspector, clock) = inspector();
        inspector.evaluate("w1", "10.0.0.1", "deadbeef", "", NOW);
        clock.advance(Duration::from_secs(16));
        let now = clock.seconds_since_epoch();
        let verdict = inspector.evaluate("w1", "10.0.0.1", "deadbeef", "", now);
        assert_eq!(verdict.level, ThreatLevel::None);
    }

    #[test]
    fn test_hash_reuse_thresholds() {
        let (inspector, _) = inspector();
        let hash = "ab".repeat(32);
        // distinct subnets so the subnet counter stays quiet
        for i in 0..2 {
            let verdict = inspector.evaluate(
                &format!("w{i}"),
                &format!("10.0.{i}.1"),
                &nonce_for(i),
                &hash,
                NOW,
            );
            assert_eq!(verdict.level, ThreatLevel::None, "submission {i}");
        }
        // third sighting reaches the warn threshold
        let verdict = inspector.evaluate("w2", "10.0.2.1", &nonce_for(2), &hash, NOW);
        assert_eq!(verdict.level, ThreatLevel::Warn);
        assert_eq!(verdict.reason, REASON_HASH_REUSE_WARN);

        for i in 3..9 {
            let verdict = inspector.evaluate(
                &format!("w{i}"),
                &format!("10.0.{i}.1"),
                &nonce_for(i),
                &hash,
                NOW,
            );
            assert_eq!(verdict.level, ThreatLevel::Warn, "submission {i}");
        }
        // tenth sighting crosses the hard threshold
        let verdict = inspector.evaluate("w9", "10.0.9.1", &nonce_for(9), &hash, NOW);
        assert_eq!(verdict.level, ThreatLevel::Block);
        assert_eq!(verdict.reason, REASON_HASH_REUSE_BLOCK);
    }

    #[test]
    fn test_empty_hash_is_not_tracked() {
        let (inspector, _) = inspector();
        for i in 0..12 {
            let verdict = inspector.evaluate(
                &format!("w{i}"),
                &format!("10.0.{i}.1"),
                &nonce_for(i),
                "",
                NOW,
            );
            assert_eq!(verdict.level, ThreatLevel::None);
        }
    }

    #[test]
    fn test_sweep_empties_state_after_silence() {
        let (inspector, clock) = inspector();
        for i in 0..21 {
            inspector.evaluate(
                &format!("w{i}"),
                "10.0.0.1",
                &nonce_for(i),
                &"cd".repeat(32),
                NOW,
            );
        }
        inspector.evaluate("w0", "10.1.0.1", &nonce_for(100), "", NOW);

        // past the window but inside the greylist ttl
        clock.advance(Duration::from_secs(60));
        inspector.sweep();
        let (subnets, nonces, hashes, greylist) = inspector.state_sizes();
        assert_eq!((subnets, nonces, hashes), (0, 0, 0));
        assert_eq!(greylist, 1);

        // past the greylist ttl as well
        clock.advance(Duration::from_secs(180));
        assert_eq!(inspector.sweep(), 1);
        assert_eq!(inspector.state_sizes(), (0, 0, 0, 0));
    }

    #[test]
    fn test_subnet_key_masks_ipv4_to_slash24() {
        assert_eq!(subnet_key("10.0.0.57"), "10.0.0.0");
        assert_eq!(subnet_key(" 192.168.4.1 "), "192.168.4.0");
    }

    #[test]
    fn test_subnet_key_ipv6_uses_full_address() {
        assert_eq!(subnet_key("2001:db8::1"), "2001:db8::1");
    }

    #[test]
    fn test_subnet_key_unparseable_uses_raw_string() {
        assert_eq!(subnet_key("not-an-ip"), "not-an-ip");
    }
}

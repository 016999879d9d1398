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

use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Trait to get current system time, allowing for mocking in tests.
///
/// Every component that reads the clock (job expiry, fraud windows, rate
/// limits) takes this as a capability instead of calling `SystemTime::now`
/// directly.
pub trait TimeProvider: Send + Sync {
    fn now(&self) -> SystemTime;
    fn seconds_since_epoch(&self) -> u64;
}

/// Default implementation that uses actual system time
#[derive(Clone, Debug, Default)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn seconds_since_epoch(&self) -> u64 {
        self.now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// Mock time provider for testing. Clones share the same underlying time, so
/// a test can hold one clone and advance the clock seen by the component
/// under test.
#[derive(Clone, Debug)]
pub struct TestTimeProvider {
    time: Arc<Mutex<SystemTime>>,
}

impl TestTimeProvider {
    pub fn new(time: SystemTime) -> Self {
        Self {
            time: Arc::new(Mutex::new(time)),
        }
    }

    /// Construct a provider pinned to a fixed number of seconds since epoch.
    pub fn at_epoch_seconds(seconds: u64) -> Self {
        Self::new(UNIX_EPOCH + Duration::from_secs(seconds))
    }

    pub fn set_since_epoch(&self, seconds: u64) {
        let mut time = self.time.lock().unwrap();
        *time = UNIX_EPOCH + Duration::from_secs(seconds);
    }

    pub fn advance(&self, duration: Duration) {
        let mut time = self.time.lock().unwrap();
        *time += duration;
    }
}

impl TimeProvider for TestTimeProvider {
    fn now(&self) -> SystemTime {
        *self.time.lock().unwrap()
    }

    fn seconds_since_epoch(&self) -> u64 {
        self.now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// Formats a Unix timestamp into a human-readable string
pub fn format_timestamp(timestamp: u64) -> String {
    chrono::DateTime::from_timestamp(timestamp as i64, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "Invalid timestamp".to_string())
}

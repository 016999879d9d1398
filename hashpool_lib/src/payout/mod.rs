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
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum PayoutError {
    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),
    #[error("payout amount must be positive")]
    ZeroAmount,
    #[error("payout transport error: {0}")]
    Transport(String),
}

/// On-chain reward disbursement. Off the share-processing critical path:
/// the pipeline never awaits a payout.
#[async_trait]
pub trait PayoutClient: Send + Sync {
    /// Send `amount` (in the chain's atomic unit) to `to`. Returns the
    /// transaction id.
    async fn send_reward(&self, to: &str, amount: u64) -> Result<String, PayoutError>;
}

/// Per-worker balance bookkeeping. When absent, crediting is a no-op beyond
/// the registry's in-memory counters.
#[async_trait]
pub trait BalanceStore: Send + Sync {
    async fn add_balance(&self, worker_id: &str, delta: f64) -> Result<(), PayoutError>;
    async fn get_balance(&self, worker_id: &str) -> Result<f64, PayoutError>;
    async fn reset_balance(&self, worker_id: &str) -> Result<(), PayoutError>;
}

/// In-memory balances, suitable for tests and single-node deployments.
#[derive(Default)]
pub struct MemoryBalanceStore {
    balances: RwLock<HashMap<String, f64>>,
}

impl MemoryBalanceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BalanceStore for MemoryBalanceStore {
    async fn add_balance(&self, worker_id: &str, delta: f64) -> Result<(), PayoutError> {
        let mut balances = self.balances.write();
        *balances.entry(worker_id.to_string()).or_insert(0.0) += delta;
        Ok(())
    }

    async fn get_balance(&self, worker_id: &str) -> Result<f64, PayoutError> {
        Ok(self.balances.read().get(worker_id).copied().unwrap_or(0.0))
    }

    async fn reset_balance(&self, worker_id: &str) -> Result<(), PayoutError> {
        self.balances.write().remove(worker_id);
        Ok(())
    }
}

/// Payment engine that logs instead of touching a chain. Recipients must
/// look like 0x-prefixed hex addresses so integration mistakes surface early.
#[derive(Debug, Default)]
pub struct MockPaymentEngine;

impl MockPaymentEngine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PayoutClient for MockPaymentEngine {
    async fn send_reward(&self, to: &str, amount: u64) -> Result<String, PayoutError> {
        if !is_hex_address(to) {
            return Err(PayoutError::InvalidRecipient(to.to_string()));
        }
        if amount == 0 {
            return Err(PayoutError::ZeroAmount);
        }
        let tx_id = format!("0x{}", random_hex(32));
        info!(to, amount, %tx_id, "mock payout sent");
        Ok(tx_id)
    }
}

fn is_hex_address(addr: &str) -> bool {
    addr.len() == 42
        && addr.starts_with("0x")
        && addr[2..].bytes().all(|b| b.is_ascii_hexdigit())
}

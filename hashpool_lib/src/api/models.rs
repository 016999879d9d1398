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

use crate::pool::Pool;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct ApiState {
    pub pool: Arc<Pool>,
    pub auth_token: String,
}

/// Request model for the job dispatch endpoint
#[derive(Debug, Deserialize)]
pub struct DispatchJobRequest {
    pub block_height: u64,
}

/// Request model for the payout endpoint
#[derive(Debug, Deserialize)]
pub struct PayoutRequest {
    pub to: String,
    pub amount: u64,
}

/// Response model for the payout endpoint
#[derive(Debug, Serialize)]
pub struct PayoutResponse {
    pub tx_hash: String,
}

/// Response model for the stats endpoint
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_workers: usize,
    pub connected_workers: usize,
    pub active_jobs: usize,
    pub shares: serde_json::Value,
}

/// Error payload for non-2xx responses
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

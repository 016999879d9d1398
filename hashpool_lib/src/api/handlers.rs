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

use super::models::{
    ApiState, DispatchJobRequest, ErrorResponse, PayoutRequest, PayoutResponse, StatsResponse,
};
use crate::jobs::Job;
use crate::payout::PayoutError;
use crate::shares::processor::{DESC_BASIC_VALIDATION, DESC_PERSIST_FAILED, DESC_TIMED_OUT};
use crate::shares::{Share, ShareResult};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use tracing::{error, info};

/// Handler for share submission.
///
/// Returns 200 for accepted and duplicate shares, 400 for shape failures,
/// 403 for fraud, rate-limit and job rejections, 500 when persistence fails.
pub async fn submit_share(
    State(state): State<ApiState>,
    Json(mut share): Json<Share>,
) -> (StatusCode, Json<ShareResult>) {
    if share.timestamp == 0 {
        share.timestamp = state.pool.now_secs();
    }
    let result = state.pool.process_share(share).await;
    (status_code_for(&result), Json(result))
}

fn status_code_for(result: &ShareResult) -> StatusCode {
    if result.valid {
        return StatusCode::OK;
    }
    match result.description.as_str() {
        DESC_BASIC_VALIDATION => StatusCode::BAD_REQUEST,
        DESC_PERSIST_FAILED | DESC_TIMED_OUT => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::FORBIDDEN,
    }
}

/// Handler for pool statistics
pub async fn get_stats(State(state): State<ApiState>) -> Json<StatsResponse> {
    let shares = state.pool.metrics().read().await.snapshot();
    Json(StatsResponse {
        total_workers: state.pool.worker_count(),
        connected_workers: state.pool.connected_worker_count(),
        active_jobs: state.pool.active_jobs().len(),
        shares,
    })
}

/// Handler for the active job list workers poll
pub async fn get_jobs(State(state): State<ApiState>) -> Json<Vec<Job>> {
    Json(state.pool.active_jobs())
}

/// Handler for the scheduler-facing job dispatch
pub async fn dispatch_job(
    State(state): State<ApiState>,
    Json(request): Json<DispatchJobRequest>,
) -> Json<Job> {
    let job = state.pool.dispatch_job(request.block_height);
    info!(job_id = %job.id, block_height = request.block_height, "job dispatched");
    Json(job)
}

/// Handler for manual reward disbursement
pub async fn send_payout(
    State(state): State<ApiState>,
    Json(request): Json<PayoutRequest>,
) -> Result<Json<PayoutResponse>, (StatusCode, Json<ErrorResponse>)> {
    let client = state.pool.payout_client().ok_or_else(|| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "unavailable".to_string(),
                message: "payout client not configured".to_string(),
            }),
        )
    })?;

    match client.send_reward(&request.to, request.amount).await {
        Ok(tx_hash) => {
            info!(to = %request.to, amount = request.amount, %tx_hash, "payout sent");
            Ok(Json(PayoutResponse { tx_hash }))
        }
        Err(e @ (PayoutError::InvalidRecipient(_) | PayoutError::ZeroAmount)) => Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "bad request".to_string(),
                message: e.to_string(),
            }),
        )),
        Err(e) => {
            error!(error = %e, "payout failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "payout failed".to_string(),
                    message: e.to_string(),
                }),
            ))
        }
    }
}

/// Liveness probe
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

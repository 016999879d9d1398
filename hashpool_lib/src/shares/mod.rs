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

pub mod hasher;
pub mod processor;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

const NONCE_MIN_LEN: usize = 8;
const NONCE_MAX_LEN: usize = 64;

/// A candidate proof-of-work solution submitted by a worker.
///
/// `id` is assigned by the processor when the client omits it. `hash` is the
/// client-reported digest and is informational only; the processor recomputes
/// the digest authoritatively. Once accepted a share is never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Share {
    #[serde(default)]
    pub id: String,
    pub job_id: String,
    pub worker_id: String,
    pub nonce: String,
    #[serde(default)]
    pub hash: String,
    pub difficulty: f64,
    /// Seconds since Unix epoch at submission time
    #[serde(default)]
    pub timestamp: u64,
    /// Network address of the submitter, used for fraud scoring
    #[serde(default)]
    pub ip: String,
}

impl Share {
    /// Derive the canonical share id from the identifying fields.
    /// Used when the client did not assign one.
    pub fn derived_id(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "{}|{}|{}",
            self.worker_id, self.job_id, self.nonce
        ));
        hex::encode(hasher.finalize())
    }

    /// Gate-1 shape validation: required fields present, timestamp within
    /// `max_age_secs` of the server clock, nonce is 8-64 lowercase hex chars,
    /// difficulty positive.
    pub fn validate_shape(&self, now_secs: u64, max_age_secs: u64) -> Result<(), ShapeError> {
        if self.job_id.is_empty() || self.worker_id.is_empty() || self.nonce.is_empty() {
            return Err(ShapeError::MissingFields);
        }
        if !is_valid_nonce(&self.nonce) {
            return Err(ShapeError::MalformedNonce);
        }
        if self.difficulty <= 0.0 || !self.difficulty.is_finite() {
            return Err(ShapeError::InvalidDifficulty);
        }
        if self.timestamp == 0 || now_secs.abs_diff(self.timestamp) > max_age_secs {
            return Err(ShapeError::TimestampOutOfRange);
        }
        Ok(())
    }
}

fn is_valid_nonce(nonce: &str) -> bool {
    (NONCE_MIN_LEN..=NONCE_MAX_LEN).contains(&nonce.len())
        && nonce
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Why a share failed the shape gate. The pipeline reports all of these under
/// one description; the specific reason goes to logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeError {
    MissingFields,
    MalformedNonce,
    InvalidDifficulty,
    TimestampOutOfRange,
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingFields => write!(f, "missing required fields"),
            Self::MalformedNonce => write!(f, "nonce malformed"),
            Self::InvalidDifficulty => write!(f, "difficulty must be positive"),
            Self::TimestampOutOfRange => write!(f, "timestamp out of range"),
        }
    }
}

impl std::error::Error for ShapeError {}

/// Terminal classification of a processed share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShareStatus {
    Accepted,
    Duplicate,
    /// Reserved for transports that surface expired-job rejections
    /// separately; the processor itself reports those as `Invalid` with a
    /// fixed description.
    Stale,
    Invalid,
}

/// The single result every submission produces, success or not.
#[derive(Debug, Clone, Serialize)]
pub struct ShareResult {
    pub valid: bool,
    pub status: ShareStatus,
    pub description: String,
    /// Server-computed digest, present once the crypto gate ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    pub latency_ms: u64,
    /// A WARN-level fraud verdict was attached to this submission
    pub suspicious: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ShareResult {
    pub fn rejected(description: impl Into<String>) -> Self {
        Self {
            valid: false,
            status: ShareStatus::Invalid,
            description: description.into(),
            hash: None,
            latency_ms: 0,
            suspicious: false,
            error: None,
        }
    }

    pub fn accepted(description: impl Into<String>, hash: String) -> Self {
        Self {
            valid: true,
            status: ShareStatus::Accepted,
            description: description.into(),
            hash: Some(hash),
            latency_ms: 0,
            suspicious: false,
            error: None,
        }
    }

    pub fn duplicate(hash: Option<String>) -> Self {
        Self {
            valid: true,
            status: ShareStatus::Duplicate,
            description: "duplicate share ignored".to_string(),
            hash,
            latency_ms: 0,
            suspicious: false,
            error: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_hash(mut self, hash: String) -> Self {
        self.hash = Some(hash);
        self
    }
}

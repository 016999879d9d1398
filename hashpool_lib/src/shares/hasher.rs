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

use sha2::{Digest, Sha256};

/// The proof-of-work digest primitive.
///
/// The pool is chain-agnostic: whatever function the target chain uses to
/// grade work plugs in here. Implementations must be pure and return a
/// lowercase hex digest of fixed width matching the job target width.
pub trait ShareHasher: Send + Sync {
    fn digest_hex(&self, data: &str, nonce: &str) -> String;
}

/// Default primitive: SHA-256 over the concatenation of job data and nonce.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl ShareHasher for Sha256Hasher {
    fn digest_hex(&self, data: &str, nonce: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data.as_bytes());
        hasher.update(nonce.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// A digest meets the target iff, as equal-length hex strings, it compares
/// lexicographically below the target. Length mismatch never validates.
pub fn meets_target(digest_hex: &str, target_hex: &str) -> bool {
    digest_hex.len() == target_hex.len() && digest_hex < target_hex
}

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

pub mod api;
pub mod config;
pub mod fraud;
pub mod jobs;
pub mod logging;
pub mod payout;
pub mod pool;
pub mod shares;
pub mod stats;
pub mod store;
pub mod utils;
pub mod workers;

pub use pool::{Pool, PoolBuilder};
pub use shares::{Share, ShareResult, ShareStatus};

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

//! Tracing setup for the pool process.
//!
//! The pipeline emits its events with structured fields (`share_id`,
//! `job_id`, `worker_id`, `subnet`), so every sink configured here produces
//! lines that can be filtered per worker or per job after the fact.

use crate::config::LoggingConfig;
use std::error::Error;
use std::path::Path;
use tracing_appender::non_blocking;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

const DEFAULT_LOG_FILENAME: &str = "hashpool.log";

/// Install the global subscriber from the logging configuration.
///
/// `RUST_LOG` overrides the configured level. When a file sink is configured
/// the returned guard owns its flush thread; the caller must keep it alive
/// until exit or the tail of the log is lost.
pub fn setup_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>, Box<dyn Error>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let (file_layer, guard) = match &config.file {
        Some(path) => {
            let (writer, guard) = daily_log_writer(Path::new(path))?;
            // no ANSI escapes in files, they defeat grep
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let mut console_enabled = config.console.unwrap_or(true);
    if !console_enabled && file_layer.is_none() {
        // a pool that logs nowhere is a misconfiguration, not a choice
        eprintln!("logging: console disabled and no file sink set, keeping console output");
        console_enabled = true;
    }
    let console_layer = if console_enabled {
        Some(fmt::layer())
    } else {
        None
    };

    Registry::default()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

/// Build a non-blocking, daily-rotated writer for the given log path,
/// creating the parent directory if needed.
fn daily_log_writer(path: &Path) -> Result<(NonBlocking, WorkerGuard), Box<dyn Error>> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(directory)?;

    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(DEFAULT_LOG_FILENAME);

    let appender = RollingFileAppender::new(Rotation::DAILY, directory, filename);
    Ok(non_blocking(appender))
}

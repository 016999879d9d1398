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

use clap::Parser;
use hashpool_lib::api::ApiServer;
use hashpool_lib::config::Config;
use hashpool_lib::logging::setup_logging;
use hashpool_lib::payout::{MemoryBalanceStore, MockPaymentEngine};
use hashpool_lib::pool::Pool;
use hashpool_lib::store::rocks::RocksShareStore;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long)]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let args = Args::parse();

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config: {e}");
            return Err(format!("Failed to load config: {e}"));
        }
    };

    // hold guard so buffered file logging survives until exit
    let _guard = match setup_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            error!("Failed to set up logging: {e}");
            return Err(format!("Failed to set up logging: {e}"));
        }
    };

    info!("Starting Hashpool...");

    let share_store = RocksShareStore::open(&config.store.path)
        .map_err(|e| format!("Failed to open share store: {e}"))?;

    let pool = Pool::builder()
        .pool_config(config.pool.clone())
        .fraud_config(config.fraud.clone())
        .share_store(Arc::new(share_store))
        .balance_store(Arc::new(MemoryBalanceStore::new()))
        .payout_client(Arc::new(MockPaymentEngine::new()))
        .build()
        .map_err(|e| format!("Failed to build pool: {e}"))?;
    let pool = Arc::new(pool);

    let sweeper_handles = pool.start();
    info!("Pool sweepers started");

    let api_server = ApiServer::new(pool.clone(), config.server.clone());
    let shutdown_rx = pool.shutdown_signal();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = api_server.start(shutdown_rx).await {
            error!("API server error: {e}");
        }
    });

    wait_for_shutdown_signal().await;
    info!("Shutdown signal received, stopping...");
    pool.shutdown();

    let _ = server_handle.await;
    for handle in sweeper_handles {
        let _ = handle.await;
    }
    info!("Hashpool stopped");

    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(terminate) => terminate,
        Err(e) => {
            error!("Failed to listen for SIGTERM: {e}");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

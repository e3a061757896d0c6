//! QuineDB server entry point.
//!
//! Boot order matters: the command registry is populated and the
//! snapshot (if any) is loaded into per-shard seeds before the first
//! worker thread exists, so workers only ever see a fully-initialized
//! world. Main then parks on ctrl-c; worker threads run until process
//! exit.

mod commands;
mod config;
mod connection;
mod error;
mod mailbox;
mod router;
mod snapshot;
mod topology;
mod worker;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::topology::Topology;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quinedb=info".into()),
        )
        .init();

    let config = Arc::new(ServerConfig::parse());
    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: Arc<ServerConfig>) -> Result<(), ServerError> {
    // a panicking worker must take the process down rather than leave a
    // half-alive node serving a subset of the keyspace
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        default_hook(info);
        std::process::exit(70);
    }));

    commands::init();

    let topology = Arc::new(Topology::new(config.build_router()));
    info!(
        workers = topology.workers(),
        port = config.port,
        routing = ?config.routing,
        save_points = config.save_points().len(),
        "quinedb starting"
    );

    let restored = snapshot::load_into(&topology, &config.dump_path())?;
    if restored > 0 {
        info!(
            keys = restored,
            path = %config.dump_path().display(),
            "restored snapshot"
        );
    }

    let (ready_tx, ready_rx) = std::sync::mpsc::channel();
    let _workers = worker::spawn(topology.clone(), config.clone(), ready_tx);

    for _ in 0..topology.workers() {
        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(ServerError::Bind {
                    port: config.port,
                    source: e,
                })
            }
            Err(_) => return Err(ServerError::WorkerStartup),
        }
    }
    info!("all workers ready");

    // park until ctrl-c; workers run until process exit
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async {
        let _ = tokio::signal::ctrl_c().await;
    });
    info!("shutting down");
    Ok(())
}

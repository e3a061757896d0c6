//! Server configuration.
//!
//! Parsed straight from the CLI with clap. The routing algorithm is part
//! of the persistent contract: a dump written under one algorithm must be
//! loaded under the same one (and the same worker count behaves best),
//! or keys land on the wrong shards.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::router::Router;

/// A background-save trigger: "after `seconds` if at least `changes`
/// writes". Declared configuration — the scheduled background save that
/// consumes these is a future extension; V1 persists on explicit SAVE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavePoint {
    pub seconds: u64,
    pub changes: u64,
}

/// Which key→shard mapping to use. Must match across restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoutingAlgorithm {
    /// CRC16 of the key modulo the worker count (Redis-style).
    Crc16,
    /// Consistent-hash ring with 100 virtual nodes per shard.
    Ring,
}

#[derive(Debug, Parser)]
#[command(name = "quinedb-server", about = "QuineDB: a sharded in-memory key-value server")]
pub struct ServerConfig {
    /// TCP port to listen on (every worker binds it with reuse-port).
    #[arg(long, default_value_t = 6379)]
    pub port: u16,

    /// Number of worker threads / shards. 0 means hardware concurrency.
    #[arg(long, default_value_t = 0)]
    pub worker_threads: usize,

    /// Snapshot file name.
    #[arg(long, default_value = "dump.rdb")]
    pub rdb_filename: String,

    /// Working directory for the snapshot file.
    #[arg(long, default_value = "./")]
    pub dir: PathBuf,

    /// Background-save points as SECONDS:CHANGES (repeatable). Defaults
    /// to the classic 3600:1 300:100 60:10000 when none are given.
    #[arg(long = "save", value_parser = parse_save_point)]
    pub save_params: Vec<SavePoint>,

    /// Key→shard routing algorithm. A restart invariant.
    #[arg(long, value_enum, default_value = "crc16")]
    pub routing: RoutingAlgorithm,
}

impl ServerConfig {
    /// Worker count with the 0 = hardware-concurrency default applied.
    pub fn effective_workers(&self) -> usize {
        if self.worker_threads > 0 {
            self.worker_threads
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }

    /// Full path of the snapshot file.
    pub fn dump_path(&self) -> PathBuf {
        self.dir.join(&self.rdb_filename)
    }

    /// Configured save points, falling back to the classic defaults.
    pub fn save_points(&self) -> Vec<SavePoint> {
        if self.save_params.is_empty() {
            vec![
                SavePoint { seconds: 3600, changes: 1 },
                SavePoint { seconds: 300, changes: 100 },
                SavePoint { seconds: 60, changes: 10_000 },
            ]
        } else {
            self.save_params.clone()
        }
    }

    /// Builds the router for the effective worker count.
    pub fn build_router(&self) -> Router {
        match self.routing {
            RoutingAlgorithm::Crc16 => Router::crc16(self.effective_workers()),
            RoutingAlgorithm::Ring => Router::ring(self.effective_workers()),
        }
    }
}

/// Parses "SECONDS:CHANGES" into a [`SavePoint`].
fn parse_save_point(input: &str) -> Result<SavePoint, String> {
    let (secs, changes) = input
        .split_once(':')
        .ok_or_else(|| format!("expected SECONDS:CHANGES, got '{input}'"))?;
    let seconds = secs
        .parse()
        .map_err(|_| format!("invalid seconds in save point '{input}'"))?;
    let changes = changes
        .parse()
        .map_err(|_| format!("invalid changes in save point '{input}'"))?;
    Ok(SavePoint { seconds, changes })
}

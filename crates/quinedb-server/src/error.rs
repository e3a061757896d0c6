//! Server-level error types.

use std::io;

use quinedb_persistence::DumpError;
use thiserror::Error;

/// Fatal startup/runtime errors surfaced to `main`.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind port {port}: {source}")]
    Bind { port: u16, source: io::Error },

    #[error("failed to load snapshot: {0}")]
    Load(#[from] DumpError),

    #[error("a worker thread failed during startup")]
    WorkerStartup,

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Failures while writing a coordinated snapshot.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error(transparent)]
    Dump(#[from] DumpError),

    #[error("a worker exited before answering the snapshot request")]
    WorkerGone,
}

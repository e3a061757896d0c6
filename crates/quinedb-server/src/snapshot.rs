//! Snapshot driver: coordinated SAVE and startup load.
//!
//! SAVE never reads another worker's shard. The driver fans a Collect
//! message to every peer; each worker serializes its own partition
//! between commands, so every partition is an internally consistent
//! point-in-time slice. The driver stitches header + partitions +
//! terminator into a temp file and atomically renames it over the
//! target.
//!
//! Loading happens in `main` before any worker spawns: entries are
//! routed through the same Router that serves steady-state traffic and
//! collected into per-shard seed stores. This is why the routing
//! algorithm is a restart invariant — a different algorithm (or worker
//! count) would scatter restored keys away from their owners.

use std::path::Path;

use bytes::Bytes;
use quinedb_core::{SortedSet, Store, Value};
use quinedb_persistence::{dump, DumpEntry, DumpError, DumpReader, DumpValue, DumpWriter};
use quinedb_protocol::reply;
use tokio::sync::oneshot;
use tracing::{error, info};

use crate::error::SaveError;
use crate::mailbox::Message;
use crate::topology::Topology;
use crate::worker::WorkerCtx;

/// Serializes a store's live entries into dump-format bytes (no header,
/// no terminator — one partition of the final file).
pub fn serialize_partition(store: &Store) -> Vec<u8> {
    let mut buf = Vec::new();
    for (key, value, expires_at) in store.iter_entries() {
        let entry = to_dump_entry(key, value, expires_at);
        // Vec<u8> writes are infallible
        dump::write_entry(&mut buf, &entry).expect("serializing to memory cannot fail");
    }
    buf
}

/// Runs a full coordinated save and maps the outcome to a RESP reply.
pub async fn save(ctx: &WorkerCtx) -> Bytes {
    match run_save(ctx).await {
        Ok(()) => {
            info!(worker = ctx.id, path = %ctx.config.dump_path().display(), "snapshot saved");
            reply::ok()
        }
        Err(e) => {
            error!(worker = ctx.id, "snapshot failed: {e}");
            reply::error("ERR failed to save")
        }
    }
}

async fn run_save(ctx: &WorkerCtx) -> Result<(), SaveError> {
    let workers = ctx.topology.workers();

    // fan out before any file I/O so peers serialize concurrently
    let mut pending = Vec::with_capacity(workers.saturating_sub(1));
    for target in 0..workers {
        if target == ctx.id {
            continue;
        }
        let (reply_tx, reply_rx) = oneshot::channel();
        ctx.topology.push(target, Message::Collect { reply: reply_tx });
        ctx.topology.notify(target);
        pending.push(reply_rx);
    }

    let mut writer = DumpWriter::create(ctx.config.dump_path())?;
    writer.write_partition(&serialize_partition(&ctx.store.borrow()))?;
    for reply_rx in pending {
        let partition = reply_rx.await.map_err(|_| SaveError::WorkerGone)?;
        writer.write_partition(&partition)?;
    }
    writer.finish()?;
    Ok(())
}

/// Loads the dump file (if present) and seeds the topology with one
/// store per shard, routing every key through the router. Returns the
/// number of restored entries.
pub fn load_into(topology: &Topology, path: &Path) -> Result<usize, DumpError> {
    if !path.exists() {
        return Ok(0);
    }

    let mut reader = DumpReader::open(path)?;
    let mut stores: Vec<Store> = (0..topology.workers()).map(|_| Store::new()).collect();
    let mut restored = 0;

    while let Some(entry) = reader.read_entry()? {
        let shard = topology.router().shard_of(&entry.key);
        // past expiries are kept verbatim; lazy expiry reports them
        // absent on first read
        let expires_at = entry.expire_at_ms.map(|at| at as u64);
        stores[shard].restore(entry.key, from_dump_value(entry.value), expires_at);
        restored += 1;
    }

    for (id, store) in stores.into_iter().enumerate() {
        topology.seed(id, store);
    }
    Ok(restored)
}

fn to_dump_entry(key: &Bytes, value: &Value, expires_at: Option<u64>) -> DumpEntry {
    let value = match value {
        Value::String(data) => DumpValue::String(data.clone()),
        Value::List(items) => DumpValue::List(items.clone()),
        Value::Set(members) => DumpValue::Set(members.iter().cloned().collect()),
        Value::Hash(map) => {
            DumpValue::Hash(map.iter().map(|(f, v)| (f.clone(), v.clone())).collect())
        }
        Value::SortedSet(zset) => DumpValue::SortedSet(
            zset.iter().map(|(member, score)| (score, member.clone())).collect(),
        ),
    };
    DumpEntry {
        key: key.clone(),
        value,
        expire_at_ms: expires_at.map(|at| at as i64),
    }
}

fn from_dump_value(value: DumpValue) -> Value {
    match value {
        DumpValue::String(data) => Value::String(data),
        DumpValue::List(items) => Value::List(items),
        DumpValue::Set(members) => Value::Set(members.into_iter().collect()),
        DumpValue::Hash(pairs) => Value::Hash(pairs.into_iter().collect()),
        DumpValue::SortedSet(members) => {
            let mut zset = SortedSet::new();
            for (score, member) in members {
                zset.insert(member, score);
            }
            Value::SortedSet(zset)
        }
    }
}

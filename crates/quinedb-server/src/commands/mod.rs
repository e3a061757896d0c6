//! Command registry and dispatch contract.
//!
//! A process-wide name→handler table, populated once by [`init`] before
//! any worker thread starts and read-only afterwards. Lookup is
//! case-insensitive: the dispatcher uppercases the command name exactly
//! once.
//!
//! Handlers come in three kinds:
//! - `Keyed`: operates on the shard that owns `args[1]`. The connection
//!   layer routes it — locally straight into the worker's store, or
//!   across workers as a mailbox Request.
//! - `Connection`: no key, answered inline (PING).
//! - `Save`: the snapshot driver; needs the whole topology.
//!
//! Arity is validated here, before any routing, so an arity error is
//! always answered by the receiving worker and never forwarded.

mod generic;
mod hashes;
mod lists;
mod sets;
mod strings;
mod zsets;

use std::collections::HashMap;
use std::sync::OnceLock;

use bytes::Bytes;
use quinedb_core::Store;
use quinedb_protocol::reply;

/// Canonical wrong-type error line.
pub const WRONGTYPE: &str =
    "ERR WRONGTYPE Operation against a key holding the wrong kind of value";

/// A keyed handler runs against the owning shard's store and returns the
/// encoded reply. It must not capture mutable state.
pub type KeyedHandler = fn(&mut Store, &[Bytes]) -> Bytes;

/// A connection-level handler needs no shard at all.
pub type ConnectionHandler = fn(&[Bytes]) -> Bytes;

#[derive(Debug)]
pub enum CommandKind {
    Keyed(KeyedHandler),
    Connection(ConnectionHandler),
    Save,
}

#[derive(Debug)]
pub struct CommandSpec {
    pub name: &'static str,
    /// Accepts the total argument count (command name included).
    pub arity: fn(usize) -> bool,
    pub kind: CommandKind,
}

static REGISTRY: OnceLock<HashMap<&'static str, CommandSpec>> = OnceLock::new();

/// Populates the registry. Must run in `main` before workers spawn;
/// calling it again is a no-op.
pub fn init() {
    REGISTRY.get_or_init(build_registry);
}

fn build_registry() -> HashMap<&'static str, CommandSpec> {
    let mut reg = HashMap::new();
    strings::register(&mut reg);
    lists::register(&mut reg);
    hashes::register(&mut reg);
    sets::register(&mut reg);
    zsets::register(&mut reg);
    generic::register(&mut reg);

    insert(
        &mut reg,
        "PING",
        |n| n == 1 || n == 2,
        CommandKind::Connection(ping),
    );
    insert(&mut reg, "SAVE", |n| n == 1, CommandKind::Save);
    reg
}

pub(crate) fn insert(
    reg: &mut HashMap<&'static str, CommandSpec>,
    name: &'static str,
    arity: fn(usize) -> bool,
    kind: CommandKind,
) {
    reg.insert(name, CommandSpec { name, arity, kind });
}

/// Looks up an already-uppercased command name.
pub fn lookup(name: &str) -> Option<&'static CommandSpec> {
    REGISTRY
        .get()
        .expect("command registry not initialized")
        .get(name)
}

/// Resolves an argument vector to its command spec, producing the
/// unknown-command / arity error replies on failure.
pub fn resolve(args: &[Bytes]) -> Result<&'static CommandSpec, Bytes> {
    let first = match args.first() {
        Some(first) => first,
        None => return Err(reply::error("ERR empty command")),
    };
    let name = String::from_utf8_lossy(first).to_ascii_uppercase();
    let spec = match lookup(&name) {
        Some(spec) => spec,
        None => return Err(reply::error(&format!("ERR unknown command '{name}'"))),
    };
    if !(spec.arity)(args.len()) {
        return Err(arity_error(spec.name));
    }
    Ok(spec)
}

/// Runs a command on the shard that owns its key. The caller (local
/// dispatch or the peer loop) has already established ownership.
pub fn execute_keyed(spec: &CommandSpec, store: &mut Store, args: &[Bytes]) -> Bytes {
    match spec.kind {
        CommandKind::Keyed(handler) => handler(store, args),
        // Connection/Save commands are never routed by key
        _ => reply::error("ERR command is not keyed"),
    }
}

fn ping(args: &[Bytes]) -> Bytes {
    if args.len() == 2 {
        reply::bulk(&args[1])
    } else {
        reply::simple("PONG")
    }
}

// ---------------------------------------------------------------------------
// shared reply helpers for handlers
// ---------------------------------------------------------------------------

pub(crate) fn wrong_type() -> Bytes {
    reply::error(WRONGTYPE)
}

pub(crate) fn arity_error(name: &str) -> Bytes {
    reply::error(&format!(
        "ERR wrong number of arguments for '{}'",
        name.to_ascii_lowercase()
    ))
}

/// Parses an argument as a signed integer, or yields the canonical
/// integer-parse error reply.
pub(crate) fn parse_i64(arg: &[u8]) -> Result<i64, Bytes> {
    std::str::from_utf8(arg)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| reply::error("ERR value is not an integer or out of range"))
}

/// Parses an argument as a float score, or yields the canonical float
/// error reply.
pub(crate) fn parse_f64(arg: &[u8]) -> Result<f64, Bytes> {
    std::str::from_utf8(arg)
        .ok()
        .and_then(|s| match s {
            "inf" | "+inf" => Some(f64::INFINITY),
            "-inf" => Some(f64::NEG_INFINITY),
            other => other.parse().ok(),
        })
        .filter(|f| !f.is_nan())
        .ok_or_else(|| reply::error("ERR value is not a valid float"))
}

//! Generic key commands: EXPIRE, TTL.

use std::collections::HashMap;

use bytes::Bytes;
use quinedb_core::{time, Store, TtlState};
use quinedb_protocol::reply;

use super::{insert, parse_i64, CommandKind, CommandSpec};

pub(super) fn register(reg: &mut HashMap<&'static str, CommandSpec>) {
    insert(reg, "EXPIRE", |n| n == 3, CommandKind::Keyed(expire));
    insert(reg, "TTL", |n| n == 2, CommandKind::Keyed(ttl));
}

fn expire(store: &mut Store, args: &[Bytes]) -> Bytes {
    let seconds = match parse_i64(&args[2]) {
        Ok(seconds) => seconds,
        Err(err) => return err,
    };
    // negative seconds produce a timestamp in the past; the key then
    // reads as absent from the next access on
    let at_ms = time::now_ms().saturating_add_signed(seconds.saturating_mul(1000));
    reply::integer(i64::from(store.expire_at(&args[1], at_ms)))
}

fn ttl(store: &mut Store, args: &[Bytes]) -> Bytes {
    match store.ttl(&args[1]) {
        // whole seconds, rounded up: a key with 999ms left still has
        // one second to live from the client's point of view
        TtlState::Remaining(ms) => reply::integer(ms.div_ceil(1000) as i64),
        TtlState::NoExpiry => reply::integer(-1),
        TtlState::Missing => reply::integer(-2),
    }
}

//! Set commands: SADD, SMEMBERS, SREM, SCARD.

use std::collections::HashMap;

use bytes::Bytes;
use quinedb_core::Store;
use quinedb_protocol::reply;

use super::{insert, wrong_type, CommandKind, CommandSpec};

pub(super) fn register(reg: &mut HashMap<&'static str, CommandSpec>) {
    insert(reg, "SADD", |n| n >= 3, CommandKind::Keyed(sadd));
    insert(reg, "SMEMBERS", |n| n == 2, CommandKind::Keyed(smembers));
    insert(reg, "SREM", |n| n >= 3, CommandKind::Keyed(srem));
    insert(reg, "SCARD", |n| n == 2, CommandKind::Keyed(scard));
}

fn sadd(store: &mut Store, args: &[Bytes]) -> Bytes {
    match store.set_add(&args[1], &args[2..]) {
        Ok(added) => reply::integer(added as i64),
        Err(_) => wrong_type(),
    }
}

fn smembers(store: &mut Store, args: &[Bytes]) -> Bytes {
    match store.set_members(&args[1]) {
        Ok(members) => reply::bulk_array(members.iter()),
        Err(_) => wrong_type(),
    }
}

fn srem(store: &mut Store, args: &[Bytes]) -> Bytes {
    match store.set_remove(&args[1], &args[2..]) {
        Ok(removed) => reply::integer(removed as i64),
        Err(_) => wrong_type(),
    }
}

fn scard(store: &mut Store, args: &[Bytes]) -> Bytes {
    match store.set_card(&args[1]) {
        Ok(count) => reply::integer(count as i64),
        Err(_) => wrong_type(),
    }
}

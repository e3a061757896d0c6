//! List commands: LPUSH, RPUSH, LPOP, RPOP, LLEN, LRANGE.

use std::collections::HashMap;

use bytes::Bytes;
use quinedb_core::Store;
use quinedb_protocol::reply;

use super::{insert, parse_i64, wrong_type, CommandKind, CommandSpec};

pub(super) fn register(reg: &mut HashMap<&'static str, CommandSpec>) {
    insert(reg, "LPUSH", |n| n >= 3, CommandKind::Keyed(lpush));
    insert(reg, "RPUSH", |n| n >= 3, CommandKind::Keyed(rpush));
    insert(reg, "LPOP", |n| n == 2, CommandKind::Keyed(lpop));
    insert(reg, "RPOP", |n| n == 2, CommandKind::Keyed(rpop));
    insert(reg, "LLEN", |n| n == 2, CommandKind::Keyed(llen));
    insert(reg, "LRANGE", |n| n == 4, CommandKind::Keyed(lrange));
}

fn lpush(store: &mut Store, args: &[Bytes]) -> Bytes {
    match store.list_push_front(&args[1], &args[2..]) {
        Ok(len) => reply::integer(len as i64),
        Err(_) => wrong_type(),
    }
}

fn rpush(store: &mut Store, args: &[Bytes]) -> Bytes {
    match store.list_push_back(&args[1], &args[2..]) {
        Ok(len) => reply::integer(len as i64),
        Err(_) => wrong_type(),
    }
}

fn lpop(store: &mut Store, args: &[Bytes]) -> Bytes {
    match store.list_pop_front(&args[1]) {
        Ok(Some(value)) => reply::bulk(&value),
        Ok(None) => reply::null_bulk(),
        Err(_) => wrong_type(),
    }
}

fn rpop(store: &mut Store, args: &[Bytes]) -> Bytes {
    match store.list_pop_back(&args[1]) {
        Ok(Some(value)) => reply::bulk(&value),
        Ok(None) => reply::null_bulk(),
        Err(_) => wrong_type(),
    }
}

fn llen(store: &mut Store, args: &[Bytes]) -> Bytes {
    match store.list_len(&args[1]) {
        Ok(len) => reply::integer(len as i64),
        Err(_) => wrong_type(),
    }
}

fn lrange(store: &mut Store, args: &[Bytes]) -> Bytes {
    let start = match parse_i64(&args[2]) {
        Ok(n) => n,
        Err(err) => return err,
    };
    let stop = match parse_i64(&args[3]) {
        Ok(n) => n,
        Err(err) => return err,
    };
    match store.list_range(&args[1], start, stop) {
        Ok(items) => reply::bulk_array(items.iter()),
        Err(_) => wrong_type(),
    }
}

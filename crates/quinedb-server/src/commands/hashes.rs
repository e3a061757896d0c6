//! Hash commands: HSET, HGET, HGETALL, HDEL, HLEN.

use std::collections::HashMap;

use bytes::Bytes;
use quinedb_core::Store;
use quinedb_protocol::reply;

use super::{insert, wrong_type, CommandKind, CommandSpec};

pub(super) fn register(reg: &mut HashMap<&'static str, CommandSpec>) {
    // HSET key field value [field value ...]
    insert(reg, "HSET", |n| n >= 4 && n % 2 == 0, CommandKind::Keyed(hset));
    insert(reg, "HGET", |n| n == 3, CommandKind::Keyed(hget));
    insert(reg, "HGETALL", |n| n == 2, CommandKind::Keyed(hgetall));
    insert(reg, "HDEL", |n| n >= 3, CommandKind::Keyed(hdel));
    insert(reg, "HLEN", |n| n == 2, CommandKind::Keyed(hlen));
}

fn hset(store: &mut Store, args: &[Bytes]) -> Bytes {
    let pairs: Vec<(Bytes, Bytes)> = args[2..]
        .chunks_exact(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect();
    match store.hash_set(&args[1], &pairs) {
        Ok(created) => reply::integer(created as i64),
        Err(_) => wrong_type(),
    }
}

fn hget(store: &mut Store, args: &[Bytes]) -> Bytes {
    match store.hash_get(&args[1], &args[2]) {
        Ok(Some(value)) => reply::bulk(&value),
        Ok(None) => reply::null_bulk(),
        Err(_) => wrong_type(),
    }
}

fn hgetall(store: &mut Store, args: &[Bytes]) -> Bytes {
    match store.hash_get_all(&args[1]) {
        Ok(pairs) => {
            let flat: Vec<&Bytes> = pairs.iter().flat_map(|(f, v)| [f, v]).collect();
            reply::bulk_array(flat.into_iter())
        }
        Err(_) => wrong_type(),
    }
}

fn hdel(store: &mut Store, args: &[Bytes]) -> Bytes {
    match store.hash_del(&args[1], &args[2..]) {
        Ok(removed) => reply::integer(removed as i64),
        Err(_) => wrong_type(),
    }
}

fn hlen(store: &mut Store, args: &[Bytes]) -> Bytes {
    match store.hash_len(&args[1]) {
        Ok(len) => reply::integer(len as i64),
        Err(_) => wrong_type(),
    }
}

//! String commands: SET, GET, DEL.

use std::collections::HashMap;

use bytes::Bytes;
use quinedb_core::Store;
use quinedb_protocol::reply;

use super::{insert, wrong_type, CommandKind, CommandSpec};

pub(super) fn register(reg: &mut HashMap<&'static str, CommandSpec>) {
    insert(reg, "SET", |n| n == 3, CommandKind::Keyed(set));
    insert(reg, "GET", |n| n == 2, CommandKind::Keyed(get));
    insert(reg, "DEL", |n| n == 2, CommandKind::Keyed(del));
}

fn set(store: &mut Store, args: &[Bytes]) -> Bytes {
    store.set_string(args[1].clone(), args[2].clone());
    reply::ok()
}

fn get(store: &mut Store, args: &[Bytes]) -> Bytes {
    match store.get_string(&args[1]) {
        Ok(Some(value)) => reply::bulk(&value),
        Ok(None) => reply::null_bulk(),
        Err(_) => wrong_type(),
    }
}

fn del(store: &mut Store, args: &[Bytes]) -> Bytes {
    reply::integer(i64::from(store.del(&args[1])))
}

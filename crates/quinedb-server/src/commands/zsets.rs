//! Sorted-set commands: ZADD, ZRANGE, ZREM, ZCARD, ZSCORE.

use std::collections::HashMap;

use bytes::Bytes;
use quinedb_core::Store;
use quinedb_protocol::reply;

use super::{insert, parse_f64, parse_i64, wrong_type, CommandKind, CommandSpec};

pub(super) fn register(reg: &mut HashMap<&'static str, CommandSpec>) {
    // ZADD key score member [score member ...]
    insert(reg, "ZADD", |n| n >= 4 && n % 2 == 0, CommandKind::Keyed(zadd));
    // ZRANGE key start stop [WITHSCORES]
    insert(reg, "ZRANGE", |n| n == 4 || n == 5, CommandKind::Keyed(zrange));
    insert(reg, "ZREM", |n| n >= 3, CommandKind::Keyed(zrem));
    insert(reg, "ZCARD", |n| n == 2, CommandKind::Keyed(zcard));
    insert(reg, "ZSCORE", |n| n == 3, CommandKind::Keyed(zscore));
}

fn zadd(store: &mut Store, args: &[Bytes]) -> Bytes {
    let mut pairs = Vec::with_capacity((args.len() - 2) / 2);
    for chunk in args[2..].chunks_exact(2) {
        let score = match parse_f64(&chunk[0]) {
            Ok(score) => score,
            Err(err) => return err,
        };
        pairs.push((score, chunk[1].clone()));
    }
    match store.zset_add(&args[1], &pairs) {
        Ok(added) => reply::integer(added as i64),
        Err(_) => wrong_type(),
    }
}

fn zrange(store: &mut Store, args: &[Bytes]) -> Bytes {
    let start = match parse_i64(&args[2]) {
        Ok(n) => n,
        Err(err) => return err,
    };
    let stop = match parse_i64(&args[3]) {
        Ok(n) => n,
        Err(err) => return err,
    };
    let with_scores = match args.get(4) {
        Some(opt) if opt.eq_ignore_ascii_case(b"WITHSCORES") => true,
        Some(_) => return reply::error("ERR syntax error"),
        None => false,
    };

    let members = match store.zset_range(&args[1], start, stop) {
        Ok(members) => members,
        Err(_) => return wrong_type(),
    };

    if with_scores {
        let flat: Vec<Bytes> = members
            .iter()
            .flat_map(|(member, score)| {
                [member.clone(), Bytes::from(reply::fmt_score(*score))]
            })
            .collect();
        reply::bulk_array(flat.iter())
    } else {
        let flat: Vec<&Bytes> = members.iter().map(|(member, _)| member).collect();
        reply::bulk_array(flat.into_iter())
    }
}

fn zrem(store: &mut Store, args: &[Bytes]) -> Bytes {
    match store.zset_remove(&args[1], &args[2..]) {
        Ok(removed) => reply::integer(removed as i64),
        Err(_) => wrong_type(),
    }
}

fn zcard(store: &mut Store, args: &[Bytes]) -> Bytes {
    match store.zset_card(&args[1]) {
        Ok(count) => reply::integer(count as i64),
        Err(_) => wrong_type(),
    }
}

fn zscore(store: &mut Store, args: &[Bytes]) -> Bytes {
    match store.zset_score(&args[1], &args[2]) {
        Ok(Some(score)) => reply::bulk(reply::fmt_score(score).as_bytes()),
        Ok(None) => reply::null_bulk(),
        Err(_) => wrong_type(),
    }
}

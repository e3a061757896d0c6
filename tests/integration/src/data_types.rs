//! Lists, hashes, sets, and sorted sets over the wire.

use crate::helpers::{Frame, TestServer};

#[tokio::test]
async fn list_push_pop_len() {
    let server = TestServer::start();
    let mut client = server.connect().await;

    assert_eq!(client.get_int(&["RPUSH", "l", "a", "b"]).await, 2);
    assert_eq!(client.get_int(&["LPUSH", "l", "z"]).await, 3);
    assert_eq!(client.get_int(&["LLEN", "l"]).await, 3);
    assert_eq!(client.get_bulk(&["LPOP", "l"]).await.as_deref(), Some("z"));
    assert_eq!(client.get_bulk(&["RPOP", "l"]).await.as_deref(), Some("b"));
    assert_eq!(client.get_bulk(&["LPOP", "l"]).await.as_deref(), Some("a"));
    assert_eq!(client.get_bulk(&["LPOP", "l"]).await, None);
}

#[tokio::test]
async fn lrange_negative_indices_and_empty_range() {
    let server = TestServer::start();
    let mut client = server.connect().await;

    client.get_int(&["RPUSH", "l", "a", "b", "c"]).await;
    assert_eq!(
        client.cmd(&["LRANGE", "l", "0", "-1"]).await,
        Frame::Array(vec![
            Frame::Bulk("a".into()),
            Frame::Bulk("b".into()),
            Frame::Bulk("c".into()),
        ])
    );
    assert_eq!(
        client.cmd(&["LRANGE", "l", "-2", "-1"]).await,
        Frame::Array(vec![Frame::Bulk("b".into()), Frame::Bulk("c".into())])
    );
    // start > stop after normalization → literal empty array
    client.send_raw(b"*4\r\n$6\r\nLRANGE\r\n$1\r\nl\r\n$1\r\n2\r\n$1\r\n1\r\n").await;
    client.expect_exact(b"*0\r\n").await;
}

#[tokio::test]
async fn wrongtype_literal_error_bytes() {
    let server = TestServer::start();
    let mut client = server.connect().await;

    client.ok(&["SET", "k", "v"]).await;
    client.send_raw(b"*3\r\n$5\r\nLPUSH\r\n$1\r\nk\r\n$1\r\nz\r\n").await;
    client
        .expect_exact(
            b"-ERR WRONGTYPE Operation against a key holding the wrong kind of value\r\n",
        )
        .await;
    // connection survives the error
    assert_eq!(client.get_bulk(&["GET", "k"]).await.as_deref(), Some("v"));
}

#[tokio::test]
async fn hash_created_count_and_lookup() {
    let server = TestServer::start();
    let mut client = server.connect().await;

    assert_eq!(
        client
            .get_int(&["HSET", "h", "f1", "v1", "f2", "v2"])
            .await,
        2
    );
    // update + create
    assert_eq!(
        client
            .get_int(&["HSET", "h", "f1", "vX", "f3", "v3"])
            .await,
        1
    );
    assert_eq!(
        client.get_bulk(&["HGET", "h", "f1"]).await.as_deref(),
        Some("vX")
    );
    assert_eq!(client.get_int(&["HLEN", "h"]).await, 3);
    assert_eq!(client.get_int(&["HDEL", "h", "f2", "missing"]).await, 1);

    match client.cmd(&["HGETALL", "h"]).await {
        Frame::Array(items) => assert_eq!(items.len(), 4), // 2 fields × (name, value)
        other => panic!("expected array, got {other:?}"),
    }
}

#[tokio::test]
async fn set_membership() {
    let server = TestServer::start();
    let mut client = server.connect().await;

    assert_eq!(client.get_int(&["SADD", "s", "a", "b", "a"]).await, 2);
    assert_eq!(client.get_int(&["SCARD", "s"]).await, 2);
    assert_eq!(client.get_int(&["SREM", "s", "a", "zz"]).await, 1);

    match client.cmd(&["SMEMBERS", "s"]).await {
        Frame::Array(items) => assert_eq!(items, vec![Frame::Bulk("b".into())]),
        other => panic!("expected array, got {other:?}"),
    }
}

#[tokio::test]
async fn zset_ordering_literal_bytes() {
    let server = TestServer::start();
    let mut client = server.connect().await;

    assert_eq!(
        client
            .get_int(&["ZADD", "z", "2", "b", "1", "a", "3", "c"])
            .await,
        3
    );
    client
        .send_raw(b"*5\r\n$6\r\nZRANGE\r\n$1\r\nz\r\n$1\r\n0\r\n$2\r\n-1\r\n$10\r\nWITHSCORES\r\n")
        .await;
    client
        .expect_exact(
            b"*6\r\n$1\r\na\r\n$1\r\n1\r\n$1\r\nb\r\n$1\r\n2\r\n$1\r\nc\r\n$1\r\n3\r\n",
        )
        .await;
}

#[tokio::test]
async fn zset_update_does_not_count_and_reorders() {
    let server = TestServer::start();
    let mut client = server.connect().await;

    client.get_int(&["ZADD", "z", "1", "a", "2", "b"]).await;
    assert_eq!(client.get_int(&["ZADD", "z", "9", "a"]).await, 0);
    assert_eq!(
        client.cmd(&["ZRANGE", "z", "0", "-1"]).await,
        Frame::Array(vec![Frame::Bulk("b".into()), Frame::Bulk("a".into())])
    );
    assert_eq!(
        client.get_bulk(&["ZSCORE", "z", "a"]).await.as_deref(),
        Some("9")
    );
    assert_eq!(client.get_int(&["ZREM", "z", "a"]).await, 1);
    assert_eq!(client.get_int(&["ZCARD", "z"]).await, 1);
    assert_eq!(client.get_bulk(&["ZSCORE", "z", "a"]).await, None);
}

#[tokio::test]
async fn zscore_fractional_formatting() {
    let server = TestServer::start();
    let mut client = server.connect().await;

    client.get_int(&["ZADD", "z", "1.50", "a"]).await;
    assert_eq!(
        client.get_bulk(&["ZSCORE", "z", "a"]).await.as_deref(),
        Some("1.5")
    );
}

//! Basic string operations and cross-shard reply ordering.

use crate::helpers::{encode_command, Frame, TestServer};

#[tokio::test]
async fn set_get_literal_wire_bytes() {
    let server = TestServer::start();
    let mut client = server.connect().await;

    client
        .send_raw(b"*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n")
        .await;
    client.expect_exact(b"+OK\r\n").await;

    client.send_raw(b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n").await;
    client.expect_exact(b"$3\r\nbar\r\n").await;
}

#[tokio::test]
async fn get_missing_key_is_null_bulk() {
    let server = TestServer::start();
    let mut client = server.connect().await;
    assert_eq!(client.get_bulk(&["GET", "never-set"]).await, None);
}

#[tokio::test]
async fn del_returns_presence() {
    let server = TestServer::start();
    let mut client = server.connect().await;

    client.ok(&["SET", "k", "v"]).await;
    assert_eq!(client.get_int(&["DEL", "k"]).await, 1);
    assert_eq!(client.get_int(&["DEL", "k"]).await, 0);
    assert_eq!(client.get_bulk(&["GET", "k"]).await, None);
}

#[tokio::test]
async fn ping_round_trip() {
    let server = TestServer::start();
    let mut client = server.connect().await;

    assert_eq!(client.cmd(&["PING"]).await, Frame::Simple("PONG".into()));
    assert_eq!(
        client.cmd(&["PING", "hello"]).await,
        Frame::Bulk("hello".into())
    );
}

#[tokio::test]
async fn unknown_command_is_an_error() {
    let server = TestServer::start();
    let mut client = server.connect().await;

    let msg = client.err(&["FROBNICATE", "k"]).await;
    assert_eq!(msg, "ERR unknown command 'FROBNICATE'");
}

#[tokio::test]
async fn arity_error_does_not_kill_the_connection() {
    let server = TestServer::start();
    let mut client = server.connect().await;

    let msg = client.err(&["SET", "only-key"]).await;
    assert_eq!(msg, "ERR wrong number of arguments for 'set'");
    // connection still usable
    client.ok(&["SET", "k", "v"]).await;
}

#[tokio::test]
async fn pipelined_cross_shard_replies_arrive_in_request_order() {
    let server = TestServer::start();
    let mut client = server.connect().await;

    // exact bytes of the spec's four-command pipeline
    let mut pipeline = Vec::new();
    pipeline.extend_from_slice(&encode_command(&["SET", "a", "1"]));
    pipeline.extend_from_slice(&encode_command(&["SET", "x", "2"]));
    pipeline.extend_from_slice(&encode_command(&["GET", "a"]));
    pipeline.extend_from_slice(&encode_command(&["GET", "x"]));
    client.send_raw(&pipeline).await;
    client
        .expect_exact(b"+OK\r\n+OK\r\n$1\r\n1\r\n$1\r\n2\r\n")
        .await;
}

#[tokio::test]
async fn large_pipeline_preserves_fifo_across_shards() {
    let server = TestServer::start();
    let mut client = server.connect().await;

    // 32 keys necessarily spread over the 4 shards; one burst write
    let mut pipeline = Vec::new();
    for i in 0..32 {
        let key = format!("key-{i}");
        let value = format!("value-{i}");
        pipeline.extend_from_slice(&encode_command(&["SET", &key, &value]));
    }
    for i in 0..32 {
        let key = format!("key-{i}");
        pipeline.extend_from_slice(&encode_command(&["GET", &key]));
    }
    client.send_raw(&pipeline).await;

    for _ in 0..32 {
        assert_eq!(client.read_frame().await, Frame::Simple("OK".into()));
    }
    for i in 0..32 {
        let expected = format!("value-{i}");
        assert_eq!(
            client.read_frame().await,
            Frame::Bulk(expected.into()),
            "reply {i} out of order"
        );
    }
}

#[tokio::test]
async fn two_clients_see_each_others_writes() {
    let server = TestServer::start();
    let mut writer = server.connect().await;
    let mut reader = server.connect().await;

    for i in 0..8 {
        let key = format!("shared-{i}");
        writer.ok(&["SET", &key, "present"]).await;
    }
    for i in 0..8 {
        let key = format!("shared-{i}");
        assert_eq!(
            reader.get_bulk(&["GET", &key]).await.as_deref(),
            Some("present")
        );
    }
}

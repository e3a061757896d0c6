//! SAVE / restart round trips.

use crate::helpers::{Frame, ServerOptions, TestServer};

fn options_for(dir: &tempfile::TempDir) -> ServerOptions {
    ServerOptions {
        data_dir_path: Some(dir.path().to_path_buf()),
        ..Default::default()
    }
}

#[tokio::test]
async fn save_writes_the_dump_file() {
    let dir = tempfile::tempdir().unwrap();
    let server = TestServer::start_with(options_for(&dir));
    let mut client = server.connect().await;

    client.ok(&["SET", "k", "v"]).await;
    client.ok(&["SAVE"]).await;

    assert!(dir.path().join("dump.rdb").exists());
}

#[tokio::test]
async fn save_then_restart_restores_all_types() {
    let dir = tempfile::tempdir().unwrap();

    {
        let server = TestServer::start_with(options_for(&dir));
        let mut client = server.connect().await;

        // spread data across all shards
        for i in 0..16 {
            let key = format!("str-{i}");
            let value = format!("value-{i}");
            client.ok(&["SET", &key, &value]).await;
        }
        client.get_int(&["RPUSH", "list", "a", "b", "c"]).await;
        client.get_int(&["HSET", "hash", "f", "v"]).await;
        client.get_int(&["SADD", "set", "m1", "m2"]).await;
        client.get_int(&["ZADD", "zset", "1", "a", "2", "b"]).await;
        client.get_int(&["EXPIRE", "str-0", "3600"]).await;

        client.ok(&["SAVE"]).await;
        server.stop();
    }

    let server = TestServer::start_with(options_for(&dir));
    let mut client = server.connect().await;

    for i in 0..16 {
        let key = format!("str-{i}");
        let expected = format!("value-{i}");
        assert_eq!(
            client.get_bulk(&["GET", &key]).await.as_deref(),
            Some(expected.as_str()),
            "{key} lost across restart"
        );
    }
    assert_eq!(
        client.cmd(&["LRANGE", "list", "0", "-1"]).await,
        Frame::Array(vec![
            Frame::Bulk("a".into()),
            Frame::Bulk("b".into()),
            Frame::Bulk("c".into()),
        ])
    );
    assert_eq!(
        client.get_bulk(&["HGET", "hash", "f"]).await.as_deref(),
        Some("v")
    );
    assert_eq!(client.get_int(&["SCARD", "set"]).await, 2);
    assert_eq!(
        client.cmd(&["ZRANGE", "zset", "0", "-1"]).await,
        Frame::Array(vec![Frame::Bulk("a".into()), Frame::Bulk("b".into())])
    );

    // the expiry survived the round trip
    let ttl = client.get_int(&["TTL", "str-0"]).await;
    assert!((3500..=3600).contains(&ttl), "ttl was {ttl}");
    assert_eq!(client.get_int(&["TTL", "str-1"]).await, -1);
}

#[tokio::test]
async fn restart_without_save_starts_empty() {
    let dir = tempfile::tempdir().unwrap();

    {
        let server = TestServer::start_with(options_for(&dir));
        let mut client = server.connect().await;
        client.ok(&["SET", "volatile", "gone"]).await;
        server.stop();
    }

    let server = TestServer::start_with(options_for(&dir));
    let mut client = server.connect().await;
    assert_eq!(client.get_bulk(&["GET", "volatile"]).await, None);
}

#[tokio::test]
async fn ring_routing_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let ring = || ServerOptions {
        data_dir: None,
        data_dir_path: Some(dir.path().to_path_buf()),
        routing: Some("ring"),
    };

    {
        let server = TestServer::start_with(ring());
        let mut client = server.connect().await;
        for i in 0..16 {
            let key = format!("ring-{i}");
            client.ok(&["SET", &key, "kept"]).await;
        }
        client.ok(&["SAVE"]).await;
        server.stop();
    }

    let server = TestServer::start_with(ring());
    let mut client = server.connect().await;
    for i in 0..16 {
        let key = format!("ring-{i}");
        assert_eq!(client.get_bulk(&["GET", &key]).await.as_deref(), Some("kept"));
    }
}

#[tokio::test]
async fn save_is_repeatable_on_one_connection() {
    let dir = tempfile::tempdir().unwrap();
    let server = TestServer::start_with(options_for(&dir));
    let mut client = server.connect().await;

    client.ok(&["SET", "k", "v1"]).await;
    client.ok(&["SAVE"]).await;
    client.ok(&["SET", "k", "v2"]).await;
    client.ok(&["SAVE"]).await;
    // connection stays healthy after synchronous saves
    assert_eq!(client.get_bulk(&["GET", "k"]).await.as_deref(), Some("v2"));
}

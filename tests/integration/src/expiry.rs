//! TTL and lazy expiry over the wire.

use std::time::Duration;

use crate::helpers::TestServer;

#[tokio::test]
async fn expire_ttl_lapse_cycle() {
    let server = TestServer::start();
    let mut client = server.connect().await;

    client.ok(&["SET", "k", "v"]).await;
    assert_eq!(client.get_int(&["EXPIRE", "k", "1"]).await, 1);
    assert_eq!(client.get_int(&["TTL", "k"]).await, 1);

    tokio::time::sleep(Duration::from_millis(1100)).await;

    assert_eq!(client.get_bulk(&["GET", "k"]).await, None);
    assert_eq!(client.get_int(&["TTL", "k"]).await, -2);
}

#[tokio::test]
async fn ttl_reports_key_states() {
    let server = TestServer::start();
    let mut client = server.connect().await;

    assert_eq!(client.get_int(&["TTL", "absent"]).await, -2);
    client.ok(&["SET", "k", "v"]).await;
    assert_eq!(client.get_int(&["TTL", "k"]).await, -1);
    assert_eq!(client.get_int(&["EXPIRE", "k", "100"]).await, 1);
    let remaining = client.get_int(&["TTL", "k"]).await;
    assert!((99..=100).contains(&remaining), "ttl was {remaining}");
}

#[tokio::test]
async fn expire_on_missing_key_returns_zero() {
    let server = TestServer::start();
    let mut client = server.connect().await;
    assert_eq!(client.get_int(&["EXPIRE", "ghost", "10"]).await, 0);
}

#[tokio::test]
async fn set_clears_prior_expiry() {
    let server = TestServer::start();
    let mut client = server.connect().await;

    client.ok(&["SET", "k", "v"]).await;
    assert_eq!(client.get_int(&["EXPIRE", "k", "1"]).await, 1);
    client.ok(&["SET", "k", "fresh"]).await;

    tokio::time::sleep(Duration::from_millis(1100)).await;

    // the overwrite removed the pending expiry
    assert_eq!(client.get_bulk(&["GET", "k"]).await.as_deref(), Some("fresh"));
    assert_eq!(client.get_int(&["TTL", "k"]).await, -1);
}

#[tokio::test]
async fn del_removes_expiry_with_the_key() {
    let server = TestServer::start();
    let mut client = server.connect().await;

    client.ok(&["SET", "k", "v"]).await;
    client.get_int(&["EXPIRE", "k", "100"]).await;
    assert_eq!(client.get_int(&["DEL", "k"]).await, 1);
    client.ok(&["SET", "k", "again"]).await;
    assert_eq!(client.get_int(&["TTL", "k"]).await, -1);
}

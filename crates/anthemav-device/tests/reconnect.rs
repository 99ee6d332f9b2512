mod common;

use std::time::Duration;

use anthemav_device::{ConnectionStatus, DeviceSession, ReconnectConfig, ZoneConfig};
use common::{MockReceiver, WAIT, closed_port, config, next_update};
use serde_json::json;
use tokio::time::timeout;

#[tokio::test]
async fn supervisor_queries_status_after_connect() {
    let mock = MockReceiver::bind().await;
    let session = DeviceSession::new(
        config(mock.port).with_zones(vec![
            ZoneConfig::new(1),
            ZoneConfig::new(2),
            ZoneConfig::new(3).with_enabled(false),
        ]),
    )
    .unwrap();

    session.start().await;
    let mut peer = mock.accept().await;

    let lines = peer.read_until("Z2INP?").await;
    assert_eq!(lines[0], "IDM?");
    assert!(lines.contains(&"Z1AIF?".to_string()));
    assert!(!lines.iter().any(|l| l.starts_with("Z3")));
    assert!(!lines.iter().any(|l| l.starts_with("Z2AIF")));

    session.disconnect().await;
}

#[tokio::test]
async fn session_reconnects_after_drop() {
    let mock = MockReceiver::bind().await;
    let session = DeviceSession::new(config(mock.port)).unwrap();
    let mut updates = session.updates();

    session.start().await;
    let mut first = mock.accept().await;
    first.read_until("Z1INP?").await;
    first.send("Z1POW1;").await;
    next_update(&mut updates, |u| u.zone == Some(1)).await;

    // receiver goes away
    drop(first);
    next_update(&mut updates, |u| {
        u.attributes.get("status") == Some(&json!("disconnected"))
    })
    .await;

    // supervisor comes back and the new read loop folds fresh lines
    let mut second = mock.accept().await;
    second.read_until("Z1INP?").await;
    second.send("Z1VOL-20;").await;

    let update = next_update(&mut updates, |u| {
        u.zone == Some(1) && u.attributes.get("volume_db") == Some(&json!(-20))
    })
    .await;
    assert_eq!(update.attributes["state"], json!("ON"));
    assert!(session.is_connected());

    assert!(session.volume_up(1).await.unwrap());
    assert_eq!(second.read_line().await.as_deref(), Some("Z1VUP"));

    session.disconnect().await;
}

#[tokio::test]
async fn supervisor_retries_until_receiver_appears() {
    let port = closed_port().await;
    let session = DeviceSession::new(config(port)).unwrap();
    let mut status = session.status();
    session.start().await;

    // a few refused attempts at 20ms+ backoff
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!session.is_connected());

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await.unwrap();
    let (_stream, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();

    timeout(WAIT, status.wait_for(|s| *s == ConnectionStatus::Connected))
        .await
        .unwrap()
        .unwrap();

    session.disconnect().await;
}

#[tokio::test]
async fn supervisor_gives_up_after_max_attempts() {
    let cfg = config(closed_port().await).with_reconnect(
        ReconnectConfig::default()
            .with_backoff(Duration::from_millis(5), Duration::from_millis(10), 2.0)
            .with_max_attempts(Some(3)),
    );
    let session = DeviceSession::new(cfg).unwrap();
    let mut updates = session.updates();
    session.start().await;

    // Connecting/Disconnected pairs for each attempt, then silence
    for _ in 0..3 {
        next_update(&mut updates, |u| {
            u.attributes.get("status") == Some(&json!("disconnected"))
        })
        .await;
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(updates.try_recv().is_err());
    assert!(!session.is_connected());
}

#[tokio::test]
async fn disconnect_cancels_pending_backoff() {
    let cfg = config(closed_port().await).with_reconnect(
        ReconnectConfig::default()
            .with_backoff(Duration::from_secs(30), Duration::from_secs(60), 2.0)
            .with_jitter(0.0),
    );
    let session = DeviceSession::new(cfg).unwrap();
    let mut updates = session.updates();
    session.start().await;
    next_update(&mut updates, |u| {
        u.attributes.get("status") == Some(&json!("disconnected"))
    })
    .await;

    // supervisor is now sleeping for 30s
    timeout(Duration::from_secs(1), session.disconnect())
        .await
        .expect("disconnect must not wait for the backoff");
    assert!(!session.is_connected());
}

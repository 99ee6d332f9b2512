mod common;

use std::collections::BTreeSet;

use anthemav_device::DeviceSession;
use common::{MockReceiver, config};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_commands_never_interleave() {
    let mock = MockReceiver::bind().await;
    let session = DeviceSession::new(config(mock.port)).unwrap();
    session.connect().await.unwrap();
    let mut peer = mock.accept().await;

    let mut expected = BTreeSet::new();
    let mut tasks = Vec::new();
    for i in 0..50u32 {
        let session = session.clone();
        let zone = (i % 3 + 1) as u8;
        let input = i % 9 + 1;
        expected.insert(format!("Z{zone}INP{input}"));
        tasks.push(tokio::spawn(async move {
            session.select_input(input, zone).await.unwrap()
        }));
    }
    for task in tasks {
        assert!(task.await.unwrap());
    }

    let lines = peer.read_lines(50).await;
    for line in &lines {
        assert!(expected.contains(line), "garbled line on the wire: {line:?}");
    }
    session.disconnect().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn two_concurrent_commands_arrive_whole() {
    let mock = MockReceiver::bind().await;
    let session = DeviceSession::new(config(mock.port)).unwrap();
    session.connect().await.unwrap();
    let mut peer = mock.accept().await;

    let a = session.clone();
    let b = session.clone();
    let (ra, rb) = tokio::join!(
        tokio::spawn(async move { a.send_command("Z1VOL-40").await }),
        tokio::spawn(async move { b.send_command("Z2MUT1").await }),
    );
    assert!(ra.unwrap());
    assert!(rb.unwrap());

    let mut lines = peer.read_lines(2).await;
    lines.sort();
    assert_eq!(lines, ["Z1VOL-40", "Z2MUT1"]);
}

//! Loopback stand-in for a receiver.

#![allow(dead_code)]

use std::time::Duration;

use anthemav_device::{DeviceConfig, DeviceUpdate, ReconnectConfig};
use anthemav_protocol::LineReader;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

pub const WAIT: Duration = Duration::from_secs(5);

pub struct MockReceiver {
    listener: TcpListener,
    pub port: u16,
}

impl MockReceiver {
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        Self { listener, port }
    }

    pub async fn accept(&self) -> Peer {
        let (stream, _) = timeout(WAIT, self.listener.accept())
            .await
            .expect("no connection from session")
            .unwrap();
        Peer::new(stream)
    }
}

/// Receiver side of one accepted connection.
pub struct Peer {
    reader: LineReader<tokio::net::tcp::OwnedReadHalf>,
    writer: tokio::net::tcp::OwnedWriteHalf,
}

impl Peer {
    fn new(stream: TcpStream) -> Self {
        let (read, write) = stream.into_split();
        Self {
            reader: LineReader::new(read),
            writer: write,
        }
    }

    pub async fn send(&mut self, raw: &str) {
        self.writer.write_all(raw.as_bytes()).await.unwrap();
        self.writer.flush().await.unwrap();
    }

    pub async fn read_line(&mut self) -> Option<String> {
        timeout(WAIT, self.reader.next_line())
            .await
            .expect("timed out waiting for a command")
            .unwrap()
    }

    pub async fn read_lines(&mut self, n: usize) -> Vec<String> {
        let mut lines = Vec::with_capacity(n);
        for _ in 0..n {
            lines.push(self.read_line().await.expect("connection closed early"));
        }
        lines
    }

    /// Reads commands until `wanted` shows up.
    pub async fn read_until(&mut self, wanted: &str) -> Vec<String> {
        let mut lines = Vec::new();
        loop {
            let line = self.read_line().await.expect("connection closed early");
            let done = line == wanted;
            lines.push(line);
            if done {
                return lines;
            }
        }
    }
}

pub fn config(port: u16) -> DeviceConfig {
    DeviceConfig::new("127.0.0.1")
        .with_port(port)
        .with_timeout(Duration::from_secs(2))
        .with_write_timeout(Duration::from_secs(2))
        .with_reconnect(
            ReconnectConfig::default()
                .with_backoff(Duration::from_millis(20), Duration::from_millis(200), 2.0)
                .with_jitter(0.0),
        )
}

/// Waits for the first update matching `pred`, skipping the rest.
pub async fn next_update<F>(rx: &mut UnboundedReceiver<DeviceUpdate>, pred: F) -> DeviceUpdate
where
    F: Fn(&DeviceUpdate) -> bool,
{
    timeout(WAIT, async {
        loop {
            let update = rx.recv().await.expect("update channel closed");
            if pred(&update) {
                return update;
            }
        }
    })
    .await
    .expect("timed out waiting for update")
}

/// Port with nothing listening on it.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

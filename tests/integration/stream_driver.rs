//! Stream driver over in-memory connections
//!
//! `tokio::io::duplex` stands in for the raw connection a layer-4 router
//! would hand to the matcher.

use std::io;
use std::time::Duration;

use tokio::io::{duplex, AsyncWriteExt};

use l4quic::config::MatcherConfig;
use l4quic::error::MatchError;
use l4quic::matcher::QuicMatcher;

use super::*;

const PIPE_CAPACITY: usize = 64 * 1024;

fn h3_matcher() -> QuicMatcher {
    QuicMatcher::from_config(
        &MatcherConfig::default()
            .with_sni(["example.com"])
            .with_alpn(["h3"]),
    )
    .unwrap()
}

#[tokio::test]
async fn test_match_over_connection() {
    let (mut client, mut server) = duplex(PIPE_CAPACITY);
    client.write_all(PACKET1).await.unwrap();

    let mut prefix = Vec::new();
    let matched = h3_matcher().match_stream(&mut server, &mut prefix).await.unwrap();

    assert!(matched);
    // The consumed prefix is kept for replay
    assert_eq!(prefix, PACKET1);
}

#[tokio::test]
async fn test_criteria_mismatch_over_connection() {
    let (mut client, mut server) = duplex(PIPE_CAPACITY);
    client.write_all(PACKET2).await.unwrap();

    let mut prefix = Vec::new();
    assert!(!h3_matcher().match_stream(&mut server, &mut prefix).await.unwrap());
}

#[tokio::test]
async fn test_bytes_arriving_piecemeal() {
    let (mut client, mut server) = duplex(PIPE_CAPACITY);

    let writer = tokio::spawn(async move {
        for chunk in PACKET3.chunks(97) {
            client.write_all(chunk).await.unwrap();
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        client
    });

    let mut prefix = Vec::new();
    let matched = h3_matcher().match_stream(&mut server, &mut prefix).await.unwrap();
    assert!(matched);
    assert_eq!(prefix.len(), PACKET3.len());

    writer.await.unwrap();
}

#[tokio::test]
async fn test_close_before_complete_is_not_matched() {
    let (mut client, mut server) = duplex(PIPE_CAPACITY);
    client.write_all(&PACKET1[..PACKET1.len() - 1]).await.unwrap();
    drop(client);

    let mut prefix = Vec::new();
    let matched = QuicMatcher::any()
        .match_stream(&mut server, &mut prefix)
        .await
        .unwrap();
    assert!(!matched);
    assert_eq!(prefix.len(), PACKET1.len() - 1);
}

#[tokio::test]
async fn test_close_without_data_is_not_matched() {
    let (client, mut server) = duplex(PIPE_CAPACITY);
    drop(client);

    let mut prefix = Vec::new();
    assert!(!QuicMatcher::any()
        .match_stream(&mut server, &mut prefix)
        .await
        .unwrap());
    assert!(prefix.is_empty());
}

#[tokio::test]
async fn test_concatenated_initials_over_connection() {
    let (mut client, mut server) = duplex(PIPE_CAPACITY);
    let mut joined = PACKET1.to_vec();
    joined.extend_from_slice(PACKET2);
    client.write_all(&joined).await.unwrap();

    let mut prefix = Vec::new();
    assert!(!QuicMatcher::any()
        .match_stream(&mut server, &mut prefix)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_short_header_decided_from_first_bytes() {
    let (mut client, mut server) = duplex(PIPE_CAPACITY);
    client.write_all(&[0x40, 0x01, 0x02, 0x03]).await.unwrap();

    // The client stays open: the decision must not wait for more bytes
    let mut prefix = Vec::new();
    let decided = tokio::time::timeout(
        Duration::from_secs(5),
        QuicMatcher::any().match_stream(&mut server, &mut prefix),
    )
    .await
    .expect("decision should not wait for more data");
    assert!(!decided.unwrap());
    drop(client);
}

#[tokio::test]
async fn test_caller_timeout_on_stalled_peer() {
    let (mut client, mut server) = duplex(PIPE_CAPACITY);
    client.write_all(&PACKET1[..600]).await.unwrap();

    let mut prefix = Vec::new();
    let result = tokio::time::timeout(
        Duration::from_millis(50),
        QuicMatcher::any().match_stream(&mut server, &mut prefix),
    )
    .await;
    assert!(result.is_err(), "stalled peer should hit the caller's timeout");
    drop(client);
}

/// A byte source that fails after yielding some bytes
struct FailingSource {
    data: &'static [u8],
    kind: io::ErrorKind,
}

impl tokio::io::AsyncRead for FailingSource {
    fn poll_read(
        mut self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<io::Result<()>> {
        if self.data.is_empty() {
            return std::task::Poll::Ready(Err(io::Error::from(self.kind)));
        }
        let n = self.data.len().min(buf.remaining());
        buf.put_slice(&self.data[..n]);
        self.data = &self.data[n..];
        std::task::Poll::Ready(Ok(()))
    }
}

#[tokio::test]
async fn test_upstream_read_failure_is_reported() {
    let mut source = FailingSource {
        data: &PACKET1[..800],
        kind: io::ErrorKind::ConnectionReset,
    };

    let mut prefix = Vec::new();
    let err = QuicMatcher::any()
        .match_stream(&mut source, &mut prefix)
        .await
        .unwrap_err();

    assert!(matches!(err, MatchError::UpstreamRead(_)));
    assert_eq!(err.io_kind(), io::ErrorKind::ConnectionReset);
    assert!(err.is_recoverable());
    assert_eq!(prefix.len(), 800);
}

#[tokio::test]
async fn test_unexpected_eof_is_not_an_error() {
    let mut source = FailingSource {
        data: &PACKET1[..800],
        kind: io::ErrorKind::UnexpectedEof,
    };

    let mut prefix = Vec::new();
    assert!(!QuicMatcher::any()
        .match_stream(&mut source, &mut prefix)
        .await
        .unwrap());
}

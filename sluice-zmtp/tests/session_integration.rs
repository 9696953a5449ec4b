//! Session-level tests over loopback TCP.
//!
//! These drive two `ZmtpSession`s (or a session and a raw stream) through
//! the handshake and the delivery loop without the socket layer on top.

use bytes::Bytes;
use compio::buf::BufResult;
use compio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use compio::net::TcpStream;
use sluice_core::endpoint::Endpoint;
use sluice_core::socket_type::SocketType;
use sluice_zmtp::codec::{ZmtpDecoder, ZmtpFrame};
use sluice_zmtp::command::{self, parse_command, PeerMetadata};
use sluice_zmtp::greeting::ZmtpGreeting;
use sluice_zmtp::transport;
use sluice_zmtp::{DeliveryMode, Message, SecurityMechanism, ZmtpError, ZmtpSession};
use std::sync::Arc;
use std::time::Duration;

const RECV_DEADLINE: Duration = Duration::from_secs(5);

async fn listen_local() -> (transport::Listener, Endpoint) {
    let endpoint = Endpoint::parse("tcp://127.0.0.1:0").unwrap();
    let listener = transport::listen(&endpoint, true).await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, Endpoint::parse(&format!("tcp://{addr}")).unwrap())
}

/// Handshake a connected pair; returns (client, server) sessions and what
/// each side learned about the other.
async fn handshake_pair(
    client_type: SocketType,
    client_identity: &'static [u8],
    server_type: SocketType,
) -> (
    Result<(Arc<ZmtpSession>, PeerMetadata), ZmtpError>,
    Result<(Arc<ZmtpSession>, PeerMetadata), ZmtpError>,
) {
    let (listener, endpoint) = listen_local().await;
    let (done_tx, done_rx) = flume::bounded(1);

    compio::runtime::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let session = Arc::new(ZmtpSession::new(stream));
        let result = session
            .prepare(
                SecurityMechanism::Null,
                server_type,
                b"",
                true,
                &PeerMetadata::new(),
            )
            .await
            .map(|meta| (session, meta));
        let _ = done_tx.send_async(result).await;
    })
    .detach();

    let stream = transport::dial(&endpoint, true).await.unwrap();
    let session = Arc::new(ZmtpSession::new(stream));
    let client = session
        .prepare(
            SecurityMechanism::Null,
            client_type,
            client_identity,
            false,
            &PeerMetadata::new(),
        )
        .await
        .map(|meta| (session, meta));

    let server = done_rx.recv_async().await.unwrap();
    (client, server)
}

async fn recv(rx: &flume::Receiver<Message>) -> Message {
    compio::time::timeout(RECV_DEADLINE, rx.recv_async())
        .await
        .expect("timed out waiting for message")
        .unwrap()
}

#[compio::test]
async fn test_dealer_router_handshake_exchanges_identity() {
    let (client, server) = handshake_pair(SocketType::Dealer, b"test_dealer", SocketType::Router).await;
    let (_, seen_by_dealer) = client.unwrap();
    let (_, seen_by_router) = server.unwrap();

    assert_eq!(seen_by_dealer.socket_type().unwrap().as_ref(), b"ROUTER");
    assert!(seen_by_dealer.identity().is_none());
    assert_eq!(seen_by_router.socket_type().unwrap().as_ref(), b"DEALER");
    assert_eq!(seen_by_router.identity().unwrap().as_ref(), b"test_dealer");
}

#[compio::test]
async fn test_incompatible_socket_types_rejected() {
    let (client, server) = handshake_pair(SocketType::Push, b"", SocketType::Router).await;
    assert!(matches!(client, Err(ZmtpError::IncompatiblePeer { .. })));
    assert!(matches!(server, Err(ZmtpError::IncompatiblePeer { .. })));
}

#[compio::test]
async fn test_multipart_delivery_with_routing_prefix() {
    let (client, server) = handshake_pair(SocketType::Dealer, b"test_dealer", SocketType::Router).await;
    let (dealer, _) = client.unwrap();
    let (router, _) = server.unwrap();

    let (tx, rx) = flume::bounded(0);
    compio::runtime::spawn(router.deliver(
        tx,
        DeliveryMode::Multipart,
        Some(Bytes::from_static(b"test_dealer")),
    ))
    .detach();

    dealer
        .send_multipart(&[Bytes::new(), Bytes::from_static(b"GOODBYE")])
        .await
        .unwrap();

    let msg = recv(&rx).await;
    assert!(msg.error.is_none());
    assert_eq!(
        msg.body,
        vec![
            Bytes::from_static(b"test_dealer"),
            Bytes::new(),
            Bytes::from_static(b"GOODBYE"),
        ]
    );
}

#[compio::test]
async fn test_single_mode_emits_each_frame() {
    let (client, server) = handshake_pair(SocketType::Client, b"", SocketType::Server).await;
    let (client, _) = client.unwrap();
    let (server, _) = server.unwrap();

    let (tx, rx) = flume::bounded(0);
    compio::runtime::spawn(server.deliver(tx, DeliveryMode::Single, None)).detach();

    client
        .send_multipart(&[Bytes::from_static(b"A"), Bytes::from_static(b"B")])
        .await
        .unwrap();

    assert_eq!(recv(&rx).await.body, vec![Bytes::from_static(b"A")]);
    assert_eq!(recv(&rx).await.body, vec![Bytes::from_static(b"B")]);
}

#[compio::test]
async fn test_disconnect_delivered_once_as_error() {
    let (client, server) = handshake_pair(SocketType::Pull, b"", SocketType::Push).await;
    let (pull, _) = client.unwrap();
    let (push, _) = server.unwrap();

    let (tx, rx) = flume::bounded(0);
    compio::runtime::spawn(pull.deliver(tx, DeliveryMode::Single, None)).detach();

    push.send_frame(Bytes::from_static(b"HELLO")).await.unwrap();
    assert_eq!(recv(&rx).await.body, vec![Bytes::from_static(b"HELLO")]);

    drop(push);

    let msg = recv(&rx).await;
    assert!(matches!(msg.error, Some(ZmtpError::PeerDisconnected)));
    // Loop has ended and dropped its sender
    assert!(compio::time::timeout(RECV_DEADLINE, rx.recv_async())
        .await
        .unwrap()
        .is_err());
}

/// Raw peer: greets, sends READY followed immediately by a PING and a data
/// frame in one write, then checks the PONG.
#[compio::test]
async fn test_ping_answered_and_bytes_after_ready_kept() {
    let (listener, endpoint) = listen_local().await;
    let (tx, rx) = flume::bounded(0);

    compio::runtime::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let session = Arc::new(ZmtpSession::new(stream));
        session
            .prepare(
                SecurityMechanism::Null,
                SocketType::Server,
                b"",
                true,
                &PeerMetadata::new(),
            )
            .await
            .unwrap();
        session.deliver(tx, DeliveryMode::Single, None).await;
    })
    .detach();

    let mut raw = TcpStream::connect(endpoint.address()).await.unwrap();

    let mut out = ZmtpGreeting::new("NULL", false).encode().to_vec();
    let ready = command::build_ready(
        &PeerMetadata::new().with(command::PROP_SOCKET_TYPE, "CLIENT"),
    );
    ZmtpFrame::command(ready).encode_into(&mut out);
    ZmtpFrame::command(command::build_ping(0, b"ctx")).encode_into(&mut out);
    ZmtpFrame::data(Bytes::from_static(b"HELLO"), false).encode_into(&mut out);
    let BufResult(res, _) = raw.write_all(out).await;
    res.unwrap();

    assert_eq!(recv(&rx).await.body, vec![Bytes::from_static(b"HELLO")]);

    // Peer greeting + READY + PONG
    let mut decoder = ZmtpDecoder::new();
    let mut greeted = false;
    let mut pong = None;
    while pong.is_none() {
        let BufResult(res, buf) = raw.read(Vec::with_capacity(1024)).await;
        let n = res.unwrap();
        assert!(n > 0, "peer closed before PONG");
        decoder.extend(&buf[..n]);
        if !greeted {
            greeted = decoder.take_raw(64).is_some();
            if !greeted {
                continue;
            }
        }
        while let Some(frame) = decoder.decode().unwrap() {
            let cmd = parse_command(&frame.payload).unwrap();
            if cmd.is(command::PONG) {
                pong = Some(cmd.data);
            }
        }
    }
    assert_eq!(pong.unwrap().as_ref(), b"ctx");
}

#[compio::test]
async fn test_mechanism_mismatch_rejected() {
    let (listener, endpoint) = listen_local().await;
    let (tx, rx) = flume::bounded(1);

    compio::runtime::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let session = ZmtpSession::new(stream);
        let result = session
            .prepare(
                SecurityMechanism::Null,
                SocketType::Router,
                b"",
                true,
                &PeerMetadata::new(),
            )
            .await;
        let _ = tx.send_async(result).await;
    })
    .detach();

    let mut raw = TcpStream::connect(endpoint.address()).await.unwrap();
    let greeting = ZmtpGreeting::new("PLAIN", false).encode().to_vec();
    let BufResult(res, _) = raw.write_all(greeting).await;
    res.unwrap();

    let result = rx.recv_async().await.unwrap();
    match result {
        Err(ZmtpError::MechanismMismatch { local, peer }) => {
            assert_eq!(local, "NULL");
            assert_eq!(peer, "PLAIN");
        }
        other => panic!("expected mechanism mismatch, got {other:?}"),
    }

    // Peer gets our greeting then an ERROR command
    let BufResult(res, _) = raw.read_exact(vec![0u8; 64]).await;
    res.unwrap();
}

#[compio::test]
async fn test_oversized_frame_rejected_before_body_arrives() {
    let (listener, endpoint) = listen_local().await;
    let (tx, rx) = flume::bounded(0);

    compio::runtime::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let session = Arc::new(ZmtpSession::new(stream).with_max_msg_size(Some(1024)));
        session
            .prepare(
                SecurityMechanism::Null,
                SocketType::Pull,
                b"",
                true,
                &PeerMetadata::new(),
            )
            .await
            .unwrap();
        session.deliver(tx, DeliveryMode::Single, None).await;
    })
    .detach();

    let mut raw = TcpStream::connect(endpoint.address()).await.unwrap();

    let mut out = ZmtpGreeting::new("NULL", false).encode().to_vec();
    let ready = command::build_ready(
        &PeerMetadata::new().with(command::PROP_SOCKET_TYPE, "PUSH"),
    );
    ZmtpFrame::command(ready).encode_into(&mut out);
    // LONG data frame announcing 1 TiB, followed by only a few body bytes
    out.push(0x02);
    out.extend_from_slice(&(1u64 << 40).to_be_bytes());
    out.extend_from_slice(b"partial");
    let BufResult(res, _) = raw.write_all(out).await;
    res.unwrap();

    let msg = recv(&rx).await;
    assert!(msg.body.is_empty());
    assert!(matches!(
        msg.error,
        Some(ZmtpError::MessageTooLarge { limit: 1024 })
    ));
    drop(raw);
}

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use vhost_mux::{BindError, DemuxError, Demuxer};

async fn connect(addr: std::net::SocketAddr) -> TcpStream {
    TcpStream::connect(addr).await.expect("connect")
}

#[tokio::test]
async fn routes_matching_host_to_its_virtual_listener() {
    let (demuxer, addr, _accept_task) = Demuxer::listen("127.0.0.1:0", Duration::from_millis(200))
        .await
        .unwrap();
    let mut listener = demuxer.bind("a.example.com").await.unwrap();

    let mut client = connect(addr).await;
    client
        .write_all(b"GET / HTTP/1.1\r\nHost: a.example.com\r\n\r\n")
        .await
        .unwrap();

    let mut conn = listener.accept().await.expect("accept");
    let mut buf = [0u8; 64];
    let n = conn.read(&mut buf).await.unwrap();
    assert!(buf[..n].starts_with(b"GET / HTTP/1.1"));
}

#[tokio::test]
async fn unmatched_host_surfaces_not_found() {
    let (demuxer, addr, _accept_task) = Demuxer::listen("127.0.0.1:0", Duration::from_millis(200))
        .await
        .unwrap();
    let _listener = demuxer.bind("a.example.com").await.unwrap();

    let mut client = connect(addr).await;
    client
        .write_all(b"GET / HTTP/1.1\r\nHost: missing.example.com\r\n\r\n")
        .await
        .unwrap();

    let (conn, err) = demuxer.next_error().await;
    assert!(conn.is_some());
    assert!(matches!(err, DemuxError::NotFound(h) if h == "missing.example.com"));
}

#[tokio::test]
async fn garbage_bytes_surface_bad_request() {
    let (demuxer, addr, _accept_task) = Demuxer::listen("127.0.0.1:0", Duration::from_millis(200))
        .await
        .unwrap();

    let mut client = connect(addr).await;
    client.write_all(b"not an http request\r\n\r\n").await.unwrap();

    let (conn, err) = demuxer.next_error().await;
    assert!(conn.is_some());
    assert!(matches!(err, DemuxError::BadRequest));
}

#[tokio::test]
async fn slow_header_exceeding_timeout_surfaces_bad_request() {
    let (demuxer, addr, _accept_task) = Demuxer::listen("127.0.0.1:0", Duration::from_millis(30))
        .await
        .unwrap();

    let mut client = connect(addr).await;
    // Dribble a partial request line and never complete the headers.
    client.write_all(b"GET / HTTP/1.1\r\n").await.unwrap();

    let (_conn, err) = demuxer.next_error().await;
    assert!(matches!(err, DemuxError::BadRequest));
}

#[tokio::test]
async fn duplicate_bind_is_rejected() {
    let (demuxer, _addr, _accept_task) = Demuxer::listen("127.0.0.1:0", Duration::from_millis(200))
        .await
        .unwrap();
    let _first = demuxer.bind("a.example.com").await.unwrap();
    let second = demuxer.bind("a.example.com").await;
    assert!(second.is_err());
}

#[tokio::test]
async fn empty_host_header_surfaces_not_found() {
    let (demuxer, addr, _accept_task) = Demuxer::listen("127.0.0.1:0", Duration::from_millis(200))
        .await
        .unwrap();
    let _listener = demuxer.bind("a.example.com").await.unwrap();

    let mut client = connect(addr).await;
    client
        .write_all(b"GET / HTTP/1.1\r\nHost: \r\n\r\n")
        .await
        .unwrap();

    let (_conn, err) = demuxer.next_error().await;
    assert!(matches!(err, DemuxError::NotFound(h) if h.is_empty()));
}

#[tokio::test]
async fn client_disconnect_before_headers_surfaces_closed() {
    let (demuxer, addr, _accept_task) = Demuxer::listen("127.0.0.1:0", Duration::from_millis(200))
        .await
        .unwrap();

    let mut client = connect(addr).await;
    client.write_all(b"GET / HTTP/1.1\r\n").await.unwrap();
    client.shutdown().await.unwrap();
    drop(client);

    let (_conn, err) = demuxer.next_error().await;
    assert!(matches!(err, DemuxError::Closed));
}

#[tokio::test]
async fn bind_after_close_is_rejected() {
    let (demuxer, _addr, _accept_task) = Demuxer::listen("127.0.0.1:0", Duration::from_millis(200))
        .await
        .unwrap();
    demuxer.close().await;

    assert!(matches!(
        demuxer.bind("a.example.com").await.unwrap_err(),
        BindError::Closed
    ));
}

#[tokio::test]
async fn closing_virtual_listener_unbinds_the_name() {
    let (demuxer, _addr, _accept_task) = Demuxer::listen("127.0.0.1:0", Duration::from_millis(200))
        .await
        .unwrap();
    let mut listener = demuxer.bind("a.example.com").await.unwrap();
    listener.close().await;

    // Name is free again.
    let rebound = demuxer.bind("a.example.com").await;
    assert!(rebound.is_ok());

    // The closed listener itself now reports closed on accept.
    assert!(listener.accept().await.is_err());
}

/*
 * gopher_integration.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * Integration tests for the client and server pipelines: a real server on a
 * loopback socket, driven by the real client. Covers directory and text
 * round trips, router parameters, error interception, metadata responses,
 * the caps.txt intercept, oversize selectors, and the no-TLS answer to a
 * ClientHello first byte.
 *
 * Run with:
 *   cargo test -p burrow-core --test gopher_integration
 */

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use burrow_core::{
    Client, ClientError, DirWriter, Handler, ItemType, MetaHandler, MetaWriter, Mux, Request,
    ResponseWriter, Server, Status, TextWriter, Url,
};

struct RootHandler;

#[async_trait]
impl Handler for RootHandler {
    async fn serve_gopher(&self, w: &mut ResponseWriter, rq: &mut Request) {
        let mut dw = DirWriter::new(w, rq);
        let _ = dw.info("welcome to the test server").await;
        let _ = dw.text("about", "/about").await;
        let _ = dw.dir("files", "/files").await;
        let _ = dw.flush().await;
    }
}

struct AboutHandler;

#[async_trait]
impl Handler for AboutHandler {
    async fn serve_gopher(&self, w: &mut ResponseWriter, rq: &mut Request) {
        let mut tw = TextWriter::new(w);
        let _ = tw.write_line("All about this server.").await;
        let _ = tw.write_line(&format!("You asked for {}", rq.url().selector)).await;
        let _ = tw.flush().await;
    }
}

struct FileHandler;

#[async_trait]
impl Handler for FileHandler {
    async fn serve_gopher(&self, w: &mut ResponseWriter, rq: &mut Request) {
        let name = rq.params.get("name").unwrap_or("?").to_string();
        let mut tw = TextWriter::new(w);
        let _ = tw.write_line(&format!("serving {}", name)).await;
        let _ = tw.flush().await;
    }
}

struct EchoBodyHandler;

#[async_trait]
impl Handler for EchoBodyHandler {
    async fn serve_gopher(&self, w: &mut ResponseWriter, rq: &mut Request) {
        let mut body = rq.take_body().expect("server requests carry a body");
        let mut buf = [0u8; 5];
        body.read_exact(&mut buf).await.expect("read body");
        let mut tw = TextWriter::new(w);
        let _ = tw.write_line(&format!("got: {}", String::from_utf8_lossy(&buf))).await;
        let _ = tw.flush().await;
    }
}

struct MetaEcho;

#[async_trait]
impl MetaHandler for MetaEcho {
    async fn serve_gopher_meta(&self, w: &mut MetaWriter<'_>, rq: &mut Request) {
        let sel = rq.url().selector.clone();
        let _ = w.info(ItemType::TEXT, "yep1", &sel).await;
        let _ = w.write_record("QUACK1", "yep1");
        let _ = w.write_record("QUACK2", "yep2");
    }
}

fn test_mux() -> Arc<Mux> {
    let mut mux = Mux::new();
    mux.handle("", Arc::new(RootHandler));
    mux.handle("/about", Arc::new(AboutHandler));
    mux.handle("/files/:name", Arc::new(FileHandler));
    mux.handle("/upload", Arc::new(EchoBodyHandler));
    Arc::new(mux)
}

/// Bind a server on an ephemeral loopback port; returns the client-facing
/// base URL pieces and the running server.
async fn start_server() -> (Arc<Server>, String, u16) {
    let mux = test_mux();
    let server = Arc::new(
        Server::new(mux.clone())
            .with_meta_handler(Arc::new(MetaEcho))
            .with_read_selector_timeout(Duration::from_secs(2))
            .with_read_timeout(Duration::from_secs(2)),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let serving = server.clone();
    let host = format!("127.0.0.1:{}", addr.port());
    tokio::spawn(async move {
        let _ = serving.serve(listener, &host).await;
    });

    (server, "127.0.0.1".to_string(), addr.port())
}

/// Collect everything the server sends; a reset after the data still counts
/// (the server may close with unread request bytes in the socket).
async fn read_until_close(conn: &mut TcpStream) -> Vec<u8> {
    let mut response = Vec::new();
    let mut buf = [0u8; 512];
    loop {
        match conn.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => response.extend_from_slice(&buf[..n]),
        }
    }
    response
}

fn client() -> Client {
    let mut c = Client::new();
    c.dial_timeout = Duration::from_secs(2);
    c.read_timeout = Duration::from_secs(2);
    c.write_timeout = Duration::from_secs(2);
    c
}

#[tokio::test]
async fn dir_round_trip() {
    let (server, host, port) = start_server().await;

    let url = Url::parse(&format!("gopher://{}:{}", host, port)).unwrap();
    let mut rsp = client().dir(Request::new(url)).await.unwrap();
    let dirents = rsp.collect().await.unwrap();

    assert_eq!(dirents.len(), 3);
    assert_eq!(dirents[0].item_type, ItemType::INFO);
    assert_eq!(dirents[0].display, "welcome to the test server");
    assert_eq!(dirents[1].item_type, ItemType::TEXT);
    assert_eq!(dirents[1].selector, "/about");
    assert_eq!(dirents[1].hostname, host);
    assert_eq!(dirents[1].port, port.to_string());
    assert_eq!(dirents[2].item_type, ItemType::DIR);

    server.close();
}

#[tokio::test]
async fn text_round_trip() {
    let (server, host, port) = start_server().await;

    let url = Url::parse(&format!("gopher://{}:{}/0/about", host, port)).unwrap();
    let mut rsp = client().text(Request::new(url)).await.unwrap();
    let mut body = String::new();
    rsp.read_to_string(&mut body).await.unwrap();

    assert_eq!(body, "All about this server.\nYou asked for /about\n");
    assert!(rsp.info().url().selector == "/about");

    server.close();
}

#[tokio::test]
async fn router_params_via_wire() {
    let (server, host, port) = start_server().await;

    let url = Url::parse(&format!("gopher://{}:{}/0/files/hello.txt", host, port)).unwrap();
    let mut rsp = client().text(Request::new(url)).await.unwrap();
    let mut body = String::new();
    rsp.read_to_string(&mut body).await.unwrap();

    assert_eq!(body, "serving hello.txt\n");

    server.close();
}

#[tokio::test]
async fn not_found_is_intercepted() {
    let (server, host, port) = start_server().await;

    let url = Url::parse(&format!("gopher://{}:{}/0/no/such/thing", host, port)).unwrap();
    let err = client().text(Request::new(url)).await.unwrap_err();

    match err {
        ClientError::Response(e) => {
            assert_eq!(e.status, Status::GENERAL_ERROR);
            assert!(e.message.starts_with("Not found:"), "{:?}", e.message);
            assert_eq!(e.confidence, 0.9);
            assert!(!e.raw.is_empty());
        }
        other => panic!("expected detected response error, got {:?}", other),
    }

    server.close();
}

#[tokio::test]
async fn not_found_passes_through_without_interception() {
    let (server, host, port) = start_server().await;

    let url = Url::parse(&format!("gopher://{}:{}/0/no/such/thing", host, port)).unwrap();
    let mut c = client();
    c.disable_error_intercept = true;
    let mut rsp = c.text(Request::new(url)).await.unwrap();
    let mut body = String::new();
    rsp.read_to_string(&mut body).await.unwrap();
    assert!(body.starts_with("3Not found:"), "{:?}", body);

    server.close();
}

#[tokio::test]
async fn request_body_reaches_handler() {
    let (server, host, port) = start_server().await;

    let url = Url::parse(&format!("gopher://{}:{}/0/upload", host, port)).unwrap();
    let rq = Request::with_body(url, Box::new(&b"12345"[..]));
    let mut rsp = client().text(rq).await.unwrap();
    let mut body = String::new();
    rsp.read_to_string(&mut body).await.unwrap();
    assert_eq!(body, "got: 12345\n");

    server.close();
}

#[tokio::test]
async fn meta_request_round_trip() {
    let (server, host, port) = start_server().await;

    let empty: &[&str] = &[];
    let url = Url::parse(&format!("gopher://{}:{}/0sel1", host, port))
        .unwrap()
        .as_meta_item(empty);
    let mut rsp = client().raw(Request::new(url)).await.unwrap();
    let mut body = Vec::new();
    rsp.read_to_end(&mut body).await.unwrap();

    let expected = format!(
        "+-1\r\n+INFO: 0yep1\tsel1\t{}\t{}\t+\r\n\r\n+QUACK1:\r\nyep1\r\n\r\n+QUACK2:\r\nyep2\r\n.\r\n",
        host, port
    );
    assert_eq!(String::from_utf8_lossy(&body), expected);

    server.close();
}

#[tokio::test]
async fn caps_txt_is_intercepted() {
    let (server, host, port) = start_server().await;

    let url = Url::parse(&format!("gopher://{}:{}/0caps.txt", host, port)).unwrap();
    let mut rsp = client().text(Request::new(url)).await.unwrap();
    let mut body = String::new();
    rsp.read_to_string(&mut body).await.unwrap();

    assert!(body.starts_with("CAPS\n"), "{:?}", body);
    let caps = burrow_core::parse_caps(
        "served",
        body.as_bytes(),
        burrow_core::ParseCapsFlags::NONE,
    )
    .unwrap();
    assert_eq!(burrow_core::Caps::version(&caps), 1);

    server.close();
}

#[tokio::test]
async fn oversize_selector_rejected() {
    let (server, host, port) = start_server().await;

    let mut conn = TcpStream::connect((host.as_str(), port)).await.unwrap();
    // One byte past the default 4096 limit, no newline.
    conn.write_all(&vec![b'a'; 4097]).await.unwrap();
    let response = read_until_close(&mut conn).await;

    let text = String::from_utf8_lossy(&response);
    assert!(text.starts_with("3Error: 600,"), "{:?}", text);
    assert!(text.ends_with("\tinvalid\t0\r\n"), "{:?}", text);

    server.close();
}

#[tokio::test]
async fn client_hello_without_tls_config() {
    let (server, host, port) = start_server().await;

    let mut conn = TcpStream::connect((host.as_str(), port)).await.unwrap();
    // The first byte of a TLS ClientHello record.
    conn.write_all(&[0x16, 0x03, 0x01, 0x00, 0x05]).await.unwrap();
    let response = read_until_close(&mut conn).await;

    assert_eq!(response, b"3Error\t\tinvalid\t0\r\n");

    server.close();
}

#[tokio::test]
async fn bad_file_flag_rejected() {
    let (server, host, port) = start_server().await;

    let mut conn = TcpStream::connect((host.as_str(), port)).await.unwrap();
    conn.write_all(b"/about\tsearch\t7\r\n").await.unwrap();
    let response = read_until_close(&mut conn).await;

    let text = String::from_utf8_lossy(&response);
    assert!(text.starts_with("3Error: 400,"), "{:?}", text);

    server.close();
}

/*
 * server.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Burrow, a Gopher protocol client/server library.
 *
 * Burrow is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Burrow is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Burrow.  If not, see <http://www.gnu.org/licenses/>.
 */

//! The server pipeline: accept with backoff, one task per connection with
//! panic recovery, first-byte TLS upgrade detection (the "Lohmann Model":
//! 0x16 is reserved and may not begin a selector), bounded selector read,
//! dispatch to the handler or metadata handler, close.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use futures::FutureExt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio::task::AbortHandle;
use tokio_rustls::TlsAcceptor;

use crate::caps::ServerInfo;
use crate::capsfile::render_caps;
use crate::handler::{Handler, MetaHandler};
use crate::io::{DeadlineStream, PrependStream};
use crate::itemtype::ItemType;
use crate::metawriter::MetaWriter;
use crate::request::Request;
use crate::status::Status;
use crate::text::TextWriter;
use crate::url::Url;

pub const DEFAULT_REQUEST_SIZE_LIMIT: usize = 1 << 12;
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_READ_SELECTOR_TIMEOUT: Duration = Duration::from_secs(5);

/// What a non-TLS server sends back when a client leads with a ClientHello.
/// Non-TLS gopher servers typically answer the 0x16 byte with a `3` dirent
/// or a bodgy text message, which the client's TLS layer rejects as a bad
/// record; that rejection is exactly what the client's downgrade logic
/// catches, so we produce the same shape.
const UPGRADE_TLS_ERROR_RESPONSE: &[u8] = b"3Error\t\tinvalid\t0\r\n";

/// The well-known selector for the capability file.
const CAPS_SELECTOR: &str = "caps.txt";

/// Serve `handler` (and optionally `meta`) on `addr`. `host` is the
/// hostname[:port] handlers should use when emitting selectors pointing
/// back at this server; leave it empty to use each connection's local
/// address.
pub async fn listen_and_serve(
    addr: &str,
    host: &str,
    handler: Arc<dyn Handler>,
    meta: Option<Arc<dyn MetaHandler>>,
) -> io::Result<()> {
    let mut server = Server::new(handler);
    if let Some(meta) = meta {
        server = server.with_meta_handler(meta);
    }
    server.listen_and_serve(addr, host).await
}

pub struct Server {
    shared: Arc<Shared>,
    state: Arc<State>,
}

struct Shared {
    handler: Arc<dyn Handler>,
    meta_handler: Option<Arc<dyn MetaHandler>>,
    tls_acceptor: Option<TlsAcceptor>,
    info: ServerInfo,
    disable_caps: bool,
    request_size_limit: usize,
    read_timeout: Duration,
    read_selector_timeout: Duration,
    tls_port: Option<u16>,
}

struct State {
    shutdown: Notify,
    closed: AtomicBool,
    conns: Mutex<HashMap<u64, AbortHandle>>,
    next_conn: AtomicU64,
}

impl Server {
    pub fn new(handler: Arc<dyn Handler>) -> Server {
        Server {
            shared: Arc::new(Shared {
                handler,
                meta_handler: None,
                tls_acceptor: None,
                info: ServerInfo::default_info(),
                disable_caps: false,
                request_size_limit: DEFAULT_REQUEST_SIZE_LIMIT,
                read_timeout: DEFAULT_READ_TIMEOUT,
                read_selector_timeout: DEFAULT_READ_SELECTOR_TIMEOUT,
                tls_port: None,
            }),
            state: Arc::new(State {
                shutdown: Notify::new(),
                closed: AtomicBool::new(false),
                conns: Mutex::new(HashMap::new()),
                next_conn: AtomicU64::new(0),
            }),
        }
    }

    fn shared_mut(&mut self) -> &mut Shared {
        Arc::get_mut(&mut self.shared)
            .expect("gopher: server cannot be reconfigured while serving")
    }

    /// Answer GopherIIbis metadata requests with this handler.
    pub fn with_meta_handler(mut self, meta: Arc<dyn MetaHandler>) -> Server {
        self.shared_mut().meta_handler = Some(meta);
        self
    }

    /// Enable opportunistic TLS ("Lohmann Model") with this config.
    pub fn with_tls_config(mut self, config: Arc<tokio_rustls::rustls::ServerConfig>) -> Server {
        self.shared_mut().tls_acceptor = Some(TlsAcceptor::from(config));
        self
    }

    pub fn with_info(mut self, info: ServerInfo) -> Server {
        self.shared_mut().info = info;
        self
    }

    /// Don't intercept requests for `caps.txt`.
    pub fn with_caps_disabled(mut self) -> Server {
        self.shared_mut().disable_caps = true;
        self
    }

    /// Maximum selector line size in bytes.
    pub fn with_request_size_limit(mut self, limit: usize) -> Server {
        self.shared_mut().request_size_limit = limit;
        self
    }

    /// Deadline for reading a request body.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Server {
        self.shared_mut().read_timeout = timeout;
        self
    }

    /// Deadline for reading the selector line; kept short since a selector
    /// is one line and arrives immediately on a well-behaved connection.
    pub fn with_read_selector_timeout(mut self, timeout: Duration) -> Server {
        self.shared_mut().read_selector_timeout = timeout;
        self
    }

    /// The TLS port advertised in the generated caps.txt. With opportunistic
    /// TLS this is normally the listening port itself.
    pub fn with_tls_port(mut self, port: u16) -> Server {
        self.shared_mut().tls_port = Some(port);
        self
    }

    /// Bind and serve until `close`.
    pub async fn listen_and_serve(&self, addr: &str, host: &str) -> io::Result<()> {
        let addr = if addr.is_empty() { "0.0.0.0:70" } else { addr };
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener, host).await
    }

    /// Serve an already-bound listener until `close`. `host` as in
    /// `listen_and_serve`.
    pub async fn serve(&self, listener: TcpListener, host: &str) -> io::Result<()> {
        let (lhost, lport) = if host.is_empty() {
            (String::new(), String::new())
        } else {
            resolve_host_port(host)?
        };

        let mut backoff = Duration::ZERO;

        loop {
            if self.state.closed.load(Ordering::SeqCst) {
                return Ok(());
            }

            let accepted = tokio::select! {
                _ = self.state.shutdown.notified() => return Ok(()),
                accepted = listener.accept() => accepted,
            };

            let (conn, remote) = match accepted {
                Ok(pair) => pair,
                Err(err) => {
                    backoff = if backoff.is_zero() {
                        Duration::from_millis(5)
                    } else {
                        (backoff * 2).min(Duration::from_secs(1))
                    };
                    tracing::warn!(error = %err, wait = ?backoff, "accept failed; retrying");
                    tokio::time::sleep(backoff).await;
                    continue;
                }
            };
            backoff = Duration::ZERO;

            let (chost, cport) = if lhost.is_empty() {
                match conn.local_addr() {
                    Ok(local) => (local.ip().to_string(), local.port().to_string()),
                    Err(err) => {
                        tracing::warn!(error = %err, "no local address for connection");
                        continue;
                    }
                }
            } else {
                (lhost.clone(), lport.clone())
            };

            let shared = self.shared.clone();
            let state = self.state.clone();
            let id = state.next_conn.fetch_add(1, Ordering::Relaxed);

            let task = tokio::spawn(async move {
                let served = AssertUnwindSafe(serve_conn(shared, conn, remote, chost, cport))
                    .catch_unwind()
                    .await;
                if let Err(panic) = served {
                    let what = panic_message(&panic);
                    tracing::error!(remote = %remote, panic = %what, "panic serving connection");
                }
                state.conns.lock().unwrap().remove(&id);
            });

            self.state
                .conns
                .lock()
                .unwrap()
                .insert(id, task.abort_handle());
        }
    }

    /// Stop accepting and drop every live connection.
    pub fn close(&self) {
        self.state.closed.store(true, Ordering::SeqCst);
        self.state.shutdown.notify_waiters();
        let mut conns = self.state.conns.lock().unwrap();
        for (_, handle) in conns.drain() {
            handle.abort();
        }
    }
}

/// A connection that may have been upgraded to TLS after the first byte.
enum ServerStream {
    Plain(TcpStream),
    Tls(Box<tokio_rustls::server::TlsStream<PrependStream<TcpStream>>>),
    // Transient state while the upgrade handshake runs.
    Upgrading,
}

impl ServerStream {
    fn is_tls(&self) -> bool {
        matches!(self, ServerStream::Tls(_))
    }
}

impl AsyncRead for ServerStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ServerStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            ServerStream::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
            ServerStream::Upgrading => Poll::Ready(Err(upgrading_error())),
        }
    }
}

impl AsyncWrite for ServerStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            ServerStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            ServerStream::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
            ServerStream::Upgrading => Poll::Ready(Err(upgrading_error())),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ServerStream::Plain(s) => Pin::new(s).poll_flush(cx),
            ServerStream::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
            ServerStream::Upgrading => Poll::Ready(Err(upgrading_error())),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ServerStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            ServerStream::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
            ServerStream::Upgrading => Poll::Ready(Err(upgrading_error())),
        }
    }
}

fn upgrading_error() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "gopher: connection mid-upgrade")
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

async fn serve_conn(
    shared: Arc<Shared>,
    conn: TcpStream,
    remote: SocketAddr,
    host: String,
    port: String,
) {
    let mut stream = ServerStream::Plain(conn);

    let (url, left, _file_flag) =
        match read_request(&shared, &mut stream, &host, &port).await {
            Ok(parts) => parts,
            Err(err) => {
                tracing::warn!(remote = %remote, error = %err, "request read failed");
                return;
            }
        };

    let (rd, mut wr) = tokio::io::split(stream);

    // The rest of the connection is the request body; bytes read past the
    // selector line are replayed in front of it.
    let body = DeadlineStream::new(PrependStream::new(left, rd), Some(shared.read_timeout));
    let mut rq = Request::with_body(url, Box::new(body));
    rq.remote_addr = Some(remote);

    // caps.txt is answered from ServerInfo unless the application opted to
    // serve its own.
    if !shared.disable_caps && !rq.url().is_meta() && rq.url().selector == CAPS_SELECTOR {
        let caps = render_caps(&shared.info, shared.tls_port);
        let mut tw = TextWriter::new(&mut wr);
        let served = async {
            tw.write_str(&caps).await?;
            tw.flush().await
        }
        .await;
        if let Err(err) = served {
            tracing::warn!(remote = %remote, error = %err, "caps write failed");
        }
        let _ = wr.shutdown().await;
        return;
    }

    match shared.meta_handler.clone().filter(|_| rq.url().is_meta()) {
        Some(meta) => {
            let mut mw = MetaWriter::new(&mut wr, &rq);
            meta.serve_gopher_meta(&mut mw, &mut rq).await;
            if !mw.is_flushed() {
                if let Err(err) = mw.flush().await {
                    tracing::warn!(remote = %remote, error = %err, "meta flush failed");
                }
            }
        }
        None => {
            shared.handler.serve_gopher(&mut wr, &mut rq).await;
        }
    }

    let _ = wr.shutdown().await;
}

/// Read and parse the selector line, upgrading to TLS if the first byte is a
/// ClientHello. Returns the request URL, any bytes read past the line, and
/// the file flag.
async fn read_request(
    shared: &Arc<Shared>,
    stream: &mut ServerStream,
    host: &str,
    port: &str,
) -> io::Result<(Url, Vec<u8>, bool)> {
    let max = shared.request_size_limit;
    let mut buf = vec![0u8; max];

    'retry_tls: loop {
        let mut sz = 0usize;
        let mut nl: Option<usize> = None;

        while sz < max {
            let n = match tokio::time::timeout(
                shared.read_selector_timeout,
                stream.read(&mut buf[sz..]),
            )
            .await
            {
                Ok(result) => result?,
                Err(_) => {
                    return Err(io::Error::new(
                        io::ErrorKind::TimedOut,
                        "selector read timed out",
                    ))
                }
            };
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed before selector",
                ));
            }

            // Only attempt a TLS upgrade on the very first bytes of a
            // not-yet-upgraded connection.
            if sz == 0 && !stream.is_tls() && buf[0] == 0x16 {
                upgrade_tls(shared, stream, &buf[..n]).await?;
                continue 'retry_tls;
            }

            let scan_from = sz;
            sz += n;
            if let Some(at) = buf[scan_from..sz].iter().position(|&b| b == b'\n') {
                nl = Some(scan_from + at);
                break;
            }
        }

        let nl = match nl {
            Some(nl) => nl,
            None => {
                // The buffer filled with no newline in sight. We can't know
                // whether it's a GopherIIbis request this early, so the
                // response is dirent-shaped.
                respond_error(
                    stream,
                    Status::GENERAL_ERROR,
                    "request selector string size exceeded limit",
                )
                .await;
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "request selector string size exceeded limit",
                ));
            }
        };

        let left = buf[nl + 1..sz].to_vec();
        let line = drop_cr(&buf[..nl]);

        let mut url = Url {
            hostname: host.to_string(),
            port: port.to_string(),
            ..Url::default()
        };

        let file_flag = match populate_request_url(&mut url, line) {
            Ok(flag) => flag,
            Err(err) => {
                respond_error(stream, Status::BAD_REQUEST, &err).await;
                return Err(io::Error::new(io::ErrorKind::InvalidData, err));
            }
        };

        return Ok((url, left, file_flag));
    }
}

async fn upgrade_tls(
    shared: &Arc<Shared>,
    stream: &mut ServerStream,
    seen: &[u8],
) -> io::Result<()> {
    // 0x16 is reserved and forbidden as the first byte of a selector; it
    // commences a TLS handshake:
    // https://lists.debian.org/gopher-project/2018/02/msg00038.html
    let acceptor = match &shared.tls_acceptor {
        Some(acceptor) => acceptor.clone(),
        None => {
            let _ = stream.write_all(UPGRADE_TLS_ERROR_RESPONSE).await;
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "tls not configured",
            ));
        }
    };

    let tcp = match std::mem::replace(stream, ServerStream::Upgrading) {
        ServerStream::Plain(tcp) => tcp,
        other => {
            *stream = other;
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "tls upgrade on non-plain stream",
            ));
        }
    };

    let replay = PrependStream::new(seen.to_vec(), tcp);
    let tls = acceptor.accept(replay).await?;
    *stream = ServerStream::Tls(Box::new(tls));
    Ok(())
}

async fn respond_error(stream: &mut ServerStream, status: Status, msg: &str) {
    // Incoming GopherIIbis isn't negotiated yet, so errors are always
    // dirent-style.
    let line = format!("3Error: {}, {}\t\tinvalid\t0\r\n", status, msg);
    let _ = stream.write_all(line.as_bytes()).await;
}

/// Parse the request line `<selector>[\t<search>[\t<file-flag>]]` into the
/// URL. The server cannot know the item type from what the client sends, so
/// it is always text.
fn populate_request_url(url: &mut Url, line: &[u8]) -> Result<bool, String> {
    url.item_type = ItemType::TEXT;

    let line = String::from_utf8_lossy(line);
    let mut file_flag = false;

    for (field, part) in line.split('\t').enumerate() {
        match field {
            0 => {
                url.selector = part.to_string();
                url.root = url.selector.is_empty();
            }
            1 => url.search = part.to_string(),
            2 => {
                // gIIs6. Perhaps invalid file flags should just be ignored?
                if part != "0" && part != "1" {
                    return Err("client sent an invalid file flag".to_string());
                }
                file_flag = part == "1";
            }
            _ => {
                return Err("request contained invalid trailing data".to_string());
            }
        }
    }

    Ok(file_flag)
}

fn drop_cr(line: &[u8]) -> &[u8] {
    match line.split_last() {
        Some((&b'\r', rest)) => rest,
        _ => line,
    }
}

fn resolve_host_port(host: &str) -> io::Result<(String, String)> {
    let (h, p) = crate::url::split_host_port(host)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, format!("bad host {:?}", host)))?;
    let p = if p.is_empty() { "70".to_string() } else { p };
    Ok((h, p))
}

/*
 * net.rs
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

//! TCP/TLS plumbing for the client: root store construction, the TLS mode
//! ladder, and the plain-or-TLS stream the pipeline reads from.
//!
//! Gopher TLS follows the "Lohmann Model": same port, client leads with a
//! ClientHello, and a non-TLS server answers the 0x16 byte with a dirent
//! error that the TLS layer rejects as a bad record. The client keys its
//! downgrade decision on that rejection.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::OnceLock;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::client::ClientConfig;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::RootCertStore;
use tokio_rustls::TlsConnector;

/// How the client approaches TLS for a `gopher://` URL. `gophers://` always
/// resolves to `Insist`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TlsMode {
    #[default]
    Default,
    /// Always attempt TLS; failure is an error.
    Insist,
    /// Attempt TLS; fall back to plain text if the handshake fails.
    WithInsecure,
    /// Plain text only.
    Disabled,
}

impl TlsMode {
    pub(crate) fn downgrade(self) -> bool {
        self == TlsMode::WithInsecure
    }

    pub(crate) fn resolve(self, force_secure: bool) -> TlsMode {
        if force_secure {
            return TlsMode::Insist;
        }
        if self == TlsMode::Default {
            return TlsMode::WithInsecure;
        }
        self
    }

    pub(crate) fn should_attempt(self) -> bool {
        matches!(self, TlsMode::Insist | TlsMode::WithInsecure)
    }
}

/// Build a root certificate store: platform native certs first, then
/// webpki-roots as fallback.
fn build_root_store() -> RootCertStore {
    let mut root_store = RootCertStore::empty();
    if let Ok(certs) = rustls_native_certs::load_native_certs() {
        for cert in certs {
            let _ = root_store.add(cert);
        }
    }
    if root_store.is_empty() {
        root_store.roots = webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();
    }
    root_store
}

/// Default TLS client config (native + Mozilla roots, no client auth).
pub fn default_client_config() -> Arc<ClientConfig> {
    static CONFIG: OnceLock<Arc<ClientConfig>> = OnceLock::new();
    CONFIG
        .get_or_init(|| {
            Arc::new(
                ClientConfig::builder()
                    .with_root_certificates(build_root_store())
                    .with_no_client_auth(),
            )
        })
        .clone()
}

/// Dial with a timeout.
pub(crate) async fn dial(addr: &str, timeout: Duration) -> io::Result<TcpStream> {
    match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(result) => result,
        Err(_) => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("gopher: dial {} timed out", addr),
        )),
    }
}

/// Handshake TLS over an established TCP connection, with the URL hostname
/// as SNI.
pub(crate) async fn tls_connect(
    tcp: TcpStream,
    hostname: &str,
    config: Option<Arc<ClientConfig>>,
    timeout: Duration,
) -> io::Result<TlsStream<TcpStream>> {
    let config = config.unwrap_or_else(default_client_config);
    let server_name = ServerName::try_from(hostname.to_string())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "invalid host name"))?;
    let connector = TlsConnector::from(config);
    match tokio::time::timeout(timeout, connector.connect(server_name, tcp)).await {
        Ok(result) => result,
        Err(_) => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            "gopher: TLS handshake timed out",
        )),
    }
}

/// Whether an I/O error is the TLS layer rejecting what the peer sent as not
/// TLS at all. This is the precise shape the downgrade logic keys on;
/// transport errors (refused, reset, timeout) must not downgrade.
pub(crate) fn is_tls_record_error(err: &io::Error) -> bool {
    if err.kind() != io::ErrorKind::InvalidData {
        return false;
    }
    err.get_ref()
        .map(|inner| inner.is::<tokio_rustls::rustls::Error>())
        .unwrap_or(false)
}

/// The client's connection: plain TCP or TLS over it.
pub enum ClientStream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl ClientStream {
    pub fn is_tls(&self) -> bool {
        matches!(self, ClientStream::Tls(_))
    }
}

impl AsyncRead for ClientStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ClientStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            ClientStream::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for ClientStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            ClientStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            ClientStream::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ClientStream::Plain(s) => Pin::new(s).poll_flush(cx),
            ClientStream::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ClientStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            ClientStream::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tls_mode_resolution() {
        assert_eq!(TlsMode::Default.resolve(false), TlsMode::WithInsecure);
        assert_eq!(TlsMode::Default.resolve(true), TlsMode::Insist);
        assert_eq!(TlsMode::Disabled.resolve(true), TlsMode::Insist);
        assert_eq!(TlsMode::Disabled.resolve(false), TlsMode::Disabled);
        assert_eq!(TlsMode::Insist.resolve(false), TlsMode::Insist);
    }

    #[test]
    fn downgrade_only_with_insecure() {
        assert!(TlsMode::WithInsecure.downgrade());
        assert!(!TlsMode::Insist.downgrade());
        assert!(!TlsMode::Disabled.downgrade());
        assert!(!TlsMode::Default.downgrade());
    }

    #[test]
    fn attempt_matrix() {
        assert!(TlsMode::Insist.should_attempt());
        assert!(TlsMode::WithInsecure.should_attempt());
        assert!(!TlsMode::Disabled.should_attempt());
        assert!(!TlsMode::Default.should_attempt());
    }

    #[test]
    fn record_error_shape() {
        let rustls_err = tokio_rustls::rustls::Error::InvalidMessage(
            tokio_rustls::rustls::InvalidMessage::InvalidContentType,
        );
        let err = io::Error::new(io::ErrorKind::InvalidData, rustls_err);
        assert!(is_tls_record_error(&err));

        let plain = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        assert!(!is_tls_record_error(&plain));
        let other = io::Error::new(io::ErrorKind::InvalidData, "not rustls");
        assert!(!is_tls_record_error(&other));
    }
}

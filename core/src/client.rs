/*
 * client.rs
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

//! The client pipeline: dial (with opportunistic TLS and downgrade-once),
//! send the selector line and any body, peek a bounded window of the
//! response for error detection, then hand the stream to the right response
//! class.

use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::caps::CapsSource;
use crate::error::ClientError;
use crate::errordetect::detect_error;
use crate::io::{DeadlineStream, PrependStream, RecordStream};
use crate::itemtype::ItemType;
use crate::net::{self, is_tls_record_error, ClientStream, TlsMode};
use crate::recorder::{Recorder, Recording};
use crate::request::Request;
use crate::response::{
    BinaryResponse, BodyStream, DirResponse, Response, ResponseInfo, TextResponse,
    UuEncodedResponse,
};
use crate::url::Url;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// How many bytes of the response the error detector may see. If the error
/// isn't present in this window, it can't be detected.
const MAX_ERROR_READ: usize = 1024;

/// A Gopher client. The zero value (`Client::new()`) is usable; fields are
/// set directly before the first request.
pub struct Client {
    pub dial_timeout: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,

    /// Item types to treat as binary in addition to the static set.
    pub extra_binary_types: Vec<ItemType>,

    /// Pass error-looking responses through instead of intercepting them.
    pub disable_error_intercept: bool,

    pub tls_mode: TlsMode,
    pub tls_client_config: Option<Arc<tokio_rustls::rustls::ClientConfig>>,

    pub caps_source: Option<Arc<dyn CapsSource>>,
    pub recorder: Option<Arc<dyn Recorder>>,
}

impl Default for Client {
    fn default() -> Self {
        Client {
            dial_timeout: DEFAULT_TIMEOUT,
            read_timeout: DEFAULT_TIMEOUT,
            write_timeout: DEFAULT_TIMEOUT,
            extra_binary_types: Vec::new(),
            disable_error_intercept: false,
            tls_mode: TlsMode::Default,
            tls_client_config: None,
            caps_source: None,
            recorder: None,
        }
    }
}

impl Client {
    pub fn new() -> Client {
        Client::default()
    }

    /// Fetch a URL, choosing the response class from its item type: the
    /// binary set streams raw bytes, `6` uudecodes, `1`/`7` parse dirents,
    /// everything else is dot-framed text.
    pub async fn fetch(&self, rq: Request) -> Result<Response, ClientError> {
        let mut it = rq.url().item_type;
        if rq.url().root {
            it = ItemType::DIR;
        }

        if it.is_binary() || self.extra_binary_types.contains(&it) {
            return Ok(Response::Binary(self.binary(rq).await?));
        }
        match it {
            ItemType::UUENCODED => Ok(Response::UuEncoded(self.uuencoded(rq).await?)),
            ItemType::DIR | ItemType::SEARCH => Ok(Response::Dir(self.dir(rq).await?)),
            _ => Ok(Response::Text(self.text(rq).await?)),
        }
    }

    /// Fetch a URL string; see `fetch`.
    pub async fn fetch_url(&self, url: &str) -> Result<Response, ClientError> {
        let url = Url::parse(url)?;
        self.fetch(Request::new(url)).await
    }

    pub async fn dir(&self, mut rq: Request) -> Result<DirResponse, ClientError> {
        let (conn, tls) = self.dial_and_send(&mut rq, !self.disable_error_intercept).await?;
        Ok(DirResponse::new(ResponseInfo { request: rq, tls }, conn))
    }

    /// A type `7` search; the query travels in the URL's search field.
    pub async fn search(&self, rq: Request) -> Result<DirResponse, ClientError> {
        self.dir(rq).await
    }

    pub async fn text(&self, mut rq: Request) -> Result<TextResponse, ClientError> {
        let (conn, tls) = self.dial_and_send(&mut rq, !self.disable_error_intercept).await?;
        Ok(TextResponse::new(ResponseInfo { request: rq, tls }, conn))
    }

    pub async fn binary(&self, mut rq: Request) -> Result<BinaryResponse, ClientError> {
        let (conn, tls) = self.dial_and_send(&mut rq, !self.disable_error_intercept).await?;
        Ok(BinaryResponse::new(ResponseInfo { request: rq, tls }, conn))
    }

    pub async fn uuencoded(&self, mut rq: Request) -> Result<UuEncodedResponse, ClientError> {
        let (conn, tls) = self.dial_and_send(&mut rq, !self.disable_error_intercept).await?;
        Ok(UuEncodedResponse::new(ResponseInfo { request: rq, tls }, conn))
    }

    /// Fetch with no error interception at all; the raw bytes come back as
    /// a binary response regardless of item type.
    pub async fn raw(&self, mut rq: Request) -> Result<BinaryResponse, ClientError> {
        let (conn, tls) = self.dial_and_send(&mut rq, false).await?;
        Ok(BinaryResponse::new(ResponseInfo { request: rq, tls }, conn))
    }

    async fn dial(&self, rq: &Request, tls_mode: TlsMode) -> Result<ClientStream, ClientError> {
        let url = rq.url();
        if !url.can_fetch() {
            return Err(ClientError::Unfetchable(url.clone()));
        }

        let port = url.port_u16().ok_or_else(|| {
            ClientError::Url(crate::url::UrlError {
                message: format!("gopher: unknown port {:?}", url.port),
            })
        })?;
        let addr = if url.hostname.contains(':') {
            format!("[{}]:{}", url.hostname, port)
        } else {
            format!("{}:{}", url.hostname, port)
        };

        let tcp = net::dial(&addr, self.dial_timeout).await?;

        if tls_mode.should_attempt() {
            let tls = net::tls_connect(
                tcp,
                &url.hostname,
                self.tls_client_config.clone(),
                self.dial_timeout,
            )
            .await?;
            return Ok(ClientStream::Tls(Box::new(tls)));
        }

        Ok(ClientStream::Plain(tcp))
    }

    async fn send(
        &self,
        conn: ClientStream,
        rq: &mut Request,
        intercept: bool,
        rec: Option<Arc<dyn Recording>>,
    ) -> Result<BodyStream, ClientError> {
        if let Some(src) = &self.caps_source {
            // Loaded for the side effects of the cache for now; request
            // shaping from caps comes later.
            let _caps = src.load_caps(&rq.url().hostname, &rq.url().port).await?;
        }

        let mut stream: BodyStream = match rec {
            Some(rec) => Box::new(RecordStream::new(conn, rec.clone())),
            None => Box::new(conn),
        };

        let mut line = BytesMut::new();
        rq.build_selector(&mut line);

        self.with_write_timeout(stream.write_all(&line)).await?;

        if let Some(mut body) = rq.take_body() {
            self.with_write_timeout(tokio::io::copy(&mut body, &mut stream)).await?;
        }
        self.with_write_timeout(stream.flush()).await?;

        if intercept {
            // One bounded read only: a second read could block forever,
            // since Gopher has no content length to say when to stop.
            // Servers that dribble out one dirent per write can defeat this.
            let mut scratch = vec![0u8; MAX_ERROR_READ];
            let n = match tokio::time::timeout(self.read_timeout, stream.read(&mut scratch)).await
            {
                Ok(result) => result?,
                Err(_) => {
                    return Err(ClientError::Io(std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        "gopher: response read timed out",
                    )))
                }
            };
            scratch.truncate(n);

            if let Some(err) = detect_error(&scratch, rq.url()) {
                return Err(ClientError::Response(err));
            }

            stream = Box::new(PrependStream::new(scratch, stream));
        }

        Ok(Box::new(DeadlineStream::new(stream, Some(self.read_timeout))))
    }

    async fn with_write_timeout<T, F>(&self, fut: F) -> Result<T, ClientError>
    where
        F: std::future::Future<Output = std::io::Result<T>>,
    {
        match tokio::time::timeout(self.write_timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ClientError::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "gopher: request write timed out",
            ))),
        }
    }

    async fn dial_and_send(
        &self,
        rq: &mut Request,
        intercept: bool,
    ) -> Result<(BodyStream, bool), ClientError> {
        let mut tls_mode = self.tls_mode.resolve(rq.url().is_secure());
        let rec = self.recorder.as_ref().map(|r| r.begin_recording(rq));

        loop {
            let conn = match self.dial(rq, tls_mode).await {
                Ok(conn) => conn,
                Err(ClientError::Io(e)) if is_tls_record_error(&e) && tls_mode.downgrade() => {
                    tracing::debug!(url = %rq.url(), "TLS rejected, retrying in plain text");
                    tls_mode = TlsMode::Disabled;
                    continue;
                }
                Err(e) => return Err(e),
            };
            let tls = conn.is_tls();

            match self.send(conn, rq, intercept, rec.clone()).await {
                Ok(stream) => return Ok((stream, tls)),
                Err(ClientError::Io(e)) if is_tls_record_error(&e) && tls_mode.downgrade() => {
                    tracing::debug!(url = %rq.url(), "TLS rejected mid-send, retrying in plain text");
                    tls_mode = TlsMode::Disabled;
                    continue;
                }
                Err(e) => {
                    if let ClientError::Response(detected) = &e {
                        if let Some(rec) = &rec {
                            rec.set_status(detected.status, &detected.message);
                        }
                    }
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = Client::new();
        assert_eq!(c.dial_timeout, DEFAULT_TIMEOUT);
        assert_eq!(c.read_timeout, DEFAULT_TIMEOUT);
        assert_eq!(c.write_timeout, DEFAULT_TIMEOUT);
        assert!(!c.disable_error_intercept);
        assert_eq!(c.tls_mode, TlsMode::Default);
    }

    #[tokio::test]
    async fn unfetchable_urls_fail_without_dialing() {
        let c = Client::new();
        let err = c.fetch_url("gopher://error.host/0foo").await.unwrap_err();
        assert!(matches!(err, ClientError::Unfetchable(_)));
        let err = c.fetch_url("gopher://example.org/8telnet").await.unwrap_err();
        assert!(matches!(err, ClientError::Unfetchable(_)));
    }
}

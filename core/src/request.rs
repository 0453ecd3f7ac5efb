/*
 * request.rs
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

//! Requests: an immutable URL, an optional body (GopherIIbis file uploads),
//! an optional format string, and server-side extras (remote address, router
//! parameters).

use std::fmt;
use std::net::SocketAddr;

use bytes::BytesMut;
use tokio::io::AsyncRead;

use crate::url::Url;

/// A request body stream. Client-side this is caller-supplied; server-side
/// it is the rest of the connection after the selector line.
pub type RequestBody = Box<dyn AsyncRead + Send + Sync + Unpin>;

pub struct Request {
    url: Url,
    body: Option<RequestBody>,
    format: String,

    /// Set by a server when it accepts a connection; ignored by the client.
    pub remote_addr: Option<SocketAddr>,

    /// Free for the server's mux to fill in. Anything a mux can't express
    /// belongs in handler state instead.
    pub params: Params,

    /// Prepended to selectors emitted by `DirWriter`, for handlers mounted
    /// under a prefix (virtual hosting).
    pub selector_prefix: String,
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("url", &self.url)
            .field("format", &self.format)
            .field("has_body", &self.body.is_some())
            .field("remote_addr", &self.remote_addr)
            .finish()
    }
}

impl Request {
    pub fn new(url: Url) -> Request {
        Request {
            url,
            body: None,
            format: String::new(),
            remote_addr: None,
            params: Params::default(),
            selector_prefix: String::new(),
        }
    }

    pub fn with_body(url: Url, body: RequestBody) -> Request {
        let mut rq = Request::new(url);
        rq.body = Some(body);
        rq
    }

    /// A GopherIIbis request with a format string. The format asks for a
    /// specific variant of a selector (IIbis allows one selector to point at
    /// multiple versions of the same file, in multiple languages), so the
    /// URL must not already carry a search string.
    pub fn with_format(url: Url, format: &str, body: Option<RequestBody>) -> Result<Request, crate::url::UrlError> {
        if !url.search.is_empty() {
            return Err(crate::url::UrlError {
                message: "gopher: format request URL must not contain search".to_string(),
            });
        }
        let mut rq = Request::new(url);
        rq.format = format.to_string();
        rq.body = body;
        Ok(rq)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Take the body stream, leaving None.
    pub fn take_body(&mut self) -> Option<RequestBody> {
        self.body.take()
    }

    /// Render the selector line:
    /// `<selector>[\t<search>[\t<format><0|1>]]\r\n`. The trailing digit
    /// flags the presence of a data block in IIbis requests.
    pub(crate) fn build_selector(&self, buf: &mut BytesMut) {
        buf.extend_from_slice(self.url.selector.as_bytes());

        if !self.url.search.is_empty() || !self.format.is_empty() || self.body.is_some() {
            buf.extend_from_slice(b"\t");
            buf.extend_from_slice(self.url.search.as_bytes());

            if !self.format.is_empty() || self.body.is_some() {
                buf.extend_from_slice(b"\t");
                buf.extend_from_slice(self.format.as_bytes());
                buf.extend_from_slice(if self.body.is_some() { b"1" } else { b"0" });
            }
        }

        buf.extend_from_slice(b"\r\n");
    }
}

/// Parameters bound by the mux during lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(pub Vec<Param>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub key: String,
    pub value: String,
}

impl Params {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|p| p.key == name)
            .map(|p| p.value.as_str())
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push(Param { key: key.into(), value: value.into() });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector_line(rq: &Request) -> String {
        let mut buf = BytesMut::new();
        rq.build_selector(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn bare_selector() {
        let rq = Request::new(url("gopher://host/0foo"));
        assert_eq!(selector_line(&rq), "foo\r\n");
    }

    #[test]
    fn selector_with_search() {
        let rq = Request::new(url("gopher://host/7foo%09words"));
        assert_eq!(selector_line(&rq), "foo\twords\r\n");
    }

    #[test]
    fn selector_with_body_flag() {
        let body: RequestBody = Box::new(&b"upload"[..]);
        let rq = Request::with_body(url("gopher://host/0foo"), body);
        assert_eq!(selector_line(&rq), "foo\t\t1\r\n");
    }

    #[test]
    fn selector_with_format() {
        let rq = Request::with_format(url("gopher://host/0foo"), "en_AU", None).unwrap();
        assert_eq!(selector_line(&rq), "foo\t\ten_AU0\r\n");
    }

    #[test]
    fn format_rejects_search() {
        assert!(Request::with_format(url("gopher://host/7foo%09words"), "en", None).is_err());
    }

    #[test]
    fn params_lookup() {
        let mut params = Params::default();
        params.push("a", "1");
        params.push("b", "2");
        assert_eq!(params.get("a"), Some("1"));
        assert_eq!(params.get("b"), Some("2"));
        assert_eq!(params.get("c"), None);
        assert_eq!(params.len(), 2);
    }
}

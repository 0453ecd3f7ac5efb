/*
 * response.rs
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

//! Client responses: one variant per body framing, each owning the
//! connection. The body is a lazy, finite, non-restartable stream; dropping
//! a response closes the connection.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};

use crate::dirent::{Dirent, DirReader};
use crate::io::AsyncStream;
use crate::request::Request;
use crate::text::TextReader;
use crate::uuencode::UuReader;

/// The erased connection stack a response reads from.
pub type BodyStream = Box<dyn AsyncStream>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    Binary,
    Dir,
    Text,
}

/// Details shared by every response kind.
#[derive(Debug)]
pub struct ResponseInfo {
    pub request: Request,
    /// Whether the response arrived over TLS.
    pub tls: bool,
}

impl ResponseInfo {
    pub fn url(&self) -> &crate::url::Url {
        self.request.url()
    }
}

/// A response from a Gopher server.
#[derive(Debug)]
pub enum Response {
    Binary(BinaryResponse),
    UuEncoded(UuEncodedResponse),
    Dir(DirResponse),
    Text(TextResponse),
}

impl Response {
    pub fn class(&self) -> ResponseClass {
        match self {
            Response::Binary(_) | Response::UuEncoded(_) => ResponseClass::Binary,
            Response::Dir(_) => ResponseClass::Dir,
            Response::Text(_) => ResponseClass::Text,
        }
    }

    pub fn info(&self) -> &ResponseInfo {
        match self {
            Response::Binary(r) => r.info(),
            Response::UuEncoded(r) => r.info(),
            Response::Dir(r) => r.info(),
            Response::Text(r) => r.info(),
        }
    }

    /// Release the connection. Dropping the response does the same.
    pub fn close(self) {}
}

impl AsyncRead for Response {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Response::Binary(r) => Pin::new(r).poll_read(cx, buf),
            Response::UuEncoded(r) => Pin::new(r).poll_read(cx, buf),
            Response::Dir(r) => Pin::new(r).poll_read(cx, buf),
            Response::Text(r) => Pin::new(r).poll_read(cx, buf),
        }
    }
}

/// An opaque byte-stream body; reads until the server closes.
pub struct BinaryResponse {
    info: ResponseInfo,
    conn: BodyStream,
}

impl BinaryResponse {
    pub(crate) fn new(info: ResponseInfo, conn: BodyStream) -> BinaryResponse {
        BinaryResponse { info, conn }
    }

    pub fn info(&self) -> &ResponseInfo {
        &self.info
    }
}

impl fmt::Debug for BinaryResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryResponse")
            .field("info", &self.info)
            .finish()
    }
}

impl AsyncRead for BinaryResponse {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.conn).poll_read(cx, buf)
    }
}

/// A uuencoded body; reads yield the decoded bytes.
pub struct UuEncodedResponse {
    info: ResponseInfo,
    uu: UuReader<TextReader<BodyStream>>,
}

impl UuEncodedResponse {
    pub(crate) fn new(info: ResponseInfo, conn: BodyStream) -> UuEncodedResponse {
        UuEncodedResponse {
            info,
            uu: UuReader::new(TextReader::new(conn)),
        }
    }

    pub fn info(&self) -> &ResponseInfo {
        &self.info
    }

    /// The encoded file's name, once the `begin` line has been read.
    pub fn file(&self) -> Option<&str> {
        self.uu.file()
    }

    /// The encoded file's unix mode, once the `begin` line has been read.
    pub fn mode(&self) -> Option<u32> {
        self.uu.mode()
    }
}

impl fmt::Debug for UuEncodedResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UuEncodedResponse")
            .field("info", &self.info)
            .finish()
    }
}

impl AsyncRead for UuEncodedResponse {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.uu).poll_read(cx, buf)
    }
}

/// A dot-framed text body; reads yield `\n`-normalised content.
pub struct TextResponse {
    info: ResponseInfo,
    rdr: TextReader<BodyStream>,
}

impl TextResponse {
    pub(crate) fn new(info: ResponseInfo, conn: BodyStream) -> TextResponse {
        TextResponse {
            info,
            rdr: TextReader::new(conn),
        }
    }

    pub fn info(&self) -> &ResponseInfo {
        &self.info
    }
}

impl fmt::Debug for TextResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextResponse")
            .field("info", &self.info)
            .finish()
    }
}

impl AsyncRead for TextResponse {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.rdr).poll_read(cx, buf)
    }
}

/// A directory body, read one dirent at a time with `next`. Byte-level
/// `AsyncRead` is refused; use a `TextResponse` (via `Client::text`) to see
/// a directory as raw text.
pub struct DirResponse {
    info: ResponseInfo,
    rdr: DirReader<BodyStream>,
}

impl fmt::Debug for DirResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirResponse")
            .field("info", &self.info)
            .finish()
    }
}

impl DirResponse {
    pub(crate) fn new(info: ResponseInfo, conn: BodyStream) -> DirResponse {
        DirResponse {
            info,
            rdr: DirReader::new(conn),
        }
    }

    pub fn info(&self) -> &ResponseInfo {
        &self.info
    }

    /// Tolerate looser dirents (missing host/port, odd ports).
    pub fn set_flags(&mut self, flags: crate::dirent::DirentFlags) {
        self.rdr.flags = flags;
    }

    /// The next dirent, or None at the end of the directory.
    pub async fn next(&mut self) -> io::Result<Option<Dirent>> {
        self.rdr.next().await
    }

    /// Read all remaining dirents.
    pub async fn collect(&mut self) -> io::Result<Vec<Dirent>> {
        let mut out = Vec::new();
        while let Some(dirent) = self.next().await? {
            out.push(dirent);
        }
        Ok(out)
    }
}

impl AsyncRead for DirResponse {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "gopher: read dirents from a DirResponse with next()",
        )))
    }
}

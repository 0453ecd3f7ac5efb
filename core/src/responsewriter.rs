/*
 * responsewriter.rs
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

//! Directory response writing. `DirWriter` fills in the host and port from
//! the request, prefixes selectors for virtual-hosted handlers, and latches
//! the first write error: every subsequent operation and the final `flush`
//! return it, so handler code doesn't have to check each line.

use std::io;

use bytes::BytesMut;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::dirent::Dirent;
use crate::itemtype::ItemType;
use crate::request::Request;
use crate::text::{CRLF, DOT_TERMINATOR};

/// Dummy selector/host/port for lines that don't point anywhere (`i` and
/// `3` lines).
const NULL_FIELDS: &[u8] = b"\tnull\tinvalid\t0";

/// The default handler for selectors nothing was registered for.
pub async fn not_found(
    w: &mut (dyn AsyncWrite + Unpin + Send),
    rq: &Request,
) -> io::Result<()> {
    let mut dw = DirWriter::new(w, rq);
    dw.error(&format!("Not found: {}", rq.url())).await?;
    dw.flush().await
}

/// Writes dirent lines, buffered, with the first error latched.
pub struct DirWriter<'a> {
    w: &'a mut (dyn AsyncWrite + Unpin + Send),
    buf: BytesMut,
    host: String,
    port: String,
    base: String,
    err: Option<(io::ErrorKind, String)>,
    flushed: bool,
    flush_at: usize,
}

impl<'a> DirWriter<'a> {
    /// Panics if the request URL's port is neither numeric nor a known
    /// service name; that is a server configuration bug.
    pub fn new(w: &'a mut (dyn AsyncWrite + Unpin + Send), rq: &Request) -> DirWriter<'a> {
        let url = rq.url();
        let port = url
            .port_u16()
            .unwrap_or_else(|| panic!("gopher: unknown port {:?}", url.port));
        DirWriter {
            w,
            buf: BytesMut::new(),
            host: url.hostname.clone(),
            port: port.to_string(),
            base: rq.selector_prefix.clone(),
            err: None,
            flushed: false,
            flush_at: 4096,
        }
    }

    /// Use a small buffer threshold; writes go out (and surface errors)
    /// sooner.
    pub fn with_flush_at(mut self, flush_at: usize) -> DirWriter<'a> {
        self.flush_at = flush_at;
        self
    }

    fn latched(&self) -> Option<io::Error> {
        self.err
            .as_ref()
            .map(|(kind, msg)| io::Error::new(*kind, msg.clone()))
    }

    async fn finish_line(&mut self) -> io::Result<()> {
        self.buf.extend_from_slice(CRLF);
        if self.buf.len() >= self.flush_at {
            self.write_out().await?;
        }
        Ok(())
    }

    async fn write_out(&mut self) -> io::Result<()> {
        if let Some(err) = self.latched() {
            return Err(err);
        }
        if self.buf.is_empty() {
            return Ok(());
        }
        match self.w.write_all(&self.buf).await {
            Ok(()) => {
                self.buf.clear();
                Ok(())
            }
            Err(e) => {
                self.err = Some((e.kind(), e.to_string()));
                Err(e)
            }
        }
    }

    /// Write a prepared dirent as-is (no host/port substitution).
    pub async fn dirent(&mut self, dirent: &Dirent) -> io::Result<()> {
        if let Some(err) = self.latched() {
            return Err(err);
        }
        let mut line = Vec::new();
        dirent.encode(&mut line);
        self.buf.extend_from_slice(&line);
        self.finish_line().await
    }

    /// Write an `i` line. It is safe to ignore the returned error; it will
    /// come back from `flush`.
    pub async fn info(&mut self, disp: &str) -> io::Result<()> {
        self.null_line(ItemType::INFO, disp).await
    }

    /// Write a `3` error line.
    pub async fn error(&mut self, disp: &str) -> io::Result<()> {
        self.null_line(ItemType::ERROR, disp).await
    }

    async fn null_line(&mut self, i: ItemType, disp: &str) -> io::Result<()> {
        if let Some(err) = self.latched() {
            return Err(err);
        }
        self.buf.extend_from_slice(&[i.byte()]);
        self.buf.extend_from_slice(disp.as_bytes());
        self.buf.extend_from_slice(NULL_FIELDS);
        self.finish_line().await
    }

    /// Write a selector on this server; the request's host and port are
    /// filled in, and the selector prefix is applied.
    pub async fn selector(&mut self, i: ItemType, disp: &str, sel: &str) -> io::Result<()> {
        self.selector_line(i, disp, sel, false).await
    }

    /// Like `selector`, with the GopherII `+` flag appended.
    pub async fn plus(&mut self, i: ItemType, disp: &str, sel: &str) -> io::Result<()> {
        self.selector_line(i, disp, sel, true).await
    }

    async fn selector_line(&mut self, i: ItemType, disp: &str, sel: &str, plus: bool) -> io::Result<()> {
        if let Some(err) = self.latched() {
            return Err(err);
        }
        self.buf.extend_from_slice(&[i.byte()]);
        self.buf.extend_from_slice(disp.as_bytes());
        self.buf.extend_from_slice(b"\t");
        if !self.base.is_empty() {
            self.buf.extend_from_slice(self.base.as_bytes());
        }
        self.buf.extend_from_slice(sel.as_bytes());
        self.buf.extend_from_slice(b"\t");
        self.buf.extend_from_slice(self.host.as_bytes());
        self.buf.extend_from_slice(b"\t");
        self.buf.extend_from_slice(self.port.as_bytes());
        if plus {
            self.buf.extend_from_slice(b"\t+");
        }
        self.finish_line().await
    }

    /// A link to another server. No prefixing or substitution.
    pub async fn remote_selector(
        &mut self,
        i: ItemType,
        disp: &str,
        sel: &str,
        host: &str,
        port: u16,
    ) -> io::Result<()> {
        if let Some(err) = self.latched() {
            return Err(err);
        }
        self.buf.extend_from_slice(&[i.byte()]);
        self.buf.extend_from_slice(disp.as_bytes());
        self.buf.extend_from_slice(b"\t");
        self.buf.extend_from_slice(sel.as_bytes());
        self.buf.extend_from_slice(b"\t");
        self.buf.extend_from_slice(host.as_bytes());
        self.buf.extend_from_slice(b"\t");
        self.buf.extend_from_slice(port.to_string().as_bytes());
        self.finish_line().await
    }

    pub async fn text(&mut self, disp: &str, sel: &str) -> io::Result<()> {
        self.selector(ItemType::TEXT, disp, sel).await
    }

    pub async fn dir(&mut self, disp: &str, sel: &str) -> io::Result<()> {
        self.selector(ItemType::DIR, disp, sel).await
    }

    pub async fn root(&mut self, disp: &str) -> io::Result<()> {
        self.selector(ItemType::DIR, disp, "").await
    }

    pub async fn binary(&mut self, disp: &str, sel: &str) -> io::Result<()> {
        self.selector(ItemType::BINARY, disp, sel).await
    }

    pub async fn image(&mut self, disp: &str, sel: &str) -> io::Result<()> {
        self.selector(ItemType::IMAGE, disp, sel).await
    }

    pub async fn search(&mut self, disp: &str, sel: &str) -> io::Result<()> {
        self.selector(ItemType::SEARCH, disp, sel).await
    }

    /// Write a dirent linking to a WWW URL, per the GopherII §11 `URL:`
    /// convention. Errors unless `url` starts with `http://` or `https://`.
    pub async fn www(&mut self, disp: &str, url: &str) -> io::Result<()> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            let e = io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("gopher: dirent www failed: URL {:?} does not start with http or https", url),
            );
            if self.err.is_none() {
                self.err = Some((e.kind(), e.to_string()));
            }
            return Err(e);
        }
        self.selector(ItemType::HTML, disp, &format!("URL:{}", url)).await
    }

    /// Terminate the directory with `.\r\n` and flush. Returns the latched
    /// error, if any; calling again returns the same result.
    pub async fn flush(&mut self) -> io::Result<()> {
        if let Some(err) = self.latched() {
            return Err(err);
        }
        if self.flushed {
            return Ok(());
        }
        self.flushed = true;
        self.buf.extend_from_slice(DOT_TERMINATOR);
        self.write_out().await?;
        match self.w.flush().await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.err = Some((e.kind(), e.to_string()));
                Err(e)
            }
        }
    }
}

/*
 * metawriter.rs
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

//! GopherIIbis metadata responses: the `+-1` preamble, a mandatory leading
//! `INFO` record, `+<NAME>:` records with CRLF-normalised values, record
//! filtering from the request's search string, and the `.` terminator.
//!
//! Misuse (INFO twice on a single-item request, a record before INFO, a
//! value line starting with `+`, a non-meta request) is a programmer error
//! and panics.

use std::io;

use bytes::BytesMut;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::itemtype::ItemType;
use crate::meta::{meta_includes_record, MetaType};
use crate::request::Request;
use crate::status::Status;
use crate::text::{CRLF, DOT_TERMINATOR};

const META_TEXT_BEGIN: &[u8] = b"+-1"; // gopher-ii-03, 6
const META_INFO: &[u8] = b"+INFO: ";

/// A convenience record for `write_meta`.
#[derive(Debug, Clone)]
pub struct MetaEntry {
    pub record: String,
    pub value: String,
}

/// Write an INFO line plus a set of records and flush, in one call.
pub async fn write_meta(
    mw: &mut MetaWriter<'_>,
    i: ItemType,
    disp: &str,
    sel: &str,
    entries: &[MetaEntry],
) -> io::Result<()> {
    mw.info(i, disp, sel).await?;
    for e in entries {
        mw.write_record(&e.record, &e.value)?;
    }
    mw.flush().await
}

/// Streaming writer for one metadata response.
pub struct MetaWriter<'a> {
    w: &'a mut (dyn AsyncWrite + Unpin + Send),
    buf: BytesMut,

    hostname: String,
    port: String,
    search: String,
    meta_type: MetaType,

    began: bool,
    info_set: bool,
    error_sent: bool,
    flushed: bool,
    flush_result: Option<Result<(), (io::ErrorKind, String)>>,

    // State of the record value currently being written.
    value_open: bool,
    value_last: u8,
    value_line_start: bool,
    value_err: Option<String>,
}

impl<'a> MetaWriter<'a> {
    /// Panics if the request is not a metadata request.
    pub fn new(w: &'a mut (dyn AsyncWrite + Unpin + Send), rq: &Request) -> MetaWriter<'a> {
        let url = rq.url();
        if !url.is_meta() {
            panic!("gopher: tried to write meta value for non-meta request");
        }
        MetaWriter {
            w,
            buf: BytesMut::new(),
            hostname: url.hostname.clone(),
            port: if url.port.is_empty() { "70".to_string() } else { url.port.clone() },
            search: url.search.clone(),
            meta_type: url.meta_type(),
            began: false,
            info_set: false,
            error_sent: false,
            flushed: false,
            flush_result: None,
            value_open: false,
            value_last: 0,
            value_line_start: false,
            value_err: None,
        }
    }

    /// Whether `flush` has already run. The server flushes any writer the
    /// handler left open.
    pub fn is_flushed(&self) -> bool {
        self.flushed
    }

    fn begin_meta(&mut self) {
        if self.began {
            panic!("gopher: metadata already began");
        }
        self.began = true;
        self.buf.extend_from_slice(META_TEXT_BEGIN);
    }

    /// Close out the previous record and, unless this is the final call from
    /// `flush`, emit the separator leading into the next one.
    fn next_record(&mut self, last: bool) {
        if !last {
            self.buf.extend_from_slice(CRLF);
        }

        if self.value_open {
            if let Some(err) = self.value_err.take() {
                panic!("gopher: {}", err);
            }
            if self.value_last != b'\n' {
                self.buf.extend_from_slice(CRLF);
            }
        }
        self.value_open = false;
    }

    /// Write the mandatory `INFO` record: the item's dirent with the
    /// request's host and port and a trailing plus. For a `!` request a
    /// second call panics; for a `&` request each call begins a new record
    /// set.
    pub async fn info(&mut self, i: ItemType, disp: &str, sel: &str) -> io::Result<()> {
        if self.error_sent {
            panic!("gopher: meta INFO record sent after error");
        }
        if self.info_set && self.meta_type == MetaType::Item {
            panic!("gopher: attempted to send INFO more than once for '!' meta request");
        }
        if !self.began {
            self.begin_meta();
        }

        self.next_record(false);
        self.info_set = true;

        self.buf.extend_from_slice(META_INFO);
        self.buf.extend_from_slice(&[i.byte()]);
        self.buf.extend_from_slice(disp.as_bytes());
        self.buf.extend_from_slice(b"\t");
        self.buf.extend_from_slice(sel.as_bytes());
        self.buf.extend_from_slice(b"\t");
        self.buf.extend_from_slice(self.hostname.as_bytes());
        self.buf.extend_from_slice(b"\t");
        self.buf.extend_from_slice(self.port.as_bytes());
        self.buf.extend_from_slice(b"\t+");
        self.buf.extend_from_slice(CRLF);

        // The sooner the info line goes out, the sooner clients can process
        // it:
        self.write_out().await
    }

    /// Begin a record; returns None when the request's filter excludes it,
    /// so the handler can skip producing an expensive value. `INFO` always
    /// passes the filter. Panics if no INFO record has been written yet.
    pub fn begin_record<'m>(&'m mut self, record: &str) -> Option<MetaRecord<'m, 'a>> {
        if record == "INFO" {
            self.next_record(false);
            self.info_set = true;
            self.buf.extend_from_slice(META_INFO);
            self.value_open = true;
            self.value_last = 0;
            self.value_line_start = false;
        } else {
            if !self.info_set {
                panic!("gopher: attempted to send non-info record before INFO");
            }
            if !meta_includes_record(&self.search, record) {
                return None;
            }

            self.next_record(false);
            self.buf.extend_from_slice(b"+");
            self.buf.extend_from_slice(record.as_bytes());
            self.buf.extend_from_slice(b":");
            self.buf.extend_from_slice(CRLF);
            self.value_open = true;
            self.value_last = 0;
            self.value_line_start = true;
        }

        Some(MetaRecord { mw: self })
    }

    /// Write an entire record with a string value. Returns false when the
    /// filter excluded the record.
    pub fn write_record(&mut self, record: &str, value: &str) -> io::Result<bool> {
        match self.begin_record(record) {
            Some(mut rec) => {
                rec.write_str(value)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Report the request as invalid: `-<code>\r\n<msg>\r\n`. Only valid
    /// before any record has been written; panics otherwise, or if the
    /// message contains a newline.
    pub fn meta_error(&mut self, code: Status, msg: &str) {
        if self.info_set {
            panic!("gopher: attempted to send INFO more than once for '!' meta request");
        }
        if msg.contains('\n') {
            panic!("gopher: meta error message contained newlines");
        }
        self.error_sent = true;

        self.buf.extend_from_slice(&[ItemType::META_ERROR.byte()]);
        self.buf.extend_from_slice(code.to_string().as_bytes());
        self.buf.extend_from_slice(CRLF);
        self.buf.extend_from_slice(msg.as_bytes());
        self.buf.extend_from_slice(CRLF);
    }

    /// Terminate the stream with `.\r\n` and flush. It is not necessary to
    /// call this directly; the server calls it at the end of the request.
    /// A second call returns the first call's result.
    pub async fn flush(&mut self) -> io::Result<()> {
        if self.flushed {
            return match &self.flush_result {
                Some(Ok(())) => Ok(()),
                Some(Err((kind, msg))) => Err(io::Error::new(*kind, msg.clone())),
                None => Ok(()),
            };
        }
        self.flushed = true;

        if !self.error_sent {
            if !self.began {
                self.begin_meta();
            }
            self.next_record(true);
        }
        self.buf.extend_from_slice(DOT_TERMINATOR);

        let result = async {
            self.write_out().await?;
            self.w.flush().await
        }
        .await;

        self.flush_result = Some(match &result {
            Ok(()) => Ok(()),
            Err(e) => Err((e.kind(), e.to_string())),
        });
        result
    }

    async fn write_out(&mut self) -> io::Result<()> {
        if !self.buf.is_empty() {
            self.w.write_all(&self.buf).await?;
            self.buf.clear();
        }
        Ok(())
    }

    fn value_write(&mut self, b: &[u8]) -> io::Result<usize> {
        if let Some(err) = &self.value_err {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, err.clone()));
        }

        for &c in b {
            if self.value_line_start && c == b'+' {
                let msg = "metadata value contains leading '+'".to_string();
                self.value_err = Some(msg.clone());
                return Err(io::Error::new(io::ErrorKind::InvalidInput, msg));
            }
            if c == b'\n' && self.value_last != b'\r' {
                self.buf.extend_from_slice(CRLF);
            } else {
                self.buf.extend_from_slice(&[c]);
            }
            self.value_line_start = c == b'\n';
            self.value_last = c;
        }

        Ok(b.len())
    }
}

/// Writer for one record's value. CRLF is normalised; a `+` at the start of
/// a line is rejected (it would be misread as a new record).
pub struct MetaRecord<'m, 'a> {
    mw: &'m mut MetaWriter<'a>,
}

impl MetaRecord<'_, '_> {
    pub fn write(&mut self, b: &[u8]) -> io::Result<usize> {
        self.mw.value_write(b)
    }

    pub fn write_str(&mut self, s: &str) -> io::Result<usize> {
        self.mw.value_write(s.as_bytes())
    }

    pub fn write_line(&mut self, s: &str) -> io::Result<usize> {
        let n = self.mw.value_write(s.as_bytes())?;
        Ok(n + self.mw.value_write(CRLF)?)
    }
}

/*
 * text.rs
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

//! Dot-framed text bodies: a line containing only `.` terminates the stream,
//! a leading `.` on a content line is doubled ("dot stuffing"), and line
//! endings are CRLF on the wire. The decoder normalises CRLF to `\n`; the
//! encoder promotes bare `\n` to CRLF.
//!
//! Both directions are pure state machines fed a chunk at a time, with async
//! wrappers at the stream boundary.

use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};

pub(crate) const CRLF: &[u8] = b"\r\n";
pub(crate) const DOT_TERMINATOR: &[u8] = b".\r\n";

#[derive(Clone, Copy, PartialEq)]
enum DecodeState {
    /// At the beginning of a line.
    LineStart,
    /// Saw `.` at the beginning of a line; not emitted yet.
    DotStart,
    /// Saw `.` then CR; one more LF means the stream is over.
    DotCr,
    /// Mid-line.
    Data,
    /// Saw CR mid-line, waiting for LF.
    Cr,
    /// Terminator seen; everything after it is not ours.
    Done,
}

/// Decoder for dot-framed text. Output is `\n`-normalised.
pub struct TextDecoder {
    state: DecodeState,
}

impl Default for TextDecoder {
    fn default() -> Self {
        Self { state: DecodeState::LineStart }
    }
}

impl TextDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_done(&self) -> bool {
        self.state == DecodeState::Done
    }

    /// Feed a chunk; decoded bytes are appended to `out`. Returns the number
    /// of input bytes consumed, which is less than `src.len()` only once the
    /// terminator has been seen.
    pub fn decode(&mut self, src: &[u8], out: &mut Vec<u8>) -> usize {
        for (idx, &b) in src.iter().enumerate() {
            match self.state {
                DecodeState::LineStart => match b {
                    b'.' => self.state = DecodeState::DotStart,
                    b'\r' => self.state = DecodeState::Cr,
                    b'\n' => out.push(b'\n'),
                    _ => {
                        out.push(b);
                        self.state = DecodeState::Data;
                    }
                },
                DecodeState::DotStart => match b {
                    b'\r' => self.state = DecodeState::DotCr,
                    b'\n' => {
                        self.state = DecodeState::Done;
                        return idx + 1;
                    }
                    // The leading dot was stuffing; drop it and emit the rest
                    // of the line.
                    _ => {
                        out.push(b);
                        self.state = DecodeState::Data;
                    }
                },
                DecodeState::DotCr => match b {
                    b'\n' => {
                        self.state = DecodeState::Done;
                        return idx + 1;
                    }
                    // `.` CR without LF: not a terminator after all. The dot
                    // was stuffing; keep the CR as data.
                    b'\r' => {
                        out.push(b'\r');
                        self.state = DecodeState::Cr;
                    }
                    _ => {
                        out.push(b'\r');
                        out.push(b);
                        self.state = DecodeState::Data;
                    }
                },
                DecodeState::Data => match b {
                    b'\r' => self.state = DecodeState::Cr,
                    b'\n' => {
                        out.push(b'\n');
                        self.state = DecodeState::LineStart;
                    }
                    _ => out.push(b),
                },
                DecodeState::Cr => match b {
                    b'\n' => {
                        out.push(b'\n');
                        self.state = DecodeState::LineStart;
                    }
                    b'\r' => out.push(b'\r'),
                    _ => {
                        out.push(b'\r');
                        out.push(b);
                        self.state = DecodeState::Data;
                    }
                },
                DecodeState::Done => return idx,
            }
        }
        src.len()
    }

    /// The underlying stream hit EOF. Most Gopher servers never send the
    /// terminator line and merely close the socket, so a truncated stream is
    /// treated as a clean end rather than an error. A bare `.` pending at EOF
    /// counts as the terminator.
    pub fn finish(&mut self, out: &mut Vec<u8>) {
        if self.state == DecodeState::Cr {
            out.push(b'\r');
        }
        self.state = DecodeState::Done;
    }
}

/// Async reader over a dot-framed stream. Yields decoded, `\n`-normalised
/// bytes and reports EOF at the terminator line (or at connection close).
pub struct TextReader<R> {
    inner: R,
    dec: TextDecoder,
    out: Vec<u8>,
    pos: usize,
    done: bool,
}

impl<R: AsyncRead + Unpin> TextReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            dec: TextDecoder::new(),
            out: Vec::new(),
            pos: 0,
            done: false,
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    async fn fill(&mut self) -> io::Result<()> {
        let mut scratch = [0u8; 4096];
        let n = self.inner.read(&mut scratch).await?;
        self.out.clear();
        self.pos = 0;
        if n == 0 {
            self.dec.finish(&mut self.out);
            self.done = true;
        } else {
            self.dec.decode(&scratch[..n], &mut self.out);
            if self.dec.is_done() {
                self.done = true;
            }
        }
        Ok(())
    }

    /// Read one decoded line, without its trailing `\n`, into `line`.
    /// Returns false at end of stream. A final line with no newline is still
    /// returned.
    pub async fn read_line(&mut self, line: &mut Vec<u8>) -> io::Result<bool> {
        loop {
            while self.pos < self.out.len() {
                let b = self.out[self.pos];
                self.pos += 1;
                if b == b'\n' {
                    return Ok(true);
                }
                line.push(b);
            }
            if self.done {
                return Ok(!line.is_empty());
            }
            self.fill().await?;
        }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for TextReader<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = &mut *self;
        loop {
            if this.pos < this.out.len() {
                let n = (this.out.len() - this.pos).min(buf.remaining());
                buf.put_slice(&this.out[this.pos..this.pos + n]);
                this.pos += n;
                return Poll::Ready(Ok(()));
            }
            if this.done {
                return Poll::Ready(Ok(()));
            }

            let mut scratch = [0u8; 4096];
            let mut rb = ReadBuf::new(&mut scratch);
            ready!(Pin::new(&mut this.inner).poll_read(cx, &mut rb))?;
            let n = rb.filled().len();
            this.out.clear();
            this.pos = 0;
            if n == 0 {
                this.dec.finish(&mut this.out);
                this.done = true;
            } else {
                this.dec.decode(rb.filled(), &mut this.out);
                if this.dec.is_done() {
                    this.done = true;
                }
            }
        }
    }
}

/// Encoder for dot-framed text: promotes `\n` to CRLF, doubles a leading `.`
/// on each line, and `finish` closes the body with the `.` terminator line
/// (adding a final CRLF first if the content didn't end with one).
pub struct TextEncoder {
    last: u8,
    line_start: bool,
    wrote: bool,
}

impl Default for TextEncoder {
    fn default() -> Self {
        Self { last: 0, line_start: true, wrote: false }
    }
}

impl TextEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encode(&mut self, src: &[u8], out: &mut BytesMut) {
        for &b in src {
            if self.line_start && b == b'.' {
                out.extend_from_slice(b"..");
            } else if b == b'\n' && self.last != b'\r' {
                out.extend_from_slice(CRLF);
            } else {
                out.extend_from_slice(&[b]);
            }
            self.line_start = b == b'\n';
            self.last = b;
            self.wrote = true;
        }
    }

    pub fn finish(&mut self, out: &mut BytesMut) {
        if self.wrote && self.last != b'\n' {
            out.extend_from_slice(CRLF);
        }
        out.extend_from_slice(DOT_TERMINATOR);
    }
}

/// Async writer producing a dot-framed text body. `flush` writes the
/// terminator; flushing twice is a no-op returning the first result.
pub struct TextWriter<W> {
    w: W,
    enc: TextEncoder,
    buf: BytesMut,
    flushed: bool,
}

const WRITER_FLUSH_AT: usize = 8192;

impl<W: AsyncWrite + Unpin> TextWriter<W> {
    pub fn new(w: W) -> Self {
        Self {
            w,
            enc: TextEncoder::new(),
            buf: BytesMut::new(),
            flushed: false,
        }
    }

    pub async fn write(&mut self, b: &[u8]) -> io::Result<usize> {
        self.enc.encode(b, &mut self.buf);
        if self.buf.len() >= WRITER_FLUSH_AT {
            self.write_out().await?;
        }
        Ok(b.len())
    }

    pub async fn write_str(&mut self, s: &str) -> io::Result<usize> {
        self.write(s.as_bytes()).await
    }

    /// Write a string followed by a line ending.
    pub async fn write_line(&mut self, s: &str) -> io::Result<usize> {
        let n = self.write(s.as_bytes()).await?;
        Ok(n + self.write(b"\n").await?)
    }

    /// Terminate the body with `.\r\n` and flush.
    pub async fn flush(&mut self) -> io::Result<()> {
        if self.flushed {
            return Ok(());
        }
        self.flushed = true;
        self.enc.finish(&mut self.buf);
        self.write_out().await?;
        self.w.flush().await
    }

    async fn write_out(&mut self) -> io::Result<()> {
        if !self.buf.is_empty() {
            self.w.write_all(&self.buf).await?;
            self.buf.clear();
        }
        Ok(())
    }
}

/*
 * uuencode.rs
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

//! Streaming uuencode codec for item type '6' bodies: `begin <mode> <name>`,
//! data lines of up to 45 bytes (length byte + 4 chars per 3 bytes), a
//! zero-length line, then `end`. Both space and backtick decode to zero;
//! the encoder emits backtick, which survives trailing-whitespace stripping.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::BytesMut;
use tokio::io::{AsyncRead, ReadBuf};

/// Maximum decoded bytes per data line.
const LINE_BYTES: usize = 45;

#[derive(Debug)]
pub struct UuError {
    pub message: String,
}

impl UuError {
    fn new(msg: impl Into<String>) -> Self {
        Self { message: msg.into() }
    }
}

impl fmt::Display for UuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "uuencode: {}", self.message)
    }
}

impl std::error::Error for UuError {}

impl From<UuError> for io::Error {
    fn from(e: UuError) -> Self {
        io::Error::new(io::ErrorKind::InvalidData, e)
    }
}

fn dec6(c: u8) -> u8 {
    c.wrapping_sub(0x20) & 0x3f
}

fn enc6(v: u8) -> u8 {
    if v == 0 {
        b'`'
    } else {
        0x20 + v
    }
}

#[derive(Clone, Copy, PartialEq)]
enum DecState {
    /// Waiting for the `begin` line.
    Begin,
    /// Reading data lines.
    Data,
    /// Saw the zero-length line; the next line must be `end`.
    End,
    Done,
}

/// Push decoder. Feed it raw (already de-framed) text; it buffers partial
/// lines internally.
pub struct UuDecoder {
    state: DecState,
    line: Vec<u8>,
    file: Option<String>,
    mode: Option<u32>,
}

impl Default for UuDecoder {
    fn default() -> Self {
        Self {
            state: DecState::Begin,
            line: Vec::new(),
            file: None,
            mode: None,
        }
    }
}

impl UuDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The file name from the `begin` line, once seen.
    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// The unix mode bits from the `begin` line, once seen.
    pub fn mode(&self) -> Option<u32> {
        self.mode
    }

    pub fn is_done(&self) -> bool {
        self.state == DecState::Done
    }

    pub fn decode(&mut self, src: &[u8], out: &mut Vec<u8>) -> Result<(), UuError> {
        for &b in src {
            if self.state == DecState::Done {
                // Trailing bytes after 'end' are not ours to judge.
                return Ok(());
            }
            if b == b'\n' {
                let line = std::mem::take(&mut self.line);
                self.line_done(&line, out)?;
            } else if b != b'\r' {
                self.line.push(b);
            }
        }
        Ok(())
    }

    /// The input is exhausted. Errors unless the `end` line was seen.
    pub fn finish(&mut self) -> Result<(), UuError> {
        if !self.line.is_empty() {
            let line = std::mem::take(&mut self.line);
            self.line_done(&line, &mut Vec::new())
                .map_err(|_| UuError::new("truncated stream"))?;
        }
        if self.state != DecState::Done {
            return Err(UuError::new("missing 'end' line"));
        }
        Ok(())
    }

    fn line_done(&mut self, line: &[u8], out: &mut Vec<u8>) -> Result<(), UuError> {
        match self.state {
            DecState::Begin => {
                let txt = std::str::from_utf8(line)
                    .map_err(|_| UuError::new("begin line is not text"))?;
                let rest = match txt.strip_prefix("begin ") {
                    Some(rest) => rest,
                    // Garbage before 'begin' is common (mail headers etc.);
                    // skip it.
                    None => return Ok(()),
                };
                let (mode, name) = rest
                    .split_once(' ')
                    .ok_or_else(|| UuError::new(format!("malformed begin line {:?}", txt)))?;
                let mode = u32::from_str_radix(mode, 8)
                    .map_err(|_| UuError::new(format!("bad mode in begin line {:?}", txt)))?;
                self.mode = Some(mode);
                self.file = Some(name.to_string());
                self.state = DecState::Data;
                Ok(())
            }
            DecState::Data => {
                if line.is_empty() {
                    self.state = DecState::End;
                    return Ok(());
                }
                let n = dec6(line[0]) as usize;
                if n == 0 {
                    self.state = DecState::End;
                    return Ok(());
                }
                if n > LINE_BYTES {
                    return Err(UuError::new(format!("line claims {} bytes", n)));
                }
                Self::decode_line(&line[1..], n, out);
                Ok(())
            }
            DecState::End => {
                if line == b"end" {
                    self.state = DecState::Done;
                    Ok(())
                } else if line.is_empty() {
                    Ok(())
                } else {
                    Err(UuError::new(format!(
                        "expected 'end', found {:?}",
                        String::from_utf8_lossy(line)
                    )))
                }
            }
            DecState::Done => Ok(()),
        }
    }

    fn decode_line(chars: &[u8], n: usize, out: &mut Vec<u8>) {
        // Some encoders drop trailing spaces in transit; missing characters
        // decode as zero.
        let at = |i: usize| -> u8 {
            if i < chars.len() {
                dec6(chars[i])
            } else {
                0
            }
        };
        let mut produced = 0;
        let mut i = 0;
        while produced < n {
            let quantum = ((at(i) as u32) << 18)
                | ((at(i + 1) as u32) << 12)
                | ((at(i + 2) as u32) << 6)
                | at(i + 3) as u32;
            i += 4;
            for shift in [16u32, 8, 0] {
                if produced == n {
                    break;
                }
                out.push((quantum >> shift) as u8);
                produced += 1;
            }
        }
    }
}

/// Async reader yielding the decoded bytes of a uuencoded stream. The input
/// should already be de-framed (see `TextReader`).
pub struct UuReader<R> {
    inner: R,
    dec: UuDecoder,
    out: Vec<u8>,
    pos: usize,
    done: bool,
}

impl<R: AsyncRead + Unpin> UuReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            dec: UuDecoder::new(),
            out: Vec::new(),
            pos: 0,
            done: false,
        }
    }

    /// The decoded file name; None until the `begin` line has been read.
    pub fn file(&self) -> Option<&str> {
        self.dec.file()
    }

    /// The decoded unix mode; None until the `begin` line has been read.
    pub fn mode(&self) -> Option<u32> {
        self.dec.mode()
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for UuReader<R> {
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
                this.dec.finish()?;
                this.done = true;
            } else {
                this.dec.decode(rb.filled(), &mut this.out)?;
                if this.dec.is_done() {
                    this.done = true;
                }
            }
        }
    }
}

/// Push encoder. Buffers up to one line of input; `finish` emits any partial
/// line, the zero-length line and `end`.
pub struct UuEncoder {
    header: Option<(String, u32)>,
    pending: Vec<u8>,
}

impl UuEncoder {
    pub fn new(name: &str, mode: u32) -> Self {
        Self {
            header: Some((name.to_string(), mode)),
            pending: Vec::with_capacity(LINE_BYTES),
        }
    }

    pub fn encode(&mut self, src: &[u8], out: &mut BytesMut) {
        self.write_header(out);
        for &b in src {
            self.pending.push(b);
            if self.pending.len() == LINE_BYTES {
                Self::encode_line(&self.pending, out);
                self.pending.clear();
            }
        }
    }

    pub fn finish(&mut self, out: &mut BytesMut) {
        self.write_header(out);
        if !self.pending.is_empty() {
            Self::encode_line(&self.pending, out);
            self.pending.clear();
        }
        out.extend_from_slice(b"`\nend\n");
    }

    fn write_header(&mut self, out: &mut BytesMut) {
        if let Some((name, mode)) = self.header.take() {
            out.extend_from_slice(format!("begin {:03o} {}\n", mode, name).as_bytes());
        }
    }

    fn encode_line(data: &[u8], out: &mut BytesMut) {
        out.extend_from_slice(&[enc6(data.len() as u8)]);
        for chunk in data.chunks(3) {
            let b0 = chunk[0] as u32;
            let b1 = *chunk.get(1).unwrap_or(&0) as u32;
            let b2 = *chunk.get(2).unwrap_or(&0) as u32;
            let quantum = (b0 << 16) | (b1 << 8) | b2;
            out.extend_from_slice(&[
                enc6((quantum >> 18) as u8 & 0x3f),
                enc6((quantum >> 12) as u8 & 0x3f),
                enc6((quantum >> 6) as u8 & 0x3f),
                enc6(quantum as u8 & 0x3f),
            ]);
        }
        out.extend_from_slice(b"\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    fn encode_bytes(name: &str, mode: u32, data: &[u8]) -> Vec<u8> {
        let mut enc = UuEncoder::new(name, mode);
        let mut out = BytesMut::new();
        enc.encode(data, &mut out);
        enc.finish(&mut out);
        out.to_vec()
    }

    #[test]
    fn encode_known_vector() {
        // "Cat" is the classic example: 0x43 0x61 0x74 -> "#0V%T".
        let out = encode_bytes("cat.txt", 0o644, b"Cat");
        assert_eq!(
            String::from_utf8_lossy(&out),
            "begin 644 cat.txt\n#0V%T\n`\nend\n"
        );
    }

    #[test]
    fn encode_empty() {
        let out = encode_bytes("empty", 0o600, b"");
        assert_eq!(String::from_utf8_lossy(&out), "begin 600 empty\n`\nend\n");
    }

    #[tokio::test]
    async fn decode_known_vector() {
        let mut rdr = UuReader::new(&b"begin 644 cat.txt\n#0V%T\n`\nend\n"[..]);
        let mut out = Vec::new();
        rdr.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"Cat");
        assert_eq!(rdr.file(), Some("cat.txt"));
        assert_eq!(rdr.mode(), Some(0o644));
    }

    #[tokio::test]
    async fn decode_space_and_backtick_zero() {
        // A terminator line of a single space is as valid as a backtick.
        let mut rdr = UuReader::new(&b"begin 644 x\n#0V%T\n \nend\n"[..]);
        let mut out = Vec::new();
        rdr.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"Cat");
    }

    #[tokio::test]
    async fn decode_skips_leading_garbage() {
        let wire = b"Some mail header\n\nbegin 755 run.sh\n#0V%T\n`\nend\n";
        let mut rdr = UuReader::new(&wire[..]);
        let mut out = Vec::new();
        rdr.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"Cat");
        assert_eq!(rdr.mode(), Some(0o755));
    }

    #[tokio::test]
    async fn decode_missing_end_is_error() {
        let mut rdr = UuReader::new(&b"begin 644 x\n#0V%T\n"[..]);
        let mut out = Vec::new();
        assert!(rdr.read_to_end(&mut out).await.is_err());
    }

    #[tokio::test]
    async fn round_trip_various_sizes() {
        for size in [0usize, 1, 2, 3, 44, 45, 46, 90, 1000] {
            let data: Vec<u8> = (0..size).map(|i| (i * 7 % 256) as u8).collect();
            let wire = encode_bytes("blob.bin", 0o644, &data);
            let mut rdr = UuReader::new(&wire[..]);
            let mut out = Vec::new();
            rdr.read_to_end(&mut out).await.unwrap();
            assert_eq!(out, data, "size {}", size);
        }
    }

    #[test]
    fn oversize_line_is_error() {
        let mut dec = UuDecoder::new();
        let mut out = Vec::new();
        // 'N' declares 46 bytes, beyond the 45-byte line maximum.
        let err = dec.decode(b"begin 644 x\nN0V%T\n", &mut out);
        assert!(err.is_err());
    }
}

/*
 * dirent.rs
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

//! Directory entry ("dirent") codec. A dirent is one line of a directory
//! response: item-type byte, display string, then tab-separated selector,
//! hostname, port and an optional `+` flag.

use std::fmt;

use tokio::io::AsyncRead;

use crate::itemtype::ItemType;
use crate::text::TextReader;
use crate::url::Url;

/// Parse flags for tolerating the looser corners of real-world servers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirentFlags(u32);

impl DirentFlags {
    pub const NONE: DirentFlags = DirentFlags(0);
    /// Accept dirents with no hostname/port fields at all.
    pub const HOST_OPTIONAL: DirentFlags = DirentFlags(1);
    /// Skip 16-bit validation of the port field.
    pub const NO_VALIDATE_PORT: DirentFlags = DirentFlags(2);

    pub fn contains(self, other: DirentFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for DirentFlags {
    type Output = DirentFlags;
    fn bitor(self, rhs: DirentFlags) -> DirentFlags {
        DirentFlags(self.0 | rhs.0)
    }
}

/// Dirent parse failure, carrying the 1-based line number within the
/// response.
#[derive(Debug)]
pub struct DirentError {
    pub line: usize,
    pub message: String,
}

impl DirentError {
    fn new(line: usize, msg: impl Into<String>) -> Self {
        Self { line, message: msg.into() }
    }
}

impl fmt::Display for DirentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gopher: {} at line {}", self.message, self.line)
    }
}

impl std::error::Error for DirentError {}

impl From<DirentError> for std::io::Error {
    fn from(e: DirentError) -> Self {
        std::io::Error::new(std::io::ErrorKind::InvalidData, e)
    }
}

/// A single directory entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dirent {
    pub item_type: ItemType,
    pub display: String,
    pub selector: String,
    pub hostname: String,
    pub port: String,
    pub plus: bool,

    /// The line as received, for echoing or diagnostics. Not compared.
    pub raw: String,
}

impl Dirent {
    pub fn url(&self) -> Url {
        let mut u = Url {
            scheme: "gopher".to_string(),
            ..Url::default()
        };
        self.populate_url(&mut u);
        u
    }

    pub fn populate_url(&self, u: &mut Url) {
        u.item_type = self.item_type;
        u.selector = self.selector.clone();
        u.hostname = self.hostname.clone();
        u.port = self.port.clone();
    }

    /// Return the target of a GopherII §11 "URL link" if the selector follows
    /// the convention, e.g. `URL:http://gopher.quux.org/`.
    pub fn www(&self) -> Option<&str> {
        if self.item_type != ItemType::HTML {
            return None;
        }
        let mut sel = self.selector.as_str();
        if let Some(stripped) = sel.strip_prefix('/') {
            sel = stripped;
        }
        if sel.len() >= 5 && sel[..4].eq_ignore_ascii_case("url:") {
            return Some(&sel[4..]);
        }
        None
    }

    /// Compare all wire fields, ignoring the raw echo.
    pub fn same_fields(&self, other: &Dirent) -> bool {
        self.item_type == other.item_type
            && self.display == other.display
            && self.selector == other.selector
            && self.hostname == other.hostname
            && self.port == other.port
            && self.plus == other.plus
    }

    /// Render as a wire line, without the trailing CRLF.
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.item_type.byte());
        out.extend_from_slice(self.display.as_bytes());
        out.push(b'\t');
        out.extend_from_slice(self.selector.as_bytes());
        out.push(b'\t');
        out.extend_from_slice(self.hostname.as_bytes());
        out.push(b'\t');
        out.extend_from_slice(self.port.as_bytes());
        if self.plus {
            out.extend_from_slice(b"\t+");
        }
    }
}

/// Parse one dirent line (no trailing CRLF).
///
/// Empty fields are tolerated. Whitespace in the port field is trimmed and an
/// empty port after trimming is dropped: some hosts serve files up as-is and
/// prepend `i` to every line, fouling the field layout with bad whitespace.
/// Info and error lines only need the display field; many real servers don't
/// fill out the rest.
pub fn parse_dirent(txt: &str, line: usize, flags: DirentFlags) -> Result<Dirent, DirentError> {
    if txt.is_empty() {
        return Err(DirentError::new(line, "empty dirent"));
    }

    let mut dir = Dirent {
        item_type: ItemType(txt.as_bytes()[0]),
        raw: txt.to_string(),
        ..Dirent::default()
    };

    let mut field = 0usize;
    for part in txt[1..].split('\t') {
        match field {
            0 => dir.display = part.to_string(),
            1 => dir.selector = part.to_string(),
            2 => dir.hostname = part.to_string(),
            3 => {
                let ps = part.trim();
                if !ps.is_empty() {
                    if !flags.contains(DirentFlags::NO_VALIDATE_PORT)
                        && ps.parse::<u16>().is_err()
                    {
                        return Err(DirentError::new(
                            line,
                            format!("unexpected port {:?}", ps),
                        ));
                    }
                    dir.port = ps.to_string();
                }
            }
            4 => {
                if part == "+" {
                    dir.plus = true;
                } else if !part.is_empty() {
                    return Err(DirentError::new(
                        line,
                        format!("unexpected 'plus' field; expected '+' or '', found {:?}", part),
                    ));
                }
            }
            5 => {
                return Err(DirentError::new(line, format!("extra fields: {:?}", part)));
            }
            _ => unreachable!(),
        }
        field += 1;
    }

    let mut field_limit = 4;
    if flags.contains(DirentFlags::HOST_OPTIONAL) {
        field_limit = 2;
    }
    if dir.item_type == ItemType::INFO || dir.item_type == ItemType::ERROR {
        field_limit = 1;
    }

    if field < field_limit {
        return Err(DirentError::new(line, format!("missing fields: {:?}", txt)));
    }

    Ok(dir)
}

/// Reads dirents one at a time from a dot-framed directory stream. Empty
/// lines are skipped; the terminator line ends the stream.
pub struct DirReader<R> {
    rdr: TextReader<R>,
    buf: Vec<u8>,
    line: usize,
    pub flags: DirentFlags,
}

impl<R: AsyncRead + Unpin> DirReader<R> {
    pub fn new(rdr: R) -> Self {
        Self {
            rdr: TextReader::new(rdr),
            buf: Vec::new(),
            line: 0,
            flags: DirentFlags::NONE,
        }
    }

    /// The next dirent, or None at end of stream.
    pub async fn next(&mut self) -> Result<Option<Dirent>, std::io::Error> {
        loop {
            self.buf.clear();
            if !self.rdr.read_line(&mut self.buf).await? {
                return Ok(None);
            }
            self.line += 1;
            if self.buf.is_empty() {
                continue;
            }
            let txt = String::from_utf8_lossy(&self.buf);
            return Ok(Some(parse_dirent(&txt, self.line, self.flags)?));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(item: ItemType, display: &str, selector: &str, host: &str, port: &str) -> Dirent {
        Dirent {
            item_type: item,
            display: display.to_string(),
            selector: selector.to_string(),
            hostname: host.to_string(),
            port: port.to_string(),
            ..Dirent::default()
        }
    }

    #[test]
    fn parse_cases() {
        let cases: &[(&str, Dirent, DirentFlags)] = &[
            // All fields set.
            ("0foo\tbar\tbaz\t70", d(ItemType::TEXT, "foo", "bar", "baz", "70"), DirentFlags::NONE),
            // Different item type.
            ("1a\tb\tc\t70", d(ItemType::DIR, "a", "b", "c", "70"), DirentFlags::NONE),
            // Port '0' is ok.
            ("0foo\ta\tb\t0", d(ItemType::TEXT, "foo", "a", "b", "0"), DirentFlags::NONE),
            // Empty fields are valid here; apps may choose their own
            // strictness around this.
            ("0\t\t\t0", d(ItemType::TEXT, "", "", "", "0"), DirentFlags::NONE),
            // Port optional with flag.
            ("0a\tb\tc", d(ItemType::TEXT, "a", "b", "c", ""), DirentFlags::HOST_OPTIONAL),
            // Host+port optional with flag.
            ("0a\tb", d(ItemType::TEXT, "a", "b", "", ""), DirentFlags::HOST_OPTIONAL),
            // Dodgy port is OK with the correct flag.
            ("0a\tb\tc\td", d(ItemType::TEXT, "a", "b", "c", "d"), DirentFlags::NO_VALIDATE_PORT),
            // Whitespace around the port is trimmed; blank port dropped.
            ("0a\tb\tc\t 70 ", d(ItemType::TEXT, "a", "b", "c", "70"), DirentFlags::NONE),
            ("0a\tb\tc\t  ", d(ItemType::TEXT, "a", "b", "c", ""), DirentFlags::NONE),
            // Plus flag.
            (
                "0a\tb\tc\t70\t+",
                Dirent { plus: true, ..d(ItemType::TEXT, "a", "b", "c", "70") },
                DirentFlags::NONE,
            ),
            // Info lines only need the display field.
            ("ihello there", d(ItemType::INFO, "hello there", "", "", ""), DirentFlags::NONE),
            ("3not found", d(ItemType::ERROR, "not found", "", "", ""), DirentFlags::NONE),
        ];

        for (idx, (input, expected, flags)) in cases.iter().enumerate() {
            let got = parse_dirent(input, 1, *flags).unwrap_or_else(|e| panic!("case {}: {}", idx, e));
            assert!(got.same_fields(expected), "case {}: {:?} != {:?}", idx, got, expected);
            assert_eq!(got.raw, *input, "case {}", idx);
        }
    }

    #[test]
    fn parse_errors() {
        // Extra field is a hard error.
        assert!(parse_dirent("0a\tb\tc\t70\t+\textra", 1, DirentFlags::NONE).is_err());
        // Bad plus field.
        assert!(parse_dirent("0a\tb\tc\t70\tx", 1, DirentFlags::NONE).is_err());
        // Missing fields without flags.
        assert!(parse_dirent("0a\tb", 1, DirentFlags::NONE).is_err());
        // Bad port without the flag.
        assert!(parse_dirent("0a\tb\tc\tnope", 1, DirentFlags::NONE).is_err());
        // Out of 16-bit range.
        assert!(parse_dirent("0a\tb\tc\t65536", 1, DirentFlags::NONE).is_err());
        // Empty line.
        assert!(parse_dirent("", 1, DirentFlags::NONE).is_err());
    }

    #[test]
    fn round_trip() {
        let cases = [
            d(ItemType::TEXT, "foo", "bar", "baz", "70"),
            Dirent { plus: true, ..d(ItemType::DIR, "a", "b", "c", "7070") },
            d(ItemType::INFO, "hello", "null", "invalid", "0"),
        ];
        for dirent in &cases {
            let mut out = Vec::new();
            dirent.encode(&mut out);
            let parsed = parse_dirent(std::str::from_utf8(&out).unwrap(), 1, DirentFlags::NONE)
                .unwrap();
            assert!(parsed.same_fields(dirent), "{:?} != {:?}", parsed, dirent);
        }
    }

    #[test]
    fn www_links() {
        let mut dirent = d(ItemType::HTML, "link", "URL:http://example.org/", "h", "70");
        assert_eq!(dirent.www(), Some("http://example.org/"));
        dirent.selector = "/URL:https://example.org/".to_string();
        assert_eq!(dirent.www(), Some("https://example.org/"));
        dirent.selector = "url:https://example.org/".to_string();
        assert_eq!(dirent.www(), Some("https://example.org/"));
        dirent.item_type = ItemType::TEXT;
        assert_eq!(dirent.www(), None);
        dirent.item_type = ItemType::HTML;
        dirent.selector = "plain".to_string();
        assert_eq!(dirent.www(), None);
    }

    #[tokio::test]
    async fn dir_reader() {
        let wire = b"1first\t/a\thost\t70\r\n\r\nisome info\t\tinvalid\t0\r\n.\r\n";
        let mut rdr = DirReader::new(&wire[..]);
        let first = rdr.next().await.unwrap().unwrap();
        assert_eq!(first.item_type, ItemType::DIR);
        assert_eq!(first.selector, "/a");
        let info = rdr.next().await.unwrap().unwrap();
        assert_eq!(info.item_type, ItemType::INFO);
        assert_eq!(info.display, "some info");
        assert!(rdr.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn dir_reader_error_line() {
        let wire = b"1first\t/a\thost\t70\r\nbogus line with no tabs at all that is long\r\n.\r\n";
        let mut rdr = DirReader::new(&wire[..]);
        assert!(rdr.next().await.unwrap().is_some());
        assert!(rdr.next().await.is_err());
    }
}

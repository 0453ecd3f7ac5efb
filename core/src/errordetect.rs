/*
 * errordetect.rs
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

//! Heuristic error detection. Classic Gopher has no status codes: servers
//! signal failure with a `3` dirent, an `i`-line banner, a bare text message,
//! or (GopherII) an explicit `--<status>` block. This module inspects the
//! first bytes of a response and layers those signals into a classification
//! with a confidence score. It never reads beyond the supplied buffer and
//! never blocks.

use std::sync::OnceLock;

use regex::bytes::Regex;

use crate::dirent::{parse_dirent, Dirent, DirentFlags};
use crate::error::GopherError;
use crate::status::Status;
use crate::url::Url;

/// Inspect the first read of a response (callers bound it, typically at 1024
/// bytes) and return the detected error, if any.
pub fn detect_error(data: &[u8], url: &Url) -> Option<GopherError> {
    // TODO: when the server's caps are known, some of these checks could be
    // skipped.

    const FIRST_LINE_MAX: usize = 200;

    let dlen = data.len();

    // Unless the requested item type is binary, an empty response is an
    // error:
    if dlen == 0 {
        return Some(err(url, Status::EMPTY, "", 1.0, data));
    }

    // If the first line is crazy long, we're probably on the wrong track:
    let first_nl = data.iter().position(|&b| b == b'\n');
    match first_nl {
        Some(nl) if nl > FIRST_LINE_MAX => return None,
        None if dlen > FIRST_LINE_MAX => return None,
        _ => {}
    }
    let first_nl = first_nl.unwrap_or(dlen);

    // Error responses starting with '--' probably won't happen unless we
    // issued a Gopher+/GopherII request directly:
    // https://tools.ietf.org/html/draft-matavka-gopher-ii-02#section-9
    if data.starts_with(b"--") {
        return match extract_gopher_ii_error(data) {
            Some((status, msg)) => Some(err(url, status, msg, 1.0, data)),
            None => None,
        };
    }

    // A single '3' dirent, possibly surrounded by 'i' lines:
    if (data[0] == b'i' || data[0] == b'3') && first_nl > 0 {
        if let Some((status, msg)) = extract_dirent_error(data) {
            return Some(err(url, status, msg, 0.9, data));
        }
    }

    // If the first line is an 'i' line, check a set number of 'i' lines
    // against the well-known error prefixes:
    if data[0] == b'i' && first_nl > 0 {
        return match extract_info_line_error(data) {
            Some((status, msg, confidence)) => Some(err(url, status, msg, confidence, data)),
            None => None,
        };
    }

    // Getting looser now; check if the body starts with a well-known error
    // prefix, then check the more complex patterns if we have a match:
    let check = trim_right_wsp(data);
    if let Some(n) = prefix_matcher().find(check) {
        let mut confidence = 0.4;
        if loose_pattern().is_match(&check[n..]) {
            confidence = 0.7;
        }
        let msg = String::from_utf8_lossy(&data[..first_nl]).into_owned();
        return Some(err(url, Status::GENERAL_ERROR, msg, confidence, data));
    }

    None
}

fn err(url: &Url, status: Status, msg: impl Into<String>, confidence: f64, raw: &[u8]) -> GopherError {
    let mut e = GopherError::new(url.clone(), status, msg, confidence);
    e.raw = raw.to_vec();
    e
}

/// Parse `--<digits>\r\n<message>\r\n.\r\n`.
fn extract_gopher_ii_error(data: &[u8]) -> Option<(Status, String)> {
    #[derive(PartialEq)]
    enum State {
        Hyphen1,
        Hyphen2,
        Status,
        MessageLf,
        Message,
        EndLf,
    }

    let mut state = State::Hyphen1;
    let mut status: u32 = 0;
    let mut msg_start = 0;
    let mut msg = "";

    for (idx, &c) in data.iter().enumerate() {
        match state {
            State::Hyphen1 => {
                if c != b'-' {
                    return None;
                }
                state = State::Hyphen2;
            }
            State::Hyphen2 => {
                if c != b'-' {
                    return None;
                }
                state = State::Status;
            }
            State::Status => {
                if c.is_ascii_digit() {
                    status = status * 10 + (c - b'0') as u32;
                    if status > u16::MAX as u32 {
                        return None;
                    }
                } else if c == b'\r' {
                    state = State::MessageLf;
                } else {
                    return None;
                }
            }
            State::MessageLf => {
                if c != b'\n' {
                    return None;
                }
                state = State::Message;
                msg_start = idx + 1;
            }
            State::Message => {
                if c == b'\r' {
                    state = State::EndLf;
                    msg = std::str::from_utf8(&data[msg_start..idx]).ok()?;
                } else if c == b'\n' {
                    return None;
                }
            }
            State::EndLf => {
                if c == b'\n' {
                    return Some((Status(status as u16), msg.to_string()));
                }
                return None;
            }
        }
    }

    None
}

/// Scan lines for exactly one '3' dirent; its display is the error message.
/// More than one '3' line means a real directory, not an error.
fn extract_dirent_error(data: &[u8]) -> Option<(Status, String)> {
    let mut found: Option<Dirent> = None;

    for (lnum, line) in data.split(|&b| b == b'\n').enumerate() {
        let line = trim_right_crlf(line);
        if line.first() != Some(&b'3') {
            continue;
        }
        if found.is_some() {
            return None;
        }
        let txt = String::from_utf8_lossy(line);
        match parse_dirent(&txt, lnum + 1, DirentFlags::HOST_OPTIONAL) {
            Ok(dirent) => found = Some(dirent),
            // If this is the last line we may be looking at a truncated
            // dirent; an earlier valid one still counts.
            Err(_) => break,
        }
    }

    found.map(|dirent| {
        // More string matching tricks could get a better code here; real
        // servers send things like "Malformed request" and "'/caps.txt' does
        // not exist (no handler found)".
        (Status::GENERAL_ERROR, dirent.display)
    })
}

/// Check up to two leading 'i' lines against the well-known error prefixes.
fn extract_info_line_error(data: &[u8]) -> Option<(Status, String, f64)> {
    const LIMIT: usize = 2;

    for (lnum, line) in data.split(|&b| b == b'\n').take(LIMIT).enumerate() {
        let line = trim_right_crlf(line);
        if line.first() != Some(&b'i') {
            return None;
        }
        let txt = String::from_utf8_lossy(line);
        let dirent = match parse_dirent(&txt, lnum + 1, DirentFlags::HOST_OPTIONAL) {
            Ok(d) => d,
            // Possibly a truncated trailing dirent.
            Err(_) => return None,
        };

        if prefix_matcher().find(dirent.display.as_bytes()).is_some() {
            let mut confidence = 0.5;
            if loose_pattern().is_match(dirent.display.as_bytes()) {
                confidence = 0.8;
            }
            return Some((Status::GENERAL_ERROR, dirent.display, confidence));
        }
    }

    None
}

/// Case-insensitive longest-match over a fixed prefix set, as a byte trie.
struct PrefixMatcher {
    // Arena of nodes; children index by folded byte, -1 for absent.
    children: Vec<[i16; 256]>,
    terminal: Vec<bool>,
}

impl PrefixMatcher {
    fn build(prefixes: &[&[u8]]) -> Self {
        let mut m = PrefixMatcher {
            children: vec![[-1i16; 256]],
            terminal: vec![false],
        };
        for prefix in prefixes {
            let mut cur = 0usize;
            for &b in *prefix {
                let b = b.to_ascii_lowercase() as usize;
                let next = m.children[cur][b];
                cur = if next < 0 {
                    m.children.push([-1i16; 256]);
                    m.terminal.push(false);
                    let idx = m.children.len() - 1;
                    m.children[cur][b] = idx as i16;
                    idx
                } else {
                    next as usize
                };
            }
            m.terminal[cur] = true;
        }
        m
    }

    /// Longest prefix match; returns the index of the last matched byte.
    fn find(&self, buf: &[u8]) -> Option<usize> {
        let mut cur = 0usize;
        let mut found = None;
        for (idx, &b) in buf.iter().enumerate() {
            let next = self.children[cur][b.to_ascii_lowercase() as usize];
            if next < 0 {
                break;
            }
            cur = next as usize;
            if self.terminal[cur] {
                found = Some(idx);
            }
        }
        found
    }
}

fn prefix_matcher() -> &'static PrefixMatcher {
    static MATCHER: OnceLock<PrefixMatcher> = OnceLock::new();
    MATCHER.get_or_init(|| {
        PrefixMatcher::build(&[b"an error occurred:", b"error:", b"file:"])
    })
}

fn loose_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(\bnot found\b|\bforbidden\b|resource .*? does not exist)")
            .expect("loose error pattern")
    })
}

fn trim_right_wsp(mut buf: &[u8]) -> &[u8] {
    while let Some((&last, rest)) = buf.split_last() {
        match last {
            b' ' | b'\n' | b'\r' | b'\t' => buf = rest,
            _ => break,
        }
    }
    buf
}

fn trim_right_crlf(mut buf: &[u8]) -> &[u8] {
    while let Some((&last, rest)) = buf.split_last() {
        match last {
            b'\n' | b'\r' => buf = rest,
            _ => break,
        }
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(data: &[u8]) -> Option<GopherError> {
        detect_error(data, &Url::default())
    }

    #[test]
    fn corpus_all_detected() {
        // Error shapes harvested from real-world servers.
        let cases: &[&str] = &[
            "3'/caps.txt' does not exist (no handler found)\t\terror.host\t1",
            "3 '/caps.txt' doesn't exist!\t\terror.host\t1",
            "3`caps.txt' invalid.\tError\tError\t0",
            "3'caps.txt' No such file or directory (2)",
            "3caps.txt NOT FOUND",
            "3Error accessing /caps.txt.\t\terror.host\t1",
            "3 File not found",
            "3file not found\tfake\t(NULL)\t0",
            "3Happy helping \u{2603} here: Sorry, your selector contains '..'. That's illegal here.\tErr\tlocalhost\t70",
            "3Malformed request\tfakeselector\tfakeserver\t70",
            "3not found\t(NULL)\terror.host\t0",
            "3open path/to/caps.txt: no such file or directory\t\terror.host\t1",
            "3Sorry, but the requested token 'caps.txt' could not be found.\tErr\tlocalhost\t70",
            "3Sorry! I could not find caps.txt",
            "3The provided selector is invalid.\t\texample.com\t70",
            "3\"/usr/stevie/gophercaps.txt\" not found\terror.file\terror.host\t0",
            "An error occurred: Resource not found.",
            "Error: 404 Not Found",
            "Error: File or directory not found!",
            "Error: Page not found\texample.com\t70",
            "Error: resource caps.txt does not exist on example.com",
            "File: '/caps.txt' not found.",
            "--404\r\nNot Found\r\n.\r\n",
        ];
        for (idx, case) in cases.iter().enumerate() {
            assert!(detect(case.as_bytes()).is_some(), "case {}: {:?}", idx, case);
        }
    }

    #[test]
    fn banner_then_error_line() {
        let body = concat!(
            "i   ____            _       ____      _ _\n",
            "i  |  _ \\ _   _ ___| |_ ___|  _ \\  __| | | __\n",
            "i  | | | | | | / __| __/ _ | | | |/ _` | |/ /\n",
            "i  | |_| | |_| \\__ \\ ||  __/ |_| | (_| |   < \n",
            "i  |____/ \\__,_|___/\\__\\___|____(_)__,_|_|\\_\\\n",
            "i                    - a strange place indeed\n",
            "i \n",
            "i \n",
            "3Sorry! I could not find caps.txt",
        );
        let e = detect(body.as_bytes()).unwrap();
        assert_eq!(e.status, Status::GENERAL_ERROR);
        assert_eq!(e.message, "Sorry! I could not find caps.txt");
        assert_eq!(e.confidence, 0.9);
    }

    #[test]
    fn info_lines_only() {
        // gopher://mozz.us:7005/1/error/403/menu
        let body = concat!(
            "iError: 403 Forbidden\tfake\texample.com\t0\r\n",
            "i\tfake\texample.com\t0\r\n",
            "iYou don't have the permission to access the requested resource. It is\tfake\texample.com\t0\r\n",
            "ieither read-protected or not readable by the server.\tfake\texample.com\t0\r\n",
        );
        let e = detect(body.as_bytes()).unwrap();
        assert_eq!(e.status, Status::GENERAL_ERROR);
        assert_eq!(e.confidence, 0.8);
    }

    #[test]
    fn gopher_ii_error() {
        let e = detect(b"--404\r\nNot Found\r\n.\r\n").unwrap();
        assert_eq!(e.status, Status::NOT_FOUND);
        assert_eq!(e.message, "Not Found");
        assert_eq!(e.confidence, 1.0);
    }

    #[test]
    fn gopher_ii_malformed_is_not_an_error() {
        assert!(detect(b"--xyz\r\nwat\r\n.\r\n").is_none());
        assert!(detect(b"--404 truncated").is_none());
    }

    #[test]
    fn single_error_dirent() {
        let e = detect(b"3'/caps.txt' does not exist (no handler found)\t\terror.host\t1").unwrap();
        assert_eq!(e.status, Status::GENERAL_ERROR);
        assert!(e.message.starts_with("'/caps.txt'"));
        assert_eq!(e.confidence, 0.9);
    }

    #[test]
    fn two_error_dirents_is_a_directory() {
        let body = b"3one\t\terror.host\t1\r\n3two\t\terror.host\t1\r\n";
        assert!(detect(body).is_none());
    }

    #[test]
    fn empty_response() {
        let e = detect(b"").unwrap();
        assert_eq!(e.status, Status::EMPTY);
        assert_eq!(e.confidence, 1.0);
    }

    #[test]
    fn long_first_line_is_content() {
        let mut body = vec![b'x'; 600];
        body.push(b'\n');
        assert!(detect(&body).is_none());
        assert!(detect(&vec![b'y'; 300]).is_none());
    }

    #[test]
    fn ordinary_content_is_not_an_error() {
        assert!(detect(b"Hello, world!\r\nThis is a text file.\r\n.\r\n").is_none());
        assert!(detect(b"1menu\t/\thost\t70\r\n.\r\n").is_none());
    }

    #[test]
    fn prefix_confidence_tiers() {
        // Prefix alone: 0.4.
        let e = detect(b"error: something odd happened").unwrap();
        assert_eq!(e.confidence, 0.4);
        // Prefix plus loose pattern: 0.7.
        let e = detect(b"error: 404 not found").unwrap();
        assert_eq!(e.confidence, 0.7);
    }

    #[test]
    fn confidence_monotonic_under_suffix_growth() {
        // The detector is first-prefix based: appending bytes after a
        // detected error must not lower confidence.
        let base = b"--404\r\nNot Found\r\n.\r\n".to_vec();
        let conf = detect(&base).unwrap().confidence;
        let mut grown = base.clone();
        grown.extend_from_slice(b"trailing noise the server tacked on");
        assert!(detect(&grown).unwrap().confidence >= conf);
    }

    #[test]
    fn prefix_matcher_longest_match() {
        let m = prefix_matcher();
        assert_eq!(m.find(b"error: nope"), Some(5));
        assert_eq!(m.find(b"An Error Occurred: nope"), Some(17));
        assert_eq!(m.find(b"file: gone"), Some(4));
        assert_eq!(m.find(b"err"), None);
        assert_eq!(m.find(b"nothing here"), None);
    }
}

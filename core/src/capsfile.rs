/*
 * capsfile.rs
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

//! The CAPS capability file, served at the well-known `caps.txt` selector:
//! the literal `CAPS` at byte 0, then comment (`#`), whitespace and
//! `key=value` lines. Dodgy servers also stuff `.` lines in; those are
//! tolerated unless forbidden. Keys are `[A-Za-z0-9]+` with whitespace
//! allowed around the `=`.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::time::Duration;

use crate::caps::{unix_path_config, Caps, Feature, FeatureStatus, PathConfig, ServerInfo};

/// Hard cap on accepted caps.txt size.
pub const MAX_CAPS_SIZE: usize = 1 << 17;

#[derive(Debug)]
pub struct CapsError {
    pub message: String,
    /// Set for the invalid key=value shape so callers can match it.
    pub invalid_key_value: bool,
}

impl CapsError {
    fn new(msg: impl Into<String>) -> Self {
        Self { message: msg.into(), invalid_key_value: false }
    }

    fn invalid_kv(line: usize) -> Self {
        Self {
            message: format!("caps file error at line {}: invalid key=value", line),
            invalid_key_value: true,
        }
    }
}

impl fmt::Display for CapsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gopher: {}", self.message)
    }
}

impl std::error::Error for CapsError {}

/// Parse flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseCapsFlags(u32);

impl ParseCapsFlags {
    pub const NONE: ParseCapsFlags = ParseCapsFlags(0);
    /// Reject the stray `.` lines that dodgy servers stuff into caps files.
    pub const FORBID_DOT: ParseCapsFlags = ParseCapsFlags(1);

    fn contains(self, other: ParseCapsFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

/// One parsed caps.txt line run, preserved in order with raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapEntry {
    KeyValue { key: String, value: String, raw: Vec<u8> },
    Comment(Vec<u8>),
    Whitespace(Vec<u8>),
    Dot(Vec<u8>),
}

/// A parsed caps file, implementing `Caps`.
#[derive(Debug, Default)]
pub struct CapsFile {
    pub name: String,
    pub entries: Vec<CapEntry>,
    key_index: HashMap<String, (String, String)>,
    version: i32,
    expires_after: Option<Duration>,
}

impl CapsFile {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: Vec::with_capacity(32),
            ..CapsFile::default()
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.key_index
            .get(&key.to_ascii_lowercase())
            .map(|(_, v)| v.as_str())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        parse_bool(self.get(key)?)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key)?.parse().ok()
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

impl Caps for CapsFile {
    fn version(&self) -> i32 {
        self.version
    }

    fn expires_after(&self) -> Option<Duration> {
        self.expires_after
    }

    fn supports(&self, feature: Feature) -> FeatureStatus {
        let key = match feature {
            Feature::IIbis => "GopherIIbis",
            Feature::II => "GopherII",
            Feature::PlusAsk => "GopherPlusAsk",
        };
        match self.get_bool(key) {
            Some(v) => v.into(),
            None => FeatureStatus::Unknown,
        }
    }

    fn path_config(&self) -> Result<PathConfig, io::Error> {
        let mut pc = unix_path_config();
        let mut errs: Vec<String> = Vec::new();

        // The caps key is 'PathDelimeter', a real-world common-use
        // misspelling a-la 'HTTP Referer':
        if let Some(d) = self.get("PathDelimeter") {
            pc.delimiter = d.to_string();
        }
        if let Some(d) = self.get("PathIdentity") {
            pc.identity = d.to_string();
        }
        if let Some(d) = self.get("PathParent") {
            pc.parent = d.to_string();
        }

        if let Some(v) = self.get("PathParentDouble") {
            match parse_bool(v) {
                Some(b) => pc.parent_double = b,
                None => errs.push(format!("PathParentDouble value invalid: {:?}", v)),
            }
        }

        if let Some(d) = self.get("PathEscapeCharacter") {
            if d.len() != 1 {
                errs.push(format!("PathEscapeCharacter {:?} invalid, must be 1 character", d));
            } else {
                pc.escape_character = d.as_bytes()[0];
            }
        }

        if let Some(v) = self.get("PathKeepPreDelimiter") {
            match parse_bool(v) {
                Some(b) => pc.keep_pre_delimiter = b,
                None => errs.push(format!("PathKeepPreDelimiter value invalid: {:?}", v)),
            }
        }

        if !errs.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("gopher: caps path config invalid: {}", errs.join(", ")),
            ));
        }

        Ok(pc)
    }

    fn server_info(&self) -> Option<ServerInfo> {
        Some(ServerInfo {
            software: self.get("ServerSoftware").unwrap_or("").to_string(),
            version: self.get("ServerVersion").unwrap_or("").to_string(),
            architecture: self.get("ServerArchitecture").unwrap_or("").to_string(),
            description: self.get("ServerDescription").unwrap_or("").to_string(),
            geolocation: self.get("ServerGeolocationString").unwrap_or("").to_string(),
            admin_email: self.get("ServerAdmin").unwrap_or("").to_string(),
        })
    }

    fn software(&self) -> (String, String) {
        (
            self.get("ServerSoftware").unwrap_or("").to_string(),
            self.get("ServerVersion").unwrap_or("").to_string(),
        )
    }

    fn tls_port(&self) -> Option<u16> {
        self.get_i64("TLSPort").and_then(|v| u16::try_from(v).ok())
    }

    fn default_encoding(&self) -> String {
        self.get("DefaultEncoding").unwrap_or("").to_string()
    }
}

/// Parse a caps file. `name` is only used for labelling.
pub fn parse_caps(name: &str, data: &[u8], flags: ParseCapsFlags) -> Result<CapsFile, CapsError> {
    const MAGIC: &[u8] = b"CAPS";

    if data.len() > MAX_CAPS_SIZE {
        return Err(CapsError::new("caps too large"));
    }
    if !data.starts_with(MAGIC) {
        return Err(CapsError::new("missing caps magic"));
    }

    #[derive(Clone, Copy, PartialEq)]
    enum LineType {
        None,
        Comment,
        Kv,
        Wsp,
        Dot,
    }

    let mut file = CapsFile::new(name);
    let sz = data.len();
    let mut pos = MAGIC.len();
    let mut run_start = pos;
    let mut last = LineType::None;
    let mut lnum = 1usize;

    // Runs of comment/whitespace/dot lines are kept as single entries, so
    // the original byte layout can be reproduced.
    let flush_run = |file: &mut CapsFile, last: LineType, start: usize, end: usize| {
        let raw = data[start..end].to_vec();
        match last {
            LineType::Dot => file.entries.push(CapEntry::Dot(raw)),
            LineType::Wsp => file.entries.push(CapEntry::Whitespace(raw)),
            LineType::Comment => file.entries.push(CapEntry::Comment(raw)),
            _ => {}
        }
    };

    while pos <= sz {
        if pos == sz {
            flush_run(&mut file, last, run_start, pos);
            break;
        }

        let nl = data[pos..].iter().position(|&b| b == b'\n');
        let (line, advance) = match nl {
            Some(nl) => (drop_cr(&data[pos..pos + nl]), nl + 1),
            None => (drop_cr(&data[pos..]), sz - pos),
        };

        let linetyp = if line.is_empty() || line[0] == b' ' || line[0] == b'\t' {
            LineType::Wsp
        } else if line[0] == b'.' {
            LineType::Dot
        } else if line[0] == b'#' {
            LineType::Comment
        } else {
            LineType::Kv
        };

        if last != LineType::None && last != linetyp {
            flush_run(&mut file, last, run_start, pos);
            run_start = pos;
        }

        match linetyp {
            LineType::Kv => {
                let (k, v) = parse_kv(line).ok_or_else(|| CapsError::invalid_kv(lnum))?;

                match k.as_str() {
                    "CapsFileVersion" => {
                        file.version = v
                            .parse()
                            .map_err(|_| CapsError::new(format!(
                                "caps file error at line {}: bad CapsFileVersion {:?}",
                                lnum, v
                            )))?;
                    }
                    "ExpireCapsAfter" => {
                        // 32-bit to prevent overflow when converted to a
                        // duration.
                        let secs: i32 = v.parse().map_err(|_| {
                            CapsError::new(format!(
                                "caps file error at line {}: bad ExpireCapsAfter {:?}",
                                lnum, v
                            ))
                        })?;
                        if secs >= 0 {
                            file.expires_after = Some(Duration::from_secs(secs as u64));
                        }
                    }
                    _ => {}
                }

                let raw = data[pos..pos + advance].to_vec();
                file.key_index
                    .insert(k.to_ascii_lowercase(), (k.clone(), v.clone()));
                file.entries.push(CapEntry::KeyValue { key: k, value: v, raw });
                run_start = pos + advance;
                last = LineType::None;
            }
            LineType::Dot => {
                if line.len() != 1 || flags.contains(ParseCapsFlags::FORBID_DOT) {
                    return Err(CapsError::new(format!(
                        "caps file error at line {}: invalid key",
                        lnum
                    )));
                }
                last = linetyp;
            }
            _ => {
                last = linetyp;
            }
        }

        pos += advance;
        lnum += 1;
    }

    Ok(file)
}

fn parse_kv(line: &[u8]) -> Option<(String, String)> {
    let eq = line.iter().position(|&b| b == b'=')?;

    // GopherII spec: "Any amount of whitespace (spaces and tabs) around the
    // equals sign is acceptable."
    let k = trim_ascii(&line[..eq]);
    if k.is_empty() || !k.iter().all(|b| b.is_ascii_alphanumeric()) {
        return None;
    }
    let v = trim_left_ascii(&line[eq + 1..]);

    Some((
        String::from_utf8_lossy(k).into_owned(),
        String::from_utf8_lossy(v).into_owned(),
    ))
}

fn trim_ascii(mut b: &[u8]) -> &[u8] {
    while let Some((&last, rest)) = b.split_last() {
        if last == b' ' || last == b'\t' {
            b = rest;
        } else {
            break;
        }
    }
    b
}

fn trim_left_ascii(mut b: &[u8]) -> &[u8] {
    while let Some((&first, rest)) = b.split_first() {
        if first == b' ' || first == b'\t' {
            b = rest;
        } else {
            break;
        }
    }
    b
}

fn drop_cr(b: &[u8]) -> &[u8] {
    match b.split_last() {
        Some((&b'\r', rest)) => rest,
        _ => b,
    }
}

/// Render a caps file for serving, from server identification and optional
/// TLS port.
pub fn render_caps(info: &ServerInfo, tls_port: Option<u16>) -> String {
    let mut out = String::from("CAPS\n\nCapsFileVersion=1\nExpireCapsAfter=3600\n\n");
    out.push_str("PathDelimeter=/\nPathIdentity=.\nPathParent=..\nPathParentDouble=FALSE\n");
    out.push_str("PathEscapeCharacter=\\\nPathKeepPreDelimiter=FALSE\n\n");
    out.push_str("GopherII=TRUE\nGopherIIbis=TRUE\nGopherPlusAsk=FALSE\n");
    if let Some(port) = tls_port {
        out.push_str(&format!("TLSPort={}\n", port));
    }
    out.push('\n');
    let mut kv = |k: &str, v: &str| {
        if !v.is_empty() {
            out.push_str(&format!("{}={}\n", k, v));
        }
    };
    kv("ServerSoftware", &info.software);
    kv("ServerVersion", &info.version);
    kv("ServerArchitecture", &info.architecture);
    kv("ServerDescription", &info.description);
    kv("ServerGeolocationString", &info.geolocation);
    kv("ServerAdmin", &info.admin_email);
    out.push_str("DefaultEncoding=UTF-8\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_magic_fails() {
        assert!(parse_caps("file", b"NOPE\nfoo=bar\n", ParseCapsFlags::NONE).is_err());
        assert!(parse_caps("file", b"", ParseCapsFlags::NONE).is_err());
    }

    #[test]
    fn separate_comment_runs() {
        let cf = parse_caps("file", b"CAPS\n# foo\n\n# bar\n", ParseCapsFlags::NONE).unwrap();
        let kinds: Vec<_> = cf
            .entries
            .iter()
            .map(|e| match e {
                CapEntry::Comment(_) => "comment",
                CapEntry::Whitespace(_) => "wsp",
                CapEntry::KeyValue { .. } => "kv",
                CapEntry::Dot(_) => "dot",
            })
            .collect();
        assert_eq!(kinds, ["wsp", "comment", "wsp", "comment"]);
    }

    #[test]
    fn invalid_kv_cases() {
        for input in ["foo", "$foo", "$foo yep", "=", "=1", "$=", "$=1"] {
            let data = format!("CAPS\n{}", input);
            let err = parse_caps("file", data.as_bytes(), ParseCapsFlags::NONE).unwrap_err();
            assert!(err.invalid_key_value, "input {:?}: {}", input, err);
        }
    }

    #[test]
    fn keys_and_specials() {
        let data = b"CAPS\nCapsFileVersion=1\nExpireCapsAfter = 3600\nServerSoftware=burrow\nTLSPort=7443\nGopherII=TRUE\n";
        let cf = parse_caps("file", data, ParseCapsFlags::NONE).unwrap();
        assert_eq!(cf.version(), 1);
        assert_eq!(cf.expires_after(), Some(Duration::from_secs(3600)));
        assert_eq!(cf.get("serversoftware"), Some("burrow"));
        assert_eq!(cf.tls_port(), Some(7443));
        assert_eq!(cf.supports(Feature::II), FeatureStatus::Supported);
        assert_eq!(cf.supports(Feature::IIbis), FeatureStatus::Unknown);
        assert_eq!(cf.software().0, "burrow");
    }

    #[test]
    fn stray_dot_lines() {
        let data = b"CAPS\n.\nfoo=bar\n";
        assert!(parse_caps("file", data, ParseCapsFlags::NONE).is_ok());
        assert!(parse_caps("file", data, ParseCapsFlags::FORBID_DOT).is_err());
        // A dot line with trailing junk is never ok.
        assert!(parse_caps("file", b"CAPS\n.junk\n", ParseCapsFlags::NONE).is_err());
    }

    #[test]
    fn path_config() {
        let data = b"CAPS\nPathDelimeter=\\\nPathParent=::\nPathParentDouble=TRUE\nPathKeepPreDelimiter=TRUE\nPathEscapeCharacter=^\n";
        let cf = parse_caps("file", data, ParseCapsFlags::NONE).unwrap();
        let pc = cf.path_config().unwrap();
        assert_eq!(pc.delimiter, "\\");
        assert_eq!(pc.parent, "::");
        assert!(pc.parent_double);
        assert!(pc.keep_pre_delimiter);
        assert_eq!(pc.escape_character, b'^');
    }

    #[test]
    fn path_config_invalid_values() {
        let data = b"CAPS\nPathParentDouble=whatever\n";
        let cf = parse_caps("file", data, ParseCapsFlags::NONE).unwrap();
        assert!(cf.path_config().is_err());
        let data = b"CAPS\nPathEscapeCharacter=toolong\n";
        let cf = parse_caps("file", data, ParseCapsFlags::NONE).unwrap();
        assert!(cf.path_config().is_err());
    }

    #[test]
    fn oversize_fails() {
        let mut data = b"CAPS\n".to_vec();
        data.resize(MAX_CAPS_SIZE + 1, b'#');
        assert!(parse_caps("file", &data, ParseCapsFlags::NONE).is_err());
    }

    #[test]
    fn rendered_caps_parse_back() {
        let info = ServerInfo {
            software: "burrow".to_string(),
            version: "0.1.0".to_string(),
            admin_email: "admin@example.org".to_string(),
            ..ServerInfo::default()
        };
        let text = render_caps(&info, Some(70));
        let cf = parse_caps("generated", text.as_bytes(), ParseCapsFlags::FORBID_DOT).unwrap();
        assert_eq!(cf.version(), 1);
        assert_eq!(cf.get("ServerAdmin"), Some("admin@example.org"));
        assert_eq!(cf.tls_port(), Some(70));
        assert_eq!(cf.supports(Feature::IIbis), FeatureStatus::Supported);
        assert_eq!(cf.supports(Feature::PlusAsk), FeatureStatus::Unsupported);
        let pc = cf.path_config().unwrap();
        assert_eq!(pc.delimiter, "/");
        assert!(!pc.keep_pre_delimiter);
    }
}

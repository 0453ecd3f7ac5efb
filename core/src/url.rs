/*
 * url.rs
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

//! Gopher URL scheme (RFC 4266, minus the largely unused Gopher+ parts).
//! The parser is hand-rolled: scheme-less input is read as gopher://, the
//! path carries the item type in its first byte, and tabs split selector
//! from search. Ports are kept as strings because Gopher URLs may carry
//! named services (RFC 6335 §5.1).

use std::fmt;
use std::str::FromStr;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use crate::itemtype::ItemType;
use crate::meta::{record_search, MetaType};

/// Escape set for selectors and search strings when formatting a URL.
/// `/` is deliberately not escaped: Gopher selectors commonly contain
/// path-like slashes, and escaping them makes URLs unreadable.
const SELECTOR: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'\\');

/// URL parse failure.
#[derive(Debug)]
pub struct UrlError {
    pub message: String,
}

impl UrlError {
    fn new(msg: impl Into<String>) -> Self {
        Self { message: msg.into() }
    }
}

impl fmt::Display for UrlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for UrlError {}

/// A parsed Gopher URL.
///
/// For server requests the item type is always `ItemType::TEXT`: there is no
/// way to tell the item type from what the client sends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Url {
    pub scheme: String,
    pub hostname: String,
    pub port: String,
    pub root: bool,
    pub item_type: ItemType,
    pub selector: String,
    pub search: String,
}

impl Url {
    pub fn is_empty(&self) -> bool {
        *self == Url::default()
    }

    /// Whether the URL is absolute, i.e. has a non-empty scheme.
    pub fn is_abs(&self) -> bool {
        !self.scheme.is_empty()
    }

    pub fn is_secure(&self) -> bool {
        self.scheme == "gophers"
    }

    /// Return a copy with the search portion set to a request for this item's
    /// metadata. Record names filter the response; each is prefixed with `+`
    /// if it isn't already.
    pub fn as_meta_item<S: AsRef<str>>(&self, records: &[S]) -> Url {
        let mut u = self.clone();
        u.search = record_search(MetaType::Item, records);
        u
    }

    /// Return a copy with the search portion set to a request for an entire
    /// directory's metadata. The INFO record separates one item's metadata
    /// from the next in the response.
    pub fn as_meta_dir<S: AsRef<str>>(&self, records: &[S]) -> Url {
        let mut u = self.clone();
        u.search = record_search(MetaType::Dir, records);
        u
    }

    /// A GopherIIbis client requests metadata by sending
    /// `<selector>^I![CR][LF]` (single item) or `<selector>^I&[CR][LF]`
    /// (entire directory).
    pub fn is_meta(&self) -> bool {
        matches!(self.search.as_bytes().first(), Some(b'!') | Some(b'&'))
    }

    pub fn meta_type(&self) -> MetaType {
        match self.search.as_bytes().first() {
            Some(b'!') => MetaType::Item,
            Some(b'&') => MetaType::Dir,
            _ => MetaType::None,
        }
    }

    /// Best-effort guess whether a client can fetch this URL at all.
    pub fn can_fetch(&self) -> bool {
        self.item_type.can_fetch() && !is_well_known_dummy_hostname(&self.hostname)
    }

    /// `host:port` for dialing. A missing port defaults to 70.
    pub fn host(&self) -> String {
        let port = if self.port.is_empty() { "70" } else { &self.port };
        if self.hostname.contains(':') {
            format!("[{}]:{}", self.hostname, port)
        } else {
            format!("{}:{}", self.hostname, port)
        }
    }

    /// The port as a number. Resolves the named services a Gopher URL is
    /// allowed to carry.
    pub fn port_u16(&self) -> Option<u16> {
        lookup_port(if self.port.is_empty() { "70" } else { &self.port })
    }

    pub fn parse(s: &str) -> Result<Url, UrlError> {
        parse_url(s)
    }
}

/// Resolve a port string to a number. Only the service names that show up in
/// Gopher URLs are known; everything else must be numeric.
pub(crate) fn lookup_port(port: &str) -> Option<u16> {
    match port {
        "gopher" => Some(70),
        _ => port.parse().ok(),
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.scheme.is_empty() {
            write!(f, "{}://", self.scheme)?;
        } else if !self.hostname.is_empty() {
            f.write_str("gopher://")?;
        }

        if self.hostname.contains(':') {
            write!(f, "[{}]", self.hostname)?;
        } else {
            f.write_str(&self.hostname)?;
        }

        if !self.port.is_empty() && self.port != "70" {
            write!(f, ":{}", self.port)?;
        }

        if !self.root {
            f.write_str("/")?;
            if self.item_type == ItemType::NONE {
                // 'text' is the most common fallback item type.
                write!(f, "{}", ItemType::TEXT.byte() as char)?;
            } else {
                write!(f, "{}", self.item_type.byte() as char)?;
            }
            write!(f, "{}", utf8_percent_encode(&self.selector, SELECTOR))?;

            if !self.search.is_empty() {
                write!(f, "%09{}", utf8_percent_encode(&self.search, SELECTOR))?;
            }
        }
        Ok(())
    }
}

impl FromStr for Url {
    type Err = UrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_url(s)
    }
}

/// Compare the hostname against a set of well-known dummy values. Gopher
/// servers use a hotch-potch of values for dummy hostnames.
///
/// Dear Gopher server authors: please use 'invalid' (or, somewhat less
/// ideally, 'example') as per RFC 2606.
pub fn is_well_known_dummy_hostname(s: &str) -> bool {
    let s = s.trim();

    // Strings seen in real-world gopher servers that indicate a dummy host:
    s == "error.host"
        || s == "error"
        || s == "fake"
        || s == "fakeserver"
        || s == "none"
        || s == "invalid" // RFC 2606
        || s == "example"
        || s == "."
        || s == "(null)"
        || s == "(false)"
        || s.ends_with(".invalid")
        || s.ends_with(".example")
}

fn parse_url(s: &str) -> Result<Url, UrlError> {
    if s.contains('#') {
        return Err(UrlError::new(format!("gopher: invalid URL {:?}: fragment", s)));
    }

    let (scheme, rest) = match s.find("://") {
        Some(at) => {
            let scheme = &s[..at];
            match scheme {
                "gopher" | "gophers" => (scheme, &s[at + 3..]),
                _ => return Err(UrlError::new(format!("gopher: invalid URL {:?}", s))),
            }
        }
        // No recognised scheme prefix: proceed as if gopher:// were prepended.
        None => ("", s),
    };

    let (authority, path) = match rest.find('/') {
        Some(at) => (&rest[..at], &rest[at..]),
        None => (rest, ""),
    };

    if authority.contains('@') {
        return Err(UrlError::new(format!("gopher: invalid URL {:?}: userinfo", s)));
    }

    let (hostname, port) = split_host_port(authority)
        .ok_or_else(|| UrlError::new(format!("gopher: invalid URL {:?}: bad authority", s)))?;

    let mut u = Url {
        scheme: scheme.to_string(),
        hostname,
        port: if port.is_empty() { "70".to_string() } else { port },
        ..Url::default()
    };

    // The query is re-appended with its '?' before tab-splitting. This is a
    // deliberate tolerance for servers that encode search as '?query'; the
    // '?' and everything after it become part of the selector unless a tab
    // separates them. A bare trailing '?' is preserved the same way.
    let (path, query) = match path.find('?') {
        Some(at) => (&path[..at], Some(&path[at + 1..])),
        None => (path, None),
    };

    let mut p = percent_decode_str(path)
        .decode_utf8()
        .map_err(|_| UrlError::new(format!("gopher: invalid URL {:?}: bad escape", s)))?
        .into_owned();
    if let Some(q) = query {
        p.push('?');
        p.push_str(q);
    }

    let mut p = p.as_str();
    if let Some(stripped) = p.strip_prefix('/') {
        p = stripped;
    }

    if p.is_empty() {
        u.root = true;
    } else {
        u.item_type = ItemType(p.as_bytes()[0]);
        let p = &p[1..];
        match p.find('\t') {
            Some(at) => {
                u.selector = p[..at].to_string();
                u.search = p[at + 1..].to_string();
                // Anything after a second tab is dropped, as in the wire
                // format where a third field is the IIbis format/flag.
                if let Some(at2) = u.search.find('\t') {
                    u.search.truncate(at2);
                }
            }
            None => u.selector = p.to_string(),
        }
    }

    Ok(u)
}

/// Split `host[:port]`, handling IPv6 bracket notation. Returns None on
/// unbalanced brackets or garbage after the closing bracket.
pub(crate) fn split_host_port(authority: &str) -> Option<(String, String)> {
    if authority.is_empty() {
        return Some((String::new(), String::new()));
    }
    if let Some(rest) = authority.strip_prefix('[') {
        let close = rest.find(']')?;
        let host = &rest[..close];
        let after = &rest[close + 1..];
        if after.is_empty() {
            return Some((host.to_string(), String::new()));
        }
        let port = after.strip_prefix(':')?;
        if !valid_port(port) {
            return None;
        }
        return Some((host.to_string(), port.to_string()));
    }
    match authority.rfind(':') {
        Some(at) => {
            let (host, port) = (&authority[..at], &authority[at + 1..]);
            if host.contains(':') || !valid_port(port) {
                // More than one colon without brackets is not a valid
                // authority for gopher URLs.
                return None;
            }
            Some((host.to_string(), port.to_string()))
        }
        None => Some((authority.to_string(), String::new())),
    }
}

/// RFC 6335 §5.1: a port is digits or a service name of letters, digits
/// and hyphens.
fn valid_port(port: &str) -> bool {
    !port.is_empty() && port.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

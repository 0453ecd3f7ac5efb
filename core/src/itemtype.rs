/*
 * itemtype.rs
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

//! Gopher item types: the single byte that leads every dirent and tells the
//! client what kind of resource a selector points at. Covers RFC 1436 plus
//! the GopherII additions.

use std::fmt;

/// A Gopher item type byte. Unknown bytes are preserved as-is; servers in the
/// wild use plenty of types that never made it into any spec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ItemType(pub u8);

impl ItemType {
    /// NUL is reserved to mean 'no item type'. A selector could in principle
    /// start with NUL, but no server or client written in C would survive it.
    pub const NONE: ItemType = ItemType(0);

    pub const TEXT: ItemType = ItemType(b'0');
    pub const DIR: ItemType = ItemType(b'1');
    /// CCSO nameserver.
    pub const CSO_SERVER: ItemType = ItemType(b'2');
    pub const ERROR: ItemType = ItemType(b'3');
    /// Ancient pre OS X Mac format.
    pub const BINHEX: ItemType = ItemType(b'4');
    /// zip, rar, 7-Zip, gzip, tar. Client must read until the TCP connection
    /// closes. Beware.
    pub const BINARY_ARCHIVE: ItemType = ItemType(b'5');
    pub const UUENCODED: ItemType = ItemType(b'6');
    pub const SEARCH: ItemType = ItemType(b'7');
    /// Connect to given host at given port; the login name is in the selector.
    pub const TELNET: ItemType = ItemType(b'8');
    /// Client must read until the TCP connection closes. Beware.
    pub const BINARY: ItemType = ItemType(b'9');

    /// The entry duplicates the previous non-plus entry on another server.
    pub const DUPLICATE: ItemType = ItemType(b'+');

    pub const GIF: ItemType = ItemType(b'g');
    /// Some kind of image file. Client gets to decide.
    pub const IMAGE: ItemType = ItemType(b'I');
    /// tn3270 telnet session.
    pub const TN3270: ItemType = ItemType(b'T');
    /// Not standard, but well-known enough to sit beside the Telnet ones.
    pub const SSH: ItemType = ItemType(b'S');

    // GopherII:
    pub const CALENDAR: ItemType = ItemType(b'c');
    pub const DOC: ItemType = ItemType(b'd');
    pub const HTML: ItemType = ItemType(b'h');
    pub const INFO: ItemType = ItemType(b'i');
    /// TeX, LaTeX, PostScript, Rich Text Format.
    pub const PAGE: ItemType = ItemType(b'p');
    pub const MBOX: ItemType = ItemType(b'm');
    pub const SOUND: ItemType = ItemType(b's');
    pub const XML: ItemType = ItemType(b'x');
    pub const VIDEO: ItemType = ItemType(b';');

    /// Lead byte of a GopherIIbis error record.
    pub const META_ERROR: ItemType = ItemType(b'-');

    pub const fn byte(self) -> u8 {
        self.0
    }

    /// Whether a client can retrieve this item over a plain Gopher
    /// transaction. Telnet-era types and duplicate markers cannot be fetched.
    pub fn can_fetch(self) -> bool {
        self != Self::DUPLICATE
            && self != Self::TELNET
            && self != Self::TN3270
            && self != Self::CSO_SERVER
    }

    pub fn is_search(self) -> bool {
        self == Self::SEARCH
    }

    /// Whether the response body for this type is an opaque byte stream
    /// (read until close) rather than dot-framed text.
    pub fn is_binary(self) -> bool {
        matches!(
            self,
            Self::BINARY_ARCHIVE
                | Self::BINARY
                | Self::GIF
                | Self::IMAGE
                | Self::CALENDAR
                | Self::DOC
                | Self::MBOX
                | Self::SOUND
                | Self::VIDEO
        )
    }
}

impl From<u8> for ItemType {
    fn from(b: u8) -> Self {
        ItemType(b)
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_ascii_graphic() {
            write!(f, "'{}'", self.0 as char)
        } else {
            write!(f, "'\\x{:02x}'", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_set() {
        assert!(ItemType::BINARY.is_binary());
        assert!(ItemType::BINARY_ARCHIVE.is_binary());
        assert!(ItemType::IMAGE.is_binary());
        assert!(ItemType::GIF.is_binary());
        assert!(!ItemType::TEXT.is_binary());
        assert!(!ItemType::DIR.is_binary());
        assert!(!ItemType::UUENCODED.is_binary());
        assert!(!ItemType::HTML.is_binary());
    }

    #[test]
    fn fetchable() {
        assert!(ItemType::TEXT.can_fetch());
        assert!(ItemType::SEARCH.can_fetch());
        assert!(!ItemType::TELNET.can_fetch());
        assert!(!ItemType::TN3270.can_fetch());
        assert!(!ItemType::CSO_SERVER.can_fetch());
        assert!(!ItemType::DUPLICATE.can_fetch());
    }

    #[test]
    fn display() {
        assert_eq!(ItemType::TEXT.to_string(), "'0'");
        assert_eq!(ItemType::NONE.to_string(), "'\\x00'");
    }
}

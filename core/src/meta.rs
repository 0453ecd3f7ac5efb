/*
 * meta.rs
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

//! GopherIIbis metadata request types. A meta request is marked by the first
//! byte of the search string: `!` asks for a single item's metadata, `&` for
//! an entire directory's.

/// The kind of metadata a request is asking for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MetaType {
    #[default]
    None,
    Item,
    Dir,
}

impl MetaType {
    pub fn lead_byte(self) -> Option<u8> {
        match self {
            MetaType::None => None,
            MetaType::Item => Some(b'!'),
            MetaType::Dir => Some(b'&'),
        }
    }
}

/// Build the search string for a metadata request: the meta lead byte
/// followed by `+RECORD` filter tokens. Records already carrying a leading
/// `+` are passed through; empty records are skipped.
pub(crate) fn record_search<S: AsRef<str>>(meta: MetaType, records: &[S]) -> String {
    let mut out = String::new();
    if let Some(b) = meta.lead_byte() {
        out.push(b as char);
    }
    for rec in records {
        let rec = rec.as_ref();
        if rec.is_empty() {
            continue;
        }
        if !rec.starts_with('+') {
            out.push('+');
        }
        out.push_str(rec);
    }
    out
}

/// Whether the record filter in a meta request's search string includes the
/// named record. An empty filter (bare `!` or `&`) includes everything.
pub(crate) fn meta_includes_record(search: &str, record: &str) -> bool {
    let bytes = search.as_bytes();
    match bytes.first() {
        Some(b'!') | Some(b'&') => {}
        _ => return false,
    }
    if bytes.len() == 1 {
        return true;
    }
    search[1..]
        .split('+')
        .any(|tok| !tok.is_empty() && tok == record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_search_prefixes() {
        assert_eq!(record_search::<&str>(MetaType::Item, &[]), "!");
        assert_eq!(record_search(MetaType::Dir, &["FOO"]), "&+FOO");
        assert_eq!(record_search(MetaType::Item, &["+FOO", "", "BAR"]), "!+FOO+BAR");
    }

    #[test]
    fn includes_record() {
        assert!(meta_includes_record("!", "ANY"));
        assert!(meta_includes_record("&", "ANY"));
        assert!(meta_includes_record("!+FOO", "FOO"));
        assert!(meta_includes_record("!+FOO+BAR", "BAR"));
        assert!(!meta_includes_record("!+FOO", "FO"));
        assert!(!meta_includes_record("!+FOO", "FOOX"));
        assert!(!meta_includes_record("!+FOOX", "FOO"));
        assert!(!meta_includes_record("plain", "FOO"));
        assert!(!meta_includes_record("", "FOO"));
    }
}

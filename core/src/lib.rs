/*
 * lib.rs
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

//! Burrow: a Gopher protocol client/server library.
//!
//! Covers classic Gopher (RFC 1436), the GopherII/GopherIIbis extensions
//! (structured errors, metadata, format negotiation) and opportunistic TLS
//! on the standard port. The noisy parts of the real-world protocol are the
//! point: the dirent and dot-framing codecs tolerate what servers actually
//! send, and the error detector classifies responses that carry no status
//! code at all, with a confidence score the caller can act on.
//!
//! Client side: build a [`Request`] from a [`Url`], fetch it with a
//! [`Client`], read the typed [`Response`]. Server side: register handlers
//! on a [`Mux`], run a [`Server`]; handlers answer with [`DirWriter`],
//! [`TextWriter`] or [`MetaWriter`].

pub mod caps;
pub mod capsfile;
pub mod client;
pub mod dirent;
pub mod error;
pub mod errordetect;
pub mod handler;
pub mod io;
pub mod itemtype;
pub mod meta;
pub mod metawriter;
pub mod mux;
pub mod net;
pub mod recorder;
pub mod request;
pub mod response;
pub mod responsewriter;
pub mod server;
pub mod status;
pub mod text;
pub mod url;
pub mod uuencode;

pub use caps::{Caps, CapsSource, CapsUpdater, Feature, FeatureStatus, PathConfig, ServerInfo};
pub use capsfile::{parse_caps, CapsFile, ParseCapsFlags};
pub use client::Client;
pub use dirent::{parse_dirent, DirReader, Dirent, DirentFlags};
pub use error::{ClientError, GopherError};
pub use errordetect::detect_error;
pub use handler::{Handler, MetaHandler, ResponseWriter};
pub use itemtype::ItemType;
pub use meta::MetaType;
pub use metawriter::{write_meta, MetaEntry, MetaRecord, MetaWriter};
pub use mux::Mux;
pub use net::TlsMode;
pub use recorder::{Recorder, Recording};
pub use request::{Params, Request};
pub use response::{
    BinaryResponse, DirResponse, Response, ResponseClass, ResponseInfo, TextResponse,
    UuEncodedResponse,
};
pub use responsewriter::{not_found, DirWriter};
pub use server::{listen_and_serve, Server};
pub use status::Status;
pub use text::{TextReader, TextWriter};
pub use url::Url;
pub use uuencode::{UuDecoder, UuEncoder, UuReader};

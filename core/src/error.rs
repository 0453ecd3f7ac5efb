/*
 * error.rs
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

//! Error values: the detected-response error surfaced by the client, and the
//! client pipeline's own failure taxonomy.

use std::fmt;
use std::io;

use crate::status::Status;
use crate::url::{Url, UrlError};

/// An error response identified on the wire, either explicit (GopherIIbis
/// `--<status>`) or inferred by the heuristic detector.
///
/// `confidence` says how sure the detector was, in [0, 1]; 1.0 means the
/// error was explicit on the wire. Callers deciding whether to surface the
/// error or to pass the raw bytes through should read it rather than merging
/// it away.
#[derive(Debug, Clone)]
pub struct GopherError {
    pub status: Status,
    pub url: Url,
    pub message: String,
    pub confidence: f64,
    /// Raw bytes captured during detection.
    pub raw: Vec<u8>,
}

impl GopherError {
    pub fn new(url: Url, status: Status, msg: impl Into<String>, confidence: f64) -> Self {
        Self {
            url,
            status,
            message: msg.into(),
            confidence: confidence.clamp(0.0, 1.0),
            raw: Vec::new(),
        }
    }

    /// Matches on status code equality.
    pub fn is(&self, status: Status) -> bool {
        self.status == status
    }
}

impl PartialEq<Status> for GopherError {
    fn eq(&self, status: &Status) -> bool {
        self.status == *status
    }
}

impl fmt::Display for GopherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gopher: request failed with status {}: {}",
            self.status,
            self.message.trim()
        )
    }
}

impl std::error::Error for GopherError {}

/// Failure of a client fetch.
#[derive(Debug)]
pub enum ClientError {
    /// Transport failure: dial, TLS, deadline, socket. Bubbled up unchanged.
    Io(io::Error),
    /// The URL denotes a resource that cannot be fetched over Gopher
    /// (Telnet-era item type or a well-known dummy hostname).
    Unfetchable(Url),
    /// The URL could not be parsed or resolved.
    Url(UrlError),
    /// The server responded with an error, detected per the heuristics in
    /// `errordetect`.
    Response(GopherError),
}

impl ClientError {
    /// The detected response error, if that is what this is.
    pub fn response(&self) -> Option<&GopherError> {
        match self {
            ClientError::Response(e) => Some(e),
            _ => None,
        }
    }

    /// Matches a detected response error by status code.
    pub fn is_status(&self, status: Status) -> bool {
        matches!(self, ClientError::Response(e) if e.status == status)
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Io(e) => write!(f, "gopher: {}", e),
            ClientError::Unfetchable(u) => write!(f, "gopher: cannot fetch URL {:?}", u.to_string()),
            ClientError::Url(e) => write!(f, "{}", e),
            ClientError::Response(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Io(e) => Some(e),
            ClientError::Url(e) => Some(e),
            ClientError::Response(e) => Some(e),
            ClientError::Unfetchable(_) => None,
        }
    }
}

impl From<io::Error> for ClientError {
    fn from(e: io::Error) -> Self {
        ClientError::Io(e)
    }
}

impl From<UrlError> for ClientError {
    fn from(e: UrlError) -> Self {
        ClientError::Url(e)
    }
}

impl From<GopherError> for ClientError {
    fn from(e: GopherError) -> Self {
        ClientError::Response(e)
    }
}

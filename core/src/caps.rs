/*
 * caps.rs
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

//! Per-host capability hints. A `Caps` snapshot answers feature queries for
//! one server; a `CapsSource` looks one up (typically a cache over fetched
//! caps.txt files). The core only consumes these; persistence is the
//! caller's business.

use std::io;
use std::time::Duration;

use async_trait::async_trait;

/// Protocol features a server may advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Those weird ASK forms from Gopher+. Unlikely to ever be supported
    /// here until evidence appears of something actually using them in the
    /// wild, which has so far not been forthcoming.
    PlusAsk,
    /// Server understands GopherII queries.
    II,
    /// Server responds to GopherIIbis metadata queries.
    IIbis,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FeatureStatus {
    #[default]
    Unknown,
    Supported,
    Unsupported,
}

impl From<bool> for FeatureStatus {
    fn from(v: bool) -> Self {
        if v {
            FeatureStatus::Supported
        } else {
            FeatureStatus::Unsupported
        }
    }
}

/// How a server lays out paths in its selectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathConfig {
    /// How the server separates folders; Unix machines use `/`, Microsoft
    /// machines use `\`, and obsolete Macs use `:`.
    pub delimiter: String,

    /// Shorthand for "this directory"; `.` on Unix machines.
    pub identity: String,

    /// Shorthand for "the directory immediately above"; `..` on Unix and
    /// Microsoft systems.
    pub parent: String,

    /// Oddball feature of obsolete Macs: two consecutive path delimiters
    /// refer to the parent directory. False everywhere else.
    pub parent_double: bool,

    /// Escape character for quoting delimiters inside selectors; almost
    /// always `\`.
    pub escape_character: u8,

    /// Tells the client not to cut everything up to the first path
    /// delimiter; almost always false.
    pub keep_pre_delimiter: bool,
}

/// The Unix path layout, the overwhelmingly common case.
pub fn unix_path_config() -> PathConfig {
    PathConfig {
        delimiter: "/".to_string(),
        identity: ".".to_string(),
        parent: "..".to_string(),
        parent_double: false,
        escape_character: b'\\',
        keep_pre_delimiter: false,
    }
}

/// Server identification, served in caps.txt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerInfo {
    pub software: String,
    pub version: String,
    pub architecture: String,
    pub description: String,
    pub geolocation: String,
    pub admin_email: String,
}

impl ServerInfo {
    pub fn default_info() -> ServerInfo {
        ServerInfo {
            software: "burrow".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            architecture: std::env::consts::ARCH.to_string(),
            ..ServerInfo::default()
        }
    }
}

/// A capability snapshot for one host.
pub trait Caps: Send + Sync {
    fn version(&self) -> i32;

    /// How long the snapshot may be cached; None means it does not expire.
    fn expires_after(&self) -> Option<Duration>;

    fn supports(&self, feature: Feature) -> FeatureStatus;

    fn path_config(&self) -> Result<PathConfig, io::Error>;

    fn server_info(&self) -> Option<ServerInfo>;

    /// Server software name and version.
    fn software(&self) -> (String, String);

    /// TLS port for the server; None if not advertised.
    fn tls_port(&self) -> Option<u16>;

    /// Default text encoding for content types 0 and 1. Empty means UTF-8.
    fn default_encoding(&self) -> String;
}

/// Looks up the caps for a host, typically from a cache.
#[async_trait]
pub trait CapsSource: Send + Sync {
    async fn load_caps(&self, host: &str, port: &str) -> io::Result<Option<std::sync::Arc<dyn Caps>>>;
}

/// Receives feature observations made during requests.
#[async_trait]
pub trait CapsUpdater: Send + Sync {
    async fn update_feature(&self, host: &str, port: &str, feature: Feature, status: FeatureStatus);
}

/// The assumption made when nothing is known about a host.
#[derive(Debug, Default)]
pub struct DefaultCaps;

impl Caps for DefaultCaps {
    fn version(&self) -> i32 {
        1
    }

    fn expires_after(&self) -> Option<Duration> {
        None
    }

    fn supports(&self, _feature: Feature) -> FeatureStatus {
        FeatureStatus::Unsupported
    }

    fn path_config(&self) -> Result<PathConfig, io::Error> {
        Ok(unix_path_config())
    }

    fn server_info(&self) -> Option<ServerInfo> {
        None
    }

    fn software(&self) -> (String, String) {
        (String::new(), String::new())
    }

    fn tls_port(&self) -> Option<u16> {
        None
    }

    fn default_encoding(&self) -> String {
        "UTF-8".to_string()
    }
}

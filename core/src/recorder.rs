/*
 * recorder.rs
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

//! Request/response recording. A `Recorder` hands out one `Recording` per
//! request; the client tees every byte it writes and reads into it. Useful
//! for request logs, crawler archives and protocol debugging. The core only
//! defines the tee; storage is the implementation's business.

use std::sync::Arc;

use crate::request::Request;
use crate::status::Status;

/// One request's recording. Implementations must tolerate interleaved calls
/// from the read and write paths.
pub trait Recording: Send + Sync {
    /// Bytes the client sent (the selector line and any request body).
    fn request_bytes(&self, data: &[u8]);

    /// Bytes the client received.
    fn response_bytes(&self, data: &[u8]);

    /// The detected status for the response, when error interception ran.
    fn set_status(&self, status: Status, msg: &str);

    /// The connection is finished.
    fn done(&self);
}

pub trait Recorder: Send + Sync {
    fn begin_recording(&self, rq: &Request) -> Arc<dyn Recording>;
}

/*
 * handler.rs
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

//! Handler traits. A `Handler` answers a regular request by writing to the
//! connection (usually via `DirWriter` or `TextWriter`); a `MetaHandler`
//! answers GopherIIbis metadata requests via `MetaWriter`.

use async_trait::async_trait;
use tokio::io::AsyncWrite;

use crate::metawriter::MetaWriter;
use crate::request::Request;

/// The raw response sink a handler writes to.
pub type ResponseWriter = dyn AsyncWrite + Unpin + Send;

#[async_trait]
pub trait Handler: Send + Sync {
    async fn serve_gopher(&self, w: &mut ResponseWriter, rq: &mut Request);
}

#[async_trait]
pub trait MetaHandler: Send + Sync {
    async fn serve_gopher_meta(&self, w: &mut MetaWriter<'_>, rq: &mut Request);
}

#[async_trait]
impl<T: Handler + ?Sized> Handler for std::sync::Arc<T> {
    async fn serve_gopher(&self, w: &mut ResponseWriter, rq: &mut Request) {
        (**self).serve_gopher(w, rq).await
    }
}

#[async_trait]
impl<T: MetaHandler + ?Sized> MetaHandler for std::sync::Arc<T> {
    async fn serve_gopher_meta(&self, w: &mut MetaWriter<'_>, rq: &mut Request) {
        (**self).serve_gopher_meta(w, rq).await
    }
}

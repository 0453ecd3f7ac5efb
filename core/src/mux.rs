/*
 * mux.rs
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

//! Selector router: a trie of path segments with static, named-parameter and
//! catch-all nodes. Registration conflicts are programmer errors and panic;
//! lookup is allocation-light and lock-free, so register everything before
//! the server starts.
//!
//! Slashes are always trimmed from patterns and lookup paths.
//!
//! Named parameters match exactly one segment:
//!
//! Pattern: `/user/:user`
//!
//! ```text
//!  /user/gordon              match
//!  /user/you                 match
//!  /user/gordon/profile      no match
//!  /user/                    no match
//! ```
//!
//! Catch-all parameters have the form `*name`, match everything to the end
//! of the input (including nothing), and must be the last segment:
//!
//! Pattern: `/src/*filepath`
//!
//! ```text
//!  /src                      match
//!  /src/                     match
//!  /src/somefile.txt         match
//!  /src/subdir/somefile.txt  match
//! ```
//!
//! Static segments win over parameters, and parameters over catch-alls, at
//! every step; a catch-all seen on the way down is the fallback when a more
//! specific match dies later.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::handler::{Handler, MetaHandler, ResponseWriter};
use crate::itemtype::ItemType;
use crate::metawriter::MetaWriter;
use crate::request::{Params, Request};
use crate::responsewriter::not_found;
use crate::status::Status;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Path,
    Param,
    CatchAll,
}

struct MuxNode {
    part: String,
    param: String,
    kind: NodeKind,
    #[allow(dead_code)] // kept for informational tree walks
    parent: usize,
    child_wild: Option<usize>,
    child_paths: HashMap<String, usize>,
    handler: Option<Arc<dyn Handler>>,
    meta: Option<Arc<dyn MetaHandler>>,
}

impl MuxNode {
    fn new(parent: usize, part: &str, kind: NodeKind) -> MuxNode {
        let param = match kind {
            NodeKind::Path => String::new(),
            _ => part[1..].to_string(),
        };
        MuxNode {
            part: part.to_string(),
            param,
            kind,
            parent,
            child_wild: None,
            child_paths: HashMap::new(),
            handler: None,
            meta: None,
        }
    }

    fn has_any_handler(&self) -> bool {
        self.handler.is_some() || self.meta.is_some()
    }
}

/// The router. Nodes live in an index arena for the mux's lifetime;
/// handlers are registered once and never removed.
pub struct Mux {
    nodes: Vec<MuxNode>,
    max_params: usize,

    /// When set, a catch-all only swallows the would-be-static segment when
    /// the lookup path had a trailing slash (or was empty).
    pub catch_all_requires_trailing_slash: bool,
}

impl Default for Mux {
    fn default() -> Self {
        Self::new()
    }
}

const ROOT: usize = 0;

impl Mux {
    pub fn new() -> Mux {
        Mux {
            nodes: vec![MuxNode::new(ROOT, "", NodeKind::Path)],
            max_params: 0,
            catch_all_requires_trailing_slash: false,
        }
    }

    /// Register a handler for a pattern. Panics on conflicts; see module
    /// docs for the pattern syntax.
    pub fn handle(&mut self, pattern: &str, handler: Arc<dyn Handler>) {
        self.register(pattern, Some(handler), None);
    }

    /// Register a metadata handler for a pattern.
    pub fn handle_meta(&mut self, pattern: &str, meta: Arc<dyn MetaHandler>) {
        self.register(pattern, None, Some(meta));
    }

    /// Register both at once.
    pub fn handle_with_meta(
        &mut self,
        pattern: &str,
        handler: Arc<dyn Handler>,
        meta: Arc<dyn MetaHandler>,
    ) {
        self.register(pattern, Some(handler), Some(meta));
    }

    fn register(
        &mut self,
        pattern: &str,
        handler: Option<Arc<dyn Handler>>,
        meta: Option<Arc<dyn MetaHandler>>,
    ) {
        let pattern = trim_slash(pattern);
        if pattern.is_empty() {
            if self.nodes[ROOT].has_any_handler() {
                panic!("gopher: root handler already exists");
            }
            self.nodes[ROOT].handler = handler;
            self.nodes[ROOT].meta = meta;
            return;
        }

        let parts: Vec<&str> = pattern.split('/').collect();
        let (path, last) = parts.split_at(parts.len() - 1);
        let last = last[0];

        let mut parent = ROOT;
        let mut params = 0usize;

        for part in path {
            let part = *part;
            if part.is_empty() {
                continue;
            }
            match part.as_bytes()[0] {
                b'*' => panic!("gopher: mux catch-all must be last"),

                b':' => {
                    if let Some(wild) = self.nodes[parent].child_wild {
                        if self.nodes[wild].part != part {
                            panic!(
                                "gopher: param {:?} conflicts with existing param {:?} for pattern {:?}",
                                part, self.nodes[wild].param, pattern
                            );
                        }
                        parent = wild;
                    } else {
                        let idx = self.push_node(MuxNode::new(parent, part, NodeKind::Param));
                        self.nodes[parent].child_wild = Some(idx);
                        parent = idx;
                    }
                    params += 1;
                }

                _ => {
                    parent = match self.nodes[parent].child_paths.get(part) {
                        Some(&idx) => idx,
                        None => {
                            let idx = self.push_node(MuxNode::new(parent, part, NodeKind::Path));
                            self.nodes[parent].child_paths.insert(part.to_string(), idx);
                            idx
                        }
                    };
                }
            }
        }

        match last.as_bytes()[0] {
            b'*' | b':' => {
                let kind = if last.as_bytes()[0] == b'*' {
                    NodeKind::CatchAll
                } else {
                    NodeKind::Param
                };
                if let Some(wild) = self.nodes[parent].child_wild {
                    if self.nodes[wild].has_any_handler() {
                        panic!(
                            "gopher: param node {:?} already has handler for pattern {:?}",
                            last, pattern
                        );
                    }
                    self.nodes[wild].handler = handler;
                    self.nodes[wild].meta = meta;
                } else {
                    let mut node = MuxNode::new(parent, last, kind);
                    node.handler = handler;
                    node.meta = meta;
                    let idx = self.push_node(node);
                    self.nodes[parent].child_wild = Some(idx);
                }
                params += 1;
            }

            _ => match self.nodes[parent].child_paths.get(last) {
                Some(&idx) => {
                    if self.nodes[idx].has_any_handler() {
                        panic!("gopher: mux path {:?} already exists", pattern);
                    }
                    // The node exists but has no handler; safe to set.
                    self.nodes[idx].kind = NodeKind::Path;
                    self.nodes[idx].handler = handler;
                    self.nodes[idx].meta = meta;
                }
                None => {
                    let mut node = MuxNode::new(parent, last, NodeKind::Path);
                    node.handler = handler;
                    node.meta = meta;
                    let idx = self.push_node(node);
                    self.nodes[parent].child_paths.insert(last.to_string(), idx);
                }
            },
        }

        self.update_params_cap(params);
    }

    fn push_node(&mut self, node: MuxNode) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn update_params_cap(&mut self, params: usize) {
        const PARAMS_CAP: usize = 8;
        if params > self.max_params {
            self.max_params = params;
        }
        if self.max_params > PARAMS_CAP {
            self.max_params = PARAMS_CAP;
        }
    }

    fn find_node(&self, path: &str) -> (Option<usize>, Params) {
        let orig = path;
        let path = trim_slash(path);
        let has_trailing_slash = !path.is_empty() && orig.ends_with('/');

        let mut params = Params(Vec::with_capacity(self.max_params));
        let mut start = 0usize;

        let mut last_wild: Option<usize> = None;
        let mut last_wild_start = 0usize;
        let mut last_wild_param = 0usize;

        let bytes = path.as_bytes();
        let mut cur: Option<usize> = Some(ROOT);

        let mut i = 0;
        while i <= bytes.len() {
            if i == bytes.len() || bytes[i] == b'/' {
                if start == i {
                    // Skip empty segments.
                    start += 1;
                    i += 1;
                    continue;
                }

                let node = match cur {
                    Some(n) => n,
                    None => break,
                };

                // A catch-all here is what we fall back to if the match
                // fails from this point on.
                if let Some(wild) = self.nodes[node].child_wild {
                    if self.nodes[wild].kind == NodeKind::CatchAll {
                        last_wild = Some(wild);
                        last_wild_start = start;
                        last_wild_param = params.len();
                    }
                }

                let segment = &path[start..i];

                // Fixed paths take precedence:
                if let Some(&next) = self.nodes[node].child_paths.get(segment) {
                    cur = Some(next);
                    start = i + 1;
                    i += 1;
                    continue;
                }

                // Then a wildcard match (catch-alls are dealt with at the
                // end):
                if let Some(wild) = self.nodes[node].child_wild {
                    if self.nodes[wild].kind == NodeKind::Param {
                        params.push(self.nodes[wild].param.clone(), segment);
                    }
                    cur = Some(wild);
                    start = i + 1;
                    i += 1;
                    continue;
                }

                cur = None;
                break;
            }
            i += 1;
        }

        let dangling_catch_all = cur.and_then(|node| {
            if self.nodes[node].has_any_handler() {
                return None;
            }
            let wild = self.nodes[node].child_wild?;
            (self.nodes[wild].kind == NodeKind::CatchAll).then_some(wild)
        });

        if let Some(wild) = dangling_catch_all.filter(|_| {
            !self.catch_all_requires_trailing_slash || has_trailing_slash || path.is_empty()
        }) {
            // The found node has no handler, but it has a catch-all child;
            // take it with an empty binding.
            params.push(self.nodes[wild].param.clone(), "");
            return (Some(wild), params);
        }

        let at_catch_all = cur.map(|n| self.nodes[n].kind == NodeKind::CatchAll).unwrap_or(true);
        if at_catch_all {
            if let Some(wild) = last_wild {
                // Either the descent dead-ended or it stopped on a catch-all
                // mid-consumption; give the fallback the rest of the path.
                params.0.truncate(last_wild_param);
                params.push(self.nodes[wild].param.clone(), &path[last_wild_start..]);
                return (Some(wild), params);
            }
        }

        (cur, params)
    }

    /// Look up a selector; returns whether a handler would run and the
    /// parameters it would see. Mostly useful for tests and diagnostics.
    pub fn lookup(&self, path: &str) -> (bool, Params) {
        let (node, params) = self.find_node(path);
        let handled = node
            .map(|n| self.nodes[n].handler.is_some())
            .unwrap_or(false);
        (handled, params)
    }
}

#[async_trait]
impl Handler for Mux {
    async fn serve_gopher(&self, w: &mut ResponseWriter, rq: &mut Request) {
        let (node, params) = self.find_node(&rq.url().selector);
        let handler = node.and_then(|n| self.nodes[n].handler.clone());
        match handler {
            Some(handler) => {
                rq.params = params;
                handler.serve_gopher(w, rq).await;
            }
            None => {
                let _ = not_found(w, rq).await;
            }
        }
    }
}

#[async_trait]
impl MetaHandler for Mux {
    async fn serve_gopher_meta(&self, w: &mut MetaWriter<'_>, rq: &mut Request) {
        let (node, params) = self.find_node(&rq.url().selector);
        let node = match node {
            Some(n) => n,
            None => {
                w.meta_error(
                    Status::NOT_FOUND,
                    &format!("Not found: {:?}", rq.url().selector),
                );
                return;
            }
        };

        rq.params = params;
        match self.nodes[node].meta.clone() {
            Some(meta) => meta.serve_gopher_meta(w, rq).await,
            None => {
                // Registrations without a meta handler still answer metadata
                // requests with the bare INFO record.
                let sel = rq.url().selector.clone();
                let _ = w.info(ItemType::TEXT, &sel, &sel).await;
            }
        }
    }
}

fn trim_slash(s: &str) -> &str {
    s.trim_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::Url;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct DummyHandler {
        called: AtomicBool,
        params: std::sync::Mutex<Params>,
    }

    impl DummyHandler {
        fn new() -> Arc<DummyHandler> {
            Arc::new(DummyHandler {
                called: AtomicBool::new(false),
                params: std::sync::Mutex::new(Params::default()),
            })
        }
    }

    #[async_trait]
    impl Handler for DummyHandler {
        async fn serve_gopher(&self, _w: &mut ResponseWriter, rq: &mut Request) {
            self.called.store(true, Ordering::SeqCst);
            *self.params.lock().unwrap() = rq.params.clone();
        }
    }

    #[async_trait]
    impl MetaHandler for DummyHandler {
        async fn serve_gopher_meta(&self, _w: &mut MetaWriter<'_>, rq: &mut Request) {
            self.called.store(true, Ordering::SeqCst);
            *self.params.lock().unwrap() = rq.params.clone();
        }
    }

    struct NilHandler;

    #[async_trait]
    impl Handler for NilHandler {
        async fn serve_gopher(&self, _w: &mut ResponseWriter, _rq: &mut Request) {}
    }

    fn params(pairs: &[(&str, &str)]) -> Params {
        let mut p = Params::default();
        for (k, v) in pairs {
            p.push(*k, *v);
        }
        p
    }

    fn selector_request(sel: &str) -> Request {
        Request::new(Url {
            hostname: "localhost".to_string(),
            port: "70".to_string(),
            selector: sel.to_string(),
            ..Url::default()
        })
    }

    /// Register `pattern` (plus any `others`), look up `sel`, and check
    /// whether the pattern's handler ran and with which params.
    async fn check(pattern: &str, sel: &str, expected: Option<Params>, others: &[&str]) {
        let mut mux = Mux::new();
        for other in others {
            mux.handle(other, Arc::new(NilHandler));
        }
        let dh = DummyHandler::new();
        mux.handle(pattern, dh.clone());

        let mut rq = selector_request(sel);
        let mut out: Vec<u8> = Vec::new();
        mux.serve_gopher(&mut out, &mut rq).await;

        match &expected {
            Some(want) => {
                assert!(
                    dh.called.load(Ordering::SeqCst),
                    "pattern {:?} selector {:?}: expected handled",
                    pattern,
                    sel
                );
                let got = dh.params.lock().unwrap().clone();
                assert_eq!(
                    &got, want,
                    "pattern {:?} selector {:?}: params",
                    pattern, sel
                );
            }
            None => {
                assert!(
                    !dh.called.load(Ordering::SeqCst),
                    "pattern {:?} selector {:?}: expected miss",
                    pattern,
                    sel
                );
            }
        }
    }

    async fn check_meta(pattern: &str, sel: &str, expect_handled: bool) {
        let mut mux = Mux::new();
        let dh = DummyHandler::new();
        mux.handle_meta(pattern, dh.clone());

        let empty: &[&str] = &[];
        let url = Url {
            hostname: "localhost".to_string(),
            port: "70".to_string(),
            selector: sel.to_string(),
            ..Url::default()
        }
        .as_meta_item(empty);
        let mut rq = Request::new(url);
        let mut out: Vec<u8> = Vec::new();
        let mut mw = MetaWriter::new(&mut out, &rq);
        mux.serve_gopher_meta(&mut mw, &mut rq).await;
        let _ = mw.flush().await;
        assert_eq!(
            dh.called.load(Ordering::SeqCst),
            expect_handled,
            "meta pattern {:?} selector {:?}",
            pattern,
            sel
        );
    }

    #[tokio::test]
    async fn root_handler() {
        check("", "", Some(params(&[])), &[]).await;
        check("", "yep", None, &[]).await;
    }

    #[tokio::test]
    async fn static_paths() {
        check("foo/bar", "foo/bar", Some(params(&[])), &[]).await;
        check("foo", "foo/bar", None, &[]).await;
        check("foo/bar", "foo", None, &[]).await;
        check("foo/bar", "", None, &[]).await;
    }

    #[tokio::test]
    async fn param_handlers() {
        check(":foo", "yep", Some(params(&[("foo", "yep")])), &[]).await;
        check("foo/:yep", "foo/bar", Some(params(&[("yep", "bar")])), &[]).await;
        check(
            "foo/:yep/:roc",
            "foo/bar/baz",
            Some(params(&[("yep", "bar"), ("roc", "baz")])),
            &[],
        )
        .await;
        check(
            ":a/:b/:c",
            "foo/bar/baz",
            Some(params(&[("a", "foo"), ("b", "bar"), ("c", "baz")])),
            &[],
        )
        .await;
        check(
            ":a/:a/:a",
            "foo/bar/baz",
            Some(params(&[("a", "foo"), ("a", "bar"), ("a", "baz")])),
            &[],
        )
        .await;

        check(":foo/:bar/:baz", "a//c", None, &[]).await;

        // Empty segments are skipped.
        check(
            ":a/:b/:c",
            "foo//bar//baz",
            Some(params(&[("a", "foo"), ("b", "bar"), ("c", "baz")])),
            &[],
        )
        .await;

        check(
            "foo/:p1/baz",
            "foo/val1/baz",
            Some(params(&[("p1", "val1")])),
            &["foo/:p1/qux"],
        )
        .await;

        check(
            "foo/:p1/baz/:p2",
            "foo/val1/baz/val2",
            Some(params(&[("p1", "val1"), ("p2", "val2")])),
            &["foo/:p1/qux/:p2"],
        )
        .await;

        check(":p1", "", None, &[]).await;
        check(":p1/baz", "val1", None, &[]).await;
        check(":p1/baz", "val1/", None, &[]).await;
        check(":p1/baz/", "val1/", None, &[]).await;
        check(":p1/baz/", "val1/wat/", None, &[]).await;
        check("foo/:p1", "foo/", None, &[]).await;
    }

    #[tokio::test]
    async fn lookup_not_found() {
        let mut mux = Mux::new();
        mux.handle("foo/:p1/baz/:p2", Arc::new(NilHandler));
        mux.handle("foo/:p1/qux/:p2", Arc::new(NilHandler));
        let (handled, _) = mux.lookup("foo/v1/baz/v2");
        assert!(handled);
        let (handled, _) = mux.lookup("foo/v1");
        assert!(!handled);
    }

    #[tokio::test]
    async fn catch_all() {
        check("*p1", "", Some(params(&[("p1", "")])), &[]).await;
        check("*p1", "val1", Some(params(&[("p1", "val1")])), &[]).await;
        check("*p1", "val1/etc", Some(params(&[("p1", "val1/etc")])), &[]).await;
        check("*p1", "val1/etc/etc", Some(params(&[("p1", "val1/etc/etc")])), &[]).await;

        check("foo/*p1", "foo", Some(params(&[("p1", "")])), &[]).await;
        check("foo/*p1", "foo/", Some(params(&[("p1", "")])), &[]).await;
        check("foo/*p1", "foo/val1", Some(params(&[("p1", "val1")])), &[]).await;
        check("foo/*p1", "foo/val1/etc", Some(params(&[("p1", "val1/etc")])), &[]).await;

        // Static wins when it matches fully.
        check("*p1", "foo/bar", None, &["foo/bar"]).await;
        check("*p1", "foo/baz", Some(params(&[("p1", "foo/baz")])), &["foo/bar"]).await;

        // The deepest catch-all wins.
        check(
            "foo/bar/baz/*p1",
            "foo/bar/baz/qux",
            Some(params(&[("p1", "qux")])),
            &["foo/bar/*p1", "foo/*p1", "*p1"],
        )
        .await;
        check(
            "foo/bar/*p1",
            "foo/bar/fleeb/qux",
            Some(params(&[("p1", "fleeb/qux")])),
            &["foo/bar/baz/*p1", "foo/*p1", "*p1"],
        )
        .await;
    }

    #[tokio::test]
    async fn static_under_and_over_param() {
        let mut mux = Mux::new();
        let d1 = DummyHandler::new();
        let d2 = DummyHandler::new();
        mux.handle("/foo/:bar", d1.clone());
        mux.handle("/foo/:bar/baz", d2.clone());
        assert!(mux.lookup("/foo/1").0);
        assert!(mux.lookup("/foo/1/baz").0);

        let mut mux = Mux::new();
        mux.handle("/foo/bar", Arc::new(NilHandler));
        mux.handle("/foo/:bar", Arc::new(NilHandler));
        assert!(mux.lookup("/foo/bar").0);
        let (handled, p) = mux.lookup("/foo/wat");
        assert!(handled);
        assert_eq!(p, params(&[("bar", "wat")]));
    }

    #[tokio::test]
    async fn handler_under_param_subtree() {
        let mut mux = Mux::new();
        let dh = DummyHandler::new();
        mux.handle("/foo/:bar/yep/:oi", Arc::new(NilHandler));
        mux.handle("/foo/:bar", dh.clone());
        let mut rq = selector_request("/foo/yep");
        let mut out: Vec<u8> = Vec::new();
        mux.serve_gopher(&mut out, &mut rq).await;
        assert!(dh.called.load(Ordering::SeqCst));
    }

    #[test]
    #[should_panic]
    fn catch_all_over_param_panics() {
        let mut mux = Mux::new();
        mux.handle("/foo/:bar", Arc::new(NilHandler));
        mux.handle("/foo/*bar", Arc::new(NilHandler));
    }

    #[test]
    #[should_panic]
    fn param_over_param_panics() {
        let mut mux = Mux::new();
        mux.handle("/foo/:bar", Arc::new(NilHandler));
        mux.handle("/foo/:bar", Arc::new(NilHandler));
    }

    #[test]
    #[should_panic]
    fn conflicting_param_names_panic() {
        let mut mux = Mux::new();
        mux.handle("/foo/:bar/a", Arc::new(NilHandler));
        mux.handle("/foo/:qux/b", Arc::new(NilHandler));
    }

    #[test]
    #[should_panic]
    fn duplicate_static_panics() {
        let mut mux = Mux::new();
        mux.handle("/foo/bar", Arc::new(NilHandler));
        mux.handle("/foo/bar", Arc::new(NilHandler));
    }

    #[test]
    #[should_panic]
    fn catch_all_not_last_panics() {
        let mut mux = Mux::new();
        mux.handle("/foo/*rest/more", Arc::new(NilHandler));
    }

    #[tokio::test]
    async fn meta_dispatch() {
        check_meta("foo/:p", "foo/bar", true).await;
        check_meta("foo/:p", "nope", false).await;
    }

    #[tokio::test]
    async fn meta_default_for_plain_registration() {
        // A pattern registered with only a regular handler still answers
        // meta requests with a default INFO.
        let mut mux = Mux::new();
        mux.handle("sel", Arc::new(NilHandler));
        let empty: &[&str] = &[];
        let url = Url {
            hostname: "localhost".to_string(),
            port: "70".to_string(),
            selector: "sel".to_string(),
            ..Url::default()
        }
        .as_meta_item(empty);
        let mut rq = Request::new(url);
        let mut out: Vec<u8> = Vec::new();
        let mut mw = MetaWriter::new(&mut out, &rq);
        mux.serve_gopher_meta(&mut mw, &mut rq).await;
        mw.flush().await.unwrap();
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("+INFO: 0sel\tsel\tlocalhost\t70\t+"), "{:?}", text);
    }

    #[test]
    fn lookup_is_deterministic() {
        let mut mux = Mux::new();
        mux.handle("foo/:p1/baz/:p2", Arc::new(NilHandler));
        mux.handle("foo/static/baz/:p2", Arc::new(NilHandler));
        mux.handle("foo/*rest", Arc::new(NilHandler));
        for path in ["foo/v1/baz/v2", "foo/static/baz/x", "foo/odd/one", "nope", ""] {
            let first = mux.lookup(path);
            let second = mux.lookup(path);
            assert_eq!(first, second, "path {:?}", path);
        }
    }

    #[test]
    fn trim_slash_cases() {
        let cases = [
            ("", ""),
            ("a", "a"),
            ("aa", "aa"),
            ("a/a", "a/a"),
            ("a//a", "a//a"),
            ("/", ""),
            ("//", ""),
            ("///", ""),
            ("a/", "a"),
            ("a//", "a"),
            ("a///", "a"),
            ("/a", "a"),
            ("//a", "a"),
            ("///a", "a"),
            ("/a/", "a"),
            ("//a//", "a"),
            ("///a///", "a"),
        ];
        for (input, expected) in cases {
            assert_eq!(trim_slash(input), expected, "input {:?}", input);
        }
    }
}

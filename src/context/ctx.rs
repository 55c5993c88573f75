//! Pooled request state and the handler-facing view over it.
//!
//! # Design Decisions
//! - `Context` holds only request-derived state and can sit in the pool
//! - `Ctx` borrows the engine for the duration of one handler call, so
//!   pooled contexts never keep the engine alive

use std::fmt::Display;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{Request, StatusCode};
use serde_json::Value;

use crate::config::EngineConfig;
use crate::context::errors::{ErrorMsg, ErrorMsgs, ErrorType};
use crate::context::recorder::Recorder;
use crate::engine::Engine;
use crate::group::GroupId;
use crate::http::request::{body_pairs, query_pairs};
use crate::http::response::ResponseWriter;
use crate::routing::Params;

/// A request handler. Route chains and status chains are both `[Handler]`.
pub type Handler = Arc<dyn Fn(&mut Ctx<'_>) + Send + Sync>;

/// Box a closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&mut Ctx<'_>) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Where a context is in its request lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Sitting in the pool.
    Idle,
    /// Taken from the pool, not yet bound to a request.
    Acquired,
    /// Bound to a request.
    Populated,
    /// Running a route or status chain.
    Handling,
    /// Running the 500 chain after a handler panic.
    Recovering,
    /// End-of-request bookkeeping.
    Finalizing,
}

/// Mutable per-request state, reused across requests.
#[derive(Debug)]
pub struct Context {
    pub(crate) phase: Phase,
    pub(crate) group: GroupId,
    pub(crate) writer: ResponseWriter,
    pub(crate) request: Request<Bytes>,
    pub(crate) params: Params,
    form: Option<Vec<(String, String)>>,
    pub(crate) errors: ErrorMsgs,
    pub(crate) recorder: Recorder,
    halted: bool,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            group: GroupId::ROOT,
            writer: ResponseWriter::new(),
            request: Request::default(),
            params: Params::new(),
            form: None,
            errors: ErrorMsgs::default(),
            recorder: Recorder::default(),
            halted: false,
        }
    }
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Group whose chain is handling the request.
    pub fn group(&self) -> GroupId {
        self.group
    }

    pub fn request(&self) -> &Request<Bytes> {
        &self.request
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Shorthand for `params().get(key)`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key)
    }

    pub fn writer(&self) -> &ResponseWriter {
        &self.writer
    }

    pub fn writer_mut(&mut self) -> &mut ResponseWriter {
        &mut self.writer
    }

    pub fn errors(&self) -> &ErrorMsgs {
        &self.errors
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    /// True once `abort` stopped the route chain.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Bind a fresh request. Every per-request field starts empty.
    pub(crate) fn populate(&mut self, request: Request<Bytes>) {
        self.reset();
        self.recorder.start(&request);
        self.request = request;
        self.phase = Phase::Populated;
    }

    /// Drop all request-derived state.
    pub(crate) fn reset(&mut self) {
        self.group = GroupId::ROOT;
        self.writer.reset();
        self.request = Request::default();
        self.params.clear();
        self.form = None;
        self.errors.clear();
        self.recorder.reset();
        self.halted = false;
    }
}

/// What a handler receives: the pooled context plus the engine serving it.
pub struct Ctx<'a> {
    engine: &'a Engine,
    cx: &'a mut Context,
}

impl<'a> Ctx<'a> {
    pub(crate) fn new(engine: &'a Engine, cx: &'a mut Context) -> Self {
        Self { engine, cx }
    }

    pub fn engine(&self) -> &'a Engine {
        self.engine
    }

    pub fn config(&self) -> &'a EngineConfig {
        self.engine.config()
    }

    /// Escalate to the status chain for `code`, resolved from the current
    /// group towards the root.
    pub fn status(&mut self, code: StatusCode) {
        let engine = self.engine;
        match engine.groups().resolve(self.cx.group, code) {
            Some(chain) => {
                let previous = self.cx.phase;
                if previous != Phase::Recovering {
                    self.cx.phase = Phase::Handling;
                }
                for h in chain.handlers() {
                    h(self);
                }
                self.cx.phase = previous;
            }
            None => {
                tracing::warn!(status = %code, group = %self.cx.group, "No status chain registered");
                self.cx.writer.write_header(code);
                self.cx.writer.write_header_now();
            }
        }
    }

    /// Append an application error. Does not change the response.
    pub fn error(&mut self, err: impl Display, meta: Value) {
        self.push_error(err, ErrorType::EXTERNAL, meta);
    }

    pub(crate) fn push_error(&mut self, err: impl Display, kind: ErrorType, meta: Value) {
        self.cx.errors.push(ErrorMsg {
            err: err.to_string(),
            kind,
            meta,
        });
    }

    /// Set the status and stop the remaining route handlers.
    pub fn abort(&mut self, code: StatusCode) {
        self.cx.writer.write_header(code);
        self.cx.halted = true;
    }

    /// `error` followed by `abort`. The message doubles as the metadata.
    pub fn fail(&mut self, code: StatusCode, err: impl Display) {
        let message = err.to_string();
        self.error(&message, Value::String(message.clone()));
        self.abort(code);
    }

    /// Send a payload to a named signal queue. False if it was dropped.
    pub fn send(&self, queue: &str, payload: impl Into<Bytes>) -> bool {
        self.engine.send(queue, payload)
    }

    /// Query and url-encoded body values, parsed on first use.
    pub fn form(&mut self) -> &[(String, String)] {
        if self.cx.form.is_none() {
            let mut pairs = query_pairs(&self.cx.request);
            match body_pairs(&self.cx.request, self.config().max_form_memory) {
                Ok(body) => pairs.extend(body),
                Err(err) => {
                    tracing::debug!(error = %err, "Form body not parsed");
                    self.push_error(err, ErrorType::INTERNAL, Value::Null);
                }
            }
            self.cx.form = Some(pairs);
        }
        self.cx.form.as_deref().unwrap_or_default()
    }

    /// First form value for `key`.
    pub fn form_value(&mut self, key: &str) -> Option<&str> {
        self.form()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Run handlers in order until one aborts.
    pub(crate) fn run_chain(&mut self, handlers: &[Handler]) {
        self.cx.phase = Phase::Handling;
        for h in handlers {
            if self.cx.halted {
                break;
            }
            h(self);
        }
    }
}

impl Deref for Ctx<'_> {
    type Target = Context;

    fn deref(&self) -> &Context {
        &*self.cx
    }
}

impl DerefMut for Ctx<'_> {
    fn deref_mut(&mut self) -> &mut Context {
        &mut *self.cx
    }
}

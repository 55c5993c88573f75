//! The dispatch engine.
//!
//! # Responsibilities
//! - Register routes and groups during setup
//! - Run one request end to end: acquire, populate, handle, release
//! - Redirect correctable misses, escalate everything else to a status chain
//! - Contain handler panics inside the request that raised them
//!
//! # Design Decisions
//! - Registration takes `&mut self`; serving takes `&self`, so the route
//!   table and groups are read-only once the engine is shared
//! - The pooled context never outlives `dispatch`

use std::fmt;
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{header, HeaderValue, Method, Request, Response, StatusCode};
use serde_json::Value;

use super::recover::{self, Caught};
use super::EngineError;
use crate::config::{ConfigError, EngineConfig};
use crate::config::validation::validate_engine;
use crate::context::{Context, ContextPool, Ctx, ErrorType, Handler, Phase};
use crate::group::{GroupId, GroupTree};
use crate::observability::metrics;
use crate::routing::{clean_path, decode_path, encode_path, join_paths, Lookup, RouteError, RouteTable};
use crate::signals::{queues, PanicSink, SignalBus, StderrSink, MESSAGE_QUEUE, PANIC_QUEUE, RECORDER_QUEUE};

/// A registered route: its handler chain and the group that owns it.
#[derive(Clone)]
pub struct Route {
    group: GroupId,
    handlers: Vec<Handler>,
}

impl Route {
    pub fn group(&self) -> GroupId {
        self.group
    }

    pub fn handlers(&self) -> &[Handler] {
        &self.handlers
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("group", &self.group)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// Routes, groups, the context pool and the signal bus of one application.
pub struct Engine {
    config: EngineConfig,
    routes: RouteTable<Route>,
    groups: GroupTree,
    pool: ContextPool,
    signals: SignalBus,
    panic_sink: Arc<dyn PanicSink>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// An engine with default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Default configuration with access logging on.
    pub fn basic() -> Self {
        Self::with_config(EngineConfig {
            logging_on: true,
            ..EngineConfig::default()
        })
    }

    pub fn with_config(config: EngineConfig) -> Self {
        recover::install_hook();

        let signals = SignalBus::new(config.signal_backlog);
        queues::install(&signals);

        Self {
            pool: ContextPool::new(config.pool_max_idle),
            routes: RouteTable::new(),
            groups: GroupTree::new(),
            signals,
            panic_sink: Arc::new(StderrSink),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn groups(&self) -> &GroupTree {
        &self.groups
    }

    pub fn routes(&self) -> &RouteTable<Route> {
        &self.routes
    }

    pub fn pool(&self) -> &ContextPool {
        &self.pool
    }

    pub fn signals(&self) -> &SignalBus {
        &self.signals
    }

    /// The root group, mounted at `/`.
    pub fn root(&mut self) -> GroupMut<'_> {
        GroupMut {
            engine: self,
            id: GroupId::ROOT,
        }
    }

    /// A previously created group.
    pub fn group(&mut self, id: GroupId) -> Option<GroupMut<'_>> {
        self.groups.get(id)?;
        Some(GroupMut { engine: self, id })
    }

    /// Register or replace a signal queue.
    pub fn queue<F>(&self, name: impl Into<String>, queue: F)
    where
        F: Fn(Bytes) + Send + Sync + 'static,
    {
        self.signals.register(name, queue);
    }

    /// Send a signal without waiting for it to be processed.
    pub fn send(&self, queue: &str, payload: impl Into<Bytes>) -> bool {
        self.signals.send(queue, payload)
    }

    /// Report a panic to the always-on sink, then to the `panic` queue.
    pub fn panic_notify(&self, report: &str) {
        self.panic_sink.notify(report);
        self.signals.send(PANIC_QUEUE, report.to_string());
    }

    /// Replace the always-on panic sink.
    pub fn set_panic_sink(&mut self, sink: Arc<dyn PanicSink>) {
        self.panic_sink = sink;
    }

    /// Resolve a route without running anything.
    pub fn lookup(&self, method: &Method, path: &str) -> Lookup<'_, Route> {
        self.routes.lookup(method, path)
    }

    /// Check configuration and the status table before serving.
    pub fn validate(&self) -> Result<(), EngineError> {
        validate_engine(&self.config).map_err(ConfigError::Validation)?;
        self.groups.validate()?;
        Ok(())
    }

    /// Handle one request. Never panics on handler failure.
    pub fn dispatch(&self, request: Request<Bytes>) -> Response<Bytes> {
        let mut cx = self.pool.acquire();
        cx.populate(request);

        let mut ctx = Ctx::new(self, &mut cx);
        if let Err(caught) = recover::catch(|| self.route(&mut ctx)) {
            self.recover(&mut ctx, caught);
        }

        self.release(cx)
    }

    fn route(&self, ctx: &mut Ctx<'_>) {
        let method = ctx.request().method().clone();
        let path = decode_path(ctx.request().uri().path()).into_owned();

        let Some(tree) = self.routes.tree(&method) else {
            return self.not_found(ctx);
        };

        if let Some(route) = tree.find(&path, &mut ctx.params) {
            ctx.group = route.group;
            ctx.run_chain(&route.handlers);
            return;
        }
        ctx.params.clear();

        if method != Method::CONNECT && path != "/" {
            let code = if method == Method::GET {
                StatusCode::MOVED_PERMANENTLY
            } else {
                StatusCode::TEMPORARY_REDIRECT
            };

            if self.config.redirect_trailing_slash && tree.trailing_slash_redirect(&path) {
                let target = match path.strip_suffix('/') {
                    Some(trimmed) => trimmed.to_string(),
                    None => format!("{path}/"),
                };
                return self.redirect(ctx, code, &target);
            }

            if self.config.redirect_fixed_path {
                let fixed = tree.find_case_insensitive(
                    &clean_path(&path),
                    self.config.redirect_trailing_slash,
                );
                if let Some(fixed) = fixed {
                    return self.redirect(ctx, code, &fixed);
                }
            }
        }

        self.not_found(ctx);
    }

    fn redirect(&self, ctx: &mut Ctx<'_>, code: StatusCode, target: &str) {
        let target = encode_path(target);
        let location = match ctx.request().uri().query() {
            Some(query) => format!("{target}?{query}"),
            None => target,
        };

        match HeaderValue::from_str(&location) {
            Ok(value) => {
                tracing::debug!(from = %ctx.request().uri(), to = %location, status = %code, "Redirecting");
                let writer = ctx.writer_mut();
                writer.set_header(header::LOCATION, value);
                writer.write_header(code);
                writer.write_header_now();
            }
            Err(e) => {
                tracing::warn!(location = %location, error = %e, "Unusable redirect target");
                self.not_found(ctx);
            }
        }
    }

    fn not_found(&self, ctx: &mut Ctx<'_>) {
        ctx.group = GroupId::ROOT;
        ctx.status(StatusCode::NOT_FOUND);
    }

    fn recover(&self, ctx: &mut Ctx<'_>, caught: Caught) {
        tracing::error!(
            error = %caught.message,
            method = %ctx.request().method(),
            path = %ctx.request().uri().path(),
            "Handler panicked"
        );
        metrics::record_panic();

        ctx.phase = Phase::Recovering;
        ctx.push_error(&caught.message, ErrorType::PANIC, Value::String(caught.trace));
        ctx.group = GroupId::ROOT;

        if let Err(second) = recover::catch(|| ctx.status(StatusCode::INTERNAL_SERVER_ERROR)) {
            self.panic_notify(&format!(
                "panic while handling a panic: {}\n-----\n{}\n-----\n",
                second.message, second.trace
            ));
            let writer = ctx.writer_mut();
            if !writer.written() {
                writer.write_header(StatusCode::INTERNAL_SERVER_ERROR);
                writer.write_header_now();
            }
        }
    }

    fn release(&self, mut cx: Context) -> Response<Bytes> {
        cx.phase = Phase::Finalizing;

        let status = cx.writer.status();
        cx.recorder.finish(&cx.request, status);
        let response = cx.writer.take_response();

        if self.config.logging_on {
            self.signals.send(MESSAGE_QUEUE, cx.recorder.log_line());
        }
        match serde_json::to_vec(&cx.recorder.record()) {
            Ok(record) => {
                self.signals.send(RECORDER_QUEUE, record);
            }
            Err(e) => tracing::warn!(error = %e, "Failed to encode request record"),
        }

        self.pool.release(cx);
        response
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("methods", &self.routes.methods().collect::<Vec<_>>())
            .field("groups", &self.groups.len())
            .field("pool", &self.pool)
            .field("signals", &self.signals)
            .finish()
    }
}

/// Registration handle for one group.
pub struct GroupMut<'e> {
    engine: &'e mut Engine,
    id: GroupId,
}

impl GroupMut<'_> {
    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn prefix(&self) -> &str {
        self.engine
            .groups
            .get(self.id)
            .map(|g| g.prefix())
            .unwrap_or("/")
    }

    /// Register `handlers` for `method` at this group's prefix + `path`.
    pub fn try_handle(
        &mut self,
        method: Method,
        path: &str,
        handlers: impl IntoIterator<Item = Handler>,
    ) -> Result<&mut Self, RouteError> {
        if !path.starts_with('/') {
            return Err(RouteError::MissingLeadingSlash(path.to_string()));
        }

        let pattern = join_paths(self.prefix(), path);
        let route = Route {
            group: self.id,
            handlers: handlers.into_iter().collect(),
        };
        tracing::debug!(method = %method, pattern = %pattern, group = %self.id, "Registering route");
        self.engine.routes.insert(method, &pattern, route)?;
        Ok(self)
    }

    /// Like [`try_handle`](Self::try_handle), but a bad pattern aborts setup.
    ///
    /// # Panics
    /// If the pattern is malformed or conflicts with an existing route.
    pub fn handle(
        &mut self,
        method: Method,
        path: &str,
        handlers: impl IntoIterator<Item = Handler>,
    ) -> &mut Self {
        if let Err(e) = self.try_handle(method, path, handlers) {
            panic!("{e}");
        }
        self
    }

    pub fn get(&mut self, path: &str, handler: Handler) -> &mut Self {
        self.handle(Method::GET, path, [handler])
    }

    pub fn post(&mut self, path: &str, handler: Handler) -> &mut Self {
        self.handle(Method::POST, path, [handler])
    }

    pub fn put(&mut self, path: &str, handler: Handler) -> &mut Self {
        self.handle(Method::PUT, path, [handler])
    }

    pub fn patch(&mut self, path: &str, handler: Handler) -> &mut Self {
        self.handle(Method::PATCH, path, [handler])
    }

    pub fn delete(&mut self, path: &str, handler: Handler) -> &mut Self {
        self.handle(Method::DELETE, path, [handler])
    }

    pub fn head(&mut self, path: &str, handler: Handler) -> &mut Self {
        self.handle(Method::HEAD, path, [handler])
    }

    pub fn options(&mut self, path: &str, handler: Handler) -> &mut Self {
        self.handle(Method::OPTIONS, path, [handler])
    }

    /// Splice `handlers` into this group's chain for `code`.
    pub fn status(&mut self, code: StatusCode, handlers: impl IntoIterator<Item = Handler>) -> &mut Self {
        self.engine.groups.override_status(self.id, code, None, handlers);
        self
    }

    /// Like [`status`](Self::status), also replacing the page message.
    pub fn status_message(
        &mut self,
        code: StatusCode,
        message: &str,
        handlers: impl IntoIterator<Item = Handler>,
    ) -> &mut Self {
        self.engine
            .groups
            .override_status(self.id, code, Some(message), handlers);
        self
    }

    /// Create a child group at this group's prefix + `component`.
    pub fn group(&mut self, component: &str) -> GroupMut<'_> {
        let id = self.engine.groups.add(self.id, component);
        tracing::debug!(group = %id, parent = %self.id, component, "Group created");
        GroupMut {
            engine: &mut *self.engine,
            id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::handler;

    fn get(path: &str) -> Request<Bytes> {
        Request::builder().uri(path).body(Bytes::new()).unwrap()
    }

    #[test]
    fn test_route_binds_params_and_group() {
        let mut engine = Engine::new();
        let api = engine.root().group("/api").id();
        engine.group(api).unwrap().get(
            "/users/:id",
            handler(|ctx| {
                let body = format!("{} in {}", ctx.param("id").unwrap_or("-"), ctx.group());
                ctx.writer_mut().write_str(&body);
            }),
        );

        let response = engine.dispatch(get("/api/users/42"));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body().as_ref(), format!("42 in {api}").as_bytes());
    }

    #[test]
    fn test_unknown_method_is_not_found() {
        let mut engine = Engine::new();
        engine.root().get("/a", handler(|_| {}));

        let request = Request::builder()
            .method(Method::PUT)
            .uri("/a")
            .body(Bytes::new())
            .unwrap();
        assert_eq!(engine.dispatch(request).status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_abort_stops_chain() {
        let mut engine = Engine::new();
        engine.root().handle(
            Method::GET,
            "/guarded",
            [
                handler(|ctx| ctx.fail(StatusCode::UNAUTHORIZED, "no token")),
                handler(|ctx| {
                    ctx.writer_mut().write_str("secret");
                }),
            ],
        );

        let response = engine.dispatch(get("/guarded"));
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.body().is_empty());
    }

    #[test]
    fn test_registration_errors() {
        let mut engine = Engine::new();
        let mut root = engine.root();
        assert_eq!(
            root.try_handle(Method::GET, "users", [handler(|_| {})]).err(),
            Some(RouteError::MissingLeadingSlash("users".into()))
        );
        assert!(root.try_handle(Method::GET, "/a/:x", [handler(|_| {})]).is_ok());
        assert!(root.try_handle(Method::GET, "/a/:y", [handler(|_| {})]).is_err());
    }

    #[test]
    #[should_panic(expected = "must begin with '/'")]
    fn test_handle_fails_fast() {
        let mut engine = Engine::new();
        engine.root().handle(Method::GET, "nope", [handler(|_| {})]);
    }

    #[test]
    fn test_validate() {
        assert!(Engine::new().validate().is_ok());
    }
}

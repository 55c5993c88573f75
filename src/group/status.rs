//! Status handler chains.
//!
//! # Responsibilities
//! - Build the default chain for each standard status code
//! - Keep custom handlers between the fixed before/after handlers
//! - Render status and panic pages
//!
//! # Design Decisions
//! - The first handler always sets the status line
//! - The last handler writes the page only if nothing was written yet
//! - The page body is rendered once per chain, not per request

use std::collections::HashMap;
use std::fmt;
use std::fmt::Write as _;
use std::sync::Arc;

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, StatusCode};

use crate::context::{handler, Ctx, ErrorType, Handler};

/// Codes the root group must always handle.
pub const STANDARD_CODES: [StatusCode; 11] = [
    StatusCode::BAD_REQUEST,
    StatusCode::UNAUTHORIZED,
    StatusCode::FORBIDDEN,
    StatusCode::NOT_FOUND,
    StatusCode::METHOD_NOT_ALLOWED,
    StatusCode::IM_A_TEAPOT,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
    StatusCode::HTTP_VERSION_NOT_SUPPORTED,
];

const PANIC_STYLE: &str = r#"<style type="text/css">
html, body {
font-family: "Roboto", sans-serif;
color: #333333;
margin: 0px;
}
h1 {
color: #2b3848;
background-color: #ffffff;
padding: 20px;
border-bottom: 1px dashed #2b3848;
}
pre {
font-size: 1.1em;
margin: 20px;
padding: 20px;
border: 2px solid #2b3848;
background-color: #ffffff;
}
pre p:nth-child(odd){margin:0;}
pre p:nth-child(even){background-color: rgba(216,216,216,0.25); margin: 0;}
</style>"#;

/// Handlers run for one status code: `[before, ..custom, after]`.
#[derive(Clone)]
pub struct StatusChain {
    code: StatusCode,
    message: String,
    handlers: Vec<Handler>,
}

impl StatusChain {
    /// A chain holding only the fixed before/after handlers.
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        let page: Arc<str> = status_page(code, &message).into();
        Self {
            code,
            message,
            handlers: vec![before(code), after(page)],
        }
    }

    pub fn code(&self) -> StatusCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn handlers(&self) -> &[Handler] {
        &self.handlers
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Splice `custom` in just before the final handler.
    pub fn update(&mut self, custom: impl IntoIterator<Item = Handler>) {
        let at = self.handlers.len().saturating_sub(1);
        self.handlers.splice(at..at, custom);
    }
}

impl fmt::Debug for StatusChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusChain")
            .field("code", &self.code)
            .field("message", &self.message)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

fn before(code: StatusCode) -> Handler {
    handler(move |ctx: &mut Ctx<'_>| ctx.writer_mut().write_header(code))
}

fn after(page: Arc<str>) -> Handler {
    handler(move |ctx: &mut Ctx<'_>| {
        if ctx.writer().written() {
            return;
        }
        if ctx.config().html_status {
            let writer = ctx.writer_mut();
            writer.set_header(CONTENT_TYPE, HeaderValue::from_static("text/html"));
            writer.write_str(&page);
        } else {
            ctx.writer_mut().write_header_now();
        }
    })
}

/// Collect `PANIC` errors, report each once and, when enabled, serve the
/// panic page.
pub fn panic_handler() -> Handler {
    handler(|ctx: &mut Ctx<'_>| {
        let panics: Vec<(String, String)> = ctx
            .errors()
            .by_type(ErrorType::PANIC)
            .map(|p| (p.err.clone(), meta_text(&p.meta)))
            .collect();
        if panics.is_empty() {
            return;
        }

        for (err, trace) in &panics {
            ctx.engine()
                .panic_notify(&format!("encountered an internal error: {err}\n-----\n{trace}\n-----\n"));
        }

        if ctx.config().serve_panic {
            let page = panic_page(&panics);
            let writer = ctx.writer_mut();
            writer.set_header(CONTENT_TYPE, HeaderValue::from_static("text/html"));
            writer.write_str(&page);
        }
    })
}

/// The default table installed on the root group.
pub fn default_statuses() -> HashMap<StatusCode, StatusChain> {
    let mut table = HashMap::new();
    let mut add = |chain: StatusChain| {
        table.insert(chain.code(), chain);
    };

    add(StatusChain::new(
        StatusCode::BAD_REQUEST,
        "The browser (or proxy) sent a request that this server could not understand.",
    ));
    add(StatusChain::new(
        StatusCode::UNAUTHORIZED,
        "The server could not verify that you are authorized to access the URL requested.\nYou either supplied the wrong credentials (e.g. a bad password), or your browser doesn't understand how to supply the credentials required.",
    ));
    add(StatusChain::new(
        StatusCode::FORBIDDEN,
        "You do not have the permission to access the requested resource.\nIt is either read-protected or not readable by the server.",
    ));
    add(StatusChain::new(
        StatusCode::NOT_FOUND,
        "The requested URL was not found on the server. If you entered the URL manually please check your spelling and try again.",
    ));
    add(StatusChain::new(
        StatusCode::METHOD_NOT_ALLOWED,
        "The method is not allowed for the requested URL.",
    ));
    add(StatusChain::new(
        StatusCode::IM_A_TEAPOT,
        "I'M A TEAPOT, NOT A COFFEE MACHINE.",
    ));

    let mut internal = StatusChain::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        "The server encountered an internal error and was unable to complete your request. Either the server is overloaded or there is an error in the application.",
    );
    internal.update([panic_handler()]);
    add(internal);

    add(StatusChain::new(
        StatusCode::BAD_GATEWAY,
        "The proxy server received an invalid response from an upstream server.",
    ));
    add(StatusChain::new(
        StatusCode::SERVICE_UNAVAILABLE,
        "The server is temporarily unable to service your request due to maintenance downtime or capacity problems. Please try again later.",
    ));
    add(StatusChain::new(
        StatusCode::GATEWAY_TIMEOUT,
        "The connection to an upstream server timed out.",
    ));
    add(StatusChain::new(
        StatusCode::HTTP_VERSION_NOT_SUPPORTED,
        "The server does not support the HTTP protocol version used in the request.",
    ));

    table
}

/// HTML page for a status code.
pub fn status_page(code: StatusCode, message: &str) -> String {
    let reason = code.canonical_reason().unwrap_or("Unknown Status");
    format!(
        "<!DOCTYPE HTML>\n<title>{} {reason}</title>\n<h1>{reason}</h1>\n<p>{}</p>\n",
        code.as_u16(),
        escape_html(message),
    )
}

/// HTML page listing each panic and its backtrace.
pub fn panic_page(panics: &[(String, String)]) -> String {
    let mut body = String::new();
    for (err, trace) in panics {
        let _ = write!(body, "<h1>{}</h1>\n<pre style=\"font-weight: bold;\">", escape_html(err));
        for line in trace.lines() {
            let _ = write!(body, "<p>{}</p>", escape_html(line));
        }
        body.push_str("</pre>\n");
    }
    format!(
        "<html>\n<head><title>Internal Server Error</title>\n{PANIC_STYLE}\n</head>\n<body>\n{body}</body>\n</html>\n"
    )
}

fn meta_text(meta: &serde_json::Value) -> String {
    match meta {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Escape text for inclusion in HTML.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

//! Path normalisation helpers.

use std::borrow::Cow;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

/// Bytes escaped when a decoded path goes back on the wire.
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Returns the canonical form of `path`.
///
/// - Repeated slashes collapse into one
/// - `.` elements are removed
/// - `..` elements remove the preceding element
/// - A missing leading slash is added
/// - A trailing slash is kept (a trailing `.` element counts as one)
///
/// The empty string becomes `/`.
pub fn clean_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let trailing = path.len() > 1
        && (path.ends_with('/') || path.ends_with("/."));

    let mut stack: Vec<&str> = Vec::new();
    for element in path.split('/') {
        match element {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            other => stack.push(other),
        }
    }

    let mut cleaned = String::with_capacity(path.len() + 1);
    for element in &stack {
        cleaned.push('/');
        cleaned.push_str(element);
    }
    if cleaned.is_empty() || trailing {
        cleaned.push('/');
    }
    cleaned
}

/// Joins a group prefix and a path component.
///
/// The result is cleaned, so double slashes at the seam collapse. A trailing
/// slash on `component` survives the join.
pub fn join_paths(prefix: &str, component: &str) -> String {
    if component.is_empty() {
        return prefix.to_string();
    }
    clean_path(&format!("{}/{}", prefix, component))
}

/// Percent-decodes a request path for matching.
///
/// A path that does not decode to UTF-8 is matched as sent.
pub fn decode_path(raw: &str) -> Cow<'_, str> {
    percent_decode_str(raw)
        .decode_utf8()
        .unwrap_or(Cow::Borrowed(raw))
}

/// Escapes a decoded path so it can be used in a `Location` header.
pub fn encode_path(path: &str) -> String {
    utf8_percent_encode(path, PATH).to_string()
}

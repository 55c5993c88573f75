//! Typed error records attached to a request context.

use std::fmt;
use std::ops::BitOr;

use serde::Serialize;
use serde_json::Value;

/// Bit-flag tag describing where an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorType(u32);

impl ErrorType {
    /// Raised by the engine itself (e.g. an oversized form body).
    pub const INTERNAL: ErrorType = ErrorType(1 << 0);
    /// Attached by application code through `Ctx::error`.
    pub const EXTERNAL: ErrorType = ErrorType(1 << 1);
    /// A handler panic caught at the dispatch boundary.
    pub const PANIC: ErrorType = ErrorType(1 << 2);
    pub const ALL: ErrorType = ErrorType(u32::MAX);

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True when the two tags share at least one bit.
    pub const fn intersects(self, other: ErrorType) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for ErrorType {
    type Output = ErrorType;

    fn bitor(self, rhs: ErrorType) -> ErrorType {
        ErrorType(self.0 | rhs.0)
    }
}

/// One error collected while handling a request.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorMsg {
    #[serde(rename = "error")]
    pub err: String,
    #[serde(skip)]
    pub kind: ErrorType,
    pub meta: Value,
}

/// Errors in the order they were attached.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ErrorMsgs(Vec<ErrorMsg>);

impl ErrorMsgs {
    pub fn push(&mut self, msg: ErrorMsg) {
        self.0.push(msg);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ErrorMsg> {
        self.0.iter()
    }

    /// Errors whose tag intersects `kind`.
    pub fn by_type(&self, kind: ErrorType) -> impl Iterator<Item = &ErrorMsg> {
        self.0.iter().filter(move |msg| msg.kind.intersects(kind))
    }

    pub fn last(&self) -> Option<&ErrorMsg> {
        self.0.last()
    }

    pub(crate) fn clear(&mut self) {
        self.0.clear();
    }
}

impl fmt::Display for ErrorMsgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, msg) in self.0.iter().enumerate() {
            writeln!(f, "Error #{:02}: {}", i + 1, msg.err)?;
            writeln!(f, "     Meta: {}", msg.meta)?;
        }
        Ok(())
    }
}

//! Validation outcomes.
//!
//! Validators return a list of [`Violation`]s (bad input, expected, reported
//! to the caller) and reserve [`ResolutionError`] for misconfiguration such as
//! a missing document type or a schema that cannot be compiled.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single reason a value was rejected.
///
/// `path` is a JSON Pointer (RFC 6901) into the validated value; the empty
/// string addresses the root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Errors that mean the validator could not run at all.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("document type {0:?} could not be resolved")]
    MissingDocumentType(String),

    #[error("malformed schema at {pointer:?}: {reason}")]
    MalformedSchema { pointer: String, reason: String },

    #[error("graph rule table is unavailable")]
    MissingRuleTable,
}

impl ResolutionError {
    pub(crate) fn malformed(pointer: &str, reason: impl Into<String>) -> Self {
        ResolutionError::MalformedSchema {
            pointer: pointer.to_string(),
            reason: reason.into(),
        }
    }
}

/// Append one reference token to a JSON Pointer, escaping `~` and `/`.
pub fn pointer_push(base: &str, token: &str) -> String {
    let escaped = token.replace('~', "~0").replace('/', "~1");
    format!("{base}/{escaped}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_escaping() {
        assert_eq!(pointer_push("", "title"), "/title");
        assert_eq!(pointer_push("/a", "b/c"), "/a/b~1c");
        assert_eq!(pointer_push("", "x~y"), "/x~0y");
    }

    #[test]
    fn display_includes_path() {
        assert_eq!(Violation::new("", "bad").to_string(), "bad");
        assert_eq!(Violation::new("/title", "bad").to_string(), "/title: bad");
    }
}

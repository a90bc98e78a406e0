//! Standard error response body.

use serde::{Deserialize, Serialize};

use yads::Violation;

/// The JSON body returned for all error responses.
///
/// ```json
/// {
///   "error": "document data is invalid",
///   "code": "validation_failed",
///   "violations": [
///     { "field": "data", "path": "/title", "message": "the property title is required", "code": "422" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Human-readable description of the problem.
    pub error: String,

    /// Machine-readable error code.
    ///
    /// | `code` | HTTP status |
    /// |--------|------------|
    /// | `invalid_json` | 400 |
    /// | `invalid_parameter` | 400 |
    /// | `unknown_reference` | 400 |
    /// | `not_found` | 404 |
    /// | `conflict` | 409 |
    /// | `validation_failed` | 422 |
    /// | `internal_error` | 500 |
    pub code: String,

    /// Every violation found, present only for `validation_failed`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<ViolationRecord>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            error: error.into(),
            violations: Vec::new(),
        }
    }

    /// A `validation_failed` response carrying `violations`.
    pub fn validation(error: impl Into<String>, violations: Vec<ViolationRecord>) -> Self {
        Self {
            code: codes::VALIDATION_FAILED.into(),
            error: error.into(),
            violations,
        }
    }
}

/// One violation as reported over HTTP.
///
/// `field` names the request attribute that was checked and `path` is a JSON
/// Pointer. Graph rule violations name the offending edge attribute rather
/// than a generic `data`, so clients can tell a bad combination from a bad
/// role:
///
/// | Check | `field` | `path` |
/// |-------|---------|--------|
/// | document `data` against its schema | `data` | into `data` |
/// | document type schema compilation | `allowedAttributes` | into the schema |
/// | edge against the graph rules | `graphType` or `role` | `/graphType` or `/role` |
/// | document type change against its stored edges | `documentType` | `/graphType` or `/role`; the message names the edge |
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViolationRecord {
    pub field: String,
    pub path: String,
    pub message: String,
    pub code: String,
}

/// Status code carried by every [`ViolationRecord`].
pub const VIOLATION_CODE: &str = "422";

impl ViolationRecord {
    pub fn new(field: impl Into<String>, violation: Violation) -> Self {
        Self {
            field: field.into(),
            path: violation.path,
            message: violation.message,
            code: VIOLATION_CODE.into(),
        }
    }

    /// Records for a list of schema violations against a document's `data`.
    pub fn for_data(violations: Vec<Violation>) -> Vec<Self> {
        violations.into_iter().map(|v| Self::new("data", v)).collect()
    }

    /// Records for graph rule violations; the field is taken from the first
    /// pointer token (`/graphType` becomes `graphType`).
    pub fn for_edge(violations: Vec<Violation>) -> Vec<Self> {
        violations
            .into_iter()
            .map(|v| {
                let field = v.path.trim_start_matches('/').to_string();
                Self::new(field, v)
            })
            .collect()
    }

    /// Records for a stored edge that a document's new type would break.
    pub fn for_retyped_edge(edge: &str, violations: Vec<Violation>) -> Vec<Self> {
        violations
            .into_iter()
            .map(|v| {
                Self::new(
                    "documentType",
                    Violation::new(v.path, format!("edge {edge}: {}", v.message)),
                )
            })
            .collect()
    }
}

/// Well-known error codes.
pub mod codes {
    pub const INVALID_JSON: &str = "invalid_json";
    pub const INVALID_PARAMETER: &str = "invalid_parameter";
    pub const UNKNOWN_REFERENCE: &str = "unknown_reference";
    pub const NOT_FOUND: &str = "not_found";
    pub const CONFLICT: &str = "conflict";
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const INTERNAL_ERROR: &str = "internal_error";
}

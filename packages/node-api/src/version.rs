//! `GET /version`.

use serde::{Deserialize, Serialize};

/// Name and version of the running server.
///
/// ```json
/// { "name": "yads-node", "version": "0.1.0" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersionInfo {
    pub name: String,
    pub version: String,
}

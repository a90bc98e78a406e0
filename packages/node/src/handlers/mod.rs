//! HTTP request handlers for all YADS node endpoints.
//!
//! Each submodule covers one resource. Handlers are plain async functions
//! that receive Axum extractors and return `Result<impl IntoResponse, AppError>`.
//!
//! Validation lives here, not in storage: document writes run the schema
//! validator (after merging, for PATCH), edge writes run the graph rule
//! engine, and references named in request bodies are resolved before
//! anything is stored.

pub mod document_tags;
pub mod document_types;
pub mod documents;
pub mod graph_rules;
pub mod graph_types;
pub mod graphs;
pub mod roles;
pub mod tags;
pub mod version;

use std::sync::Arc;

use axum::Json;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use yads::SchemaCache;
use yads_api::{Identified, ListQuery, ListResponse};

use crate::{
    config::NodeConfig,
    error::AppError,
    storage::{Page, Storage, StorageError},
};

/// Shared application state threaded through all Axum handlers via [`axum::extract::State`].
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub config: NodeConfig,
    /// Compiled document type schemas, shared by every request.
    pub schemas: Arc<SchemaCache>,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>, config: NodeConfig) -> Self {
        Self {
            storage,
            config,
            schemas: Arc::new(SchemaCache::new()),
        }
    }

    /// Clamp the client's pagination parameters to the configured limits.
    pub(crate) fn page(&self, after: Option<String>, limit: Option<u32>) -> Page {
        let query = ListQuery { after, limit };
        Page {
            limit: query.effective_limit(self.config.page_limit, self.config.max_page_limit),
            after: query.after,
        }
    }
}

// ---------------------------------------------------------------------------
// Query param structs (serde-compatible for the axum Query extractor)
// ---------------------------------------------------------------------------

/// `?after=&limit=` on every collection.
#[derive(Debug, Deserialize, Default)]
pub struct PageParams {
    /// Keyset pagination cursor (UUIDv7 `id` of the last seen record).
    pub after: Option<String>,

    /// Page size (1 to the configured maximum).
    pub limit: Option<u32>,
}

// --- helpers -----------------------------------------------------------------

pub(crate) fn list_response<T: Identified>((items, has_more): (Vec<T>, bool)) -> Json<ListResponse<T>> {
    Json(ListResponse::from_page(items, has_more))
}

/// Map [`StorageError::NotFound`] on a path id to a descriptive 404.
pub(crate) fn or_not_found<'a>(what: &'a str, id: &'a str) -> impl FnOnce(StorageError) -> AppError + 'a {
    move |e| match e {
        StorageError::NotFound => AppError::not_found(what, id),
        other => other.into(),
    }
}

/// Apply a merge patch to the request form of a record.
///
/// `current` is serialised, `patch` is merged onto it with [`yads::merge`]
/// (so `-key` deletes `key`), and the result is read back as `T`.
pub(crate) fn merge_patch<T>(current: &T, patch: &Value) -> Result<T, AppError>
where
    T: Serialize + DeserializeOwned,
{
    if !patch.is_object() {
        return Err(AppError::InvalidJson("a merge patch must be a JSON object".into()));
    }
    let base = serde_json::to_value(current).map_err(|e| AppError::Internal(e.to_string()))?;
    let merged = yads::merge_owned(base, patch.clone());
    serde_json::from_value(merged).map_err(|e| AppError::InvalidJson(e.to_string()))
}

// ---------------------------------------------------------------------------
// Router tests shared by the handler modules
// ---------------------------------------------------------------------------

//! Shared helpers for the YADS conformance test suite.
//!
//! - [`spawn_node`] binds a `TcpListener` on an ephemeral port and serves an
//!   in-process node over real HTTP, backed by any [`Storage`].
//! - [`Scenario`] carries the state of one test: the node's base URL, an HTTP
//!   client, and a key/value store of the ids the test has created so far.
//!   Tests pass it by `&mut` from step to step instead of sharing globals.
//!
//! ```rust,ignore
//! let mut s = Scenario::seeded().await;
//! s.post("inbox", "/documents", json!({
//!     "documentType": s.id("type:notebook"),
//!     "data": { "title": "Inbox" }
//! })).await;
//! let (status, _) = s.get(&format!("/documents/{}", s.id("inbox"))).await;
//! assert_eq!(status, 200);
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use yads_node::{build_router, load_fixtures, MemoryStorage, NodeConfig, Storage};

/// Start an ephemeral in-process node over `storage` and return its base
/// URL, e.g. `http://127.0.0.1:51234`.
///
/// The node runs in a background `tokio` task bound to an OS-assigned port
/// on `127.0.0.1`.
///
/// # Panics
///
/// Panics if the TCP listener cannot be bound.
pub async fn spawn_node(storage: Arc<dyn Storage>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("get local addr");

    let config = NodeConfig {
        bind_addr: addr,
        ..NodeConfig::default()
    };
    let router = build_router(storage, config);

    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("conformance node error");
    });

    format!("http://{addr}")
}

/// One test's view of a node plus the ids it has remembered.
pub struct Scenario {
    base: String,
    client: reqwest::Client,
    ids: HashMap<String, String>,
}

impl Scenario {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .expect("build HTTP client"),
            ids: HashMap::new(),
        }
    }

    /// A fresh in-memory node with nothing in it.
    pub async fn empty() -> Self {
        Self::new(spawn_node(Arc::new(MemoryStorage::new())).await)
    }

    /// A fresh in-memory node loaded with the reference fixtures, whose ids
    /// are remembered as `type:<name>`, `graph_type:<title>` and
    /// `role:<name>`.
    pub async fn seeded() -> Self {
        let storage = Arc::new(MemoryStorage::new());
        load_fixtures(storage.as_ref()).await.expect("load fixtures");
        let mut s = Self::new(spawn_node(storage).await);
        s.remember_reference_data().await;
        s
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    // --- id store ------------------------------------------------------------

    pub fn remember(&mut self, key: impl Into<String>, id: impl Into<String>) {
        self.ids.insert(key.into(), id.into());
    }

    /// The id remembered under `key`.
    ///
    /// # Panics
    ///
    /// Panics if nothing was remembered under `key`; that is a bug in the test.
    pub fn id(&self, key: &str) -> String {
        match self.ids.get(key) {
            Some(id) => id.clone(),
            None => panic!("scenario has no id for {key:?}; known: {:?}", self.keys()),
        }
    }

    pub fn try_id(&self, key: &str) -> Option<&str> {
        self.ids.get(key).map(String::as_str)
    }

    fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.ids.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    // --- requests ------------------------------------------------------------

    pub async fn get(&self, path: &str) -> (u16, Value) {
        self.send(reqwest::Method::GET, path, None).await
    }

    pub async fn put(&self, path: &str, body: Value) -> (u16, Value) {
        self.send(reqwest::Method::PUT, path, Some(body)).await
    }

    pub async fn patch(&self, path: &str, body: Value) -> (u16, Value) {
        self.send(reqwest::Method::PATCH, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> u16 {
        self.send(reqwest::Method::DELETE, path, None).await.0
    }

    /// POST without asserting the outcome.
    pub async fn try_post(&self, path: &str, body: Value) -> (u16, Value) {
        self.send(reqwest::Method::POST, path, Some(body)).await
    }

    /// POST, assert 201, and remember the created record's id under `key`.
    pub async fn post(&mut self, key: &str, path: &str, body: Value) -> Value {
        let (status, json) = self.try_post(path, body).await;
        assert_eq!(status, 201, "POST {path} for {key:?} failed: {json}");
        let id = json["id"]
            .as_str()
            .unwrap_or_else(|| panic!("POST {path} returned no id: {json}"));
        self.remember(key, id);
        json
    }

    async fn send(&self, method: reqwest::Method, path: &str, body: Option<Value>) -> (u16, Value) {
        let is_patch = method == reqwest::Method::PATCH;
        let mut req = self.client.request(method, format!("{}{path}", self.base));
        if let Some(body) = body {
            let content_type = if is_patch {
                "application/merge-patch+json"
            } else {
                "application/json"
            };
            req = req
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(body.to_string());
        }
        let resp = req.send().await.expect("send request");
        let status = resp.status().as_u16();
        let text = resp.text().await.expect("read response body");
        let json = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        (status, json)
    }

    /// Remember every document type, graph type and role on the node by name.
    pub async fn remember_reference_data(&mut self) {
        for (path, prefix, name_key) in [
            ("/document_types", "type", "type"),
            ("/graph_types", "graph_type", "title"),
            ("/roles", "role", "name"),
        ] {
            let (status, json) = self.get(&format!("{path}?limit=500")).await;
            assert_eq!(status, 200, "GET {path}: {json}");
            for item in json["items"].as_array().cloned().unwrap_or_default() {
                if let (Some(name), Some(id)) = (item[name_key].as_str(), item["id"].as_str()) {
                    self.remember(format!("{prefix}:{name}"), id);
                }
            }
        }
    }
}

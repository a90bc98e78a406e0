//! Blocking HTTP client for the commands that talk to a running node.

use std::collections::HashMap;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use yads::{DocumentType, Fixtures, GraphRule, GraphType, Role};
use yads_api::{
    DocumentTypeRequest, ErrorResponse, GraphRuleRequest, GraphTypeRequest, RoleRequest,
    VersionInfo,
};

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The node answered with a non-success status.
    #[error("{url} returned {status}: {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },

    #[error("fixture {0} refers to a record that was not seeded")]
    Dangling(String),
}

pub struct NodeClient {
    base: String,
    http: reqwest::blocking::Client,
}

impl NodeClient {
    pub fn new(base: &str) -> Result<Self, RemoteError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|source| RemoteError::Transport {
                url: base.to_string(),
                source,
            })?;
        Ok(Self {
            base: base.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn version(&self) -> Result<VersionInfo, RemoteError> {
        let url = format!("{}/version", self.base);
        let resp = self
            .http
            .get(&url)
            .send()
            .map_err(|source| RemoteError::Transport {
                url: url.clone(),
                source,
            })?;
        decode(url, resp)
    }

    /// POST every fixture record, rewriting the references of graph rules to
    /// the ids the node assigned. Returns a one-line summary.
    pub fn seed(&self, fixtures: &Fixtures) -> Result<String, RemoteError> {
        // Fixture id -> node id, for every kind of record.
        let mut ids: HashMap<String, String> = HashMap::new();

        for t in &fixtures.document_types {
            let created: DocumentType = self.post("document_types", &DocumentTypeRequest::from(t))?;
            ids.insert(t.id.clone(), created.id);
        }
        for t in &fixtures.graph_types {
            let req = GraphTypeRequest {
                title: t.title.clone(),
                title_reverse: t.title_reverse.clone(),
                graph_type: t.graph_type,
            };
            let created: GraphType = self.post("graph_types", &req)?;
            ids.insert(t.id.clone(), created.id);
        }
        for r in &fixtures.roles {
            let req = RoleRequest {
                name: r.name.clone(),
                description: r.description.clone(),
            };
            let created: Role = self.post("roles", &req)?;
            ids.insert(r.id.clone(), created.id);
        }

        let lookup = |id: &str| {
            ids.get(id)
                .cloned()
                .ok_or_else(|| RemoteError::Dangling(id.to_string()))
        };
        for rule in &fixtures.graph_rules {
            let req = GraphRuleRequest {
                document_type_source: lookup(&rule.document_type_source)?,
                document_type_target: lookup(&rule.document_type_target)?,
                role: rule.role.as_deref().map(lookup).transpose()?,
                graph_type: lookup(&rule.graph_type)?,
            };
            let _: GraphRule = self.post("graph_rules", &req)?;
        }

        Ok(format!(
            "seeded {} document types, {} graph types, {} roles, {} graph rules into {}",
            fixtures.document_types.len(),
            fixtures.graph_types.len(),
            fixtures.roles.len(),
            fixtures.graph_rules.len(),
            self.base
        ))
    }

    fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, RemoteError> {
        let url = format!("{}/{path}", self.base);
        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .map_err(|source| RemoteError::Transport {
                url: url.clone(),
                source,
            })?;
        decode(url, resp)
    }
}

// --- helpers -----------------------------------------------------------------

fn decode<T: DeserializeOwned>(url: String, resp: reqwest::blocking::Response) -> Result<T, RemoteError> {
    let status = resp.status();
    if !status.is_success() {
        // Prefer the node's error message; fall back to the raw body.
        let text = resp.text().unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&text)
            .map(|e| e.error)
            .unwrap_or(text);
        return Err(RemoteError::Status {
            url,
            status: status.as_u16(),
            message,
        });
    }
    resp.json()
        .map_err(|source| RemoteError::Transport { url, source })
}

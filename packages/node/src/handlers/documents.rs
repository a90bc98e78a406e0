//! Document handlers: CRUD, link view and subgraph.
//!
//! # Validation
//!
//! Every write validates the document's `data` against the schema of its
//! document type before anything is stored:
//!
//! | Method | Validated value |
//! |--------|-----------------|
//! | POST | the request `data` |
//! | PUT | the request `data` (full replacement) |
//! | PATCH | the stored `data` with the patch merged onto it |
//!
//! A PUT or PATCH that changes `documentType` is also checked against the
//! graph rules for every edge the document already has; an edge the new
//! type would break fails the write with 422.
//!
//! PATCH is a read-merge-validate-write cycle. The write is a
//! compare-and-swap on `updatedAt`, so a PATCH that raced another write to
//! the same document fails with 409 instead of silently dropping it.

use std::collections::HashSet;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use yads::{Document, DocumentGraph, DocumentType, ResolutionError};
use yads_api::{DocumentPatch, DocumentRequest, LinksResponse, SubgraphResponse, ViolationRecord};

use crate::{
    error::AppError,
    extract::{JsonBody, QueryParams},
    storage::DocumentFilter,
};

use super::{graphs::rule_violations, list_response, or_not_found, AppState};

/// Default hop count for `GET /documents/{id}/subgraph`.
pub const DEFAULT_SUBGRAPH_DEPTH: u32 = 1;
/// Requested depths above this are clamped.
pub const MAX_SUBGRAPH_DEPTH: u32 = 10;

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

/// Query parameters for `GET /documents`.
#[derive(Debug, Deserialize, Default)]
pub struct DocumentListParams {
    /// Include only documents of this document type id.
    #[serde(rename = "documentType")]
    pub document_type: Option<String>,
    pub after: Option<String>,
    pub limit: Option<u32>,
}

/// Query parameters for `GET /documents/{id}/subgraph`.
#[derive(Debug, Deserialize, Default)]
pub struct SubgraphParams {
    /// Maximum traversal depth in both directions. Defaults to 1.
    pub depth: Option<u32>,
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

/// `GET /documents`
pub async fn list(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<DocumentListParams>,
) -> Result<impl IntoResponse, AppError> {
    let filter = DocumentFilter {
        document_type: params.document_type,
        page: state.page(params.after, params.limit),
    };
    Ok(list_response(state.storage.list_documents(&filter).await?))
}

/// `POST /documents`
pub async fn create(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<DocumentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let document = req.into_document();
    check_data(&state, &document).await?;
    state.storage.put_document(&document).await?;
    tracing::debug!(id = %document.id, document_type = %document.document_type, "document created");
    Ok((StatusCode::CREATED, Json(document)))
}

/// `GET /documents/{id}`
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Document>, AppError> {
    Ok(Json(fetch(&state, &id).await?))
}

/// `PUT /documents/{id}`: replace `documentType` and `data`, then validate.
pub async fn replace(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<DocumentRequest>,
) -> Result<Json<Document>, AppError> {
    let current = fetch(&state, &id).await?;
    let mut next = current.clone();
    req.apply_to(&mut next);
    check_write(&state, &current, &next).await?;
    state.storage.update_document(&next, &current.updated_at).await?;
    Ok(Json(next))
}

/// `PATCH /documents/{id}`: merge the patch onto the stored `data`, then
/// validate the merged result.
///
/// A body carrying `updatedAt` is a precondition: it must equal the stored
/// value or the request fails with 409 before anything is merged.
pub async fn patch(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<DocumentPatch>,
) -> Result<Json<Document>, AppError> {
    let current = fetch(&state, &id).await?;
    if let Some(expected) = &patch.updated_at {
        if *expected != current.updated_at {
            return Err(AppError::Conflict(format!(
                "document {id} was modified at {}",
                current.updated_at
            )));
        }
    }

    let next = patch.apply(&current);
    check_write(&state, &current, &next).await?;
    state.storage.update_document(&next, &current.updated_at).await?;
    Ok(Json(next))
}

/// `DELETE /documents/{id}`: also removes the document's edges and tags.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .storage
        .delete_document(&id)
        .await
        .map_err(or_not_found("document", &id))?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Graph views
// ---------------------------------------------------------------------------

/// `GET /documents/{id}/links`
///
/// Every edge touching the document, labelled from the document's side.
pub async fn links(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LinksResponse>, AppError> {
    fetch(&state, &id).await?;
    let mut graph = DocumentGraph::from_edges(state.storage.graphs_touching(&id).await?);
    load_graph_types(&state, &mut graph).await?;
    Ok(Json(LinksResponse {
        links: graph.links(&id),
        document: id,
    }))
}

/// `GET /documents/{id}/subgraph?depth=N`
///
/// Breadth-first expansion in both directions: the root, every document
/// within `depth` hops, and the edges among them.
pub async fn subgraph(
    State(state): State<AppState>,
    Path(id): Path<String>,
    QueryParams(params): QueryParams<SubgraphParams>,
) -> Result<Json<SubgraphResponse>, AppError> {
    let root = fetch(&state, &id).await?;
    let depth = params
        .depth
        .unwrap_or(DEFAULT_SUBGRAPH_DEPTH)
        .min(MAX_SUBGRAPH_DEPTH);

    let mut graph = DocumentGraph::new();
    let mut seen: HashSet<String> = HashSet::from([id.clone()]);
    let mut frontier = vec![id.clone()];
    // One extra round loads the edges among the outermost documents.
    for level in 0..=depth {
        let mut next = Vec::new();
        for doc in &frontier {
            for edge in state.storage.graphs_touching(doc).await? {
                let other = if edge.document_source == *doc {
                    edge.document_target.clone()
                } else {
                    edge.document_source.clone()
                };
                if level < depth && seen.insert(other.clone()) {
                    next.push(other);
                }
                graph.add(edge);
            }
        }
        frontier = next;
    }

    let sub = graph.subgraph(&id, depth as usize);
    let mut documents = vec![root];
    for other in graph.reachable(&id, depth as usize) {
        // A document deleted mid-walk is simply left out.
        if let Some(doc) = state.storage.get_document(&other).await? {
            documents.push(doc);
        }
    }
    let mut graphs: Vec<_> = sub.edges().cloned().collect();
    graphs.sort_by(|a, b| a.id.cmp(&b.id));

    Ok(Json(SubgraphResponse {
        root: id,
        depth,
        documents,
        graphs,
    }))
}

// --- helpers -----------------------------------------------------------------

async fn fetch(state: &AppState, id: &str) -> Result<Document, AppError> {
    state
        .storage
        .get_document(id)
        .await?
        .ok_or_else(|| AppError::not_found("document", id))
}

/// Resolve the document's type and validate its `data` against it.
///
/// An unknown type id is a 400; violations are a 422 listing all of them.
async fn check_data(state: &AppState, document: &Document) -> Result<DocumentType, AppError> {
    let document_type = state
        .storage
        .get_document_type(&document.document_type)
        .await?
        .ok_or_else(|| AppError::unknown_reference("documentType", &document.document_type))?;

    let violations = state.schemas.validate(document, Some(&document_type))?;
    if !violations.is_empty() {
        tracing::debug!(
            document_type = %document_type.type_name,
            count = violations.len(),
            "document rejected"
        );
        return Err(AppError::unprocessable(
            format!("data does not match document type {}", document_type.type_name),
            ViolationRecord::for_data(violations),
        ));
    }
    Ok(document_type)
}

/// Validate an update of `current` to `next`.
async fn check_write(state: &AppState, current: &Document, next: &Document) -> Result<(), AppError> {
    let document_type = check_data(state, next).await?;
    if next.document_type != current.document_type {
        check_stored_edges(state, next, &document_type).await?;
    }
    Ok(())
}

/// Re-run the graph rules over every forward edge touching `document`,
/// as if `document` already had `document_type`.
async fn check_stored_edges(
    state: &AppState,
    document: &Document,
    document_type: &DocumentType,
) -> Result<(), AppError> {
    let storage = &state.storage;
    let mut records = Vec::new();

    for edge in storage.graphs_touching(&document.id).await? {
        if edge.graph_type_reversed {
            continue;
        }
        let graph_type = storage.get_graph_type(&edge.graph_type).await?.ok_or_else(|| {
            AppError::Internal(format!("edge {} has no graph type {}", edge.id, edge.graph_type))
        })?;
        let source_type = endpoint_type(state, &edge.document_source, document, document_type).await?;
        let target_type = endpoint_type(state, &edge.document_target, document, document_type).await?;

        let violations =
            rule_violations(state, &edge, &graph_type, &source_type, &target_type).await?;
        records.extend(ViolationRecord::for_retyped_edge(&edge.id, violations));
    }

    if !records.is_empty() {
        tracing::debug!(id = %document.id, count = records.len(), "type change rejected");
        return Err(AppError::unprocessable(
            format!(
                "document type {} is not permitted by the graph rules of existing edges",
                document_type.type_name
            ),
            records,
        ));
    }
    Ok(())
}

/// The type of one edge endpoint, using the pending type for `document`.
async fn endpoint_type(
    state: &AppState,
    endpoint: &str,
    document: &Document,
    document_type: &DocumentType,
) -> Result<DocumentType, AppError> {
    if endpoint == document.id {
        return Ok(document_type.clone());
    }
    let other = state
        .storage
        .get_document(endpoint)
        .await?
        .ok_or_else(|| AppError::Internal(format!("edge endpoint {endpoint} is missing")))?;
    let other_type = state
        .storage
        .get_document_type(&other.document_type)
        .await?
        .ok_or_else(|| ResolutionError::MissingDocumentType(other.document_type.clone()))?;
    Ok(other_type)
}

async fn load_graph_types(state: &AppState, graph: &mut DocumentGraph) -> Result<(), AppError> {
    let ids: HashSet<String> = graph.edges().map(|e| e.graph_type.clone()).collect();
    for id in ids {
        if let Some(graph_type) = state.storage.get_graph_type(&id).await? {
            graph.add_graph_type(graph_type);
        }
    }
    Ok(())
}

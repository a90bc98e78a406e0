//! Assembles the Axum [`Router`] from all handler modules.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::{
    config::NodeConfig,
    handlers::{
        document_tags, document_types, documents, graph_rules, graph_types, graphs, roles, tags,
        version, AppState,
    },
    storage::Storage,
};

/// Build the complete application router with shared state.
pub fn build_router(storage: Arc<dyn Storage>, config: NodeConfig) -> Router {
    let state = AppState::new(storage, config);

    Router::new()
        .route("/version", get(version::version))
        // Document types
        .route(
            "/document_types",
            get(document_types::list).post(document_types::create),
        )
        .route(
            "/document_types/{id}",
            get(document_types::get)
                .put(document_types::replace)
                .patch(document_types::patch)
                .delete(document_types::delete),
        )
        // Documents
        .route("/documents", get(documents::list).post(documents::create))
        .route(
            "/documents/{id}",
            get(documents::get)
                .put(documents::replace)
                .patch(documents::patch)
                .delete(documents::delete),
        )
        .route("/documents/{id}/links", get(documents::links))
        .route("/documents/{id}/subgraph", get(documents::subgraph))
        // Graph reference data
        .route("/graph_types", get(graph_types::list).post(graph_types::create))
        .route(
            "/graph_types/{id}",
            get(graph_types::get)
                .put(graph_types::replace)
                .delete(graph_types::delete),
        )
        .route("/roles", get(roles::list).post(roles::create))
        .route(
            "/roles/{id}",
            get(roles::get).put(roles::replace).delete(roles::delete),
        )
        .route("/graph_rules", get(graph_rules::list).post(graph_rules::create))
        .route(
            "/graph_rules/{id}",
            get(graph_rules::get)
                .put(graph_rules::replace)
                .delete(graph_rules::delete),
        )
        // Edges
        .route("/graphs", get(graphs::list).post(graphs::create))
        .route(
            "/graphs/{id}",
            get(graphs::get)
                .put(graphs::replace)
                .patch(graphs::patch)
                .delete(graphs::delete),
        )
        // Tags
        .route("/tags", get(tags::list).post(tags::create))
        .route(
            "/tags/{id}",
            get(tags::get).put(tags::replace).delete(tags::delete),
        )
        .route(
            "/document_tags",
            get(document_tags::list).post(document_tags::create),
        )
        .route(
            "/document_tags/{id}",
            get(document_tags::get).delete(document_tags::delete),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::handlers::test_support::{app, call};

    #[tokio::test]
    async fn unknown_route_is_404() {
        let (status, _) = call(&app(), "GET", "/nothing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unsupported_method_is_405() {
        let (status, _) = call(&app(), "PATCH", "/roles/x", Some(serde_json::json!({}))).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn every_collection_lists_empty() {
        let app = app();
        for path in [
            "/document_types",
            "/documents",
            "/graph_types",
            "/roles",
            "/graph_rules",
            "/graphs",
            "/tags",
            "/document_tags",
        ] {
            let (status, json) = call(&app, "GET", path, None).await;
            assert_eq!(status, StatusCode::OK, "{path}");
            assert_eq!(json["items"], serde_json::json!([]), "{path}");
            assert_eq!(json["hasMore"], false, "{path}");
        }
    }
}

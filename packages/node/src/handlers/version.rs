//! `GET /version`.

use axum::Json;
use yads_api::VersionInfo;

/// Name and version of this build.
pub async fn version() -> Json<VersionInfo> {
    Json(VersionInfo {
        name: env!("CARGO_PKG_NAME").into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::handlers::test_support::{app, call};

    #[tokio::test]
    async fn reports_package_version() {
        let (status, json) = call(&app(), "GET", "/version", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["name"], "yads-node");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }
}

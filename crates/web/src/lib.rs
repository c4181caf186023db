//! One-route static file server for the page under test
//!
//! `GET /` serves the index document, `GET /{path}` serves the file at that
//! relative path or a 404, and `GET /health` answers the harness's startup
//! probe. Nothing else: no other verbs, no auth, no caching headers.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Path as UrlPath, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

type StaticDir = Arc<PathBuf>;

pub fn router(static_dir: PathBuf) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/*path", get(static_handler))
        .with_state(Arc::new(static_dir))
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}

async fn index_handler(State(dir): State<StaticDir>) -> Response {
    serve_path(&dir, "index.html").await
}

async fn static_handler(State(dir): State<StaticDir>, UrlPath(path): UrlPath<String>) -> Response {
    serve_path(&dir, &path).await
}

async fn serve_path(dir: &PathBuf, rel: &str) -> Response {
    let rel = rel.trim_start_matches('/');
    let requested = dir.join(rel);

    // Path traversal guard: the canonicalized target must stay inside the
    // static root.
    let Ok(canon_dir) = dir.canonicalize() else {
        return (StatusCode::INTERNAL_SERVER_ERROR, "bad static dir").into_response();
    };
    let Ok(canon_req) = requested.canonicalize() else {
        return (StatusCode::NOT_FOUND, "not found").into_response();
    };
    if !canon_req.starts_with(&canon_dir) {
        return (StatusCode::FORBIDDEN, "forbidden").into_response();
    }

    match tokio::fs::read(&canon_req).await {
        Ok(bytes) => {
            let mime = mime_guess::from_path(rel).first_or_octet_stream();
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, mime.to_string())],
                bytes,
            )
                .into_response()
        }
        Err(_) => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn fixture() -> (tempfile::TempDir, Router) {
        let root = tempfile::tempdir().unwrap();
        let static_dir = root.path().join("static");
        std::fs::create_dir_all(static_dir.join("js")).unwrap();
        std::fs::write(
            static_dir.join("index.html"),
            "<!DOCTYPE html><title>Acme Store</title>",
        )
        .unwrap();
        std::fs::write(static_dir.join("js/login.js"), "// login form").unwrap();
        // A file outside the static root that must stay unreachable.
        std::fs::write(root.path().join("secret.txt"), "do not serve").unwrap();

        let app = router(static_dir);
        (root, app)
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, String, Option<String>) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8_lossy(&body).to_string(), content_type)
    }

    #[tokio::test]
    async fn root_serves_the_index_document() {
        let (_root, app) = fixture();
        let (status, body, content_type) = get(app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Acme Store"));
        assert!(content_type.unwrap().contains("text/html"));
    }

    #[tokio::test]
    async fn relative_paths_serve_files_with_guessed_types() {
        let (_root, app) = fixture();
        let (status, body, content_type) = get(app, "/js/login.js").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "// login form");
        assert!(content_type.unwrap().contains("javascript"));
    }

    #[tokio::test]
    async fn missing_files_are_not_found_not_server_errors() {
        let (_root, app) = fixture();
        let (status, _, _) = get(app, "/does-not-exist").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn traversal_cannot_escape_the_static_root() {
        let (_root, app) = fixture();
        let (status, body, _) = get(app, "/../secret.txt").await;
        assert!(status.is_client_error(), "got {status}");
        assert!(!body.contains("do not serve"));
    }

    #[tokio::test]
    async fn health_answers_ok() {
        let (_root, app) = fixture();
        let (status, body, _) = get(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("ok"));
    }
}

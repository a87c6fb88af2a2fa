use std::path::Path;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use scene_viewer::server::{self, Health, ServerConfig};
use tower::ServiceExt;

const INDEX: &str = "<!doctype html><html><body><div id=\"app\"></div></body></html>";
const SCRIPT: &str = "console.log('scene viewer bundle'); // padded past the compression threshold";

fn dist_with_bundle() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("index.html"), INDEX).expect("write index");
    std::fs::create_dir_all(dir.path().join("assets")).expect("assets dir");
    std::fs::write(dir.path().join("assets/app.js"), SCRIPT).expect("write script");
    dir
}

fn config(dist: &Path) -> ServerConfig {
    ServerConfig {
        port: 0,
        dist: dist.to_path_buf(),
    }
}

async fn get(config: &ServerConfig, uri: &str) -> axum::response::Response {
    server::router(config)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn should_report_health() {
    let dist = dist_with_bundle();
    let response = get(&config(dist.path()), "/api/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    let health: Health = serde_json::from_str(&body_string(response).await).unwrap();
    assert!(health.ok);
    assert!(health.ts > 0);
}

#[tokio::test]
async fn should_serve_static_files_with_one_day_cache() {
    let dist = dist_with_bundle();
    let response = get(&config(dist.path()), "/assets/app.js").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CACHE_CONTROL],
        server::STATIC_CACHE_CONTROL
    );
    assert_eq!(body_string(response).await, SCRIPT);
}

#[tokio::test]
async fn should_fall_back_to_entry_document() {
    let dist = dist_with_bundle();
    let response = get(&config(dist.path()), "/does/not/exist").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
    assert_eq!(body_string(response).await, INDEX);
}

#[tokio::test]
async fn should_fail_when_entry_document_is_missing() {
    let dist = tempfile::tempdir().expect("tempdir");
    let response = get(&config(dist.path()), "/some/route").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body_string(response).await.is_empty());
}

#[tokio::test]
async fn should_compress_when_accepted() {
    let dist = dist_with_bundle();
    let response = server::router(&config(dist.path()))
        .oneshot(
            Request::builder()
                .uri("/assets/app.js")
                .header(header::ACCEPT_ENCODING, "gzip")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_ENCODING], "gzip");
}

#[test]
fn should_default_to_port_3000_and_dist() {
    let config = ServerConfig::default();
    assert_eq!(config.port, 3000);
    assert_eq!(config.dist, Path::new("dist"));
}

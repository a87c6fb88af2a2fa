//! HTTP server for the built web client.
//!
//! Serves a health endpoint, the static bundle with a one day cache lifetime,
//! and the SPA entry document for every other path.

use std::{
    net::{Ipv4Addr, SocketAddr},
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::Context as _;
use axum::{
    Json, Router,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tower_http::{compression::CompressionLayer, services::ServeDir, set_header::SetResponseHeader};

pub const STATIC_CACHE_CONTROL: &str = "public, max-age=86400";
pub const ENTRY_DOCUMENT: &str = "index.html";

#[derive(Parser, Clone, Debug, PartialEq, Eq)]
#[command(name = "scene-viewer-server", about = "Serve the scene viewer web client")]
pub struct ServerConfig {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,
    /// Directory holding the built client bundle.
    #[arg(long, env = "DIST_DIR", default_value = "dist")]
    pub dist: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            dist: PathBuf::from("dist"),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Health {
    pub ok: bool,
    /// Milliseconds since the Unix epoch.
    pub ts: u64,
}

async fn health() -> Json<Health> {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default();
    Json(Health { ok: true, ts })
}

/// The entry document for any path no file matches, so client-side routes
/// survive a reload.
async fn spa_fallback(index: PathBuf) -> Response {
    match tokio::fs::read(&index).await {
        Ok(document) => (
            [
                (header::CONTENT_TYPE, "text/html; charset=utf-8"),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            document,
        )
            .into_response(),
        Err(e) => {
            log::error!("Could not read {}: {}", index.display(), e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [
                    (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
                    (header::CACHE_CONTROL, "no-store"),
                ],
                e.to_string(),
            )
                .into_response()
        }
    }
}

pub fn router(config: &ServerConfig) -> Router {
    let index = config.dist.join(ENTRY_DOCUMENT);
    let spa = get(move || spa_fallback(index.clone()));

    let static_files = SetResponseHeader::if_not_present(
        ServeDir::new(&config.dist).fallback(spa),
        header::CACHE_CONTROL,
        HeaderValue::from_static(STATIC_CACHE_CONTROL),
    );

    Router::new()
        .route("/api/health", get(health))
        .fallback_service(static_files)
        .layer(CompressionLayer::new())
}

/// Bind `0.0.0.0:<port>` and serve until the process is stopped.
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    log::info!("Serving {}", config.dist.display());
    log::info!("Server listening on http://localhost:{}", config.port);
    axum::serve(listener, router(&config)).await?;
    Ok(())
}

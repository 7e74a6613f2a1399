//! Local HTTP server that streams live playback locators.
//!
//! Every locator minted by the [`BlobRegistry`] is a URL under `/blob/`.
//! The server answers with the clip bytes while the locator is live and
//! with 404 once it was revoked.

use crate::{AppError, AppResult};

use std::{net::SocketAddr, panic::Location};

use axum::{
    Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use camclip_core::BlobRegistry;
use error_location::ErrorLocation;
use tokio::{net::TcpListener, sync::watch};
use tower_http::cors::CorsLayer;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Build the playback router over a registry.
pub fn router(registry: BlobRegistry) -> Router {
    Router::new()
        .route("/blob/{key}", get(serve_blob))
        .layer(CorsLayer::permissive())
        .with_state(registry)
}

/// Bind `addr` and serve until `shutdown_rx` flips.
#[instrument(skip(registry, shutdown_rx))]
pub async fn serve(
    addr: SocketAddr,
    registry: BlobRegistry,
    mut shutdown_rx: watch::Receiver<bool>,
) -> AppResult<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::ServerError {
            reason: format!("Failed to bind {}: {}", addr, e),
            location: ErrorLocation::from(Location::caller()),
        })?;

    info!(%addr, "Playback server listening");

    axum::serve(listener, router(registry))
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
        })
        .await
        .map_err(|e| AppError::ServerError {
            reason: format!("Playback server failed: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

    info!("Playback server stopped");

    Ok(())
}

async fn serve_blob(State(registry): State<BlobRegistry>, Path(key): Path<Uuid>) -> Response {
    match registry.fetch(key) {
        Some(blob) => {
            debug!(%key, bytes = blob.bytes.len(), "Serving clip");
            (
                [(header::CONTENT_TYPE, blob.mime_type)],
                blob.bytes.to_vec(),
            )
                .into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

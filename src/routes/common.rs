//! Common routes: health, readiness, version.

use crate::router::Router;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, routing::get, routing::MethodRouter, Json};
use bson::doc;
use serde::Serialize;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

#[derive(Serialize)]
struct ReadyBody {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    database: Option<&'static str>,
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadyBody>, (StatusCode, Json<ReadyBody>)> {
    if let Err(e) = state.db.run_command(doc! { "ping": 1 }, None).await {
        tracing::warn!(error = %e, "readiness check failed");
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyBody {
                status: "degraded",
                database: Some("unavailable"),
            }),
        ));
    }
    Ok(Json(ReadyBody {
        status: "ok",
        database: Some("ok"),
    }))
}

async fn version() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// GET /health, GET /ready (pings the database), GET /version.
pub fn common_routes() -> Router<MethodRouter<AppState>> {
    let mut routes = Router::new();
    routes
        .mount_handler("/health", get(health))
        .mount_handler("/ready", get(ready))
        .mount_handler("/version", get(version));
    routes
}

//! Build the axum application from a merged route table.

use crate::config::ServerConfig;
use crate::error::RouteError;
use crate::router::Router;
use crate::state::AppState;
use axum::routing::MethodRouter;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Routes in table order, static assets under `/static`, request tracing and a body limit.
/// Fails when the route table cannot be served as a whole.
pub fn make_app(
    routes: Router<MethodRouter<AppState>>,
    state: AppState,
    config: &ServerConfig,
) -> Result<axum::Router, RouteError> {
    tracing::debug!(
        routes = routes.len(),
        static_path = %config.static_path.display(),
        debug = config.debug,
        "build application"
    );
    Ok(routes
        .into_axum()?
        .nest_service("/static", ServeDir::new(&config.static_path))
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

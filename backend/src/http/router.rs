//! Route table and middleware stack.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Build the application router around shared state.
pub fn create_router(state: AppState) -> Router {
    // Browser-based planning tools are served from other origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Target catalog
        .route(
            "/targets",
            get(handlers::list_targets).post(handlers::create_target),
        )
        .route(
            "/targets/{name}",
            get(handlers::get_target).delete(handlers::delete_target),
        )
        // Configuration store
        .route(
            "/targets/{name}/configurations",
            get(handlers::list_configurations).post(handlers::add_configuration),
        )
        .route(
            "/targets/{name}/configurations/{config}",
            axum::routing::patch(handlers::edit_configuration)
                .delete(handlers::delete_configuration),
        )
        .route(
            "/targets/{name}/configurations/{config}/overlays",
            get(handlers::get_overlays),
        )
        .route("/targets/{name}/offset-star", post(handlers::add_offset_star))
        // Sites and plans
        .route("/sites", get(handlers::list_sites))
        .route("/visibility", post(handlers::compute_visibility))
        .route("/visibility/summary", post(handlers::nightly_summaries))
        .route("/starlist", post(handlers::export_starlist));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/v1", api_v1)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlannerConfig;
    use crate::resolver::{CoordinateResolver, LocalNameResolver};
    use std::sync::Arc;

    #[test]
    fn test_router_creation() {
        let config = PlannerConfig::default();
        let resolver = CoordinateResolver::new(Arc::new(LocalNameResolver::new()));
        let state = AppState::with_resolver(&config, resolver).unwrap();
        let _router = create_router(state);
    }
}

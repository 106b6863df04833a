use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::{self, Next},
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::auth::{auth_middleware, AuthService};
use crate::config::FrontendConfig;

use super::handlers::{get_visitors, health_check, log_visit, AppState};
use super::panic_response;
use super::static_files::{serve_static, StaticAssets};

pub fn create_router(
    state: AppState,
    auth_service: Arc<AuthService>,
    frontend: &FrontendConfig,
) -> Router {
    let state = Arc::new(state);

    let protected_routes = Router::new()
        .route("/api/get-visitors", get(get_visitors))
        .route_layer(middleware::from_fn(
            move |headers: HeaderMap, req: Request, next: Next| {
                let auth = Arc::clone(&auth_service);
                auth_middleware(auth, headers, req, next)
            },
        ))
        .with_state(Arc::clone(&state));

    let assets = Router::new()
        .route("/", get(serve_static))
        .route("/admin.html", get(serve_static))
        .route("/style.css", get(serve_static))
        .fallback(get(serve_static))
        .with_state(Arc::new(StaticAssets::new(frontend.static_dir.as_deref())));

    // Logging stays on GET for existing pages; POST is accepted for new clients
    Router::new()
        .route("/api/log-visit", get(log_visit).post(log_visit))
        .route("/health", get(health_check))
        .with_state(state)
        .merge(protected_routes)
        .merge(assets)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

//! API layer - HTTP handlers and routing
//!
//! This module contains all HTTP API endpoints for the discussion board.
//! It includes:
//! - Auth endpoints (join, login per role, refresh, profile)
//! - Public board endpoints (settings, categories, tags, posts, comments)
//! - Member endpoints (writing, reactions, reports, notifications)
//! - Moderator endpoints (report queue, moderation actions)
//! - Admin endpoints (members, forbidden words, audit and export logs)

pub mod admin;
pub mod auth;
pub mod categories;
pub mod comments;
pub mod common;
pub mod export;
pub mod middleware;
pub mod moderation;
pub mod notifications;
pub mod posts;
pub mod reactions;
pub mod reports;
pub mod responses;
pub mod site;
pub mod subscriptions;
pub mod tags;


use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::get,
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

pub use middleware::{ApiError, AppState};

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes (need administrator role)
    let admin_routes = Router::new()
        .merge(admin::router())
        .merge(categories::admin_router())
        .merge(tags::admin_router())
        .merge(export::admin_router())
        .merge(site::admin_router())
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Moderator routes (administrators pass too)
    let moderator_routes = Router::new()
        .merge(reports::moderator_router())
        .merge(moderation::moderator_router())
        .route_layer(axum_middleware::from_fn(middleware::require_moderator))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Member routes (any signed-in account)
    let member_routes = Router::new()
        .merge(posts::member_router())
        .merge(comments::member_router())
        .merge(reactions::member_router())
        .merge(reports::member_router())
        .merge(notifications::member_router())
        .merge(subscriptions::member_router())
        .merge(export::member_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    let auth_protected = auth::protected_router().route_layer(
        axum_middleware::from_fn_with_state(state.clone(), middleware::require_auth),
    );

    // Public board routes see the caller when a token is sent
    let board_public = Router::new()
        .merge(site::router())
        .merge(categories::router())
        .merge(tags::router())
        .merge(posts::router())
        .merge(comments::router())
        .merge(reactions::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::optional_auth,
        ));

    Router::new()
        .nest("/auth", auth::public_router().merge(auth_protected))
        .nest(
            "/discussBoard",
            board_public
                .nest("/member", member_routes)
                .nest("/moderator", moderator_routes)
                .nest("/admin", admin_routes),
        )
        .route("/health", get(site::health))
}

fn cors_layer(cors_origin: &str) -> CorsLayer {
    let origin = if cors_origin.trim() == "*" {
        AllowOrigin::any()
    } else {
        match cors_origin.parse::<HeaderValue>() {
            Ok(value) => AllowOrigin::exact(value),
            Err(_) => {
                tracing::warn!("Invalid CORS origin '{}', allowing any origin", cors_origin);
                AllowOrigin::any()
            }
        }
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    build_api_router(state.clone())
        .layer(cors_layer(cors_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

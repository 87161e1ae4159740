//! HTTP routes.
//!
//! ```text
//! GET    /health                         liveness
//! GET    /health/ready                   database ping
//!
//! POST   /api/auth/register              ─┐
//! POST   /api/auth/verify-otp             │
//! POST   /api/auth/resend-otp             │ public
//! POST   /api/auth/login                  │
//! POST   /api/auth/forgot-password        │
//! POST   /api/auth/reset-password         │
//! POST   /api/auth/social-login          ─┘
//! GET    /api/auth/user                  ─┐
//! PUT    /api/auth/update-profile         │ bearer token
//! POST   /api/auth/logout                ─┘
//!
//! GET    /api/categories[/{id}]          public
//! GET    /api/products[/{id}]            public
//!
//! GET|POST|DELETE  /api/cart             ─┐
//! PUT|DELETE       /api/cart/{id}         │
//! GET|POST         /api/addresses         │ bearer token
//! GET|PUT|DELETE   /api/addresses/{id}    │
//! GET|POST         /api/orders            │
//! GET              /api/orders/{number}   │
//! POST             /api/orders/{number}/cancel
//! ```

pub mod addresses;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod health;
pub mod orders;

use axum::extract::{FromRequest, FromRequestParts};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chai_core::Page;
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::AppState;

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let auth = Router::new()
        .route("/register", post(auth::register))
        .route("/verify-otp", post(auth::verify_otp))
        .route("/resend-otp", post(auth::resend_otp))
        .route("/login", post(auth::login))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
        .route("/social-login", post(auth::social_login))
        .route("/user", get(auth::user))
        .route("/update-profile", put(auth::update_profile))
        .route("/logout", post(auth::logout));

    let api = Router::new()
        .nest("/auth", auth)
        .route("/categories", get(catalog::categories))
        .route("/categories/{id}", get(catalog::category))
        .route("/products", get(catalog::products))
        .route("/products/{id}", get(catalog::product))
        .route(
            "/cart",
            get(cart::view).post(cart::add).delete(cart::clear),
        )
        .route("/cart/{id}", put(cart::update).delete(cart::remove))
        .route(
            "/addresses",
            get(addresses::list).post(addresses::create),
        )
        .route(
            "/addresses/{id}",
            get(addresses::show)
                .put(addresses::update)
                .delete(addresses::delete),
        )
        .route("/orders", get(orders::list).post(orders::place))
        .route("/orders/{order_number}", get(orders::show))
        .route("/orders/{order_number}/cancel", post(orders::cancel));

    Router::new()
        .route("/health", get(health::live))
        .route("/health/ready", get(health::ready))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// =============================================================================
// Extractors
// =============================================================================

/// `Json` body whose rejections render as [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `Query` string whose rejections render as [`ApiError`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

// =============================================================================
// Response envelope
// =============================================================================

/// `{ "success": true, "data": ... }`
pub(crate) fn data<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}

/// `{ "success": true, "message": ..., "data": ... }`
pub(crate) fn message_with<T: Serialize>(message: &str, data: T) -> Json<Value> {
    Json(json!({ "success": true, "message": message, "data": data }))
}

/// `{ "success": true, "message": ... }`
pub(crate) fn message(message: &str) -> Json<Value> {
    Json(json!({ "success": true, "message": message }))
}

/// Paged list with `meta` the mobile app uses for infinite scroll.
pub(crate) fn paged<T: Serialize>(page: Page<T>) -> Json<Value> {
    let last_page = page.last_page();
    Json(json!({
        "success": true,
        "data": page.items,
        "meta": {
            "current_page": page.page,
            "last_page": last_page,
            "per_page": page.per_page,
            "total": page.total,
        },
    }))
}

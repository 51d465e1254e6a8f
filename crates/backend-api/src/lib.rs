mod error;
mod state;
mod util;

pub mod routes;
pub mod services;

pub use error::ApiError;
pub use state::AppState;

use axum::{
    http::header::{AUTHORIZATION, CONTENT_TYPE},
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        // Auth routes
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/me", get(routes::auth::me))
        .route("/auth/password", put(routes::auth::change_password))
        .route("/auth/profile", put(routes::auth::update_profile))
        // Listing routes
        .route("/listings", post(routes::listings::create_listing))
        .route("/listings/approved", get(routes::listings::list_approved))
        .route("/listings/my", get(routes::listings::list_my))
        .route("/listings/:listing_id", put(routes::listings::update_listing))
        // Admin moderation routes
        .route("/admin/listings", get(routes::admin::list_listings))
        .route(
            "/admin/listings/:listing_id/approve",
            put(routes::admin::approve_listing),
        )
        .route(
            "/admin/listings/:listing_id/reject",
            put(routes::admin::reject_listing),
        )
        .route(
            "/admin/listings/:listing_id",
            delete(routes::admin::delete_listing),
        )
        // Admin company management
        .route("/admin/companies", get(routes::companies::list_companies))
        .route(
            "/admin/companies/:company_id/active",
            put(routes::companies::set_company_active),
        )
        .route(
            "/admin/companies/:company_id",
            delete(routes::companies::delete_company),
        )
        // Notification routes
        .route("/notifications", get(routes::notifications::get_notifications))
        .route(
            "/notifications/unread-count",
            get(routes::notifications::get_unread_count),
        )
        .route(
            "/notifications/read-all",
            put(routes::notifications::mark_all_read),
        )
        .route(
            "/notifications/:notification_id",
            put(routes::notifications::mark_notification_read),
        )
        // Contact routes
        .route("/contact", post(routes::contact::submit_message))
        .route(
            "/admin/contact-messages",
            get(routes::contact::list_messages),
        )
        .route(
            "/admin/contact-messages/:message_id/read",
            put(routes::contact::mark_message_read),
        )
        .route(
            "/admin/contact-messages/:message_id",
            delete(routes::contact::delete_message),
        )
        // Blog routes
        .route("/blog", get(routes::blog::list_posts))
        .route("/blog/:post_id", get(routes::blog::get_post))
        .route("/admin/blog", post(routes::blog::create_post))
        .route(
            "/admin/blog/:post_id",
            put(routes::blog::update_post).delete(routes::blog::delete_post),
        )
        // Stored uploads
        .route("/uploads/:file_name", get(routes::uploads::serve_upload))
        .with_state(state)
        .layer(cors_layer())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::PATCH,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}

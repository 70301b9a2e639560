pub mod album;
pub mod assets;
pub mod auth;
pub mod events;
pub mod home;
pub mod members;
pub mod nights;
pub mod uploads;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The full application router.
pub fn app(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes();

    Router::new()
        .route("/", get(home::index))
        .route("/album", get(album::album_page))
        .route("/assets/{*path}", get(assets::serve))
        .route("/uploads/{*path}", get(uploads::serve))
        .merge(auth::router())
        .merge(events::router(upload_limit))
        .merge(members::router())
        .merge(nights::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

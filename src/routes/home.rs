use askama::Template;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::db::models::Event;
use crate::error::AppResult;
use crate::extractors::MaybeUser;
use crate::state::AppState;
use crate::view;

pub struct EventCard {
    pub id: String,
    pub title: String,
    pub date: String,
    pub has_cover: bool,
    pub cover: String,
}

impl From<Event> for EventCard {
    fn from(event: Event) -> Self {
        let cover = event.photos.into_iter().next();
        Self {
            id: event.id,
            title: event.title,
            date: view::date_label(event.date),
            has_cover: cover.is_some(),
            cover: cover.unwrap_or_default(),
        }
    }
}

#[derive(Template)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub signed_in: bool,
    pub events: Vec<EventCard>,
}

/// Wrapper to render askama templates as axum responses
pub struct Html<T: Template>(pub T);

impl<T: Template> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Template render error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

/// Recent events, newest first
pub async fn index(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
) -> AppResult<Html<HomeTemplate>> {
    let events = state
        .store
        .list_events()
        .await?
        .into_iter()
        .map(EventCard::from)
        .collect();

    Ok(Html(HomeTemplate {
        signed_in: maybe_user.signed_in(),
        events,
    }))
}

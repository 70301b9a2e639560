use askama::Template;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;

use crate::db::models::{EventDraft, Member};
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::routes::home::Html;
use crate::state::AppState;
use crate::tally::AttendanceStatus;
use crate::view;

// --- View structs ---

pub struct AttendeeRow {
    pub member_id: String,
    pub name: String,
    pub status: String,
    pub present: bool,
}

// --- Templates ---

#[derive(Template)]
#[template(path = "pages/event_form.html")]
pub struct EventFormTemplate {
    pub signed_in: bool,
    pub heading: String,
    pub action: String,
    pub submit_label: String,
    pub title: String,
    pub date: String,
    pub description: String,
}

#[derive(Template)]
#[template(path = "pages/event.html")]
pub struct EventTemplate {
    pub signed_in: bool,
    pub id: String,
    pub title: String,
    pub date: String,
    pub description: String,
    pub photos: Vec<String>,
    pub attendees: Vec<AttendeeRow>,
    pub unregistered: Vec<Member>,
}

// --- Forms ---

#[derive(Deserialize)]
pub struct EventForm {
    pub title: String,
    pub date: String,
    #[serde(default)]
    pub description: String,
}

impl EventForm {
    fn into_draft(self) -> AppResult<EventDraft> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::BadRequest("Title is required".into()));
        }
        let date = view::parse_form_date(&self.date)
            .ok_or_else(|| AppError::BadRequest("A valid date is required".into()))?;
        let description = Some(self.description.trim().to_string()).filter(|d| !d.is_empty());

        Ok(EventDraft {
            title,
            date,
            description,
        })
    }
}

#[derive(Deserialize)]
pub struct AttendeeForm {
    pub member_id: String,
}

// --- Router ---

pub fn router(upload_limit: usize) -> Router<AppState> {
    Router::new()
        .route("/events/new", get(new_event_page).post(create_event))
        .route("/events/{id}", get(event_page))
        .route("/events/{id}/edit", get(edit_event_page).post(update_event))
        .route("/events/{id}/delete", post(delete_event))
        .route(
            "/events/{id}/photos",
            post(upload_photo).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/events/{id}/attendance", post(register_attendee))
        .route(
            "/events/{id}/attendance/{member_id}/toggle",
            post(toggle_attendance),
        )
        .route(
            "/events/{id}/attendance/{member_id}/delete",
            post(remove_attendee),
        )
}

fn event_url(id: &str) -> String {
    format!("/events/{}", id)
}

// --- Handlers ---

async fn new_event_page(MaybeUser(user): MaybeUser) -> Response {
    if user.is_none() {
        return Redirect::to("/login").into_response();
    }

    Html(EventFormTemplate {
        signed_in: true,
        heading: "Criar Novo Evento".to_string(),
        action: "/events/new".to_string(),
        submit_label: "Guardar Evento".to_string(),
        title: String::new(),
        date: String::new(),
        description: String::new(),
    })
    .into_response()
}

async fn create_event(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<EventForm>,
) -> AppResult<Response> {
    let draft = form.into_draft()?;
    let event = state.store.create_event(&draft, Some(&user.id)).await?;
    Ok(Redirect::to(&event_url(&event.id)).into_response())
}

async fn event_page(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    Path(id): Path<String>,
) -> AppResult<Html<EventTemplate>> {
    let event = state.store.get_event(&id).await?;
    let members = state.store.list_members().await?;
    let attendance = state.store.list_attendance(&id).await?;

    // Roster order; members without a row go to the "add" picker
    let mut attendees = Vec::new();
    let mut unregistered = Vec::new();
    for member in members {
        match attendance.iter().find(|a| a.member_id == member.id) {
            Some(entry) => attendees.push(AttendeeRow {
                member_id: member.id,
                name: member.name,
                status: entry.status.label().to_string(),
                present: entry.status.is_present(),
            }),
            None => unregistered.push(member),
        }
    }

    Ok(Html(EventTemplate {
        signed_in: maybe_user.signed_in(),
        id: event.id,
        title: event.title,
        date: view::date_label(event.date),
        description: event
            .description
            .unwrap_or_else(|| "Sem descrição.".to_string()),
        photos: event.photos,
        attendees,
        unregistered,
    }))
}

async fn edit_event_page(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    if user.is_none() {
        return Ok(Redirect::to("/login").into_response());
    }
    let event = state.store.get_event(&id).await?;

    Ok(Html(EventFormTemplate {
        signed_in: true,
        heading: "Editar Evento".to_string(),
        action: format!("/events/{}/edit", event.id),
        submit_label: "Guardar Alterações".to_string(),
        title: event.title,
        date: view::form_date(event.date),
        description: event.description.unwrap_or_default(),
    })
    .into_response())
}

async fn update_event(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
    Form(form): Form<EventForm>,
) -> AppResult<Response> {
    let draft = form.into_draft()?;
    state.store.update_event(&id, &draft).await?;
    Ok(Redirect::to(&event_url(&id)).into_response())
}

async fn delete_event(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    state.store.delete_event(&id).await?;

    if let Err(e) = state.photos.remove_event_dir(&id).await {
        tracing::warn!(event_id = %id, "Could not remove event photos: {}", e);
    }

    Ok(Redirect::to("/").into_response())
}

async fn upload_photo(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> AppResult<Response> {
    // 404 before touching the disk
    state.store.get_event(&id).await?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("photo") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("photo").to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let url = state
            .photos
            .upload(&id, &file_name, content_type.as_deref(), &data)
            .await?;
        state.store.append_event_photo(&id, &url).await?;

        return Ok(Redirect::to(&event_url(&id)).into_response());
    }

    Err(AppError::BadRequest("No photo in upload".into()))
}

/// Add a roster member to the event as absent
async fn register_attendee(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
    Form(form): Form<AttendeeForm>,
) -> AppResult<Response> {
    state
        .store
        .set_attendance(&id, &form.member_id, AttendanceStatus::Absent)
        .await?;
    Ok(Redirect::to(&event_url(&id)).into_response())
}

async fn toggle_attendance(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path((id, member_id)): Path<(String, String)>,
) -> AppResult<Response> {
    let current = state
        .store
        .list_attendance(&id)
        .await?
        .into_iter()
        .find(|a| a.member_id == member_id)
        .map(|a| a.status)
        .unwrap_or(AttendanceStatus::Unregistered);

    state
        .store
        .set_attendance(&id, &member_id, current.toggled())
        .await?;
    Ok(Redirect::to(&event_url(&id)).into_response())
}

async fn remove_attendee(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path((id, member_id)): Path<(String, String)>,
) -> AppResult<Response> {
    state
        .store
        .set_attendance(&id, &member_id, AttendanceStatus::Unregistered)
        .await?;
    Ok(Redirect::to(&event_url(&id)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(title: &str, date: &str, description: &str) -> EventForm {
        EventForm {
            title: title.to_string(),
            date: date.to_string(),
            description: description.to_string(),
        }
    }

    #[test]
    fn draft_requires_title_and_date() {
        assert!(matches!(
            form("  ", "2025-01-01", "").into_draft(),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            form("Jantar", "amanhã", "").into_draft(),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn draft_trims_and_drops_blank_description() {
        let draft = form(" Jantar ", "2025-01-01", "   ").into_draft().unwrap();
        assert_eq!(draft.title, "Jantar");
        assert_eq!(draft.description, None);
        assert_eq!(view::form_date(draft.date), "2025-01-01");
    }
}

use askama::Template;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;

use crate::db::models::{EventAttendance, Member};
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::routes::home::Html;
use crate::state::AppState;
use crate::tally::{self, AttendanceSummary};
use crate::view;

// --- View structs ---

pub struct MemberCard {
    pub id: String,
    pub name: String,
    pub initials: String,
    pub background: String,
    pub foreground: String,
}

impl From<Member> for MemberCard {
    fn from(member: Member) -> Self {
        let (background, foreground) = view::avatar_colors(&member.name);
        Self {
            initials: view::initials(&member.name),
            background: background.to_string(),
            foreground: foreground.to_string(),
            id: member.id,
            name: member.name,
        }
    }
}

pub struct HistoryRow {
    pub event_id: String,
    pub title: String,
    pub date: String,
    pub status: String,
    pub present: bool,
}

pub struct RankingRow {
    pub badge: String,
    pub member: MemberCard,
    pub present: u64,
    pub percentage: u32,
    pub streak: usize,
}

// --- Templates ---

#[derive(Template)]
#[template(path = "pages/members.html")]
pub struct MembersTemplate {
    pub signed_in: bool,
    pub members: Vec<MemberCard>,
}

#[derive(Template)]
#[template(path = "pages/profile.html")]
pub struct ProfileTemplate {
    pub signed_in: bool,
    pub member: MemberCard,
    pub summary: AttendanceSummary,
    pub history: Vec<HistoryRow>,
}

#[derive(Template)]
#[template(path = "pages/ranking.html")]
pub struct RankingTemplate {
    pub signed_in: bool,
    pub total_events: usize,
    pub rows: Vec<RankingRow>,
}

// --- Forms ---

#[derive(Deserialize)]
pub struct MemberForm {
    pub name: String,
}

impl MemberForm {
    fn name(&self) -> AppResult<&str> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest("Name is required".into()));
        }
        Ok(name)
    }
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/members", get(members_page).post(add_member))
        .route("/members/{id}", get(profile_page))
        .route("/members/{id}/rename", post(rename_member))
        .route("/members/{id}/delete", post(delete_member))
        .route("/ranking", get(ranking_page))
}

// --- Handlers ---

async fn members_page(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
) -> AppResult<Response> {
    if user.is_none() {
        return Ok(Redirect::to("/login").into_response());
    }

    let members = state
        .store
        .list_members()
        .await?
        .into_iter()
        .map(MemberCard::from)
        .collect();

    Ok(Html(MembersTemplate {
        signed_in: true,
        members,
    })
    .into_response())
}

async fn add_member(
    State(state): State<AppState>,
    _user: CurrentUser,
    Form(form): Form<MemberForm>,
) -> AppResult<Response> {
    state.store.create_member(form.name()?).await?;
    Ok(Redirect::to("/members").into_response())
}

async fn rename_member(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
    Form(form): Form<MemberForm>,
) -> AppResult<Response> {
    state.store.rename_member(&id, form.name()?).await?;
    Ok(Redirect::to("/members").into_response())
}

async fn delete_member(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    state.store.delete_member(&id).await?;
    Ok(Redirect::to("/members").into_response())
}

/// Every event counts, including the ones the member was never registered for.
fn history_for(member_id: &str, events: &[EventAttendance]) -> Vec<HistoryRow> {
    events
        .iter()
        .map(|ea| {
            let status = ea.to_tally().status_of(member_id);
            HistoryRow {
                event_id: ea.event.id.clone(),
                title: ea.event.title.clone(),
                date: view::date_label(ea.event.date),
                status: status.label().to_string(),
                present: status.is_present(),
            }
        })
        .collect()
}

async fn profile_page(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    Path(id): Path<String>,
) -> AppResult<Html<ProfileTemplate>> {
    let member = state.store.get_member(&id).await?;
    let events = state.store.events_with_attendance().await?;
    let tallies: Vec<_> = events.iter().map(EventAttendance::to_tally).collect();

    Ok(Html(ProfileTemplate {
        signed_in: maybe_user.signed_in(),
        summary: tally::summarize(&member.id, &tallies),
        history: history_for(&member.id, &events),
        member: MemberCard::from(member),
    }))
}

async fn ranking_page(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
) -> AppResult<Html<RankingTemplate>> {
    let members = state.store.list_members().await?;
    let events = state.store.events_with_attendance().await?;
    let tallies: Vec<_> = events.iter().map(EventAttendance::to_tally).collect();

    let roster: Vec<String> = members.iter().map(|m| m.id.clone()).collect();
    let rows = tally::leaderboard(&roster, &tallies)
        .into_iter()
        .enumerate()
        .filter_map(|(index, standing)| {
            let member = members.iter().find(|m| m.id == standing.subject)?.clone();
            let summary = tally::summarize(&standing.subject, &tallies);
            Some(RankingRow {
                badge: tally::rank_badge(index),
                member: MemberCard::from(member),
                present: standing.total,
                percentage: summary.percentage,
                streak: summary.streak,
            })
        })
        .collect();

    Ok(Html(RankingTemplate {
        signed_in: maybe_user.signed_in(),
        total_events: tallies.len(),
        rows,
    }))
}

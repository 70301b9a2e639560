use askama::Template;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use chrono::Local;
use serde::Deserialize;

use crate::db::models::{FunStat, Member, NightOutEntries};
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::routes::home::Html;
use crate::state::AppState;
use crate::tally;
use crate::view;

// --- View structs ---

pub struct DrinkStanding {
    pub badge: String,
    pub name: String,
    pub drinks: u64,
}

pub struct MemberDrinks {
    pub member_id: String,
    pub name: String,
    pub drinks: u32,
}

pub struct NightCard {
    pub id: String,
    pub title: String,
    pub date: String,
    pub total_drinks: u64,
    pub members: Vec<MemberDrinks>,
}

// --- Templates ---

#[derive(Template)]
#[template(path = "pages/nights.html")]
pub struct NightsTemplate {
    pub signed_in: bool,
    pub nobody_drank: bool,
    pub standings: Vec<DrinkStanding>,
    pub nights: Vec<NightCard>,
    pub fun_stats: Vec<FunStat>,
}

// --- Forms ---

#[derive(Deserialize)]
pub struct NightForm {
    pub title: String,
    #[serde(default)]
    pub date: String,
}

#[derive(Deserialize)]
pub struct DrinksForm {
    pub member_id: String,
    pub delta: i64,
}

#[derive(Deserialize)]
pub struct FunStatForm {
    pub key: String,
    pub delta: i64,
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/nights", get(nights_page).post(create_night))
        .route("/nights/{id}/delete", post(delete_night))
        .route("/nights/{id}/drinks", post(adjust_drinks))
        .route("/fun-stats", post(adjust_fun_stat))
}

// --- Helpers ---

fn drink_standings(members: &[Member], nights: &[NightOutEntries]) -> Vec<DrinkStanding> {
    let roster: Vec<String> = members.iter().map(|m| m.id.clone()).collect();
    let tallies: Vec<_> = nights.iter().map(NightOutEntries::to_tally).collect();

    tally::leaderboard(&roster, &tallies)
        .into_iter()
        .enumerate()
        .filter_map(|(index, standing)| {
            let member = members.iter().find(|m| m.id == standing.subject)?;
            Some(DrinkStanding {
                badge: tally::rank_badge(index),
                name: member.name.clone(),
                drinks: standing.total,
            })
        })
        .collect()
}

/// Every current member gets a counter, even if they joined after the night.
fn night_card(members: &[Member], night: &NightOutEntries) -> NightCard {
    NightCard {
        id: night.night.id.clone(),
        title: night.night.title.clone(),
        date: view::date_label(night.night.date),
        total_drinks: night.total_drinks(),
        members: members
            .iter()
            .map(|m| MemberDrinks {
                member_id: m.id.clone(),
                name: m.name.clone(),
                drinks: night.drinks_for(&m.id),
            })
            .collect(),
    }
}

// --- Handlers ---

async fn nights_page(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
) -> AppResult<Html<NightsTemplate>> {
    let members = state.store.list_members().await?;
    let nights = state.store.list_night_outs_with_entries().await?;
    let fun_stats = state.store.list_fun_stats().await?;

    let standings = drink_standings(&members, &nights);
    let nobody_drank = standings.iter().all(|s| s.drinks == 0);

    Ok(Html(NightsTemplate {
        signed_in: maybe_user.signed_in(),
        nobody_drank,
        standings,
        nights: nights.iter().map(|n| night_card(&members, n)).collect(),
        fun_stats,
    }))
}

async fn create_night(
    State(state): State<AppState>,
    _user: CurrentUser,
    Form(form): Form<NightForm>,
) -> AppResult<Response> {
    let title = form.title.trim();
    if title.is_empty() {
        return Err(AppError::BadRequest("Title is required".into()));
    }
    let date = if form.date.trim().is_empty() {
        Local::now().date_naive()
    } else {
        view::parse_form_date(&form.date)
            .ok_or_else(|| AppError::BadRequest("Invalid date".into()))?
    };

    state.store.create_night_out(title, date).await?;
    Ok(Redirect::to("/nights").into_response())
}

async fn delete_night(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    state.store.delete_night_out(&id).await?;
    Ok(Redirect::to("/nights").into_response())
}

async fn adjust_drinks(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
    Form(form): Form<DrinksForm>,
) -> AppResult<Response> {
    let current = state.store.get_drinks(&id, &form.member_id).await?;
    let next = tally::clamp_drinks(current, form.delta);
    state.store.set_drinks(&id, &form.member_id, next).await?;
    Ok(Redirect::to("/nights").into_response())
}

async fn adjust_fun_stat(
    State(state): State<AppState>,
    _user: CurrentUser,
    Form(form): Form<FunStatForm>,
) -> AppResult<Response> {
    let key = form.key.trim();
    if key.is_empty() {
        return Err(AppError::BadRequest("Key is required".into()));
    }
    state.store.adjust_fun_stat(key, form.delta).await?;
    Ok(Redirect::to("/nights").into_response())
}

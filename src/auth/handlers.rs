use askama::Template;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;

use crate::auth::events::AuthEvent;
use crate::auth::{admins, session};
use crate::error::AppResult;
use crate::extractors::{cookie_value, MaybeUser};
use crate::routes::home::Html;
use crate::state::AppState;

// -- Templates --

#[derive(Template)]
#[template(path = "pages/login.html")]
pub struct LoginTemplate {
    pub signed_in: bool,
    pub email: String,
    pub error: String,
}

// -- Request types --

#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

// -- Cookie helpers --

fn session_cookie(name: &str, token: &str, max_age_hours: u64) -> String {
    let max_age_secs = max_age_hours * 3600;
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        name, token, max_age_secs
    )
}

fn clear_session_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", name)
}

// -- Handlers --

/// GET /login, signed-in admins go straight home
pub async fn login_page(MaybeUser(user): MaybeUser) -> AppResult<Response> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    Ok(Html(LoginTemplate {
        signed_in: false,
        email: String::new(),
        error: String::new(),
    })
    .into_response())
}

/// POST /login, check credentials and start a session
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let admin = admins::verify_credentials(&state.db, &form.email, &form.password)?;

    let Some(admin) = admin else {
        tracing::warn!("Failed login for {}", form.email.trim());
        let page = Html(LoginTemplate {
            signed_in: false,
            email: form.email,
            error: "Email ou password inválidos".to_string(),
        });
        return Ok((StatusCode::UNAUTHORIZED, page).into_response());
    };

    let hours = state.config.auth.session_hours;
    let token = session::create_session(&state.db, &admin.id, hours)?;
    state.auth_events.publish(AuthEvent::SignedIn {
        admin_id: admin.id,
        email: admin.email,
    });

    Ok((
        StatusCode::SEE_OTHER,
        [
            (
                header::SET_COOKIE,
                session_cookie(&state.config.auth.cookie_name, &token, hours),
            ),
            (header::LOCATION, "/".to_string()),
        ],
    )
        .into_response())
}

/// POST /logout, drop the session and clear the cookie
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    let cookie_name = &state.config.auth.cookie_name;

    if let Some(token) = cookie_value(&headers, cookie_name) {
        let admin = session::find_session(&state.db, token)?;
        session::delete_session(&state.db, token)?;
        state.auth_events.publish(AuthEvent::SignedOut {
            admin_id: admin.map(|a| a.admin_id),
        });
    }

    Ok((
        StatusCode::SEE_OTHER,
        [
            (header::SET_COOKIE, clear_session_cookie(cookie_name)),
            (header::LOCATION, "/login".to_string()),
        ],
    )
        .into_response())
}

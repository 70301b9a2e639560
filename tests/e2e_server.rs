/// E2E test against a real server instance bound to an ephemeral port
use abtracker::auth::admins;
use abtracker::config::Config;
use abtracker::db;
use abtracker::routes;
use abtracker::state::AppState;
use reqwest::{redirect, Client, StatusCode};
use tempfile::TempDir;

async fn spawn_server() -> (TempDir, AppState, String) {
    let dir = TempDir::new().unwrap();
    let pool = db::create_pool(&dir.path().join("e2e.db")).unwrap();
    db::run_migrations(&pool).unwrap();

    let mut config = Config::default();
    config.storage.path = Some(dir.path().join("uploads"));
    let state = AppState::new(pool, config);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let app = routes::app(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (dir, state, base_url)
}

#[tokio::test]
async fn test_admin_session_journey() {
    let (_dir, state, base_url) = spawn_server().await;
    admins::upsert_admin(&state.db, "admin@ab.pt", "segredo").unwrap();

    let client = Client::builder()
        .cookie_store(true)
        .redirect(redirect::Policy::none())
        .build()
        .unwrap();

    // Anonymous visitors see the login link and cannot manage members
    let home = client.get(&base_url).send().await.unwrap();
    assert_eq!(home.status(), StatusCode::OK);
    assert!(home.text().await.unwrap().contains("Admin Login"));

    let response = client
        .post(format!("{base_url}/members"))
        .form(&[("name", "Ana")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Sign in; the cookie store keeps the session
    let response = client
        .post(format!("{base_url}/login"))
        .form(&[("email", "admin@ab.pt"), ("password", "segredo")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = client
        .post(format!("{base_url}/members"))
        .form(&[("name", "Ana")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let members = client
        .get(format!("{base_url}/members"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(members.contains("Ana"));
    assert!(members.contains("Membros"));

    // Sign out drops the session again
    let response = client
        .post(format!("{base_url}/logout"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = client
        .get(format!("{base_url}/members"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

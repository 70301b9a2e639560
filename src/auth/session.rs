use rand::Rng;
use rusqlite::{params, OptionalExtension};

use crate::state::DbPool;
use crate::store::StoreResult;

/// Admin that owns a live session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionAdmin {
    pub admin_id: String,
    pub email: String,
}

/// Create a new session for an admin. Returns the session token.
pub fn create_session(pool: &DbPool, admin_id: &str, hours: u64) -> StoreResult<String> {
    let conn = pool.get()?;

    let token = generate_token();
    let id = uuid::Uuid::now_v7().to_string();

    conn.execute(
        "INSERT INTO sessions (id, admin_id, token, expires_at) VALUES (?1, ?2, ?3, datetime('now', ?4))",
        params![id, admin_id, token, format!("+{} hours", hours)],
    )?;

    Ok(token)
}

/// Look up the admin behind a session token, ignoring expired sessions.
pub fn find_session(pool: &DbPool, token: &str) -> StoreResult<Option<SessionAdmin>> {
    let conn = pool.get()?;
    let admin = conn
        .query_row(
            "SELECT a.id, a.email FROM sessions s
             JOIN admins a ON a.id = s.admin_id
             WHERE s.token = ?1 AND s.expires_at > datetime('now')",
            params![token],
            |row| {
                Ok(SessionAdmin {
                    admin_id: row.get(0)?,
                    email: row.get(1)?,
                })
            },
        )
        .optional()?;
    Ok(admin)
}

/// Delete a session by token.
pub fn delete_session(pool: &DbPool, token: &str) -> StoreResult<()> {
    let conn = pool.get()?;
    conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(())
}

/// Drop expired sessions. Returns how many were removed.
pub fn purge_expired(pool: &DbPool) -> StoreResult<usize> {
    let conn = pool.get()?;
    let removed = conn.execute(
        "DELETE FROM sessions WHERE expires_at <= datetime('now')",
        [],
    )?;
    Ok(removed)
}

/// Generate a cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(bytes)
}

use rusqlite::{params, OptionalExtension};

use crate::db::models::Admin;
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Create an admin, or reset the password of an existing one.
pub fn upsert_admin(pool: &DbPool, email: &str, password: &str) -> AppResult<Admin> {
    let email = normalize_email(email);
    if email.is_empty() || password.is_empty() {
        return Err(AppError::BadRequest("Email and password are required".into()));
    }

    let password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;
    let conn = pool.get()?;
    let id: String = conn.query_row(
        "INSERT INTO admins (id, email, password_hash) VALUES (?1, ?2, ?3)
         ON CONFLICT (email) DO UPDATE SET password_hash = excluded.password_hash
         RETURNING id",
        params![uuid::Uuid::now_v7().to_string(), email, password_hash],
        |row| row.get(0),
    )?;

    Ok(Admin {
        id,
        email,
        password_hash,
    })
}

/// Check credentials. `None` covers both unknown email and wrong password.
pub fn verify_credentials(pool: &DbPool, email: &str, password: &str) -> AppResult<Option<Admin>> {
    let conn = pool.get()?;
    let admin = conn
        .query_row(
            "SELECT id, email, password_hash FROM admins WHERE email = ?1",
            params![normalize_email(email)],
            |row| {
                Ok(Admin {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    password_hash: row.get(2)?,
                })
            },
        )
        .optional()?;

    Ok(admin.filter(|a| bcrypt::verify(password, &a.password_hash).unwrap_or(false)))
}

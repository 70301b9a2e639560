use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};

use crate::db::models::{
    AttendanceEntry, DrinkEntry, Event, EventAttendance, EventDraft, FunStat, Member, NightOut,
    NightOutEntries,
};
use crate::state::DbPool;
use crate::store::{RecordStore, StoreError, StoreResult};
use crate::tally::AttendanceStatus;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite implementation
pub struct SqliteRecordStore {
    pool: DbPool,
}

impl SqliteRecordStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn status_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<AttendanceStatus> {
    let raw: String = row.get(idx)?;
    AttendanceStatus::from_stored(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unknown attendance status {raw:?}").into(),
        )
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

/// Photo URLs of every event, each list in upload order.
fn load_photos(conn: &Connection) -> StoreResult<HashMap<String, Vec<String>>> {
    let mut stmt =
        conn.prepare("SELECT event_id, url FROM event_photos ORDER BY event_id, position")?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

    let mut photos: HashMap<String, Vec<String>> = HashMap::new();
    for row in rows {
        let (event_id, url) = row?;
        photos.entry(event_id).or_default().push(url);
    }
    Ok(photos)
}

fn query_events(conn: &Connection) -> StoreResult<Vec<Event>> {
    let mut photos = load_photos(conn)?;
    let mut stmt = conn.prepare(
        "SELECT id, title, event_date, description FROM events
         ORDER BY event_date DESC, id DESC",
    )?;
    let events = stmt
        .query_map([], |row| {
            Ok(Event {
                id: row.get(0)?,
                title: row.get(1)?,
                date: date_column(row, 2)?,
                description: row.get(3)?,
                photos: Vec::new(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|mut event| {
            event.photos = photos.remove(&event.id).unwrap_or_default();
            event
        })
        .collect();
    Ok(events)
}

fn ensure_exists(conn: &Connection, table: &str, id: &str) -> StoreResult<()> {
    // table names are crate constants, never user input
    let sql = format!("SELECT COUNT(*) > 0 FROM {table} WHERE id = ?1");
    let exists: bool = conn.query_row(&sql, params![id], |row| row.get(0))?;
    if exists {
        Ok(())
    } else {
        Err(StoreError::NotFound(format!("{table} {id}")))
    }
}

fn clean_description(description: &Option<String>) -> Option<&str> {
    description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn list_events(&self) -> StoreResult<Vec<Event>> {
        let conn = self.pool.get()?;
        query_events(&conn)
    }

    async fn get_event(&self, id: &str) -> StoreResult<Event> {
        let conn = self.pool.get()?;
        let mut event = conn
            .query_row(
                "SELECT id, title, event_date, description FROM events WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Event {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        date: date_column(row, 2)?,
                        description: row.get(3)?,
                        photos: Vec::new(),
                    })
                },
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("event {id}")))?;

        let mut stmt =
            conn.prepare("SELECT url FROM event_photos WHERE event_id = ?1 ORDER BY position")?;
        event.photos = stmt
            .query_map(params![id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(event)
    }

    async fn create_event(
        &self,
        draft: &EventDraft,
        created_by: Option<&str>,
    ) -> StoreResult<Event> {
        let conn = self.pool.get()?;
        let id = new_id();
        let description = clean_description(&draft.description);
        conn.execute(
            "INSERT INTO events (id, title, event_date, description, created_by)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id,
                draft.title.trim(),
                draft.date.format(DATE_FORMAT).to_string(),
                description,
                created_by
            ],
        )?;

        tracing::info!(event_id = %id, "Created event {:?}", draft.title);
        Ok(Event {
            id,
            title: draft.title.trim().to_string(),
            date: draft.date,
            description: description.map(str::to_string),
            photos: Vec::new(),
        })
    }

    async fn update_event(&self, id: &str, draft: &EventDraft) -> StoreResult<()> {
        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE events SET title = ?2, event_date = ?3, description = ?4 WHERE id = ?1",
            params![
                id,
                draft.title.trim(),
                draft.date.format(DATE_FORMAT).to_string(),
                clean_description(&draft.description)
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("event {id}")));
        }
        Ok(())
    }

    async fn delete_event(&self, id: &str) -> StoreResult<()> {
        let conn = self.pool.get()?;
        let changed = conn.execute("DELETE FROM events WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("event {id}")));
        }
        tracing::info!(event_id = %id, "Deleted event");
        Ok(())
    }

    async fn append_event_photo(&self, id: &str, url: &str) -> StoreResult<()> {
        let conn = self.pool.get()?;
        ensure_exists(&conn, "events", id)?;
        conn.execute(
            "INSERT INTO event_photos (id, event_id, url, position)
             VALUES (?1, ?2, ?3,
                     (SELECT COALESCE(MAX(position) + 1, 0) FROM event_photos WHERE event_id = ?2))",
            params![new_id(), id, url],
        )?;
        Ok(())
    }

    async fn list_events_with_photos(&self) -> StoreResult<Vec<Event>> {
        let conn = self.pool.get()?;
        Ok(query_events(&conn)?
            .into_iter()
            .filter(|event| !event.photos.is_empty())
            .collect())
    }

    async fn list_members(&self) -> StoreResult<Vec<Member>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare("SELECT id, name FROM members ORDER BY name, id")?;
        let members = stmt
            .query_map([], |row| {
                Ok(Member {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(members)
    }

    async fn get_member(&self, id: &str) -> StoreResult<Member> {
        let conn = self.pool.get()?;
        conn.query_row(
            "SELECT id, name FROM members WHERE id = ?1",
            params![id],
            |row| {
                Ok(Member {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| StoreError::NotFound(format!("member {id}")))
    }

    async fn create_member(&self, name: &str) -> StoreResult<Member> {
        let conn = self.pool.get()?;
        let member = Member {
            id: new_id(),
            name: name.trim().to_string(),
        };
        conn.execute(
            "INSERT INTO members (id, name) VALUES (?1, ?2)",
            params![member.id, member.name],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Conflict(format!("member {:?} already exists", member.name))
            } else {
                StoreError::Sql(e)
            }
        })?;

        tracing::info!(member_id = %member.id, "Added member {:?}", member.name);
        Ok(member)
    }

    async fn rename_member(&self, id: &str, name: &str) -> StoreResult<()> {
        let conn = self.pool.get()?;
        let name = name.trim();
        let changed = conn
            .execute(
                "UPDATE members SET name = ?2 WHERE id = ?1",
                params![id, name],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Conflict(format!("member {name:?} already exists"))
                } else {
                    StoreError::Sql(e)
                }
            })?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("member {id}")));
        }
        Ok(())
    }

    async fn delete_member(&self, id: &str) -> StoreResult<()> {
        let conn = self.pool.get()?;
        let changed = conn.execute("DELETE FROM members WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("member {id}")));
        }
        tracing::info!(member_id = %id, "Removed member");
        Ok(())
    }

    async fn list_attendance(&self, event_id: &str) -> StoreResult<Vec<AttendanceEntry>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT a.event_id, a.member_id, a.status FROM attendance a
             JOIN members m ON m.id = a.member_id
             WHERE a.event_id = ?1
             ORDER BY m.name",
        )?;
        let entries = stmt
            .query_map(params![event_id], |row| {
                Ok(AttendanceEntry {
                    event_id: row.get(0)?,
                    member_id: row.get(1)?,
                    status: status_column(row, 2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    async fn set_attendance(
        &self,
        event_id: &str,
        member_id: &str,
        status: AttendanceStatus,
    ) -> StoreResult<()> {
        let conn = self.pool.get()?;
        ensure_exists(&conn, "events", event_id)?;
        ensure_exists(&conn, "members", member_id)?;

        match status.as_stored() {
            Some(stored) => {
                conn.execute(
                    "INSERT INTO attendance (id, event_id, member_id, status)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT (event_id, member_id) DO UPDATE SET status = excluded.status",
                    params![new_id(), event_id, member_id, stored],
                )?;
            }
            None => {
                conn.execute(
                    "DELETE FROM attendance WHERE event_id = ?1 AND member_id = ?2",
                    params![event_id, member_id],
                )?;
            }
        }
        Ok(())
    }

    async fn events_with_attendance(&self) -> StoreResult<Vec<EventAttendance>> {
        let conn = self.pool.get()?;
        let events = query_events(&conn)?;

        let mut stmt = conn.prepare("SELECT event_id, member_id, status FROM attendance")?;
        let mut by_event: HashMap<String, Vec<AttendanceEntry>> = HashMap::new();
        for entry in stmt.query_map([], |row| {
            Ok(AttendanceEntry {
                event_id: row.get(0)?,
                member_id: row.get(1)?,
                status: status_column(row, 2)?,
            })
        })? {
            let entry = entry?;
            by_event.entry(entry.event_id.clone()).or_default().push(entry);
        }

        Ok(events
            .into_iter()
            .map(|event| {
                let entries = by_event.remove(&event.id).unwrap_or_default();
                EventAttendance { event, entries }
            })
            .collect())
    }

    async fn list_night_outs_with_entries(&self) -> StoreResult<Vec<NightOutEntries>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(
            "SELECT id, title, night_date FROM night_outs ORDER BY night_date DESC, id DESC",
        )?;
        let nights = stmt
            .query_map([], |row| {
                Ok(NightOut {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    date: date_column(row, 2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt =
            conn.prepare("SELECT night_out_id, member_id, drinks FROM drink_entries")?;
        let mut by_night: HashMap<String, Vec<DrinkEntry>> = HashMap::new();
        for entry in stmt.query_map([], |row| {
            Ok(DrinkEntry {
                night_out_id: row.get(0)?,
                member_id: row.get(1)?,
                drinks: row.get(2)?,
            })
        })? {
            let entry = entry?;
            by_night
                .entry(entry.night_out_id.clone())
                .or_default()
                .push(entry);
        }

        Ok(nights
            .into_iter()
            .map(|night| {
                let entries = by_night.remove(&night.id).unwrap_or_default();
                NightOutEntries { night, entries }
            })
            .collect())
    }

    async fn create_night_out(&self, title: &str, date: NaiveDate) -> StoreResult<NightOut> {
        let mut conn = self.pool.get()?;
        let night = NightOut {
            id: new_id(),
            title: title.trim().to_string(),
            date,
        };

        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO night_outs (id, title, night_date) VALUES (?1, ?2, ?3)",
            params![night.id, night.title, date.format(DATE_FORMAT).to_string()],
        )?;
        let member_ids: Vec<String> = {
            let mut stmt = tx.prepare("SELECT id FROM members ORDER BY name")?;
            let ids = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            ids
        };
        for member_id in &member_ids {
            tx.execute(
                "INSERT INTO drink_entries (id, night_out_id, member_id, drinks) VALUES (?1, ?2, ?3, 0)",
                params![new_id(), night.id, member_id],
            )?;
        }
        tx.commit()?;

        tracing::info!(
            night_out_id = %night.id,
            members = member_ids.len(),
            "Created night out {:?}",
            night.title
        );
        Ok(night)
    }

    async fn delete_night_out(&self, id: &str) -> StoreResult<()> {
        let conn = self.pool.get()?;
        let changed = conn.execute("DELETE FROM night_outs WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("night out {id}")));
        }
        Ok(())
    }

    async fn get_drinks(&self, night_out_id: &str, member_id: &str) -> StoreResult<u32> {
        let conn = self.pool.get()?;
        let drinks: Option<u32> = conn
            .query_row(
                "SELECT drinks FROM drink_entries WHERE night_out_id = ?1 AND member_id = ?2",
                params![night_out_id, member_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(drinks.unwrap_or(0))
    }

    async fn set_drinks(
        &self,
        night_out_id: &str,
        member_id: &str,
        drinks: u32,
    ) -> StoreResult<()> {
        let conn = self.pool.get()?;
        ensure_exists(&conn, "night_outs", night_out_id)?;
        ensure_exists(&conn, "members", member_id)?;
        conn.execute(
            "INSERT INTO drink_entries (id, night_out_id, member_id, drinks)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (night_out_id, member_id) DO UPDATE SET drinks = excluded.drinks",
            params![new_id(), night_out_id, member_id, drinks],
        )?;
        Ok(())
    }

    async fn list_fun_stats(&self) -> StoreResult<Vec<FunStat>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare("SELECT key, value FROM fun_stats ORDER BY key")?;
        let stats = stmt
            .query_map([], |row| {
                Ok(FunStat {
                    key: row.get(0)?,
                    value: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(stats)
    }

    async fn adjust_fun_stat(&self, key: &str, delta: i64) -> StoreResult<i64> {
        let conn = self.pool.get()?;
        let value = conn.query_row(
            "INSERT INTO fun_stats (key, value) VALUES (?1, ?2)
             ON CONFLICT (key) DO UPDATE SET value = value + excluded.value
             RETURNING value",
            params![key.trim(), delta],
            |row| row.get(0),
        )?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn store() -> SqliteRecordStore {
        let pool = db::create_memory_pool().unwrap();
        db::run_migrations(&pool).unwrap();
        SqliteRecordStore::new(pool)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn draft(title: &str, day: NaiveDate) -> EventDraft {
        EventDraft {
            title: title.to_string(),
            date: day,
            description: None,
        }
    }

    #[tokio::test]
    async fn events_list_newest_first() {
        let store = store();
        store.create_event(&draft("Old", date(2024, 1, 1)), None).await.unwrap();
        store.create_event(&draft("New", date(2025, 6, 1)), None).await.unwrap();
        store.create_event(&draft("Mid", date(2024, 8, 1)), None).await.unwrap();

        let titles: Vec<String> = store
            .list_events()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles, vec!["New", "Mid", "Old"]);
    }

    #[tokio::test]
    async fn blank_description_is_stored_as_none() {
        let store = store();
        let mut d = draft("Jantar", date(2025, 1, 1));
        d.description = Some("   ".into());
        let event = store.create_event(&d, None).await.unwrap();
        assert_eq!(store.get_event(&event.id).await.unwrap().description, None);
    }

    #[tokio::test]
    async fn photos_keep_upload_order() {
        let store = store();
        let event = store.create_event(&draft("Praia", date(2025, 7, 1)), None).await.unwrap();
        store.append_event_photo(&event.id, "/uploads/a.jpg").await.unwrap();
        store.append_event_photo(&event.id, "/uploads/b.jpg").await.unwrap();

        let photos = store.get_event(&event.id).await.unwrap().photos;
        assert_eq!(photos, vec!["/uploads/a.jpg", "/uploads/b.jpg"]);
    }

    #[tokio::test]
    async fn missing_event_is_not_found() {
        let store = store();
        assert!(matches!(
            store.get_event("nope").await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.append_event_photo("nope", "/x.jpg").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_member_name_conflicts() {
        let store = store();
        store.create_member("Ana").await.unwrap();
        assert!(matches!(
            store.create_member(" Ana ").await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn unregistered_removes_the_attendance_row() {
        let store = store();
        let event = store.create_event(&draft("Jantar", date(2025, 1, 1)), None).await.unwrap();
        let ana = store.create_member("Ana").await.unwrap();

        store
            .set_attendance(&event.id, &ana.id, AttendanceStatus::Absent)
            .await
            .unwrap();
        store
            .set_attendance(&event.id, &ana.id, AttendanceStatus::Present)
            .await
            .unwrap();
        let entries = store.list_attendance(&event.id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, AttendanceStatus::Present);

        store
            .set_attendance(&event.id, &ana.id, AttendanceStatus::Unregistered)
            .await
            .unwrap();
        assert!(store.list_attendance(&event.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fun_stats_accumulate() {
        let store = store();
        assert_eq!(store.adjust_fun_stat("vomitos", 1).await.unwrap(), 1);
        assert_eq!(store.adjust_fun_stat("vomitos", 2).await.unwrap(), 3);
        assert_eq!(store.adjust_fun_stat("quedas", -1).await.unwrap(), -1);

        let stats = store.list_fun_stats().await.unwrap();
        assert_eq!(
            stats,
            vec![
                FunStat { key: "quedas".into(), value: -1 },
                FunStat { key: "vomitos".into(), value: 3 },
            ]
        );
    }
}

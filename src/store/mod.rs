// Record store - every read and write the pages issue goes through here
pub mod sqlite;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::db::models::{
    AttendanceEntry, Event, EventAttendance, EventDraft, FunStat, Member, NightOut,
    NightOutEntries,
};
use crate::tally::AttendanceStatus;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] r2d2::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Collection-style access to events, members, attendance, night outs and
/// fun stats. Lists come back fully fetched and already ordered.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All events, newest first.
    async fn list_events(&self) -> StoreResult<Vec<Event>>;

    async fn get_event(&self, id: &str) -> StoreResult<Event>;

    async fn create_event(&self, draft: &EventDraft, created_by: Option<&str>)
        -> StoreResult<Event>;

    async fn update_event(&self, id: &str, draft: &EventDraft) -> StoreResult<()>;

    /// Deletes the event with its attendance and photo rows.
    async fn delete_event(&self, id: &str) -> StoreResult<()>;

    /// Append a photo URL at the end of the event's photo list.
    async fn append_event_photo(&self, id: &str, url: &str) -> StoreResult<()>;

    /// Events with at least one photo, newest first.
    async fn list_events_with_photos(&self) -> StoreResult<Vec<Event>>;

    /// Roster ordered by name.
    async fn list_members(&self) -> StoreResult<Vec<Member>>;

    async fn get_member(&self, id: &str) -> StoreResult<Member>;

    /// Fails with `Conflict` when the name is already taken.
    async fn create_member(&self, name: &str) -> StoreResult<Member>;

    async fn rename_member(&self, id: &str, name: &str) -> StoreResult<()>;

    async fn delete_member(&self, id: &str) -> StoreResult<()>;

    async fn list_attendance(&self, event_id: &str) -> StoreResult<Vec<AttendanceEntry>>;

    /// Insert or update the (event, member) row. `Unregistered` removes it.
    async fn set_attendance(
        &self,
        event_id: &str,
        member_id: &str,
        status: AttendanceStatus,
    ) -> StoreResult<()>;

    /// Every event, newest first, with its attendance rows joined in.
    async fn events_with_attendance(&self) -> StoreResult<Vec<EventAttendance>>;

    /// Every night out, newest first, with its drink entries joined in.
    async fn list_night_outs_with_entries(&self) -> StoreResult<Vec<NightOutEntries>>;

    /// Creates the night out and a zero drink entry for every member.
    async fn create_night_out(&self, title: &str, date: NaiveDate) -> StoreResult<NightOut>;

    async fn delete_night_out(&self, id: &str) -> StoreResult<()>;

    /// Drinks recorded for a member, zero when there is no entry.
    async fn get_drinks(&self, night_out_id: &str, member_id: &str) -> StoreResult<u32>;

    /// Insert or update the (night out, member) entry.
    async fn set_drinks(&self, night_out_id: &str, member_id: &str, drinks: u32)
        -> StoreResult<()>;

    /// Counters ordered by key.
    async fn list_fun_stats(&self) -> StoreResult<Vec<FunStat>>;

    /// Add `delta` to a counter, creating it at zero first. Returns the new value.
    async fn adjust_fun_stat(&self, key: &str, delta: i64) -> StoreResult<i64>;
}

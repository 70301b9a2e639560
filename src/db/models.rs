use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::tally::{AttendanceStatus, TallyEvent};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    pub description: Option<String>,
    /// Public URLs in upload order.
    pub photos: Vec<String>,
}

/// Fields an admin fills in when creating or editing an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    pub title: String,
    pub date: NaiveDate,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceEntry {
    pub event_id: String,
    pub member_id: String,
    pub status: AttendanceStatus,
}

/// An event together with every attendance row recorded for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventAttendance {
    pub event: Event,
    pub entries: Vec<AttendanceEntry>,
}

impl EventAttendance {
    /// Entries keyed by member id, ready for the tally functions.
    pub fn to_tally(&self) -> TallyEvent<AttendanceStatus> {
        TallyEvent {
            id: self.event.id.clone(),
            entries: self
                .entries
                .iter()
                .map(|e| (e.member_id.clone(), e.status))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightOut {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrinkEntry {
    pub night_out_id: String,
    pub member_id: String,
    pub drinks: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NightOutEntries {
    pub night: NightOut,
    pub entries: Vec<DrinkEntry>,
}

impl NightOutEntries {
    pub fn total_drinks(&self) -> u64 {
        self.entries.iter().map(|e| u64::from(e.drinks)).sum()
    }

    pub fn to_tally(&self) -> TallyEvent<u32> {
        TallyEvent {
            id: self.night.id.clone(),
            entries: self
                .entries
                .iter()
                .map(|e| (e.member_id.clone(), e.drinks))
                .collect(),
        }
    }

    pub fn drinks_for(&self, member_id: &str) -> u32 {
        self.entries
            .iter()
            .find(|e| e.member_id == member_id)
            .map(|e| e.drinks)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunStat {
    pub key: String,
    pub value: i64,
}

#[derive(Debug, Clone)]
pub struct Admin {
    pub id: String,
    pub email: String,
    pub password_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn night(entries: &[(&str, u32)]) -> NightOutEntries {
        NightOutEntries {
            night: NightOut {
                id: "n1".into(),
                title: "Natal".into(),
                date: NaiveDate::from_ymd_opt(2025, 12, 20).unwrap(),
            },
            entries: entries
                .iter()
                .map(|(member, drinks)| DrinkEntry {
                    night_out_id: "n1".into(),
                    member_id: member.to_string(),
                    drinks: *drinks,
                })
                .collect(),
        }
    }

    #[test]
    fn total_drinks_sums_entries() {
        assert_eq!(night(&[("a", 3), ("b", 4)]).total_drinks(), 7);
        assert_eq!(night(&[]).total_drinks(), 0);
    }

    #[test]
    fn drinks_for_missing_member_is_zero() {
        let n = night(&[("a", 3)]);
        assert_eq!(n.drinks_for("a"), 3);
        assert_eq!(n.drinks_for("b"), 0);
    }
}

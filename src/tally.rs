//! Leaderboards, attendance percentages and streaks.
//!
//! Everything in here is pure: callers fetch the roster and the events from
//! the record store and hand them over already ordered. Events must be sorted
//! newest first for [`streak`] to mean "current streak".
//!
//! Entries whose subject is not in the roster are ignored by [`leaderboard`];
//! a subject only ranks if it is a current roster member.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Attendance of one member at one event.
///
/// Only `Present` and `Absent` are persisted. `Unregistered` stands for the
/// missing row and never reaches the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Present,
    Absent,
    Unregistered,
}

impl AttendanceStatus {
    pub const PRESENT: &'static str = "Presente";
    pub const ABSENT: &'static str = "Ausente";

    /// Parse a persisted status value.
    pub fn from_stored(value: &str) -> Option<Self> {
        match value {
            Self::PRESENT => Some(Self::Present),
            Self::ABSENT => Some(Self::Absent),
            _ => None,
        }
    }

    /// The value written to the store, `None` for `Unregistered`.
    pub fn as_stored(self) -> Option<&'static str> {
        match self {
            Self::Present => Some(Self::PRESENT),
            Self::Absent => Some(Self::ABSENT),
            Self::Unregistered => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Present => Self::PRESENT,
            Self::Absent => Self::ABSENT,
            Self::Unregistered => "Não Registado",
        }
    }

    /// Next status when an admin clicks the status button.
    /// Clicking an unregistered member marks them present.
    pub fn toggled(self) -> Self {
        match self {
            Self::Present => Self::Absent,
            Self::Absent | Self::Unregistered => Self::Present,
        }
    }

    pub fn is_present(self) -> bool {
        self == Self::Present
    }
}

/// A value that can be summed into a leaderboard.
pub trait TallyValue {
    /// Contribution to the subject's total.
    fn points(&self) -> u64;

    /// Whether this entry keeps a streak alive.
    fn is_positive(&self) -> bool;
}

impl TallyValue for AttendanceStatus {
    fn points(&self) -> u64 {
        u64::from(self.is_present())
    }

    fn is_positive(&self) -> bool {
        self.is_present()
    }
}

/// Drink counts.
impl TallyValue for u32 {
    fn points(&self) -> u64 {
        u64::from(*self)
    }

    fn is_positive(&self) -> bool {
        *self > 0
    }
}

/// One event (or night out) with its per-subject entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TallyEvent<V> {
    pub id: String,
    pub entries: Vec<(String, V)>,
}

impl<V> TallyEvent<V> {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entries: Vec::new(),
        }
    }

    pub fn with_entry(mut self, subject: impl Into<String>, value: V) -> Self {
        self.entries.push((subject.into(), value));
        self
    }

    /// First entry recorded for `subject`.
    pub fn value_for(&self, subject: &str) -> Option<&V> {
        self.entries
            .iter()
            .find(|(s, _)| s == subject)
            .map(|(_, v)| v)
    }
}

impl TallyEvent<AttendanceStatus> {
    pub fn status_of(&self, subject: &str) -> AttendanceStatus {
        self.value_for(subject)
            .copied()
            .unwrap_or(AttendanceStatus::Unregistered)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Standing {
    pub subject: String,
    pub total: u64,
}

/// Rank every roster subject by the sum of their values.
///
/// Sorted by total, highest first. The sort is stable so ties keep roster
/// order. Duplicate roster entries are collapsed onto the first occurrence.
pub fn leaderboard<V: TallyValue>(roster: &[String], events: &[TallyEvent<V>]) -> Vec<Standing> {
    let mut seen = HashSet::new();
    let mut standings: Vec<Standing> = roster
        .iter()
        .filter(|subject| seen.insert(subject.as_str()))
        .map(|subject| Standing {
            subject: subject.clone(),
            total: 0,
        })
        .collect();

    let index: HashMap<String, usize> = standings
        .iter()
        .enumerate()
        .map(|(i, s)| (s.subject.clone(), i))
        .collect();

    for event in events {
        for (subject, value) in &event.entries {
            if let Some(&i) = index.get(subject) {
                standings[i].total += value.points();
            }
        }
    }

    standings.sort_by(|a, b| b.total.cmp(&a.total));
    standings
}

/// `round(100 * positive / total)`, halves rounded up. Zero events is 0%.
pub fn percentage(positive: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let rounded = (200 * positive + total) / (2 * total);
    u32::try_from(rounded).unwrap_or(u32::MAX)
}

/// Consecutive positive entries counted from the newest event.
///
/// Stops at the first event where the subject is not positive, which includes
/// events with no entry for the subject at all.
pub fn streak<V: TallyValue>(subject: &str, events: &[TallyEvent<V>]) -> usize {
    events
        .iter()
        .take_while(|event| event.value_for(subject).is_some_and(TallyValue::is_positive))
        .count()
}

/// Attendance figures for one member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AttendanceSummary {
    pub total_events: usize,
    pub present: usize,
    pub streak: usize,
    pub percentage: u32,
}

pub fn summarize(subject: &str, events: &[TallyEvent<AttendanceStatus>]) -> AttendanceSummary {
    let present = events
        .iter()
        .filter(|event| event.status_of(subject).is_present())
        .count();

    AttendanceSummary {
        total_events: events.len(),
        present,
        streak: streak(subject, events),
        percentage: percentage(present, events.len()),
    }
}

/// Apply `delta` to a drink count without going below zero.
pub fn clamp_drinks(current: u32, delta: i64) -> u32 {
    let next = i64::from(current).saturating_add(delta);
    u32::try_from(next.max(0)).unwrap_or(u32::MAX)
}

/// Podium marker for a zero-based leaderboard position.
pub fn rank_badge(index: usize) -> String {
    match index {
        0 => "👑".to_string(),
        1 => "🥈".to_string(),
        2 => "🥉".to_string(),
        n => format!("#{}", n + 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AttendanceStatus::{Absent, Present};

    fn roster(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    /// Newest first: A present twice then absent, B absent then present twice.
    fn scenario() -> Vec<TallyEvent<AttendanceStatus>> {
        vec![
            TallyEvent::new("1")
                .with_entry("A", Present)
                .with_entry("B", Absent),
            TallyEvent::new("2")
                .with_entry("A", Present)
                .with_entry("B", Present),
            TallyEvent::new("3")
                .with_entry("A", Absent)
                .with_entry("B", Present),
        ]
    }

    #[test]
    fn scenario_leaderboard_ties_keep_roster_order() {
        let board = leaderboard(&roster(&["A", "B"]), &scenario());
        assert_eq!(
            board,
            vec![
                Standing { subject: "A".into(), total: 2 },
                Standing { subject: "B".into(), total: 2 },
            ]
        );
    }

    #[test]
    fn scenario_streaks_and_percentages() {
        let events = scenario();
        assert_eq!(streak("A", &events), 2);
        assert_eq!(streak("B", &events), 0);

        let a = summarize("A", &events);
        let b = summarize("B", &events);
        assert_eq!(a.percentage, 67);
        assert_eq!(b.percentage, 67);
        assert_eq!(a.present, 2);
        assert_eq!(a.total_events, 3);
    }

    #[test]
    fn empty_events_give_zeroes() {
        let events: Vec<TallyEvent<AttendanceStatus>> = Vec::new();
        let board = leaderboard(&roster(&["A", "B", "C"]), &events);
        assert_eq!(board.len(), 3);
        assert!(board.iter().all(|s| s.total == 0));
        assert_eq!(
            board.iter().map(|s| s.subject.as_str()).collect::<Vec<_>>(),
            vec!["A", "B", "C"]
        );

        assert_eq!(summarize("A", &events), AttendanceSummary::default());
    }

    #[test]
    fn empty_roster_gives_empty_leaderboard() {
        assert!(leaderboard(&[], &scenario()).is_empty());
    }

    #[test]
    fn unknown_subjects_are_ignored() {
        let events = vec![TallyEvent::new("1")
            .with_entry("A", 3u32)
            .with_entry("ghost", 10u32)];
        let board = leaderboard(&roster(&["A"]), &events);
        assert_eq!(board, vec![Standing { subject: "A".into(), total: 3 }]);
    }

    #[test]
    fn duplicate_roster_entries_collapse() {
        let events = vec![TallyEvent::new("1").with_entry("A", 2u32)];
        let board = leaderboard(&roster(&["A", "B", "A"]), &events);
        assert_eq!(board.len(), 2);
        assert_eq!(board[0], Standing { subject: "A".into(), total: 2 });
    }

    #[test]
    fn drinks_leaderboard_sorts_descending() {
        let events = vec![
            TallyEvent::new("n1")
                .with_entry("Ana", 2u32)
                .with_entry("Bruno", 5u32)
                .with_entry("Carla", 1u32),
            TallyEvent::new("n2")
                .with_entry("Ana", 4u32)
                .with_entry("Carla", 1u32),
        ];
        let board = leaderboard(&roster(&["Ana", "Bruno", "Carla"]), &events);
        let order: Vec<(&str, u64)> = board.iter().map(|s| (s.subject.as_str(), s.total)).collect();
        assert_eq!(order, vec![("Ana", 6), ("Bruno", 5), ("Carla", 2)]);
    }

    #[test]
    fn leaderboard_is_deterministic() {
        let r = roster(&["A", "B"]);
        assert_eq!(leaderboard(&r, &scenario()), leaderboard(&r, &scenario()));
    }

    #[test]
    fn adding_a_positive_entry_never_lowers_a_total() {
        let r = roster(&["A", "B"]);
        let before = leaderboard(&r, &scenario());
        let mut events = scenario();
        events.push(TallyEvent::new("4").with_entry("B", Present));
        let after = leaderboard(&r, &events);

        let total = |board: &[Standing], who: &str| {
            board.iter().find(|s| s.subject == who).map(|s| s.total)
        };
        assert_eq!(total(&before, "B"), Some(2));
        assert_eq!(total(&after, "B"), Some(3));
        assert_eq!(after[0].subject, "B");
    }

    #[test]
    fn unregistered_breaks_the_streak() {
        let events = vec![
            TallyEvent::new("1").with_entry("A", Present),
            TallyEvent::new("2").with_entry("B", Present),
            TallyEvent::new("3").with_entry("A", Present),
        ];
        assert_eq!(streak("A", &events), 1);
        assert_eq!(events[1].status_of("A"), AttendanceStatus::Unregistered);
    }

    #[test]
    fn streak_is_bounded_by_event_count() {
        let events: Vec<_> = (0..5)
            .map(|i| TallyEvent::new(i.to_string()).with_entry("A", Present))
            .collect();
        assert_eq!(streak("A", &events), 5);
        assert_eq!(streak("nobody", &events), 0);
    }

    #[test]
    fn percentage_rounding() {
        assert_eq!(percentage(3, 4), 75);
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(5, 0), 0);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(4, 4), 100);
    }

    #[test]
    fn drinks_never_go_negative() {
        assert_eq!(clamp_drinks(0, -1), 0);
        assert_eq!(clamp_drinks(2, -5), 0);
        assert_eq!(clamp_drinks(2, 1), 3);
        assert_eq!(clamp_drinks(u32::MAX, 1), u32::MAX);
    }

    #[test]
    fn status_round_trips_through_storage_values() {
        assert_eq!(AttendanceStatus::from_stored("Presente"), Some(Present));
        assert_eq!(AttendanceStatus::from_stored("Ausente"), Some(Absent));
        assert_eq!(AttendanceStatus::from_stored("N/A"), None);
        assert_eq!(AttendanceStatus::Unregistered.as_stored(), None);
        assert_eq!(AttendanceStatus::Unregistered.label(), "Não Registado");
    }

    #[test]
    fn toggling_cycles_between_persisted_states() {
        assert_eq!(Present.toggled(), Absent);
        assert_eq!(Absent.toggled(), Present);
        assert_eq!(AttendanceStatus::Unregistered.toggled(), Present);
    }

    #[test]
    fn rank_badges() {
        assert_eq!(rank_badge(0), "👑");
        assert_eq!(rank_badge(1), "🥈");
        assert_eq!(rank_badge(2), "🥉");
        assert_eq!(rank_badge(3), "#4");
    }
}

use chrono::NaiveDate;

const AVATAR_BACKGROUNDS: [&str; 6] = [
    "#fee2e2", "#e0e7ff", "#d1fae5", "#fef3c7", "#fae8ff", "#ecfeff",
];
const AVATAR_FOREGROUNDS: [&str; 6] = [
    "#ef4444", "#4f46e5", "#10b981", "#d97706", "#d946ef", "#0891b2",
];

/// Two-letter avatar text: first two letters of a single name, otherwise the
/// initials of the first and last names.
pub fn initials(name: &str) -> String {
    let words: Vec<&str> = name.split_whitespace().collect();
    match words.as_slice() {
        [] => String::new(),
        [single] => single.chars().take(2).collect::<String>().to_uppercase(),
        [first, .., last] => first
            .chars()
            .take(1)
            .chain(last.chars().take(1))
            .collect::<String>()
            .to_uppercase(),
    }
}

/// Background and text color for a member's avatar, picked by name length.
pub fn avatar_colors(name: &str) -> (&'static str, &'static str) {
    let i = name.chars().count() % AVATAR_BACKGROUNDS.len();
    (AVATAR_BACKGROUNDS[i], AVATAR_FOREGROUNDS[i])
}

/// Dates are shown day first, as in `25/12/2025`.
pub fn date_label(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Parse the value of an `<input type="date">`.
pub fn parse_form_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

pub fn form_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

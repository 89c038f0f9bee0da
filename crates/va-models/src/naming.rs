//! Display-name and date formatting helpers shared by services and emails

use chrono::{DateTime, Utc};

/// Fallback when an email local part yields nothing usable
pub const EXTERNAL_DELEGATE: &str = "External Delegate";

/// Derive a display name for an unregistered delegate from their email.
///
/// `jane.doe@x` → "Jane Doe", `john_smith@x` → "John Smith",
/// `MARY@x` → "Mary".
pub fn derive_delegate_name(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();

    let name = if local.contains('.') {
        local.split('.').map(capitalize_lower).collect::<Vec<_>>().join(" ")
    } else if local.contains('-') || local.contains('_') {
        local
            .split(['-', '_'])
            .map(capitalize_lower)
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        capitalize_lower(local)
    };

    if name.trim().is_empty() {
        EXTERNAL_DELEGATE.to_string()
    } else {
        name
    }
}

/// Derive a display name for an unregistered event member.
///
/// Dots and underscores become spaces and only the first letter is
/// upper-cased: `jane.doe@x` → "Jane doe".
pub fn derive_member_name(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let spaced = local.replace(['.', '_'], " ");
    capitalize_first(&spaced)
}

/// Upper-case the first letter of every space-separated word, lower-case the rest
pub fn title_case(s: &str) -> String {
    s.split(' ').map(capitalize_lower).collect::<Vec<_>>().join(" ")
}

fn capitalize_lower(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.as_str().to_lowercase().chars()).collect(),
        None => String::new(),
    }
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Short human-readable form used in notifications, e.g. `Mon, Jan 5, 03:00 PM`
pub fn format_event_time(at: DateTime<Utc>) -> String {
    at.format("%a, %b %-d, %I:%M %p").to_string()
}

/// Date used in task assignment messages, e.g. `Mon Jan 05 2026`
pub fn format_due_date(at: DateTime<Utc>) -> String {
    at.format("%a %b %d %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_delegate_names() {
        assert_eq!(derive_delegate_name("jane.doe@example.com"), "Jane Doe");
        assert_eq!(derive_delegate_name("JOHN_smith@example.com"), "John Smith");
        assert_eq!(derive_delegate_name("mary-ann@example.com"), "Mary Ann");
        assert_eq!(derive_delegate_name("PETER@example.com"), "Peter");
        assert_eq!(derive_delegate_name("@example.com"), EXTERNAL_DELEGATE);
    }

    #[test]
    fn test_member_names() {
        assert_eq!(derive_member_name("jane.doe@example.com"), "Jane doe");
        assert_eq!(derive_member_name("ops_team@example.com"), "Ops team");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("acme widgets LTD"), "Acme Widgets Ltd");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_format_event_time() {
        let at = Utc.with_ymd_and_hms(2026, 1, 5, 15, 0, 0).unwrap();
        assert_eq!(format_event_time(at), "Mon, Jan 5, 03:00 PM");
        assert_eq!(format_due_date(at), "Mon Jan 05 2026");
    }
}

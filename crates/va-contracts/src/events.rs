//! Event payloads and contracts

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use va_core::types::parse_datetime;

use crate::base::{base_error, is_blank, is_truthy, Contract, ValidationResult};

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct MemberInput {
    pub email: Option<String>,
    pub name: Option<String>,
}

impl MemberInput {
    pub fn email(&self) -> Option<String> {
        self.email
            .as_deref()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInput {
    pub title: Option<String>,
    pub va_name: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub venue: Option<String>,
    pub concerned_members: Option<Vec<MemberInput>>,
    pub reminder: Option<Value>,
    pub reminder_time: Option<String>,
}

impl EventInput {
    pub fn reminder_enabled(&self) -> bool {
        self.reminder.as_ref().is_some_and(is_truthy)
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.start_time.as_deref().and_then(parse_datetime)
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.end_time.as_deref().and_then(parse_datetime)
    }

    pub fn reminder_at(&self) -> Option<DateTime<Utc>> {
        self.reminder_time.as_deref().and_then(parse_datetime)
    }

    /// Members that carry an email address
    pub fn member_emails(&self) -> Vec<String> {
        self.concerned_members
            .iter()
            .flatten()
            .filter_map(MemberInput::email)
            .collect()
    }
}

/// Creation rules, evaluated against the given clock
pub struct CreateEventContract {
    pub now: DateTime<Utc>,
}

impl CreateEventContract {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }
}

impl Contract<EventInput> for CreateEventContract {
    fn validate(&self, input: &EventInput) -> ValidationResult {
        if is_blank(&input.title)
            || is_blank(&input.start_time)
            || is_blank(&input.end_time)
            || is_blank(&input.venue)
            || is_blank(&input.va_name)
        {
            return Err(base_error(
                "Title, start time, end time, venue, and VA name are required",
            ));
        }

        let (Some(start), Some(end)) = (input.start(), input.end()) else {
            return Err(base_error("Invalid date format"));
        };
        if start < self.now {
            return Err(base_error("Event start time cannot be in the past"));
        }
        if end <= start {
            return Err(base_error("End time must be after start time"));
        }

        if input.reminder_enabled() {
            let Some(raw) = input.reminder_time.as_deref().filter(|r| !r.trim().is_empty()) else {
                return Err(base_error(
                    "Reminder time is required when reminder is enabled",
                ));
            };
            match parse_datetime(raw) {
                Some(at) if at > self.now && at < end => {}
                _ => {
                    return Err(base_error(
                        "Reminder time must be in the future and before event end",
                    ))
                }
            }
        }
        Ok(())
    }
}

/// Updates only check what they change
pub struct UpdateEventContract;

impl Contract<EventInput> for UpdateEventContract {
    fn validate(&self, input: &EventInput) -> ValidationResult {
        if (input.start_time.is_some() && input.start().is_none())
            || (input.end_time.is_some() && input.end().is_none())
        {
            return Err(base_error("Invalid date format"));
        }
        if let (Some(start), Some(end)) = (input.start(), input.end()) {
            if end <= start {
                return Err(base_error("End time must be after start time"));
            }
        }
        if input.reminder_enabled() && input.reminder_time.is_some() && input.reminder_at().is_none() {
            return Err(base_error("Invalid date format"));
        }
        Ok(())
    }
}

/// `?start=&end=` range for calendar views
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RangeQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl RangeQuery {
    pub fn bounds(&self) -> Result<(DateTime<Utc>, DateTime<Utc>), va_core::error::ValidationErrors> {
        if is_blank(&self.start) || is_blank(&self.end) {
            return Err(base_error("Start and end dates are required"));
        }
        let start = self.start.as_deref().and_then(parse_datetime);
        let end = self.end.as_deref().and_then(parse_datetime);
        match (start, end) {
            (Some(start), Some(end)) => Ok((start, end)),
            _ => Err(base_error("Invalid start or end date format")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn input(now: DateTime<Utc>, extra: Value) -> EventInput {
        let mut base = json!({
            "title": "Board meeting",
            "vaName": "Ada",
            "startTime": (now + Duration::hours(2)).to_rfc3339(),
            "endTime": (now + Duration::hours(3)).to_rfc3339(),
            "venue": "HQ"
        });
        if let (Some(obj), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                obj.insert(k.clone(), v.clone());
            }
        }
        serde_json::from_value(base).unwrap()
    }

    fn message(result: ValidationResult) -> String {
        result.unwrap_err().full_messages().join(", ")
    }

    #[test]
    fn test_valid_event() {
        let now = Utc::now();
        assert!(CreateEventContract::new(now).validate(&input(now, json!({}))).is_ok());
    }

    #[test]
    fn test_start_in_past() {
        let now = Utc::now();
        let i = input(now, json!({ "startTime": (now - Duration::hours(1)).to_rfc3339() }));
        assert_eq!(
            message(CreateEventContract::new(now).validate(&i)),
            "Event start time cannot be in the past"
        );
    }

    #[test]
    fn test_end_before_start() {
        let now = Utc::now();
        let i = input(now, json!({ "endTime": (now + Duration::hours(1)).to_rfc3339() }));
        assert_eq!(
            message(CreateEventContract::new(now).validate(&i)),
            "End time must be after start time"
        );
    }

    #[test]
    fn test_reminder_rules() {
        let now = Utc::now();
        let contract = CreateEventContract::new(now);

        let missing = input(now, json!({ "reminder": true }));
        assert_eq!(
            message(contract.validate(&missing)),
            "Reminder time is required when reminder is enabled"
        );

        let after_end = input(
            now,
            json!({ "reminder": "true", "reminderTime": (now + Duration::hours(4)).to_rfc3339() }),
        );
        assert_eq!(
            message(contract.validate(&after_end)),
            "Reminder time must be in the future and before event end"
        );

        let ok = input(
            now,
            json!({ "reminder": true, "reminderTime": (now + Duration::hours(1)).to_rfc3339() }),
        );
        assert!(contract.validate(&ok).is_ok());
    }

    #[test]
    fn test_invalid_dates() {
        let now = Utc::now();
        let i = input(now, json!({ "startTime": "someday" }));
        assert_eq!(message(CreateEventContract::new(now).validate(&i)), "Invalid date format");
    }

    #[test]
    fn test_range_query() {
        let q = RangeQuery { start: Some("2030-01-01".into()), end: None };
        assert!(q.bounds().is_err());

        let q = RangeQuery {
            start: Some("2030-01-01".into()),
            end: Some("2030-01-31".into()),
        };
        let (start, end) = q.bounds().unwrap();
        assert!(start < end);
    }

    #[test]
    fn test_member_emails() {
        let now = Utc::now();
        let i = input(
            now,
            json!({ "concernedMembers": [{ "email": " CTO@Example.com" }, { "email": "" }, { "name": "x" }] }),
        );
        assert_eq!(i.member_emails(), vec!["cto@example.com".to_string()]);
    }
}

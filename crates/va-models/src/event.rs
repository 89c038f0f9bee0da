//! Calendar event and busy time models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Id, Identifiable, Owned};

/// Person invited to an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcernedMember {
    pub email: String,
    pub name: String,
}

/// Calendar event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "_id")]
    pub id: Id,
    pub title: String,
    pub va_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub venue: String,
    #[serde(default)]
    pub concerned_members: Vec<ConcernedMember>,
    #[serde(default)]
    pub reminder: bool,
    #[serde(default)]
    pub reminder_time: Option<DateTime<Utc>>,
    pub user_id: Id,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identifiable for Event {
    fn id(&self) -> Id {
        self.id
    }
}

impl Owned for Event {
    fn owner_id(&self) -> Id {
        self.user_id
    }
}

impl Event {
    /// Half-open overlap with `[start, end)`
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time < end && self.end_time > start
    }

    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.end_time <= now
    }

    pub fn has_member(&self, email: &str) -> bool {
        self.concerned_members
            .iter()
            .any(|m| m.email.eq_ignore_ascii_case(email.trim()))
    }
}

/// Interval blocked on a user's calendar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusyTime {
    #[serde(rename = "_id")]
    pub id: Id,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub title: String,
    pub user_id: Id,
    /// Event that blocked this interval, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<Id>,
}

impl Identifiable for BusyTime {
    fn id(&self) -> Id {
        self.id
    }
}

impl Owned for BusyTime {
    fn owner_id(&self) -> Id {
        self.user_id
    }
}

impl BusyTime {
    /// Busy interval covering an event
    pub fn for_event(event: &Event) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            start_time: event.start_time,
            end_time: event.end_time,
            title: event.title.clone(),
            user_id: event.user_id,
            event_id: Some(event.id),
        }
    }

    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time < end && self.end_time > start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn busy(start_h: u32, end_h: u32) -> BusyTime {
        BusyTime {
            id: Uuid::new_v4(),
            start_time: Utc.with_ymd_and_hms(2030, 1, 1, start_h, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2030, 1, 1, end_h, 0, 0).unwrap(),
            title: "Standup".into(),
            user_id: Uuid::new_v4(),
            event_id: None,
        }
    }

    #[test]
    fn test_overlap_is_half_open() {
        let b = busy(10, 11);
        let at = |h| Utc.with_ymd_and_hms(2030, 1, 1, h, 0, 0).unwrap();

        assert!(b.overlaps(at(9), at(11)));
        assert!(b.overlaps(at(10), at(12)));
        // Touching intervals do not conflict
        assert!(!b.overlaps(at(11), at(12)));
        assert!(!b.overlaps(at(8), at(10)));
    }

    #[test]
    fn test_event_members() {
        let now = Utc::now();
        let event = Event {
            id: Uuid::new_v4(),
            title: "Board meeting".into(),
            va_name: "Ada".into(),
            start_time: now + Duration::hours(1),
            end_time: now + Duration::hours(2),
            venue: "Room 1".into(),
            concerned_members: vec![ConcernedMember {
                email: "cto@example.com".into(),
                name: "Cto".into(),
            }],
            reminder: false,
            reminder_time: None,
            user_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        };

        assert!(event.has_member("CTO@example.com "));
        assert!(!event.has_ended(now));
        assert!(event.has_ended(now + Duration::hours(3)));

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["vaName"], "Ada");
        assert!(value["reminderTime"].is_null());
    }
}

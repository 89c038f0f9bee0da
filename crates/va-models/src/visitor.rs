//! Visitor log model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{Id, Identifiable, Owned};

/// Visitor records are kept for this many days
pub const VISITOR_RETENTION_DAYS: i64 = 90;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visitor {
    #[serde(rename = "_id")]
    pub id: Id,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub user_id: Id,
    pub created_at: DateTime<Utc>,
}

impl Identifiable for Visitor {
    fn id(&self) -> Id {
        self.id
    }
}

impl Owned for Visitor {
    fn owner_id(&self) -> Id {
        self.user_id
    }
}

impl Visitor {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.created_at <= retention_cutoff(now)
    }
}

/// Visitors created at or before this instant are due for purging
pub fn retention_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(VISITOR_RETENTION_DAYS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let mut visitor = Visitor {
            id: Uuid::new_v4(),
            name: "Guest".into(),
            email: "guest@example.com".into(),
            phone: "+254700000000".into(),
            message: None,
            user_id: Uuid::new_v4(),
            created_at: now - Duration::days(10),
        };
        assert!(!visitor.is_expired(now));

        visitor.created_at = now - Duration::days(91);
        assert!(visitor.is_expired(now));
    }
}

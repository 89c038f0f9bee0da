//! In-app notification model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Id, Identifiable, Owned};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: Id,
    pub message: String,
    pub user_id: Id,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(user_id: Id, message: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            message: message.into(),
            user_id,
            created_at: Utc::now(),
        }
    }
}

impl Identifiable for Notification {
    fn id(&self) -> Id {
        self.id
    }
}

impl Owned for Notification {
    fn owner_id(&self) -> Id {
        self.user_id
    }
}

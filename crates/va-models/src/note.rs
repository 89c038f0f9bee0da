//! Note model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Id, Identifiable, Owned};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(rename = "_id")]
    pub id: Id,
    pub title: String,
    pub content_html: String,
    pub content_text: String,
    pub user_id: Id,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identifiable for Note {
    fn id(&self) -> Id {
        self.id
    }
}

impl Owned for Note {
    fn owner_id(&self) -> Id {
        self.user_id
    }
}

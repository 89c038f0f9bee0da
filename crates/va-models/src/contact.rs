//! Contact model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::naming::title_case;
use crate::{Id, Identifiable, Owned};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    #[serde(rename = "_id")]
    pub id: Id,
    pub name: String,
    pub company_name: String,
    pub email: String,
    #[serde(default)]
    pub position: String,
    pub phone_number: String,
    pub user_id: Id,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identifiable for Contact {
    fn id(&self) -> Id {
        self.id
    }
}

impl Owned for Contact {
    fn owner_id(&self) -> Id {
        self.user_id
    }
}

impl Contact {
    /// Canonical casing applied before every save
    pub fn normalize(&mut self) {
        self.name = self.name.to_uppercase();
        self.company_name = title_case(&self.company_name);
        self.position = title_case(&self.position);
        self.email = self.email.trim().to_lowercase();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_normalize() {
        let now = Utc::now();
        let mut contact = Contact {
            id: Uuid::new_v4(),
            name: "Jane Roe".into(),
            company_name: "acme CORPORATION".into(),
            email: " Jane@Acme.COM".into(),
            position: "chief of staff".into(),
            phone_number: "0712345678".into(),
            user_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        };
        contact.normalize();

        assert_eq!(contact.name, "JANE ROE");
        assert_eq!(contact.company_name, "Acme Corporation");
        assert_eq!(contact.position, "Chief Of Staff");
        assert_eq!(contact.email, "jane@acme.com");
    }
}

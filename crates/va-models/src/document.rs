//! Document register model
//!
//! Incoming/outgoing correspondence with an optional list of responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::{Id, Identifiable, Owned, UnknownVariant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Incoming,
    Outgoing,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Incoming => "incoming",
            DocumentType::Outgoing => "outgoing",
        }
    }
}

impl FromStr for DocumentType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "incoming" => Ok(DocumentType::Incoming),
            "outgoing" => Ok(DocumentType::Outgoing),
            _ => Err(UnknownVariant {
                kind: "type",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReceptionMode {
    #[serde(rename = "virtual")]
    Virtual,
    #[serde(rename = "in-person")]
    InPerson,
}

impl ReceptionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReceptionMode::Virtual => "virtual",
            ReceptionMode::InPerson => "in-person",
        }
    }

    /// In-person reception needs a physical file category
    pub fn requires_file_category(&self) -> bool {
        matches!(self, ReceptionMode::InPerson)
    }
}

impl FromStr for ReceptionMode {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "virtual" => Ok(ReceptionMode::Virtual),
            "in-person" => Ok(ReceptionMode::InPerson),
            _ => Err(UnknownVariant {
                kind: "receptionMode",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    #[default]
    NotRequired,
    Pending,
    Responded,
}

impl ResponseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseStatus::NotRequired => "not_required",
            ResponseStatus::Pending => "pending",
            ResponseStatus::Responded => "responded",
        }
    }
}

impl FromStr for ResponseStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_required" => Ok(ResponseStatus::NotRequired),
            "pending" => Ok(ResponseStatus::Pending),
            "responded" => Ok(ResponseStatus::Responded),
            _ => Err(UnknownVariant {
                kind: "responseStatus",
                value: s.to_string(),
            }),
        }
    }
}

/// A reply recorded against a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    pub title: String,
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub summary: String,
    #[serde(default)]
    pub res_status: bool,
    pub reception_mode: ReceptionMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_category: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub responded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(rename = "_id")]
    pub id: Id,
    pub title: String,
    pub description: String,
    pub category: String,
    pub sender: String,
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub reception_mode: ReceptionMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_category: Option<String>,
    #[serde(default)]
    pub response_status: ResponseStatus,
    #[serde(default)]
    pub responses: Vec<DocumentResponse>,
    pub user_id: Id,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identifiable for Document {
    fn id(&self) -> Id {
        self.id
    }
}

impl Owned for Document {
    fn owner_id(&self) -> Id {
        self.user_id
    }
}

impl Document {
    pub fn is_responded(&self) -> bool {
        self.response_status == ResponseStatus::Responded
    }
}

/// Default category for documents filed without one
pub const DEFAULT_CATEGORY: &str = "General";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        assert_eq!(
            serde_json::to_string(&ReceptionMode::InPerson).unwrap(),
            "\"in-person\""
        );
        assert_eq!(
            serde_json::to_string(&ResponseStatus::NotRequired).unwrap(),
            "\"not_required\""
        );
        assert_eq!("outgoing".parse::<DocumentType>().unwrap(), DocumentType::Outgoing);
        assert!("In-Person".parse::<ReceptionMode>().is_err());
    }

    #[test]
    fn test_file_category_rule() {
        assert!(ReceptionMode::InPerson.requires_file_category());
        assert!(!ReceptionMode::Virtual.requires_file_category());
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One persisted form submission. Immutable once written.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub name: String,
    pub age: String,
    pub profession: String,
    pub experience: String,
    #[sqlx(rename = "submitted_at")]
    pub timestamp: DateTime<Utc>,
}

/// Validated caller-supplied fields, before the server assigns a timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubmission {
    pub id: Option<Uuid>,
    pub name: String,
    pub age: String,
    pub profession: String,
    pub experience: String,
}

impl NewSubmission {
    pub fn into_record(self, timestamp: DateTime<Utc>) -> Submission {
        Submission {
            id: self.id.unwrap_or_else(Uuid::now_v7),
            name: self.name,
            age: self.age,
            profession: self.profession,
            experience: self.experience,
            timestamp,
        }
    }
}

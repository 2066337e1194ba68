use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const UNKNOWN_EMAIL: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Student,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    Pending,
    Checked,
}

impl AssignmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Checked => "checked",
        }
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssignmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "checked" => Ok(Self::Checked),
            other => Err(format!("unknown assignment status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorRole {
    Admin,
    Trainer,
    Student,
}

impl AuthorRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Trainer => "trainer",
            Self::Student => "student",
        }
    }
}

impl FromStr for AuthorRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "trainer" => Ok(Self::Trainer),
            "student" => Ok(Self::Student),
            other => Err(format!("unknown author role: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditEntry {
    pub editor_email: String,
    pub edited_at: String,
    pub changed_fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trainer {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub subject: String,
    pub batches: Vec<String>,
    pub creator_email: String,
    pub created_at: String,
    pub edit_history: Vec<EditEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub father_name: String,
    pub father_phone: String,
    pub mother_name: String,
    pub mother_phone: String,
    pub student_code: String,
    pub batches: Vec<String>,
    pub creator_email: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEntry {
    pub text: String,
    pub timestamp: String,
    pub author: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: String,
    pub trainer_id: String,
    pub trainer_name: String,
    pub trainer_email: Option<String>,
    pub student_name: String,
    pub student_email: String,
    pub file_name: String,
    pub file_url: String,
    pub file_type: String,
    pub status: AssignmentStatus,
    pub submitted_at: String,
    pub feedback: Vec<FeedbackEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: String,
    /// Zero when the upload service did not report a size.
    #[serde(default)]
    pub size: u64,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamPost {
    pub id: String,
    pub batch: String,
    pub author_email: String,
    pub author_name: String,
    pub author_role: AuthorRole,
    pub text: String,
    pub attachments: Vec<Attachment>,
    pub timestamp: String,
}

/// Server clock in the format every stored timestamp uses.
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_serializes_type_field() {
        let a = Attachment {
            name: "notes.pdf".into(),
            file_type: "application/pdf".into(),
            size: 0,
            url: "https://files.test/notes.pdf".into(),
        };
        let v = serde_json::to_value(&a).expect("serialize");
        assert_eq!(v["type"], "application/pdf");
        assert!(v.get("fileType").is_none());
    }

    #[test]
    fn timestamps_sort_lexically() {
        let a = now_timestamp();
        assert!(a.ends_with('Z'));
        assert_eq!(a.len(), "2026-01-01T00:00:00.000Z".len());
    }
}

//! File activity records. Logged for audit only; not served over HTTP.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validate::{self, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileAction {
    Created,
    Modified,
    Deleted,
    Moved,
    Accessed,
}

impl FileAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileAction::Created => "created",
            FileAction::Modified => "modified",
            FileAction::Deleted => "deleted",
            FileAction::Moved => "moved",
            FileAction::Accessed => "accessed",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        match raw.trim().to_lowercase().as_str() {
            "created" => Ok(FileAction::Created),
            "modified" => Ok(FileAction::Modified),
            "deleted" => Ok(FileAction::Deleted),
            "moved" => Ok(FileAction::Moved),
            "accessed" => Ok(FileAction::Accessed),
            other => Err(ValidationError::new(
                format!("Invalid file action: '{other}'"),
                "action",
                other,
            )),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FileActivityDraft {
    pub filepath: String,
    pub action: String,
    #[serde(default)]
    pub size_bytes: Option<u64>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub checksum: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileActivity {
    pub id: Uuid,
    pub filepath: String,
    pub action: FileAction,
    pub size_bytes: Option<u64>,
    pub mime_type: Option<String>,
    pub checksum: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl FileActivity {
    pub fn new(draft: FileActivityDraft) -> Result<Self, ValidationError> {
        let filepath = validate::validate_filepath(&draft.filepath)?;
        let action = FileAction::parse(&draft.action)?;
        Ok(FileActivity {
            id: Uuid::new_v4(),
            filepath,
            action,
            size_bytes: draft.size_bytes,
            mime_type: draft.mime_type,
            checksum: draft.checksum,
            recorded_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traversal_rejected() {
        let draft = FileActivityDraft {
            filepath: "../etc/passwd".to_string(),
            action: "accessed".to_string(),
            ..Default::default()
        };
        assert!(FileActivity::new(draft).is_err());
    }

    #[test]
    fn test_valid_activity() {
        let draft = FileActivityDraft {
            filepath: "docs/report.pdf".to_string(),
            action: "created".to_string(),
            size_bytes: Some(1024),
            ..Default::default()
        };
        let activity = FileActivity::new(draft).unwrap();
        assert_eq!(activity.action, FileAction::Created);
    }
}

//! Todo items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validate::{self, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
    OnHold,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
            TaskStatus::OnHold => "on_hold",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        match raw.trim().to_lowercase().as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            "cancelled" => Ok(TaskStatus::Cancelled),
            "on_hold" => Ok(TaskStatus::OnHold),
            other => Err(ValidationError::new(
                format!("Invalid task status: '{other}'"),
                "status",
                other,
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    /// Case-insensitive parse; "normal" is accepted as an alias for medium.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        match raw.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" | "normal" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            other => Err(ValidationError::new(
                format!("Invalid priority: '{other}'"),
                "priority",
                other,
            )),
        }
    }
}

/// Incoming todo fields, before validation.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TodoDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub estimated_hours: Option<f64>,
    #[serde(default)]
    pub actual_hours: Option<f64>,
    #[serde(default)]
    pub parent_task_id: Option<Uuid>,
}

/// A validated todo item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub assigned_to: Option<String>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
    pub parent_task_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TodoItem {
    /// Validate a draft into a todo. Missing priority defaults to medium;
    /// completed_at is only allowed when status is completed.
    pub fn new(draft: TodoDraft) -> Result<Self, ValidationError> {
        let title = validate::validate_text(&draft.title, "title", 1, 200, false)?;
        let description = match draft.description.as_deref() {
            Some(d) if !d.trim().is_empty() => {
                Some(validate::validate_text(d, "description", 0, 1000, false)?)
            }
            _ => None,
        };

        let status = match draft.status.as_deref() {
            Some(raw) if !raw.trim().is_empty() => TaskStatus::parse(raw)?,
            _ => TaskStatus::default(),
        };
        let priority = match draft.priority.as_deref() {
            Some(raw) if !raw.trim().is_empty() => Priority::parse(raw)?,
            _ => Priority::default(),
        };

        let due_date = match draft.due_date.as_deref() {
            Some(raw) if !raw.trim().is_empty() => {
                Some(validate::validate_datetime(raw, "due_date")?)
            }
            _ => None,
        };

        let completed_at = match draft.completed_at.as_deref() {
            Some(raw) if !raw.trim().is_empty() => {
                if status != TaskStatus::Completed {
                    return Err(ValidationError::new(
                        "completed_at requires status 'completed'",
                        "completed_at",
                        raw,
                    ));
                }
                Some(validate::validate_datetime(raw, "completed_at")?)
            }
            _ => None,
        };

        let tags = validate::validate_tags(&draft.tags)?;

        let assigned_to = match draft.assigned_to.as_deref() {
            Some(a) if !a.trim().is_empty() => {
                Some(validate::validate_text(a, "assigned_to", 0, 100, false)?)
            }
            _ => None,
        };

        for (field, hours) in [
            ("estimated_hours", draft.estimated_hours),
            ("actual_hours", draft.actual_hours),
        ] {
            if let Some(h) = hours
                && !(0.0..=1000.0).contains(&h)
            {
                return Err(ValidationError::new(
                    format!("{field} must be between 0 and 1000"),
                    field,
                    &h.to_string(),
                ));
            }
        }

        let now = Utc::now();
        Ok(TodoItem {
            id: Uuid::new_v4(),
            title,
            description,
            status,
            priority,
            due_date,
            completed_at,
            tags,
            assigned_to,
            estimated_hours: draft.estimated_hours,
            actual_hours: draft.actual_hours,
            parent_task_id: draft.parent_task_id,
            created_at: now,
            updated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(title: &str) -> TodoDraft {
        TodoDraft {
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_priority_defaults_to_medium() {
        let todo = TodoItem::new(draft("Buy groceries")).unwrap();
        assert_eq!(todo.priority, Priority::Medium);
        assert_eq!(todo.status, TaskStatus::Pending);
    }

    #[test]
    fn test_priority_parse_accepts_normal_alias() {
        assert_eq!(Priority::parse("Normal").unwrap(), Priority::Medium);
        assert_eq!(Priority::parse("URGENT").unwrap(), Priority::Urgent);
        assert!(Priority::parse("critical").is_err());
    }

    #[test]
    fn test_completed_at_requires_completed_status() {
        let mut d = draft("Ship release");
        d.completed_at = Some("2024-06-03T17:00:00Z".to_string());
        assert!(TodoItem::new(d).is_err());

        let mut done = draft("Ship release");
        done.status = Some("completed".to_string());
        done.completed_at = Some("2024-06-03T17:00:00Z".to_string());
        assert!(TodoItem::new(done).unwrap().completed_at.is_some());
    }

    #[test]
    fn test_tags_deduped() {
        let mut d = draft("Plan sprint");
        d.tags = vec!["work".to_string(), "work".to_string(), "urgent".to_string()];
        let todo = TodoItem::new(d).unwrap();
        assert_eq!(todo.tags, vec!["work", "urgent"]);
    }

    #[test]
    fn test_hours_bounds() {
        let mut d = draft("Refactor");
        d.estimated_hours = Some(1001.0);
        assert!(TodoItem::new(d).is_err());
    }
}

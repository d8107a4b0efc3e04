//! Persistence backends.
//!
//! The [`Store`] trait is the seam between the pipeline and storage.
//! Calls are synchronous; the server invokes them directly from
//! handlers, which is fine for the single-user request volumes this
//! serves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::OrganizerResult;
use crate::model::{
    CalendarEvent, Contact, EventType, FileActivity, Priority, TaskStatus, TodoItem,
};

mod file;
mod sqlite;

pub use file::JsonFileStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub event_type: Option<EventType>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct TodoFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct ContactFilter {
    /// Case-insensitive substring match over name, email, and company.
    pub search: Option<String>,
    pub limit: Option<usize>,
}

/// One LLM call's worth of accounting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmUsage {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub provider: String,
    pub model: String,
    pub tokens: Option<u32>,
    pub cost_usd: f64,
}

/// Per-entity CRUD plus the usage ledger.
///
/// `update_*` and `delete_*` return `Ok(false)` when the id does not
/// exist; errors are reserved for the backend actually failing.
pub trait Store: Send + Sync {
    fn create_event(&self, event: &CalendarEvent) -> OrganizerResult<()>;
    fn get_event(&self, id: Uuid) -> OrganizerResult<Option<CalendarEvent>>;
    fn list_events(&self, filter: &EventFilter) -> OrganizerResult<Vec<CalendarEvent>>;
    fn update_event(&self, event: &CalendarEvent) -> OrganizerResult<bool>;
    fn delete_event(&self, id: Uuid) -> OrganizerResult<bool>;

    fn create_todo(&self, todo: &TodoItem) -> OrganizerResult<()>;
    fn get_todo(&self, id: Uuid) -> OrganizerResult<Option<TodoItem>>;
    fn list_todos(&self, filter: &TodoFilter) -> OrganizerResult<Vec<TodoItem>>;
    fn update_todo(&self, todo: &TodoItem) -> OrganizerResult<bool>;
    fn delete_todo(&self, id: Uuid) -> OrganizerResult<bool>;

    fn create_contact(&self, contact: &Contact) -> OrganizerResult<()>;
    fn get_contact(&self, id: Uuid) -> OrganizerResult<Option<Contact>>;
    fn list_contacts(&self, filter: &ContactFilter) -> OrganizerResult<Vec<Contact>>;
    fn update_contact(&self, contact: &Contact) -> OrganizerResult<bool>;
    fn delete_contact(&self, id: Uuid) -> OrganizerResult<bool>;

    fn log_file_activity(&self, activity: &FileActivity) -> OrganizerResult<()>;

    fn record_usage(&self, usage: &LlmUsage) -> OrganizerResult<()>;
    fn usage_total_cost(&self) -> OrganizerResult<f64>;
}

//! Entity types for the organizer.
//!
//! Entities are built through validating constructors from `Draft` inputs
//! (HTTP request bodies) or extraction candidates, so a constructed value
//! always satisfies its invariants.

mod contact;
mod event;
mod file_activity;
mod task;

pub use contact::{Contact, ContactDraft};
pub use event::{CalendarEvent, EventDraft, EventType};
pub use file_activity::{FileActivity, FileActivityDraft, FileAction};
pub use task::{Priority, TaskStatus, TodoDraft, TodoItem};

//! Flat-file JSON persistence.
//!
//! Each entity lives in one JSON file holding the whole collection;
//! every write is a read-modify-write of that file. A process-local
//! mutex serializes writers, so this is only safe with a single server
//! process pointed at the data directory. Run a second process against
//! the same directory and writes can be lost; use the SQLite backend
//! when that matters.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;
use uuid::Uuid;

use crate::error::{OrganizerError, OrganizerResult};
use crate::model::{CalendarEvent, Contact, FileActivity, TodoItem};
use crate::store::{ContactFilter, EventFilter, LlmUsage, Store, TodoFilter};

const EVENTS_FILE: &str = "events.json";
const TODOS_FILE: &str = "todos.json";
const CONTACTS_FILE: &str = "contacts.json";
const FILE_ACTIVITIES_FILE: &str = "file_activities.json";
const USAGE_FILE: &str = "llm_usage.json";

pub struct JsonFileStore {
    dir: PathBuf,
    write_guard: Mutex<()>,
}

impl JsonFileStore {
    pub fn open(dir: &Path) -> OrganizerResult<Self> {
        fs::create_dir_all(dir)?;
        info!("Opened JSON file store at {}", dir.display());
        Ok(JsonFileStore {
            dir: dir.to_path_buf(),
            write_guard: Mutex::new(()),
        })
    }

    fn lock(&self) -> OrganizerResult<MutexGuard<'_, ()>> {
        self.write_guard
            .lock()
            .map_err(|_| OrganizerError::Persistence("store lock poisoned".to_string()))
    }

    fn load<T: DeserializeOwned>(&self, file: &str) -> OrganizerResult<Vec<T>> {
        let path = self.dir.join(file);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&path)?;
        serde_json::from_str(&raw)
            .map_err(|e| OrganizerError::InvalidData(format!("corrupt {file}: {e}")))
    }

    fn save<T: Serialize>(&self, file: &str, items: &[T]) -> OrganizerResult<()> {
        let raw = serde_json::to_string_pretty(items)?;
        fs::write(self.dir.join(file), raw)?;
        Ok(())
    }

    fn append<T: Serialize>(&self, file: &str, item: &T) -> OrganizerResult<()> {
        let _guard = self.lock()?;
        let mut items: Vec<serde_json::Value> = self.load(file)?;
        items.push(serde_json::to_value(item)?);
        self.save(file, &items)
    }

    fn replace_by_id<T, F>(&self, file: &str, id: Uuid, get_id: F, item: &T) -> OrganizerResult<bool>
    where
        T: Serialize + DeserializeOwned + Clone,
        F: Fn(&T) -> Uuid,
    {
        let _guard = self.lock()?;
        let mut items: Vec<T> = self.load(file)?;
        match items.iter().position(|existing| get_id(existing) == id) {
            Some(pos) => {
                items[pos] = item.clone();
                self.save(file, &items)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn remove_by_id<T, F>(&self, file: &str, id: Uuid, get_id: F) -> OrganizerResult<bool>
    where
        T: Serialize + DeserializeOwned,
        F: Fn(&T) -> Uuid,
    {
        let _guard = self.lock()?;
        let mut items: Vec<T> = self.load(file)?;
        let before = items.len();
        items.retain(|existing| get_id(existing) != id);
        if items.len() == before {
            return Ok(false);
        }
        self.save(file, &items)?;
        Ok(true)
    }
}

impl Store for JsonFileStore {
    fn create_event(&self, event: &CalendarEvent) -> OrganizerResult<()> {
        self.append(EVENTS_FILE, event)
    }

    fn get_event(&self, id: Uuid) -> OrganizerResult<Option<CalendarEvent>> {
        let events: Vec<CalendarEvent> = self.load(EVENTS_FILE)?;
        Ok(events.into_iter().find(|e| e.id == id))
    }

    fn list_events(&self, filter: &EventFilter) -> OrganizerResult<Vec<CalendarEvent>> {
        let mut events: Vec<CalendarEvent> = self.load(EVENTS_FILE)?;
        events.retain(|event| {
            filter.start.is_none_or(|start| event.start_time >= start)
                && filter.end.is_none_or(|end| event.start_time <= end)
                && filter.event_type.is_none_or(|t| event.event_type == t)
        });
        events.sort_by_key(|event| event.start_time);
        if let Some(limit) = filter.limit {
            events.truncate(limit);
        }
        Ok(events)
    }

    fn update_event(&self, event: &CalendarEvent) -> OrganizerResult<bool> {
        self.replace_by_id(EVENTS_FILE, event.id, |e: &CalendarEvent| e.id, event)
    }

    fn delete_event(&self, id: Uuid) -> OrganizerResult<bool> {
        self.remove_by_id(EVENTS_FILE, id, |e: &CalendarEvent| e.id)
    }

    fn create_todo(&self, todo: &TodoItem) -> OrganizerResult<()> {
        self.append(TODOS_FILE, todo)
    }

    fn get_todo(&self, id: Uuid) -> OrganizerResult<Option<TodoItem>> {
        let todos: Vec<TodoItem> = self.load(TODOS_FILE)?;
        Ok(todos.into_iter().find(|t| t.id == id))
    }

    fn list_todos(&self, filter: &TodoFilter) -> OrganizerResult<Vec<TodoItem>> {
        let mut todos: Vec<TodoItem> = self.load(TODOS_FILE)?;
        todos.retain(|todo| {
            filter.status.is_none_or(|s| todo.status == s)
                && filter.priority.is_none_or(|p| todo.priority == p)
        });
        todos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = filter.limit {
            todos.truncate(limit);
        }
        Ok(todos)
    }

    fn update_todo(&self, todo: &TodoItem) -> OrganizerResult<bool> {
        self.replace_by_id(TODOS_FILE, todo.id, |t: &TodoItem| t.id, todo)
    }

    fn delete_todo(&self, id: Uuid) -> OrganizerResult<bool> {
        self.remove_by_id(TODOS_FILE, id, |t: &TodoItem| t.id)
    }

    fn create_contact(&self, contact: &Contact) -> OrganizerResult<()> {
        self.append(CONTACTS_FILE, contact)
    }

    fn get_contact(&self, id: Uuid) -> OrganizerResult<Option<Contact>> {
        let contacts: Vec<Contact> = self.load(CONTACTS_FILE)?;
        Ok(contacts.into_iter().find(|c| c.id == id))
    }

    fn list_contacts(&self, filter: &ContactFilter) -> OrganizerResult<Vec<Contact>> {
        let mut contacts: Vec<Contact> = self.load(CONTACTS_FILE)?;
        if let Some(search) = &filter.search {
            let needle = search.to_lowercase();
            contacts.retain(|contact| {
                contact.name.to_lowercase().contains(&needle)
                    || contact
                        .email
                        .as_deref()
                        .is_some_and(|e| e.to_lowercase().contains(&needle))
                    || contact
                        .company
                        .as_deref()
                        .is_some_and(|c| c.to_lowercase().contains(&needle))
            });
        }
        contacts.sort_by(|a, b| a.name.cmp(&b.name));
        if let Some(limit) = filter.limit {
            contacts.truncate(limit);
        }
        Ok(contacts)
    }

    fn update_contact(&self, contact: &Contact) -> OrganizerResult<bool> {
        self.replace_by_id(CONTACTS_FILE, contact.id, |c: &Contact| c.id, contact)
    }

    fn delete_contact(&self, id: Uuid) -> OrganizerResult<bool> {
        self.remove_by_id(CONTACTS_FILE, id, |c: &Contact| c.id)
    }

    fn log_file_activity(&self, activity: &FileActivity) -> OrganizerResult<()> {
        self.append(FILE_ACTIVITIES_FILE, activity)
    }

    fn record_usage(&self, usage: &LlmUsage) -> OrganizerResult<()> {
        self.append(USAGE_FILE, usage)
    }

    fn usage_total_cost(&self) -> OrganizerResult<f64> {
        let usage: Vec<LlmUsage> = self.load(USAGE_FILE)?;
        Ok(usage.iter().map(|u| u.cost_usd).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EventDraft, TaskStatus, TodoDraft};
    use chrono::Utc;

    fn store() -> (tempfile::TempDir, JsonFileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_event_round_trip() {
        let (_dir, store) = store();
        let event = CalendarEvent::new(EventDraft {
            title: "Review".to_string(),
            start_time: "2024-06-03T10:00:00Z".to_string(),
            ..Default::default()
        })
        .unwrap();
        store.create_event(&event).unwrap();

        let fetched = store.get_event(event.id).unwrap().unwrap();
        assert_eq!(fetched, event);
    }

    #[test]
    fn test_update_and_delete_missing_return_false() {
        let (_dir, store) = store();
        let todo = TodoItem::new(TodoDraft {
            title: "Orphan".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert!(!store.update_todo(&todo).unwrap());
        assert!(!store.delete_todo(todo.id).unwrap());
    }

    #[test]
    fn test_todo_status_filter() {
        let (_dir, store) = store();
        let todo = TodoItem::new(TodoDraft {
            title: "Pending thing".to_string(),
            ..Default::default()
        })
        .unwrap();
        store.create_todo(&todo).unwrap();

        let pending = store
            .list_todos(&TodoFilter {
                status: Some(TaskStatus::Pending),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(pending.len(), 1);

        let done = store
            .list_todos(&TodoFilter {
                status: Some(TaskStatus::Completed),
                ..Default::default()
            })
            .unwrap();
        assert!(done.is_empty());
    }

    #[test]
    fn test_usage_total() {
        let (_dir, store) = store();
        store
            .record_usage(&LlmUsage {
                id: Uuid::new_v4(),
                timestamp: Utc::now(),
                provider: "demo".to_string(),
                model: "demo".to_string(),
                tokens: None,
                cost_usd: 0.5,
            })
            .unwrap();
        assert!((store.usage_total_cost().unwrap() - 0.5).abs() < 1e-9);
    }
}

//! SQLite persistence. The reference backend.
//!
//! One table per entity. List and map fields (tags, attendees, social
//! profiles) are JSON-encoded text columns; datetimes are RFC 3339
//! text; ids are uuid text primary keys. The schema is created on open.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, ToSql, params};
use tracing::info;
use uuid::Uuid;

use crate::error::{OrganizerError, OrganizerResult};
use crate::model::{
    CalendarEvent, Contact, EventType, FileActivity, Priority, TaskStatus, TodoItem,
};
use crate::store::{ContactFilter, EventFilter, LlmUsage, Store, TodoFilter};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS calendar_events (
    id               TEXT PRIMARY KEY,
    title            TEXT NOT NULL,
    description      TEXT,
    start_time       TEXT NOT NULL,
    end_time         TEXT NOT NULL,
    location         TEXT,
    event_type       TEXT NOT NULL,
    attendees        TEXT NOT NULL,
    reminder_minutes INTEGER NOT NULL,
    recurrence_rule  TEXT,
    all_day          INTEGER NOT NULL,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_events_start_time ON calendar_events(start_time);

CREATE TABLE IF NOT EXISTS todos (
    id              TEXT PRIMARY KEY,
    title           TEXT NOT NULL,
    description     TEXT,
    status          TEXT NOT NULL,
    priority        TEXT NOT NULL,
    due_date        TEXT,
    completed_at    TEXT,
    tags            TEXT NOT NULL,
    assigned_to     TEXT,
    estimated_hours REAL,
    actual_hours    REAL,
    parent_task_id  TEXT,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_todos_status ON todos(status);
CREATE INDEX IF NOT EXISTS idx_todos_priority ON todos(priority);

CREATE TABLE IF NOT EXISTS contacts (
    id              TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    email           TEXT,
    phone           TEXT,
    company         TEXT,
    address         TEXT,
    birthday        TEXT,
    notes           TEXT,
    tags            TEXT NOT NULL,
    social_profiles TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_contacts_name ON contacts(name);

CREATE TABLE IF NOT EXISTS file_activities (
    id          TEXT PRIMARY KEY,
    filepath    TEXT NOT NULL,
    action      TEXT NOT NULL,
    size_bytes  INTEGER,
    mime_type   TEXT,
    checksum    TEXT,
    recorded_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS llm_usage (
    id        TEXT PRIMARY KEY,
    timestamp TEXT NOT NULL,
    provider  TEXT NOT NULL,
    model     TEXT NOT NULL,
    tokens    INTEGER,
    cost_usd  REAL NOT NULL
);
";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> OrganizerResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        info!("Opened SQLite store at {}", path.display());
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> OrganizerResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> OrganizerResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| OrganizerError::Persistence("store lock poisoned".to_string()))
    }
}

fn parse_uuid(raw: String) -> OrganizerResult<Uuid> {
    Uuid::parse_str(&raw).map_err(|_| OrganizerError::InvalidData(format!("bad uuid '{raw}'")))
}

fn parse_datetime(raw: String) -> OrganizerResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| OrganizerError::InvalidData(format!("bad datetime '{raw}'")))
}

fn parse_opt_datetime(raw: Option<String>) -> OrganizerResult<Option<DateTime<Utc>>> {
    raw.map(parse_datetime).transpose()
}

fn parse_json<T: serde::de::DeserializeOwned>(raw: String, what: &str) -> OrganizerResult<T> {
    serde_json::from_str(&raw)
        .map_err(|e| OrganizerError::InvalidData(format!("bad {what} column: {e}")))
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<RawEvent> {
    Ok(RawEvent {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        start_time: row.get(3)?,
        end_time: row.get(4)?,
        location: row.get(5)?,
        event_type: row.get(6)?,
        attendees: row.get(7)?,
        reminder_minutes: row.get(8)?,
        recurrence_rule: row.get(9)?,
        all_day: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

// Raw column values; decoded into the entity in a second step so enum
// and JSON failures map to InvalidData instead of a rusqlite error.
struct RawEvent {
    id: String,
    title: String,
    description: Option<String>,
    start_time: String,
    end_time: String,
    location: Option<String>,
    event_type: String,
    attendees: String,
    reminder_minutes: i64,
    recurrence_rule: Option<String>,
    all_day: bool,
    created_at: String,
    updated_at: String,
}

impl RawEvent {
    fn decode(self) -> OrganizerResult<CalendarEvent> {
        Ok(CalendarEvent {
            id: parse_uuid(self.id)?,
            title: self.title,
            description: self.description,
            start_time: parse_datetime(self.start_time)?,
            end_time: parse_datetime(self.end_time)?,
            location: self.location,
            event_type: EventType::parse(&self.event_type)
                .map_err(|e| OrganizerError::InvalidData(e.to_string()))?,
            attendees: parse_json(self.attendees, "attendees")?,
            reminder_minutes: self.reminder_minutes,
            recurrence_rule: self.recurrence_rule,
            all_day: self.all_day,
            created_at: parse_datetime(self.created_at)?,
            updated_at: parse_datetime(self.updated_at)?,
        })
    }
}

fn todo_from_row(row: &Row<'_>) -> rusqlite::Result<RawTodo> {
    Ok(RawTodo {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        status: row.get(3)?,
        priority: row.get(4)?,
        due_date: row.get(5)?,
        completed_at: row.get(6)?,
        tags: row.get(7)?,
        assigned_to: row.get(8)?,
        estimated_hours: row.get(9)?,
        actual_hours: row.get(10)?,
        parent_task_id: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

struct RawTodo {
    id: String,
    title: String,
    description: Option<String>,
    status: String,
    priority: String,
    due_date: Option<String>,
    completed_at: Option<String>,
    tags: String,
    assigned_to: Option<String>,
    estimated_hours: Option<f64>,
    actual_hours: Option<f64>,
    parent_task_id: Option<String>,
    created_at: String,
    updated_at: String,
}

impl RawTodo {
    fn decode(self) -> OrganizerResult<TodoItem> {
        Ok(TodoItem {
            id: parse_uuid(self.id)?,
            title: self.title,
            description: self.description,
            status: TaskStatus::parse(&self.status)
                .map_err(|e| OrganizerError::InvalidData(e.to_string()))?,
            priority: Priority::parse(&self.priority)
                .map_err(|e| OrganizerError::InvalidData(e.to_string()))?,
            due_date: parse_opt_datetime(self.due_date)?,
            completed_at: parse_opt_datetime(self.completed_at)?,
            tags: parse_json(self.tags, "tags")?,
            assigned_to: self.assigned_to,
            estimated_hours: self.estimated_hours,
            actual_hours: self.actual_hours,
            parent_task_id: self.parent_task_id.map(parse_uuid).transpose()?,
            created_at: parse_datetime(self.created_at)?,
            updated_at: parse_datetime(self.updated_at)?,
        })
    }
}

fn contact_from_row(row: &Row<'_>) -> rusqlite::Result<RawContact> {
    Ok(RawContact {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        company: row.get(4)?,
        address: row.get(5)?,
        birthday: row.get(6)?,
        notes: row.get(7)?,
        tags: row.get(8)?,
        social_profiles: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

struct RawContact {
    id: String,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    company: Option<String>,
    address: Option<String>,
    birthday: Option<String>,
    notes: Option<String>,
    tags: String,
    social_profiles: String,
    created_at: String,
    updated_at: String,
}

impl RawContact {
    fn decode(self) -> OrganizerResult<Contact> {
        Ok(Contact {
            id: parse_uuid(self.id)?,
            name: self.name,
            email: self.email,
            phone: self.phone,
            company: self.company,
            address: self.address,
            birthday: parse_opt_datetime(self.birthday)?,
            notes: self.notes,
            tags: parse_json(self.tags, "tags")?,
            social_profiles: parse_json::<BTreeMap<String, String>>(
                self.social_profiles,
                "social_profiles",
            )?,
            created_at: parse_datetime(self.created_at)?,
            updated_at: parse_datetime(self.updated_at)?,
        })
    }
}

impl Store for SqliteStore {
    fn create_event(&self, event: &CalendarEvent) -> OrganizerResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO calendar_events (id, title, description, start_time, end_time, location,
                 event_type, attendees, reminder_minutes, recurrence_rule, all_day, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                event.id.to_string(),
                event.title,
                event.description,
                event.start_time.to_rfc3339(),
                event.end_time.to_rfc3339(),
                event.location,
                event.event_type.as_str(),
                serde_json::to_string(&event.attendees)?,
                event.reminder_minutes,
                event.recurrence_rule,
                event.all_day,
                event.created_at.to_rfc3339(),
                event.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get_event(&self, id: Uuid) -> OrganizerResult<Option<CalendarEvent>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, description, start_time, end_time, location, event_type,
                    attendees, reminder_minutes, recurrence_rule, all_day, created_at, updated_at
             FROM calendar_events WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id.to_string()], event_from_row)?;
        match rows.next() {
            Some(raw) => Ok(Some(raw?.decode()?)),
            None => Ok(None),
        }
    }

    fn list_events(&self, filter: &EventFilter) -> OrganizerResult<Vec<CalendarEvent>> {
        let mut sql = String::from(
            "SELECT id, title, description, start_time, end_time, location, event_type,
                    attendees, reminder_minutes, recurrence_rule, all_day, created_at, updated_at
             FROM calendar_events",
        );
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(start) = filter.start {
            clauses.push("start_time >= ?");
            values.push(Box::new(start.to_rfc3339()));
        }
        if let Some(end) = filter.end {
            clauses.push("start_time <= ?");
            values.push(Box::new(end.to_rfc3339()));
        }
        if let Some(event_type) = filter.event_type {
            clauses.push("event_type = ?");
            values.push(Box::new(event_type.as_str()));
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY start_time ASC");
        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            values.push(Box::new(limit as i64));
        }

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();
        let raws = stmt.query_map(&param_refs[..], event_from_row)?;

        let mut events = Vec::new();
        for raw in raws {
            events.push(raw?.decode()?);
        }
        Ok(events)
    }

    fn update_event(&self, event: &CalendarEvent) -> OrganizerResult<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE calendar_events SET title = ?2, description = ?3, start_time = ?4,
                 end_time = ?5, location = ?6, event_type = ?7, attendees = ?8,
                 reminder_minutes = ?9, recurrence_rule = ?10, all_day = ?11, updated_at = ?12
             WHERE id = ?1",
            params![
                event.id.to_string(),
                event.title,
                event.description,
                event.start_time.to_rfc3339(),
                event.end_time.to_rfc3339(),
                event.location,
                event.event_type.as_str(),
                serde_json::to_string(&event.attendees)?,
                event.reminder_minutes,
                event.recurrence_rule,
                event.all_day,
                event.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(changed > 0)
    }

    fn delete_event(&self, id: Uuid) -> OrganizerResult<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "DELETE FROM calendar_events WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(changed > 0)
    }

    fn create_todo(&self, todo: &TodoItem) -> OrganizerResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO todos (id, title, description, status, priority, due_date, completed_at,
                 tags, assigned_to, estimated_hours, actual_hours, parent_task_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                todo.id.to_string(),
                todo.title,
                todo.description,
                todo.status.as_str(),
                todo.priority.as_str(),
                todo.due_date.map(|d| d.to_rfc3339()),
                todo.completed_at.map(|d| d.to_rfc3339()),
                serde_json::to_string(&todo.tags)?,
                todo.assigned_to,
                todo.estimated_hours,
                todo.actual_hours,
                todo.parent_task_id.map(|id| id.to_string()),
                todo.created_at.to_rfc3339(),
                todo.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get_todo(&self, id: Uuid) -> OrganizerResult<Option<TodoItem>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, description, status, priority, due_date, completed_at, tags,
                    assigned_to, estimated_hours, actual_hours, parent_task_id, created_at, updated_at
             FROM todos WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id.to_string()], todo_from_row)?;
        match rows.next() {
            Some(raw) => Ok(Some(raw?.decode()?)),
            None => Ok(None),
        }
    }

    fn list_todos(&self, filter: &TodoFilter) -> OrganizerResult<Vec<TodoItem>> {
        let mut sql = String::from(
            "SELECT id, title, description, status, priority, due_date, completed_at, tags,
                    assigned_to, estimated_hours, actual_hours, parent_task_id, created_at, updated_at
             FROM todos",
        );
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(status) = filter.status {
            clauses.push("status = ?");
            values.push(Box::new(status.as_str()));
        }
        if let Some(priority) = filter.priority {
            clauses.push("priority = ?");
            values.push(Box::new(priority.as_str()));
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY created_at DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            values.push(Box::new(limit as i64));
        }

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();
        let raws = stmt.query_map(&param_refs[..], todo_from_row)?;

        let mut todos = Vec::new();
        for raw in raws {
            todos.push(raw?.decode()?);
        }
        Ok(todos)
    }

    fn update_todo(&self, todo: &TodoItem) -> OrganizerResult<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE todos SET title = ?2, description = ?3, status = ?4, priority = ?5,
                 due_date = ?6, completed_at = ?7, tags = ?8, assigned_to = ?9,
                 estimated_hours = ?10, actual_hours = ?11, parent_task_id = ?12, updated_at = ?13
             WHERE id = ?1",
            params![
                todo.id.to_string(),
                todo.title,
                todo.description,
                todo.status.as_str(),
                todo.priority.as_str(),
                todo.due_date.map(|d| d.to_rfc3339()),
                todo.completed_at.map(|d| d.to_rfc3339()),
                serde_json::to_string(&todo.tags)?,
                todo.assigned_to,
                todo.estimated_hours,
                todo.actual_hours,
                todo.parent_task_id.map(|id| id.to_string()),
                todo.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(changed > 0)
    }

    fn delete_todo(&self, id: Uuid) -> OrganizerResult<bool> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM todos WHERE id = ?1", params![id.to_string()])?;
        Ok(changed > 0)
    }

    fn create_contact(&self, contact: &Contact) -> OrganizerResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO contacts (id, name, email, phone, company, address, birthday, notes,
                 tags, social_profiles, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                contact.id.to_string(),
                contact.name,
                contact.email,
                contact.phone,
                contact.company,
                contact.address,
                contact.birthday.map(|d| d.to_rfc3339()),
                contact.notes,
                serde_json::to_string(&contact.tags)?,
                serde_json::to_string(&contact.social_profiles)?,
                contact.created_at.to_rfc3339(),
                contact.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get_contact(&self, id: Uuid) -> OrganizerResult<Option<Contact>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, email, phone, company, address, birthday, notes, tags,
                    social_profiles, created_at, updated_at
             FROM contacts WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id.to_string()], contact_from_row)?;
        match rows.next() {
            Some(raw) => Ok(Some(raw?.decode()?)),
            None => Ok(None),
        }
    }

    fn list_contacts(&self, filter: &ContactFilter) -> OrganizerResult<Vec<Contact>> {
        let mut sql = String::from(
            "SELECT id, name, email, phone, company, address, birthday, notes, tags,
                    social_profiles, created_at, updated_at
             FROM contacts",
        );
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(search) = &filter.search {
            sql.push_str(" WHERE name LIKE ?1 OR email LIKE ?1 OR company LIKE ?1");
            values.push(Box::new(format!("%{search}%")));
        }
        sql.push_str(" ORDER BY name ASC");
        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            values.push(Box::new(limit as i64));
        }

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();
        let raws = stmt.query_map(&param_refs[..], contact_from_row)?;

        let mut contacts = Vec::new();
        for raw in raws {
            contacts.push(raw?.decode()?);
        }
        Ok(contacts)
    }

    fn update_contact(&self, contact: &Contact) -> OrganizerResult<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE contacts SET name = ?2, email = ?3, phone = ?4, company = ?5, address = ?6,
                 birthday = ?7, notes = ?8, tags = ?9, social_profiles = ?10, updated_at = ?11
             WHERE id = ?1",
            params![
                contact.id.to_string(),
                contact.name,
                contact.email,
                contact.phone,
                contact.company,
                contact.address,
                contact.birthday.map(|d| d.to_rfc3339()),
                contact.notes,
                serde_json::to_string(&contact.tags)?,
                serde_json::to_string(&contact.social_profiles)?,
                contact.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(changed > 0)
    }

    fn delete_contact(&self, id: Uuid) -> OrganizerResult<bool> {
        let conn = self.conn()?;
        let changed =
            conn.execute("DELETE FROM contacts WHERE id = ?1", params![id.to_string()])?;
        Ok(changed > 0)
    }

    fn log_file_activity(&self, activity: &FileActivity) -> OrganizerResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO file_activities (id, filepath, action, size_bytes, mime_type, checksum, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                activity.id.to_string(),
                activity.filepath,
                activity.action.as_str(),
                activity.size_bytes.map(|s| s as i64),
                activity.mime_type,
                activity.checksum,
                activity.recorded_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn record_usage(&self, usage: &LlmUsage) -> OrganizerResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO llm_usage (id, timestamp, provider, model, tokens, cost_usd)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                usage.id.to_string(),
                usage.timestamp.to_rfc3339(),
                usage.provider,
                usage.model,
                usage.tokens,
                usage.cost_usd,
            ],
        )?;
        Ok(())
    }

    fn usage_total_cost(&self) -> OrganizerResult<f64> {
        let conn = self.conn()?;
        let total: f64 =
            conn.query_row("SELECT COALESCE(SUM(cost_usd), 0.0) FROM llm_usage", [], |row| {
                row.get(0)
            })?;
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContactDraft, EventDraft, TodoDraft};

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    fn sample_event() -> CalendarEvent {
        CalendarEvent::new(EventDraft {
            title: "Team sync".to_string(),
            start_time: "2024-06-03T10:00:00Z".to_string(),
            attendees: vec!["a@example.com".to_string()],
            ..Default::default()
        })
        .unwrap()
    }

    fn sample_todo() -> TodoItem {
        TodoItem::new(TodoDraft {
            title: "Write report".to_string(),
            tags: vec!["work".to_string()],
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_event_round_trip() {
        let store = store();
        let event = sample_event();
        store.create_event(&event).unwrap();

        let fetched = store.get_event(event.id).unwrap().unwrap();
        assert_eq!(fetched.title, event.title);
        assert_eq!(fetched.attendees, event.attendees);
        assert_eq!(fetched.event_type, event.event_type);
        assert_eq!(fetched.start_time, event.start_time);
    }

    #[test]
    fn test_event_filter_by_range() {
        let store = store();
        store.create_event(&sample_event()).unwrap();

        let hits = store
            .list_events(&EventFilter {
                start: Some("2024-06-03T00:00:00Z".parse().unwrap()),
                end: Some("2024-06-04T00:00:00Z".parse().unwrap()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(hits.len(), 1);

        let misses = store
            .list_events(&EventFilter {
                start: Some("2024-07-01T00:00:00Z".parse().unwrap()),
                ..Default::default()
            })
            .unwrap();
        assert!(misses.is_empty());
    }

    #[test]
    fn test_todo_round_trip_and_filter() {
        let store = store();
        let todo = sample_todo();
        store.create_todo(&todo).unwrap();

        let fetched = store.get_todo(todo.id).unwrap().unwrap();
        assert_eq!(fetched.tags, vec!["work"]);
        assert_eq!(fetched.priority, Priority::Medium);

        let pending = store
            .list_todos(&TodoFilter {
                status: Some(TaskStatus::Pending),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(pending.len(), 1);

        let completed = store
            .list_todos(&TodoFilter {
                status: Some(TaskStatus::Completed),
                ..Default::default()
            })
            .unwrap();
        assert!(completed.is_empty());
    }

    #[test]
    fn test_contact_search() {
        let store = store();
        let contact = Contact::new(ContactDraft {
            name: "Jane Doe".to_string(),
            email: Some("jane@example.com".to_string()),
            ..Default::default()
        })
        .unwrap();
        store.create_contact(&contact).unwrap();

        let hits = store
            .list_contacts(&ContactFilter {
                search: Some("jane".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Jane Doe");

        let misses = store
            .list_contacts(&ContactFilter {
                search: Some("nobody".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert!(misses.is_empty());
    }

    #[test]
    fn test_update_and_delete_missing_return_false() {
        let store = store();
        assert!(!store.update_event(&sample_event()).unwrap());
        assert!(!store.delete_event(Uuid::new_v4()).unwrap());
        assert!(!store.update_todo(&sample_todo()).unwrap());
        assert!(!store.delete_todo(Uuid::new_v4()).unwrap());
        assert!(!store.delete_contact(Uuid::new_v4()).unwrap());
    }

    #[test]
    fn test_update_changes_row() {
        let store = store();
        let mut todo = sample_todo();
        store.create_todo(&todo).unwrap();

        todo.status = TaskStatus::Completed;
        todo.completed_at = Some(Utc::now());
        assert!(store.update_todo(&todo).unwrap());

        let fetched = store.get_todo(todo.id).unwrap().unwrap();
        assert_eq!(fetched.status, TaskStatus::Completed);
        assert!(fetched.completed_at.is_some());
    }

    #[test]
    fn test_usage_ledger_totals() {
        let store = store();
        assert_eq!(store.usage_total_cost().unwrap(), 0.0);

        for cost in [0.01, 0.02] {
            store
                .record_usage(&LlmUsage {
                    id: Uuid::new_v4(),
                    timestamp: Utc::now(),
                    provider: "demo".to_string(),
                    model: "demo".to_string(),
                    tokens: Some(100),
                    cost_usd: cost,
                })
                .unwrap();
        }
        let total = store.usage_total_cost().unwrap();
        assert!((total - 0.03).abs() < 1e-9);
    }

    #[test]
    fn test_on_disk_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("organizer.db");
        let event = sample_event();
        {
            let store = SqliteStore::open(&path).unwrap();
            store.create_event(&event).unwrap();
        }
        let reopened = SqliteStore::open(&path).unwrap();
        assert!(reopened.get_event(event.id).unwrap().is_some());
    }
}

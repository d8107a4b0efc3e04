//! Calendar events.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validate::{self, ValidationError};

/// What kind of event this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Meeting,
    Task,
    Reminder,
    #[default]
    Personal,
    Work,
    Appointment,
    Deadline,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Meeting => "meeting",
            EventType::Task => "task",
            EventType::Reminder => "reminder",
            EventType::Personal => "personal",
            EventType::Work => "work",
            EventType::Appointment => "appointment",
            EventType::Deadline => "deadline",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        match raw.trim().to_lowercase().as_str() {
            "meeting" => Ok(EventType::Meeting),
            "task" => Ok(EventType::Task),
            "reminder" => Ok(EventType::Reminder),
            "personal" => Ok(EventType::Personal),
            "work" => Ok(EventType::Work),
            "appointment" => Ok(EventType::Appointment),
            "deadline" => Ok(EventType::Deadline),
            other => Err(ValidationError::new(
                format!("Invalid event type: '{other}'"),
                "event_type",
                other,
            )),
        }
    }
}

/// Incoming event fields, before validation. Deserializes directly from
/// request bodies and extraction candidates.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EventDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_time: String,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub attendees: Vec<String>,
    #[serde(default)]
    pub reminder_minutes: Option<i64>,
    #[serde(default)]
    pub recurrence_rule: Option<String>,
    #[serde(default)]
    pub all_day: bool,
}

/// A validated calendar event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: Option<String>,
    pub event_type: EventType,
    pub attendees: Vec<String>,
    pub reminder_minutes: i64,
    pub recurrence_rule: Option<String>,
    pub all_day: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CalendarEvent {
    /// Validate a draft into an event. Missing end_time defaults to
    /// start + 1 hour; a given end_time must be after start_time.
    pub fn new(draft: EventDraft) -> Result<Self, ValidationError> {
        let title = validate::validate_text(&draft.title, "title", 1, 200, false)?;
        let description = match draft.description.as_deref() {
            Some(d) if !d.trim().is_empty() => {
                Some(validate::validate_text(d, "description", 0, 1000, false)?)
            }
            _ => None,
        };
        let location = match draft.location.as_deref() {
            Some(l) if !l.trim().is_empty() => {
                Some(validate::validate_text(l, "location", 0, 500, false)?)
            }
            _ => None,
        };

        let start_time = validate::validate_datetime(&draft.start_time, "start_time")?;
        let end_time = match draft.end_time.as_deref() {
            Some(raw) if !raw.trim().is_empty() => {
                let end = validate::validate_datetime(raw, "end_time")?;
                if end <= start_time {
                    return Err(ValidationError::new(
                        "end_time must be after start_time",
                        "end_time",
                        raw,
                    ));
                }
                end
            }
            _ => start_time + Duration::hours(1),
        };

        let event_type = match draft.event_type.as_deref() {
            Some(raw) if !raw.trim().is_empty() => EventType::parse(raw)?,
            _ => EventType::default(),
        };

        if draft.attendees.len() > 50 {
            return Err(ValidationError::new(
                "Maximum 50 attendees allowed",
                "attendees",
                "",
            ));
        }
        let mut attendees = Vec::with_capacity(draft.attendees.len());
        for attendee in &draft.attendees {
            attendees.push(validate::validate_email(attendee)?);
        }

        let reminder_minutes = draft.reminder_minutes.unwrap_or(15);
        if !(0..=10080).contains(&reminder_minutes) {
            return Err(ValidationError::new(
                "reminder_minutes must be between 0 and 10080",
                "reminder_minutes",
                &reminder_minutes.to_string(),
            ));
        }

        let recurrence_rule = match draft.recurrence_rule.as_deref() {
            Some(r) if !r.trim().is_empty() => {
                Some(validate::validate_text(r, "recurrence_rule", 0, 200, false)?)
            }
            _ => None,
        };

        let now = Utc::now();
        Ok(CalendarEvent {
            id: Uuid::new_v4(),
            title,
            description,
            start_time,
            end_time,
            location,
            event_type,
            attendees,
            reminder_minutes,
            recurrence_rule,
            all_day: draft.all_day,
            created_at: now,
            updated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(title: &str, start: &str) -> EventDraft {
        EventDraft {
            title: title.to_string(),
            start_time: start.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_end_time_defaults_to_one_hour_after_start() {
        let event = CalendarEvent::new(draft("Standup", "2024-06-03T09:00:00Z")).unwrap();
        assert_eq!(event.end_time - event.start_time, Duration::hours(1));
    }

    #[test]
    fn test_end_time_must_follow_start_time() {
        let mut d = draft("Standup", "2024-06-03T09:00:00Z");
        d.end_time = Some("2024-06-03T08:00:00Z".to_string());
        assert!(CalendarEvent::new(d).is_err());
    }

    #[test]
    fn test_event_type_defaults_to_personal() {
        let event = CalendarEvent::new(draft("Dentist", "2024-06-03T09:00:00Z")).unwrap();
        assert_eq!(event.event_type, EventType::Personal);
    }

    #[test]
    fn test_event_type_parse_case_insensitive() {
        assert_eq!(EventType::parse("MEETING").unwrap(), EventType::Meeting);
        assert!(EventType::parse("party").is_err());
    }

    #[test]
    fn test_attendees_validated_as_emails() {
        let mut d = draft("Sync", "2024-06-03T09:00:00Z");
        d.attendees = vec!["john@example.com".to_string()];
        let event = CalendarEvent::new(d).unwrap();
        assert_eq!(event.attendees, vec!["john@example.com"]);

        let mut bad = draft("Sync", "2024-06-03T09:00:00Z");
        bad.attendees = vec!["not-an-email".to_string()];
        assert!(CalendarEvent::new(bad).is_err());
    }

    #[test]
    fn test_reminder_minutes_bounds() {
        let mut d = draft("Sync", "2024-06-03T09:00:00Z");
        d.reminder_minutes = Some(20000);
        assert!(CalendarEvent::new(d).is_err());

        let event = CalendarEvent::new(draft("Sync", "2024-06-03T09:00:00Z")).unwrap();
        assert_eq!(event.reminder_minutes, 15);
    }

    #[test]
    fn test_title_is_escaped() {
        let event = CalendarEvent::new(draft("Lunch & learn", "2024-06-03T12:00:00Z")).unwrap();
        assert_eq!(event.title, "Lunch &amp; learn");
    }
}

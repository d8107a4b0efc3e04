//! Demo backend: offline, deterministic keyword extraction.
//!
//! Stands in for a real model so the pipeline works with zero setup and
//! in tests. It keyword-matches the request text and answers with the
//! same JSON bundle shape a real model is prompted to produce.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Datelike, Duration as ChronoDuration, Local, NaiveDate, NaiveDateTime, Weekday};
use regex::Regex;
use serde_json::{Value, json};

use crate::extract::USER_TEXT_MARKER;
use crate::provider::{LlmBackend, LlmError, LlmResponse};

const EVENT_KEYWORDS: [&str; 6] = [
    "meeting",
    "appointment",
    "schedule",
    "lunch",
    "dinner",
    "call with",
];

const TODO_KEYWORDS: [&str; 6] = [
    "remind me",
    "need to",
    "remember to",
    "don't forget",
    "todo",
    "task",
];

const CONTACT_KEYWORDS: [&str; 4] = [
    "add contact",
    "new contact",
    "save contact",
    "add a contact",
];

const QUERY_STARTERS: [&str; 6] = ["what", "show", "list", "when", "which", "do i have"];

static CLOCK_12_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d{1,2})(?::(\d{2}))?\s*(am|pm)\b").expect("valid regex"));

static CLOCK_24_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([01]?\d|2[0-3]):([0-5]\d)\b").expect("valid regex"));

static WITH_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"with ([A-Z][A-Za-z]+(?: [A-Z][A-Za-z]+)*)").expect("valid regex"));

static AT_PLACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bat (?:the )?([A-Za-z][A-Za-z ]*)").expect("valid regex"));

static EMAIL_IN_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").expect("valid regex")
});

static PHONE_IN_TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+?\d[\d\s\-()]{6,}\d").expect("valid regex"));

static NAME_AFTER_CONTACT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)contact (?:for )?([A-Z][A-Za-z]+(?: [A-Z][A-Za-z]+)*)").expect("valid regex")
});

pub struct DemoBackend;

impl DemoBackend {
    pub fn new() -> Self {
        DemoBackend
    }
}

impl Default for DemoBackend {
    fn default() -> Self {
        DemoBackend::new()
    }
}

#[async_trait]
impl LlmBackend for DemoBackend {
    fn name(&self) -> &str {
        "demo"
    }

    fn model(&self) -> &str {
        "demo"
    }

    fn min_request_interval(&self) -> Duration {
        Duration::ZERO
    }

    async fn complete(&self, prompt: &str, system_prompt: &str) -> Result<LlmResponse, LlmError> {
        // Health probes get a plain acknowledgement, not a bundle
        let content = if system_prompt.contains("'OK'") {
            "OK".to_string()
        } else {
            let text = user_text(prompt);
            parse_request(text).to_string()
        };

        Ok(LlmResponse {
            content,
            model: "demo".to_string(),
            tokens_used: None,
            response_time: Duration::ZERO,
            finish_reason: Some("stop".to_string()),
        })
    }
}

/// Pull the raw user text back out of the composed extraction prompt.
fn user_text(prompt: &str) -> &str {
    match prompt.rfind(USER_TEXT_MARKER) {
        Some(pos) => prompt[pos + USER_TEXT_MARKER.len()..]
            .trim()
            .trim_matches('"'),
        None => prompt.trim(),
    }
}

/// Keyword-classify the text and build the extraction bundle.
fn parse_request(text: &str) -> Value {
    let lower = text.to_lowercase();

    if is_query(&lower) {
        return parse_query(&lower);
    }
    if CONTACT_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return parse_contact(text);
    }
    if let Some(keyword) = EVENT_KEYWORDS.iter().find(|k| lower.contains(*k)) {
        return parse_event(text, &lower, keyword);
    }
    if TODO_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return parse_todo(text, &lower);
    }

    json!({
        "calendar_events": [],
        "todos": [],
        "contacts": [],
        "file_actions": [],
        "queries": [],
        "response": "I'm not sure what you'd like me to do with that. Try asking me to schedule something, add a task, or save a contact."
    })
}

fn is_query(lower: &str) -> bool {
    lower.ends_with('?')
        || lower.contains("upcoming")
        || QUERY_STARTERS.iter().any(|s| lower.starts_with(s))
}

fn parse_query(lower: &str) -> Value {
    let query_type = if lower.contains("task") || lower.contains("todo") {
        "todos"
    } else if lower.contains("contact") {
        "contacts"
    } else {
        "events"
    };
    let timeframe = if lower.contains("week") {
        "week"
    } else {
        "today"
    };
    json!({
        "calendar_events": [],
        "todos": [],
        "contacts": [],
        "file_actions": [],
        "queries": [{ "query_type": query_type, "timeframe": timeframe }],
        "response": "Here's what I found."
    })
}

fn parse_event(text: &str, lower: &str, keyword: &str) -> Value {
    let date = parse_day(lower);
    let (hour, minute) = parse_clock(lower).unwrap_or((9, 0));
    let start = naive(date, hour, minute);

    let mut title = capitalize(keyword);
    if let Some(caps) = WITH_NAME_RE.captures(text) {
        title = format!("{title} with {}", &caps[1]);
    }

    let location = AT_PLACE_RE
        .captures(text)
        .map(|caps| caps[1].trim().to_string())
        .filter(|place| !place.is_empty());

    let response = format!(
        "Scheduled \"{title}\" for {}.",
        start.format("%Y-%m-%d %H:%M")
    );
    json!({
        "calendar_events": [{
            "title": title,
            "start_time": start.format("%Y-%m-%dT%H:%M:%S").to_string(),
            "location": location,
            "event_type": "meeting"
        }],
        "todos": [],
        "contacts": [],
        "file_actions": [],
        "queries": [],
        "response": response
    })
}

fn parse_todo(text: &str, lower: &str) -> Value {
    let date = parse_day(lower);
    let (hour, minute) = parse_clock(lower).unwrap_or((9, 0));
    let due = naive(date, hour, minute);

    let title = todo_title(text);
    let response = format!("Added \"{title}\" to your tasks.");
    json!({
        "calendar_events": [],
        "todos": [{
            "title": title,
            "due_date": due.format("%Y-%m-%dT%H:%M:%S").to_string()
        }],
        "contacts": [],
        "file_actions": [],
        "queries": [],
        "response": response
    })
}

fn parse_contact(text: &str) -> Value {
    let name = NAME_AFTER_CONTACT_RE
        .captures(text)
        .map(|caps| caps[1].to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    let email = EMAIL_IN_TEXT_RE.find(text).map(|m| m.as_str().to_string());
    let phone = PHONE_IN_TEXT_RE
        .find(text)
        .map(|m| m.as_str().trim().to_string());

    let response = format!("Saved contact {name}.");
    json!({
        "calendar_events": [],
        "todos": [],
        "contacts": [{ "name": name, "email": email, "phone": phone }],
        "file_actions": [],
        "queries": [],
        "response": response
    })
}

/// Resolve a relative day mention against the local calendar.
fn parse_day(lower: &str) -> NaiveDate {
    let today = Local::now().date_naive();

    const WEEKDAYS: [(&str, Weekday); 7] = [
        ("monday", Weekday::Mon),
        ("tuesday", Weekday::Tue),
        ("wednesday", Weekday::Wed),
        ("thursday", Weekday::Thu),
        ("friday", Weekday::Fri),
        ("saturday", Weekday::Sat),
        ("sunday", Weekday::Sun),
    ];
    for (name, weekday) in WEEKDAYS {
        if lower.contains(name) {
            let mut date = today + ChronoDuration::days(1);
            while date.weekday() != weekday {
                date += ChronoDuration::days(1);
            }
            return date;
        }
    }

    if lower.contains("tomorrow") {
        today + ChronoDuration::days(1)
    } else {
        today
    }
}

/// Parse "3pm", "3:30 PM", or "15:00" to (hour, minute).
fn parse_clock(lower: &str) -> Option<(u32, u32)> {
    if let Some(caps) = CLOCK_12_RE.captures(lower) {
        let raw_hour: u32 = caps[1].parse().ok()?;
        if raw_hour == 0 || raw_hour > 12 {
            return None;
        }
        let minute: u32 = caps.get(2).map_or(Some(0), |m| m.as_str().parse().ok())?;
        let mut hour = raw_hour % 12;
        if caps[3].eq_ignore_ascii_case("pm") {
            hour += 12;
        }
        return Some((hour, minute));
    }
    if let Some(caps) = CLOCK_24_RE.captures(lower) {
        let hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = caps[2].parse().ok()?;
        return Some((hour, minute));
    }
    None
}

fn naive(date: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
    // hour/minute come from the clock regexes and are already in range
    date.and_hms_opt(hour, minute, 0)
        .unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN))
}

/// Title for a todo: the clause after the trigger phrase, with date and
/// time mentions stripped.
fn todo_title(text: &str) -> String {
    const TRIGGERS: [&str; 4] = ["remind me to ", "need to ", "remember to ", "don't forget to "];
    // ASCII lowering keeps byte offsets aligned with the original text
    let ascii_lower = text.to_ascii_lowercase();
    let mut rest = text;
    for trigger in TRIGGERS {
        if let Some(pos) = ascii_lower.find(trigger) {
            rest = &text[pos + trigger.len()..];
            break;
        }
    }

    let mut cleaned = rest.to_string();
    let clock_range = CLOCK_12_RE
        .find(&cleaned)
        .map(|m| m.range())
        .or_else(|| CLOCK_24_RE.find(&cleaned).map(|m| m.range()));
    if let Some(range) = clock_range {
        cleaned.replace_range(range, "");
    }
    for word in [
        "today", "tomorrow", "monday", "tuesday", "wednesday", "thursday", "friday", "saturday",
        "sunday",
    ] {
        if let Some(pos) = cleaned.to_ascii_lowercase().find(word) {
            cleaned.replace_range(pos..pos + word.len(), "");
        }
    }
    let cleaned = cleaned
        .trim()
        .trim_end_matches(['.', ',', '!'])
        .trim_end_matches(" at")
        .trim_end_matches(" on")
        .trim_end_matches(" by")
        .trim();

    if cleaned.is_empty() {
        "Untitled task".to_string()
    } else {
        capitalize(cleaned)
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clock() {
        assert_eq!(parse_clock("at 3pm"), Some((15, 0)));
        assert_eq!(parse_clock("at 3:30 pm"), Some((15, 30)));
        assert_eq!(parse_clock("at 12am"), Some((0, 0)));
        assert_eq!(parse_clock("at 15:00"), Some((15, 0)));
        assert_eq!(parse_clock("no time here"), None);
    }

    #[test]
    fn test_parse_day_tomorrow() {
        let today = Local::now().date_naive();
        assert_eq!(parse_day("see you tomorrow"), today + ChronoDuration::days(1));
        assert_eq!(parse_day("plain text"), today);
    }

    #[test]
    fn test_parse_day_weekday_is_always_in_the_future() {
        let date = parse_day("meeting on friday");
        assert_eq!(date.weekday(), Weekday::Fri);
        assert!(date > Local::now().date_naive());
    }

    #[test]
    fn test_meeting_request_becomes_event() {
        let bundle = parse_request("Meeting with John tomorrow at 3pm");
        let events = bundle["calendar_events"].as_array().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["title"], "Meeting with John");

        let expected = (Local::now().date_naive() + ChronoDuration::days(1))
            .and_hms_opt(15, 0, 0)
            .unwrap();
        assert_eq!(
            events[0]["start_time"],
            expected.format("%Y-%m-%dT%H:%M:%S").to_string()
        );
        assert!(!bundle["response"].as_str().unwrap().is_empty());
    }

    #[test]
    fn test_reminder_becomes_todo() {
        let bundle = parse_request("Remind me to buy milk tomorrow");
        let todos = bundle["todos"].as_array().unwrap();
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0]["title"], "Buy milk");
        // No priority emitted; entity construction defaults it
        assert!(todos[0].get("priority").is_none());
    }

    #[test]
    fn test_question_becomes_query() {
        let bundle = parse_request("What meetings do I have today?");
        let queries = bundle["queries"].as_array().unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0]["query_type"], "events");
        assert_eq!(queries[0]["timeframe"], "today");
    }

    #[test]
    fn test_contact_request() {
        let bundle = parse_request("Add contact Jane Doe, email jane@example.com");
        let contacts = bundle["contacts"].as_array().unwrap();
        assert_eq!(contacts[0]["name"], "Jane Doe");
        assert_eq!(contacts[0]["email"], "jane@example.com");
    }

    #[test]
    fn test_unrecognized_text_yields_empty_bundle() {
        let bundle = parse_request("the quick brown fox");
        assert!(bundle["calendar_events"].as_array().unwrap().is_empty());
        assert!(bundle["todos"].as_array().unwrap().is_empty());
        assert!(!bundle["response"].as_str().unwrap().is_empty());
    }

    #[test]
    fn test_user_text_extraction() {
        let prompt = format!("schema stuff\n\n{USER_TEXT_MARKER} \"Meeting tomorrow\"");
        assert_eq!(user_text(&prompt), "Meeting tomorrow");
        assert_eq!(user_text("bare text"), "bare text");
    }
}

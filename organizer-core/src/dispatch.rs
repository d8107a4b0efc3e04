//! Action dispatcher: turns an extraction bundle into store writes,
//! query answers, and one user-facing reply.
//!
//! Creates are fire-and-log: a candidate that fails validation or
//! persistence is logged and skipped, never aborting the batch or
//! erroring the reply.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::extract::{ExtractionBundle, ExtractionContext, ExtractionEngine, QueryCandidate};
use crate::model::{CalendarEvent, Contact, FileActivity, TaskStatus, TodoItem};
use crate::provider::LlmResponse;
use crate::store::{ContactFilter, EventFilter, LlmUsage, Store, TodoFilter};

/// What one request ended up doing.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub response: String,
    pub actions_taken: Vec<String>,
    pub cost_usd: f64,
    /// Query results, when the request asked for data.
    pub data: serde_json::Value,
}

/// Fallback classification for when the model is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Calendar,
    Task,
    Contact,
    Query,
    Unknown,
}

const CALENDAR_KEYWORDS: [&str; 5] = ["meeting", "appointment", "schedule", "calendar", "event"];
const TASK_KEYWORDS: [&str; 5] = ["task", "todo", "remind", "deadline", "finish"];
const CONTACT_KEYWORDS: [&str; 4] = ["contact", "phone", "email", "person"];
const QUERY_KEYWORDS: [&str; 5] = ["what", "show", "list", "when", "upcoming"];

/// Keyword intent classifier with a confidence weight.
pub fn classify_intent(text: &str) -> (Intent, f64) {
    let lower = text.to_lowercase();
    if QUERY_KEYWORDS.iter().any(|k| lower.starts_with(k)) || lower.ends_with('?') {
        return (Intent::Query, 0.6);
    }
    if CALENDAR_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return (Intent::Calendar, 0.6);
    }
    if TASK_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return (Intent::Task, 0.5);
    }
    if CONTACT_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return (Intent::Contact, 0.5);
    }
    (Intent::Unknown, 0.3)
}

/// Rough per-1k-token pricing by provider. Demo and local runs are free.
pub fn estimate_cost(provider: &str, tokens: Option<u32>) -> f64 {
    let per_thousand = match provider {
        "hosted" => 0.003,
        _ => 0.0,
    };
    f64::from(tokens.unwrap_or(0)) / 1000.0 * per_thousand
}

pub struct Dispatcher {
    engine: ExtractionEngine,
    store: Arc<dyn Store>,
}

impl Dispatcher {
    pub fn new(engine: ExtractionEngine, store: Arc<dyn Store>) -> Self {
        Dispatcher { engine, store }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn engine(&self) -> &ExtractionEngine {
        &self.engine
    }

    /// Process one natural-language request end to end.
    pub async fn process(&self, text: &str) -> ProcessOutcome {
        let context = self.build_context();
        let (bundle, llm_response) = self.engine.extract(text, &context).await;

        let cost_usd = match &llm_response {
            Some(response) => self.record_usage(response),
            None => 0.0,
        };

        // Degraded path: the provider is down. Queries can still be
        // answered from the store; creates get the apology.
        if llm_response.is_none() {
            return self.process_degraded(text, bundle, cost_usd);
        }

        let mut actions_taken = Vec::new();
        self.apply_creates(&bundle, &mut actions_taken);
        let data = self.run_queries(&bundle.queries, &mut actions_taken);

        ProcessOutcome {
            response: bundle.response,
            actions_taken,
            cost_usd,
            data,
        }
    }

    fn process_degraded(
        &self,
        text: &str,
        bundle: ExtractionBundle,
        cost_usd: f64,
    ) -> ProcessOutcome {
        let (intent, confidence) = classify_intent(text);
        info!(?intent, confidence, "provider unavailable, using keyword fallback");

        if intent == Intent::Query {
            let lower = text.to_lowercase();
            let query_type = if lower.contains("task") || lower.contains("todo") {
                "todos"
            } else if lower.contains("contact") {
                "contacts"
            } else {
                "events"
            };
            let timeframe = if lower.contains("week") { "week" } else { "today" };
            let query = QueryCandidate {
                query_type: Some(query_type.to_string()),
                timeframe: Some(timeframe.to_string()),
                search: None,
            };
            let mut actions_taken = Vec::new();
            let data = self.run_queries(std::slice::from_ref(&query), &mut actions_taken);
            return ProcessOutcome {
                response: "Here's what I found.".to_string(),
                actions_taken,
                cost_usd,
                data,
            };
        }

        ProcessOutcome {
            response: bundle.response,
            actions_taken: Vec::new(),
            cost_usd,
            data: serde_json::Value::Null,
        }
    }

    /// Store slice injected into the prompt for reference resolution.
    fn build_context(&self) -> ExtractionContext {
        let recent_contacts = self
            .store
            .list_contacts(&ContactFilter {
                search: None,
                limit: Some(5),
            })
            .unwrap_or_else(|e| {
                warn!("Failed to load contacts for context: {e}");
                Vec::new()
            });
        let upcoming_events = self
            .store
            .list_events(&EventFilter {
                start: Some(Utc::now()),
                end: None,
                event_type: None,
                limit: Some(3),
            })
            .unwrap_or_else(|e| {
                warn!("Failed to load events for context: {e}");
                Vec::new()
            });
        ExtractionContext {
            recent_contacts,
            upcoming_events,
            user_id: None,
        }
    }

    fn record_usage(&self, response: &LlmResponse) -> f64 {
        let provider = self.engine.provider();
        let cost_usd = estimate_cost(provider.name(), response.tokens_used);
        let usage = LlmUsage {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            provider: provider.name().to_string(),
            model: response.model.clone(),
            tokens: response.tokens_used,
            cost_usd,
        };
        if let Err(e) = self.store.record_usage(&usage) {
            warn!("Failed to record LLM usage: {e}");
        }
        cost_usd
    }

    fn apply_creates(&self, bundle: &ExtractionBundle, actions_taken: &mut Vec<String>) {
        for candidate in &bundle.calendar_events {
            match CalendarEvent::new(candidate.clone().into_draft()) {
                Ok(event) => match self.store.create_event(&event) {
                    Ok(()) => {
                        info!(title = %event.title, "created event");
                        actions_taken.push(format!("created_event: {}", event.title));
                    }
                    Err(e) => warn!("Failed to persist event: {e}"),
                },
                Err(e) => warn!("Skipping invalid event candidate: {e}"),
            }
        }

        for candidate in &bundle.todos {
            match TodoItem::new(candidate.clone().into_draft()) {
                Ok(todo) => match self.store.create_todo(&todo) {
                    Ok(()) => {
                        info!(title = %todo.title, "created todo");
                        actions_taken.push(format!("created_todo: {}", todo.title));
                    }
                    Err(e) => warn!("Failed to persist todo: {e}"),
                },
                Err(e) => warn!("Skipping invalid todo candidate: {e}"),
            }
        }

        for candidate in &bundle.contacts {
            match Contact::new(candidate.clone().into_draft()) {
                Ok(contact) => match self.store.create_contact(&contact) {
                    Ok(()) => {
                        info!(name = %contact.name, "created contact");
                        actions_taken.push(format!("created_contact: {}", contact.name));
                    }
                    Err(e) => warn!("Failed to persist contact: {e}"),
                },
                Err(e) => warn!("Skipping invalid contact candidate: {e}"),
            }
        }

        for candidate in &bundle.file_actions {
            match FileActivity::new(candidate.clone().into_draft()) {
                Ok(activity) => match self.store.log_file_activity(&activity) {
                    Ok(()) => {
                        actions_taken.push(format!("logged_file_activity: {}", activity.filepath));
                    }
                    Err(e) => warn!("Failed to log file activity: {e}"),
                },
                Err(e) => warn!("Skipping invalid file action candidate: {e}"),
            }
        }
    }

    fn run_queries(
        &self,
        queries: &[QueryCandidate],
        actions_taken: &mut Vec<String>,
    ) -> serde_json::Value {
        if queries.is_empty() {
            return serde_json::Value::Null;
        }

        let mut data = serde_json::Map::new();
        for query in queries {
            match query.query_type.as_deref() {
                Some("todos") => {
                    let todos = self
                        .store
                        .list_todos(&TodoFilter {
                            status: Some(TaskStatus::Pending),
                            priority: None,
                            limit: Some(50),
                        })
                        .unwrap_or_else(|e| {
                            warn!("Todo query failed: {e}");
                            Vec::new()
                        });
                    actions_taken.push(format!("found_todos: {}", todos.len()));
                    data.insert("todos".to_string(), json!(todos));
                }
                Some("contacts") => {
                    let contacts = self
                        .store
                        .list_contacts(&ContactFilter {
                            search: query.search.clone(),
                            limit: Some(50),
                        })
                        .unwrap_or_else(|e| {
                            warn!("Contact query failed: {e}");
                            Vec::new()
                        });
                    actions_taken.push(format!("found_contacts: {}", contacts.len()));
                    data.insert("contacts".to_string(), json!(contacts));
                }
                // Unrecognized query types fall back to the calendar
                _ => {
                    let filter = event_filter_for_timeframe(query.timeframe.as_deref());
                    let events = self.store.list_events(&filter).unwrap_or_else(|e| {
                        warn!("Event query failed: {e}");
                        Vec::new()
                    });
                    actions_taken.push(format!("found_events: {}", events.len()));
                    data.insert("events".to_string(), json!(events));
                }
            }
        }
        serde_json::Value::Object(data)
    }
}

fn event_filter_for_timeframe(timeframe: Option<&str>) -> EventFilter {
    let now = Utc::now();
    match timeframe {
        Some("week") => EventFilter {
            start: Some(now),
            end: Some(now + Duration::days(7)),
            event_type: None,
            limit: Some(50),
        },
        // "today" and anything else: the rest of the day
        _ => {
            let end_of_day = now
                .date_naive()
                .and_hms_opt(23, 59, 59)
                .map(|dt| dt.and_utc())
                .unwrap_or(now);
            EventFilter {
                start: Some(now),
                end: Some(end_of_day.max(now)),
                event_type: None,
                limit: Some(50),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    use async_trait::async_trait;

    use crate::provider::{DemoBackend, LlmBackend, LlmError, LlmProvider};
    use crate::store::SqliteStore;

    fn demo_dispatcher() -> Dispatcher {
        let provider = Arc::new(LlmProvider::new(
            Box::new(DemoBackend::new()),
            StdDuration::from_secs(5),
        ));
        let store: Arc<dyn Store> = Arc::new(SqliteStore::open_in_memory().unwrap());
        Dispatcher::new(ExtractionEngine::new(provider), store)
    }

    struct DownBackend;

    #[async_trait]
    impl LlmBackend for DownBackend {
        fn name(&self) -> &str {
            "down"
        }

        fn model(&self) -> &str {
            "down"
        }

        fn min_request_interval(&self) -> StdDuration {
            StdDuration::ZERO
        }

        async fn complete(
            &self,
            _prompt: &str,
            _system_prompt: &str,
        ) -> Result<crate::provider::LlmResponse, LlmError> {
            Err(LlmError::Unreachable("nobody home".to_string()))
        }
    }

    fn down_dispatcher() -> Dispatcher {
        let provider = Arc::new(LlmProvider::new(
            Box::new(DownBackend),
            StdDuration::from_secs(5),
        ));
        let store: Arc<dyn Store> = Arc::new(SqliteStore::open_in_memory().unwrap());
        Dispatcher::new(ExtractionEngine::new(provider), store)
    }

    #[tokio::test]
    async fn test_meeting_request_creates_event() {
        let dispatcher = demo_dispatcher();
        let outcome = dispatcher.process("Meeting with John tomorrow at 3pm").await;

        assert_eq!(outcome.actions_taken.len(), 1);
        assert!(outcome.actions_taken[0].starts_with("created_event:"));
        assert!(!outcome.response.is_empty());

        let events = dispatcher
            .store()
            .list_events(&EventFilter::default())
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Meeting with John");
        assert_eq!(
            events[0].end_time - events[0].start_time,
            chrono::Duration::hours(1)
        );
    }

    #[tokio::test]
    async fn test_reminder_creates_pending_medium_todo() {
        let dispatcher = demo_dispatcher();
        let outcome = dispatcher.process("Remind me to buy milk tomorrow").await;

        assert!(outcome.actions_taken[0].starts_with("created_todo:"));
        let todos = dispatcher
            .store()
            .list_todos(&TodoFilter::default())
            .unwrap();
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0].priority, crate::model::Priority::Medium);
        assert_eq!(todos[0].status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn test_query_returns_data() {
        let dispatcher = demo_dispatcher();
        dispatcher.process("Remind me to buy milk").await;

        let outcome = dispatcher.process("What tasks do I have today?").await;
        assert!(outcome.actions_taken.iter().any(|a| a.starts_with("found_todos:")));
        assert_eq!(outcome.data["todos"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_degraded_create_gets_apology() {
        let dispatcher = down_dispatcher();
        let outcome = dispatcher.process("Meeting with John tomorrow at 3pm").await;

        assert!(outcome.actions_taken.is_empty());
        assert!(outcome.response.contains("rephrase"));
        assert!(dispatcher
            .store()
            .list_events(&EventFilter::default())
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_degraded_query_still_served() {
        let dispatcher = down_dispatcher();
        let outcome = dispatcher.process("What meetings do I have today?").await;

        assert!(outcome.actions_taken.iter().any(|a| a.starts_with("found_events:")));
        assert!(outcome.data.get("events").is_some());
    }

    #[tokio::test]
    async fn test_usage_recorded_per_call() {
        let dispatcher = demo_dispatcher();
        dispatcher.process("Remind me to buy milk").await;
        // Demo calls are free but still land in the ledger
        assert_eq!(dispatcher.store().usage_total_cost().unwrap(), 0.0);
    }

    #[test]
    fn test_classify_intent() {
        assert_eq!(classify_intent("schedule a meeting").0, Intent::Calendar);
        assert_eq!(classify_intent("add a task for me").0, Intent::Task);
        assert_eq!(classify_intent("save this phone number").0, Intent::Contact);
        assert_eq!(classify_intent("what is on my calendar?").0, Intent::Query);
        assert_eq!(classify_intent("blorp").0, Intent::Unknown);
    }

    #[test]
    fn test_estimate_cost() {
        assert_eq!(estimate_cost("demo", Some(1000)), 0.0);
        assert!((estimate_cost("hosted", Some(2000)) - 0.006).abs() < 1e-9);
        assert_eq!(estimate_cost("hosted", None), 0.0);
    }

    #[tokio::test]
    async fn test_unrecognized_text_takes_no_action() {
        let dispatcher = demo_dispatcher();
        let outcome = dispatcher.process("the quick brown fox").await;
        assert!(outcome.actions_taken.is_empty());
        assert!(!outcome.response.is_empty());
    }
}

//! Extraction engine: natural language → structured action bundle.
//!
//! The model is prompted to answer with one JSON object; this module
//! owns that schema, the context injected alongside it, and the
//! progressively-more-forgiving parse of whatever comes back. Parse
//! problems never surface as errors, only as the failure bundle.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::model::{
    CalendarEvent, Contact, ContactDraft, EventDraft, FileActivityDraft, TodoDraft,
};
use crate::provider::{LlmProvider, LlmResponse};

/// Marker separating the instruction preamble from the raw user text.
pub(crate) const USER_TEXT_MARKER: &str = "User request:";

const FAILURE_RESPONSE: &str =
    "I had trouble understanding that request. Could you rephrase it?";

fn default_response() -> String {
    "I've processed your request.".to_string()
}

/// Loose event fields as the model emits them. Semantic validation
/// happens at entity construction, not here.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EventCandidate {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub attendees: Vec<String>,
    #[serde(default)]
    pub all_day: bool,
}

impl EventCandidate {
    pub fn into_draft(self) -> EventDraft {
        EventDraft {
            title: self.title,
            description: self.description,
            start_time: self.start_time.unwrap_or_default(),
            end_time: self.end_time,
            location: self.location,
            event_type: self.event_type,
            attendees: self.attendees,
            reminder_minutes: None,
            recurrence_rule: None,
            all_day: self.all_day,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TodoCandidate {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl TodoCandidate {
    pub fn into_draft(self) -> TodoDraft {
        TodoDraft {
            title: self.title,
            description: self.description,
            priority: self.priority,
            due_date: self.due_date,
            tags: self.tags,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ContactCandidate {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ContactCandidate {
    pub fn into_draft(self) -> ContactDraft {
        ContactDraft {
            name: self.name,
            email: self.email,
            phone: self.phone,
            company: self.company,
            notes: self.notes,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FileActionCandidate {
    #[serde(default)]
    pub filepath: String,
    #[serde(default)]
    pub action: String,
}

impl FileActionCandidate {
    pub fn into_draft(self) -> FileActivityDraft {
        FileActivityDraft {
            filepath: self.filepath,
            action: self.action,
            ..Default::default()
        }
    }
}

/// A lookup request rather than a creation.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct QueryCandidate {
    #[serde(default)]
    pub query_type: Option<String>,
    #[serde(default)]
    pub timeframe: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
}

/// Everything extracted from one request. Missing keys are backfilled
/// by the serde defaults, so a partial object still parses.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractionBundle {
    #[serde(default)]
    pub calendar_events: Vec<EventCandidate>,
    #[serde(default)]
    pub todos: Vec<TodoCandidate>,
    #[serde(default)]
    pub contacts: Vec<ContactCandidate>,
    #[serde(default)]
    pub file_actions: Vec<FileActionCandidate>,
    #[serde(default)]
    pub queries: Vec<QueryCandidate>,
    #[serde(default = "default_response")]
    pub response: String,
}

impl ExtractionBundle {
    /// Deterministic bundle for when the model output (or the model
    /// itself) is unusable: nothing extracted, canned apology.
    pub fn failure() -> Self {
        ExtractionBundle {
            calendar_events: Vec::new(),
            todos: Vec::new(),
            contacts: Vec::new(),
            file_actions: Vec::new(),
            queries: Vec::new(),
            response: FAILURE_RESPONSE.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.calendar_events.is_empty()
            && self.todos.is_empty()
            && self.contacts.is_empty()
            && self.file_actions.is_empty()
            && self.queries.is_empty()
    }
}

/// Store-derived context injected into the system prompt so the model
/// can resolve references like "John" or "my next meeting".
#[derive(Debug, Clone, Default)]
pub struct ExtractionContext {
    pub recent_contacts: Vec<Contact>,
    pub upcoming_events: Vec<CalendarEvent>,
    pub user_id: Option<Uuid>,
}

pub struct ExtractionEngine {
    provider: Arc<LlmProvider>,
}

impl ExtractionEngine {
    pub fn new(provider: Arc<LlmProvider>) -> Self {
        ExtractionEngine { provider }
    }

    pub fn provider(&self) -> &LlmProvider {
        &self.provider
    }

    /// Run one extraction. Returns the bundle plus the raw provider
    /// response when there was one; `None` means the provider failed
    /// and the bundle is the degraded fallback.
    pub async fn extract(
        &self,
        text: &str,
        context: &ExtractionContext,
    ) -> (ExtractionBundle, Option<LlmResponse>) {
        let system_prompt = build_system_prompt(context);
        let prompt = format!("{USER_TEXT_MARKER} \"{text}\"");

        match self.provider.generate_response(&prompt, &system_prompt).await {
            Ok(response) => {
                let bundle = parse_extraction(&response.content).unwrap_or_else(|| {
                    warn!("Unparseable model output, using failure bundle");
                    ExtractionBundle::failure()
                });
                debug!(
                    events = bundle.calendar_events.len(),
                    todos = bundle.todos.len(),
                    contacts = bundle.contacts.len(),
                    queries = bundle.queries.len(),
                    "extraction complete"
                );
                (bundle, Some(response))
            }
            Err(err) => {
                warn!("Provider call failed, degrading: {err}");
                (ExtractionBundle::failure(), None)
            }
        }
    }
}

/// The instruction preamble: JSON schema stated verbatim plus current
/// time and a slice of the user's data for reference resolution.
fn build_system_prompt(context: &ExtractionContext) -> String {
    let mut prompt = String::from(
        "You are an assistant that extracts structured actions from requests. \
         Respond with ONLY a JSON object, no prose, in this shape:\n\
         {\n\
           \"calendar_events\": [{\"title\", \"start_time\", \"end_time\", \"location\", \"event_type\", \"attendees\", \"all_day\"}],\n\
           \"todos\": [{\"title\", \"description\", \"priority\", \"due_date\", \"tags\"}],\n\
           \"contacts\": [{\"name\", \"email\", \"phone\", \"company\", \"notes\"}],\n\
           \"file_actions\": [{\"filepath\", \"action\"}],\n\
           \"queries\": [{\"query_type\", \"timeframe\", \"search\"}],\n\
           \"response\": \"short confirmation for the user\"\n\
         }\n\
         Datetimes are ISO 8601. event_type is one of meeting, task, reminder, \
         personal, work, appointment, deadline. priority is one of low, medium, \
         high, urgent. query_type is one of events, todos, contacts; timeframe \
         is today or week. If a time is missing use 09:00 for todos and one hour \
         from now for events; events without an end_time run one hour.\n",
    );

    prompt.push_str(&format!("Current time: {}\n", Utc::now().to_rfc3339()));

    if !context.recent_contacts.is_empty() {
        prompt.push_str("Known contacts:\n");
        for contact in context.recent_contacts.iter().take(5) {
            match &contact.email {
                Some(email) => prompt.push_str(&format!("- {} <{}>\n", contact.name, email)),
                None => prompt.push_str(&format!("- {}\n", contact.name)),
            }
        }
    }
    if !context.upcoming_events.is_empty() {
        prompt.push_str("Upcoming events:\n");
        for event in context.upcoming_events.iter().take(3) {
            prompt.push_str(&format!(
                "- {} at {}\n",
                event.title,
                event.start_time.to_rfc3339()
            ));
        }
    }

    prompt
}

/// Parse model output into a bundle: strip code fencing, try the whole
/// string, then fall back to the first-`{`-to-last-`}` slice.
fn parse_extraction(content: &str) -> Option<ExtractionBundle> {
    let stripped = strip_fences(content);

    if let Ok(bundle) = serde_json::from_str::<ExtractionBundle>(stripped) {
        return Some(bundle);
    }

    let start = stripped.find('{')?;
    let end = stripped.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<ExtractionBundle>(&stripped[start..=end]).ok()
}

fn strip_fences(content: &str) -> &str {
    let mut text = content.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::provider::{DemoBackend, LlmProvider};

    #[test]
    fn test_parse_plain_json() {
        let bundle = parse_extraction(r#"{"todos": [{"title": "buy milk"}]}"#).unwrap();
        assert_eq!(bundle.todos.len(), 1);
        assert_eq!(bundle.todos[0].title, "buy milk");
        // Missing keys backfilled by defaults
        assert!(bundle.calendar_events.is_empty());
        assert_eq!(bundle.response, "I've processed your request.");
    }

    #[test]
    fn test_parse_strips_json_fences() {
        let fenced = "```json\n{\"response\": \"done\"}\n```";
        let bundle = parse_extraction(fenced).unwrap();
        assert_eq!(bundle.response, "done");

        let bare_fence = "```\n{\"response\": \"done\"}\n```";
        assert!(parse_extraction(bare_fence).is_some());
    }

    #[test]
    fn test_parse_brace_slice_fallback() {
        let chatty = "Sure! Here is the extraction:\n{\"response\": \"ok\"}\nHope that helps!";
        let bundle = parse_extraction(chatty).unwrap();
        assert_eq!(bundle.response, "ok");
    }

    #[test]
    fn test_parse_garbage_is_none() {
        assert!(parse_extraction("not json at all").is_none());
        assert!(parse_extraction("").is_none());
        assert!(parse_extraction("{ broken").is_none());
    }

    #[test]
    fn test_failure_bundle_shape() {
        let bundle = ExtractionBundle::failure();
        assert!(bundle.is_empty());
        assert!(bundle.response.contains("rephrase"));
    }

    #[tokio::test]
    async fn test_extract_with_demo_backend() {
        let provider = Arc::new(LlmProvider::new(
            Box::new(DemoBackend::new()),
            Duration::from_secs(5),
        ));
        let engine = ExtractionEngine::new(provider);

        let (bundle, response) = engine
            .extract("Meeting with John tomorrow at 3pm", &ExtractionContext::default())
            .await;
        assert!(response.is_some());
        assert_eq!(bundle.calendar_events.len(), 1);
        assert_eq!(bundle.calendar_events[0].title, "Meeting with John");
        assert!(!bundle.response.is_empty());
    }

    #[tokio::test]
    async fn test_extract_nonsense_still_answers() {
        let provider = Arc::new(LlmProvider::new(
            Box::new(DemoBackend::new()),
            Duration::from_secs(5),
        ));
        let engine = ExtractionEngine::new(provider);

        let (bundle, response) = engine
            .extract("the quick brown fox", &ExtractionContext::default())
            .await;
        assert!(response.is_some());
        assert!(bundle.is_empty());
        assert!(!bundle.response.is_empty());
    }
}

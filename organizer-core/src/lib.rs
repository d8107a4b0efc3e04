//! Core library for the organizer assistant.
//!
//! Turns natural-language requests into validated entities and store
//! writes:
//! - `validate` and `model` for input sanitation and the entity types
//! - `provider` for the LLM backend abstraction
//! - `extract` for the prompt/parse pipeline
//! - `dispatch` for applying an extraction to the store
//! - `store` for the SQLite and flat-file backends

pub mod config;
pub mod dispatch;
pub mod error;
pub mod extract;
pub mod model;
pub mod provider;
pub mod store;
pub mod validate;

pub use config::{Settings, StoreBackend};
pub use dispatch::{Dispatcher, ProcessOutcome};
pub use error::{OrganizerError, OrganizerResult};
pub use extract::{ExtractionBundle, ExtractionContext, ExtractionEngine};
pub use provider::{LlmError, LlmProvider, create_provider};
pub use store::{JsonFileStore, SqliteStore, Store};

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use organizer_core::provider::{DemoBackend, LlmProvider};
use organizer_core::{
    Dispatcher, ExtractionEngine, JsonFileStore, Settings, SqliteStore, Store, StoreBackend,
    create_provider,
};

/// Shared application state: one store, one provider, one dispatcher,
/// built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub provider: Arc<LlmProvider>,
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(settings: &Settings) -> Result<Self> {
        let store: Arc<dyn Store> = match settings.store_backend {
            StoreBackend::Sqlite => Arc::new(SqliteStore::open(&settings.db_path)?),
            StoreBackend::Json => Arc::new(JsonFileStore::open(&settings.data_dir)?),
        };

        // A misconfigured provider should not keep the server down;
        // fall back to the offline demo backend.
        let provider = match create_provider(settings) {
            Ok(provider) => provider,
            Err(err) => {
                warn!(
                    "Failed to initialize '{}' provider ({err}), falling back to demo",
                    settings.llm_provider
                );
                LlmProvider::new(
                    Box::new(DemoBackend::new()),
                    std::time::Duration::from_secs(settings.llm_timeout_secs),
                )
            }
        };
        let provider = Arc::new(provider);
        info!(provider = provider.name(), model = provider.model(), "LLM provider ready");

        let dispatcher = Arc::new(Dispatcher::new(
            ExtractionEngine::new(Arc::clone(&provider)),
            Arc::clone(&store),
        ));

        Ok(AppState {
            store,
            provider,
            dispatcher,
        })
    }
}

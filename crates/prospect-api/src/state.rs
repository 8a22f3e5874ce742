//! Application state wiring the engine to its infrastructure.
//!
//! The engine is generic over its backend/guard/transport/store ports;
//! `AppState` pins those generics to the concrete infra implementations
//! and holds the reply channel SSE handlers subscribe to.

use std::path::PathBuf;

use prospect_core::engine::Engine;
use prospect_core::guard::ForbiddenPhrases;
use prospect_infra::config::{load_engine_config, resolve_data_dir};
use prospect_infra::llm::{OpenAiCompatBackend, OpenAiCompatConfig};
use prospect_infra::sqlite::pool::{DatabasePool, database_url};
use prospect_infra::sqlite::transcript::SqliteTranscriptStore;
use prospect_infra::transport::{AnyTransport, ChannelTransport};

/// Engine generics pinned to the concrete infra implementations.
pub type ConcreteEngine =
    Engine<OpenAiCompatBackend, ForbiddenPhrases, AnyTransport, SqliteTranscriptStore>;

/// Shared application state for CLI commands and REST handlers.
///
/// Cloning is cheap; the engine and the reply channel are shared handles.
#[derive(Clone)]
pub struct AppState {
    pub engine: ConcreteEngine,
    /// Per-chat reply fan-out. SSE connections subscribe here; the engine
    /// delivers through it directly in channel mode and mirrors into it in
    /// webhook mode.
    pub events: ChannelTransport,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Initialize the application state: resolve the data directory, load
    /// configuration, open the database, and wire the engine.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();

        // Ensure data directory exists
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_engine_config(&data_dir).await;

        let pool = DatabasePool::new(&database_url(&data_dir)).await?;
        let store = SqliteTranscriptStore::new(pool);

        // An absent key still wires a backend; `serve` refuses to start
        // without one, and the other commands never call it.
        let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        let backend_config = match std::env::var("OPENAI_API_BASE") {
            Ok(base) => OpenAiCompatConfig::compatible(&api_key, base),
            Err(_) => OpenAiCompatConfig::openai(&api_key),
        };
        let backend = OpenAiCompatBackend::new(backend_config);

        let guard = ForbiddenPhrases::new(config.forbidden_phrases.clone());

        let events = ChannelTransport::new();
        let transport = AnyTransport::from_config(&config.transport, events.clone())?;

        let engine = Engine::new(backend, guard, transport, store, config);

        Ok(Self {
            engine,
            events,
            data_dir,
        })
    }
}

//! Application state wiring the dispatcher to its infrastructure.
//!
//! The dispatcher is generic over repository/store/engine traits; AppState
//! pins it to the concrete SQLite and HTTP implementations.

use std::sync::Arc;

use anyhow::Context;
use hookline_core::dispatch::WebhookDispatcher;
use hookline_core::serializer::GraphSerializer;
use hookline_infra::airtable::HttpAirtablePayloadsApi;
use hookline_infra::crypto::VaultCrypto;
use hookline_infra::engine::HttpExecutionEngine;
use hookline_infra::sqlite::dedup::SqliteDedupStore;
use hookline_infra::sqlite::execution_log::SqliteExecutionLogSink;
use hookline_infra::sqlite::pool::DatabasePool;
use hookline_infra::sqlite::secret::SqliteSecretStore;
use hookline_infra::sqlite::webhook::SqliteWebhookRepository;
use hookline_infra::sqlite::workflow::SqliteWorkflowRepository;

/// The dispatcher generics pinned to the concrete infra implementations.
pub type ConcreteDispatcher = WebhookDispatcher<
    SqliteWebhookRepository,
    SqliteWorkflowRepository,
    SqliteDedupStore,
    SqliteSecretStore,
    GraphSerializer,
    HttpExecutionEngine,
    SqliteExecutionLogSink,
    HttpAirtablePayloadsApi,
>;

/// Shared application state for the HTTP handlers and background tasks.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<ConcreteDispatcher>,
    /// Separate handle for the periodic expired-key sweep.
    pub dedup: Arc<SqliteDedupStore>,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: connect to the database, load the
    /// vault key, wire the dispatcher.
    pub async fn init(database_url: &str, engine_url: &str) -> anyhow::Result<Self> {
        let db_pool = DatabasePool::new(database_url)
            .await
            .with_context(|| format!("failed to open database at {database_url}"))?;

        let vault_crypto =
            VaultCrypto::from_env().context("vault key unavailable (set HOOKLINE_VAULT_KEY)")?;

        let dispatcher = WebhookDispatcher::new(
            SqliteWebhookRepository::new(db_pool.clone()),
            SqliteWorkflowRepository::new(db_pool.clone()),
            SqliteDedupStore::new(db_pool.clone()),
            SqliteSecretStore::new(db_pool.clone(), vault_crypto),
            GraphSerializer::new(),
            HttpExecutionEngine::new(engine_url.to_string()),
            SqliteExecutionLogSink::new(db_pool.clone()),
            HttpAirtablePayloadsApi::new(),
        );

        Ok(Self {
            dispatcher: Arc::new(dispatcher),
            dedup: Arc::new(SqliteDedupStore::new(db_pool.clone())),
            db_pool,
        })
    }
}

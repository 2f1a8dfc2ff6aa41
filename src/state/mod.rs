use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::BotError;
use crate::location::Resolver;
use crate::store::Store;
use crate::types::Session;

/// Shared state for handlers, the scheduler, and the HTTP API.
pub struct BotState {
    pub store: Store,
    pub resolver: Arc<dyn Resolver>,
    /// Advisory per-user locks so a double-tapped button cannot race two
    /// conversation mutations against the same session row.
    user_locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl BotState {
    pub fn new(store: Store, resolver: Arc<dyn Resolver>) -> Self {
        Self { store, resolver, user_locks: Mutex::new(HashMap::new()) }
    }

    /// The lock for one telegram id; hold the guard across the whole
    /// conversation step.
    pub async fn user_lock(&self, telegram_id: i64) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock().await;
        locks.entry(telegram_id).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// The stored session for a user, or a fresh default one.
    pub async fn session_or_default(&self, telegram_id: i64) -> Result<Session, BotError> {
        Ok(self.store.session_for(telegram_id).await?.unwrap_or_default())
    }
}

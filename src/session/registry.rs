//! Per-token session cells shared across requests.
//!
//! Requests carrying the same access token resolve against one live
//! `SessionCell`, so only the first request pays the provider round trip and
//! later sign-out or refresh events are already reflected. Cells that settle
//! signed out are dropped immediately. Cells older than the configured max age
//! are replaced on their next lookup and swept out whenever a new cell is
//! inserted, so tokens nobody presents again do not pin a cell.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;

use super::{SessionCell, SessionState};
use crate::auth::AuthProvider;
use crate::config::SessionConfig;

struct Entry {
    cell: Arc<SessionCell>,
    created: Instant,
}

#[derive(Clone)]
pub struct SessionRegistry {
    provider: Arc<dyn AuthProvider>,
    cells: Arc<RwLock<HashMap<String, Entry>>>,
    config: SessionConfig,
}

impl SessionRegistry {
    #[must_use]
    pub fn new(provider: Arc<dyn AuthProvider>, config: SessionConfig) -> Self {
        Self { provider, cells: Arc::new(RwLock::new(HashMap::new())), config }
    }

    /// Resolve the settled session state for `token`.
    ///
    /// If the cell does not settle within the configured timeout the loading
    /// state is returned as-is and the caller decides what to render.
    pub async fn resolve(&self, token: &str) -> SessionState {
        let cell = self.cell_for(token).await;
        let state = match tokio::time::timeout(self.config.settle_timeout, cell.settled()).await {
            Ok(state) => state,
            Err(_) => cell.snapshot(),
        };
        if !state.is_loading && state.user.is_none() {
            self.forget(token).await;
        }
        state
    }

    /// Drop the cell for `token`, unmounting it once no request holds it.
    pub async fn forget(&self, token: &str) {
        if self.cells.write().await.remove(token).is_some() {
            debug!("session cell released");
        }
    }

    #[must_use]
    pub async fn len(&self) -> usize {
        self.cells.read().await.len()
    }

    async fn cell_for(&self, token: &str) -> Arc<SessionCell> {
        let max_age = self.config.cell_max_age;
        {
            let cells = self.cells.read().await;
            if let Some(entry) = cells.get(token).filter(|e| is_fresh(e.created, max_age)) {
                return Arc::clone(&entry.cell);
            }
        }

        let mut cells = self.cells.write().await;
        if let Some(entry) = cells.get(token).filter(|e| is_fresh(e.created, max_age)) {
            return Arc::clone(&entry.cell);
        }
        // Sweep while holding the lock; abandoned tokens are never looked up again.
        let before = cells.len();
        cells.retain(|_, entry| is_fresh(entry.created, max_age));
        let evicted = before - cells.len();
        if evicted > 0 {
            debug!(evicted, "aged session cells evicted");
        }
        let cell = Arc::new(SessionCell::spawn(Arc::clone(&self.provider), token));
        cells.insert(token.to_owned(), Entry { cell: Arc::clone(&cell), created: Instant::now() });
        cell
    }
}

fn is_fresh(created: Instant, max_age: Duration) -> bool {
    created.elapsed() < max_age
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;

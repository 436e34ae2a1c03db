//! Persistence of refreshed tokens.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tnse_core::TokenSet;
use tracing::{debug, warn};

use crate::api::TokenObserver;
use crate::store::ConfigStore;

/// Writes token sets reported by the API client back to the config entry.
///
/// Only the four token keys are touched. Inside a tokio runtime the write
/// runs on the blocking pool and the callback returns immediately. A write
/// older than one already persisted is skipped. Store failures are logged
/// and swallowed; the client keeps working with the in-memory tokens.
pub struct CredentialSink {
    entry_id: String,
    store: Arc<dyn ConfigStore>,
    issued: AtomicU64,
    written: Arc<Mutex<u64>>,
}

impl CredentialSink {
    /// Creates a sink writing to `store`.
    pub fn new(entry_id: impl Into<String>, store: Arc<dyn ConfigStore>) -> Self {
        Self {
            entry_id: entry_id.into(),
            store,
            issued: AtomicU64::new(0),
            written: Arc::new(Mutex::new(0)),
        }
    }
}

impl TokenObserver for CredentialSink {
    fn on_tokens_refreshed(&self, tokens: &TokenSet) {
        debug!("Tokens updated, persisting to config entry {}", self.entry_id);

        let write = PendingWrite {
            entry_id: self.entry_id.clone(),
            store: self.store.clone(),
            written: self.written.clone(),
            generation: self.issued.fetch_add(1, Ordering::SeqCst) + 1,
            patch: tokens.to_patch(),
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || write.persist());
            },
            Err(_) => write.persist(),
        }
    }
}

/// One queued token write.
struct PendingWrite {
    entry_id: String,
    store: Arc<dyn ConfigStore>,
    written: Arc<Mutex<u64>>,
    generation: u64,
    patch: Map<String, Value>,
}

impl PendingWrite {
    fn persist(self) {
        let mut written = self.written.lock();
        if *written > self.generation {
            debug!(
                "Skipping stale token write for {} (generation {})",
                self.entry_id, self.generation
            );
            return;
        }

        match self.store.update_data(self.patch) {
            Ok(()) => *written = self.generation,
            Err(e) => warn!("Failed to persist tokens for {}: {}", self.entry_id, e),
        }
    }
}

impl std::fmt::Debug for CredentialSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSink")
            .field("entry_id", &self.entry_id)
            .finish_non_exhaustive()
    }
}

//! Fire-and-forget view counting
//!
//! Each browser preview spawns a detached task that appends one row to the
//! analytics table. The response never waits on it and never sees its
//! failure.

use soundraiser_common::ViewEvent;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::store::LinkStore;

#[derive(Clone)]
pub struct ViewRecorder {
    store: Arc<dyn LinkStore>,
    enabled: bool,
}

impl ViewRecorder {
    pub fn new(store: Arc<dyn LinkStore>, enabled: bool) -> Self {
        Self { store, enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Spawn the insert for `event`
    ///
    /// Returns the task handle so tests can await completion; request
    /// handlers drop it. `None` when recording is disabled.
    pub fn record(&self, event: ViewEvent) -> Option<JoinHandle<()>> {
        if !self.enabled {
            return None;
        }

        let store = Arc::clone(&self.store);
        Some(tokio::spawn(async move {
            match store.record_view(&event).await {
                Ok(()) => debug!(link_id = %event.link_id, "View recorded"),
                Err(e) => warn!(link_id = %event.link_id, "Failed to record view: {}", e),
            }
        }))
    }
}

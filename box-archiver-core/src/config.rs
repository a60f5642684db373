use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Process-wide sync settings. Built once at startup and passed by
/// reference; nothing in the pipeline reads the environment mid-run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// The single remote folder every upload targets. Not traversed recursively.
    pub folder_id: String,
}

impl SyncConfig {
    pub fn new(folder_id: impl Into<String>) -> Self {
        SyncConfig {
            folder_id: folder_id.into(),
        }
    }

    pub fn trace_loaded(&self) {
        info!(folder_id = %self.folder_id, "Loaded SyncConfig");
        debug!(?self, "SyncConfig loaded (full debug)");
    }
}

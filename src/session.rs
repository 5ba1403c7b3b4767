//! Session state: the per-session context object behind the service.
//!
//! Each interactive session holds the most recent [`DiagnosticRecord`],
//! the attachment previews it was generated from, and the follow-up panel
//! flag. The state is an explicit object keyed by session id in an
//! in-memory store — never a process-wide singleton — so every handler
//! receives exactly the context it operates on.
//!
//! Lifecycle: created on first interaction, replaced by each Generate
//! Diagnosis action, torn down with the process. Sessions never expire on
//! a timer.

use crate::diagnose::DiagnosisOutcome;
use crate::record::DiagnosticRecord;
use crate::report::AttachmentPreview;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// The mutable state of one interactive session.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// The last structured record, if a diagnosis has been generated.
    pub record: Option<DiagnosticRecord>,
    /// Previews of the attachments the record was generated from.
    pub previews: Vec<AttachmentPreview>,
    /// Whether the follow-up recommendations panel is visible.
    pub show_followup: bool,
    /// Surfaced failure text from the last generation, if any.
    pub failure_notice: Option<String>,
    /// Ingestion warnings from the last generation.
    pub warnings: Vec<String>,
}

impl SessionState {
    /// Replace the generation results, leaving the follow-up flag as the
    /// user last set it.
    pub fn store_outcome(&mut self, outcome: &DiagnosisOutcome) {
        self.record = Some(outcome.record.clone());
        self.previews = outcome.previews.clone();
        self.failure_notice = outcome.failure_notice.clone();
        self.warnings = outcome.warnings.iter().map(|w| w.to_string()).collect();
    }
}

/// In-memory session store shared by all handlers.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, SessionState>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh session and return its id.
    pub async fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions
            .write()
            .await
            .insert(id, SessionState::default());
        id
    }

    /// Snapshot a session's state. `None` when the id is unknown.
    pub async fn get(&self, id: Uuid) -> Option<SessionState> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Mutate a session in place. Returns the closure's result, or `None`
    /// when the id is unknown.
    pub async fn update<R>(
        &self,
        id: Uuid,
        mutate: impl FnOnce(&mut SessionState) -> R,
    ) -> Option<R> {
        self.sessions.write().await.get_mut(&id).map(mutate)
    }
}

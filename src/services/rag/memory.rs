//! Per-session conversation memory and the lock table that serializes asks
//!
//! The map itself sits behind an `RwLock` held only long enough to clone an
//! `Arc<SessionSlot>`. Each slot carries its own `Mutex`, so one session's
//! ask never blocks another's.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use uuid::Uuid;

use crate::error::{DocQaError, Result};
use crate::models::ConversationSession;

/// Where a session's current ask is in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PipelineStage {
    Idle = 0,
    Contextualizing = 1,
    Retrieving = 2,
    Generating = 3,
    Error = 4,
}

impl PipelineStage {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => PipelineStage::Contextualizing,
            2 => PipelineStage::Retrieving,
            3 => PipelineStage::Generating,
            4 => PipelineStage::Error,
            _ => PipelineStage::Idle,
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineStage::Idle => "idle",
            PipelineStage::Contextualizing => "contextualizing",
            PipelineStage::Retrieving => "retrieving",
            PipelineStage::Generating => "generating",
            PipelineStage::Error => "error",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub struct SessionSlot {
    conversation: Mutex<ConversationSession>,
    stage: AtomicU8,
}

impl SessionSlot {
    fn new(session: ConversationSession) -> Self {
        Self {
            conversation: Mutex::new(session),
            stage: AtomicU8::new(PipelineStage::Idle as u8),
        }
    }

    pub fn stage(&self) -> PipelineStage {
        PipelineStage::from_u8(self.stage.load(Ordering::Acquire))
    }

    fn set_stage(&self, stage: PipelineStage) {
        self.stage.store(stage as u8, Ordering::Release);
    }

    pub async fn lock(&self) -> MutexGuard<'_, ConversationSession> {
        self.conversation.lock().await
    }

    /// Start tracking a pipeline run; the slot returns to `Idle` when the
    /// guard drops, whatever happened in between
    pub fn enter(&self) -> StageGuard<'_> {
        StageGuard { slot: self }
    }
}

pub struct StageGuard<'a> {
    slot: &'a SessionSlot,
}

impl StageGuard<'_> {
    pub fn advance(&self, stage: PipelineStage) {
        tracing::trace!(%stage, "Pipeline stage");
        self.slot.set_stage(stage);
    }

    pub fn fail(&self, error: &DocQaError) {
        tracing::debug!(
            from = %self.slot.stage(),
            category = error.category(),
            "Pipeline failed"
        );
        self.slot.set_stage(PipelineStage::Error);
    }
}

impl Drop for StageGuard<'_> {
    fn drop(&mut self) {
        self.slot.set_stage(PipelineStage::Idle);
    }
}

/// All live conversations of one orchestrator
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<SessionSlot>>>,
    max_turns: usize,
}

impl SessionStore {
    pub fn new(max_turns: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_turns,
        }
    }

    /// Create a session under a fresh UUID
    pub async fn open(&self, document_id: Option<String>) -> String {
        let id = Uuid::new_v4().to_string();
        let session = ConversationSession::new(id.clone(), document_id, self.max_turns);
        self.sessions
            .write()
            .await
            .insert(id.clone(), Arc::new(SessionSlot::new(session)));
        id
    }

    /// Get or create `id`; an existing session bound to another document is
    /// rebound and its history cleared
    pub async fn open_with_id(&self, id: &str, document_id: Option<String>) -> Arc<SessionSlot> {
        let slot = {
            let mut sessions = self.sessions.write().await;
            if let Some(slot) = sessions.get(id) {
                slot.clone()
            } else {
                let session = ConversationSession::new(id, document_id, self.max_turns);
                let slot = Arc::new(SessionSlot::new(session));
                sessions.insert(id.to_string(), slot.clone());
                return slot;
            }
        };

        let mut session = slot.lock().await;
        if session.document_id != document_id {
            tracing::debug!(
                session_id = id,
                from = ?session.document_id,
                to = ?document_id,
                "Rebinding session to another document"
            );
            session.document_id = document_id;
            session.clear();
        }
        drop(session);
        slot
    }

    pub async fn get(&self, id: &str) -> Result<Arc<SessionSlot>> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| DocQaError::session_not_found(id))
    }

    pub async fn remove(&self, id: &str) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    /// Drop sessions idle for longer than `max_idle`
    ///
    /// Sessions with an ask in flight are skipped.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|_, slot| match slot.conversation.try_lock() {
            Ok(session) => session
                .idle_for(now)
                .to_std()
                .map_or(true, |idle| idle < max_idle),
            Err(_) => true,
        });

        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!(evicted, remaining = sessions.len(), "Evicted idle sessions");
        }
        evicted
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

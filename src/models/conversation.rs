use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnRole::User => write!(f, "user"),
            TurnRole::Assistant => write!(f, "assistant"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationTurn {
    pub id: Uuid,
    pub role: TurnRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, content)
    }
}

/// Bounded turn log for one conversation
///
/// Turns are only ever added as a user/assistant pair, so the log always
/// alternates starting with a user turn. When it grows past `max_turns` the
/// oldest pair is dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSession {
    pub id: String,
    /// `None` for general chat without a document
    pub document_id: Option<String>,
    turns: VecDeque<ConversationTurn>,
    max_turns: usize,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl ConversationSession {
    /// `max_turns` is raised to the nearest even number of at least 2
    pub fn new(id: impl Into<String>, document_id: Option<String>, max_turns: usize) -> Self {
        let max_turns = max_turns.max(2);
        let now = Utc::now();
        Self {
            id: id.into(),
            document_id,
            turns: VecDeque::with_capacity(max_turns + 2),
            max_turns: max_turns + max_turns % 2,
            created_at: now,
            last_active: now,
        }
    }

    pub fn turns(&self) -> impl ExactSizeIterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    pub fn history(&self) -> Vec<ConversationTurn> {
        self.turns.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Record one completed exchange, evicting the oldest pairs past the bound
    pub fn append_exchange(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push_back(ConversationTurn::user(question));
        self.turns.push_back(ConversationTurn::assistant(answer));

        while self.turns.len() > self.max_turns {
            self.turns.pop_front();
            self.turns.pop_front();
        }

        self.touch();
    }

    pub fn clear(&mut self) {
        self.turns.clear();
        self.touch();
    }

    pub fn touch(&mut self) {
        self.last_active = Utc::now();
    }

    pub fn idle_for(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.last_active
    }
}

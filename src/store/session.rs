use super::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// One message in a chat session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self::now("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::now("assistant", content)
    }

    fn now(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Chat history keyed by session id
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn append(&self, session_id: &str, turn: ChatTurn) -> Result<(), StoreError>;

    /// Turns in insertion order, or `None` for an unknown session
    async fn history(&self, session_id: &str) -> Result<Option<Vec<ChatTurn>>, StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Vec<ChatTurn>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn append(&self, session_id: &str, turn: ChatTurn) -> Result<(), StoreError> {
        self.sessions
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .entry(session_id.to_string())
            .or_default()
            .push(turn);
        Ok(())
    }

    async fn history(&self, session_id: &str) -> Result<Option<Vec<ChatTurn>>, StoreError> {
        Ok(self
            .sessions
            .read()
            .map_err(|_| StoreError::Poisoned)?
            .get(session_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_history_keeps_order() {
        let store = InMemorySessionStore::new();
        store.append("s1", ChatTurn::user("hi")).await.unwrap();
        store.append("s1", ChatTurn::assistant("hello")).await.unwrap();

        let history = store.history("s1").await.unwrap().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, "user");
        assert_eq!(history[1].content, "hello");
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let store = InMemorySessionStore::new();
        assert_eq!(store.history("missing").await.unwrap(), None);
    }
}

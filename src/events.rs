//! The event-bus port: the active retriever reads recent error/learning
//! events to fold into retrieval, and emits learning events on every
//! exchange. The default
//! `InMemoryEventBus` is a capped ring buffer — enough for a single process
//! lifetime; a durable bus is a drop-in replacement behind the same trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use tokio::sync::RwLock;

const DEFAULT_CAPACITY: usize = 1000;

/// An error observed elsewhere in the assistant, folded into retrieval as a
/// weak relevance signal.
#[derive(Debug, Clone)]
pub struct ErrorEvent {
    pub error_type: String,
    pub message: String,
    pub recoverable: bool,
    pub timestamp: DateTime<Utc>,
}

/// A record that the system learned something, emitted on every exchange
/// and also consulted as a retrieval signal.
#[derive(Debug, Clone)]
pub struct LearningEvent {
    pub learning_type: String,
    pub data: std::collections::HashMap<String, String>,
    pub timestamp: DateTime<Utc>,
}

/// Category filter for `EventBus::query`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCategory {
    Error,
    Learning,
}

/// Either kind of event, returned by a category-filtered query.
#[derive(Debug, Clone)]
pub enum Event {
    Error(ErrorEvent),
    Learning(LearningEvent),
}

impl Event {
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Event::Error(e) => e.timestamp,
            Event::Learning(e) => e.timestamp,
        }
    }
}

/// External event-bus capability, both read during retrieval and written to
/// on every learned exchange.
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn record_error(&self, event: ErrorEvent);
    async fn record_learning(&self, event: LearningEvent);
    async fn query(&self, category: EventCategory, since: DateTime<Utc>, limit: usize) -> Vec<Event>;
}

/// In-process event bus backed by a capped deque. Oldest entries are
/// dropped once `DEFAULT_CAPACITY` is exceeded.
pub struct InMemoryEventBus {
    errors: RwLock<VecDeque<ErrorEvent>>,
    learnings: RwLock<VecDeque<LearningEvent>>,
    capacity: usize,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            errors: RwLock::new(VecDeque::new()),
            learnings: RwLock::new(VecDeque::new()),
            capacity,
        }
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn record_error(&self, event: ErrorEvent) {
        let mut errors = self.errors.write().await;
        errors.push_back(event);
        while errors.len() > self.capacity {
            errors.pop_front();
        }
    }

    async fn record_learning(&self, event: LearningEvent) {
        let mut learnings = self.learnings.write().await;
        learnings.push_back(event);
        while learnings.len() > self.capacity {
            learnings.pop_front();
        }
    }

    async fn query(&self, category: EventCategory, since: DateTime<Utc>, limit: usize) -> Vec<Event> {
        match category {
            EventCategory::Error => {
                let errors = self.errors.read().await;
                errors
                    .iter()
                    .rev()
                    .filter(|e| e.timestamp >= since)
                    .take(limit)
                    .cloned()
                    .map(Event::Error)
                    .collect()
            }
            EventCategory::Learning => {
                let learnings = self.learnings.read().await;
                learnings
                    .iter()
                    .rev()
                    .filter(|e| e.timestamp >= since)
                    .take(limit)
                    .cloned()
                    .map(Event::Learning)
                    .collect()
            }
        }
    }
}

//! Bounded conversation memory shared across scans in one session.

use std::collections::VecDeque;
use std::time::SystemTime;

/// One resolved question/answer pair.
///
/// `question` is only the textual part of the turn; screenshots are never
/// replayed into later requests.
#[derive(Clone, Debug, PartialEq)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
    pub at: SystemTime,
}

impl Exchange {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            at: SystemTime::now(),
        }
    }
}

/// Chronological exchanges, oldest evicted once `limit` is reached.
#[derive(Clone, Debug)]
pub struct ConversationContext {
    entries: VecDeque<Exchange>,
    limit: usize,
}

impl ConversationContext {
    /// A `limit` of zero is treated as one.
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            entries: VecDeque::with_capacity(limit),
            limit,
        }
    }

    pub fn push(&mut self, exchange: Exchange) {
        while self.entries.len() >= self.limit {
            self.entries.pop_front();
        }
        self.entries.push_back(exchange);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Exchange> {
        self.entries.iter()
    }
}

//! Transition history tracking.
//!
//! The engine records one entry per committed transition (including the
//! initial start) so hosts can inspect the path a machine took.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Record of a single committed transition.
///
/// Kinds are stored by their registry identifiers, so a history can be
/// serialized and inspected without the state types at hand.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Identifier of the state left behind (`None` for the initial start)
    pub from: Option<String>,
    /// Identifier of the state that became current
    pub to: String,
    /// When the transition was committed
    pub timestamp: DateTime<Utc>,
}

/// Bounded, ordered history of transitions.
///
/// Once `limit` records are held, recording a new one evicts the oldest.
/// A limit of zero disables recording altogether.
///
/// # Example
///
/// ```rust
/// use strata::core::{TransitionHistory, TransitionRecord};
/// use chrono::Utc;
///
/// let mut history = TransitionHistory::new(8);
/// history.record(TransitionRecord {
///     from: None,
///     to: "off".to_string(),
///     timestamp: Utc::now(),
/// });
/// history.record(TransitionRecord {
///     from: Some("off".to_string()),
///     to: "idle".to_string(),
///     timestamp: Utc::now(),
/// });
///
/// assert_eq!(history.get_path(), vec!["off", "idle"]);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransitionHistory {
    limit: usize,
    transitions: VecDeque<TransitionRecord>,
}

impl Default for TransitionHistory {
    fn default() -> Self {
        Self::new(64)
    }
}

impl TransitionHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            transitions: VecDeque::new(),
        }
    }

    /// Append a record, evicting the oldest one when the limit is reached.
    pub fn record(&mut self, transition: TransitionRecord) {
        if self.limit == 0 {
            return;
        }
        while self.transitions.len() >= self.limit {
            self.transitions.pop_front();
        }
        self.transitions.push_back(transition);
    }

    /// Identifiers of the states traversed, oldest first.
    ///
    /// Starts with the `from` of the oldest retained record when it has one.
    pub fn get_path(&self) -> Vec<&str> {
        let mut path = Vec::new();
        if let Some(from) = self.transitions.front().and_then(|t| t.from.as_deref()) {
            path.push(from);
        }
        for transition in &self.transitions {
            path.push(transition.to.as_str());
        }
        path
    }

    /// Time between the oldest and newest retained records.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.transitions.front(), self.transitions.back()) {
            last.timestamp
                .signed_duration_since(first.timestamp)
                .to_std()
                .ok()
        } else {
            None
        }
    }

    pub fn transitions(&self) -> impl ExactSizeIterator<Item = &TransitionRecord> + '_ {
        self.transitions.iter()
    }

    pub fn last(&self) -> Option<&TransitionRecord> {
        self.transitions.back()
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn clear(&mut self) {
        self.transitions.clear();
    }
}

//! Progress updates sent to the remote authority.

use serde::{Deserialize, Serialize};

use crate::id::UpdateId;
use crate::record::{Score, TopicProgress};
use crate::topic::TopicId;
use crate::Time;

/// Logical payload of a progress push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    /// Topic being updated
    pub topic: TopicId,

    /// Lecture was viewed
    pub viewed: bool,

    /// Practice was completed
    pub completed: bool,

    /// Quiz score, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz_score: Option<Score>,

    /// Code score, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_score: Option<Score>,
}

impl ProgressUpdate {
    /// Build the push for the current state of a topic.
    pub fn from_record(topic: TopicId, record: &TopicProgress) -> Self {
        Self {
            topic,
            viewed: record.is_viewed(),
            completed: record.is_completed(),
            quiz_score: record.quiz_score,
            code_score: record.code_score,
        }
    }

    /// Fold a newer update for the same topic into this one.
    ///
    /// Flags only ever turn on; newer scores replace older ones.
    pub fn coalesce(&mut self, newer: ProgressUpdate) {
        debug_assert_eq!(self.topic, newer.topic);
        self.viewed |= newer.viewed;
        self.completed |= newer.completed;
        if newer.quiz_score.is_some() {
            self.quiz_score = newer.quiz_score;
        }
        if newer.code_score.is_some() {
            self.code_score = newer.code_score;
        }
    }
}

/// An update that failed to reach the remote authority and waits for retry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingUpdate {
    /// Outbox entry id
    pub id: UpdateId,

    /// What to push
    pub update: ProgressUpdate,

    /// Delivery attempts made so far
    pub attempts: u32,

    /// When first queued
    pub queued_at: Time,
}

impl PendingUpdate {
    /// Queue an update.
    pub fn new(update: ProgressUpdate, attempts: u32, queued_at: Time) -> Self {
        Self {
            id: UpdateId::new(),
            update,
            attempts,
            queued_at,
        }
    }
}

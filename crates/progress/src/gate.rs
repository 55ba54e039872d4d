//! Topic gate: is a lecture or practice session reachable right now.
//!
//! Curriculum order defines prerequisites. A topic's lecture unlocks once the
//! previous topic is completed; its practice unlocks once its own lecture was
//! viewed, or under the same rule as the lecture.

use serde::{Deserialize, Serialize};
use skillpath_core::{Curriculum, ProgressMap, TopicProgress, UnknownTopicPolicy};
use tracing::warn;

/// Whether `topic` has been completed.
pub fn is_topic_completed(progress: &ProgressMap, topic: &str) -> bool {
    progress.get(topic).is_some_and(TopicProgress::is_completed)
}

/// Whether the lecture for `topic` has been viewed.
pub fn is_lecture_viewed(progress: &ProgressMap, topic: &str) -> bool {
    progress.get(topic).is_some_and(TopicProgress::is_viewed)
}

/// Lecture gate with unknown topics treated as accessible.
pub fn is_lecture_accessible(curriculum: &Curriculum, progress: &ProgressMap, topic: &str) -> bool {
    ProgressGate::default().is_lecture_accessible(curriculum, progress, topic)
}

/// Practice gate with unknown topics treated as accessible.
pub fn is_practice_accessible(curriculum: &Curriculum, progress: &ProgressMap, topic: &str) -> bool {
    ProgressGate::default().is_practice_accessible(curriculum, progress, topic)
}

/// Roadmap state with unknown topics treated as accessible.
pub fn topic_state(curriculum: &Curriculum, progress: &ProgressMap, topic: &str) -> TopicState {
    ProgressGate::default().topic_state(curriculum, progress, topic)
}

/// Where a topic stands for the learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TopicState {
    /// Previous topic not completed yet
    Locked,
    /// Unlocked, lecture not opened
    Available,
    /// Lecture viewed, practice not finished
    InProgress,
    /// Practice finished
    Completed,
}

impl TopicState {
    /// Short label.
    pub fn as_str(&self) -> &'static str {
        match self {
            TopicState::Locked => "locked",
            TopicState::Available => "available",
            TopicState::InProgress => "in-progress",
            TopicState::Completed => "completed",
        }
    }
}

impl std::fmt::Display for TopicState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gate decisions under a configurable unknown-topic policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressGate {
    unknown_topic: UnknownTopicPolicy,
}

impl ProgressGate {
    /// Create a gate.
    pub fn new(unknown_topic: UnknownTopicPolicy) -> Self {
        Self { unknown_topic }
    }

    /// Unknown topic policy in effect.
    pub fn unknown_topic_policy(&self) -> UnknownTopicPolicy {
        self.unknown_topic
    }

    /// First topic is always open; any other needs its predecessor completed.
    pub fn is_lecture_accessible(&self, curriculum: &Curriculum, progress: &ProgressMap, topic: &str) -> bool {
        match curriculum.previous(topic) {
            None => self.unknown(topic),
            Some(None) => true,
            Some(Some(previous)) => is_topic_completed(progress, previous.as_str()),
        }
    }

    /// Viewed lecture short-circuits; otherwise the lecture rule applies.
    pub fn is_practice_accessible(&self, curriculum: &Curriculum, progress: &ProgressMap, topic: &str) -> bool {
        is_lecture_viewed(progress, topic) || self.is_lecture_accessible(curriculum, progress, topic)
    }

    /// Roadmap state of a topic.
    pub fn topic_state(&self, curriculum: &Curriculum, progress: &ProgressMap, topic: &str) -> TopicState {
        if is_topic_completed(progress, topic) {
            TopicState::Completed
        } else if is_lecture_viewed(progress, topic) {
            TopicState::InProgress
        } else if self.is_lecture_accessible(curriculum, progress, topic) {
            TopicState::Available
        } else {
            TopicState::Locked
        }
    }

    fn unknown(&self, topic: &str) -> bool {
        warn!(
            "Topic '{}' is not in the curriculum, policy {:?}",
            topic, self.unknown_topic
        );
        matches!(self.unknown_topic, UnknownTopicPolicy::FailOpen)
    }
}

//! Curriculum-wide progress overview.

use chrono::Utc;
use skillpath_core::{Curriculum, ProgressMap, Score, Time, TopicId, TopicProgress};

use crate::gate::{ProgressGate, TopicState};

/// Snapshot of a learner's position in a curriculum.
#[derive(Debug, Clone)]
pub struct ProgressOverview {
    /// When the overview was computed
    pub timestamp: Time,

    /// Distinct topics in the curriculum
    pub total_topics: usize,

    /// Topics completed
    pub completed: usize,

    /// Topics viewed but not completed
    pub in_progress: usize,

    /// Topics not touched yet
    pub not_started: usize,

    /// Completed share, rounded (0-100)
    pub percentage: u8,

    /// First unlocked topic that is not completed
    pub next_topic: Option<TopicId>,

    /// Mean quiz score over completed topics that have one
    pub average_quiz_score: Option<f32>,

    /// Mean code score over completed topics that have one
    pub average_code_score: Option<f32>,

    /// State of every topic, in curriculum order
    pub topics: Vec<(TopicId, TopicState)>,
}

impl ProgressOverview {
    /// Compute the overview. Duplicate curriculum entries count once.
    pub fn compute(gate: &ProgressGate, curriculum: &Curriculum, progress: &ProgressMap) -> Self {
        let mut topics = Vec::new();
        let mut next_topic = None;
        let mut completed_records: Vec<&TopicProgress> = Vec::new();

        for (index, topic) in curriculum.topics().enumerate() {
            if curriculum.position(topic.as_str()) != Some(index) {
                continue;
            }

            let state = gate.topic_state(curriculum, progress, topic.as_str());
            if state == TopicState::Completed {
                if let Some(record) = progress.get(topic.as_str()) {
                    completed_records.push(record);
                }
            } else if next_topic.is_none() && state != TopicState::Locked {
                next_topic = Some(topic.clone());
            }
            topics.push((topic.clone(), state));
        }

        let count = |wanted: TopicState| topics.iter().filter(|(_, state)| *state == wanted).count();
        let total_topics = topics.len();
        let completed = count(TopicState::Completed);
        let in_progress = count(TopicState::InProgress);

        let percentage = if total_topics > 0 {
            ((completed as f32 / total_topics as f32) * 100.0).round() as u8
        } else {
            0
        };

        Self {
            timestamp: Utc::now(),
            total_topics,
            completed,
            in_progress,
            not_started: total_topics - completed - in_progress,
            percentage,
            next_topic,
            average_quiz_score: average(completed_records.iter().filter_map(|r| r.quiz_score)),
            average_code_score: average(completed_records.iter().filter_map(|r| r.code_score)),
            topics,
        }
    }
}

fn average(scores: impl Iterator<Item = Score>) -> Option<f32> {
    let (sum, n) = scores.fold((0u32, 0u32), |(sum, n), score| (sum + score.value() as u32, n + 1));
    (n > 0).then(|| sum as f32 / n as f32)
}

//! Progress records - per-topic viewed/completed state and scores.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use chrono::Datelike;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::topic::TopicId;
use crate::Time;

/// A quiz or code score in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Score(u8);

impl Score {
    /// Highest possible score.
    pub const MAX: u8 = 100;

    /// Create a score, clamping into `[0, 100]`.
    pub fn new(value: i64) -> Self {
        Self(value.clamp(0, Self::MAX as i64) as u8)
    }

    /// Create a score from a JSON number, rounding and clamping.
    pub fn from_f64(value: f64) -> Self {
        if value.is_nan() {
            return Self(0);
        }
        Self(value.round().clamp(0.0, Self::MAX as f64) as u8)
    }

    /// Score value.
    pub fn value(self) -> u8 {
        self.0
    }
}

impl<'de> Deserialize<'de> for Score {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Ok(Self::from_f64(value))
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Progress of one user on one topic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicProgress {
    /// Lecture content was displayed at least once
    #[serde(default)]
    pub viewed: bool,

    /// Last time the lecture was viewed
    #[serde(
        default,
        alias = "lastViewed",
        deserialize_with = "deserialize_instant",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_viewed_at: Option<Time>,

    /// Practice session was finished
    #[serde(default)]
    pub completed: bool,

    /// When the topic was first completed (write-once)
    #[serde(
        default,
        deserialize_with = "deserialize_instant",
        skip_serializing_if = "Option::is_none"
    )]
    pub completed_at: Option<Time>,

    /// Quiz score recorded on completion
    #[serde(default, deserialize_with = "deserialize_score", skip_serializing_if = "Option::is_none")]
    pub quiz_score: Option<Score>,

    /// Code score recorded on completion
    #[serde(default, deserialize_with = "deserialize_score", skip_serializing_if = "Option::is_none")]
    pub code_score: Option<Score>,
}

impl TopicProgress {
    /// Either completion signal is enough.
    pub fn is_completed(&self) -> bool {
        self.completed || self.completed_at.is_some()
    }

    /// Either viewed signal is enough.
    pub fn is_viewed(&self) -> bool {
        self.viewed || self.last_viewed_at.is_some()
    }

    /// Record a lecture view. Completion data is left untouched.
    pub fn mark_viewed(&mut self, now: Time) {
        self.viewed = true;
        self.last_viewed_at = Some(now);
    }

    /// Record a finished practice session.
    ///
    /// `completed_at` is only set the first time. Supplied scores replace the
    /// stored ones; `None` keeps what is there.
    pub fn mark_completed(&mut self, quiz_score: Option<Score>, code_score: Option<Score>, now: Time) {
        if !self.is_viewed() {
            self.last_viewed_at = Some(now);
        }
        self.viewed = true;
        self.completed = true;
        if self.completed_at.is_none() {
            self.completed_at = Some(now);
        }
        if quiz_score.is_some() {
            self.quiz_score = quiz_score;
        }
        if code_score.is_some() {
            self.code_score = code_score;
        }
    }

    /// Field-level union with `other`.
    ///
    /// Completion beats non-completion, the later `completed_at` beats the
    /// earlier one, ties keep `self`. `viewed` is OR-ed and the later view
    /// instant is kept. Scores follow the side that won completion.
    pub fn union(&self, other: &TopicProgress) -> TopicProgress {
        let other_wins = match (self.is_completed(), other.is_completed()) {
            (false, true) => true,
            (true, true) => match (self.completed_at, other.completed_at) {
                (Some(mine), Some(theirs)) => theirs > mine,
                (None, Some(_)) => true,
                _ => false,
            },
            _ => false,
        };
        let (winner, loser) = if other_wins { (other, self) } else { (self, other) };

        let completed = winner.is_completed();
        TopicProgress {
            viewed: self.viewed || other.viewed || completed,
            last_viewed_at: later(self.last_viewed_at, other.last_viewed_at),
            completed,
            completed_at: winner.completed_at,
            quiz_score: winner.quiz_score.or(loser.quiz_score),
            code_score: winner.code_score.or(loser.code_score),
        }
    }
}

fn later(a: Option<Time>, b: Option<Time>) -> Option<Time> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

/// The server writes unset timestamps as the zero instant (year 1).
fn deserialize_instant<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Time>, D::Error> {
    let instant = Option::<Time>::deserialize(deserializer)?;
    Ok(instant.filter(|t| t.year() > 1))
}

/// The server writes unset scores as `0`.
fn deserialize_score<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Score>, D::Error> {
    let score = Option::<Score>::deserialize(deserializer)?;
    Ok(score.filter(|s| s.value() > 0))
}

/// A progress entry as found in storage: either the historical bare string
/// or the structured record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredProgress {
    /// `"completed"`, `"in-progress"`, ...
    Legacy(String),
    /// Structured record
    Structured(TopicProgress),
}

impl StoredProgress {
    /// Parse one stored entry. `None` for shapes that are neither form.
    pub fn from_value(value: serde_json::Value) -> Option<Self> {
        serde_json::from_value(value).ok()
    }

    /// Normalize into the structured form.
    pub fn into_record(self) -> TopicProgress {
        match self {
            StoredProgress::Structured(record) => record,
            StoredProgress::Legacy(status) => match status.as_str() {
                "completed" | "Completed" => TopicProgress {
                    viewed: true,
                    completed: true,
                    ..TopicProgress::default()
                },
                "" => TopicProgress::default(),
                _ => TopicProgress {
                    viewed: true,
                    ..TopicProgress::default()
                },
            },
        }
    }
}

/// Topic id -> progress record.
///
/// Reads accept legacy string entries and skip malformed ones; writes always
/// produce structured records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ProgressMap {
    topics: BTreeMap<TopicId, TopicProgress>,
}

impl ProgressMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON value, normalizing each entry.
    pub fn from_value(value: serde_json::Value) -> Self {
        let entries = match value {
            serde_json::Value::Object(entries) => entries,
            serde_json::Value::Null => return Self::default(),
            other => {
                warn!("Progress blob is not an object ({}), starting empty", json_kind(&other));
                return Self::default();
            }
        };

        let mut topics: BTreeMap<TopicId, TopicProgress> = BTreeMap::new();
        for (key, entry) in entries {
            let Some(stored) = StoredProgress::from_value(entry) else {
                warn!("Ignoring malformed progress entry for topic '{}'", key);
                continue;
            };
            let record = stored.into_record();
            match topics.entry(TopicId::new(&key)) {
                Entry::Vacant(slot) => {
                    slot.insert(record);
                }
                Entry::Occupied(mut slot) => {
                    debug!("Progress key '{}' folds into topic '{}'", key, slot.key());
                    let merged = slot.get().union(&record);
                    slot.insert(merged);
                }
            }
        }
        Self { topics }
    }

    /// Build from a JSON string. Unparseable input yields an empty map.
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str::<serde_json::Value>(json) {
            Ok(value) => Self::from_value(value),
            Err(e) => {
                warn!("Progress blob is not valid JSON ({}), starting empty", e);
                Self::default()
            }
        }
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Record for a topic.
    pub fn get(&self, topic: &str) -> Option<&TopicProgress> {
        self.topics.get(topic)
    }

    /// Record for a topic, created empty when missing.
    pub fn entry(&mut self, topic: &TopicId) -> &mut TopicProgress {
        self.topics.entry(topic.clone()).or_default()
    }

    /// Replace the record for a topic.
    pub fn insert(&mut self, topic: TopicId, record: TopicProgress) -> Option<TopicProgress> {
        self.topics.insert(topic, record)
    }

    /// Iterate over `(topic, record)` pairs in topic order.
    pub fn iter(&self) -> impl Iterator<Item = (&TopicId, &TopicProgress)> {
        self.topics.iter()
    }

    /// Number of topics with a record.
    pub fn len(&self) -> usize {
        self.topics.len()
    }

    /// Whether no topic has a record.
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

impl<'de> Deserialize<'de> for ProgressMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Self::from_value(value))
    }
}

impl FromIterator<(TopicId, TopicProgress)> for ProgressMap {
    fn from_iter<I: IntoIterator<Item = (TopicId, TopicProgress)>>(iter: I) -> Self {
        Self {
            topics: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ProgressMap {
    type Item = (TopicId, TopicProgress);
    type IntoIter = std::collections::btree_map::IntoIter<TopicId, TopicProgress>;

    fn into_iter(self) -> Self::IntoIter {
        self.topics.into_iter()
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn test_score_clamps() {
        assert_eq!(Score::new(-5).value(), 0);
        assert_eq!(Score::new(150).value(), 100);
        assert_eq!(Score::from_f64(87.6).value(), 88);
        assert_eq!(serde_json::from_value::<Score>(json!(250)).unwrap().value(), 100);
        assert!(serde_json::from_value::<Score>(json!("high")).is_err());
    }

    #[test]
    fn test_legacy_strings_normalize() {
        let map = ProgressMap::from_value(json!({
            "A": "completed",
            "B": "Completed",
            "C": "in-progress",
            "D": "",
        }));

        assert!(map.get("A").unwrap().is_completed());
        assert!(map.get("B").unwrap().is_completed());
        assert!(map.get("C").unwrap().is_viewed());
        assert!(!map.get("C").unwrap().is_completed());
        assert!(!map.get("D").unwrap().is_viewed());
        assert!(!map.get("D").unwrap().is_completed());
    }

    #[test]
    fn test_lowercase_variants_only() {
        let stored = StoredProgress::Legacy("COMPLETED".to_string());
        assert!(!stored.into_record().is_completed());
    }

    #[test]
    fn test_server_record_shape() {
        let map = ProgressMap::from_value(json!({
            "Ownership": {
                "viewed": true,
                "completed": false,
                "completedAt": "0001-01-01T00:00:00Z",
                "quizScore": 0,
                "codeScore": 0,
                "lastViewed": "2024-03-01T10:00:00Z"
            }
        }));

        let record = map.get("Ownership").unwrap();
        assert!(record.viewed);
        assert!(record.completed_at.is_none());
        assert!(record.quiz_score.is_none());
        assert!(record.code_score.is_none());
        assert_eq!(
            record.last_viewed_at,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap())
        );
        assert!(!record.is_completed());
    }

    #[test]
    fn test_colliding_keys_fold_together() {
        let map = ProgressMap::from_value(json!({
            "B": "completed",
            "B: desc": "in-progress",
            " C ": {"completed": true, "completedAt": "2024-01-02T00:00:00Z", "quizScore": 70},
            "C: later": {"viewed": true, "lastViewed": "2024-03-01T00:00:00Z"},
        }));

        assert_eq!(map.len(), 2);
        let b = map.get("B").unwrap();
        assert!(b.is_completed());
        assert!(b.viewed);

        let c = map.get("C").unwrap();
        assert_eq!(c.completed_at, Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()));
        assert_eq!(c.quiz_score, Some(Score::new(70)));
        assert_eq!(c.last_viewed_at, Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_union_prefers_completion() {
        let viewed = TopicProgress {
            viewed: true,
            ..TopicProgress::default()
        };
        let done = TopicProgress {
            completed: true,
            quiz_score: Some(Score::new(90)),
            ..TopicProgress::default()
        };

        for merged in [viewed.union(&done), done.union(&viewed)] {
            assert!(merged.completed && merged.viewed);
            assert_eq!(merged.quiz_score, Some(Score::new(90)));
        }
    }

    #[test]
    fn test_malformed_entry_is_skipped() {
        let map = ProgressMap::from_value(json!({
            "A": {"viewed": "yes"},
            "B": 42,
            "C": {"completed": true},
        }));

        assert!(map.get("A").is_none());
        assert!(map.get("B").is_none());
        assert!(map.get("C").unwrap().is_completed());
    }

    #[test]
    fn test_non_object_blob_is_empty() {
        assert!(ProgressMap::from_json("[1, 2]").is_empty());
        assert!(ProgressMap::from_json("{not json").is_empty());
        assert!(ProgressMap::from_json("null").is_empty());
    }

    #[test]
    fn test_completed_at_alone_counts() {
        let record = TopicProgress {
            completed_at: Some(Utc::now()),
            ..TopicProgress::default()
        };
        assert!(record.is_completed());
    }

    #[test]
    fn test_mark_completed_is_write_once() {
        let first = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();

        let mut record = TopicProgress::default();
        record.mark_completed(Some(Score::new(80)), Some(Score::new(90)), first);
        record.mark_completed(Some(Score::new(95)), None, later);

        assert_eq!(record.completed_at, Some(first));
        assert_eq!(record.quiz_score, Some(Score::new(95)));
        assert_eq!(record.code_score, Some(Score::new(90)));
        assert!(record.viewed);
        assert_eq!(record.last_viewed_at, Some(first));
    }

    #[test]
    fn test_mark_viewed_keeps_completion() {
        let now = Utc::now();
        let mut record = TopicProgress::default();
        record.mark_completed(None, None, now);
        record.mark_viewed(now);
        assert!(record.completed);
        assert_eq!(record.completed_at, Some(now));
    }

    #[test]
    fn test_written_form_is_structured() {
        let mut map = ProgressMap::from_value(json!({"A": "completed"}));
        map.entry(&TopicId::new("B")).mark_viewed(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());

        let value: serde_json::Value = serde_json::from_str(&map.to_json().unwrap()).unwrap();
        assert_eq!(value["A"], json!({"viewed": true, "completed": true}));
        assert_eq!(value["B"]["lastViewedAt"], json!("2024-01-01T00:00:00Z"));
    }
}

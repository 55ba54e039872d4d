//! Optimistic progress updates on a progress map.

use skillpath_core::{ProgressMap, Score, Time, TopicId};

/// Map with `topic` marked viewed at `now`. Completion data is kept.
pub fn record_lecture_viewed(progress: &ProgressMap, topic: &TopicId, now: Time) -> ProgressMap {
    let mut next = progress.clone();
    next.entry(topic).mark_viewed(now);
    next
}

/// Map with `topic` completed. The first completion instant is kept.
pub fn record_topic_completed(
    progress: &ProgressMap,
    topic: &TopicId,
    quiz_score: Option<Score>,
    code_score: Option<Score>,
    now: Time,
) -> ProgressMap {
    let mut next = progress.clone();
    next.entry(topic).mark_completed(quiz_score, code_score, now);
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn test_repeat_completion_keeps_first_instant() {
        let topic = TopicId::new("A");
        let first = Utc::now();
        let second = first + Duration::minutes(5);

        let once = record_topic_completed(&ProgressMap::new(), &topic, Some(Score::new(80)), Some(Score::new(90)), first);
        let twice = record_topic_completed(&once, &topic, Some(Score::new(60)), Some(Score::new(100)), second);

        let record = twice.get("A").unwrap();
        assert_eq!(record.completed_at, Some(first));
        assert_eq!(record.quiz_score, Some(Score::new(60)));
        assert_eq!(record.code_score, Some(Score::new(100)));
    }

    #[test]
    fn test_views_never_uncomplete() {
        let topic = TopicId::new("A");
        let now = Utc::now();
        let mut progress = record_topic_completed(&ProgressMap::new(), &topic, None, None, now);

        for minutes in 1..5 {
            progress = record_lecture_viewed(&progress, &topic, now + Duration::minutes(minutes));
            let record = progress.get("A").unwrap();
            assert!(record.completed);
            assert_eq!(record.completed_at, Some(now));
        }
        assert_eq!(progress.get("A").unwrap().last_viewed_at, Some(now + Duration::minutes(4)));
    }

    #[test]
    fn test_completion_implies_viewed() {
        let progress = record_topic_completed(&ProgressMap::new(), &TopicId::new("A"), None, None, Utc::now());
        assert!(progress.get("A").unwrap().viewed);
    }

    #[test]
    fn test_input_map_untouched() {
        let original = ProgressMap::new();
        let next = record_lecture_viewed(&original, &TopicId::new("A"), Utc::now());
        assert!(original.is_empty());
        assert_eq!(next.len(), 1);
    }
}

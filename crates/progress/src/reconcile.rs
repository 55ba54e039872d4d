//! Reconciliation between the local mirror and the remote authority.

use skillpath_core::{ProgressMap, TopicProgress};

/// Field-level union of two records for the same topic. Ties keep `local`.
///
/// See [`TopicProgress::union`].
pub fn merge_record(local: &TopicProgress, remote: &TopicProgress) -> TopicProgress {
    local.union(remote)
}

/// Union of two maps, merging topics present on both sides.
pub fn merge_maps(local: &ProgressMap, remote: &ProgressMap) -> ProgressMap {
    let mut merged = local.clone();
    for (topic, remote_record) in remote.iter() {
        let record = match local.get(topic.as_str()) {
            Some(local_record) => merge_record(local_record, remote_record),
            None => remote_record.clone(),
        };
        merged.insert(topic.clone(), record);
    }
    merged
}

/// Fold the record the server returned after a push into the local one.
///
/// Server fields win; optional fields the server left empty keep the local
/// value.
pub fn apply_authoritative(local: Option<&TopicProgress>, server: &TopicProgress) -> TopicProgress {
    let Some(local) = local else {
        return server.clone();
    };
    TopicProgress {
        viewed: server.viewed,
        last_viewed_at: server.last_viewed_at.or(local.last_viewed_at),
        completed: server.completed,
        completed_at: server.completed_at.or(local.completed_at),
        quiz_score: server.quiz_score.or(local.quiz_score),
        code_score: server.code_score.or(local.code_score),
    }
}

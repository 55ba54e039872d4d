//! Progress store - single owner of the local mirror and its remote sync.
//!
//! Every user action updates the mirror first and persists it, then tries
//! to push to the remote authority. A failed push never fails the action:
//! the update is queued in the outbox and retried on the next refresh.

use chrono::Utc;
use skillpath_core::{Curriculum, ProgressMap, ProgressUpdate, RetryPolicy, Score, SyncConfig, TopicId};
use skillpath_storage::{LocalStore, StorageError};
use tracing::{debug, info, warn};

use crate::gate::{self, ProgressGate, TopicState};
use crate::outbox::{push_with_retry, SyncOutbox};
use crate::reconcile::{apply_authoritative, merge_maps, merge_record};
use crate::record::{record_lecture_viewed, record_topic_completed};
use crate::remote::RemoteProgress;
use crate::tracker::ProgressOverview;

/// Error type for store operations.
pub type Result<T> = std::result::Result<T, ProgressError>;

/// Errors that can occur in the progress store.
///
/// Remote failures are not errors here; they surface as
/// [`SyncOutcome::LocalOnly`].
#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    /// Local mirror could not be read or written
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// How far an update got.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Remote authority accepted it
    Synced,
    /// Only the local mirror has it; it will be retried
    LocalOnly {
        /// Why the remote step did not complete
        reason: String,
    },
}

impl SyncOutcome {
    /// Whether the remote authority is up to date.
    pub fn is_synced(&self) -> bool {
        matches!(self, SyncOutcome::Synced)
    }
}

/// Result of draining the outbox.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Updates the remote accepted
    pub delivered: usize,
    /// Updates still queued
    pub remaining: usize,
}

/// Owner of the progress mirror for one learner.
pub struct ProgressStore<L: LocalStore, R: RemoteProgress> {
    local: L,
    remote: R,
    gate: ProgressGate,
    retry: RetryPolicy,
    curriculum: Curriculum,
    progress: ProgressMap,
    outbox: SyncOutbox,
}

impl<L: LocalStore, R: RemoteProgress> ProgressStore<L, R> {
    /// Open the store from the local mirror only. Call [`refresh`](Self::refresh)
    /// afterwards to reconcile with the remote authority.
    pub async fn open(local: L, remote: R, config: &SyncConfig) -> Result<Self> {
        let progress = local.load_progress().await?;
        let curriculum = local.load_curriculum().await?.unwrap_or_default();
        let outbox = SyncOutbox::from_pending(local.load_outbox().await?);

        debug!(
            "Opened progress store: {} topics, {} curriculum entries, {} queued updates",
            progress.len(),
            curriculum.len(),
            outbox.len()
        );

        Ok(Self {
            local,
            remote,
            gate: ProgressGate::new(config.unknown_topic),
            retry: config.retry.clone(),
            curriculum,
            progress,
            outbox,
        })
    }

    /// Current progress mirror.
    pub fn progress(&self) -> &ProgressMap {
        &self.progress
    }

    /// Current curriculum.
    pub fn curriculum(&self) -> &Curriculum {
        &self.curriculum
    }

    /// Updates waiting for the remote authority.
    pub fn outbox(&self) -> &SyncOutbox {
        &self.outbox
    }

    /// Gate used for decisions.
    pub fn gate(&self) -> &ProgressGate {
        &self.gate
    }

    /// Local backend.
    pub fn local(&self) -> &L {
        &self.local
    }

    /// Remote backend.
    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Replace and cache the curriculum.
    pub async fn set_curriculum(&mut self, curriculum: Curriculum) -> Result<()> {
        self.local.save_curriculum(&curriculum).await?;
        info!("Curriculum set: {} topics", curriculum.len());
        self.curriculum = curriculum;
        Ok(())
    }

    /// Drop the learner's cached progress, curriculum and queued updates,
    /// e.g. on logout. The remote copy is untouched.
    pub async fn clear(&mut self) -> Result<()> {
        self.local.clear_session().await?;
        self.progress = ProgressMap::new();
        self.curriculum = Curriculum::default();
        let dropped = self.outbox.take_all().len();
        info!("Cleared local session ({} queued updates dropped)", dropped);
        Ok(())
    }

    // === Gate queries ===

    /// Whether `topic` is completed.
    pub fn is_topic_completed(&self, topic: &str) -> bool {
        gate::is_topic_completed(&self.progress, topic)
    }

    /// Whether the lecture for `topic` was viewed.
    pub fn is_lecture_viewed(&self, topic: &str) -> bool {
        gate::is_lecture_viewed(&self.progress, topic)
    }

    /// Whether the lecture for `topic` is unlocked.
    pub fn is_lecture_accessible(&self, topic: &str) -> bool {
        self.gate.is_lecture_accessible(&self.curriculum, &self.progress, topic)
    }

    /// Whether the practice for `topic` is unlocked.
    pub fn is_practice_accessible(&self, topic: &str) -> bool {
        self.gate.is_practice_accessible(&self.curriculum, &self.progress, topic)
    }

    /// Roadmap state of `topic`.
    pub fn topic_state(&self, topic: &str) -> TopicState {
        self.gate.topic_state(&self.curriculum, &self.progress, topic)
    }

    /// Summary of the whole curriculum.
    pub fn overview(&self) -> ProgressOverview {
        ProgressOverview::compute(&self.gate, &self.curriculum, &self.progress)
    }

    // === Updates ===

    /// Mark a lecture viewed, persist, then push.
    pub async fn record_lecture_viewed(&mut self, topic: &TopicId) -> Result<SyncOutcome> {
        self.progress = record_lecture_viewed(&self.progress, topic, Utc::now());
        self.local.save_progress(&self.progress).await?;
        self.sync_topic(topic).await
    }

    /// Mark a topic completed with its scores, persist, then push.
    pub async fn record_topic_completed(
        &mut self,
        topic: &TopicId,
        quiz_score: Option<Score>,
        code_score: Option<Score>,
    ) -> Result<SyncOutcome> {
        self.progress = record_topic_completed(&self.progress, topic, quiz_score, code_score, Utc::now());
        self.local.save_progress(&self.progress).await?;
        self.sync_topic(topic).await
    }

    /// Push the current record for `topic` to the remote authority.
    ///
    /// On success the server's record is applied to the mirror and a queued
    /// update for the topic is superseded. On failure the mirror is kept and
    /// the update is queued.
    pub async fn sync_topic(&mut self, topic: &TopicId) -> Result<SyncOutcome> {
        let Some(record) = self.progress.get(topic.as_str()) else {
            debug!("Nothing to sync for '{}'", topic);
            return Ok(SyncOutcome::Synced);
        };
        let update = ProgressUpdate::from_record(topic.clone(), record);

        let delivery = push_with_retry(&self.remote, &update, &self.retry).await;
        match delivery.result {
            Ok(server) => {
                if let Some(server) = server {
                    let applied = apply_authoritative(self.progress.get(topic.as_str()), &server);
                    self.progress.insert(topic.clone(), applied);
                    self.local.save_progress(&self.progress).await?;
                }
                if self.outbox.remove_topic(topic).is_some() {
                    self.local.save_outbox(self.outbox.pending()).await?;
                }
                debug!("Synced '{}' after {} attempt(s)", topic, delivery.attempts);
                Ok(SyncOutcome::Synced)
            }
            Err(e) => {
                warn!("Keeping '{}' local only: {}", topic, e);
                self.outbox.enqueue(update, delivery.attempts, Utc::now());
                self.local.save_outbox(self.outbox.pending()).await?;
                Ok(SyncOutcome::LocalOnly {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Fetch the remote copy, union-merge it into the mirror, then retry
    /// queued updates.
    pub async fn refresh(&mut self) -> Result<SyncOutcome> {
        match self.remote.fetch_all().await {
            Ok(remote) => {
                self.progress = merge_maps(&self.progress, &remote);
                self.local.save_progress(&self.progress).await?;
                info!("Merged {} remote topic records", remote.len());
            }
            Err(e) => {
                warn!("Remote progress unavailable, using local mirror: {}", e);
                return Ok(SyncOutcome::LocalOnly {
                    reason: e.to_string(),
                });
            }
        }

        let report = self.flush_outbox().await?;
        if report.remaining > 0 {
            return Ok(SyncOutcome::LocalOnly {
                reason: format!("{} update(s) still queued", report.remaining),
            });
        }
        Ok(SyncOutcome::Synced)
    }

    /// Retry every queued update once (with the configured backoff).
    ///
    /// Server records returned here are union-merged rather than applied,
    /// so a newer optimistic update is never overwritten.
    pub async fn flush_outbox(&mut self) -> Result<FlushReport> {
        if self.outbox.is_empty() {
            return Ok(FlushReport::default());
        }

        let mut report = FlushReport::default();
        for mut entry in self.outbox.take_all() {
            let delivery = push_with_retry(&self.remote, &entry.update, &self.retry).await;
            match delivery.result {
                Ok(server) => {
                    if let Some(server) = server {
                        let topic = entry.update.topic.clone();
                        let merged = match self.progress.get(topic.as_str()) {
                            Some(local) => merge_record(local, &server),
                            None => server,
                        };
                        self.progress.insert(topic, merged);
                    }
                    report.delivered += 1;
                }
                Err(e) => {
                    warn!(
                        "Queued update {} for '{}' still failing: {}",
                        entry.id, entry.update.topic, e
                    );
                    entry.attempts = entry.attempts.saturating_add(delivery.attempts);
                    self.outbox.enqueue(entry.update, entry.attempts, entry.queued_at);
                }
            }
        }
        report.remaining = self.outbox.len();

        if report.delivered > 0 {
            self.local.save_progress(&self.progress).await?;
        }
        self.local.save_outbox(self.outbox.pending()).await?;
        info!(
            "Outbox flushed: {} delivered, {} remaining",
            report.delivered, report.remaining
        );
        Ok(report)
    }
}

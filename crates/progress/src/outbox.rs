//! Retry outbox for pushes that did not reach the remote authority.

use skillpath_core::{PendingUpdate, ProgressUpdate, RetryPolicy, Time, TopicId, TopicProgress};
use tracing::debug;

use crate::remote::{RemoteError, RemoteProgress};

/// Result of a push with retries.
#[derive(Debug)]
pub struct Delivery {
    /// Final outcome
    pub result: Result<Option<TopicProgress>, RemoteError>,

    /// Attempts made, including the first
    pub attempts: u32,
}

/// Push `update`, retrying transient failures with exponential backoff.
pub async fn push_with_retry<R: RemoteProgress + ?Sized>(
    remote: &R,
    update: &ProgressUpdate,
    policy: &RetryPolicy,
) -> Delivery {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            tokio::time::sleep(policy.delay_for(attempt)).await;
        }
        attempt += 1;

        match remote.push(update).await {
            Ok(record) => {
                return Delivery {
                    result: Ok(record),
                    attempts: attempt,
                }
            }
            Err(e) => {
                debug!(
                    "Push for '{}' failed (attempt {}/{}): {}",
                    update.topic, attempt, max_attempts, e
                );
                if attempt >= max_attempts || !e.is_transient() {
                    return Delivery {
                        result: Err(e),
                        attempts: attempt,
                    };
                }
            }
        }
    }
}

/// Queue of undelivered updates, at most one per topic.
#[derive(Debug, Clone, Default)]
pub struct SyncOutbox {
    pending: Vec<PendingUpdate>,
}

impl SyncOutbox {
    /// Create an empty outbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted entries, coalescing duplicates.
    pub fn from_pending(pending: Vec<PendingUpdate>) -> Self {
        let mut outbox = Self::new();
        for entry in pending {
            outbox.push_entry(entry);
        }
        outbox
    }

    /// Queue an update, folding it into an existing entry for the same topic.
    pub fn enqueue(&mut self, update: ProgressUpdate, attempts: u32, now: Time) {
        self.push_entry(PendingUpdate::new(update, attempts, now));
    }

    fn push_entry(&mut self, entry: PendingUpdate) {
        match self
            .pending
            .iter_mut()
            .find(|queued| queued.update.topic == entry.update.topic)
        {
            Some(queued) => {
                queued.update.coalesce(entry.update);
                queued.attempts = queued.attempts.saturating_add(entry.attempts);
            }
            None => self.pending.push(entry),
        }
    }

    /// Drop the entry for a topic, e.g. after a newer push went through.
    pub fn remove_topic(&mut self, topic: &TopicId) -> Option<PendingUpdate> {
        let index = self.pending.iter().position(|queued| &queued.update.topic == topic)?;
        Some(self.pending.remove(index))
    }

    /// Take every entry, leaving the outbox empty.
    pub fn take_all(&mut self) -> Vec<PendingUpdate> {
        std::mem::take(&mut self.pending)
    }

    /// Queued entries in queue order.
    pub fn pending(&self) -> &[PendingUpdate] {
        &self.pending
    }

    /// Number of queued entries.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

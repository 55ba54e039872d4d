//! In-process stand-in for the progress API used by unit tests.

use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use skillpath_core::{ProgressMap, ProgressUpdate, TopicId, TopicProgress};

use crate::remote::{RemoteError, RemoteProgress};

/// Applies pushes the way the server does: flags only turn on,
/// `completedAt` is set once, scores keep their maximum.
#[derive(Default)]
pub struct MockRemote {
    records: Mutex<ProgressMap>,
    pushes: Mutex<Vec<ProgressUpdate>>,
    offline: AtomicBool,
    views_only: AtomicBool,
    failures: AtomicU32,
    reject_status: AtomicU16,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: ProgressMap) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Accept pushes but record only the viewed flag, like a lagging replica.
    pub fn set_views_only(&self, views_only: bool) {
        self.views_only.store(views_only, Ordering::SeqCst);
    }

    pub fn fail_next(&self, count: u32) {
        self.failures.store(count, Ordering::SeqCst);
    }

    pub fn reject_with(&self, status: u16) {
        self.reject_status.store(status, Ordering::SeqCst);
    }

    pub fn push_count(&self) -> usize {
        self.pushes.lock().unwrap().len()
    }

    pub fn pushes(&self) -> Vec<ProgressUpdate> {
        self.pushes.lock().unwrap().clone()
    }

    pub fn record(&self, topic: &str) -> Option<TopicProgress> {
        self.records.lock().unwrap().get(topic).cloned()
    }

    fn check_available(&self) -> Result<(), RemoteError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RemoteError::Status {
                status: 503,
                body: "offline".to_string(),
            });
        }
        let rejected = self.reject_status.load(Ordering::SeqCst);
        if rejected != 0 {
            return Err(RemoteError::Status {
                status: rejected,
                body: String::new(),
            });
        }
        let failures = self.failures.load(Ordering::SeqCst);
        if failures > 0 {
            self.failures.store(failures - 1, Ordering::SeqCst);
            return Err(RemoteError::Status {
                status: 502,
                body: "flaky".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteProgress for MockRemote {
    async fn fetch_all(&self) -> Result<ProgressMap, RemoteError> {
        self.check_available()?;
        Ok(self.records.lock().unwrap().clone())
    }

    async fn fetch_topic(&self, topic: &TopicId) -> Result<TopicProgress, RemoteError> {
        self.check_available()?;
        Ok(self.record(topic.as_str()).unwrap_or_default())
    }

    async fn push(&self, update: &ProgressUpdate) -> Result<Option<TopicProgress>, RemoteError> {
        self.pushes.lock().unwrap().push(update.clone());
        self.check_available()?;

        let now = Utc::now();
        let mut records = self.records.lock().unwrap();
        let record = records.entry(&update.topic);
        if update.viewed {
            record.viewed = true;
            record.last_viewed_at = Some(now);
        }
        if self.views_only.load(Ordering::SeqCst) {
            return Ok(Some(record.clone()));
        }
        if update.completed && !record.completed {
            record.completed = true;
            record.completed_at = Some(now);
        }
        if update.quiz_score > record.quiz_score {
            record.quiz_score = update.quiz_score;
        }
        if update.code_score > record.code_score {
            record.code_score = update.code_score;
        }
        Ok(Some(record.clone()))
    }
}

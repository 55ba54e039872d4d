//! Skillpath core data models.
//!
//! This crate defines the curriculum, per-topic progress records and the
//! sync configuration shared by the storage, progress and CLI crates.

#![warn(missing_docs)]

// Identities
mod id;

// Curriculum and progress
mod topic;
mod record;
mod update;

// Configuration
mod config;

// Re-exports
pub use id::UpdateId;

pub use topic::{Curriculum, CurriculumEntry, TopicId};
pub use record::{ProgressMap, Score, StoredProgress, TopicProgress};
pub use update::{PendingUpdate, ProgressUpdate};
pub use config::{RetryPolicy, SyncConfig, UnknownTopicPolicy};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;

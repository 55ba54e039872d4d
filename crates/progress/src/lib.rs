//! Progress tracking and topic gating.
//!
//! Lecture/practice unlock decisions, local/remote reconciliation and the
//! store that owns the progress mirror.

#![warn(missing_docs)]

pub mod gate;
pub mod record;
pub mod reconcile;
pub mod remote;
pub mod outbox;
pub mod store;
pub mod tracker;

#[cfg(test)]
mod mock;

pub use gate::{
    is_lecture_accessible, is_lecture_viewed, is_practice_accessible, is_topic_completed,
    topic_state, ProgressGate, TopicState,
};
pub use record::{record_lecture_viewed, record_topic_completed};
pub use reconcile::{apply_authoritative, merge_maps, merge_record};
pub use remote::{HttpProgressClient, RemoteError, RemoteProgress};
pub use outbox::{push_with_retry, Delivery, SyncOutbox};
pub use store::{FlushReport, ProgressError, ProgressStore, Result, SyncOutcome};
pub use tracker::ProgressOverview;

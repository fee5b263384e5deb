//! Job registry for live reservation runs
//!
//! Every run gets a [`JobRecord`] with one completion flag per track. The
//! booking tracks mark their own flag, an operator can request early
//! cancellation, and the coordinator retires the record once both tracks
//! have stopped. All access goes through [`JobRegistry`]; the map itself
//! is never handed out.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{watch, RwLock};
use tracing::{debug, info};

use crate::models::{TrackId, UserCredentials};

// ============================================================================
// Run identifier
// ============================================================================

/// Registry-assigned run identifier, increasing per process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Job Record
// ============================================================================

/// Snapshot of one run, as listed to operators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub run_id: RunId,
    pub user_id: String,
    pub user_name: String,
    pub sport_date: NaiveDate,
    pub first_time: String,
    pub second_time: Option<String>,

    /// First track finished or was cancelled
    pub first_done: bool,

    /// Second track finished, was cancelled, or was never requested
    pub second_done: bool,

    /// An operator asked for early termination
    pub cancel_requested: bool,

    pub created_at: DateTime<Utc>,
}

impl JobRecord {
    fn new(run_id: RunId, user: &UserCredentials) -> Self {
        Self {
            run_id,
            user_id: user.user_id.clone(),
            user_name: user.user_name.clone(),
            sport_date: user.sport_date,
            first_time: user.first_time.to_string(),
            second_time: user.second_time.map(|t| t.to_string()),
            first_done: false,
            second_done: user.second_time.is_none(),
            cancel_requested: false,
            created_at: Utc::now(),
        }
    }

    /// Both tracks have stopped
    pub fn is_complete(&self) -> bool {
        self.first_done && self.second_done
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("Run not found: {0}")]
    NotFound(RunId),
}

// ============================================================================
// Registry
// ============================================================================

struct JobEntry {
    record: JobRecord,
    retired: watch::Sender<bool>,
}

/// Process-wide registry of live runs
#[derive(Clone)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<RunId, JobEntry>>>,
    next_id: Arc<AtomicU64>,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Register a new run and return its identifier
    pub async fn create(&self, user: &UserCredentials) -> RunId {
        let run_id = RunId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (retired, _) = watch::channel(false);

        let mut jobs = self.jobs.write().await;
        jobs.insert(
            run_id,
            JobEntry {
                record: JobRecord::new(run_id, user),
                retired,
            },
        );
        info!(%run_id, user_id = %user.user_id, "Run registered");
        run_id
    }

    /// Set a track's completion flag; flags never go back to false
    pub async fn mark_complete(&self, run_id: RunId, track: TrackId) -> Result<(), JobError> {
        let mut jobs = self.jobs.write().await;
        let entry = jobs.get_mut(&run_id).ok_or(JobError::NotFound(run_id))?;
        match track {
            TrackId::First => entry.record.first_done = true,
            TrackId::Second => entry.record.second_done = true,
        }
        debug!(%run_id, %track, "Track marked complete");
        Ok(())
    }

    /// Whether the tracks of `run_id` should stop
    ///
    /// Unknown runs count as cancelled.
    pub async fn is_cancelled(&self, run_id: RunId) -> bool {
        let jobs = self.jobs.read().await;
        jobs.get(&run_id)
            .map(|entry| entry.record.cancel_requested)
            .unwrap_or(true)
    }

    /// Ask the run to stop and wait until the coordinator has retired it
    ///
    /// Both completion flags are forced to true. Returns once the record is
    /// gone.
    pub async fn request_cancel(&self, run_id: RunId) -> Result<(), JobError> {
        let mut retired = self.signal_cancel(run_id).await?;

        info!(%run_id, "Cancellation requested, waiting for tracks to stop");
        // A dropped sender also means the record is gone
        let _ = retired.wait_for(|done| *done).await;
        info!(%run_id, "Run stopped after cancellation");
        Ok(())
    }

    /// Flag the run for cancellation without waiting
    ///
    /// Used by the coordinator to stop a sibling track after a fatal error.
    pub async fn signal_cancel(&self, run_id: RunId) -> Result<watch::Receiver<bool>, JobError> {
        let mut jobs = self.jobs.write().await;
        let entry = jobs.get_mut(&run_id).ok_or(JobError::NotFound(run_id))?;
        entry.record.cancel_requested = true;
        entry.record.first_done = true;
        entry.record.second_done = true;
        Ok(entry.retired.subscribe())
    }

    /// Remove the record and release any waiting cancellation callers
    pub async fn retire(&self, run_id: RunId) -> Option<JobRecord> {
        let entry = self.jobs.write().await.remove(&run_id)?;
        entry.retired.send_replace(true);
        debug!(%run_id, "Run retired");
        Some(entry.record)
    }

    pub async fn get(&self, run_id: RunId) -> Option<JobRecord> {
        self.jobs.read().await.get(&run_id).map(|e| e.record.clone())
    }

    /// Snapshots of all live runs, ordered by id
    pub async fn list(&self) -> Vec<JobRecord> {
        let jobs = self.jobs.read().await;
        let mut records: Vec<JobRecord> = jobs.values().map(|e| e.record.clone()).collect();
        records.sort_by_key(|r| r.run_id);
        records
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn user(second: &str) -> UserCredentials {
        UserCredentials::from_form(
            "2210274049", "Alice", "pw", "13800000000", "2024-09-17", "20:00", second, true,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_run_ids_increase() {
        let registry = JobRegistry::new();
        let a = registry.create(&user("21:00")).await;
        let b = registry.create(&user("21:00")).await;
        assert!(b > a);
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_sentinel_second_track_starts_done() {
        let registry = JobRegistry::new();
        let run = registry.create(&user("00:00")).await;
        let record = registry.get(run).await.unwrap();
        assert!(!record.first_done);
        assert!(record.second_done);
        assert_eq!(record.second_time, None);
    }

    #[tokio::test]
    async fn test_flags_are_monotonic() {
        let registry = JobRegistry::new();
        let run = registry.create(&user("21:00")).await;

        registry.mark_complete(run, TrackId::Second).await.unwrap();
        registry.mark_complete(run, TrackId::Second).await.unwrap();
        let record = registry.get(run).await.unwrap();
        assert!(record.second_done);
        assert!(!record.first_done);

        registry.mark_complete(run, TrackId::First).await.unwrap();
        assert!(registry.get(run).await.unwrap().is_complete());
    }

    #[tokio::test]
    async fn test_mark_unknown_run() {
        let registry = JobRegistry::new();
        assert_eq!(
            registry.mark_complete(RunId(99), TrackId::First).await,
            Err(JobError::NotFound(RunId(99)))
        );
        assert!(registry.is_cancelled(RunId(99)).await);
    }

    #[tokio::test]
    async fn test_cancel_unknown_run() {
        let registry = JobRegistry::new();
        assert_eq!(
            registry.request_cancel(RunId(7)).await,
            Err(JobError::NotFound(RunId(7)))
        );
    }

    #[tokio::test]
    async fn test_cancel_blocks_until_retired() {
        let registry = JobRegistry::new();
        let run = registry.create(&user("21:00")).await;

        let canceller = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.request_cancel(run).await })
        };

        // Wait for the flag to be visible
        while !registry.is_cancelled(run).await {
            tokio::task::yield_now().await;
        }
        let record = registry.get(run).await.unwrap();
        assert!(record.first_done && record.second_done);
        assert!(!canceller.is_finished());

        registry.retire(run).await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), canceller)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_retire_twice() {
        let registry = JobRegistry::new();
        let run = registry.create(&user("00:00")).await;
        assert!(registry.retire(run).await.is_some());
        assert!(registry.retire(run).await.is_none());
    }

    #[tokio::test]
    async fn test_list_sorted() {
        let registry = JobRegistry::new();
        let a = registry.create(&user("00:00")).await;
        let b = registry.create(&user("21:00")).await;
        let ids: Vec<RunId> = registry.list().await.iter().map(|r| r.run_id).collect();
        assert_eq!(ids, vec![a, b]);
    }
}

//! Reservation coordinator
//!
//! Owns the lifecycle of a run: wait for the daily trigger (unless the run
//! is immediate), log in, race one track per requested window, and retire
//! the job record once every track has stopped.

use chrono::{DateTime, Local};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, info_span, Instrument};

use super::track::{BookingTrack, TrackOutcome, TrackSettings};
use super::window::AvailabilityWindow;
use crate::error::{Error, Result};
use crate::jobs::{JobRegistry, RunId};
use crate::models::{RoomCatalog, TrackId, UserCredentials};
use crate::notifications::Notifier;
use crate::portal::Portal;
use crate::scheduler::{time_left, DailyTrigger};
use crate::session::{Authenticator, SessionState};

/// Longest uninterrupted sleep while waiting for the daily trigger
const TRIGGER_POLL: Duration = Duration::from_secs(1);

/// Result of one track within a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackReport {
    pub track: TrackId,
    pub booked_room: Option<String>,
    pub cancelled: bool,
}

impl TrackReport {
    fn from_outcome(track: TrackId, outcome: &TrackOutcome) -> Self {
        match outcome {
            TrackOutcome::Booked(room) => Self {
                track,
                booked_room: Some(room.id.clone()),
                cancelled: false,
            },
            TrackOutcome::Cancelled => Self {
                track,
                booked_room: None,
                cancelled: true,
            },
        }
    }
}

/// Result of a finished run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub tracks: Vec<TrackReport>,
}

impl RunReport {
    /// Every requested window was booked
    pub fn all_booked(&self) -> bool {
        !self.tracks.is_empty() && self.tracks.iter().all(|t| t.booked_room.is_some())
    }

    pub fn cancelled(&self) -> bool {
        self.tracks.iter().any(|t| t.cancelled)
    }
}

/// Coordinator settings
#[derive(Debug, Clone, Default)]
pub struct CoordinatorSettings {
    pub track: TrackSettings,
    pub trigger: DailyTrigger,
}

/// Starts and supervises reservation runs
#[derive(Clone)]
pub struct ReservationCoordinator {
    portal: Arc<dyn Portal>,
    authenticator: Arc<dyn Authenticator>,
    notifier: Arc<dyn Notifier>,
    registry: JobRegistry,
    catalog: Arc<RoomCatalog>,
    settings: CoordinatorSettings,
}

impl ReservationCoordinator {
    pub fn new(
        portal: Arc<dyn Portal>,
        authenticator: Arc<dyn Authenticator>,
        notifier: Arc<dyn Notifier>,
        registry: JobRegistry,
        catalog: RoomCatalog,
        settings: CoordinatorSettings,
    ) -> Self {
        Self {
            portal,
            authenticator,
            notifier,
            registry,
            catalog: Arc::new(catalog),
            settings,
        }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Register a run and execute it on a background task
    pub async fn start(&self, user: UserCredentials) -> RunId {
        let run_id = self.registry.create(&user).await;
        let coordinator = self.clone();

        tokio::spawn(async move {
            match coordinator.execute(run_id, user).await {
                Ok(report) => info!(%run_id, booked = report.all_booked(), cancelled = report.cancelled(), "Run finished"),
                Err(e) => error!(%run_id, error = %e, category = e.category().as_str(), "Run failed"),
            }
        });

        run_id
    }

    /// Execute an already registered run to completion
    ///
    /// The job record is retired on every exit path.
    pub async fn execute(&self, run_id: RunId, user: UserCredentials) -> Result<RunReport> {
        let span = info_span!("run", %run_id, user_id = %user.user_id);
        let result = self.execute_inner(run_id, user).instrument(span).await;
        self.registry.retire(run_id).await;
        result
    }

    async fn execute_inner(&self, run_id: RunId, user: UserCredentials) -> Result<RunReport> {
        if !user.execute_now {
            let target = self.settings.trigger.next_local(Local::now());
            info!(%target, "Waiting for daily trigger");
            if !self.wait_for_trigger(run_id, target).await {
                info!("Run cancelled before trigger");
                return Ok(Self::cancelled_report(run_id, &user));
            }
        }

        if self.registry.is_cancelled(run_id).await {
            return Ok(Self::cancelled_report(run_id, &user));
        }

        let session = self
            .authenticator
            .authenticate(&user.user_id, &user.password)
            .await?;

        self.run_tracks(run_id, Arc::new(user), session).await
    }

    /// Sleep until `target`; `false` if cancelled meanwhile
    async fn wait_for_trigger(&self, run_id: RunId, target: DateTime<Local>) -> bool {
        loop {
            if self.registry.is_cancelled(run_id).await {
                return false;
            }
            let remaining = time_left(target, Local::now());
            if remaining.is_zero() {
                return true;
            }
            tokio::time::sleep(remaining.min(TRIGGER_POLL)).await;
        }
    }

    fn cancelled_report(run_id: RunId, user: &UserCredentials) -> RunReport {
        RunReport {
            run_id,
            tracks: user
                .tracks()
                .into_iter()
                .map(|track| TrackReport::from_outcome(track, &TrackOutcome::Cancelled))
                .collect(),
        }
    }

    /// Race one track per requested window with an established session
    ///
    /// Does not retire the record; [`Self::execute`] does.
    pub async fn run_tracks(
        &self,
        run_id: RunId,
        user: Arc<UserCredentials>,
        session: SessionState,
    ) -> Result<RunReport> {
        let tracks: Vec<BookingTrack> = user
            .tracks()
            .into_iter()
            .filter_map(|track| user.time_for(track).map(|time| (track, time)))
            .map(|(track, time)| BookingTrack {
                run_id,
                track,
                time,
                window: AvailabilityWindow::for_slot(user.sport_date, time),
                user: Arc::clone(&user),
                session: session.clone(),
                portal: Arc::clone(&self.portal),
                catalog: Arc::clone(&self.catalog),
                registry: self.registry.clone(),
                notifier: Arc::clone(&self.notifier),
                settings: self.settings.track.clone(),
            })
            .collect();

        info!(tracks = tracks.len(), rooms = self.catalog.len(), "Starting booking tracks");

        let ids: Vec<TrackId> = tracks.iter().map(|t| t.track).collect();
        let results = join_all(tracks.into_iter().map(|track| {
            let span = info_span!("track", track = %track.track);
            track.run().instrument(span)
        }))
        .await;

        let mut reports = Vec::with_capacity(results.len());
        let mut first_error: Option<Error> = None;
        for (track, result) in ids.into_iter().zip(results) {
            match result {
                Ok(outcome) => reports.push(TrackReport::from_outcome(track, &outcome)),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(RunReport {
                run_id,
                tracks: reports,
            }),
        }
    }
}

pub mod book;
pub mod serve;

pub use book::{book, BookParams};
pub use serve::serve;

use anyhow::{Context, Result};
use std::sync::Arc;

use courtside::booking::{BackoffPolicy, CoordinatorSettings, ReservationCoordinator, TrackSettings};
use courtside::config::Config;
use courtside::crypto::CasAesCipher;
use courtside::jobs::JobRegistry;
use courtside::models::RoomCatalog;
use courtside::notifications::{LogNotifier, Notifier, WebhookConfig, WebhookNotifier};
use courtside::portal::PortalClient;
use courtside::scheduler::DailyTrigger;
use courtside::session::SessionAcquirer;

/// Wire the production collaborators together from configuration
pub fn build_coordinator(config: &Config) -> Result<ReservationCoordinator> {
    let catalog = RoomCatalog::load_or_empty(&config.booking.catalog_path).with_context(|| {
        format!(
            "Failed to load room catalog: {}",
            config.booking.catalog_path.display()
        )
    })?;
    if catalog.is_empty() {
        tracing::warn!("Room catalog is empty, no pass can succeed");
    }

    let portal = PortalClient::new(&config.portal, config.booking.transport_retries)
        .context("Failed to create portal client")?;
    let acquirer = SessionAcquirer::new(&config.portal, Arc::new(CasAesCipher::new()))
        .context("Failed to create session acquirer")?;

    let notifier: Arc<dyn Notifier> = match WebhookConfig::from_notify_config(&config.notify) {
        Some(webhook) => Arc::new(
            WebhookNotifier::new(webhook).context("Failed to create webhook notifier")?,
        ),
        None => Arc::new(LogNotifier),
    };

    let settings = CoordinatorSettings {
        track: TrackSettings {
            max_rejections_per_pass: config.booking.max_rejections_per_pass,
            backoff: BackoffPolicy::Fixed(config.booking.poll_interval()),
        },
        trigger: DailyTrigger::new(config.booking.trigger_time()?),
    };

    Ok(ReservationCoordinator::new(
        Arc::new(portal),
        Arc::new(acquirer),
        notifier,
        JobRegistry::new(),
        catalog,
        settings,
    ))
}

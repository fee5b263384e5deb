use anyhow::{Context, Result};

use courtside::config::Config;
use courtside::models::{UserCredentials, NO_SECOND_SLOT};

use super::build_coordinator;

/// Arguments of the `book` command
#[derive(Debug)]
pub struct BookParams {
    pub user_id: String,
    pub name: String,
    pub password: String,
    pub phone: String,
    pub date: String,
    pub first: String,
    pub second: Option<String>,
    pub now: bool,
}

/// Run one reservation in the foreground
pub async fn book(config: Config, params: BookParams) -> Result<()> {
    let user = UserCredentials::from_form(
        &params.user_id,
        &params.name,
        &params.password,
        &params.phone,
        &params.date,
        &params.first,
        params.second.as_deref().unwrap_or(NO_SECOND_SLOT),
        params.now,
    )
    .context("Invalid booking request")?;

    let coordinator = build_coordinator(&config)?;
    let run_id = coordinator.registry().create(&user).await;

    println!("Run {run_id}: {} on {}", user.user_name, user.sport_date);
    println!("  First slot: {}", user.first_time);
    if let Some(second) = user.second_time {
        println!("  Second slot: {second}");
    }
    if !user.execute_now {
        println!("  Waiting for daily trigger at {}", config.booking.trigger_time);
    }

    let report = coordinator
        .execute(run_id, user)
        .await
        .context("Reservation run failed")?;

    for track in &report.tracks {
        match &track.booked_room {
            Some(room) => println!("  {} slot: booked room {room}", track.track),
            None => println!("  {} slot: not booked", track.track),
        }
    }

    Ok(())
}

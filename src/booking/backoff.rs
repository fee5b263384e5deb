//! Pacing between passes of a booking track

use std::time::Duration;

/// How long a track waits after a pass that booked nothing
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffPolicy {
    /// Same pause after every pass
    Fixed(Duration),
    /// `base * multiplier^(pass-1)`, capped at `max`
    Exponential {
        base: Duration,
        max: Duration,
        multiplier: f64,
    },
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::Fixed(Duration::from_secs(3))
    }
}

impl BackoffPolicy {
    /// Pause after the `pass`-th unsuccessful pass (1-based)
    pub fn delay(&self, pass: u32) -> Duration {
        match self {
            Self::Fixed(d) => *d,
            Self::Exponential {
                base,
                max,
                multiplier,
            } => {
                let exp = pass.saturating_sub(1).min(63) as i32;
                let ms = base.as_millis() as f64 * multiplier.powi(exp);
                if !ms.is_finite() || ms >= max.as_millis() as f64 {
                    *max
                } else {
                    Duration::from_millis(ms as u64)
                }
            }
        }
    }
}

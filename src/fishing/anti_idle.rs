//! Randomized anti-idle key presses

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Draw a whole number of seconds uniformly from `min_secs..=max_secs`
pub fn draw_interval<R: Rng + ?Sized>(rng: &mut R, min_secs: u64, max_secs: u64) -> Duration {
    if min_secs >= max_secs {
        return Duration::from_secs(min_secs);
    }
    Duration::from_secs(rng.gen_range(min_secs..=max_secs))
}

/// Tracks when the anti-idle key was last pressed.
///
/// A fresh threshold is drawn on every check, so the effective spacing is not
/// a single fixed value even within one session.
#[derive(Debug)]
pub struct AntiIdle {
    min_secs: u64,
    max_secs: u64,
    last_press: Option<Instant>,
    rng: StdRng,
}

impl AntiIdle {
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self::with_rng(min_secs, max_secs, StdRng::from_entropy())
    }

    pub fn with_rng(min_secs: u64, max_secs: u64, rng: StdRng) -> Self {
        Self {
            min_secs,
            max_secs,
            last_press: None,
            rng,
        }
    }

    /// True when a press is due at `now`. Always due before the first press.
    pub fn is_due(&mut self, now: Instant) -> bool {
        let threshold = draw_interval(&mut self.rng, self.min_secs, self.max_secs);
        match self.last_press {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= threshold,
        }
    }

    /// Record a press at `now`
    pub fn mark(&mut self, now: Instant) {
        self.last_press = Some(now);
    }
}

//! Validated, immutable configuration of one fishing session

use std::time::Duration;

use crate::error::ConfigError;
use crate::screen_reader::TemplateSet;
use crate::utils::keybinds::{resolve_key, resolve_optional_key};
use crate::utils::Settings;

/// Every wait and budget of the fishing cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopTimings {
    /// Wait before retrying a failed window activation
    pub window_retry: Duration,
    /// Minimum time between two bait uses
    pub bait_interval: Duration,
    /// Wait after using bait
    pub after_bait: Duration,
    /// Wait after casting, before the first search
    pub after_cast: Duration,
    /// Search + watch budget, measured from the cast
    pub cue_budget: Duration,
    /// Wait between two searches that found nothing
    pub search_retry: Duration,
    /// Pointer travel time onto the bobber
    pub cursor_move: Duration,
    /// Region poll interval while watching; bounds reaction delay
    pub watch_poll: Duration,
    /// Wait after the reaction click
    pub after_react: Duration,
    /// Wait at the end of every cycle
    pub cooldown: Duration,
    /// Wait after an unexpected error
    pub error_backoff: Duration,
    /// Pixels pulled back from the match's bottom-right corner when placing
    /// the pointer
    pub pointer_inset: i32,
}

impl Default for LoopTimings {
    fn default() -> Self {
        Self {
            window_retry: Duration::from_secs(5),
            bait_interval: Duration::from_secs(660),
            after_bait: Duration::from_secs(2),
            after_cast: Duration::from_millis(1500),
            cue_budget: Duration::from_secs(20),
            search_retry: Duration::from_millis(500),
            cursor_move: Duration::from_millis(300),
            watch_poll: Duration::from_millis(100),
            after_react: Duration::from_secs(1),
            cooldown: Duration::from_secs(3),
            error_backoff: Duration::from_secs(5),
            pointer_inset: 10,
        }
    }
}

/// Everything one run needs, fixed at session start
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub templates: TemplateSet,
    pub cast_key: String,
    pub bait_key: Option<String>,
    pub duration_hours: u32,
    pub diff_threshold: f64,
    pub confidence_threshold: f64,
    pub window_title: String,
    pub anti_idle_key: String,
    /// Inclusive anti-idle interval bounds, in seconds
    pub anti_idle_interval: (u64, u64),
    pub timings: LoopTimings,
}

struct Keys {
    cast: String,
    bait: Option<String>,
    anti_idle: String,
}

impl SessionConfig {
    /// Validate `settings` and load the configured template images
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let keys = validate(settings)?;
        if settings.image_paths.is_empty() {
            return Err(ConfigError::NoImagePaths);
        }

        let templates = TemplateSet::load(settings.image_paths.as_slice());
        if templates.is_empty() {
            return Err(ConfigError::NoReadableTemplates(settings.image_paths.len()));
        }
        if templates.len() < settings.image_paths.len() {
            tracing::warn!(
                "[CONFIG] Loaded {}/{} template images",
                templates.len(),
                settings.image_paths.len()
            );
        }

        Ok(Self::assemble(settings, keys, templates))
    }

    /// Validate `settings` but take templates already in memory
    /// (`image_paths` is ignored)
    pub fn with_templates(settings: &Settings, templates: TemplateSet) -> Result<Self, ConfigError> {
        let keys = validate(settings)?;
        if templates.is_empty() {
            return Err(ConfigError::NoImagePaths);
        }
        Ok(Self::assemble(settings, keys, templates))
    }

    pub fn with_timings(mut self, timings: LoopTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn session_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.duration_hours) * 3600)
    }

    fn assemble(settings: &Settings, keys: Keys, templates: TemplateSet) -> Self {
        Self {
            templates,
            cast_key: keys.cast,
            bait_key: keys.bait,
            duration_hours: settings.duration_hours,
            diff_threshold: settings.diff_threshold,
            confidence_threshold: settings.confidence_threshold,
            window_title: settings.window_title.trim().to_string(),
            anti_idle_key: keys.anti_idle,
            anti_idle_interval: (
                u64::from(settings.anti_idle_min_minutes) * 60,
                u64::from(settings.anti_idle_max_minutes) * 60,
            ),
            timings: LoopTimings::default(),
        }
    }
}

fn validate(settings: &Settings) -> Result<Keys, ConfigError> {
    if settings.cast_key.trim().is_empty() {
        return Err(ConfigError::MissingCastKey);
    }
    let cast = resolve_key(&settings.cast_key).ok_or_else(|| ConfigError::UnknownKey {
        field: "cast",
        key: settings.cast_key.trim().to_string(),
    })?;
    let bait = resolve_optional_key(&settings.bait_key)
        .map_err(|key| ConfigError::UnknownKey { field: "bait", key })?;
    let anti_idle = resolve_key(&settings.anti_idle_key).ok_or_else(|| ConfigError::UnknownKey {
        field: "anti-idle",
        key: settings.anti_idle_key.trim().to_string(),
    })?;

    if !(0.0..=1.0).contains(&settings.confidence_threshold) {
        return Err(ConfigError::ConfidenceOutOfRange(settings.confidence_threshold));
    }
    if !(0.0..=255.0).contains(&settings.diff_threshold) {
        return Err(ConfigError::DiffThresholdOutOfRange(settings.diff_threshold));
    }

    let (min, max) = (settings.anti_idle_min_minutes, settings.anti_idle_max_minutes);
    if min == 0 || min > max {
        return Err(ConfigError::InvalidAntiIdleRange { min, max });
    }

    Ok(Keys {
        cast,
        bait,
        anti_idle,
    })
}

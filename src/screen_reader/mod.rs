//! Screen capture, cue search and region change detection

pub mod image_service;
pub mod region_watcher;
pub mod screen_service;

pub use image_service::{find_best_match, CueMatch, Template, TemplateSet};
pub use region_watcher::{sample_difference, RegionWatcher};
pub use screen_service::{Capturer, Region, ScreenService};

//! Change detection on the bobber region

use image::DynamicImage;

use super::screen_service::{Capturer, Region};

/// Mean absolute grayscale difference between two captures.
///
/// Either side missing, or captures of different sizes, yield 0.0 so a failed
/// grab never reads as a bite.
pub fn sample_difference(prev: Option<&DynamicImage>, curr: Option<&DynamicImage>) -> f64 {
    let (Some(prev), Some(curr)) = (prev, curr) else {
        return 0.0;
    };

    let prev = prev.to_luma8();
    let curr = curr.to_luma8();
    if prev.dimensions() != curr.dimensions() {
        tracing::debug!(
            "[WATCH] Capture size changed {:?} -> {:?}, ignoring sample",
            prev.dimensions(),
            curr.dimensions()
        );
        return 0.0;
    }

    let count = prev.as_raw().len();
    if count == 0 {
        return 0.0;
    }

    let total: u64 = prev
        .as_raw()
        .iter()
        .zip(curr.as_raw())
        .map(|(a, b)| a.abs_diff(*b) as u64)
        .sum();

    total as f64 / count as f64
}

/// Re-captures one rectangle and compares it against the previous capture
pub struct RegionWatcher<'a, C: Capturer + ?Sized> {
    capturer: &'a C,
    region: Region,
    baseline: Option<DynamicImage>,
}

impl<'a, C: Capturer + ?Sized> RegionWatcher<'a, C> {
    pub fn new(capturer: &'a C, region: Region) -> Self {
        Self {
            capturer,
            region,
            baseline: None,
        }
    }

    pub fn region(&self) -> Region {
        self.region
    }

    /// Capture the baseline. Returns false when the capture failed.
    pub fn prime(&mut self) -> bool {
        self.baseline = self.capturer.try_capture(Some(self.region));
        self.baseline.is_some()
    }

    /// Capture again and compare against the baseline.
    ///
    /// `None` when the capture failed. On success the new capture becomes the
    /// baseline for the next poll.
    pub fn poll(&mut self) -> Option<f64> {
        let current = self.capturer.try_capture(Some(self.region))?;
        let difference = sample_difference(self.baseline.as_ref(), Some(&current));
        self.baseline = Some(current);
        Some(difference)
    }
}

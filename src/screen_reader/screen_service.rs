//! Screen capture service

use anyhow::Result;
#[cfg(windows)]
use anyhow::Context;
use image::DynamicImage;

/// Region for screenshot capture, in primary-screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(left: i32, top: i32, width: u32, height: u32) -> Self {
        Self { left, top, width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Source of screen pixels.
///
/// `None` captures the whole primary screen.
pub trait Capturer {
    fn capture(&self, region: Option<Region>) -> Result<DynamicImage>;

    /// Capture, logging and swallowing failures
    fn try_capture(&self, region: Option<Region>) -> Option<DynamicImage> {
        match self.capture(region) {
            Ok(img) => Some(img),
            Err(e) => {
                tracing::warn!("[CAPTURE] Screenshot failed: {:#}", e);
                None
            }
        }
    }
}

/// Captures the primary screen
#[derive(Debug, Default)]
pub struct ScreenService;

impl ScreenService {
    pub fn new() -> Self {
        Self
    }
}

impl Capturer for ScreenService {
    #[cfg(windows)]
    fn capture(&self, region: Option<Region>) -> Result<DynamicImage> {
        use screenshots::Screen;

        let screens = Screen::all().context("Failed to get screens")?;

        // Primary screen is the first one
        let screen = screens.first().context("No screens found")?;

        let image = match region {
            Some(r) => {
                if r.is_empty() {
                    anyhow::bail!("Empty capture region {:?}", r);
                }
                screen
                    .capture_area(r.left, r.top, r.width, r.height)
                    .context("Failed to capture area")?
            }
            None => screen.capture().context("Failed to capture screen")?,
        };

        // screenshots ships its own `image` version; go through raw RGBA bytes
        let rgba_image = image::RgbaImage::from_raw(image.width(), image.height(), image.to_vec())
            .context("Failed to create image from raw data")?;

        Ok(DynamicImage::ImageRgba8(rgba_image))
    }

    #[cfg(not(windows))]
    fn capture(&self, _region: Option<Region>) -> Result<DynamicImage> {
        anyhow::bail!("Screen capture not implemented on this platform")
    }
}

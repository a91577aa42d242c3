//! Template matching for locating the bobber on a full-screen frame

use std::path::Path;

use image::imageops::{crop_imm, resize, FilterType};
use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use imageproc::integral_image::{integral_image, integral_squared_image};
use imageproc::template_matching::{find_extremes, match_template_parallel, MatchTemplateMethod};

use super::screen_service::Region;

/// Variance products below this are treated as a flat window (score 0).
const FLAT_EPSILON: f64 = 1e-6;

/// Shortest template side kept after downscaling for the coarse pass
const MIN_COARSE_SIDE: u32 = 12;
const MAX_PYRAMID_FACTOR: u32 = 4;
/// Coarse placements re-checked at full resolution
const COARSE_CANDIDATES: usize = 5;
/// Refinement window half-size, in coarse pixels
const REFINE_RADIUS: u32 = 2;

/// A reference image of the cue
#[derive(Debug, Clone)]
pub struct Template {
    pub id: String,
    pub image: GrayImage,
}

/// Templates in configured priority order
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    templates: Vec<Template>,
}

impl TemplateSet {
    /// Load templates from image files.
    ///
    /// Files that cannot be opened or decoded are logged and skipped; the
    /// order of the remaining entries follows `paths`.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Self {
        let mut templates = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let id = template_id(path);
            match image::open(path) {
                Ok(img) => templates.push(Template {
                    id,
                    image: img.to_luma8(),
                }),
                Err(e) => {
                    tracing::warn!("[MATCH] Cannot read template {:?}: {}. Skipping", path, e);
                }
            }
        }
        Self { templates }
    }

    pub fn from_templates(templates: Vec<Template>) -> Self {
        Self { templates }
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.iter()
    }
}

fn template_id(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

/// Where a template was found on the frame
#[derive(Debug, Clone, PartialEq)]
pub struct CueMatch {
    pub template_id: String,
    pub top_left: (i32, i32),
    pub size: (u32, u32),
    pub score: f64,
}

impl CueMatch {
    /// Rectangle covered by the match
    pub fn region(&self) -> Region {
        Region::new(self.top_left.0, self.top_left.1, self.size.0, self.size.1)
    }

    /// Bottom-right corner of the match pulled `inset` pixels back on both axes.
    ///
    /// Signed arithmetic: when the match is smaller than `inset` the point ends
    /// up above/left of `top_left`.
    pub fn target_point(&self, inset: i32) -> (i32, i32) {
        (
            self.top_left.0 + self.size.0 as i32 - inset,
            self.top_left.1 + self.size.1 as i32 - inset,
        )
    }
}

/// Search `frame` for the templates in order and return the first one whose
/// best score reaches `confidence_threshold`.
///
/// Configured order is a priority list: a later template is never consulted
/// once an earlier one qualifies, even if the later one would score higher.
/// Templates that cannot be evaluated against this frame are skipped.
pub fn find_best_match(
    frame: &DynamicImage,
    templates: &TemplateSet,
    confidence_threshold: f64,
) -> Option<CueMatch> {
    let frame = frame.to_luma8();

    for template in templates.iter() {
        let Some((score, (x, y))) = best_score(&frame, &template.image) else {
            tracing::debug!("[MATCH] Template '{}' cannot be searched on this frame, skipping", template.id);
            continue;
        };

        if score >= confidence_threshold {
            tracing::debug!(
                "[MATCH] FOUND '{}' at ({}, {}) with score={:.3} >= threshold={:.2}",
                template.id,
                x,
                y,
                score,
                confidence_threshold
            );
            return Some(CueMatch {
                template_id: template.id.clone(),
                top_left: (x as i32, y as i32),
                size: template.image.dimensions(),
                score,
            });
        }

        tracing::trace!(
            "[MATCH] '{}' NOT FOUND - score={:.3} < threshold={:.2}",
            template.id,
            score,
            confidence_threshold
        );
    }

    None
}

/// Best correlation coefficient of `template` over `frame` and its top-left.
///
/// Templates large enough to survive downscaling are searched coarse-to-fine:
/// the whole frame at reduced resolution, then full resolution only around
/// the strongest coarse candidates. `None` when the template is empty or does
/// not fit inside the frame.
pub fn best_score(frame: &GrayImage, template: &GrayImage) -> Option<(f64, (u32, u32))> {
    let (fw, fh) = frame.dimensions();
    let (tw, th) = template.dimensions();
    if tw == 0 || th == 0 || tw > fw || th > fh {
        return None;
    }

    let factor = pyramid_factor(tw, th);
    if factor == 1 {
        return exhaustive_best(frame, template);
    }

    let small_frame = resize(frame, fw / factor, fh / factor, FilterType::Triangle);
    let small_template = resize(template, tw / factor, th / factor, FilterType::Triangle);
    let Some(coarse) = correlation_map(&small_frame, &small_template) else {
        return exhaustive_best(frame, template);
    };

    let spacing = small_template.width().min(small_template.height()) / 2;
    let radius = REFINE_RADIUS * factor;
    coarse_candidates(&coarse, spacing)
        .into_iter()
        .filter_map(|(cx, cy)| refine(frame, template, cx * factor, cy * factor, radius))
        .max_by(|a, b| a.0.total_cmp(&b.0))
}

/// Downscale factor keeping the template's short side at `MIN_COARSE_SIDE` or more
fn pyramid_factor(tw: u32, th: u32) -> u32 {
    (tw.min(th) / MIN_COARSE_SIDE).clamp(1, MAX_PYRAMID_FACTOR)
}

fn exhaustive_best(frame: &GrayImage, template: &GrayImage) -> Option<(f64, (u32, u32))> {
    let scores = correlation_map(frame, template)?;
    let extremes = find_extremes(&scores);
    Some((extremes.max_value as f64, extremes.max_value_location))
}

/// Highest-scoring coarse placements, at least `spacing` apart on one axis
fn coarse_candidates(scores: &ImageBuffer<Luma<f32>, Vec<f32>>, spacing: u32) -> Vec<(u32, u32)> {
    let mut ranked: Vec<(f32, u32, u32)> = scores
        .enumerate_pixels()
        .map(|(x, y, p)| (p[0], x, y))
        .collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut picked: Vec<(u32, u32)> = Vec::with_capacity(COARSE_CANDIDATES);
    for (_, x, y) in ranked {
        if picked.len() == COARSE_CANDIDATES {
            break;
        }
        if picked
            .iter()
            .all(|&(px, py)| px.abs_diff(x) > spacing || py.abs_diff(y) > spacing)
        {
            picked.push((x, y));
        }
    }
    picked
}

/// Full-resolution search in a window of `radius` pixels around `(x, y)`
fn refine(
    frame: &GrayImage,
    template: &GrayImage,
    x: u32,
    y: u32,
    radius: u32,
) -> Option<(f64, (u32, u32))> {
    let (fw, fh) = frame.dimensions();
    let (tw, th) = template.dimensions();
    let left = x.saturating_sub(radius).min(fw - tw);
    let top = y.saturating_sub(radius).min(fh - th);
    let right = (x + radius + tw).min(fw);
    let bottom = (y + radius + th).min(fh);

    let window = crop_imm(frame, left, top, right - left, bottom - top).to_image();
    let (score, (dx, dy)) = exhaustive_best(&window, template)?;
    Some((score, (left + dx, top + dy)))
}

/// Normalized correlation coefficient for every placement of `template`.
///
/// Zero-mean normalized cross-correlation (OpenCV's `TM_CCOEFF_NORMED`):
/// the raw cross-correlation comes from imageproc, the window means and
/// variances from integral images. Placements where either side is flat
/// score 0.
fn correlation_map(frame: &GrayImage, template: &GrayImage) -> Option<ImageBuffer<Luma<f32>, Vec<f32>>> {
    let (fw, fh) = frame.dimensions();
    let (tw, th) = template.dimensions();
    if tw == 0 || th == 0 || tw > fw || th > fh {
        return None;
    }

    let n = (tw as u64 * th as u64) as f64;
    let (t_sum, t_sq_sum) = template.pixels().fold((0f64, 0f64), |(s, sq), p| {
        let v = p[0] as f64;
        (s + v, sq + v * v)
    });
    let t_mean = t_sum / n;
    let t_var = t_sq_sum - t_sum * t_sum / n;

    let cross = match_template_parallel(frame, template, MatchTemplateMethod::CrossCorrelation);
    let sums = integral_image::<_, u64>(frame);
    let sq_sums = integral_squared_image::<_, u64>(frame);

    let window = |table: &ImageBuffer<Luma<u64>, Vec<u64>>, x: u32, y: u32| -> f64 {
        let a = table.get_pixel(x, y)[0];
        let b = table.get_pixel(x + tw, y)[0];
        let c = table.get_pixel(x, y + th)[0];
        let d = table.get_pixel(x + tw, y + th)[0];
        ((a + d) - (b + c)) as f64
    };

    let scores = ImageBuffer::from_fn(cross.width(), cross.height(), |x, y| {
        let w_sum = window(&sums, x, y);
        let w_var = window(&sq_sums, x, y) - w_sum * w_sum / n;
        let denom = w_var * t_var;
        if denom <= FLAT_EPSILON {
            return Luma([0.0f32]);
        }
        let numer = cross.get_pixel(x, y)[0] as f64 - t_mean * w_sum;
        Luma([(numer / denom.sqrt()).clamp(-1.0, 1.0) as f32])
    });

    Some(scores)
}

use std::ops::RangeInclusive;

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma};

/// Side length of the canonical square every slice is resampled to.
pub const CANONICAL_SIZE: u32 = 512;

/// Caller-facing bounds for the window width control.
pub const WINDOW_WIDTH_RANGE: RangeInclusive<i32> = 0..=4000;
/// Caller-facing bounds for the window center control.
pub const WINDOW_CENTER_RANGE: RangeInclusive<i32> = 0..=800;

/// Wide window used when sampling a slice for histogram analysis.
pub const ANALYSIS_WINDOW: WindowSettings = WindowSettings {
    width: 4000,
    center: 400,
};

const OPTIMIZE_LOW_PERCENTILE: f64 = 0.05;
const OPTIMIZE_HIGH_PERCENTILE: f64 = 0.95;
const OPTIMIZE_MIN_WIDTH: i32 = 50;

/// Linear window/level parameters mapping native intensities to gray.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSettings {
    pub width: i32,
    pub center: i32,
}

impl WindowSettings {
    pub fn new(width: i32, center: i32) -> Self {
        Self { width, center }
    }

    /// Clamps both parameters into the supported control bounds.
    pub fn clamped(self) -> Self {
        Self {
            width: self
                .width
                .clamp(*WINDOW_WIDTH_RANGE.start(), *WINDOW_WIDTH_RANGE.end()),
            center: self
                .center
                .clamp(*WINDOW_CENTER_RANGE.start(), *WINDOW_CENTER_RANGE.end()),
        }
    }
}

/// Named window presets for common CT review tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPreset {
    CarotidAngiography,
    NeckSoftTissue,
    Brain,
    Lung,
    Bone,
    StandardContrast,
}

impl WindowPreset {
    pub const ALL: [WindowPreset; 6] = [
        WindowPreset::CarotidAngiography,
        WindowPreset::NeckSoftTissue,
        WindowPreset::Brain,
        WindowPreset::Lung,
        WindowPreset::Bone,
        WindowPreset::StandardContrast,
    ];

    pub fn settings(self) -> WindowSettings {
        match self {
            WindowPreset::CarotidAngiography => WindowSettings::new(300, 120),
            WindowPreset::NeckSoftTissue => WindowSettings::new(350, 70),
            WindowPreset::Brain => WindowSettings::new(80, 40),
            WindowPreset::Lung => WindowSettings::new(1500, -600),
            WindowPreset::Bone => WindowSettings::new(2500, 480),
            WindowPreset::StandardContrast => WindowSettings::new(400, 50),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WindowPreset::CarotidAngiography => "Carotid angiography",
            WindowPreset::NeckSoftTissue => "Neck soft tissue",
            WindowPreset::Brain => "Brain",
            WindowPreset::Lung => "Lung",
            WindowPreset::Bone => "Bone",
            WindowPreset::StandardContrast => "Standard contrast",
        }
    }
}

/// Maps native intensity samples to 8-bit gray under the given window.
///
/// Samples at or below `center - width/2` render black, samples at or
/// above `center + width/2` render white, and the span in between is a
/// linear ramp. A zero-width window degenerates to a two-level step at
/// the center. `pixels` must hold `width_px * height_px` samples in
/// row-major order.
pub fn render_window_level(
    width_px: usize,
    height_px: usize,
    pixels: &[i32],
    settings: WindowSettings,
) -> GrayImage {
    let half_width = settings.width as f32 / 2.0;
    let low = settings.center as f32 - half_width;
    let high = settings.center as f32 + half_width;
    let range = high - low;

    GrayImage::from_fn(width_px as u32, height_px as u32, |x, y| {
        let sample = pixels[y as usize * width_px + x as usize] as f32;
        let gray = if sample <= low {
            0
        } else if sample >= high {
            255
        } else {
            (((sample - low) / range) * 255.0).round() as u8
        };
        Luma([gray])
    })
}

/// Renders one slice and resamples it to the canonical square.
pub fn render_canonical(
    width_px: usize,
    height_px: usize,
    pixels: &[i32],
    settings: WindowSettings,
) -> GrayImage {
    resample_to_canonical(render_window_level(width_px, height_px, pixels, settings))
}

/// Resamples an image to [`CANONICAL_SIZE`] with Catmull-Rom
/// filtering; an already canonical image passes through unchanged.
pub fn resample_to_canonical(image: GrayImage) -> GrayImage {
    if image.width() == CANONICAL_SIZE && image.height() == CANONICAL_SIZE {
        return image;
    }
    imageops::resize(&image, CANONICAL_SIZE, CANONICAL_SIZE, FilterType::CatmullRom)
}

/// Derives window settings from the gray histogram of an analysis
/// render, ignoring fully black pixels and the extreme 5% tails.
pub fn optimize_window(image: &GrayImage) -> WindowSettings {
    let mut histogram = [0u64; 256];
    let mut total: u64 = 0;
    for pixel in image.pixels() {
        let intensity = pixel[0] as usize;
        if intensity > 0 {
            histogram[intensity] += 1;
            total += 1;
        }
    }

    let low_count = (total as f64 * OPTIMIZE_LOW_PERCENTILE) as u64;
    let high_count = (total as f64 * OPTIMIZE_HIGH_PERCENTILE) as u64;

    let mut cumulative: u64 = 0;
    let mut effective_min: i32 = 0;
    let mut effective_max: i32 = 255;
    for (intensity, count) in histogram.iter().enumerate() {
        cumulative += count;
        if cumulative >= low_count && effective_min == 0 {
            effective_min = intensity as i32;
        }
        if cumulative >= high_count {
            effective_max = intensity as i32;
            break;
        }
    }

    let width = (effective_max - effective_min).max(OPTIMIZE_MIN_WIDTH);
    let center = effective_min + width / 2;
    WindowSettings::new(width, center).clamped()
}

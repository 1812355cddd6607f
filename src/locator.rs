use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;

use image::GrayImage;

use crate::volume::SliceVolume;
use crate::windowing::{render_canonical, WindowSettings};

/// Fraction of the volume, on each side of its midpoint, covered by
/// the localization search window.
pub const SEARCH_SPAN_FRACTION: f64 = 0.35;
/// Gray level at or below which a sampled pixel counts as empty.
pub const EMPTY_GRAY_THRESHOLD: u8 = 30;
/// Subsampling stride applied on both axes when measuring emptiness.
pub const EMPTY_SAMPLE_STRIDE: usize = 5;
/// A slice bounds the neck zone once its emptiness ratio falls below
/// this share of the window maximum.
pub const BOUNDARY_RATIO_MULTIPLIER: f64 = 0.9;

/// Neck boundaries inferred from an emptiness sweep.
///
/// `top <= center <= bottom` always holds; the bounds default to the
/// search window edges when the profile never drops off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeckLocation {
    /// Slice with the highest emptiness ratio.
    pub center: usize,
    /// First slice of the neck zone.
    pub top: usize,
    /// Last slice of the neck zone.
    pub bottom: usize,
}

/// Messages emitted by a background scan, ending with one `Complete`.
#[derive(Debug, Clone)]
pub enum ScanUpdate {
    Progress { scanned: usize, total: usize },
    Complete(NeckLocation),
}

/// Fraction of sampled pixels at or below [`EMPTY_GRAY_THRESHOLD`].
pub fn empty_ratio(image: &GrayImage) -> f64 {
    let mut empty = 0usize;
    let mut sampled = 0usize;
    for y in (0..image.height()).step_by(EMPTY_SAMPLE_STRIDE) {
        for x in (0..image.width()).step_by(EMPTY_SAMPLE_STRIDE) {
            if image.get_pixel(x, y)[0] <= EMPTY_GRAY_THRESHOLD {
                empty += 1;
            }
            sampled += 1;
        }
    }
    if sampled == 0 {
        return 0.0;
    }
    empty as f64 / sampled as f64
}

/// Inclusive slice window the sweep covers, or `None` for an empty
/// volume.
fn search_window(total_slices: usize) -> Option<(usize, usize)> {
    if total_slices == 0 {
        return None;
    }
    let midpoint = total_slices / 2;
    let span = (total_slices as f64 * SEARCH_SPAN_FRACTION) as usize;
    let start = midpoint.saturating_sub(span);
    let end = (midpoint + span).min(total_slices - 1);
    Some((start, end))
}

/// Sweeps the search window and infers the neck boundaries.
///
/// Each slice is rendered canonically under the caller's window
/// settings and profiled for emptiness. The emptiest slice (first
/// occurrence on ties) marks the neck center; walking outward from it,
/// the boundaries sit just inside the first slices whose ratio drops
/// below 90% of the maximum. Returns `None` only for an empty volume.
pub fn locate(volume: &dyn SliceVolume, settings: WindowSettings) -> Option<NeckLocation> {
    locate_with_progress(volume, settings, |_, _| {})
}

/// Same as [`locate`], invoking `on_progress(scanned, total)` after
/// each profiled slice.
pub fn locate_with_progress(
    volume: &dyn SliceVolume,
    settings: WindowSettings,
    mut on_progress: impl FnMut(usize, usize),
) -> Option<NeckLocation> {
    let (start, end) = search_window(volume.slice_count())?;
    let total = end - start + 1;
    let width = volume.slice_width();
    let height = volume.slice_height();

    let mut ratios = Vec::with_capacity(total);
    let mut best_index = start;
    let mut max_ratio = -1.0f64;
    for index in start..=end {
        let pixels = volume.slice_pixels(index);
        let rendered = render_canonical(width, height, &pixels, settings);
        let ratio = empty_ratio(&rendered);
        ratios.push(ratio);
        on_progress(index - start + 1, total);
        if ratio > max_ratio {
            max_ratio = ratio;
            best_index = index;
        }
    }

    let threshold = max_ratio * BOUNDARY_RATIO_MULTIPLIER;

    let mut top = start;
    for index in (start..=best_index).rev() {
        if ratios[index - start] < threshold {
            top = index + 1;
            break;
        }
    }

    let mut bottom = end;
    for index in best_index..=end {
        if ratios[index - start] < threshold {
            bottom = index - 1;
            break;
        }
    }

    log::debug!(
        "neck sweep over {start}..={end}: center {best_index} (ratio {max_ratio:.3}), \
         zone {top}..={bottom}"
    );
    Some(NeckLocation {
        center: best_index,
        top,
        bottom,
    })
}

/// Runs the sweep on a worker thread, reporting progress through the
/// returned channel and finishing with a single `Complete` message.
/// The result is only ever delivered whole; readers never observe a
/// partially computed location.
pub fn spawn_scan(volume: Arc<dyn SliceVolume>, settings: WindowSettings) -> Receiver<ScanUpdate> {
    let (tx, rx) = mpsc::channel::<ScanUpdate>();
    thread::spawn(move || {
        let progress_tx = tx.clone();
        let location = locate_with_progress(volume.as_ref(), settings, |scanned, total| {
            let _ = progress_tx.send(ScanUpdate::Progress { scanned, total });
        });
        if let Some(location) = location {
            let _ = tx.send(ScanUpdate::Complete(location));
        }
    });
    rx
}

use std::path::{Path, PathBuf};

use image::GrayImage;

use crate::error::DetectionError;
use crate::selection::SliceRangeSelector;
use crate::volume::SliceVolume;
use crate::windowing::{render_canonical, WindowSettings};

/// Usable neck zones span at least this many slices.
pub const MIN_NECK_RANGE: usize = 50;
/// Usable neck zones span at most this many slices.
pub const MAX_NECK_RANGE: usize = 400;
/// A range within this many slices of the whole volume counts as
/// unselected rather than as a deliberate zone.
pub const FULL_VOLUME_MARGIN: usize = 10;
/// Slices collected on each side of the cursor for a bulk payload.
pub const BULK_HALF_SPAN: usize = 30;

/// One of the two request shapes the detection capability accepts.
#[derive(Debug, Clone)]
pub enum DetectionRequest {
    /// The service reads the series itself and windows around the
    /// given slice.
    CenterBased {
        source_path: PathBuf,
        center_slice: usize,
    },
    /// Rendered canonical slices shipped directly, covering the
    /// cursor plus [`BULK_HALF_SPAN`] on each side.
    BulkPayload { images: Vec<GrayImage> },
}

/// Whether the current range delimits a plausible neck zone: a strict
/// sub-range of the volume between [`MIN_NECK_RANGE`] and
/// [`MAX_NECK_RANGE`] slices long.
pub fn neck_range_is_selected(selector: &SliceRangeSelector) -> bool {
    if selector.min_index() >= selector.max_index() {
        return false;
    }
    let len = selector.range_len();
    if len >= selector.total_slices().saturating_sub(FULL_VOLUME_MARGIN) {
        return false;
    }
    (MIN_NECK_RANGE..=MAX_NECK_RANGE).contains(&len)
}

/// Chooses and builds the request for the current selector state.
///
/// When the series has an addressable source path the cheap
/// center-based shape is preferred; otherwise the bulk payload is
/// rendered from the volume under the caller's window settings. An
/// unusable range yields `NoNeckSelected` before anything is built.
pub fn plan_detection_request(
    selector: &SliceRangeSelector,
    source_path: Option<&Path>,
    volume: &dyn SliceVolume,
    settings: WindowSettings,
) -> Result<DetectionRequest, DetectionError> {
    if !neck_range_is_selected(selector) {
        return Err(DetectionError::NoNeckSelected {
            range_len: selector.range_len(),
            total_slices: selector.total_slices(),
        });
    }

    if let Some(path) = source_path {
        return Ok(DetectionRequest::CenterBased {
            source_path: path.to_path_buf(),
            center_slice: selector.cursor(),
        });
    }

    Ok(DetectionRequest::BulkPayload {
        images: collect_bulk_images(volume, selector.cursor(), settings),
    })
}

/// Renders the canonical slices covering `center` plus
/// [`BULK_HALF_SPAN`] on each side, clamped to the volume, in
/// ascending slice order.
pub fn collect_bulk_images(
    volume: &dyn SliceVolume,
    center: usize,
    settings: WindowSettings,
) -> Vec<GrayImage> {
    let total = volume.slice_count();
    if total == 0 {
        return Vec::new();
    }
    let first = center.saturating_sub(BULK_HALF_SPAN);
    let last = (center + BULK_HALF_SPAN).min(total - 1);
    let width = volume.slice_width();
    let height = volume.slice_height();

    let mut images = Vec::with_capacity(last - first + 1);
    for index in first..=last {
        let pixels = volume.slice_pixels(index);
        images.push(render_canonical(width, height, &pixels, settings));
    }
    images
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::InMemoryVolume;
    use crate::windowing::CANONICAL_SIZE;
    use std::sync::Arc;

    fn flat_volume(total: usize) -> InMemoryVolume {
        let frame: Arc<[i32]> = Arc::from(vec![200i32; 64 * 64].into_boxed_slice());
        let frames = (0..total).map(|_| Arc::clone(&frame)).collect();
        InMemoryVolume::new(64, 64, frames).unwrap()
    }

    fn selector_with_range(total: usize, min: usize, max: usize) -> SliceRangeSelector {
        let mut selector = SliceRangeSelector::new(total);
        selector.set_range(min, max).unwrap();
        selector
    }

    #[test]
    fn near_full_range_counts_as_unselected() {
        // 95 of 100 and 993 of 1000 both graze the margin
        assert!(!neck_range_is_selected(&selector_with_range(100, 0, 94)));
        assert!(!neck_range_is_selected(&selector_with_range(1000, 5, 997)));
    }

    #[test]
    fn short_and_long_ranges_count_as_unselected() {
        assert!(!neck_range_is_selected(&selector_with_range(1000, 10, 39)));
        assert!(!neck_range_is_selected(&selector_with_range(1000, 0, 499)));
        assert!(!neck_range_is_selected(&selector_with_range(1000, 10, 410)));
    }

    #[test]
    fn collapsed_range_counts_as_unselected() {
        assert!(!neck_range_is_selected(&selector_with_range(1000, 70, 70)));
    }

    #[test]
    fn plausible_zone_is_accepted() {
        assert!(neck_range_is_selected(&selector_with_range(1000, 100, 299)));
    }

    #[test]
    fn unselected_zone_plans_nothing() {
        let volume = flat_volume(100);
        let selector = SliceRangeSelector::new(100);
        let err = plan_detection_request(
            &selector,
            Some(Path::new("/data/series")),
            &volume,
            WindowSettings::new(400, 50),
        )
        .unwrap_err();
        assert_eq!(
            err,
            DetectionError::NoNeckSelected {
                range_len: 100,
                total_slices: 100
            }
        );
    }

    #[test]
    fn source_path_selects_the_center_based_shape() {
        let volume = flat_volume(1000);
        let mut selector = selector_with_range(1000, 100, 299);
        selector.set_cursor(180);
        let request = plan_detection_request(
            &selector,
            Some(Path::new("/data/series")),
            &volume,
            WindowSettings::new(400, 50),
        )
        .unwrap();
        match request {
            DetectionRequest::CenterBased {
                source_path,
                center_slice,
            } => {
                assert_eq!(source_path, PathBuf::from("/data/series"));
                assert_eq!(center_slice, 180);
            }
            DetectionRequest::BulkPayload { .. } => panic!("expected center-based request"),
        }
    }

    #[test]
    fn missing_path_falls_back_to_bulk_payload() {
        let volume = flat_volume(200);
        let mut selector = selector_with_range(200, 60, 140);
        selector.set_cursor(100);
        let request = plan_detection_request(
            &selector,
            None,
            &volume,
            WindowSettings::new(400, 50),
        )
        .unwrap();
        match request {
            DetectionRequest::BulkPayload { images } => {
                assert_eq!(images.len(), 2 * BULK_HALF_SPAN + 1);
                assert_eq!(images[0].dimensions(), (CANONICAL_SIZE, CANONICAL_SIZE));
            }
            DetectionRequest::CenterBased { .. } => panic!("expected bulk payload"),
        }
    }

    #[test]
    fn bulk_collection_clamps_at_the_volume_edges() {
        let volume = flat_volume(40);
        let images = collect_bulk_images(&volume, 5, WindowSettings::new(400, 50));
        // 5 - 30 saturates to 0, 5 + 30 stays within the volume
        assert_eq!(images.len(), 36);
    }
}

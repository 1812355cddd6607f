use std::path::PathBuf;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::Arc;

use anyhow::{bail, Result};
use image::GrayImage;

use crate::capability::DetectionCapability;
use crate::coords::{DisplayPoint, SurfaceSize};
use crate::error::{DetectionError, SelectionError};
use crate::locator::{self, NeckLocation, ScanUpdate};
use crate::planner;
use crate::region::{Region, RegionRect, RegionSelector};
use crate::report::DetectionOutcome;
use crate::selection::SliceRangeSelector;
use crate::volume::SliceVolume;
use crate::windowing::{self, WindowPreset, WindowSettings};

/// Interactive review state for one loaded volume: current window
/// settings, slice cursor and range, candidate carotid region, and
/// any in-flight localization scan.
pub struct ReviewSession {
    volume: Arc<dyn SliceVolume>,
    source_path: Option<PathBuf>,
    window: WindowSettings,
    slices: SliceRangeSelector,
    region: RegionSelector,
    scan_receiver: Option<Receiver<ScanUpdate>>,
    scan_progress: Option<(usize, usize)>,
}

impl ReviewSession {
    /// Opens a session over a non-empty volume. `source_path` is the
    /// series location the detection service can read on its own,
    /// when one exists.
    pub fn new(volume: Arc<dyn SliceVolume>, source_path: Option<PathBuf>) -> Result<Self> {
        if volume.slice_count() == 0 {
            bail!("Cannot review an empty volume");
        }
        let slices = SliceRangeSelector::new(volume.slice_count());
        Ok(Self {
            volume,
            source_path,
            window: WindowPreset::StandardContrast.settings(),
            slices,
            region: RegionSelector::new(),
            scan_receiver: None,
            scan_progress: None,
        })
    }

    pub fn window(&self) -> WindowSettings {
        self.window
    }

    /// Sets the window parameters used for subsequent renders.
    pub fn set_window(&mut self, settings: WindowSettings) {
        self.window = settings;
    }

    /// Applies a named preset, clamped into the supported bounds.
    pub fn apply_preset(&mut self, preset: WindowPreset) {
        self.window = preset.settings().clamped();
        log::debug!("window preset {}: {:?}", preset.label(), self.window);
    }

    /// Re-derives the window from the cursor slice's gray histogram.
    pub fn optimize_window(&mut self) {
        let rendered = self.render_slice(self.slices.cursor(), windowing::ANALYSIS_WINDOW);
        self.window = windowing::optimize_window(&rendered);
        log::debug!("optimized window: {:?}", self.window);
    }

    /// Renders the cursor slice canonically under the current window.
    pub fn render_current(&self) -> GrayImage {
        self.render_slice(self.slices.cursor(), self.window)
    }

    fn render_slice(&self, index: usize, settings: WindowSettings) -> GrayImage {
        let pixels = self.volume.slice_pixels(index);
        windowing::render_canonical(
            self.volume.slice_width(),
            self.volume.slice_height(),
            &pixels,
            settings,
        )
    }

    pub fn slice_range(&self) -> &SliceRangeSelector {
        &self.slices
    }

    pub fn set_cursor(&mut self, index: usize) {
        self.slices.set_cursor(index);
    }

    pub fn set_range(&mut self, min: usize, max: usize) -> Result<(), SelectionError> {
        self.slices.set_range(min, max)
    }

    pub fn region(&self) -> Region {
        self.region.region()
    }

    /// Starts a manual region drag; an automatic region is discarded
    /// at once.
    pub fn begin_manual_region(&mut self) {
        self.region.begin_manual_drag();
    }

    /// Commits a manual region from its drag corners in display space.
    pub fn commit_manual_region(
        &mut self,
        start: DisplayPoint,
        end: DisplayPoint,
        surface: SurfaceSize,
    ) -> Result<RegionRect, SelectionError> {
        self.region.set_manual(start, end, surface)
    }

    /// Applies the carotid angiography preset, then commits the
    /// centered heuristic region for the given surface.
    pub fn locate_carotids(&mut self, surface: SurfaceSize) -> Result<RegionRect, SelectionError> {
        self.apply_preset(WindowPreset::CarotidAngiography);
        self.region.set_automatic(surface)
    }

    /// Restores the slice range to the full domain and clears the
    /// region.
    pub fn reset_selections(&mut self) {
        self.slices.reset();
        self.region.reset();
    }

    /// Starts the localization sweep on a worker thread. A scan
    /// already in flight is left undisturbed.
    pub fn start_neck_scan(&mut self) {
        if self.scan_receiver.is_some() {
            return;
        }
        log::info!(
            "starting neck localization over {} slices",
            self.volume.slice_count()
        );
        self.scan_progress = None;
        self.scan_receiver = Some(locator::spawn_scan(Arc::clone(&self.volume), self.window));
    }

    pub fn scan_in_progress(&self) -> bool {
        self.scan_receiver.is_some()
    }

    /// Last observed `(scanned, total)` progress of the running scan.
    pub fn scan_progress(&self) -> Option<(usize, usize)> {
        self.scan_progress
    }

    /// Drains pending scan messages without blocking. A completed scan
    /// commits its location to the range selector in one step and is
    /// returned; until then the selector keeps its previous state.
    pub fn poll_neck_scan(&mut self) -> Option<NeckLocation> {
        let Some(receiver) = self.scan_receiver.take() else {
            return None;
        };

        let mut completed = None;
        let mut keep_receiver = true;
        loop {
            match receiver.try_recv() {
                Ok(ScanUpdate::Progress { scanned, total }) => {
                    self.scan_progress = Some((scanned, total));
                }
                Ok(ScanUpdate::Complete(location)) => {
                    completed = Some(location);
                    keep_receiver = false;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    keep_receiver = false;
                    break;
                }
            }
        }

        if let Some(location) = completed {
            self.commit_location(location);
        }
        if keep_receiver && completed.is_none() {
            self.scan_receiver = Some(receiver);
        } else {
            self.scan_progress = None;
        }
        completed
    }

    /// Runs the localization sweep on the calling thread and commits
    /// the result. `None` means the volume offered nothing to scan.
    pub fn locate_neck_blocking(&mut self) -> Option<NeckLocation> {
        let location = locator::locate(self.volume.as_ref(), self.window)?;
        self.commit_location(location);
        Some(location)
    }

    fn commit_location(&mut self, location: NeckLocation) {
        self.slices.apply_location(&location);
        log::info!(
            "neck zone committed: slices {}..={} centered on {}",
            location.top,
            location.bottom,
            location.center
        );
    }

    /// Full detection workflow: health gate, automatic localization
    /// when no usable zone is selected, request planning, submission,
    /// and severity grading of the response.
    pub fn detect_stenosis(
        &mut self,
        capability: &dyn DetectionCapability,
    ) -> Result<DetectionOutcome, DetectionError> {
        if !capability.is_ready() {
            return Err(DetectionError::CapabilityUnavailable(
                "health check failed or the model is not loaded".to_string(),
            ));
        }

        if !planner::neck_range_is_selected(&self.slices) {
            self.locate_neck_blocking();
            if !planner::neck_range_is_selected(&self.slices) {
                return Err(DetectionError::DegenerateLocalization {
                    range_len: self.slices.range_len(),
                });
            }
        }

        let request = planner::plan_detection_request(
            &self.slices,
            self.source_path.as_deref(),
            self.volume.as_ref(),
            self.window,
        )?;
        log::debug!(
            "submitting detection request for zone {}..={}, region {:?}",
            self.slices.min_index(),
            self.slices.max_index(),
            self.region.region()
        );

        let result = capability.detect(&request)?;
        if !result.success {
            let detail = result
                .error
                .unwrap_or_else(|| "unspecified analysis failure".to_string());
            return Err(DetectionError::CapabilityFailure(detail));
        }
        let outcome = DetectionOutcome::new(result);
        log::info!(
            "stenosis graded {}: left {:.1}%, right {:.1}%",
            outcome.severity.label(),
            outcome.result.stenosis_left_percent,
            outcome.result.stenosis_right_percent
        );
        Ok(outcome)
    }
}

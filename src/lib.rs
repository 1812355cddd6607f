//! Review engine for carotid CT stenosis workups.
//!
//! The crate turns a stack of native-intensity slices into the state a
//! reviewer works with: window/level rendering onto a canonical square,
//! letterboxed display-to-image coordinate mapping, slice cursor and
//! range selection, automatic neck localization, carotid region
//! selection, and planning plus submission of detection requests to
//! the external analysis service.

pub mod capability;
pub mod coords;
pub mod error;
pub mod locator;
pub mod planner;
pub mod region;
pub mod report;
pub mod selection;
pub mod session;
pub mod volume;
pub mod windowing;

pub use capability::{
    DetectionCapability, HealthStatus, SingleImageResult, StenosisResult, StenosisServiceClient,
    StenosisServiceConfig,
};
pub use coords::{DisplayPoint, DisplayedRect, ImagePoint, SurfaceSize};
pub use error::{DetectionError, SelectionError};
pub use locator::{NeckLocation, ScanUpdate};
pub use planner::DetectionRequest;
pub use region::{Region, RegionRect, RegionSelector};
pub use report::{DetectionOutcome, StenosisSeverity};
pub use selection::SliceRangeSelector;
pub use session::ReviewSession;
pub use volume::{InMemoryVolume, SliceVolume};
pub use windowing::{WindowPreset, WindowSettings, CANONICAL_SIZE};

use std::fmt;

/// Recoverable failures of cursor, range, and region selection.
///
/// Every variant leaves the selector that produced it unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionError {
    /// A range update asked for a minimum above its maximum.
    InvalidRange { min: usize, max: usize },
    /// A display point fell outside the displayed image rectangle.
    OutOfBounds { x: f32, y: f32 },
    /// A committed region would have zero width or height.
    DegenerateRegion,
}

impl fmt::Display for SelectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionError::InvalidRange { min, max } => {
                write!(f, "invalid slice range: min {min} exceeds max {max}")
            }
            SelectionError::OutOfBounds { x, y } => {
                write!(f, "display point ({x}, {y}) lies outside the displayed image")
            }
            SelectionError::DegenerateRegion => {
                write!(f, "selected region has zero width or height")
            }
        }
    }
}

impl std::error::Error for SelectionError {}

/// Recoverable failures while planning or executing a detection run.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionError {
    /// The health gate failed or the request failed at the transport
    /// level. Reported once; there is no retry.
    CapabilityUnavailable(String),
    /// The capability answered but reported failure; the text is the
    /// service's error message verbatim.
    CapabilityFailure(String),
    /// The selected slice range does not delimit a usable neck zone.
    NoNeckSelected {
        range_len: usize,
        total_slices: usize,
    },
    /// Automatic localization finished but the committed range is too
    /// degenerate to analyze; manual selection is required.
    DegenerateLocalization { range_len: usize },
}

impl fmt::Display for DetectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionError::CapabilityUnavailable(detail) => {
                write!(f, "detection service unavailable: {detail}")
            }
            DetectionError::CapabilityFailure(detail) => {
                write!(f, "detection service reported failure: {detail}")
            }
            DetectionError::NoNeckSelected {
                range_len,
                total_slices,
            } => {
                write!(
                    f,
                    "no usable neck zone selected ({range_len} of {total_slices} slices)"
                )
            }
            DetectionError::DegenerateLocalization { range_len } => {
                write!(
                    f,
                    "automatic localization produced an unusable {range_len}-slice zone"
                )
            }
        }
    }
}

impl std::error::Error for DetectionError {}

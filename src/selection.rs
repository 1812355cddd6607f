use crate::error::SelectionError;
use crate::locator::NeckLocation;

/// Cursor plus bounded sub-range over the slice index domain
/// `[0, total_slices - 1]`.
///
/// `min_index <= max_index` holds at all times; a failed update leaves
/// the previous state in place. The range may legitimately collapse to
/// the full domain, which is also the freshly constructed and reset
/// state.
#[derive(Debug, Clone)]
pub struct SliceRangeSelector {
    total_slices: usize,
    min_index: usize,
    max_index: usize,
    cursor: usize,
}

impl SliceRangeSelector {
    /// Selector spanning the full domain with the cursor on slice
    /// zero. Intended for volumes with at least one slice; a zero
    /// total degenerates to a single-index domain.
    pub fn new(total_slices: usize) -> Self {
        Self {
            total_slices,
            min_index: 0,
            max_index: total_slices.saturating_sub(1),
            cursor: 0,
        }
    }

    pub fn total_slices(&self) -> usize {
        self.total_slices
    }

    pub fn min_index(&self) -> usize {
        self.min_index
    }

    pub fn max_index(&self) -> usize {
        self.max_index
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of slices in the selected range, bounds inclusive.
    pub fn range_len(&self) -> usize {
        self.max_index - self.min_index + 1
    }

    fn last_index(&self) -> usize {
        self.total_slices.saturating_sub(1)
    }

    /// Moves the cursor, clamping into the domain. Never fails.
    pub fn set_cursor(&mut self, index: usize) {
        self.cursor = index.min(self.last_index());
    }

    /// Replaces the range. Ordering is validated on the raw arguments
    /// before any clamping: a min above max rejects the whole update.
    /// Accepted bounds clamp into the domain independently.
    pub fn set_range(&mut self, min: usize, max: usize) -> Result<(), SelectionError> {
        if min > max {
            return Err(SelectionError::InvalidRange { min, max });
        }
        self.min_index = min.min(self.last_index());
        self.max_index = max.min(self.last_index());
        Ok(())
    }

    /// Restores the range to the full domain. The cursor stays put.
    pub fn reset(&mut self) {
        self.min_index = 0;
        self.max_index = self.last_index();
    }

    /// Commits a completed localization: cursor and both bounds change
    /// together, so no reader ever observes a half-applied update.
    pub fn apply_location(&mut self, location: &NeckLocation) {
        self.cursor = location.center.min(self.last_index());
        self.min_index = location.top.min(self.last_index());
        self.max_index = location.bottom.min(self.last_index());
    }
}

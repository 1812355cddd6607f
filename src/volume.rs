use std::sync::Arc;

use anyhow::{bail, Result};

/// Read-only access to an ordered stack of equally sized CT slices.
///
/// Slice indices are zero-based and must stay within
/// `0..slice_count()`; passing an index outside that domain is a
/// contract violation and may panic. Pixel buffers hold native
/// intensity samples in row-major order.
pub trait SliceVolume: Send + Sync {
    fn slice_count(&self) -> usize;
    fn slice_width(&self) -> usize;
    fn slice_height(&self) -> usize;
    fn slice_pixels(&self, index: usize) -> Arc<[i32]>;
}

/// Volume backed by decoded frames held in memory.
#[derive(Debug, Clone)]
pub struct InMemoryVolume {
    width: usize,
    height: usize,
    frames: Vec<Arc<[i32]>>,
}

impl InMemoryVolume {
    pub fn new(width: usize, height: usize, frames: Vec<Arc<[i32]>>) -> Result<Self> {
        if width == 0 || height == 0 {
            bail!("Slice dimensions must be nonzero, got {width}x{height}");
        }
        let expected = width * height;
        for (index, frame) in frames.iter().enumerate() {
            if frame.len() != expected {
                bail!(
                    "Pixel count mismatch in slice {index}: got {}, expected {expected}",
                    frame.len()
                );
            }
        }
        Ok(Self {
            width,
            height,
            frames,
        })
    }
}

impl SliceVolume for InMemoryVolume {
    fn slice_count(&self) -> usize {
        self.frames.len()
    }

    fn slice_width(&self) -> usize {
        self.width
    }

    fn slice_height(&self) -> usize {
        self.height
    }

    fn slice_pixels(&self, index: usize) -> Arc<[i32]> {
        Arc::clone(&self.frames[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_frame_with_wrong_pixel_count() {
        let good: Arc<[i32]> = Arc::from(vec![0i32; 4].into_boxed_slice());
        let bad: Arc<[i32]> = Arc::from(vec![0i32; 3].into_boxed_slice());
        let err = InMemoryVolume::new(2, 2, vec![good, bad]).unwrap_err();
        assert!(err.to_string().contains("slice 1"));
    }

    #[test]
    fn rejects_zero_dimensions() {
        assert!(InMemoryVolume::new(0, 2, Vec::new()).is_err());
    }

    #[test]
    fn shares_frame_buffers() {
        let frame: Arc<[i32]> = Arc::from(vec![7i32; 4].into_boxed_slice());
        let volume = InMemoryVolume::new(2, 2, vec![Arc::clone(&frame)]).unwrap();
        assert_eq!(volume.slice_count(), 1);
        assert!(Arc::ptr_eq(&volume.slice_pixels(0), &frame));
    }
}

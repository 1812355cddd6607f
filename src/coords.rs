use crate::error::SelectionError;

/// Dimensions of the rendering viewport, in display pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSize {
    pub width: f32,
    pub height: f32,
}

impl SurfaceSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// A point on the display surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayPoint {
    pub x: f32,
    pub y: f32,
}

impl DisplayPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A point in canonical image space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImagePoint {
    pub x: u32,
    pub y: u32,
}

/// Rectangle the image actually occupies within a display surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayedRect {
    pub offset_x: f32,
    pub offset_y: f32,
    pub width: f32,
    pub height: f32,
}

/// Computes the centered letterbox rectangle for the square canonical
/// image: the largest square that fits the surface, with the leftover
/// margin split evenly on both sides of the shorter axis.
pub fn displayed_image_rect(surface: SurfaceSize) -> DisplayedRect {
    let side = surface.width.min(surface.height);
    DisplayedRect {
        offset_x: (surface.width - side) / 2.0,
        offset_y: (surface.height - side) / 2.0,
        width: side,
        height: side,
    }
}

/// Converts a display point into canonical image space.
///
/// Points outside the displayed rectangle are rejected rather than
/// clamped; the boundary itself is accepted on all four edges.
/// Fractional coordinates truncate toward zero after scaling.
pub fn to_image_space(
    point: DisplayPoint,
    surface: SurfaceSize,
    canonical_size: u32,
) -> Result<ImagePoint, SelectionError> {
    let rect = displayed_image_rect(surface);
    if rect.width <= 0.0 || rect.height <= 0.0 {
        return Err(SelectionError::OutOfBounds {
            x: point.x,
            y: point.y,
        });
    }

    let local_x = point.x - rect.offset_x;
    let local_y = point.y - rect.offset_y;
    if local_x < 0.0 || local_y < 0.0 || local_x > rect.width || local_y > rect.height {
        return Err(SelectionError::OutOfBounds {
            x: point.x,
            y: point.y,
        });
    }

    let scale_x = canonical_size as f32 / rect.width;
    let scale_y = canonical_size as f32 / rect.height;
    Ok(ImagePoint {
        x: (local_x * scale_x) as u32,
        y: (local_y * scale_y) as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::windowing::CANONICAL_SIZE;

    #[test]
    fn wide_surface_centers_the_image_horizontally() {
        let rect = displayed_image_rect(SurfaceSize::new(800.0, 512.0));
        assert_eq!(rect.offset_x, 144.0);
        assert_eq!(rect.offset_y, 0.0);
        assert_eq!(rect.width, 512.0);
        assert_eq!(rect.height, 512.0);
    }

    #[test]
    fn tall_surface_centers_the_image_vertically() {
        let rect = displayed_image_rect(SurfaceSize::new(512.0, 1000.0));
        assert_eq!(rect.offset_x, 0.0);
        assert_eq!(rect.offset_y, 244.0);
        assert_eq!(rect.height, 512.0);
    }

    #[test]
    fn boundary_points_are_accepted_on_all_edges() {
        let surface = SurfaceSize::new(800.0, 512.0);
        let top_left = to_image_space(DisplayPoint::new(144.0, 0.0), surface, CANONICAL_SIZE);
        assert_eq!(top_left.unwrap(), ImagePoint { x: 0, y: 0 });

        let bottom_right =
            to_image_space(DisplayPoint::new(656.0, 512.0), surface, CANONICAL_SIZE);
        assert_eq!(
            bottom_right.unwrap(),
            ImagePoint {
                x: CANONICAL_SIZE,
                y: CANONICAL_SIZE
            }
        );
    }

    #[test]
    fn letterbox_margins_are_rejected_not_clamped() {
        let surface = SurfaceSize::new(800.0, 512.0);
        let into_margin = to_image_space(DisplayPoint::new(143.5, 10.0), surface, CANONICAL_SIZE);
        assert_eq!(
            into_margin.unwrap_err(),
            SelectionError::OutOfBounds { x: 143.5, y: 10.0 }
        );

        let past_right = to_image_space(DisplayPoint::new(656.5, 10.0), surface, CANONICAL_SIZE);
        assert!(matches!(past_right, Err(SelectionError::OutOfBounds { .. })));
    }

    #[test]
    fn scaling_applies_on_downsized_surfaces() {
        // 256x256 surface shows the 512 canonical image at half size.
        let surface = SurfaceSize::new(256.0, 256.0);
        let point = to_image_space(DisplayPoint::new(100.0, 30.0), surface, CANONICAL_SIZE);
        assert_eq!(point.unwrap(), ImagePoint { x: 200, y: 60 });
    }

    #[test]
    fn degenerate_surface_rejects_everything() {
        let surface = SurfaceSize::new(0.0, 512.0);
        assert!(to_image_space(DisplayPoint::new(0.0, 0.0), surface, CANONICAL_SIZE).is_err());
    }
}

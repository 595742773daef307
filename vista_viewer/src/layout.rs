//! Fractional view rectangles and their pixel-space resolution.
//!
//! Rectangles are stored as canvas fractions and re-resolved from the live
//! canvas size every frame, so a resize never works from stale pixels.

pub const VIEW_BORDER_PX: u32 = 2;

/// Border fill behind every view, as linear RGBA.
pub const VIEW_BORDER_COLOR: [f32; 4] = [0.0588, 0.0588, 0.0588, 1.0];

/// A view's share of the canvas, measured from the bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewRect {
    pub left: f32,
    pub bottom: f32,
    pub width: f32,
    pub height: f32,
}

impl ViewRect {
    pub const fn new(left: f32, bottom: f32, width: f32, height: f32) -> Self {
        ViewRect {
            left,
            bottom,
            width,
            height,
        }
    }

    pub fn resolve(&self, canvas_width: u32, canvas_height: u32) -> PixelRect {
        let canvas_width = canvas_width.max(1) as f32;
        let canvas_height = canvas_height.max(1) as f32;
        PixelRect {
            left: (self.left * canvas_width).floor() as u32,
            bottom: (self.bottom * canvas_height).floor() as u32,
            width: ((self.width * canvas_width).floor() as u32).max(1),
            height: ((self.height * canvas_height).floor() as u32).max(1),
        }
    }
}

/// A resolved rectangle in physical pixels, bottom-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub left: u32,
    pub bottom: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    /// Shrinks every side by `border`. Width and height clamp to 1 px so a
    /// degenerate view still resolves to a drawable region.
    pub fn inset(&self, border: u32) -> PixelRect {
        PixelRect {
            left: self.left + border,
            bottom: self.bottom + border,
            width: self.width.saturating_sub(border * 2).max(1),
            height: self.height.saturating_sub(border * 2).max(1),
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.left as f32
            && x < (self.left + self.width) as f32
            && y >= self.bottom as f32
            && y < (self.bottom + self.height) as f32
    }

    /// Maps a pixel position into [-1, 1] NDC against this rectangle.
    /// Positions outside the rectangle land outside that range.
    pub fn to_ndc(&self, x: f32, y: f32) -> (f32, f32) {
        let width = self.width.max(1) as f32;
        let height = self.height.max(1) as f32;
        let ndc_x = ((x - self.left as f32) / width) * 2.0 - 1.0;
        let ndc_y = ((y - self.bottom as f32) / height) * 2.0 - 1.0;
        (ndc_x, ndc_y)
    }
}

#[cfg(test)]
mod layout_tests {
    use super::*;

    #[test]
    fn fractions_resolve_to_floored_pixels() {
        let rect = ViewRect::new(0.6, 0.35, 0.4, 0.65);
        let pixels = rect.resolve(1280, 720);
        assert_eq!(pixels.left, 768);
        assert_eq!(pixels.bottom, 252);
        assert_eq!(pixels.width, 512);
        assert_eq!(pixels.height, 468);
    }

    #[test]
    fn inset_clamps_degenerate_views_to_one_pixel() {
        let tiny = PixelRect {
            left: 10,
            bottom: 10,
            width: 3,
            height: 4,
        };
        let inner = tiny.inset(VIEW_BORDER_PX);
        assert_eq!(inner.width, 1);
        assert_eq!(inner.height, 1);
        assert_eq!(inner.left, 12);
        assert_eq!(inner.bottom, 12);
    }

    #[test]
    fn inset_shrinks_all_four_sides() {
        let rect = PixelRect {
            left: 100,
            bottom: 50,
            width: 400,
            height: 300,
        };
        let inner = rect.inset(VIEW_BORDER_PX);
        assert_eq!(inner.left, 102);
        assert_eq!(inner.bottom, 52);
        assert_eq!(inner.width, 396);
        assert_eq!(inner.height, 296);
    }

    #[test]
    fn zero_canvas_still_yields_drawable_rects() {
        let rect = ViewRect::new(0.0, 0.0, 0.5, 0.5);
        let pixels = rect.resolve(0, 0);
        assert!(pixels.width >= 1);
        assert!(pixels.height >= 1);
    }

    #[test]
    fn ndc_mapping_centers_on_the_inner_rect() {
        let rect = PixelRect {
            left: 100,
            bottom: 100,
            width: 200,
            height: 100,
        };
        let (x, y) = rect.to_ndc(200.0, 150.0);
        assert!(x.abs() < 1e-6);
        assert!(y.abs() < 1e-6);
        let (x, _) = rect.to_ndc(50.0, 150.0);
        assert!(x < -1.0);
    }

    #[test]
    fn containment_excludes_the_far_edges() {
        let rect = PixelRect {
            left: 0,
            bottom: 0,
            width: 100,
            height: 100,
        };
        assert!(rect.contains(0.0, 0.0));
        assert!(rect.contains(99.5, 99.5));
        assert!(!rect.contains(100.0, 50.0));
    }
}

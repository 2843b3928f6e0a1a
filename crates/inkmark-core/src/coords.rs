//! Coordinate transformation between viewport pixel space and PDF point space
//!
//! Viewport pixel space has its origin at the top-left of the rendered page
//! and grows with the zoom level. PDF point space has its origin at the
//! page's bottom-left corner and is fixed at 72 points per inch. Position
//! transforms flip the Y axis; scalar transforms (thicknesses, font sizes)
//! only divide or multiply by the scale factor and never flip, so a length
//! can never come out negative or offset.

/// How one page is currently laid out on screen. Supplied by the rendering
/// collaborator and treated as read-only here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageViewport {
    /// Pixels per PDF point at the current zoom.
    pub scale: f64,
    /// Rendered page width in pixels.
    pub width_px: f64,
    /// Rendered page height in pixels.
    pub height_px: f64,
}

impl PageViewport {
    pub fn new(scale: f64, width_px: f64, height_px: f64) -> Self {
        Self {
            scale,
            width_px,
            height_px,
        }
    }

    /// Viewport for a page of the given intrinsic size rendered at `scale`.
    pub fn for_page(width_pt: f64, height_pt: f64, scale: f64) -> Self {
        Self {
            scale,
            width_px: width_pt * scale,
            height_px: height_pt * scale,
        }
    }
}

/// Convert viewport pixels (top-left origin) to PDF points (bottom-left
/// origin), inverting both the zoom and the vertical flip.
pub fn pixel_to_point(x_px: f64, y_px: f64, viewport: &PageViewport) -> (f64, f64) {
    let x_pt = x_px / viewport.scale;
    let y_pt = (viewport.height_px - y_px) / viewport.scale;
    (x_pt, y_pt)
}

/// Exact inverse of [`pixel_to_point`].
pub fn point_to_pixel(x_pt: f64, y_pt: f64, viewport: &PageViewport) -> (f64, f64) {
    let x_px = x_pt * viewport.scale;
    let y_px = viewport.height_px - y_pt * viewport.scale;
    (x_px, y_px)
}

/// Convert a scalar magnitude (stroke width, font size) from pixels to
/// points. No origin flip.
pub fn pixel_length_to_point(length_px: f64, viewport: &PageViewport) -> f64 {
    length_px / viewport.scale
}

/// Exact inverse of [`pixel_length_to_point`].
pub fn point_length_to_pixel(length_pt: f64, viewport: &PageViewport) -> f64 {
    length_pt * viewport.scale
}

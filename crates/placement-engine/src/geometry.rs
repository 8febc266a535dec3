//! Coordinate transforms between viewer pixels, normalized placement
//! coordinates, and PDF points
//!
//! Normalized coordinates are fractions of the *native, unscaled* page
//! dimensions with origin at the top-left and Y increasing downward
//! (capture-space convention). PDF points have origin bottom-left with Y
//! increasing upward, so the conversion flips the vertical axis.

use serde::{Deserialize, Serialize};

use crate::error::PlacementError;

/// Clicks this far outside [0,1] are still accepted (and clamped); anything
/// further is refused rather than silently pulled onto the page.
pub const CLICK_TOLERANCE: f64 = 0.02;

/// Native (unscaled) dimensions of a page or continuous content surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub fn new(width: f64, height: f64) -> Result<Self, PlacementError> {
        if width <= 0.0 || height <= 0.0 {
            return Err(PlacementError::InvalidPageSize { width, height });
        }
        Ok(Self { width, height })
    }

    /// US Letter in PDF points.
    pub fn letter() -> Self {
        Self {
            width: 612.0,
            height: 792.0,
        }
    }

    /// ISO A4 in PDF points.
    pub fn a4() -> Self {
        Self {
            width: 595.0,
            height: 842.0,
        }
    }
}

/// Native dimensions of the item being placed (signature image, stamp, QR).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemSize {
    pub width: f64,
    pub height: f64,
}

/// A point normalized against the native page size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPoint {
    pub x_pct: f64,
    pub y_pct: f64,
}

/// A placement rectangle in normalized coordinates, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x_pct: f64,
    pub y_pct: f64,
    pub width_pct: f64,
    pub height_pct: f64,
}

/// A rectangle in viewer pixels at some scale factor, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A rectangle in PDF points, origin bottom-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Convert a raw click in viewer pixels into a normalized point.
///
/// Subtracts the page origin within the viewer, undoes the zoom, then
/// normalizes against the native page size. Invariant to `scale_factor`:
/// the same physical click at two zoom levels yields the same point.
pub fn capture_point(
    click_x: f64,
    click_y: f64,
    viewer_origin: (f64, f64),
    scale_factor: f64,
    native: PageSize,
) -> NormalizedPoint {
    let page_x = (click_x - viewer_origin.0) / scale_factor;
    let page_y = (click_y - viewer_origin.1) / scale_factor;

    NormalizedPoint {
        x_pct: page_x / native.width,
        y_pct: page_y / native.height,
    }
}

/// Place an item so the click point is its visual center.
///
/// The resulting top-left corner is clamped so the far edge never exceeds
/// 1.0. A click more than [`CLICK_TOLERANCE`] outside [0,1] is refused.
pub fn place_item_centered(
    click: NormalizedPoint,
    item: ItemSize,
    native: PageSize,
) -> Result<NormalizedRect, PlacementError> {
    let out_of_band = |v: f64| !(-CLICK_TOLERANCE..=1.0 + CLICK_TOLERANCE).contains(&v);
    if out_of_band(click.x_pct) || out_of_band(click.y_pct) {
        return Err(PlacementError::OutsidePage {
            x: click.x_pct,
            y: click.y_pct,
        });
    }

    let width_pct = item.width / native.width;
    let height_pct = item.height / native.height;
    if width_pct > 1.0 || height_pct > 1.0 {
        return Err(PlacementError::ItemTooLarge {
            width: item.width,
            height: item.height,
        });
    }

    let raw_x = click.x_pct - width_pct / 2.0;
    let raw_y = click.y_pct - height_pct / 2.0;

    Ok(NormalizedRect {
        x_pct: raw_x.clamp(0.0, 1.0 - width_pct),
        y_pct: raw_y.clamp(0.0, 1.0 - height_pct),
        width_pct,
        height_pct,
    })
}

/// Inverse transform: normalized rect to viewer pixels at the current zoom.
pub fn to_render_rect(rect: NormalizedRect, native: PageSize, scale_factor: f64) -> PixelRect {
    PixelRect {
        x: rect.x_pct * native.width * scale_factor,
        y: rect.y_pct * native.height * scale_factor,
        width: rect.width_pct * native.width * scale_factor,
        height: rect.height_pct * native.height * scale_factor,
    }
}

/// Normalized rect to absolute PDF points, flipping the vertical axis.
///
/// Capture space is top-left/Y-down; PDF pages are bottom-left/Y-up, so
/// `pdf_y = page_h - y_pct * page_h - height_pct * page_h`.
pub fn to_pdf_rect(rect: NormalizedRect, page: PageSize) -> PdfRect {
    let height = rect.height_pct * page.height;
    PdfRect {
        x: rect.x_pct * page.width,
        y: page.height - rect.y_pct * page.height - height,
        width: rect.width_pct * page.width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_point_center() {
        let native = PageSize::letter();
        let p = capture_point(306.0, 396.0, (0.0, 0.0), 1.0, native);
        assert!((p.x_pct - 0.5).abs() < 1e-9);
        assert!((p.y_pct - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_capture_point_subtracts_viewer_origin() {
        let native = PageSize::letter();
        let p = capture_point(406.0, 496.0, (100.0, 100.0), 1.0, native);
        assert!((p.x_pct - 0.5).abs() < 1e-9);
        assert!((p.y_pct - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_capture_point_zoom_invariant() {
        let native = PageSize::letter();
        let at_1x = capture_point(153.0, 198.0, (0.0, 0.0), 1.0, native);
        let at_2x = capture_point(306.0, 396.0, (0.0, 0.0), 2.0, native);
        assert!((at_1x.x_pct - at_2x.x_pct).abs() < 1e-9);
        assert!((at_1x.y_pct - at_2x.y_pct).abs() < 1e-9);
    }

    #[test]
    fn test_place_centered_is_centered() {
        let native = PageSize::letter();
        let click = NormalizedPoint {
            x_pct: 0.5,
            y_pct: 0.5,
        };
        let item = ItemSize {
            width: 61.2,
            height: 79.2,
        };
        let rect = place_item_centered(click, item, native).unwrap();
        // 0.1 wide, centered on 0.5 => left edge at 0.45
        assert!((rect.x_pct - 0.45).abs() < 1e-9);
        assert!((rect.y_pct - 0.45).abs() < 1e-9);
    }

    #[test]
    fn test_place_centered_clamps_far_edge() {
        let native = PageSize::letter();
        let click = NormalizedPoint {
            x_pct: 0.99,
            y_pct: 0.99,
        };
        let item = ItemSize {
            width: 122.4,
            height: 79.2,
        };
        let rect = place_item_centered(click, item, native).unwrap();
        assert!(rect.x_pct + rect.width_pct <= 1.0 + 1e-9);
        assert!(rect.y_pct + rect.height_pct <= 1.0 + 1e-9);
    }

    #[test]
    fn test_place_refused_far_outside_page() {
        let native = PageSize::letter();
        let click = NormalizedPoint {
            x_pct: 1.2,
            y_pct: 0.5,
        };
        let item = ItemSize {
            width: 50.0,
            height: 20.0,
        };
        let err = place_item_centered(click, item, native).unwrap_err();
        assert!(matches!(err, PlacementError::OutsidePage { .. }));
    }

    #[test]
    fn test_place_accepts_click_within_tolerance_band() {
        let native = PageSize::letter();
        let click = NormalizedPoint {
            x_pct: 1.01,
            y_pct: -0.01,
        };
        let item = ItemSize {
            width: 50.0,
            height: 20.0,
        };
        let rect = place_item_centered(click, item, native).unwrap();
        assert!(rect.x_pct + rect.width_pct <= 1.0 + 1e-9);
        assert!(rect.y_pct >= 0.0);
    }

    #[test]
    fn test_pdf_rect_flips_y() {
        let page = PageSize::letter();
        let rect = NormalizedRect {
            x_pct: 0.1,
            y_pct: 0.8,
            width_pct: 0.15,
            height_pct: 0.05,
        };
        let pdf = to_pdf_rect(rect, page);
        // Bottom edge at page_height * (1 - 0.8 - 0.05) = page_height * 0.15
        assert!((pdf.y - page.height * 0.15).abs() < 1e-9);
        assert!((pdf.x - page.width * 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_render_rect_at_scale() {
        let native = PageSize::letter();
        let rect = NormalizedRect {
            x_pct: 0.25,
            y_pct: 0.5,
            width_pct: 0.1,
            height_pct: 0.1,
        };
        let px = to_render_rect(rect, native, 1.5);
        assert!((px.x - 0.25 * 612.0 * 1.5).abs() < 1e-9);
        assert!((px.y - 0.5 * 792.0 * 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_page_size_rejected() {
        assert!(PageSize::new(0.0, 792.0).is_err());
        assert!(PageSize::new(612.0, -1.0).is_err());
        assert!(PageSize::new(612.0, 792.0).is_ok());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    // Strategy for valid positive dimensions (points/pixels)
    fn dimension() -> impl Strategy<Value = f64> {
        100.0f64..2000.0
    }

    fn percentage() -> impl Strategy<Value = f64> {
        0.0f64..=1.0
    }

    fn scale() -> impl Strategy<Value = f64> {
        0.25f64..4.0
    }

    proptest! {
        /// Property: capture then render at the same scale reproduces the
        /// original pixel position within rounding tolerance.
        #[test]
        fn capture_render_roundtrip_same_scale(
            page_w in dimension(),
            page_h in dimension(),
            s in scale(),
            x_pct in percentage(),
            y_pct in percentage(),
        ) {
            let native = PageSize { width: page_w, height: page_h };
            let click_x = x_pct * page_w * s;
            let click_y = y_pct * page_h * s;

            let point = capture_point(click_x, click_y, (0.0, 0.0), s, native);
            let rect = NormalizedRect {
                x_pct: point.x_pct,
                y_pct: point.y_pct,
                width_pct: 0.0,
                height_pct: 0.0,
            };
            let px = to_render_rect(rect, native, s);

            prop_assert!((px.x - click_x).abs() < 1.0,
                "X roundtrip failed: {} -> {} (expected {})", click_x, px.x, click_x);
            prop_assert!((px.y - click_y).abs() < 1.0,
                "Y roundtrip failed: {} -> {} (expected {})", click_y, px.y, click_y);
        }

        /// Property: the normalized point is unchanged across zoom levels.
        #[test]
        fn capture_is_zoom_invariant(
            page_w in dimension(),
            page_h in dimension(),
            s1 in scale(),
            s2 in scale(),
            x_pct in percentage(),
            y_pct in percentage(),
        ) {
            let native = PageSize { width: page_w, height: page_h };

            let p1 = capture_point(x_pct * page_w * s1, y_pct * page_h * s1, (0.0, 0.0), s1, native);
            let p2 = capture_point(x_pct * page_w * s2, y_pct * page_h * s2, (0.0, 0.0), s2, native);

            prop_assert!((p1.x_pct - p2.x_pct).abs() < 1e-9,
                "Zoom invariance failed for X: {} vs {}", p1.x_pct, p2.x_pct);
            prop_assert!((p1.y_pct - p2.y_pct).abs() < 1e-9,
                "Zoom invariance failed for Y: {} vs {}", p1.y_pct, p2.y_pct);
        }

        /// Property: a placed item never extends past the page.
        #[test]
        fn placed_item_never_overflows(
            page_w in dimension(),
            page_h in dimension(),
            x_pct in -0.02f64..=1.02,
            y_pct in -0.02f64..=1.02,
            item_w_frac in 0.01f64..1.0,
            item_h_frac in 0.01f64..1.0,
        ) {
            let native = PageSize { width: page_w, height: page_h };
            let click = NormalizedPoint { x_pct, y_pct };
            let item = ItemSize {
                width: item_w_frac * page_w,
                height: item_h_frac * page_h,
            };

            let rect = place_item_centered(click, item, native).unwrap();
            prop_assert!(rect.x_pct >= 0.0);
            prop_assert!(rect.y_pct >= 0.0);
            prop_assert!(rect.x_pct + rect.width_pct <= 1.0 + 1e-9,
                "Overflow: x={} w={}", rect.x_pct, rect.width_pct);
            prop_assert!(rect.y_pct + rect.height_pct <= 1.0 + 1e-9,
                "Overflow: y={} h={}", rect.y_pct, rect.height_pct);
        }

        /// Property: clicks well outside the page are refused, not clamped.
        #[test]
        fn far_outside_clicks_refused(
            page_w in dimension(),
            page_h in dimension(),
            off in 0.05f64..10.0,
            flip in any::<bool>(),
        ) {
            let native = PageSize { width: page_w, height: page_h };
            let coord = if flip { 1.0 + off } else { -off };
            let click = NormalizedPoint { x_pct: coord, y_pct: 0.5 };
            let item = ItemSize { width: page_w * 0.1, height: page_h * 0.1 };

            let result = place_item_centered(click, item, native);
            prop_assert!(
                matches!(result, Err(PlacementError::OutsidePage { .. })),
                "expected OutsidePage error, got {:?}", result
            );
        }

        /// Property: PDF Y flip is self-consistent — the rect's top edge in
        /// capture space corresponds to (top edge distance from page top)
        /// measured down, and the PDF rect's top is page_h - that distance.
        #[test]
        fn pdf_flip_top_edge(
            page_w in dimension(),
            page_h in dimension(),
            y_pct in 0.0f64..0.9,
            h_pct in 0.01f64..0.1,
        ) {
            let page = PageSize { width: page_w, height: page_h };
            let rect = NormalizedRect { x_pct: 0.1, y_pct, width_pct: 0.1, height_pct: h_pct };

            let pdf = to_pdf_rect(rect, page);
            let pdf_top = pdf.y + pdf.height;
            prop_assert!((pdf_top - (page_h - y_pct * page_h)).abs() < 1e-6,
                "Top edge mismatch: {} vs {}", pdf_top, page_h - y_pct * page_h);
        }

        /// Property: render geometry and PDF geometry agree on position —
        /// the overlay rect at scale 1.0, re-flipped, matches the PDF rect.
        #[test]
        fn overlay_matches_burn_geometry(
            page_w in dimension(),
            page_h in dimension(),
            x_pct in 0.0f64..0.8,
            y_pct in 0.0f64..0.8,
            w_pct in 0.01f64..0.2,
            h_pct in 0.01f64..0.2,
        ) {
            let page = PageSize { width: page_w, height: page_h };
            let rect = NormalizedRect { x_pct, y_pct, width_pct: w_pct, height_pct: h_pct };

            let px = to_render_rect(rect, page, 1.0);
            let pdf = to_pdf_rect(rect, page);

            prop_assert!((px.x - pdf.x).abs() < 1e-6);
            prop_assert!((px.width - pdf.width).abs() < 1e-6);
            prop_assert!((px.height - pdf.height).abs() < 1e-6);
            // Same physical top edge, opposite origins
            prop_assert!(((page_h - px.y) - (pdf.y + pdf.height)).abs() < 1e-6);
        }
    }
}

//! Pure overlay rendering for the review UI
//!
//! Produces the pixel rectangle for every placement at a given zoom, using
//! the same normalized records the burn consumes, so what a reviewer sees
//! is exactly what gets burned. QR markers appear as placeholder boxes.

use placement_engine::{to_render_rect, Placement, PlacementKind, PixelRect};
use serde::Serialize;

use crate::surface::SurfaceMap;

/// One positioned box in viewer pixels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayBox {
    pub placement_id: String,
    pub kind: PlacementKind,
    pub page_index: u32,
    pub rect: PixelRect,
}

/// Project placements onto the rendered surface at `scale_factor`.
///
/// Placements pointing at a page the surface no longer has (stale after a
/// content revision) are omitted, mirroring the burn's skip behavior.
pub fn render_overlay(
    placements: &[Placement],
    surface: &SurfaceMap,
    scale_factor: f64,
) -> Vec<OverlayBox> {
    placements
        .iter()
        .filter_map(|placement| {
            let page = surface.page(placement.page_index).ok()?;
            Some(OverlayBox {
                placement_id: placement.id.clone(),
                kind: placement.kind,
                page_index: placement.page_index.unwrap_or(0),
                rect: to_render_rect(placement.rect(), page, scale_factor),
            })
        })
        .collect()
}

//! Resolution- and zoom-independent placement coordinates
//!
//! Converts pointer interactions on a rendered document surface into
//! normalized coordinate records, and converts those records back into
//! pixel or PDF-point geometry for any render context. All functions are
//! pure; the "placement in progress" is caller-held UI state.

pub mod error;
pub mod geometry;
pub mod model;

pub use error::PlacementError;
pub use geometry::{
    capture_point, place_item_centered, to_pdf_rect, to_render_rect, ItemSize, NormalizedPoint,
    NormalizedRect, PageSize, PdfRect, PixelRect, CLICK_TOLERANCE,
};
pub use model::{Placement, PlacementKind};

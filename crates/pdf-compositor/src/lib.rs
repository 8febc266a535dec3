//! Document compositor
//!
//! Produces the final approved artifact by burning placed signature and
//! stamp images into the base PDF, and renders the position-identical
//! overlay the review UI shows before approval. QR marker placements are
//! returned as coordinate reservations rather than drawn.

pub mod burn;
pub mod error;
pub mod image;
pub mod overlay;
pub mod store;
pub mod surface;

pub use burn::{burn_to_pdf, BurnOutcome, QrReservation};
pub use error::CompositorError;
pub use image::{prepare_image, sniff_format, EncodedImage, RasterFormat};
pub use overlay::{render_overlay, OverlayBox};
pub use store::ImageStore;
pub use surface::SurfaceMap;

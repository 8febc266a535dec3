use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlacementError {
    #[error("Click at ({x:.4}, {y:.4}) is outside the page")]
    OutsidePage { x: f64, y: f64 },

    #[error("Item ({width:.1} x {height:.1}) is larger than the page")]
    ItemTooLarge { width: f64, height: f64 },

    #[error("Page size must be positive, got {width} x {height}")]
    InvalidPageSize { width: f64, height: f64 },

    #[error("{kind} placement requires an image reference")]
    MissingImageRef { kind: String },

    #[error("QR marker placement must not carry an image reference")]
    UnexpectedImageRef,

    #[error("Normalized coordinate out of range: {field} = {value:.4}")]
    CoordinateOutOfRange { field: &'static str, value: f64 },
}

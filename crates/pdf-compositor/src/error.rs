use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompositorError {
    #[error("Failed to parse base PDF: {0}")]
    ParseError(String),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to decode image: {0}")]
    ImageDecode(String),

    #[error("Failed to encode image: {0}")]
    ImageEncode(String),

    #[error("Page {page} out of range (document has {count} pages)")]
    PageOutOfRange { page: u32, count: usize },

    #[error("Blob {0} not found")]
    BlobNotFound(String),

    #[error("Placement has no image reference")]
    MissingImage,

    #[error("Failed to write output PDF: {0}")]
    WriteError(String),
}

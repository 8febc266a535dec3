use crate::error::CompositorError;

/// Source of the raster bytes a placement's `image_ref` points at.
///
/// The compositor is synchronous and storage-agnostic; callers bridge
/// whatever blob store they use behind this seam.
pub trait ImageStore {
    fn fetch(&self, blob_ref: &str) -> Result<Vec<u8>, CompositorError>;
}

impl ImageStore for std::collections::HashMap<String, Vec<u8>> {
    fn fetch(&self, blob_ref: &str) -> Result<Vec<u8>, CompositorError> {
        self.get(blob_ref)
            .cloned()
            .ok_or_else(|| CompositorError::BlobNotFound(blob_ref.to_string()))
    }
}

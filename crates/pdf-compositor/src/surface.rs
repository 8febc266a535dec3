//! Page geometry of the base content
//!
//! Paginated PDFs carry per-page native sizes read from each page's
//! MediaBox. Continuous content (a rich-text body) is a single implicit
//! page 0 whose size comes from the caller's layout.

use lopdf::{Document, Object};
use placement_engine::PageSize;

use crate::error::CompositorError;

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceMap {
    Paginated(Vec<PageSize>),
    Continuous(PageSize),
}

impl SurfaceMap {
    /// Read per-page native sizes from a parsed PDF.
    pub fn from_pdf(doc: &Document) -> Result<Self, CompositorError> {
        let mut sizes = Vec::new();
        for (_, page_id) in doc.get_pages() {
            let page = doc
                .get_object(page_id)
                .and_then(Object::as_dict)
                .map_err(|e| CompositorError::ParseError(e.to_string()))?;
            sizes.push(media_box_size(page).unwrap_or_else(PageSize::letter));
        }
        if sizes.is_empty() {
            return Err(CompositorError::ParseError("document has no pages".to_string()));
        }
        Ok(SurfaceMap::Paginated(sizes))
    }

    pub fn continuous(size: PageSize) -> Self {
        SurfaceMap::Continuous(size)
    }

    pub fn page_count(&self) -> usize {
        match self {
            SurfaceMap::Paginated(sizes) => sizes.len(),
            SurfaceMap::Continuous(_) => 1,
        }
    }

    /// Native size of a page. A missing index means page 0; a continuous
    /// surface has only page 0.
    pub fn page(&self, index: Option<u32>) -> Result<PageSize, CompositorError> {
        let index = index.unwrap_or(0);
        match self {
            SurfaceMap::Paginated(sizes) => {
                sizes
                    .get(index as usize)
                    .copied()
                    .ok_or(CompositorError::PageOutOfRange {
                        page: index,
                        count: sizes.len(),
                    })
            }
            SurfaceMap::Continuous(size) => {
                if index == 0 {
                    Ok(*size)
                } else {
                    Err(CompositorError::PageOutOfRange {
                        page: index,
                        count: 1,
                    })
                }
            }
        }
    }
}

fn media_box_size(page: &lopdf::Dictionary) -> Option<PageSize> {
    let media_box = page.get(b"MediaBox").ok()?.as_array().ok()?;
    if media_box.len() != 4 {
        return None;
    }
    let coords: Vec<f64> = media_box.iter().filter_map(as_f64).collect();
    if coords.len() != 4 {
        return None;
    }
    PageSize::new(coords[2] - coords[0], coords[3] - coords[1]).ok()
}

fn as_f64(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

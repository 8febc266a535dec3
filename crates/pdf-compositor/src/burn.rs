//! Burning placements into the base PDF
//!
//! Each signature or stamp placement becomes a DCTDecode image XObject
//! positioned with a `q cm Do Q` sequence appended to the page content.
//! QR markers are never burned; they come back as absolute-position
//! reservations for the downstream marker generator.
//!
//! A placement that cannot be composited (missing blob, undecodable image,
//! stale page index) is skipped with a warning. Only an unusable base
//! document fails the whole operation.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use placement_engine::{to_pdf_rect, Placement, PlacementKind};
use serde::Serialize;

use crate::error::CompositorError;
use crate::image::prepare_image;
use crate::store::ImageStore;
use crate::surface::SurfaceMap;

/// Absolute PDF-point position reserved for a QR marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QrReservation {
    pub placement_id: String,
    pub page_index: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Result of a burn: the composited bytes, one warning per skipped
/// placement, and the QR reservations.
#[derive(Debug, Clone)]
pub struct BurnOutcome {
    pub pdf: Vec<u8>,
    pub warnings: Vec<String>,
    pub qr_reservations: Vec<QrReservation>,
}

pub fn burn_to_pdf<S: ImageStore>(
    base: &[u8],
    placements: &[Placement],
    store: &S,
) -> Result<BurnOutcome, CompositorError> {
    let mut doc =
        Document::load_mem(base).map_err(|e| CompositorError::ParseError(e.to_string()))?;
    let surface = SurfaceMap::from_pdf(&doc)?;
    // get_pages is keyed by 1-based page number, ascending
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();

    let mut warnings = Vec::new();
    let mut qr_reservations = Vec::new();

    for placement in placements {
        if placement.kind == PlacementKind::QrMarker {
            match reserve_qr(placement, &surface) {
                Ok(reservation) => qr_reservations.push(reservation),
                Err(e) => warnings.push(skip(placement, &e)),
            }
            continue;
        }
        if let Err(e) = burn_one(&mut doc, &page_ids, &surface, placement, store) {
            warnings.push(skip(placement, &e));
        }
    }

    let mut pdf = Vec::new();
    doc.save_to(&mut pdf)
        .map_err(|e| CompositorError::WriteError(e.to_string()))?;

    Ok(BurnOutcome {
        pdf,
        warnings,
        qr_reservations,
    })
}

fn skip(placement: &Placement, err: &CompositorError) -> String {
    tracing::warn!(placement = %placement.id, kind = %placement.kind, error = %err, "skipping placement");
    format!("{} placement {}: {}", placement.kind, placement.id, err)
}

fn reserve_qr(
    placement: &Placement,
    surface: &SurfaceMap,
) -> Result<QrReservation, CompositorError> {
    let page_index = placement.page_index.unwrap_or(0);
    let page = surface.page(placement.page_index)?;
    let rect = to_pdf_rect(placement.rect(), page);
    Ok(QrReservation {
        placement_id: placement.id.clone(),
        page_index,
        x: rect.x,
        y: rect.y,
        width: rect.width,
        height: rect.height,
    })
}

fn burn_one<S: ImageStore>(
    doc: &mut Document,
    page_ids: &[ObjectId],
    surface: &SurfaceMap,
    placement: &Placement,
    store: &S,
) -> Result<(), CompositorError> {
    let image_ref = placement
        .image_ref
        .as_deref()
        .ok_or(CompositorError::MissingImage)?;
    let bytes = store.fetch(image_ref)?;
    let encoded = prepare_image(&bytes)?;

    let page_index = placement.page_index.unwrap_or(0);
    let page_size = surface.page(placement.page_index)?;
    let page_id = *page_ids
        .get(page_index as usize)
        .ok_or(CompositorError::PageOutOfRange {
            page: page_index,
            count: page_ids.len(),
        })?;

    let rect = to_pdf_rect(placement.rect(), page_size);

    let xobject_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => encoded.width as i64,
            "Height" => encoded.height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        encoded.jpeg,
    ));
    let name = format!("CsImg{}", xobject_id.0);
    attach_image_resource(doc, page_id, &name, xobject_id)?;

    let operations = vec![
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            vec![
                Object::Real(rect.width as f32),
                Object::Real(0.0),
                Object::Real(0.0),
                Object::Real(rect.height as f32),
                Object::Real(rect.x as f32),
                Object::Real(rect.y as f32),
            ],
        ),
        Operation::new("Do", vec![Object::Name(name.into_bytes())]),
        Operation::new("Q", vec![]),
    ];
    append_content(doc, page_id, operations)
}

/// Register the image under the page's Resources/XObject map, wherever
/// that map lives (inline, behind a reference, or absent).
fn attach_image_resource(
    doc: &mut Document,
    page_id: ObjectId,
    name: &str,
    xobject_id: ObjectId,
) -> Result<(), CompositorError> {
    let resources_id = {
        let page = page_dict(doc, page_id)?;
        match page.get(b"Resources") {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        }
    };

    let xobject_map_id = {
        let resources = match resources_id {
            Some(id) => doc.get_object(id).ok().and_then(|o| o.as_dict().ok()),
            None => page_dict(doc, page_id)?
                .get(b"Resources")
                .ok()
                .and_then(|o| o.as_dict().ok()),
        };
        resources.and_then(|r| match r.get(b"XObject") {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        })
    };

    if let Some(id) = xobject_map_id {
        let xobjects = doc
            .get_object_mut(id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| CompositorError::WriteError(e.to_string()))?;
        xobjects.set(name, Object::Reference(xobject_id));
        return Ok(());
    }

    if let Some(id) = resources_id {
        let resources = doc
            .get_object_mut(id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| CompositorError::WriteError(e.to_string()))?;
        upsert_xobject(resources, name, xobject_id);
        return Ok(());
    }

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| CompositorError::WriteError(e.to_string()))?;
    if let Ok(Object::Dictionary(ref mut resources)) = page.get_mut(b"Resources") {
        upsert_xobject(resources, name, xobject_id);
    } else {
        page.set(
            "Resources",
            dictionary! { "XObject" => dictionary! { name => xobject_id } },
        );
    }
    Ok(())
}

fn upsert_xobject(resources: &mut lopdf::Dictionary, name: &str, xobject_id: ObjectId) {
    if let Ok(Object::Dictionary(ref mut xobjects)) = resources.get_mut(b"XObject") {
        xobjects.set(name, Object::Reference(xobject_id));
    } else {
        resources.set("XObject", dictionary! { name => xobject_id });
    }
}

fn page_dict<'a>(
    doc: &'a Document,
    page_id: ObjectId,
) -> Result<&'a lopdf::Dictionary, CompositorError> {
    doc.get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|e| CompositorError::WriteError(e.to_string()))
}

/// Append a drawing sequence as an extra content stream, preserving the
/// existing content untouched.
fn append_content(
    doc: &mut Document,
    page_id: ObjectId,
    operations: Vec<Operation>,
) -> Result<(), CompositorError> {
    let content = Content { operations };
    let encoded = content
        .encode()
        .map_err(|e| CompositorError::WriteError(e.to_string()))?;
    let stream_id = doc.add_object(Stream::new(lopdf::Dictionary::new(), encoded));

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| CompositorError::WriteError(e.to_string()))?;
    let new_contents = match page.get(b"Contents") {
        Ok(Object::Array(existing)) => {
            let mut arr = existing.clone();
            arr.push(Object::Reference(stream_id));
            Object::Array(arr)
        }
        Ok(Object::Reference(existing)) => Object::Array(vec![
            Object::Reference(*existing),
            Object::Reference(stream_id),
        ]),
        _ => Object::Reference(stream_id),
    };
    page.set("Contents", new_contents);
    Ok(())
}

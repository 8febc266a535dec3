//! The placement record attached to a document's visual surface

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PlacementError;
use crate::geometry::NormalizedRect;

/// What a placement positions on the page.
///
/// QR markers are positional reservations: they carry no image and are
/// resolved by a downstream marker-generation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlacementKind {
    Signature,
    Stamp,
    QrMarker,
}

impl std::fmt::Display for PlacementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlacementKind::Signature => write!(f, "signature"),
            PlacementKind::Stamp => write!(f, "stamp"),
            PlacementKind::QrMarker => write!(f, "qr_marker"),
        }
    }
}

/// A positioned overlay item in normalized coordinates.
///
/// `page_index` is present only for paginated base content; continuous
/// surfaces treat the whole body as page 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub id: String,
    pub kind: PlacementKind,
    pub image_ref: Option<String>,
    pub page_index: Option<u32>,
    pub x_pct: f64,
    pub y_pct: f64,
    pub width_pct: f64,
    pub height_pct: f64,
}

impl Placement {
    pub fn new(kind: PlacementKind, image_ref: Option<String>, page_index: Option<u32>, rect: NormalizedRect) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            image_ref,
            page_index,
            x_pct: rect.x_pct,
            y_pct: rect.y_pct,
            width_pct: rect.width_pct,
            height_pct: rect.height_pct,
        }
    }

    pub fn rect(&self) -> NormalizedRect {
        NormalizedRect {
            x_pct: self.x_pct,
            y_pct: self.y_pct,
            width_pct: self.width_pct,
            height_pct: self.height_pct,
        }
    }

    /// Kind-conditioned validation: signatures and stamps need an image
    /// reference, QR markers must not have one, and all coordinates must
    /// describe a rectangle inside the unit page.
    pub fn validate(&self) -> Result<(), PlacementError> {
        match self.kind {
            PlacementKind::Signature | PlacementKind::Stamp => {
                if self.image_ref.is_none() {
                    return Err(PlacementError::MissingImageRef {
                        kind: self.kind.to_string(),
                    });
                }
            }
            PlacementKind::QrMarker => {
                if self.image_ref.is_some() {
                    return Err(PlacementError::UnexpectedImageRef);
                }
            }
        }

        let checks = [
            ("x_pct", self.x_pct, 0.0, 1.0),
            ("y_pct", self.y_pct, 0.0, 1.0),
            ("width_pct", self.width_pct, f64::MIN_POSITIVE, 1.0),
            ("height_pct", self.height_pct, f64::MIN_POSITIVE, 1.0),
        ];
        for (field, value, lo, hi) in checks {
            if !(lo..=hi).contains(&value) || !value.is_finite() {
                return Err(PlacementError::CoordinateOutOfRange { field, value });
            }
        }

        if self.x_pct + self.width_pct > 1.0 + 1e-9 {
            return Err(PlacementError::CoordinateOutOfRange {
                field: "x_pct + width_pct",
                value: self.x_pct + self.width_pct,
            });
        }
        if self.y_pct + self.height_pct > 1.0 + 1e-9 {
            return Err(PlacementError::CoordinateOutOfRange {
                field: "y_pct + height_pct",
                value: self.y_pct + self.height_pct,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect() -> NormalizedRect {
        NormalizedRect {
            x_pct: 0.1,
            y_pct: 0.8,
            width_pct: 0.15,
            height_pct: 0.05,
        }
    }

    #[test]
    fn test_signature_requires_image_ref() {
        let p = Placement::new(PlacementKind::Signature, None, Some(0), rect());
        assert!(matches!(
            p.validate(),
            Err(PlacementError::MissingImageRef { .. })
        ));

        let p = Placement::new(
            PlacementKind::Signature,
            Some("blob-1".into()),
            Some(0),
            rect(),
        );
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_qr_marker_rejects_image_ref() {
        let p = Placement::new(PlacementKind::QrMarker, Some("blob-1".into()), None, rect());
        assert_eq!(p.validate(), Err(PlacementError::UnexpectedImageRef));

        let p = Placement::new(PlacementKind::QrMarker, None, None, rect());
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_overflowing_rect_rejected() {
        let p = Placement::new(
            PlacementKind::Stamp,
            Some("blob-1".into()),
            Some(0),
            NormalizedRect {
                x_pct: 0.95,
                y_pct: 0.1,
                width_pct: 0.1,
                height_pct: 0.05,
            },
        );
        assert!(matches!(
            p.validate(),
            Err(PlacementError::CoordinateOutOfRange { .. })
        ));
    }

    #[test]
    fn test_zero_size_rejected() {
        let p = Placement::new(
            PlacementKind::Stamp,
            Some("blob-1".into()),
            Some(0),
            NormalizedRect {
                x_pct: 0.1,
                y_pct: 0.1,
                width_pct: 0.0,
                height_pct: 0.05,
            },
        );
        assert!(matches!(
            p.validate(),
            Err(PlacementError::CoordinateOutOfRange { .. })
        ));
    }

    #[test]
    fn test_serde_roundtrip_uses_screaming_snake_kind() {
        let p = Placement::new(
            PlacementKind::Signature,
            Some("blob-1".into()),
            Some(2),
            rect(),
        );
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains("\"SIGNATURE\""));
        let back: Placement = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }
}

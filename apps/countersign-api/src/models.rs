//! Data models for the Countersign API

use chrono::{DateTime, Utc};
use placement_engine::{Placement, PlacementKind};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use workflow_core::{ActionLogEntry, ContentSource, Document, ReviewerStep, WorkflowStatus};

/// Base content supplied on create/revision: an uploaded PDF (base64) or a
/// rich-text body.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentInput {
    Pdf { pdf_base64: String },
    Body { html: String },
}

/// One reviewer slot in the requested chain.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewerInput {
    pub actor_id: String,
    pub sequence_order: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDocumentRequest {
    pub author_id: String,
    pub content: ContentInput,
    pub reviewers: Vec<ReviewerInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActorRequest {
    pub actor_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentRequest {
    pub actor_id: String,
    pub comment: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RejectRequest {
    pub actor_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReassignRequest {
    pub actor_id: String,
    pub new_actor_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResubmitRequest {
    pub actor_id: String,
    pub comment: String,
    #[serde(default)]
    pub content: Option<ContentInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RevisionRequest {
    pub actor_id: String,
    pub content: ContentInput,
}

/// A placement as submitted by the editor surface.
#[derive(Debug, Clone, Deserialize)]
pub struct PlacementInput {
    pub kind: PlacementKind,
    #[serde(default)]
    pub image_ref: Option<String>,
    #[serde(default)]
    pub page_index: Option<u32>,
    pub x_pct: f64,
    pub y_pct: f64,
    pub width_pct: f64,
    pub height_pct: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetPlacementsRequest {
    pub actor_id: String,
    pub placements: Vec<PlacementInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FinalApproveRequest {
    pub actor_id: String,
    pub comment: String,
    /// When absent, the placements stored on the document are burned.
    #[serde(default)]
    pub placements: Option<Vec<PlacementInput>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadBlobRequest {
    pub data_base64: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadBlobResponse {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OverlayQuery {
    #[serde(default = "default_scale")]
    pub scale: f64,
    /// Native size of a continuous content surface, as reported by the
    /// rendering surface. Ignored for paginated PDFs, which carry their own
    /// page sizes.
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
}

fn default_scale() -> f64 {
    1.0
}

/// Full document view returned by every transition and read endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentResponse {
    pub id: String,
    pub author_id: String,
    pub status: WorkflowStatus,
    pub content: ContentSource,
    pub content_hash: Option<String>,
    pub placements: Vec<Placement>,
    pub steps: Vec<ReviewerStep>,
    pub next_actor_id: Option<String>,
    pub final_artifact_ref: Option<String>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        Self {
            id: doc.id,
            author_id: doc.author_id,
            status: doc.status,
            content: doc.content,
            content_hash: doc.content_hash,
            placements: doc.placements,
            steps: doc.chain.steps().to_vec(),
            next_actor_id: doc.next_actor_id,
            final_artifact_ref: doc.final_artifact_ref,
            version: doc.version,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryResponse {
    pub document_id: String,
    pub log: Vec<ActionLogEntry>,
    pub steps: Vec<ReviewerStep>,
    pub log_intact: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinalApproveResponse {
    pub document: DocumentResponse,
    pub artifact_ref: String,
    pub warnings: Vec<String>,
    pub qr_reservations: Vec<pdf_compositor::QrReservation>,
}

/// Document row as stored; nested lists live in JSON columns.
#[derive(Debug, Clone, FromRow)]
pub struct DbDocument {
    pub id: String,
    pub author_id: String,
    pub status: String,
    pub content_json: String,
    pub content_hash: Option<String>,
    pub placements_json: String,
    pub chain_json: String,
    pub log_json: String,
    pub next_actor_id: Option<String>,
    pub final_artifact_ref: Option<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//! HTTP handlers for the Countersign API
//!
//! Every transition handler follows the same shape: take the document's
//! serialization lock, load, run the workflow-core transition, persist
//! with the optimistic version check, return the fresh document view.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use pdf_compositor::SurfaceMap;
use placement_engine::{NormalizedRect, PageSize, Placement};
use std::collections::HashMap;
use std::sync::Arc;
use workflow_core::{machine, ContentSource, Document, ReviewerChain, ReviewerStep, WorkflowError};

use crate::error::ApiError;
use crate::models::*;
use crate::state::AppState;
use crate::storage;

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

pub async fn upload_blob(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UploadBlobRequest>,
) -> Result<(StatusCode, Json<UploadBlobResponse>), ApiError> {
    let data = BASE64
        .decode(&req.data_base64)
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid base64: {}", e)))?;
    if data.is_empty() {
        return Err(ApiError::InvalidRequest("Blob is empty".to_string()));
    }
    let content_type = req
        .content_type
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let id = storage::store_blob(&state.db, &data, &content_type).await?;
    Ok((StatusCode::CREATED, Json(UploadBlobResponse { id })))
}

pub async fn get_blob(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<(StatusCode, [(String, String); 1], Vec<u8>), ApiError> {
    let (data, content_type) = storage::fetch_blob(&state.db, &id).await?;
    Ok((
        StatusCode::OK,
        [("Content-Type".to_string(), content_type)],
        data,
    ))
}

pub async fn create_document(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<DocumentResponse>), ApiError> {
    let mut chain = ReviewerChain::default();
    for reviewer in &req.reviewers {
        chain.insert(ReviewerStep::new(&reviewer.actor_id, reviewer.sequence_order))?;
    }

    let (content, content_bytes) = resolve_content(&state, req.content).await?;
    let mut doc = Document::new(&req.author_id, content, chain)?;
    doc.set_content_hash(&content_bytes);

    storage::insert_document(&state.db, &doc).await?;
    tracing::info!("Created document: {}", doc.id);
    Ok((StatusCode::CREATED, Json(doc.into())))
}

pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let doc = storage::load_document(&state.db, &id).await?;
    Ok(Json(doc.into()))
}

/// Replace the placement set. Author-only, while drafting; positions are
/// fixed once the document enters the chain.
pub async fn set_placements(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SetPlacementsRequest>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let lock = state.lock_for(&id);
    let _guard = lock.lock().await;

    let mut doc = storage::load_document(&state.db, &id).await?;
    let expected = doc.version;

    if doc.status != workflow_core::WorkflowStatus::Draft {
        return Err(WorkflowError::InvalidState(format!(
            "Cannot change placements at {}",
            doc.status
        ))
        .into());
    }
    if req.actor_id != doc.author_id {
        return Err(WorkflowError::Authorization {
            actor: req.actor_id,
            reason: "only the author may place items".to_string(),
        }
        .into());
    }

    doc.placements = placements_from(req.placements)?;
    doc.version += 1;
    doc.updated_at = chrono::Utc::now();

    storage::update_document(&state.db, &doc, expected).await?;
    Ok(Json(doc.into()))
}

pub async fn upload_revision(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RevisionRequest>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let lock = state.lock_for(&id);
    let _guard = lock.lock().await;

    let mut doc = storage::load_document(&state.db, &id).await?;
    let expected = doc.version;

    let (content, content_bytes) = resolve_content(&state, req.content).await?;
    machine::upload_revision(&mut doc, &req.actor_id, content)?;
    doc.set_content_hash(&content_bytes);

    storage::update_document(&state.db, &doc, expected).await?;
    Ok(Json(doc.into()))
}

pub async fn submit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ActorRequest>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let lock = state.lock_for(&id);
    let _guard = lock.lock().await;

    let mut doc = storage::load_document(&state.db, &id).await?;
    let expected = doc.version;
    machine::submit(&mut doc, &req.actor_id)?;
    storage::update_document(&state.db, &doc, expected).await?;
    Ok(Json(doc.into()))
}

pub async fn approve_review(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CommentRequest>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let lock = state.lock_for(&id);
    let _guard = lock.lock().await;

    let mut doc = storage::load_document(&state.db, &id).await?;
    let expected = doc.version;
    machine::approve_review(&mut doc, &req.actor_id, &req.comment)?;
    storage::update_document(&state.db, &doc, expected).await?;
    Ok(Json(doc.into()))
}

pub async fn reject_review(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RejectRequest>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let lock = state.lock_for(&id);
    let _guard = lock.lock().await;

    let mut doc = storage::load_document(&state.db, &id).await?;
    let expected = doc.version;
    machine::reject_review(&mut doc, &req.actor_id, &req.reason)?;
    storage::update_document(&state.db, &doc, expected).await?;
    Ok(Json(doc.into()))
}

pub async fn reassign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ReassignRequest>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let lock = state.lock_for(&id);
    let _guard = lock.lock().await;

    let mut doc = storage::load_document(&state.db, &id).await?;
    let expected = doc.version;
    machine::reassign(&mut doc, &req.actor_id, &req.new_actor_id, &req.reason)?;
    storage::update_document(&state.db, &doc, expected).await?;
    Ok(Json(doc.into()))
}

/// Final approval: validate, compose the artifact, then flip the status.
/// The lock is held across composition so no other transition can slip in
/// between the check and the apply.
pub async fn final_approve(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<FinalApproveRequest>,
) -> Result<Json<FinalApproveResponse>, ApiError> {
    let lock = state.lock_for(&id);
    let _guard = lock.lock().await;

    let mut doc = storage::load_document(&state.db, &id).await?;
    let expected = doc.version;

    let placements = match req.placements {
        Some(inputs) => placements_from(inputs)?,
        None => doc.placements.clone(),
    };
    machine::check_final_approve(&doc, &req.actor_id, &req.comment, &placements)?;

    let (artifact_ref, warnings, qr_reservations) = match &doc.content {
        ContentSource::Pdf { blob_ref } => {
            let (base, _) = storage::fetch_blob(&state.db, blob_ref).await?;

            // Prefetch the referenced images; a missing blob is a
            // per-placement skip, not a failure
            let mut images: HashMap<String, Vec<u8>> = HashMap::new();
            for placement in &placements {
                if let Some(image_ref) = &placement.image_ref {
                    if !images.contains_key(image_ref) {
                        if let Ok((bytes, _)) = storage::fetch_blob(&state.db, image_ref).await {
                            images.insert(image_ref.clone(), bytes);
                        }
                    }
                }
            }

            let outcome = pdf_compositor::burn_to_pdf(&base, &placements, &images)
                .map_err(|e| WorkflowError::Composition(e.to_string()))?;
            let artifact_ref =
                storage::store_blob(&state.db, &outcome.pdf, "application/pdf").await?;
            (artifact_ref, outcome.warnings, outcome.qr_reservations)
        }
        // Continuous content has nothing to burn; the body itself is the
        // immutable artifact, with placements kept as overlay records
        ContentSource::Body { html } => {
            let artifact_ref = storage::store_blob(&state.db, html.as_bytes(), "text/html").await?;
            (artifact_ref, Vec::new(), Vec::new())
        }
    };

    machine::apply_final_approval(&mut doc, &req.actor_id, &req.comment, &artifact_ref, &warnings)?;
    // The persisted placement list must be the set the artifact was
    // composed from, not whatever was stored before the request
    doc.placements = placements;
    storage::update_document(&state.db, &doc, expected).await?;

    tracing::info!("Document {} approved, artifact {}", id, artifact_ref);
    Ok(Json(FinalApproveResponse {
        document: doc.into(),
        artifact_ref,
        warnings,
        qr_reservations,
    }))
}

pub async fn resubmit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ResubmitRequest>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let lock = state.lock_for(&id);
    let _guard = lock.lock().await;

    let mut doc = storage::load_document(&state.db, &id).await?;
    let expected = doc.version;

    let resolved = match req.content {
        Some(input) => Some(resolve_content(&state, input).await?),
        None => None,
    };
    let (content, content_bytes) = match resolved {
        Some((content, bytes)) => (Some(content), Some(bytes)),
        None => (None, None),
    };

    machine::resubmit(&mut doc, &req.actor_id, &req.comment, content)?;
    if let Some(bytes) = content_bytes {
        doc.set_content_hash(&bytes);
    }

    storage::update_document(&state.db, &doc, expected).await?;
    Ok(Json(doc.into()))
}

pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CommentRequest>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let lock = state.lock_for(&id);
    let _guard = lock.lock().await;

    let mut doc = storage::load_document(&state.db, &id).await?;
    let expected = doc.version;
    machine::add_comment(&mut doc, &req.actor_id, &req.comment)?;
    storage::update_document(&state.db, &doc, expected).await?;
    Ok(Json(doc.into()))
}

pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let doc = storage::load_document(&state.db, &id).await?;
    let log_intact = doc.log.verify().is_ok();
    Ok(Json(HistoryResponse {
        document_id: doc.id,
        log: doc.log.entries().to_vec(),
        steps: doc.chain.steps().to_vec(),
        log_intact,
    }))
}

/// The review-surface overlay at a given zoom.
pub async fn get_overlay(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<OverlayQuery>,
) -> Result<Json<Vec<pdf_compositor::OverlayBox>>, ApiError> {
    if !query.scale.is_finite() || query.scale <= 0.0 {
        return Err(ApiError::InvalidRequest(format!(
            "Invalid scale factor: {}",
            query.scale
        )));
    }

    let doc = storage::load_document(&state.db, &id).await?;
    let surface = match &doc.content {
        ContentSource::Pdf { blob_ref } => {
            let (base, _) = storage::fetch_blob(&state.db, blob_ref).await?;
            let parsed = lopdf::Document::load_mem(&base)
                .map_err(|e| WorkflowError::Composition(e.to_string()))?;
            SurfaceMap::from_pdf(&parsed).map_err(|e| WorkflowError::Composition(e.to_string()))?
        }
        ContentSource::Body { .. } => SurfaceMap::continuous(continuous_page_size(&query)?),
    };

    Ok(Json(pdf_compositor::render_overlay(
        &doc.placements,
        &surface,
        query.scale,
    )))
}

pub async fn get_artifact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<(StatusCode, [(String, String); 1], Vec<u8>), ApiError> {
    let doc = storage::load_document(&state.db, &id).await?;
    let artifact_ref = doc.final_artifact_ref.ok_or_else(|| {
        ApiError::InvalidRequest(format!("Document {} has no final artifact", id))
    })?;
    let (data, content_type) = storage::fetch_blob(&state.db, &artifact_ref).await?;
    Ok((
        StatusCode::OK,
        [("Content-Type".to_string(), content_type)],
        data,
    ))
}

/// Documents waiting on this actor, oldest first.
pub async fn queue_awaiting(
    State(state): State<Arc<AppState>>,
    Path(actor_id): Path<String>,
) -> Result<Json<Vec<DocumentResponse>>, ApiError> {
    let docs = storage::load_documents_where(
        &state.db,
        r#"
        SELECT id, author_id, status, content_json, content_hash, placements_json,
               chain_json, log_json, next_actor_id, final_artifact_ref, version,
               created_at, updated_at
        FROM documents
        WHERE next_actor_id = ?
        ORDER BY updated_at ASC
        "#,
        &actor_id,
    )
    .await?;
    Ok(Json(docs.into_iter().map(Into::into).collect()))
}

/// Rejected documents for an author, most recent first.
pub async fn queue_rejected(
    State(state): State<Arc<AppState>>,
    Path(author_id): Path<String>,
) -> Result<Json<Vec<DocumentResponse>>, ApiError> {
    let docs = storage::load_documents_where(
        &state.db,
        r#"
        SELECT id, author_id, status, content_json, content_hash, placements_json,
               chain_json, log_json, next_actor_id, final_artifact_ref, version,
               created_at, updated_at
        FROM documents
        WHERE author_id = ? AND status = 'REJECTED'
        ORDER BY updated_at DESC
        "#,
        &author_id,
    )
    .await?;
    Ok(Json(docs.into_iter().map(Into::into).collect()))
}

async fn resolve_content(
    state: &AppState,
    input: ContentInput,
) -> Result<(ContentSource, Vec<u8>), ApiError> {
    match input {
        ContentInput::Pdf { pdf_base64 } => {
            let bytes = BASE64
                .decode(&pdf_base64)
                .map_err(|e| ApiError::InvalidRequest(format!("Invalid PDF base64: {}", e)))?;
            if !bytes.starts_with(b"%PDF-") {
                return Err(ApiError::InvalidRequest(
                    "Uploaded content is not a PDF".to_string(),
                ));
            }
            let blob_ref = storage::store_blob(&state.db, &bytes, "application/pdf").await?;
            Ok((ContentSource::Pdf { blob_ref }, bytes))
        }
        ContentInput::Body { html } => {
            if html.trim().is_empty() {
                return Err(ApiError::InvalidRequest(
                    "Content body must not be empty".to_string(),
                ));
            }
            let bytes = html.clone().into_bytes();
            Ok((ContentSource::Body { html }, bytes))
        }
    }
}

/// Native size of a continuous content surface, as reported by the caller's
/// rendering surface. Defaults to letter when the caller supplies none.
fn continuous_page_size(query: &OverlayQuery) -> Result<PageSize, ApiError> {
    match (query.width, query.height) {
        (Some(w), Some(h)) => {
            if !w.is_finite() || !h.is_finite() {
                return Err(ApiError::InvalidRequest(format!(
                    "Invalid surface size: {}x{}",
                    w, h
                )));
            }
            PageSize::new(w, h).map_err(|e| ApiError::InvalidRequest(e.to_string()))
        }
        (None, None) => Ok(PageSize::letter()),
        _ => Err(ApiError::InvalidRequest(
            "Surface width and height must be supplied together".to_string(),
        )),
    }
}

fn placements_from(inputs: Vec<PlacementInput>) -> Result<Vec<Placement>, ApiError> {
    inputs
        .into_iter()
        .map(|input| {
            let placement = Placement::new(
                input.kind,
                input.image_ref,
                input.page_index,
                NormalizedRect {
                    x_pct: input.x_pct,
                    y_pct: input.y_pct,
                    width_pct: input.width_pct,
                    height_pct: input.height_pct,
                },
            );
            placement
                .validate()
                .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
            Ok(placement)
        })
        .collect()
}

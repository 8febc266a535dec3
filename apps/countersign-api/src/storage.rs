//! Blob store and document persistence
//!
//! Uploaded images, base PDFs, and final artifacts all live in the `blobs`
//! table. Documents persist with their nested lists (placements, chain,
//! log) in JSON columns; every write is guarded by the optimistic
//! `version` check, so a lost race surfaces as a workflow conflict.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;
use workflow_core::{Document, ReviewerChain, WorkflowError, WorkflowStatus};

use crate::error::ApiError;
use crate::models::DbDocument;

pub async fn store_blob(
    pool: &SqlitePool,
    data: &[u8],
    content_type: &str,
) -> Result<String, ApiError> {
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO blobs (id, data, content_type, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(data)
    .bind(content_type)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;
    Ok(id)
}

pub async fn fetch_blob(pool: &SqlitePool, id: &str) -> Result<(Vec<u8>, String), ApiError> {
    let row: Option<(Vec<u8>, String)> =
        sqlx::query_as("SELECT data, content_type FROM blobs WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;
    row.ok_or_else(|| ApiError::BlobNotFound(id.to_string()))
}

pub async fn insert_document(pool: &SqlitePool, doc: &Document) -> Result<(), ApiError> {
    sqlx::query(
        r#"
        INSERT INTO documents (id, author_id, status, content_json, content_hash,
                               placements_json, chain_json, log_json, next_actor_id,
                               final_artifact_ref, version, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&doc.id)
    .bind(&doc.author_id)
    .bind(doc.status.as_str())
    .bind(encode_json(&doc.content)?)
    .bind(&doc.content_hash)
    .bind(encode_json(&doc.placements)?)
    .bind(encode_json(&doc.chain)?)
    .bind(encode_json(&doc.log)?)
    .bind(&doc.next_actor_id)
    .bind(&doc.final_artifact_ref)
    .bind(doc.version as i64)
    .bind(doc.created_at.to_rfc3339())
    .bind(doc.updated_at.to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn load_document(pool: &SqlitePool, id: &str) -> Result<Document, ApiError> {
    let row: Option<DbDocument> = sqlx::query_as(
        r#"
        SELECT id, author_id, status, content_json, content_hash, placements_json,
               chain_json, log_json, next_actor_id, final_artifact_ref, version,
               created_at, updated_at
        FROM documents
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let row = row.ok_or_else(|| ApiError::DocumentNotFound(id.to_string()))?;
    into_domain(row)
}

pub async fn load_documents_where(
    pool: &SqlitePool,
    query: &str,
    bind: &str,
) -> Result<Vec<Document>, ApiError> {
    let rows: Vec<DbDocument> = sqlx::query_as(query).bind(bind).fetch_all(pool).await?;
    rows.into_iter().map(into_domain).collect()
}

/// Persist a mutated document. `expected_version` is the version the
/// transition started from; a mismatch means a concurrent writer won.
pub async fn update_document(
    pool: &SqlitePool,
    doc: &Document,
    expected_version: u64,
) -> Result<(), ApiError> {
    let result = sqlx::query(
        r#"
        UPDATE documents
        SET status = ?, content_json = ?, content_hash = ?, placements_json = ?,
            chain_json = ?, log_json = ?, next_actor_id = ?, final_artifact_ref = ?,
            version = ?, updated_at = ?
        WHERE id = ? AND version = ?
        "#,
    )
    .bind(doc.status.as_str())
    .bind(encode_json(&doc.content)?)
    .bind(&doc.content_hash)
    .bind(encode_json(&doc.placements)?)
    .bind(encode_json(&doc.chain)?)
    .bind(encode_json(&doc.log)?)
    .bind(&doc.next_actor_id)
    .bind(&doc.final_artifact_ref)
    .bind(doc.version as i64)
    .bind(doc.updated_at.to_rfc3339())
    .bind(&doc.id)
    .bind(expected_version as i64)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::Workflow(WorkflowError::Conflict(format!(
            "Document {} was modified concurrently",
            doc.id
        ))));
    }
    Ok(())
}

fn into_domain(row: DbDocument) -> Result<Document, ApiError> {
    let status = WorkflowStatus::parse(&row.status)
        .ok_or_else(|| ApiError::InvalidRequest(format!("Unknown status: {}", row.status)))?;
    let chain: ReviewerChain = decode_json(&row.chain_json)?;
    Ok(Document {
        id: row.id,
        author_id: row.author_id,
        status,
        content: decode_json(&row.content_json)?,
        content_hash: row.content_hash,
        placements: decode_json(&row.placements_json)?,
        chain,
        log: decode_json(&row.log_json)?,
        next_actor_id: row.next_actor_id,
        final_artifact_ref: row.final_artifact_ref,
        version: row.version as u64,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn encode_json<T: serde::Serialize>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string(value).map_err(|e| ApiError::Internal(e.into()))
}

fn decode_json<T: serde::de::DeserializeOwned>(json: &str) -> Result<T, ApiError> {
    serde_json::from_str(json).map_err(|e| ApiError::Internal(e.into()))
}

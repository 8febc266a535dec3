//! The unit under approval

use chrono::{DateTime, Utc};
use placement_engine::Placement;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::chain::ReviewerChain;
use crate::error::WorkflowError;
use crate::log::ActionLog;
use crate::status::WorkflowStatus;

/// Base content a document is positioned against: a paginated binary
/// document in the blob store, or a continuous rich-text body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentSource {
    Pdf { blob_ref: String },
    Body { html: String },
}

/// A document moving through the approval workflow.
///
/// `next_actor_id` is derived state: always consistent with the status and
/// the lowest-order pending reviewer step, or `None` in DRAFT/APPROVED.
/// `version` backs optimistic concurrency; every successful transition
/// bumps it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub author_id: String,
    pub status: WorkflowStatus,
    pub content: ContentSource,
    pub content_hash: Option<String>,
    pub placements: Vec<Placement>,
    pub chain: ReviewerChain,
    pub log: ActionLog,
    pub next_actor_id: Option<String>,
    pub final_artifact_ref: Option<String>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Create a new DRAFT document. The chain must already be complete and
    /// valid (final approver mandatory at creation time).
    pub fn new(
        author_id: &str,
        content: ContentSource,
        chain: ReviewerChain,
    ) -> Result<Self, WorkflowError> {
        chain.validate(author_id)?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            author_id: author_id.to_string(),
            status: WorkflowStatus::Draft,
            content,
            content_hash: None,
            placements: Vec::new(),
            chain,
            log: ActionLog::new(),
            next_actor_id: None,
            final_artifact_ref: None,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }

    /// Pure resolution rule for "who acts next".
    pub fn resolve_next_actor(&self) -> Option<String> {
        match self.status {
            WorkflowStatus::Draft | WorkflowStatus::Approved => None,
            // Rejected documents wait on the author's resubmission
            WorkflowStatus::Rejected => Some(self.author_id.clone()),
            WorkflowStatus::PendingReview | WorkflowStatus::PendingApproval => self
                .chain
                .current_pending()
                .map(|step| step.actor_id.clone()),
        }
    }

    pub(crate) fn recompute_next_actor(&mut self) {
        self.next_actor_id = self.resolve_next_actor();
    }

    /// Bump version and timestamp after a successful mutation.
    pub(crate) fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }

    /// Author, reviewers, and the final approver may comment.
    pub fn is_participant(&self, actor_id: &str) -> bool {
        actor_id == self.author_id || self.chain.contains_actor(actor_id)
    }

    /// Record the SHA-256 of the current base content bytes.
    pub fn set_content_hash(&mut self, bytes: &[u8]) {
        self.content_hash = Some(hex::encode(Sha256::digest(bytes)));
    }
}

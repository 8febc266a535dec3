//! Append-only, hash-chained action log
//!
//! Every workflow transition appends exactly one entry. Entries are never
//! mutated or deleted; each links to the SHA-256 hash of its predecessor so
//! tampering anywhere in the trail breaks verification.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Types of auditable workflow actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Submit,
    ApproveReview,
    RejectReview,
    ReassignReview,
    FinalApprove,
    FinalReject,
    Resubmit,
    Comment,
    UploadRevision,
}

/// A single entry in the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLogEntry {
    pub id: String,
    pub actor_id: String,
    pub action: ActionType,
    pub comment: Option<String>,
    pub details: Option<serde_json::Value>,
    pub timestamp: String,
    pub previous_hash: Option<String>,
}

impl ActionLogEntry {
    fn new(
        actor_id: &str,
        action: ActionType,
        comment: Option<String>,
        details: Option<serde_json::Value>,
        previous_hash: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            actor_id: actor_id.to_string(),
            action,
            comment,
            details,
            timestamp: Utc::now().to_rfc3339(),
            previous_hash,
        }
    }

    /// Hash of this entry for chain linking.
    pub fn compute_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.id.as_bytes());
        hasher.update(self.timestamp.as_bytes());
        hasher.update(format!("{:?}", self.action).as_bytes());
        hasher.update(self.actor_id.as_bytes());
        if let Some(ref comment) = self.comment {
            hasher.update(comment.as_bytes());
        }
        if let Some(ref details) = self.details {
            hasher.update(details.to_string().as_bytes());
        }
        if let Some(ref prev) = self.previous_hash {
            hasher.update(prev.as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

/// The append-only trail for one document.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLog {
    entries: Vec<ActionLogEntry>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ActionLogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn last_hash(&self) -> Option<String> {
        self.entries.last().map(|e| e.compute_hash())
    }

    /// Append an entry, automatically linking to the previous hash.
    pub fn append(
        &mut self,
        actor_id: &str,
        action: ActionType,
        comment: Option<String>,
        details: Option<serde_json::Value>,
    ) -> &ActionLogEntry {
        let previous_hash = self.last_hash();
        self.entries.push(ActionLogEntry::new(
            actor_id,
            action,
            comment,
            details,
            previous_hash,
        ));
        self.entries.last().expect("just pushed")
    }

    /// Verify the integrity of the whole chain.
    pub fn verify(&self) -> Result<(), String> {
        let mut expected_prev: Option<String> = None;
        for (i, entry) in self.entries.iter().enumerate() {
            if entry.previous_hash != expected_prev {
                return Err(format!(
                    "Chain broken at entry {}: expected prev {:?}, got {:?}",
                    i, expected_prev, entry.previous_hash
                ));
            }
            expected_prev = Some(entry.compute_hash());
        }
        Ok(())
    }
}

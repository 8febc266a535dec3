//! The ordered, typed representation of who must act on a document
//!
//! Steps are processed strictly in ascending `sequence_order`. The reserved
//! order [`FINAL_APPROVER_ORDER`] marks the single final approver whose
//! approval triggers artifact generation. Resolved steps are immutable;
//! reassignment appends a replacement step rather than rewriting history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::WorkflowError;

/// Reserved `sequence_order` marking the final approver step.
pub const FINAL_APPROVER_ORDER: u32 = 999;

/// Outcome of a single reviewer step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    Pending,
    Approved,
    Rejected,
    Skipped,
    Reassigned,
}

/// One ordered slot in the approval chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewerStep {
    pub id: String,
    pub actor_id: String,
    pub sequence_order: u32,
    pub status: StepStatus,
    pub acted_at: Option<DateTime<Utc>>,
    pub reassigned_from: Option<String>,
}

impl ReviewerStep {
    pub fn new(actor_id: &str, sequence_order: u32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            actor_id: actor_id.to_string(),
            sequence_order,
            status: StepStatus::Pending,
            acted_at: None,
            reassigned_from: None,
        }
    }

    pub fn final_approver(actor_id: &str) -> Self {
        Self::new(actor_id, FINAL_APPROVER_ORDER)
    }

    pub fn is_final_approver(&self) -> bool {
        self.sequence_order == FINAL_APPROVER_ORDER
    }
}

/// Business limits on chain shape; configurable, not baked into the
/// algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChainPolicy {
    pub max_reviewers: usize,
}

impl Default for ChainPolicy {
    fn default() -> Self {
        Self { max_reviewers: 5 }
    }
}

/// Invariant-enforcing container for the reviewer steps of one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewerChain {
    steps: Vec<ReviewerStep>,
    #[serde(default)]
    policy: ChainPolicy,
}

impl ReviewerChain {
    pub fn new(policy: ChainPolicy) -> Self {
        Self {
            steps: Vec::new(),
            policy,
        }
    }

    pub fn steps(&self) -> &[ReviewerStep] {
        &self.steps
    }

    /// Insert a step, keeping steps sorted by ascending order.
    ///
    /// At most one unresolved step may exist per `sequence_order`; resolved
    /// steps (approved, rejected, reassigned) are history and never block a
    /// replacement. A chain may not grow past the policy limit of distinct
    /// ordinary orders.
    pub fn insert(&mut self, step: ReviewerStep) -> Result<(), WorkflowError> {
        let order_occupied = self
            .steps
            .iter()
            .any(|s| s.sequence_order == step.sequence_order && s.status == StepStatus::Pending);
        if order_occupied {
            return Err(WorkflowError::Validation(format!(
                "Duplicate sequence order {} in chain",
                step.sequence_order
            )));
        }

        if !step.is_final_approver() {
            let ordinary_orders = self
                .steps
                .iter()
                .filter(|s| !s.is_final_approver() && s.status != StepStatus::Reassigned)
                .map(|s| s.sequence_order)
                .collect::<std::collections::BTreeSet<_>>();
            if !ordinary_orders.contains(&step.sequence_order)
                && ordinary_orders.len() >= self.policy.max_reviewers
            {
                return Err(WorkflowError::Validation(format!(
                    "Chain exceeds maximum of {} reviewers",
                    self.policy.max_reviewers
                )));
            }
        }

        let pos = self
            .steps
            .partition_point(|s| s.sequence_order <= step.sequence_order);
        self.steps.insert(pos, step);
        Ok(())
    }

    /// Full-chain validation run before a document enters the workflow.
    ///
    /// The final approver step is mandatory (exactly one), no actor may
    /// appear twice among live steps, and the author may not review their
    /// own document.
    pub fn validate(&self, author_id: &str) -> Result<(), WorkflowError> {
        let finals = self
            .steps
            .iter()
            .filter(|s| s.is_final_approver() && s.status != StepStatus::Reassigned)
            .count();
        if finals != 1 {
            return Err(WorkflowError::Validation(format!(
                "Chain must contain exactly one final approver step, found {}",
                finals
            )));
        }

        let mut seen = std::collections::HashSet::new();
        for step in self.live_steps() {
            if step.actor_id == author_id {
                return Err(WorkflowError::Validation(
                    "Document author cannot be in the reviewer chain".to_string(),
                ));
            }
            if !seen.insert(step.actor_id.as_str()) {
                return Err(WorkflowError::Validation(format!(
                    "Actor {} appears more than once in the chain",
                    step.actor_id
                )));
            }
        }

        Ok(())
    }

    /// Lowest-order pending step, or `None` when nothing is pending.
    pub fn current_pending(&self) -> Option<&ReviewerStep> {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Pending)
            .min_by_key(|s| s.sequence_order)
    }

    /// True when a pending ordinary (non-final) reviewer step remains.
    pub fn has_pending_review(&self) -> bool {
        self.steps
            .iter()
            .any(|s| s.status == StepStatus::Pending && !s.is_final_approver())
    }

    /// Resolve a pending step. Resolved steps are immutable, so resolving a
    /// non-pending step is an invariant violation.
    pub fn mark_resolved(&mut self, step_id: &str, outcome: StepStatus) -> Result<(), WorkflowError> {
        if outcome == StepStatus::Pending {
            return Err(WorkflowError::Validation(
                "Cannot resolve a step back to PENDING".to_string(),
            ));
        }
        let step = self
            .steps
            .iter_mut()
            .find(|s| s.id == step_id)
            .ok_or_else(|| WorkflowError::Validation(format!("No step with id {}", step_id)))?;
        if step.status != StepStatus::Pending {
            return Err(WorkflowError::InvalidState(format!(
                "Step {} already resolved as {:?}",
                step_id, step.status
            )));
        }
        step.status = outcome;
        step.acted_at = Some(Utc::now());
        Ok(())
    }

    /// Re-arm the chain for a resubmission.
    ///
    /// For each order whose most recent step ended REJECTED, append a fresh
    /// pending step for the same actor. Resolved steps stay in place as
    /// history; reviewers who already approved are not asked again.
    pub(crate) fn rearm_rejected(&mut self) {
        let mut seen_orders = std::collections::BTreeSet::new();
        let mut replacements = Vec::new();
        for step in self.steps.iter().rev() {
            if step.status == StepStatus::Reassigned {
                continue;
            }
            if !seen_orders.insert(step.sequence_order) {
                continue;
            }
            if step.status == StepStatus::Rejected {
                replacements.push(ReviewerStep::new(&step.actor_id, step.sequence_order));
            }
        }
        for step in replacements {
            let pos = self
                .steps
                .partition_point(|s| s.sequence_order <= step.sequence_order);
            self.steps.insert(pos, step);
        }
    }

    /// Whether an actor holds any live (non-reassigned) step.
    pub fn contains_actor(&self, actor_id: &str) -> bool {
        self.live_steps().any(|s| s.actor_id == actor_id)
    }

    fn live_steps(&self) -> impl Iterator<Item = &ReviewerStep> {
        self.steps
            .iter()
            .filter(|s| s.status != StepStatus::Reassigned)
    }
}

impl Default for ReviewerChain {
    fn default() -> Self {
        Self::new(ChainPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_with(actors: &[(&str, u32)]) -> ReviewerChain {
        let mut chain = ReviewerChain::default();
        for (actor, order) in actors {
            chain.insert(ReviewerStep::new(actor, *order)).unwrap();
        }
        chain
    }

    #[test]
    fn test_insert_rejects_duplicate_order() {
        let mut chain = chain_with(&[("alice", 1)]);
        let err = chain.insert(ReviewerStep::new("bob", 1)).unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
    }

    #[test]
    fn test_insert_allows_order_reuse_after_reassignment() {
        let mut chain = chain_with(&[("alice", 1)]);
        let id = chain.steps()[0].id.clone();
        chain.mark_resolved(&id, StepStatus::Reassigned).unwrap();
        assert!(chain.insert(ReviewerStep::new("bob", 1)).is_ok());
    }

    #[test]
    fn test_insert_allows_order_reuse_after_rejection() {
        // A rejected step is history; a replacement pending step at the
        // same order must be accepted, and a second one refused
        let mut chain = chain_with(&[("alice", 1)]);
        let id = chain.steps()[0].id.clone();
        chain.mark_resolved(&id, StepStatus::Rejected).unwrap();
        assert!(chain.insert(ReviewerStep::new("bob", 1)).is_ok());
        assert!(chain.insert(ReviewerStep::new("carol", 1)).is_err());
    }

    #[test]
    fn test_rejected_history_does_not_count_against_reviewer_limit() {
        let mut chain = ReviewerChain::new(ChainPolicy { max_reviewers: 2 });
        chain.insert(ReviewerStep::new("a", 1)).unwrap();
        chain.insert(ReviewerStep::new("b", 2)).unwrap();
        let id = chain.steps()[1].id.clone();
        chain.mark_resolved(&id, StepStatus::Rejected).unwrap();

        // Order 2 is already counted; a replacement there is not growth
        assert!(chain.insert(ReviewerStep::new("c", 2)).is_ok());
        // A genuinely new order still hits the limit
        assert!(chain.insert(ReviewerStep::new("d", 3)).is_err());
    }

    #[test]
    fn test_max_reviewers_enforced() {
        let mut chain = ReviewerChain::new(ChainPolicy { max_reviewers: 2 });
        chain.insert(ReviewerStep::new("a", 1)).unwrap();
        chain.insert(ReviewerStep::new("b", 2)).unwrap();
        let err = chain.insert(ReviewerStep::new("c", 3)).unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
        // The final approver does not count against the reviewer limit
        assert!(chain.insert(ReviewerStep::final_approver("d")).is_ok());
    }

    #[test]
    fn test_validate_requires_exactly_one_final_approver() {
        let chain = chain_with(&[("alice", 1)]);
        assert!(chain.validate("author").is_err());

        let mut chain = chain_with(&[("alice", 1)]);
        chain.insert(ReviewerStep::final_approver("carol")).unwrap();
        assert!(chain.validate("author").is_ok());

        let err = chain
            .insert(ReviewerStep::final_approver("dave"))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
    }

    #[test]
    fn test_validate_rejects_author_in_chain() {
        let mut chain = chain_with(&[("author", 1)]);
        chain.insert(ReviewerStep::final_approver("carol")).unwrap();
        assert!(chain.validate("author").is_err());
    }

    #[test]
    fn test_current_pending_is_lowest_order() {
        let chain = chain_with(&[("bob", 2), ("alice", 1), ("carol", FINAL_APPROVER_ORDER)]);
        assert_eq!(chain.current_pending().unwrap().actor_id, "alice");
    }

    #[test]
    fn test_resolved_steps_are_immutable() {
        let mut chain = chain_with(&[("alice", 1)]);
        let id = chain.steps()[0].id.clone();
        chain.mark_resolved(&id, StepStatus::Approved).unwrap();
        let err = chain.mark_resolved(&id, StepStatus::Rejected).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidState(_)));
    }

    #[test]
    fn test_rearm_replaces_only_rejected_steps() {
        let mut chain = chain_with(&[("alice", 1), ("bob", 2), ("carol", FINAL_APPROVER_ORDER)]);
        let alice_id = chain.steps()[0].id.clone();
        let bob_id = chain.steps()[1].id.clone();
        chain.mark_resolved(&alice_id, StepStatus::Approved).unwrap();
        chain.mark_resolved(&bob_id, StepStatus::Rejected).unwrap();

        chain.rearm_rejected();

        // Alice's approval stands; Bob gets a fresh pending step at order 2
        let pending = chain.current_pending().unwrap();
        assert_eq!(pending.actor_id, "bob");
        assert_eq!(pending.sequence_order, 2);
        assert_eq!(pending.status, StepStatus::Pending);
        // Rejected history preserved
        assert!(chain
            .steps()
            .iter()
            .any(|s| s.id == bob_id && s.status == StepStatus::Rejected));

        // Re-arming again is a no-op: the latest step at order 2 is pending
        let count = chain.steps().len();
        chain.rearm_rejected();
        assert_eq!(chain.steps().len(), count);
    }

    #[test]
    fn test_mark_resolved_sets_acted_at() {
        let mut chain = chain_with(&[("alice", 1)]);
        let id = chain.steps()[0].id.clone();
        assert!(chain.steps()[0].acted_at.is_none());
        chain.mark_resolved(&id, StepStatus::Approved).unwrap();
        assert!(chain.steps()[0].acted_at.is_some());
    }
}

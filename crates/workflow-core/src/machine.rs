//! Workflow transitions
//!
//! One public operation per transition. Every operation validates the
//! caller is the authorized actor for the current state and that required
//! input is present *before* any mutation, then mutates status and steps,
//! appends exactly one action log entry, and recomputes `next_actor_id`.
//!
//! Final approval is two-phase so the artifact write and the status flip
//! commit together: [`check_final_approve`] runs before any IO,
//! [`apply_final_approval`] runs only once the composed artifact has been
//! stored. [`final_approve`] wires both phases through a [`Compositor`].

use placement_engine::Placement;

use crate::chain::{ReviewerStep, StepStatus};
use crate::document::{ContentSource, Document};
use crate::error::WorkflowError;
use crate::log::ActionType;
use crate::status::WorkflowStatus;

/// Produces the final immutable artifact for a document and returns a
/// retrievable reference to it, plus warnings for any skipped placements.
pub trait Compositor {
    fn compose(
        &self,
        content: &ContentSource,
        placements: &[Placement],
    ) -> Result<Composition, WorkflowError>;
}

/// Result of burning placements into the base content.
#[derive(Debug, Clone)]
pub struct Composition {
    pub artifact_ref: String,
    pub warnings: Vec<String>,
}

fn require_text(value: &str, what: &str) -> Result<(), WorkflowError> {
    if value.trim().is_empty() {
        return Err(WorkflowError::Validation(format!("{} must not be empty", what)));
    }
    Ok(())
}

fn require_next_actor(doc: &Document, actor_id: &str) -> Result<(), WorkflowError> {
    if doc.next_actor_id.as_deref() != Some(actor_id) {
        return Err(WorkflowError::not_your_turn(actor_id));
    }
    Ok(())
}

/// DRAFT → PENDING_REVIEW (or straight to PENDING_APPROVAL when the chain
/// holds only the final approver).
pub fn submit(doc: &mut Document, actor_id: &str) -> Result<(), WorkflowError> {
    if doc.status != WorkflowStatus::Draft {
        return Err(WorkflowError::InvalidState(format!(
            "Cannot submit from {}",
            doc.status
        )));
    }
    if actor_id != doc.author_id {
        return Err(WorkflowError::Authorization {
            actor: actor_id.to_string(),
            reason: "only the author may submit".to_string(),
        });
    }
    doc.chain.validate(&doc.author_id)?;

    doc.status = if doc.chain.has_pending_review() {
        WorkflowStatus::PendingReview
    } else {
        WorkflowStatus::PendingApproval
    };
    doc.log.append(
        actor_id,
        ActionType::Submit,
        None,
        doc.content_hash
            .as_ref()
            .map(|h| serde_json::json!({ "content_hash": h })),
    );
    doc.recompute_next_actor();
    doc.touch();
    tracing::info!(document = %doc.id, status = %doc.status, "document submitted");
    Ok(())
}

/// The current reviewer approves; the chain advances to the next pending
/// step, or to the final approver when no ordinary reviews remain.
pub fn approve_review(
    doc: &mut Document,
    actor_id: &str,
    comment: &str,
) -> Result<(), WorkflowError> {
    if doc.status != WorkflowStatus::PendingReview {
        return Err(WorkflowError::InvalidState(format!(
            "Cannot approve a review from {}",
            doc.status
        )));
    }
    require_next_actor(doc, actor_id)?;
    require_text(comment, "Review comment")?;

    let step_id = doc
        .chain
        .current_pending()
        .map(|s| s.id.clone())
        .ok_or_else(|| WorkflowError::InvalidState("No pending reviewer step".to_string()))?;
    doc.chain.mark_resolved(&step_id, StepStatus::Approved)?;

    doc.status = if doc.chain.has_pending_review() {
        WorkflowStatus::PendingReview
    } else {
        WorkflowStatus::PendingApproval
    };
    doc.log.append(
        actor_id,
        ActionType::ApproveReview,
        Some(comment.to_string()),
        None,
    );
    doc.recompute_next_actor();
    doc.touch();
    Ok(())
}

/// The current actor rejects. Valid from either pending stage; pending
/// steps other than the current one are left untouched.
pub fn reject_review(
    doc: &mut Document,
    actor_id: &str,
    reason: &str,
) -> Result<(), WorkflowError> {
    let action = match doc.status {
        WorkflowStatus::PendingReview => ActionType::RejectReview,
        WorkflowStatus::PendingApproval => ActionType::FinalReject,
        other => {
            return Err(WorkflowError::InvalidState(format!(
                "Cannot reject from {}",
                other
            )))
        }
    };
    require_next_actor(doc, actor_id)?;
    require_text(reason, "Rejection reason")?;

    let step_id = doc
        .chain
        .current_pending()
        .map(|s| s.id.clone())
        .ok_or_else(|| WorkflowError::InvalidState("No pending reviewer step".to_string()))?;
    doc.chain.mark_resolved(&step_id, StepStatus::Rejected)?;

    doc.status = WorkflowStatus::Rejected;
    doc.log
        .append(actor_id, action, Some(reason.to_string()), None);
    doc.recompute_next_actor();
    doc.touch();
    tracing::info!(document = %doc.id, actor = actor_id, "document rejected");
    Ok(())
}

/// The current reviewer hands their slot to another actor. Only valid at
/// PENDING_REVIEW; the final approver cannot be reassigned.
pub fn reassign(
    doc: &mut Document,
    actor_id: &str,
    new_actor_id: &str,
    reason: &str,
) -> Result<(), WorkflowError> {
    if doc.status != WorkflowStatus::PendingReview {
        return Err(WorkflowError::InvalidState(format!(
            "Cannot reassign from {}",
            doc.status
        )));
    }
    require_next_actor(doc, actor_id)?;
    require_text(reason, "Reassignment reason")?;
    if new_actor_id == doc.author_id {
        return Err(WorkflowError::Validation(
            "Cannot reassign a review to the document author".to_string(),
        ));
    }
    if doc.chain.contains_actor(new_actor_id) {
        return Err(WorkflowError::Validation(format!(
            "Actor {} is already in the reviewer chain",
            new_actor_id
        )));
    }

    let (step_id, order) = doc
        .chain
        .current_pending()
        .map(|s| (s.id.clone(), s.sequence_order))
        .ok_or_else(|| WorkflowError::InvalidState("No pending reviewer step".to_string()))?;
    doc.chain.mark_resolved(&step_id, StepStatus::Reassigned)?;

    let mut replacement = ReviewerStep::new(new_actor_id, order);
    replacement.reassigned_from = Some(actor_id.to_string());
    doc.chain.insert(replacement)?;

    doc.log.append(
        actor_id,
        ActionType::ReassignReview,
        Some(reason.to_string()),
        Some(serde_json::json!({ "from": actor_id, "to": new_actor_id })),
    );
    doc.recompute_next_actor();
    doc.touch();
    Ok(())
}

/// Pure pre-check for final approval: state, actor, comment, and placement
/// shape are all validated before any composition IO starts.
pub fn check_final_approve(
    doc: &Document,
    actor_id: &str,
    comment: &str,
    placements: &[Placement],
) -> Result<(), WorkflowError> {
    if doc.status != WorkflowStatus::PendingApproval {
        return Err(WorkflowError::InvalidState(format!(
            "Cannot final-approve from {}",
            doc.status
        )));
    }
    require_next_actor(doc, actor_id)?;
    require_text(comment, "Approval comment")?;
    for placement in placements {
        placement
            .validate()
            .map_err(|e| WorkflowError::Validation(e.to_string()))?;
    }
    Ok(())
}

/// Second phase of final approval, applied only after the final artifact
/// has been produced and stored. Flips the status and records the artifact
/// reference atomically with respect to the document.
pub fn apply_final_approval(
    doc: &mut Document,
    actor_id: &str,
    comment: &str,
    artifact_ref: &str,
    warnings: &[String],
) -> Result<(), WorkflowError> {
    if doc.status != WorkflowStatus::PendingApproval {
        return Err(WorkflowError::Conflict(format!(
            "Document left PENDING_APPROVAL during composition (now {})",
            doc.status
        )));
    }
    let step_id = doc
        .chain
        .current_pending()
        .filter(|s| s.is_final_approver())
        .map(|s| s.id.clone())
        .ok_or_else(|| {
            WorkflowError::InvalidState("No pending final approver step".to_string())
        })?;
    doc.chain.mark_resolved(&step_id, StepStatus::Approved)?;

    doc.final_artifact_ref = Some(artifact_ref.to_string());
    doc.status = WorkflowStatus::Approved;
    doc.log.append(
        actor_id,
        ActionType::FinalApprove,
        Some(comment.to_string()),
        Some(serde_json::json!({
            "artifact_ref": artifact_ref,
            "skipped_placements": warnings,
        })),
    );
    doc.recompute_next_actor();
    doc.touch();
    tracing::info!(document = %doc.id, artifact = artifact_ref, "document approved");
    Ok(())
}

/// Full final-approval transition over a synchronous [`Compositor`].
///
/// Per-placement failures are the compositor's to skip and report; only an
/// unusable base document aborts the operation, leaving the status at
/// PENDING_APPROVAL.
pub fn final_approve<C: Compositor>(
    doc: &mut Document,
    actor_id: &str,
    comment: &str,
    placements: &[Placement],
    compositor: &C,
) -> Result<Composition, WorkflowError> {
    check_final_approve(doc, actor_id, comment, placements)?;
    let composition = compositor.compose(&doc.content, placements)?;
    for warning in &composition.warnings {
        tracing::warn!(document = %doc.id, "placement skipped: {}", warning);
    }
    apply_final_approval(
        doc,
        actor_id,
        comment,
        &composition.artifact_ref,
        &composition.warnings,
    )?;
    Ok(composition)
}

/// The author sends a rejected document back into the flow, optionally
/// with revised base content. A replaced content reference clears the
/// stored placements, which were positioned against the old content.
pub fn resubmit(
    doc: &mut Document,
    actor_id: &str,
    comment: &str,
    new_content: Option<ContentSource>,
) -> Result<(), WorkflowError> {
    if doc.status != WorkflowStatus::Rejected {
        return Err(WorkflowError::InvalidState(format!(
            "Cannot resubmit from {}",
            doc.status
        )));
    }
    if actor_id != doc.author_id {
        return Err(WorkflowError::Authorization {
            actor: actor_id.to_string(),
            reason: "only the author may resubmit".to_string(),
        });
    }
    require_text(comment, "Resubmission comment")?;

    let content_replaced = new_content.is_some();
    if let Some(content) = new_content {
        doc.content = content;
        doc.content_hash = None;
        doc.placements.clear();
    }

    doc.chain.rearm_rejected();

    doc.status = if doc.chain.has_pending_review() {
        WorkflowStatus::PendingReview
    } else {
        WorkflowStatus::PendingApproval
    };
    doc.log.append(
        actor_id,
        ActionType::Resubmit,
        Some(comment.to_string()),
        Some(serde_json::json!({ "content_replaced": content_replaced })),
    );
    doc.recompute_next_actor();
    doc.touch();
    Ok(())
}

/// Append a comment. Available to any chain participant at any non-DRAFT
/// status; no state change.
pub fn add_comment(doc: &mut Document, actor_id: &str, text: &str) -> Result<(), WorkflowError> {
    if doc.status == WorkflowStatus::Draft {
        return Err(WorkflowError::InvalidState(
            "Cannot comment on a draft".to_string(),
        ));
    }
    if !doc.is_participant(actor_id) {
        return Err(WorkflowError::Authorization {
            actor: actor_id.to_string(),
            reason: "not a participant in this document".to_string(),
        });
    }
    require_text(text, "Comment")?;

    doc.log
        .append(actor_id, ActionType::Comment, Some(text.to_string()), None);
    doc.touch();
    Ok(())
}

/// The author replaces the base content while still drafting. Clears any
/// placements positioned against the old content.
pub fn upload_revision(
    doc: &mut Document,
    actor_id: &str,
    new_content: ContentSource,
) -> Result<(), WorkflowError> {
    if doc.status != WorkflowStatus::Draft {
        return Err(WorkflowError::InvalidState(format!(
            "Cannot replace content from {}",
            doc.status
        )));
    }
    if actor_id != doc.author_id {
        return Err(WorkflowError::Authorization {
            actor: actor_id.to_string(),
            reason: "only the author may upload a revision".to_string(),
        });
    }

    doc.content = new_content;
    doc.content_hash = None;
    doc.placements.clear();
    doc.log
        .append(actor_id, ActionType::UploadRevision, None, None);
    doc.touch();
    Ok(())
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::chain::{ReviewerChain, FINAL_APPROVER_ORDER};
    use proptest::prelude::*;

    fn doc_with_reviewers(n: usize) -> Document {
        let mut chain = ReviewerChain::default();
        for i in 0..n {
            chain
                .insert(ReviewerStep::new(&format!("reviewer-{}", i), (i + 1) as u32))
                .unwrap();
        }
        chain
            .insert(ReviewerStep::new("approver", FINAL_APPROVER_ORDER))
            .unwrap();
        Document::new(
            "author",
            ContentSource::Body {
                html: "<p>letter</p>".into(),
            },
            chain,
        )
        .unwrap()
    }

    proptest! {
        /// Property: after each approval, `next_actor_id` equals the actor
        /// of the lowest-order remaining pending step, and becomes None only
        /// once the final approver resolves.
        #[test]
        fn next_actor_tracks_lowest_pending(reviewers in 1usize..5) {
            let mut doc = doc_with_reviewers(reviewers);
            submit(&mut doc, "author").unwrap();

            for i in 0..reviewers {
                let expected = format!("reviewer-{}", i);
                prop_assert_eq!(doc.next_actor_id.as_deref(), Some(expected.as_str()));
                approve_review(&mut doc, &expected, "ok").unwrap();
            }

            prop_assert_eq!(doc.status, WorkflowStatus::PendingApproval);
            prop_assert_eq!(doc.next_actor_id.as_deref(), Some("approver"));
            prop_assert_eq!(
                doc.chain.current_pending().map(|s| s.sequence_order),
                Some(FINAL_APPROVER_ORDER)
            );
        }

        /// Property: the derived next actor is always consistent with the
        /// resolution rule, whatever mix of approvals and rejections runs.
        #[test]
        fn next_actor_always_consistent(
            reviewers in 1usize..5,
            reject_at in proptest::option::of(0usize..5),
        ) {
            let mut doc = doc_with_reviewers(reviewers);
            submit(&mut doc, "author").unwrap();
            prop_assert_eq!(doc.resolve_next_actor(), doc.next_actor_id.clone());

            for i in 0..reviewers {
                let actor = format!("reviewer-{}", i);
                if reject_at == Some(i) {
                    reject_review(&mut doc, &actor, "no").unwrap();
                    break;
                }
                approve_review(&mut doc, &actor, "ok").unwrap();
                prop_assert_eq!(doc.resolve_next_actor(), doc.next_actor_id.clone());
            }

            prop_assert_eq!(doc.resolve_next_actor(), doc.next_actor_id.clone());
            prop_assert!(doc.log.verify().is_ok());
        }
    }
}

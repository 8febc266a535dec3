use serde::{Deserialize, Serialize};

/// Coarse-grained lifecycle stage of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    Draft,
    PendingReview,
    PendingApproval,
    Approved,
    Rejected,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Draft => "DRAFT",
            WorkflowStatus::PendingReview => "PENDING_REVIEW",
            WorkflowStatus::PendingApproval => "PENDING_APPROVAL",
            WorkflowStatus::Approved => "APPROVED",
            WorkflowStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DRAFT" => Some(WorkflowStatus::Draft),
            "PENDING_REVIEW" => Some(WorkflowStatus::PendingReview),
            "PENDING_APPROVAL" => Some(WorkflowStatus::PendingApproval),
            "APPROVED" => Some(WorkflowStatus::Approved),
            "REJECTED" => Some(WorkflowStatus::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

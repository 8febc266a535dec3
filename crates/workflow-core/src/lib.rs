//! Document approval workflow core
//!
//! The state machine that moves a document from draft to a final,
//! legally-meaningful state through an ordered chain of reviewers and a
//! single final approver, with an append-only, hash-chained action log.
//!
//! Transitions are pure mutations over a [`Document`]; persistence and
//! per-document serialization belong to the caller.

pub mod chain;
pub mod document;
pub mod error;
pub mod log;
pub mod machine;
pub mod status;

pub use chain::{ChainPolicy, ReviewerChain, ReviewerStep, StepStatus, FINAL_APPROVER_ORDER};
pub use document::{ContentSource, Document};
pub use error::WorkflowError;
pub use log::{ActionLog, ActionLogEntry, ActionType};
pub use machine::{Composition, Compositor};
pub use status::WorkflowStatus;

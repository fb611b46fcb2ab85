//! Handlers for the two recognized event shapes.

pub mod assign;
pub mod join;

pub use assign::{AssignmentHandler, Forwarded, ISSUE_ASSIGNED, IssueAssigned};
pub use join::{JoinHandler, WORKER_JOINED, WorkerJoined};

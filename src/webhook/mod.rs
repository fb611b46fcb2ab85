//! Inbound webhook handling: signature checks, payload probes, classification.

pub mod classify;
pub mod payload;
pub mod signature;

pub use classify::{
    AssignmentCandidate, Classification, IssueRef, JOIN_MARKER, JoinDeclaration, classify,
    parse_join_comment,
};
pub use payload::InboundEvent;
pub use signature::{signature_header, verify};

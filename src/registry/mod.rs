//! Persistent registry of known workers.

pub mod model;
pub mod store;

pub use model::{
    ROLE_WORKER, RegistryFile, SOURCE_LINEAR_JOIN, WorkerRecord, WorkerUpsert, normalize_email,
};
pub use store::{UpsertOutcome, WorkerRegistry};

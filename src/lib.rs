//! Apex relay: tracker webhook ingestion and worker dispatch.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod notify;
pub mod registry;
pub mod server;
pub mod storage;
pub mod webhook;

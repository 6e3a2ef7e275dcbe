//! Shared types for the order node cluster
//!
//! Protocol types exchanged between nodes (operation log entries, liveness
//! rows, sync/ping/replicate bodies) and the unified error system used by
//! every HTTP surface.

pub mod error;
pub mod replication;
pub mod util;

pub use replication::{NodeLiveness, NodeStatus, Operation, OperationLogEntry};

//! Domain layer - entities, rules and the traits the automation core depends on

pub mod error;
pub mod lead;
pub mod messaging;
pub mod storage;
pub mod task;
pub mod webhook;
pub mod workflow;

pub use error::DomainError;
pub use storage::{Storage, StorageEntity, StorageKey};

//! Workflow infrastructure implementations

mod dispatcher;
mod engine;
mod storage_repository;
mod tracker;

pub use dispatcher::ActionDispatcherImpl;
pub use engine::{WorkflowEngineConfig, WorkflowEngineImpl};
pub use storage_repository::{StorageWorkflowExecutionRepository, StorageWorkflowRuleRepository};
pub use tracker::ExecutionTracker;

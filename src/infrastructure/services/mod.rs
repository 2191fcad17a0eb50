//! Infrastructure services

mod workflow_service;

pub use workflow_service::{
    CreateRuleRequest, LeadEventSummary, RuleRun, UpdateRuleRequest, WorkflowService,
    WorkflowServiceTrait,
};

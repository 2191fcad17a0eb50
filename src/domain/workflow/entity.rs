//! Workflow rule entity

use std::fmt;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::action::Action;
use super::condition::{coerce_number, Condition, ConditionOperator};
use super::error::WorkflowError;
use crate::domain::storage::{StorageEntity, StorageKey};

/// Maximum length for rule IDs
pub const MAX_ID_LENGTH: usize = 50;

static ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9]$|^[a-zA-Z0-9]$").unwrap());

/// Validated rule identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RuleId(String);

impl RuleId {
    pub fn new(id: impl Into<String>) -> Result<Self, WorkflowError> {
        let id = id.into();
        validate_rule_id(&id)?;
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RuleId {
    type Error = WorkflowError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RuleId> for String {
    fn from(id: RuleId) -> Self {
        id.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StorageKey for RuleId {
    fn as_str(&self) -> &str {
        &self.0
    }
}

/// Validate a rule ID string: alphanumeric with inner hyphens
pub fn validate_rule_id(id: &str) -> Result<(), WorkflowError> {
    if id.is_empty() {
        return Err(WorkflowError::validation("Rule ID cannot be empty"));
    }

    if id.len() > MAX_ID_LENGTH {
        return Err(WorkflowError::validation(format!(
            "Rule ID exceeds maximum length of {} characters",
            MAX_ID_LENGTH
        )));
    }

    if !ID_PATTERN.is_match(id) {
        return Err(WorkflowError::validation(format!(
            "Invalid rule ID '{}': must be alphanumeric with hyphens, start and end with alphanumeric",
            id
        )));
    }

    Ok(())
}

/// An operator-defined automation rule: when every condition holds, run the actions in order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRule {
    id: RuleId,

    name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,

    /// Lead event this rule reacts to during event fan-out
    #[serde(default, skip_serializing_if = "Option::is_none")]
    trigger_event: Option<String>,

    /// Conjunction of conditions
    #[serde(default)]
    conditions: Vec<Condition>,

    /// Ordered actions
    #[serde(default)]
    actions: Vec<Action>,

    is_active: bool,

    created_at: DateTime<Utc>,

    updated_at: DateTime<Utc>,
}

impl WorkflowRule {
    pub fn new(id: RuleId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            description: None,
            trigger_event: None,
            conditions: Vec::new(),
            actions: Vec::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    // Builder methods

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_trigger_event(mut self, event: impl Into<String>) -> Self {
        self.trigger_event = Some(event.into());
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_conditions(mut self, conditions: Vec<Condition>) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_actions(mut self, actions: Vec<Action>) -> Self {
        self.actions = actions;
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }

    // Getters

    pub fn id(&self) -> &RuleId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn trigger_event(&self) -> Option<&str> {
        self.trigger_event.as_deref()
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Whether this rule should run for the given lead event
    pub fn is_triggered_by(&self, event_type: &str) -> bool {
        self.is_active && self.trigger_event.as_deref() == Some(event_type)
    }

    // Setters (mutate and update timestamp)

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.touch();
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description;
        self.touch();
    }

    pub fn set_trigger_event(&mut self, event: Option<String>) {
        self.trigger_event = event;
        self.touch();
    }

    pub fn set_conditions(&mut self, conditions: Vec<Condition>) {
        self.conditions = conditions;
        self.touch();
    }

    pub fn set_actions(&mut self, actions: Vec<Action>) {
        self.actions = actions;
        self.touch();
    }

    pub fn set_active(&mut self, active: bool) {
        self.is_active = active;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Save-time validation of the rule definition
    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.name.trim().is_empty() {
            return Err(WorkflowError::validation("Rule name cannot be empty"));
        }

        for condition in &self.conditions {
            validate_condition(condition)?;
        }

        for action in &self.actions {
            action.validate()?;
        }

        Ok(())
    }
}

fn validate_condition(condition: &Condition) -> Result<(), WorkflowError> {
    if condition.field.trim().is_empty() {
        return Err(WorkflowError::validation("Condition field cannot be empty"));
    }

    match condition.operator {
        ConditionOperator::Unknown => Err(WorkflowError::validation(format!(
            "Unknown operator on condition for field '{}'",
            condition.field
        ))),
        ConditionOperator::In | ConditionOperator::NotIn if !condition.value.is_array() => {
            Err(WorkflowError::validation(format!(
                "Condition on '{}' requires an array value",
                condition.field
            )))
        }
        ConditionOperator::GreaterThan | ConditionOperator::LessThan
            if coerce_number(&condition.value).is_none() =>
        {
            Err(WorkflowError::validation(format!(
                "Condition on '{}' requires a numeric value",
                condition.field
            )))
        }
        _ => Ok(()),
    }
}

impl StorageEntity for WorkflowRule {
    type Key = RuleId;

    fn key(&self) -> &Self::Key {
        &self.id
    }
}

//! Typed workflow actions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::WorkflowError;
use crate::domain::task::TaskPriority;

/// Wire shape of an action: `{"type": "...", "parameters": {...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawAction {
    #[serde(rename = "type")]
    action_type: String,
    #[serde(default)]
    parameters: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AssignAgentParams {
    #[serde(default)]
    pub agent_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SendEmailParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UpdateStatusParams {
    #[serde(default)]
    pub status: String,
}

/// Parameters shared by `create_task` and `create_reminder`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FollowUpParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    /// Reminder kind (call, email, meeting); ignored for plain tasks
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub reminder_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SendWebhookParams {
    #[serde(default)]
    pub webhook_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

/// An action dispatched when a rule's conditions match
///
/// Any type string outside the known set loads as `Unknown` and fails at
/// dispatch with "Unknown action type".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawAction", into = "RawAction")]
pub enum Action {
    AssignAgent(AssignAgentParams),
    SendEmail(SendEmailParams),
    CreateTask(FollowUpParams),
    UpdateStatus(UpdateStatusParams),
    CreateReminder(FollowUpParams),
    SendWebhook(SendWebhookParams),
    Unknown { action_type: String, parameters: Value },
}

impl Action {
    pub fn type_name(&self) -> &str {
        match self {
            Self::AssignAgent(_) => "assign_agent",
            Self::SendEmail(_) => "send_email",
            Self::CreateTask(_) => "create_task",
            Self::UpdateStatus(_) => "update_status",
            Self::CreateReminder(_) => "create_reminder",
            Self::SendWebhook(_) => "send_webhook",
            Self::Unknown { action_type, .. } => action_type,
        }
    }

    /// Save-time checks; a rule with an invalid action is rejected before it is stored
    pub fn validate(&self) -> Result<(), WorkflowError> {
        match self {
            Self::AssignAgent(p) if p.agent_id.trim().is_empty() => Err(WorkflowError::validation(
                "assign_agent requires a non-empty agent_id",
            )),
            Self::UpdateStatus(p) if p.status.trim().is_empty() => Err(WorkflowError::validation(
                "update_status requires a non-empty status",
            )),
            Self::SendWebhook(p) if p.webhook_id.trim().is_empty() => Err(
                WorkflowError::validation("send_webhook requires a non-empty webhook_id"),
            ),
            Self::CreateTask(p) | Self::CreateReminder(p) => match p.priority.as_deref() {
                Some(priority) if TaskPriority::parse(priority).is_none() => {
                    Err(WorkflowError::validation(format!(
                        "Invalid priority '{}' for {}",
                        priority,
                        self.type_name()
                    )))
                }
                _ => Ok(()),
            },
            Self::Unknown { action_type, .. } => Err(WorkflowError::validation(format!(
                "Unknown action type '{}'",
                action_type
            ))),
            _ => Ok(()),
        }
    }
}

fn parameters<T: serde::de::DeserializeOwned>(
    action_type: &str,
    parameters: Value,
) -> Result<T, WorkflowError> {
    let parameters = if parameters.is_null() {
        Value::Object(Default::default())
    } else {
        parameters
    };

    serde_json::from_value(parameters).map_err(|e| {
        WorkflowError::validation(format!("Invalid parameters for {}: {}", action_type, e))
    })
}

impl TryFrom<RawAction> for Action {
    type Error = WorkflowError;

    fn try_from(raw: RawAction) -> Result<Self, Self::Error> {
        let RawAction {
            action_type,
            parameters: params,
        } = raw;

        Ok(match action_type.as_str() {
            "assign_agent" => Self::AssignAgent(parameters(&action_type, params)?),
            "send_email" => Self::SendEmail(parameters(&action_type, params)?),
            "create_task" => Self::CreateTask(parameters(&action_type, params)?),
            "update_status" => Self::UpdateStatus(parameters(&action_type, params)?),
            "create_reminder" => Self::CreateReminder(parameters(&action_type, params)?),
            "send_webhook" => Self::SendWebhook(parameters(&action_type, params)?),
            _ => Self::Unknown {
                action_type,
                parameters: params,
            },
        })
    }
}

impl From<Action> for RawAction {
    fn from(action: Action) -> Self {
        let action_type = action.type_name().to_string();
        let parameters = match action {
            Action::AssignAgent(p) => serde_json::to_value(p),
            Action::SendEmail(p) => serde_json::to_value(p),
            Action::CreateTask(p) | Action::CreateReminder(p) => serde_json::to_value(p),
            Action::UpdateStatus(p) => serde_json::to_value(p),
            Action::SendWebhook(p) => serde_json::to_value(p),
            Action::Unknown { parameters, .. } => Ok(parameters),
        };

        Self {
            action_type,
            parameters: parameters.unwrap_or(Value::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_known_actions() {
        let action: Action = serde_json::from_value(json!({
            "type": "assign_agent",
            "parameters": {"agent_id": "agent-7"}
        }))
        .unwrap();
        assert_eq!(
            action,
            Action::AssignAgent(AssignAgentParams {
                agent_id: "agent-7".to_string()
            })
        );

        let action: Action = serde_json::from_value(json!({
            "type": "create_reminder",
            "parameters": {"type": "meeting", "priority": "high"}
        }))
        .unwrap();
        match action {
            Action::CreateReminder(p) => {
                assert_eq!(p.reminder_type.as_deref(), Some("meeting"));
                assert_eq!(p.priority.as_deref(), Some("high"));
            }
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[test]
    fn test_missing_parameters_use_defaults() {
        let action: Action = serde_json::from_value(json!({"type": "send_email"})).unwrap();
        assert_eq!(action, Action::SendEmail(SendEmailParams::default()));
    }

    #[test]
    fn test_unknown_type_is_preserved() {
        let action: Action = serde_json::from_value(json!({
            "type": "send_sms",
            "parameters": {"to": "+100"}
        }))
        .unwrap();

        assert_eq!(action.type_name(), "send_sms");
        assert!(action.validate().is_err());

        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value, json!({"type": "send_sms", "parameters": {"to": "+100"}}));
    }

    #[test]
    fn test_serializes_tagged_shape() {
        let action = Action::UpdateStatus(UpdateStatusParams {
            status: "contacted".to_string(),
        });
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({"type": "update_status", "parameters": {"status": "contacted"}})
        );
    }

    #[test]
    fn test_validate() {
        assert!(Action::AssignAgent(AssignAgentParams::default()).validate().is_err());
        assert!(Action::UpdateStatus(UpdateStatusParams::default()).validate().is_err());
        assert!(Action::SendWebhook(SendWebhookParams::default()).validate().is_err());
        assert!(Action::SendEmail(SendEmailParams::default()).validate().is_ok());

        let bad_priority = Action::CreateTask(FollowUpParams {
            priority: Some("someday".to_string()),
            ..FollowUpParams::default()
        });
        assert!(bad_priority.validate().is_err());
        assert!(Action::CreateTask(FollowUpParams::default()).validate().is_ok());
    }
}

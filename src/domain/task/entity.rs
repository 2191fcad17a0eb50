//! Follow-up tasks and reminders created by workflow actions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::lead::LeadId;
use crate::domain::storage::{StorageEntity, StorageKey};

/// Unique identifier for a task
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(String);

impl TaskId {
    pub fn generate() -> Self {
        Self(format!("task-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StorageKey for TaskId {
    fn as_str(&self) -> &str {
        &self.0
    }
}

impl StorageEntity for FollowUpTask {
    type Key = TaskId;

    fn key(&self) -> &Self::Key {
        &self.id
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "urgent" => Some(Self::Urgent),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

/// Whether this is a plain task or a typed reminder (call, email, meeting, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskKind {
    Task,
    Reminder { reminder_type: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
    Cancelled,
}

/// A follow-up task or reminder attached to a lead
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUpTask {
    pub id: TaskId,
    pub lead_id: LeadId,
    #[serde(flatten)]
    pub kind: TaskKind,
    pub assigned_to: String,
    pub created_by: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub due_date: DateTime<Utc>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
}

impl FollowUpTask {
    pub fn new(
        lead_id: LeadId,
        kind: TaskKind,
        title: impl Into<String>,
        assigned_to: impl Into<String>,
        created_by: impl Into<String>,
        due_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TaskId::generate(),
            lead_id,
            kind,
            assigned_to: assigned_to.into(),
            created_by: created_by.into(),
            title: title.into(),
            description: None,
            due_date,
            priority: TaskPriority::default(),
            status: TaskStatus::default(),
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn reminder_type(&self) -> Option<&str> {
        match &self.kind {
            TaskKind::Reminder { reminder_type } => Some(reminder_type),
            TaskKind::Task => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_priority_parse() {
        assert_eq!(TaskPriority::parse("HIGH"), Some(TaskPriority::High));
        assert_eq!(TaskPriority::parse("medium"), Some(TaskPriority::Medium));
        assert_eq!(TaskPriority::parse("whenever"), None);
        assert_eq!(TaskPriority::default().as_str(), "medium");
    }

    #[test]
    fn test_reminder_serializes_kind_inline() {
        let task = FollowUpTask::new(
            LeadId::new("lead-1"),
            TaskKind::Reminder {
                reminder_type: "call".to_string(),
            },
            "Call back",
            "agent-1",
            "user-1",
            Utc::now(),
        );

        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["kind"], json!("reminder"));
        assert_eq!(value["reminder_type"], json!("call"));
        assert_eq!(value["priority"], json!("medium"));
        assert_eq!(task.reminder_type(), Some("call"));
    }
}

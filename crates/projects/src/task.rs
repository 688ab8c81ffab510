use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use oneflow_core::{Entity, FieldErrors, ProjectScoped, RecordId, merge_patch, wire};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    #[serde(alias = "new")]
    Todo,
    InProgress,
    InReview,
    Done,
}

/// Task priority.
///
/// Reads either the label (`"high"`) or the numeric scale used by reporting
/// endpoints, where 1 is the most urgent and 5 the least.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    fn from_level(level: i64) -> Self {
        match level {
            i64::MIN..=2 => TaskPriority::High,
            3 => TaskPriority::Medium,
            _ => TaskPriority::Low,
        }
    }
}

impl<'de> Deserialize<'de> for TaskPriority {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Label(String),
            Level(i64),
        }

        match Option::<Raw>::deserialize(deserializer)? {
            None => Ok(TaskPriority::default()),
            Some(Raw::Level(n)) => Ok(TaskPriority::from_level(n)),
            Some(Raw::Label(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "low" => Ok(TaskPriority::Low),
                "" | "medium" => Ok(TaskPriority::Medium),
                "high" | "urgent" => Ok(TaskPriority::High),
                other => other
                    .parse::<i64>()
                    .map(TaskPriority::from_level)
                    .map_err(|_| serde::de::Error::custom(format!("unknown priority '{s}'"))),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: RecordId,
    /// Owning project; read endpoints nest it as an object.
    #[serde(rename = "project", alias = "project_id", default, deserialize_with = "wire::optional_id")]
    pub project_id: Option<RecordId>,
    #[serde(default, deserialize_with = "wire::lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "wire::lenient_string")]
    pub description: String,
    #[serde(default, deserialize_with = "wire::enum_or_default")]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default, deserialize_with = "wire::optional_id")]
    pub assignee: Option<RecordId>,
    #[serde(default, deserialize_with = "wire::optional_date")]
    pub due_date: Option<NaiveDate>,
}

impl Task {
    pub fn is_open(&self) -> bool {
        self.status != TaskStatus::Done
    }
}

/// Payload for creating a task (`project_id` / `assignee_id` are write-only keys).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<RecordId>,
    pub name: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    #[serde(rename = "assignee_id", skip_serializing_if = "Option::is_none")]
    pub assignee: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

impl TaskDraft {
    pub fn new(project_id: impl Into<RecordId>, name: impl Into<String>) -> Self {
        Self {
            project_id: Some(project_id.into()),
            name: name.into(),
            description: String::new(),
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            assignee: None,
            due_date: None,
        }
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn assigned_to(mut self, user: impl Into<RecordId>) -> Self {
        self.assignee = Some(user.into());
        self
    }

    pub fn due(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(rename = "assignee_id", skip_serializing_if = "Option::is_none")]
    pub assignee: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

impl Entity for Task {
    type Draft = TaskDraft;
    type Patch = TaskPatch;

    const RESOURCE: &'static str = "tasks";

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn from_draft(id: RecordId, draft: &Self::Draft) -> Self {
        Self {
            id,
            project_id: draft.project_id.clone(),
            name: draft.name.clone(),
            description: draft.description.clone(),
            status: draft.status,
            priority: draft.priority,
            assignee: draft.assignee.clone(),
            due_date: draft.due_date,
        }
    }

    fn apply_patch(&mut self, patch: &Self::Patch) {
        merge_patch!(
            self,
            patch,
            [name, description, status, priority],
            optional [assignee, due_date]
        );
    }

    fn validate_draft(draft: &Self::Draft) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.require("name", &draft.name, "Task name is required");
        match &draft.project_id {
            Some(id) if !id.as_str().trim().is_empty() => {}
            _ => errors.add("project_id", "Project is required"),
        }
        errors.into_result()
    }
}

impl ProjectScoped for Task {
    fn project_id(&self) -> Option<&RecordId> {
        self.project_id.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_project_and_numeric_priority() {
        let t: Task = serde_json::from_value(json!({
            "id": 10,
            "name": "Wireframes",
            "project": { "id": 1, "name": "Website" },
            "assignee": 7,
            "status": "new",
            "priority": 1
        }))
        .unwrap();

        assert_eq!(t.project_id(), Some(&RecordId::from("1")));
        assert_eq!(t.assignee, Some(RecordId::from("7")));
        assert_eq!(t.status, TaskStatus::Todo);
        assert_eq!(t.priority, TaskPriority::High);
    }

    #[test]
    fn priority_scale() {
        let read = |v| serde_json::from_value::<TaskPriority>(v).unwrap();
        assert_eq!(read(json!(3)), TaskPriority::Medium);
        assert_eq!(read(json!(5)), TaskPriority::Low);
        assert_eq!(read(json!("High")), TaskPriority::High);
        assert_eq!(read(json!("4")), TaskPriority::Low);
        assert!(serde_json::from_value::<TaskPriority>(json!("someday")).is_err());
    }

    #[test]
    fn cached_task_round_trips_through_its_own_schema() {
        let task = Task::from_draft(
            RecordId::from("4"),
            &TaskDraft::new("1", "Deploy").with_priority(TaskPriority::Low),
        );
        let back: Task = serde_json::from_value(serde_json::to_value(&task).unwrap()).unwrap();
        assert_eq!(back, task);
    }

    #[test]
    fn draft_uses_write_only_keys() {
        let body = serde_json::to_value(TaskDraft::new("1", "Deploy").assigned_to("7")).unwrap();
        assert_eq!(body["project_id"], json!("1"));
        assert_eq!(body["assignee_id"], json!("7"));
        assert_eq!(body["priority"], json!("medium"));
    }

    #[test]
    fn validation_requires_project_and_name() {
        let mut draft = TaskDraft::new("1", "");
        draft.project_id = None;
        let errors = Task::validate_draft(&draft).unwrap_err();
        assert!(errors.get("name").is_some());
        assert!(errors.get("project_id").is_some());
    }

    #[test]
    fn patch_moves_task_through_review() {
        let mut t = Task::from_draft(RecordId::from("2"), &TaskDraft::new("1", "QA"));
        t.apply_patch(&TaskPatch::status(TaskStatus::InReview));
        assert!(t.is_open());
        t.apply_patch(&TaskPatch::status(TaskStatus::Done));
        assert!(!t.is_open());
    }
}

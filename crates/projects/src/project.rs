use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use oneflow_core::{Entity, FieldErrors, RecordId, merge_patch, wire};

/// Project lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    #[serde(alias = "planned", alias = "draft")]
    Planning,
    InProgress,
    Completed,
    OnHold,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: RecordId,
    #[serde(default, deserialize_with = "wire::lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "wire::lenient_string")]
    pub description: String,
    #[serde(default, deserialize_with = "wire::optional_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "wire::optional_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "wire::enum_or_default")]
    pub status: ProjectStatus,
    #[serde(default, deserialize_with = "wire::optional_id")]
    pub manager: Option<RecordId>,
    #[serde(default, deserialize_with = "wire::id_list")]
    pub team: Vec<RecordId>,
}

impl Project {
    pub fn is_active(&self) -> bool {
        matches!(self.status, ProjectStatus::Planning | ProjectStatus::InProgress)
    }

    /// Past its end date without being completed.
    pub fn is_late(&self, today: NaiveDate) -> bool {
        self.status != ProjectStatus::Completed && self.end_date.is_some_and(|end| end < today)
    }
}

/// Payload for creating a project. Manager and team go out as write-only
/// `manager_id` / `team_ids`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectDraft {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    pub status: ProjectStatus,
    #[serde(rename = "manager_id", skip_serializing_if = "Option::is_none")]
    pub manager: Option<RecordId>,
    #[serde(rename = "team_ids", skip_serializing_if = "Vec::is_empty")]
    pub team: Vec<RecordId>,
}

impl ProjectDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            start_date: None,
            end_date: None,
            status: ProjectStatus::Planning,
            manager: None,
            team: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn scheduled(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn managed_by(mut self, manager: impl Into<RecordId>) -> Self {
        self.manager = Some(manager.into());
        self
    }

    pub fn with_team(mut self, team: Vec<RecordId>) -> Self {
        self.team = team;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    #[serde(rename = "manager_id", skip_serializing_if = "Option::is_none")]
    pub manager: Option<RecordId>,
}

impl ProjectPatch {
    pub fn status(status: ProjectStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

impl Entity for Project {
    type Draft = ProjectDraft;
    type Patch = ProjectPatch;

    const RESOURCE: &'static str = "projects";

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn from_draft(id: RecordId, draft: &Self::Draft) -> Self {
        Self {
            id,
            name: draft.name.clone(),
            description: draft.description.clone(),
            start_date: draft.start_date,
            end_date: draft.end_date,
            status: draft.status,
            manager: draft.manager.clone(),
            team: draft.team.clone(),
        }
    }

    fn apply_patch(&mut self, patch: &Self::Patch) {
        merge_patch!(
            self,
            patch,
            [name, description, status],
            optional [start_date, end_date, manager]
        );
    }

    fn validate_draft(draft: &Self::Draft) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.require("name", &draft.name, "Project name is required");
        if let (Some(start), Some(end)) = (draft.start_date, draft.end_date) {
            if end < start {
                errors.add("end_date", "End date must not precede the start date");
            }
        }
        errors.into_result()
    }
}

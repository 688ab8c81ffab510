//! Projects and the tasks planned under them.

pub mod project;
pub mod task;

pub use project::{Project, ProjectDraft, ProjectPatch, ProjectStatus};
pub use task::{Task, TaskDraft, TaskPatch, TaskPriority, TaskStatus};

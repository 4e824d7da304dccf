use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::Lesson;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ProgressStatus {
    Completed,
}

/// One row per (user, lesson). A missing row means "not completed".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct LessonProgress {
    pub user_id: String,
    pub lesson_id: String,
    pub status: ProgressStatus,
    pub completed_at: String,
}

impl LessonProgress {
    pub fn is_completed(&self) -> bool {
        self.status == ProgressStatus::Completed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LessonView {
    pub lesson: Lesson,
    pub is_completed: bool,
}

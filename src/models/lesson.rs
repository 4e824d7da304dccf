use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A group of lessons inside a course. `order_index` is unique per course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CourseModule {
    pub id: String,
    pub course_id: String,
    pub title: String,
    pub order_index: i64,
}

/// `order_index` is unique within the parent module only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Lesson {
    pub id: String,
    pub module_id: String,
    pub title: String,
    pub order_index: i64,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewModuleRequest {
    pub course_id: String,
    pub title: String,
    pub order_index: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLessonRequest {
    pub module_id: String,
    pub title: String,
    pub order_index: i64,
    #[serde(default)]
    pub content: String,
}

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::{
    Course, CourseModule, EnrolledCourse, Enrollment, EnrollmentStatus, Lesson, LessonProgress,
    NewCourseRequest, NewLessonRequest, NewModuleRequest,
};

/// Relational store holding courses, enrollments and lesson progress.
///
/// `insert_enrollment` must report a (user, course) key collision as
/// [`AppError::Conflict`] and nothing else as `Conflict`.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn insert_enrollment(
        &self,
        user_id: &str,
        course_id: &str,
        status: EnrollmentStatus,
    ) -> Result<(), AppError>;

    async fn fetch_enrollment(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<Option<Enrollment>, AppError>;

    /// Sets `to` only where the stored status is still `from`. Returns
    /// whether a row changed.
    async fn transition_enrollment(
        &self,
        user_id: &str,
        course_id: &str,
        from: EnrollmentStatus,
        to: EnrollmentStatus,
    ) -> Result<bool, AppError>;

    /// Ordered by `order_index` ascending.
    async fn fetch_modules(&self, course_id: &str) -> Result<Vec<CourseModule>, AppError>;

    /// Ordered by `order_index` ascending.
    async fn fetch_lessons(&self, module_ids: &[String]) -> Result<Vec<Lesson>, AppError>;

    async fn fetch_completed_lesson_ids(
        &self,
        user_id: &str,
        lesson_ids: &[String],
    ) -> Result<HashSet<String>, AppError>;

    /// Keyed on (user, lesson) and stamped with the current time; a repeat
    /// call only refreshes `completed_at`.
    async fn upsert_lesson_progress(
        &self,
        user_id: &str,
        lesson_id: &str,
    ) -> Result<LessonProgress, AppError>;

    async fn fetch_lesson_progress(
        &self,
        user_id: &str,
        lesson_id: &str,
    ) -> Result<Option<LessonProgress>, AppError>;

    async fn fetch_enrolled_courses(&self, user_id: &str) -> Result<Vec<EnrolledCourse>, AppError>;

    /// Ordered by creation time ascending.
    async fn fetch_courses(&self) -> Result<Vec<Course>, AppError>;

    async fn find_course(&self, course_id: &str) -> Result<Option<Course>, AppError>;

    async fn find_module(&self, module_id: &str) -> Result<Option<CourseModule>, AppError>;

    async fn find_lesson(&self, lesson_id: &str) -> Result<Option<Lesson>, AppError>;

    async fn insert_course(&self, req: NewCourseRequest) -> Result<Course, AppError>;

    async fn insert_module(&self, req: NewModuleRequest) -> Result<CourseModule, AppError>;

    async fn insert_lesson(&self, req: NewLessonRequest) -> Result<Lesson, AppError>;
}

pub mod repository;

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::error;

use crate::error::AppError;
use crate::models::{
    Course, CourseModule, EnrolledCourse, Enrollment, EnrollmentStatus, Lesson, LessonProgress,
    NewCourseRequest, NewLessonRequest, NewModuleRequest,
};
use crate::store::ProgressStore;

/// Opens a pool and applies the bundled migrations.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, AppError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        // in-memory databases live only as long as their connection
        .idle_timeout(None)
        .max_lifetime(None)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

#[derive(Clone)]
pub struct SqliteStore {
    db: SqlitePool,
}

impl SqliteStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProgressStore for SqliteStore {
    async fn insert_enrollment(
        &self,
        user_id: &str,
        course_id: &str,
        status: EnrollmentStatus,
    ) -> Result<(), AppError> {
        repository::insert_enrollment(&self.db, user_id, course_id, status).await?;
        Ok(())
    }

    async fn fetch_enrollment(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<Option<Enrollment>, AppError> {
        Ok(repository::find_enrollment(&self.db, user_id, course_id).await?)
    }

    async fn transition_enrollment(
        &self,
        user_id: &str,
        course_id: &str,
        from: EnrollmentStatus,
        to: EnrollmentStatus,
    ) -> Result<bool, AppError> {
        Ok(repository::transition_enrollment(&self.db, user_id, course_id, from, to).await?)
    }

    async fn fetch_modules(&self, course_id: &str) -> Result<Vec<CourseModule>, AppError> {
        Ok(repository::fetch_modules(&self.db, course_id).await?)
    }

    async fn fetch_lessons(&self, module_ids: &[String]) -> Result<Vec<Lesson>, AppError> {
        Ok(repository::fetch_lessons(&self.db, module_ids).await?)
    }

    async fn fetch_completed_lesson_ids(
        &self,
        user_id: &str,
        lesson_ids: &[String],
    ) -> Result<HashSet<String>, AppError> {
        Ok(repository::fetch_completed_lesson_ids(&self.db, user_id, lesson_ids).await?)
    }

    async fn upsert_lesson_progress(
        &self,
        user_id: &str,
        lesson_id: &str,
    ) -> Result<LessonProgress, AppError> {
        let completed_at = repository::now_timestamp();
        repository::upsert_lesson_progress(&self.db, user_id, lesson_id, &completed_at)
            .await?
            .ok_or_else(|| {
                error!("lesson_progress row for {}/{} missing after upsert", user_id, lesson_id);
                AppError::InternalServerError
            })
    }

    async fn fetch_lesson_progress(
        &self,
        user_id: &str,
        lesson_id: &str,
    ) -> Result<Option<LessonProgress>, AppError> {
        Ok(repository::find_lesson_progress(&self.db, user_id, lesson_id).await?)
    }

    async fn fetch_enrolled_courses(&self, user_id: &str) -> Result<Vec<EnrolledCourse>, AppError> {
        Ok(repository::fetch_enrolled_courses(&self.db, user_id).await?)
    }

    async fn fetch_courses(&self) -> Result<Vec<Course>, AppError> {
        Ok(repository::fetch_courses(&self.db).await?)
    }

    async fn find_course(&self, course_id: &str) -> Result<Option<Course>, AppError> {
        Ok(repository::find_course_by_id(&self.db, course_id).await?)
    }

    async fn find_module(&self, module_id: &str) -> Result<Option<CourseModule>, AppError> {
        Ok(repository::find_module_by_id(&self.db, module_id).await?)
    }

    async fn find_lesson(&self, lesson_id: &str) -> Result<Option<Lesson>, AppError> {
        Ok(repository::find_lesson_by_id(&self.db, lesson_id).await?)
    }

    async fn insert_course(&self, req: NewCourseRequest) -> Result<Course, AppError> {
        Ok(repository::insert_course(&self.db, req).await?)
    }

    async fn insert_module(&self, req: NewModuleRequest) -> Result<CourseModule, AppError> {
        Ok(repository::insert_module(&self.db, req).await?)
    }

    async fn insert_lesson(&self, req: NewLessonRequest) -> Result<Lesson, AppError> {
        Ok(repository::insert_lesson(&self.db, req).await?)
    }
}

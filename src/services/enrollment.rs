use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::CompletionPolicy;
use crate::error::AppError;
use crate::models::{Enrollment, EnrollmentStatus};
use crate::services::NextLessonResolver;
use crate::services::progress::complete_course_if_finished;
use crate::store::ProgressStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollOutcome {
    Enrolled,
    AlreadyEnrolled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartOutcome {
    pub status: EnrollmentStatus,
    pub next_lesson_id: Option<String>,
}

/// Drives an enrollment through
/// `not_started -> ongoing -> completed -> certified`.
pub struct EnrollmentService {
    store: Arc<dyn ProgressStore>,
    policy: CompletionPolicy,
}

impl EnrollmentService {
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self {
            store,
            policy: CompletionPolicy::default(),
        }
    }

    pub fn with_completion_policy(mut self, policy: CompletionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Idempotent per (user, course): a second call reports
    /// `AlreadyEnrolled` and leaves the existing record alone.
    pub async fn enroll(&self, user_id: &str, course_id: &str) -> Result<EnrollOutcome, AppError> {
        if self.store.find_course(course_id).await?.is_none() {
            return Err(AppError::NotFound);
        }

        match self
            .store
            .insert_enrollment(user_id, course_id, EnrollmentStatus::NotStarted)
            .await
        {
            Ok(()) => {
                info!("user {} enrolled in course {}", user_id, course_id);
                Ok(EnrollOutcome::Enrolled)
            }
            Err(AppError::Conflict(_)) => Ok(EnrollOutcome::AlreadyEnrolled),
            Err(e) => Err(e),
        }
    }

    /// Moves a `not_started` enrollment to `ongoing` and resolves the lesson
    /// to open. Other statuses are left unchanged. Under
    /// [`CompletionPolicy::Derived`] a learner who already finished every
    /// lesson goes straight on to `completed`.
    pub async fn start(&self, user_id: &str, course_id: &str) -> Result<StartOutcome, AppError> {
        let enrollment = self
            .store
            .fetch_enrollment(user_id, course_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let status = if enrollment.status == EnrollmentStatus::NotStarted {
            let changed = self
                .store
                .transition_enrollment(
                    user_id,
                    course_id,
                    EnrollmentStatus::NotStarted,
                    EnrollmentStatus::Ongoing,
                )
                .await?;
            if changed {
                info!("user {} started course {}", user_id, course_id);
                self.settle_started(user_id, course_id).await
            } else {
                self.current_status(user_id, course_id).await?
            }
        } else {
            enrollment.status
        };

        let next_lesson_id = NextLessonResolver::new(self.store.clone())
            .resolve(user_id, course_id)
            .await;

        Ok(StartOutcome {
            status,
            next_lesson_id,
        })
    }

    /// `ongoing -> completed`, for deployments where course completion is
    /// decided outside the lesson flow.
    pub async fn mark_completed(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<Enrollment, AppError> {
        self.advance(user_id, course_id, EnrollmentStatus::Ongoing, EnrollmentStatus::Completed)
            .await
    }

    /// `completed -> certified`.
    pub async fn certify(&self, user_id: &str, course_id: &str) -> Result<Enrollment, AppError> {
        self.advance(user_id, course_id, EnrollmentStatus::Completed, EnrollmentStatus::Certified)
            .await
    }

    async fn advance(
        &self,
        user_id: &str,
        course_id: &str,
        from: EnrollmentStatus,
        to: EnrollmentStatus,
    ) -> Result<Enrollment, AppError> {
        debug_assert!(from.can_transition_to(to));

        let enrollment = self
            .store
            .fetch_enrollment(user_id, course_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if enrollment.status != from {
            return Err(AppError::Conflict(format!(
                "enrollment is {}, expected {}",
                enrollment.status, from
            )));
        }

        if !self
            .store
            .transition_enrollment(user_id, course_id, from, to)
            .await?
        {
            return Err(AppError::Conflict(format!(
                "enrollment changed before it could move to {}",
                to
            )));
        }

        info!("user {} course {}: {} -> {}", user_id, course_id, from, to);
        self.store
            .fetch_enrollment(user_id, course_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn settle_started(&self, user_id: &str, course_id: &str) -> EnrollmentStatus {
        if self.policy != CompletionPolicy::Derived {
            return EnrollmentStatus::Ongoing;
        }
        match complete_course_if_finished(self.store.as_ref(), user_id, course_id).await {
            Ok(true) => EnrollmentStatus::Completed,
            Ok(false) => EnrollmentStatus::Ongoing,
            Err(e) => {
                warn!("course completion check failed for course {}: {}", course_id, e);
                EnrollmentStatus::Ongoing
            }
        }
    }

    async fn current_status(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<EnrollmentStatus, AppError> {
        self.store
            .fetch_enrollment(user_id, course_id)
            .await?
            .map(|e| e.status)
            .ok_or(AppError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{ProgressService, fixtures};

    #[tokio::test]
    async fn test_enroll_twice_keeps_single_not_started_record() {
        let fx = fixtures::two_module_course().await;
        let service = EnrollmentService::new(fx.store.clone());

        let first = service.enroll("user-1", &fx.course.id).await.unwrap();
        let second = service.enroll("user-1", &fx.course.id).await.unwrap();
        assert_eq!(first, EnrollOutcome::Enrolled);
        assert_eq!(second, EnrollOutcome::AlreadyEnrolled);

        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM enrollments WHERE user_id = ?1 AND course_id = ?2")
                .bind("user-1")
                .bind(&fx.course.id)
                .fetch_one(&fx.pool)
                .await
                .unwrap();
        assert_eq!(count, 1);

        let enrollment = fx
            .store
            .fetch_enrollment("user-1", &fx.course.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(enrollment.status, EnrollmentStatus::NotStarted);
    }

    #[tokio::test]
    async fn test_enroll_unknown_course_is_not_found() {
        let (_pool, store) = fixtures::store().await;
        let service = EnrollmentService::new(store);

        let err = service.enroll("user-1", "missing").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn test_enroll_surfaces_non_duplicate_failures() {
        let fx = fixtures::two_module_course().await;
        let service = EnrollmentService::new(fx.store.clone());

        sqlx::query("DROP TABLE enrollments")
            .execute(&fx.pool)
            .await
            .unwrap();

        let err = service.enroll("user-1", &fx.course.id).await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }

    #[tokio::test]
    async fn test_start_moves_not_started_to_ongoing() {
        let fx = fixtures::two_module_course().await;
        let service = EnrollmentService::new(fx.store.clone());
        service.enroll("user-1", &fx.course.id).await.unwrap();

        let outcome = service.start("user-1", &fx.course.id).await.unwrap();
        assert_eq!(outcome.status, EnrollmentStatus::Ongoing);
        assert_eq!(outcome.next_lesson_id.as_deref(), Some(fx.l1.id.as_str()));

        let again = service.start("user-1", &fx.course.id).await.unwrap();
        assert_eq!(again.status, EnrollmentStatus::Ongoing);
    }

    #[tokio::test]
    async fn test_start_leaves_completed_unchanged() {
        let fx = fixtures::two_module_course().await;
        let service = EnrollmentService::new(fx.store.clone());
        service.enroll("user-1", &fx.course.id).await.unwrap();
        service.start("user-1", &fx.course.id).await.unwrap();
        service.mark_completed("user-1", &fx.course.id).await.unwrap();

        let outcome = service.start("user-1", &fx.course.id).await.unwrap();
        assert_eq!(outcome.status, EnrollmentStatus::Completed);
    }

    #[tokio::test]
    async fn test_start_without_enrollment_is_not_found() {
        let fx = fixtures::two_module_course().await;
        let service = EnrollmentService::new(fx.store.clone());

        let err = service.start("user-1", &fx.course.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn test_start_keeps_status_when_lessons_unreadable() {
        let fx = fixtures::two_module_course().await;
        let service = EnrollmentService::new(fx.store.clone());
        service.enroll("user-1", &fx.course.id).await.unwrap();

        sqlx::query("DROP TABLE lesson_progress")
            .execute(&fx.pool)
            .await
            .unwrap();

        let outcome = service.start("user-1", &fx.course.id).await.unwrap();
        assert_eq!(outcome.status, EnrollmentStatus::Ongoing);
        assert_eq!(outcome.next_lesson_id, None);
    }

    #[tokio::test]
    async fn test_certify_requires_completed() {
        let fx = fixtures::two_module_course().await;
        let service = EnrollmentService::new(fx.store.clone());
        service.enroll("user-1", &fx.course.id).await.unwrap();

        let err = service.certify("user-1", &fx.course.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let err = service.mark_completed("user-1", &fx.course.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        service.start("user-1", &fx.course.id).await.unwrap();
        service.mark_completed("user-1", &fx.course.id).await.unwrap();
        let certified = service.certify("user-1", &fx.course.id).await.unwrap();
        assert_eq!(certified.status, EnrollmentStatus::Certified);
    }

    #[tokio::test]
    async fn test_derived_start_completes_already_finished_course() {
        let fx = fixtures::two_module_course().await;
        let service =
            EnrollmentService::new(fx.store.clone()).with_completion_policy(CompletionPolicy::Derived);
        service.enroll("user-1", &fx.course.id).await.unwrap();

        let progress = ProgressService::new(fx.store.clone(), CompletionPolicy::Derived);
        for lesson in [&fx.l1, &fx.l2, &fx.l3] {
            progress.complete_lesson("user-1", &lesson.id).await.unwrap();
        }
        // lessons finished before start leave the enrollment untouched
        let status = service.current_status("user-1", &fx.course.id).await.unwrap();
        assert_eq!(status, EnrollmentStatus::NotStarted);

        let outcome = service.start("user-1", &fx.course.id).await.unwrap();
        assert_eq!(outcome.status, EnrollmentStatus::Completed);
        assert_eq!(outcome.next_lesson_id.as_deref(), Some(fx.l1.id.as_str()));

        let stored = service.current_status("user-1", &fx.course.id).await.unwrap();
        assert_eq!(stored, EnrollmentStatus::Completed);
    }

    #[tokio::test]
    async fn test_derived_start_with_lessons_left_stays_ongoing() {
        let fx = fixtures::two_module_course().await;
        let service =
            EnrollmentService::new(fx.store.clone()).with_completion_policy(CompletionPolicy::Derived);
        service.enroll("user-1", &fx.course.id).await.unwrap();
        ProgressService::new(fx.store.clone(), CompletionPolicy::Derived)
            .complete_lesson("user-1", &fx.l1.id)
            .await
            .unwrap();

        let outcome = service.start("user-1", &fx.course.id).await.unwrap();
        assert_eq!(outcome.status, EnrollmentStatus::Ongoing);
        assert_eq!(outcome.next_lesson_id.as_deref(), Some(fx.l2.id.as_str()));
    }

    #[tokio::test]
    async fn test_external_start_ignores_finished_lessons() {
        let fx = fixtures::two_module_course().await;
        let service = EnrollmentService::new(fx.store.clone());
        service.enroll("user-1", &fx.course.id).await.unwrap();
        let progress = ProgressService::new(fx.store.clone(), CompletionPolicy::External);
        for lesson in [&fx.l1, &fx.l2, &fx.l3] {
            progress.complete_lesson("user-1", &lesson.id).await.unwrap();
        }

        let outcome = service.start("user-1", &fx.course.id).await.unwrap();
        assert_eq!(outcome.status, EnrollmentStatus::Ongoing);
    }
}

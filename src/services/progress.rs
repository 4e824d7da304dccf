use std::sync::Arc;

use tracing::{info, warn};

use crate::config::CompletionPolicy;
use crate::error::AppError;
use crate::models::{EnrollmentStatus, Lesson, LessonProgress, LessonView};
use crate::services::resolver::course_sequence;
use crate::store::ProgressStore;

pub struct ProgressService {
    store: Arc<dyn ProgressStore>,
    policy: CompletionPolicy,
}

impl ProgressService {
    pub fn new(store: Arc<dyn ProgressStore>, policy: CompletionPolicy) -> Self {
        Self { store, policy }
    }

    pub async fn lesson_view(&self, user_id: &str, lesson_id: &str) -> Result<LessonView, AppError> {
        let lesson = self
            .store
            .find_lesson(lesson_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let is_completed = self
            .store
            .fetch_lesson_progress(user_id, lesson_id)
            .await?
            .is_some_and(|p| p.is_completed());

        Ok(LessonView {
            lesson,
            is_completed,
        })
    }

    /// Records the lesson as completed. Repeating the call only refreshes
    /// `completed_at`.
    pub async fn complete_lesson(
        &self,
        user_id: &str,
        lesson_id: &str,
    ) -> Result<LessonProgress, AppError> {
        let lesson = self
            .store
            .find_lesson(lesson_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let progress = self
            .store
            .upsert_lesson_progress(user_id, lesson_id)
            .await?;
        info!("user {} completed lesson {}", user_id, lesson_id);

        if self.policy == CompletionPolicy::Derived {
            // the lesson write already landed; a failed course check can be retried
            if let Err(e) = self.check_course_for(user_id, &lesson).await {
                warn!("course completion check failed for lesson {}: {}", lesson_id, e);
            }
        }

        Ok(progress)
    }

    async fn check_course_for(&self, user_id: &str, lesson: &Lesson) -> Result<bool, AppError> {
        let module = self
            .store
            .find_module(&lesson.module_id)
            .await?
            .ok_or(AppError::NotFound)?;
        complete_course_if_finished(self.store.as_ref(), user_id, &module.course_id).await
    }
}

/// Moves the enrollment `ongoing -> completed` once every lesson of the
/// course is done. A course without lessons is never finished this way.
pub(crate) async fn complete_course_if_finished(
    store: &dyn ProgressStore,
    user_id: &str,
    course_id: &str,
) -> Result<bool, AppError> {
    let modules = store.fetch_modules(course_id).await?;
    let module_ids: Vec<String> = modules.iter().map(|m| m.id.clone()).collect();
    let lessons = store.fetch_lessons(&module_ids).await?;
    let sequence = course_sequence(&modules, lessons);
    if sequence.is_empty() {
        return Ok(false);
    }

    let lesson_ids: Vec<String> = sequence.iter().map(|l| l.id.clone()).collect();
    let completed = store
        .fetch_completed_lesson_ids(user_id, &lesson_ids)
        .await?;
    if lesson_ids.iter().any(|id| !completed.contains(id)) {
        return Ok(false);
    }

    let changed = store
        .transition_enrollment(
            user_id,
            course_id,
            EnrollmentStatus::Ongoing,
            EnrollmentStatus::Completed,
        )
        .await?;
    if changed {
        info!("user {} completed course {}", user_id, course_id);
    }
    Ok(changed)
}

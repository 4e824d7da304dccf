use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::AppError;
use crate::models::{CourseModule, Lesson};
use crate::store::ProgressStore;

/// Flattens a course into its reading order: modules by `order_index`,
/// then lessons by `order_index` within each module. Lessons whose module
/// is not in `modules` are dropped.
pub fn course_sequence(modules: &[CourseModule], lessons: Vec<Lesson>) -> Vec<Lesson> {
    let rank: HashMap<&str, (i64, usize)> = modules
        .iter()
        .enumerate()
        .map(|(pos, m)| (m.id.as_str(), (m.order_index, pos)))
        .collect();

    let mut keyed: Vec<((i64, usize), Lesson)> = lessons
        .into_iter()
        .filter_map(|lesson| {
            rank.get(lesson.module_id.as_str())
                .copied()
                .map(|module_rank| (module_rank, lesson))
        })
        .collect();
    keyed.sort_by_key(|(module_rank, lesson)| (*module_rank, lesson.order_index));

    keyed.into_iter().map(|(_, lesson)| lesson).collect()
}

/// First lesson not in `completed`; once everything is done, the first
/// lesson of the course. `None` only for an empty sequence.
pub fn next_lesson<'a>(sequence: &'a [Lesson], completed: &HashSet<String>) -> Option<&'a Lesson> {
    sequence
        .iter()
        .find(|lesson| !completed.contains(&lesson.id))
        .or_else(|| sequence.first())
}

pub struct NextLessonResolver {
    store: Arc<dyn ProgressStore>,
}

impl NextLessonResolver {
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self { store }
    }

    /// Lesson to open when the user continues `course_id`. Store failures
    /// yield `None`: no navigation on partial data.
    pub async fn resolve(&self, user_id: &str, course_id: &str) -> Option<String> {
        match self.try_resolve(user_id, course_id).await {
            Ok(next) => next,
            Err(e) => {
                warn!("next lesson lookup failed for course {}: {}", course_id, e);
                None
            }
        }
    }

    pub async fn try_resolve(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<Option<String>, AppError> {
        let modules = self.store.fetch_modules(course_id).await?;
        if modules.is_empty() {
            debug!("course {} has no modules", course_id);
            return Ok(None);
        }

        let module_ids: Vec<String> = modules.iter().map(|m| m.id.clone()).collect();
        let lessons = self.store.fetch_lessons(&module_ids).await?;
        let sequence = course_sequence(&modules, lessons);
        if sequence.is_empty() {
            debug!("course {} has no lessons", course_id);
            return Ok(None);
        }

        let lesson_ids: Vec<String> = sequence.iter().map(|l| l.id.clone()).collect();
        let completed = self
            .store
            .fetch_completed_lesson_ids(user_id, &lesson_ids)
            .await?;

        let next = next_lesson(&sequence, &completed).map(|l| l.id.clone());
        debug!(
            "course {}: {}/{} lessons completed, next {:?}",
            course_id,
            completed.len(),
            sequence.len(),
            next
        );
        Ok(next)
    }
}

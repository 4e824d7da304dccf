use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::error::AppError;
use crate::models::{Dashboard, EnrolledCourse};
use crate::store::ProgressStore;

pub struct DashboardService {
    store: Arc<dyn ProgressStore>,
}

impl DashboardService {
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self { store }
    }

    /// Full reload of the learner's course lists. Any failed read fails the
    /// whole load; there is no partial dashboard.
    pub async fn load(&self, user_id: &str) -> Result<Dashboard, AppError> {
        let enrolled: Vec<EnrolledCourse> = self
            .store
            .fetch_enrolled_courses(user_id)
            .await?
            .into_iter()
            .map(EnrolledCourse::annotated)
            .collect();
        let courses = self.store.fetch_courses().await?;

        let enrolled_ids: HashSet<&str> = enrolled.iter().map(|c| c.id.as_str()).collect();
        let available = courses
            .into_iter()
            .filter(|c| !enrolled_ids.contains(c.id.as_str()))
            .collect();

        let dashboard = Dashboard {
            enrolled,
            available,
        };
        debug!(
            "dashboard for {}: {} enrolled, {} available",
            user_id,
            dashboard.enrolled.len(),
            dashboard.available.len()
        );
        Ok(dashboard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CourseAction, EnrollmentStatus};
    use crate::services::{EnrollmentService, fixtures};

    #[tokio::test]
    async fn test_enrolling_moves_course_between_lists() {
        let (_pool, store) = fixtures::store().await;
        let rust = fixtures::add_course(&store, "Rust Basics").await;
        let sql = fixtures::add_course(&store, "SQL Basics").await;
        let service = DashboardService::new(store.clone());

        let before = service.load("user-1").await.unwrap();
        assert!(before.enrolled.is_empty());
        assert_eq!(
            before.available.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
            vec![rust.id.as_str(), sql.id.as_str()]
        );

        EnrollmentService::new(store.clone())
            .enroll("user-1", &rust.id)
            .await
            .unwrap();

        let after = service.load("user-1").await.unwrap();
        assert_eq!(after.enrolled.len(), 1);
        assert_eq!(after.enrolled[0].id, rust.id);
        assert_eq!(after.enrolled[0].status, EnrollmentStatus::NotStarted);
        assert_eq!(after.enrolled[0].label, "Not started");
        assert_eq!(after.enrolled[0].action, Some(CourseAction::GetStarted));
        assert_eq!(after.available.len(), 1);
        assert_eq!(after.available[0].id, sql.id);
    }

    #[tokio::test]
    async fn test_enrolled_course_action_follows_status() {
        let fx = fixtures::two_module_course().await;
        let enrollments = EnrollmentService::new(fx.store.clone());
        enrollments.enroll("user-1", &fx.course.id).await.unwrap();
        enrollments.start("user-1", &fx.course.id).await.unwrap();
        let service = DashboardService::new(fx.store.clone());

        let ongoing = service.load("user-1").await.unwrap();
        assert_eq!(ongoing.enrolled[0].label, "Ongoing");
        assert_eq!(ongoing.enrolled[0].action, Some(CourseAction::Continue));

        enrollments.mark_completed("user-1", &fx.course.id).await.unwrap();
        let completed = service.load("user-1").await.unwrap();
        assert_eq!(completed.enrolled[0].label, "Completed");
        assert_eq!(completed.enrolled[0].action, None);
    }

    #[tokio::test]
    async fn test_enrollments_are_per_user() {
        let (_pool, store) = fixtures::store().await;
        let rust = fixtures::add_course(&store, "Rust Basics").await;
        EnrollmentService::new(store.clone())
            .enroll("user-1", &rust.id)
            .await
            .unwrap();

        let other = DashboardService::new(store.clone()).load("user-2").await.unwrap();
        assert!(other.enrolled.is_empty());
        assert_eq!(other.available.len(), 1);
    }

    #[tokio::test]
    async fn test_reload_is_idempotent() {
        let fx = fixtures::two_module_course().await;
        fixtures::add_course(&fx.store, "SQL Basics").await;
        EnrollmentService::new(fx.store.clone())
            .enroll("user-1", &fx.course.id)
            .await
            .unwrap();
        let service = DashboardService::new(fx.store.clone());

        let first = service.load("user-1").await.unwrap();
        let second = service.load("user-1").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_load_fails_on_store_error() {
        let fx = fixtures::two_module_course().await;
        sqlx::query("DROP TABLE enrollments")
            .execute(&fx.pool)
            .await
            .unwrap();

        let result = DashboardService::new(fx.store.clone()).load("user-1").await;
        assert!(matches!(result, Err(AppError::Database(_))));
    }
}

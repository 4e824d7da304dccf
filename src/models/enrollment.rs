use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Status of a user's enrollment in a course.
///
/// Variants are declared in lifecycle order; status only ever moves one
/// step forward and `Certified` has no successor.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    NotStarted,
    Ongoing,
    Completed,
    Certified,
}

/// What the dashboard offers for an enrolled course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseAction {
    GetStarted,
    Continue,
}

impl EnrollmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EnrollmentStatus::NotStarted => "not_started",
            EnrollmentStatus::Ongoing => "ongoing",
            EnrollmentStatus::Completed => "completed",
            EnrollmentStatus::Certified => "certified",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EnrollmentStatus::NotStarted => "Not started",
            EnrollmentStatus::Ongoing => "Ongoing",
            EnrollmentStatus::Completed => "Completed",
            EnrollmentStatus::Certified => "Certified",
        }
    }

    pub fn next(self) -> Option<EnrollmentStatus> {
        match self {
            EnrollmentStatus::NotStarted => Some(EnrollmentStatus::Ongoing),
            EnrollmentStatus::Ongoing => Some(EnrollmentStatus::Completed),
            EnrollmentStatus::Completed => Some(EnrollmentStatus::Certified),
            EnrollmentStatus::Certified => None,
        }
    }

    /// Only single forward steps are legal.
    pub fn can_transition_to(self, target: EnrollmentStatus) -> bool {
        self.next() == Some(target)
    }

    pub fn action(self) -> Option<CourseAction> {
        match self {
            EnrollmentStatus::NotStarted => Some(CourseAction::GetStarted),
            EnrollmentStatus::Ongoing => Some(CourseAction::Continue),
            EnrollmentStatus::Completed | EnrollmentStatus::Certified => None,
        }
    }
}

impl std::fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Enrollment {
    pub user_id: String,
    pub course_id: String,
    pub status: EnrollmentStatus,
    pub enrolled_at: String,
    pub updated_at: String,
}

/// A course joined with the caller's enrollment status. `label` and
/// `action` are derived from `status` by [`EnrolledCourse::annotated`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct EnrolledCourse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: EnrollmentStatus,
    #[sqlx(skip)]
    #[serde(default)]
    pub label: String,
    #[sqlx(skip)]
    #[serde(default)]
    pub action: Option<CourseAction>,
}

impl EnrolledCourse {
    pub fn annotated(mut self) -> Self {
        self.label = self.status.label().to_string();
        self.action = self.status.action();
        self
    }
}

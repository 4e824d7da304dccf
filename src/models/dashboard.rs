use serde::Serialize;

use crate::models::{Course, EnrolledCourse};

/// The learner's two course lists. A course id never appears in both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub enrolled: Vec<EnrolledCourse>,
    pub available: Vec<Course>,
}

pub mod dashboard;
pub mod enrollment;
pub mod progress;
pub mod resolver;

pub use dashboard::DashboardService;
pub use enrollment::{EnrollOutcome, EnrollmentService, StartOutcome};
pub use progress::ProgressService;
pub use resolver::NextLessonResolver;

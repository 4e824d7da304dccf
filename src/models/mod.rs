pub mod course;
pub mod dashboard;
pub mod enrollment;
pub mod lesson;
pub mod progress;

pub use course::{Course, NewCourseRequest};
pub use dashboard::Dashboard;
pub use enrollment::{CourseAction, EnrolledCourse, Enrollment, EnrollmentStatus};
pub use lesson::{CourseModule, Lesson, NewLessonRequest, NewModuleRequest};
pub use progress::{LessonProgress, LessonView, ProgressStatus};

use std::collections::HashSet;

use chrono::{SecondsFormat, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::models::{
    Course, CourseModule, EnrolledCourse, Enrollment, EnrollmentStatus, Lesson, LessonProgress,
    NewCourseRequest, NewLessonRequest, NewModuleRequest,
};

/// Fixed-width RFC 3339 so stored timestamps sort lexically.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub async fn fetch_courses(db: &SqlitePool) -> Result<Vec<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(
        r#"
        SELECT id, title, description, created_at
        FROM courses
        ORDER BY created_at ASC, rowid ASC
        "#,
    )
    .fetch_all(db)
    .await
}

pub async fn find_course_by_id(db: &SqlitePool, id: &str) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(
        "SELECT id, title, description, created_at FROM courses WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn insert_course(
    db: &SqlitePool,
    req: NewCourseRequest,
) -> Result<Course, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = now_timestamp();

    sqlx::query(
        r#"
        INSERT INTO courses (id, title, description, created_at)
        VALUES (?1, ?2, ?3, ?4)
        "#,
    )
    .bind(&id)
    .bind(&req.title)
    .bind(&req.description)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(Course {
        id,
        title: req.title,
        description: req.description,
        created_at: now,
    })
}

pub async fn insert_module(
    db: &SqlitePool,
    req: NewModuleRequest,
) -> Result<CourseModule, sqlx::Error> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO modules (id, course_id, title, order_index)
        VALUES (?1, ?2, ?3, ?4)
        "#,
    )
    .bind(&id)
    .bind(&req.course_id)
    .bind(&req.title)
    .bind(req.order_index)
    .execute(db)
    .await?;

    Ok(CourseModule {
        id,
        course_id: req.course_id,
        title: req.title,
        order_index: req.order_index,
    })
}

pub async fn insert_lesson(
    db: &SqlitePool,
    req: NewLessonRequest,
) -> Result<Lesson, sqlx::Error> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO lessons (id, module_id, title, order_index, content)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&id)
    .bind(&req.module_id)
    .bind(&req.title)
    .bind(req.order_index)
    .bind(&req.content)
    .execute(db)
    .await?;

    Ok(Lesson {
        id,
        module_id: req.module_id,
        title: req.title,
        order_index: req.order_index,
        content: req.content,
    })
}

pub async fn fetch_modules(
    db: &SqlitePool,
    course_id: &str,
) -> Result<Vec<CourseModule>, sqlx::Error> {
    sqlx::query_as::<_, CourseModule>(
        r#"
        SELECT id, course_id, title, order_index
        FROM modules
        WHERE course_id = ?1
        ORDER BY order_index ASC
        "#,
    )
    .bind(course_id)
    .fetch_all(db)
    .await
}

pub async fn find_module_by_id(
    db: &SqlitePool,
    id: &str,
) -> Result<Option<CourseModule>, sqlx::Error> {
    sqlx::query_as::<_, CourseModule>(
        "SELECT id, course_id, title, order_index FROM modules WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn fetch_lessons(
    db: &SqlitePool,
    module_ids: &[String],
) -> Result<Vec<Lesson>, sqlx::Error> {
    if module_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT id, module_id, title, order_index, content FROM lessons WHERE module_id IN (",
    );
    let mut ids = qb.separated(", ");
    for id in module_ids {
        ids.push_bind(id.as_str());
    }
    qb.push(") ORDER BY order_index ASC");

    qb.build_query_as::<Lesson>().fetch_all(db).await
}

pub async fn find_lesson_by_id(db: &SqlitePool, id: &str) -> Result<Option<Lesson>, sqlx::Error> {
    sqlx::query_as::<_, Lesson>(
        "SELECT id, module_id, title, order_index, content FROM lessons WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn insert_enrollment(
    db: &SqlitePool,
    user_id: &str,
    course_id: &str,
    status: EnrollmentStatus,
) -> Result<(), sqlx::Error> {
    let now = now_timestamp();

    sqlx::query(
        r#"
        INSERT INTO enrollments (user_id, course_id, status, enrolled_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?4)
        "#,
    )
    .bind(user_id)
    .bind(course_id)
    .bind(status)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(())
}

pub async fn find_enrollment(
    db: &SqlitePool,
    user_id: &str,
    course_id: &str,
) -> Result<Option<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(
        r#"
        SELECT user_id, course_id, status, enrolled_at, updated_at
        FROM enrollments
        WHERE user_id = ?1 AND course_id = ?2
        "#,
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_optional(db)
    .await
}

/// Single conditional UPDATE, so concurrent callers converge on one write.
pub async fn transition_enrollment(
    db: &SqlitePool,
    user_id: &str,
    course_id: &str,
    from: EnrollmentStatus,
    to: EnrollmentStatus,
) -> Result<bool, sqlx::Error> {
    let now = now_timestamp();
    let result = sqlx::query(
        r#"
        UPDATE enrollments
        SET status = ?4,
            updated_at = ?5
        WHERE user_id = ?1 AND course_id = ?2 AND status = ?3
        "#,
    )
    .bind(user_id)
    .bind(course_id)
    .bind(from)
    .bind(to)
    .bind(&now)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

pub async fn fetch_enrolled_courses(
    db: &SqlitePool,
    user_id: &str,
) -> Result<Vec<EnrolledCourse>, sqlx::Error> {
    sqlx::query_as::<_, EnrolledCourse>(
        r#"
        SELECT c.id, c.title, c.description, e.status
        FROM enrollments e
        INNER JOIN courses c ON c.id = e.course_id
        WHERE e.user_id = ?1
        ORDER BY e.enrolled_at ASC, c.created_at ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

pub async fn upsert_lesson_progress(
    db: &SqlitePool,
    user_id: &str,
    lesson_id: &str,
    completed_at: &str,
) -> Result<Option<LessonProgress>, sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO lesson_progress (user_id, lesson_id, status, completed_at)
        VALUES (?1, ?2, 'completed', ?3)
        ON CONFLICT (user_id, lesson_id) DO UPDATE
        SET status = 'completed',
            completed_at = excluded.completed_at
        "#,
    )
    .bind(user_id)
    .bind(lesson_id)
    .bind(completed_at)
    .execute(db)
    .await?;

    find_lesson_progress(db, user_id, lesson_id).await
}

pub async fn find_lesson_progress(
    db: &SqlitePool,
    user_id: &str,
    lesson_id: &str,
) -> Result<Option<LessonProgress>, sqlx::Error> {
    sqlx::query_as::<_, LessonProgress>(
        r#"
        SELECT user_id, lesson_id, status, completed_at
        FROM lesson_progress
        WHERE user_id = ?1 AND lesson_id = ?2
        "#,
    )
    .bind(user_id)
    .bind(lesson_id)
    .fetch_optional(db)
    .await
}

pub async fn fetch_completed_lesson_ids(
    db: &SqlitePool,
    user_id: &str,
    lesson_ids: &[String],
) -> Result<HashSet<String>, sqlx::Error> {
    if lesson_ids.is_empty() {
        return Ok(HashSet::new());
    }

    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT lesson_id FROM lesson_progress WHERE user_id = ");
    qb.push_bind(user_id);
    qb.push(" AND status = 'completed' AND lesson_id IN (");
    let mut ids = qb.separated(", ");
    for id in lesson_ids {
        ids.push_bind(id.as_str());
    }
    qb.push(")");

    let rows: Vec<(String,)> = qb.build_query_as().fetch_all(db).await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

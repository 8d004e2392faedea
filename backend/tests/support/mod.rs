#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

use chrono::NaiveDate;
use teacher_hub::api::{
    AttendanceMark, AttendanceStatus, BehaviorKind, BehaviorNoteDraft, ClassroomDraft,
    GradeDraft, OwnedTable, Role, StudentDraft, UserId,
};
use teacher_hub::db::repositories::LocalRepository;
use teacher_hub::db::services;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// This is panic-safe (restores variables on unwind) and also serializes access to
/// process-global env vars to avoid flaky tests when Rust runs tests in parallel.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().expect("ENV_LOCK poisoned");
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

/// Register an admin identity and return it with a bearer credential.
pub fn seed_admin(repo: &LocalRepository) -> (UserId, String) {
    let admin = repo.add_user(Some("admin@school.example"));
    repo.grant_role(admin, Role::Admin);
    let token = repo.issue_token(admin);
    (admin, token)
}

/// Register a teacher identity with a profile and role, and return it with
/// a bearer credential.
pub fn seed_teacher(repo: &LocalRepository, email: &str, name: Option<&str>) -> (UserId, String) {
    let teacher = repo.add_user(Some(email));
    repo.grant_role(teacher, Role::Teacher);
    repo.put_profile(teacher, name);
    let token = repo.issue_token(teacher);
    (teacher, token)
}

/// Give `teacher` at least one row in every owned table.
pub async fn seed_classroom_data(repo: &LocalRepository, teacher: UserId) {
    let classroom = services::create_classroom(
        repo,
        teacher,
        ClassroomDraft {
            name: "Grade 4 - A".to_string(),
            subject: Some("Science".to_string()),
            grade_level: Some("4".to_string()),
        },
    )
    .await
    .expect("seed classroom");

    let student = services::create_student(
        repo,
        teacher,
        classroom.id,
        StudentDraft {
            full_name: "Omar Saleh".to_string(),
            student_number: Some("17".to_string()),
        },
    )
    .await
    .expect("seed student");

    services::mark_attendance(
        repo,
        teacher,
        AttendanceMark {
            student_id: student.id,
            date: NaiveDate::from_ymd_opt(2026, 3, 1).expect("valid date"),
            status: AttendanceStatus::Present,
            note: None,
        },
    )
    .await
    .expect("seed attendance");

    services::record_grade(
        repo,
        teacher,
        GradeDraft {
            student_id: student.id,
            title: "Quiz 1".to_string(),
            score: 8.0,
            max_score: 10.0,
            recorded_on: None,
        },
    )
    .await
    .expect("seed grade");

    services::add_behavior_note(
        repo,
        teacher,
        BehaviorNoteDraft {
            student_id: student.id,
            kind: BehaviorKind::Positive,
            note: "Helped a classmate".to_string(),
        },
    )
    .await
    .expect("seed behavior note");

    repo.add_opaque_row(OwnedTable::StudentPositions, teacher);
    repo.add_opaque_row(OwnedTable::GradingTemplates, teacher);
}

use super::*;
use crate::api::{AttendanceStatus, BehaviorKind};
use crate::db::repositories::LocalRepository;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 9, d).unwrap()
}

async fn classroom_with_student(
    repo: &LocalRepository,
    teacher: UserId,
) -> (Classroom, Student) {
    let classroom = create_classroom(
        repo,
        teacher,
        ClassroomDraft {
            name: "  Grade 5 - A ".to_string(),
            subject: Some("Math".to_string()),
            grade_level: Some(" ".to_string()),
        },
    )
    .await
    .unwrap();
    let student = create_student(
        repo,
        teacher,
        classroom.id,
        StudentDraft {
            full_name: "Sara Ali".to_string(),
            student_number: None,
        },
    )
    .await
    .unwrap();
    (classroom, student)
}

#[tokio::test]
async fn test_create_classroom_trims_fields() {
    let repo = LocalRepository::new();
    let teacher = UserId::random();
    let (classroom, _) = classroom_with_student(&repo, teacher).await;

    assert_eq!(classroom.name, "Grade 5 - A");
    assert_eq!(classroom.subject.as_deref(), Some("Math"));
    assert!(classroom.grade_level.is_none());
}

#[tokio::test]
async fn test_blank_classroom_name_is_rejected() {
    let repo = LocalRepository::new();
    let result = create_classroom(
        &repo,
        UserId::random(),
        ClassroomDraft {
            name: "   ".to_string(),
            ..Default::default()
        },
    )
    .await;

    assert!(matches!(
        result,
        Err(RepositoryError::ValidationError { .. })
    ));
    assert_eq!(repo.mutation_count(), 0);
}

#[tokio::test]
async fn test_other_teacher_sees_nothing() {
    let repo = LocalRepository::new();
    let owner = UserId::random();
    let stranger = UserId::random();
    let (classroom, student) = classroom_with_student(&repo, owner).await;

    assert!(list_classrooms(&repo, stranger).await.unwrap().is_empty());
    assert!(list_students(&repo, stranger, classroom.id)
        .await
        .unwrap_err()
        .is_not_found());
    assert!(delete_student(&repo, stranger, student.id)
        .await
        .unwrap_err()
        .is_not_found());
    assert!(create_student(
        &repo,
        stranger,
        classroom.id,
        StudentDraft {
            full_name: "Intruder".to_string(),
            student_number: None,
        },
    )
    .await
    .unwrap_err()
    .is_not_found());
}

#[tokio::test]
async fn test_attendance_marking_is_an_upsert() {
    let repo = LocalRepository::new();
    let teacher = UserId::random();
    let (classroom, student) = classroom_with_student(&repo, teacher).await;

    for status in [AttendanceStatus::Absent, AttendanceStatus::Late] {
        mark_attendance(
            &repo,
            teacher,
            AttendanceMark {
                student_id: student.id,
                date: day(14),
                status,
                note: None,
            },
        )
        .await
        .unwrap();
    }

    let records = list_attendance(&repo, teacher, classroom.id, day(14))
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, AttendanceStatus::Late);
    assert_eq!(records[0].classroom_id, classroom.id);

    assert!(list_attendance(&repo, teacher, classroom.id, day(15))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_grade_range_is_validated() {
    let repo = LocalRepository::new();
    let teacher = UserId::random();
    let (classroom, student) = classroom_with_student(&repo, teacher).await;

    let over = record_grade(
        &repo,
        teacher,
        GradeDraft {
            student_id: student.id,
            title: "Quiz".to_string(),
            score: 12.0,
            max_score: 10.0,
            recorded_on: None,
        },
    )
    .await;
    assert!(matches!(over, Err(RepositoryError::ValidationError { .. })));

    let grade = record_grade(
        &repo,
        teacher,
        GradeDraft {
            student_id: student.id,
            title: " Quiz ".to_string(),
            score: 7.5,
            max_score: 10.0,
            recorded_on: Some(day(2)),
        },
    )
    .await
    .unwrap();
    assert_eq!(grade.title, "Quiz");
    assert_eq!(grade.classroom_id, classroom.id);

    let grades = list_grades(&repo, teacher, classroom.id).await.unwrap();
    assert_eq!(grades.len(), 1);

    delete_grade(&repo, teacher, grade.id).await.unwrap();
    assert!(delete_grade(&repo, teacher, grade.id)
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn test_behavior_notes_roundtrip() {
    let repo = LocalRepository::new();
    let teacher = UserId::random();
    let (_, student) = classroom_with_student(&repo, teacher).await;

    let note = add_behavior_note(
        &repo,
        teacher,
        BehaviorNoteDraft {
            student_id: student.id,
            kind: BehaviorKind::Positive,
            note: "Helped a classmate".to_string(),
        },
    )
    .await
    .unwrap();

    let notes = list_behavior_notes(&repo, teacher, student.id).await.unwrap();
    assert_eq!(notes, vec![note.clone()]);

    let blank = add_behavior_note(
        &repo,
        teacher,
        BehaviorNoteDraft {
            student_id: student.id,
            kind: BehaviorKind::Neutral,
            note: "\n".to_string(),
        },
    )
    .await;
    assert!(matches!(blank, Err(RepositoryError::ValidationError { .. })));

    delete_behavior_note(&repo, teacher, note.id).await.unwrap();
    assert!(list_behavior_notes(&repo, teacher, student.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_delete_classroom_removes_students() {
    let repo = LocalRepository::new();
    let teacher = UserId::random();
    let (classroom, student) = classroom_with_student(&repo, teacher).await;

    delete_classroom(&repo, teacher, classroom.id).await.unwrap();

    assert!(list_classrooms(&repo, teacher).await.unwrap().is_empty());
    assert!(update_student(
        &repo,
        teacher,
        student.id,
        StudentDraft {
            full_name: "Sara".to_string(),
            student_number: None,
        },
    )
    .await
    .unwrap_err()
    .is_not_found());
}

#[tokio::test]
async fn test_health_check_reports_store_state() {
    let repo = LocalRepository::new();
    assert!(health_check(&repo).await.unwrap());
    repo.set_healthy(false);
    assert!(!health_check(&repo).await.unwrap());
}

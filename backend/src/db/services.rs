//! Service layer for classroom data.
//!
//! High-level functions over any [`ClassroomRepository`]. They validate
//! input, check that every referenced record belongs to the calling teacher,
//! and turn "not visible to this teacher" into [`RepositoryError::NotFound`].

use chrono::{NaiveDate, Utc};
use log::{debug, info};

use super::repository::{
    ClassroomRepository, ErrorContext, FullRepository, RepositoryError, RepositoryResult,
};
use crate::api::{
    AttendanceId, AttendanceMark, AttendanceRecord, BehaviorNote, BehaviorNoteDraft,
    BehaviorNoteId, Classroom, ClassroomDraft, ClassroomId, Grade, GradeDraft, GradeId, Student,
    StudentDraft, StudentId, UserId,
};

/// Check that the store is reachable.
pub async fn health_check<R: FullRepository + ?Sized>(repo: &R) -> RepositoryResult<bool> {
    repo.health_check().await
}

fn not_found(operation: &str, entity: &str, id: impl ToString) -> RepositoryError {
    RepositoryError::not_found_with_context(
        format!("{} not found", entity),
        ErrorContext::new(operation)
            .with_entity(entity)
            .with_entity_id(id),
    )
}

fn required(operation: &str, field: &str, value: &str) -> RepositoryResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RepositoryError::validation_with_context(
            format!("{} is required", field),
            ErrorContext::new(operation),
        ));
    }
    Ok(trimmed.to_string())
}

fn trim_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

async fn owned_classroom<R: ClassroomRepository + ?Sized>(
    repo: &R,
    operation: &str,
    teacher: UserId,
    id: ClassroomId,
) -> RepositoryResult<Classroom> {
    repo.get_classroom(teacher, id)
        .await?
        .ok_or_else(|| not_found(operation, "classroom", id))
}

async fn owned_student<R: ClassroomRepository + ?Sized>(
    repo: &R,
    operation: &str,
    teacher: UserId,
    id: StudentId,
) -> RepositoryResult<Student> {
    repo.get_student(teacher, id)
        .await?
        .ok_or_else(|| not_found(operation, "student", id))
}

// ==================== Classrooms ====================

pub async fn list_classrooms<R: ClassroomRepository + ?Sized>(
    repo: &R,
    teacher: UserId,
) -> RepositoryResult<Vec<Classroom>> {
    repo.list_classrooms(teacher).await
}

pub async fn create_classroom<R: ClassroomRepository + ?Sized>(
    repo: &R,
    teacher: UserId,
    draft: ClassroomDraft,
) -> RepositoryResult<Classroom> {
    let draft = ClassroomDraft {
        name: required("create_classroom", "name", &draft.name)?,
        subject: trim_optional(draft.subject),
        grade_level: trim_optional(draft.grade_level),
    };
    let classroom = repo.create_classroom(teacher, draft).await?;
    info!("Teacher {} created classroom {}", teacher, classroom.id);
    Ok(classroom)
}

pub async fn update_classroom<R: ClassroomRepository + ?Sized>(
    repo: &R,
    teacher: UserId,
    id: ClassroomId,
    draft: ClassroomDraft,
) -> RepositoryResult<Classroom> {
    let draft = ClassroomDraft {
        name: required("update_classroom", "name", &draft.name)?,
        subject: trim_optional(draft.subject),
        grade_level: trim_optional(draft.grade_level),
    };
    repo.update_classroom(teacher, id, draft)
        .await?
        .ok_or_else(|| not_found("update_classroom", "classroom", id))
}

/// Delete a classroom together with its students and their records.
pub async fn delete_classroom<R: ClassroomRepository + ?Sized>(
    repo: &R,
    teacher: UserId,
    id: ClassroomId,
) -> RepositoryResult<()> {
    if !repo.delete_classroom(teacher, id).await? {
        return Err(not_found("delete_classroom", "classroom", id));
    }
    info!("Teacher {} deleted classroom {}", teacher, id);
    Ok(())
}

// ==================== Students ====================

pub async fn list_students<R: ClassroomRepository + ?Sized>(
    repo: &R,
    teacher: UserId,
    classroom: ClassroomId,
) -> RepositoryResult<Vec<Student>> {
    owned_classroom(repo, "list_students", teacher, classroom).await?;
    repo.list_students(teacher, classroom).await
}

pub async fn create_student<R: ClassroomRepository + ?Sized>(
    repo: &R,
    teacher: UserId,
    classroom: ClassroomId,
    draft: StudentDraft,
) -> RepositoryResult<Student> {
    let draft = StudentDraft {
        full_name: required("create_student", "fullName", &draft.full_name)?,
        student_number: trim_optional(draft.student_number),
    };
    owned_classroom(repo, "create_student", teacher, classroom).await?;
    repo.create_student(teacher, classroom, draft).await
}

pub async fn update_student<R: ClassroomRepository + ?Sized>(
    repo: &R,
    teacher: UserId,
    id: StudentId,
    draft: StudentDraft,
) -> RepositoryResult<Student> {
    let draft = StudentDraft {
        full_name: required("update_student", "fullName", &draft.full_name)?,
        student_number: trim_optional(draft.student_number),
    };
    repo.update_student(teacher, id, draft)
        .await?
        .ok_or_else(|| not_found("update_student", "student", id))
}

pub async fn delete_student<R: ClassroomRepository + ?Sized>(
    repo: &R,
    teacher: UserId,
    id: StudentId,
) -> RepositoryResult<()> {
    if !repo.delete_student(teacher, id).await? {
        return Err(not_found("delete_student", "student", id));
    }
    Ok(())
}

// ==================== Attendance ====================

pub async fn list_attendance<R: ClassroomRepository + ?Sized>(
    repo: &R,
    teacher: UserId,
    classroom: ClassroomId,
    date: NaiveDate,
) -> RepositoryResult<Vec<AttendanceRecord>> {
    owned_classroom(repo, "list_attendance", teacher, classroom).await?;
    repo.list_attendance(teacher, classroom, date).await
}

/// Mark attendance for one student on one day. Marking the same
/// `(student, date)` again replaces the earlier status.
pub async fn mark_attendance<R: ClassroomRepository + ?Sized>(
    repo: &R,
    teacher: UserId,
    mark: AttendanceMark,
) -> RepositoryResult<AttendanceRecord> {
    let student = owned_student(repo, "mark_attendance", teacher, mark.student_id).await?;
    let record = AttendanceRecord {
        id: AttendanceId::random(),
        teacher_id: teacher,
        student_id: student.id,
        classroom_id: student.classroom_id,
        date: mark.date,
        status: mark.status,
        note: trim_optional(mark.note),
    };
    debug!(
        "Marking {} as {:?} on {}",
        record.student_id, record.status, record.date
    );
    repo.upsert_attendance(record).await
}

// ==================== Grades ====================

pub async fn list_grades<R: ClassroomRepository + ?Sized>(
    repo: &R,
    teacher: UserId,
    classroom: ClassroomId,
) -> RepositoryResult<Vec<Grade>> {
    owned_classroom(repo, "list_grades", teacher, classroom).await?;
    repo.list_grades(teacher, classroom).await
}

pub async fn record_grade<R: ClassroomRepository + ?Sized>(
    repo: &R,
    teacher: UserId,
    draft: GradeDraft,
) -> RepositoryResult<Grade> {
    draft.validate().map_err(|message| {
        RepositoryError::validation_with_context(message, ErrorContext::new("record_grade"))
    })?;
    let student = owned_student(repo, "record_grade", teacher, draft.student_id).await?;

    let grade = Grade {
        id: GradeId::random(),
        teacher_id: teacher,
        student_id: student.id,
        classroom_id: student.classroom_id,
        title: draft.title.trim().to_string(),
        score: draft.score,
        max_score: draft.max_score,
        recorded_on: draft
            .recorded_on
            .unwrap_or_else(|| Utc::now().date_naive()),
    };
    repo.insert_grade(grade).await
}

pub async fn delete_grade<R: ClassroomRepository + ?Sized>(
    repo: &R,
    teacher: UserId,
    id: GradeId,
) -> RepositoryResult<()> {
    if !repo.delete_grade(teacher, id).await? {
        return Err(not_found("delete_grade", "grade", id));
    }
    Ok(())
}

// ==================== Behavior Notes ====================

pub async fn list_behavior_notes<R: ClassroomRepository + ?Sized>(
    repo: &R,
    teacher: UserId,
    student: StudentId,
) -> RepositoryResult<Vec<BehaviorNote>> {
    owned_student(repo, "list_behavior_notes", teacher, student).await?;
    repo.list_behavior_notes(teacher, student).await
}

pub async fn add_behavior_note<R: ClassroomRepository + ?Sized>(
    repo: &R,
    teacher: UserId,
    draft: BehaviorNoteDraft,
) -> RepositoryResult<BehaviorNote> {
    let text = required("add_behavior_note", "note", &draft.note)?;
    let student = owned_student(repo, "add_behavior_note", teacher, draft.student_id).await?;

    let note = BehaviorNote {
        id: BehaviorNoteId::random(),
        teacher_id: teacher,
        student_id: student.id,
        kind: draft.kind,
        note: text,
        created_at: Utc::now(),
    };
    repo.insert_behavior_note(note).await
}

pub async fn delete_behavior_note<R: ClassroomRepository + ?Sized>(
    repo: &R,
    teacher: UserId,
    id: BehaviorNoteId,
) -> RepositoryResult<()> {
    if !repo.delete_behavior_note(teacher, id).await? {
        return Err(not_found("delete_behavior_note", "behavior note", id));
    }
    Ok(())
}

#[cfg(test)]
#[path = "services_tests.rs"]
mod services_tests;

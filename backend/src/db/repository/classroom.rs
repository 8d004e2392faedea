//! Classroom repository trait for the teacher-facing CRUD surface.
//!
//! Every method takes the calling teacher's ID and only ever sees rows owned
//! by that teacher. A row owned by someone else behaves as if it did not
//! exist (`None` / `false`).

use async_trait::async_trait;
use chrono::NaiveDate;

use super::error::RepositoryResult;
use crate::api::{
    AttendanceRecord, BehaviorNote, BehaviorNoteId, Classroom, ClassroomDraft, ClassroomId, Grade,
    GradeId, Student, StudentDraft, StudentId, UserId,
};

#[async_trait]
pub trait ClassroomRepository: Send + Sync {
    // ==================== Classrooms ====================

    async fn list_classrooms(&self, teacher: UserId) -> RepositoryResult<Vec<Classroom>>;

    async fn get_classroom(
        &self,
        teacher: UserId,
        id: ClassroomId,
    ) -> RepositoryResult<Option<Classroom>>;

    async fn create_classroom(
        &self,
        teacher: UserId,
        draft: ClassroomDraft,
    ) -> RepositoryResult<Classroom>;

    async fn update_classroom(
        &self,
        teacher: UserId,
        id: ClassroomId,
        draft: ClassroomDraft,
    ) -> RepositoryResult<Option<Classroom>>;

    /// Delete a classroom along with its students and their records.
    ///
    /// # Returns
    /// * `Ok(false)` - Nothing was deleted
    async fn delete_classroom(&self, teacher: UserId, id: ClassroomId) -> RepositoryResult<bool>;

    // ==================== Students ====================

    async fn list_students(
        &self,
        teacher: UserId,
        classroom: ClassroomId,
    ) -> RepositoryResult<Vec<Student>>;

    async fn get_student(&self, teacher: UserId, id: StudentId)
        -> RepositoryResult<Option<Student>>;

    async fn create_student(
        &self,
        teacher: UserId,
        classroom: ClassroomId,
        draft: StudentDraft,
    ) -> RepositoryResult<Student>;

    async fn update_student(
        &self,
        teacher: UserId,
        id: StudentId,
        draft: StudentDraft,
    ) -> RepositoryResult<Option<Student>>;

    async fn delete_student(&self, teacher: UserId, id: StudentId) -> RepositoryResult<bool>;

    // ==================== Attendance ====================

    async fn list_attendance(
        &self,
        teacher: UserId,
        classroom: ClassroomId,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<AttendanceRecord>>;

    /// Insert or replace the mark for `(student_id, date)`.
    ///
    /// When a mark already exists its ID is kept and status/note are
    /// overwritten.
    async fn upsert_attendance(&self, record: AttendanceRecord)
        -> RepositoryResult<AttendanceRecord>;

    // ==================== Grades ====================

    async fn list_grades(
        &self,
        teacher: UserId,
        classroom: ClassroomId,
    ) -> RepositoryResult<Vec<Grade>>;

    async fn insert_grade(&self, grade: Grade) -> RepositoryResult<Grade>;

    async fn delete_grade(&self, teacher: UserId, id: GradeId) -> RepositoryResult<bool>;

    // ==================== Behavior Notes ====================

    async fn list_behavior_notes(
        &self,
        teacher: UserId,
        student: StudentId,
    ) -> RepositoryResult<Vec<BehaviorNote>>;

    async fn insert_behavior_note(&self, note: BehaviorNote) -> RepositoryResult<BehaviorNote>;

    async fn delete_behavior_note(
        &self,
        teacher: UserId,
        id: BehaviorNoteId,
    ) -> RepositoryResult<bool>;
}

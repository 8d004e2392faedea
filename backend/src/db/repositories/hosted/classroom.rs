use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde_json::Value;

use super::{eq, HostedRepository};
use crate::api::{
    AttendanceRecord, BehaviorNote, BehaviorNoteId, Classroom, ClassroomDraft, ClassroomId, Grade,
    GradeId, Student, StudentDraft, StudentId, UserId,
};
use crate::db::repository::{ClassroomRepository, RepositoryResult};

// Cascades from classrooms/students to their dependent rows are declared
// as foreign keys in the hosted schema.

#[async_trait]
impl ClassroomRepository for HostedRepository {
    async fn list_classrooms(&self, teacher: UserId) -> RepositoryResult<Vec<Classroom>> {
        self.select("list_classrooms", "classrooms", &[eq("teacher_id", teacher)])
            .await
    }

    async fn get_classroom(
        &self,
        teacher: UserId,
        id: ClassroomId,
    ) -> RepositoryResult<Option<Classroom>> {
        self.select_one(
            "get_classroom",
            "classrooms",
            &[eq("id", id), eq("teacher_id", teacher)],
        )
        .await
    }

    async fn create_classroom(
        &self,
        teacher: UserId,
        draft: ClassroomDraft,
    ) -> RepositoryResult<Classroom> {
        let row = Classroom {
            id: ClassroomId::random(),
            teacher_id: teacher,
            name: draft.name,
            subject: draft.subject,
            grade_level: draft.grade_level,
            created_at: Utc::now(),
        };
        self.insert("create_classroom", "classrooms", &row, None)
            .await
    }

    async fn update_classroom(
        &self,
        teacher: UserId,
        id: ClassroomId,
        draft: ClassroomDraft,
    ) -> RepositoryResult<Option<Classroom>> {
        let mut rows: Vec<Classroom> = self
            .update(
                "update_classroom",
                "classrooms",
                &[eq("id", id), eq("teacher_id", teacher)],
                &draft,
            )
            .await?;
        Ok(rows.pop())
    }

    async fn delete_classroom(&self, teacher: UserId, id: ClassroomId) -> RepositoryResult<bool> {
        let removed = self
            .delete(
                "delete_classroom",
                "classrooms",
                &[eq("id", id), eq("teacher_id", teacher)],
            )
            .await?;
        Ok(removed > 0)
    }

    async fn list_students(
        &self,
        teacher: UserId,
        classroom: ClassroomId,
    ) -> RepositoryResult<Vec<Student>> {
        self.select(
            "list_students",
            "students",
            &[eq("classroom_id", classroom), eq("teacher_id", teacher)],
        )
        .await
    }

    async fn get_student(
        &self,
        teacher: UserId,
        id: StudentId,
    ) -> RepositoryResult<Option<Student>> {
        self.select_one(
            "get_student",
            "students",
            &[eq("id", id), eq("teacher_id", teacher)],
        )
        .await
    }

    async fn create_student(
        &self,
        teacher: UserId,
        classroom: ClassroomId,
        draft: StudentDraft,
    ) -> RepositoryResult<Student> {
        let row = Student {
            id: StudentId::random(),
            teacher_id: teacher,
            classroom_id: classroom,
            full_name: draft.full_name,
            student_number: draft.student_number,
            created_at: Utc::now(),
        };
        self.insert("create_student", "students", &row, None).await
    }

    async fn update_student(
        &self,
        teacher: UserId,
        id: StudentId,
        draft: StudentDraft,
    ) -> RepositoryResult<Option<Student>> {
        let mut rows: Vec<Student> = self
            .update(
                "update_student",
                "students",
                &[eq("id", id), eq("teacher_id", teacher)],
                &draft,
            )
            .await?;
        Ok(rows.pop())
    }

    async fn delete_student(&self, teacher: UserId, id: StudentId) -> RepositoryResult<bool> {
        let removed = self
            .delete(
                "delete_student",
                "students",
                &[eq("id", id), eq("teacher_id", teacher)],
            )
            .await?;
        Ok(removed > 0)
    }

    async fn list_attendance(
        &self,
        teacher: UserId,
        classroom: ClassroomId,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<AttendanceRecord>> {
        self.select(
            "list_attendance",
            "attendance_records",
            &[
                eq("teacher_id", teacher),
                eq("classroom_id", classroom),
                eq("date", date),
            ],
        )
        .await
    }

    async fn upsert_attendance(
        &self,
        record: AttendanceRecord,
    ) -> RepositoryResult<AttendanceRecord> {
        // The stored row keeps its own id on conflict.
        let mut row = serde_json::to_value(&record)?;
        if let Value::Object(ref mut fields) = row {
            fields.remove("id");
        }
        self.insert(
            "upsert_attendance",
            "attendance_records",
            &row,
            Some("student_id,date"),
        )
        .await
    }

    async fn list_grades(
        &self,
        teacher: UserId,
        classroom: ClassroomId,
    ) -> RepositoryResult<Vec<Grade>> {
        self.select(
            "list_grades",
            "grades",
            &[eq("teacher_id", teacher), eq("classroom_id", classroom)],
        )
        .await
    }

    async fn insert_grade(&self, grade: Grade) -> RepositoryResult<Grade> {
        self.insert("insert_grade", "grades", &grade, None).await
    }

    async fn delete_grade(&self, teacher: UserId, id: GradeId) -> RepositoryResult<bool> {
        let removed = self
            .delete(
                "delete_grade",
                "grades",
                &[eq("id", id), eq("teacher_id", teacher)],
            )
            .await?;
        Ok(removed > 0)
    }

    async fn list_behavior_notes(
        &self,
        teacher: UserId,
        student: StudentId,
    ) -> RepositoryResult<Vec<BehaviorNote>> {
        self.select(
            "list_behavior_notes",
            "behavior_notes",
            &[eq("teacher_id", teacher), eq("student_id", student)],
        )
        .await
    }

    async fn insert_behavior_note(&self, note: BehaviorNote) -> RepositoryResult<BehaviorNote> {
        self.insert("insert_behavior_note", "behavior_notes", &note, None)
            .await
    }

    async fn delete_behavior_note(
        &self,
        teacher: UserId,
        id: BehaviorNoteId,
    ) -> RepositoryResult<bool> {
        let removed = self
            .delete(
                "delete_behavior_note",
                "behavior_notes",
                &[eq("id", id), eq("teacher_id", teacher)],
            )
            .await?;
        Ok(removed > 0)
    }
}

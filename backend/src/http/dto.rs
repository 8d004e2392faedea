//! Data Transfer Objects for the HTTP API.
//!
//! Wire formats are camelCase. Store records are converted with `From`
//! impls; request bodies convert into the drafts the services accept.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{
    AttendanceMark, AttendanceRecord, AttendanceStatus, BehaviorKind, BehaviorNote,
    BehaviorNoteDraft, Classroom, ClassroomDraft, Grade, GradeDraft, Profile, Role, Student,
    StudentDraft, StudentId, UserId,
};

// =============================================================================
// Functions
// =============================================================================

/// Body of `POST /functions/delete-teacher`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTeacherRequest {
    #[serde(default)]
    pub teacher_user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Body of `POST /functions/send-broadcast`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendBroadcastRequest {
    #[serde(default)]
    pub broadcast_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendBroadcastResponse {
    pub success: bool,
    pub sent_count: u32,
    pub failed_count: u32,
}

/// Body of `POST /functions/extract-student-names`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractNamesRequest {
    #[serde(default)]
    pub image_base64: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractNamesResponse {
    pub names: Vec<String>,
}

// =============================================================================
// Health
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
}

// =============================================================================
// Classroom data
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassroomRequest {
    pub name: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub grade_level: Option<String>,
}

impl From<ClassroomRequest> for ClassroomDraft {
    fn from(req: ClassroomRequest) -> Self {
        ClassroomDraft {
            name: req.name,
            subject: req.subject,
            grade_level: req.grade_level,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassroomDto {
    pub id: String,
    pub name: String,
    pub subject: Option<String>,
    pub grade_level: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Classroom> for ClassroomDto {
    fn from(c: Classroom) -> Self {
        Self {
            id: c.id.to_string(),
            name: c.name,
            subject: c.subject,
            grade_level: c.grade_level,
            created_at: c.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassroomListResponse {
    pub classrooms: Vec<ClassroomDto>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRequest {
    pub full_name: String,
    #[serde(default)]
    pub student_number: Option<String>,
}

impl From<StudentRequest> for StudentDraft {
    fn from(req: StudentRequest) -> Self {
        StudentDraft {
            full_name: req.full_name,
            student_number: req.student_number,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentDto {
    pub id: String,
    pub classroom_id: String,
    pub full_name: String,
    pub student_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Student> for StudentDto {
    fn from(s: Student) -> Self {
        Self {
            id: s.id.to_string(),
            classroom_id: s.classroom_id.to_string(),
            full_name: s.full_name,
            student_number: s.student_number,
            created_at: s.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentListResponse {
    pub students: Vec<StudentDto>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRequest {
    pub student_id: StudentId,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub note: Option<String>,
}

impl From<AttendanceRequest> for AttendanceMark {
    fn from(req: AttendanceRequest) -> Self {
        AttendanceMark {
            student_id: req.student_id,
            date: req.date,
            status: req.status,
            note: req.note,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceDto {
    pub id: String,
    pub student_id: String,
    pub classroom_id: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub note: Option<String>,
}

impl From<AttendanceRecord> for AttendanceDto {
    fn from(r: AttendanceRecord) -> Self {
        Self {
            id: r.id.to_string(),
            student_id: r.student_id.to_string(),
            classroom_id: r.classroom_id.to_string(),
            date: r.date,
            status: r.status,
            note: r.note,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceListResponse {
    pub date: NaiveDate,
    pub records: Vec<AttendanceDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRequest {
    pub student_id: StudentId,
    pub title: String,
    pub score: f64,
    pub max_score: f64,
    #[serde(default)]
    pub recorded_on: Option<NaiveDate>,
}

impl From<GradeRequest> for GradeDraft {
    fn from(req: GradeRequest) -> Self {
        GradeDraft {
            student_id: req.student_id,
            title: req.title,
            score: req.score,
            max_score: req.max_score,
            recorded_on: req.recorded_on,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeDto {
    pub id: String,
    pub student_id: String,
    pub classroom_id: String,
    pub title: String,
    pub score: f64,
    pub max_score: f64,
    pub percentage: f64,
    pub recorded_on: NaiveDate,
}

impl From<Grade> for GradeDto {
    fn from(g: Grade) -> Self {
        let percentage = g.percentage();
        Self {
            id: g.id.to_string(),
            student_id: g.student_id.to_string(),
            classroom_id: g.classroom_id.to_string(),
            title: g.title,
            score: g.score,
            max_score: g.max_score,
            percentage,
            recorded_on: g.recorded_on,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeListResponse {
    pub grades: Vec<GradeDto>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorNoteRequest {
    pub student_id: StudentId,
    pub kind: BehaviorKind,
    pub note: String,
}

impl From<BehaviorNoteRequest> for BehaviorNoteDraft {
    fn from(req: BehaviorNoteRequest) -> Self {
        BehaviorNoteDraft {
            student_id: req.student_id,
            kind: req.kind,
            note: req.note,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorNoteDto {
    pub id: String,
    pub student_id: String,
    pub kind: BehaviorKind,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

impl From<BehaviorNote> for BehaviorNoteDto {
    fn from(n: BehaviorNote) -> Self {
        Self {
            id: n.id.to_string(),
            student_id: n.student_id.to_string(),
            kind: n.kind,
            note: n.note,
            created_at: n.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorNoteListResponse {
    pub notes: Vec<BehaviorNoteDto>,
    pub total: usize,
}

// =============================================================================
// Caller
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDto {
    pub full_name: Option<String>,
    pub email: Option<String>,
}

impl From<Profile> for ProfileDto {
    fn from(p: Profile) -> Self {
        Self {
            full_name: p.full_name,
            email: p.email,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user_id: UserId,
    pub email: Option<String>,
    pub roles: Vec<Role>,
    pub is_admin: bool,
    pub profile: Option<ProfileDto>,
}

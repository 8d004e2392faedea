//! Classroom-level records owned by a teacher.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::identity::UserId;

crate::define_id_type!(ClassroomId);
crate::define_id_type!(StudentId);
crate::define_id_type!(AttendanceId);
crate::define_id_type!(GradeId);
crate::define_id_type!(BehaviorNoteId);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classroom {
    pub id: ClassroomId,
    pub teacher_id: UserId,
    pub name: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub grade_level: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields accepted when creating or updating a classroom.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassroomDraft {
    pub name: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub grade_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub teacher_id: UserId,
    pub classroom_id: ClassroomId,
    pub full_name: String,
    #[serde(default)]
    pub student_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentDraft {
    pub full_name: String,
    #[serde(default)]
    pub student_number: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

impl FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "present" => Ok(AttendanceStatus::Present),
            "absent" => Ok(AttendanceStatus::Absent),
            "late" => Ok(AttendanceStatus::Late),
            "excused" => Ok(AttendanceStatus::Excused),
            other => Err(format!("Unknown attendance status: {}", other)),
        }
    }
}

/// One attendance mark. Unique per `(student_id, date)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: AttendanceId,
    pub teacher_id: UserId,
    pub student_id: StudentId,
    pub classroom_id: ClassroomId,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub note: Option<String>,
}

/// An attendance mark as submitted by a teacher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceMark {
    pub student_id: StudentId,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    pub id: GradeId,
    pub teacher_id: UserId,
    pub student_id: StudentId,
    pub classroom_id: ClassroomId,
    pub title: String,
    pub score: f64,
    pub max_score: f64,
    pub recorded_on: NaiveDate,
}

impl Grade {
    /// Score as a percentage of `max_score`.
    pub fn percentage(&self) -> f64 {
        if self.max_score <= 0.0 {
            return 0.0;
        }
        self.score / self.max_score * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeDraft {
    pub student_id: StudentId,
    pub title: String,
    pub score: f64,
    pub max_score: f64,
    /// Defaults to today when absent.
    #[serde(default)]
    pub recorded_on: Option<NaiveDate>,
}

impl GradeDraft {
    /// Check `max_score > 0` and `0 <= score <= max_score`.
    pub fn validate(&self) -> Result<(), String> {
        if !self.max_score.is_finite() || self.max_score <= 0.0 {
            return Err("maxScore must be greater than zero".to_string());
        }
        if !self.score.is_finite() || self.score < 0.0 || self.score > self.max_score {
            return Err(format!(
                "score must be between 0 and {}",
                self.max_score
            ));
        }
        if self.title.trim().is_empty() {
            return Err("title is required".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BehaviorKind {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorNote {
    pub id: BehaviorNoteId,
    pub teacher_id: UserId,
    pub student_id: StudentId,
    pub kind: BehaviorKind,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorNoteDraft {
    pub student_id: StudentId,
    pub kind: BehaviorKind,
    pub note: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attendance_status_parse() {
        assert_eq!(
            "Present".parse::<AttendanceStatus>().unwrap(),
            AttendanceStatus::Present
        );
        assert!("sick".parse::<AttendanceStatus>().is_err());
    }

    #[test]
    fn test_grade_percentage() {
        let grade = Grade {
            id: GradeId::random(),
            teacher_id: UserId::random(),
            student_id: StudentId::random(),
            classroom_id: ClassroomId::random(),
            title: "Quiz 1".to_string(),
            score: 18.0,
            max_score: 20.0,
            recorded_on: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        };
        assert!((grade.percentage() - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_grade_draft_range() {
        let mut draft = GradeDraft {
            student_id: StudentId::random(),
            title: "Midterm".to_string(),
            score: 20.0,
            max_score: 20.0,
            recorded_on: None,
        };
        assert!(draft.validate().is_ok());

        draft.score = 21.0;
        assert!(draft.validate().is_err());

        draft.score = -1.0;
        assert!(draft.validate().is_err());

        draft.score = 0.0;
        draft.max_score = 0.0;
        assert!(draft.validate().is_err());
    }
}

//! Public API surface for the Teacher Hub backend.
//!
//! This file consolidates the record and identifier types shared by the
//! repository layer, the services and the HTTP API. All types derive
//! Serialize/Deserialize for JSON serialization.

pub use crate::models::broadcast::{
    Broadcast, BroadcastId, BroadcastProgress, BroadcastStatus, RecipientFilter,
};
pub use crate::models::classroom::{
    AttendanceId, AttendanceMark, AttendanceRecord, AttendanceStatus, BehaviorKind,
    BehaviorNote, BehaviorNoteDraft, BehaviorNoteId, Classroom, ClassroomDraft, ClassroomId,
    Grade, GradeDraft, GradeId, Student, StudentDraft, StudentId,
};
pub use crate::models::identity::{
    AuthUser, OwnedTable, Profile, Role, Subscription, SubscriptionStatus, UserId,
};

#[cfg(test)]
#[path = "api_tests.rs"]
mod api_tests;

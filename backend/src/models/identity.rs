//! Identity-level records: users, roles, profiles, subscriptions, and the
//! set of tables a teacher identity owns.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

crate::define_id_type!(UserId);

/// Role assignment held in `user_roles`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "teacher" => Ok(Role::Teacher),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// Status of a teacher's subscription record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Trial,
    Expired,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Trial => "trial",
            SubscriptionStatus::Expired => "expired",
        }
    }
}

impl FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(SubscriptionStatus::Active),
            "trial" => Ok(SubscriptionStatus::Trial),
            "expired" => Ok(SubscriptionStatus::Expired),
            other => Err(format!("Unknown subscription status: {}", other)),
        }
    }
}

/// One row of `subscriptions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub user_id: UserId,
    pub status: SubscriptionStatus,
}

/// One row of `profiles`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Profile {
    /// Display name if the profile carries a non-blank one.
    pub fn display_name(&self) -> Option<&str> {
        self.full_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// An authentication identity as seen by the auth admin API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
}

/// Tables holding rows owned by a teacher identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnedTable {
    AttendanceRecords,
    Grades,
    BehaviorNotes,
    StudentPositions,
    Students,
    GradingTemplates,
    Classrooms,
    Profiles,
    UserRoles,
}

impl OwnedTable {
    /// Order in which a teacher's rows are removed. Children come before
    /// the rows they reference.
    pub const DELETION_ORDER: [OwnedTable; 9] = [
        OwnedTable::AttendanceRecords,
        OwnedTable::Grades,
        OwnedTable::BehaviorNotes,
        OwnedTable::StudentPositions,
        OwnedTable::Students,
        OwnedTable::GradingTemplates,
        OwnedTable::Classrooms,
        OwnedTable::Profiles,
        OwnedTable::UserRoles,
    ];

    pub fn table_name(&self) -> &'static str {
        match self {
            OwnedTable::AttendanceRecords => "attendance_records",
            OwnedTable::Grades => "grades",
            OwnedTable::BehaviorNotes => "behavior_notes",
            OwnedTable::StudentPositions => "student_positions",
            OwnedTable::Students => "students",
            OwnedTable::GradingTemplates => "grading_templates",
            OwnedTable::Classrooms => "classrooms",
            OwnedTable::Profiles => "profiles",
            OwnedTable::UserRoles => "user_roles",
        }
    }

    /// Column that scopes the table's rows to their owner.
    pub fn owner_column(&self) -> &'static str {
        match self {
            OwnedTable::Profiles | OwnedTable::UserRoles => "user_id",
            _ => "teacher_id",
        }
    }
}

impl fmt::Display for OwnedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip_through_str() {
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(Role::Teacher.to_string(), "teacher");
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn test_deletion_order_puts_children_first() {
        let order = OwnedTable::DELETION_ORDER;
        let pos = |t: OwnedTable| order.iter().position(|x| *x == t).unwrap();
        assert!(pos(OwnedTable::AttendanceRecords) < pos(OwnedTable::Students));
        assert!(pos(OwnedTable::Grades) < pos(OwnedTable::Students));
        assert!(pos(OwnedTable::StudentPositions) < pos(OwnedTable::Students));
        assert!(pos(OwnedTable::Students) < pos(OwnedTable::Classrooms));
        assert_eq!(order.last(), Some(&OwnedTable::UserRoles));
    }

    #[test]
    fn test_owner_columns() {
        assert_eq!(OwnedTable::Grades.owner_column(), "teacher_id");
        assert_eq!(OwnedTable::Profiles.owner_column(), "user_id");
        assert_eq!(OwnedTable::UserRoles.owner_column(), "user_id");
    }

    #[test]
    fn test_profile_display_name_ignores_blank() {
        let blank = Profile {
            full_name: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(blank.display_name(), None);

        let named = Profile {
            full_name: Some(" Ahmed ".to_string()),
            ..Default::default()
        };
        assert_eq!(named.display_name(), Some("Ahmed"));
    }

    #[test]
    fn test_user_id_serializes_as_bare_uuid() {
        let id = UserId::random();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
        let parsed: UserId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }
}

//! In-memory repository for unit testing and local development.
//!
//! Holds every table in a single `parking_lot::RwLock`. Besides the trait
//! methods it exposes seeding helpers and a few observation hooks
//! (mutation counter, deletion log, progress writes, failure injection)
//! used by the test suites.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

use crate::api::{
    AttendanceRecord, AuthUser, BehaviorNote, BehaviorNoteId, Broadcast, BroadcastId,
    BroadcastProgress, BroadcastStatus, Classroom, ClassroomDraft, ClassroomId, Grade, GradeId,
    OwnedTable, Profile, RecipientFilter, Role, Student, StudentDraft, StudentId, Subscription,
    SubscriptionStatus, UserId,
};
use crate::db::repository::{
    BroadcastRepository, ClassroomRepository, ErrorContext, FullRepository, IdentityRepository,
    RepositoryError, RepositoryResult,
};

#[derive(Default)]
struct LocalState {
    sessions: HashMap<String, UserId>,
    auth_users: HashMap<UserId, AuthUser>,
    user_roles: Vec<(UserId, Role)>,
    profiles: HashMap<UserId, Profile>,
    subscriptions: Vec<Subscription>,
    broadcasts: HashMap<BroadcastId, Broadcast>,
    classrooms: Vec<Classroom>,
    students: Vec<Student>,
    attendance: Vec<AttendanceRecord>,
    grades: Vec<Grade>,
    behavior_notes: Vec<BehaviorNote>,
    /// Owner IDs of rows in tables this service never reads
    /// (student positions, grading templates).
    opaque_rows: HashMap<OwnedTable, Vec<UserId>>,

    // Observation hooks
    mutations: u64,
    deletion_log: Vec<OwnedTable>,
    progress_writes: Vec<(BroadcastId, BroadcastProgress)>,
    failing_tables: HashSet<OwnedTable>,
    fail_auth_deletion: bool,
    fail_progress_writes: bool,
    healthy: bool,
}

/// In-memory implementation of [`FullRepository`].
pub struct LocalRepository {
    state: RwLock<LocalState>,
}

impl LocalRepository {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(LocalState {
                healthy: true,
                ..Default::default()
            }),
        }
    }

    // ==================== Seeding ====================

    /// Register an auth identity and return its ID.
    pub fn add_user(&self, email: Option<&str>) -> UserId {
        let id = UserId::random();
        self.state.write().auth_users.insert(
            id,
            AuthUser {
                id,
                email: email.map(str::to_string),
            },
        );
        id
    }

    /// Issue a bearer credential for an existing identity.
    pub fn issue_token(&self, user_id: UserId) -> String {
        let token = format!("local-{}", uuid::Uuid::new_v4().simple());
        self.state.write().sessions.insert(token.clone(), user_id);
        token
    }

    pub fn grant_role(&self, user_id: UserId, role: Role) {
        let mut state = self.state.write();
        if !state.user_roles.contains(&(user_id, role)) {
            state.user_roles.push((user_id, role));
        }
    }

    pub fn put_profile(&self, user_id: UserId, full_name: Option<&str>) {
        let email = self
            .state
            .read()
            .auth_users
            .get(&user_id)
            .and_then(|u| u.email.clone());
        self.state.write().profiles.insert(
            user_id,
            Profile {
                user_id: Some(user_id),
                full_name: full_name.map(str::to_string),
                email,
            },
        );
    }

    pub fn add_subscription(&self, user_id: UserId, status: SubscriptionStatus) {
        self.state
            .write()
            .subscriptions
            .push(Subscription { user_id, status });
    }

    pub fn insert_broadcast(&self, broadcast: Broadcast) -> BroadcastId {
        let id = broadcast.id;
        self.state.write().broadcasts.insert(id, broadcast);
        id
    }

    /// Add a row to a table that has no typed representation here
    /// (`student_positions`, `grading_templates`).
    pub fn add_opaque_row(&self, table: OwnedTable, owner: UserId) {
        self.state
            .write()
            .opaque_rows
            .entry(table)
            .or_default()
            .push(owner);
    }

    // ==================== Observation ====================

    /// Number of rows in `table` scoped to `owner`.
    pub fn count_owned_rows(&self, table: OwnedTable, owner: UserId) -> usize {
        let state = self.state.read();
        match table {
            OwnedTable::AttendanceRecords => state
                .attendance
                .iter()
                .filter(|r| r.teacher_id == owner)
                .count(),
            OwnedTable::Grades => state.grades.iter().filter(|g| g.teacher_id == owner).count(),
            OwnedTable::BehaviorNotes => state
                .behavior_notes
                .iter()
                .filter(|n| n.teacher_id == owner)
                .count(),
            OwnedTable::Students => state
                .students
                .iter()
                .filter(|s| s.teacher_id == owner)
                .count(),
            OwnedTable::Classrooms => state
                .classrooms
                .iter()
                .filter(|c| c.teacher_id == owner)
                .count(),
            OwnedTable::Profiles => usize::from(state.profiles.contains_key(&owner)),
            OwnedTable::UserRoles => state
                .user_roles
                .iter()
                .filter(|(user, _)| *user == owner)
                .count(),
            OwnedTable::StudentPositions | OwnedTable::GradingTemplates => state
                .opaque_rows
                .get(&table)
                .map(|owners| owners.iter().filter(|o| **o == owner).count())
                .unwrap_or(0),
        }
    }

    pub fn has_auth_user(&self, user_id: UserId) -> bool {
        self.state.read().auth_users.contains_key(&user_id)
    }

    /// Count of write operations performed through the trait methods.
    pub fn mutation_count(&self) -> u64 {
        self.state.read().mutations
    }

    /// Tables passed to `delete_owned_rows`, in call order.
    pub fn deletion_log(&self) -> Vec<OwnedTable> {
        self.state.read().deletion_log.clone()
    }

    /// Checkpoint writes recorded for a broadcast, in order.
    pub fn progress_writes(&self, id: BroadcastId) -> Vec<BroadcastProgress> {
        self.state
            .read()
            .progress_writes
            .iter()
            .filter(|(job, _)| *job == id)
            .map(|(_, progress)| *progress)
            .collect()
    }

    pub fn broadcast(&self, id: BroadcastId) -> Option<Broadcast> {
        self.state.read().broadcasts.get(&id).cloned()
    }

    // ==================== Failure Injection ====================

    /// Make every `delete_owned_rows` call for `table` fail.
    pub fn fail_deletes_for(&self, table: OwnedTable) {
        self.state.write().failing_tables.insert(table);
    }

    pub fn fail_auth_deletion(&self) {
        self.state.write().fail_auth_deletion = true;
    }

    pub fn fail_progress_writes(&self) {
        self.state.write().fail_progress_writes = true;
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.state.write().healthy = healthy;
    }
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn student_owned_by(state: &LocalState, teacher: UserId, id: StudentId) -> Option<&Student> {
    state
        .students
        .iter()
        .find(|s| s.id == id && s.teacher_id == teacher)
}

fn classroom_owned_by(state: &LocalState, teacher: UserId, id: ClassroomId) -> bool {
    state
        .classrooms
        .iter()
        .any(|c| c.id == id && c.teacher_id == teacher)
}

fn drop_student_records(state: &mut LocalState, student_ids: &HashSet<StudentId>) {
    state
        .attendance
        .retain(|r| !student_ids.contains(&r.student_id));
    state.grades.retain(|g| !student_ids.contains(&g.student_id));
    state
        .behavior_notes
        .retain(|n| !student_ids.contains(&n.student_id));
}

#[async_trait]
impl IdentityRepository for LocalRepository {
    async fn resolve_session(&self, token: &str) -> RepositoryResult<Option<UserId>> {
        let state = self.state.read();
        Ok(state
            .sessions
            .get(token)
            .copied()
            .filter(|user| state.auth_users.contains_key(user)))
    }

    async fn has_role(&self, user_id: UserId, role: Role) -> RepositoryResult<bool> {
        Ok(self.state.read().user_roles.contains(&(user_id, role)))
    }

    async fn list_roles(&self, user_id: UserId) -> RepositoryResult<Vec<Role>> {
        Ok(self
            .state
            .read()
            .user_roles
            .iter()
            .filter(|(user, _)| *user == user_id)
            .map(|(_, role)| *role)
            .collect())
    }

    async fn find_auth_user(&self, user_id: UserId) -> RepositoryResult<Option<AuthUser>> {
        Ok(self.state.read().auth_users.get(&user_id).cloned())
    }

    async fn fetch_profile(&self, user_id: UserId) -> RepositoryResult<Option<Profile>> {
        Ok(self.state.read().profiles.get(&user_id).cloned())
    }

    async fn delete_owned_rows(&self, table: OwnedTable, owner: UserId) -> RepositoryResult<u64> {
        let mut state = self.state.write();
        state.deletion_log.push(table);

        if state.failing_tables.contains(&table) {
            return Err(RepositoryError::query_with_context(
                "delete rejected by store",
                ErrorContext::new("delete_owned_rows")
                    .with_entity(table.table_name())
                    .with_entity_id(owner),
            ));
        }

        state.mutations += 1;
        let removed = match table {
            OwnedTable::AttendanceRecords => {
                let before = state.attendance.len();
                state.attendance.retain(|r| r.teacher_id != owner);
                before - state.attendance.len()
            }
            OwnedTable::Grades => {
                let before = state.grades.len();
                state.grades.retain(|g| g.teacher_id != owner);
                before - state.grades.len()
            }
            OwnedTable::BehaviorNotes => {
                let before = state.behavior_notes.len();
                state.behavior_notes.retain(|n| n.teacher_id != owner);
                before - state.behavior_notes.len()
            }
            OwnedTable::Students => {
                let before = state.students.len();
                state.students.retain(|s| s.teacher_id != owner);
                before - state.students.len()
            }
            OwnedTable::Classrooms => {
                let before = state.classrooms.len();
                state.classrooms.retain(|c| c.teacher_id != owner);
                before - state.classrooms.len()
            }
            OwnedTable::Profiles => usize::from(state.profiles.remove(&owner).is_some()),
            OwnedTable::UserRoles => {
                let before = state.user_roles.len();
                state.user_roles.retain(|(user, _)| *user != owner);
                before - state.user_roles.len()
            }
            OwnedTable::StudentPositions | OwnedTable::GradingTemplates => {
                let rows = state.opaque_rows.entry(table).or_default();
                let before = rows.len();
                rows.retain(|o| *o != owner);
                before - rows.len()
            }
        };

        Ok(removed as u64)
    }

    async fn delete_auth_user(&self, user_id: UserId) -> RepositoryResult<()> {
        let mut state = self.state.write();
        if state.fail_auth_deletion {
            return Err(RepositoryError::query_with_context(
                "auth admin rejected deletion",
                ErrorContext::new("delete_auth_user")
                    .with_entity("auth_user")
                    .with_entity_id(user_id),
            ));
        }

        state.mutations += 1;
        if state.auth_users.remove(&user_id).is_none() {
            return Err(RepositoryError::not_found_with_context(
                "User not found",
                ErrorContext::new("delete_auth_user")
                    .with_entity("auth_user")
                    .with_entity_id(user_id),
            ));
        }
        state.sessions.retain(|_, user| *user != user_id);
        Ok(())
    }
}

#[async_trait]
impl BroadcastRepository for LocalRepository {
    async fn get_broadcast(&self, id: BroadcastId) -> RepositoryResult<Option<Broadcast>> {
        Ok(self.state.read().broadcasts.get(&id).cloned())
    }

    async fn list_subscriber_ids(&self, filter: RecipientFilter) -> RepositoryResult<Vec<UserId>> {
        Ok(self
            .state
            .read()
            .subscriptions
            .iter()
            .filter(|s| filter.matches(s.status))
            .map(|s| s.user_id)
            .collect())
    }

    async fn mark_broadcast_sending(
        &self,
        id: BroadcastId,
        total_recipients: u32,
    ) -> RepositoryResult<()> {
        let mut state = self.state.write();
        state.mutations += 1;
        let job = state.broadcasts.get_mut(&id).ok_or_else(|| {
            RepositoryError::not_found_with_context(
                "Broadcast not found",
                ErrorContext::new("mark_broadcast_sending")
                    .with_entity("broadcast")
                    .with_entity_id(id),
            )
        })?;
        job.status = BroadcastStatus::Sending;
        job.total_recipients = total_recipients;
        Ok(())
    }

    async fn record_broadcast_progress(
        &self,
        id: BroadcastId,
        progress: BroadcastProgress,
    ) -> RepositoryResult<()> {
        let mut state = self.state.write();
        if state.fail_progress_writes {
            return Err(RepositoryError::query_with_context(
                "progress write rejected",
                ErrorContext::new("record_broadcast_progress")
                    .with_entity("broadcast")
                    .with_entity_id(id),
            ));
        }

        state.mutations += 1;
        state.progress_writes.push((id, progress));
        if let Some(job) = state.broadcasts.get_mut(&id) {
            job.sent_count = progress.sent_count;
            job.failed_count = progress.failed_count;
        }
        Ok(())
    }

    async fn complete_broadcast(
        &self,
        id: BroadcastId,
        progress: BroadcastProgress,
        sent_at: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let mut state = self.state.write();
        state.mutations += 1;
        let job = state.broadcasts.get_mut(&id).ok_or_else(|| {
            RepositoryError::not_found_with_context(
                "Broadcast not found",
                ErrorContext::new("complete_broadcast")
                    .with_entity("broadcast")
                    .with_entity_id(id),
            )
        })?;
        job.sent_count = progress.sent_count;
        job.failed_count = progress.failed_count;
        job.status = BroadcastStatus::Completed;
        job.sent_at = Some(sent_at);
        Ok(())
    }
}

#[async_trait]
impl ClassroomRepository for LocalRepository {
    async fn list_classrooms(&self, teacher: UserId) -> RepositoryResult<Vec<Classroom>> {
        Ok(self
            .state
            .read()
            .classrooms
            .iter()
            .filter(|c| c.teacher_id == teacher)
            .cloned()
            .collect())
    }

    async fn get_classroom(
        &self,
        teacher: UserId,
        id: ClassroomId,
    ) -> RepositoryResult<Option<Classroom>> {
        Ok(self
            .state
            .read()
            .classrooms
            .iter()
            .find(|c| c.id == id && c.teacher_id == teacher)
            .cloned())
    }

    async fn create_classroom(
        &self,
        teacher: UserId,
        draft: ClassroomDraft,
    ) -> RepositoryResult<Classroom> {
        let classroom = Classroom {
            id: ClassroomId::random(),
            teacher_id: teacher,
            name: draft.name,
            subject: draft.subject,
            grade_level: draft.grade_level,
            created_at: Utc::now(),
        };
        let mut state = self.state.write();
        state.mutations += 1;
        state.classrooms.push(classroom.clone());
        Ok(classroom)
    }

    async fn update_classroom(
        &self,
        teacher: UserId,
        id: ClassroomId,
        draft: ClassroomDraft,
    ) -> RepositoryResult<Option<Classroom>> {
        let mut state = self.state.write();
        let Some(classroom) = state
            .classrooms
            .iter_mut()
            .find(|c| c.id == id && c.teacher_id == teacher)
        else {
            return Ok(None);
        };
        classroom.name = draft.name;
        classroom.subject = draft.subject;
        classroom.grade_level = draft.grade_level;
        let updated = classroom.clone();
        state.mutations += 1;
        Ok(Some(updated))
    }

    async fn delete_classroom(&self, teacher: UserId, id: ClassroomId) -> RepositoryResult<bool> {
        let mut state = self.state.write();
        if !classroom_owned_by(&state, teacher, id) {
            return Ok(false);
        }

        let student_ids: HashSet<StudentId> = state
            .students
            .iter()
            .filter(|s| s.classroom_id == id)
            .map(|s| s.id)
            .collect();
        drop_student_records(&mut state, &student_ids);
        state.attendance.retain(|r| r.classroom_id != id);
        state.grades.retain(|g| g.classroom_id != id);
        state.students.retain(|s| s.classroom_id != id);
        state.classrooms.retain(|c| c.id != id);
        state.mutations += 1;
        Ok(true)
    }

    async fn list_students(
        &self,
        teacher: UserId,
        classroom: ClassroomId,
    ) -> RepositoryResult<Vec<Student>> {
        Ok(self
            .state
            .read()
            .students
            .iter()
            .filter(|s| s.classroom_id == classroom && s.teacher_id == teacher)
            .cloned()
            .collect())
    }

    async fn get_student(
        &self,
        teacher: UserId,
        id: StudentId,
    ) -> RepositoryResult<Option<Student>> {
        Ok(student_owned_by(&self.state.read(), teacher, id).cloned())
    }

    async fn create_student(
        &self,
        teacher: UserId,
        classroom: ClassroomId,
        draft: StudentDraft,
    ) -> RepositoryResult<Student> {
        let mut state = self.state.write();
        if !classroom_owned_by(&state, teacher, classroom) {
            return Err(RepositoryError::not_found_with_context(
                "Classroom not found",
                ErrorContext::new("create_student")
                    .with_entity("classroom")
                    .with_entity_id(classroom),
            ));
        }

        let student = Student {
            id: StudentId::random(),
            teacher_id: teacher,
            classroom_id: classroom,
            full_name: draft.full_name,
            student_number: draft.student_number,
            created_at: Utc::now(),
        };
        state.mutations += 1;
        state.students.push(student.clone());
        Ok(student)
    }

    async fn update_student(
        &self,
        teacher: UserId,
        id: StudentId,
        draft: StudentDraft,
    ) -> RepositoryResult<Option<Student>> {
        let mut state = self.state.write();
        let Some(student) = state
            .students
            .iter_mut()
            .find(|s| s.id == id && s.teacher_id == teacher)
        else {
            return Ok(None);
        };
        student.full_name = draft.full_name;
        student.student_number = draft.student_number;
        let updated = student.clone();
        state.mutations += 1;
        Ok(Some(updated))
    }

    async fn delete_student(&self, teacher: UserId, id: StudentId) -> RepositoryResult<bool> {
        let mut state = self.state.write();
        if student_owned_by(&state, teacher, id).is_none() {
            return Ok(false);
        }
        drop_student_records(&mut state, &HashSet::from([id]));
        state.students.retain(|s| s.id != id);
        state.mutations += 1;
        Ok(true)
    }

    async fn list_attendance(
        &self,
        teacher: UserId,
        classroom: ClassroomId,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<AttendanceRecord>> {
        Ok(self
            .state
            .read()
            .attendance
            .iter()
            .filter(|r| r.teacher_id == teacher && r.classroom_id == classroom && r.date == date)
            .cloned()
            .collect())
    }

    async fn upsert_attendance(
        &self,
        record: AttendanceRecord,
    ) -> RepositoryResult<AttendanceRecord> {
        let mut state = self.state.write();
        state.mutations += 1;
        if let Some(existing) = state
            .attendance
            .iter_mut()
            .find(|r| r.student_id == record.student_id && r.date == record.date)
        {
            existing.status = record.status;
            existing.note = record.note;
            return Ok(existing.clone());
        }
        state.attendance.push(record.clone());
        Ok(record)
    }

    async fn list_grades(
        &self,
        teacher: UserId,
        classroom: ClassroomId,
    ) -> RepositoryResult<Vec<Grade>> {
        Ok(self
            .state
            .read()
            .grades
            .iter()
            .filter(|g| g.teacher_id == teacher && g.classroom_id == classroom)
            .cloned()
            .collect())
    }

    async fn insert_grade(&self, grade: Grade) -> RepositoryResult<Grade> {
        let mut state = self.state.write();
        state.mutations += 1;
        state.grades.push(grade.clone());
        Ok(grade)
    }

    async fn delete_grade(&self, teacher: UserId, id: GradeId) -> RepositoryResult<bool> {
        let mut state = self.state.write();
        let before = state.grades.len();
        state
            .grades
            .retain(|g| !(g.id == id && g.teacher_id == teacher));
        let removed = state.grades.len() != before;
        if removed {
            state.mutations += 1;
        }
        Ok(removed)
    }

    async fn list_behavior_notes(
        &self,
        teacher: UserId,
        student: StudentId,
    ) -> RepositoryResult<Vec<BehaviorNote>> {
        Ok(self
            .state
            .read()
            .behavior_notes
            .iter()
            .filter(|n| n.teacher_id == teacher && n.student_id == student)
            .cloned()
            .collect())
    }

    async fn insert_behavior_note(&self, note: BehaviorNote) -> RepositoryResult<BehaviorNote> {
        let mut state = self.state.write();
        state.mutations += 1;
        state.behavior_notes.push(note.clone());
        Ok(note)
    }

    async fn delete_behavior_note(
        &self,
        teacher: UserId,
        id: BehaviorNoteId,
    ) -> RepositoryResult<bool> {
        let mut state = self.state.write();
        let before = state.behavior_notes.len();
        state
            .behavior_notes
            .retain(|n| !(n.id == id && n.teacher_id == teacher));
        let removed = state.behavior_notes.len() != before;
        if removed {
            state.mutations += 1;
        }
        Ok(removed)
    }
}

#[async_trait]
impl FullRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.state.read().healthy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_requires_live_identity() {
        let repo = LocalRepository::new();
        let user = repo.add_user(Some("t@example.com"));
        let token = repo.issue_token(user);

        assert_eq!(repo.resolve_session(&token).await.unwrap(), Some(user));
        assert_eq!(repo.resolve_session("bogus").await.unwrap(), None);

        repo.delete_auth_user(user).await.unwrap();
        assert_eq!(repo.resolve_session(&token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_owned_rows_is_noop_when_empty() {
        let repo = LocalRepository::new();
        let owner = UserId::random();
        for table in OwnedTable::DELETION_ORDER {
            assert_eq!(repo.delete_owned_rows(table, owner).await.unwrap(), 0);
        }
        assert_eq!(repo.deletion_log(), OwnedTable::DELETION_ORDER.to_vec());
    }

    #[tokio::test]
    async fn test_failing_table_reports_query_error() {
        let repo = LocalRepository::new();
        repo.fail_deletes_for(OwnedTable::Grades);
        let err = repo
            .delete_owned_rows(OwnedTable::Grades, UserId::random())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::QueryError { .. }));
        assert_eq!(err.context().entity.as_deref(), Some("grades"));
    }

    #[tokio::test]
    async fn test_subscriber_ids_keep_store_order() {
        let repo = LocalRepository::new();
        let a = UserId::random();
        let b = UserId::random();
        let c = UserId::random();
        repo.add_subscription(a, SubscriptionStatus::Trial);
        repo.add_subscription(b, SubscriptionStatus::Active);
        repo.add_subscription(c, SubscriptionStatus::Trial);

        let trial = repo
            .list_subscriber_ids(RecipientFilter::Trial)
            .await
            .unwrap();
        assert_eq!(trial, vec![a, c]);

        let all = repo.list_subscriber_ids(RecipientFilter::All).await.unwrap();
        assert_eq!(all, vec![a, b, c]);
    }

    #[tokio::test]
    async fn test_classroom_scoped_to_owner() {
        let repo = LocalRepository::new();
        let owner = UserId::random();
        let stranger = UserId::random();
        let classroom = repo
            .create_classroom(
                owner,
                ClassroomDraft {
                    name: "5A".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(repo
            .get_classroom(stranger, classroom.id)
            .await
            .unwrap()
            .is_none());
        assert!(!repo.delete_classroom(stranger, classroom.id).await.unwrap());
        assert!(repo.delete_classroom(owner, classroom.id).await.unwrap());
    }
}

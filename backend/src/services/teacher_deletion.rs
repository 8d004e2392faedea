//! Administrative deletion of a teacher account.
//!
//! An admin removes every row a teacher owns, table by table in
//! [`OwnedTable::DELETION_ORDER`], and then the teacher's auth identity.
//! The cascade is not transactional: a failing table is logged and skipped,
//! and a failing identity deletion does not change the outcome.

use log::{debug, error, info, warn};

use crate::api::{OwnedTable, Role, UserId};
use crate::db::repository::{IdentityRepository, RepositoryError};

#[derive(Debug, thiserror::Error)]
pub enum DeletionError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Admin access required")]
    Forbidden,

    #[error("Teacher user ID required")]
    MissingTarget,

    #[error("Cannot delete your own account")]
    SelfDeletion,

    #[error("{0}")]
    Internal(String),
}

impl From<RepositoryError> for DeletionError {
    fn from(err: RepositoryError) -> Self {
        DeletionError::Internal(err.to_string())
    }
}

/// Result of deleting one owned table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableStep {
    pub table: OwnedTable,
    /// Rows removed, or the store's error message.
    pub outcome: Result<u64, String>,
}

/// What a deletion actually did. Only success crosses the wire; the report
/// is logged.
#[derive(Debug, Clone, PartialEq)]
pub struct DeletionReport {
    pub target: UserId,
    pub requested_by: UserId,
    pub steps: Vec<TableStep>,
    /// `None` when the auth identity was deleted.
    pub identity_error: Option<String>,
}

impl DeletionReport {
    pub fn rows_deleted(&self) -> u64 {
        self.steps
            .iter()
            .filter_map(|step| step.outcome.as_ref().ok())
            .sum()
    }

    pub fn failed_tables(&self) -> Vec<OwnedTable> {
        self.steps
            .iter()
            .filter(|step| step.outcome.is_err())
            .map(|step| step.table)
            .collect()
    }

    pub fn identity_deleted(&self) -> bool {
        self.identity_error.is_none()
    }

    /// Every table and the identity were deleted without error.
    pub fn is_clean(&self) -> bool {
        self.identity_deleted() && self.failed_tables().is_empty()
    }
}

/// Resolve the credential and require the admin role.
pub async fn authorize_admin<R>(repo: &R, credential: Option<&str>) -> Result<UserId, DeletionError>
where
    R: IdentityRepository + ?Sized,
{
    let token = credential
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(DeletionError::Unauthorized)?;

    let caller = repo
        .resolve_session(token)
        .await?
        .ok_or(DeletionError::Unauthorized)?;

    if !repo.has_role(caller, Role::Admin).await? {
        warn!("User {} attempted teacher deletion without admin role", caller);
        return Err(DeletionError::Forbidden);
    }
    Ok(caller)
}

/// Parse the `teacherUserId` request field. Missing, blank and malformed
/// values are all reported as [`DeletionError::MissingTarget`].
pub fn parse_target(raw: Option<&str>) -> Result<UserId, DeletionError> {
    raw.map(str::trim)
        .filter(|id| !id.is_empty())
        .and_then(|id| id.parse().ok())
        .ok_or(DeletionError::MissingTarget)
}

/// Remove every owned row of `target` and then its auth identity.
///
/// Never fails: per-step errors are collected in the report.
pub async fn purge_teacher<R>(repo: &R, requested_by: UserId, target: UserId) -> DeletionReport
where
    R: IdentityRepository + ?Sized,
{
    let mut steps = Vec::with_capacity(OwnedTable::DELETION_ORDER.len());

    for table in OwnedTable::DELETION_ORDER {
        let outcome = match repo.delete_owned_rows(table, target).await {
            Ok(removed) => {
                debug!("Deleted {} rows from {} for {}", removed, table, target);
                Ok(removed)
            }
            Err(e) => {
                warn!("Deleting {} rows for {} failed, continuing: {}", table, target, e);
                Err(e.to_string())
            }
        };
        steps.push(TableStep { table, outcome });
    }

    let identity_error = match repo.delete_auth_user(target).await {
        Ok(()) => None,
        Err(e) => {
            error!("Deleting auth identity {} failed: {}", target, e);
            Some(e.to_string())
        }
    };

    DeletionReport {
        target,
        requested_by,
        steps,
        identity_error,
    }
}

/// Delete a teacher on behalf of the holder of `credential`.
///
/// Checks, in order: credential present and valid, caller is admin, target
/// present, target is not the caller. Nothing is deleted unless all pass.
pub async fn delete_teacher<R>(
    repo: &R,
    credential: Option<&str>,
    target: Option<&str>,
) -> Result<DeletionReport, DeletionError>
where
    R: IdentityRepository + ?Sized,
{
    let caller = authorize_admin(repo, credential).await?;
    let target = parse_target(target)?;
    if target == caller {
        return Err(DeletionError::SelfDeletion);
    }

    info!("Admin {} deleting teacher {}", caller, target);
    let report = purge_teacher(repo, caller, target).await;

    if report.is_clean() {
        info!(
            "Teacher {} deleted: {} rows removed",
            target,
            report.rows_deleted()
        );
    } else {
        warn!(
            "Teacher {} deleted with errors: {} rows removed, failed tables {:?}, identity deleted: {}",
            target,
            report.rows_deleted(),
            report.failed_tables(),
            report.identity_deleted()
        );
    }
    Ok(report)
}

//! Identity repository trait: sessions, roles, profiles and the teacher
//! data cascade.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::{AuthUser, OwnedTable, Profile, Role, UserId};

/// Repository trait for authentication identities and the rows they own.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    // ==================== Sessions & Roles ====================

    /// Resolve a bearer credential to the identity it was issued for.
    ///
    /// # Returns
    /// * `Ok(Some(UserId))` - The credential is valid
    /// * `Ok(None)` - The credential is unknown, expired or malformed
    /// * `Err(RepositoryError)` - The auth service could not be asked
    async fn resolve_session(&self, token: &str) -> RepositoryResult<Option<UserId>>;

    /// Role-check capability (`has_role(user, role)`).
    async fn has_role(&self, user_id: UserId, role: Role) -> RepositoryResult<bool>;

    /// All roles assigned to a user.
    async fn list_roles(&self, user_id: UserId) -> RepositoryResult<Vec<Role>>;

    // ==================== Identity Lookups ====================

    /// Fetch the auth identity (used for the email address).
    ///
    /// # Returns
    /// * `Ok(None)` - No identity with that ID exists
    async fn find_auth_user(&self, user_id: UserId) -> RepositoryResult<Option<AuthUser>>;

    /// Fetch the profile row for a user.
    async fn fetch_profile(&self, user_id: UserId) -> RepositoryResult<Option<Profile>>;

    // ==================== Deletion ====================

    /// Delete every row of `table` owned by `owner`.
    ///
    /// Deleting zero rows is not an error.
    ///
    /// # Returns
    /// * `Ok(u64)` - Number of rows deleted (may be an estimate for remote stores)
    async fn delete_owned_rows(&self, table: OwnedTable, owner: UserId) -> RepositoryResult<u64>;

    /// Remove the authentication identity itself.
    async fn delete_auth_user(&self, user_id: UserId) -> RepositoryResult<()>;
}

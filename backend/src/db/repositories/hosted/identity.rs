use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

use super::{eq, status_error, HostedRepository};
use crate::api::{AuthUser, OwnedTable, Profile, Role, UserId};
use crate::db::repository::{ErrorContext, IdentityRepository, RepositoryError, RepositoryResult};

#[derive(Debug, Deserialize)]
struct RoleRow {
    role: Role,
}

#[async_trait]
impl IdentityRepository for HostedRepository {
    async fn resolve_session(&self, token: &str) -> RepositoryResult<Option<UserId>> {
        let context = ErrorContext::new("resolve_session").with_entity("auth_user");
        let url = self.auth_url("user");
        let response = self
            .send_idempotent(|| self.as_user(self.client().get(&url), token), context.clone())
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED
            || status == StatusCode::FORBIDDEN
            || status == StatusCode::NOT_FOUND
        {
            return Ok(None);
        }

        let response = self.ensure_success(response, context.clone()).await?;
        let user: AuthUser = response
            .json()
            .await
            .map_err(|e| RepositoryError::from(e).with_operation("resolve_session"))?;
        Ok(Some(user.id))
    }

    async fn has_role(&self, user_id: UserId, role: Role) -> RepositoryResult<bool> {
        let context = ErrorContext::new("has_role")
            .with_entity("rpc/has_role")
            .with_entity_id(user_id);
        let url = self.rest_url("rpc/has_role");
        let body = json!({ "_user_id": user_id, "_role": role });
        let response = self
            .send_idempotent(
                || self.privileged(self.client().post(&url)).json(&body),
                context.clone(),
            )
            .await?;
        let response = self.ensure_success(response, context).await?;
        response
            .json::<bool>()
            .await
            .map_err(|e| RepositoryError::from(e).with_operation("has_role"))
    }

    async fn list_roles(&self, user_id: UserId) -> RepositoryResult<Vec<Role>> {
        let rows: Vec<RoleRow> = self
            .select("list_roles", "user_roles", &[eq("user_id", user_id)])
            .await?;
        Ok(rows.into_iter().map(|row| row.role).collect())
    }

    async fn find_auth_user(&self, user_id: UserId) -> RepositoryResult<Option<AuthUser>> {
        let context = ErrorContext::new("find_auth_user")
            .with_entity("auth_user")
            .with_entity_id(user_id);
        let url = self.auth_url(&format!("admin/users/{}", user_id));
        let response = self
            .send_idempotent(|| self.privileged(self.client().get(&url)), context.clone())
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = self.ensure_success(response, context).await?;
        let user: AuthUser = response
            .json()
            .await
            .map_err(|e| RepositoryError::from(e).with_operation("find_auth_user"))?;
        Ok(Some(user))
    }

    async fn fetch_profile(&self, user_id: UserId) -> RepositoryResult<Option<Profile>> {
        self.select_one("fetch_profile", "profiles", &[eq("user_id", user_id)])
            .await
    }

    async fn delete_owned_rows(&self, table: OwnedTable, owner: UserId) -> RepositoryResult<u64> {
        self.delete(
            "delete_owned_rows",
            table.table_name(),
            &[eq(table.owner_column(), owner)],
        )
        .await
    }

    async fn delete_auth_user(&self, user_id: UserId) -> RepositoryResult<()> {
        let context = ErrorContext::new("delete_auth_user")
            .with_entity("auth_user")
            .with_entity_id(user_id);
        let request = self.privileged(
            self.client()
                .delete(self.auth_url(&format!("admin/users/{}", user_id))),
        );
        let response = self.send(request, context.clone()).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, body.trim(), context))
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use super::{eq, HostedRepository, BROADCASTS_TABLE, SUBSCRIPTIONS_TABLE};
use crate::api::{Broadcast, BroadcastId, BroadcastProgress, BroadcastStatus, RecipientFilter, UserId};
use crate::db::repository::{BroadcastRepository, RepositoryResult};

#[derive(Debug, Deserialize)]
struct SubscriberRow {
    user_id: UserId,
}

#[async_trait]
impl BroadcastRepository for HostedRepository {
    async fn get_broadcast(&self, id: BroadcastId) -> RepositoryResult<Option<Broadcast>> {
        self.select_one("get_broadcast", BROADCASTS_TABLE, &[eq("id", id)])
            .await
    }

    async fn list_subscriber_ids(&self, filter: RecipientFilter) -> RepositoryResult<Vec<UserId>> {
        let mut filters = Vec::new();
        if let Some(status) = filter.status() {
            filters.push(eq("status", status.as_str()));
        }
        let rows: Vec<SubscriberRow> = self
            .select("list_subscriber_ids", SUBSCRIPTIONS_TABLE, &filters)
            .await?;
        Ok(rows.into_iter().map(|row| row.user_id).collect())
    }

    async fn mark_broadcast_sending(
        &self,
        id: BroadcastId,
        total_recipients: u32,
    ) -> RepositoryResult<()> {
        let patch = json!({
            "status": BroadcastStatus::Sending,
            "total_recipients": total_recipients,
        });
        let _: Vec<serde_json::Value> = self
            .update("mark_broadcast_sending", BROADCASTS_TABLE, &[eq("id", id)], &patch)
            .await?;
        Ok(())
    }

    async fn record_broadcast_progress(
        &self,
        id: BroadcastId,
        progress: BroadcastProgress,
    ) -> RepositoryResult<()> {
        let _: Vec<serde_json::Value> = self
            .update(
                "record_broadcast_progress",
                BROADCASTS_TABLE,
                &[eq("id", id)],
                &progress,
            )
            .await?;
        Ok(())
    }

    async fn complete_broadcast(
        &self,
        id: BroadcastId,
        progress: BroadcastProgress,
        sent_at: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let patch = json!({
            "status": BroadcastStatus::Completed,
            "sent_count": progress.sent_count,
            "failed_count": progress.failed_count,
            "sent_at": sent_at,
        });
        let _: Vec<serde_json::Value> = self
            .update("complete_broadcast", BROADCASTS_TABLE, &[eq("id", id)], &patch)
            .await?;
        Ok(())
    }
}

//! Broadcast repository trait: jobs, recipients and progress writes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::RepositoryResult;
use crate::api::{Broadcast, BroadcastId, BroadcastProgress, RecipientFilter, UserId};

/// Repository trait for broadcast email jobs.
#[async_trait]
pub trait BroadcastRepository: Send + Sync {
    /// Fetch a broadcast job.
    ///
    /// # Returns
    /// * `Ok(None)` - No job with that ID exists
    async fn get_broadcast(&self, id: BroadcastId) -> RepositoryResult<Option<Broadcast>>;

    /// User IDs of subscription rows matching `filter`, in store order.
    async fn list_subscriber_ids(&self, filter: RecipientFilter) -> RepositoryResult<Vec<UserId>>;

    /// Set `status = sending` and `total_recipients`.
    async fn mark_broadcast_sending(
        &self,
        id: BroadcastId,
        total_recipients: u32,
    ) -> RepositoryResult<()>;

    /// Persist the running counters (checkpoint).
    async fn record_broadcast_progress(
        &self,
        id: BroadcastId,
        progress: BroadcastProgress,
    ) -> RepositoryResult<()>;

    /// Persist final counters, `status = completed` and `sent_at`.
    async fn complete_broadcast(
        &self,
        id: BroadcastId,
        progress: BroadcastProgress,
        sent_at: DateTime<Utc>,
    ) -> RepositoryResult<()>;
}

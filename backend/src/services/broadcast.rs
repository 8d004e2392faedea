//! Broadcast email dispatch.
//!
//! A broadcast job names a subject, an HTML body and a recipient filter.
//! Dispatching resolves the matching subscribers, personalises the body
//! for each of them and sends sequentially, checkpointing counters every
//! [`CHECKPOINT_INTERVAL`] recipients. A job always ends `completed`, even
//! when every send failed.

use chrono::Utc;
use log::{debug, info, warn};

use super::dispatch_guard::DispatchGuard;
use super::email::{EmailMessage, EmailSender};
use crate::api::{Broadcast, BroadcastId, BroadcastProgress, UserId};
use crate::db::repository::{BroadcastRepository, IdentityRepository, RepositoryError};

/// Name used when a recipient has no usable profile name.
pub const FALLBACK_NAME: &str = "المعلم";

/// Placeholder replaced with the recipient's name in the HTML body.
/// Subjects are sent as stored.
pub const NAME_PLACEHOLDER: &str = "{{name}}";

/// Processed recipients between two progress writes.
pub const CHECKPOINT_INTERVAL: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    #[error("Broadcast ID required")]
    MissingId,

    #[error("Broadcast not found")]
    NotFound,

    #[error("Broadcast already sending")]
    AlreadySending,

    #[error("{0}")]
    Internal(String),
}

impl From<RepositoryError> for BroadcastError {
    fn from(err: RepositoryError) -> Self {
        BroadcastError::Internal(err.to_string())
    }
}

/// Final counters of one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub broadcast_id: BroadcastId,
    pub total_recipients: u32,
    pub sent_count: u32,
    pub failed_count: u32,
}

/// Parse the `broadcastId` request field.
pub fn parse_broadcast_id(raw: Option<&str>) -> Result<BroadcastId, BroadcastError> {
    raw.map(str::trim)
        .filter(|id| !id.is_empty())
        .and_then(|id| id.parse().ok())
        .ok_or(BroadcastError::MissingId)
}

/// Replace every `{{name}}` in `template`.
pub fn render_template(template: &str, name: &str) -> String {
    template.replace(NAME_PLACEHOLDER, name)
}

/// Display name for a recipient, falling back to [`FALLBACK_NAME`] when the
/// profile is missing, blank, or cannot be read.
pub async fn resolve_display_name<R>(repo: &R, user: UserId) -> String
where
    R: IdentityRepository + ?Sized,
{
    match repo.fetch_profile(user).await {
        Ok(Some(profile)) => profile
            .display_name()
            .map(str::to_string)
            .unwrap_or_else(|| FALLBACK_NAME.to_string()),
        Ok(None) => FALLBACK_NAME.to_string(),
        Err(e) => {
            debug!("Profile lookup for {} failed, using fallback name: {}", user, e);
            FALLBACK_NAME.to_string()
        }
    }
}

/// Look up the address, personalise the body and send. `Err` carries the reason the
/// recipient counts as failed.
async fn deliver<R, M>(repo: &R, mailer: &M, job: &Broadcast, user: UserId) -> Result<(), String>
where
    R: IdentityRepository + ?Sized,
    M: EmailSender + ?Sized,
{
    let email = match repo.find_auth_user(user).await {
        Ok(Some(auth)) => auth
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| "no email address".to_string())?,
        Ok(None) => return Err("identity not found".to_string()),
        Err(e) => return Err(format!("identity lookup failed: {}", e)),
    };

    let name = resolve_display_name(repo, user).await;
    let message = EmailMessage {
        to: email,
        subject: job.subject.clone(),
        html: render_template(&job.html_body, &name),
    };
    mailer.send(&message).await.map_err(|e| e.to_string())
}

/// Dispatch broadcast `id` to every matching subscriber.
///
/// Refuses with [`BroadcastError::AlreadySending`] while another dispatch of
/// the same ID runs in this process. Jobs already `sending` or `completed`
/// in the store are dispatched again.
pub async fn dispatch_broadcast<R, M>(
    repo: &R,
    mailer: &M,
    guard: &DispatchGuard,
    id: BroadcastId,
) -> Result<DispatchOutcome, BroadcastError>
where
    R: BroadcastRepository + IdentityRepository + ?Sized,
    M: EmailSender + ?Sized,
{
    let _permit = guard
        .try_acquire(id)
        .ok_or(BroadcastError::AlreadySending)?;

    let job = repo
        .get_broadcast(id)
        .await?
        .ok_or(BroadcastError::NotFound)?;

    let recipients = repo.list_subscriber_ids(job.recipient_filter).await?;
    let total = u32::try_from(recipients.len())
        .map_err(|_| BroadcastError::Internal("Too many recipients".to_string()))?;

    repo.mark_broadcast_sending(id, total).await?;
    info!(
        "Dispatching broadcast {} to {} recipients (filter: {:?})",
        id, total, job.recipient_filter
    );

    let mut progress = BroadcastProgress::default();
    for user in recipients {
        match deliver(repo, mailer, &job, user).await {
            Ok(()) => progress.sent_count += 1,
            Err(reason) => {
                warn!("Broadcast {}: delivery to {} failed: {}", id, user, reason);
                progress.failed_count += 1;
            }
        }

        if progress.processed() % CHECKPOINT_INTERVAL == 0 {
            match repo.record_broadcast_progress(id, progress).await {
                Ok(()) => debug!(
                    "Broadcast {} checkpoint: {} sent, {} failed",
                    id, progress.sent_count, progress.failed_count
                ),
                Err(e) => warn!("Broadcast {} checkpoint write failed: {}", id, e),
            }
        }
    }

    repo.complete_broadcast(id, progress, Utc::now()).await?;
    info!(
        "Broadcast {} completed: {} sent, {} failed",
        id, progress.sent_count, progress.failed_count
    );

    Ok(DispatchOutcome {
        broadcast_id: id,
        total_recipients: total,
        sent_count: progress.sent_count,
        failed_count: progress.failed_count,
    })
}

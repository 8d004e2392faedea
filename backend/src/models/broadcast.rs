//! Broadcast email jobs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::identity::SubscriptionStatus;

crate::define_id_type!(BroadcastId);

/// Which subscription cohort receives a broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecipientFilter {
    #[default]
    All,
    Active,
    Trial,
    Expired,
}

impl RecipientFilter {
    /// Status equality applied to `subscriptions`, or `None` for every row.
    pub fn status(&self) -> Option<SubscriptionStatus> {
        match self {
            RecipientFilter::All => None,
            RecipientFilter::Active => Some(SubscriptionStatus::Active),
            RecipientFilter::Trial => Some(SubscriptionStatus::Trial),
            RecipientFilter::Expired => Some(SubscriptionStatus::Expired),
        }
    }

    pub fn matches(&self, status: SubscriptionStatus) -> bool {
        self.status().map_or(true, |wanted| wanted == status)
    }
}

impl FromStr for RecipientFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(RecipientFilter::All),
            "active" => Ok(RecipientFilter::Active),
            "trial" => Ok(RecipientFilter::Trial),
            "expired" => Ok(RecipientFilter::Expired),
            other => Err(format!("Unknown recipient filter: {}", other)),
        }
    }
}

/// Lifecycle: `queued -> sending -> completed`. There is no failed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BroadcastStatus {
    #[default]
    Queued,
    Sending,
    Completed,
}

impl BroadcastStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BroadcastStatus::Queued => "queued",
            BroadcastStatus::Sending => "sending",
            BroadcastStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for BroadcastStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Broadcast {
    pub id: BroadcastId,
    pub subject: String,
    /// HTML body; every `{{name}}` is replaced per recipient.
    pub html_body: String,
    #[serde(default)]
    pub recipient_filter: RecipientFilter,
    #[serde(default)]
    pub status: BroadcastStatus,
    #[serde(default)]
    pub total_recipients: u32,
    #[serde(default)]
    pub sent_count: u32,
    #[serde(default)]
    pub failed_count: u32,
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Broadcast {
    /// New queued job with zeroed counters.
    pub fn queued(
        subject: impl Into<String>,
        html_body: impl Into<String>,
        recipient_filter: RecipientFilter,
    ) -> Self {
        Self {
            id: BroadcastId::random(),
            subject: subject.into(),
            html_body: html_body.into(),
            recipient_filter,
            status: BroadcastStatus::Queued,
            total_recipients: 0,
            sent_count: 0,
            failed_count: 0,
            sent_at: None,
            created_at: Utc::now(),
        }
    }
}

/// Running counters written at each checkpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastProgress {
    pub sent_count: u32,
    pub failed_count: u32,
}

impl BroadcastProgress {
    pub fn processed(&self) -> u32 {
        self.sent_count + self.failed_count
    }
}

//! crates/diary_tutor_core/src/callables.rs
//!
//! The two synchronous operations exposed to the app: publishing an entry to the
//! anonymized public feed, and checking the daily entry quota. Every check runs
//! before any mutation; a failed call leaves the store untouched.

use chrono::{DateTime, TimeZone};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::domain::{FeedPost, Visibility};
use crate::ports::{DiaryStore, PortError};
use crate::streak::DayBounds;

/// Maximum number of entries a user may create per calendar day.
pub const DAILY_ENTRY_LIMIT: u64 = 20;

/// Number of characters of the entry copied into a feed post.
pub const FEED_EXCERPT_CHARS: usize = 100;

/// Categorized failure reported to the caller of a callable operation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CallableError {
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    PermissionDenied(String),
    #[error("{0}")]
    ResourceExhausted(String),
    #[error("{0}")]
    Internal(String),
}

impl CallableError {
    /// The wire code of the error category.
    pub fn code(&self) -> &'static str {
        match self {
            CallableError::Unauthenticated(_) => "unauthenticated",
            CallableError::InvalidArgument(_) => "invalid-argument",
            CallableError::NotFound(_) => "not-found",
            CallableError::PermissionDenied(_) => "permission-denied",
            CallableError::ResourceExhausted(_) => "resource-exhausted",
            CallableError::Internal(_) => "internal",
        }
    }
}

impl From<PortError> for CallableError {
    fn from(err: PortError) -> Self {
        error!("Callable failed on a collaborator: {:?}", err);
        CallableError::Internal("Internal error".to_string())
    }
}

/// Result of a successful quota check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub count: u64,
    pub remaining: u64,
}

#[derive(Clone)]
pub struct Callables {
    store: Arc<dyn DiaryStore>,
}

impl Callables {
    pub fn new(store: Arc<dyn DiaryStore>) -> Self {
        Self { store }
    }

    /// Publishes an anonymized excerpt of `entry_id` on behalf of `caller`.
    pub async fn publish_to_feed(
        &self,
        caller: Option<Uuid>,
        entry_id: Option<&str>,
    ) -> Result<FeedPost, CallableError> {
        let caller = require_caller(caller)?;

        let entry_id = entry_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                CallableError::InvalidArgument("entryId parameter is required".to_string())
            })?;

        // An id that cannot be parsed cannot name a stored entry.
        let entry_id = Uuid::parse_str(entry_id)
            .map_err(|_| CallableError::NotFound("Entry not found".to_string()))?;

        let entry = match self.store.get_entry(entry_id).await {
            Ok(entry) => entry,
            Err(PortError::NotFound(_)) => {
                return Err(CallableError::NotFound("Entry not found".to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        if entry.owner_id != caller {
            return Err(CallableError::PermissionDenied("Not authorized".to_string()));
        }

        if entry.visibility != Visibility::Anon {
            return Err(CallableError::InvalidArgument(
                "Entry must be set to anonymous".to_string(),
            ));
        }

        let post = FeedPost {
            lang: entry.lang,
            text: excerpt(&entry.text_raw),
            mood: entry.mood,
        };
        self.store.insert_feed_post(&post).await?;
        info!("Entry {} published to the public feed", entry_id);

        Ok(post)
    }

    /// Counts the caller's entries since the start of the day containing `now`.
    pub async fn check_rate_limit<Tz: TimeZone>(
        &self,
        caller: Option<Uuid>,
        now: DateTime<Tz>,
    ) -> Result<RateLimitStatus, CallableError> {
        let caller = require_caller(caller)?;
        let bounds = DayBounds::containing(&now);

        let count = self
            .store
            .count_entries_since(caller, bounds.start_of_today)
            .await?;

        if count >= DAILY_ENTRY_LIMIT {
            return Err(CallableError::ResourceExhausted(format!(
                "Daily limit of {} entries reached",
                DAILY_ENTRY_LIMIT
            )));
        }

        Ok(RateLimitStatus {
            count,
            remaining: DAILY_ENTRY_LIMIT - count,
        })
    }
}

fn require_caller(caller: Option<Uuid>) -> Result<Uuid, CallableError> {
    caller.ok_or_else(|| CallableError::Unauthenticated("User must be authenticated".to_string()))
}

/// First `FEED_EXCERPT_CHARS` characters of `text`.
pub fn excerpt(text: &str) -> String {
    text.chars().take(FEED_EXCERPT_CHARS).collect()
}

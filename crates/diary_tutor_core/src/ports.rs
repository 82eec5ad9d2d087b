//! crates/diary_tutor_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete database and LLM provider.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{CorrectionResult, DiaryEntry, FeedPost, UserProfile};
use crate::prompt::CorrectionPrompt;
use crate::streak::StreakChange;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A required credential or setting is missing. Raised before any external call.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// The LLM answered with something that does not satisfy the response contract.
    #[error("Invalid LLM response: {0}")]
    InvalidResponse(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Everything a successful analysis writes, applied as one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisCompletion {
    pub entry_id: Uuid,
    pub owner_id: Uuid,
    pub result: CorrectionResult,
    pub streak: StreakChange,
}

#[async_trait]
pub trait DiaryStore: Send + Sync {
    // --- Users ---
    /// Returns `None` when the user has never saved a profile.
    async fn find_user_profile(&self, user_id: Uuid) -> PortResult<Option<UserProfile>>;

    // --- Entries ---
    async fn get_entry(&self, entry_id: Uuid) -> PortResult<DiaryEntry>;

    /// Takes the exclusive right to analyze a pending entry. Returns `false` when
    /// the entry is not pending or another run already holds it.
    async fn claim_entry(&self, entry_id: Uuid) -> PortResult<bool>;

    /// Ids of entries still waiting for analysis, oldest first.
    async fn pending_entry_ids(&self) -> PortResult<Vec<Uuid>>;

    /// Stores the result, applies the streak change and sets the status to `done`,
    /// all or nothing. Fails if the entry is no longer pending or already has a result.
    async fn complete_analysis(&self, completion: &AnalysisCompletion) -> PortResult<()>;

    /// Sets a still-pending entry to `error`. Finished entries are left as they are.
    async fn mark_entry_failed(&self, entry_id: Uuid) -> PortResult<()>;

    /// Counts the owner's entries created at or after `since`.
    async fn count_entries_since(&self, owner_id: Uuid, since: DateTime<Utc>) -> PortResult<u64>;

    /// Counts the owner's entries created in `[from, until)`.
    async fn count_entries_between(
        &self,
        owner_id: Uuid,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> PortResult<u64>;

    // --- Feed ---
    async fn insert_feed_post(&self, post: &FeedPost) -> PortResult<()>;
}

#[async_trait]
pub trait SessionResolver: Send + Sync {
    /// Resolves an auth session token to the verified user id, if the session is live.
    async fn resolve_session(&self, token: &str) -> PortResult<Option<Uuid>>;
}

#[async_trait]
pub trait CorrectionService: Send + Sync {
    /// Sends one prompt pair to the LLM and returns the parsed correction.
    async fn correct(&self, prompt: &CorrectionPrompt) -> PortResult<CorrectionResult>;
}

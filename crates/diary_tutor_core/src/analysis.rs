//! crates/diary_tutor_core/src/analysis.rs
//!
//! The entry-analysis pipeline run for every newly created diary entry.
//!
//! Both trigger bindings (the database listener and the webhook) call into the
//! same `EntryAnalyzer`. A run first claims the entry in the store, so an entry
//! announced twice is still analyzed once. Failures are terminal for the entry
//! they belong to: they are logged, the entry is marked `error`, and nothing is
//! propagated back.

use chrono::{DateTime, Local, TimeZone};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::context::UserContext;
use crate::domain::{AnalysisStatus, DiaryEntry};
use crate::ports::{AnalysisCompletion, CorrectionService, DiaryStore, PortError, PortResult};
use crate::prompt::PromptBuilder;
use crate::streak::{StreakChange, StreakTracker};

/// How a single entry's analysis ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    /// Result persisted, streak applied and status set to `done`.
    Done { streak: StreakChange },
    /// A step failed; the entry was marked `error` (best effort).
    Failed { reason: String },
    /// The event did not name an entry awaiting analysis, or another run holds it.
    Skipped,
}

#[derive(Clone)]
pub struct EntryAnalyzer {
    store: Arc<dyn DiaryStore>,
    corrector: Arc<dyn CorrectionService>,
    prompts: PromptBuilder,
    streaks: StreakTracker,
}

impl EntryAnalyzer {
    pub fn new(store: Arc<dyn DiaryStore>, corrector: Arc<dyn CorrectionService>) -> Self {
        Self::with_prompts(store, corrector, PromptBuilder::default())
    }

    pub fn with_prompts(
        store: Arc<dyn DiaryStore>,
        corrector: Arc<dyn CorrectionService>,
        prompts: PromptBuilder,
    ) -> Self {
        Self {
            streaks: StreakTracker::new(store.clone()),
            store,
            corrector,
            prompts,
        }
    }

    /// Loads the entry from the store and analyzes it against the local calendar day.
    pub async fn handle_entry_id(&self, entry_id: Uuid) -> AnalysisOutcome {
        self.handle_entry_id_at(entry_id, Local::now()).await
    }

    pub async fn handle_entry_id_at<Tz: TimeZone>(
        &self,
        entry_id: Uuid,
        now: DateTime<Tz>,
    ) -> AnalysisOutcome {
        match self.store.get_entry(entry_id).await {
            Ok(entry) => self.handle_entry_created_at(&entry, now).await,
            Err(PortError::NotFound(_)) => {
                warn!("Entry {} not found. Skipping analysis.", entry_id);
                AnalysisOutcome::Skipped
            }
            Err(e) => {
                error!("Failed to load entry {}: {:?}", entry_id, e);
                self.mark_failed(entry_id).await;
                AnalysisOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Analyzes `entry`. The copy may be stale; the claim in the store decides
    /// whether this run goes ahead.
    pub async fn handle_entry_created_at<Tz: TimeZone>(
        &self,
        entry: &DiaryEntry,
        now: DateTime<Tz>,
    ) -> AnalysisOutcome {
        info!("Analysis triggered for entry {}", entry.id);

        if entry.ai_status != AnalysisStatus::Pending {
            info!(
                "Entry {} already has status '{}'. Skipping.",
                entry.id,
                entry.ai_status.as_str()
            );
            return AnalysisOutcome::Skipped;
        }

        match self.store.claim_entry(entry.id).await {
            Ok(true) => {}
            Ok(false) => {
                info!("Entry {} is finished or claimed by another run. Skipping.", entry.id);
                return AnalysisOutcome::Skipped;
            }
            Err(e) => return self.fail(entry.id, e).await,
        }

        match self.run_pipeline(entry, now).await {
            Ok(streak) => {
                info!("Entry {} analyzed ({:?})", entry.id, streak);
                AnalysisOutcome::Done { streak }
            }
            Err(e) => self.fail(entry.id, e).await,
        }
    }

    async fn run_pipeline<Tz: TimeZone>(
        &self,
        entry: &DiaryEntry,
        now: DateTime<Tz>,
    ) -> PortResult<StreakChange> {
        let profile = self
            .store
            .find_user_profile(entry.owner_id)
            .await?
            .unwrap_or_default();

        let ctx = UserContext::resolve(&profile, &entry.lang);
        info!(
            "Native language for feedback on entry {}: {}",
            entry.id,
            ctx.native.as_deref().unwrap_or_default()
        );

        let prompt = self.prompts.build(&entry.lang, &entry.text_raw, &ctx)?;
        let result = self.corrector.correct(&prompt).await?;
        let streak = self.streaks.change_for_entry(entry.owner_id, now).await?;

        // Result, streak and status land together or not at all.
        self.store
            .complete_analysis(&AnalysisCompletion {
                entry_id: entry.id,
                owner_id: entry.owner_id,
                result,
                streak,
            })
            .await?;
        Ok(streak)
    }

    async fn fail(&self, entry_id: Uuid, err: PortError) -> AnalysisOutcome {
        error!("Error processing entry {}: {:?}", entry_id, err);
        self.mark_failed(entry_id).await;
        AnalysisOutcome::Failed {
            reason: err.to_string(),
        }
    }

    async fn mark_failed(&self, entry_id: Uuid) {
        if let Err(e) = self.store.mark_entry_failed(entry_id).await {
            error!("Failed to mark entry {} as errored: {:?}", entry_id, e);
        }
    }
}

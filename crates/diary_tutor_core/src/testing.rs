//! crates/diary_tutor_core/src/testing.rs
//!
//! In-memory stand-ins for the ports, shared by the test suites of every crate in
//! the workspace. Compiled only with the `test-util` feature.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use crate::contract::parse_correction;
use crate::domain::{
    AnalysisStatus, CorrectionResult, DiaryEntry, FeedPost, UserProfile, Visibility,
};
use crate::ports::{AnalysisCompletion, CorrectionService, DiaryStore, PortError, PortResult};
use crate::prompt::CorrectionPrompt;
use crate::streak::StreakChange;

/// Store operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    FindProfile,
    GetEntry,
    ClaimEntry,
    ListPending,
    CountEntries,
    SaveCorrection,
    UpdateStreak,
    MarkDone,
    MarkError,
    InsertFeedPost,
}

#[derive(Default)]
struct State {
    profiles: HashMap<Uuid, UserProfile>,
    entries: Vec<DiaryEntry>,
    claimed: HashSet<Uuid>,
    corrections: HashMap<Uuid, CorrectionResult>,
    feed: Vec<FeedPost>,
    status_writes: Vec<(Uuid, AnalysisStatus)>,
    failing: HashSet<Op>,
}

impl State {
    fn check(&self, op: Op) -> PortResult<()> {
        if self.failing.contains(&op) {
            return Err(PortError::Unexpected(format!("{:?} failed", op)));
        }
        Ok(())
    }

    fn entry_mut(&mut self, entry_id: Uuid) -> PortResult<&mut DiaryEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.id == entry_id)
            .ok_or_else(|| PortError::NotFound(format!("Entry {} not found", entry_id)))
    }
}

/// A `DiaryStore` over plain collections. Multi-step writes check every failing
/// operation before mutating anything, like a transaction would.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn put_profile(&self, profile: UserProfile) {
        self.state().profiles.insert(profile.id, profile);
    }

    pub fn put_entry(&self, entry: DiaryEntry) {
        self.state().entries.push(entry);
    }

    pub fn fail_on(&self, op: Op) {
        self.state().failing.insert(op);
    }

    pub fn streak(&self, user_id: Uuid) -> Option<u32> {
        self.state().profiles.get(&user_id).map(|p| p.streak)
    }

    pub fn correction(&self, entry_id: Uuid) -> Option<CorrectionResult> {
        self.state().corrections.get(&entry_id).cloned()
    }

    pub fn correction_count(&self) -> usize {
        self.state().corrections.len()
    }

    pub fn status_writes(&self) -> Vec<(Uuid, AnalysisStatus)> {
        self.state().status_writes.clone()
    }

    pub fn status_of(&self, entry_id: Uuid) -> Option<AnalysisStatus> {
        self.state()
            .entries
            .iter()
            .find(|e| e.id == entry_id)
            .map(|e| e.ai_status)
    }

    pub fn feed(&self) -> Vec<FeedPost> {
        self.state().feed.clone()
    }
}

#[async_trait]
impl DiaryStore for MemoryStore {
    async fn find_user_profile(&self, user_id: Uuid) -> PortResult<Option<UserProfile>> {
        let state = self.state();
        state.check(Op::FindProfile)?;
        Ok(state.profiles.get(&user_id).cloned())
    }

    async fn get_entry(&self, entry_id: Uuid) -> PortResult<DiaryEntry> {
        let state = self.state();
        state.check(Op::GetEntry)?;
        state
            .entries
            .iter()
            .find(|e| e.id == entry_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Entry {} not found", entry_id)))
    }

    async fn claim_entry(&self, entry_id: Uuid) -> PortResult<bool> {
        let mut state = self.state();
        state.check(Op::ClaimEntry)?;
        let pending = state
            .entries
            .iter()
            .any(|e| e.id == entry_id && e.ai_status == AnalysisStatus::Pending);
        Ok(pending && state.claimed.insert(entry_id))
    }

    async fn pending_entry_ids(&self) -> PortResult<Vec<Uuid>> {
        let state = self.state();
        state.check(Op::ListPending)?;
        let mut pending: Vec<&DiaryEntry> = state
            .entries
            .iter()
            .filter(|e| e.ai_status == AnalysisStatus::Pending)
            .collect();
        pending.sort_by_key(|e| e.created_at);
        Ok(pending.into_iter().map(|e| e.id).collect())
    }

    async fn complete_analysis(&self, completion: &AnalysisCompletion) -> PortResult<()> {
        let mut state = self.state();
        state.check(Op::SaveCorrection)?;
        if completion.streak != StreakChange::Unchanged {
            state.check(Op::UpdateStreak)?;
        }
        state.check(Op::MarkDone)?;

        let entry_id = completion.entry_id;
        if state.corrections.contains_key(&entry_id) {
            return Err(PortError::Unexpected(format!(
                "Entry {} already has a correction",
                entry_id
            )));
        }
        let entry = state.entry_mut(entry_id)?;
        if entry.ai_status != AnalysisStatus::Pending {
            return Err(PortError::Unexpected(format!("Entry {} is not pending", entry_id)));
        }
        entry.ai_status = AnalysisStatus::Done;

        state.corrections.insert(entry_id, completion.result.clone());
        let owner_id = completion.owner_id;
        let profile = state.profiles.entry(owner_id).or_insert_with(|| UserProfile {
            id: owner_id,
            ..UserProfile::default()
        });
        match completion.streak {
            StreakChange::Unchanged => {}
            StreakChange::Incremented => profile.streak += 1,
            StreakChange::Reset => profile.streak = 1,
        }
        state.status_writes.push((entry_id, AnalysisStatus::Done));
        Ok(())
    }

    async fn mark_entry_failed(&self, entry_id: Uuid) -> PortResult<()> {
        let mut state = self.state();
        state.check(Op::MarkError)?;
        let entry = state.entry_mut(entry_id)?;
        if entry.ai_status == AnalysisStatus::Pending {
            entry.ai_status = AnalysisStatus::Error;
            state.status_writes.push((entry_id, AnalysisStatus::Error));
        }
        Ok(())
    }

    async fn count_entries_since(&self, owner_id: Uuid, since: DateTime<Utc>) -> PortResult<u64> {
        let state = self.state();
        state.check(Op::CountEntries)?;
        Ok(state
            .entries
            .iter()
            .filter(|e| e.owner_id == owner_id && e.created_at >= since)
            .count() as u64)
    }

    async fn count_entries_between(
        &self,
        owner_id: Uuid,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> PortResult<u64> {
        let state = self.state();
        state.check(Op::CountEntries)?;
        Ok(state
            .entries
            .iter()
            .filter(|e| e.owner_id == owner_id && e.created_at >= from && e.created_at < until)
            .count() as u64)
    }

    async fn insert_feed_post(&self, post: &FeedPost) -> PortResult<()> {
        let mut state = self.state();
        state.check(Op::InsertFeedPost)?;
        state.feed.push(post.clone());
        Ok(())
    }
}

/// Returns a canned response text, run through the real contract parser.
pub struct StubCorrector {
    response: PortResult<String>,
    prompts: Mutex<Vec<CorrectionPrompt>>,
}

impl StubCorrector {
    pub fn replying(text: &str) -> Self {
        Self {
            response: Ok(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(err: PortError) -> Self {
        Self {
            response: Err(err),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Every prompt received so far, in order.
    pub fn prompts(&self) -> Vec<CorrectionPrompt> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl CorrectionService for StubCorrector {
    async fn correct(&self, prompt: &CorrectionPrompt) -> PortResult<CorrectionResult> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompt.clone());
        match &self.response {
            Ok(text) => parse_correction(text),
            Err(PortError::Configuration(msg)) => Err(PortError::Configuration(msg.clone())),
            Err(e) => Err(PortError::Unexpected(e.to_string())),
        }
    }
}

pub const VALID_RESPONSE: &str = r#"{
    "corrected": "I went to the library today.",
    "natural": { "casual": "Went to the library today.", "formal": "I visited the library today." },
    "diffs": [{ "op": "replace", "from": "go", "to": "went" }],
    "highlights": ["went"],
    "vocab": [{ "lemma": "library", "pos": "noun", "meanings": ["도서관"], "example": "The library is quiet." }],
    "grammarNotes": ["과거 시제를 사용하세요."],
    "score": { "fluency": 80, "accuracy": 70 }
}"#;

/// A pending, private English entry.
pub fn entry(owner_id: Uuid, created_at: DateTime<Utc>) -> DiaryEntry {
    DiaryEntry {
        id: Uuid::new_v4(),
        owner_id,
        lang: "en".to_string(),
        text_raw: "Today I go to library.".to_string(),
        visibility: Visibility::Private,
        mood: None,
        created_at,
        ai_status: AnalysisStatus::Pending,
    }
}

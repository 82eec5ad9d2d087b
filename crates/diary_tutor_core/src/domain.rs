//! crates/diary_tutor_core/src/domain.rs
//!
//! Defines the core data structures for the application.
//! Profile and correction types carry serde derives because they travel over the
//! LLM contract and are stored as JSON; none of them depend on a database.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

//=========================================================================================
// Diary Entries
//=========================================================================================

/// Analysis state of an entry, flipped by the orchestrator once per entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalysisStatus {
    #[default]
    Pending,
    Done,
    Error,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Done => "done",
            AnalysisStatus::Error => "error",
        }
    }

    /// Unknown values are treated as still pending.
    pub fn parse(value: &str) -> Self {
        match value {
            "done" => AnalysisStatus::Done,
            "error" => AnalysisStatus::Error,
            _ => AnalysisStatus::Pending,
        }
    }
}

/// Who may see an entry. Only `Anon` entries can be published to the feed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Private,
    Anon,
    /// A value written by the app that this service does not know about.
    Other(String),
}

impl From<String> for Visibility {
    fn from(value: String) -> Self {
        match value.as_str() {
            "private" => Visibility::Private,
            "anon" => Visibility::Anon,
            _ => Visibility::Other(value),
        }
    }
}

/// A user-submitted diary text written in the language being learned.
#[derive(Debug, Clone, PartialEq)]
pub struct DiaryEntry {
    pub id: Uuid,
    pub owner_id: Uuid,
    /// Code of the target language, e.g. `ja`.
    pub lang: String,
    pub text_raw: String,
    pub visibility: Visibility,
    pub mood: Option<String>,
    pub created_at: DateTime<Utc>,
    pub ai_status: AnalysisStatus,
}

//=========================================================================================
// User Profiles
//=========================================================================================

/// Feedback preferences. Every flag is optional; an absent flag counts as unset.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(rename = "easyWords", default, skip_serializing_if = "Option::is_none")]
    pub easy_words: Option<bool>,
    #[serde(rename = "showFurigana", default, skip_serializing_if = "Option::is_none")]
    pub show_furigana: Option<bool>,
    #[serde(rename = "mixedUI", default, skip_serializing_if = "Option::is_none")]
    pub mixed_ui: Option<bool>,
    /// Overrides the profile's native language for AI feedback.
    #[serde(rename = "aiLang", default, skip_serializing_if = "Option::is_none")]
    pub ai_lang: Option<String>,
}

impl Preferences {
    pub fn wants_easy_words(&self) -> bool {
        self.easy_words.unwrap_or(false)
    }

    pub fn wants_furigana(&self) -> bool {
        self.show_furigana.unwrap_or(false)
    }

    pub fn wants_mixed_ui(&self) -> bool {
        self.mixed_ui.unwrap_or(false)
    }
}

/// A learner's profile. A user without a stored profile gets `UserProfile::default()`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserProfile {
    pub id: Uuid,
    pub native_lang: Option<String>,
    /// Proficiency level per target language code.
    pub levels: BTreeMap<String, String>,
    pub prefs: Preferences,
    pub streak: u32,
}

//=========================================================================================
// Correction Results (the LLM response contract)
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffOp {
    Replace,
    Add,
    Del,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diff {
    pub op: DiffOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NaturalAlternatives {
    pub casual: String,
    pub formal: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabItem {
    pub lemma: String,
    pub pos: String,
    #[serde(default)]
    pub meanings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default)]
    pub example: String,
}

/// Both scores are on a 0..=100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub fluency: f64,
    pub accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderingHints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ja_furigana: Option<bool>,
}

/// Structured feedback for one entry. Written once, keyed by the entry id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionResult {
    pub corrected: String,
    pub natural: NaturalAlternatives,
    #[serde(default)]
    pub diffs: Vec<Diff>,
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub vocab: Vec<VocabItem>,
    #[serde(default)]
    pub grammar_notes: Vec<String>,
    pub score: Score,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendering: Option<RenderingHints>,
}

//=========================================================================================
// Public Feed
//=========================================================================================

/// An anonymized excerpt of an entry. The store assigns the timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedPost {
    pub lang: String,
    pub text: String,
    pub mood: Option<String>,
}

//! crates/diary_tutor_core/src/prompt.rs
//!
//! Builds the two instructions sent to the LLM for a diary correction: a system
//! instruction derived from a fixed tutor template plus preference clauses, and a
//! JSON-encoded task instruction.

use serde::Serialize;

use crate::context::UserContext;
use crate::domain::Preferences;
use crate::language::FALLBACK_LANGUAGE_NAME;
use crate::ports::{PortError, PortResult};

/// Placeholder substituted with the learner's native-language name.
pub const NATIVE_LANG_PLACEHOLDER: &str = "{{nativeLang}}";

pub const CORRECTION_TEMPLATE: &str = r#"You are a language learning tutor specializing in diary writing. Your task is to:

1. Correct grammatical errors and unnatural expressions in the user's text.
2. Provide two natural alternatives (casual and formal).
3. Identify vocabulary words worth learning.
4. Highlight grammar points that need attention.
5. Even when improving readability, prioritize word-level edits over character-level edits.

CRITICAL INSTRUCTIONS - READ CAREFULLY:
- The user's NATIVE LANGUAGE is {{nativeLang}}.
- ⚠️ MANDATORY: You MUST write ALL 'grammarNotes' in {{nativeLang}} language ONLY.
- ⚠️ MANDATORY: You MUST write ALL 'meanings' in the 'vocab' list in {{nativeLang}} language ONLY.
- ❌ DO NOT write grammarNotes or vocab meanings in the language being learned (the diary language).
- ❌ DO NOT write grammarNotes or vocab meanings in English unless {{nativeLang}} is English.
- ✅ ONLY use {{nativeLang}} for explanations in grammarNotes and vocab meanings.
- Maintain the original meaning and intent of the user's text.
- Adapt difficulty to the user's estimated level.
- For Japanese text with showFurigana=true, use {漢字|かな} format for all kanji. Example: "今日は{図書館|としょかん}に{行|い}きました" instead of "今日は図書館に行きました". Apply furigana to ALL kanji, not just difficult ones.

Output must be a single, valid JSON object with this exact structure:
{
  "corrected": "corrected text in the diary language",
  "natural": {
    "casual": "casual version in the diary language",
    "formal": "formal version in the diary language"
  },
  "diffs": [{"op": "replace|add|del", "from": "original", "to": "corrected"}],
  "highlights": ["highlighted phrase 1", "highlighted phrase 2"],
  "vocab": [
    {
      "lemma": "word in the diary language",
      "pos": "part of speech in the diary language",
      "meanings": ["EXPLANATION in {{nativeLang}} ONLY", "ANOTHER EXPLANATION in {{nativeLang}} ONLY"],
      "level": "N4/A2/etc",
      "example": "example sentence in the diary language"
    }
  ],
  "grammarNotes": ["GRAMMAR EXPLANATION in {{nativeLang}} ONLY", "ANOTHER GRAMMAR EXPLANATION in {{nativeLang}} ONLY"],
  "score": {
    "fluency": 0-100,
    "accuracy": 0-100
  },
  "rendering": {
    "jaFurigana": true/false
  }
}

REMEMBER: grammarNotes and vocab.meanings MUST be written in {{nativeLang}}, NOT in the diary language!"#;

pub const FURIGANA_CLAUSE: &str = r#"IMPORTANT: For Japanese text, use {漢字|かな} format for ALL kanji characters with furigana. Apply this to corrected text, casual version, and formal version. Example: "今日は{図書館|としょかん}に{行|い}きました" (not "今日は図書館に行きました")."#;

pub const EASY_WORDS_CLAUSE: &str =
    "Replace rare or difficult words with simpler synonyms appropriate for the user level.";

const TASK_LABEL: &str = "Correct diary entry and provide learning feedback";

/// Separator placed before every appended clause.
const CLAUSE_SEPARATOR: &str = "\n\n";

//=========================================================================================
// Clauses
//=========================================================================================

/// A conditional addition to the system instruction.
pub type Clause = fn(&UserContext) -> Option<String>;

/// Appended whenever the flag is set, whatever the entry language.
fn furigana_clause(ctx: &UserContext) -> Option<String> {
    ctx.prefs
        .wants_furigana()
        .then(|| FURIGANA_CLAUSE.to_string())
}

fn easy_words_clause(ctx: &UserContext) -> Option<String> {
    ctx.prefs
        .wants_easy_words()
        .then(|| EASY_WORDS_CLAUSE.to_string())
}

fn gloss_clause(ctx: &UserContext) -> Option<String> {
    if !ctx.prefs.wants_mixed_ui() {
        return None;
    }
    ctx.native
        .as_deref()
        .filter(|native| !native.is_empty())
        .map(|native| format!("Add brief glosses in {} for key terms.", native))
}

/// The clauses applied by the default builder, in the order they are appended.
pub const STANDARD_CLAUSES: &[Clause] = &[furigana_clause, easy_words_clause, gloss_clause];

//=========================================================================================
// Builder
//=========================================================================================

/// The instruction pair handed to the correction client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionPrompt {
    pub system: String,
    pub user: String,
}

#[derive(Serialize)]
struct TaskPayload<'a> {
    #[serde(rename = "Task")]
    task: &'a str,
    #[serde(rename = "Language")]
    language: &'a str,
    #[serde(rename = "Text")]
    text: &'a str,
    #[serde(rename = "UserLevel")]
    user_level: &'a str,
    #[serde(rename = "Preferences")]
    preferences: &'a Preferences,
}

/// An immutable base template plus an ordered list of clause appenders.
#[derive(Clone)]
pub struct PromptBuilder {
    template: &'static str,
    clauses: Vec<Clause>,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(CORRECTION_TEMPLATE, STANDARD_CLAUSES.to_vec())
    }
}

impl PromptBuilder {
    pub fn new(template: &'static str, clauses: Vec<Clause>) -> Self {
        Self { template, clauses }
    }

    /// Builds both instructions for one entry.
    pub fn build(&self, lang: &str, text: &str, ctx: &UserContext) -> PortResult<CorrectionPrompt> {
        Ok(CorrectionPrompt {
            system: self.system_instruction(ctx),
            user: self.task_instruction(lang, text, ctx)?,
        })
    }

    pub fn system_instruction(&self, ctx: &UserContext) -> String {
        let mut prompt = self
            .template
            .replace(NATIVE_LANG_PLACEHOLDER, native_name(ctx));

        for clause in self.clauses.iter().filter_map(|clause| clause(ctx)) {
            prompt.push_str(CLAUSE_SEPARATOR);
            prompt.push_str(&clause);
        }
        prompt
    }

    pub fn task_instruction(&self, lang: &str, text: &str, ctx: &UserContext) -> PortResult<String> {
        let payload = TaskPayload {
            task: TASK_LABEL,
            language: lang,
            text,
            user_level: ctx.level_or_default(),
            preferences: &ctx.prefs,
        };
        let json = serde_json::to_string(&payload)
            .map_err(|e| PortError::Unexpected(format!("Failed to encode task payload: {}", e)))?;

        let native = native_name(ctx);
        Ok(format!(
            "{}\n\nREMINDER: Write ALL grammarNotes and ALL vocab meanings ONLY in {}. DO NOT use {} or any other language for explanations.",
            json, native, lang
        ))
    }
}

fn native_name(ctx: &UserContext) -> &str {
    ctx.native
        .as_deref()
        .filter(|native| !native.is_empty())
        .unwrap_or(FALLBACK_LANGUAGE_NAME)
}

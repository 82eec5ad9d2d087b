//! Resolves the per-entry user context that drives prompt construction.

use crate::domain::{Preferences, UserProfile};
use crate::language::language_name;

/// Native-language code used when neither the preferences nor the profile name one.
pub const FALLBACK_NATIVE_CODE: &str = "en";

/// Level sent to the LLM when the profile has none for the entry's language.
pub const DEFAULT_LEVEL: &str = "intermediate";

type LanguageSource = fn(&UserProfile) -> Option<&str>;

fn from_ai_preference(profile: &UserProfile) -> Option<&str> {
    profile.prefs.ai_lang.as_deref()
}

fn from_profile(profile: &UserProfile) -> Option<&str> {
    profile.native_lang.as_deref()
}

/// Consulted in order; the first non-empty code wins.
const NATIVE_LANGUAGE_SOURCES: &[LanguageSource] = &[from_ai_preference, from_profile];

/// Resolves the code of the language feedback must be written in.
pub fn resolve_native_code(profile: &UserProfile) -> &str {
    NATIVE_LANGUAGE_SOURCES
        .iter()
        .filter_map(|source| source(profile))
        .find(|code| !code.is_empty())
        .unwrap_or(FALLBACK_NATIVE_CODE)
}

/// Everything the prompt builder needs to know about the learner.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserContext {
    /// Display name of the native language, e.g. `Korean`.
    pub native: Option<String>,
    pub level: Option<String>,
    pub prefs: Preferences,
}

impl UserContext {
    /// Builds the context for an entry written in `entry_lang`.
    pub fn resolve(profile: &UserProfile, entry_lang: &str) -> Self {
        let native_code = resolve_native_code(profile);
        Self {
            native: Some(language_name(Some(native_code)).to_string()),
            level: profile.levels.get(entry_lang).cloned(),
            prefs: profile.prefs.clone(),
        }
    }

    pub fn level_or_default(&self) -> &str {
        self.level
            .as_deref()
            .filter(|level| !level.is_empty())
            .unwrap_or(DEFAULT_LEVEL)
    }
}

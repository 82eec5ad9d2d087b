//! Maps language codes to the display names used inside prompts.

/// Name used for every code outside the supported set.
pub const FALLBACK_LANGUAGE_NAME: &str = "English";

/// Returns the display name for `code`, falling back to English for anything
/// unsupported or absent.
pub fn language_name(code: Option<&str>) -> &'static str {
    match code {
        Some("ko") => "Korean",
        Some("en") => "English",
        Some("ja") => "Japanese",
        _ => FALLBACK_LANGUAGE_NAME,
    }
}

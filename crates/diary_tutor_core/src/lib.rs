pub mod analysis;
pub mod callables;
pub mod context;
pub mod contract;
pub mod domain;
pub mod language;
pub mod ports;
pub mod prompt;
pub mod streak;
#[cfg(feature = "test-util")]
pub mod testing;

pub use analysis::{AnalysisOutcome, EntryAnalyzer};
pub use callables::{CallableError, Callables, RateLimitStatus, DAILY_ENTRY_LIMIT};
pub use domain::{
    AnalysisStatus, CorrectionResult, DiaryEntry, FeedPost, Preferences, UserProfile, Visibility,
};
pub use ports::{
    AnalysisCompletion, CorrectionService, DiaryStore, PortError, PortResult, SessionResolver,
};
pub use prompt::{CorrectionPrompt, PromptBuilder};
pub use streak::{DayBounds, StreakChange, StreakTracker};

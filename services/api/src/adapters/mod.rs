pub mod correction_llm;
pub mod db;
pub mod entry_listener;

pub use correction_llm::GeminiCorrectionAdapter;
pub use db::PgStore;
pub use entry_listener::EntryListener;

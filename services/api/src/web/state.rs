//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use diary_tutor_core::ports::{DiaryStore, SessionResolver};
use diary_tutor_core::{Callables, EntryAnalyzer};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<dyn SessionResolver>,
    pub analyzer: Arc<EntryAnalyzer>,
    pub callables: Callables,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires the use-cases around the given ports.
    pub fn new(
        store: Arc<dyn DiaryStore>,
        sessions: Arc<dyn SessionResolver>,
        analyzer: Arc<EntryAnalyzer>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            callables: Callables::new(store),
            sessions,
            analyzer,
            config,
        }
    }
}

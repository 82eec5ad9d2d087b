//! services/api/src/adapters/entry_listener.rs
//!
//! Database-side binding of the entry-created trigger. Listens on a Postgres
//! NOTIFY channel whose payload is the new entry's id and hands each id to the
//! shared `EntryAnalyzer` in its own task.

use diary_tutor_core::ports::DiaryStore;
use diary_tutor_core::EntryAnalyzer;
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Pause before receiving again after the listener connection failed.
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

pub struct EntryListener {
    store: Arc<dyn DiaryStore>,
    analyzer: Arc<EntryAnalyzer>,
    channel: String,
}

impl EntryListener {
    pub fn new(store: Arc<dyn DiaryStore>, analyzer: Arc<EntryAnalyzer>, channel: String) -> Self {
        Self {
            store,
            analyzer,
            channel,
        }
    }

    /// Runs until `shutdown` is cancelled. Notifications sent while the listener
    /// was not connected are lost, so pending entries are swept once the channel
    /// is subscribed and again after every reconnect.
    pub async fn run(self, pool: &PgPool, shutdown: CancellationToken) -> Result<(), sqlx::Error> {
        let mut listener = self.subscribe(pool).await?;
        self.sweep().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Entry listener shutting down.");
                    return Ok(());
                }
                received = listener.try_recv() => match received {
                    Ok(Some(notification)) => self.dispatch(notification.payload()),
                    Ok(None) => {
                        warn!("Entry listener connection lost. Reconnecting.");
                        match self.subscribe(pool).await {
                            Ok(fresh) => {
                                listener = fresh;
                                self.sweep().await;
                            }
                            Err(e) => {
                                error!("Entry listener reconnect failed: {:?}", e);
                                tokio::time::sleep(RECONNECT_DELAY).await;
                            }
                        }
                    }
                    Err(e) => {
                        error!("Entry listener connection error: {:?}", e);
                        tokio::time::sleep(RECONNECT_DELAY).await;
                    }
                },
            }
        }
    }

    async fn subscribe(&self, pool: &PgPool) -> Result<PgListener, sqlx::Error> {
        let mut listener = PgListener::connect_with(pool).await?;
        listener.listen(&self.channel).await?;
        info!("Listening for new entries on channel '{}'", self.channel);
        Ok(listener)
    }

    /// Dispatches every entry still awaiting analysis. Entries already being
    /// analyzed are turned away by their claim. Returns how many were dispatched.
    pub async fn sweep(&self) -> usize {
        match self.store.pending_entry_ids().await {
            Ok(ids) => {
                if !ids.is_empty() {
                    info!("Sweeping {} pending entries", ids.len());
                }
                for &entry_id in &ids {
                    self.spawn_analysis(entry_id);
                }
                ids.len()
            }
            Err(e) => {
                error!("Failed to list pending entries: {:?}", e);
                0
            }
        }
    }

    fn dispatch(&self, payload: &str) {
        let Some(entry_id) = parse_payload(payload) else {
            warn!("Ignoring malformed entry notification payload: '{}'", payload);
            return;
        };
        self.spawn_analysis(entry_id);
    }

    fn spawn_analysis(&self, entry_id: Uuid) {
        let analyzer = self.analyzer.clone();
        tokio::spawn(async move {
            analyzer.handle_entry_id(entry_id).await;
        });
    }
}

fn parse_payload(payload: &str) -> Option<Uuid> {
    Uuid::parse_str(payload.trim()).ok()
}

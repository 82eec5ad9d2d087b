//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DiaryStore` and `SessionResolver` ports from the `core` crate. It handles
//! all interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diary_tutor_core::domain::{
    AnalysisStatus, DiaryEntry, FeedPost, Preferences, UserProfile, Visibility,
};
use diary_tutor_core::ports::{
    AnalysisCompletion, DiaryStore, PortError, PortResult, SessionResolver,
};
use diary_tutor_core::streak::StreakChange;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::info;
use uuid::Uuid;

//=========================================================================================
// Process-wide Pool
//=========================================================================================

static POOL: OnceCell<PgPool> = OnceCell::const_new();

/// How long a claimed entry stays reserved for the run that claimed it.
const CLAIM_LEASE: Duration = Duration::from_secs(10 * 60);

/// Connects the shared pool on first call; later calls return the same pool.
pub async fn init_pool(database_url: &str) -> Result<&'static PgPool, sqlx::Error> {
    POOL.get_or_try_init(|| async {
        info!("Connecting to database...");
        PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
    })
    .await
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DiaryStore` port.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a new `PgStore`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    native_lang: Option<String>,
    levels: Json<BTreeMap<String, String>>,
    prefs: Json<Preferences>,
    streak: i32,
}
impl UserRecord {
    fn to_domain(self) -> UserProfile {
        UserProfile {
            id: self.id,
            native_lang: self.native_lang,
            levels: self.levels.0,
            prefs: self.prefs.0,
            streak: u32::try_from(self.streak).unwrap_or(0),
        }
    }
}

#[derive(FromRow)]
struct EntryRecord {
    id: Uuid,
    owner_id: Uuid,
    lang: String,
    text_raw: String,
    visibility: String,
    mood: Option<String>,
    created_at: DateTime<Utc>,
    ai_status: String,
}
impl EntryRecord {
    fn to_domain(self) -> DiaryEntry {
        DiaryEntry {
            id: self.id,
            owner_id: self.owner_id,
            lang: self.lang,
            text_raw: self.text_raw,
            visibility: Visibility::from(self.visibility),
            mood: self.mood,
            created_at: self.created_at,
            ai_status: AnalysisStatus::parse(&self.ai_status),
        }
    }
}

//=========================================================================================
// `DiaryStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl DiaryStore for PgStore {
    async fn find_user_profile(&self, user_id: Uuid) -> PortResult<Option<UserProfile>> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, native_lang, levels, prefs, streak FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(record.map(UserRecord::to_domain))
    }

    async fn get_entry(&self, entry_id: Uuid) -> PortResult<DiaryEntry> {
        let record = sqlx::query_as::<_, EntryRecord>(
            "SELECT id, owner_id, lang, text_raw, visibility, mood, created_at, ai_status \
             FROM entries WHERE id = $1",
        )
        .bind(entry_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("Entry {} not found", entry_id)),
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn claim_entry(&self, entry_id: Uuid) -> PortResult<bool> {
        let result = sqlx::query(
            "UPDATE entries SET ai_claimed_at = now() \
             WHERE id = $1 AND ai_status = 'pending' \
               AND (ai_claimed_at IS NULL OR ai_claimed_at < now() - make_interval(secs => $2))",
        )
        .bind(entry_id)
        .bind(CLAIM_LEASE.as_secs_f64())
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(result.rows_affected() == 1)
    }

    async fn pending_entry_ids(&self) -> PortResult<Vec<Uuid>> {
        sqlx::query_scalar("SELECT id FROM entries WHERE ai_status = 'pending' ORDER BY created_at")
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)
    }

    async fn complete_analysis(&self, completion: &AnalysisCompletion) -> PortResult<()> {
        let entry_id = completion.entry_id;
        // Dropping the transaction on any early return rolls everything back.
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let inserted = sqlx::query(
            "INSERT INTO entry_ai (entry_id, result) VALUES ($1, $2) \
             ON CONFLICT (entry_id) DO NOTHING",
        )
        .bind(entry_id)
        .bind(Json(&completion.result))
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;
        if inserted.rows_affected() == 0 {
            return Err(PortError::Unexpected(format!(
                "Entry {} already has a correction",
                entry_id
            )));
        }

        let streak_sql = match completion.streak {
            StreakChange::Unchanged => None,
            StreakChange::Incremented => Some(
                "INSERT INTO users (id, streak) VALUES ($1, 1) \
                 ON CONFLICT (id) DO UPDATE SET streak = users.streak + 1",
            ),
            StreakChange::Reset => Some(
                "INSERT INTO users (id, streak) VALUES ($1, 1) \
                 ON CONFLICT (id) DO UPDATE SET streak = 1",
            ),
        };
        if let Some(sql) = streak_sql {
            sqlx::query(sql)
                .bind(completion.owner_id)
                .execute(&mut *tx)
                .await
                .map_err(unexpected)?;
        }

        let marked = sqlx::query(
            "UPDATE entries SET ai_status = $1 WHERE id = $2 AND ai_status = 'pending'",
        )
        .bind(AnalysisStatus::Done.as_str())
        .bind(entry_id)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;
        if marked.rows_affected() == 0 {
            return Err(PortError::Unexpected(format!("Entry {} is no longer pending", entry_id)));
        }

        tx.commit().await.map_err(unexpected)
    }

    async fn mark_entry_failed(&self, entry_id: Uuid) -> PortResult<()> {
        sqlx::query("UPDATE entries SET ai_status = $1 WHERE id = $2 AND ai_status = 'pending'")
            .bind(AnalysisStatus::Error.as_str())
            .bind(entry_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn count_entries_since(&self, owner_id: Uuid, since: DateTime<Utc>) -> PortResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM entries WHERE owner_id = $1 AND created_at >= $2",
        )
        .bind(owner_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(count.max(0) as u64)
    }

    async fn count_entries_between(
        &self,
        owner_id: Uuid,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> PortResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM entries \
             WHERE owner_id = $1 AND created_at >= $2 AND created_at < $3",
        )
        .bind(owner_id)
        .bind(from)
        .bind(until)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(count.max(0) as u64)
    }

    async fn insert_feed_post(&self, post: &FeedPost) -> PortResult<()> {
        // created_at defaults to the database clock.
        sqlx::query("INSERT INTO public_feed (lang, text, mood) VALUES ($1, $2, $3)")
            .bind(&post.lang)
            .bind(&post.text)
            .bind(&post.mood)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}

//=========================================================================================
// `SessionResolver` Trait Implementation
//=========================================================================================

#[async_trait]
impl SessionResolver for PgStore {
    async fn resolve_session(&self, token: &str) -> PortResult<Option<Uuid>> {
        sqlx::query_scalar("SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > now()")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)
    }
}

//! crates/diary_tutor_core/src/streak.rs
//!
//! Maintains the consecutive-day writing streak.
//!
//! The counts are read outside the transaction that applies the change. Two
//! entries from the same user landing in the same instant can both look like the
//! first of the day and both apply it; that inconsistency is accepted.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::ports::{DiaryStore, PortResult};

/// Upper bound on the forward scan for a local midnight skipped by a DST jump.
const MIDNIGHT_SCAN_STEPS: u32 = 48;

/// Calendar-day boundaries, computed in the time zone of the instant they were derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayBounds {
    pub start_of_today: DateTime<Utc>,
    pub start_of_yesterday: DateTime<Utc>,
}

impl DayBounds {
    pub fn containing<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        let tz = now.timezone();
        let today = now.date_naive();
        let yesterday = today.pred_opt().unwrap_or(today);

        Self {
            start_of_today: local_midnight(&tz, today),
            start_of_yesterday: local_midnight(&tz, yesterday),
        }
    }
}

/// First instant of `date` in `tz`. An ambiguous midnight resolves to the earlier
/// instant; a midnight skipped by a DST jump moves forward to the first valid one.
fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = NaiveDateTime::new(date, NaiveTime::MIN);
    let mut candidate = midnight;
    for _ in 0..MIDNIGHT_SCAN_STEPS {
        if let Some(instant) = tz.from_local_datetime(&candidate).earliest() {
            return instant.with_timezone(&Utc);
        }
        candidate += Duration::minutes(30);
    }
    Utc.from_utc_datetime(&midnight)
}

/// How an entry moves its owner's streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakChange {
    /// Not the first entry of the day.
    Unchanged,
    /// First entry today and the user also wrote yesterday.
    Incremented,
    /// First entry today after a gap; streak set to 1.
    Reset,
}

#[derive(Clone)]
pub struct StreakTracker {
    store: Arc<dyn DiaryStore>,
}

impl StreakTracker {
    pub fn new(store: Arc<dyn DiaryStore>) -> Self {
        Self { store }
    }

    /// Decides how a freshly created entry moves the owner's streak. `now` fixes
    /// the calendar day. Nothing is written; the change is applied together with
    /// the entry's result.
    pub async fn change_for_entry<Tz: TimeZone>(
        &self,
        owner_id: Uuid,
        now: DateTime<Tz>,
    ) -> PortResult<StreakChange> {
        let bounds = DayBounds::containing(&now);

        // Includes the entry being processed.
        let today = self
            .store
            .count_entries_since(owner_id, bounds.start_of_today)
            .await?;
        if today != 1 {
            return Ok(StreakChange::Unchanged);
        }

        let yesterday = self
            .store
            .count_entries_between(owner_id, bounds.start_of_yesterday, bounds.start_of_today)
            .await?;

        let change = if yesterday > 0 {
            StreakChange::Incremented
        } else {
            StreakChange::Reset
        };
        debug!("Streak for user {}: {:?}", owner_id, change);
        Ok(change)
    }
}

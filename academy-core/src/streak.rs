//! Daily activity streaks

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Streak {
    pub current: u32,
    pub longest: u32,
    pub last_activity: Option<NaiveDate>,
}

impl Streak {
    /// Fold one day of activity into the streak.
    ///
    /// Activity on the same day is a no-op, the following day extends the
    /// streak, anything later restarts it at 1. Dates earlier than the last
    /// recorded activity are ignored.
    pub fn record_activity(self, today: NaiveDate) -> Self {
        let current = match self.last_activity {
            Some(last) if today <= last => return self,
            Some(last) if last.succ_opt() == Some(today) => self.current + 1,
            _ => 1,
        };

        Self {
            current,
            longest: self.longest.max(current),
            last_activity: Some(today),
        }
    }

    /// Streak length as seen on `today`: a streak whose last activity is
    /// older than yesterday has lapsed and reads as 0.
    pub fn current_on(&self, today: NaiveDate) -> u32 {
        match self.last_activity {
            Some(last) if last == today || last.succ_opt() == Some(today) => self.current,
            _ => 0,
        }
    }
}

/// Calendar date of `now` in the learner-facing timezone
pub fn local_date(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

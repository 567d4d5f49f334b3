//! Append-only log of completed work sessions.
//!
//! Every query takes the caller's "now" so results are a pure function of the
//! log and the supplied instant. Calendar boundaries (day, week, month) are
//! evaluated in the time zone carried by that instant.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Longest window [`SessionStore::histogram`] will produce.
pub const MAX_HISTOGRAM_DAYS: u32 = 366;

/// One completed Work phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub completed_at: DateTime<Utc>,
    pub duration_secs: u32,
}

impl Session {
    pub fn new(completed_at: DateTime<Utc>, duration_secs: u32) -> Self {
        Self {
            completed_at,
            duration_secs,
        }
    }
}

/// Destination for completed sessions.
///
/// The engine treats recording as best-effort: an `Err` is logged and the
/// phase transition that produced the session still commits.
pub trait SessionSink {
    fn record(&self, session: &Session) -> Result<()>;
}

/// First day of the calendar week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Monday,
    Sunday,
}

impl WeekStart {
    fn weekday(self) -> Weekday {
        match self {
            WeekStart::Monday => Weekday::Mon,
            WeekStart::Sunday => Weekday::Sun,
        }
    }

    /// First date of the week containing `date`.
    pub fn week_of(self, date: NaiveDate) -> NaiveDate {
        date.week(self.weekday()).first_day()
    }
}

/// Calendar window a history listing is filtered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Today,
    Week,
    Month,
    #[default]
    All,
}

impl Period {
    /// Whether `date` falls in this period as seen from `today`.
    pub fn contains(self, date: NaiveDate, today: NaiveDate, week_start: WeekStart) -> bool {
        match self {
            Period::Today => date == today,
            Period::Week => week_start.week_of(date) == week_start.week_of(today),
            Period::Month => date.year() == today.year() && date.month() == today.month(),
            Period::All => true,
        }
    }
}

/// Sessions completed on one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCount {
    pub date: NaiveDate,
    pub count: u32,
}

/// The sessions of one calendar day, most recent first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySessions {
    pub date: NaiveDate,
    pub focus_secs: u64,
    pub sessions: Vec<Session>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatsSummary {
    pub today: u32,
    pub this_week: u32,
    pub this_month: u32,
    pub total: u32,
    pub total_focus_secs: u64,
}

#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<Vec<Session>>,
    week_start: WeekStart,
}

impl SessionStore {
    pub fn new(week_start: WeekStart) -> Self {
        Self {
            sessions: RwLock::new(Vec::new()),
            week_start,
        }
    }

    /// Seed the log from persisted sessions, preserving their order.
    pub fn from_sessions(sessions: Vec<Session>, week_start: WeekStart) -> Self {
        Self {
            sessions: RwLock::new(sessions),
            week_start,
        }
    }

    pub fn week_start(&self) -> WeekStart {
        self.week_start
    }

    pub fn append(&self, session: Session) {
        self.write().push(session);
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Bulk reset: drops every session at once.
    pub fn clear(&self) {
        self.write().clear();
    }

    /// Sessions with `start <= completed_at < end`, most recent first.
    pub fn sessions_in_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<Session> {
        let mut found: Vec<Session> = self
            .read()
            .iter()
            .filter(|s| s.completed_at >= start && s.completed_at < end)
            .copied()
            .collect();
        sort_newest_first(&mut found);
        found
    }

    /// Up to `limit` sessions, most recent first.
    pub fn recent_sessions(&self, limit: usize) -> Vec<Session> {
        let mut all = self.read().clone();
        sort_newest_first(&mut all);
        all.truncate(limit);
        all
    }

    pub fn total_focus_secs(&self) -> u64 {
        self.read().iter().map(|s| u64::from(s.duration_secs)).sum()
    }

    /// Sessions inside `period` as seen from `now`, most recent first.
    pub fn sessions_in_period<Tz: TimeZone>(
        &self,
        period: Period,
        now: &DateTime<Tz>,
    ) -> Vec<Session> {
        let tz = now.timezone();
        let today = now.date_naive();
        let mut found: Vec<Session> = self
            .read()
            .iter()
            .filter(|s| {
                let date = s.completed_at.with_timezone(&tz).date_naive();
                period.contains(date, today, self.week_start)
            })
            .copied()
            .collect();
        sort_newest_first(&mut found);
        found
    }

    pub fn count_today<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> u32 {
        self.count_in(Period::Today, now)
    }

    pub fn count_this_week<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> u32 {
        self.count_in(Period::Week, now)
    }

    pub fn count_this_month<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> u32 {
        self.count_in(Period::Month, now)
    }

    pub fn summary<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> StatsSummary {
        let tz = now.timezone();
        let today = now.date_naive();
        let mut summary = StatsSummary::default();

        for s in self.read().iter() {
            let date = s.completed_at.with_timezone(&tz).date_naive();
            let counts = |period: Period| u32::from(period.contains(date, today, self.week_start));
            summary.total += 1;
            summary.total_focus_secs += u64::from(s.duration_secs);
            summary.today += counts(Period::Today);
            summary.this_week += counts(Period::Week);
            summary.this_month += counts(Period::Month);
        }
        summary
    }

    /// Trailing `days` calendar days ending today, oldest first, zero-filled.
    ///
    /// `days` is capped at [`MAX_HISTOGRAM_DAYS`].
    pub fn histogram<Tz: TimeZone>(&self, days: u32, now: &DateTime<Tz>) -> Vec<DayCount> {
        if days == 0 {
            return Vec::new();
        }
        let tz = now.timezone();
        let today = now.date_naive();
        let back = u64::from(days.min(MAX_HISTOGRAM_DAYS) - 1);
        let first = today.checked_sub_days(Days::new(back)).unwrap_or(NaiveDate::MIN);

        let mut buckets: Vec<DayCount> = first
            .iter_days()
            .take_while(|date| *date <= today)
            .map(|date| DayCount { date, count: 0 })
            .collect();

        for s in self.read().iter() {
            let date = s.completed_at.with_timezone(&tz).date_naive();
            if date < first || date > today {
                continue;
            }
            let idx = (date - first).num_days() as usize;
            if let Some(bucket) = buckets.get_mut(idx) {
                bucket.count += 1;
            }
        }
        buckets
    }

    fn count_in<Tz: TimeZone>(&self, period: Period, now: &DateTime<Tz>) -> u32 {
        let tz = now.timezone();
        let today = now.date_naive();
        self.read()
            .iter()
            .filter(|s| {
                let date = s.completed_at.with_timezone(&tz).date_naive();
                period.contains(date, today, self.week_start)
            })
            .count() as u32
    }

    // Writers only push or clear, so a poisoned Vec is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, Vec<Session>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Session>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionSink for SessionStore {
    fn record(&self, session: &Session) -> Result<()> {
        self.append(*session);
        Ok(())
    }
}

fn sort_newest_first(sessions: &mut [Session]) {
    sessions.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
}

/// Group newest-first sessions by their calendar day in `tz`, newest day first.
pub fn group_by_day<Tz: TimeZone>(sessions: &[Session], tz: &Tz) -> Vec<DaySessions> {
    let mut days: Vec<DaySessions> = Vec::new();
    for s in sessions {
        let date = s.completed_at.with_timezone(tz).date_naive();
        match days.last_mut() {
            Some(day) if day.date == date => {
                day.focus_secs += u64::from(s.duration_secs);
                day.sessions.push(*s);
            }
            _ => days.push(DaySessions {
                date,
                focus_secs: u64::from(s.duration_secs),
                sessions: vec![*s],
            }),
        }
    }
    days
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn store_with(times: &[DateTime<Utc>]) -> SessionStore {
        let store = SessionStore::new(WeekStart::Monday);
        for t in times {
            store.append(Session::new(*t, 1500));
        }
        store
    }

    #[test]
    fn empty_store_counts_zero() {
        let store = SessionStore::default();
        let now = utc(2026, 3, 4, 12);
        assert_eq!(store.count_today(&now), 0);
        assert_eq!(store.count_this_week(&now), 0);
        assert_eq!(store.count_this_month(&now), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn today_excludes_yesterday() {
        let now = utc(2026, 3, 4, 12);
        let store = store_with(&[utc(2026, 3, 3, 23), utc(2026, 3, 4, 0), utc(2026, 3, 4, 11)]);
        assert_eq!(store.count_today(&now), 2);
    }

    #[test]
    fn each_append_today_adds_one() {
        let now = utc(2026, 3, 4, 12);
        let store = SessionStore::default();
        for expected in 1..=3 {
            store.append(Session::new(utc(2026, 3, 4, 8), 1500));
            assert_eq!(store.count_today(&now), expected);
        }
    }

    #[test]
    fn day_boundary_follows_caller_time_zone() {
        // 23:30 UTC on the 3rd is already the 4th at UTC+2.
        let store = store_with(&[Utc.with_ymd_and_hms(2026, 3, 3, 23, 30, 0).unwrap()]);
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let now_local = utc(2026, 3, 4, 10).with_timezone(&plus_two);
        assert_eq!(store.count_today(&now_local), 1);
        assert_eq!(store.count_today(&utc(2026, 3, 4, 10)), 0);
    }

    #[test]
    fn week_respects_week_start() {
        // 2026-03-01 is a Sunday, 2026-03-04 a Wednesday.
        let sunday = utc(2026, 3, 1, 10);
        let now = utc(2026, 3, 4, 12);

        let sessions = vec![Session::new(sunday, 60)];

        let monday_store = SessionStore::from_sessions(sessions.clone(), WeekStart::Monday);
        assert_eq!(monday_store.count_this_week(&now), 0);

        let sunday_store = SessionStore::from_sessions(sessions, WeekStart::Sunday);
        assert_eq!(sunday_store.count_this_week(&now), 1);
    }

    #[test]
    fn month_requires_same_year() {
        let now = utc(2026, 3, 4, 12);
        let store = store_with(&[utc(2025, 3, 10, 9), utc(2026, 3, 1, 9), utc(2026, 2, 28, 9)]);
        assert_eq!(store.count_this_month(&now), 1);
    }

    #[test]
    fn histogram_is_zero_filled_oldest_first() {
        let now = utc(2026, 3, 7, 18);
        let store = store_with(&[
            utc(2026, 3, 7, 9),
            utc(2026, 3, 7, 10),
            utc(2026, 3, 3, 9),
            utc(2026, 2, 20, 9),
        ]);
        let hist = store.histogram(7, &now);
        assert_eq!(hist.len(), 7);
        assert_eq!(hist[0].date, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        assert_eq!(hist[6].date, NaiveDate::from_ymd_opt(2026, 3, 7).unwrap());
        let counts: Vec<u32> = hist.iter().map(|d| d.count).collect();
        assert_eq!(counts, vec![0, 0, 1, 0, 0, 0, 2]);
    }

    #[test]
    fn histogram_of_empty_store_still_has_every_day() {
        let hist = SessionStore::default().histogram(14, &utc(2026, 3, 7, 18));
        assert_eq!(hist.len(), 14);
        assert!(hist.iter().all(|d| d.count == 0));
        assert!(hist.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn histogram_caps_oversized_windows() {
        let now = utc(2026, 3, 7, 18);
        let hist = SessionStore::default().histogram(200_000_000, &now);
        assert_eq!(hist.len(), MAX_HISTOGRAM_DAYS as usize);
        assert_eq!(hist.last().map(|d| d.date), Some(now.date_naive()));
    }

    #[test]
    fn histogram_stops_at_the_earliest_date() {
        let now = NaiveDate::MIN.and_hms_opt(12, 0, 0).unwrap().and_utc();
        let hist = SessionStore::default().histogram(14, &now);
        assert_eq!(hist.len(), 1);
        assert_eq!(hist[0].date, NaiveDate::MIN);
    }

    #[test]
    fn period_listing_agrees_with_counts() {
        let now = utc(2026, 3, 4, 12);
        let store = store_with(&[
            utc(2026, 3, 4, 9),
            utc(2026, 3, 4, 11),
            utc(2026, 3, 2, 9),
            utc(2026, 3, 1, 9),
            utc(2026, 2, 27, 9),
        ]);
        let today = store.sessions_in_period(Period::Today, &now);
        assert_eq!(today.len() as u32, store.count_today(&now));
        assert_eq!(today[0].completed_at, utc(2026, 3, 4, 11));
        assert_eq!(
            store.sessions_in_period(Period::Week, &now).len() as u32,
            store.count_this_week(&now)
        );
        assert_eq!(
            store.sessions_in_period(Period::Month, &now).len() as u32,
            store.count_this_month(&now)
        );
        assert_eq!(store.sessions_in_period(Period::All, &now).len(), 5);
    }

    #[test]
    fn grouping_keeps_days_newest_first() {
        let store = store_with(&[utc(2026, 3, 1, 9), utc(2026, 3, 3, 9), utc(2026, 3, 3, 14)]);
        let days = group_by_day(&store.recent_sessions(10), &Utc);
        let dates: Vec<_> = days.iter().map(|d| d.date).collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2026, 3, 3).unwrap(),
                NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            ]
        );
        assert_eq!(days[0].sessions.len(), 2);
        assert_eq!(days[0].focus_secs, 3000);
        assert_eq!(days[0].sessions[0].completed_at, utc(2026, 3, 3, 14));
    }

    #[test]
    fn grouping_uses_the_callers_calendar() {
        // 23:30 UTC on the 3rd and 00:30 UTC on the 4th share a day at UTC-2.
        let sessions = vec![
            Session::new(Utc.with_ymd_and_hms(2026, 3, 4, 0, 30, 0).unwrap(), 60),
            Session::new(Utc.with_ymd_and_hms(2026, 3, 3, 23, 30, 0).unwrap(), 60),
        ];
        assert_eq!(group_by_day(&sessions, &Utc).len(), 2);
        let minus_two = FixedOffset::west_opt(2 * 3600).unwrap();
        assert_eq!(group_by_day(&sessions, &minus_two).len(), 1);
    }

    #[test]
    fn range_query_is_newest_first() {
        let store = store_with(&[utc(2026, 3, 1, 9), utc(2026, 3, 3, 9), utc(2026, 3, 2, 9)]);
        let found = store.sessions_in_range(utc(2026, 3, 1, 0), utc(2026, 3, 3, 0));
        let times: Vec<_> = found.iter().map(|s| s.completed_at).collect();
        assert_eq!(times, vec![utc(2026, 3, 2, 9), utc(2026, 3, 1, 9)]);
    }

    #[test]
    fn recent_sessions_honours_limit() {
        let store = store_with(&[utc(2026, 3, 1, 9), utc(2026, 3, 3, 9), utc(2026, 3, 2, 9)]);
        let recent = store.recent_sessions(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].completed_at, utc(2026, 3, 3, 9));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn summary_matches_individual_counts() {
        let now = utc(2026, 3, 4, 12);
        let store = store_with(&[
            utc(2026, 3, 4, 9),
            utc(2026, 3, 2, 9),
            utc(2026, 3, 1, 9),
            utc(2026, 1, 1, 9),
        ]);
        let summary = store.summary(&now);
        assert_eq!(summary.today, store.count_today(&now));
        assert_eq!(summary.this_week, store.count_this_week(&now));
        assert_eq!(summary.this_month, store.count_this_month(&now));
        assert_eq!(summary.total, 4);
        assert_eq!(summary.total_focus_secs, 4 * 1500);
    }

    #[test]
    fn clear_empties_the_log() {
        let store = store_with(&[utc(2026, 3, 1, 9)]);
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.total_focus_secs(), 0);
    }

    #[test]
    fn store_is_a_session_sink() {
        let store = SessionStore::default();
        store.record(&Session::new(utc(2026, 3, 1, 9), 60)).unwrap();
        assert_eq!(store.len(), 1);
    }
}

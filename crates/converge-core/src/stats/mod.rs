//! Session statistics.
//!
//! Completed work sessions are appended to a [`SessionStore`], which answers
//! day/week/month counts, period listings grouped by day, and a trailing
//! per-day histogram.

mod store;

pub use store::{
    group_by_day, DayCount, DaySessions, Period, Session, SessionSink, SessionStore, StatsSummary,
    WeekStart, MAX_HISTOGRAM_DAYS,
};

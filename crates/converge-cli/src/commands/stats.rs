use chrono::Local;
use clap::{Subcommand, ValueEnum};
use converge_core::stats::{group_by_day, MAX_HISTOGRAM_DAYS};
use converge_core::{Period, SessionStore};
use serde::Serialize;

use super::{print_json, CliResult, Context};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today / this week / this month counts
    Summary,
    /// Sessions grouped by day, newest first
    History {
        /// Calendar window to list
        #[arg(long, value_enum, default_value_t = HistoryRange::All)]
        range: HistoryRange,
        /// Maximum number of sessions (defaults to stats.history_limit)
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Sessions per day for the trailing days, oldest first
    Chart {
        /// Number of days (defaults to stats.chart_days)
        #[arg(
            long,
            value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_HISTOGRAM_DAYS))
        )]
        days: Option<u32>,
    },
    /// Delete the whole session log
    Reset,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum HistoryRange {
    Today,
    Week,
    Month,
    All,
}

impl From<HistoryRange> for Period {
    fn from(range: HistoryRange) -> Self {
        match range {
            HistoryRange::Today => Period::Today,
            HistoryRange::Week => Period::Week,
            HistoryRange::Month => Period::Month,
            HistoryRange::All => Period::All,
        }
    }
}

#[derive(Serialize)]
struct Cleared {
    removed: usize,
}

pub fn run(action: StatsAction) -> CliResult {
    let ctx = Context::open()?;
    let now = Local::now();

    match action {
        StatsAction::Summary => print_json(&load_store(&ctx)?.summary(&now)),
        StatsAction::History { range, limit } => {
            let limit = limit.unwrap_or(ctx.config.stats.history_limit);
            let mut sessions = load_store(&ctx)?.sessions_in_period(range.into(), &now);
            sessions.truncate(limit as usize);
            print_json(&group_by_day(&sessions, &Local))
        }
        StatsAction::Chart { days } => {
            let days = days.unwrap_or(ctx.config.stats.chart_days);
            print_json(&load_store(&ctx)?.histogram(days, &now))
        }
        StatsAction::Reset => {
            let removed = ctx.db.clear_sessions()?;
            print_json(&Cleared { removed })
        }
    }
}

fn load_store(ctx: &Context) -> CliResult<SessionStore> {
    let sessions = ctx.db.load_sessions()?;
    Ok(SessionStore::from_sessions(sessions, ctx.config.stats.week_start))
}

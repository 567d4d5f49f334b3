//! # Converge Core Library
//!
//! This library provides the core business logic for the Converge focus timer.
//! Hosts (the CLI, a menu-bar app) own the tick loop and the presentation; this
//! crate owns the phase engine and the session statistics.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A wall-clock-based Work/Break state machine that requires
//!   the caller to periodically invoke `tick()`
//! - **Statistics**: An append-only session log with day/week/month counts and
//!   a per-day histogram
//! - **Storage**: SQLite-based session persistence and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`PomodoroEngine`]: Core phase state machine
//! - [`PhaseClock`]: Deadline-based countdown the engine is built on
//! - [`SessionStore`]: In-memory session log and aggregates
//! - [`Database`]: Durable session sink and key-value state
//! - [`Config`]: Application configuration management

pub mod error;
pub mod events;
pub mod notify;
pub mod settings;
pub mod stats;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, DatabaseError, Result, ValidationError};
pub use events::{Event, PhaseEvent};
pub use notify::{Notification, Notifier, NullNotifier, TracingNotifier};
pub use settings::{Settings, SettingsProvider};
pub use stats::{
    DayCount, DaySessions, Period, Session, SessionSink, SessionStore, StatsSummary, WeekStart,
};
pub use storage::{Config, Database, NotificationsConfig, StatsConfig, TimerConfig};
pub use timer::{BreakKind, EngineSnapshot, Phase, PhaseClock, PomodoroEngine};

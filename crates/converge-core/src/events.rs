use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{BreakKind, Phase};

/// Every engine command that changes state produces an Event.
/// Hosts print or forward them; the engine never reads them back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    PhaseStarted {
        phase: Phase,
        #[serde(skip_serializing_if = "Option::is_none")]
        break_kind: Option<BreakKind>,
        duration_secs: u32,
        ends_at: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    TimerPaused {
        phase: Phase,
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    TimerResumed {
        phase: Phase,
        remaining_secs: u32,
        ends_at: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    PhaseCompleted {
        phase: Phase,
        next_phase: Phase,
        completed_pomodoros: u32,
        /// Whether the next phase started without user action.
        auto_continued: bool,
        at: DateTime<Utc>,
    },
    TimerReset {
        cleared_history: bool,
        at: DateTime<Utc>,
    },
}

/// Closed set of completion notices handed to a [`Notifier`](crate::notify::Notifier).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseEvent {
    WorkPhaseCompleted,
    BreakPhaseCompleted,
}

impl PhaseEvent {
    /// Completion notice for `phase`. Idle never completes.
    pub fn for_phase(phase: Phase) -> Option<Self> {
        match phase {
            Phase::Work => Some(PhaseEvent::WorkPhaseCompleted),
            Phase::Break => Some(PhaseEvent::BreakPhaseCompleted),
            Phase::Idle => None,
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Idle,
    Work,
    Break,
}

/// Flavor of a break. Derived from the pomodoro counter, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakKind {
    Short,
    Long,
}

impl Phase {
    /// Work and Break alternate. Idle always leads into Work.
    pub fn next(self) -> Phase {
        match self {
            Phase::Idle | Phase::Break => Phase::Work,
            Phase::Work => Phase::Break,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Idle => "Idle",
            Phase::Work => "Work",
            Phase::Break => "Break",
        }
    }
}

/// Break that follows the `completed`-th work phase.
pub fn break_kind(completed: u32, pomodoros_until_long_break: u32) -> BreakKind {
    if pomodoros_until_long_break > 0 && completed % pomodoros_until_long_break == 0 {
        BreakKind::Long
    } else {
        BreakKind::Short
    }
}

/// Planned length of `phase` given the current counter.
///
/// Idle reports the work length, which is what the timer shows before the
/// first start.
pub fn phase_duration_secs(phase: Phase, completed: u32, settings: &Settings) -> u32 {
    match phase {
        Phase::Idle | Phase::Work => settings.work_secs(),
        Phase::Break => match break_kind(completed, settings.pomodoros_until_long_break()) {
            BreakKind::Long => settings.long_break_secs(),
            BreakKind::Short => settings.short_break_secs(),
        },
    }
}

/// Seconds until the next break begins. `None` while already on a break.
pub fn secs_until_next_break(
    phase: Phase,
    remaining_secs: u32,
    settings: &Settings,
) -> Option<u32> {
    match phase {
        Phase::Work => Some(remaining_secs),
        Phase::Idle => Some(settings.work_secs()),
        Phase::Break => None,
    }
}

/// Seconds until the next long break begins, assuming every phase runs to
/// completion back to back. `None` while on a break.
pub fn secs_until_long_break(
    phase: Phase,
    completed: u32,
    remaining_secs: u32,
    settings: &Settings,
) -> Option<u32> {
    let current = match phase {
        Phase::Work => remaining_secs,
        Phase::Idle => settings.work_secs(),
        Phase::Break => return None,
    };
    let cadence = settings.pomodoros_until_long_break();
    // Work phases still to go after the current one before a long break.
    let after_current = (cadence - (completed + 1) % cadence) % cadence;
    let cycle = settings.short_break_secs() + settings.work_secs();
    Some(current + after_current * cycle)
}

/// Render seconds as `mm:ss`. Minutes are not capped at 59.
pub fn format_mm_ss(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

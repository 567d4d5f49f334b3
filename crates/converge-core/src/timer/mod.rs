mod clock;
mod engine;
mod phase;

pub use clock::PhaseClock;
pub use engine::{EngineSnapshot, PomodoroEngine};
pub use phase::{
    break_kind, format_mm_ss, phase_duration_secs, secs_until_long_break, secs_until_next_break,
    BreakKind, Phase,
};

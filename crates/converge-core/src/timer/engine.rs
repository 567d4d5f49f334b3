//! Pomodoro phase engine.
//!
//! The engine is a wall-clock-based state machine. It does not use internal
//! threads - the host is responsible for calling `tick()` periodically
//! (about once a second) and for serializing access to a single engine.
//!
//! ## State Transitions
//!
//! ```text
//!            start                 pause
//! Idle ─────────────> WorkRunning <──────> WorkPaused
//!                         │  expiry
//!                         v
//!            (auto)  BreakRunning <──────> BreakPaused
//!        ┌────────────────┘  expiry
//!        v
//!   WorkRunning / AwaitingManualStart ── start_next_phase ──> Running
//! ```
//!
//! `reset()` returns to Idle from any state.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = PomodoroEngine::new(&settings);
//! engine.start(Utc::now(), &settings);
//! // In a loop:
//! engine.tick(Utc::now(), &settings, &notifier, &sink);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::clock::PhaseClock;
use super::phase::{
    break_kind, format_mm_ss, phase_duration_secs, secs_until_long_break, secs_until_next_break,
    BreakKind, Phase,
};
use crate::events::{Event, PhaseEvent};
use crate::notify::Notifier;
use crate::settings::Settings;
use crate::stats::{Session, SessionSink};

/// Core phase engine.
///
/// Operates on absolute instants -- no internal thread, no accumulated
/// counters. Every command takes the caller's `now`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PomodoroEngine {
    phase: Phase,
    is_running: bool,
    clock: PhaseClock,
    /// Cached `clock.remaining(now)` from the last command or tick.
    remaining_secs: u32,
    /// Planned length of the current phase, fixed when the phase was selected.
    phase_total_secs: u32,
    completed_pomodoros: u32,
    #[serde(default)]
    waiting_for_manual_start: bool,
}

/// Pull-based view of the engine for presentation code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub phase: Phase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub break_kind: Option<BreakKind>,
    pub is_running: bool,
    pub is_waiting_for_manual_start: bool,
    pub remaining_secs: u32,
    pub total_secs: u32,
    pub progress: f64,
    pub formatted_time: String,
    pub completed_pomodoros: u32,
    pub ends_at: Option<DateTime<Utc>>,
    pub next_break_secs: Option<u32>,
    pub next_break_formatted_time: Option<String>,
    pub next_long_break_secs: Option<u32>,
}

impl PomodoroEngine {
    /// Create an idle engine showing the configured work length.
    pub fn new(settings: &Settings) -> Self {
        let total = settings.work_secs();
        Self {
            phase: Phase::Idle,
            is_running: false,
            clock: PhaseClock::frozen(total),
            remaining_secs: total,
            phase_total_secs: total,
            completed_pomodoros: 0,
            waiting_for_manual_start: false,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn is_waiting_for_manual_start(&self) -> bool {
        self.waiting_for_manual_start
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn total_secs(&self) -> u32 {
        self.phase_total_secs
    }

    pub fn completed_pomodoros(&self) -> u32 {
        self.completed_pomodoros
    }

    pub fn ends_at(&self) -> Option<DateTime<Utc>> {
        self.clock.end_at()
    }

    pub fn is_paused(&self) -> bool {
        self.phase != Phase::Idle && !self.is_running && !self.waiting_for_manual_start
    }

    /// 0.0 .. 1.0 progress within the current phase.
    pub fn progress(&self) -> f64 {
        if self.phase == Phase::Idle || self.phase_total_secs == 0 {
            return 0.0;
        }
        let ratio = f64::from(self.remaining_secs) / f64::from(self.phase_total_secs);
        (1.0 - ratio).clamp(0.0, 1.0)
    }

    pub fn formatted_time(&self) -> String {
        format_mm_ss(self.remaining_secs)
    }

    pub fn snapshot(&self, settings: &Settings) -> EngineSnapshot {
        let next_break = if self.waiting_for_manual_start {
            None
        } else {
            secs_until_next_break(self.phase, self.remaining_secs, settings)
        };
        let next_long_break = if self.waiting_for_manual_start {
            None
        } else {
            secs_until_long_break(
                self.phase,
                self.completed_pomodoros,
                self.remaining_secs,
                settings,
            )
        };
        EngineSnapshot {
            phase: self.phase,
            break_kind: (self.phase == Phase::Break).then(|| {
                break_kind(self.completed_pomodoros, settings.pomodoros_until_long_break())
            }),
            is_running: self.is_running,
            is_waiting_for_manual_start: self.waiting_for_manual_start,
            remaining_secs: self.remaining_secs,
            total_secs: self.phase_total_secs,
            progress: self.progress(),
            formatted_time: self.formatted_time(),
            completed_pomodoros: self.completed_pomodoros,
            ends_at: self.clock.end_at(),
            next_break_secs: next_break,
            next_break_formatted_time: next_break.map(format_mm_ss),
            next_long_break_secs: next_long_break,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin work from Idle, resume a paused phase, or start the phase a
    /// manual-wait is holding. No-op while running.
    pub fn start(&mut self, now: DateTime<Utc>, settings: &Settings) -> Option<Event> {
        if self.is_running {
            return None;
        }
        if self.waiting_for_manual_start {
            return self.start_next_phase(now, settings);
        }
        match self.phase {
            Phase::Idle => Some(self.begin_phase(Phase::Work, now, settings)),
            Phase::Work | Phase::Break => {
                let ends_at = self.clock.resume(now);
                self.is_running = true;
                self.remaining_secs = self.clock.remaining(now);
                tracing::debug!(phase = ?self.phase, remaining = self.remaining_secs, "resumed");
                Some(Event::TimerResumed {
                    phase: self.phase,
                    remaining_secs: self.remaining_secs,
                    ends_at,
                    at: now,
                })
            }
        }
    }

    /// Freeze the running phase. No-op if not running.
    pub fn pause(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if !self.is_running {
            return None;
        }
        self.clock.pause(now);
        self.remaining_secs = self.clock.remaining(now);
        self.is_running = false;
        tracing::debug!(phase = ?self.phase, remaining = self.remaining_secs, "paused");
        Some(Event::TimerPaused {
            phase: self.phase,
            remaining_secs: self.remaining_secs,
            at: now,
        })
    }

    /// Return to Idle. With `clear_history` the pomodoro counter is zeroed as
    /// well; otherwise it carries over into the next run.
    pub fn reset(
        &mut self,
        now: DateTime<Utc>,
        settings: &Settings,
        clear_history: bool,
    ) -> Option<Event> {
        let total = settings.work_secs();
        self.phase = Phase::Idle;
        self.is_running = false;
        self.waiting_for_manual_start = false;
        self.clock.freeze_at(total);
        self.remaining_secs = total;
        self.phase_total_secs = total;
        if clear_history {
            self.completed_pomodoros = 0;
        }
        tracing::debug!(clear_history, "reset");
        Some(Event::TimerReset {
            cleared_history: clear_history,
            at: now,
        })
    }

    /// Start the phase selected when the previous one expired in manual mode.
    /// No-op unless the engine is waiting.
    pub fn start_next_phase(&mut self, now: DateTime<Utc>, settings: &Settings) -> Option<Event> {
        if !self.waiting_for_manual_start {
            return None;
        }
        Some(self.begin_phase(self.phase, now, settings))
    }

    /// Reconcile with the wall clock. Returns `Some(Event::PhaseCompleted)`
    /// when the running phase has expired.
    ///
    /// However long the host went without ticking, one call completes at most
    /// one phase; the next phase starts from `now`.
    pub fn tick(
        &mut self,
        now: DateTime<Utc>,
        settings: &Settings,
        notifier: &dyn Notifier,
        sink: &dyn SessionSink,
    ) -> Option<Event> {
        if !self.is_running {
            return None;
        }
        self.remaining_secs = self.clock.remaining(now);
        if self.remaining_secs > 0 {
            return None;
        }
        Some(self.complete_phase(now, settings, notifier, sink))
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn begin_phase(&mut self, phase: Phase, now: DateTime<Utc>, settings: &Settings) -> Event {
        let total = phase_duration_secs(phase, self.completed_pomodoros, settings);
        let ends_at = self.clock.start(total, now);
        self.phase = phase;
        self.is_running = true;
        self.waiting_for_manual_start = false;
        self.remaining_secs = total;
        self.phase_total_secs = total;

        let kind = (phase == Phase::Break)
            .then(|| break_kind(self.completed_pomodoros, settings.pomodoros_until_long_break()));
        tracing::debug!(?phase, break_kind = ?kind, duration_secs = total, "phase started");
        Event::PhaseStarted {
            phase,
            break_kind: kind,
            duration_secs: total,
            ends_at,
            at: now,
        }
    }

    fn complete_phase(
        &mut self,
        now: DateTime<Utc>,
        settings: &Settings,
        notifier: &dyn Notifier,
        sink: &dyn SessionSink,
    ) -> Event {
        let finished = self.phase;

        if finished == Phase::Work {
            self.completed_pomodoros += 1;
            let session = Session::new(now, self.phase_total_secs);
            if let Err(e) = sink.record(&session) {
                tracing::warn!(error = %e, "failed to record session; continuing");
            }
        }
        if let Some(kind) = PhaseEvent::for_phase(finished) {
            if let Err(e) = notifier.notify(kind) {
                tracing::warn!(error = %e, event = ?kind, "notification failed; continuing");
            }
        }

        let next = finished.next();
        let auto = settings.auto_continue();
        if auto {
            self.begin_phase(next, now, settings);
        } else {
            let total = phase_duration_secs(next, self.completed_pomodoros, settings);
            self.phase = next;
            self.is_running = false;
            self.waiting_for_manual_start = true;
            self.clock.freeze_at(total);
            self.remaining_secs = total;
            self.phase_total_secs = total;
        }

        tracing::info!(
            ?finished,
            ?next,
            completed = self.completed_pomodoros,
            auto_continued = auto,
            "phase completed"
        );
        Event::PhaseCompleted {
            phase: finished,
            next_phase: next,
            completed_pomodoros: self.completed_pomodoros,
            auto_continued: auto,
            at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CoreError, Result};
    use crate::notify::NullNotifier;
    use crate::stats::SessionStore;
    use chrono::{Duration, TimeZone};
    use std::cell::RefCell;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    fn secs(n: i64) -> Duration {
        Duration::seconds(n)
    }

    #[derive(Default)]
    struct RecordingNotifier {
        events: RefCell<Vec<PhaseEvent>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, event: PhaseEvent) -> Result<()> {
            self.events.borrow_mut().push(event);
            Ok(())
        }
    }

    struct FailingSink;

    impl SessionSink for FailingSink {
        fn record(&self, _session: &Session) -> Result<()> {
            Err(CoreError::Notify("disk full".into()))
        }
    }

    struct FailingNotifier;

    impl Notifier for FailingNotifier {
        fn notify(&self, _event: PhaseEvent) -> Result<()> {
            Err(CoreError::Notify("no notification center".into()))
        }
    }

    #[test]
    fn new_engine_is_idle() {
        let engine = PomodoroEngine::new(&Settings::default());
        assert_eq!(engine.phase(), Phase::Idle);
        assert!(!engine.is_running());
        assert_eq!(engine.ends_at(), None);
        assert_eq!(engine.formatted_time(), "25:00");
        assert_eq!(engine.progress(), 0.0);
    }

    #[test]
    fn start_from_idle_begins_work() {
        let settings = Settings::default();
        let mut engine = PomodoroEngine::new(&settings);
        let event = engine.start(t0(), &settings);
        assert!(matches!(
            event,
            Some(Event::PhaseStarted { phase: Phase::Work, duration_secs: 1500, .. })
        ));
        assert!(engine.is_running());
        assert_eq!(engine.ends_at(), Some(t0() + secs(1500)));
    }

    #[test]
    fn start_while_running_is_noop() {
        let settings = Settings::default();
        let mut engine = PomodoroEngine::new(&settings);
        engine.start(t0(), &settings);
        let before = engine.clone();
        assert!(engine.start(t0() + secs(30), &settings).is_none());
        assert_eq!(engine, before);
    }

    #[test]
    fn pause_twice_is_noop() {
        let settings = Settings::default();
        let mut engine = PomodoroEngine::new(&settings);
        engine.start(t0(), &settings);
        assert!(engine.pause(t0() + secs(100)).is_some());
        let before = engine.clone();
        assert!(engine.pause(t0() + secs(500)).is_none());
        assert_eq!(engine, before);
        assert!(engine.is_paused());
        assert_eq!(engine.remaining_secs(), 1400);
        assert_eq!(engine.ends_at(), None);
    }

    #[test]
    fn resume_continues_from_frozen_remaining() {
        let settings = Settings::default();
        let mut engine = PomodoroEngine::new(&settings);
        engine.start(t0(), &settings);
        engine.pause(t0() + secs(100));
        let later = t0() + secs(4000);
        assert!(matches!(
            engine.start(later, &settings),
            Some(Event::TimerResumed { remaining_secs: 1400, .. })
        ));
        assert_eq!(engine.ends_at(), Some(later + secs(1400)));
    }

    #[test]
    fn tick_while_paused_does_nothing() {
        let settings = Settings::default();
        let mut engine = PomodoroEngine::new(&settings);
        engine.start(t0(), &settings);
        engine.pause(t0() + secs(10));
        let store = SessionStore::default();
        assert!(engine
            .tick(t0() + secs(10_000), &settings, &NullNotifier, &store)
            .is_none());
        assert_eq!(engine.remaining_secs(), 1490);
    }

    #[test]
    fn tick_updates_remaining_and_progress() {
        let settings = Settings::default();
        let mut engine = PomodoroEngine::new(&settings);
        let store = SessionStore::default();
        engine.start(t0(), &settings);
        assert!(engine.tick(t0() + secs(750), &settings, &NullNotifier, &store).is_none());
        assert_eq!(engine.remaining_secs(), 750);
        assert!((engine.progress() - 0.5).abs() < 1e-9);
        assert_eq!(engine.formatted_time(), "12:30");
    }

    #[test]
    fn work_completion_records_session_and_notifies() {
        let settings = Settings::default();
        let mut engine = PomodoroEngine::new(&settings);
        let store = SessionStore::default();
        let notifier = RecordingNotifier::default();
        engine.start(t0(), &settings);

        let done = t0() + secs(1500);
        let event = engine.tick(done, &settings, &notifier, &store);
        assert!(matches!(
            event,
            Some(Event::PhaseCompleted {
                phase: Phase::Work,
                next_phase: Phase::Break,
                completed_pomodoros: 1,
                auto_continued: true,
                ..
            })
        ));
        assert_eq!(store.recent_sessions(10), vec![Session::new(done, 1500)]);
        assert_eq!(*notifier.events.borrow(), vec![PhaseEvent::WorkPhaseCompleted]);
        assert_eq!(engine.phase(), Phase::Break);
        assert_eq!(engine.remaining_secs(), 300);
    }

    #[test]
    fn break_completion_notifies_without_session() {
        let settings = Settings::default();
        let mut engine = PomodoroEngine::new(&settings);
        let store = SessionStore::default();
        let notifier = RecordingNotifier::default();
        engine.start(t0(), &settings);
        engine.tick(t0() + secs(1500), &settings, &notifier, &store);
        engine.tick(t0() + secs(1800), &settings, &notifier, &store);

        assert_eq!(store.len(), 1);
        assert_eq!(
            *notifier.events.borrow(),
            vec![PhaseEvent::WorkPhaseCompleted, PhaseEvent::BreakPhaseCompleted]
        );
        assert_eq!(engine.phase(), Phase::Work);
        assert_eq!(engine.completed_pomodoros(), 1);
    }

    #[test]
    fn manual_mode_halts_at_boundary() {
        let settings = Settings::default().with_auto_continue(false);
        let mut engine = PomodoroEngine::new(&settings);
        let store = SessionStore::default();
        engine.start(t0(), &settings);
        engine.tick(t0() + secs(1500), &settings, &NullNotifier, &store);

        assert!(!engine.is_running());
        assert!(engine.is_waiting_for_manual_start());
        assert_eq!(engine.phase(), Phase::Break);
        assert_eq!(engine.formatted_time(), "05:00");
        assert_eq!(engine.ends_at(), None);

        let before = engine.clone();
        assert!(engine
            .tick(t0() + secs(9999), &settings, &NullNotifier, &store)
            .is_none());
        assert_eq!(engine, before);

        let start_at = t0() + secs(2000);
        assert!(engine.start_next_phase(start_at, &settings).is_some());
        assert!(engine.is_running());
        assert!(!engine.is_waiting_for_manual_start());
        assert_eq!(engine.ends_at(), Some(start_at + secs(300)));
    }

    #[test]
    fn start_next_phase_without_wait_is_noop() {
        let settings = Settings::default();
        let mut engine = PomodoroEngine::new(&settings);
        assert!(engine.start_next_phase(t0(), &settings).is_none());
        assert_eq!(engine.phase(), Phase::Idle);
    }

    #[test]
    fn start_during_manual_wait_starts_next_phase() {
        let settings = Settings::default().with_auto_continue(false);
        let mut engine = PomodoroEngine::new(&settings);
        let store = SessionStore::default();
        engine.start(t0(), &settings);
        engine.tick(t0() + secs(1500), &settings, &NullNotifier, &store);
        assert!(matches!(
            engine.start(t0() + secs(1600), &settings),
            Some(Event::PhaseStarted { phase: Phase::Break, .. })
        ));
    }

    #[test]
    fn pause_in_manual_wait_is_noop() {
        let settings = Settings::default().with_auto_continue(false);
        let mut engine = PomodoroEngine::new(&settings);
        let store = SessionStore::default();
        engine.start(t0(), &settings);
        engine.tick(t0() + secs(1500), &settings, &NullNotifier, &store);
        assert!(engine.pause(t0() + secs(1501)).is_none());
        assert!(engine.is_waiting_for_manual_start());
    }

    #[test]
    fn reset_keeps_counter_unless_clearing_history() {
        let settings = Settings::default();
        let mut engine = PomodoroEngine::new(&settings);
        let store = SessionStore::default();
        engine.start(t0(), &settings);
        engine.tick(t0() + secs(1500), &settings, &NullNotifier, &store);

        engine.reset(t0() + secs(1600), &settings, false);
        assert_eq!(engine.phase(), Phase::Idle);
        assert!(!engine.is_running());
        assert_eq!(engine.ends_at(), None);
        assert_eq!(engine.completed_pomodoros(), 1);

        engine.reset(t0() + secs(1601), &settings, true);
        assert_eq!(engine.completed_pomodoros(), 0);
    }

    #[test]
    fn reset_clears_manual_wait() {
        let settings = Settings::default().with_auto_continue(false);
        let mut engine = PomodoroEngine::new(&settings);
        let store = SessionStore::default();
        engine.start(t0(), &settings);
        engine.tick(t0() + secs(1500), &settings, &NullNotifier, &store);
        engine.reset(t0() + secs(1501), &settings, false);
        assert!(!engine.is_waiting_for_manual_start());
    }

    #[test]
    fn settings_change_does_not_touch_running_phase() {
        let settings = Settings::default();
        let mut engine = PomodoroEngine::new(&settings);
        let store = SessionStore::default();
        engine.start(t0(), &settings);

        let shorter = Settings::new(10, 2, 20, 4, true).unwrap();
        assert!(engine.tick(t0() + secs(600), &shorter, &NullNotifier, &store).is_none());
        assert_eq!(engine.remaining_secs(), 900);

        engine.tick(t0() + secs(1500), &shorter, &NullNotifier, &store);
        // The completed session keeps the length it was started with.
        assert_eq!(store.recent_sessions(1)[0].duration_secs, 1500);
        // The break picks up the new settings.
        assert_eq!(engine.total_secs(), 120);
    }

    #[test]
    fn sink_failure_still_commits_transition() {
        let settings = Settings::default();
        let mut engine = PomodoroEngine::new(&settings);
        engine.start(t0(), &settings);
        let event = engine.tick(t0() + secs(1500), &settings, &FailingNotifier, &FailingSink);
        assert!(event.is_some());
        assert_eq!(engine.completed_pomodoros(), 1);
        assert_eq!(engine.phase(), Phase::Break);
        assert!(engine.is_running());
    }

    #[test]
    fn long_sleep_completes_exactly_once() {
        let settings = Settings::default();
        let mut engine = PomodoroEngine::new(&settings);
        let store = SessionStore::default();
        let notifier = RecordingNotifier::default();
        engine.start(t0(), &settings);

        let wake = t0() + secs(1500);
        assert!(engine.tick(wake, &settings, &notifier, &store).is_some());
        assert!(engine.tick(wake, &settings, &notifier, &store).is_none());
        assert_eq!(store.len(), 1);
        assert_eq!(notifier.events.borrow().len(), 1);
        assert_eq!(engine.ends_at(), Some(wake + secs(300)));
    }

    #[test]
    fn snapshot_reports_break_kind_and_next_break() {
        let settings = Settings::new(1, 1, 2, 1, true).unwrap();
        let mut engine = PomodoroEngine::new(&settings);
        let store = SessionStore::default();

        let idle = engine.snapshot(&settings);
        assert_eq!(idle.next_break_secs, Some(60));
        assert_eq!(idle.next_break_formatted_time.as_deref(), Some("01:00"));
        assert_eq!(idle.break_kind, None);

        engine.start(t0(), &settings);
        engine.tick(t0() + secs(60), &settings, &NullNotifier, &store);
        let on_break = engine.snapshot(&settings);
        assert_eq!(on_break.phase, Phase::Break);
        assert_eq!(on_break.break_kind, Some(BreakKind::Long));
        assert_eq!(on_break.total_secs, 120);
        assert_eq!(on_break.next_break_secs, None);
    }

    #[test]
    fn engine_survives_serialization() {
        let settings = Settings::default();
        let mut engine = PomodoroEngine::new(&settings);
        engine.start(t0(), &settings);
        let json = serde_json::to_string(&engine).unwrap();
        let mut restored: PomodoroEngine = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, engine);

        let store = SessionStore::default();
        assert!(restored
            .tick(t0() + secs(1500), &settings, &NullNotifier, &store)
            .is_some());
    }
}

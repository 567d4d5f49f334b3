//! Completion notifications.
//!
//! The engine hands a [`PhaseEvent`] to a [`Notifier`] and moves on. Delivery
//! failures are logged by the engine and never change its state.

use serde::Serialize;

use crate::error::Result;
use crate::events::PhaseEvent;
use crate::storage::NotificationsConfig;

pub trait Notifier {
    fn notify(&self, event: PhaseEvent) -> Result<()>;
}

/// User-facing content for a completion notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// Sound to play, `None` when sound is disabled.
    pub sound: Option<String>,
}

impl Notification {
    pub fn for_event(event: PhaseEvent, config: &NotificationsConfig) -> Self {
        let (title, body, sound) = match event {
            PhaseEvent::WorkPhaseCompleted => (
                "Pomodoro complete!",
                "Work session finished. Time for a break!",
                &config.work_sound,
            ),
            PhaseEvent::BreakPhaseCompleted => (
                "Break over!",
                "The break has ended. Time to get back to work!",
                &config.break_sound,
            ),
        };
        Self {
            title: title.to_string(),
            body: body.to_string(),
            sound: config.sound_enabled.then(|| sound.clone()),
        }
    }
}

/// Writes notifications to the `tracing` log.
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier {
    config: NotificationsConfig,
}

impl TracingNotifier {
    pub fn new(config: NotificationsConfig) -> Self {
        Self { config }
    }
}

impl Notifier for TracingNotifier {
    fn notify(&self, event: PhaseEvent) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }
        let n = Notification::for_event(event, &self.config);
        tracing::info!(title = %n.title, sound = ?n.sound, "{}", n.body);
        Ok(())
    }
}

/// Discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: PhaseEvent) -> Result<()> {
        Ok(())
    }
}

//! Validated timer settings.
//!
//! [`Settings`] is the immutable snapshot the engine reads at phase-start
//! boundaries. It can only be built through [`Settings::new`], which enforces
//! the declared ranges, so the engine never sees out-of-range values.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const WORK_MINUTES_RANGE: RangeInclusive<u32> = 1..=120;
pub const SHORT_BREAK_MINUTES_RANGE: RangeInclusive<u32> = 1..=60;
pub const LONG_BREAK_MINUTES_RANGE: RangeInclusive<u32> = 1..=120;
pub const POMODOROS_UNTIL_LONG_BREAK_RANGE: RangeInclusive<u32> = 1..=20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Settings {
    work_minutes: u32,
    short_break_minutes: u32,
    long_break_minutes: u32,
    pomodoros_until_long_break: u32,
    auto_continue: bool,
}

impl Settings {
    /// Build a settings snapshot, rejecting any value outside its range.
    pub fn new(
        work_minutes: u32,
        short_break_minutes: u32,
        long_break_minutes: u32,
        pomodoros_until_long_break: u32,
        auto_continue: bool,
    ) -> Result<Self, ValidationError> {
        check("work_minutes", work_minutes, WORK_MINUTES_RANGE)?;
        check("short_break_minutes", short_break_minutes, SHORT_BREAK_MINUTES_RANGE)?;
        check("long_break_minutes", long_break_minutes, LONG_BREAK_MINUTES_RANGE)?;
        check(
            "pomodoros_until_long_break",
            pomodoros_until_long_break,
            POMODOROS_UNTIL_LONG_BREAK_RANGE,
        )?;
        Ok(Self {
            work_minutes,
            short_break_minutes,
            long_break_minutes,
            pomodoros_until_long_break,
            auto_continue,
        })
    }

    pub fn work_minutes(&self) -> u32 {
        self.work_minutes
    }

    pub fn short_break_minutes(&self) -> u32 {
        self.short_break_minutes
    }

    pub fn long_break_minutes(&self) -> u32 {
        self.long_break_minutes
    }

    pub fn pomodoros_until_long_break(&self) -> u32 {
        self.pomodoros_until_long_break
    }

    pub fn auto_continue(&self) -> bool {
        self.auto_continue
    }

    pub fn work_secs(&self) -> u32 {
        self.work_minutes * 60
    }

    pub fn short_break_secs(&self) -> u32 {
        self.short_break_minutes * 60
    }

    pub fn long_break_secs(&self) -> u32 {
        self.long_break_minutes * 60
    }

    /// Copy with a different auto-continue flag.
    pub fn with_auto_continue(mut self, auto_continue: bool) -> Self {
        self.auto_continue = auto_continue;
        self
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            work_minutes: 25,
            short_break_minutes: 5,
            long_break_minutes: 15,
            pomodoros_until_long_break: 4,
            auto_continue: true,
        }
    }
}

/// Source of the current settings snapshot.
///
/// Hosts may back this with a file, a UI form, or a plain [`Settings`].
pub trait SettingsProvider {
    fn settings(&self) -> Settings;
}

impl SettingsProvider for Settings {
    fn settings(&self) -> Settings {
        *self
    }
}

pub(crate) fn check(
    field: &'static str,
    value: u32,
    range: RangeInclusive<u32>,
) -> Result<(), ValidationError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

/// Serialized form accepts the same fields but is re-validated on the way in.
impl<'de> Deserialize<'de> for Settings {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            work_minutes: u32,
            short_break_minutes: u32,
            long_break_minutes: u32,
            pomodoros_until_long_break: u32,
            auto_continue: bool,
        }

        let raw = Raw::deserialize(deserializer)?;
        Settings::new(
            raw.work_minutes,
            raw.short_break_minutes,
            raw.long_break_minutes,
            raw.pomodoros_until_long_break,
            raw.auto_continue,
        )
        .map_err(serde::de::Error::custom)
    }
}

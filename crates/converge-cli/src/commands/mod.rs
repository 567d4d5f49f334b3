//! Subcommand handlers and the state they share.

pub mod config;
pub mod stats;
pub mod timer;

use std::error::Error;
use std::io::Write;

use converge_core::{
    Config, CoreError, Database, Notification, Notifier, PhaseEvent, PomodoroEngine,
    Result as CoreResult, Settings, SettingsProvider,
};
use serde::Serialize;

pub type CliResult<T = ()> = Result<T, Box<dyn Error>>;

/// Everything a command needs: validated config and the open database.
pub struct Context {
    pub config: Config,
    pub settings: Settings,
    pub db: Database,
}

impl Context {
    pub fn open() -> CliResult<Self> {
        let config = Config::load()?;
        let settings = config.settings();
        let db = Database::open()?;
        Ok(Self {
            config,
            settings,
            db,
        })
    }

    /// Re-read the config file so changes made by another process apply at
    /// the next phase start. Keeps the current config if the file is bad.
    pub fn reload_config(&mut self) {
        match Config::load() {
            Ok(config) => {
                self.settings = config.settings();
                self.config = config;
            }
            Err(e) => tracing::warn!(error = %e, "keeping previous config"),
        }
    }

    pub fn notifier(&self) -> ConsoleNotifier {
        ConsoleNotifier {
            config: self.config.notifications.clone(),
        }
    }

    /// Restore the persisted engine, or a fresh idle one if none is stored
    /// or the stored state cannot be decoded.
    fn load_engine(&self) -> CliResult<PomodoroEngine> {
        match self.db.load_engine() {
            Ok(Some(engine)) => return Ok(engine),
            Ok(None) => {}
            Err(CoreError::Json(e)) => {
                tracing::warn!(error = %e, "discarding unreadable engine state");
            }
            Err(e) => return Err(e.into()),
        }
        Ok(PomodoroEngine::new(&self.settings))
    }

    /// Load the engine, hand it to `f`, and save it back, all under the
    /// database write lock. Another `converge` process doing the same waits
    /// for this one to commit.
    pub fn with_engine<T>(
        &self,
        f: impl FnOnce(&mut PomodoroEngine) -> CliResult<T>,
    ) -> CliResult<T> {
        self.db.immediate_transaction(|db| -> CliResult<T> {
            let mut engine = self.load_engine()?;
            let value = f(&mut engine)?;
            db.save_engine(&engine)?;
            Ok(value)
        })
    }
}

/// Announces completions on stderr, ringing the terminal bell when sound is on.
pub struct ConsoleNotifier {
    config: converge_core::NotificationsConfig,
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, event: PhaseEvent) -> CoreResult<()> {
        if !self.config.enabled {
            return Ok(());
        }
        let n = Notification::for_event(event, &self.config);
        let bell = if n.sound.is_some() { "\x07" } else { "" };
        let mut err = std::io::stderr().lock();
        writeln!(err, "{bell}{}: {}", n.title, n.body)?;
        Ok(())
    }
}

pub fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

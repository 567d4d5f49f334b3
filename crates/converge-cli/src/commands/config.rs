use chrono::Utc;
use clap::Subcommand;
use converge_core::SettingsProvider;

use super::{print_json, CliResult, Context};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "timer.work_minutes", "notifications.sound_enabled")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
    /// List all config values
    List,
    /// Reset config to defaults and zero the pomodoro counter
    Reset,
}

pub fn run(action: ConfigAction) -> CliResult {
    let mut ctx = Context::open()?;
    match action {
        ConfigAction::Get { key } => match ctx.config.get(&key) {
            Some(value) => println!("{value}"),
            None => return Err(format!("unknown key: {key}").into()),
        },
        ConfigAction::Set { key, value } => {
            ctx.config.set(&key, &value)?;
            ctx.config.save()?;
            println!("ok");
        }
        ConfigAction::List => print_json(&ctx.config)?,
        ConfigAction::Reset => {
            ctx.config.reset_to_defaults();
            ctx.config.save()?;
            ctx.settings = ctx.config.settings();

            ctx.with_engine(|engine| {
                engine.reset(Utc::now(), &ctx.settings, true);
                Ok(())
            })?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}

use chrono::Utc;
use clap::Subcommand;
use converge_core::Event;
use serde::Serialize;
use tokio::time::{self, Duration, MissedTickBehavior};

use super::{print_json, CliResult, Context};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start work, resume a paused phase, or begin the phase awaiting manual start
    Start,
    /// Pause the running phase
    Pause,
    /// Start the phase that is waiting for manual start
    Next,
    /// Reset to idle
    Reset {
        /// Also zero the completed-pomodoro counter
        #[arg(long)]
        all: bool,
    },
    /// Catch up with the wall clock and print the current state as JSON
    Status,
    /// Keep ticking once a second until interrupted
    Watch,
}

/// Output when a phase expired between invocations: the completion that was
/// settled first, then what the command itself produced.
#[derive(Serialize)]
struct CaughtUp {
    caught_up: Event,
    result: serde_json::Value,
}

pub fn run(action: TimerAction) -> CliResult {
    let mut ctx = Context::open()?;
    if matches!(action, TimerAction::Watch) {
        return watch(&mut ctx);
    }
    let now = Utc::now();

    let (caught_up, result) = ctx.with_engine(|engine| {
        // Settle anything that expired since the last invocation.
        let caught_up = engine.tick(now, &ctx.settings, &ctx.notifier(), &ctx.db);

        let event = match action {
            TimerAction::Start => engine.start(now, &ctx.settings),
            TimerAction::Pause => engine.pause(now),
            TimerAction::Next => engine.start_next_phase(now, &ctx.settings),
            TimerAction::Reset { all } => engine.reset(now, &ctx.settings, all),
            TimerAction::Status | TimerAction::Watch => None,
        };
        let result = match event {
            Some(event) => serde_json::to_value(event)?,
            None => serde_json::to_value(engine.snapshot(&ctx.settings))?,
        };
        Ok((caught_up, result))
    })?;

    match caught_up {
        Some(caught_up) => print_json(&CaughtUp { caught_up, result }),
        None => print_json(&result),
    }
}

/// Host tick loop. Each tick reloads the persisted engine and config so
/// commands issued from another terminal take effect.
fn watch(ctx: &mut Context) -> CliResult {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    rt.block_on(watch_loop(ctx))
}

async fn watch_loop(ctx: &mut Context) -> CliResult {
    let mut interval = time::interval(Duration::from_secs(1));
    // After a sleep, one tick is enough: the engine reads the wall clock.
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = &mut ctrl_c => {
                eprintln!();
                return Ok(());
            }
        }

        ctx.reload_config();
        let (event, snap) = ctx.with_engine(|engine| {
            let event = engine.tick(Utc::now(), &ctx.settings, &ctx.notifier(), &ctx.db);
            Ok((event, engine.snapshot(&ctx.settings)))
        })?;
        if let Some(event) = event {
            eprintln!();
            println!("{}", serde_json::to_string(&event)?);
        }

        let state = if snap.is_waiting_for_manual_start {
            "waiting"
        } else if snap.is_running {
            "running"
        } else {
            "stopped"
        };
        eprint!(
            "\r{:<5} {} ({state}, {} done)   ",
            snap.phase.label(),
            snap.formatted_time,
            snap.completed_pomodoros
        );
    }
}

//! Focusnook - a terminal runner for the focus timer.
//!
//! Prints a status line on every tick and a message on each completion.
//! Set `RUST_LOG=debug` to watch the engine's transitions.

use std::io::Write;

use clap::{Parser, ValueEnum};
use log::info;

use focusnook::format::{format_minutes, format_title};
use focusnook::{CompletionEvent, PomodoroSettings, Store, TimerEvent, TimerMode, TimerService};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Pomodoro,
    Timer,
    Stopwatch,
}

impl From<ModeArg> for TimerMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Pomodoro => TimerMode::Pomodoro,
            ModeArg::Timer => TimerMode::Timer,
            ModeArg::Stopwatch => TimerMode::Stopwatch,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "focusnook", version, about = "Pomodoro, timer and stopwatch")]
struct Cli {
    /// Timer mode to run.
    #[arg(long, value_enum, default_value = "pomodoro")]
    mode: ModeArg,

    /// Custom countdown hours.
    #[arg(long, default_value_t = 0)]
    hours: u32,

    /// Custom countdown minutes.
    #[arg(long, default_value_t = 0)]
    minutes: u32,

    /// Custom countdown seconds.
    #[arg(long, default_value_t = 0)]
    seconds: u32,

    /// Save a new focus duration in minutes.
    #[arg(long)]
    focus: Option<u32>,

    /// Save a new short break duration in minutes.
    #[arg(long)]
    short_break: Option<u32>,

    /// Save a new long break duration in minutes.
    #[arg(long)]
    long_break: Option<u32>,

    /// Print today's and all-time stats, then exit.
    #[arg(long)]
    stats: bool,
}

fn print_stats(service: &TimerService) {
    let stats = service.stats();
    println!(
        "Today:    {} sessions, {}",
        stats.daily.sessions,
        format_minutes(stats.daily.minutes)
    );
    println!(
        "All time: {} sessions, {}",
        stats.total.sessions,
        format_minutes(stats.total.minutes)
    );
}

fn describe(event: CompletionEvent) -> String {
    match event {
        CompletionEvent::PomodoroComplete {
            count,
            is_long_break,
        } => {
            if is_long_break {
                format!("Focus session {} done, enjoy a long break", count)
            } else {
                format!("Focus session {} done, take a short break", count)
            }
        }
        CompletionEvent::BreakComplete { .. } => "Break over, back to focus".to_string(),
        CompletionEvent::TimerComplete => "Time's up".to_string(),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let store = Store::open_default()?;
    let service = TimerService::new(store);

    if cli.stats {
        print_stats(&service);
        return Ok(());
    }

    if cli.focus.is_some() || cli.short_break.is_some() || cli.long_break.is_some() {
        let current = service.settings();
        service.save_settings(PomodoroSettings {
            focus_mins: cli.focus.unwrap_or(current.focus_mins),
            short_break_mins: cli.short_break.unwrap_or(current.short_break_mins),
            long_break_mins: cli.long_break.unwrap_or(current.long_break_mins),
        })?;
    }

    service.switch_mode(cli.mode.into());
    if cli.hours > 0 || cli.minutes > 0 || cli.seconds > 0 {
        service.set_custom_duration(cli.hours, cli.minutes, cli.seconds)?;
    }

    let events = service.subscribe();
    service.start();
    info!("Running in {} mode", service.state().mode().label());

    let mut stdout = std::io::stdout();
    for event in events {
        match event {
            TimerEvent::StateChanged(state) => {
                write!(stdout, "\r{:<24}", format_title(&state))?;
                stdout.flush()?;
                if !state.is_running() {
                    break;
                }
            }
            TimerEvent::Completed(completion) => {
                writeln!(stdout, "\r{:<24}", describe(completion))?;
            }
        }
    }
    writeln!(stdout)?;

    Ok(())
}

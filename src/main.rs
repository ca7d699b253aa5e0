mod app;
mod config;
mod error;
mod event;
mod games;
mod physics;
mod scores;
mod ui;

use std::fs::File;
use std::io::{self, Stdout};

use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use env_logger::{Builder, Target};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use app::App;
use config::{Cli, Settings};
use error::AppError;
use event::{Event, EventHandler};

/// The terminal belongs to the UI, so log records go to a file.
fn init_logger(settings: &Settings) -> Result<(), AppError> {
    let path = settings.log_path();
    let file = File::create(&path)?;
    Builder::new()
        .filter_level(settings.level_filter())
        .parse_env("RUST_LOG")
        .format_timestamp_millis()
        .format_line_number(true)
        .target(Target::Pipe(Box::new(file)))
        .try_init()?;
    log::debug!("logging to {}", path.display());
    Ok(())
}

/// Run `setup`; if it fails, run `undo` before handing back the error.
fn or_undo<T>(setup: impl FnOnce() -> Result<T, AppError>, undo: impl FnOnce()) -> Result<T, AppError> {
    setup().inspect_err(|_| undo())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, AppError> {
    enable_raw_mode()?;
    or_undo(
        || {
            let mut stdout = io::stdout();
            execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
            let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
            terminal.clear()?;
            Ok(terminal)
        },
        || {
            let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
            let _ = disable_raw_mode();
        },
    )
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<(), AppError> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    Ok(())
}

fn run(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App, events: &EventHandler) -> Result<(), AppError> {
    loop {
        terminal.draw(|frame| ui::render(frame, app))?;

        match events.next()? {
            Event::Tick => app.on_tick(),
            Event::Key(key) => app.on_key(key),
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn main() -> Result<(), AppError> {
    let cli = Cli::parse();
    let settings = Settings::from_cli(&cli)?;
    init_logger(&settings)?;
    log::info!(
        "starting crewcade {}: tick={}ms scores={}",
        env!("CARGO_PKG_VERSION"),
        settings.tick_ms,
        settings.scores_file().display()
    );
    log::debug!("settings: {:?}", settings);

    let mut app = App::new(&settings);

    let mut terminal = setup_terminal()?;
    let event_handler = EventHandler::new(settings.tick_ms);
    let result = run(&mut terminal, &mut app, &event_handler);

    // Restore terminal before reporting any error
    restore_terminal(&mut terminal)?;

    match &result {
        Ok(()) => log::info!("bye"),
        Err(e) => log::error!("stopped: {}", e),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn failed_setup_is_undone() {
        let undone = Cell::new(false);
        let result: Result<(), AppError> = or_undo(
            || Err(io::Error::other("no tty").into()),
            || undone.set(true),
        );
        assert!(matches!(result, Err(AppError::Io(_))));
        assert!(undone.get());
    }

    #[test]
    fn successful_setup_is_kept() {
        let undone = Cell::new(false);
        let result = or_undo(|| Ok(7), || undone.set(true));
        assert_eq!(result.ok(), Some(7));
        assert!(!undone.get());
    }
}

mod app;
mod config;
mod logging;
mod modal_ui;
mod modals;
mod persistence;
mod registry;
mod render;
mod sequence;
mod ui;

use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::{DefaultTerminal, Terminal};
use tracing::{debug, info, warn};

use crate::app::{App, FocusPanel, MessageKind};
use crate::config::{ConfigLoadStatus, LoadedConfig};
use crate::modals::{FileAction, handle_modal_input, handle_param_edit_input};

/// Compose code snippets from parameterized block templates.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Block definitions file to import at startup
    #[arg(short, long, value_name = "FILE")]
    definitions: Option<PathBuf>,

    /// Saved progress file to load at startup (after definitions)
    #[arg(short, long, value_name = "FILE")]
    session: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let start_time = Instant::now();

    // Initialize logging before anything else
    let logging = match logging::init() {
        Ok(ctx) => Some(ctx),
        Err(e) => {
            eprintln!("Warning: Failed to initialize logging: {}", e);
            None
        }
    };

    let loaded_config = config::load_config();
    debug!(
        config_path = %loaded_config.config_path.display(),
        status = ?loaded_config.status,
        "config_loaded"
    );

    if let Some(ctx) = &logging {
        ctx.apply_level(&loaded_config.config.logging.level);
        logging::cleanup_old_logs(&ctx.log_directory);
    }

    let session_id = logging.as_ref().map(|ctx| ctx.session_id.clone());
    let log_directory = logging.as_ref().map(|ctx| ctx.log_directory.clone());

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let terminal = Terminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

    let result = run_app(terminal, &cli, session_id.clone(), log_directory, loaded_config);

    // Restore terminal
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture)?;

    if let Some(sid) = session_id {
        info!(
            session_id = %sid,
            duration_secs = start_time.elapsed().as_secs_f64(),
            "session_end"
        );
    }

    result
}

fn run_app(
    mut terminal: DefaultTerminal,
    cli: &Cli,
    session_id: Option<String>,
    log_directory: Option<PathBuf>,
    loaded_config: LoadedConfig,
) -> Result<()> {
    let config_error = match &loaded_config.status {
        ConfigLoadStatus::Error(e) => Some(e.clone()),
        ConfigLoadStatus::Loaded | ConfigLoadStatus::Created => None,
    };
    let mut app = App::new(session_id, log_directory, loaded_config);
    load_startup_files(&mut app, cli, config_error);

    loop {
        terminal.draw(|f| ui::draw_ui(f, &mut app))?;

        if !crossterm::event::poll(Duration::from_millis(250))? {
            continue;
        }

        match crossterm::event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(&mut app, key),
            Event::Mouse(mouse) => match mouse.kind {
                MouseEventKind::ScrollUp => app.scroll_preview_up(3),
                MouseEventKind::ScrollDown => app.scroll_preview_down(3),
                _ => {}
            },
            _ => {}
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

/// Import and load the files named on the command line.
///
/// The popup shows the outcome of the startup files when there are any; the
/// config fallback notice is only shown when nothing else is pending.
fn load_startup_files(app: &mut App, cli: &Cli, config_error: Option<String>) {
    if let Some(path) = &cli.definitions {
        app.run_file_action(FileAction::ImportDefinitions, path);
    }
    // Only load progress if the definitions it indexes into are in place
    if let Some(path) = &cli.session
        && app.message.as_ref().is_none_or(|m| m.kind == MessageKind::Info)
    {
        app.run_file_action(FileAction::LoadProgress, path);
    }
    if let Some(e) = config_error {
        warn!(error = %e, "config_fallback_to_defaults");
        if app.message.is_none() {
            app.error("Config", format!("Using default settings: {}", e));
        }
    }
}

/// Route a key press to the popup, modal, field editor or focused panel.
fn handle_key(app: &mut App, key: KeyEvent) {
    // Popup dismissal first
    if app.message.is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
            app.message = None;
        }
        return;
    }

    if app.modal.is_some() {
        handle_modal_input(app, key.code, key.modifiers);
        return;
    }

    if app.param_edit.is_some() {
        handle_param_edit_input(app, key.code, key.modifiers);
        return;
    }

    match key.code {
        KeyCode::Char('q') => {
            info!("quit_requested");
            app.should_quit = true;
        }
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
        }
        KeyCode::Tab if key.modifiers.contains(KeyModifiers::SHIFT) => {
            app.focus = app.focus.prev();
        }
        KeyCode::Tab => app.focus = app.focus.next(),
        KeyCode::BackTab => app.focus = app.focus.prev(),
        KeyCode::Char('n') => app.open_new_definition(),
        KeyCode::Char('I') => app.open_file_prompt(FileAction::ImportDefinitions),
        KeyCode::Char('E') => app.open_file_prompt(FileAction::ExportDefinitions),
        KeyCode::Char('S') => app.open_file_prompt(FileAction::SaveProgress),
        KeyCode::Char('L') => app.open_file_prompt(FileAction::LoadProgress),
        KeyCode::Char('k') | KeyCode::Up => app.select_prev(),
        KeyCode::Char('j') | KeyCode::Down => app.select_next(),
        KeyCode::PageUp if app.focus == FocusPanel::Preview => {
            app.scroll_preview_up(app.preview_height);
        }
        KeyCode::PageDown if app.focus == FocusPanel::Preview => {
            app.scroll_preview_down(app.preview_height);
        }
        code => match app.focus {
            FocusPanel::Definitions => handle_definitions_key(app, code),
            FocusPanel::Sequence => handle_sequence_key(app, code),
            FocusPanel::Preview => {}
        },
    }
}

fn handle_definitions_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Enter | KeyCode::Char('+') => app.add_selected_definition(),
        KeyCode::Char('d') | KeyCode::Delete => app.delete_selected_definition(),
        _ => {}
    }
}

fn handle_sequence_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Enter => app.begin_param_edit(),
        KeyCode::Char('O') => app.insert_above_selected(),
        KeyCode::Char('o') => app.insert_below_selected(),
        KeyCode::Char('d') | KeyCode::Delete => app.delete_selected_instance(),
        KeyCode::Char('y') => app.copy_selected_instance(),
        KeyCode::Char('x') => app.cut_selected_instance(),
        KeyCode::Char('p') => app.paste_at_selected(),
        _ => {}
    }
}

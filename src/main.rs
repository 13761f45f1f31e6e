mod app;
mod ui;

use std::io;
use std::path::PathBuf;

use color_eyre::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;

use app::App;
use ui::ui;
use zypsel::config::Settings;
use zypsel::history_view::HistoryPane;
use zypsel::logging;
use zypsel::types::*;

fn main() -> Result<()> {
    color_eyre::install()?;

    let settings = Settings::load()?;
    if let Err(e) = logging::init(&settings.log_file) {
        eprintln!("Logging disabled: {e}");
    }

    let snapshot = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| settings.snapshot_path.clone());
    let mut app = App::new(&snapshot, settings)?;

    enable_raw_mode()?;
    io::stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;

    let result = run(&mut terminal, &mut app);

    disable_raw_mode()?;
    io::stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        // The history view was drawn empty; fill it now so the frame
        // shows up before the (blocking) read.
        if app.history_needs_load() {
            app.load_history();
            continue;
        }

        if event::poll(std::time::Duration::from_millis(100))?
            && let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                match app.state {
                    AppState::Listing => match key.code {
                        KeyCode::Char('q') => {
                            if app.has_pending_changes() {
                                app.state = AppState::ConfirmExit;
                            } else {
                                break;
                            }
                        }
                        KeyCode::Tab if key.modifiers.contains(KeyModifiers::SHIFT) => {
                            app.cycle_focus_back();
                        }
                        KeyCode::Tab => app.cycle_focus(),
                        KeyCode::BackTab => app.cycle_focus_back(),
                        KeyCode::Char('/') => app.start_search(),
                        KeyCode::Esc => {
                            if app.search.results.is_some() {
                                app.clear_search();
                            }
                        }
                        KeyCode::Up | KeyCode::Char('k') => match app.ui.focused_pane {
                            FocusedPane::Filters => app.move_filter_selection(-1),
                            FocusedPane::Objects => app.move_object_selection(-1),
                            FocusedPane::Details => app.move_details_selection(-1),
                        },
                        KeyCode::Down | KeyCode::Char('j') => match app.ui.focused_pane {
                            FocusedPane::Filters => app.move_filter_selection(1),
                            FocusedPane::Objects => app.move_object_selection(1),
                            FocusedPane::Details => app.move_details_selection(1),
                        },
                        KeyCode::PageDown => app.move_object_selection(10),
                        KeyCode::PageUp => app.move_object_selection(-10),
                        KeyCode::Home | KeyCode::Char('g') => app.move_object_selection(-10000),
                        KeyCode::End | KeyCode::Char('G') => app.move_object_selection(10000),
                        KeyCode::Char(' ') => app.toggle_current(),
                        KeyCode::Char('+' | '-' | '>' | '!' | '*') | KeyCode::Delete => {
                            app.apply_status_key(key.code);
                        }
                        KeyCode::Left | KeyCode::Char('h') => app.prev_details_tab(),
                        KeyCode::Right | KeyCode::Char('l') => app.next_details_tab(),
                        KeyCode::Char('H') => app.open_history(),
                        KeyCode::Char('?') => app.state = AppState::ShowingLegend,
                        KeyCode::Char('N') => app.unmark_all(),
                        KeyCode::Char('w') => {
                            if let Err(e) = app.save_snapshot() {
                                app.status_message = format!("Save failed: {e}");
                            }
                        }
                        _ => {}
                    },
                    AppState::Searching => match key.code {
                        KeyCode::Esc => app.cancel_search(),
                        KeyCode::Enter => app.confirm_search(),
                        KeyCode::Backspace => app.search_pop(),
                        KeyCode::Char(c) => app.search_push(c),
                        _ => {}
                    },
                    AppState::ShowingHistory => {
                        let Some(view) = app.history.as_mut() else {
                            app.state = AppState::Listing;
                            continue;
                        };
                        if view.warning().is_some() {
                            view.dismiss_warning();
                            continue;
                        }
                        match key.code {
                            KeyCode::Esc | KeyCode::Char('q') => app.close_history(),
                            KeyCode::Tab | KeyCode::BackTab => view.switch_focus(),
                            KeyCode::Up | KeyCode::Char('k') => match view.focus() {
                                HistoryPane::Dates => view.move_date(-1),
                                HistoryPane::Actions => view.move_action(-1),
                            },
                            KeyCode::Down | KeyCode::Char('j') => match view.focus() {
                                HistoryPane::Dates => view.move_date(1),
                                HistoryPane::Actions => view.move_action(1),
                            },
                            KeyCode::Enter | KeyCode::Char(' ') => view.toggle_group_expanded(),
                            _ => {}
                        }
                    }
                    AppState::ShowingLegend => match key.code {
                        KeyCode::Esc | KeyCode::Char('q' | '?') => app.state = AppState::Listing,
                        _ => {}
                    },
                    AppState::ConfirmExit => match key.code {
                        KeyCode::Char('y') | KeyCode::Enter => break,
                        KeyCode::Char('n') | KeyCode::Esc => {
                            app.state = AppState::Listing;
                        }
                        _ => {}
                    },
                }
            }
    }

    Ok(())
}

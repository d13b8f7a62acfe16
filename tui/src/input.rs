//! Keyboard handling.
//!
//! Non-blocking: drains whatever crossterm has queued and returns, so the
//! frame loop never stalls on input.

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use finaptico_engine::{App, Page};

pub fn handle_events(app: &mut App) -> Result<()> {
    while event::poll(Duration::ZERO)? {
        if let Event::Key(key) = event::read()?
            && key.kind != KeyEventKind::Release
        {
            handle_key(app, key);
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.request_quit();
        return;
    }

    if app.selector().is_some() {
        handle_selector_key(app, key);
        return;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.request_quit(),
        KeyCode::Tab => app.next_page(),
        KeyCode::BackTab => app.prev_page(),
        KeyCode::Char('c') => app.open_client_selector(),
        KeyCode::Char('r') => app.reload_cards(),
        KeyCode::Char('s') if app.page() == Page::Tesoreria => app.cycle_history_span(),
        KeyCode::Up if app.page() == Page::Fiscal => app.move_fiscal_cursor(-1),
        KeyCode::Down if app.page() == Page::Fiscal => app.move_fiscal_cursor(1),
        KeyCode::Char('p') if app.page() == Page::Fiscal => app.mark_selected_filing_presented(),
        _ => {}
    }
}

fn handle_selector_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.close_selector(),
        KeyCode::Enter => app.selector_confirm(),
        KeyCode::Up => app.selector_move(-1),
        KeyCode::Down => app.selector_move(1),
        KeyCode::Backspace => app.selector_backspace(),
        KeyCode::Char(c) => app.selector_input(c),
        _ => {}
    }
}

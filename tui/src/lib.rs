//! TUI rendering for Finaptico using ratatui.

mod cards;
mod format;
mod input;
mod selector;
mod theme;

pub use input::handle_events;
pub use theme::{Glyphs, Palette, glyphs, palette};

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph, Tabs},
};

use finaptico_engine::{App, Page};

/// Main draw function.
pub fn draw(frame: &mut Frame, app: &App) {
    let palette = palette(app.high_contrast());
    let glyphs = glyphs(app.ascii_only());

    let bg = Block::default().style(Style::default().bg(palette.bg_dark));
    frame.render_widget(bg, frame.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1), // brand + session
            Constraint::Length(1), // page tabs
            Constraint::Min(1),    // cards
            Constraint::Length(1), // status bar
        ])
        .split(frame.area());

    draw_topbar(frame, app, chunks[0], &palette);
    draw_tabs(frame, app, chunks[1], &palette);
    match app.page() {
        Page::Resumen => draw_resumen(frame, app, chunks[2], &palette, &glyphs),
        Page::Tesoreria => draw_tesoreria(frame, app, chunks[2], &palette, &glyphs),
        Page::Fiscal => draw_fiscal(frame, app, chunks[2], &palette, &glyphs),
    }
    draw_status_bar(frame, app, chunks[3], &palette);

    if app.selector().is_some() {
        selector::draw(frame, app, &palette, &glyphs);
    }
}

fn draw_topbar(frame: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let client = app
        .selected_account()
        .map(|account| account.label())
        .unwrap_or_else(|| "sin cliente".to_string());
    let email = app.session_email().unwrap_or("sin sesión");

    let mut spans = vec![
        Span::styled(
            "Finaptico",
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("  cliente ", Style::default().fg(palette.text_muted)),
        Span::styled(client, Style::default().fg(palette.text_primary)),
    ];
    if app.can_switch_client() {
        spans.push(Span::styled(" [c]", Style::default().fg(palette.text_muted)));
    }

    let left = Paragraph::new(Line::from(spans));
    frame.render_widget(left, area);

    let right = Paragraph::new(Line::from(Span::styled(
        email,
        Style::default().fg(palette.text_muted),
    )))
    .alignment(ratatui::layout::Alignment::Right);
    frame.render_widget(right, area);
}

fn draw_tabs(frame: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let titles: Vec<Line> = Page::all().iter().map(|page| Line::from(page.title())).collect();
    let selected = Page::all()
        .iter()
        .position(|page| *page == app.page())
        .unwrap_or(0);

    let tabs = Tabs::new(titles)
        .select(selected)
        .style(Style::default().fg(palette.text_muted))
        .highlight_style(
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(tabs, area);
}

fn draw_resumen(frame: &mut Frame, app: &App, area: Rect, palette: &Palette, glyphs: &Glyphs) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(columns[0]);
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(columns[1]);

    cards::draw_treasury(frame, left[0], app, palette, glyphs);
    cards::draw_ytd(frame, left[1], app, palette, glyphs);
    cards::draw_projection(frame, right[0], app, palette, glyphs);
    cards::draw_calendar(frame, right[1], app, palette, glyphs);
}

fn draw_tesoreria(frame: &mut Frame, app: &App, area: Rect, palette: &Palette, glyphs: &Glyphs) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(35),
            Constraint::Percentage(35),
            Constraint::Percentage(30),
        ])
        .split(area);

    cards::draw_treasury(frame, rows[0], app, palette, glyphs);
    cards::draw_history(frame, rows[1], app, palette, glyphs);
    cards::draw_invoices(frame, rows[2], app, palette, glyphs);
}

fn draw_fiscal(frame: &mut Frame, app: &App, area: Rect, palette: &Palette, glyphs: &Glyphs) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(30),
            Constraint::Percentage(30),
            Constraint::Percentage(40),
        ])
        .split(area);

    cards::draw_revenue(frame, rows[0], app, palette, glyphs);
    cards::draw_payments(frame, rows[1], app, palette, glyphs);
    cards::draw_filings(frame, rows[2], app, palette, glyphs);
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let text = app.status_message().map_or_else(
        || "Tab páginas · c cliente · r actualizar · s rango · q salir".to_string(),
        str::to_string,
    );
    let bar = Paragraph::new(Line::from(Span::styled(
        text,
        Style::default().fg(palette.text_muted),
    )));
    frame.render_widget(bar, area);
}

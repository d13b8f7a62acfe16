//! Client selector modal.
//!
//! A centered popup over the dashboard: type to filter, arrows to move,
//! Enter to switch client. Only reachable for advisors; the engine refuses
//! to open it otherwise.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Padding, Paragraph},
};

use finaptico_engine::App;

use crate::theme::{Glyphs, Palette, styles};

const MAX_LISTED: usize = 8;

pub(crate) fn draw(frame: &mut Frame, app: &App, palette: &Palette, glyphs: &Glyphs) {
    let Some(selector) = app.selector() else {
        return;
    };

    let area = centered(frame.area(), 44, (MAX_LISTED + 6) as u16);
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(palette.accent))
        .title(Span::styled(" Seleccionar cliente ", styles::card_title(palette)))
        .style(Style::default().bg(palette.bg_popup))
        .padding(Padding::horizontal(1));

    let mut lines = vec![
        Line::from(vec![
            Span::styled("filtro: ", styles::muted(palette)),
            Span::styled(
                selector.filter.clone(),
                Style::default().fg(palette.text_primary),
            ),
            Span::styled("▏", Style::default().fg(palette.accent)),
        ]),
        Line::from(""),
    ];

    let matches = app.selector_matches();
    let accounts = app.accounts();

    if matches.is_empty() {
        lines.push(Line::styled("Sin clientes", styles::muted(palette)));
    }

    for (row, account_index) in matches.iter().enumerate().take(MAX_LISTED) {
        let Some(account) = accounts.get(*account_index) else {
            continue;
        };
        let selected = row == selector.highlighted;
        let marker = if selected { glyphs.cursor } else { " " };
        let style = if selected {
            Style::default()
                .fg(palette.text_primary)
                .bg(palette.bg_highlight)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(palette.text_secondary)
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{marker} "), Style::default().fg(palette.accent)),
            Span::styled(account.label(), style),
            Span::styled(
                format!("  {}", account.effective_code()),
                styles::muted(palette),
            ),
        ]));
    }

    if matches.len() > MAX_LISTED {
        lines.push(Line::styled(
            format!("… y {} más", matches.len() - MAX_LISTED),
            styles::muted(palette),
        ));
    }

    lines.push(Line::from(""));
    lines.push(Line::styled(
        "Enter cambiar · Esc cerrar",
        styles::muted(palette),
    ));

    let paragraph = Paragraph::new(lines).block(block);
    frame.render_widget(paragraph, area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

//! Per-card renderers.
//!
//! Every card draws all four load states itself, so a failing query shows an
//! inline error while the rest of the dashboard keeps rendering data.

use chrono::Datelike;
use ratatui::{
    Frame,
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Padding, Paragraph, Row, Sparkline, Table, Wrap},
};

use finaptico_engine::{App, CardState, MAX_VISIBLE_ROWS};
use finaptico_types::{DueStatus, EventStatus, FilingStatus, format as money};

use crate::format;
use crate::theme::{Glyphs, Palette, styles};

pub(crate) fn card_block<'a>(title: String, palette: &Palette) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(palette.border))
        .title(Span::styled(format!(" {title} "), styles::card_title(palette)))
        .style(Style::default().bg(palette.bg_panel))
        .padding(Padding::horizontal(1))
}

/// Render the non-ready states; returns false when the card holds data and
/// the caller should draw it.
fn draw_state<T>(
    frame: &mut Frame,
    area: Rect,
    state: &CardState<T>,
    title: String,
    app: &App,
    palette: &Palette,
    glyphs: &Glyphs,
) -> bool {
    let body: Vec<Line> = match state {
        CardState::Ready { .. } => return false,
        CardState::Idle => vec![Line::styled(
            "Sin cliente seleccionado",
            styles::muted(palette),
        )],
        CardState::Loading => vec![Line::from(vec![
            Span::styled(glyphs.spinner_frame(app.tick_count()), Style::default().fg(palette.accent)),
            Span::styled(" Cargando datos…", styles::muted(palette)),
        ])],
        CardState::Failed(message) => vec![
            Line::styled("No se han podido cargar los datos.", styles::muted(palette)),
            Line::styled(message.clone(), styles::error(palette)),
        ],
    };

    let paragraph = Paragraph::new(body)
        .block(card_block(title, palette))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
    true
}

// ---------------------------------------------------------------------------
// Resumen
// ---------------------------------------------------------------------------

pub(crate) fn draw_treasury(
    frame: &mut Frame,
    area: Rect,
    app: &App,
    palette: &Palette,
    glyphs: &Glyphs,
) {
    let title = "Tesorería".to_string();
    if draw_state(frame, area, &app.cards.treasury, title.clone(), app, palette, glyphs) {
        return;
    }
    let Some(overview) = app.cards.treasury.data() else {
        return;
    };

    let mut lines = vec![
        Line::styled("Saldo bancario total", styles::muted(palette)),
        Line::styled(
            format::amount(overview.total, &overview.currency),
            styles::figure(palette).fg(palette.accent),
        ),
    ];

    if overview.instances.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::styled(
            "Aún no hay snapshots de tesorería para este cliente.",
            styles::muted(palette),
        ));
    } else {
        if let Some(date) = overview.snapshot_date {
            lines.push(Line::styled(
                format!("Último snapshot {}", money::date_es(date)),
                styles::muted(palette),
            ));
        }
        lines.push(Line::from(""));
        lines.push(Line::styled(
            "Instancias incluidas",
            styles::muted(palette),
        ));
        for instance in &overview.instances {
            lines.push(Line::from(vec![
                Span::styled(format!("{} ", glyphs.bullet), Style::default().fg(palette.blue)),
                Span::styled(
                    format!("{:<12}", instance.instance),
                    Style::default().fg(palette.text_secondary),
                ),
                Span::styled(
                    format::amount(instance.balance, &instance.currency),
                    Style::default().fg(palette.text_primary),
                ),
            ]));
        }
    }

    let paragraph = Paragraph::new(lines).block(card_block(title, palette));
    frame.render_widget(paragraph, area);
}

pub(crate) fn draw_projection(
    frame: &mut Frame,
    area: Rect,
    app: &App,
    palette: &Palette,
    glyphs: &Glyphs,
) {
    let title = "Proyección de saldo".to_string();
    if draw_state(frame, area, &app.cards.projection, title.clone(), app, palette, glyphs) {
        return;
    }
    let Some(series) = app.cards.projection.data() else {
        return;
    };

    let block = card_block(title, palette);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if series.points.len() < 2 {
        let paragraph = Paragraph::new(vec![
            Line::styled(
                "Aún no hay suficiente histórico de tesorería.",
                styles::muted(palette),
            ),
            Line::styled(
                "La gráfica se activará con más de un día de datos.",
                styles::muted(palette),
            ),
        ])
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
        return;
    }

    let chart_height = inner.height.saturating_sub(2);
    let chart_area = Rect { height: chart_height, ..inner };
    let footer_area = Rect {
        y: inner.y + chart_height,
        height: inner.height - chart_height,
        ..inner
    };

    let data = format::sparkline_data(&series.points);
    let visible = data.len().min(chart_area.width as usize);
    let sparkline = Sparkline::default()
        .data(data[data.len() - visible..].iter().copied())
        .style(Style::default().fg(palette.blue));
    frame.render_widget(sparkline, chart_area);

    if let Some((date, value)) = series.last() {
        let footer = Paragraph::new(Line::from(vec![
            Span::styled("Último registro ", styles::muted(palette)),
            Span::styled(money::date_es(*date), Style::default().fg(palette.text_secondary)),
            Span::styled("  ", Style::default()),
            Span::styled(
                format::amount(*value, &series.currency),
                styles::figure(palette),
            ),
        ]));
        frame.render_widget(footer, footer_area);
    }
}

pub(crate) fn draw_calendar(
    frame: &mut Frame,
    area: Rect,
    app: &App,
    palette: &Palette,
    glyphs: &Glyphs,
) {
    let title = "Calendario fiscal".to_string();
    if draw_state(frame, area, &app.cards.agenda, title.clone(), app, palette, glyphs) {
        return;
    }
    let Some(agenda) = app.cards.agenda.data() else {
        return;
    };

    let today = chrono::Utc::now().date_naive();
    let mut lines = Vec::new();

    if agenda.events.is_empty() {
        lines.push(Line::styled(
            "No hay eventos fiscales próximos",
            styles::muted(palette),
        ));
    }

    let max_events = (area.height.saturating_sub(2) as usize / 2).max(1);
    for event in agenda.events.iter().take(max_events) {
        let urgent = event.is_urgent(today);
        let (icon, icon_color) = match event.status {
            EventStatus::Completed => (glyphs.done, palette.success),
            EventStatus::Overdue => (glyphs.overdue, palette.error),
            EventStatus::Pending if urgent => (glyphs.urgent, palette.error),
            EventStatus::Pending => (glyphs.pending, palette.warning),
        };

        lines.push(Line::from(vec![
            Span::styled(format!("{icon} "), Style::default().fg(icon_color)),
            Span::styled(
                event.title.clone(),
                Style::default()
                    .fg(if urgent { palette.error } else { palette.text_primary })
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  {}", event.kind.label()),
                styles::muted(palette),
            ),
        ]));

        let days = event.days_until(today);
        let mut due = format!("  vence {}", money::date_es(event.due_date));
        if event.status == EventStatus::Pending && days > 0 {
            let unit = if days == 1 { "día" } else { "días" };
            due.push_str(&format!(" ({days} {unit})"));
        }
        lines.push(Line::from(vec![
            Span::styled(due, styles::muted(palette)),
            Span::styled(
                format!("  {}", event.status.label()),
                Style::default().fg(icon_color),
            ),
        ]));
    }

    let paragraph = Paragraph::new(lines).block(card_block(title, palette));
    frame.render_widget(paragraph, area);
}

pub(crate) fn draw_ytd(
    frame: &mut Frame,
    area: Rect,
    app: &App,
    palette: &Palette,
    glyphs: &Glyphs,
) {
    let year = chrono::Utc::now().year();
    let title = "Facturación año en curso".to_string();
    if draw_state(frame, area, &app.cards.ytd, title.clone(), app, palette, glyphs) {
        return;
    }
    let Some(snapshot) = app.cards.ytd.data() else {
        return;
    };

    let lines = match snapshot {
        Some(summary) => vec![
            Line::styled(format!("Ingresos {year}"), styles::muted(palette)),
            Line::styled(
                format::amount(summary.revenue, &summary.currency),
                styles::figure(palette).fg(palette.accent),
            ),
            Line::from(""),
            Line::styled("Periodo: 1 ene – hoy", styles::muted(palette)),
        ],
        None => vec![Line::styled(
            "Aún no se han registrado datos de facturación.",
            styles::muted(palette),
        )],
    };

    let paragraph = Paragraph::new(lines).block(card_block(title, palette));
    frame.render_widget(paragraph, area);
}

// ---------------------------------------------------------------------------
// Tesorería
// ---------------------------------------------------------------------------

pub(crate) fn draw_history(
    frame: &mut Frame,
    area: Rect,
    app: &App,
    palette: &Palette,
    glyphs: &Glyphs,
) {
    let view = app.history_view();
    let title = format!(
        "Histórico de saldo · vista {} · {} días [s]",
        format::view_label(view),
        app.history_span_days()
    );
    if draw_state(frame, area, &app.cards.history, title.clone(), app, palette, glyphs) {
        return;
    }
    let Some(series) = app.cards.history.data() else {
        return;
    };

    let block = card_block(title, palette);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if series.points.is_empty() {
        let paragraph = Paragraph::new(Line::styled(
            "Sin datos para el rango seleccionado.",
            styles::muted(palette),
        ));
        frame.render_widget(paragraph, inner);
        return;
    }

    let chart_height = inner.height.saturating_sub(1);
    let chart_area = Rect { height: chart_height, ..inner };
    let footer_area = Rect {
        y: inner.y + chart_height,
        height: inner.height - chart_height,
        ..inner
    };

    let data = format::sparkline_data(&series.points);
    let visible = data.len().min(chart_area.width as usize);
    let sparkline = Sparkline::default()
        .data(data[data.len() - visible..].iter().copied())
        .style(Style::default().fg(palette.accent));
    frame.render_widget(sparkline, chart_area);

    let (min, max) = series.points.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY),
        |(min, max), (_, v)| (min.min(*v), max.max(*v)),
    );
    let footer = Paragraph::new(Line::from(vec![
        Span::styled(
            format!("mín {}", money::eur_round(min)),
            styles::muted(palette),
        ),
        Span::styled(
            format!("  máx {}", money::eur_round(max)),
            styles::muted(palette),
        ),
        Span::styled(
            format!("  {} puntos", series.points.len()),
            styles::muted(palette),
        ),
    ]));
    frame.render_widget(footer, footer_area);
}

pub(crate) fn draw_invoices(
    frame: &mut Frame,
    area: Rect,
    app: &App,
    palette: &Palette,
    glyphs: &Glyphs,
) {
    let title = "Facturas pendientes de cobro".to_string();
    if draw_state(frame, area, &app.cards.invoices, title.clone(), app, palette, glyphs) {
        return;
    }
    let Some(book) = app.cards.invoices.data() else {
        return;
    };

    let block = card_block(title, palette);

    if book.invoices.is_empty() {
        let paragraph = Paragraph::new(Line::styled(
            "Todas las facturas emitidas figuran como cobradas a la fecha actual.",
            styles::muted(palette),
        ))
        .block(block)
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
        return;
    }

    let header = Row::new(vec!["Cliente", "Factura", "Importe", "Vencimiento", "Días"])
        .style(styles::muted(palette).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = book
        .visible()
        .iter()
        .map(|inv| {
            let overdue = inv.due_status == DueStatus::Overdue;
            let days_style = if overdue {
                Style::default().fg(palette.error)
            } else {
                Style::default().fg(palette.text_secondary)
            };
            Row::new(vec![
                Span::styled(
                    format::truncate(&inv.customer_name, 18),
                    Style::default().fg(palette.text_secondary),
                ),
                Span::styled(
                    inv.invoice_number.clone(),
                    Style::default().fg(palette.text_primary),
                ),
                Span::styled(
                    format::amount(inv.amount_pending.amount(), "EUR"),
                    Style::default().fg(palette.text_primary),
                ),
                Span::styled(money::date_es(inv.due_date), styles::muted(palette)),
                Span::styled(money::days_label(inv.days_to_due), days_style),
            ])
        })
        .collect();

    let mut footer_lines = Vec::new();
    if book.hidden_count() > 0 {
        footer_lines.push(format!(
            "Mostrando {} de {} facturas pendientes.",
            MAX_VISIBLE_ROWS,
            book.invoices.len()
        ));
    }
    footer_lines.push(
        "La clasificación se basa únicamente en la fecha de vencimiento.".to_string(),
    );

    let table = Table::new(
        rows,
        [
            Constraint::Length(18),
            Constraint::Length(12),
            Constraint::Length(14),
            Constraint::Length(12),
            Constraint::Fill(1),
        ],
    )
    .header(header)
    .footer(Row::new(vec![footer_lines.join("  ")]).style(styles::muted(palette)))
    .block(block);

    frame.render_widget(table, area);
}

// ---------------------------------------------------------------------------
// Fiscal
// ---------------------------------------------------------------------------

pub(crate) fn draw_revenue(
    frame: &mut Frame,
    area: Rect,
    app: &App,
    palette: &Palette,
    glyphs: &Glyphs,
) {
    let title = "Facturación últimos 12 meses".to_string();
    if draw_state(frame, area, &app.cards.revenue, title.clone(), app, palette, glyphs) {
        return;
    }
    let Some(history) = app.cards.revenue.data() else {
        return;
    };

    let block = card_block(title, palette);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if history.months.is_empty() {
        let paragraph = Paragraph::new(Line::styled(
            "No hay facturación registrada en los últimos 12 meses.",
            styles::muted(palette),
        ));
        frame.render_widget(paragraph, inner);
        return;
    }

    let chart_height = inner.height.saturating_sub(1);
    let chart_area = Rect { height: chart_height, ..inner };
    let footer_area = Rect {
        y: inner.y + chart_height,
        height: inner.height - chart_height,
        ..inner
    };

    let data = format::sparkline_data(&history.months);
    let visible = data.len().min(chart_area.width as usize);
    let sparkline = Sparkline::default()
        .data(data[data.len() - visible..].iter().copied())
        .style(Style::default().fg(palette.blue));
    frame.render_widget(sparkline, chart_area);

    let (first, last) = (
        history.months.first().map(|(m, _)| format::month_label(*m)),
        history.months.last().map(|(m, _)| format::month_label(*m)),
    );
    let footer = Paragraph::new(Line::from(vec![
        Span::styled(
            format!(
                "{} – {}",
                first.unwrap_or_default(),
                last.unwrap_or_default()
            ),
            styles::muted(palette),
        ),
        Span::styled("  total ", styles::muted(palette)),
        Span::styled(money::eur(history.total), styles::figure(palette)),
    ]));
    frame.render_widget(footer, footer_area);
}

pub(crate) fn draw_payments(
    frame: &mut Frame,
    area: Rect,
    app: &App,
    palette: &Palette,
    glyphs: &Glyphs,
) {
    let title = "Pagos de impuestos".to_string();
    if draw_state(frame, area, &app.cards.payments, title.clone(), app, palette, glyphs) {
        return;
    }
    let Some(payments) = app.cards.payments.data() else {
        return;
    };

    let block = card_block(title, palette);

    if payments.is_empty() {
        let paragraph = Paragraph::new(Line::styled(
            "No hay pagos de impuestos registrados este año.",
            styles::muted(palette),
        ))
        .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let header = Row::new(vec!["Modelo", "Periodo", "Importe", "Fecha"])
        .style(styles::muted(palette).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = payments
        .iter()
        .take(MAX_VISIBLE_ROWS)
        .map(|filing| {
            let currency = filing.currency.as_deref().unwrap_or("EUR");
            Row::new(vec![
                Span::styled(
                    format!("Modelo {}", filing.tax_model_code),
                    Style::default().fg(palette.text_primary),
                ),
                Span::styled(
                    money::quarter_label(filing.period_end),
                    Style::default().fg(palette.text_secondary),
                ),
                Span::styled(
                    format::amount(filing.amount.amount(), currency),
                    Style::default().fg(palette.text_primary),
                ),
                Span::styled(
                    filing.settled_at.map(money::date_es).unwrap_or_else(|| "-".to_string()),
                    styles::muted(palette),
                ),
            ])
        })
        .collect();

    let hidden = payments.len().saturating_sub(MAX_VISIBLE_ROWS);
    let footer_text = if hidden > 0 {
        format!(
            "Mostrando {} de {} liquidaciones. Solo importes registrados como pagados.",
            MAX_VISIBLE_ROWS,
            payments.len()
        )
    } else {
        "Solo importes registrados como pagados.".to_string()
    };

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(10),
            Constraint::Length(14),
            Constraint::Fill(1),
        ],
    )
    .header(header)
    .footer(Row::new(vec![footer_text]).style(styles::muted(palette)))
    .block(block);

    frame.render_widget(table, area);
}

pub(crate) fn draw_filings(
    frame: &mut Frame,
    area: Rect,
    app: &App,
    palette: &Palette,
    glyphs: &Glyphs,
) {
    let title = "Presentaciones fiscales".to_string();
    if draw_state(frame, area, &app.cards.agenda, title.clone(), app, palette, glyphs) {
        return;
    }
    let Some(agenda) = app.cards.agenda.data() else {
        return;
    };

    let block = card_block(title, palette);

    if agenda.filings.is_empty() {
        let paragraph = Paragraph::new(Line::styled(
            "No hay registros fiscales.",
            styles::muted(palette),
        ))
        .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let mut lines = Vec::new();
    let cursor = app.fiscal_cursor();
    let max_rows = area.height.saturating_sub(3) as usize;
    let first = cursor.saturating_sub(max_rows.saturating_sub(1));

    for (i, filing) in agenda.filings.iter().enumerate().skip(first).take(max_rows.max(1)) {
        let selected = i == cursor;
        let marker = if selected { glyphs.cursor } else { " " };
        let row_style = if selected {
            Style::default()
                .fg(palette.text_primary)
                .bg(palette.bg_highlight)
        } else {
            Style::default().fg(palette.text_secondary)
        };
        let status_color = match filing.status {
            FilingStatus::Settled => palette.success,
            FilingStatus::Presented => palette.blue,
            FilingStatus::Draft => palette.text_muted,
        };

        lines.push(Line::from(vec![
            Span::styled(format!("{marker} "), Style::default().fg(palette.accent)),
            Span::styled(
                format!("{:<10}", format!("Mod. {}", filing.tax_model_code)),
                row_style.add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("{:<9}", money::quarter_label(filing.period_end)),
                row_style,
            ),
            Span::styled(format!("{:<12}", filing.status.label()), Style::default().fg(status_color)),
            Span::styled(format!("{:<16}", filing.result.label()), row_style),
            Span::styled(
                format::amount(
                    filing.amount.amount(),
                    filing.currency.as_deref().unwrap_or("EUR"),
                ),
                row_style,
            ),
        ]));
    }

    if app.can_switch_client() {
        lines.push(Line::styled(
            "↑/↓ seleccionar · p marcar como presentado",
            styles::muted(palette),
        ));
    }

    let paragraph = Paragraph::new(lines).block(block);
    frame.render_widget(paragraph, area);
}

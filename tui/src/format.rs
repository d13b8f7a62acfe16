//! Presentation helpers shared by the card renderers.

use chrono::{Datelike, NaiveDate};
use unicode_width::UnicodeWidthChar;

use finaptico_types::TreasuryView;
use finaptico_types::format as money;

const MONTHS_ES: [&str; 12] = [
    "ene", "feb", "mar", "abr", "may", "jun", "jul", "ago", "sep", "oct", "nov", "dic",
];

/// Amount in the card currency. EUR renders `1.234,56 €`; anything else
/// falls back to number + code.
#[must_use]
pub fn amount(value: f64, currency: &str) -> String {
    if currency == "EUR" {
        money::eur(value)
    } else {
        format!("{} {currency}", money::number_es(value, 2))
    }
}

/// Short month label for chart axes: `jul26`.
#[must_use]
pub fn month_label(date: NaiveDate) -> String {
    let month = MONTHS_ES[date.month0() as usize];
    format!("{month}{:02}", date.year() % 100)
}

/// Spanish label of a treasury view granularity.
#[must_use]
pub const fn view_label(view: TreasuryView) -> &'static str {
    match view {
        TreasuryView::Daily => "diaria",
        TreasuryView::Weekly => "semanal",
        TreasuryView::Biweekly => "quincenal",
        TreasuryView::Monthly => "mensual",
    }
}

/// Clip to `max_width` terminal columns, appending `…` when clipped.
#[must_use]
pub fn truncate(text: &str, max_width: usize) -> String {
    let mut width = 0;
    let mut out = String::new();
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if width + w > max_width.saturating_sub(1) {
            out.push('…');
            return out;
        }
        width += w;
        out.push(c);
    }
    text.to_string()
}

/// Scale a series into sparkline bars (1..=100), keeping shape for flat and
/// negative series.
#[must_use]
pub fn sparkline_data(points: &[(NaiveDate, f64)]) -> Vec<u64> {
    if points.is_empty() {
        return Vec::new();
    }

    let min = points.iter().map(|(_, v)| *v).fold(f64::INFINITY, f64::min);
    let max = points
        .iter()
        .map(|(_, v)| *v)
        .fold(f64::NEG_INFINITY, f64::max);
    let range = (max - min).max(f64::EPSILON);

    points
        .iter()
        .map(|(_, v)| (((v - min) / range) * 99.0).round() as u64 + 1)
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use finaptico_types::TreasuryView;

    use super::{amount, month_label, sparkline_data, truncate, view_label};

    fn date(s: &str) -> NaiveDate {
        s.parse().expect("date")
    }

    #[test]
    fn amounts_follow_currency() {
        assert_eq!(amount(1234.5, "EUR"), "1.234,50 €");
        assert_eq!(amount(1234.5, "USD"), "1.234,5 USD");
    }

    #[test]
    fn month_labels_are_spanish() {
        assert_eq!(month_label(date("2026-01-01")), "ene26");
        assert_eq!(month_label(date("2025-12-01")), "dic25");
    }

    #[test]
    fn view_labels() {
        assert_eq!(view_label(TreasuryView::Daily), "diaria");
        assert_eq!(view_label(TreasuryView::Monthly), "mensual");
    }

    #[test]
    fn truncate_respects_width() {
        assert_eq!(truncate("corto", 10), "corto");
        assert_eq!(truncate("Cliente Norte SA", 8), "Cliente…");
    }

    #[test]
    fn sparkline_scales_to_band() {
        let points = vec![
            (date("2026-07-01"), -50.0),
            (date("2026-07-02"), 0.0),
            (date("2026-07-03"), 50.0),
        ];
        let bars = sparkline_data(&points);
        assert_eq!(bars, vec![1, 51, 100]);
    }

    #[test]
    fn flat_series_stays_visible() {
        let points = vec![(date("2026-07-01"), 10.0), (date("2026-07-02"), 10.0)];
        let bars = sparkline_data(&points);
        assert!(bars.iter().all(|&b| b >= 1));
    }

    #[test]
    fn empty_series_is_empty() {
        assert!(sparkline_data(&[]).is_empty());
    }
}

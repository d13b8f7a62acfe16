//! es-ES numeric and date formatting.
//!
//! The dashboard renders for Spanish accounting users: thousands grouped
//! with `.`, decimals with `,`, the euro sign trailing (`1.234.567,89 €`),
//! and `dd/mm/yyyy` dates.

use chrono::{Datelike, NaiveDate};

/// Currency with two fixed decimals: `-1.234,50 €`.
#[must_use]
pub fn eur(value: f64) -> String {
    format!("{} €", decimal_es(value, 2))
}

/// Currency rounded to whole units, for axis labels: `45.211 €`.
#[must_use]
pub fn eur_round(value: f64) -> String {
    format!("{} €", decimal_es(value, 0))
}

/// Plain number with up to `decimals` digits, trailing zeros trimmed.
#[must_use]
pub fn number_es(value: f64, decimals: usize) -> String {
    let mut out = decimal_es(value, decimals);
    if decimals > 0 && out.contains(',') {
        while out.ends_with('0') {
            out.pop();
        }
        if out.ends_with(',') {
            out.pop();
        }
    }
    out
}

fn decimal_es(value: f64, decimals: usize) -> String {
    let fixed = format!("{:.decimals$}", value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut out = String::new();
    // Sign dropped when everything rounded away to zero
    if value < 0.0 && fixed.bytes().any(|b| (b'1'..=b'9').contains(&b)) {
        out.push('-');
    }

    let digits = int_part.len();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (digits - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }

    if let Some(frac) = frac_part {
        out.push(',');
        out.push_str(frac);
    }
    out
}

/// `dd/mm/yyyy`.
#[must_use]
pub fn date_es(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Due-distance label for invoice rows: `Hoy`, `16 días`, `-33 días`.
#[must_use]
pub fn days_label(days_to_due: i64) -> String {
    match days_to_due {
        0 => "Hoy".to_string(),
        d if d > 0 => format!("{d} días"),
        d => format!("-{} días", d.abs()),
    }
}

/// Quarter label derived from a period-end date: `Q2 2026`.
#[must_use]
pub fn quarter_label(period_end: NaiveDate) -> String {
    let quarter = match period_end.month() {
        1..=3 => "Q1",
        4..=6 => "Q2",
        7..=9 => "Q3",
        _ => "Q4",
    };
    format!("{quarter} {}", period_end.year())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{date_es, days_label, decimal_es, eur, eur_round, number_es, quarter_label};

    fn date(s: &str) -> NaiveDate {
        s.parse().expect("date")
    }

    #[test]
    fn eur_groups_thousands_and_fixes_decimals() {
        assert_eq!(eur(0.0), "0,00 €");
        assert_eq!(eur(7.5), "7,50 €");
        assert_eq!(eur(1234.5), "1.234,50 €");
        assert_eq!(eur(1_234_567.891), "1.234.567,89 €");
    }

    #[test]
    fn eur_negative() {
        assert_eq!(eur(-912.07), "-912,07 €");
        // A negative that rounds to zero keeps no stray sign
        assert_eq!(eur(-0.001), "0,00 €");
    }

    #[test]
    fn eur_round_drops_decimals() {
        assert_eq!(eur_round(45210.88), "45.211 €");
        assert_eq!(eur_round(999.4), "999 €");
    }

    #[test]
    fn number_trims_trailing_zeros() {
        assert_eq!(number_es(1234.5, 2), "1.234,5");
        assert_eq!(number_es(1234.0, 2), "1.234");
        assert_eq!(number_es(0.25, 2), "0,25");
    }

    #[test]
    fn grouping_boundaries() {
        assert_eq!(decimal_es(999.0, 0), "999");
        assert_eq!(decimal_es(1000.0, 0), "1.000");
        assert_eq!(decimal_es(100_000.0, 0), "100.000");
        assert_eq!(decimal_es(1_000_000.0, 0), "1.000.000");
    }

    #[test]
    fn dates_render_spanish_order() {
        assert_eq!(date_es(date("2026-08-04")), "04/08/2026");
    }

    #[test]
    fn days_labels() {
        assert_eq!(days_label(0), "Hoy");
        assert_eq!(days_label(16), "16 días");
        assert_eq!(days_label(-33), "-33 días");
    }

    #[test]
    fn quarters_follow_period_end() {
        assert_eq!(quarter_label(date("2026-03-31")), "Q1 2026");
        assert_eq!(quarter_label(date("2026-06-30")), "Q2 2026");
        assert_eq!(quarter_label(date("2026-09-30")), "Q3 2026");
        assert_eq!(quarter_label(date("2026-12-31")), "Q4 2026");
    }
}

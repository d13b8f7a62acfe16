//! Defensive coercion of Postgres numerics.
//!
//! PostgREST serializes `numeric` columns as JSON strings to avoid float
//! truncation, but some views cast to `float8` and return plain numbers.
//! [`Figure`] captures the raw wire value and defers the coercion choice to
//! the call site: [`Figure::amount`] is lenient (bad input reads as 0.0, the
//! way a card that can tolerate a hole wants it), [`Figure::try_amount`] is
//! strict (one bad value fails the whole series).

use std::fmt;

use serde::{Deserialize, Serialize};

/// A numeric field as it arrived from the backend: number, string, or absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Figure {
    Number(f64),
    Text(String),
    /// Field was `null` or missing entirely (with `#[serde(default)]`).
    #[default]
    Absent,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FigureError {
    #[error("\"{0}\" is not a valid number")]
    Unparseable(String),
    #[error("non-finite value {0}")]
    NonFinite(f64),
    #[error("value is missing")]
    Absent,
}

impl Figure {
    /// Strict coercion: any value that is not a finite number is an error.
    pub fn try_amount(&self) -> Result<f64, FigureError> {
        match self {
            Self::Number(n) if n.is_finite() => Ok(*n),
            Self::Number(n) => Err(FigureError::NonFinite(*n)),
            Self::Text(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| FigureError::Unparseable(s.clone())),
            Self::Absent => Err(FigureError::Absent),
        }
    }

    /// Lenient coercion: anything unusable reads as 0.0.
    #[must_use]
    pub fn amount(&self) -> f64 {
        self.try_amount().unwrap_or(0.0)
    }

    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl fmt::Display for Figure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::Absent => f.write_str("null"),
        }
    }
}

impl From<f64> for Figure {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{Figure, FigureError};

    #[test]
    fn number_passes_both_modes() {
        let fig = Figure::Number(1234.56);
        assert_eq!(fig.try_amount(), Ok(1234.56));
        assert_eq!(fig.amount(), 1234.56);
    }

    #[test]
    fn numeric_string_parses() {
        let fig = Figure::Text("8123.40".to_string());
        assert_eq!(fig.try_amount(), Ok(8123.40));
    }

    #[test]
    fn string_with_whitespace_parses() {
        let fig = Figure::Text(" 42.5 ".to_string());
        assert_eq!(fig.amount(), 42.5);
    }

    #[test]
    fn garbage_string_is_strict_error_lenient_zero() {
        let fig = Figure::Text("n/a".to_string());
        assert_eq!(fig.try_amount(), Err(FigureError::Unparseable("n/a".to_string())));
        assert_eq!(fig.amount(), 0.0);
    }

    #[test]
    fn empty_string_is_strict_error_lenient_zero() {
        let fig = Figure::Text(String::new());
        assert!(fig.try_amount().is_err());
        assert_eq!(fig.amount(), 0.0);
    }

    #[test]
    fn infinity_text_rejected() {
        // f64::from_str accepts "inf"; the backend never legitimately sends it
        let fig = Figure::Text("inf".to_string());
        assert!(fig.try_amount().is_err());
        assert_eq!(fig.amount(), 0.0);
    }

    #[test]
    fn absent_is_strict_error_lenient_zero() {
        assert_eq!(Figure::Absent.try_amount(), Err(FigureError::Absent));
        assert_eq!(Figure::Absent.amount(), 0.0);
    }

    #[test]
    fn negative_balances_survive() {
        let fig = Figure::Text("-912.07".to_string());
        assert_eq!(fig.try_amount(), Ok(-912.07));
    }

    #[test]
    fn deserializes_from_number_string_and_null() {
        let n: Figure = serde_json::from_str("99.5").unwrap();
        assert_eq!(n, Figure::Number(99.5));

        let s: Figure = serde_json::from_str("\"99.5\"").unwrap();
        assert_eq!(s, Figure::Text("99.5".to_string()));

        let absent: Figure = serde_json::from_str("null").unwrap();
        assert_eq!(absent, Figure::Absent);
    }
}

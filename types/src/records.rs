//! Wire records deserialized from backend views and Edge Functions.
//!
//! Field shapes follow the SQL views verbatim; numeric columns use [`Figure`]
//! because Postgres may serialize them as strings. Dates arrive as either
//! `YYYY-MM-DD` or a full timestamp depending on the view, so date fields go
//! through a prefix parser instead of chrono's strict format.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{ClientCode, Figure, InstanceCode};

fn flexible_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).map_err(serde::de::Error::custom)
}

fn flexible_date_opt<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => parse_date(&s).map(Some).map_err(serde::de::Error::custom),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    let prefix = raw.get(..10).unwrap_or(raw);
    prefix
        .parse::<NaiveDate>()
        .map_err(|e| format!("invalid date \"{raw}\": {e}"))
}

/// One instance's balance inside a treasury snapshot (`treasury-feed`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TreasuryRow {
    pub client_code: ClientCode,
    pub instance_code: InstanceCode,
    #[serde(deserialize_with = "flexible_date")]
    pub snapshot_date: NaiveDate,
    #[serde(default)]
    pub total_balance: Figure,
    #[serde(default)]
    pub currency: Option<String>,
}

/// One point of the treasury balance series (`treasury-timeseries`).
///
/// Older views exposed the balance under different column names; the reader
/// falls back `total_balance` → `total` → `balance`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SeriesPoint {
    pub client_code: ClientCode,
    #[serde(default)]
    pub instance_code: Option<InstanceCode>,
    #[serde(deserialize_with = "flexible_date")]
    pub snapshot_date: NaiveDate,
    #[serde(default)]
    pub total_balance: Figure,
    #[serde(default)]
    pub total: Figure,
    #[serde(default)]
    pub balance: Figure,
    #[serde(default)]
    pub currency: Option<String>,
}

impl SeriesPoint {
    /// The balance figure under whichever column this view used.
    #[must_use]
    pub fn figure(&self) -> &Figure {
        if !self.total_balance.is_absent() {
            &self.total_balance
        } else if !self.total.is_absent() {
            &self.total
        } else {
            &self.balance
        }
    }
}

/// Current fiscal snapshot row (`v_fiscal_current_snapshot`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FiscalSnapshot {
    pub client_code: ClientCode,
    #[serde(default)]
    pub is_revenue_ytd: Figure,
    #[serde(default)]
    pub currency: Option<String>,
}

/// One month of invoiced revenue (`revenue_12m` widget).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RevenueMonth {
    pub client_code: ClientCode,
    #[serde(deserialize_with = "flexible_date")]
    pub month: NaiveDate,
    #[serde(default)]
    pub total_revenue: Figure,
}

/// Classification of a pending invoice relative to its due date.
///
/// Computed server-side from the due date alone; it says nothing about
/// collection probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DueStatus {
    OnTime,
    Overdue,
}

/// An issued invoice not yet collected (`v_dashboard_sales_invoices_pending`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PendingInvoice {
    pub customer_name: String,
    pub invoice_number: String,
    #[serde(default)]
    pub amount_pending: Figure,
    #[serde(deserialize_with = "flexible_date")]
    pub due_date: NaiveDate,
    pub days_to_due: i64,
    pub due_status: DueStatus,
    pub client_code: ClientCode,
    pub instance_code: InstanceCode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilingStatus {
    Draft,
    Presented,
    Settled,
}

impl FilingStatus {
    /// Spanish label shown in the fiscal tables.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "Borrador",
            Self::Presented => "Presentado",
            Self::Settled => "Cerrado",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilingResult {
    Payable,
    Compensable,
    Refundable,
    Zero,
}

impl FilingResult {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Payable => "A pagar",
            Self::Compensable => "A compensar",
            Self::Refundable => "A devolver",
            Self::Zero => "Resultado cero",
        }
    }
}

/// A tax filing row (`tax_filings` table, also returned by
/// `client-tax-payments-list`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TaxFiling {
    pub id: String,
    #[serde(default)]
    pub client_code: Option<ClientCode>,
    pub tax_model_code: String,
    #[serde(deserialize_with = "flexible_date")]
    pub period_start: NaiveDate,
    #[serde(deserialize_with = "flexible_date")]
    pub period_end: NaiveDate,
    pub status: FilingStatus,
    pub result: FilingResult,
    #[serde(default)]
    pub amount: Figure,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "flexible_date_opt")]
    pub presented_at: Option<NaiveDate>,
    #[serde(default, deserialize_with = "flexible_date_opt")]
    pub settled_at: Option<NaiveDate>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Body of the `admin-tax-filing-upsert` Edge Function.
///
/// `id: None` creates, `Some` updates. Empty optionals serialize as `null`
/// so the backend clears the column rather than keeping stale values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxFilingDraft {
    pub id: Option<String>,
    pub client_code: ClientCode,
    pub tax_model_code: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub status: FilingStatus,
    pub result: FilingResult,
    pub amount: f64,
    pub currency: String,
    pub presented_at: Option<String>,
    pub settled_at: Option<String>,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum EventKind {
    #[serde(rename = "declaracion")]
    Declaration,
    #[serde(rename = "pago")]
    Payment,
    #[serde(rename = "informativo")]
    Informative,
}

impl EventKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Declaration => "Declaración",
            Self::Payment => "Pago",
            Self::Informative => "Informativo",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum EventStatus {
    #[serde(rename = "pendiente")]
    Pending,
    #[serde(rename = "completado")]
    Completed,
    #[serde(rename = "vencido")]
    Overdue,
}

impl EventStatus {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pendiente",
            Self::Completed => "completado",
            Self::Overdue => "vencido",
        }
    }
}

/// An entry of the fiscal calendar card.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TaxEvent {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(deserialize_with = "flexible_date")]
    pub due_date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub status: EventStatus,
    #[serde(default)]
    pub model: Option<String>,
}

impl TaxEvent {
    /// Days from `today` until the due date; negative once past due.
    #[must_use]
    pub fn days_until(&self, today: NaiveDate) -> i64 {
        (self.due_date - today).num_days()
    }

    /// Pending and due within a week (including already past due).
    #[must_use]
    pub fn is_urgent(&self, today: NaiveDate) -> bool {
        self.status == EventStatus::Pending && self.days_until(today) <= 7
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{
        DueStatus, EventStatus, FilingResult, FilingStatus, PendingInvoice, SeriesPoint, TaxEvent,
        TaxFiling, TreasuryRow,
    };
    use crate::Figure;

    fn date(s: &str) -> NaiveDate {
        s.parse().expect("date")
    }

    #[test]
    fn treasury_row_parses_string_balance_and_timestamp_date() {
        let row: TreasuryRow = serde_json::from_value(serde_json::json!({
            "client_code": "CLIENT_001",
            "instance_code": "ODOO_MAIN",
            "snapshot_date": "2026-07-31T00:00:00+00:00",
            "total_balance": "45210.88",
            "currency": "EUR"
        }))
        .expect("row");

        assert_eq!(row.snapshot_date, date("2026-07-31"));
        assert_eq!(row.total_balance.amount(), 45210.88);
    }

    #[test]
    fn series_point_falls_back_through_balance_columns() {
        let point: SeriesPoint = serde_json::from_value(serde_json::json!({
            "client_code": "CLIENT_001",
            "snapshot_date": "2026-07-01",
            "total": 900.0,
            "currency": "EUR"
        }))
        .expect("point");
        assert_eq!(point.figure().amount(), 900.0);

        let point: SeriesPoint = serde_json::from_value(serde_json::json!({
            "client_code": "CLIENT_001",
            "snapshot_date": "2026-07-01",
            "balance": "12.5"
        }))
        .expect("point");
        assert_eq!(point.figure().amount(), 12.5);

        // total_balance wins even when the legacy columns are present
        let point: SeriesPoint = serde_json::from_value(serde_json::json!({
            "client_code": "CLIENT_001",
            "snapshot_date": "2026-07-01",
            "total_balance": 1.0,
            "total": 2.0,
            "balance": 3.0
        }))
        .expect("point");
        assert_eq!(point.figure().amount(), 1.0);
    }

    #[test]
    fn series_point_without_any_balance_reads_zero() {
        let point: SeriesPoint = serde_json::from_value(serde_json::json!({
            "client_code": "CLIENT_001",
            "snapshot_date": "2026-07-01"
        }))
        .expect("point");
        assert_eq!(point.figure().amount(), 0.0);
        assert_eq!(point.figure(), &Figure::Absent);
    }

    #[test]
    fn pending_invoice_parses_wire_statuses() {
        let inv: PendingInvoice = serde_json::from_value(serde_json::json!({
            "customer_name": "Cliente Norte SA",
            "invoice_number": "F2026-0101",
            "amount_pending": 1500.0,
            "due_date": "2026-08-20",
            "days_to_due": 16,
            "due_status": "on_time",
            "client_code": "CLIENT_001",
            "instance_code": "ODOO_MAIN"
        }))
        .expect("invoice");
        assert_eq!(inv.due_status, DueStatus::OnTime);

        let overdue: PendingInvoice = serde_json::from_value(serde_json::json!({
            "customer_name": "Cliente Sur SL",
            "invoice_number": "F2026-0044",
            "amount_pending": "820.55",
            "due_date": "2026-07-02",
            "days_to_due": -33,
            "due_status": "overdue",
            "client_code": "CLIENT_001",
            "instance_code": "ODOO_MAIN"
        }))
        .expect("invoice");
        assert_eq!(overdue.due_status, DueStatus::Overdue);
        assert_eq!(overdue.amount_pending.amount(), 820.55);
    }

    #[test]
    fn tax_filing_parses_screaming_enums_and_null_dates() {
        let filing: TaxFiling = serde_json::from_value(serde_json::json!({
            "id": "f-1",
            "client_code": "CLIENT_002",
            "tax_model_code": "303",
            "period_start": "2026-04-01",
            "period_end": "2026-06-30",
            "status": "SETTLED",
            "result": "PAYABLE",
            "amount": "3240.10",
            "currency": "EUR",
            "presented_at": null,
            "settled_at": "2026-07-21T09:15:00Z",
            "reference": null,
            "notes": null
        }))
        .expect("filing");

        assert_eq!(filing.status, FilingStatus::Settled);
        assert_eq!(filing.result, FilingResult::Payable);
        assert_eq!(filing.presented_at, None);
        assert_eq!(filing.settled_at, Some(date("2026-07-21")));
        assert_eq!(filing.amount.amount(), 3240.10);
    }

    #[test]
    fn filing_labels_are_spanish() {
        assert_eq!(FilingStatus::Draft.label(), "Borrador");
        assert_eq!(FilingResult::Refundable.label(), "A devolver");
    }

    #[test]
    fn tax_event_urgency_window() {
        let event: TaxEvent = serde_json::from_value(serde_json::json!({
            "id": "e-1",
            "title": "IVA 2T",
            "due_date": "2026-08-10",
            "type": "declaracion",
            "status": "pendiente",
            "model": "303"
        }))
        .expect("event");

        assert_eq!(event.days_until(date("2026-08-04")), 6);
        assert!(event.is_urgent(date("2026-08-04")));
        assert!(!event.is_urgent(date("2026-07-01")));

        // Past-due but still pending stays urgent
        assert!(event.is_urgent(date("2026-08-15")));

        let completed = TaxEvent {
            status: EventStatus::Completed,
            ..event
        };
        assert!(!completed.is_urgent(date("2026-08-04")));
    }
}

//! Card data: fetch tasks and the pure row-to-card mapping.
//!
//! Each card loads independently: a tokio task performs the backend call,
//! maps the rows through one of the pure functions below, and delivers a
//! [`DashboardEvent`] over the app channel. Events are tagged with the client
//! they were fetched for so that switching clients mid-flight just drops the
//! stale answers.

use chrono::NaiveDate;
use tokio::sync::mpsc;

use finaptico_supabase::{Session, Supabase};
use finaptico_types::{
    ClientCode, EventKind, EventStatus, FilingStatus, FiscalSnapshot, InstanceCode, PendingInvoice,
    RevenueMonth, SeriesPoint, TaxEvent, TaxFiling, TreasuryRow, TreasuryView,
};

use std::sync::Arc;

/// Rows shown before the invoices and payments tables fold into an "N of M" note.
pub const MAX_VISIBLE_ROWS: usize = 4;

/// Spanish filing window: presentation closes this many days after period end.
const FILING_GRACE_DAYS: i64 = 20;

/// Results of the per-card fetch tasks, drained by `App::process_events`.
#[derive(Debug)]
pub enum DashboardEvent {
    Directory(Result<Vec<finaptico_types::ClientAccount>, String>),
    Treasury(ClientCode, Result<TreasuryOverview, String>),
    Projection(ClientCode, Result<BalanceSeries, String>),
    History(ClientCode, Result<BalanceSeries, String>),
    Revenue(ClientCode, Result<RevenueHistory, String>),
    Ytd(ClientCode, Result<Option<YtdSummary>, String>),
    Invoices(ClientCode, Result<InvoiceBook, String>),
    Payments(ClientCode, Result<Vec<TaxFiling>, String>),
    Agenda(ClientCode, Result<FiscalAgenda, String>),
    SessionRefreshed(Result<Session, String>),
    FilingSaved(Result<(), String>),
}

// ---------------------------------------------------------------------------
// Card models
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct InstanceBalance {
    pub instance: InstanceCode,
    pub balance: f64,
    pub currency: String,
}

/// The treasury card: latest snapshot totals per ERP instance.
#[derive(Debug, Clone, PartialEq)]
pub struct TreasuryOverview {
    pub total: f64,
    pub currency: String,
    pub snapshot_date: Option<NaiveDate>,
    pub instances: Vec<InstanceBalance>,
}

/// A balance-over-time card (projection feed or view-selected history).
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceSeries {
    pub points: Vec<(NaiveDate, f64)>,
    pub currency: String,
}

impl BalanceSeries {
    #[must_use]
    pub fn last(&self) -> Option<&(NaiveDate, f64)> {
        self.points.last()
    }
}

/// Twelve months of invoiced revenue plus the period total.
#[derive(Debug, Clone, PartialEq)]
pub struct RevenueHistory {
    pub months: Vec<(NaiveDate, f64)>,
    pub total: f64,
}

/// Year-to-date invoiced revenue from the fiscal snapshot view.
#[derive(Debug, Clone, PartialEq)]
pub struct YtdSummary {
    pub revenue: f64,
    pub currency: String,
}

/// Pending invoices plus the derived table summary.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceBook {
    pub invoices: Vec<PendingInvoice>,
}

impl InvoiceBook {
    #[must_use]
    pub fn visible(&self) -> &[PendingInvoice] {
        &self.invoices[..self.invoices.len().min(MAX_VISIBLE_ROWS)]
    }

    #[must_use]
    pub fn hidden_count(&self) -> usize {
        self.invoices.len().saturating_sub(MAX_VISIBLE_ROWS)
    }

    #[must_use]
    pub fn has_overdue(&self) -> bool {
        self.invoices
            .iter()
            .any(|inv| inv.due_status == finaptico_types::DueStatus::Overdue)
    }
}

/// The fiscal page state: raw filings plus the calendar derived from them.
#[derive(Debug, Clone, PartialEq)]
pub struct FiscalAgenda {
    pub filings: Vec<TaxFiling>,
    pub events: Vec<TaxEvent>,
}

// ---------------------------------------------------------------------------
// Pure mapping
// ---------------------------------------------------------------------------

const DEFAULT_CURRENCY: &str = "EUR";

/// Fold the feed rows for one client into the treasury card.
///
/// The feed may include other clients' rows for advisors; the lenient figure
/// parse means one bad row dents the total instead of blanking the card.
#[must_use]
pub fn treasury_overview(rows: &[TreasuryRow], code: &ClientCode) -> TreasuryOverview {
    let mine: Vec<&TreasuryRow> = rows.iter().filter(|row| &row.client_code == code).collect();

    let currency = mine
        .iter()
        .find_map(|row| row.currency.clone())
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

    let instances: Vec<InstanceBalance> = mine
        .iter()
        .map(|row| InstanceBalance {
            instance: row.instance_code.clone(),
            balance: row.total_balance.amount(),
            currency: row.currency.clone().unwrap_or_else(|| currency.clone()),
        })
        .collect();

    TreasuryOverview {
        total: instances.iter().map(|i| i.balance).sum(),
        currency,
        snapshot_date: mine.iter().map(|row| row.snapshot_date).max(),
        instances,
    }
}

/// Filter, coerce and sort a raw series for one client.
///
/// `limit` truncates from the oldest end so the newest points survive.
#[must_use]
pub fn balance_series(points: Vec<SeriesPoint>, code: &ClientCode, limit: usize) -> BalanceSeries {
    let mut selected: Vec<(NaiveDate, f64, Option<String>)> = points
        .into_iter()
        .filter(|p| &p.client_code == code)
        .map(|p| {
            let value = p.figure().amount();
            (p.snapshot_date, value, p.currency)
        })
        .collect();
    selected.sort_by_key(|(date, ..)| *date);

    let currency = selected
        .iter()
        .find_map(|(_, _, c)| c.clone())
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

    let skip = selected.len().saturating_sub(limit);
    BalanceSeries {
        points: selected
            .into_iter()
            .skip(skip)
            .map(|(date, value, _)| (date, value))
            .collect(),
        currency,
    }
}

/// Strict mapping of the revenue widget: one bad figure fails the card, with
/// the offending raw value in the message.
pub fn revenue_history(rows: Vec<RevenueMonth>) -> Result<RevenueHistory, String> {
    let mut months = Vec::with_capacity(rows.len());
    for row in rows {
        let value = row
            .total_revenue
            .try_amount()
            .map_err(|e| format!("error de parseo: {e}"))?;
        months.push((row.month, value));
    }
    months.sort_by_key(|(month, _)| *month);

    let total = months.iter().map(|(_, value)| value).sum();
    Ok(RevenueHistory { months, total })
}

#[must_use]
pub fn ytd_summary(snapshot: FiscalSnapshot) -> YtdSummary {
    YtdSummary {
        revenue: snapshot.is_revenue_ytd.amount(),
        currency: snapshot
            .currency
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
    }
}

/// Derive the fiscal calendar from the filings the backend exposes.
///
/// The presentation window closes [`FILING_GRACE_DAYS`] after period end;
/// settled filings show as completed, unsettled past-due ones as overdue.
#[must_use]
pub fn fiscal_agenda(filings: Vec<TaxFiling>, today: NaiveDate) -> FiscalAgenda {
    let mut events: Vec<TaxEvent> = filings
        .iter()
        .map(|filing| {
            let due_date = filing.period_end + chrono::TimeDelta::days(FILING_GRACE_DAYS);
            let status = match filing.status {
                FilingStatus::Settled => EventStatus::Completed,
                _ if due_date < today => EventStatus::Overdue,
                _ => EventStatus::Pending,
            };
            let kind = match filing.status {
                FilingStatus::Draft => EventKind::Declaration,
                _ => EventKind::Payment,
            };
            TaxEvent {
                id: filing.id.clone(),
                title: format!("Modelo {}", filing.tax_model_code),
                description: filing.notes.clone(),
                due_date,
                kind,
                status,
                model: Some(filing.tax_model_code.clone()),
            }
        })
        .collect();
    events.sort_by_key(|event| event.due_date);

    FiscalAgenda { filings, events }
}

// ---------------------------------------------------------------------------
// Fetch tasks
// ---------------------------------------------------------------------------

pub(crate) fn spawn_directory_load(
    api: Arc<Supabase>,
    session: Session,
    tx: mpsc::Sender<DashboardEvent>,
) {
    tokio::spawn(async move {
        let result = api
            .invoke_widget(&session, finaptico_types::Widget::MyClients, None)
            .await
            .map_err(|e| e.to_string());
        let _ = tx.send(DashboardEvent::Directory(result)).await;
    });
}

/// Kick off every per-client card load.
pub(crate) fn spawn_card_loads(
    api: &Arc<Supabase>,
    session: &Session,
    code: &ClientCode,
    span_days: u32,
    tx: &mpsc::Sender<DashboardEvent>,
) {
    let today = chrono::Utc::now().date_naive();

    {
        let (api, session, code, tx) = (api.clone(), session.clone(), code.clone(), tx.clone());
        tokio::spawn(async move {
            let result = api
                .treasury_feed(&session, Some(&code))
                .await
                .map(|rows| treasury_overview(&rows, &code))
                .map_err(|e| e.to_string());
            let _ = tx.send(DashboardEvent::Treasury(code, result)).await;
        });
    }

    {
        let (api, session, code, tx) = (api.clone(), session.clone(), code.clone(), tx.clone());
        tokio::spawn(async move {
            let result = api
                .treasury_timeseries(&session, Some(&code))
                .await
                .map(|points| balance_series(points, &code, finaptico_types::MAX_SERIES_POINTS))
                .map_err(|e| e.to_string());
            let _ = tx.send(DashboardEvent::Projection(code, result)).await;
        });
    }

    spawn_history_load(api, session, code, span_days, tx);

    {
        let (api, session, code, tx) = (api.clone(), session.clone(), code.clone(), tx.clone());
        tokio::spawn(async move {
            let result = api
                .invoke_widget::<RevenueMonth>(
                    &session,
                    finaptico_types::Widget::Revenue12m,
                    Some(&code),
                )
                .await
                .map_err(|e| e.to_string())
                .and_then(revenue_history);
            let _ = tx.send(DashboardEvent::Revenue(code, result)).await;
        });
    }

    {
        let (api, session, code, tx) = (api.clone(), session.clone(), code.clone(), tx.clone());
        tokio::spawn(async move {
            let result = api
                .query("v_fiscal_current_snapshot")
                .schema("erp_core")
                .select("client_code, is_revenue_ytd, currency")
                .eq("client_code", code.as_str())
                .maybe_single::<FiscalSnapshot>(&session)
                .await
                .map(|snapshot| snapshot.map(ytd_summary))
                .map_err(|e| e.to_string());
            let _ = tx.send(DashboardEvent::Ytd(code, result)).await;
        });
    }

    {
        let (api, session, code, tx) = (api.clone(), session.clone(), code.clone(), tx.clone());
        tokio::spawn(async move {
            let result = api
                .query("v_dashboard_sales_invoices_pending")
                .schema("erp_core")
                .eq("client_code", code.as_str())
                .order("due_date", true)
                .fetch::<PendingInvoice>(&session)
                .await
                .map(|invoices| InvoiceBook { invoices })
                .map_err(|e| e.to_string());
            let _ = tx.send(DashboardEvent::Invoices(code, result)).await;
        });
    }

    {
        let (api, session, code, tx) = (api.clone(), session.clone(), code.clone(), tx.clone());
        tokio::spawn(async move {
            let result = api
                .settled_tax_payments(&session, &code)
                .await
                .map_err(|e| e.to_string());
            let _ = tx.send(DashboardEvent::Payments(code, result)).await;
        });
    }

    {
        let (api, session, code, tx) = (api.clone(), session.clone(), code.clone(), tx.clone());
        tokio::spawn(async move {
            let result = api
                .query("tax_filings")
                .eq("client_code", code.as_str())
                .order("period_start", false)
                .fetch::<TaxFiling>(&session)
                .await
                .map(|filings| fiscal_agenda(filings, today))
                .map_err(|e| e.to_string());
            let _ = tx.send(DashboardEvent::Agenda(code, result)).await;
        });
    }
}

/// Load the balance history through the view selected for `span_days`.
pub(crate) fn spawn_history_load(
    api: &Arc<Supabase>,
    session: &Session,
    code: &ClientCode,
    span_days: u32,
    tx: &mpsc::Sender<DashboardEvent>,
) {
    let view = TreasuryView::for_span(span_days);
    let (api, session, code, tx) = (api.clone(), session.clone(), code.clone(), tx.clone());
    tokio::spawn(async move {
        let result = api
            .invoke_widget::<SeriesPoint>(&session, view.widget(), Some(&code))
            .await
            .map(|points| balance_series(points, &code, view.row_limit()))
            .map_err(|e| e.to_string());
        let _ = tx.send(DashboardEvent::History(code, result)).await;
    });
}

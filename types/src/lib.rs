//! Core domain types for Finaptico.
//!
//! # Architecture
//!
//! Everything the dashboard shows is computed server-side by SQL views and
//! Edge Functions; this crate models what comes back over the wire and the
//! small amount of client-side selection logic that sits in front of it:
//!
//! - [`Widget`] - the named query bundles served by the `dashboard` Edge Function
//! - [`TreasuryView`] - day-range to pre-aggregated-view selection with a
//!   result-size cap
//! - [`Role`] - admin/client visibility gating derived from the accessible
//!   account count
//! - [`Figure`] - defensive coercion of Postgres numerics that arrive as
//!   either JSON numbers or strings
//! - record rows ([`TreasuryRow`], [`PendingInvoice`], [`TaxFiling`], ...)
//!
//! The crate is IO-free and async-free; transport lives in
//! `finaptico-supabase` and state in `finaptico-engine`.

mod account;
mod figure;
pub mod format;
mod ids;
mod records;
mod view;

pub use account::{ClientAccount, Role};
pub use figure::{Figure, FigureError};
pub use ids::{ClientCode, InstanceCode};
pub use records::{
    DueStatus, EventKind, EventStatus, FilingResult, FilingStatus, FiscalSnapshot, PendingInvoice,
    RevenueMonth, SeriesPoint, TaxEvent, TaxFiling, TaxFilingDraft, TreasuryRow,
};
pub use view::{MAX_SERIES_POINTS, TreasuryView};

use std::fmt;

/// A named backend query bundle invoked through the `dashboard` Edge Function.
///
/// Each variant maps to the widget identifier registered server-side; the
/// function returns the rows for one dashboard card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Widget {
    TreasurySnapshot,
    TreasuryClientTotals,
    TreasuryWeeklyClientTotals,
    TreasuryBiweeklyClientTotals,
    TreasuryMonthlyClientTotals,
    Revenue12m,
    ClientOverview,
    FiscalSnapshot,
    FiscalIrpfSplit,
    SalesInvoicesPending,
    TaxPaymentsSettled,
    MyClients,
}

impl Widget {
    /// The identifier the Edge Function dispatches on.
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::TreasurySnapshot => "treasury_snapshot",
            Self::TreasuryClientTotals => "treasury_client_totals",
            Self::TreasuryWeeklyClientTotals => "treasury_weekly_client_totals",
            Self::TreasuryBiweeklyClientTotals => "treasury_biweekly_client_totals",
            Self::TreasuryMonthlyClientTotals => "treasury_monthly_client_totals",
            Self::Revenue12m => "revenue_12m",
            Self::ClientOverview => "client_overview",
            Self::FiscalSnapshot => "fiscal_snapshot",
            Self::FiscalIrpfSplit => "fiscal_irpf_split",
            Self::SalesInvoicesPending => "sales_invoices_pending",
            Self::TaxPaymentsSettled => "tax_payments_settled",
            Self::MyClients => "my_clients",
        }
    }
}

impl fmt::Display for Widget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

#[cfg(test)]
mod tests {
    use super::Widget;

    #[test]
    fn widget_wire_names_match_backend_registry() {
        assert_eq!(Widget::TreasuryClientTotals.wire_name(), "treasury_client_totals");
        assert_eq!(Widget::Revenue12m.wire_name(), "revenue_12m");
        assert_eq!(Widget::MyClients.wire_name(), "my_clients");
        assert_eq!(Widget::TaxPaymentsSettled.to_string(), "tax_payments_settled");
    }
}

//! Application state and data orchestration for Finaptico.
//!
//! This crate contains the `App` state machine without TUI dependencies: the
//! auth session lifecycle, the client directory with role gating, and one
//! independently-loading state per dashboard card. Rendering lives in
//! `finaptico-tui`; the binary drives both from a fixed-cadence frame loop:
//!
//! ```text
//! frame tick -> handle input -> app.tick() -> app.process_events() -> draw
//! ```

mod app;
mod cards;
mod dashboard;
mod session;

pub use app::{App, Cards, Page, SelectorState};
pub use cards::CardState;
pub use dashboard::{
    BalanceSeries, DashboardEvent, FiscalAgenda, InstanceBalance, InvoiceBook, MAX_VISIBLE_ROWS,
    RevenueHistory, TreasuryOverview, YtdSummary,
};
pub use session::SessionStore;

// Re-export the crates the binary wires together.
pub use finaptico_config::{FinapticoConfig, ResolvedConfig};
pub use finaptico_supabase as supabase;
pub use finaptico_types as types;

//! The application state machine.
//!
//! `App` owns the session, the client directory, and one [`CardState`] per
//! dashboard card. Fetch tasks run on tokio and report through an mpsc
//! channel; the frame loop calls [`App::tick`] and [`App::process_events`]
//! every frame and renders whatever state is current.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use tokio::sync::mpsc;

use finaptico_config::ResolvedConfig;
use finaptico_supabase::{Session, Supabase, SupabaseConfig};
use finaptico_types::{ClientAccount, ClientCode, FilingStatus, Role, TaxFilingDraft, TreasuryView};

use crate::cards::CardState;
use crate::dashboard::{
    BalanceSeries, DashboardEvent, FiscalAgenda, InvoiceBook, RevenueHistory, TreasuryOverview,
    YtdSummary, spawn_card_loads, spawn_directory_load, spawn_history_load,
};
use crate::session::SessionStore;

/// Refresh the token this many seconds before it actually expires.
const SESSION_REFRESH_LEEWAY_SECS: i64 = 120;

/// Wait this long before retrying a failed token refresh.
const SESSION_REFRESH_BACKOFF: Duration = Duration::from_secs(30);

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Day spans the balance history cycles through; each exercises a different
/// pre-aggregated view (daily, weekly, biweekly, monthly).
const HISTORY_SPANS: &[u32] = &[90, 365, 1095, 1825];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Page {
    #[default]
    Resumen,
    Tesoreria,
    Fiscal,
}

impl Page {
    #[must_use]
    pub const fn all() -> &'static [Page] {
        &[Page::Resumen, Page::Tesoreria, Page::Fiscal]
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Resumen => "Resumen",
            Self::Tesoreria => "Tesorería",
            Self::Fiscal => "Fiscal",
        }
    }

    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::Resumen => Self::Tesoreria,
            Self::Tesoreria => Self::Fiscal,
            Self::Fiscal => Self::Resumen,
        }
    }

    #[must_use]
    pub fn prev(self) -> Self {
        match self {
            Self::Resumen => Self::Fiscal,
            Self::Tesoreria => Self::Resumen,
            Self::Fiscal => Self::Tesoreria,
        }
    }
}

/// One card state per dashboard card.
#[derive(Debug, Default)]
pub struct Cards {
    pub treasury: CardState<TreasuryOverview>,
    pub projection: CardState<BalanceSeries>,
    pub history: CardState<BalanceSeries>,
    pub revenue: CardState<RevenueHistory>,
    pub ytd: CardState<Option<YtdSummary>>,
    pub invoices: CardState<InvoiceBook>,
    pub payments: CardState<Vec<finaptico_types::TaxFiling>>,
    pub agenda: CardState<FiscalAgenda>,
}

impl Cards {
    fn reset_to_loading(&mut self) {
        *self = Self {
            treasury: CardState::Loading,
            projection: CardState::Loading,
            history: CardState::Loading,
            revenue: CardState::Loading,
            ytd: CardState::Loading,
            invoices: CardState::Loading,
            payments: CardState::Loading,
            agenda: CardState::Loading,
        };
    }
}

/// Client-selector modal state; existence means the modal is open.
#[derive(Debug, Default)]
pub struct SelectorState {
    pub filter: String,
    pub highlighted: usize,
}

pub struct App {
    api: Arc<Supabase>,
    settings: ResolvedConfig,
    session: Option<Session>,
    session_store: SessionStore,
    refreshing_session: bool,
    refresh_backoff_until: Option<Instant>,
    saving_filing: bool,

    directory: CardState<Vec<ClientAccount>>,
    role: Option<Role>,
    selected_code: Option<ClientCode>,

    pub cards: Cards,
    page: Page,
    selector: Option<SelectorState>,
    fiscal_cursor: usize,
    span_index: usize,

    status_message: Option<String>,
    should_quit: bool,
    tick: usize,
    last_refresh: Option<Instant>,

    tx: mpsc::Sender<DashboardEvent>,
    rx: mpsc::Receiver<DashboardEvent>,
}

impl App {
    pub fn new(settings: ResolvedConfig) -> anyhow::Result<Self> {
        let config = SupabaseConfig::new(&settings.supabase_url, settings.anon_key.clone())
            .context("invalid backend configuration")?;
        let api = Arc::new(Supabase::new(config)?);
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            api,
            settings,
            session: None,
            session_store: SessionStore::new(),
            refreshing_session: false,
            refresh_backoff_until: None,
            saving_filing: false,
            directory: CardState::Idle,
            role: None,
            selected_code: None,
            cards: Cards::default(),
            page: Page::default(),
            selector: None,
            fiscal_cursor: 0,
            span_index: 0,
            status_message: None,
            should_quit: false,
            tick: 0,
            last_refresh: None,
            tx,
            rx,
        })
    }

    /// Replace the session cache location (tests and non-default homes).
    #[must_use]
    pub fn with_session_store(mut self, store: SessionStore) -> Self {
        self.session_store = store;
        self
    }

    /// Resume or establish a session, then start loading the client directory.
    ///
    /// Called once before the frame loop; credential problems should reach
    /// the user as plain terminal output, not a broken TUI.
    pub async fn bootstrap(&mut self) -> anyhow::Result<()> {
        if let Some(cached) = self.session_store.load() {
            if !cached.is_expired(SESSION_REFRESH_LEEWAY_SECS) {
                tracing::info!("Resuming cached session");
                self.session = Some(cached);
            } else {
                match self.api.refresh_session(&cached).await {
                    Ok(session) => {
                        self.session_store.save(&session);
                        self.session = Some(session);
                    }
                    Err(e) => {
                        tracing::warn!("Cached session could not be refreshed: {e}");
                        self.session_store.clear();
                    }
                }
            }
        }

        if self.session.is_none() {
            let email = self.settings.email.clone().context(
                "no cached session and no email configured: set [auth].email or FINAPTICO_EMAIL",
            )?;
            let password = self
                .settings
                .password
                .clone()
                .context("no cached session: set FINAPTICO_PASSWORD to sign in")?;

            let session = self
                .api
                .sign_in_with_password(&email, &password)
                .await
                .context("sign-in failed")?;
            self.session_store.save(&session);
            self.session = Some(session);
        }

        self.directory = CardState::Loading;
        if let Some(session) = self.session.clone() {
            spawn_directory_load(self.api.clone(), session, self.tx.clone());
        }
        Ok(())
    }

    // -- frame loop -------------------------------------------------------

    pub fn tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
        self.maybe_refresh_session();
        self.maybe_refresh_cards();
    }

    /// Drain every pending fetch result into card state.
    pub fn process_events(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            self.apply_event(event);
        }
    }

    fn apply_event(&mut self, event: DashboardEvent) {
        match event {
            DashboardEvent::Directory(result) => self.apply_directory(result),
            DashboardEvent::Treasury(code, result) => {
                if self.is_current(&code) {
                    self.cards.treasury.apply(result);
                }
            }
            DashboardEvent::Projection(code, result) => {
                if self.is_current(&code) {
                    self.cards.projection.apply(result);
                }
            }
            DashboardEvent::History(code, result) => {
                if self.is_current(&code) {
                    self.cards.history.apply(result);
                }
            }
            DashboardEvent::Revenue(code, result) => {
                if self.is_current(&code) {
                    self.cards.revenue.apply(result);
                }
            }
            DashboardEvent::Ytd(code, result) => {
                if self.is_current(&code) {
                    self.cards.ytd.apply(result);
                }
            }
            DashboardEvent::Invoices(code, result) => {
                if self.is_current(&code) {
                    self.cards.invoices.apply(result);
                }
            }
            DashboardEvent::Payments(code, result) => {
                if self.is_current(&code) {
                    self.cards.payments.apply(result);
                }
            }
            DashboardEvent::Agenda(code, result) => {
                if self.is_current(&code) {
                    self.cards.agenda.apply(result);
                    self.clamp_fiscal_cursor();
                }
            }
            DashboardEvent::SessionRefreshed(result) => {
                self.refreshing_session = false;
                match result {
                    Ok(session) => {
                        self.refresh_backoff_until = None;
                        self.session_store.save(&session);
                        self.session = Some(session);
                    }
                    Err(e) => {
                        self.refresh_backoff_until = Some(Instant::now() + SESSION_REFRESH_BACKOFF);
                        self.set_status(format!("No se pudo renovar la sesión: {e}"));
                    }
                }
            }
            DashboardEvent::FilingSaved(result) => {
                self.saving_filing = false;
                match result {
                    Ok(()) => {
                        self.set_status("Presentación fiscal guardada");
                        self.reload_cards();
                    }
                    Err(e) => self.set_status(format!("No se pudo guardar: {e}")),
                }
            }
        }
    }

    fn apply_directory(&mut self, result: Result<Vec<ClientAccount>, String>) {
        match result {
            Ok(mut accounts) => {
                accounts.sort_by(|a, b| a.effective_code().cmp(b.effective_code()));
                self.role = Some(Role::from_account_count(accounts.len()));

                let selected = self
                    .settings
                    .default_client
                    .clone()
                    .filter(|code| {
                        accounts.iter().any(|a| a.effective_code() == code.as_str())
                    })
                    .or_else(|| accounts.first().map(|a| ClientCode::new(a.effective_code())));

                self.directory = CardState::ready(accounts);
                if let Some(code) = selected {
                    self.set_selected(code);
                }
            }
            Err(e) => {
                self.directory = CardState::Failed(e);
            }
        }
    }

    fn is_current(&self, code: &ClientCode) -> bool {
        self.selected_code.as_ref() == Some(code)
    }

    fn maybe_refresh_session(&mut self) {
        if self.refreshing_session {
            return;
        }
        if let Some(until) = self.refresh_backoff_until
            && Instant::now() < until
        {
            return;
        }
        let Some(session) = self.session.as_ref() else {
            return;
        };
        if !session.is_expired(SESSION_REFRESH_LEEWAY_SECS) {
            return;
        }

        self.refreshing_session = true;
        let (api, session, tx) = (self.api.clone(), session.clone(), self.tx.clone());
        tokio::spawn(async move {
            let result = api.refresh_session(&session).await.map_err(|e| e.to_string());
            let _ = tx.send(DashboardEvent::SessionRefreshed(result)).await;
        });
    }

    fn maybe_refresh_cards(&mut self) {
        let Some(last) = self.last_refresh else {
            return;
        };
        if last.elapsed() >= Duration::from_secs(self.settings.refresh_secs) {
            self.reload_cards();
        }
    }

    /// Re-fetch every card for the selected client.
    pub fn reload_cards(&mut self) {
        let (Some(session), Some(code)) = (self.session.clone(), self.selected_code.clone())
        else {
            return;
        };
        self.cards.reset_to_loading();
        self.last_refresh = Some(Instant::now());
        spawn_card_loads(&self.api, &session, &code, self.history_span_days(), &self.tx);
    }

    fn set_selected(&mut self, code: ClientCode) {
        if self.is_current(&code) {
            return;
        }
        self.selected_code = Some(code);
        self.fiscal_cursor = 0;
        self.reload_cards();
    }

    // -- accessors --------------------------------------------------------

    #[must_use]
    pub fn accounts(&self) -> &[ClientAccount] {
        self.directory.data().map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn directory_state(&self) -> &CardState<Vec<ClientAccount>> {
        &self.directory
    }

    #[must_use]
    pub fn selected_code(&self) -> Option<&ClientCode> {
        self.selected_code.as_ref()
    }

    #[must_use]
    pub fn selected_account(&self) -> Option<&ClientAccount> {
        let code = self.selected_code.as_ref()?;
        self.accounts()
            .iter()
            .find(|a| a.effective_code() == code.as_str())
    }

    /// Whether the signed-in user may switch between clients (advisor role).
    #[must_use]
    pub fn can_switch_client(&self) -> bool {
        self.role.is_some_and(Role::can_switch_client)
    }

    #[must_use]
    pub fn session_email(&self) -> Option<&str> {
        self.session.as_ref().and_then(Session::email)
    }

    #[must_use]
    pub fn page(&self) -> Page {
        self.page
    }

    pub fn next_page(&mut self) {
        self.page = self.page.next();
    }

    pub fn prev_page(&mut self) {
        self.page = self.page.prev();
    }

    #[must_use]
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn request_quit(&mut self) {
        self.should_quit = true;
    }

    #[must_use]
    pub fn tick_count(&self) -> usize {
        self.tick
    }

    #[must_use]
    pub fn high_contrast(&self) -> bool {
        self.settings.high_contrast
    }

    #[must_use]
    pub fn ascii_only(&self) -> bool {
        self.settings.ascii_only
    }

    /// Persist the session on shutdown (refresh may have rotated tokens).
    pub fn save_session(&self) {
        if let Some(session) = self.session.as_ref() {
            self.session_store.save(session);
        }
    }

    // -- balance history span --------------------------------------------

    #[must_use]
    pub fn history_span_days(&self) -> u32 {
        HISTORY_SPANS[self.span_index % HISTORY_SPANS.len()]
    }

    #[must_use]
    pub fn history_view(&self) -> TreasuryView {
        TreasuryView::for_span(self.history_span_days())
    }

    /// Cycle the history span; only the history card re-fetches.
    pub fn cycle_history_span(&mut self) {
        self.span_index = (self.span_index + 1) % HISTORY_SPANS.len();
        let (Some(session), Some(code)) = (self.session.clone(), self.selected_code.clone())
        else {
            return;
        };
        self.cards.history = CardState::Loading;
        spawn_history_load(
            &self.api,
            &session,
            &code,
            self.history_span_days(),
            &self.tx,
        );
    }

    // -- fiscal page ------------------------------------------------------

    #[must_use]
    pub fn fiscal_cursor(&self) -> usize {
        self.fiscal_cursor
    }

    pub fn move_fiscal_cursor(&mut self, delta: i64) {
        let len = self
            .cards
            .agenda
            .data()
            .map_or(0, |agenda| agenda.filings.len());
        if len == 0 {
            self.fiscal_cursor = 0;
            return;
        }
        let current = self.fiscal_cursor as i64;
        self.fiscal_cursor = (current + delta).clamp(0, len as i64 - 1) as usize;
    }

    fn clamp_fiscal_cursor(&mut self) {
        let len = self
            .cards
            .agenda
            .data()
            .map_or(0, |agenda| agenda.filings.len());
        self.fiscal_cursor = self.fiscal_cursor.min(len.saturating_sub(1));
    }

    /// Mark the filing under the cursor as presented (advisor-only write).
    pub fn mark_selected_filing_presented(&mut self) {
        if !self.can_switch_client() {
            self.set_status("Solo disponible para asesores");
            return;
        }
        if self.saving_filing {
            return;
        }

        let Some(filing) = self
            .cards
            .agenda
            .data()
            .and_then(|agenda| agenda.filings.get(self.fiscal_cursor))
        else {
            return;
        };
        if filing.status != FilingStatus::Draft {
            self.set_status("La presentación ya está registrada");
            return;
        }
        let Some(code) = filing
            .client_code
            .clone()
            .or_else(|| self.selected_code.clone())
        else {
            return;
        };

        let draft = TaxFilingDraft {
            id: Some(filing.id.clone()),
            client_code: code,
            tax_model_code: filing.tax_model_code.clone(),
            period_start: filing.period_start,
            period_end: filing.period_end,
            status: FilingStatus::Presented,
            result: filing.result,
            amount: filing.amount.amount(),
            currency: filing
                .currency
                .clone()
                .unwrap_or_else(|| "EUR".to_string()),
            presented_at: Some(chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string()),
            settled_at: None,
            reference: filing.reference.clone(),
            notes: filing.notes.clone(),
        };

        let Some(session) = self.session.clone() else {
            return;
        };
        self.saving_filing = true;
        let (api, tx) = (self.api.clone(), self.tx.clone());
        tokio::spawn(async move {
            let result = api
                .upsert_tax_filing(&session, &draft)
                .await
                .map_err(|e| e.to_string());
            let _ = tx.send(DashboardEvent::FilingSaved(result)).await;
        });
        self.set_status("Guardando presentación…");
    }

    // -- client selector --------------------------------------------------

    #[must_use]
    pub fn selector(&self) -> Option<&SelectorState> {
        self.selector.as_ref()
    }

    pub fn open_client_selector(&mut self) {
        if !self.can_switch_client() {
            self.set_status("Solo los asesores pueden cambiar de cliente");
            return;
        }
        self.selector = Some(SelectorState::default());
    }

    pub fn close_selector(&mut self) {
        self.selector = None;
    }

    /// Indices into `accounts()` matching the selector filter.
    #[must_use]
    pub fn selector_matches(&self) -> Vec<usize> {
        let Some(selector) = self.selector.as_ref() else {
            return Vec::new();
        };
        let needle = selector.filter.to_lowercase();
        self.accounts()
            .iter()
            .enumerate()
            .filter(|(_, account)| {
                needle.is_empty()
                    || account.label().to_lowercase().contains(&needle)
                    || account.effective_code().to_lowercase().contains(&needle)
            })
            .map(|(i, _)| i)
            .collect()
    }

    pub fn selector_input(&mut self, c: char) {
        if let Some(selector) = self.selector.as_mut() {
            selector.filter.push(c);
            selector.highlighted = 0;
        }
    }

    pub fn selector_backspace(&mut self) {
        if let Some(selector) = self.selector.as_mut() {
            selector.filter.pop();
            selector.highlighted = 0;
        }
    }

    pub fn selector_move(&mut self, delta: i64) {
        let count = self.selector_matches().len();
        if count == 0 {
            return;
        }
        if let Some(selector) = self.selector.as_mut() {
            let current = selector.highlighted as i64;
            selector.highlighted = (current + delta).rem_euclid(count as i64) as usize;
        }
    }

    /// Switch to the highlighted client and close the modal.
    pub fn selector_confirm(&mut self) {
        let matches = self.selector_matches();
        let Some(selector) = self.selector.as_ref() else {
            return;
        };
        let Some(&index) = matches.get(selector.highlighted) else {
            return;
        };
        let code = self
            .accounts()
            .get(index)
            .map(|a| ClientCode::new(a.effective_code()));

        self.selector = None;
        if let Some(code) = code {
            self.set_selected(code);
        }
    }
}

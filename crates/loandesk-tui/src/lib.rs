// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{self, disable_raw_mode, enable_raw_mode};
use loandesk_app::{
    AppCommand, AppMode, AppState, ApplicationStatus, Collection, CustomerId, CustomerProfile,
    DashboardStats, DeleteFlow, DeleteTarget, FieldValue, FilterAuthority, FormKind, LoanApplication,
    LoanApplicationId, LoanCategory, LoanType, LoanTypeDraft, LoanTypeField, LoanTypeFormInput,
    LoanTypeId, ListView, LoginInput, PAGE_NUMBER_WINDOW, PageWindow, REFRESH_AFTER_DELETE, Record,
    SortDirection, StatusCounts, StatusUpdate, TabKind, application_search_fields,
    apply_status_update, customer_search_fields, loan_type_search_fields, status_counts,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs, Wrap};
use std::collections::BTreeSet;
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use time::OffsetDateTime;

const STATUS_CLEAR_AFTER: Duration = Duration::from_secs(4);
const LOAN_TYPE_FILTER_PATH: &str = "loan_type.subcategory";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashboardData {
    pub stats: DashboardStats,
    pub recent: Vec<LoanApplication>,
    /// Portfolio-wide counters; `None` when the analytics endpoint failed.
    pub analytics: Option<DashboardStats>,
}

/// Filters forwarded to the server. Left empty while the list filters
/// locally, so the whole collection comes back.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TabQuery {
    pub search: String,
    pub status: Option<ApplicationStatus>,
    /// Loan subcategory the applications must belong to.
    pub loan_type: String,
    pub category: Option<LoanCategory>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TabData {
    Applications(Vec<LoanApplication>),
    LoanTypes(Vec<LoanType>),
    Customers(Vec<CustomerProfile>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub message: String,
    pub login_required: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewOptions {
    pub page_size: usize,
    pub filter_authority: FilterAuthority,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            page_size: loandesk_app::DEFAULT_PAGE_SIZE,
            filter_authority: FilterAuthority::Local,
        }
    }
}

pub trait AppRuntime {
    fn has_session(&self) -> bool;
    /// Whether `error` means the session is gone and the user must log in.
    fn needs_login(&self, error: &anyhow::Error) -> bool;
    fn end_session(&mut self);
    fn login(&mut self, input: &LoginInput) -> Result<()>;
    fn load_dashboard(&mut self) -> Result<DashboardData>;
    fn load_tab(&mut self, tab: TabKind, query: &TabQuery) -> Result<TabData>;
    fn spawn_tab_fetch(
        &mut self,
        request_id: u64,
        tab: TabKind,
        query: &TabQuery,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let result = self
            .load_tab(tab, query)
            .map_err(|error| self.fetch_failure(&error));
        tx.send(InternalEvent::TabLoaded {
            request_id,
            tab,
            result,
        })
        .map_err(|_| anyhow!("tab fetch receiver dropped -- restart loandesk"))
    }
    fn fetch_failure(&self, error: &anyhow::Error) -> FetchFailure {
        FetchFailure {
            message: format!("{error:#}"),
            login_required: self.needs_login(error),
        }
    }
    fn load_application(&mut self, id: &LoanApplicationId) -> Result<LoanApplication>;
    fn load_customer(&mut self, id: &CustomerId) -> Result<CustomerProfile>;
    fn update_application_status(
        &mut self,
        application: &LoanApplication,
        status: ApplicationStatus,
    ) -> Result<StatusUpdate>;
    fn delete_record(&mut self, tab: TabKind, id: &str) -> Result<()>;
    /// Starts a delete and posts `InternalEvent::DeleteFinished` when it
    /// resolves. The default runs it in place.
    fn spawn_delete(&mut self, tab: TabKind, id: &str, tx: Sender<InternalEvent>) -> Result<()> {
        let result = self
            .delete_record(tab, id)
            .map_err(|error| self.fetch_failure(&error));
        tx.send(InternalEvent::DeleteFinished {
            tab,
            id: id.to_owned(),
            result,
        })
        .map_err(|_| anyhow!("delete receiver dropped -- restart loandesk"))
    }
    fn submit_loan_type(&mut self, id: Option<&LoanTypeId>, input: &LoanTypeFormInput)
    -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum InternalEvent {
    ClearStatus {
        token: u64,
    },
    TabLoaded {
        request_id: u64,
        tab: TabKind,
        result: Result<TabData, FetchFailure>,
    },
    Refresh {
        tab: TabKind,
    },
    DeleteFinished {
        tab: TabKind,
        id: String,
        result: Result<(), FetchFailure>,
    },
}

#[derive(Debug, Clone, Copy)]
struct Column {
    title: &'static str,
    path: &'static str,
    money: bool,
}

const fn column(title: &'static str, path: &'static str) -> Column {
    Column {
        title,
        path,
        money: false,
    }
}

const fn money_column(title: &'static str, path: &'static str) -> Column {
    Column {
        title,
        path,
        money: true,
    }
}

const APPLICATION_COLUMNS: [Column; 7] = [
    column("applicant", "applicant.full_name"),
    column("email", "applicant.email"),
    column("loan", "loan_type.name"),
    money_column("amount", "amount"),
    column("tenure", "tenure_months"),
    column("status", "status"),
    column("applied", "applied_at"),
];

const LOAN_TYPE_COLUMNS: [Column; 7] = [
    column("name", "name"),
    column("category", "category"),
    column("subcategory", "subcategory"),
    money_column("min amount", "amount.min"),
    money_column("max amount", "amount.max"),
    column("min rate", "interest_rate.min"),
    column("status", "status"),
];

const CUSTOMER_COLUMNS: [Column; 7] = [
    column("name", "full_name"),
    column("email", "email"),
    column("phone", "phone"),
    column("pan", "pan"),
    column("city", "address.city"),
    column("status", "account_status"),
    column("joined", "created_at"),
];

fn columns_for(tab: TabKind) -> &'static [Column] {
    match tab {
        TabKind::Dashboard => &[],
        TabKind::Applications => &APPLICATION_COLUMNS,
        TabKind::LoanTypes => &LOAN_TYPE_COLUMNS,
        TabKind::Customers => &CUSTOMER_COLUMNS,
    }
}

fn label_path(tab: TabKind) -> &'static str {
    match tab {
        TabKind::Applications => "applicant.full_name",
        TabKind::LoanTypes => "name",
        TabKind::Customers => "full_name",
        TabKind::Dashboard => "id",
    }
}

/// One rendered page of the active list.
#[derive(Debug, Clone, PartialEq)]
struct TableModel {
    ids: Vec<String>,
    labels: Vec<String>,
    cells: Vec<Vec<String>>,
    window: PageWindow,
    counts: Option<StatusCounts>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct TableCursor {
    row: usize,
    col: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum DetailView {
    Application(LoanApplication),
    LoanType(LoanType),
    Customer(CustomerProfile),
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
struct FormUiState {
    editing: Option<LoanTypeId>,
    draft: LoanTypeDraft,
    field: usize,
    error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum LoginField {
    #[default]
    Email,
    Password,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct LoginUiState {
    email: String,
    password: String,
    focus: LoginField,
    error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
struct ViewData {
    applications: Collection<LoanApplication>,
    loan_types: Collection<LoanType>,
    customers: Collection<CustomerProfile>,
    application_view: ListView,
    loan_type_view: ListView,
    customer_view: ListView,
    dashboard: Option<DashboardData>,
    cursor: TableCursor,
    search_input: String,
    detail: Option<DetailView>,
    status_picker_cursor: usize,
    delete: DeleteFlow,
    form: Option<FormUiState>,
    login: LoginUiState,
    status_token: u64,
}

impl ViewData {
    fn new(options: ViewOptions) -> Self {
        let list = |fields| {
            let mut view = ListView::new(fields, options.page_size);
            view.authority = options.filter_authority;
            view
        };
        Self {
            applications: Collection::default(),
            loan_types: Collection::default(),
            customers: Collection::default(),
            application_view: list(application_search_fields()),
            loan_type_view: list(loan_type_search_fields()),
            customer_view: list(customer_search_fields()),
            dashboard: None,
            cursor: TableCursor::default(),
            search_input: String::new(),
            detail: None,
            status_picker_cursor: 0,
            delete: DeleteFlow::default(),
            form: None,
            login: LoginUiState::default(),
            status_token: 0,
        }
    }

    fn view(&self, tab: TabKind) -> Option<&ListView> {
        match tab {
            TabKind::Dashboard => None,
            TabKind::Applications => Some(&self.application_view),
            TabKind::LoanTypes => Some(&self.loan_type_view),
            TabKind::Customers => Some(&self.customer_view),
        }
    }

    fn view_mut(&mut self, tab: TabKind) -> Option<&mut ListView> {
        match tab {
            TabKind::Dashboard => None,
            TabKind::Applications => Some(&mut self.application_view),
            TabKind::LoanTypes => Some(&mut self.loan_type_view),
            TabKind::Customers => Some(&mut self.customer_view),
        }
    }

    fn is_loading(&self, tab: TabKind) -> bool {
        match tab {
            TabKind::Dashboard => false,
            TabKind::Applications => self.applications.is_loading(),
            TabKind::LoanTypes => self.loan_types.is_loading(),
            TabKind::Customers => self.customers.is_loading(),
        }
    }
}

fn build_model<'a, R: Record>(
    records: &'a [R],
    view: &ListView,
    tab: TabKind,
) -> (TableModel, Vec<&'a R>) {
    let output = view.run(records);
    let columns = columns_for(tab);
    let rows = output.rows().to_vec();
    let model = TableModel {
        ids: rows.iter().map(|r| r.record_id().to_owned()).collect(),
        labels: rows
            .iter()
            .map(|r| {
                r.field(label_path(tab))
                    .map(|value| value.display())
                    .unwrap_or_else(|| r.record_id().to_owned())
            })
            .collect(),
        cells: rows
            .iter()
            .map(|r| {
                columns
                    .iter()
                    .map(|column| cell_text(column, r.field(column.path)))
                    .collect()
            })
            .collect(),
        window: output.window.clone(),
        counts: None,
    };
    (model, output.matched)
}

fn active_table(tab: TabKind, view_data: &ViewData) -> Option<TableModel> {
    match tab {
        TabKind::Dashboard => None,
        TabKind::Applications => {
            let (mut model, matched) = build_model(
                view_data.applications.records(),
                &view_data.application_view,
                tab,
            );
            model.counts = Some(status_counts(&matched));
            Some(model)
        }
        TabKind::LoanTypes => Some(
            build_model(view_data.loan_types.records(), &view_data.loan_type_view, tab).0,
        ),
        TabKind::Customers => {
            Some(build_model(view_data.customers.records(), &view_data.customer_view, tab).0)
        }
    }
}

fn cell_text(column: &Column, value: Option<FieldValue>) -> String {
    match value {
        Some(FieldValue::Number(amount)) if column.money => format_rupees(amount),
        Some(value) => value.display(),
        None => "-".to_owned(),
    }
}

/// Formats an amount with Indian digit grouping, e.g. `₹12,34,567`.
fn format_rupees(amount: f64) -> String {
    let negative = amount < 0.0;
    let whole = amount.abs().round() as u64;
    let digits = whole.to_string();
    let grouped = if digits.len() <= 3 {
        digits
    } else {
        let (head, tail) = digits.split_at(digits.len() - 3);
        let mut groups = Vec::new();
        let mut rest = head;
        while rest.len() > 2 {
            let (left, right) = rest.split_at(rest.len() - 2);
            groups.push(right);
            rest = left;
        }
        groups.push(rest);
        groups.reverse();
        format!("{},{tail}", groups.join(","))
    };
    if negative {
        format!("-₹{grouped}")
    } else {
        format!("₹{grouped}")
    }
}

fn format_date(value: Option<OffsetDateTime>) -> String {
    value
        .map(|value| value.date().to_string())
        .unwrap_or_else(|| "-".to_owned())
}

fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or("-")
}

fn tab_query(view: &ListView) -> TabQuery {
    if view.authority == FilterAuthority::Local {
        return TabQuery::default();
    }
    TabQuery {
        search: view.filter.search.trim().to_owned(),
        status: ApplicationStatus::parse(view.filter.exact_value("status")),
        loan_type: view.filter.exact_value(LOAN_TYPE_FILTER_PATH).to_owned(),
        category: LoanCategory::parse(view.filter.exact_value("category")),
    }
}

pub fn run_app<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    options: ViewOptions,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::new(options);
    let (internal_tx, internal_rx) = mpsc::channel();

    if runtime.has_session() {
        let tab = state.active_tab;
        fetch_tab(state, runtime, &mut view_data, &internal_tx, tab);
    } else {
        state.mode = AppMode::Login;
        state.dispatch(AppCommand::SetStatus("log in to continue".to_owned()));
    }

    let mut result = Ok(());
    loop {
        process_internal_events(state, runtime, &mut view_data, &internal_tx, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::TabLoaded {
                request_id,
                tab,
                result,
            } => apply_tab_loaded(state, runtime, view_data, tx, request_id, tab, result),
            InternalEvent::Refresh { tab } => {
                if tab == state.active_tab && state.mode != AppMode::Login {
                    fetch_tab(state, runtime, view_data, tx, tab);
                }
            }
            InternalEvent::DeleteFinished { tab, id, result } => {
                apply_delete_finished(state, runtime, view_data, tx, tab, &id, result);
            }
        }
    }
}

fn apply_tab_loaded<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    request_id: u64,
    tab: TabKind,
    result: Result<TabData, FetchFailure>,
) {
    let failure = result.as_ref().err().cloned();
    let result = result.map_err(|failure| anyhow!(failure.message));
    let accepted = match (tab, result) {
        (TabKind::Applications, Ok(TabData::Applications(records))) => {
            view_data.applications.complete(request_id, Ok(records))
        }
        (TabKind::LoanTypes, Ok(TabData::LoanTypes(records))) => {
            view_data.loan_types.complete(request_id, Ok(records))
        }
        (TabKind::Customers, Ok(TabData::Customers(records))) => {
            view_data.customers.complete(request_id, Ok(records))
        }
        (TabKind::Applications, Err(error)) => view_data.applications.complete(request_id, Err(error)),
        (TabKind::LoanTypes, Err(error)) => view_data.loan_types.complete(request_id, Err(error)),
        (TabKind::Customers, Err(error)) => view_data.customers.complete(request_id, Err(error)),
        _ => false,
    };
    if !accepted {
        return;
    }

    match failure {
        Some(failure) if failure.login_required => require_login(state, runtime, view_data),
        Some(failure) => emit_status(
            state,
            view_data,
            tx,
            format!("{} load failed: {}", tab.label(), failure.message),
        ),
        None => {}
    }
    clamp_cursor(state.active_tab, view_data);
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_AFTER);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn schedule_refresh(internal_tx: &Sender<InternalEvent>, tab: TabKind) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(REFRESH_AFTER_DELETE);
        let _ = sender.send(InternalEvent::Refresh { tab });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn require_login<R: AppRuntime>(state: &mut AppState, runtime: &mut R, view_data: &mut ViewData) {
    runtime.end_session();
    view_data.detail = None;
    view_data.form = None;
    view_data.delete.cancel();
    view_data.login.password.clear();
    view_data.login.error = None;
    // A sticky status: the login view stays until the user acts.
    view_data.status_token = view_data.status_token.saturating_add(1);
    state.dispatch(AppCommand::RequireLogin);
}

fn report_error<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    context: &str,
    error: &anyhow::Error,
) {
    if runtime.needs_login(error) {
        require_login(state, runtime, view_data);
    } else {
        emit_status(state, view_data, tx, format!("{context}: {error:#}"));
    }
}

fn fetch_tab<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    tab: TabKind,
) {
    let (request_id, query) = match tab {
        TabKind::Dashboard => {
            match runtime.load_dashboard() {
                Ok(data) => view_data.dashboard = Some(data),
                Err(error) => {
                    view_data.dashboard = None;
                    report_error(state, runtime, view_data, tx, "dashboard load failed", &error);
                }
            }
            return;
        }
        TabKind::Applications => {
            // The loan-type filter offers the subcategories of loaded loan types.
            if view_data.loan_types.records().is_empty() && !view_data.loan_types.is_loading() {
                fetch_tab(state, runtime, view_data, tx, TabKind::LoanTypes);
            }
            (
                view_data.applications.begin(),
                tab_query(&view_data.application_view),
            )
        }
        TabKind::LoanTypes => (
            view_data.loan_types.begin(),
            tab_query(&view_data.loan_type_view),
        ),
        TabKind::Customers => (
            view_data.customers.begin(),
            tab_query(&view_data.customer_view),
        ),
    };
    tracing::debug!(tab = tab.label(), request_id, "fetching tab");
    if let Err(error) = runtime.spawn_tab_fetch(request_id, tab, &query, tx.clone()) {
        emit_status(state, view_data, tx, format!("load failed: {error:#}"));
    }
}

fn clamp_cursor(tab: TabKind, view_data: &mut ViewData) {
    let rows = active_table(tab, view_data).map_or(0, |model| model.ids.len());
    view_data.cursor.row = view_data.cursor.row.min(rows.saturating_sub(1));
    let cols = columns_for(tab).len();
    view_data.cursor.col = view_data.cursor.col.min(cols.saturating_sub(1));
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if matches!(
        view_data.delete,
        DeleteFlow::Success { .. } | DeleteFlow::Failure { .. }
    ) {
        view_data.delete.acknowledge();
        return false;
    }

    match state.mode {
        AppMode::Login => handle_login_key(state, runtime, view_data, internal_tx, key),
        AppMode::Search => handle_search_key(state, runtime, view_data, internal_tx, key),
        AppMode::Form(_) => handle_form_key(state, runtime, view_data, internal_tx, key),
        AppMode::Confirm => handle_confirm_key(state, runtime, view_data, internal_tx, key),
        AppMode::Detail => handle_detail_key(state, view_data, internal_tx, key),
        AppMode::StatusPicker => handle_status_picker_key(state, runtime, view_data, internal_tx, key),
        AppMode::Nav => handle_nav_key(state, runtime, view_data, internal_tx, key),
    }
    false
}

fn handle_nav_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let tab = state.active_tab;
    match key.code {
        KeyCode::Char('f') => switch_tab(state, runtime, view_data, tx, AppCommand::NextTab),
        KeyCode::Char('b') => switch_tab(state, runtime, view_data, tx, AppCommand::PrevTab),
        KeyCode::Char('j') | KeyCode::Down => {
            let rows = active_table(tab, view_data).map_or(0, |model| model.ids.len());
            if view_data.cursor.row + 1 < rows {
                view_data.cursor.row += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            view_data.cursor.row = view_data.cursor.row.saturating_sub(1);
        }
        KeyCode::Char('l') | KeyCode::Right => {
            if view_data.cursor.col + 1 < columns_for(tab).len() {
                view_data.cursor.col += 1;
            }
        }
        KeyCode::Char('h') | KeyCode::Left => {
            view_data.cursor.col = view_data.cursor.col.saturating_sub(1);
        }
        KeyCode::Char('s') => {
            let Some(column) = columns_for(tab).get(view_data.cursor.col) else {
                return;
            };
            let Some(view) = view_data.view_mut(tab) else {
                return;
            };
            view.toggle_sort(column.path);
            let direction = view.sort.direction_for(column.path).unwrap_or_default();
            emit_status(
                state,
                view_data,
                tx,
                format!("sorted by {} {}", column.title, direction.as_str()),
            );
        }
        KeyCode::Char('S') => {
            if let Some(view) = view_data.view_mut(tab) {
                view.sort.clear();
                emit_status(state, view_data, tx, "sort cleared");
            }
        }
        KeyCode::Char('/') => {
            let Some(view) = view_data.view(tab) else {
                return;
            };
            view_data.search_input = view.filter.search.clone();
            state.dispatch(AppCommand::OpenSearch);
        }
        KeyCode::Char('t') if tab == TabKind::Applications => {
            let options = loan_type_options(view_data);
            if options.is_empty() {
                emit_status(state, view_data, tx, "no loan types loaded -- press r to refresh");
                return;
            }
            let message = step_exact(
                &mut view_data.application_view,
                LOAN_TYPE_FILTER_PATH,
                "loan type",
                &options,
            );
            view_data.cursor.row = 0;
            emit_status(state, view_data, tx, message);
            refetch_if_server_filtered(state, runtime, view_data, tx, tab);
        }
        KeyCode::Char('c') => {
            let Some(message) = view_data.view_mut(tab).and_then(|view| cycle_filter(view, tab))
            else {
                emit_status(state, view_data, tx, format!("no filter on {}", tab.label()));
                return;
            };
            view_data.cursor.row = 0;
            emit_status(state, view_data, tx, message);
            refetch_if_server_filtered(state, runtime, view_data, tx, tab);
        }
        KeyCode::Char('n') | KeyCode::Char('p') => {
            let Some(model) = active_table(tab, view_data) else {
                return;
            };
            let Some(view) = view_data.view_mut(tab) else {
                return;
            };
            view.pagination.clamp(model.window.total_pages);
            let moved = if key.code == KeyCode::Char('n') {
                view.pagination.next(model.window.total_pages)
            } else {
                view.pagination.prev(model.window.total_pages)
            };
            if moved {
                view_data.cursor.row = 0;
            }
        }
        KeyCode::Char('+') | KeyCode::Char('-') => {
            let Some(view) = view_data.view_mut(tab) else {
                return;
            };
            let delta = if key.code == KeyCode::Char('+') { 1 } else { -1 };
            view.pagination.step_page_size(delta);
            let size = view.pagination.page_size();
            view_data.cursor.row = 0;
            emit_status(state, view_data, tx, format!("{size} per page"));
        }
        KeyCode::Enter => open_detail(state, runtime, view_data, tx),
        KeyCode::Char('a') if tab == TabKind::LoanTypes => {
            view_data.form = Some(FormUiState {
                editing: None,
                draft: LoanTypeDraft::default(),
                field: 0,
                error: None,
            });
            state.dispatch(AppCommand::OpenForm(FormKind::LoanType));
        }
        KeyCode::Char('e') if tab == TabKind::LoanTypes => {
            let Some(loan_type) = selected_id(tab, view_data)
                .and_then(|id| view_data.loan_types.find(&id))
                .cloned()
            else {
                emit_status(state, view_data, tx, "nothing selected");
                return;
            };
            view_data.form = Some(FormUiState {
                editing: Some(loan_type.id.clone()),
                draft: LoanTypeDraft::from_input(&LoanTypeFormInput::from_loan_type(&loan_type)),
                field: 0,
                error: None,
            });
            state.dispatch(AppCommand::OpenForm(FormKind::LoanType));
        }
        KeyCode::Char('d') => request_delete(state, view_data, tx),
        KeyCode::Char('r') => {
            fetch_tab(state, runtime, view_data, tx, tab);
            emit_status(state, view_data, tx, format!("refreshing {}", tab.label()));
        }
        KeyCode::Esc => {
            state.dispatch(AppCommand::ClearStatus);
        }
        _ => {}
    }
}

fn switch_tab<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    command: AppCommand,
) {
    if state.dispatch(command).is_empty() {
        return;
    }
    view_data.cursor = TableCursor::default();
    let tab = state.active_tab;
    fetch_tab(state, runtime, view_data, tx, tab);
}

/// Steps the tab's status or category filter through its values and back
/// to none.
fn cycle_filter(view: &mut ListView, tab: TabKind) -> Option<String> {
    let (path, values): (&str, Vec<String>) = match tab {
        TabKind::Applications => (
            "status",
            ApplicationStatus::ALL
                .iter()
                .map(|s| s.as_str().to_owned())
                .collect(),
        ),
        TabKind::LoanTypes => (
            "category",
            LoanCategory::ALL
                .iter()
                .map(|c| c.as_str().to_owned())
                .collect(),
        ),
        _ => return None,
    };
    Some(step_exact(view, path, path, &values))
}

fn step_exact(view: &mut ListView, path: &str, label: &str, values: &[String]) -> String {
    let current = view.filter.exact_value(path);
    let next = match values.iter().position(|value| value == current) {
        None => values.first().map(String::as_str).unwrap_or_default(),
        Some(index) if index + 1 < values.len() => values[index + 1].as_str(),
        Some(_) => "",
    }
    .to_owned();
    view.set_exact(path, &next);
    if next.is_empty() {
        format!("{label} filter cleared")
    } else {
        format!("{label}: {next}")
    }
}

/// Subcategories the applications list can be narrowed to, sorted.
fn loan_type_options(view_data: &ViewData) -> Vec<String> {
    let from_loan_types = view_data
        .loan_types
        .records()
        .iter()
        .map(|loan_type| loan_type.subcategory.trim());
    let from_applications = view_data
        .applications
        .records()
        .iter()
        .filter_map(|application| application.loan_type.subcategory.as_deref())
        .map(str::trim);
    from_loan_types
        .chain(from_applications)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}

fn refetch_if_server_filtered<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    tab: TabKind,
) {
    if view_data
        .view(tab)
        .is_some_and(|view| view.authority == FilterAuthority::Server)
    {
        fetch_tab(state, runtime, view_data, tx, tab);
    }
}

fn selected_id(tab: TabKind, view_data: &ViewData) -> Option<String> {
    active_table(tab, view_data)?
        .ids
        .get(view_data.cursor.row)
        .cloned()
}

fn open_detail<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    let tab = state.active_tab;
    if tab == TabKind::Dashboard {
        return;
    }
    let Some(id) = selected_id(tab, view_data) else {
        emit_status(state, view_data, tx, "nothing selected");
        return;
    };

    let loaded = match tab {
        TabKind::Applications => runtime
            .load_application(&LoanApplicationId::from(id.as_str()))
            .map(DetailView::Application),
        TabKind::Customers => runtime
            .load_customer(&CustomerId::from(id.as_str()))
            .map(DetailView::Customer),
        TabKind::LoanTypes => view_data
            .loan_types
            .find(&id)
            .cloned()
            .map(DetailView::LoanType)
            .ok_or_else(|| anyhow!("loan type not found")),
        TabKind::Dashboard => return,
    };
    let detail = match loaded {
        Ok(detail) => detail,
        Err(error) if runtime.needs_login(&error) => {
            require_login(state, runtime, view_data);
            return;
        }
        Err(error) => DetailView::Error(format!("{error:#}")),
    };
    view_data.detail = Some(detail);
    state.dispatch(AppCommand::OpenDetail);
}

fn handle_detail_key(
    state: &mut AppState,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Esc => {
            view_data.detail = None;
            state.dispatch(AppCommand::Back);
        }
        KeyCode::Char('u') => {
            let Some(DetailView::Application(application)) = &view_data.detail else {
                emit_status(state, view_data, tx, "open an application first");
                return;
            };
            view_data.status_picker_cursor = ApplicationStatus::ALL
                .iter()
                .position(|status| *status == application.status)
                .unwrap_or(0);
            state.dispatch(AppCommand::OpenStatusPicker);
        }
        _ => {}
    }
}

fn handle_status_picker_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let last = ApplicationStatus::ALL.len() - 1;
    match key.code {
        KeyCode::Esc => {
            state.dispatch(AppCommand::Back);
        }
        KeyCode::Char('j') | KeyCode::Down => {
            view_data.status_picker_cursor = (view_data.status_picker_cursor + 1).min(last);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            view_data.status_picker_cursor = view_data.status_picker_cursor.saturating_sub(1);
        }
        KeyCode::Enter => {
            let Some(DetailView::Application(application)) = view_data.detail.clone() else {
                state.dispatch(AppCommand::ExitToNav);
                return;
            };
            let status = ApplicationStatus::ALL[view_data.status_picker_cursor.min(last)];
            match runtime.update_application_status(&application, status) {
                Ok(update) => {
                    if let Some(DetailView::Application(current)) = view_data.detail.as_mut() {
                        apply_status_update(current, &update);
                    }
                    if let Some(row) = view_data.applications.find_mut(application.id.as_str()) {
                        apply_status_update(row, &update);
                    }
                    state.dispatch(AppCommand::Back);
                    emit_status(
                        state,
                        view_data,
                        tx,
                        format!("status updated to {}", update.status.as_str()),
                    );
                }
                Err(error) => {
                    state.dispatch(AppCommand::Back);
                    report_error(state, runtime, view_data, tx, "status update failed", &error);
                }
            }
        }
        _ => {}
    }
}

fn request_delete(state: &mut AppState, view_data: &mut ViewData, tx: &Sender<InternalEvent>) {
    let tab = state.active_tab;
    if !tab.supports_delete() {
        emit_status(state, view_data, tx, format!("delete is not available on {}", tab.label()));
        return;
    }
    let Some(model) = active_table(tab, view_data) else {
        return;
    };
    let row = view_data.cursor.row;
    let (Some(id), Some(label)) = (model.ids.get(row), model.labels.get(row)) else {
        emit_status(state, view_data, tx, "nothing selected");
        return;
    };
    let target = DeleteTarget {
        tab,
        id: id.clone(),
        label: label.clone(),
    };
    match view_data.delete.request(target) {
        Ok(()) => {
            state.dispatch(AppCommand::OpenConfirm);
        }
        Err(error) => emit_status(state, view_data, tx, format!("{error:#}")),
    }
}

fn handle_confirm_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => run_delete(state, runtime, view_data, tx),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            view_data.delete.cancel();
            state.dispatch(AppCommand::ExitToNav);
            emit_status(state, view_data, tx, "delete canceled");
        }
        _ => {}
    }
}

fn run_delete<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    state.dispatch(AppCommand::ExitToNav);
    let target = match view_data.delete.confirm() {
        Ok(target) => target,
        Err(error) => {
            emit_status(state, view_data, tx, format!("{error:#}"));
            return;
        }
    };

    tracing::debug!(tab = target.tab.label(), id = %target.id, "deleting");
    if let Err(error) = runtime.spawn_delete(target.tab, &target.id, tx.clone()) {
        view_data.delete.finish(&target.id, Err(error));
        return;
    }
    emit_status(state, view_data, tx, format!("deleting {}...", target.label));
}

fn apply_delete_finished<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    tab: TabKind,
    id: &str,
    result: Result<(), FetchFailure>,
) {
    let login_required = result
        .as_ref()
        .err()
        .is_some_and(|failure| failure.login_required);
    let succeeded = result.is_ok();
    let result = result.map_err(|failure| anyhow!(failure.message));
    if !view_data.delete.finish(id, result) {
        return;
    }

    if login_required {
        view_data.delete.acknowledge();
        require_login(state, runtime, view_data);
        return;
    }
    if !succeeded {
        return;
    }

    match tab {
        TabKind::LoanTypes => view_data.loan_types.remove(id),
        TabKind::Customers => view_data.customers.remove(id),
        TabKind::Applications => view_data.applications.remove(id),
        TabKind::Dashboard => false,
    };
    clamp_cursor(state.active_tab, view_data);
    schedule_refresh(tx, tab);
}

fn handle_search_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let tab = state.active_tab;
    match key.code {
        KeyCode::Esc => {
            state.dispatch(AppCommand::ExitToNav);
            return;
        }
        KeyCode::Enter => {
            state.dispatch(AppCommand::ExitToNav);
            refetch_if_server_filtered(state, runtime, view_data, tx, tab);
            return;
        }
        KeyCode::Backspace => {
            view_data.search_input.pop();
        }
        KeyCode::Char(ch) => view_data.search_input.push(ch),
        _ => return,
    }

    let search = view_data.search_input.clone();
    if let Some(view) = view_data.view_mut(tab) {
        view.set_search(&search);
    }
    view_data.cursor.row = 0;
}

fn handle_form_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(form) = view_data.form.as_mut() else {
        state.dispatch(AppCommand::ExitToNav);
        return;
    };
    let fields = LoanTypeField::ALL.len();
    let field = LoanTypeField::ALL[form.field.min(fields - 1)];
    match key.code {
        KeyCode::Esc => {
            view_data.form = None;
            state.dispatch(AppCommand::ExitToNav);
            emit_status(state, view_data, tx, "form canceled");
        }
        KeyCode::Tab | KeyCode::Down => form.field = (form.field + 1) % fields,
        KeyCode::BackTab | KeyCode::Up => form.field = (form.field + fields - 1) % fields,
        KeyCode::Enter => submit_form(state, runtime, view_data, tx),
        KeyCode::Left | KeyCode::Right | KeyCode::Char(' ') if field.is_choice() => {
            form.draft.cycle(field);
        }
        KeyCode::Backspace => form.draft.pop_char(field),
        KeyCode::Char(ch) => form.draft.push_char(field, ch),
        _ => {}
    }
}

fn submit_form<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    let Some(form) = view_data.form.as_mut() else {
        return;
    };
    let input = match form
        .draft
        .to_input()
        .and_then(|input| input.validate().map(|()| input))
    {
        Ok(input) => input,
        Err(error) => {
            form.error = Some(format!("{error:#}"));
            return;
        }
    };
    let editing = form.editing.clone();

    match runtime.submit_loan_type(editing.as_ref(), &input) {
        Ok(()) => {
            view_data.form = None;
            state.dispatch(AppCommand::ExitToNav);
            let message = if editing.is_some() {
                "loan type updated"
            } else {
                "loan type created"
            };
            emit_status(state, view_data, tx, message);
            fetch_tab(state, runtime, view_data, tx, TabKind::LoanTypes);
        }
        Err(error) if runtime.needs_login(&error) => require_login(state, runtime, view_data),
        Err(error) => {
            if let Some(form) = view_data.form.as_mut() {
                form.error = Some(format!("{error:#}"));
            }
        }
    }
}

fn handle_login_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let login = &mut view_data.login;
    let focused = match login.focus {
        LoginField::Email => &mut login.email,
        LoginField::Password => &mut login.password,
    };
    match key.code {
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
            login.focus = match login.focus {
                LoginField::Email => LoginField::Password,
                LoginField::Password => LoginField::Email,
            };
        }
        KeyCode::Backspace => {
            focused.pop();
        }
        KeyCode::Char(ch) => focused.push(ch),
        KeyCode::Enter => submit_login(state, runtime, view_data, tx),
        _ => {}
    }
}

fn submit_login<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    let input = LoginInput {
        email: view_data.login.email.trim().to_owned(),
        password: view_data.login.password.clone(),
    };
    if let Err(error) = input.validate() {
        view_data.login.error = Some(format!("{error:#}"));
        return;
    }

    match runtime.login(&input) {
        Ok(()) => {
            view_data.login = LoginUiState {
                email: input.email,
                ..LoginUiState::default()
            };
            state.dispatch(AppCommand::LoggedIn);
            emit_status(state, view_data, tx, "logged in");
            let tab = state.active_tab;
            fetch_tab(state, runtime, view_data, tx, tab);
        }
        Err(error) => {
            view_data.login.password.clear();
            view_data.login.error = Some(format!("{error:#}"));
        }
    }
}

fn tab_title(tab: TabKind, state: &AppState, view_data: &ViewData) -> String {
    let marker = view_data
        .view(tab)
        .filter(|view| !view.filter.is_empty())
        .map(|_| " *")
        .unwrap_or_default();
    if state.active_tab == tab {
        format!(" {}{} ", tab.label(), marker)
    } else {
        format!(" {} ", tab.label())
    }
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let tabs_visible = state.visible_tabs();
    let selected = tabs_visible
        .iter()
        .position(|tab| *tab == state.active_tab)
        .unwrap_or(0);
    let titles = tabs_visible
        .iter()
        .map(|tab| tab_title(*tab, state, view_data))
        .collect::<Vec<String>>();
    let tabs = Tabs::new(titles)
        .block(Block::default().title("loandesk").borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, layout[0]);

    if state.mode == AppMode::Login {
        let area = centered_rect(50, 40, layout[1]);
        let login = Paragraph::new(render_login_text(&view_data.login))
            .block(Block::default().title("log in").borders(Borders::ALL));
        frame.render_widget(login, area);
    } else if state.active_tab == TabKind::Dashboard {
        let body = Paragraph::new(render_dashboard_text(view_data.dashboard.as_ref()))
            .block(Block::default().borders(Borders::ALL).title("dashboard"));
        frame.render_widget(body, layout[1]);
    } else {
        render_table(frame, layout[1], state, view_data);
    }

    let status = Paragraph::new(status_text(state, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[2]);

    if let Some(detail) = &view_data.detail {
        let area = centered_rect(70, 80, frame.area());
        frame.render_widget(Clear, area);
        let title = match detail {
            DetailView::Error(_) => "error",
            _ => "detail",
        };
        let widget = Paragraph::new(render_detail_text(detail))
            .wrap(Wrap { trim: false })
            .block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(widget, area);
    }

    if state.mode == AppMode::StatusPicker {
        let current = match &view_data.detail {
            Some(DetailView::Application(application)) => Some(application.status),
            _ => None,
        };
        let area = centered_rect(30, 30, frame.area());
        frame.render_widget(Clear, area);
        let picker = Paragraph::new(render_status_picker_text(
            current,
            view_data.status_picker_cursor,
        ))
        .block(Block::default().title("update status").borders(Borders::ALL));
        frame.render_widget(picker, area);
    }

    if let Some(form) = &view_data.form {
        let area = centered_rect(60, 80, frame.area());
        frame.render_widget(Clear, area);
        let title = if form.editing.is_some() {
            "edit loan type"
        } else {
            "add loan type"
        };
        let widget = Paragraph::new(render_form_text(form))
            .block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(widget, area);
    }

    if let Some(text) = render_delete_overlay_text(&view_data.delete) {
        let area = centered_rect(50, 25, frame.area());
        frame.render_widget(Clear, area);
        let color = match view_data.delete {
            DeleteFlow::Success { .. } => Color::Green,
            DeleteFlow::Failure { .. } => Color::Red,
            _ => Color::Yellow,
        };
        let widget = Paragraph::new(text).wrap(Wrap { trim: false }).block(
            Block::default()
                .borders(Borders::ALL)
                .style(Style::default().fg(color)),
        );
        frame.render_widget(widget, area);
    }
}

fn render_table(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    state: &AppState,
    view_data: &ViewData,
) {
    let tab = state.active_tab;
    let Some(model) = active_table(tab, view_data) else {
        return;
    };
    let Some(view) = view_data.view(tab) else {
        return;
    };

    let split = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);

    let columns = columns_for(tab);
    let widths = vec![Constraint::Min(8); columns.len().max(1)];
    let header = Row::new(columns.iter().enumerate().map(|(index, column)| {
        let mut label = column.title.to_owned();
        match view.sort.direction_for(column.path) {
            Some(SortDirection::Asc) => label.push_str(" ↑"),
            Some(SortDirection::Desc) => label.push_str(" ↓"),
            None => {}
        }
        let mut style = Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD);
        if index == view_data.cursor.col {
            style = style.fg(Color::Cyan);
        }
        Cell::from(label).style(style)
    }));

    let deleting = deleting_row(&model, &view_data.delete);
    let rows = model.cells.iter().enumerate().map(|(row_index, cells)| {
        let selected_row = row_index == view_data.cursor.row;
        let in_flight = deleting == Some(row_index);
        let cells = cells
            .iter()
            .enumerate()
            .map(|(col_index, text)| {
                if in_flight {
                    let text = if col_index == 0 {
                        format!("{DELETING_MARKER} {text}")
                    } else {
                        text.clone()
                    };
                    return Cell::from(text).style(
                        Style::default()
                            .fg(Color::DarkGray)
                            .add_modifier(Modifier::DIM),
                    );
                }
                let mut style = Style::default();
                if columns[col_index].path.ends_with("status")
                    && let Some(badge) = badge_style(text)
                {
                    style = badge;
                }
                if selected_row {
                    style = style.bg(Color::DarkGray);
                }
                if selected_row && col_index == view_data.cursor.col {
                    style = Style::default()
                        .fg(Color::Black)
                        .bg(Color::Cyan)
                        .add_modifier(Modifier::BOLD);
                }
                Cell::from(text.clone()).style(style)
            })
            .collect::<Vec<_>>();
        Row::new(cells)
    });

    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(
            Block::default()
                .title(table_title(tab, &model, view, view_data.is_loading(tab)))
                .borders(Borders::ALL),
        );
    frame.render_widget(table, split[0]);

    let footer = Paragraph::new(page_bar_text(&model)).style(Style::default().fg(Color::Gray));
    frame.render_widget(footer, split[1]);
}

const DELETING_MARKER: &str = "⟳ deleting...";

/// Index on the visible page of the row whose delete is in flight.
fn deleting_row(model: &TableModel, flow: &DeleteFlow) -> Option<usize> {
    let id = flow.deleting_id()?;
    model.ids.iter().position(|row| row == id)
}

fn badge_style(text: &str) -> Option<Style> {
    let color = match text {
        "pending" => Color::Yellow,
        "approved" | "active" => Color::Green,
        "rejected" => Color::Red,
        "disbursed" => Color::Blue,
        "inactive" => Color::DarkGray,
        _ => return None,
    };
    Some(Style::default().fg(color).add_modifier(Modifier::BOLD))
}

fn table_title(tab: TabKind, model: &TableModel, view: &ListView, loading: bool) -> String {
    let mut title = format!(" {} | {}", tab.label(), model.window.summary());
    if loading {
        title.push_str(" | loading");
    }
    let search = view.filter.search.trim();
    if !search.is_empty() {
        title.push_str(&format!(" | search: {search}"));
    }
    for exact in &view.filter.exact {
        if !exact.expected.is_empty() {
            title.push_str(&format!(" | {}: {}", exact.path, exact.expected));
        }
    }
    title.push(' ');
    title
}

fn page_bar_text(model: &TableModel) -> String {
    let window = &model.window;
    let pages = window
        .page_numbers(PAGE_NUMBER_WINDOW)
        .into_iter()
        .map(|page| {
            if page == window.page {
                format!("[{page}]")
            } else {
                page.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    let mut text = format!(
        "page {} of {}  {}  {} per page",
        window.page, window.total_pages, pages, window.page_size
    );
    if let Some(counts) = &model.counts {
        text.push_str(&format!(
            "  |  pending {}  approved {}  rejected {}  disbursed {}",
            counts.pending, counts.approved, counts.rejected, counts.disbursed
        ));
    }
    text
}

fn status_text(state: &AppState, view_data: &ViewData) -> String {
    if let Some(status) = &state.status_line {
        return status.clone();
    }
    match state.mode {
        AppMode::Login => "tab switch field  enter log in  ctrl+q quit".to_owned(),
        AppMode::Search => format!("/{}  enter apply  esc done", view_data.search_input),
        AppMode::Form(_) => {
            "tab next field  space cycle choice  enter save  esc cancel".to_owned()
        }
        AppMode::Confirm => "y delete  n cancel".to_owned(),
        AppMode::Detail => match view_data.detail {
            Some(DetailView::Application(_)) => "u update status  esc back".to_owned(),
            _ => "esc back".to_owned(),
        },
        AppMode::StatusPicker => "j/k choose  enter apply  esc back".to_owned(),
        AppMode::Nav => match state.active_tab {
            TabKind::Dashboard => "f/b tab  r refresh  ctrl+q quit".to_owned(),
            TabKind::LoanTypes => {
                "j/k row  s sort  / search  c category  n/p page  a add  e edit  d delete  enter detail"
                    .to_owned()
            }
            TabKind::Customers => {
                "j/k row  s sort  / search  n/p page  +/- size  d delete  enter detail".to_owned()
            }
            TabKind::Applications => {
                "j/k row  s sort  / search  c status  t loan type  n/p page  +/- size  enter detail"
                    .to_owned()
            }
        },
    }
}

fn render_dashboard_text(data: Option<&DashboardData>) -> String {
    let Some(data) = data else {
        return "no dashboard data -- press r to refresh".to_owned();
    };
    let stats = &data.stats;
    let mut lines = vec![
        format!("total applications   {}", stats.total_applications),
        format!("pending              {}", stats.pending_applications),
        format!("approved             {}", stats.approved_applications),
        format!("rejected             {}", stats.rejected_applications),
        format!("total clients        {}", stats.total_clients),
        format!("active loans         {}", stats.active_loans),
        format!("total disbursed      {}", format_rupees(stats.total_disbursed)),
        format!(
            "avg processing days  {}",
            stats
                .avg_processing_days
                .map(|days| format!("{days:.1}"))
                .unwrap_or_else(|| "-".to_owned())
        ),
    ];
    lines.push(String::new());
    lines.push("applications by status".to_owned());
    match &data.analytics {
        None => lines.push("  analytics unavailable".to_owned()),
        Some(analytics) => {
            for (label, count) in [
                ("pending", analytics.pending_applications),
                ("approved", analytics.approved_applications),
                ("rejected", analytics.rejected_applications),
            ] {
                lines.push(share_line(label, count, analytics.total_applications));
            }
        }
    }
    lines.push(String::new());
    lines.push("recent applications".to_owned());
    if data.recent.is_empty() {
        lines.push("  none yet".to_owned());
    }
    for application in &data.recent {
        lines.push(format!(
            "  {:<24} {:<20} {:>14}  {:<10} {}",
            or_dash(application.applicant.full_name.as_deref()),
            or_dash(application.loan_type.name.as_deref()),
            application
                .amount
                .map(format_rupees)
                .unwrap_or_else(|| "-".to_owned()),
            application.status.as_str(),
            format_date(application.applied_at),
        ));
    }
    lines.join("\n")
}

const SHARE_BAR_WIDTH: u64 = 20;

fn share_line(label: &str, count: u64, total: u64) -> String {
    let (percent, filled) = if total == 0 {
        (0, 0)
    } else {
        (
            count.min(total) * 100 / total,
            count.min(total) * SHARE_BAR_WIDTH / total,
        )
    };
    let bar: String = (0..SHARE_BAR_WIDTH)
        .map(|cell| if cell < filled { '#' } else { '.' })
        .collect();
    format!("  {label:<10} {bar} {percent:>3}%  ({count})")
}

fn render_detail_text(detail: &DetailView) -> String {
    match detail {
        DetailView::Error(message) => format!("{message}\n\nesc back"),
        DetailView::Application(application) => render_application_detail(application),
        DetailView::LoanType(loan_type) => render_loan_type_detail(loan_type),
        DetailView::Customer(customer) => render_customer_detail(customer),
    }
}

fn render_application_detail(application: &LoanApplication) -> String {
    let money = |value: Option<f64>| value.map(format_rupees).unwrap_or_else(|| "-".to_owned());
    let number = |value: Option<f64>| {
        value
            .map(|value| FieldValue::Number(value).display())
            .unwrap_or_else(|| "-".to_owned())
    };
    [
        format!("application  {}", application.id),
        format!("status       {}", application.status.label()),
        String::new(),
        format!(
            "applicant    {}",
            or_dash(application.applicant.full_name.as_deref())
        ),
        format!("email        {}", or_dash(application.applicant.email.as_deref())),
        format!("phone        {}", or_dash(application.applicant.phone.as_deref())),
        String::new(),
        format!("loan         {}", or_dash(application.loan_type.name.as_deref())),
        format!(
            "subcategory  {}",
            or_dash(application.loan_type.subcategory.as_deref())
        ),
        format!("amount       {}", money(application.amount)),
        format!(
            "tenure       {}",
            application
                .tenure_months
                .map(|months| format!("{months} months"))
                .unwrap_or_else(|| "-".to_owned())
        ),
        format!(
            "interest     {}",
            application
                .interest_rate
                .map(|rate| format!("{rate}%"))
                .unwrap_or_else(|| "-".to_owned())
        ),
        format!("purpose      {}", or_dash(application.purpose.as_deref())),
        String::new(),
        format!("income       {}/mo", money(application.monthly_income)),
        format!(
            "credit score {}",
            application
                .credit_score
                .map(|score| score.to_string())
                .unwrap_or_else(|| "-".to_owned())
        ),
        format!(
            "employment   {}",
            or_dash(application.employment_type.as_deref())
        ),
        format!("company      {}", or_dash(application.company_name.as_deref())),
        format!("experience   {} years", number(application.years_of_experience)),
        format!("existing     {}", money(application.existing_loans)),
        format!("emi/income   {}", number(application.emi_to_income_ratio)),
        String::new(),
        format!("applied      {}", format_date(application.applied_at)),
        format!("updated      {}", format_date(application.updated_at)),
    ]
    .join("\n")
}

fn render_loan_type_detail(loan_type: &LoanType) -> String {
    let rate = |value: Option<f64>| {
        value
            .map(|value| format!("{value}%"))
            .unwrap_or_else(|| "-".to_owned())
    };
    let months = |value: Option<i64>| {
        value
            .map(|value| format!("{value} months"))
            .unwrap_or_else(|| "-".to_owned())
    };
    let mut lines = vec![
        format!("{}  ({})", loan_type.name, loan_type.status.as_str()),
        format!("category     {}", loan_type.category.label()),
        format!("subcategory  {}", or_dash(Some(loan_type.subcategory.as_str()))),
        format!(
            "amount       {} - {}",
            format_rupees(loan_type.amount.min),
            format_rupees(loan_type.amount.max)
        ),
        format!(
            "interest     {} - {}",
            rate(loan_type.interest_rate.min),
            rate(loan_type.interest_rate.max)
        ),
        format!(
            "tenure       {} - {}",
            months(loan_type.tenure.min_months),
            months(loan_type.tenure.max_months)
        ),
        format!("fee          {}", or_dash(Some(loan_type.processing_fee.as_str()))),
        String::new(),
        "eligibility".to_owned(),
        format!(
            "  {}",
            or_dash(Some(loan_type.eligibility_criteria.as_str()))
        ),
        "documents".to_owned(),
    ];
    if loan_type.required_documents.is_empty() {
        lines.push("  -".to_owned());
    }
    lines.extend(
        loan_type
            .required_documents
            .iter()
            .map(|document| format!("  - {document}")),
    );
    lines.join("\n")
}

fn render_customer_detail(customer: &CustomerProfile) -> String {
    let address = &customer.address;
    let mut lines = vec![
        or_dash(customer.full_name.as_deref()).to_owned(),
        format!("status       {}", or_dash(customer.account_status.as_deref())),
        format!("email        {}", or_dash(customer.email.as_deref())),
        format!("phone        {}", or_dash(customer.phone.as_deref())),
        format!(
            "alt phone    {}",
            or_dash(customer.phone_secondary.as_deref())
        ),
        format!("pan          {}", or_dash(customer.pan.as_deref())),
        format!(
            "aadhaar      {}",
            or_dash(customer.aadhaar_grouped().as_deref())
        ),
        String::new(),
        format!("address      {}", or_dash(address.line.as_deref())),
        format!(
            "             {}, {} {}",
            or_dash(address.city.as_deref()),
            or_dash(address.state.as_deref()),
            or_dash(address.pincode.as_deref())
        ),
    ];
    if let Some(employment) = &customer.employment {
        lines.push(String::new());
        lines.push(format!(
            "employment   {}",
            or_dash(employment.employment_type.as_deref())
        ));
        lines.push(format!(
            "company      {}",
            or_dash(employment.company_name.as_deref())
        ));
        lines.push(format!(
            "income       {}",
            employment
                .monthly_income
                .map(format_rupees)
                .unwrap_or_else(|| "-".to_owned())
        ));
        lines.push(format!(
            "experience   {}",
            or_dash(employment.experience.as_deref())
        ));
    }
    for account in &customer.bank_details {
        lines.push(String::new());
        lines.push(format!("bank         {}", or_dash(account.bank_name.as_deref())));
        lines.push(format!(
            "account      {}",
            or_dash(account.account_number.as_deref())
        ));
        lines.push(format!(
            "holder       {}",
            or_dash(account.holder_name.as_deref())
        ));
        lines.push(format!(
            "branch       {} ({})",
            or_dash(account.branch.as_deref()),
            or_dash(account.ifsc.as_deref())
        ));
    }
    lines.push(String::new());
    lines.push(format!("joined       {}", format_date(customer.created_at)));
    lines.join("\n")
}

fn render_status_picker_text(current: Option<ApplicationStatus>, cursor: usize) -> String {
    ApplicationStatus::ALL
        .iter()
        .enumerate()
        .map(|(index, status)| {
            let pointer = if index == cursor { ">" } else { " " };
            let marker = if Some(*status) == current {
                " (current)"
            } else {
                ""
            };
            format!("{pointer} {}{marker}", status.label())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_form_text(form: &FormUiState) -> String {
    let mut lines = LoanTypeField::ALL
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let pointer = if index == form.field { ">" } else { " " };
            let value = form.draft.value(*field);
            let value = if field.is_choice() {
                format!("< {value} >")
            } else {
                value
            };
            format!("{pointer} {:<22} {value}", field.label())
        })
        .collect::<Vec<_>>();
    if let Some(error) = &form.error {
        lines.push(String::new());
        lines.push(format!("error: {error}"));
    }
    lines.join("\n")
}

fn render_login_text(login: &LoginUiState) -> String {
    let pointer = |field| if login.focus == field { ">" } else { " " };
    let mut lines = vec![
        format!("{} email     {}", pointer(LoginField::Email), login.email),
        format!(
            "{} password  {}",
            pointer(LoginField::Password),
            "*".repeat(login.password.chars().count())
        ),
    ];
    if let Some(error) = &login.error {
        lines.push(String::new());
        lines.push(format!("error: {error}"));
    }
    lines.join("\n")
}

fn render_delete_overlay_text(flow: &DeleteFlow) -> Option<String> {
    match flow {
        DeleteFlow::Idle => None,
        DeleteFlow::ConfirmPending { target } => Some(format!(
            "Delete {} \"{}\"?\nThis action cannot be undone.\n\ny delete   n cancel",
            singular(target.tab),
            target.label
        )),
        DeleteFlow::Deleting { .. } => None,
        DeleteFlow::Success { message, .. } => Some(format!("{message}\n\npress any key")),
        DeleteFlow::Failure { message, .. } => {
            Some(format!("delete failed: {message}\n\npress any key"))
        }
    }
}

fn singular(tab: TabKind) -> &'static str {
    match tab {
        TabKind::Applications => "application",
        TabKind::LoanTypes => "loan type",
        TabKind::Customers => "customer",
        TabKind::Dashboard => "record",
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{
        AppRuntime, DashboardData, DetailView, FetchFailure, InternalEvent, LoginField, TabData,
        TabQuery, ViewData, ViewOptions, active_table, deleting_row, format_rupees,
        handle_key_event, page_bar_text, process_internal_events, render_dashboard_text,
        render_delete_overlay_text, render_form_text, render_status_picker_text,
    };
    use anyhow::{Result, anyhow, bail};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use loandesk_app::{
        AppMode, AppState, ApplicationStatus, CustomerId, CustomerProfile, DashboardStats, DeleteFlow,
        FilterAuthority, LoanApplication, LoanApplicationId, LoanType, LoanTypeFormInput,
        LoanTypeId, LoginInput, StatusUpdate, TabKind,
    };
    use loandesk_testkit::LoanFaker;
    use std::fmt;
    use std::sync::mpsc;
    use std::time::Duration;

    #[derive(Debug)]
    struct Expired;

    impl fmt::Display for Expired {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("session expired")
        }
    }

    impl std::error::Error for Expired {}

    #[derive(Debug, Default)]
    struct TestRuntime {
        logged_in: bool,
        expired: bool,
        failing_tab: Option<TabKind>,
        applications: Vec<LoanApplication>,
        loan_types: Vec<LoanType>,
        customers: Vec<CustomerProfile>,
        queries: Vec<(TabKind, TabQuery)>,
        deleted: Vec<(TabKind, String)>,
        submitted: Vec<(Option<LoanTypeId>, LoanTypeFormInput)>,
        status_updates: Vec<(String, ApplicationStatus)>,
    }

    impl TestRuntime {
        fn seeded() -> Self {
            let mut faker = LoanFaker::new(21);
            let portfolio = faker.portfolio(4, 12, 24);
            Self {
                logged_in: true,
                applications: portfolio.applications,
                loan_types: portfolio.loan_types,
                customers: portfolio.customers,
                ..Self::default()
            }
        }

        fn check(&self) -> Result<()> {
            if self.expired || !self.logged_in {
                return Err(Expired.into());
            }
            Ok(())
        }
    }

    impl AppRuntime for TestRuntime {
        fn has_session(&self) -> bool {
            self.logged_in
        }

        fn needs_login(&self, error: &anyhow::Error) -> bool {
            error.downcast_ref::<Expired>().is_some()
        }

        fn end_session(&mut self) {
            self.logged_in = false;
        }

        fn login(&mut self, input: &LoginInput) -> Result<()> {
            if input.password != "demo" {
                bail!("invalid email or password");
            }
            self.logged_in = true;
            self.expired = false;
            Ok(())
        }

        fn load_dashboard(&mut self) -> Result<DashboardData> {
            self.check()?;
            Ok(DashboardData {
                recent: self.applications.iter().take(5).cloned().collect(),
                ..DashboardData::default()
            })
        }

        fn load_tab(&mut self, tab: TabKind, query: &TabQuery) -> Result<TabData> {
            self.check()?;
            self.queries.push((tab, query.clone()));
            if self.failing_tab == Some(tab) {
                bail!("server returned 500");
            }
            match tab {
                TabKind::Applications => Ok(TabData::Applications(self.applications.clone())),
                TabKind::LoanTypes => Ok(TabData::LoanTypes(self.loan_types.clone())),
                TabKind::Customers => Ok(TabData::Customers(self.customers.clone())),
                TabKind::Dashboard => bail!("dashboard is not a list"),
            }
        }

        fn load_application(&mut self, id: &LoanApplicationId) -> Result<LoanApplication> {
            self.check()?;
            self.applications
                .iter()
                .find(|application| application.id == *id)
                .cloned()
                .ok_or_else(|| anyhow!("application not found"))
        }

        fn load_customer(&mut self, id: &CustomerId) -> Result<CustomerProfile> {
            self.check()?;
            if self.failing_tab == Some(TabKind::Customers) {
                bail!("customer not found");
            }
            self.customers
                .iter()
                .find(|customer| customer.id == *id)
                .cloned()
                .ok_or_else(|| anyhow!("customer not found"))
        }

        fn update_application_status(
            &mut self,
            application: &LoanApplication,
            status: ApplicationStatus,
        ) -> Result<StatusUpdate> {
            self.check()?;
            self.status_updates
                .push((application.id.to_string(), status));
            Ok(StatusUpdate::by_admin(status))
        }

        fn delete_record(&mut self, tab: TabKind, id: &str) -> Result<()> {
            self.check()?;
            self.deleted.push((tab, id.to_owned()));
            Ok(())
        }

        fn submit_loan_type(
            &mut self,
            id: Option<&LoanTypeId>,
            input: &LoanTypeFormInput,
        ) -> Result<()> {
            self.check()?;
            self.submitted.push((id.cloned(), input.clone()));
            Ok(())
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ch(c: char) -> KeyEvent {
        key(KeyCode::Char(c))
    }

    struct Harness {
        state: AppState,
        runtime: TestRuntime,
        view_data: ViewData,
        tx: mpsc::Sender<InternalEvent>,
        rx: mpsc::Receiver<InternalEvent>,
    }

    impl Harness {
        fn on(tab: TabKind, options: ViewOptions) -> Self {
            let (tx, rx) = mpsc::channel();
            let mut harness = Self {
                state: AppState {
                    active_tab: tab,
                    ..AppState::default()
                },
                runtime: TestRuntime::seeded(),
                view_data: ViewData::new(options),
                tx,
                rx,
            };
            super::fetch_tab(
                &mut harness.state,
                &mut harness.runtime,
                &mut harness.view_data,
                &harness.tx,
                tab,
            );
            harness.pump();
            harness
        }

        fn press(&mut self, keys: &[KeyEvent]) {
            for key in keys {
                let _ = handle_key_event(
                    &mut self.state,
                    &mut self.runtime,
                    &mut self.view_data,
                    &self.tx,
                    *key,
                );
                self.pump();
            }
        }

        fn pump(&mut self) {
            process_internal_events(
                &mut self.state,
                &mut self.runtime,
                &mut self.view_data,
                &self.tx,
                &self.rx,
            );
        }

        fn row_ids(&self) -> Vec<String> {
            active_table(self.state.active_tab, &self.view_data)
                .map(|model| model.ids)
                .unwrap_or_default()
        }
    }

    #[test]
    fn tab_keys_rotate_and_fetch_the_new_tab() {
        let mut h = Harness::on(TabKind::Applications, ViewOptions::default());
        assert_eq!(h.view_data.applications.records().len(), 24);

        h.press(&[ch('f')]);
        assert_eq!(h.state.active_tab, TabKind::LoanTypes);
        assert_eq!(h.view_data.loan_types.records().len(), 4);

        h.press(&[ch('b'), ch('b')]);
        assert_eq!(h.state.active_tab, TabKind::Dashboard);
        assert_eq!(
            h.view_data.dashboard.as_ref().map(|data| data.recent.len()),
            Some(5)
        );
    }

    #[test]
    fn stale_tab_results_are_ignored() {
        let mut h = Harness::on(TabKind::Customers, ViewOptions::default());
        let stale = h.view_data.customers.begin();
        let latest = h.view_data.customers.begin();

        let only_first = h.runtime.customers[..1].to_vec();
        h.tx
            .send(InternalEvent::TabLoaded {
                request_id: latest,
                tab: TabKind::Customers,
                result: Ok(TabData::Customers(only_first.clone())),
            })
            .expect("send latest");
        h.tx
            .send(InternalEvent::TabLoaded {
                request_id: stale,
                tab: TabKind::Customers,
                result: Ok(TabData::Customers(h.runtime.customers.clone())),
            })
            .expect("send stale");
        h.pump();

        assert_eq!(h.view_data.customers.records(), only_first.as_slice());
        assert!(!h.view_data.customers.is_loading());
    }

    #[test]
    fn fetch_error_leaves_empty_table_and_status_message() {
        let mut h = Harness::on(TabKind::Applications, ViewOptions::default());
        h.runtime.failing_tab = Some(TabKind::Applications);
        h.press(&[ch('r')]);

        assert!(h.view_data.applications.records().is_empty());
        assert!(h.row_ids().is_empty());
        let status = h.state.status_line.clone().unwrap_or_default();
        assert!(status.contains("applications load failed"), "{status}");
        assert!(status.contains("server returned 500"), "{status}");
    }

    #[test]
    fn expired_session_switches_to_login_and_back() {
        let mut h = Harness::on(TabKind::Applications, ViewOptions::default());
        h.runtime.expired = true;
        h.press(&[ch('f')]);

        assert_eq!(h.state.mode, AppMode::Login);
        assert!(!h.runtime.logged_in);
        assert_eq!(
            h.state.status_line.as_deref(),
            Some(loandesk_app::SESSION_EXPIRED)
        );

        h.press(&[ch('a'), ch('@'), ch('b'), key(KeyCode::Tab), ch('x')]);
        h.press(&[key(KeyCode::Enter)]);
        assert_eq!(h.state.mode, AppMode::Login);
        assert!(h.view_data.login.error.is_some());
        assert!(h.view_data.login.password.is_empty());

        h.press(&[ch('d'), ch('e'), ch('m'), ch('o'), key(KeyCode::Enter)]);
        assert_eq!(h.state.mode, AppMode::Nav);
        assert_eq!(h.view_data.login.focus, LoginField::Email);
        assert_eq!(h.view_data.loan_types.records().len(), 4);
    }

    #[test]
    fn confirmed_delete_removes_row_and_schedules_refresh() {
        let mut h = Harness::on(TabKind::Customers, ViewOptions::default());
        h.press(&[ch('j')]);
        let victim = h.row_ids()[1].clone();

        h.press(&[ch('d')]);
        assert_eq!(h.state.mode, AppMode::Confirm);
        let overlay = render_delete_overlay_text(&h.view_data.delete).unwrap_or_default();
        assert!(overlay.contains("cannot be undone"));

        let _ = handle_key_event(
            &mut h.state,
            &mut h.runtime,
            &mut h.view_data,
            &h.tx,
            ch('y'),
        );
        assert_eq!(h.runtime.deleted, vec![(TabKind::Customers, victim.clone())]);
        assert!(matches!(h.view_data.delete, DeleteFlow::Deleting { .. }));
        assert_eq!(h.view_data.delete.deleting_id(), Some(victim.as_str()));
        assert!(h.view_data.customers.find(&victim).is_some());

        h.pump();
        assert!(h.view_data.customers.find(&victim).is_none());
        assert!(matches!(
            &h.view_data.delete,
            DeleteFlow::Success { message, .. } if message == "Customer deleted successfully!"
        ));
        assert_eq!(h.state.mode, AppMode::Nav);

        let refresh = (0..5).find_map(|_| match h.rx.recv_timeout(Duration::from_secs(3)) {
            Ok(InternalEvent::Refresh { tab }) => Some(tab),
            _ => None,
        });
        assert_eq!(refresh, Some(TabKind::Customers));

        h.press(&[ch('x')]);
        assert_eq!(h.view_data.delete, DeleteFlow::Idle);
    }

    #[test]
    fn row_being_deleted_is_marked_and_cannot_be_deleted_twice() {
        let mut h = Harness::on(TabKind::LoanTypes, ViewOptions::default());
        let victim = h.row_ids()[0].clone();
        h.press(&[ch('d')]);
        let _ = handle_key_event(
            &mut h.state,
            &mut h.runtime,
            &mut h.view_data,
            &h.tx,
            ch('y'),
        );

        let model = active_table(TabKind::LoanTypes, &h.view_data).expect("table");
        assert_eq!(deleting_row(&model, &h.view_data.delete), Some(0));
        assert_eq!(render_delete_overlay_text(&h.view_data.delete), None);
        assert!(
            h.state
                .status_line
                .as_deref()
                .is_some_and(|status| status.starts_with("deleting "))
        );

        let _ = handle_key_event(
            &mut h.state,
            &mut h.runtime,
            &mut h.view_data,
            &h.tx,
            ch('d'),
        );
        assert_eq!(h.state.mode, AppMode::Nav);
        assert_eq!(h.view_data.delete.deleting_id(), Some(victim.as_str()));
        assert!(
            h.state
                .status_line
                .as_deref()
                .is_some_and(|status| status.contains("still being deleted"))
        );

        h.pump();
        assert!(matches!(h.view_data.delete, DeleteFlow::Success { .. }));
        assert_eq!(h.runtime.deleted.len(), 1);
        let model = active_table(TabKind::LoanTypes, &h.view_data).expect("table");
        assert_eq!(deleting_row(&model, &h.view_data.delete), None);
    }

    #[test]
    fn delete_outcome_for_another_row_is_ignored() {
        let mut h = Harness::on(TabKind::Customers, ViewOptions::default());
        h.view_data.delete = DeleteFlow::Idle;
        h.tx.send(InternalEvent::DeleteFinished {
            tab: TabKind::Customers,
            id: "stale".to_owned(),
            result: Ok(()),
        })
        .expect("send");
        h.pump();
        assert_eq!(h.view_data.delete, DeleteFlow::Idle);
        assert_eq!(h.view_data.customers.records().len(), 12);
    }

    #[test]
    fn expired_session_during_delete_returns_to_login() {
        let mut h = Harness::on(TabKind::Customers, ViewOptions::default());
        h.press(&[ch('d')]);
        h.runtime.expired = true;
        h.press(&[ch('y')]);
        assert_eq!(h.state.mode, AppMode::Login);
        assert_eq!(h.view_data.delete, DeleteFlow::Idle);
        assert_eq!(h.view_data.customers.records().len(), 12);
    }

    #[test]
    fn declining_confirmation_deletes_nothing() {
        let mut h = Harness::on(TabKind::LoanTypes, ViewOptions::default());
        h.press(&[ch('d'), ch('n')]);
        assert!(h.runtime.deleted.is_empty());
        assert_eq!(h.view_data.loan_types.records().len(), 4);
        assert_eq!(h.view_data.delete, DeleteFlow::Idle);
        assert_eq!(h.state.mode, AppMode::Nav);
    }

    #[test]
    fn applications_cannot_be_deleted() {
        let mut h = Harness::on(TabKind::Applications, ViewOptions::default());
        h.press(&[ch('d')]);
        assert_eq!(h.state.mode, AppMode::Nav);
        assert_eq!(h.view_data.delete, DeleteFlow::Idle);
    }

    #[test]
    fn status_picker_updates_detail_and_list() {
        let mut h = Harness::on(TabKind::Applications, ViewOptions::default());
        let id = h.row_ids()[0].clone();

        h.press(&[key(KeyCode::Enter)]);
        assert_eq!(h.state.mode, AppMode::Detail);
        h.press(&[ch('u')]);
        assert_eq!(h.state.mode, AppMode::StatusPicker);

        // Walk to the top of the list, then down once: approved.
        h.press(&[ch('k'), ch('k'), ch('k'), ch('j'), key(KeyCode::Enter)]);
        assert_eq!(h.state.mode, AppMode::Detail);
        assert_eq!(
            h.runtime.status_updates,
            vec![(id.clone(), ApplicationStatus::Approved)]
        );
        assert_eq!(
            h.view_data.applications.find(&id).map(|a| a.status),
            Some(ApplicationStatus::Approved)
        );
        assert!(matches!(
            &h.view_data.detail,
            Some(DetailView::Application(a)) if a.status == ApplicationStatus::Approved
        ));

        h.press(&[key(KeyCode::Esc)]);
        assert_eq!(h.state.mode, AppMode::Nav);
        assert!(h.view_data.detail.is_none());
    }

    #[test]
    fn failed_detail_shows_error_view() {
        let mut h = Harness::on(TabKind::Customers, ViewOptions::default());
        h.runtime.failing_tab = Some(TabKind::Customers);
        h.press(&[key(KeyCode::Enter)]);
        assert_eq!(h.state.mode, AppMode::Detail);
        assert_eq!(
            h.view_data.detail,
            Some(DetailView::Error("customer not found".to_owned()))
        );
        h.press(&[key(KeyCode::Esc)]);
        assert_eq!(h.state.mode, AppMode::Nav);
    }

    #[test]
    fn search_narrows_rows_as_you_type() {
        let mut h = Harness::on(TabKind::Customers, ViewOptions::default());
        let target = h.runtime.customers[5].clone();
        let name = target.full_name.clone().unwrap_or_default();

        h.press(&[ch('/')]);
        assert_eq!(h.state.mode, AppMode::Search);
        let keys: Vec<KeyEvent> = name.chars().map(ch).collect();
        h.press(&keys);
        h.press(&[key(KeyCode::Esc)]);

        assert_eq!(h.state.mode, AppMode::Nav);
        let rows = h.row_ids();
        assert!(rows.contains(&target.id.to_string()));
        for id in rows {
            let customer = h.view_data.customers.find(&id).expect("row exists");
            let full = customer.full_name.clone().unwrap_or_default().to_lowercase();
            let email = customer.email.clone().unwrap_or_default().to_lowercase();
            let needle = name.to_lowercase();
            assert!(full.contains(&needle) || email.contains(&needle));
        }
    }

    #[test]
    fn status_filter_cycles_and_clears() {
        let mut h = Harness::on(TabKind::Applications, ViewOptions::default());
        h.press(&[ch('c')]);
        assert_eq!(
            h.view_data.application_view.filter.exact_value("status"),
            "pending"
        );
        for id in h.row_ids() {
            assert_eq!(
                h.view_data.applications.find(&id).map(|a| a.status),
                Some(ApplicationStatus::Pending)
            );
        }

        h.press(&[ch('c'), ch('c'), ch('c'), ch('c')]);
        assert_eq!(h.view_data.application_view.filter.exact_value("status"), "");
        assert_eq!(h.row_ids().len(), 10);
    }

    #[test]
    fn loan_type_filter_cycles_through_loaded_subcategories() {
        let mut h = Harness::on(TabKind::Applications, ViewOptions::default());
        let options = super::loan_type_options(&h.view_data);
        assert!(!options.is_empty());
        assert!(options.windows(2).all(|pair| pair[0] < pair[1]));

        h.press(&[ch('t')]);
        let chosen = h
            .view_data
            .application_view
            .filter
            .exact_value("loan_type.subcategory")
            .to_owned();
        assert_eq!(chosen, options[0]);
        let matching = h
            .view_data
            .applications
            .records()
            .iter()
            .filter(|application| {
                application.loan_type.subcategory.as_deref() == Some(chosen.as_str())
            })
            .count();
        assert_eq!(h.row_ids().len(), matching.min(10));
        for id in h.row_ids() {
            let application = h.view_data.applications.find(&id).expect("row exists");
            assert_eq!(
                application.loan_type.subcategory.as_deref(),
                Some(chosen.as_str())
            );
        }

        let presses = vec![ch('t'); options.len()];
        h.press(&presses);
        assert_eq!(
            h.view_data
                .application_view
                .filter
                .exact_value("loan_type.subcategory"),
            ""
        );
        assert_eq!(h.row_ids().len(), 10);
    }

    #[test]
    fn loan_type_filter_needs_loaded_loan_types() {
        let mut h = Harness::on(TabKind::Applications, ViewOptions::default());
        h.view_data.loan_types = Default::default();
        h.view_data.applications = Default::default();
        h.press(&[ch('t')]);
        assert_eq!(
            h.view_data
                .application_view
                .filter
                .exact_value("loan_type.subcategory"),
            ""
        );
        assert!(
            h.state
                .status_line
                .as_deref()
                .is_some_and(|status| status.contains("no loan types loaded"))
        );
    }

    #[test]
    fn applications_fetch_also_loads_loan_types() {
        let h = Harness::on(TabKind::Applications, ViewOptions::default());
        let tabs: Vec<TabKind> = h.runtime.queries.iter().map(|(tab, _)| *tab).collect();
        assert_eq!(tabs, vec![TabKind::LoanTypes, TabKind::Applications]);
        assert_eq!(h.view_data.loan_types.records().len(), 4);
    }

    #[test]
    fn server_authority_forwards_loan_type_filter() {
        let options = ViewOptions {
            filter_authority: FilterAuthority::Server,
            ..ViewOptions::default()
        };
        let mut h = Harness::on(TabKind::Applications, options);
        let expected = super::loan_type_options(&h.view_data)[0].clone();
        h.press(&[ch('t')]);

        let (tab, query) = h.runtime.queries.last().cloned().expect("a query was sent");
        assert_eq!(tab, TabKind::Applications);
        assert_eq!(query.loan_type, expected);
        assert_eq!(query.status, None);
        assert_eq!(h.row_ids().len(), 10);

        let local = super::tab_query(&h.view_data.application_view);
        assert_eq!(local.loan_type, expected);
    }

    #[test]
    fn server_authority_forwards_filters_and_skips_local_filtering() {
        let options = ViewOptions {
            filter_authority: FilterAuthority::Server,
            ..ViewOptions::default()
        };
        let mut h = Harness::on(TabKind::Applications, options);
        h.press(&[ch('c')]);
        h.press(&[ch('/'), ch('z'), ch('z'), key(KeyCode::Enter)]);

        let (tab, query) = h.runtime.queries.last().cloned().expect("a query was sent");
        assert_eq!(tab, TabKind::Applications);
        assert_eq!(query.status, Some(ApplicationStatus::Pending));
        assert_eq!(query.search, "zz");
        // The server answered with everything; nothing is filtered again here.
        assert_eq!(h.row_ids().len(), 10);
    }

    #[test]
    fn paging_keys_stay_within_bounds() {
        let mut h = Harness::on(TabKind::Applications, ViewOptions::default());
        h.press(&[ch('p')]);
        assert_eq!(h.view_data.application_view.pagination.current_page(), 1);

        h.press(&[ch('n'), ch('n'), ch('n')]);
        assert_eq!(h.view_data.application_view.pagination.current_page(), 3);
        assert_eq!(h.row_ids().len(), 4);

        h.press(&[ch('-')]);
        assert_eq!(h.view_data.application_view.pagination.page_size(), 5);
        assert_eq!(h.view_data.application_view.pagination.current_page(), 1);

        let model = active_table(TabKind::Applications, &h.view_data).expect("table");
        let bar = page_bar_text(&model);
        assert!(bar.starts_with("page 1 of 5  [1] 2 3 4 5"), "{bar}");
    }

    #[test]
    fn blank_loan_type_form_reports_validation_error() {
        let mut h = Harness::on(TabKind::LoanTypes, ViewOptions::default());
        h.press(&[ch('a')]);
        assert!(matches!(h.state.mode, AppMode::Form(_)));
        h.press(&[key(KeyCode::Enter)]);

        let error = h
            .view_data
            .form
            .as_ref()
            .and_then(|form| form.error.clone())
            .unwrap_or_default();
        assert!(error.contains("loan name is required"), "{error}");
        assert!(h.runtime.submitted.is_empty());
        assert!(render_form_text(h.view_data.form.as_ref().expect("form")).contains("error:"));
    }

    #[test]
    fn edited_loan_type_is_submitted_with_its_id() {
        let mut h = Harness::on(TabKind::LoanTypes, ViewOptions::default());
        let id = h.row_ids()[0].clone();
        h.press(&[ch('e')]);
        h.press(&[ch('!'), key(KeyCode::Enter)]);

        assert_eq!(h.state.mode, AppMode::Nav);
        assert!(h.view_data.form.is_none());
        let (submitted_id, input) = h.runtime.submitted[0].clone();
        assert_eq!(submitted_id, Some(LoanTypeId::from(id.as_str())));
        assert!(input.name.ends_with('!'));
        assert_eq!(h.state.status_line.as_deref(), Some("loan type updated"));
    }

    #[test]
    fn rupee_amounts_use_indian_grouping() {
        assert_eq!(format_rupees(0.0), "₹0");
        assert_eq!(format_rupees(950.0), "₹950");
        assert_eq!(format_rupees(1_234_567.0), "₹12,34,567");
        assert_eq!(format_rupees(250_000.0), "₹2,50,000");
    }

    #[test]
    fn dashboard_and_picker_text() {
        assert!(render_dashboard_text(None).contains("press r"));
        let without = render_dashboard_text(Some(&DashboardData::default()));
        assert!(without.contains("analytics unavailable"));
        let picker = render_status_picker_text(Some(ApplicationStatus::Pending), 2);
        assert!(picker.contains("Pending (current)"));
        assert!(picker.lines().nth(2).is_some_and(|line| line.starts_with('>')));
    }

    #[test]
    fn dashboard_shows_status_shares_from_analytics() {
        let data = DashboardData {
            analytics: Some(DashboardStats {
                total_applications: 8,
                pending_applications: 2,
                approved_applications: 4,
                rejected_applications: 2,
                ..DashboardStats::default()
            }),
            ..DashboardData::default()
        };
        let text = render_dashboard_text(Some(&data));
        assert!(text.contains("applications by status"));
        let approved = text
            .lines()
            .find(|line| line.trim_start().starts_with("approved "))
            .expect("approved share line");
        assert!(approved.contains("##########.........."), "{approved}");
        assert!(approved.contains(" 50%"), "{approved}");
        assert!(text.lines().any(|line| line.contains(" 25%  (2)")));

        let empty = DashboardData {
            analytics: Some(DashboardStats::default()),
            ..DashboardData::default()
        };
        assert!(render_dashboard_text(Some(&empty)).contains("  0%  (0)"));
    }

    #[test]
    fn fetch_failure_marks_login_requirement() {
        let runtime = TestRuntime::default();
        let failure = runtime.fetch_failure(&anyhow::Error::new(Expired));
        assert_eq!(
            failure,
            FetchFailure {
                message: "session expired".to_owned(),
                login_required: true,
            }
        );
    }
}

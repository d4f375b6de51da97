// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow, bail};
use loandesk_api::{
    ApplicationQuery, CustomerQuery, LoanApi, LoanTypeQuery, RECENT_APPLICATIONS_LIMIT, Session,
    is_unauthenticated,
};
use loandesk_app::{
    ApplicationStatus, CustomerId, CustomerProfile, LoanApplication, LoanApplicationId,
    LoanTypeFormInput, LoanTypeId, LoginInput, StatusUpdate, TabKind, TransitionPolicy,
    check_transition,
};
use loandesk_tui::{DashboardData, FetchFailure, InternalEvent, TabData, TabQuery};
use std::sync::mpsc::Sender;
use std::thread;
use tracing::{debug, info, warn};

/// Bridges the terminal UI to a [`LoanApi`] backend. Owns the session; any
/// call answered with an unauthenticated error clears it.
pub struct ApiRuntime<A> {
    api: A,
    session: Session,
    policy: Box<dyn TransitionPolicy>,
}

impl<A> ApiRuntime<A>
where
    A: LoanApi + Clone + Send + Sync + 'static,
{
    pub fn new(api: A, session: Session, policy: Box<dyn TransitionPolicy>) -> Self {
        Self {
            api,
            session,
            policy,
        }
    }

    fn guard<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(error) = &result
            && is_unauthenticated(error)
            && self.session.is_authenticated()
        {
            info!("session rejected by server; clearing token");
            self.session.clear();
        }
        result
    }
}

fn fetch_tab<A: LoanApi>(
    api: &A,
    session: &Session,
    tab: TabKind,
    query: &TabQuery,
) -> Result<TabData> {
    let search = query.search.trim().to_owned();
    match tab {
        TabKind::Dashboard => bail!("the dashboard is not a list -- load it with load_dashboard"),
        TabKind::Applications => {
            let page = api.list_applications(
                session,
                &ApplicationQuery {
                    status: query.status,
                    loan_type: query.loan_type.trim().to_owned(),
                    search,
                    ..ApplicationQuery::default()
                },
            )?;
            Ok(TabData::Applications(page.applications))
        }
        TabKind::LoanTypes => Ok(TabData::LoanTypes(api.list_loan_types(
            session,
            &LoanTypeQuery {
                category: query.category,
                search,
                ..LoanTypeQuery::default()
            },
        )?)),
        TabKind::Customers => Ok(TabData::Customers(
            api.list_customers(session, &CustomerQuery { search })?,
        )),
    }
}

fn delete_row<A: LoanApi>(api: &A, session: &Session, tab: TabKind, id: &str) -> Result<()> {
    match tab {
        TabKind::LoanTypes => api.delete_loan_type(session, &LoanTypeId::new(id)),
        TabKind::Customers => api.delete_customer(session, &CustomerId::new(id)),
        TabKind::Dashboard | TabKind::Applications => {
            bail!("{} rows cannot be deleted", tab.label().to_lowercase())
        }
    }
}

impl<A> loandesk_tui::AppRuntime for ApiRuntime<A>
where
    A: LoanApi + Clone + Send + Sync + 'static,
{
    fn has_session(&self) -> bool {
        self.session.is_authenticated()
    }

    fn needs_login(&self, error: &anyhow::Error) -> bool {
        is_unauthenticated(error)
    }

    fn end_session(&mut self) {
        info!("session ended");
        self.session.clear();
    }

    fn login(&mut self, input: &LoginInput) -> Result<()> {
        input.validate()?;
        let token = self.api.login(input)?;
        self.session.set_token(token);
        info!(email = %input.email.trim(), "logged in");
        Ok(())
    }

    fn load_dashboard(&mut self) -> Result<DashboardData> {
        let api = &self.api;
        let session = &self.session;
        let (stats, analytics, recent) = thread::scope(|scope| {
            let stats = scope.spawn(|| api.dashboard_stats(session));
            let analytics = scope.spawn(|| api.analytics_stats(session));
            let recent = scope.spawn(|| api.recent_applications(session, RECENT_APPLICATIONS_LIMIT));
            (
                stats
                    .join()
                    .map_err(|_| anyhow!("dashboard stats worker panicked")),
                analytics
                    .join()
                    .map_err(|_| anyhow!("analytics worker panicked")),
                recent
                    .join()
                    .map_err(|_| anyhow!("recent applications worker panicked")),
            )
        });
        let stats = self.guard(stats?)?;
        let recent = self.guard(recent?)?;
        // The analytics panel is optional; the rest of the dashboard still renders.
        let analytics = match self.guard(analytics?) {
            Ok(analytics) => Some(analytics),
            Err(error) if is_unauthenticated(&error) => return Err(error),
            Err(error) => {
                warn!(error = %format!("{error:#}"), "analytics unavailable");
                None
            }
        };
        debug!(recent = recent.len(), "dashboard loaded");
        Ok(DashboardData {
            stats,
            recent,
            analytics,
        })
    }

    fn load_tab(&mut self, tab: TabKind, query: &TabQuery) -> Result<TabData> {
        let result = fetch_tab(&self.api, &self.session, tab, query);
        self.guard(result)
    }

    fn spawn_tab_fetch(
        &mut self,
        request_id: u64,
        tab: TabKind,
        query: &TabQuery,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let api = self.api.clone();
        let session = self.session.clone();
        let query = query.clone();
        debug!(request_id, tab = tab.label(), "spawning tab fetch");
        thread::Builder::new()
            .name(format!("fetch-{}", tab.label().to_lowercase()))
            .spawn(move || {
                let result = fetch_tab(&api, &session, tab, &query).map_err(|error| {
                    warn!(request_id, error = %format!("{error:#}"), "tab fetch failed");
                    FetchFailure {
                        message: format!("{error:#}"),
                        login_required: is_unauthenticated(&error),
                    }
                });
                // The receiver is gone once the UI exits; nothing left to update.
                let _ = tx.send(InternalEvent::TabLoaded {
                    request_id,
                    tab,
                    result,
                });
            })
            .map_err(|error| anyhow!("spawn tab fetch thread: {error}"))?;
        Ok(())
    }

    fn load_application(&mut self, id: &LoanApplicationId) -> Result<LoanApplication> {
        let result = self.api.get_application(&self.session, id);
        self.guard(result)
    }

    fn load_customer(&mut self, id: &CustomerId) -> Result<CustomerProfile> {
        let result = self.api.get_customer(&self.session, id);
        self.guard(result)
    }

    fn update_application_status(
        &mut self,
        application: &LoanApplication,
        status: ApplicationStatus,
    ) -> Result<StatusUpdate> {
        check_transition(self.policy.as_ref(), application.status, status)?;
        let update = StatusUpdate::by_admin(status);
        let result = self
            .api
            .update_application_status(&self.session, &application.id, &update);
        self.guard(result)?;
        info!(
            application = application.id.as_str(),
            status = status.as_str(),
            "application status updated"
        );
        Ok(update)
    }

    fn delete_record(&mut self, tab: TabKind, id: &str) -> Result<()> {
        let result = delete_row(&self.api, &self.session, tab, id);
        self.guard(result)?;
        info!(tab = tab.label(), id, "record deleted");
        Ok(())
    }

    fn spawn_delete(&mut self, tab: TabKind, id: &str, tx: Sender<InternalEvent>) -> Result<()> {
        let api = self.api.clone();
        let session = self.session.clone();
        let id = id.to_owned();
        debug!(tab = tab.label(), id = %id, "spawning delete");
        thread::Builder::new()
            .name(format!("delete-{}", tab.label().to_lowercase()))
            .spawn(move || {
                let result = match delete_row(&api, &session, tab, &id) {
                    Ok(()) => {
                        info!(tab = tab.label(), id = %id, "record deleted");
                        Ok(())
                    }
                    Err(error) => {
                        warn!(id = %id, error = %format!("{error:#}"), "delete failed");
                        Err(FetchFailure {
                            message: format!("{error:#}"),
                            login_required: is_unauthenticated(&error),
                        })
                    }
                };
                let _ = tx.send(InternalEvent::DeleteFinished { tab, id, result });
            })
            .map_err(|error| anyhow!("spawn delete thread: {error}"))?;
        Ok(())
    }

    fn submit_loan_type(
        &mut self,
        id: Option<&LoanTypeId>,
        input: &LoanTypeFormInput,
    ) -> Result<()> {
        input.validate()?;
        let result = match id {
            Some(id) => self.api.update_loan_type(&self.session, id, input),
            None => self.api.create_loan_type(&self.session, input),
        };
        self.guard(result)?;
        info!(name = input.name.trim(), update = id.is_some(), "loan type saved");
        Ok(())
    }
}

// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow, bail};
use loandesk_app::{
    AmountRange, ApplicationStatus, CustomerId, CustomerProfile, DashboardStats, LoanApplication,
    LoanApplicationId, LoanType, LoanTypeFormInput, LoanTypeId, LoginInput, RateRange,
    StatusUpdate, TenureRange,
};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;
use time::OffsetDateTime;

use crate::{
    ApiError, ApplicationPage, ApplicationQuery, CustomerQuery, LoanApi, LoanTypeQuery, Session,
};

pub const DEMO_EMAIL: &str = "admin@loandesk.test";
pub const DEMO_PASSWORD: &str = "demo";

#[derive(Debug, Default)]
struct MemoryState {
    loan_types: Vec<LoanType>,
    customers: Vec<CustomerProfile>,
    applications: Vec<LoanApplication>,
    token: Option<String>,
    issued: u64,
    next_id: u64,
    calls: Vec<String>,
}

/// In-process lending backend. Applies the same server-side filters the
/// remote API does and demands a token it issued itself.
#[derive(Debug, Clone, Default)]
pub struct MemoryApi {
    state: Arc<Mutex<MemoryState>>,
    latency: Duration,
}

fn contains(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|value| value.to_lowercase().contains(needle))
}

impl MemoryApi {
    pub fn new(
        loan_types: Vec<LoanType>,
        customers: Vec<CustomerProfile>,
        applications: Vec<LoanApplication>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                loan_types,
                customers,
                applications,
                ..MemoryState::default()
            })),
            latency: Duration::ZERO,
        }
    }

    /// Delays every call, so the terminal shows loading states in demos.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Issues a token without going through `login`.
    pub fn issue_token(&self) -> Result<String> {
        let mut state = self.lock()?;
        state.issued += 1;
        let token = format!("demo-token-{}", state.issued);
        state.token = Some(token.clone());
        Ok(token)
    }

    /// Invalidates the current token; the next call answers unauthenticated.
    pub fn expire_sessions(&self) -> Result<()> {
        self.lock()?.token = None;
        Ok(())
    }

    /// Names of the calls served so far, in order.
    pub fn calls(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.calls.clone())
    }

    pub fn loan_types(&self) -> Result<Vec<LoanType>> {
        Ok(self.lock()?.loan_types.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("memory backend lock poisoned"))
    }

    fn authorized(&self, session: &Session, call: &str) -> Result<MutexGuard<'_, MemoryState>> {
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
        let mut state = self.lock()?;
        state.calls.push(call.to_owned());
        if state.token.is_none() || state.token.as_deref() != session.token() {
            return Err(ApiError::Unauthenticated.into());
        }
        Ok(state)
    }
}

fn not_found(what: String) -> anyhow::Error {
    ApiError::NotFound { what }.into()
}

fn loan_type_from_input(id: LoanTypeId, input: &LoanTypeFormInput) -> LoanType {
    LoanType {
        id,
        name: input.name.clone(),
        category: input.category,
        subcategory: input.subcategory.clone(),
        amount: AmountRange {
            min: input.min_amount.unwrap_or(0.0),
            max: input.max_amount.unwrap_or(0.0),
        },
        interest_rate: RateRange {
            min: input.interest_min,
            max: input.interest_max,
        },
        tenure: TenureRange {
            min_months: input.tenure_min_months,
            max_months: input.tenure_max_months,
        },
        processing_fee: input.processing_fee.clone(),
        eligibility_criteria: input.eligibility_criteria.clone(),
        required_documents: input.required_documents.clone(),
        status: input.status,
    }
}

fn compute_stats(state: &MemoryState) -> DashboardStats {
    let count = |status: ApplicationStatus| {
        state
            .applications
            .iter()
            .filter(|application| application.status == status)
            .count() as u64
    };

    let processing: Vec<f64> = state
        .applications
        .iter()
        .filter(|application| application.status != ApplicationStatus::Pending)
        .filter_map(|application| {
            let elapsed = application.updated_at? - application.applied_at?;
            Some(elapsed.as_seconds_f64() / 86_400.0)
        })
        .collect();
    let avg_processing_days =
        (!processing.is_empty()).then(|| processing.iter().sum::<f64>() / processing.len() as f64);

    DashboardStats {
        total_applications: state.applications.len() as u64,
        pending_applications: count(ApplicationStatus::Pending),
        approved_applications: count(ApplicationStatus::Approved),
        rejected_applications: count(ApplicationStatus::Rejected),
        total_clients: state.customers.len() as u64,
        total_disbursed: state
            .applications
            .iter()
            .filter(|application| application.status == ApplicationStatus::Disbursed)
            .filter_map(|application| application.amount)
            .sum(),
        active_loans: count(ApplicationStatus::Disbursed),
        avg_processing_days,
    }
}

impl LoanApi for MemoryApi {
    fn login(&self, input: &LoginInput) -> Result<String> {
        input.validate()?;
        self.lock()?.calls.push("login".to_owned());
        if input.email.trim() != DEMO_EMAIL || input.password != DEMO_PASSWORD {
            bail!("invalid email or password -- check your credentials and retry");
        }
        self.issue_token()
    }

    fn list_applications(
        &self,
        session: &Session,
        query: &ApplicationQuery,
    ) -> Result<ApplicationPage> {
        let state = self.authorized(session, "list_applications")?;
        let needle = query.search.trim().to_lowercase();
        let loan_type = query.loan_type.trim();

        let matched: Vec<LoanApplication> = state
            .applications
            .iter()
            .filter(|application| query.status.is_none_or(|status| application.status == status))
            .filter(|application| {
                loan_type.is_empty()
                    || application.loan_type.subcategory.as_deref() == Some(loan_type)
            })
            .filter(|application| {
                needle.is_empty()
                    || contains(application.applicant.full_name.as_deref(), &needle)
                    || contains(application.applicant.email.as_deref(), &needle)
                    || contains(Some(application.id.as_str()), &needle)
            })
            .cloned()
            .collect();

        let total_count = matched.len();
        let applications = match query.limit {
            Some(limit) if limit > 0 => {
                let page = query.page.unwrap_or(1).max(1);
                matched
                    .into_iter()
                    .skip((page - 1) * limit)
                    .take(limit)
                    .collect()
            }
            _ => matched,
        };
        Ok(ApplicationPage {
            applications,
            total_count,
        })
    }

    fn get_application(
        &self,
        session: &Session,
        id: &LoanApplicationId,
    ) -> Result<LoanApplication> {
        let state = self.authorized(session, "get_application")?;
        state
            .applications
            .iter()
            .find(|application| &application.id == id)
            .cloned()
            .ok_or_else(|| not_found(format!("loan application {id}")))
    }

    fn update_application_status(
        &self,
        session: &Session,
        id: &LoanApplicationId,
        update: &StatusUpdate,
    ) -> Result<()> {
        let mut state = self.authorized(session, "update_application_status")?;
        let application = state
            .applications
            .iter_mut()
            .find(|application| &application.id == id)
            .ok_or_else(|| not_found(format!("loan application {id}")))?;
        application.status = update.status;
        application.updated_at = Some(OffsetDateTime::now_utc());
        Ok(())
    }

    fn list_loan_types(&self, session: &Session, query: &LoanTypeQuery) -> Result<Vec<LoanType>> {
        let state = self.authorized(session, "list_loan_types")?;
        let needle = query.search.trim().to_lowercase();
        Ok(state
            .loan_types
            .iter()
            .filter(|loan_type| query.category.is_none_or(|c| loan_type.category == c))
            .filter(|loan_type| query.status.is_none_or(|s| loan_type.status == s))
            .filter(|loan_type| {
                needle.is_empty()
                    || contains(Some(&loan_type.name), &needle)
                    || contains(Some(loan_type.id.as_str()), &needle)
            })
            .cloned()
            .collect())
    }

    fn create_loan_type(&self, session: &Session, input: &LoanTypeFormInput) -> Result<()> {
        input.validate()?;
        let mut state = self.authorized(session, "create_loan_type")?;
        state.next_id += 1;
        let id = LoanTypeId::new(format!("lt-{:04}", state.next_id));
        state.loan_types.push(loan_type_from_input(id, input));
        Ok(())
    }

    fn update_loan_type(
        &self,
        session: &Session,
        id: &LoanTypeId,
        input: &LoanTypeFormInput,
    ) -> Result<()> {
        input.validate()?;
        let mut state = self.authorized(session, "update_loan_type")?;
        let slot = state
            .loan_types
            .iter_mut()
            .find(|loan_type| &loan_type.id == id)
            .ok_or_else(|| not_found(format!("loan type {id}")))?;
        *slot = loan_type_from_input(id.clone(), input);
        Ok(())
    }

    fn delete_loan_type(&self, session: &Session, id: &LoanTypeId) -> Result<()> {
        let mut state = self.authorized(session, "delete_loan_type")?;
        let before = state.loan_types.len();
        state.loan_types.retain(|loan_type| &loan_type.id != id);
        if state.loan_types.len() == before {
            return Err(not_found(format!("loan type {id}")));
        }
        Ok(())
    }

    fn list_customers(
        &self,
        session: &Session,
        query: &CustomerQuery,
    ) -> Result<Vec<CustomerProfile>> {
        let state = self.authorized(session, "list_customers")?;
        let needle = query.search.trim().to_lowercase();
        Ok(state
            .customers
            .iter()
            .filter(|customer| {
                needle.is_empty()
                    || contains(customer.full_name.as_deref(), &needle)
                    || contains(customer.email.as_deref(), &needle)
                    || contains(customer.phone.as_deref(), &needle)
            })
            .cloned()
            .collect())
    }

    fn get_customer(&self, session: &Session, id: &CustomerId) -> Result<CustomerProfile> {
        let state = self.authorized(session, "get_customer")?;
        state
            .customers
            .iter()
            .find(|customer| &customer.id == id)
            .cloned()
            .ok_or_else(|| not_found(format!("customer {id}")))
    }

    fn delete_customer(&self, session: &Session, id: &CustomerId) -> Result<()> {
        let mut state = self.authorized(session, "delete_customer")?;
        let before = state.customers.len();
        state.customers.retain(|customer| &customer.id != id);
        if state.customers.len() == before {
            return Err(not_found(format!("customer {id}")));
        }
        Ok(())
    }

    fn dashboard_stats(&self, session: &Session) -> Result<DashboardStats> {
        let state = self.authorized(session, "dashboard_stats")?;
        Ok(compute_stats(&state))
    }

    fn analytics_stats(&self, session: &Session) -> Result<DashboardStats> {
        let state = self.authorized(session, "analytics_stats")?;
        Ok(compute_stats(&state))
    }

    fn recent_applications(
        &self,
        session: &Session,
        limit: usize,
    ) -> Result<Vec<LoanApplication>> {
        let state = self.authorized(session, "recent_applications")?;
        let mut recent = state.applications.clone();
        recent.sort_by(|left, right| right.applied_at.cmp(&left.applied_at));
        recent.truncate(limit);
        Ok(recent)
    }
}

// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod memory;

pub use memory::{DEMO_EMAIL, DEMO_PASSWORD, MemoryApi};

use anyhow::{Context, Result};
use loandesk_app::normalize::{
    normalize_application, normalize_customer, normalize_list, normalize_loan_type,
    normalize_stats, resolve_chain, resolve_path,
};
use loandesk_app::{
    ApplicationStatus, CustomerId, CustomerProfile, DashboardStats, LoanApplication,
    LoanApplicationId, LoanCategory, LoanType, LoanTypeFormInput, LoanTypeId, LoanTypeStatus,
    LoginInput, StatusUpdate,
};
use reqwest::blocking::{Client as HttpClient, RequestBuilder};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const RECENT_APPLICATIONS_LIMIT: usize = 5;

/// Credential context threaded through every request. Nothing here is read
/// from ambient storage.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    token: Option<String>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

impl Session {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|token| !token.trim().is_empty()),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    pub fn clear(&mut self) {
        self.token = None;
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

/// Failures the caller is expected to branch on.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No response reached us.
    #[error("network error: unable to reach {base_url} -- check api.base_url and retry ({detail})")]
    Transport { base_url: String, detail: String },

    /// Any 401. The session is no longer valid.
    #[error("session expired -- log in again")]
    Unauthenticated,

    /// 404, or a detail envelope with no record in it.
    #[error("{what} not found")]
    NotFound { what: String },

    /// Any other non-success status, with the best message the body offered.
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("decode {what}: {detail}")]
    Decode { what: String, detail: String },
}

pub fn is_unauthenticated(error: &anyhow::Error) -> bool {
    matches!(
        error.downcast_ref::<ApiError>(),
        Some(ApiError::Unauthenticated)
    )
}

pub fn is_not_found(error: &anyhow::Error) -> bool {
    matches!(
        error.downcast_ref::<ApiError>(),
        Some(ApiError::NotFound { .. })
    )
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationQuery {
    pub status: Option<ApplicationStatus>,
    pub loan_type: String,
    pub search: String,
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub sort: Option<String>,
}

impl ApplicationQuery {
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(status) = self.status {
            params.push(("status", status.as_str().to_owned()));
        }
        push_non_empty(&mut params, "loanType", &self.loan_type);
        push_non_empty(&mut params, "search", &self.search);
        if let Some(page) = self.page {
            params.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(sort) = &self.sort {
            push_non_empty(&mut params, "sort", sort);
        }
        params
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoanTypeQuery {
    pub category: Option<LoanCategory>,
    pub status: Option<LoanTypeStatus>,
    pub search: String,
}

impl LoanTypeQuery {
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(category) = self.category {
            params.push(("category", category.as_str().to_owned()));
        }
        if let Some(status) = self.status {
            params.push(("status", status.as_str().to_owned()));
        }
        push_non_empty(&mut params, "search", &self.search);
        params
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerQuery {
    pub search: String,
}

impl CustomerQuery {
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        push_non_empty(&mut params, "search", &self.search);
        params
    }
}

fn push_non_empty(params: &mut Vec<(&'static str, String)>, key: &'static str, value: &str) {
    let value = value.trim();
    if !value.is_empty() {
        params.push((key, value.to_owned()));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationPage {
    pub applications: Vec<LoanApplication>,
    pub total_count: usize,
}

/// The lending REST surface. Every call takes the session explicitly.
pub trait LoanApi {
    /// Exchanges credentials for a bearer token.
    fn login(&self, input: &LoginInput) -> Result<String>;

    fn list_applications(
        &self,
        session: &Session,
        query: &ApplicationQuery,
    ) -> Result<ApplicationPage>;
    fn get_application(&self, session: &Session, id: &LoanApplicationId)
    -> Result<LoanApplication>;
    fn update_application_status(
        &self,
        session: &Session,
        id: &LoanApplicationId,
        update: &StatusUpdate,
    ) -> Result<()>;

    fn list_loan_types(&self, session: &Session, query: &LoanTypeQuery) -> Result<Vec<LoanType>>;
    fn create_loan_type(&self, session: &Session, input: &LoanTypeFormInput) -> Result<()>;
    fn update_loan_type(
        &self,
        session: &Session,
        id: &LoanTypeId,
        input: &LoanTypeFormInput,
    ) -> Result<()>;
    fn delete_loan_type(&self, session: &Session, id: &LoanTypeId) -> Result<()>;

    fn list_customers(
        &self,
        session: &Session,
        query: &CustomerQuery,
    ) -> Result<Vec<CustomerProfile>>;
    fn get_customer(&self, session: &Session, id: &CustomerId) -> Result<CustomerProfile>;
    fn delete_customer(&self, session: &Session, id: &CustomerId) -> Result<()>;

    fn dashboard_stats(&self, session: &Session) -> Result<DashboardStats>;
    fn analytics_stats(&self, session: &Session) -> Result<DashboardStats>;
    fn recent_applications(&self, session: &Session, limit: usize)
    -> Result<Vec<LoanApplication>>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoanTypePayload<'a> {
    loan_name: &'a str,
    loan_category: &'static str,
    loan_subcategory: &'a str,
    min_amount: Option<f64>,
    max_amount: Option<f64>,
    interest_rate: RatePayload,
    tenure: TenurePayload,
    processing_fee: &'a str,
    eligibility_criteria: &'a str,
    required_documents: &'a [String],
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct RatePayload {
    min: Option<f64>,
    max: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TenurePayload {
    min_months: Option<i64>,
    max_months: Option<i64>,
}

impl<'a> LoanTypePayload<'a> {
    fn new(input: &'a LoanTypeFormInput) -> Self {
        Self {
            loan_name: &input.name,
            loan_category: input.category.as_str(),
            loan_subcategory: &input.subcategory,
            min_amount: input.min_amount,
            max_amount: input.max_amount,
            interest_rate: RatePayload {
                min: input.interest_min,
                max: input.interest_max,
            },
            tenure: TenurePayload {
                min_months: input.tenure_min_months,
                max_months: input.tenure_max_months,
            },
            processing_fee: &input.processing_fee,
            eligibility_criteria: &input.eligibility_criteria,
            required_documents: &input.required_documents,
            status: input.status.as_str(),
        }
    }
}

#[derive(Debug, Serialize)]
struct LoginPayload<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    message: Option<String>,
    error: Option<Value>,
}

/// HTTP implementation of [`LoanApi`]. No retries; each request fails after
/// the configured timeout.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            anyhow::bail!("api.base_url must not be empty");
        }
        let base_url = Url::parse(trimmed)
            .with_context(|| format!("api.base_url {trimmed:?} is not a valid URL"))?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            anyhow::bail!(
                "api.base_url {trimmed:?} must be an http or https URL -- e.g. https://lender.example.com/api"
            );
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn endpoint(&self, segments: &[&str], params: &[(&'static str, String)]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow::anyhow!("api.base_url cannot take path segments"))?
            .pop_if_empty()
            .extend(segments);
        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(key, value)| (*key, value.as_str())));
        }
        Ok(url)
    }

    fn request(
        &self,
        session: &Session,
        method: Method,
        segments: &[&str],
        params: &[(&'static str, String)],
    ) -> Result<RequestBuilder> {
        let url = self.endpoint(segments, params)?;
        let mut builder = self.http.request(method, url);
        if let Some(token) = session.token() {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }

    /// Sends the request and maps every failure into an [`ApiError`].
    fn execute(&self, builder: RequestBuilder, what: &str) -> Result<Value> {
        let request = builder.build().context("build request")?;
        let method = request.method().clone();
        let path = request.url().path().to_owned();

        let response = self.http.execute(request).map_err(|error| ApiError::Transport {
            base_url: self.base_url.to_string(),
            detail: error.to_string(),
        })?;
        let status = response.status();
        tracing::debug!(%method, %path, status = status.as_u16(), "api request");

        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthenticated.into());
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound {
                what: what.to_owned(),
            }
            .into());
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body).into());
        }

        let body = response.text().map_err(|error| ApiError::Decode {
            what: what.to_owned(),
            detail: error.to_string(),
        })?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|error| {
            ApiError::Decode {
                what: what.to_owned(),
                detail: error.to_string(),
            }
            .into()
        })
    }

    fn get(
        &self,
        session: &Session,
        segments: &[&str],
        params: &[(&'static str, String)],
        what: &str,
    ) -> Result<Value> {
        let builder = self.request(session, Method::GET, segments, params)?;
        self.execute(builder, what)
    }

    fn send_json<T: Serialize + ?Sized>(
        &self,
        session: &Session,
        method: Method,
        segments: &[&str],
        body: &T,
        what: &str,
    ) -> Result<Value> {
        let builder = self.request(session, method, segments, &[])?.json(body);
        self.execute(builder, what)
    }
}

fn clean_error_response(status: StatusCode, body: &str) -> ApiError {
    let code = status.as_u16();
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body) {
        if let Some(message) = parsed.message.filter(|message| !message.is_empty()) {
            return ApiError::Status {
                status: code,
                message,
            };
        }
        let nested = match parsed.error {
            Some(Value::String(message)) => Some(message),
            Some(Value::Object(map)) => map
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_owned),
            _ => None,
        };
        if let Some(message) = nested.filter(|message| !message.is_empty()) {
            return ApiError::Status {
                status: code,
                message,
            };
        }
    }

    let body = body.trim();
    if !body.is_empty() && body.len() < 100 && !body.contains('{') && !body.contains('<') {
        return ApiError::Status {
            status: code,
            message: format!("server error ({code}): {body}"),
        };
    }

    ApiError::Status {
        status: code,
        message: format!("server returned {code}"),
    }
}

fn list_in<'a>(value: &'a Value, keys: &[&str]) -> &'a [Value] {
    if let Some(Value::Array(items)) = resolve_chain(value, keys) {
        return items;
    }
    match value {
        Value::Array(items) => items,
        _ => &[],
    }
}

fn detail_in<'a>(value: &'a Value, keys: &[&str], what: &str) -> Result<&'a Value> {
    let found = resolve_chain(value, keys)
        .filter(|found| found.as_object().is_some_and(|map| !map.is_empty()));
    found.ok_or_else(|| {
        ApiError::NotFound {
            what: what.to_owned(),
        }
        .into()
    })
}

impl LoanApi for Client {
    fn login(&self, input: &LoginInput) -> Result<String> {
        input.validate()?;
        let body = LoginPayload {
            email: input.email.trim(),
            password: &input.password,
        };
        let value = self
            .send_json(&Session::default(), Method::POST, &["auth", "login"], &body, "login")
            .map_err(|error| {
                if is_unauthenticated(&error) {
                    anyhow::anyhow!("invalid email or password -- check your credentials and retry")
                } else {
                    error
                }
            })?;
        let token = resolve_chain(&value, &["token", "accessToken", "data.token"])
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::Decode {
                what: "login".to_owned(),
                detail: "response carried no token".to_owned(),
            })?;
        tracing::info!("logged in");
        Ok(token.to_owned())
    }

    fn list_applications(
        &self,
        session: &Session,
        query: &ApplicationQuery,
    ) -> Result<ApplicationPage> {
        let value = self.get(
            session,
            &["loan-applications"],
            &query.params(),
            "loan applications",
        )?;
        let raw = list_in(&value, &["loanApplications", "applications", "data"]);
        let applications = normalize_list("loan application", raw, normalize_application);
        let total_count = resolve_path(&value, "totalCount")
            .and_then(Value::as_u64)
            .map(|count| count as usize)
            .unwrap_or(applications.len());
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
        let what = format!("loan application {id}");
        let value = self.get(session, &["loan-applications", id.as_str()], &[], &what)?;
        normalize_application(detail_in(&value, &["loanApplication", "application", "data"], &what)?)
    }

    fn update_application_status(
        &self,
        session: &Session,
        id: &LoanApplicationId,
        update: &StatusUpdate,
    ) -> Result<()> {
        let what = format!("loan application {id}");
        self.send_json(
            session,
            Method::PATCH,
            &["loan-applications", id.as_str(), "status"],
            update,
            &what,
        )?;
        tracing::info!(%id, status = update.status.as_str(), "application status updated");
        Ok(())
    }

    fn list_loan_types(&self, session: &Session, query: &LoanTypeQuery) -> Result<Vec<LoanType>> {
        let value = self.get(session, &["loan-types"], &query.params(), "loan types")?;
        let raw = list_in(&value, &["loanTypes", "data"]);
        Ok(normalize_list("loan type", raw, normalize_loan_type))
    }

    fn create_loan_type(&self, session: &Session, input: &LoanTypeFormInput) -> Result<()> {
        input.validate()?;
        self.send_json(
            session,
            Method::POST,
            &["loan-types"],
            &LoanTypePayload::new(input),
            "loan type",
        )?;
        tracing::info!(name = %input.name, "loan type created");
        Ok(())
    }

    fn update_loan_type(
        &self,
        session: &Session,
        id: &LoanTypeId,
        input: &LoanTypeFormInput,
    ) -> Result<()> {
        input.validate()?;
        self.send_json(
            session,
            Method::PUT,
            &["loan-types", id.as_str()],
            &LoanTypePayload::new(input),
            &format!("loan type {id}"),
        )?;
        tracing::info!(%id, "loan type updated");
        Ok(())
    }

    fn delete_loan_type(&self, session: &Session, id: &LoanTypeId) -> Result<()> {
        let builder = self.request(session, Method::DELETE, &["loan-types", id.as_str()], &[])?;
        self.execute(builder, &format!("loan type {id}"))?;
        tracing::info!(%id, "loan type deleted");
        Ok(())
    }

    fn list_customers(
        &self,
        session: &Session,
        query: &CustomerQuery,
    ) -> Result<Vec<CustomerProfile>> {
        let value = self.get(session, &["profile", "all"], &query.params(), "customers")?;
        let raw = list_in(&value, &["profiles", "customers", "data"]);
        Ok(normalize_list("customer", raw, normalize_customer))
    }

    fn get_customer(&self, session: &Session, id: &CustomerId) -> Result<CustomerProfile> {
        let what = format!("customer {id}");
        let value = self.get(session, &["profile", "detail", id.as_str()], &[], &what)?;
        normalize_customer(detail_in(&value, &["profile", "customer", "data"], &what)?)
    }

    fn delete_customer(&self, session: &Session, id: &CustomerId) -> Result<()> {
        let builder = self.request(session, Method::DELETE, &["profile", id.as_str()], &[])?;
        self.execute(builder, &format!("customer {id}"))?;
        tracing::info!(%id, "customer deleted");
        Ok(())
    }

    fn dashboard_stats(&self, session: &Session) -> Result<DashboardStats> {
        let value = self.get(session, &["dashboard", "stats"], &[], "dashboard stats")?;
        Ok(normalize_stats(resolve_chain(&value, &["stats", "data"]).unwrap_or(&value)))
    }

    fn analytics_stats(&self, session: &Session) -> Result<DashboardStats> {
        let value = self.get(session, &["analytics", "stats"], &[], "analytics stats")?;
        Ok(normalize_stats(resolve_chain(&value, &["stats", "data"]).unwrap_or(&value)))
    }

    fn recent_applications(
        &self,
        session: &Session,
        limit: usize,
    ) -> Result<Vec<LoanApplication>> {
        let params = [("limit", limit.to_string())];
        let value = self.get(
            session,
            &["dashboard", "recent-applications"],
            &params,
            "recent applications",
        )?;
        let raw = list_in(&value, &["recentApplications", "applications", "data"]);
        Ok(normalize_list("loan application", raw, normalize_application))
    }
}

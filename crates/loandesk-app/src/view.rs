// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! In-memory list pipeline shared by every list tab: filter, then sort, then
//! paginate. Every stage is a pure function of the fetched collection and the
//! view state, so a re-render can always recompute it from the latest fetch.

use std::cmp::Ordering;
use std::ops::Range;
use time::OffsetDateTime;

use crate::{
    ApplicationStatus, CustomerProfile, LoanApplication, LoanType, SortDirection,
};

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const PAGE_SIZE_CHOICES: [usize; 4] = [5, 10, 25, 50];
pub const PAGE_NUMBER_WINDOW: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Timestamp(OffsetDateTime),
}

impl FieldValue {
    pub fn display(&self) -> String {
        match self {
            Self::Text(value) => value.clone(),
            Self::Number(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
                format!("{}", *value as i64)
            }
            Self::Number(value) => value.to_string(),
            Self::Timestamp(value) => value.date().to_string(),
        }
    }

    /// Total order used by the sort stage. Mixed kinds fall back to their
    /// lower-cased display text.
    pub fn cmp_value(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(left), Self::Number(right)) => left.total_cmp(right),
            (Self::Timestamp(left), Self::Timestamp(right)) => left.cmp(right),
            (Self::Text(left), Self::Text(right)) => {
                left.to_lowercase().cmp(&right.to_lowercase())
            }
            _ => self
                .display()
                .to_lowercase()
                .cmp(&other.display().to_lowercase()),
        }
    }

    fn equals_expected(&self, expected: &str) -> bool {
        match self {
            Self::Number(value) => expected
                .trim()
                .parse::<f64>()
                .map(|parsed| parsed == *value)
                .unwrap_or(false),
            _ => self.display() == expected,
        }
    }
}

/// A canonical record the pipeline can inspect by dot-delimited field path.
pub trait Record {
    fn record_id(&self) -> &str;
    fn field(&self, path: &str) -> Option<FieldValue>;
}

/// Ordered fallback chain of field paths; the first path that resolves wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchField {
    paths: Vec<String>,
}

impl SearchField {
    pub fn path(path: &str) -> Self {
        Self {
            paths: vec![path.to_owned()],
        }
    }

    pub fn chain(paths: &[&str]) -> Self {
        Self {
            paths: paths.iter().map(|path| (*path).to_owned()).collect(),
        }
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn resolve<R: Record + ?Sized>(&self, record: &R) -> Option<FieldValue> {
        self.paths.iter().find_map(|path| record.field(path))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExactFilter {
    pub path: String,
    pub expected: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterSpec {
    pub exact: Vec<ExactFilter>,
    pub search: String,
    pub search_fields: Vec<SearchField>,
}

impl FilterSpec {
    pub fn searching(fields: Vec<SearchField>) -> Self {
        Self {
            search_fields: fields,
            ..Self::default()
        }
    }

    pub fn with_exact(mut self, path: &str, expected: &str) -> Self {
        self.set_exact(path, expected);
        self
    }

    pub fn with_search(mut self, search: &str) -> Self {
        self.search = search.to_owned();
        self
    }

    /// Replaces the expected value for `path`; an empty value clears it.
    pub fn set_exact(&mut self, path: &str, expected: &str) {
        self.exact.retain(|filter| filter.path != path);
        if !expected.is_empty() {
            self.exact.push(ExactFilter {
                path: path.to_owned(),
                expected: expected.to_owned(),
            });
        }
    }

    pub fn exact_value(&self, path: &str) -> &str {
        self.exact
            .iter()
            .find(|filter| filter.path == path)
            .map(|filter| filter.expected.as_str())
            .unwrap_or("")
    }

    pub fn clear(&mut self) {
        self.exact.clear();
        self.search.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.search.is_empty() && self.exact.iter().all(|filter| filter.expected.is_empty())
    }

    pub fn matches<R: Record + ?Sized>(&self, record: &R) -> bool {
        let exact_ok = self.exact.iter().all(|filter| {
            filter.expected.is_empty()
                || record
                    .field(&filter.path)
                    .is_some_and(|value| value.equals_expected(&filter.expected))
        });
        if !exact_ok {
            return false;
        }
        if self.search.is_empty() {
            return true;
        }

        let needle = self.search.to_lowercase();
        self.search_fields.iter().any(|field| {
            field
                .resolve(record)
                .is_some_and(|value| value.display().to_lowercase().contains(&needle))
        })
    }
}

pub fn filter<'a, R: Record>(records: &'a [R], spec: &FilterSpec) -> Vec<&'a R> {
    records.iter().filter(|record| spec.matches(*record)).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SortState {
    pub key: Option<String>,
    pub direction: SortDirection,
}

impl SortState {
    pub fn by(key: &str, direction: SortDirection) -> Self {
        Self {
            key: Some(key.to_owned()),
            direction,
        }
    }

    /// Same key flips the direction; a new key starts ascending.
    pub fn toggle(&mut self, key: &str) {
        if self.key.as_deref() == Some(key) {
            self.direction = self.direction.flipped();
        } else {
            self.key = Some(key.to_owned());
            self.direction = SortDirection::Asc;
        }
    }

    pub fn clear(&mut self) {
        self.key = None;
        self.direction = SortDirection::Asc;
    }

    pub fn direction_for(&self, key: &str) -> Option<SortDirection> {
        (self.key.as_deref() == Some(key)).then_some(self.direction)
    }
}

/// Stable sort. Records whose key does not resolve keep their relative
/// order and sort after every resolved record in either direction.
pub fn sort<R: Record>(records: &mut [&R], state: &SortState) {
    let Some(key) = state.key.as_deref() else {
        return;
    };

    let mut keyed: Vec<(Option<FieldValue>, &R)> = records
        .iter()
        .map(|record| (record.field(key), *record))
        .collect();
    keyed.sort_by(|(left, _), (right, _)| match (left, right) {
        (Some(left), Some(right)) => match state.direction {
            SortDirection::Asc => left.cmp_value(right),
            SortDirection::Desc => left.cmp_value(right).reverse(),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    for (slot, (_, record)) in records.iter_mut().zip(keyed) {
        *slot = record;
    }
}

pub fn total_pages(count: usize, page_size: usize) -> usize {
    count.div_ceil(page_size.max(1)).max(1)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageWindow {
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub range: Range<usize>,
}

impl PageWindow {
    /// Page numbers to offer as jump targets, centred on the current page.
    pub fn page_numbers(&self, window: usize) -> Vec<usize> {
        let window = window.max(1);
        let mut start = self.page.saturating_sub(window / 2).max(1);
        let end = (start + window - 1).min(self.total_pages);
        if end + 1 - start < window {
            start = (end + 1).saturating_sub(window).max(1);
        }
        (start..=end).collect()
    }

    pub fn summary(&self) -> String {
        if self.total_items == 0 {
            return "no records".to_owned();
        }
        format!(
            "{}-{} of {}",
            self.range.start + 1,
            self.range.end,
            self.total_items
        )
    }
}

/// Computes the window `[(page-1)*size, page*size)` with `page` clamped into
/// `[1, total_pages]`.
pub fn page_window(count: usize, page: usize, page_size: usize) -> PageWindow {
    let page_size = page_size.max(1);
    let total = total_pages(count, page_size);
    let page = page.clamp(1, total);
    let start = ((page - 1) * page_size).min(count);
    let end = (page * page_size).min(count);
    PageWindow {
        page,
        page_size,
        total_pages: total,
        total_items: count,
        range: start..end,
    }
}

pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> (&[T], PageWindow) {
    let window = page_window(items.len(), page, page_size);
    (&items[window.range.clone()], window)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    current_page: usize,
    page_size: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Pagination {
    pub fn new(page_size: usize) -> Self {
        Self {
            current_page: 1,
            page_size: page_size.max(1),
        }
    }

    pub const fn current_page(&self) -> usize {
        self.current_page
    }

    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn next(&mut self, total_pages: usize) -> bool {
        self.go_to(self.current_page + 1, total_pages)
    }

    pub fn prev(&mut self, total_pages: usize) -> bool {
        if self.current_page <= 1 {
            return false;
        }
        self.go_to(self.current_page - 1, total_pages)
    }

    /// Moves to `page` when it lies in `[1, total_pages]`; otherwise no-op.
    pub fn go_to(&mut self, page: usize, total_pages: usize) -> bool {
        if page < 1 || page > total_pages.max(1) || page == self.current_page {
            return false;
        }
        self.current_page = page;
        true
    }

    pub fn reset(&mut self) {
        self.current_page = 1;
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.current_page = 1;
    }

    /// Steps through `PAGE_SIZE_CHOICES`, staying at the ends.
    pub fn step_page_size(&mut self, delta: isize) {
        let current = PAGE_SIZE_CHOICES
            .iter()
            .position(|size| *size >= self.page_size)
            .unwrap_or(PAGE_SIZE_CHOICES.len() - 1);
        let next = if delta.is_negative() {
            current.saturating_sub(delta.unsigned_abs())
        } else {
            (current + delta as usize).min(PAGE_SIZE_CHOICES.len() - 1)
        };
        self.set_page_size(PAGE_SIZE_CHOICES[next]);
    }

    pub fn clamp(&mut self, total_pages: usize) {
        self.current_page = self.current_page.clamp(1, total_pages.max(1));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterAuthority {
    /// The whole collection was fetched; the filter stage runs here.
    #[default]
    Local,
    /// The server applied the filters; only sort and paginate run here.
    Server,
}

impl FilterAuthority {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "local" => Some(Self::Local),
            "server" => Some(Self::Server),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListView {
    pub filter: FilterSpec,
    pub sort: SortState,
    pub pagination: Pagination,
    pub authority: FilterAuthority,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewOutput<'a, R> {
    pub matched: Vec<&'a R>,
    pub window: PageWindow,
}

impl<'a, R> ViewOutput<'a, R> {
    pub fn rows(&self) -> &[&'a R] {
        &self.matched[self.window.range.clone()]
    }
}

impl ListView {
    pub fn new(search_fields: Vec<SearchField>, page_size: usize) -> Self {
        Self {
            filter: FilterSpec::searching(search_fields),
            sort: SortState::default(),
            pagination: Pagination::new(page_size),
            authority: FilterAuthority::Local,
        }
    }

    pub fn run<'a, R: Record>(&self, records: &'a [R]) -> ViewOutput<'a, R> {
        let mut matched = match self.authority {
            FilterAuthority::Local => filter(records, &self.filter),
            FilterAuthority::Server => records.iter().collect(),
        };
        sort(&mut matched, &self.sort);
        let window = page_window(
            matched.len(),
            self.pagination.current_page(),
            self.pagination.page_size(),
        );
        ViewOutput { matched, window }
    }

    pub fn set_search(&mut self, search: &str) {
        if self.filter.search != search {
            self.filter.search = search.to_owned();
            self.pagination.reset();
        }
    }

    pub fn set_exact(&mut self, path: &str, expected: &str) {
        if self.filter.exact_value(path) != expected {
            self.filter.set_exact(path, expected);
            self.pagination.reset();
        }
    }

    pub fn clear_filters(&mut self) {
        self.filter.clear();
        self.pagination.reset();
    }

    pub fn toggle_sort(&mut self, key: &str) {
        self.sort.toggle(key);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusCounts {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub disbursed: usize,
}

pub fn status_counts(applications: &[&LoanApplication]) -> StatusCounts {
    let mut counts = StatusCounts {
        total: applications.len(),
        ..StatusCounts::default()
    };
    for application in applications {
        match application.status {
            ApplicationStatus::Pending => counts.pending += 1,
            ApplicationStatus::Approved => counts.approved += 1,
            ApplicationStatus::Rejected => counts.rejected += 1,
            ApplicationStatus::Disbursed => counts.disbursed += 1,
        }
    }
    counts
}

fn text(value: Option<&String>) -> Option<FieldValue> {
    value
        .filter(|value| !value.trim().is_empty())
        .map(|value| FieldValue::Text(value.clone()))
}

fn number(value: Option<f64>) -> Option<FieldValue> {
    value.map(FieldValue::Number)
}

fn integer(value: Option<i64>) -> Option<FieldValue> {
    value.map(|value| FieldValue::Number(value as f64))
}

fn timestamp(value: Option<OffsetDateTime>) -> Option<FieldValue> {
    value.map(FieldValue::Timestamp)
}

impl Record for LoanApplication {
    fn record_id(&self) -> &str {
        self.id.as_str()
    }

    fn field(&self, path: &str) -> Option<FieldValue> {
        match path {
            "id" => Some(FieldValue::Text(self.id.to_string())),
            "applicant.id" => self
                .applicant
                .id
                .as_ref()
                .map(|id| FieldValue::Text(id.to_string())),
            "applicant.full_name" => text(self.applicant.full_name.as_ref()),
            "applicant.email" => text(self.applicant.email.as_ref()),
            "applicant.phone" => text(self.applicant.phone.as_ref()),
            "loan_type.id" => self
                .loan_type
                .id
                .as_ref()
                .map(|id| FieldValue::Text(id.to_string())),
            "loan_type.name" => text(self.loan_type.name.as_ref()),
            "loan_type.subcategory" => text(self.loan_type.subcategory.as_ref()),
            "amount" => number(self.amount),
            "tenure_months" => integer(self.tenure_months),
            "interest_rate" => number(self.interest_rate),
            "monthly_income" => number(self.monthly_income),
            "credit_score" => integer(self.credit_score),
            "purpose" => text(self.purpose.as_ref()),
            "status" => Some(FieldValue::Text(self.status.as_str().to_owned())),
            "applied_at" => timestamp(self.applied_at),
            "updated_at" => timestamp(self.updated_at),
            _ => None,
        }
    }
}

impl Record for LoanType {
    fn record_id(&self) -> &str {
        self.id.as_str()
    }

    fn field(&self, path: &str) -> Option<FieldValue> {
        match path {
            "id" => Some(FieldValue::Text(self.id.to_string())),
            "name" => text(Some(&self.name)),
            "category" => Some(FieldValue::Text(self.category.as_str().to_owned())),
            "subcategory" => text(Some(&self.subcategory)),
            "amount.min" => number(Some(self.amount.min)),
            "amount.max" => number(Some(self.amount.max)),
            "interest_rate.min" => number(self.interest_rate.min),
            "interest_rate.max" => number(self.interest_rate.max),
            "tenure.min_months" => integer(self.tenure.min_months),
            "tenure.max_months" => integer(self.tenure.max_months),
            "processing_fee" => text(Some(&self.processing_fee)),
            "status" => Some(FieldValue::Text(self.status.as_str().to_owned())),
            _ => None,
        }
    }
}

impl Record for CustomerProfile {
    fn record_id(&self) -> &str {
        self.id.as_str()
    }

    fn field(&self, path: &str) -> Option<FieldValue> {
        let employment = self.employment.as_ref();
        match path {
            "id" => Some(FieldValue::Text(self.id.to_string())),
            "full_name" => text(self.full_name.as_ref()),
            "email" => text(self.email.as_ref()),
            "phone" => text(self.phone.as_ref()),
            "phone_secondary" => text(self.phone_secondary.as_ref()),
            "pan" => text(self.pan.as_ref()),
            "aadhaar" => text(self.aadhaar.as_ref()),
            "address.line" => text(self.address.line.as_ref()),
            "address.city" => text(self.address.city.as_ref()),
            "address.state" => text(self.address.state.as_ref()),
            "address.pincode" => text(self.address.pincode.as_ref()),
            "employment.employment_type" => {
                text(employment.and_then(|e| e.employment_type.as_ref()))
            }
            "employment.company_name" => text(employment.and_then(|e| e.company_name.as_ref())),
            "employment.monthly_income" => number(employment.and_then(|e| e.monthly_income)),
            "account_status" => text(self.account_status.as_ref()),
            "created_at" => timestamp(self.created_at),
            "updated_at" => timestamp(self.updated_at),
            _ => None,
        }
    }
}

/// Search chains used by the list tabs.
pub fn application_search_fields() -> Vec<SearchField> {
    vec![
        SearchField::path("applicant.full_name"),
        SearchField::path("applicant.email"),
        SearchField::path("id"),
    ]
}

pub fn loan_type_search_fields() -> Vec<SearchField> {
    vec![SearchField::path("name"), SearchField::path("id")]
}

pub fn customer_search_fields() -> Vec<SearchField> {
    vec![
        SearchField::path("full_name"),
        SearchField::path("email"),
        SearchField::chain(&["phone", "phone_secondary"]),
    ]
}

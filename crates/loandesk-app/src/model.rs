// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::ids::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
    Disbursed,
}

impl ApplicationStatus {
    pub const ALL: [Self; 4] = [
        Self::Pending,
        Self::Approved,
        Self::Rejected,
        Self::Disbursed,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Disbursed => "disbursed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "disbursed" => Some(Self::Disbursed),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Disbursed => "Disbursed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanCategory {
    Personal,
    Home,
    Vehicle,
    Business,
    Education,
    Agriculture,
    Gold,
    Other,
}

impl LoanCategory {
    pub const ALL: [Self; 8] = [
        Self::Personal,
        Self::Home,
        Self::Vehicle,
        Self::Business,
        Self::Education,
        Self::Agriculture,
        Self::Gold,
        Self::Other,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Personal => "personal",
            Self::Home => "home",
            Self::Vehicle => "vehicle",
            Self::Business => "business",
            Self::Education => "education",
            Self::Agriculture => "agriculture",
            Self::Gold => "gold",
            Self::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "personal" => Some(Self::Personal),
            "home" => Some(Self::Home),
            "vehicle" => Some(Self::Vehicle),
            "business" => Some(Self::Business),
            "education" => Some(Self::Education),
            "agriculture" => Some(Self::Agriculture),
            "gold" => Some(Self::Gold),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Personal => "Personal",
            Self::Home => "Home",
            Self::Vehicle => "Vehicle",
            Self::Business => "Business",
            Self::Education => "Education",
            Self::Agriculture => "Agriculture",
            Self::Gold => "Gold",
            Self::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanTypeStatus {
    Active,
    Inactive,
}

impl LoanTypeStatus {
    pub const ALL: [Self; 2] = [Self::Active, Self::Inactive];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApplicantSummary {
    pub id: Option<ApplicantId>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoanTypeSummary {
    pub id: Option<LoanTypeId>,
    pub name: Option<String>,
    pub subcategory: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanApplication {
    pub id: LoanApplicationId,
    pub applicant: ApplicantSummary,
    pub loan_type: LoanTypeSummary,
    pub amount: Option<f64>,
    pub tenure_months: Option<i64>,
    pub interest_rate: Option<f64>,
    pub monthly_income: Option<f64>,
    pub credit_score: Option<i64>,
    pub purpose: Option<String>,
    pub employment_type: Option<String>,
    pub company_name: Option<String>,
    pub years_of_experience: Option<f64>,
    pub existing_loans: Option<f64>,
    pub emi_to_income_ratio: Option<f64>,
    pub status: ApplicationStatus,
    pub applied_at: Option<OffsetDateTime>,
    pub updated_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmountRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RateRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TenureRange {
    pub min_months: Option<i64>,
    pub max_months: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanType {
    pub id: LoanTypeId,
    pub name: String,
    pub category: LoanCategory,
    pub subcategory: String,
    pub amount: AmountRange,
    pub interest_rate: RateRange,
    pub tenure: TenureRange,
    pub processing_fee: String,
    pub eligibility_criteria: String,
    pub required_documents: Vec<String>,
    pub status: LoanTypeStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Address {
    pub line: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EmploymentDetails {
    pub employment_type: Option<String>,
    pub company_name: Option<String>,
    pub monthly_income: Option<f64>,
    pub experience: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BankAccount {
    pub bank_name: Option<String>,
    pub account_number: Option<String>,
    pub holder_name: Option<String>,
    pub branch: Option<String>,
    pub ifsc: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub id: CustomerId,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub phone_secondary: Option<String>,
    pub pan: Option<String>,
    pub aadhaar: Option<String>,
    pub address: Address,
    pub employment: Option<EmploymentDetails>,
    pub bank_details: Vec<BankAccount>,
    pub profile_picture_url: Option<String>,
    pub account_status: Option<String>,
    pub created_at: Option<OffsetDateTime>,
    pub updated_at: Option<OffsetDateTime>,
}

impl CustomerProfile {
    /// Aadhaar numbers are shown in groups of four digits.
    pub fn aadhaar_grouped(&self) -> Option<String> {
        let raw = self.aadhaar.as_deref()?;
        let digits: Vec<char> = raw.chars().filter(|ch| !ch.is_whitespace()).collect();
        Some(
            digits
                .chunks(4)
                .map(|chunk| chunk.iter().collect::<String>())
                .collect::<Vec<_>>()
                .join(" "),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_applications: u64,
    pub pending_applications: u64,
    pub approved_applications: u64,
    pub rejected_applications: u64,
    pub total_clients: u64,
    pub total_disbursed: f64,
    pub active_loans: u64,
    pub avg_processing_days: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TabKind {
    Dashboard,
    Applications,
    LoanTypes,
    Customers,
}

impl TabKind {
    pub const ALL: [Self; 4] = [
        Self::Dashboard,
        Self::Applications,
        Self::LoanTypes,
        Self::Customers,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Applications => "applications",
            Self::LoanTypes => "loan types",
            Self::Customers => "customers",
        }
    }

    pub const fn supports_delete(self) -> bool {
        matches!(self, Self::LoanTypes | Self::Customers)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormKind {
    LoanType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppMode {
    Nav,
    Search,
    Form(FormKind),
    Confirm,
    Detail,
    StatusPicker,
    Login,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub const fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

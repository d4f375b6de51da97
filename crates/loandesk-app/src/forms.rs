// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};

use crate::{LoanCategory, LoanType, LoanTypeStatus};

#[derive(Debug, Clone, PartialEq)]
pub struct LoanTypeFormInput {
    pub name: String,
    pub category: LoanCategory,
    pub subcategory: String,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    pub interest_min: Option<f64>,
    pub interest_max: Option<f64>,
    pub tenure_min_months: Option<i64>,
    pub tenure_max_months: Option<i64>,
    pub processing_fee: String,
    pub eligibility_criteria: String,
    pub required_documents: Vec<String>,
    pub status: LoanTypeStatus,
}

impl LoanTypeFormInput {
    pub fn blank() -> Self {
        Self {
            name: String::new(),
            category: LoanCategory::Personal,
            subcategory: String::new(),
            min_amount: None,
            max_amount: None,
            interest_min: None,
            interest_max: None,
            tenure_min_months: None,
            tenure_max_months: None,
            processing_fee: String::new(),
            eligibility_criteria: String::new(),
            required_documents: Vec::new(),
            status: LoanTypeStatus::Active,
        }
    }

    /// Amounts the server never set (zero) come back blank, so the edit
    /// form asks for them instead of failing on a placeholder.
    pub fn from_loan_type(loan_type: &LoanType) -> Self {
        let amount = |value: f64| (value > 0.0).then_some(value);
        Self {
            name: loan_type.name.clone(),
            category: loan_type.category,
            subcategory: loan_type.subcategory.clone(),
            min_amount: amount(loan_type.amount.min),
            max_amount: amount(loan_type.amount.max),
            interest_min: loan_type.interest_rate.min,
            interest_max: loan_type.interest_rate.max,
            tenure_min_months: loan_type.tenure.min_months,
            tenure_max_months: loan_type.tenure.max_months,
            processing_fee: loan_type.processing_fee.clone(),
            eligibility_criteria: loan_type.eligibility_criteria.clone(),
            required_documents: loan_type.required_documents.clone(),
            status: loan_type.status,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("loan name is required -- enter a name and retry");
        }
        let (Some(min), Some(max)) = (self.min_amount, self.max_amount) else {
            bail!("minimum and maximum amount are required -- enter both and retry");
        };
        if min <= 0.0 || max <= 0.0 {
            bail!("loan amounts must be positive");
        }
        if min > max {
            bail!("minimum amount cannot be greater than maximum amount -- lower the minimum and retry");
        }
        if self.interest_min.is_some_and(|rate| rate < 0.0)
            || self.interest_max.is_some_and(|rate| rate < 0.0)
        {
            bail!("interest rate cannot be negative");
        }
        if let (Some(min), Some(max)) = (self.interest_min, self.interest_max)
            && min > max
        {
            bail!("minimum interest rate cannot be greater than maximum interest rate");
        }
        if self.tenure_min_months.is_some_and(|months| months < 0)
            || self.tenure_max_months.is_some_and(|months| months < 0)
        {
            bail!("tenure cannot be negative");
        }
        if let (Some(min), Some(max)) = (self.tenure_min_months, self.tenure_max_months)
            && min > max
        {
            bail!("minimum tenure cannot be greater than maximum tenure");
        }
        Ok(())
    }
}

/// Splits a comma-separated list, dropping blank entries.
pub fn parse_documents(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanTypeField {
    Name,
    Category,
    Subcategory,
    MinAmount,
    MaxAmount,
    InterestMin,
    InterestMax,
    TenureMin,
    TenureMax,
    ProcessingFee,
    EligibilityCriteria,
    RequiredDocuments,
    Status,
}

impl LoanTypeField {
    pub const ALL: [Self; 13] = [
        Self::Name,
        Self::Category,
        Self::Subcategory,
        Self::MinAmount,
        Self::MaxAmount,
        Self::InterestMin,
        Self::InterestMax,
        Self::TenureMin,
        Self::TenureMax,
        Self::ProcessingFee,
        Self::EligibilityCriteria,
        Self::RequiredDocuments,
        Self::Status,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Name => "Loan name",
            Self::Category => "Category",
            Self::Subcategory => "Subcategory",
            Self::MinAmount => "Min amount",
            Self::MaxAmount => "Max amount",
            Self::InterestMin => "Interest min %",
            Self::InterestMax => "Interest max %",
            Self::TenureMin => "Tenure min (months)",
            Self::TenureMax => "Tenure max (months)",
            Self::ProcessingFee => "Processing fee",
            Self::EligibilityCriteria => "Eligibility",
            Self::RequiredDocuments => "Documents (comma separated)",
            Self::Status => "Status",
        }
    }

    /// Choice fields cycle through fixed values instead of taking text.
    pub const fn is_choice(self) -> bool {
        matches!(self, Self::Category | Self::Status)
    }
}

/// The loan-type form as typed in the terminal: every free field is text
/// until submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanTypeDraft {
    pub name: String,
    pub category: LoanCategory,
    pub subcategory: String,
    pub min_amount: String,
    pub max_amount: String,
    pub interest_min: String,
    pub interest_max: String,
    pub tenure_min: String,
    pub tenure_max: String,
    pub processing_fee: String,
    pub eligibility_criteria: String,
    pub required_documents: String,
    pub status: LoanTypeStatus,
}

impl Default for LoanTypeDraft {
    fn default() -> Self {
        Self::from_input(&LoanTypeFormInput::blank())
    }
}

fn format_number(value: Option<f64>) -> String {
    match value {
        None => String::new(),
        Some(value) if value.fract() == 0.0 => format!("{}", value as i64),
        Some(value) => value.to_string(),
    }
}

fn parse_number(label: &str, raw: &str) -> Result<Option<f64>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    match raw.replace(',', "").parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => bail!("{label} must be a number -- got {raw:?}"),
    }
}

fn parse_months(label: &str, raw: &str) -> Result<Option<i64>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    match raw.parse::<i64>() {
        Ok(value) => Ok(Some(value)),
        Err(_) => bail!("{label} must be a whole number of months -- got {raw:?}"),
    }
}

impl LoanTypeDraft {
    pub fn from_input(input: &LoanTypeFormInput) -> Self {
        Self {
            name: input.name.clone(),
            category: input.category,
            subcategory: input.subcategory.clone(),
            min_amount: format_number(input.min_amount),
            max_amount: format_number(input.max_amount),
            interest_min: format_number(input.interest_min),
            interest_max: format_number(input.interest_max),
            tenure_min: input.tenure_min_months.map(|v| v.to_string()).unwrap_or_default(),
            tenure_max: input.tenure_max_months.map(|v| v.to_string()).unwrap_or_default(),
            processing_fee: input.processing_fee.clone(),
            eligibility_criteria: input.eligibility_criteria.clone(),
            required_documents: input.required_documents.join(", "),
            status: input.status,
        }
    }

    pub fn to_input(&self) -> Result<LoanTypeFormInput> {
        Ok(LoanTypeFormInput {
            name: self.name.trim().to_owned(),
            category: self.category,
            subcategory: self.subcategory.trim().to_owned(),
            min_amount: parse_number("minimum amount", &self.min_amount)?,
            max_amount: parse_number("maximum amount", &self.max_amount)?,
            interest_min: parse_number("minimum interest rate", &self.interest_min)?,
            interest_max: parse_number("maximum interest rate", &self.interest_max)?,
            tenure_min_months: parse_months("minimum tenure", &self.tenure_min)?,
            tenure_max_months: parse_months("maximum tenure", &self.tenure_max)?,
            processing_fee: self.processing_fee.trim().to_owned(),
            eligibility_criteria: self.eligibility_criteria.trim().to_owned(),
            required_documents: parse_documents(&self.required_documents),
            status: self.status,
        })
    }

    pub fn value(&self, field: LoanTypeField) -> String {
        match field {
            LoanTypeField::Category => self.category.label().to_owned(),
            LoanTypeField::Status => self.status.as_str().to_owned(),
            _ => self.text(field).map(String::clone).unwrap_or_default(),
        }
    }

    fn text(&self, field: LoanTypeField) -> Option<&String> {
        match field {
            LoanTypeField::Name => Some(&self.name),
            LoanTypeField::Subcategory => Some(&self.subcategory),
            LoanTypeField::MinAmount => Some(&self.min_amount),
            LoanTypeField::MaxAmount => Some(&self.max_amount),
            LoanTypeField::InterestMin => Some(&self.interest_min),
            LoanTypeField::InterestMax => Some(&self.interest_max),
            LoanTypeField::TenureMin => Some(&self.tenure_min),
            LoanTypeField::TenureMax => Some(&self.tenure_max),
            LoanTypeField::ProcessingFee => Some(&self.processing_fee),
            LoanTypeField::EligibilityCriteria => Some(&self.eligibility_criteria),
            LoanTypeField::RequiredDocuments => Some(&self.required_documents),
            LoanTypeField::Category | LoanTypeField::Status => None,
        }
    }

    fn text_mut(&mut self, field: LoanTypeField) -> Option<&mut String> {
        match field {
            LoanTypeField::Name => Some(&mut self.name),
            LoanTypeField::Subcategory => Some(&mut self.subcategory),
            LoanTypeField::MinAmount => Some(&mut self.min_amount),
            LoanTypeField::MaxAmount => Some(&mut self.max_amount),
            LoanTypeField::InterestMin => Some(&mut self.interest_min),
            LoanTypeField::InterestMax => Some(&mut self.interest_max),
            LoanTypeField::TenureMin => Some(&mut self.tenure_min),
            LoanTypeField::TenureMax => Some(&mut self.tenure_max),
            LoanTypeField::ProcessingFee => Some(&mut self.processing_fee),
            LoanTypeField::EligibilityCriteria => Some(&mut self.eligibility_criteria),
            LoanTypeField::RequiredDocuments => Some(&mut self.required_documents),
            LoanTypeField::Category | LoanTypeField::Status => None,
        }
    }

    pub fn push_char(&mut self, field: LoanTypeField, ch: char) {
        if let Some(text) = self.text_mut(field) {
            text.push(ch);
        }
    }

    pub fn pop_char(&mut self, field: LoanTypeField) {
        if let Some(text) = self.text_mut(field) {
            text.pop();
        }
    }

    /// Advances a choice field to its next value, wrapping around.
    pub fn cycle(&mut self, field: LoanTypeField) {
        match field {
            LoanTypeField::Category => {
                let all = LoanCategory::ALL;
                let index = all.iter().position(|c| *c == self.category).unwrap_or(0);
                self.category = all[(index + 1) % all.len()];
            }
            LoanTypeField::Status => {
                self.status = match self.status {
                    LoanTypeStatus::Active => LoanTypeStatus::Inactive,
                    LoanTypeStatus::Inactive => LoanTypeStatus::Active,
                };
            }
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

impl LoginInput {
    pub fn validate(&self) -> Result<()> {
        if self.email.trim().is_empty() {
            bail!("email is required -- enter your admin email and retry");
        }
        if self.password.is_empty() {
            bail!("password is required -- enter your password and retry");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{LoanTypeDraft, LoanTypeField, LoanTypeFormInput, LoginInput, parse_documents};
    use crate::{AmountRange, LoanCategory, LoanType, LoanTypeStatus, RateRange, TenureRange};
    use anyhow::Result;

    fn valid_input() -> LoanTypeFormInput {
        LoanTypeFormInput {
            name: "Home Saver".to_owned(),
            min_amount: Some(100_000.0),
            max_amount: Some(5_000_000.0),
            interest_min: Some(8.25),
            interest_max: Some(9.5),
            tenure_min_months: Some(12),
            tenure_max_months: Some(240),
            ..LoanTypeFormInput::blank()
        }
    }

    #[test]
    fn valid_input_passes() {
        assert!(valid_input().validate().is_ok());
    }

    #[test]
    fn validation_rejects_min_amount_above_max() {
        let input = LoanTypeFormInput {
            min_amount: Some(500_000.0),
            max_amount: Some(100_000.0),
            ..valid_input()
        };
        let error = input.validate().expect_err("min > max should fail");
        assert!(error.to_string().contains("minimum amount cannot be greater"));
    }

    #[test]
    fn validation_requires_name_and_both_amounts() {
        let missing_name = LoanTypeFormInput {
            name: "  ".to_owned(),
            ..valid_input()
        };
        assert!(
            missing_name
                .validate()
                .expect_err("name required")
                .to_string()
                .contains("loan name is required")
        );

        let missing_max = LoanTypeFormInput {
            max_amount: None,
            ..valid_input()
        };
        assert!(missing_max.validate().is_err());
    }

    #[test]
    fn loan_type_without_amounts_edits_with_blank_amount_fields() -> Result<()> {
        let loan_type = LoanType {
            id: "lt-1".into(),
            name: "Tractor".to_owned(),
            category: LoanCategory::Agriculture,
            subcategory: String::new(),
            amount: AmountRange { min: 0.0, max: 0.0 },
            interest_rate: RateRange::default(),
            tenure: TenureRange::default(),
            processing_fee: String::new(),
            eligibility_criteria: String::new(),
            required_documents: Vec::new(),
            status: LoanTypeStatus::Active,
        };
        let input = LoanTypeFormInput::from_loan_type(&loan_type);
        assert_eq!(input.min_amount, None);
        assert_eq!(input.max_amount, None);

        let mut draft = LoanTypeDraft::from_input(&input);
        assert_eq!(draft.value(LoanTypeField::MinAmount), "");
        assert_eq!(draft.value(LoanTypeField::MaxAmount), "");
        let error = draft
            .to_input()?
            .validate()
            .expect_err("amounts are still required");
        assert!(error.to_string().contains("enter both"));

        for ch in "50000".chars() {
            draft.push_char(LoanTypeField::MinAmount, ch);
        }
        for ch in "200000".chars() {
            draft.push_char(LoanTypeField::MaxAmount, ch);
        }
        draft.to_input()?.validate()?;
        Ok(())
    }

    #[test]
    fn validation_checks_optional_ranges() {
        let rates = LoanTypeFormInput {
            interest_min: Some(12.0),
            interest_max: Some(9.0),
            ..valid_input()
        };
        assert!(rates.validate().is_err());

        let open_tenure = LoanTypeFormInput {
            tenure_max_months: None,
            ..valid_input()
        };
        assert!(open_tenure.validate().is_ok());
    }

    #[test]
    fn documents_split_on_commas() {
        assert_eq!(
            parse_documents("PAN, Aadhaar,, salary slips ,"),
            vec!["PAN", "Aadhaar", "salary slips"]
        );
    }

    #[test]
    fn draft_parses_numbers_and_reports_bad_ones() -> Result<()> {
        let mut draft = LoanTypeDraft {
            name: "Gold Flex".to_owned(),
            min_amount: "10,000".to_owned(),
            max_amount: "250000".to_owned(),
            required_documents: "PAN, Gold receipt".to_owned(),
            ..LoanTypeDraft::default()
        };
        let input = draft.to_input()?;
        assert_eq!(input.min_amount, Some(10_000.0));
        assert_eq!(input.required_documents.len(), 2);
        input.validate()?;

        draft.tenure_min = "six".to_owned();
        let error = draft.to_input().expect_err("tenure must be numeric");
        assert!(error.to_string().contains("minimum tenure"));
        Ok(())
    }

    #[test]
    fn draft_round_trips_edit_values() -> Result<()> {
        let input = valid_input();
        let draft = LoanTypeDraft::from_input(&input);
        assert_eq!(draft.min_amount, "100000");
        assert_eq!(draft.interest_min, "8.25");
        assert_eq!(draft.to_input()?, input);
        Ok(())
    }

    #[test]
    fn draft_editing_and_cycling() {
        let mut draft = LoanTypeDraft::default();
        draft.push_char(LoanTypeField::Name, 'A');
        draft.push_char(LoanTypeField::Name, 'b');
        draft.pop_char(LoanTypeField::Name);
        assert_eq!(draft.value(LoanTypeField::Name), "A");

        draft.push_char(LoanTypeField::Category, 'x');
        draft.cycle(LoanTypeField::Category);
        assert_eq!(draft.category, LoanCategory::Home);
        draft.cycle(LoanTypeField::Status);
        assert_eq!(draft.status, LoanTypeStatus::Inactive);
    }

    #[test]
    fn login_requires_email_and_password() {
        let input = LoginInput {
            email: "admin@example.com".to_owned(),
            password: String::new(),
        };
        assert!(input.validate().is_err());
        assert!(
            LoginInput {
                password: "secret".to_owned(),
                ..input
            }
            .validate()
            .is_ok()
        );
    }
}

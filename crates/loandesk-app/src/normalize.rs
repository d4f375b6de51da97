// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Maps raw API payloads into canonical records. The upstream schema spreads
//! the same fact across several shapes (profile fields vs. the nested auth
//! object), so every lookup here is an ordered fallback chain resolved once,
//! right after fetch.

use anyhow::{Result, anyhow, bail};
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::forms::parse_documents;
use crate::{
    Address, AmountRange, ApplicantSummary, ApplicationStatus, BankAccount, CustomerProfile,
    DashboardStats, EmploymentDetails, LoanApplication, LoanCategory, LoanType, LoanTypeStatus,
    LoanTypeSummary, RateRange, TenureRange,
};

/// Walks a dot-delimited path. Numeric segments index into arrays. `null`
/// resolves to `None`.
pub fn resolve_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    (!current.is_null()).then_some(current)
}

/// First path in `paths` that resolves to something other than `null` or an
/// empty string.
pub fn resolve_chain<'a>(value: &'a Value, paths: &[&str]) -> Option<&'a Value> {
    paths.iter().find_map(|path| {
        resolve_path(value, path).filter(|found| found.as_str().is_none_or(|s| !s.is_empty()))
    })
}

fn as_text(found: &Value) -> Option<String> {
    match found {
        Value::String(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_owned())
        }
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn as_number(found: &Value) -> Option<f64> {
    match found {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    }
    .filter(|number| number.is_finite())
}

fn text_at(value: &Value, paths: &[&str]) -> Option<String> {
    paths
        .iter()
        .find_map(|path| resolve_path(value, path).and_then(as_text))
}

fn number_at(value: &Value, paths: &[&str]) -> Option<f64> {
    paths
        .iter()
        .find_map(|path| resolve_path(value, path).and_then(as_number))
}

fn integer_at(value: &Value, paths: &[&str]) -> Option<i64> {
    number_at(value, paths).map(|number| number.round() as i64)
}

fn timestamp_at(value: &Value, paths: &[&str]) -> Option<OffsetDateTime> {
    paths.iter().find_map(|path| {
        let raw = resolve_path(value, path)?.as_str()?;
        OffsetDateTime::parse(raw.trim(), &Rfc3339).ok()
    })
}

fn count_at(value: &Value, paths: &[&str]) -> u64 {
    number_at(value, paths)
        .filter(|number| *number >= 0.0)
        .map(|number| number.round() as u64)
        .unwrap_or(0)
}

fn required_id(value: &Value, paths: &[&str], kind: &str) -> Result<String> {
    text_at(value, paths).ok_or_else(|| anyhow!("{kind} record has no id"))
}

pub fn normalize_application(value: &Value) -> Result<LoanApplication> {
    let id = required_id(value, &["_id", "id"], "loan application")?;
    let raw_status = text_at(value, &["applicationStatus", "status"])
        .ok_or_else(|| anyhow!("loan application {id} has no status"))?;
    let Some(status) = ApplicationStatus::parse(&raw_status.to_lowercase()) else {
        bail!("loan application {id} has unknown status {raw_status:?}");
    };

    let applicant = ApplicantSummary {
        id: text_at(value, &["authId._id", "authId.id", "authId"]).map(Into::into),
        full_name: text_at(value, &["authId.fullName", "authId.name", "fullName"]),
        email: text_at(value, &["authId.email", "email"]),
        phone: text_at(
            value,
            &["authId.phoneNo", "authId.phoneNumber", "phoneNo", "phoneNumber"],
        ),
    };
    let loan_type = LoanTypeSummary {
        id: text_at(value, &["loanTypeId._id", "loanTypeId.id", "loanTypeId"]).map(Into::into),
        name: text_at(value, &["loanTypeId.loanName", "loanName"]),
        subcategory: text_at(value, &["loanTypeId.loanSubcategory", "loanSubcategory"]),
    };

    Ok(LoanApplication {
        id: id.into(),
        applicant,
        loan_type,
        amount: number_at(value, &["loanAmount", "amount"]),
        tenure_months: integer_at(value, &["tenure", "tenureMonths"]),
        interest_rate: number_at(value, &["interestRate"]),
        monthly_income: number_at(value, &["monthlyIncome", "employmentDetails.monthlyIncome"]),
        credit_score: integer_at(value, &["creditScore"]),
        purpose: text_at(value, &["purpose"]),
        employment_type: text_at(value, &["employmentType", "employmentDetails.employmentType"]),
        company_name: text_at(value, &["companyName", "employmentDetails.companyName"]),
        years_of_experience: number_at(value, &["yearsOfExperience", "experience"]),
        existing_loans: number_at(value, &["existingLoans"]),
        emi_to_income_ratio: number_at(value, &["emiToIncomeRatio"]),
        status,
        applied_at: timestamp_at(value, &["appliedAt", "createdAt"]),
        updated_at: timestamp_at(value, &["updatedAt"]),
    })
}

pub fn normalize_loan_type(value: &Value) -> Result<LoanType> {
    let id = required_id(value, &["_id", "id"], "loan type")?;
    let name = text_at(value, &["loanName", "name"])
        .ok_or_else(|| anyhow!("loan type {id} has no name"))?;

    let category = text_at(value, &["loanCategory", "category"])
        .and_then(|raw| LoanCategory::parse(&raw.to_lowercase()))
        .unwrap_or(LoanCategory::Other);
    let status = match text_at(value, &["status"]) {
        None => LoanTypeStatus::Active,
        Some(raw) => LoanTypeStatus::parse(&raw.to_lowercase())
            .ok_or_else(|| anyhow!("loan type {id} has unknown status {raw:?}"))?,
    };

    let required_documents = match resolve_path(value, "requiredDocuments") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str())
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_owned)
            .collect(),
        Some(Value::String(list)) => parse_documents(list),
        _ => Vec::new(),
    };

    Ok(LoanType {
        id: id.into(),
        name,
        category,
        subcategory: text_at(value, &["loanSubcategory", "subcategory"]).unwrap_or_default(),
        amount: AmountRange {
            min: number_at(value, &["minAmount", "amount.min"]).unwrap_or(0.0),
            max: number_at(value, &["maxAmount", "amount.max"]).unwrap_or(0.0),
        },
        interest_rate: RateRange {
            min: number_at(value, &["interestRate.min", "minInterestRate"]),
            max: number_at(value, &["interestRate.max", "maxInterestRate"]),
        },
        tenure: TenureRange {
            min_months: integer_at(value, &["tenure.minMonths", "minTenure"]),
            max_months: integer_at(value, &["tenure.maxMonths", "maxTenure"]),
        },
        processing_fee: text_at(value, &["processingFee"]).unwrap_or_default(),
        eligibility_criteria: text_at(value, &["eligibilityCriteria"]).unwrap_or_default(),
        required_documents,
        status,
    })
}

fn normalize_bank_account(value: &Value) -> BankAccount {
    BankAccount {
        bank_name: text_at(value, &["bankName"]),
        account_number: text_at(value, &["accountNo", "accountNumber"]),
        holder_name: text_at(value, &["accountHolderName", "holderName"]),
        branch: text_at(value, &["bankBranch", "branch"]),
        ifsc: text_at(value, &["ifscCode", "ifsc"]),
    }
}

pub fn normalize_customer(value: &Value) -> Result<CustomerProfile> {
    let id = required_id(value, &["_id", "id", "authId._id", "authId.id"], "customer")?;

    let address = Address {
        line: text_at(
            value,
            &[
                "address.addressLine",
                "address.fullAddress",
                "authId.address.addressLine",
                "authId.address.fullAddress",
            ],
        ),
        city: text_at(value, &["address.city", "authId.address.city"]),
        state: text_at(value, &["address.state", "authId.address.state"]),
        pincode: text_at(
            value,
            &[
                "address.pincode",
                "address.zipCode",
                "authId.address.pincode",
                "authId.address.zipCode",
            ],
        ),
    };

    let employment = resolve_path(value, "employmentDetails")
        .filter(|details| details.is_object())
        .map(|details| EmploymentDetails {
            employment_type: text_at(details, &["employmentType"]),
            company_name: text_at(details, &["companyName"]),
            monthly_income: number_at(details, &["monthlyIncome"]),
            experience: text_at(details, &["experience"]),
        });

    let bank_details = match resolve_path(value, "bankDetails") {
        Some(Value::Array(items)) => items.iter().map(normalize_bank_account).collect(),
        Some(single @ Value::Object(_)) => vec![normalize_bank_account(single)],
        _ => Vec::new(),
    };

    Ok(CustomerProfile {
        id: id.into(),
        full_name: text_at(
            value,
            &["fullName", "name", "authId.fullName", "authId.name"],
        ),
        email: text_at(value, &["email", "authId.email"]),
        phone: text_at(
            value,
            &["phoneNo", "phoneNumber", "authId.phoneNo", "authId.phoneNumber"],
        ),
        phone_secondary: text_at(value, &["phoneNo2", "authId.phoneNo2"]),
        pan: text_at(value, &["panNo", "panNumber", "authId.panNo", "authId.panNumber"]),
        aadhaar: text_at(
            value,
            &[
                "adharNo",
                "aadhaarNumber",
                "authId.adharNo",
                "authId.aadhaarNumber",
            ],
        ),
        address,
        employment,
        bank_details,
        profile_picture_url: text_at(value, &["profilePic", "profilePicture", "authId.profilePic"]),
        account_status: text_at(value, &["status", "role", "authId.role"]),
        created_at: timestamp_at(value, &["createdAt", "registeredAt"]),
        updated_at: timestamp_at(value, &["updatedAt"]),
    })
}

/// Normalizes every element, skipping (and logging) the ones that fail.
pub fn normalize_list<T>(
    kind: &str,
    values: &[Value],
    normalize: impl Fn(&Value) -> Result<T>,
) -> Vec<T> {
    values
        .iter()
        .filter_map(|value| match normalize(value) {
            Ok(record) => Some(record),
            Err(error) => {
                tracing::warn!(kind, error = %error, "skipping malformed record");
                None
            }
        })
        .collect()
}

/// Reads the dashboard or analytics counters. Absent counters are zero.
pub fn normalize_stats(value: &Value) -> DashboardStats {
    DashboardStats {
        total_applications: count_at(value, &["totalApplications"]),
        pending_applications: count_at(value, &["pendingApplications"]),
        approved_applications: count_at(value, &["approvedApplications"]),
        rejected_applications: count_at(value, &["rejectedApplications"]),
        total_clients: count_at(value, &["totalClients", "totalCustomers"]),
        total_disbursed: number_at(value, &["totalDisbursed"]).unwrap_or(0.0),
        active_loans: count_at(value, &["activeLoans"]),
        avg_processing_days: number_at(value, &["avgProcessingTime", "avgProcessingDays"]),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        normalize_application, normalize_customer, normalize_list, normalize_loan_type,
        normalize_stats, resolve_chain, resolve_path,
    };
    use crate::{ApplicationStatus, LoanCategory, LoanTypeStatus};
    use anyhow::Result;
    use serde_json::json;

    #[test]
    fn resolve_path_walks_objects_and_arrays() {
        let value = json!({"a": {"b": [{"c": 1}]}, "n": null});
        assert_eq!(resolve_path(&value, "a.b.0.c"), Some(&json!(1)));
        assert_eq!(resolve_path(&value, "a.x"), None);
        assert_eq!(resolve_path(&value, "n"), None);
    }

    #[test]
    fn resolve_chain_skips_empty_strings() {
        let value = json!({"fullName": "", "authId": {"fullName": "Asha Rao"}});
        assert_eq!(
            resolve_chain(&value, &["fullName", "name", "authId.fullName"]),
            Some(&json!("Asha Rao"))
        );
    }

    #[test]
    fn application_reads_nested_applicant_and_loan_type() -> Result<()> {
        let raw = json!({
            "_id": "65f0a1",
            "authId": {"_id": "u1", "fullName": "Asha Rao", "email": "asha@example.com"},
            "loanTypeId": {"_id": "lt1", "loanName": "Home Saver", "loanSubcategory": "new-home"},
            "loanAmount": "250000",
            "tenure": 36,
            "creditScore": 712.0,
            "applicationStatus": "Approved",
            "appliedAt": "2026-03-04T10:00:00Z",
        });
        let application = normalize_application(&raw)?;
        assert_eq!(application.id.as_str(), "65f0a1");
        assert_eq!(application.applicant.full_name.as_deref(), Some("Asha Rao"));
        assert_eq!(application.loan_type.subcategory.as_deref(), Some("new-home"));
        assert_eq!(application.amount, Some(250_000.0));
        assert_eq!(application.tenure_months, Some(36));
        assert_eq!(application.credit_score, Some(712));
        assert_eq!(application.status, ApplicationStatus::Approved);
        assert!(application.applied_at.is_some());
        assert!(application.updated_at.is_none());
        Ok(())
    }

    #[test]
    fn application_with_unknown_status_is_rejected() {
        let raw = json!({"_id": "a1", "applicationStatus": "cancelled"});
        let error = normalize_application(&raw).expect_err("unknown status should fail");
        assert!(error.to_string().contains("unknown status"));
    }

    #[test]
    fn loan_type_reads_ranges_and_document_list() -> Result<()> {
        let raw = json!({
            "_id": "lt1",
            "loanName": "Gold Flex",
            "loanCategory": "gold",
            "minAmount": 10000,
            "maxAmount": "500000",
            "interestRate": {"min": 8.5, "max": 12},
            "tenure": {"minMonths": 6, "maxMonths": 48},
            "requiredDocuments": ["PAN", " ", "Aadhaar"],
        });
        let loan_type = normalize_loan_type(&raw)?;
        assert_eq!(loan_type.category, LoanCategory::Gold);
        assert_eq!(loan_type.amount.max, 500_000.0);
        assert_eq!(loan_type.interest_rate.min, Some(8.5));
        assert_eq!(loan_type.tenure.max_months, Some(48));
        assert_eq!(loan_type.required_documents, vec!["PAN", "Aadhaar"]);
        assert_eq!(loan_type.status, LoanTypeStatus::Active);
        Ok(())
    }

    #[test]
    fn customer_resolves_fallback_chains_once() -> Result<()> {
        let raw = json!({
            "authId": {
                "_id": "u9",
                "name": "Vikram Iyer",
                "phoneNumber": 9876543210u64,
                "address": {"fullAddress": "12 Lake Rd", "zipCode": "560001"},
            },
            "panNumber": "ABCDE1234F",
            "employmentDetails": {"companyName": "Acme", "monthlyIncome": "85000"},
            "bankDetails": [{"bankName": "SBI", "accountNo": "001", "ifscCode": "SBIN0001"}],
            "registeredAt": "2025-12-01T08:30:00+05:30",
            "role": "customer",
        });
        let customer = normalize_customer(&raw)?;
        assert_eq!(customer.id.as_str(), "u9");
        assert_eq!(customer.full_name.as_deref(), Some("Vikram Iyer"));
        assert_eq!(customer.phone.as_deref(), Some("9876543210"));
        assert_eq!(customer.pan.as_deref(), Some("ABCDE1234F"));
        assert_eq!(customer.address.line.as_deref(), Some("12 Lake Rd"));
        assert_eq!(customer.address.pincode.as_deref(), Some("560001"));
        let employment = customer.employment.expect("employment details");
        assert_eq!(employment.monthly_income, Some(85_000.0));
        assert_eq!(customer.bank_details.len(), 1);
        assert_eq!(customer.bank_details[0].ifsc.as_deref(), Some("SBIN0001"));
        assert_eq!(customer.account_status.as_deref(), Some("customer"));
        assert!(customer.created_at.is_some());
        Ok(())
    }

    #[test]
    fn customer_without_any_id_is_rejected() {
        assert!(normalize_customer(&json!({"fullName": "Nobody"})).is_err());
    }

    #[test]
    fn list_skips_malformed_records() {
        let values = vec![
            json!({"_id": "a1", "status": "pending"}),
            json!({"status": "pending"}),
            json!({"_id": "a3", "status": "weird"}),
            json!({"_id": "a4", "status": "disbursed"}),
        ];
        let applications = normalize_list("application", &values, normalize_application);
        let ids: Vec<&str> = applications.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a4"]);
    }

    #[test]
    fn stats_default_missing_counters_to_zero() {
        let stats = normalize_stats(&json!({
            "totalApplications": 42,
            "pendingApplications": "7",
            "avgProcessingTime": 3.5,
        }));
        assert_eq!(stats.total_applications, 42);
        assert_eq!(stats.pending_applications, 7);
        assert_eq!(stats.total_clients, 0);
        assert_eq!(stats.avg_processing_days, Some(3.5));
    }
}

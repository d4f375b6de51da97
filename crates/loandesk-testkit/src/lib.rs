// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use loandesk_app::{
    Address, AmountRange, ApplicantSummary, ApplicationStatus, BankAccount, CustomerProfile,
    EmploymentDetails, LoanApplication, LoanCategory, LoanType, LoanTypeStatus, LoanTypeSummary,
    RateRange, TenureRange,
};
use serde_json::{Value, json};
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};

const FIRST_NAMES: [&str; 16] = [
    "Asha", "Vikram", "Meera", "Arjun", "Priya", "Rohan", "Kavya", "Nikhil", "Ananya", "Siddharth",
    "Ishita", "Karan", "Neha", "Aditya", "Pooja", "Rahul",
];
const LAST_NAMES: [&str; 14] = [
    "Rao", "Iyer", "Nair", "Sharma", "Patel", "Menon", "Reddy", "Gupta", "Das", "Kulkarni",
    "Joshi", "Pillai", "Bose", "Verma",
];

const CITIES: [(&str, &str, &str); 10] = [
    ("Bengaluru", "Karnataka", "560001"),
    ("Mumbai", "Maharashtra", "400001"),
    ("Chennai", "Tamil Nadu", "600001"),
    ("Hyderabad", "Telangana", "500001"),
    ("Pune", "Maharashtra", "411001"),
    ("Kochi", "Kerala", "682001"),
    ("Jaipur", "Rajasthan", "302001"),
    ("Kolkata", "West Bengal", "700001"),
    ("Ahmedabad", "Gujarat", "380001"),
    ("Lucknow", "Uttar Pradesh", "226001"),
];
const STREETS: [&str; 8] = [
    "MG Road",
    "Lake View Road",
    "Station Road",
    "Temple Street",
    "Park Avenue",
    "Gandhi Nagar",
    "Nehru Street",
    "Ring Road",
];

const COMPANIES: [&str; 10] = [
    "Infosys", "Wipro", "Tata Motors", "Zoho", "Larsen & Toubro", "Mahindra", "Biocon",
    "Freshworks", "Asian Paints", "Self",
];
const EMPLOYMENT_TYPES: [&str; 3] = ["salaried", "self-employed", "business"];
const BANKS: [(&str, &str); 6] = [
    ("State Bank of India", "SBIN"),
    ("HDFC Bank", "HDFC"),
    ("ICICI Bank", "ICIC"),
    ("Axis Bank", "UTIB"),
    ("Canara Bank", "CNRB"),
    ("Kotak Mahindra Bank", "KKBK"),
];
const PURPOSES: [&str; 8] = [
    "home renovation",
    "new apartment",
    "car purchase",
    "working capital",
    "higher studies",
    "wedding expenses",
    "tractor purchase",
    "debt consolidation",
];
const DOCUMENTS: [&str; 7] = [
    "PAN card",
    "Aadhaar card",
    "Salary slips",
    "Bank statements",
    "ITR",
    "Property papers",
    "Address proof",
];

fn loan_type_names(category: LoanCategory) -> &'static [(&'static str, &'static str)] {
    match category {
        LoanCategory::Personal => &[("Quick Personal", "instant"), ("Salary Plus", "salaried")],
        LoanCategory::Home => &[("Home Saver", "new-home"), ("Home Improve", "renovation")],
        LoanCategory::Vehicle => &[("Drive Easy", "four-wheeler"), ("Two Wheeler", "two-wheeler")],
        LoanCategory::Business => &[("Business Growth", "msme"), ("Trade Credit", "working-capital")],
        LoanCategory::Education => &[("Study Abroad", "overseas"), ("Campus Loan", "domestic")],
        LoanCategory::Agriculture => &[("Kisan Credit", "crop"), ("Farm Equip", "machinery")],
        LoanCategory::Gold => &[("Gold Flex", "jewellery"), ("Gold Express", "overdraft")],
        LoanCategory::Other => &[("Festival Advance", "seasonal"), ("Medical Aid", "medical")],
    }
}

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// A full set of related fixtures: every application points at one of the
/// generated customers and loan types.
#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub loan_types: Vec<LoanType>,
    pub customers: Vec<CustomerProfile>,
    pub applications: Vec<LoanApplication>,
}

#[derive(Debug, Clone)]
pub struct LoanFaker {
    rng: DeterministicRng,
}

impl LoanFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    /// 24 hex digits, the shape of the server's object ids.
    pub fn object_id(&mut self) -> String {
        format!(
            "{:08x}{:016x}",
            self.rng.next_u64() as u32,
            self.rng.next_u64()
        )
    }

    pub fn loan_type(&mut self) -> LoanType {
        let category = LoanCategory::ALL[self.rng.int_n(LoanCategory::ALL.len())];
        let names = loan_type_names(category);
        let (name, subcategory) = names[self.rng.int_n(names.len())];

        let min = self.int_range(1, 20) as f64 * 10_000.0;
        let max = min * self.int_range(5, 50) as f64;
        let rate_min = self.int_range(700, 1400) as f64 / 100.0;
        let rate_max = rate_min + self.int_range(50, 600) as f64 / 100.0;
        let tenure_min = [6, 12, 24][self.rng.int_n(3)];
        let tenure_max = tenure_min * self.int_range(2, 15);

        let mut required_documents = Vec::new();
        for document in DOCUMENTS {
            if self.rng.bool() {
                required_documents.push(document.to_owned());
            }
        }
        if required_documents.is_empty() {
            required_documents.push(DOCUMENTS[0].to_owned());
        }

        LoanType {
            id: self.object_id().into(),
            name: name.to_owned(),
            category,
            subcategory: subcategory.to_owned(),
            amount: AmountRange { min, max },
            interest_rate: RateRange {
                min: Some(rate_min),
                max: Some(rate_max),
            },
            tenure: TenureRange {
                min_months: Some(tenure_min),
                max_months: Some(tenure_max),
            },
            processing_fee: format!("{}% of loan amount", self.int_range(1, 3)),
            eligibility_criteria: format!(
                "Age 21-60, minimum monthly income {}",
                self.int_range(2, 8) * 10_000
            ),
            required_documents,
            status: if self.rng.int_n(5) == 0 {
                LoanTypeStatus::Inactive
            } else {
                LoanTypeStatus::Active
            },
        }
    }

    pub fn customer(&mut self) -> CustomerProfile {
        let first = FIRST_NAMES[self.rng.int_n(FIRST_NAMES.len())];
        let last = LAST_NAMES[self.rng.int_n(LAST_NAMES.len())];
        let (city, state, pincode) = CITIES[self.rng.int_n(CITIES.len())];
        let (bank_name, ifsc_prefix) = BANKS[self.rng.int_n(BANKS.len())];
        let created_at = self.datetime_before(reference_now(), 720);

        CustomerProfile {
            id: self.object_id().into(),
            full_name: Some(format!("{first} {last}")),
            email: Some(format!(
                "{}.{}{}@example.com",
                first.to_lowercase(),
                last.to_lowercase(),
                self.rng.int_n(100)
            )),
            phone: Some(format!("9{:09}", self.rng.next_u64() % 1_000_000_000)),
            phone_secondary: self
                .rng
                .bool()
                .then(|| format!("8{:09}", self.rng.next_u64() % 1_000_000_000)),
            pan: Some(self.pan()),
            aadhaar: Some(format!("{:012}", self.rng.next_u64() % 1_000_000_000_000)),
            address: Address {
                line: Some(format!(
                    "{} {}",
                    self.int_range(1, 250),
                    STREETS[self.rng.int_n(STREETS.len())]
                )),
                city: Some(city.to_owned()),
                state: Some(state.to_owned()),
                pincode: Some(pincode.to_owned()),
            },
            employment: Some(EmploymentDetails {
                employment_type: Some(
                    EMPLOYMENT_TYPES[self.rng.int_n(EMPLOYMENT_TYPES.len())].to_owned(),
                ),
                company_name: Some(COMPANIES[self.rng.int_n(COMPANIES.len())].to_owned()),
                monthly_income: Some(self.int_range(25, 400) as f64 * 1_000.0),
                experience: Some(format!("{} years", self.int_range(1, 25))),
            }),
            bank_details: vec![BankAccount {
                bank_name: Some(bank_name.to_owned()),
                account_number: Some(format!("{:011}", self.rng.next_u64() % 100_000_000_000)),
                holder_name: Some(format!("{first} {last}")),
                branch: Some(city.to_owned()),
                ifsc: Some(format!(
                    "{ifsc_prefix}0{:06}",
                    self.rng.next_u64() % 1_000_000
                )),
            }],
            profile_picture_url: None,
            account_status: Some("active".to_owned()),
            created_at: Some(created_at),
            updated_at: Some(created_at + Duration::days(self.int_range(0, 30))),
        }
    }

    pub fn application(
        &mut self,
        customer: &CustomerProfile,
        loan_type: &LoanType,
    ) -> LoanApplication {
        let steps = ((loan_type.amount.max - loan_type.amount.min) / 10_000.0).max(0.0) as i64;
        let amount = loan_type.amount.min + self.int_range(0, steps) as f64 * 10_000.0;
        let tenure = match (loan_type.tenure.min_months, loan_type.tenure.max_months) {
            (Some(min), Some(max)) => Some(self.int_range(min, max)),
            _ => None,
        };
        let applied_at = self.datetime_before(reference_now(), 180);
        let employment = customer.employment.clone().unwrap_or_default();

        LoanApplication {
            id: self.object_id().into(),
            applicant: ApplicantSummary {
                id: Some(customer.id.as_str().into()),
                full_name: customer.full_name.clone(),
                email: customer.email.clone(),
                phone: customer.phone.clone(),
            },
            loan_type: LoanTypeSummary {
                id: Some(loan_type.id.clone()),
                name: Some(loan_type.name.clone()),
                subcategory: Some(loan_type.subcategory.clone()),
            },
            amount: Some(amount),
            tenure_months: tenure,
            interest_rate: loan_type.interest_rate.min,
            monthly_income: employment.monthly_income,
            credit_score: Some(self.int_range(550, 850)),
            purpose: Some(PURPOSES[self.rng.int_n(PURPOSES.len())].to_owned()),
            employment_type: employment.employment_type,
            company_name: employment.company_name,
            years_of_experience: Some(self.int_range(1, 25) as f64),
            existing_loans: Some(self.int_range(0, 3) as f64),
            emi_to_income_ratio: Some(self.int_range(5, 60) as f64 / 100.0),
            status: ApplicationStatus::ALL[self.rng.int_n(ApplicationStatus::ALL.len())],
            applied_at: Some(applied_at),
            updated_at: Some(applied_at + Duration::days(self.int_range(0, 14))),
        }
    }

    pub fn portfolio(
        &mut self,
        loan_types: usize,
        customers: usize,
        applications: usize,
    ) -> Portfolio {
        let loan_types: Vec<LoanType> = (0..loan_types.max(1)).map(|_| self.loan_type()).collect();
        let customers: Vec<CustomerProfile> =
            (0..customers.max(1)).map(|_| self.customer()).collect();
        let applications = (0..applications)
            .map(|_| {
                let customer = &customers[self.rng.int_n(customers.len())];
                let loan_type = &loan_types[self.rng.int_n(loan_types.len())];
                self.application(customer, loan_type)
            })
            .collect();
        Portfolio {
            loan_types,
            customers,
            applications,
        }
    }

    fn pan(&mut self) -> String {
        let letters: String = (0..5)
            .map(|_| char::from(b'A' + self.rng.int_n(26) as u8))
            .collect();
        format!(
            "{letters}{:04}{}",
            self.rng.next_u64() % 10_000,
            char::from(b'A' + self.rng.int_n(26) as u8)
        )
    }

    fn int_range(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = max - min + 1;
        min + (self.rng.next_u64() % (span as u64)) as i64
    }

    fn datetime_before(&mut self, end: OffsetDateTime, max_days: i64) -> OffsetDateTime {
        end - Duration::seconds(self.int_range(0, max_days * 86_400))
    }
}

/// The fixed data set behind `--demo`.
pub fn demo_portfolio() -> Portfolio {
    LoanFaker::new(2026).portfolio(10, 30, 80)
}

pub fn reference_now() -> OffsetDateTime {
    // 2026-01-01T00:00:00Z
    OffsetDateTime::UNIX_EPOCH + Duration::seconds(1_767_225_600)
}

fn rfc3339(value: Option<OffsetDateTime>) -> Value {
    value
        .and_then(|value| value.format(&Rfc3339).ok())
        .map(Value::String)
        .unwrap_or(Value::Null)
}

/// The application as the server sends it: applicant and loan type nested
/// under populated `authId` / `loanTypeId` objects.
pub fn application_json(application: &LoanApplication) -> Value {
    json!({
        "_id": application.id.as_str(),
        "authId": {
            "_id": application.applicant.id.as_ref().map(|id| id.as_str()),
            "fullName": application.applicant.full_name,
            "email": application.applicant.email,
            "phoneNo": application.applicant.phone,
        },
        "loanTypeId": {
            "_id": application.loan_type.id.as_ref().map(|id| id.as_str()),
            "loanName": application.loan_type.name,
            "loanSubcategory": application.loan_type.subcategory,
        },
        "loanAmount": application.amount,
        "tenure": application.tenure_months,
        "interestRate": application.interest_rate,
        "monthlyIncome": application.monthly_income,
        "creditScore": application.credit_score,
        "purpose": application.purpose,
        "employmentType": application.employment_type,
        "companyName": application.company_name,
        "yearsOfExperience": application.years_of_experience,
        "existingLoans": application.existing_loans,
        "emiToIncomeRatio": application.emi_to_income_ratio,
        "applicationStatus": application.status.as_str(),
        "appliedAt": rfc3339(application.applied_at),
        "updatedAt": rfc3339(application.updated_at),
    })
}

pub fn loan_type_json(loan_type: &LoanType) -> Value {
    json!({
        "_id": loan_type.id.as_str(),
        "loanName": loan_type.name,
        "loanCategory": loan_type.category.as_str(),
        "loanSubcategory": loan_type.subcategory,
        "minAmount": loan_type.amount.min,
        "maxAmount": loan_type.amount.max,
        "interestRate": {"min": loan_type.interest_rate.min, "max": loan_type.interest_rate.max},
        "tenure": {"minMonths": loan_type.tenure.min_months, "maxMonths": loan_type.tenure.max_months},
        "processingFee": loan_type.processing_fee,
        "eligibilityCriteria": loan_type.eligibility_criteria,
        "requiredDocuments": loan_type.required_documents,
        "status": loan_type.status.as_str(),
    })
}

/// The profile in its split shape: identity fields live on the nested auth
/// object, KYC fields on the profile itself.
pub fn customer_json(customer: &CustomerProfile) -> Value {
    let employment = customer.employment.as_ref().map(|employment| {
        json!({
            "employmentType": employment.employment_type,
            "companyName": employment.company_name,
            "monthlyIncome": employment.monthly_income,
            "experience": employment.experience,
        })
    });
    let banks: Vec<Value> = customer
        .bank_details
        .iter()
        .map(|bank| {
            json!({
                "bankName": bank.bank_name,
                "accountNo": bank.account_number,
                "accountHolderName": bank.holder_name,
                "bankBranch": bank.branch,
                "ifscCode": bank.ifsc,
            })
        })
        .collect();

    json!({
        "_id": customer.id.as_str(),
        "authId": {
            "_id": customer.id.as_str(),
            "fullName": customer.full_name,
            "email": customer.email,
            "phoneNo": customer.phone,
        },
        "phoneNo2": customer.phone_secondary,
        "panNo": customer.pan,
        "adharNo": customer.aadhaar,
        "address": {
            "addressLine": customer.address.line,
            "city": customer.address.city,
            "state": customer.address.state,
            "pincode": customer.address.pincode,
        },
        "employmentDetails": employment,
        "bankDetails": banks,
        "profilePic": customer.profile_picture_url,
        "status": customer.account_status,
        "createdAt": rfc3339(customer.created_at),
        "updatedAt": rfc3339(customer.updated_at),
    })
}

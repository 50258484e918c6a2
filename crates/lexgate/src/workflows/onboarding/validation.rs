use std::fmt;

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{ApplicationProfile, ApplicationSubmission};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_EXPERIENCE_YEARS: u32 = 70;
const EARLIEST_FOUNDING_YEAR: u32 = 1800;

/// A single field-scoped validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every field that failed validation, in the order the checks ran.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|error| error.field.as_str())
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields().any(|candidate| candidate == field)
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        Self(vec![FieldError {
            field: field.to_string(),
            message: message.into(),
        }])
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        self.0.extend(other.0);
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .0
            .iter()
            .map(|error| format!("{}: {}", error.field, error.message))
            .collect();
        write!(f, "{}", rendered.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Accumulates field checks so every failure is reported at once.
#[derive(Debug, Default)]
pub struct FieldChecks {
    errors: Vec<FieldError>,
}

impl FieldChecks {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn required(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.push(field, "is required");
        }
        self
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        let value = value.trim();
        if value.is_empty() {
            self.push(field, "is required");
            return self;
        }
        let well_formed = value
            .split_once('@')
            .map(|(local, domain)| {
                !local.is_empty()
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
                    && !domain.contains('@')
            })
            .unwrap_or(false);
        if !well_formed || value.chars().any(char::is_whitespace) {
            self.push(field, "must be a valid email address");
        }
        self
    }

    pub fn password(&mut self, field: &str, value: &str) -> &mut Self {
        if value.chars().count() < MIN_PASSWORD_LEN {
            self.push(
                field,
                format!("must be at least {MIN_PASSWORD_LEN} characters"),
            );
        }
        self
    }

    pub fn confirmation(&mut self, field: &str, password: &str, confirm: &str) -> &mut Self {
        if password != confirm {
            self.push(field, "passwords do not match");
        }
        self
    }

    pub fn selected(&mut self, field: &str, values: &[String]) -> &mut Self {
        if values.iter().all(|value| value.trim().is_empty()) {
            self.push(field, "select at least one option");
        }
        self
    }

    pub fn at_most(&mut self, field: &str, value: u32, max: u32) -> &mut Self {
        if value > max {
            self.push(field, format!("must be at most {max}"));
        }
        self
    }

    pub fn at_least(&mut self, field: &str, value: u32, min: u32) -> &mut Self {
        if value < min {
            self.push(field, format!("must be at least {min}"));
        }
        self
    }

    pub fn year(&mut self, field: &str, value: u32) -> &mut Self {
        let current = Utc::now().year().max(0) as u32;
        if value < EARLIEST_FOUNDING_YEAR || value > current {
            self.push(
                field,
                format!("must be between {EARLIEST_FOUNDING_YEAR} and {current}"),
            );
        }
        self
    }

    pub fn fail(&mut self, field: &str, message: impl Into<String>) -> &mut Self {
        self.push(field, message);
        self
    }

    pub fn finish(&mut self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors(std::mem::take(&mut self.errors)))
        }
    }
}

/// Server-side re-validation of a creation request.
///
/// Wizards run the same rules step by step; the store never trusts that they did.
pub fn validate_submission(submission: &ApplicationSubmission) -> Result<(), ValidationErrors> {
    let mut checks = FieldChecks::new();
    checks
        .email("email", &submission.email)
        .password("password", &submission.password);

    match &submission.profile {
        ApplicationProfile::Client(profile) => {
            checks.required("full_name", &profile.full_name);
        }
        ApplicationProfile::Lawyer(profile) => {
            checks
                .required("name", &profile.name)
                .required("phone", &profile.phone)
                .required("bar_council_number", &profile.bar_council_number)
                .required("specialization", &profile.specialization)
                .at_most("experience", u32::from(profile.experience), MAX_EXPERIENCE_YEARS)
                .required("state", &profile.state)
                .required("city", &profile.city)
                .required("court", &profile.court)
                .required("education", &profile.education)
                .selected("languages", &profile.languages)
                .required("fee_range", &profile.fee_range)
                .required("bio", &profile.bio);
        }
        ApplicationProfile::LawFirm(profile) => {
            checks
                .required("firm_name", &profile.firm_name)
                .required("registration_number", &profile.registration_number)
                .year("established_year", u32::from(profile.established_year))
                .required("contact_name", &profile.contact_name)
                .required("contact_phone", &profile.contact_phone)
                .required("city", &profile.city)
                .required("state", &profile.state)
                .selected("practice_areas", &profile.practice_areas)
                .at_least("total_lawyers", profile.total_lawyers, 1)
                .required("description", &profile.description);
        }
        ApplicationProfile::FirmLawyer(profile) => {
            checks
                .required("full_name", &profile.full_name)
                .required("phone", &profile.phone)
                .required("firm_id", profile.firm.firm_id.as_str())
                .required("specialization", &profile.specialization)
                .at_most(
                    "experience_years",
                    u32::from(profile.experience_years),
                    MAX_EXPERIENCE_YEARS,
                );
        }
        ApplicationProfile::FirmClient(profile) => {
            checks
                .required("full_name", &profile.full_name)
                .required("phone", &profile.phone)
                .required("firm_id", profile.firm.firm_id.as_str())
                .required("case_type", &profile.case_type)
                .required("case_description", &profile.case_description);
        }
    }

    checks.finish()
}

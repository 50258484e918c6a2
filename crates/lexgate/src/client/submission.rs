use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::gateway::{ApplicationGateway, GatewayError};
use super::notify::{Notification, Notifier};
use crate::workflows::onboarding::{
    ApplicationProfile, ApplicationSubmission, AuthGrant, ClientProfile, FieldChecks,
    FirmClientProfile, FirmId, FirmLawyerProfile, FirmReference, FirmSummary, LawFirmProfile,
    LawyerProfile, Role, SubmissionReceipt, ValidationErrors, MAX_EXPERIENCE_YEARS,
};

const MAX_HEADCOUNT: u32 = 100_000;

/// One page of a submission wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Account,
    Professional,
    Practice,
    Profile,
    Firm,
    Contact,
    About,
    Case,
}

/// Approved firms as last fetched from the directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApprovedFirms(pub Vec<FirmSummary>);

impl ApprovedFirms {
    pub fn find(&self, id: &FirmId) -> Option<&FirmSummary> {
        self.0.iter().find(|firm| &firm.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Firm choice of a form, for the roles that must pick one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirmSelection<'a> {
    NotApplicable,
    Missing,
    Selected(&'a FirmId),
}

impl<'a> FirmSelection<'a> {
    fn of(choice: &'a Option<FirmId>) -> Self {
        match choice {
            Some(id) if !id.as_str().trim().is_empty() => FirmSelection::Selected(id),
            _ => FirmSelection::Missing,
        }
    }
}

/// A role-specific application form driven through wizard steps.
pub trait ApplicationForm: Send + Sync {
    fn role(&self) -> Role;

    fn steps(&self) -> &'static [WizardStep];

    /// Checks for one step only. Steps the form does not have pass.
    fn validate_step(&self, step: WizardStep) -> Result<(), ValidationErrors>;

    fn firm_selection(&self) -> FirmSelection<'_> {
        FirmSelection::NotApplicable
    }

    /// Assemble the creation request. `firm` is the resolved selection.
    fn build(&self, firm: Option<FirmReference>) -> Result<ApplicationSubmission, ValidationErrors>;

    /// Every step's checks, merged.
    fn validate_steps(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        for step in self.steps() {
            if let Err(step_errors) = self.validate_step(*step) {
                errors.merge(step_errors);
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate every step and resolve the firm selection against `firms`.
    fn finalize(&self, firms: &ApprovedFirms) -> Result<ApplicationSubmission, ValidationErrors> {
        let mut errors = self.validate_steps().err().unwrap_or_default();

        let firm = match self.firm_selection() {
            FirmSelection::NotApplicable => None,
            FirmSelection::Missing => {
                if !errors.has("firm_id") {
                    errors.merge(missing_firm());
                }
                None
            }
            FirmSelection::Selected(id) => match firms.find(id) {
                Some(summary) => Some(summary.reference()),
                None => {
                    errors.merge(ValidationErrors::single(
                        "firm_id",
                        "the selected law firm is not available",
                    ));
                    None
                }
            },
        };

        if !errors.is_empty() {
            return Err(errors);
        }
        self.build(firm)
    }
}

fn account_checks(
    checks: &mut FieldChecks,
    email: &str,
    password: &str,
    confirm_password: &str,
) {
    checks
        .email("email", email)
        .password("password", password)
        .confirmation("confirm_password", password, confirm_password);
}

fn missing_firm() -> ValidationErrors {
    ValidationErrors::single("firm_id", "select a law firm")
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LawyerForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub confirm_password: String,
    pub photo: Option<String>,
    pub bar_council_number: String,
    pub specialization: String,
    pub experience: u8,
    pub cases_won: u32,
    pub state: String,
    pub city: String,
    pub court: String,
    pub languages: Vec<String>,
    pub fee_range: String,
    pub education: String,
    pub bio: String,
}

impl ApplicationForm for LawyerForm {
    fn role(&self) -> Role {
        Role::Lawyer
    }

    fn steps(&self) -> &'static [WizardStep] {
        &[
            WizardStep::Account,
            WizardStep::Professional,
            WizardStep::Practice,
            WizardStep::Profile,
        ]
    }

    fn validate_step(&self, step: WizardStep) -> Result<(), ValidationErrors> {
        let mut checks = FieldChecks::new();
        match step {
            WizardStep::Account => {
                checks.required("name", &self.name).required("phone", &self.phone);
                account_checks(&mut checks, &self.email, &self.password, &self.confirm_password);
            }
            WizardStep::Professional => {
                checks
                    .required("bar_council_number", &self.bar_council_number)
                    .required("specialization", &self.specialization)
                    .at_most("experience", u32::from(self.experience), MAX_EXPERIENCE_YEARS);
            }
            WizardStep::Practice => {
                checks
                    .required("state", &self.state)
                    .required("city", &self.city)
                    .required("court", &self.court)
                    .selected("languages", &self.languages)
                    .required("fee_range", &self.fee_range);
            }
            WizardStep::Profile => {
                checks
                    .required("education", &self.education)
                    .required("bio", &self.bio);
            }
            WizardStep::Firm | WizardStep::Contact | WizardStep::About | WizardStep::Case => {}
        }
        checks.finish()
    }

    fn build(&self, _firm: Option<FirmReference>) -> Result<ApplicationSubmission, ValidationErrors> {
        Ok(ApplicationSubmission {
            email: self.email.clone(),
            password: self.password.clone(),
            profile: ApplicationProfile::Lawyer(LawyerProfile {
                name: self.name.trim().to_string(),
                phone: self.phone.trim().to_string(),
                photo: self.photo.clone(),
                bar_council_number: self.bar_council_number.trim().to_string(),
                specialization: self.specialization.clone(),
                experience: self.experience,
                cases_won: self.cases_won,
                state: self.state.clone(),
                city: self.city.trim().to_string(),
                court: self.court.clone(),
                education: self.education.trim().to_string(),
                languages: self.languages.clone(),
                fee_range: self.fee_range.clone(),
                bio: self.bio.trim().to_string(),
            }),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LawFirmForm {
    pub firm_name: String,
    pub registration_number: String,
    pub established_year: u16,
    pub website: Option<String>,
    pub contact_name: String,
    pub email: String,
    pub contact_phone: String,
    pub contact_designation: Option<String>,
    pub password: String,
    pub confirm_password: String,
    pub address: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: Option<String>,
    pub practice_areas: Vec<String>,
    pub total_lawyers: u32,
    pub total_staff: u32,
    pub description: String,
    pub achievements: Option<String>,
}

impl ApplicationForm for LawFirmForm {
    fn role(&self) -> Role {
        Role::LawFirm
    }

    fn steps(&self) -> &'static [WizardStep] {
        &[
            WizardStep::Firm,
            WizardStep::Contact,
            WizardStep::Practice,
            WizardStep::About,
        ]
    }

    fn validate_step(&self, step: WizardStep) -> Result<(), ValidationErrors> {
        let mut checks = FieldChecks::new();
        match step {
            WizardStep::Firm => {
                checks
                    .required("firm_name", &self.firm_name)
                    .required("registration_number", &self.registration_number)
                    .year("established_year", u32::from(self.established_year));
            }
            WizardStep::Contact => {
                checks
                    .required("contact_name", &self.contact_name)
                    .required("contact_phone", &self.contact_phone);
                account_checks(&mut checks, &self.email, &self.password, &self.confirm_password);
            }
            WizardStep::Practice => {
                checks
                    .required("city", &self.city)
                    .required("state", &self.state)
                    .selected("practice_areas", &self.practice_areas)
                    .at_least("total_lawyers", self.total_lawyers, 1)
                    .at_most("total_lawyers", self.total_lawyers, MAX_HEADCOUNT)
                    .at_most("total_staff", self.total_staff, MAX_HEADCOUNT);
            }
            WizardStep::About => {
                checks.required("description", &self.description);
            }
            WizardStep::Account
            | WizardStep::Professional
            | WizardStep::Profile
            | WizardStep::Case => {}
        }
        checks.finish()
    }

    fn build(&self, _firm: Option<FirmReference>) -> Result<ApplicationSubmission, ValidationErrors> {
        Ok(ApplicationSubmission {
            email: self.email.clone(),
            password: self.password.clone(),
            profile: ApplicationProfile::LawFirm(LawFirmProfile {
                firm_name: self.firm_name.trim().to_string(),
                registration_number: self.registration_number.trim().to_string(),
                established_year: self.established_year,
                website: self.website.clone().filter(|site| !site.trim().is_empty()),
                contact_name: self.contact_name.trim().to_string(),
                contact_phone: self.contact_phone.trim().to_string(),
                contact_designation: self.contact_designation.clone(),
                address: self.address.clone(),
                city: self.city.trim().to_string(),
                state: self.state.clone(),
                pincode: self.pincode.clone(),
                practice_areas: self.practice_areas.clone(),
                total_lawyers: self.total_lawyers,
                total_staff: self.total_staff,
                description: self.description.trim().to_string(),
                achievements: self.achievements.clone(),
            }),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmLawyerForm {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub confirm_password: String,
    pub firm_id: Option<FirmId>,
    pub specialization: String,
    pub experience_years: u8,
    pub bar_council_number: Option<String>,
    pub languages: Vec<String>,
}

impl ApplicationForm for FirmLawyerForm {
    fn role(&self) -> Role {
        Role::FirmLawyer
    }

    fn steps(&self) -> &'static [WizardStep] {
        &[
            WizardStep::Account,
            WizardStep::Firm,
            WizardStep::Professional,
        ]
    }

    fn validate_step(&self, step: WizardStep) -> Result<(), ValidationErrors> {
        let mut checks = FieldChecks::new();
        match step {
            WizardStep::Account => {
                checks
                    .required("full_name", &self.full_name)
                    .required("phone", &self.phone);
                account_checks(&mut checks, &self.email, &self.password, &self.confirm_password);
            }
            WizardStep::Firm => {
                if matches!(FirmSelection::of(&self.firm_id), FirmSelection::Missing) {
                    checks.fail("firm_id", "select a law firm");
                }
            }
            WizardStep::Professional => {
                checks
                    .required("specialization", &self.specialization)
                    .at_most(
                        "experience_years",
                        u32::from(self.experience_years),
                        MAX_EXPERIENCE_YEARS,
                    );
            }
            WizardStep::Practice
            | WizardStep::Profile
            | WizardStep::Contact
            | WizardStep::About
            | WizardStep::Case => {}
        }
        checks.finish()
    }

    fn firm_selection(&self) -> FirmSelection<'_> {
        FirmSelection::of(&self.firm_id)
    }

    fn build(&self, firm: Option<FirmReference>) -> Result<ApplicationSubmission, ValidationErrors> {
        let firm = firm.ok_or_else(missing_firm)?;
        Ok(ApplicationSubmission {
            email: self.email.clone(),
            password: self.password.clone(),
            profile: ApplicationProfile::FirmLawyer(FirmLawyerProfile {
                full_name: self.full_name.trim().to_string(),
                phone: self.phone.trim().to_string(),
                firm,
                specialization: self.specialization.clone(),
                experience_years: self.experience_years,
                bar_council_number: self.bar_council_number.clone(),
                languages: self.languages.clone(),
            }),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmClientForm {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub confirm_password: String,
    pub company_name: Option<String>,
    pub firm_id: Option<FirmId>,
    pub case_type: String,
    pub case_description: String,
}

impl ApplicationForm for FirmClientForm {
    fn role(&self) -> Role {
        Role::FirmClient
    }

    fn steps(&self) -> &'static [WizardStep] {
        &[WizardStep::Contact, WizardStep::Firm, WizardStep::Case]
    }

    fn validate_step(&self, step: WizardStep) -> Result<(), ValidationErrors> {
        let mut checks = FieldChecks::new();
        match step {
            WizardStep::Contact => {
                checks
                    .required("full_name", &self.full_name)
                    .required("phone", &self.phone);
                account_checks(&mut checks, &self.email, &self.password, &self.confirm_password);
            }
            WizardStep::Firm => {
                if matches!(FirmSelection::of(&self.firm_id), FirmSelection::Missing) {
                    checks.fail("firm_id", "select a law firm");
                }
            }
            WizardStep::Case => {
                checks
                    .required("case_type", &self.case_type)
                    .required("case_description", &self.case_description);
            }
            WizardStep::Account
            | WizardStep::Professional
            | WizardStep::Practice
            | WizardStep::Profile
            | WizardStep::About => {}
        }
        checks.finish()
    }

    fn firm_selection(&self) -> FirmSelection<'_> {
        FirmSelection::of(&self.firm_id)
    }

    fn build(&self, firm: Option<FirmReference>) -> Result<ApplicationSubmission, ValidationErrors> {
        let firm = firm.ok_or_else(missing_firm)?;
        Ok(ApplicationSubmission {
            email: self.email.clone(),
            password: self.password.clone(),
            profile: ApplicationProfile::FirmClient(FirmClientProfile {
                full_name: self.full_name.trim().to_string(),
                phone: self.phone.trim().to_string(),
                company_name: self.company_name.clone().filter(|name| !name.trim().is_empty()),
                firm,
                case_type: self.case_type.clone(),
                case_description: self.case_description.trim().to_string(),
            }),
        })
    }
}

/// Plain client signup; approved on creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSignupForm {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
    pub confirm_password: String,
}

impl ApplicationForm for ClientSignupForm {
    fn role(&self) -> Role {
        Role::Client
    }

    fn steps(&self) -> &'static [WizardStep] {
        &[WizardStep::Account]
    }

    fn validate_step(&self, step: WizardStep) -> Result<(), ValidationErrors> {
        let mut checks = FieldChecks::new();
        if step == WizardStep::Account {
            checks.required("full_name", &self.full_name);
            account_checks(&mut checks, &self.email, &self.password, &self.confirm_password);
        }
        checks.finish()
    }

    fn build(&self, _firm: Option<FirmReference>) -> Result<ApplicationSubmission, ValidationErrors> {
        Ok(ApplicationSubmission {
            email: self.email.clone(),
            password: self.password.clone(),
            profile: ApplicationProfile::Client(ClientProfile {
                full_name: self.full_name.trim().to_string(),
                phone: self.phone.clone().filter(|phone| !phone.trim().is_empty()),
            }),
        })
    }
}

/// Step-by-step driver over a form.
#[derive(Debug, Clone)]
pub struct Wizard<F> {
    form: F,
    position: usize,
}

impl<F: ApplicationForm> Wizard<F> {
    pub fn new(form: F) -> Self {
        Self { form, position: 0 }
    }

    pub fn form(&self) -> &F {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut F {
        &mut self.form
    }

    pub fn into_form(self) -> F {
        self.form
    }

    pub fn step(&self) -> WizardStep {
        let steps = self.form.steps();
        steps[self.position.min(steps.len().saturating_sub(1))]
    }

    /// Zero-based position and total number of steps.
    pub fn progress(&self) -> (usize, usize) {
        (self.position, self.form.steps().len())
    }

    pub fn is_last(&self) -> bool {
        self.position + 1 >= self.form.steps().len()
    }

    /// Move forward once the current step validates.
    pub fn advance(&mut self) -> Result<WizardStep, ValidationErrors> {
        self.form.validate_step(self.step())?;
        if !self.is_last() {
            self.position += 1;
        }
        Ok(self.step())
    }

    pub fn back(&mut self) -> WizardStep {
        self.position = self.position.saturating_sub(1);
        self.step()
    }

    /// Submit from the last step.
    pub async fn submit<G>(
        &self,
        client: &SubmissionClient<G>,
    ) -> Result<SubmissionReceipt, SubmissionError>
    where
        G: ApplicationGateway,
    {
        if !self.is_last() {
            return Err(SubmissionError::Incomplete { step: self.step() });
        }
        client.submit(&self.form).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("finish the {step:?} step before submitting")]
    Incomplete { step: WizardStep },
    #[error("{0}")]
    Invalid(ValidationErrors),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl SubmissionError {
    /// Field errors, whether found locally or reported by the store.
    pub fn field_errors(&self) -> Option<&ValidationErrors> {
        match self {
            SubmissionError::Invalid(errors) => Some(errors),
            SubmissionError::Gateway(GatewayError::Validation(errors)) => Some(errors),
            SubmissionError::Incomplete { .. } | SubmissionError::Gateway(_) => None,
        }
    }
}

/// Sends finished forms to the store.
pub struct SubmissionClient<G> {
    gateway: Arc<G>,
    notifier: Arc<dyn Notifier>,
}

impl<G> SubmissionClient<G>
where
    G: ApplicationGateway,
{
    pub fn new(gateway: Arc<G>, notifier: Arc<dyn Notifier>) -> Self {
        Self { gateway, notifier }
    }

    /// Submit an application for review. No session is created.
    pub async fn submit<F>(&self, form: &F) -> Result<SubmissionReceipt, SubmissionError>
    where
        F: ApplicationForm + ?Sized,
    {
        let role = form.role();
        if !role.requires_approval() {
            return Err(SubmissionError::Invalid(ValidationErrors::single(
                "user_type",
                format!("{role} accounts sign up directly"),
            )));
        }

        let submission = self.prepare(form).await?;
        match self.gateway.submit(submission).await {
            Ok(receipt) => {
                info!(%role, application_id = %receipt.id, "application submitted");
                self.notifier.notify(Notification::success(
                    "Application submitted. You can log in once it is approved.",
                ));
                Ok(receipt)
            }
            Err(err) => Err(self.failed(role, err)),
        }
    }

    /// Create an approval-free client account and return its grant.
    pub async fn register(&self, form: &ClientSignupForm) -> Result<AuthGrant, SubmissionError> {
        let submission = self.prepare(form).await?;
        match self.gateway.register_client(submission).await {
            Ok(grant) => {
                info!(user_id = %grant.user.id, "client registered");
                Ok(grant)
            }
            Err(err) => Err(self.failed(Role::Client, err)),
        }
    }

    async fn prepare<F>(&self, form: &F) -> Result<ApplicationSubmission, SubmissionError>
    where
        F: ApplicationForm + ?Sized,
    {
        // Local checks first: an invalid form never costs a directory fetch.
        let mut errors = form.validate_steps().err().unwrap_or_default();
        if matches!(form.firm_selection(), FirmSelection::Missing) && !errors.has("firm_id") {
            errors.merge(missing_firm());
        }
        if !errors.is_empty() {
            return Err(self.invalid(errors));
        }

        let firms = match form.firm_selection() {
            FirmSelection::NotApplicable | FirmSelection::Missing => ApprovedFirms::default(),
            FirmSelection::Selected(_) => match self.gateway.approved_firms().await {
                Ok(firms) => ApprovedFirms(firms),
                Err(err) => return Err(self.failed(form.role(), err)),
            },
        };
        form.finalize(&firms).map_err(|errors| self.invalid(errors))
    }

    fn invalid(&self, errors: ValidationErrors) -> SubmissionError {
        self.notifier
            .notify(Notification::error(format!("Please fix the form: {errors}")));
        SubmissionError::Invalid(errors)
    }

    fn failed(&self, role: Role, err: GatewayError) -> SubmissionError {
        warn!(%role, error = %err, "submission failed");
        self.notifier.notify(Notification::error(err.to_string()));
        SubmissionError::Gateway(err)
    }
}

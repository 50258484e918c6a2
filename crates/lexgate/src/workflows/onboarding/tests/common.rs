use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use serde_json::Value;

use crate::workflows::onboarding::domain::{
    ApplicationId, ApplicationProfile, ApplicationRecord, ApplicationStatus, ApplicationSubmission,
    ClientProfile, Decision, FirmClientProfile, FirmLawyerProfile, FirmSummary, LawFirmProfile,
    LawyerProfile, Role,
};
use crate::workflows::onboarding::repository::{
    EntityStore, MemoryEntityStore, RepositoryError, StatusChange,
};
use crate::workflows::onboarding::service::{AdminCredentials, OnboardingService};
use crate::workflows::onboarding::tokens::TokenIssuer;
use crate::workflows::onboarding::onboarding_router;

pub(super) const ADMIN_EMAIL: &str = "admin@nyaaysathi.com";
pub(super) const ADMIN_PASSWORD: &str = "admin123";

pub(super) fn admin_credentials() -> AdminCredentials {
    AdminCredentials {
        email: ADMIN_EMAIL.to_string(),
        password: ADMIN_PASSWORD.to_string(),
    }
}

pub(super) fn service_with<R: EntityStore + 'static>(store: Arc<R>) -> OnboardingService<R> {
    OnboardingService::new(store, TokenIssuer::new("test-secret"), admin_credentials())
}

pub(super) fn build_service() -> (OnboardingService<MemoryEntityStore>, Arc<MemoryEntityStore>) {
    let store = Arc::new(MemoryEntityStore::default());
    (service_with(store.clone()), store)
}

pub(super) fn lawyer_submission(email: &str) -> ApplicationSubmission {
    ApplicationSubmission {
        email: email.to_string(),
        password: "secret1".to_string(),
        profile: ApplicationProfile::Lawyer(LawyerProfile {
            name: "Asha Rao".to_string(),
            phone: "9876543210".to_string(),
            photo: None,
            bar_council_number: "KA/1234/2012".to_string(),
            specialization: "Family Law".to_string(),
            experience: 11,
            cases_won: 140,
            state: "Karnataka".to_string(),
            city: "Bengaluru".to_string(),
            court: "High Court".to_string(),
            education: "LLB, NLSIU".to_string(),
            languages: vec!["English".to_string(), "Kannada".to_string()],
            fee_range: "2000-5000".to_string(),
            bio: "Family and matrimonial disputes.".to_string(),
        }),
    }
}

pub(super) fn firm_submission(email: &str) -> ApplicationSubmission {
    ApplicationSubmission {
        email: email.to_string(),
        password: "firmpass".to_string(),
        profile: ApplicationProfile::LawFirm(LawFirmProfile {
            firm_name: "Rao & Partners".to_string(),
            registration_number: "REG-2201".to_string(),
            established_year: 2004,
            website: Some("https://raopartners.in".to_string()),
            contact_name: "Vikram Rao".to_string(),
            contact_phone: "9000000001".to_string(),
            contact_designation: Some("Managing Partner".to_string()),
            address: None,
            city: "Mumbai".to_string(),
            state: "Maharashtra".to_string(),
            pincode: Some("400001".to_string()),
            practice_areas: vec!["Corporate".to_string(), "Tax".to_string()],
            total_lawyers: 12,
            total_staff: 20,
            description: "Full-service corporate practice.".to_string(),
            achievements: None,
        }),
    }
}

pub(super) fn firm_lawyer_submission(email: &str, firm: &FirmSummary) -> ApplicationSubmission {
    ApplicationSubmission {
        email: email.to_string(),
        password: "secret1".to_string(),
        profile: ApplicationProfile::FirmLawyer(FirmLawyerProfile {
            full_name: "Meera Iyer".to_string(),
            phone: "9000000002".to_string(),
            firm: firm.reference(),
            specialization: "Tax".to_string(),
            experience_years: 4,
            bar_council_number: None,
            languages: vec!["English".to_string()],
        }),
    }
}

pub(super) fn firm_client_submission(email: &str, firm: &FirmSummary) -> ApplicationSubmission {
    ApplicationSubmission {
        email: email.to_string(),
        password: "secret1".to_string(),
        profile: ApplicationProfile::FirmClient(FirmClientProfile {
            full_name: "Karan Shah".to_string(),
            phone: "9000000003".to_string(),
            company_name: Some("Shah Textiles".to_string()),
            firm: firm.reference(),
            case_type: "Contract dispute".to_string(),
            case_description: "Supplier breached delivery terms.".to_string(),
        }),
    }
}

pub(super) fn client_submission(email: &str) -> ApplicationSubmission {
    ApplicationSubmission {
        email: email.to_string(),
        password: "secret1".to_string(),
        profile: ApplicationProfile::Client(ClientProfile {
            full_name: "Ravi Kumar".to_string(),
            phone: None,
        }),
    }
}

/// Submit a law firm and approve it so affiliated roles can reference it.
pub(super) fn approved_firm<R: EntityStore + 'static>(
    service: &OnboardingService<R>,
    email: &str,
) -> FirmSummary {
    let record = service.submit(firm_submission(email)).expect("firm submitted");
    service
        .decide(Role::LawFirm, &record.id, Decision::Approve, ADMIN_EMAIL, None)
        .expect("firm approved");
    service
        .approved_firms()
        .expect("firms listed")
        .into_iter()
        .find(|firm| firm.id.as_str() == record.id.as_str())
        .expect("firm is listed once approved")
}

pub(super) fn admin_token<R: EntityStore + 'static>(service: &OnboardingService<R>) -> String {
    service
        .admin_login(ADMIN_EMAIL, ADMIN_PASSWORD)
        .expect("admin login")
        .token
}

/// Store that reports every e-mail as taken.
pub(super) struct ConflictStore;

impl EntityStore for ConflictStore {
    fn insert(&self, _record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        Err(RepositoryError::EmailTaken)
    }

    fn fetch(&self, _id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        Ok(None)
    }

    fn by_email(&self, _email: &str) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        Ok(Vec::new())
    }

    fn list(&self, _role: Role) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        Ok(Vec::new())
    }

    fn transition(
        &self,
        _id: &ApplicationId,
        _expected: ApplicationStatus,
        _next: StatusChange,
    ) -> Result<ApplicationRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("read only".to_string()))
    }
}

pub(super) struct UnavailableStore;

impl EntityStore for UnavailableStore {
    fn insert(&self, _record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn by_email(&self, _email: &str) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list(&self, _role: Role) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn transition(
        &self,
        _id: &ApplicationId,
        _expected: ApplicationStatus,
        _next: StatusChange,
    ) -> Result<ApplicationRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn router_with_service(service: OnboardingService<MemoryEntityStore>) -> axum::Router {
    onboarding_router(Arc::new(service))
}

pub(super) fn json_request(method: &str, uri: &str, body: &Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(serde_json::to_vec(body).expect("serialize body")))
        .expect("request builds")
}

pub(super) fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request builds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

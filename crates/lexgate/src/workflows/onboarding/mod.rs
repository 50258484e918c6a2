//! Application intake, admin review and credential issuance for every
//! marketplace role.
//!
//! The service here is the store side of the workflow: it validates and
//! persists submissions, applies review decisions exactly once, and only
//! authenticates records that reached the approved state.

pub mod credentials;
pub mod domain;
pub mod repository;
pub mod router;
pub mod service;
pub mod tokens;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    normalize_email, ApplicationId, ApplicationListing, ApplicationProfile, ApplicationRecord,
    ApplicationStatus, ApplicationSubmission, ApplicationView, AuthGrant, ClientProfile, Decision,
    DecisionReceipt, FirmClientProfile, FirmId, FirmLawyerProfile, FirmReference, FirmSummary,
    LawFirmProfile, LawyerProfile, LoginRequest, ReviewSection, Role, StatusCounts, StatusFilter,
    SubmissionReceipt, UnknownVariant, UserProfile,
};
pub use repository::{EntityStore, MemoryEntityStore, RepositoryError, StatusChange};
pub use router::{onboarding_router, CreateApplicationRequest, CredentialsBody, DecisionBody};
pub use service::{AdminCredentials, OnboardingError, OnboardingService, INVALID_LOGIN};
pub use tokens::{Claims, TokenError, TokenIssuer};
pub use validation::{
    FieldChecks, FieldError, ValidationErrors, MAX_EXPERIENCE_YEARS, MIN_PASSWORD_LEN,
};

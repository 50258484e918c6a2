use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::credentials::{hash_password, verify_password, CredentialError};
use super::domain::{
    normalize_email, ApplicationId, ApplicationListing, ApplicationRecord, ApplicationStatus,
    ApplicationSubmission, ApplicationView, AuthGrant, Decision, DecisionReceipt, FirmId,
    FirmSummary, LoginRequest, Role, UserProfile,
};
use super::repository::{EntityStore, RepositoryError, StatusChange};
use super::tokens::{Claims, TokenError, TokenIssuer};
use super::validation::{validate_submission, ValidationErrors};

/// Message shared by wrong-password and not-yet-approved logins.
pub const INVALID_LOGIN: &str = "invalid credentials or pending approval";

/// Configured administrator credentials.
#[derive(Clone)]
pub struct AdminCredentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Store-side service owning every application state transition.
pub struct OnboardingService<R> {
    repository: Arc<R>,
    tokens: TokenIssuer,
    admin: AdminCredentials,
}

impl<R> OnboardingService<R>
where
    R: EntityStore + 'static,
{
    pub fn new(repository: Arc<R>, tokens: TokenIssuer, admin: AdminCredentials) -> Self {
        Self {
            repository,
            tokens,
            admin,
        }
    }

    /// Create an application. Roles that need vetting start out pending;
    /// the rest are approved on the spot.
    pub fn submit(
        &self,
        mut submission: ApplicationSubmission,
    ) -> Result<ApplicationRecord, OnboardingError> {
        submission.email = normalize_email(&submission.email);
        validate_submission(&submission)?;

        if let Some(firm) = submission.profile.firm() {
            self.approved_firm(&firm.firm_id)?;
        }

        let role = submission.role();
        let status = if role.requires_approval() {
            ApplicationStatus::Pending
        } else {
            ApplicationStatus::Approved
        };

        let record = ApplicationRecord {
            id: ApplicationId::generate(),
            email: submission.email,
            password_hash: hash_password(&submission.password)?,
            status,
            profile: submission.profile,
            created_at: Utc::now(),
            reviewed_at: None,
            reviewed_by: None,
            rejection_reason: None,
        };

        let stored = self.repository.insert(record).map_err(|err| match err {
            RepositoryError::EmailTaken => OnboardingError::DuplicateEmail,
            other => OnboardingError::Repository(other),
        })?;

        info!(application_id = %stored.id, %role, status = %stored.status, "application submitted");
        Ok(stored)
    }

    /// Client signup: no review, the caller is logged in immediately.
    pub fn register_client(
        &self,
        submission: ApplicationSubmission,
    ) -> Result<AuthGrant, OnboardingError> {
        let role = submission.role();
        if role.requires_approval() {
            return Err(OnboardingError::Validation(ValidationErrors::single(
                "user_type",
                format!("{role} accounts must apply for approval"),
            )));
        }
        let record = self.submit(submission)?;
        self.grant(&record)
    }

    pub fn get(&self, id: &ApplicationId) -> Result<ApplicationRecord, OnboardingError> {
        self.repository
            .fetch(id)?
            .ok_or(OnboardingError::NotFound)
    }

    /// Every application of one role, with counts over the whole population.
    pub fn list(&self, role: Role) -> Result<ApplicationListing, OnboardingError> {
        let records = self.repository.list(role)?;
        let views = records.iter().map(ApplicationRecord::view).collect();
        Ok(ApplicationListing::new(views))
    }

    pub fn approved_firms(&self) -> Result<Vec<FirmSummary>, OnboardingError> {
        Ok(self
            .repository
            .list(Role::LawFirm)?
            .iter()
            .filter_map(FirmSummary::from_record)
            .collect())
    }

    /// Client applications that reference the given firm.
    pub fn firm_clients(&self, firm_id: &FirmId) -> Result<Vec<ApplicationView>, OnboardingError> {
        self.affiliated(firm_id, Role::FirmClient)
    }

    /// Lawyer applications that reference the given firm.
    pub fn firm_lawyers(&self, firm_id: &FirmId) -> Result<Vec<ApplicationView>, OnboardingError> {
        self.affiliated(firm_id, Role::FirmLawyer)
    }

    fn affiliated(&self, firm_id: &FirmId, role: Role) -> Result<Vec<ApplicationView>, OnboardingError> {
        self.approved_firm(firm_id)?;
        Ok(self
            .repository
            .list(role)?
            .iter()
            .filter(|record| {
                record
                    .profile
                    .firm()
                    .is_some_and(|firm| &firm.firm_id == firm_id)
            })
            .map(ApplicationRecord::view)
            .collect())
    }

    fn approved_firm(&self, firm_id: &FirmId) -> Result<FirmSummary, OnboardingError> {
        let id = ApplicationId(firm_id.0.clone());
        self.repository
            .fetch(&id)?
            .as_ref()
            .and_then(FirmSummary::from_record)
            .ok_or_else(|| OnboardingError::UnknownFirm(firm_id.clone()))
    }

    /// Apply a decision to a pending application of `role`.
    ///
    /// Repeating the decision an application already carries is a no-op;
    /// the opposite decision is refused. A rejection may carry a reason,
    /// which is stored with the record.
    pub fn decide(
        &self,
        role: Role,
        id: &ApplicationId,
        decision: Decision,
        reviewer: &str,
        reason: Option<&str>,
    ) -> Result<DecisionReceipt, OnboardingError> {
        let record = self.get(id)?;
        if record.role() != role {
            return Err(OnboardingError::NotFound);
        }

        let target = decision.resulting_status();
        if record.status.is_final() {
            return Self::settled(id, record.status, target);
        }

        let change = StatusChange {
            status: target,
            reviewed_by: reviewer.to_string(),
            reviewed_at: Utc::now(),
            rejection_reason: decision.recorded_reason(reason),
        };
        match self
            .repository
            .transition(id, ApplicationStatus::Pending, change)
        {
            Ok(updated) => {
                info!(application_id = %id, %role, %decision, reviewer, "application decided");
                Ok(DecisionReceipt {
                    id: updated.id,
                    status: updated.status,
                    changed: true,
                })
            }
            Err(RepositoryError::StatusMismatch { current, .. }) => {
                Self::settled(id, current, target)
            }
            Err(other) => Err(other.into()),
        }
    }

    fn settled(
        id: &ApplicationId,
        current: ApplicationStatus,
        target: ApplicationStatus,
    ) -> Result<DecisionReceipt, OnboardingError> {
        if current == target {
            debug!(application_id = %id, status = %current, "decision already applied");
            Ok(DecisionReceipt {
                id: id.clone(),
                status: current,
                changed: false,
            })
        } else {
            Err(OnboardingError::AlreadyDecided { current })
        }
    }

    /// Exchange credentials for a token. Only approved records authenticate.
    pub fn authenticate(&self, request: &LoginRequest) -> Result<AuthGrant, OnboardingError> {
        if request.role == Role::Admin {
            return self.admin_login(&request.email, &request.password);
        }

        let email = normalize_email(&request.email);
        let candidates = self.repository.by_email(&email)?;
        for record in candidates
            .iter()
            .filter(|record| record.role() == request.role && record.can_authenticate())
        {
            if verify_password(&request.password, &record.password_hash)? {
                info!(user_id = %record.id, role = %request.role, "login succeeded");
                return self.grant(record);
            }
        }

        warn!(role = %request.role, "login refused");
        Err(OnboardingError::InvalidCredentials)
    }

    pub fn admin_login(&self, email: &str, password: &str) -> Result<AuthGrant, OnboardingError> {
        let email = normalize_email(email);
        if email != normalize_email(&self.admin.email) || password != self.admin.password {
            warn!("admin login refused");
            return Err(OnboardingError::InvalidCredentials);
        }
        let token = self.tokens.issue("admin", &email, Role::Admin)?;
        Ok(AuthGrant {
            token,
            user: UserProfile {
                id: "admin".to_string(),
                email: email.clone(),
                display_name: "Administrator".to_string(),
                role: Role::Admin,
                firm_id: None,
            },
        })
    }

    fn grant(&self, record: &ApplicationRecord) -> Result<AuthGrant, OnboardingError> {
        let token = self.tokens.issue(record.id.as_str(), &record.email, record.role())?;
        Ok(AuthGrant {
            token,
            user: record.user_profile(),
        })
    }

    /// Resolve a bearer token issued by this service.
    pub fn authorize(&self, token: &str) -> Result<Claims, OnboardingError> {
        self.tokens.verify(token).map_err(OnboardingError::from)
    }

    /// Resolve a bearer token and require the admin role.
    pub fn authorize_admin(&self, token: &str) -> Result<Claims, OnboardingError> {
        let claims = self.authorize(token)?;
        match claims.role {
            Role::Admin => Ok(claims),
            Role::Client | Role::Lawyer | Role::LawFirm | Role::FirmLawyer | Role::FirmClient => {
                Err(OnboardingError::Forbidden)
            }
        }
    }

    /// Resolve a bearer token that may read `firm_id`'s roster: the firm's
    /// own token or an admin's.
    pub fn authorize_firm(&self, token: &str, firm_id: &FirmId) -> Result<Claims, OnboardingError> {
        let claims = self.authorize(token)?;
        match claims.role {
            Role::Admin => Ok(claims),
            Role::LawFirm if claims.sub == firm_id.0 => Ok(claims),
            Role::Client | Role::Lawyer | Role::LawFirm | Role::FirmLawyer | Role::FirmClient => {
                Err(OnboardingError::Forbidden)
            }
        }
    }
}

/// Error raised by the onboarding service.
#[derive(Debug, thiserror::Error)]
pub enum OnboardingError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("an account or application with this email already exists")]
    DuplicateEmail,
    #[error("law firm {0} does not exist or is not approved")]
    UnknownFirm(FirmId),
    #[error("application not found")]
    NotFound,
    #[error("application already {current}")]
    AlreadyDecided { current: ApplicationStatus },
    #[error("invalid credentials or pending approval")]
    InvalidCredentials,
    #[error("{0}")]
    Unauthorized(String),
    #[error("admin access required")]
    Forbidden,
    #[error("failed to issue token: {0}")]
    Signing(String),
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<TokenError> for OnboardingError {
    fn from(value: TokenError) -> Self {
        match value {
            TokenError::Expired | TokenError::Invalid => Self::Unauthorized(value.to_string()),
            TokenError::Signing(message) => Self::Signing(message),
        }
    }
}

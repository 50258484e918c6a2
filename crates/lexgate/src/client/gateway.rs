use async_trait::async_trait;

use crate::workflows::onboarding::{
    ApplicationId, ApplicationListing, ApplicationSubmission, ApplicationView, AuthGrant,
    Decision, DecisionReceipt, FirmId, FirmSummary, LoginRequest, OnboardingError, ReviewSection,
    StatusFilter, SubmissionReceipt, ValidationErrors,
};

/// Everything the client side needs from the entity store.
///
/// Implementations hide how each section is addressed: some lists come back
/// as an envelope with counts and some as a bare array, some decisions are
/// path segments and some are query parameters. Callers only see
/// [`ApplicationListing`] and [`DecisionReceipt`].
#[async_trait]
pub trait ApplicationGateway: Send + Sync {
    async fn submit(
        &self,
        submission: ApplicationSubmission,
    ) -> Result<SubmissionReceipt, GatewayError>;

    async fn register_client(
        &self,
        submission: ApplicationSubmission,
    ) -> Result<AuthGrant, GatewayError>;

    async fn approved_firms(&self) -> Result<Vec<FirmSummary>, GatewayError>;

    /// Client applications of one firm; `token` must be the firm's own or an admin's.
    async fn firm_clients(
        &self,
        token: &str,
        firm_id: &FirmId,
    ) -> Result<Vec<ApplicationView>, GatewayError>;

    /// One section's applications. `stats` always cover the whole section;
    /// `filter` only narrows `applications`.
    async fn list(
        &self,
        token: &str,
        section: ReviewSection,
        filter: StatusFilter,
    ) -> Result<ApplicationListing, GatewayError>;

    async fn decide(
        &self,
        token: &str,
        section: ReviewSection,
        id: &ApplicationId,
        decision: Decision,
        reason: Option<&str>,
    ) -> Result<DecisionReceipt, GatewayError>;

    async fn login(&self, request: &LoginRequest) -> Result<AuthGrant, GatewayError>;

    /// Returns the admin token.
    async fn admin_login(&self, email: &str, password: &str) -> Result<String, GatewayError>;
}

/// Client-side error taxonomy.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    #[error("{0}")]
    Validation(ValidationErrors),
    #[error("{0}")]
    Conflict(String),
    /// 401 or 403 from the store.
    #[error("{detail}")]
    Unauthorized { status: u16, detail: String },
    #[error("{0}")]
    NotFound(String),
    /// Any other client error the store answered with.
    #[error("request refused ({status}): {detail}")]
    Rejected { status: u16, detail: String },
    /// Network failures and server-side errors; the caller may retry by hand.
    #[error("service unavailable: {0}")]
    Transient(String),
}

impl GatewayError {
    /// Whether the caller's session must be discarded.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, GatewayError::Unauthorized { .. })
    }

    pub(crate) fn from_status(status: u16, detail: String, errors: Option<ValidationErrors>) -> Self {
        match status {
            401 | 403 => GatewayError::Unauthorized { status, detail },
            404 => GatewayError::NotFound(detail),
            409 => GatewayError::Conflict(detail),
            422 => GatewayError::Validation(
                errors
                    .filter(|errors| !errors.is_empty())
                    .unwrap_or_else(|| ValidationErrors::single("form", detail)),
            ),
            500..=599 => GatewayError::Transient(detail),
            _ => GatewayError::Rejected { status, detail },
        }
    }
}

impl From<OnboardingError> for GatewayError {
    fn from(value: OnboardingError) -> Self {
        match value {
            OnboardingError::Validation(errors) => GatewayError::Validation(errors),
            OnboardingError::UnknownFirm(_) => {
                GatewayError::Validation(ValidationErrors::single("firm_id", value.to_string()))
            }
            OnboardingError::DuplicateEmail | OnboardingError::AlreadyDecided { .. } => {
                GatewayError::Conflict(value.to_string())
            }
            OnboardingError::NotFound => GatewayError::NotFound(value.to_string()),
            OnboardingError::InvalidCredentials | OnboardingError::Unauthorized(_) => {
                GatewayError::Unauthorized {
                    status: 401,
                    detail: value.to_string(),
                }
            }
            OnboardingError::Forbidden => GatewayError::Unauthorized {
                status: 403,
                detail: value.to_string(),
            },
            OnboardingError::Signing(_)
            | OnboardingError::Credential(_)
            | OnboardingError::Repository(_) => GatewayError::Transient(value.to_string()),
        }
    }
}

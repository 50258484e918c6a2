use std::sync::Arc;

use async_trait::async_trait;

use super::gateway::{ApplicationGateway, GatewayError};
use crate::workflows::onboarding::{
    ApplicationId, ApplicationListing, ApplicationSubmission, ApplicationView, AuthGrant,
    Decision, DecisionReceipt, EntityStore, FirmId, FirmSummary, LoginRequest, OnboardingService,
    ReviewSection, StatusFilter, SubmissionReceipt,
};

/// In-process gateway calling the onboarding service directly.
///
/// Runs the same authorization checks as the HTTP router, so client code
/// behaves identically against either gateway.
pub struct LocalGateway<R> {
    service: Arc<OnboardingService<R>>,
}

impl<R> Clone for LocalGateway<R> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

impl<R> LocalGateway<R>
where
    R: EntityStore + 'static,
{
    pub fn new(service: Arc<OnboardingService<R>>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &Arc<OnboardingService<R>> {
        &self.service
    }
}

#[async_trait]
impl<R> ApplicationGateway for LocalGateway<R>
where
    R: EntityStore + 'static,
{
    async fn submit(
        &self,
        submission: ApplicationSubmission,
    ) -> Result<SubmissionReceipt, GatewayError> {
        let record = self.service.submit(submission)?;
        Ok(SubmissionReceipt::for_record(&record))
    }

    async fn register_client(
        &self,
        submission: ApplicationSubmission,
    ) -> Result<AuthGrant, GatewayError> {
        Ok(self.service.register_client(submission)?)
    }

    async fn approved_firms(&self) -> Result<Vec<FirmSummary>, GatewayError> {
        Ok(self.service.approved_firms()?)
    }

    async fn firm_clients(
        &self,
        token: &str,
        firm_id: &FirmId,
    ) -> Result<Vec<ApplicationView>, GatewayError> {
        self.service.authorize_firm(token, firm_id)?;
        Ok(self.service.firm_clients(firm_id)?)
    }

    async fn list(
        &self,
        token: &str,
        section: ReviewSection,
        filter: StatusFilter,
    ) -> Result<ApplicationListing, GatewayError> {
        self.service.authorize_admin(token)?;
        Ok(self.service.list(section.role())?.filtered(filter))
    }

    async fn decide(
        &self,
        token: &str,
        section: ReviewSection,
        id: &ApplicationId,
        decision: Decision,
        reason: Option<&str>,
    ) -> Result<DecisionReceipt, GatewayError> {
        let claims = self.service.authorize_admin(token)?;
        Ok(self
            .service
            .decide(section.role(), id, decision, &claims.email, reason)?)
    }

    async fn login(&self, request: &LoginRequest) -> Result<AuthGrant, GatewayError> {
        Ok(self.service.authenticate(request)?)
    }

    async fn admin_login(&self, email: &str, password: &str) -> Result<String, GatewayError> {
        Ok(self.service.admin_login(email, password)?.token)
    }
}

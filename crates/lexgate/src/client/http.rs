use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::gateway::{ApplicationGateway, GatewayError};
use crate::workflows::onboarding::{
    ApplicationId, ApplicationListing, ApplicationSubmission, ApplicationView, AuthGrant,
    Decision, DecisionBody, DecisionReceipt, FirmId, FirmSummary, LoginRequest, ReviewSection,
    Role, StatusFilter, SubmissionReceipt, ValidationErrors,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Gateway speaking the store's JSON-over-HTTP interface.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::Transient(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn submission_path(role: Role) -> Option<&'static str> {
        match role {
            Role::Lawyer => Some("/api/lawyer-applications"),
            Role::LawFirm => Some("/api/lawfirm-applications"),
            Role::FirmLawyer => Some("/api/firm-lawyer-applications"),
            Role::FirmClient => Some("/api/firm-clients/apply"),
            Role::Client | Role::Admin => None,
        }
    }

    fn list_path(section: ReviewSection) -> &'static str {
        match section {
            ReviewSection::Lawyers => "/api/admin/lawyer-applications",
            ReviewSection::LawFirms => "/api/admin/lawfirm-applications",
            ReviewSection::FirmLawyers => "/api/firm-lawyers/applications",
            ReviewSection::FirmClients => "/api/firm-clients/applications/all",
        }
    }

    fn decision_request(
        &self,
        section: ReviewSection,
        id: &ApplicationId,
        decision: Decision,
        reason: Option<&str>,
    ) -> RequestBuilder {
        let body = DecisionBody {
            reason: reason.map(str::to_string),
        };
        let status = decision.resulting_status().label();
        let query = match reason {
            Some(reason) => vec![("status", status), ("reason", reason)],
            None => vec![("status", status)],
        };
        match section {
            ReviewSection::Lawyers => self
                .client
                .put(self.url(&format!(
                    "/api/admin/lawyer-applications/{id}/{}",
                    decision.label()
                )))
                .json(&body),
            ReviewSection::LawFirms => self
                .client
                .put(self.url(&format!(
                    "/api/admin/lawfirm-applications/{id}/{}",
                    decision.label()
                )))
                .json(&body),
            ReviewSection::FirmLawyers => self
                .client
                .put(self.url(&format!("/api/firm-lawyers/applications/{id}/status")))
                .query(&query),
            ReviewSection::FirmClients => self
                .client
                .put(self.url(&format!("/api/firm-clients/applications/{id}/status")))
                .query(&query),
        }
    }

    /// Flat creation body: credentials next to the profile fields.
    fn submission_body(submission: &ApplicationSubmission) -> Result<Value, GatewayError> {
        let mut body = serde_json::to_value(&submission.profile)
            .map_err(|e| GatewayError::Transient(format!("failed to encode application: {e}")))?;
        if let Value::Object(fields) = &mut body {
            fields.insert("email".to_string(), json!(submission.email));
            fields.insert("password".to_string(), json!(submission.password));
        }
        Ok(body)
    }
}

/// Either list shape the store answers with.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListBody {
    Envelope { applications: Vec<ApplicationView> },
    Array(Vec<ApplicationView>),
}

impl ListBody {
    fn into_applications(self) -> Vec<ApplicationView> {
        match self {
            ListBody::Envelope { applications } | ListBody::Array(applications) => applications,
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    errors: Option<ValidationErrors>,
}

#[derive(Deserialize)]
struct TokenBody {
    token: String,
}

async fn send(request: RequestBuilder) -> Result<Response, GatewayError> {
    request
        .send()
        .await
        .map_err(|e| GatewayError::Transient(format!("network error: {e}")))
}

async fn read<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    let status = response.status();
    if !status.is_success() {
        return Err(failure(status, response).await);
    }
    response
        .json::<T>()
        .await
        .map_err(|e| GatewayError::Transient(format!("failed to parse response: {e}")))
}

async fn failure(status: StatusCode, response: Response) -> GatewayError {
    let text = response.text().await.unwrap_or_default();
    let (detail, errors) = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => (body.detail, body.errors),
        Err(_) => (None, None),
    };
    let detail = detail
        .filter(|detail| !detail.is_empty())
        .unwrap_or_else(|| format!("request failed with status {status}"));
    GatewayError::from_status(status.as_u16(), detail, errors)
}

#[async_trait]
impl ApplicationGateway for HttpGateway {
    async fn submit(
        &self,
        submission: ApplicationSubmission,
    ) -> Result<SubmissionReceipt, GatewayError> {
        let role = submission.role();
        let path = Self::submission_path(role).ok_or_else(|| {
            GatewayError::Validation(ValidationErrors::single(
                "user_type",
                format!("{role} accounts do not go through review"),
            ))
        })?;
        let body = Self::submission_body(&submission)?;
        debug!(%role, path, "submitting application");
        read(send(self.client.post(self.url(path)).json(&body)).await?).await
    }

    async fn register_client(
        &self,
        submission: ApplicationSubmission,
    ) -> Result<AuthGrant, GatewayError> {
        let body = Self::submission_body(&submission)?;
        read(send(self.client.post(self.url("/api/auth/register")).json(&body)).await?).await
    }

    async fn approved_firms(&self) -> Result<Vec<FirmSummary>, GatewayError> {
        read(send(self.client.get(self.url("/api/lawfirms"))).await?).await
    }

    async fn firm_clients(
        &self,
        token: &str,
        firm_id: &FirmId,
    ) -> Result<Vec<ApplicationView>, GatewayError> {
        let path = format!("/api/lawfirms/{firm_id}/clients");
        read(send(self.client.get(self.url(&path)).bearer_auth(token)).await?).await
    }

    async fn list(
        &self,
        token: &str,
        section: ReviewSection,
        filter: StatusFilter,
    ) -> Result<ApplicationListing, GatewayError> {
        let request = self
            .client
            .get(self.url(Self::list_path(section)))
            .bearer_auth(token);
        let response = send(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(%section, "list endpoint not available, treating section as empty");
            return Ok(ApplicationListing::default());
        }
        let body: ListBody = read(response).await?;
        Ok(ApplicationListing::new(body.into_applications()).filtered(filter))
    }

    async fn decide(
        &self,
        token: &str,
        section: ReviewSection,
        id: &ApplicationId,
        decision: Decision,
        reason: Option<&str>,
    ) -> Result<DecisionReceipt, GatewayError> {
        let request = self
            .decision_request(section, id, decision, reason)
            .bearer_auth(token);
        read(send(request).await?).await
    }

    async fn login(&self, request: &LoginRequest) -> Result<AuthGrant, GatewayError> {
        let credentials = json!({ "email": request.email, "password": request.password });
        let builder = match request.role {
            Role::FirmLawyer => self
                .client
                .post(self.url("/api/firm-lawyers/login"))
                .json(&credentials),
            Role::FirmClient => self
                .client
                .post(self.url("/api/firm-clients/login"))
                .json(&credentials),
            Role::Client | Role::Lawyer | Role::LawFirm | Role::Admin => {
                self.client.post(self.url("/api/auth/login")).json(request)
            }
        };
        read(send(builder).await?).await
    }

    async fn admin_login(&self, email: &str, password: &str) -> Result<String, GatewayError> {
        let body = json!({ "email": email, "password": password });
        let response: TokenBody =
            read(send(self.client.post(self.url("/api/admin/login")).json(&body)).await?).await?;
        Ok(response.token)
    }
}

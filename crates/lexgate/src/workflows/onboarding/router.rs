use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{
    ApplicationId, ApplicationProfile, ApplicationSubmission, ClientProfile, Decision,
    FirmClientProfile, FirmId, FirmLawyerProfile, LawFirmProfile, LawyerProfile, LoginRequest,
    Role, SubmissionReceipt,
};
use super::repository::EntityStore;
use super::service::{OnboardingError, OnboardingService};
use super::tokens::Claims;

/// Creation body: credentials next to the role's flat profile fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateApplicationRequest<P> {
    pub email: String,
    pub password: String,
    #[serde(flatten)]
    pub profile: P,
}

impl<P> CreateApplicationRequest<P>
where
    P: Into<ApplicationProfile>,
{
    pub fn into_submission(self) -> ApplicationSubmission {
        ApplicationSubmission {
            email: self.email,
            password: self.password,
            profile: self.profile.into(),
        }
    }
}

impl From<ClientProfile> for ApplicationProfile {
    fn from(value: ClientProfile) -> Self {
        ApplicationProfile::Client(value)
    }
}

impl From<LawyerProfile> for ApplicationProfile {
    fn from(value: LawyerProfile) -> Self {
        ApplicationProfile::Lawyer(value)
    }
}

impl From<LawFirmProfile> for ApplicationProfile {
    fn from(value: LawFirmProfile) -> Self {
        ApplicationProfile::LawFirm(value)
    }
}

impl From<FirmLawyerProfile> for ApplicationProfile {
    fn from(value: FirmLawyerProfile) -> Self {
        ApplicationProfile::FirmLawyer(value)
    }
}

impl From<FirmClientProfile> for ApplicationProfile {
    fn from(value: FirmClientProfile) -> Self {
        ApplicationProfile::FirmClient(value)
    }
}

/// Body of the role-specific login endpoints, which fix the role themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsBody {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusQuery {
    pub status: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Optional body of an approve/reject call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecisionBody {
    #[serde(default, alias = "rejection_reason")]
    pub reason: Option<String>,
}

/// Router builder exposing the onboarding endpoints.
///
/// Path shapes follow the deployed web client, including the firm-lawyer and
/// firm-client endpoints that take the decision as a query parameter and list
/// as a bare array.
pub fn onboarding_router<R>(service: Arc<OnboardingService<R>>) -> Router
where
    R: EntityStore + 'static,
{
    Router::new()
        .route(
            "/api/lawyer-applications",
            post(submit_handler::<R, LawyerProfile>),
        )
        .route(
            "/api/lawfirm-applications",
            post(submit_handler::<R, LawFirmProfile>),
        )
        .route(
            "/api/firm-lawyer-applications",
            post(submit_handler::<R, FirmLawyerProfile>),
        )
        .route(
            "/api/firm-clients/apply",
            post(submit_handler::<R, FirmClientProfile>),
        )
        .route("/api/auth/register", post(register_handler::<R>))
        .route("/api/auth/login", post(login_handler::<R>))
        .route("/api/auth/me", get(me_handler::<R>))
        .route("/api/firm-lawyers/login", post(firm_lawyer_login_handler::<R>))
        .route("/api/firm-clients/login", post(firm_client_login_handler::<R>))
        .route("/api/admin/login", post(admin_login_handler::<R>))
        .route("/api/lawfirms", get(firms_handler::<R>))
        .route(
            "/api/lawfirms/:firm_id/clients",
            get(firm_clients_handler::<R>),
        )
        .route(
            "/api/lawfirms/:firm_id/lawyers",
            get(firm_lawyers_handler::<R>),
        )
        .route(
            "/api/admin/lawyer-applications",
            get(envelope_list_handler::<R, LawyerSection>),
        )
        .route(
            "/api/admin/lawfirm-applications",
            get(envelope_list_handler::<R, LawFirmSection>),
        )
        .route(
            "/api/firm-lawyers/applications",
            get(array_list_handler::<R, FirmLawyerSection>),
        )
        .route(
            "/api/firm-clients/applications/all",
            get(array_list_handler::<R, FirmClientSection>),
        )
        .route(
            "/api/admin/lawyer-applications/:id/:action",
            put(path_decision_handler::<R, LawyerSection>),
        )
        .route(
            "/api/admin/lawfirm-applications/:id/:action",
            put(path_decision_handler::<R, LawFirmSection>),
        )
        .route(
            "/api/firm-lawyers/applications/:id/status",
            put(query_decision_handler::<R, FirmLawyerSection>),
        )
        .route(
            "/api/firm-clients/applications/:id/status",
            put(query_decision_handler::<R, FirmClientSection>),
        )
        .with_state(service)
}

/// Binds a handler instantiation to the role whose applications it serves.
pub trait SectionRole: Send + Sync + 'static {
    const ROLE: Role;
}

pub struct LawyerSection;
pub struct LawFirmSection;
pub struct FirmLawyerSection;
pub struct FirmClientSection;

impl SectionRole for LawyerSection {
    const ROLE: Role = Role::Lawyer;
}

impl SectionRole for LawFirmSection {
    const ROLE: Role = Role::LawFirm;
}

impl SectionRole for FirmLawyerSection {
    const ROLE: Role = Role::FirmLawyer;
}

impl SectionRole for FirmClientSection {
    const ROLE: Role = Role::FirmClient;
}

type ServiceState<R> = State<Arc<OnboardingService<R>>>;

pub(crate) async fn submit_handler<R, P>(
    State(service): ServiceState<R>,
    Json(request): Json<CreateApplicationRequest<P>>,
) -> Response
where
    R: EntityStore + 'static,
    P: Into<ApplicationProfile> + DeserializeOwned + Send + 'static,
{
    match service.submit(request.into_submission()) {
        Ok(record) => (
            StatusCode::ACCEPTED,
            Json(SubmissionReceipt::for_record(&record)),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn register_handler<R>(
    State(service): ServiceState<R>,
    Json(request): Json<CreateApplicationRequest<ClientProfile>>,
) -> Response
where
    R: EntityStore + 'static,
{
    match service.register_client(request.into_submission()) {
        Ok(grant) => (StatusCode::CREATED, Json(grant)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn login_handler<R>(
    State(service): ServiceState<R>,
    Json(request): Json<LoginRequest>,
) -> Response
where
    R: EntityStore + 'static,
{
    match service.authenticate(&request) {
        Ok(grant) => (StatusCode::OK, Json(grant)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn fixed_role_login<R>(
    service: &OnboardingService<R>,
    body: CredentialsBody,
    role: Role,
) -> Response
where
    R: EntityStore + 'static,
{
    let request = LoginRequest {
        email: body.email,
        password: body.password,
        role,
    };
    match service.authenticate(&request) {
        Ok(grant) => (StatusCode::OK, Json(grant)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn firm_lawyer_login_handler<R>(
    State(service): ServiceState<R>,
    Json(body): Json<CredentialsBody>,
) -> Response
where
    R: EntityStore + 'static,
{
    fixed_role_login(&service, body, Role::FirmLawyer).await
}

pub(crate) async fn firm_client_login_handler<R>(
    State(service): ServiceState<R>,
    Json(body): Json<CredentialsBody>,
) -> Response
where
    R: EntityStore + 'static,
{
    fixed_role_login(&service, body, Role::FirmClient).await
}

pub(crate) async fn admin_login_handler<R>(
    State(service): ServiceState<R>,
    Json(body): Json<CredentialsBody>,
) -> Response
where
    R: EntityStore + 'static,
{
    match service.admin_login(&body.email, &body.password) {
        Ok(grant) => (
            StatusCode::OK,
            Json(json!({ "token": grant.token, "message": "Login successful" })),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn me_handler<R>(State(service): ServiceState<R>, headers: HeaderMap) -> Response
where
    R: EntityStore + 'static,
{
    let claims = match authenticated(&service, &headers) {
        Ok(claims) => claims,
        Err(response) => return response,
    };
    match claims.role {
        Role::Admin => (StatusCode::OK, Json(json!({ "email": claims.email, "user_type": "admin" })))
            .into_response(),
        Role::Client | Role::Lawyer | Role::LawFirm | Role::FirmLawyer | Role::FirmClient => {
            match service.get(&ApplicationId(claims.sub)) {
                Ok(record) if record.can_authenticate() => {
                    (StatusCode::OK, Json(record.user_profile())).into_response()
                }
                Ok(_) => error_response(OnboardingError::Unauthorized(
                    "account is not active".to_string(),
                )),
                Err(err) => error_response(err),
            }
        }
    }
}

pub(crate) async fn firms_handler<R>(State(service): ServiceState<R>) -> Response
where
    R: EntityStore + 'static,
{
    match service.approved_firms() {
        Ok(firms) => (StatusCode::OK, Json(firms)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn firm_clients_handler<R>(
    State(service): ServiceState<R>,
    headers: HeaderMap,
    Path(firm_id): Path<String>,
) -> Response
where
    R: EntityStore + 'static,
{
    let firm_id = FirmId(firm_id);
    if let Err(response) = firm_member(&service, &headers, &firm_id) {
        return response;
    }
    match service.firm_clients(&firm_id) {
        Ok(clients) => (StatusCode::OK, Json(clients)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn firm_lawyers_handler<R>(
    State(service): ServiceState<R>,
    headers: HeaderMap,
    Path(firm_id): Path<String>,
) -> Response
where
    R: EntityStore + 'static,
{
    let firm_id = FirmId(firm_id);
    if let Err(response) = firm_member(&service, &headers, &firm_id) {
        return response;
    }
    match service.firm_lawyers(&firm_id) {
        Ok(lawyers) => (StatusCode::OK, Json(lawyers)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn envelope_list_handler<R, S>(
    State(service): ServiceState<R>,
    headers: HeaderMap,
) -> Response
where
    R: EntityStore + 'static,
    S: SectionRole,
{
    if let Err(response) = admin(&service, &headers) {
        return response;
    }
    match service.list(S::ROLE) {
        Ok(listing) => (StatusCode::OK, Json(listing)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn array_list_handler<R, S>(
    State(service): ServiceState<R>,
    headers: HeaderMap,
) -> Response
where
    R: EntityStore + 'static,
    S: SectionRole,
{
    if let Err(response) = admin(&service, &headers) {
        return response;
    }
    match service.list(S::ROLE) {
        Ok(listing) => (StatusCode::OK, Json(listing.applications)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn path_decision_handler<R, S>(
    State(service): ServiceState<R>,
    headers: HeaderMap,
    Path((id, action)): Path<(String, String)>,
    body: Option<Json<DecisionBody>>,
) -> Response
where
    R: EntityStore + 'static,
    S: SectionRole,
{
    let reason = body.and_then(|Json(body)| body.reason);
    decide(&service, &headers, S::ROLE, id, &action, reason.as_deref())
}

pub(crate) async fn query_decision_handler<R, S>(
    State(service): ServiceState<R>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<StatusQuery>,
) -> Response
where
    R: EntityStore + 'static,
    S: SectionRole,
{
    decide(
        &service,
        &headers,
        S::ROLE,
        id,
        &query.status,
        query.reason.as_deref(),
    )
}

fn decide<R>(
    service: &OnboardingService<R>,
    headers: &HeaderMap,
    role: Role,
    id: String,
    action: &str,
    reason: Option<&str>,
) -> Response
where
    R: EntityStore + 'static,
{
    let claims = match admin(service, headers) {
        Ok(claims) => claims,
        Err(response) => return response,
    };
    let decision = match action.parse::<Decision>() {
        Ok(decision) => decision,
        Err(err) => return detail(StatusCode::BAD_REQUEST, err.to_string()),
    };
    match service.decide(role, &ApplicationId(id), decision, &claims.email, reason) {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(err) => error_response(err),
    }
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn authenticated<R>(service: &OnboardingService<R>, headers: &HeaderMap) -> Result<Claims, Response>
where
    R: EntityStore + 'static,
{
    let token = bearer(headers)
        .ok_or_else(|| detail(StatusCode::UNAUTHORIZED, "not authenticated".to_string()))?;
    service.authorize(token).map_err(error_response)
}

fn admin<R>(service: &OnboardingService<R>, headers: &HeaderMap) -> Result<Claims, Response>
where
    R: EntityStore + 'static,
{
    let token = bearer(headers)
        .ok_or_else(|| detail(StatusCode::UNAUTHORIZED, "not authenticated".to_string()))?;
    service.authorize_admin(token).map_err(error_response)
}

fn firm_member<R>(
    service: &OnboardingService<R>,
    headers: &HeaderMap,
    firm_id: &FirmId,
) -> Result<Claims, Response>
where
    R: EntityStore + 'static,
{
    let token = bearer(headers)
        .ok_or_else(|| detail(StatusCode::UNAUTHORIZED, "not authenticated".to_string()))?;
    service
        .authorize_firm(token, firm_id)
        .map_err(error_response)
}

fn detail(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

/// Map a service error onto its HTTP status and `{"detail": ...}` body.
pub fn error_response(err: OnboardingError) -> Response {
    match err {
        OnboardingError::Validation(errors) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "detail": errors.to_string(), "errors": errors })),
        )
            .into_response(),
        OnboardingError::UnknownFirm(_) => detail(StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
        OnboardingError::DuplicateEmail | OnboardingError::AlreadyDecided { .. } => {
            detail(StatusCode::CONFLICT, err.to_string())
        }
        OnboardingError::NotFound => detail(StatusCode::NOT_FOUND, err.to_string()),
        OnboardingError::InvalidCredentials | OnboardingError::Unauthorized(_) => {
            detail(StatusCode::UNAUTHORIZED, err.to_string())
        }
        OnboardingError::Forbidden => detail(StatusCode::FORBIDDEN, err.to_string()),
        OnboardingError::Signing(_)
        | OnboardingError::Credential(_)
        | OnboardingError::Repository(_) => {
            tracing::error!(error = %err, "onboarding request failed");
            detail(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

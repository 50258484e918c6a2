#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use lexgate::client::{
    ApplicationGateway, DecisionProcessor, FirmClientForm, FirmLawyerForm, GatewayError,
    LawFirmForm, LawyerForm, LocalGateway, MemoryNotifier, MemorySessionStore, ReviewQueue,
    RoleGate, Session, SessionStore, SubmissionClient,
};
use lexgate::workflows::onboarding::{
    AdminCredentials, ApplicationId, ApplicationListing, ApplicationSubmission, ApplicationView,
    AuthGrant, Decision, DecisionReceipt, FirmId, FirmSummary, LoginRequest, MemoryEntityStore,
    OnboardingService, ReviewSection, Role, StatusFilter, SubmissionReceipt, TokenIssuer,
};

pub const ADMIN_EMAIL: &str = "admin@nyaaysathi.com";
pub const ADMIN_PASSWORD: &str = "admin123";

pub type Service = OnboardingService<MemoryEntityStore>;

pub fn service() -> Arc<Service> {
    Arc::new(OnboardingService::new(
        Arc::new(MemoryEntityStore::default()),
        TokenIssuer::new("integration-secret"),
        AdminCredentials {
            email: ADMIN_EMAIL.to_string(),
            password: ADMIN_PASSWORD.to_string(),
        },
    ))
}

pub fn admin_login() -> LoginRequest {
    LoginRequest {
        email: ADMIN_EMAIL.to_string(),
        password: ADMIN_PASSWORD.to_string(),
        role: Role::Admin,
    }
}

/// Client-side wiring shared by the scenarios: one gateway, both session
/// realms and a recording notifier.
pub struct Harness<G> {
    pub gateway: Arc<G>,
    pub notifier: Arc<MemoryNotifier>,
    pub user_sessions: Arc<dyn SessionStore>,
    pub admin_sessions: Arc<dyn SessionStore>,
    pub gate: Arc<RoleGate<G>>,
}

impl<G> Harness<G>
where
    G: ApplicationGateway,
{
    pub fn new(gateway: Arc<G>) -> Self {
        let user_sessions: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let admin_sessions: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let gate = Arc::new(RoleGate::new(
            Arc::clone(&gateway),
            Arc::clone(&user_sessions),
            Arc::clone(&admin_sessions),
        ));
        Self {
            gateway,
            notifier: Arc::new(MemoryNotifier::default()),
            user_sessions,
            admin_sessions,
            gate,
        }
    }

    pub fn submissions(&self) -> SubmissionClient<G> {
        SubmissionClient::new(Arc::clone(&self.gateway), self.notifier.clone())
    }

    pub fn queue(&self) -> ReviewQueue<G> {
        ReviewQueue::new(
            Arc::clone(&self.gateway),
            Arc::clone(&self.admin_sessions),
            self.notifier.clone(),
        )
    }

    pub fn processor(&self) -> DecisionProcessor<G> {
        DecisionProcessor::new(
            Arc::clone(&self.gateway),
            Arc::clone(&self.admin_sessions),
            self.notifier.clone(),
        )
    }

    pub async fn login_admin(&self) {
        self.gate
            .login(admin_login())
            .await
            .expect("admin login succeeds");
    }
}

pub fn local_harness() -> (Harness<LocalGateway<MemoryEntityStore>>, Arc<Service>) {
    let service = service();
    let gateway = Arc::new(LocalGateway::new(Arc::clone(&service)));
    (Harness::new(gateway), service)
}

pub fn lawyer_form(email: &str, password: &str) -> LawyerForm {
    LawyerForm {
        name: "Asha Rao".to_string(),
        email: email.to_string(),
        phone: "+91 98450 00001".to_string(),
        password: password.to_string(),
        confirm_password: password.to_string(),
        bar_council_number: "KAR/1234/2012".to_string(),
        specialization: "Property Law".to_string(),
        experience: 12,
        state: "Karnataka".to_string(),
        city: "Bengaluru".to_string(),
        court: "High Court".to_string(),
        languages: vec!["English".to_string()],
        fee_range: "5000-10000".to_string(),
        education: "LLB".to_string(),
        bio: "Tenancy disputes.".to_string(),
        ..LawyerForm::default()
    }
}

pub fn firm_form(email: &str) -> LawFirmForm {
    LawFirmForm {
        firm_name: "Rao & Partners".to_string(),
        registration_number: "FIRM-2009-114".to_string(),
        established_year: 2009,
        contact_name: "Vikram Rao".to_string(),
        email: email.to_string(),
        contact_phone: "+91 80 4000 1000".to_string(),
        password: "firmpass".to_string(),
        confirm_password: "firmpass".to_string(),
        city: "Bengaluru".to_string(),
        state: "Karnataka".to_string(),
        practice_areas: vec!["Corporate Law".to_string()],
        total_lawyers: 18,
        description: "Full-service firm.".to_string(),
        ..LawFirmForm::default()
    }
}

pub fn firm_lawyer_form(email: &str, firm_id: Option<FirmId>) -> FirmLawyerForm {
    FirmLawyerForm {
        full_name: "Meera Iyer".to_string(),
        email: email.to_string(),
        phone: "+91 98450 00002".to_string(),
        password: "secret1".to_string(),
        confirm_password: "secret1".to_string(),
        firm_id,
        specialization: "Corporate Law".to_string(),
        experience_years: 6,
        ..FirmLawyerForm::default()
    }
}

pub fn firm_client_form(email: &str, firm_id: Option<FirmId>) -> FirmClientForm {
    FirmClientForm {
        full_name: "Karan Shah".to_string(),
        email: email.to_string(),
        phone: "+91 98450 00003".to_string(),
        password: "client1".to_string(),
        confirm_password: "client1".to_string(),
        firm_id,
        case_type: "Property Dispute".to_string(),
        case_description: "Boundary dispute.".to_string(),
        ..FirmClientForm::default()
    }
}

/// Submit a firm, approve it as admin and return its directory id.
pub async fn approved_firm<G>(harness: &Harness<G>, email: &str) -> FirmId
where
    G: ApplicationGateway,
{
    let receipt = harness
        .submissions()
        .submit(&firm_form(email))
        .await
        .expect("firm submission accepted");
    let token = harness
        .admin_sessions
        .token()
        .expect("session readable")
        .expect("admin logged in");
    harness
        .gateway
        .decide(&token, ReviewSection::LawFirms, &receipt.id, Decision::Approve, None)
        .await
        .expect("firm approved");
    FirmId::from(&receipt.id)
}

/// Gateway wrapper that counts calls and can be told to fail on purpose.
pub struct ScriptedGateway<G> {
    inner: Arc<G>,
    pub calls: AtomicUsize,
    pub forbidden_section: std::sync::Mutex<Option<ReviewSection>>,
    pub fail_decisions: AtomicBool,
    /// Logins never answer while set.
    pub hang_logins: AtomicBool,
    /// Stored into the given realm just before a forbidden list answers,
    /// as if a new login finished while the request was in flight.
    pub login_during_refusal: std::sync::Mutex<Option<(Arc<dyn SessionStore>, Session)>>,
}

impl<G> ScriptedGateway<G> {
    pub fn new(inner: Arc<G>) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
            forbidden_section: std::sync::Mutex::new(None),
            fail_decisions: AtomicBool::new(false),
            hang_logins: AtomicBool::new(false),
            login_during_refusal: std::sync::Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn forbid(&self, section: ReviewSection) {
        *self.forbidden_section.lock().expect("lock") = Some(section);
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl<G> ApplicationGateway for ScriptedGateway<G>
where
    G: ApplicationGateway,
{
    async fn submit(
        &self,
        submission: ApplicationSubmission,
    ) -> Result<SubmissionReceipt, GatewayError> {
        self.record();
        self.inner.submit(submission).await
    }

    async fn register_client(
        &self,
        submission: ApplicationSubmission,
    ) -> Result<AuthGrant, GatewayError> {
        self.record();
        self.inner.register_client(submission).await
    }

    async fn approved_firms(&self) -> Result<Vec<FirmSummary>, GatewayError> {
        self.record();
        self.inner.approved_firms().await
    }

    async fn firm_clients(
        &self,
        token: &str,
        firm_id: &FirmId,
    ) -> Result<Vec<ApplicationView>, GatewayError> {
        self.record();
        self.inner.firm_clients(token, firm_id).await
    }

    async fn list(
        &self,
        token: &str,
        section: ReviewSection,
        filter: StatusFilter,
    ) -> Result<ApplicationListing, GatewayError> {
        self.record();
        if *self.forbidden_section.lock().expect("lock") == Some(section) {
            let renewed = self.login_during_refusal.lock().expect("lock").take();
            if let Some((store, session)) = renewed {
                store.set(session).expect("session stored");
            }
            return Err(GatewayError::Unauthorized {
                status: 403,
                detail: "admin access required".to_string(),
            });
        }
        self.inner.list(token, section, filter).await
    }

    async fn decide(
        &self,
        token: &str,
        section: ReviewSection,
        id: &ApplicationId,
        decision: Decision,
        reason: Option<&str>,
    ) -> Result<DecisionReceipt, GatewayError> {
        self.record();
        if self.fail_decisions.load(Ordering::SeqCst) {
            return Err(GatewayError::Transient("connection reset".to_string()));
        }
        self.inner.decide(token, section, id, decision, reason).await
    }

    async fn login(&self, request: &LoginRequest) -> Result<AuthGrant, GatewayError> {
        self.record();
        if self.hang_logins.load(Ordering::SeqCst) {
            return futures::future::pending().await;
        }
        self.inner.login(request).await
    }

    async fn admin_login(&self, email: &str, password: &str) -> Result<String, GatewayError> {
        self.record();
        if self.hang_logins.load(Ordering::SeqCst) {
            return futures::future::pending().await;
        }
        self.inner.admin_login(email, password).await
    }
}

pub fn scripted_harness() -> (
    Harness<ScriptedGateway<LocalGateway<MemoryEntityStore>>>,
    Arc<Service>,
) {
    let service = service();
    let local = Arc::new(LocalGateway::new(Arc::clone(&service)));
    (Harness::new(Arc::new(ScriptedGateway::new(local))), service)
}

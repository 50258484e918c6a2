use lexgate::client::{FileSessionStore, MemorySessionStore, SessionStore};
use lexgate::config::{AuthConfig, GatewayConfig};
use lexgate::workflows::onboarding::{
    AdminCredentials, MemoryEntityStore, OnboardingService, TokenIssuer,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn onboarding_service(auth: &AuthConfig) -> OnboardingService<MemoryEntityStore> {
    OnboardingService::new(
        Arc::new(MemoryEntityStore::default()),
        TokenIssuer::new(auth.jwt_secret.clone()),
        AdminCredentials {
            email: auth.admin_email.clone(),
            password: auth.admin_password.clone(),
        },
    )
}

/// User and admin session stores, file-backed when a session directory is set.
pub(crate) fn session_stores(
    gateway: &GatewayConfig,
) -> (Arc<dyn SessionStore>, Arc<dyn SessionStore>) {
    match &gateway.session_dir {
        Some(dir) => (
            Arc::new(FileSessionStore::new(dir, "user")),
            Arc::new(FileSessionStore::new(dir, "admin")),
        ),
        None => (
            Arc::new(MemorySessionStore::new()),
            Arc::new(MemorySessionStore::new()),
        ),
    }
}

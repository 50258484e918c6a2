use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use super::gateway::{ApplicationGateway, GatewayError};
use super::session::{Session, SessionState, SessionStore, SessionStoreError};
use crate::workflows::onboarding::{LoginRequest, Role, UserProfile};

/// Client routes the gate knows how to guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    UserLogin,
    LawyerLogin,
    LawFirmLogin,
    FirmLawyerLogin,
    FirmClientLogin,
    AdminLogin,
    UserDashboard,
    LawyerDashboard,
    LawFirmDashboard,
    FirmLawyerDashboard,
    FirmClientDashboard,
    AdminDashboard,
}

impl Route {
    pub const fn path(self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::UserLogin => "/user-login",
            Route::LawyerLogin => "/lawyer-login",
            Route::LawFirmLogin => "/lawfirm-login",
            Route::FirmLawyerLogin => "/lawfirm-lawyer-login",
            Route::FirmClientLogin => "/firm-client-login",
            Route::AdminLogin => "/admin-login",
            Route::UserDashboard => "/user-dashboard",
            Route::LawyerDashboard => "/lawyer-dashboard",
            Route::LawFirmDashboard => "/lawfirm-dashboard",
            Route::FirmLawyerDashboard => "/firm-lawyer-dashboard",
            Route::FirmClientDashboard => "/firm-client-dashboard",
            Route::AdminDashboard => "/admin-dashboard",
        }
    }

    /// Role a route is reserved for; `None` for public routes.
    pub const fn required_role(self) -> Option<Role> {
        match self {
            Route::UserDashboard => Some(Role::Client),
            Route::LawyerDashboard => Some(Role::Lawyer),
            Route::LawFirmDashboard => Some(Role::LawFirm),
            Route::FirmLawyerDashboard => Some(Role::FirmLawyer),
            Route::FirmClientDashboard => Some(Role::FirmClient),
            Route::AdminDashboard => Some(Role::Admin),
            Route::Home
            | Route::UserLogin
            | Route::LawyerLogin
            | Route::LawFirmLogin
            | Route::FirmLawyerLogin
            | Route::FirmClientLogin
            | Route::AdminLogin => None,
        }
    }

    pub const fn login_for(role: Role) -> Route {
        match role {
            Role::Client => Route::UserLogin,
            Role::Lawyer => Route::LawyerLogin,
            Role::LawFirm => Route::LawFirmLogin,
            Role::FirmLawyer => Route::FirmLawyerLogin,
            Role::FirmClient => Route::FirmClientLogin,
            Role::Admin => Route::AdminLogin,
        }
    }

    pub const fn dashboard_for(role: Role) -> Route {
        match role {
            Role::Client => Route::UserDashboard,
            Role::Lawyer => Route::LawyerDashboard,
            Role::LawFirm => Route::LawFirmDashboard,
            Role::FirmLawyer => Route::FirmLawyerDashboard,
            Role::FirmClient => Route::FirmClientDashboard,
            Role::Admin => Route::AdminDashboard,
        }
    }
}

/// Resets the in-flight marker however a login ends, including cancellation.
struct InFlight<'a>(&'a Mutex<Option<Role>>);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.0.lock() {
            *guard = None;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    Redirect(Route),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    Anonymous,
    Authenticating(Role),
    Authenticated(Role),
}

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("unauthenticated")]
    Unauthenticated,
    #[error("{0}")]
    InvalidCredentials(String),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Session(#[from] SessionStoreError),
}

/// Login state machine and route guard.
///
/// User and admin sessions live in separate stores. Every write to either
/// store goes through one async mutex, so concurrent logins and logouts
/// apply one after another and the last one wins.
pub struct RoleGate<G> {
    gateway: Arc<G>,
    user_sessions: Arc<dyn SessionStore>,
    admin_sessions: Arc<dyn SessionStore>,
    writer: AsyncMutex<()>,
    in_flight: Mutex<Option<Role>>,
}

impl<G> RoleGate<G>
where
    G: ApplicationGateway,
{
    pub fn new(
        gateway: Arc<G>,
        user_sessions: Arc<dyn SessionStore>,
        admin_sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            gateway,
            user_sessions,
            admin_sessions,
            writer: AsyncMutex::new(()),
            in_flight: Mutex::new(None),
        }
    }

    pub fn sessions_for(&self, role: Role) -> &Arc<dyn SessionStore> {
        match role {
            Role::Admin => &self.admin_sessions,
            Role::Client | Role::Lawyer | Role::LawFirm | Role::FirmLawyer | Role::FirmClient => {
                &self.user_sessions
            }
        }
    }

    pub fn phase(&self) -> Result<AuthPhase, GateError> {
        if let Some(role) = self.in_flight.lock().ok().and_then(|guard| *guard) {
            return Ok(AuthPhase::Authenticating(role));
        }
        if let Some(role) = self.user_sessions.get()?.role() {
            return Ok(AuthPhase::Authenticated(role));
        }
        Ok(match self.admin_sessions.get()?.role() {
            Some(role) => AuthPhase::Authenticated(role),
            None => AuthPhase::Anonymous,
        })
    }

    fn mark_in_flight(&self, role: Role) -> InFlight<'_> {
        if let Ok(mut guard) = self.in_flight.lock() {
            *guard = Some(role);
        }
        InFlight(&self.in_flight)
    }

    /// Exchange credentials for a session of `request.role`.
    ///
    /// Wrong passwords and applications that are not approved fail the same way.
    pub async fn login(&self, request: LoginRequest) -> Result<Session, GateError> {
        let _writer = self.writer.lock().await;
        let role = request.role;
        let in_flight = self.mark_in_flight(role);

        let outcome = match role {
            Role::Admin => self
                .gateway
                .admin_login(&request.email, &request.password)
                .await
                .map(|token| Session {
                    token,
                    role: Role::Admin,
                    user: UserProfile {
                        id: "admin".to_string(),
                        email: request.email.trim().to_ascii_lowercase(),
                        display_name: "Administrator".to_string(),
                        role: Role::Admin,
                        firm_id: None,
                    },
                }),
            Role::Client | Role::Lawyer | Role::LawFirm | Role::FirmLawyer | Role::FirmClient => {
                self.gateway.login(&request).await.map(Session::from)
            }
        };
        drop(in_flight);

        match outcome {
            Ok(session) if session.role == role => {
                self.sessions_for(role).set(session.clone())?;
                info!(%role, user_id = %session.user.id, "session established");
                Ok(session)
            }
            Ok(session) => {
                warn!(requested = %role, granted = %session.role, "login returned another role");
                Err(GateError::InvalidCredentials(
                    "invalid credentials or pending approval".to_string(),
                ))
            }
            Err(GatewayError::Unauthorized { detail, .. }) => {
                warn!(%role, "login refused");
                Err(GateError::InvalidCredentials(detail))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Store a session handed out by signup.
    pub async fn adopt(&self, session: Session) -> Result<Session, GateError> {
        let _writer = self.writer.lock().await;
        self.sessions_for(session.role).set(session.clone())?;
        Ok(session)
    }

    /// Clear the session of `role`'s realm: token, role and profile in one write.
    pub async fn logout(&self, role: Role) -> Result<(), GateError> {
        let _writer = self.writer.lock().await;
        self.sessions_for(role).clear()?;
        info!(%role, "logged out");
        Ok(())
    }

    /// Anyone signed in, in either realm, who asks for another role's route
    /// is sent home; only visitors with no session are sent to a login.
    pub fn authorize(&self, route: Route) -> Result<Access, GateError> {
        let Some(required) = route.required_role() else {
            return Ok(Access::Granted);
        };
        Ok(match self.sessions_for(required).get()? {
            SessionState::Active(session) if session.role == required => Access::Granted,
            SessionState::Active(_) => Access::Redirect(Route::Home),
            SessionState::Empty if self.other_realm(required).get()?.is_active() => {
                Access::Redirect(Route::Home)
            }
            SessionState::Empty => Access::Redirect(Route::login_for(required)),
        })
    }

    fn other_realm(&self, role: Role) -> &Arc<dyn SessionStore> {
        match role {
            Role::Admin => &self.user_sessions,
            Role::Client | Role::Lawyer | Role::LawFirm | Role::FirmLawyer | Role::FirmClient => {
                &self.admin_sessions
            }
        }
    }

    /// Run a call that needs `role`'s token.
    ///
    /// A 401/403 answer clears the session the call was made with. A session
    /// stored by a login that finished in the meantime is left alone.
    pub async fn call<T, F, Fut>(&self, role: Role, call: F) -> Result<T, GateError>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let token = match self.sessions_for(role).get()? {
            SessionState::Active(session) if session.role == role => session.token,
            SessionState::Active(_) | SessionState::Empty => return Err(GateError::Unauthenticated),
        };

        match call(token.clone()).await {
            Ok(value) => Ok(value),
            Err(err) if err.is_auth_failure() => {
                let _writer = self.writer.lock().await;
                if self.sessions_for(role).clear_if(&token)? {
                    warn!(%role, "session rejected by the store, cleared");
                } else {
                    debug!(%role, "stale token rejected, newer session kept");
                }
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }
}

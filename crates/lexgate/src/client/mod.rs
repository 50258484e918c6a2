//! Client side of the onboarding workflow: what the web app does on behalf of
//! applicants and administrators, expressed against [`ApplicationGateway`].

pub mod decision;
pub mod gate;
pub mod gateway;
pub mod http;
pub mod local;
pub mod notify;
pub mod review;
pub mod session;
pub mod submission;

pub use decision::{DecisionError, DecisionOutcome, DecisionProcessor};
pub use gate::{Access, AuthPhase, GateError, RoleGate, Route};
pub use gateway::{ApplicationGateway, GatewayError};
pub use http::HttpGateway;
pub use local::LocalGateway;
pub use notify::{MemoryNotifier, Notification, NotificationLevel, Notifier, TracingNotifier};
pub use review::{RefreshReport, ReviewError, ReviewQueue, SectionState, ViewLifetime};
pub use session::{
    FileSessionStore, MemorySessionStore, Session, SessionState, SessionStore, SessionStoreError,
};
pub use submission::{
    ApplicationForm, ApprovedFirms, ClientSignupForm, FirmClientForm, FirmLawyerForm,
    FirmSelection, LawFirmForm, LawyerForm, SubmissionClient, SubmissionError, Wizard, WizardStep,
};

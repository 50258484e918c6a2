use crate::client::{
    DecisionError, GateError, GatewayError, ReviewError, SessionStoreError, SubmissionError,
};
use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::onboarding::OnboardingError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Onboarding(OnboardingError),
    Gateway(GatewayError),
    Gate(GateError),
    Review(ReviewError),
    Decision(DecisionError),
    Submission(SubmissionError),
    Session(SessionStoreError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Onboarding(err) => write!(f, "onboarding error: {}", err),
            AppError::Gateway(err) => write!(f, "gateway error: {}", err),
            AppError::Gate(err) => write!(f, "login error: {}", err),
            AppError::Review(err) => write!(f, "review error: {}", err),
            AppError::Decision(err) => write!(f, "decision error: {}", err),
            AppError::Submission(err) => write!(f, "submission error: {}", err),
            AppError::Session(err) => write!(f, "session error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Onboarding(err) => Some(err),
            AppError::Gateway(err) => Some(err),
            AppError::Gate(err) => Some(err),
            AppError::Review(err) => Some(err),
            AppError::Decision(err) => Some(err),
            AppError::Submission(err) => Some(err),
            AppError::Session(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Onboarding(OnboardingError::Validation(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Onboarding(OnboardingError::NotFound) => StatusCode::NOT_FOUND,
            AppError::Gateway(GatewayError::Transient(_)) => StatusCode::BAD_GATEWAY,
            AppError::Gate(GateError::Unauthenticated | GateError::InvalidCredentials(_))
            | AppError::Review(ReviewError::Unauthenticated)
            | AppError::Decision(DecisionError::Unauthenticated) => StatusCode::UNAUTHORIZED,
            AppError::Onboarding(_)
            | AppError::Gateway(_)
            | AppError::Gate(_)
            | AppError::Review(_)
            | AppError::Decision(_)
            | AppError::Submission(_) => StatusCode::BAD_REQUEST,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<OnboardingError> for AppError {
    fn from(value: OnboardingError) -> Self {
        Self::Onboarding(value)
    }
}

impl From<GatewayError> for AppError {
    fn from(value: GatewayError) -> Self {
        Self::Gateway(value)
    }
}

impl From<GateError> for AppError {
    fn from(value: GateError) -> Self {
        Self::Gate(value)
    }
}

impl From<ReviewError> for AppError {
    fn from(value: ReviewError) -> Self {
        Self::Review(value)
    }
}

impl From<DecisionError> for AppError {
    fn from(value: DecisionError) -> Self {
        Self::Decision(value)
    }
}

impl From<SubmissionError> for AppError {
    fn from(value: SubmissionError) -> Self {
        Self::Submission(value)
    }
}

impl From<SessionStoreError> for AppError {
    fn from(value: SessionStoreError) -> Self {
        Self::Session(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn read_session() -> Result<(), AppError> {
        Err::<(), _>(SessionStoreError::Poisoned)?;
        Ok(())
    }

    #[test]
    fn session_store_failures_propagate_with_their_source() {
        let err = read_session().expect_err("store failure");
        assert!(matches!(err, AppError::Session(SessionStoreError::Poisoned)));
        assert_eq!(err.to_string(), "session error: session lock poisoned");
        assert!(err.source().is_some());
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn missing_sessions_are_unauthorized() {
        let response = AppError::from(GateError::Unauthenticated).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

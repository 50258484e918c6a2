use std::sync::Arc;

use tracing::{info, warn};

use super::gateway::{ApplicationGateway, GatewayError};
use super::notify::{Notification, Notifier};
use super::review::{RefreshReport, ReviewError, ReviewQueue};
use super::session::{SessionStore, SessionStoreError};
use crate::workflows::onboarding::{ApplicationId, Decision, DecisionReceipt, ReviewSection};

#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    #[error("unauthenticated")]
    Unauthenticated,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Session(#[from] SessionStoreError),
}

impl From<ReviewError> for DecisionError {
    fn from(value: ReviewError) -> Self {
        match value {
            ReviewError::Unauthenticated => DecisionError::Unauthenticated,
            ReviewError::Session(err) => DecisionError::Session(err),
        }
    }
}

/// Result of a decision as seen by the review console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionOutcome {
    pub receipt: DecisionReceipt,
    pub refresh: RefreshReport,
}

/// Applies one approve/reject decision, then reloads the affected section.
///
/// Nothing is updated locally before the store confirms; a failed decision
/// leaves the queue exactly as it was.
pub struct DecisionProcessor<G> {
    gateway: Arc<G>,
    sessions: Arc<dyn SessionStore>,
    notifier: Arc<dyn Notifier>,
}

impl<G> DecisionProcessor<G>
where
    G: ApplicationGateway,
{
    pub fn new(gateway: Arc<G>, sessions: Arc<dyn SessionStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            gateway,
            sessions,
            notifier,
        }
    }

    pub async fn apply(
        &self,
        queue: &mut ReviewQueue<G>,
        section: ReviewSection,
        id: &ApplicationId,
        decision: Decision,
    ) -> Result<DecisionOutcome, DecisionError> {
        self.apply_with_reason(queue, section, id, decision, None).await
    }

    /// Like [`apply`](Self::apply); a rejection also records `reason`.
    pub async fn apply_with_reason(
        &self,
        queue: &mut ReviewQueue<G>,
        section: ReviewSection,
        id: &ApplicationId,
        decision: Decision,
        reason: Option<&str>,
    ) -> Result<DecisionOutcome, DecisionError> {
        let token = self.sessions.token()?.ok_or(DecisionError::Unauthenticated)?;

        let receipt = match self.gateway.decide(&token, section, id, decision, reason).await {
            Ok(receipt) => receipt,
            Err(err) => {
                warn!(%section, application_id = %id, %decision, error = %err, "decision failed");
                queue.report_failure(&err, &token)?;
                return Err(err.into());
            }
        };

        info!(%section, application_id = %id, status = %receipt.status, changed = receipt.changed, "decision applied");
        let message = if receipt.changed {
            format!("Application {}", receipt.status)
        } else {
            format!("Application was already {}", receipt.status)
        };
        self.notifier.notify(Notification::success(message));

        queue.close();
        let refresh = queue.refresh_section(section).await?;
        Ok(DecisionOutcome { receipt, refresh })
    }
}

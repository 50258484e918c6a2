use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use super::gate::Route;
use super::gateway::{ApplicationGateway, GatewayError};
use super::notify::{Notification, Notifier};
use super::session::{SessionStore, SessionStoreError};
use crate::workflows::onboarding::{
    ApplicationId, ApplicationListing, ApplicationStatus, ApplicationView, ReviewSection,
    StatusCounts, StatusFilter,
};

/// Shared flag telling in-flight work whether its view still exists.
#[derive(Debug, Clone)]
pub struct ViewLifetime {
    mounted: Arc<AtomicBool>,
}

impl Default for ViewLifetime {
    fn default() -> Self {
        Self {
            mounted: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl ViewLifetime {
    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::SeqCst);
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }
}

/// Last successfully loaded population of one section.
#[derive(Debug, Clone, Default)]
pub struct SectionState {
    pub listing: ApplicationListing,
    pub loaded: bool,
    /// Message of the most recent failed fetch, cleared by the next success.
    pub last_error: Option<String>,
}

/// What a refresh did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Results arrived after unmount and were dropped.
    pub discarded: bool,
    pub loaded: Vec<ReviewSection>,
    pub failed: Vec<ReviewSection>,
    pub session_expired: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("unauthenticated")]
    Unauthenticated,
    #[error(transparent)]
    Session(#[from] SessionStoreError),
}

/// Admin view over every review section.
///
/// Each section keeps its whole population so counts never depend on the
/// active filter or search query; both only narrow what [`visible`] returns.
///
/// [`visible`]: ReviewQueue::visible
pub struct ReviewQueue<G> {
    gateway: Arc<G>,
    sessions: Arc<dyn SessionStore>,
    notifier: Arc<dyn Notifier>,
    lifetime: ViewLifetime,
    sections: BTreeMap<ReviewSection, SectionState>,
    active: ReviewSection,
    filter: StatusFilter,
    query: String,
    detail: Option<ApplicationId>,
    redirect: Option<Route>,
}

impl<G> ReviewQueue<G>
where
    G: ApplicationGateway,
{
    pub fn new(gateway: Arc<G>, sessions: Arc<dyn SessionStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            gateway,
            sessions,
            notifier,
            lifetime: ViewLifetime::default(),
            sections: ReviewSection::ALL
                .iter()
                .map(|section| (*section, SectionState::default()))
                .collect(),
            active: ReviewSection::Lawyers,
            filter: StatusFilter::default(),
            query: String::new(),
            detail: None,
            redirect: None,
        }
    }

    /// Handle whose `unmount` makes pending refreshes drop their results.
    pub fn lifetime(&self) -> ViewLifetime {
        self.lifetime.clone()
    }

    /// Fetch every section concurrently and apply the results together.
    pub async fn refresh(&mut self) -> Result<RefreshReport, ReviewError> {
        self.fetch(&ReviewSection::ALL).await
    }

    pub async fn refresh_section(&mut self, section: ReviewSection) -> Result<RefreshReport, ReviewError> {
        self.fetch(&[section]).await
    }

    async fn fetch(&mut self, sections: &[ReviewSection]) -> Result<RefreshReport, ReviewError> {
        let Some(token) = self.sessions.token()? else {
            self.redirect = Some(Route::AdminLogin);
            return Err(ReviewError::Unauthenticated);
        };

        let gateway = Arc::clone(&self.gateway);
        let requests = sections.iter().map(|section| {
            let gateway = Arc::clone(&gateway);
            let token = token.clone();
            let section = *section;
            async move {
                let result = gateway.list(&token, section, StatusFilter::All).await;
                (section, result)
            }
        });
        let results = join_all(requests).await;

        if !self.lifetime.is_mounted() {
            debug!("review queue unmounted, dropping fetched sections");
            return Ok(RefreshReport {
                discarded: true,
                ..RefreshReport::default()
            });
        }

        let mut report = RefreshReport::default();
        for (section, result) in results {
            match result {
                Ok(listing) => {
                    let state = self.sections.entry(section).or_default();
                    state.listing = listing;
                    state.loaded = true;
                    state.last_error = None;
                    report.loaded.push(section);
                }
                Err(err) if err.is_auth_failure() => {
                    warn!(%section, error = %err, "admin session rejected");
                    report.session_expired = true;
                    report.failed.push(section);
                }
                Err(err) => {
                    warn!(%section, error = %err, "section fetch failed");
                    self.notifier.notify(Notification::warning(format!(
                        "Could not load {section}: {err}"
                    )));
                    self.sections.entry(section).or_default().last_error = Some(err.to_string());
                    report.failed.push(section);
                }
            }
        }

        if report.session_expired && !self.expire_session(&token)? {
            report.session_expired = false;
        }
        Ok(report)
    }

    /// Drop the admin session `token` belonged to after a 401/403 and point
    /// back at the login route. Returns false when a newer session has
    /// replaced it, which is kept.
    pub(crate) fn expire_session(&mut self, token: &str) -> Result<bool, SessionStoreError> {
        if !self.sessions.clear_if(token)? {
            debug!("rejected token was already replaced, keeping the new session");
            return Ok(false);
        }
        self.redirect = Some(Route::AdminLogin);
        self.notifier.notify(Notification::error(
            "Your admin session has expired. Please log in again.",
        ));
        Ok(true)
    }

    pub(crate) fn report_failure(
        &mut self,
        err: &GatewayError,
        token: &str,
    ) -> Result<(), SessionStoreError> {
        if err.is_auth_failure() {
            self.expire_session(token).map(|_| ())
        } else {
            self.notifier.notify(Notification::error(err.to_string()));
            Ok(())
        }
    }

    pub fn set_filter(&mut self, filter: StatusFilter) {
        self.filter = filter;
    }

    pub fn filter(&self) -> StatusFilter {
        self.filter
    }

    pub fn set_section(&mut self, section: ReviewSection) {
        if self.active != section {
            self.detail = None;
        }
        self.active = section;
    }

    pub fn section(&self) -> ReviewSection {
        self.active
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn state(&self, section: ReviewSection) -> Option<&SectionState> {
        self.sections.get(&section)
    }

    /// Counts over a section's whole population.
    pub fn counts(&self, section: ReviewSection) -> StatusCounts {
        self.sections
            .get(&section)
            .map(|state| state.listing.stats)
            .unwrap_or_default()
    }

    /// Active section narrowed by filter and search query.
    pub fn visible(&self) -> Vec<&ApplicationView> {
        let query = self.query.trim().to_lowercase();
        self.sections
            .get(&self.active)
            .map(|state| {
                state
                    .listing
                    .applications
                    .iter()
                    .filter(|app| self.filter.matches(app.status))
                    .filter(|app| {
                        query.is_empty()
                            || app.display_name.to_lowercase().contains(&query)
                            || app.email.contains(&query)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn status_of(&self, section: ReviewSection, id: &ApplicationId) -> Option<ApplicationStatus> {
        self.find(section, id).map(|app| app.status)
    }

    fn find(&self, section: ReviewSection, id: &ApplicationId) -> Option<&ApplicationView> {
        self.sections
            .get(&section)?
            .listing
            .applications
            .iter()
            .find(|app| &app.id == id)
    }

    /// Open the detail view of an application in the active section.
    pub fn open(&mut self, id: &ApplicationId) -> Option<&ApplicationView> {
        if self.find(self.active, id).is_none() {
            return None;
        }
        self.detail = Some(id.clone());
        self.detail()
    }

    pub fn close(&mut self) {
        self.detail = None;
    }

    pub fn detail(&self) -> Option<&ApplicationView> {
        let id = self.detail.as_ref()?;
        self.find(self.active, id)
    }

    pub fn redirect(&self) -> Option<Route> {
        self.redirect
    }
}

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for submitted applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

impl ApplicationId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to an approved law firm application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FirmId(pub String);

impl FirmId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&ApplicationId> for FirmId {
    fn from(value: &ApplicationId) -> Self {
        Self(value.0.clone())
    }
}

impl fmt::Display for FirmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Every actor kind the marketplace knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Client,
    Lawyer,
    LawFirm,
    FirmLawyer,
    FirmClient,
    Admin,
}

impl Role {
    pub const APPLICANTS: [Role; 5] = [
        Role::Client,
        Role::Lawyer,
        Role::LawFirm,
        Role::FirmLawyer,
        Role::FirmClient,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Lawyer => "lawyer",
            Role::LawFirm => "law_firm",
            Role::FirmLawyer => "firm_lawyer",
            Role::FirmClient => "firm_client",
            Role::Admin => "admin",
        }
    }

    /// Whether an account for this role must be vetted before it can log in.
    ///
    /// Clients booking a consultation are trusted immediately; every
    /// professional or firm-affiliated role goes through the review queue.
    pub const fn requires_approval(self) -> bool {
        match self {
            Role::Client => false,
            Role::Lawyer | Role::LawFirm | Role::FirmLawyer | Role::FirmClient => true,
            Role::Admin => false,
        }
    }

    /// Review queue section holding this role's applications, if any.
    pub const fn section(self) -> Option<ReviewSection> {
        match self {
            Role::Lawyer => Some(ReviewSection::Lawyers),
            Role::LawFirm => Some(ReviewSection::LawFirms),
            Role::FirmLawyer => Some(ReviewSection::FirmLawyers),
            Role::FirmClient => Some(ReviewSection::FirmClients),
            Role::Client | Role::Admin => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "client" | "user" => Ok(Role::Client),
            "lawyer" => Ok(Role::Lawyer),
            "law_firm" | "lawfirm" => Ok(Role::LawFirm),
            "firm_lawyer" => Ok(Role::FirmLawyer),
            "firm_client" => Ok(Role::FirmClient),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownVariant::new("role", other)),
        }
    }
}

/// Lifecycle status of an application record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub const fn is_final(self) -> bool {
        !matches!(self, ApplicationStatus::Pending)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ApplicationStatus {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ApplicationStatus::Pending),
            "approved" => Ok(ApplicationStatus::Approved),
            "rejected" => Ok(ApplicationStatus::Rejected),
            other => Err(UnknownVariant::new("status", other)),
        }
    }
}

/// An administrator's verdict on a pending application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub const fn label(self) -> &'static str {
        match self {
            Decision::Approve => "approve",
            Decision::Reject => "reject",
        }
    }

    pub const fn resulting_status(self) -> ApplicationStatus {
        match self {
            Decision::Approve => ApplicationStatus::Approved,
            Decision::Reject => ApplicationStatus::Rejected,
        }
    }

    /// Reason worth storing with this decision: only rejections keep one,
    /// and blank text counts as none.
    pub fn recorded_reason(self, reason: Option<&str>) -> Option<String> {
        match self {
            Decision::Approve => None,
            Decision::Reject => reason
                .map(str::trim)
                .filter(|reason| !reason.is_empty())
                .map(str::to_string),
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Decision {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "approve" | "approved" => Ok(Decision::Approve),
            "reject" | "rejected" => Ok(Decision::Reject),
            other => Err(UnknownVariant::new("decision", other)),
        }
    }
}

/// Status filter applied to a review queue listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    Pending,
    Approved,
    Rejected,
    All,
}

impl StatusFilter {
    pub fn matches(self, status: ApplicationStatus) -> bool {
        match self {
            StatusFilter::Pending => status == ApplicationStatus::Pending,
            StatusFilter::Approved => status == ApplicationStatus::Approved,
            StatusFilter::Rejected => status == ApplicationStatus::Rejected,
            StatusFilter::All => true,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            other => match other.parse::<ApplicationStatus>()? {
                ApplicationStatus::Pending => Ok(StatusFilter::Pending),
                ApplicationStatus::Approved => Ok(StatusFilter::Approved),
                ApplicationStatus::Rejected => Ok(StatusFilter::Rejected),
            },
        }
    }
}

/// One role's slice of the admin review queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewSection {
    Lawyers,
    LawFirms,
    FirmLawyers,
    FirmClients,
}

impl ReviewSection {
    pub const ALL: [ReviewSection; 4] = [
        ReviewSection::Lawyers,
        ReviewSection::LawFirms,
        ReviewSection::FirmLawyers,
        ReviewSection::FirmClients,
    ];

    pub const fn role(self) -> Role {
        match self {
            ReviewSection::Lawyers => Role::Lawyer,
            ReviewSection::LawFirms => Role::LawFirm,
            ReviewSection::FirmLawyers => Role::FirmLawyer,
            ReviewSection::FirmClients => Role::FirmClient,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ReviewSection::Lawyers => "lawyers",
            ReviewSection::LawFirms => "lawfirms",
            ReviewSection::FirmLawyers => "firmlawyers",
            ReviewSection::FirmClients => "firmclients",
        }
    }
}

impl fmt::Display for ReviewSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ReviewSection {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', '_'], "");
        match normalized.as_str() {
            "lawyers" | "lawyer" => Ok(ReviewSection::Lawyers),
            "lawfirms" | "lawfirm" => Ok(ReviewSection::LawFirms),
            "firmlawyers" | "firmlawyer" => Ok(ReviewSection::FirmLawyers),
            "firmclients" | "firmclient" => Ok(ReviewSection::FirmClients),
            _ => Err(UnknownVariant::new("section", value)),
        }
    }
}

/// Parse failure for the string forms of the enums above.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Snapshot of the firm an affiliated applicant picked in the wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmReference {
    pub firm_id: FirmId,
    pub firm_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LawyerProfile {
    pub name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    pub bar_council_number: String,
    pub specialization: String,
    pub experience: u8,
    #[serde(default)]
    pub cases_won: u32,
    pub state: String,
    pub city: String,
    pub court: String,
    pub education: String,
    pub languages: Vec<String>,
    pub fee_range: String,
    pub bio: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LawFirmProfile {
    pub firm_name: String,
    pub registration_number: String,
    pub established_year: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    pub contact_name: String,
    pub contact_phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_designation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub city: String,
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pincode: Option<String>,
    pub practice_areas: Vec<String>,
    pub total_lawyers: u32,
    #[serde(default)]
    pub total_staff: u32,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub achievements: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmLawyerProfile {
    pub full_name: String,
    pub phone: String,
    #[serde(flatten)]
    pub firm: FirmReference,
    pub specialization: String,
    pub experience_years: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bar_council_number: Option<String>,
    #[serde(default)]
    pub languages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmClientProfile {
    pub full_name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(flatten)]
    pub firm: FirmReference,
    pub case_type: String,
    pub case_description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientProfile {
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Role-specific payload; the variant is the role tag of the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ApplicationProfile {
    Client(ClientProfile),
    Lawyer(LawyerProfile),
    LawFirm(LawFirmProfile),
    FirmLawyer(FirmLawyerProfile),
    FirmClient(FirmClientProfile),
}

impl ApplicationProfile {
    pub const fn role(&self) -> Role {
        match self {
            ApplicationProfile::Client(_) => Role::Client,
            ApplicationProfile::Lawyer(_) => Role::Lawyer,
            ApplicationProfile::LawFirm(_) => Role::LawFirm,
            ApplicationProfile::FirmLawyer(_) => Role::FirmLawyer,
            ApplicationProfile::FirmClient(_) => Role::FirmClient,
        }
    }

    /// Name shown in review lists and dashboards.
    pub fn display_name(&self) -> &str {
        match self {
            ApplicationProfile::Client(profile) => &profile.full_name,
            ApplicationProfile::Lawyer(profile) => &profile.name,
            ApplicationProfile::LawFirm(profile) => &profile.firm_name,
            ApplicationProfile::FirmLawyer(profile) => &profile.full_name,
            ApplicationProfile::FirmClient(profile) => &profile.full_name,
        }
    }

    /// Firm the applicant is affiliated with, for firm lawyers and firm clients.
    pub fn firm(&self) -> Option<&FirmReference> {
        match self {
            ApplicationProfile::FirmLawyer(profile) => Some(&profile.firm),
            ApplicationProfile::FirmClient(profile) => Some(&profile.firm),
            ApplicationProfile::Client(_)
            | ApplicationProfile::Lawyer(_)
            | ApplicationProfile::LawFirm(_) => None,
        }
    }
}

/// Creation request carried from a submission form to the entity store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSubmission {
    pub email: String,
    pub password: String,
    pub profile: ApplicationProfile,
}

impl ApplicationSubmission {
    pub fn role(&self) -> Role {
        self.profile.role()
    }
}

/// Persisted application, including the credential hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub id: ApplicationId,
    pub email: String,
    pub password_hash: String,
    pub status: ApplicationStatus,
    pub profile: ApplicationProfile,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

impl ApplicationRecord {
    pub fn role(&self) -> Role {
        self.profile.role()
    }

    /// Whether the stored credentials may be used to authenticate.
    pub fn can_authenticate(&self) -> bool {
        self.status == ApplicationStatus::Approved
    }

    pub fn view(&self) -> ApplicationView {
        ApplicationView {
            id: self.id.clone(),
            email: self.email.clone(),
            status: self.status,
            display_name: self.profile.display_name().to_string(),
            profile: self.profile.clone(),
            created_at: self.created_at,
            reviewed_at: self.reviewed_at,
            reviewed_by: self.reviewed_by.clone(),
            rejection_reason: self.rejection_reason.clone(),
        }
    }

    pub fn user_profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.0.clone(),
            email: self.email.clone(),
            display_name: self.profile.display_name().to_string(),
            role: self.role(),
            firm_id: self.profile.firm().map(|firm| firm.firm_id.clone()),
        }
    }
}

/// Read model of an application; never carries the credential hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationView {
    pub id: ApplicationId,
    pub email: String,
    pub status: ApplicationStatus,
    pub display_name: String,
    pub profile: ApplicationProfile,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

impl ApplicationView {
    pub fn role(&self) -> Role {
        self.profile.role()
    }
}

/// Per-status population of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

impl StatusCounts {
    pub fn tally<'a, I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = &'a ApplicationStatus>,
    {
        statuses
            .into_iter()
            .fold(Self::default(), |mut counts, status| {
                match status {
                    ApplicationStatus::Pending => counts.pending += 1,
                    ApplicationStatus::Approved => counts.approved += 1,
                    ApplicationStatus::Rejected => counts.rejected += 1,
                }
                counts
            })
    }

    pub fn of(applications: &[ApplicationView]) -> Self {
        Self::tally(applications.iter().map(|app| &app.status))
    }

    pub fn total(&self) -> usize {
        self.pending + self.approved + self.rejected
    }
}

/// Normalised listing shape: the applications plus their unfiltered counts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApplicationListing {
    pub applications: Vec<ApplicationView>,
    pub stats: StatusCounts,
}

impl ApplicationListing {
    pub fn new(applications: Vec<ApplicationView>) -> Self {
        let stats = StatusCounts::of(&applications);
        Self {
            applications,
            stats,
        }
    }

    /// Narrow the visible applications without touching the counts.
    pub fn filtered(mut self, filter: StatusFilter) -> Self {
        self.applications.retain(|app| filter.matches(app.status));
        self
    }
}

/// Profile of an authenticated actor as returned by the login endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub display_name: String,
    #[serde(rename = "user_type")]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firm_id: Option<FirmId>,
}

/// Entry of the approved firm directory offered to affiliated applicants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmSummary {
    pub id: FirmId,
    pub firm_name: String,
    pub city: String,
    pub state: String,
    pub practice_areas: Vec<String>,
}

impl FirmSummary {
    pub fn from_record(record: &ApplicationRecord) -> Option<Self> {
        match &record.profile {
            ApplicationProfile::LawFirm(profile) if record.status == ApplicationStatus::Approved => {
                Some(Self {
                    id: FirmId::from(&record.id),
                    firm_name: profile.firm_name.clone(),
                    city: profile.city.clone(),
                    state: profile.state.clone(),
                    practice_areas: profile.practice_areas.clone(),
                })
            }
            _ => None,
        }
    }

    pub fn reference(&self) -> FirmReference {
        FirmReference {
            firm_id: self.id.clone(),
            firm_name: self.firm_name.clone(),
        }
    }
}

/// Login request; `role` selects the endpoint and the record kind to match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(rename = "user_type")]
    pub role: Role,
}

/// Token plus profile handed back by a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthGrant {
    pub token: String,
    pub user: UserProfile,
}

/// Outcome of applying a decision on the store side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionReceipt {
    pub id: ApplicationId,
    pub status: ApplicationStatus,
    /// `false` when the application already carried the requested status.
    pub changed: bool,
}

/// Acknowledgement returned when an application is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub id: ApplicationId,
    pub status: ApplicationStatus,
    #[serde(default)]
    pub message: String,
}

impl SubmissionReceipt {
    pub fn for_record(record: &ApplicationRecord) -> Self {
        let message = match record.status {
            ApplicationStatus::Pending => "application submitted and awaiting review",
            ApplicationStatus::Approved => "account created",
            ApplicationStatus::Rejected => "application rejected",
        };
        Self {
            id: record.id.clone(),
            status: record.status,
            message: message.to_string(),
        }
    }
}

/// Lower-case, trimmed e-mail used as the credential key.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

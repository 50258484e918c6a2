use crate::infra::session_stores;
use clap::Args;
use lexgate::client::{
    DecisionProcessor, HttpGateway, ReviewQueue, RoleGate, SessionStore, TracingNotifier,
};
use lexgate::config::AppConfig;
use lexgate::error::AppError;
use lexgate::telemetry;
use lexgate::workflows::onboarding::{
    ApplicationId, Decision, LoginRequest, ReviewSection, Role, StatusFilter,
};
use std::sync::Arc;
use tracing::info;

#[derive(Args, Debug)]
pub(crate) struct ReviewArgs {
    /// API base URL (defaults to APP_API_BASE_URL)
    #[arg(long)]
    pub(crate) base_url: Option<String>,
    /// Administrator e-mail (defaults to APP_ADMIN_EMAIL)
    #[arg(long)]
    pub(crate) email: Option<String>,
    /// Administrator password (defaults to APP_ADMIN_PASSWORD)
    #[arg(long)]
    pub(crate) password: Option<String>,
    /// Section to display: lawyers, lawfirms, firmlawyers or firmclients
    #[arg(long, default_value = "lawyers")]
    pub(crate) section: ReviewSection,
    /// Status filter: pending, approved, rejected or all
    #[arg(long, default_value = "pending")]
    pub(crate) filter: StatusFilter,
    /// Only show applications whose name or e-mail contains this text
    #[arg(long)]
    pub(crate) search: Option<String>,
    /// Approve the application with this id in the selected section
    #[arg(long, conflicts_with = "reject")]
    pub(crate) approve: Option<String>,
    /// Reject the application with this id in the selected section
    #[arg(long)]
    pub(crate) reject: Option<String>,
    /// Reason stored with the rejection
    #[arg(long, requires = "reject")]
    pub(crate) reason: Option<String>,
    /// Drop the stored admin session when done
    #[arg(long)]
    pub(crate) logout: bool,
}

impl ReviewArgs {
    fn decision(&self) -> Option<(ApplicationId, Decision)> {
        match (&self.approve, &self.reject) {
            (Some(id), _) => Some((ApplicationId(id.clone()), Decision::Approve)),
            (None, Some(id)) => Some((ApplicationId(id.clone()), Decision::Reject)),
            (None, None) => None,
        }
    }
}

pub(crate) async fn run_review(args: ReviewArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let base_url = args
        .base_url
        .clone()
        .unwrap_or_else(|| config.gateway.base_url.clone());
    let gateway = Arc::new(HttpGateway::new(base_url)?);
    let (user_sessions, admin_sessions) = session_stores(&config.gateway);
    let gate = RoleGate::new(
        Arc::clone(&gateway),
        user_sessions,
        Arc::clone(&admin_sessions),
    );

    if !admin_sessions.get()?.is_active() {
        let email = args
            .email
            .clone()
            .unwrap_or_else(|| config.auth.admin_email.clone());
        let password = args
            .password
            .clone()
            .unwrap_or_else(|| config.auth.admin_password.clone());
        gate.login(LoginRequest {
            email,
            password,
            role: Role::Admin,
        })
        .await?;
    }
    info!(base_url = %gateway.base_url(), "admin session ready");

    let notifier = Arc::new(TracingNotifier);
    let mut queue = ReviewQueue::new(
        Arc::clone(&gateway),
        Arc::clone(&admin_sessions),
        notifier.clone(),
    );

    let report = queue.refresh().await?;
    if report.session_expired {
        println!("Admin session expired; run the command again to log in.");
        return Ok(());
    }

    if let Some((id, decision)) = args.decision() {
        let processor = DecisionProcessor::new(
            Arc::clone(&gateway),
            Arc::clone(&admin_sessions),
            notifier,
        );
        let outcome = processor
            .apply_with_reason(&mut queue, args.section, &id, decision, args.reason.as_deref())
            .await?;
        if outcome.receipt.changed {
            println!("{} is now {}", outcome.receipt.id, outcome.receipt.status);
        } else {
            println!("{} was already {}", outcome.receipt.id, outcome.receipt.status);
        }
    }

    render_queue(&mut queue, &args);

    if args.logout {
        gate.logout(Role::Admin).await?;
        println!("Admin session cleared.");
    }
    Ok(())
}

fn render_queue<G>(queue: &mut ReviewQueue<G>, args: &ReviewArgs)
where
    G: lexgate::client::ApplicationGateway,
{
    println!("Review queue");
    for section in ReviewSection::ALL {
        let counts = queue.counts(section);
        let marker = if section == args.section { "*" } else { " " };
        let note = match queue.state(section).and_then(|state| state.last_error.as_deref()) {
            Some(err) => format!("  (stale: {err})"),
            None => String::new(),
        };
        println!(
            "{marker} {:<12} pending {:>3}  approved {:>3}  rejected {:>3}{note}",
            section, counts.pending, counts.approved, counts.rejected
        );
    }

    queue.set_section(args.section);
    queue.set_filter(args.filter);
    queue.set_query(args.search.clone().unwrap_or_default());

    let visible = queue.visible();
    if visible.is_empty() {
        println!("\nNo {} applications match.", args.section);
        return;
    }
    println!();
    for app in visible {
        println!(
            "  {}  {:<9} {:<28} {}",
            app.id,
            app.status.label(),
            app.display_name,
            app.email
        );
        if let Some(reason) = &app.rejection_reason {
            println!("      reason: {reason}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct Harness {
        #[command(flatten)]
        review: ReviewArgs,
    }

    #[test]
    fn parses_section_filter_and_decision() {
        let parsed = Harness::try_parse_from([
            "review",
            "--section",
            "firm-clients",
            "--filter",
            "all",
            "--reject",
            "abc",
        ])
        .expect("arguments parse");
        assert_eq!(parsed.review.section, ReviewSection::FirmClients);
        assert_eq!(parsed.review.filter, StatusFilter::All);
        assert_eq!(
            parsed.review.decision(),
            Some((ApplicationId("abc".to_string()), Decision::Reject))
        );
    }

    #[test]
    fn reason_goes_with_a_rejection() {
        let parsed = Harness::try_parse_from([
            "review",
            "--reject",
            "abc",
            "--reason",
            "incomplete documents",
        ])
        .expect("arguments parse");
        assert_eq!(parsed.review.reason.as_deref(), Some("incomplete documents"));

        assert!(Harness::try_parse_from(["review", "--approve", "a", "--reason", "x"]).is_err());
    }

    #[test]
    fn approve_and_reject_are_exclusive() {
        let parsed =
            Harness::try_parse_from(["review", "--approve", "a", "--reject", "b"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn unknown_sections_are_refused() {
        assert!(Harness::try_parse_from(["review", "--section", "judges"]).is_err());
    }
}

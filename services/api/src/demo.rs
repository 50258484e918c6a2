use crate::infra::onboarding_service;
use chrono::{DateTime, Utc};
use clap::Args;
use lexgate::client::{
    DecisionProcessor, FirmClientForm, FirmLawyerForm, GateError, LawFirmForm, LawyerForm,
    LocalGateway, MemoryNotifier, MemorySessionStore, ReviewQueue, RoleGate, Route, SessionStore,
    SubmissionClient, SubmissionError, Wizard,
};
use lexgate::config::AuthConfig;
use lexgate::error::AppError;
use lexgate::workflows::onboarding::{
    ApplicationId, Decision, FirmId, LoginRequest, MemoryEntityStore, ReviewSection, Role,
    StatusFilter,
};
use std::sync::Arc;

const DEMO_ADMIN_EMAIL: &str = "admin@nyaaysathi.com";
const DEMO_ADMIN_PASSWORD: &str = "admin123";

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Reject the independent lawyer instead of approving them.
    #[arg(long)]
    pub(crate) reject_lawyer: bool,
    /// Stop after the independent lawyer flow.
    #[arg(long)]
    pub(crate) skip_firm_flow: bool,
    /// Print the final review queue as JSON.
    #[arg(long)]
    pub(crate) json: bool,
}

type Gateway = LocalGateway<MemoryEntityStore>;

struct DemoContext {
    gateway: Arc<Gateway>,
    notifier: Arc<MemoryNotifier>,
    gate: RoleGate<Gateway>,
    admin_sessions: Arc<dyn SessionStore>,
}

impl DemoContext {
    fn new() -> Self {
        let auth = AuthConfig {
            jwt_secret: "lexgate-demo-secret".to_string(),
            admin_email: DEMO_ADMIN_EMAIL.to_string(),
            admin_password: DEMO_ADMIN_PASSWORD.to_string(),
        };
        let gateway = Arc::new(LocalGateway::new(Arc::new(onboarding_service(&auth))));
        let user_sessions: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let admin_sessions: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let gate = RoleGate::new(
            Arc::clone(&gateway),
            Arc::clone(&user_sessions),
            Arc::clone(&admin_sessions),
        );
        Self {
            gateway,
            notifier: Arc::new(MemoryNotifier::default()),
            gate,
            admin_sessions,
        }
    }

    fn submissions(&self) -> SubmissionClient<Gateway> {
        SubmissionClient::new(Arc::clone(&self.gateway), self.notifier.clone())
    }

    fn queue(&self) -> ReviewQueue<Gateway> {
        ReviewQueue::new(
            Arc::clone(&self.gateway),
            Arc::clone(&self.admin_sessions),
            self.notifier.clone(),
        )
    }

    fn processor(&self) -> DecisionProcessor<Gateway> {
        DecisionProcessor::new(
            Arc::clone(&self.gateway),
            Arc::clone(&self.admin_sessions),
            self.notifier.clone(),
        )
    }
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let ctx = DemoContext::new();

    println!("Legal services onboarding demo");

    let mut wizard = Wizard::new(demo_lawyer());
    while !wizard.is_last() {
        let (position, total) = wizard.progress();
        let step = wizard.advance().map_err(SubmissionError::Invalid)?;
        println!("  Lawyer wizard step {}/{total} complete, next: {step:?}", position + 1);
    }
    let receipt = wizard.submit(&ctx.submissions()).await?;
    println!(
        "  Lawyer application {} is {} ({})",
        receipt.id, receipt.status, receipt.message
    );

    let lawyer_login = LoginRequest {
        email: wizard.form().email.clone(),
        password: wizard.form().password.clone(),
        role: Role::Lawyer,
    };
    match ctx.gate.login(lawyer_login.clone()).await {
        Err(GateError::InvalidCredentials(detail)) => {
            println!("  Login before review refused: {detail}")
        }
        Err(err) => return Err(err.into()),
        Ok(_) => println!("  Unexpected: login succeeded before review"),
    }

    println!("\nAdministrator review");
    ctx.gate
        .login(LoginRequest {
            email: DEMO_ADMIN_EMAIL.to_string(),
            password: DEMO_ADMIN_PASSWORD.to_string(),
            role: Role::Admin,
        })
        .await?;
    println!(
        "  Admin dashboard access: {:?}",
        ctx.gate.authorize(Route::AdminDashboard)?
    );

    let mut queue = ctx.queue();
    queue.refresh().await?;
    print_counts(&queue);

    let (decision, reason) = if args.reject_lawyer {
        (Decision::Reject, Some("enrolment could not be verified"))
    } else {
        (Decision::Approve, None)
    };
    let outcome = ctx
        .processor()
        .apply_with_reason(&mut queue, ReviewSection::Lawyers, &receipt.id, decision, reason)
        .await?;
    if let Some(reason) = reason {
        println!("  Reason recorded: {reason}");
    }
    println!(
        "  {} lawyer application {}: now {}",
        decision, outcome.receipt.id, outcome.receipt.status
    );
    print_counts(&queue);

    match ctx.gate.login(lawyer_login).await {
        Ok(session) => println!(
            "  Lawyer signed in as {} -> {}",
            session.user.display_name,
            Route::dashboard_for(session.role).path()
        ),
        Err(GateError::InvalidCredentials(detail)) => println!("  Lawyer login refused: {detail}"),
        Err(err) => return Err(err.into()),
    }
    ctx.gate.logout(Role::Lawyer).await?;

    if !args.skip_firm_flow {
        run_firm_flow(&ctx, &mut queue).await?;
    }

    println!("\nReview queue after the demo");
    queue.set_filter(StatusFilter::All);
    for section in ReviewSection::ALL {
        queue.set_section(section);
        for app in queue.visible() {
            println!(
                "  [{}] {} <{}> {} (reviewed {})",
                section,
                app.display_name,
                app.email,
                app.status,
                describe_review(app.reviewed_at, app.reviewed_by.as_deref())
            );
        }
    }

    if args.json {
        let mut listings = serde_json::Map::new();
        for section in ReviewSection::ALL {
            if let Some(state) = queue.state(section) {
                listings.insert(
                    section.to_string(),
                    serde_json::to_value(&state.listing).unwrap_or_default(),
                );
            }
        }
        match serde_json::to_string_pretty(&listings) {
            Ok(json) => println!("{json}"),
            Err(err) => println!("  Listing serialization failed: {err}"),
        }
    }

    println!("\nNotifications");
    for notification in ctx.notifier.notifications() {
        println!("  {:?}: {}", notification.level, notification.message);
    }

    ctx.gate.logout(Role::Admin).await?;
    println!(
        "\nAdmin logged out; dashboard access is now {:?}",
        ctx.gate.authorize(Route::AdminDashboard)?
    );
    Ok(())
}

async fn run_firm_flow(
    ctx: &DemoContext,
    queue: &mut ReviewQueue<Gateway>,
) -> Result<(), AppError> {
    println!("\nLaw firm onboarding");
    let submissions = ctx.submissions();
    let processor = ctx.processor();

    let firm_receipt = submissions.submit(&demo_firm()).await?;
    processor
        .apply(queue, ReviewSection::LawFirms, &firm_receipt.id, Decision::Approve)
        .await?;
    let firm_id = FirmId::from(&firm_receipt.id);
    println!("  Firm {} approved and listed in the directory", firm_id);

    let unlisted = FirmLawyerForm {
        firm_id: None,
        ..demo_firm_lawyer(firm_id.clone())
    };
    if let Err(err) = submissions.submit(&unlisted).await {
        println!("  Firm lawyer without a firm refused: {err}");
    }

    let lawyer_receipt = submissions.submit(&demo_firm_lawyer(firm_id.clone())).await?;
    let mut client_ids: Vec<ApplicationId> = Vec::new();
    for (name, email) in [
        ("Karan Shah", "karan@example.com"),
        ("Nisha Patel", "nisha@example.com"),
    ] {
        let receipt = submissions
            .submit(&demo_firm_client(firm_id.clone(), name, email))
            .await?;
        client_ids.push(receipt.id);
    }
    println!(
        "  Queued firm lawyer {} and {} firm clients",
        lawyer_receipt.id,
        client_ids.len()
    );

    queue.refresh().await?;
    print_counts(queue);

    processor
        .apply(queue, ReviewSection::FirmLawyers, &lawyer_receipt.id, Decision::Approve)
        .await?;
    for id in &client_ids {
        processor
            .apply(queue, ReviewSection::FirmClients, id, Decision::Approve)
            .await?;
    }
    print_counts(queue);

    let clients = ctx.gateway.service().firm_clients(&firm_id)?;
    println!("  Firm {} now has {} clients", firm_id, clients.len());

    let session = ctx
        .gate
        .login(LoginRequest {
            email: "meera@example.com".to_string(),
            password: "secret1".to_string(),
            role: Role::FirmLawyer,
        })
        .await?;
    println!(
        "  Firm lawyer signed in as {} -> {}",
        session.user.display_name,
        Route::dashboard_for(session.role).path()
    );
    ctx.gate.logout(Role::FirmLawyer).await?;
    Ok(())
}

fn print_counts(queue: &ReviewQueue<Gateway>) {
    for section in ReviewSection::ALL {
        let counts = queue.counts(section);
        println!(
            "  {:<12} pending {:>2}  approved {:>2}  rejected {:>2}",
            section, counts.pending, counts.approved, counts.rejected
        );
    }
}

fn describe_review(at: Option<DateTime<Utc>>, by: Option<&str>) -> String {
    match (at, by) {
        (Some(at), Some(by)) => format!("{} by {}", at.format("%Y-%m-%d %H:%M UTC"), by),
        (Some(at), None) => at.format("%Y-%m-%d %H:%M UTC").to_string(),
        _ => "not yet".to_string(),
    }
}

fn demo_lawyer() -> LawyerForm {
    LawyerForm {
        name: "Asha Rao".to_string(),
        email: "a@x.com".to_string(),
        phone: "+91 98450 00001".to_string(),
        password: "secret1".to_string(),
        confirm_password: "secret1".to_string(),
        bar_council_number: "KAR/1234/2012".to_string(),
        specialization: "Property Law".to_string(),
        experience: 12,
        cases_won: 140,
        state: "Karnataka".to_string(),
        city: "Bengaluru".to_string(),
        court: "High Court".to_string(),
        languages: vec!["English".to_string(), "Kannada".to_string()],
        fee_range: "5000-10000".to_string(),
        education: "LLB, NLSIU".to_string(),
        bio: "Property and tenancy disputes.".to_string(),
        ..LawyerForm::default()
    }
}

fn demo_firm() -> LawFirmForm {
    LawFirmForm {
        firm_name: "Rao & Partners".to_string(),
        registration_number: "FIRM-2009-114".to_string(),
        established_year: 2009,
        contact_name: "Vikram Rao".to_string(),
        email: "firm@example.com".to_string(),
        contact_phone: "+91 80 4000 1000".to_string(),
        password: "firmpass".to_string(),
        confirm_password: "firmpass".to_string(),
        city: "Bengaluru".to_string(),
        state: "Karnataka".to_string(),
        practice_areas: vec!["Corporate Law".to_string(), "Property Law".to_string()],
        total_lawyers: 18,
        total_staff: 30,
        description: "Full-service firm.".to_string(),
        ..LawFirmForm::default()
    }
}

fn demo_firm_lawyer(firm_id: FirmId) -> FirmLawyerForm {
    FirmLawyerForm {
        full_name: "Meera Iyer".to_string(),
        email: "meera@example.com".to_string(),
        phone: "+91 98450 00002".to_string(),
        password: "secret1".to_string(),
        confirm_password: "secret1".to_string(),
        firm_id: Some(firm_id),
        specialization: "Corporate Law".to_string(),
        experience_years: 6,
        ..FirmLawyerForm::default()
    }
}

fn demo_firm_client(firm_id: FirmId, name: &str, email: &str) -> FirmClientForm {
    FirmClientForm {
        full_name: name.to_string(),
        email: email.to_string(),
        phone: "+91 98450 00003".to_string(),
        password: "client1".to_string(),
        confirm_password: "client1".to_string(),
        firm_id: Some(firm_id),
        case_type: "Property Dispute".to_string(),
        case_description: "Boundary dispute with a neighbour.".to_string(),
        ..FirmClientForm::default()
    }
}

mod common;

use std::net::SocketAddr;
use std::sync::Arc;

use common::*;
use lexgate::client::{ApplicationGateway, GateError, GatewayError, HttpGateway};
use lexgate::workflows::onboarding::{
    onboarding_router, ApplicationStatus, Decision, FirmId, LoginRequest, ReviewSection, Role,
    StatusFilter, INVALID_LOGIN,
};
use tokio::net::TcpListener;

async fn serve(router: axum::Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("ephemeral port");
    let addr = listener.local_addr().expect("bound address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server runs");
    });
    addr
}

async fn http_harness() -> Harness<HttpGateway> {
    let addr = serve(onboarding_router(service())).await;
    let gateway = HttpGateway::new(format!("http://{addr}/")).expect("client builds");
    Harness::new(Arc::new(gateway))
}

#[tokio::test]
async fn lawyer_review_round_trip_over_http() {
    let harness = http_harness().await;

    let receipt = harness
        .submissions()
        .submit(&lawyer_form("a@x.com", "secret1"))
        .await
        .expect("submission accepted");
    assert_eq!(receipt.status, ApplicationStatus::Pending);
    assert!(!receipt.message.is_empty());

    let login = LoginRequest {
        email: "a@x.com".to_string(),
        password: "secret1".to_string(),
        role: Role::Lawyer,
    };
    match harness.gate.login(login.clone()).await {
        Err(GateError::InvalidCredentials(detail)) => assert_eq!(detail, INVALID_LOGIN),
        other => panic!("pending lawyer must not log in: {other:?}"),
    }

    harness.login_admin().await;
    let mut queue = harness.queue();
    queue.refresh().await.expect("queue loads");
    assert_eq!(queue.counts(ReviewSection::Lawyers).pending, 1);

    let outcome = harness
        .processor()
        .apply(&mut queue, ReviewSection::Lawyers, &receipt.id, Decision::Approve)
        .await
        .expect("approval applies");
    assert!(outcome.receipt.changed);
    assert_eq!(queue.counts(ReviewSection::Lawyers).approved, 1);

    let session = harness.gate.login(login).await.expect("approved lawyer logs in");
    assert_eq!(session.user.role, Role::Lawyer);
}

#[tokio::test]
async fn firm_sections_use_query_decisions_and_bare_arrays() {
    let harness = http_harness().await;
    harness.login_admin().await;
    let firm_id = approved_firm(&harness, "firm@example.com").await;

    let firms = harness.gateway.approved_firms().await.expect("directory");
    assert_eq!(firms.len(), 1);
    assert_eq!(firms[0].id, firm_id);

    let lawyer = harness
        .submissions()
        .submit(&firm_lawyer_form("meera@example.com", Some(firm_id.clone())))
        .await
        .expect("firm lawyer accepted");
    harness
        .submissions()
        .submit(&firm_client_form("karan@example.com", Some(firm_id.clone())))
        .await
        .expect("firm client accepted");

    let mut queue = harness.queue();
    queue.refresh().await.expect("queue loads");
    assert_eq!(queue.counts(ReviewSection::FirmLawyers).pending, 1);
    assert_eq!(queue.counts(ReviewSection::FirmClients).pending, 1);

    harness
        .processor()
        .apply(&mut queue, ReviewSection::FirmLawyers, &lawyer.id, Decision::Approve)
        .await
        .expect("firm lawyer approved");
    assert_eq!(
        queue.status_of(ReviewSection::FirmLawyers, &lawyer.id),
        Some(ApplicationStatus::Approved)
    );

    let session = harness
        .gate
        .login(LoginRequest {
            email: "meera@example.com".to_string(),
            password: "secret1".to_string(),
            role: Role::FirmLawyer,
        })
        .await
        .expect("firm lawyer logs in");
    assert_eq!(session.user.firm_id, Some(firm_id.clone()));

    let admin_token = harness
        .admin_sessions
        .token()
        .expect("readable")
        .expect("admin token");
    let clients = harness
        .gateway
        .firm_clients(&admin_token, &firm_id)
        .await
        .expect("clients");
    assert_eq!(clients.len(), 1);

    let err = harness
        .gateway
        .firm_clients(&session.token, &firm_id)
        .await
        .expect_err("a firm lawyer cannot read the client roster");
    assert!(err.is_auth_failure());
}

#[tokio::test]
async fn contrary_decision_is_a_conflict() {
    let harness = http_harness().await;
    let receipt = harness
        .submissions()
        .submit(&lawyer_form("a@x.com", "secret1"))
        .await
        .expect("submission accepted");
    harness.login_admin().await;
    let token = harness
        .admin_sessions
        .token()
        .expect("readable")
        .expect("admin token");

    harness
        .gateway
        .decide(&token, ReviewSection::Lawyers, &receipt.id, Decision::Reject, None)
        .await
        .expect("rejection applies");
    let repeat = harness
        .gateway
        .decide(&token, ReviewSection::Lawyers, &receipt.id, Decision::Reject, None)
        .await
        .expect("repeat is accepted");
    assert!(!repeat.changed);

    let err = harness
        .gateway
        .decide(&token, ReviewSection::Lawyers, &receipt.id, Decision::Approve, None)
        .await
        .expect_err("already rejected");
    assert!(matches!(err, GatewayError::Conflict(_)));
}

#[tokio::test]
async fn server_side_validation_reaches_the_form() {
    let harness = http_harness().await;
    harness.login_admin().await;
    let firm_id = approved_firm(&harness, "firm@example.com").await;
    harness
        .submissions()
        .submit(&firm_client_form("karan@example.com", Some(firm_id.clone())))
        .await
        .expect("first accepted");

    let err = harness
        .submissions()
        .submit(&firm_client_form("KARAN@example.com", Some(firm_id)))
        .await
        .expect_err("duplicate email");
    assert!(matches!(
        err,
        lexgate::client::SubmissionError::Gateway(GatewayError::Conflict(_))
    ));
}

#[tokio::test]
async fn user_tokens_cannot_list_sections() {
    let harness = http_harness().await;
    let grant = harness
        .submissions()
        .register(&lexgate::client::ClientSignupForm {
            full_name: "Ravi Kumar".to_string(),
            email: "ravi@example.com".to_string(),
            phone: None,
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
        })
        .await
        .expect("signup succeeds");

    let err = harness
        .gateway
        .list(&grant.token, ReviewSection::Lawyers, StatusFilter::All)
        .await
        .expect_err("clients are not admins");
    assert!(err.is_auth_failure());
}

#[tokio::test]
async fn missing_list_endpoint_reads_as_an_empty_section() {
    let addr = serve(axum::Router::new()).await;
    let gateway = HttpGateway::new(format!("http://{addr}")).expect("client builds");

    let listing = gateway
        .list("any-token", ReviewSection::FirmClients, StatusFilter::All)
        .await
        .expect("empty section");
    assert!(listing.applications.is_empty());
    assert_eq!(listing.stats.total(), 0);

    let err = gateway
        .decide(
            "any-token",
            ReviewSection::FirmClients,
            &lexgate::workflows::onboarding::ApplicationId("x".to_string()),
            Decision::Approve,
            None,
        )
        .await
        .expect_err("no decision endpoint");
    assert!(matches!(err, GatewayError::NotFound(_)));
}

#[tokio::test]
async fn unreachable_store_is_transient() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("ephemeral port");
    let addr = listener.local_addr().expect("bound address");
    drop(listener);

    let gateway = HttpGateway::new(format!("http://{addr}")).expect("client builds");
    let err = gateway
        .firm_clients("any-token", &FirmId("any".to_string()))
        .await
        .expect_err("nothing listening");
    assert!(matches!(err, GatewayError::Transient(_)));
}

#[tokio::test]
async fn rejection_reasons_travel_with_both_decision_styles() {
    let service = service();
    let addr = serve(onboarding_router(service.clone())).await;
    let harness = Harness::new(Arc::new(
        HttpGateway::new(format!("http://{addr}")).expect("client builds"),
    ));
    harness.login_admin().await;
    let firm_id = approved_firm(&harness, "firm@example.com").await;
    let lawyer = harness
        .submissions()
        .submit(&lawyer_form("a@x.com", "secret1"))
        .await
        .expect("lawyer accepted");
    let client = harness
        .submissions()
        .submit(&firm_client_form("karan@example.com", Some(firm_id)))
        .await
        .expect("firm client accepted");

    let mut queue = harness.queue();
    queue.refresh().await.expect("queue loads");
    let processor = harness.processor();
    processor
        .apply_with_reason(
            &mut queue,
            ReviewSection::Lawyers,
            &lawyer.id,
            Decision::Reject,
            Some("bar council number not found"),
        )
        .await
        .expect("lawyer rejected");
    processor
        .apply_with_reason(
            &mut queue,
            ReviewSection::FirmClients,
            &client.id,
            Decision::Reject,
            Some("conflict of interest"),
        )
        .await
        .expect("client rejected");

    let stored = service.get(&lawyer.id).expect("lawyer stored");
    assert_eq!(
        stored.rejection_reason.as_deref(),
        Some("bar council number not found")
    );
    let stored = service.get(&client.id).expect("client stored");
    assert_eq!(stored.rejection_reason.as_deref(), Some("conflict of interest"));
    assert_eq!(stored.status, ApplicationStatus::Rejected);
}

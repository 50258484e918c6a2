mod common;

use std::sync::atomic::Ordering;

use common::*;
use futures::future::join_all;
use lexgate::client::{
    Access, ApplicationGateway, AuthPhase, ClientSignupForm, DecisionError, GateError, GatewayError,
    NotificationLevel, ReviewError, Route, Session, SessionState, SubmissionError, Wizard,
};
use lexgate::workflows::onboarding::{
    ApplicationProfile, ApplicationStatus, ApplicationSubmission, ClientProfile, Decision, FirmId,
    LoginRequest, ReviewSection, Role, StatusFilter, INVALID_LOGIN,
};

fn client_submission(email: &str) -> ApplicationSubmission {
    ApplicationSubmission {
        email: email.to_string(),
        password: "secret1".to_string(),
        profile: ApplicationProfile::Client(ClientProfile {
            full_name: "Ravi Kumar".to_string(),
            phone: None,
        }),
    }
}

fn client_login(email: &str) -> LoginRequest {
    LoginRequest {
        email: email.to_string(),
        password: "secret1".to_string(),
        role: Role::Client,
    }
}

#[tokio::test]
async fn lawyer_can_only_log_in_after_approval() {
    let (harness, _service) = local_harness();

    let mut wizard = Wizard::new(lawyer_form("a@x.com", "secret1"));
    while !wizard.is_last() {
        wizard.advance().expect("step validates");
    }
    let receipt = wizard
        .submit(&harness.submissions())
        .await
        .expect("submission accepted");
    assert_eq!(receipt.status, ApplicationStatus::Pending);

    let login = LoginRequest {
        email: "a@x.com".to_string(),
        password: "secret1".to_string(),
        role: Role::Lawyer,
    };
    match harness.gate.login(login.clone()).await {
        Err(GateError::InvalidCredentials(detail)) => assert_eq!(detail, INVALID_LOGIN),
        other => panic!("pending lawyer must not log in: {other:?}"),
    }
    assert!(!harness.user_sessions.get().expect("readable").is_active());
    assert_eq!(harness.gate.phase().expect("readable"), AuthPhase::Anonymous);

    harness.login_admin().await;
    let mut queue = harness.queue();
    queue.refresh().await.expect("queue loads");
    assert_eq!(queue.counts(ReviewSection::Lawyers).pending, 1);

    harness
        .processor()
        .apply(&mut queue, ReviewSection::Lawyers, &receipt.id, Decision::Approve)
        .await
        .expect("approval applies");

    let session = harness.gate.login(login).await.expect("approved lawyer logs in");
    assert_eq!(session.role, Role::Lawyer);
    assert_eq!(
        harness.gate.phase().expect("readable"),
        AuthPhase::Authenticated(Role::Lawyer)
    );
    assert_eq!(
        harness.gate.authorize(Route::LawyerDashboard).expect("readable"),
        Access::Granted
    );
}

#[tokio::test]
async fn forbidden_section_expires_admin_session_without_dropping_loaded_data() {
    let (harness, _service) = scripted_harness();
    harness
        .submissions()
        .submit(&lawyer_form("a@x.com", "secret1"))
        .await
        .expect("submission accepted");
    harness.login_admin().await;

    let mut queue = harness.queue();
    queue.refresh().await.expect("queue loads");
    assert_eq!(queue.counts(ReviewSection::Lawyers).pending, 1);

    harness.gateway.forbid(ReviewSection::LawFirms);
    let report = queue.refresh().await.expect("refresh completes");

    assert!(report.session_expired);
    assert!(report.failed.contains(&ReviewSection::LawFirms));
    assert_eq!(queue.redirect(), Some(Route::AdminLogin));
    assert_eq!(
        harness.admin_sessions.get().expect("readable"),
        SessionState::Empty
    );
    assert_eq!(queue.counts(ReviewSection::Lawyers).pending, 1);
    assert!(harness
        .notifier
        .notifications()
        .iter()
        .any(|note| note.level == NotificationLevel::Error));
}

#[tokio::test]
async fn firm_clients_of_one_firm_are_listed_together() {
    let (harness, service) = local_harness();
    harness.login_admin().await;
    let firm_id = approved_firm(&harness, "firm@example.com").await;

    for email in ["karan@example.com", "nisha@example.com"] {
        let receipt = harness
            .submissions()
            .submit(&firm_client_form(email, Some(firm_id.clone())))
            .await
            .expect("client application accepted");
        assert_eq!(receipt.status, ApplicationStatus::Pending);
    }

    let clients = service.firm_clients(&firm_id).expect("listing");
    assert_eq!(clients.len(), 2);

    let mut queue = harness.queue();
    queue.refresh().await.expect("queue loads");
    assert_eq!(queue.counts(ReviewSection::FirmClients).pending, 2);
}

#[tokio::test]
async fn failed_decision_leaves_queue_untouched() {
    let (harness, _service) = scripted_harness();
    let receipt = harness
        .submissions()
        .submit(&lawyer_form("a@x.com", "secret1"))
        .await
        .expect("submission accepted");
    harness.login_admin().await;

    let mut queue = harness.queue();
    queue.refresh().await.expect("queue loads");
    let before = queue.counts(ReviewSection::Lawyers);

    harness.gateway.fail_decisions.store(true, Ordering::SeqCst);
    let err = harness
        .processor()
        .apply(&mut queue, ReviewSection::Lawyers, &receipt.id, Decision::Approve)
        .await
        .expect_err("decision fails");

    assert!(matches!(err, DecisionError::Gateway(GatewayError::Transient(_))));
    assert_eq!(
        queue.status_of(ReviewSection::Lawyers, &receipt.id),
        Some(ApplicationStatus::Pending)
    );
    assert_eq!(queue.counts(ReviewSection::Lawyers), before);
    assert!(harness.admin_sessions.get().expect("readable").is_active());
}

#[tokio::test]
async fn decision_moves_exactly_one_application() {
    let (harness, _service) = local_harness();
    let first = harness
        .submissions()
        .submit(&lawyer_form("a@x.com", "secret1"))
        .await
        .expect("first accepted");
    harness
        .submissions()
        .submit(&lawyer_form("b@x.com", "secret2"))
        .await
        .expect("second accepted");
    harness.login_admin().await;

    let mut queue = harness.queue();
    queue.refresh().await.expect("queue loads");
    let before = queue.counts(ReviewSection::Lawyers);
    assert_eq!(before.pending, 2);

    let outcome = harness
        .processor()
        .apply(&mut queue, ReviewSection::Lawyers, &first.id, Decision::Reject)
        .await
        .expect("rejection applies");
    assert!(outcome.receipt.changed);
    assert_eq!(outcome.receipt.status, ApplicationStatus::Rejected);

    let after = queue.counts(ReviewSection::Lawyers);
    assert_eq!(after.pending, before.pending - 1);
    assert_eq!(after.rejected, before.rejected + 1);
    assert_eq!(after.approved, before.approved);
    assert_eq!(after.total(), before.total());
}

#[tokio::test]
async fn logout_blocks_protected_calls() {
    let (harness, _service) = local_harness();
    let receipt = harness
        .submissions()
        .submit(&lawyer_form("a@x.com", "secret1"))
        .await
        .expect("submission accepted");
    harness.login_admin().await;
    let mut queue = harness.queue();
    queue.refresh().await.expect("queue loads");

    harness.gate.logout(Role::Admin).await.expect("logout");

    assert!(matches!(queue.refresh().await, Err(ReviewError::Unauthenticated)));
    assert_eq!(queue.redirect(), Some(Route::AdminLogin));
    let err = harness
        .processor()
        .apply(&mut queue, ReviewSection::Lawyers, &receipt.id, Decision::Approve)
        .await
        .expect_err("no session");
    assert!(matches!(err, DecisionError::Unauthenticated));
    assert_eq!(
        harness.gate.authorize(Route::AdminDashboard).expect("readable"),
        Access::Redirect(Route::AdminLogin)
    );

    let gateway = harness.gateway.clone();
    let result = harness
        .gate
        .call(Role::Admin, |token| async move {
            gateway.list(&token, ReviewSection::Lawyers, StatusFilter::All).await
        })
        .await;
    assert!(matches!(result, Err(GateError::Unauthenticated)));
}

#[tokio::test]
async fn interleaved_login_and_logout_never_leave_a_partial_session() {
    let (harness, service) = local_harness();
    let client = service
        .register_client(client_submission("ravi@example.com"))
        .expect("client registered");

    // An even number of rounds ends on a logout, an odd number on a login.
    for rounds in [24, 25] {
        let operations = (0..rounds).map(|round| {
            let gate = harness.gate.clone();
            let sessions = harness.user_sessions.clone();
            async move {
                let outcome = if round % 2 == 0 {
                    gate.login(client_login("ravi@example.com")).await.map(|_| ())
                } else {
                    gate.logout(Role::Client).await
                };
                outcome.expect("operation completes");
                sessions.get().expect("readable")
            }
        });

        for state in join_all(operations).await {
            if let SessionState::Active(session) = state {
                assert!(!session.token.is_empty());
                assert_eq!(session.role, Role::Client);
                assert_eq!(session.user.id, client.user.id);
            }
        }

        let last_was_login = (rounds - 1) % 2 == 0;
        let state = harness.user_sessions.get().expect("readable");
        assert_eq!(state.is_active(), last_was_login, "after {rounds} rounds");
        let expected = if last_was_login {
            Access::Granted
        } else {
            Access::Redirect(Route::UserLogin)
        };
        assert_eq!(
            harness.gate.authorize(Route::UserDashboard).expect("readable"),
            expected
        );
    }
}

#[tokio::test]
async fn stale_rejection_keeps_a_session_from_a_newer_login() {
    let (harness, service) = local_harness();
    for email in ["ravi@example.com", "nisha@example.com"] {
        service
            .register_client(client_submission(email))
            .expect("client registered");
    }
    harness
        .gate
        .login(client_login("ravi@example.com"))
        .await
        .expect("first login");
    let first = harness
        .user_sessions
        .token()
        .expect("readable")
        .expect("first token");

    // The answer to the old token arrives only after a second login finished.
    let gate = harness.gate.clone();
    let result = harness
        .gate
        .call(Role::Client, move |_token| async move {
            gate.login(client_login("nisha@example.com"))
                .await
                .expect("newer login");
            Err::<(), _>(GatewayError::Unauthorized {
                status: 401,
                detail: "token revoked".to_string(),
            })
        })
        .await;

    assert!(matches!(
        result,
        Err(GateError::Gateway(GatewayError::Unauthorized { status: 401, .. }))
    ));
    let state = harness.user_sessions.get().expect("readable");
    let session = state.session().expect("newer session kept");
    assert_ne!(session.token, first);
    assert_eq!(session.user.email, "nisha@example.com");
    assert_eq!(
        harness.gate.authorize(Route::UserDashboard).expect("readable"),
        Access::Granted
    );
}

#[tokio::test]
async fn stale_refusal_does_not_expire_a_renewed_admin_session() {
    let (harness, _service) = scripted_harness();
    harness.login_admin().await;
    let current = harness
        .admin_sessions
        .get()
        .expect("readable")
        .session()
        .cloned()
        .expect("admin session");
    let renewed = Session {
        token: format!("{}.renewed", current.token),
        ..current
    };
    *harness.gateway.login_during_refusal.lock().expect("lock") =
        Some((harness.admin_sessions.clone(), renewed.clone()));
    harness.gateway.forbid(ReviewSection::LawFirms);

    let mut queue = harness.queue();
    let report = queue.refresh().await.expect("refresh completes");

    assert!(report.failed.contains(&ReviewSection::LawFirms));
    assert!(!report.session_expired);
    assert_eq!(queue.redirect(), None);
    assert_eq!(
        harness.admin_sessions.token().expect("readable"),
        Some(renewed.token)
    );
}

#[tokio::test]
async fn rejected_call_clears_the_session_and_guards_the_dashboard() {
    let (harness, _service) = scripted_harness();
    harness.login_admin().await;
    harness.gateway.forbid(ReviewSection::Lawyers);

    let gateway = harness.gateway.clone();
    let result = harness
        .gate
        .call(Role::Admin, |token| async move {
            gateway
                .list(&token, ReviewSection::Lawyers, StatusFilter::All)
                .await
        })
        .await;

    assert!(matches!(
        result,
        Err(GateError::Gateway(GatewayError::Unauthorized { status: 403, .. }))
    ));
    assert_eq!(
        harness.admin_sessions.get().expect("readable"),
        SessionState::Empty
    );
    assert_eq!(
        harness.gate.authorize(Route::AdminDashboard).expect("readable"),
        Access::Redirect(Route::AdminLogin)
    );
    assert_eq!(harness.gate.phase().expect("readable"), AuthPhase::Anonymous);
}

#[tokio::test]
async fn cancelled_login_leaves_the_gate_anonymous() {
    let (harness, _service) = scripted_harness();
    harness.gateway.hang_logins.store(true, Ordering::SeqCst);

    let mut login = Box::pin(harness.gate.login(admin_login()));
    assert!(futures::poll!(&mut login).is_pending());
    assert_eq!(
        harness.gate.phase().expect("readable"),
        AuthPhase::Authenticating(Role::Admin)
    );

    drop(login);
    assert_eq!(harness.gate.phase().expect("readable"), AuthPhase::Anonymous);

    harness.gateway.hang_logins.store(false, Ordering::SeqCst);
    harness.login_admin().await;
    assert_eq!(
        harness.gate.phase().expect("readable"),
        AuthPhase::Authenticated(Role::Admin)
    );
}

#[tokio::test]
async fn admin_session_sends_user_routes_home() {
    let (harness, _service) = local_harness();
    assert_eq!(
        harness.gate.authorize(Route::UserDashboard).expect("readable"),
        Access::Redirect(Route::UserLogin)
    );

    harness.login_admin().await;
    assert_eq!(
        harness.gate.authorize(Route::UserDashboard).expect("readable"),
        Access::Redirect(Route::Home)
    );
    assert_eq!(
        harness.gate.authorize(Route::FirmLawyerDashboard).expect("readable"),
        Access::Redirect(Route::Home)
    );
    assert_eq!(
        harness.gate.authorize(Route::AdminDashboard).expect("readable"),
        Access::Granted
    );

    harness.gate.logout(Role::Admin).await.expect("logout");
    assert_eq!(
        harness.gate.authorize(Route::UserDashboard).expect("readable"),
        Access::Redirect(Route::UserLogin)
    );
}

#[tokio::test]
async fn rejection_reason_reaches_the_review_queue() {
    let (harness, _service) = local_harness();
    let receipt = harness
        .submissions()
        .submit(&lawyer_form("a@x.com", "secret1"))
        .await
        .expect("submission accepted");
    harness.login_admin().await;
    let mut queue = harness.queue();
    queue.refresh().await.expect("queue loads");

    harness
        .processor()
        .apply_with_reason(
            &mut queue,
            ReviewSection::Lawyers,
            &receipt.id,
            Decision::Reject,
            Some("enrolment certificate missing"),
        )
        .await
        .expect("rejection applies");

    queue.set_filter(StatusFilter::Rejected);
    let visible = queue.visible();
    assert_eq!(visible.len(), 1);
    assert_eq!(
        visible[0].rejection_reason.as_deref(),
        Some("enrolment certificate missing")
    );
}

#[tokio::test]
async fn unmounted_queue_discards_results() {
    let (harness, _service) = local_harness();
    harness
        .submissions()
        .submit(&lawyer_form("a@x.com", "secret1"))
        .await
        .expect("submission accepted");
    harness.login_admin().await;

    let mut queue = harness.queue();
    let lifetime = queue.lifetime();
    lifetime.unmount();

    let report = queue.refresh().await.expect("refresh completes");
    assert!(report.discarded);
    assert!(report.loaded.is_empty());
    assert_eq!(queue.counts(ReviewSection::Lawyers).total(), 0);
    assert!(!queue.state(ReviewSection::Lawyers).expect("section").loaded);
}

#[tokio::test]
async fn filter_and_search_never_change_counts() {
    let (harness, _service) = local_harness();
    let approved = harness
        .submissions()
        .submit(&lawyer_form("a@x.com", "secret1"))
        .await
        .expect("first accepted");
    harness
        .submissions()
        .submit(&lawyer_form("b@x.com", "secret2"))
        .await
        .expect("second accepted");
    harness.login_admin().await;

    let mut queue = harness.queue();
    queue.refresh().await.expect("queue loads");
    harness
        .processor()
        .apply(&mut queue, ReviewSection::Lawyers, &approved.id, Decision::Approve)
        .await
        .expect("approval applies");
    let counts = queue.counts(ReviewSection::Lawyers);

    for filter in [
        StatusFilter::Pending,
        StatusFilter::Approved,
        StatusFilter::Rejected,
        StatusFilter::All,
    ] {
        queue.set_filter(filter);
        assert_eq!(queue.counts(ReviewSection::Lawyers), counts);
    }

    queue.set_filter(StatusFilter::Approved);
    assert_eq!(queue.visible().len(), 1);
    queue.set_filter(StatusFilter::All);
    queue.set_query("B@X");
    assert_eq!(queue.visible().len(), 1);
    assert_eq!(queue.counts(ReviewSection::Lawyers), counts);
}

#[tokio::test]
async fn affiliated_form_without_a_firm_never_reaches_the_store() {
    let (harness, _service) = scripted_harness();

    let err = harness
        .submissions()
        .submit(&firm_lawyer_form("meera@example.com", None))
        .await
        .expect_err("firm is required");

    match err {
        SubmissionError::Invalid(errors) => assert!(errors.has("firm_id")),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(harness.gateway.calls(), 0);
}

#[tokio::test]
async fn invalid_form_is_refused_before_the_firm_directory_is_fetched() {
    let (harness, _service) = scripted_harness();
    let mut form = firm_client_form("karan@example.com", Some(FirmId("firm-1".to_string())));
    form.password = "abc".to_string();
    form.confirm_password = "abc".to_string();

    let err = harness
        .submissions()
        .submit(&form)
        .await
        .expect_err("password too short");

    assert!(err.field_errors().expect("field errors").has("password"));
    assert_eq!(harness.gateway.calls(), 0);
}

#[tokio::test]
async fn affiliated_form_with_an_unlisted_firm_is_refused() {
    let (harness, _service) = local_harness();
    harness.login_admin().await;
    let firm_id = approved_firm(&harness, "firm@example.com").await;
    let form = firm_client_form("karan@example.com", Some(FirmId("missing".to_string())));

    let err = harness
        .submissions()
        .submit(&form)
        .await
        .expect_err("unlisted firm");
    assert!(err.field_errors().expect("field errors").has("firm_id"));

    harness
        .submissions()
        .submit(&firm_client_form("karan@example.com", Some(firm_id)))
        .await
        .expect("listed firm accepted");
}

#[tokio::test]
async fn client_signup_session_is_adopted_by_the_gate() {
    let (harness, _service) = local_harness();
    let form = ClientSignupForm {
        full_name: "Ravi Kumar".to_string(),
        email: "ravi@example.com".to_string(),
        phone: None,
        password: "secret1".to_string(),
        confirm_password: "secret1".to_string(),
    };

    let grant = harness
        .submissions()
        .register(&form)
        .await
        .expect("signup succeeds");
    assert_eq!(grant.user.role, Role::Client);

    harness
        .gate
        .adopt(Session::from(grant))
        .await
        .expect("session stored");

    assert_eq!(
        harness.gate.authorize(Route::UserDashboard).expect("readable"),
        Access::Granted
    );
    assert_eq!(
        harness.gate.authorize(Route::LawyerDashboard).expect("readable"),
        Access::Redirect(Route::Home)
    );
    assert_eq!(
        harness.gate.authorize(Route::AdminDashboard).expect("readable"),
        Access::Redirect(Route::Home)
    );
}

#[tokio::test]
async fn review_roles_cannot_use_client_signup() {
    let (harness, _service) = local_harness();
    let err = harness
        .submissions()
        .submit(&ClientSignupForm {
            full_name: "Ravi Kumar".to_string(),
            email: "ravi@example.com".to_string(),
            phone: None,
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
        })
        .await
        .expect_err("clients sign up directly");
    assert!(err.field_errors().expect("field errors").has("user_type"));
}

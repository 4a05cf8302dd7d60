//! Session scenarios: the identity only changes through auth events.

#![allow(clippy::unwrap_used)]

use restodash_core::Email;
use restodash_dashboard::backend::{AuthEvent, AuthProvider};
use restodash_dashboard::models::UserMetadata;
use restodash_dashboard::{DashboardApp, DashboardError, ErrorKind, ValidationError};
use restodash_integration_tests::{OWNER_EMAIL, OWNER_PASSWORD, TestContext, secret};

// =============================================================================
// Initial resolution
// =============================================================================

#[tokio::test]
async fn test_resolves_to_signed_out() {
    let ctx = TestContext::new().await;
    let state = ctx.app.session().state();
    assert!(!state.is_loading);
    assert!(state.identity.is_none());
}

#[tokio::test]
async fn test_resolves_existing_sign_in() {
    let ctx = TestContext::new().await;
    ctx.sign_in().await;

    // A second app over the same provider picks the identity up on init
    let other = DashboardApp::in_memory(ctx.backend.clone(), ctx.auth.clone());
    assert!(other.session().is_loading());
    other.init();
    let state = other.session().wait_until_resolved().await.unwrap();
    assert_eq!(state.identity.unwrap().id, ctx.owner.id);
}

// =============================================================================
// Sign-in / sign-out
// =============================================================================

#[tokio::test]
async fn test_sign_in_then_out() {
    let ctx = TestContext::new().await;
    let state = ctx.sign_in().await;
    assert_eq!(state.identity.unwrap().email, OWNER_EMAIL);
    assert_eq!(ctx.app.session().user_id(), Some(ctx.owner.id));

    ctx.app.session().sign_out().await.unwrap();
    let state = ctx
        .app
        .session()
        .wait_for(|s| s.identity.is_none())
        .await
        .unwrap();
    assert!(!state.is_loading);
}

#[tokio::test]
async fn test_wrong_password_leaves_identity_unchanged() {
    let ctx = TestContext::new().await;
    let before = ctx.app.session().state();

    let err = ctx
        .app
        .session()
        .sign_in("user@example.com", &secret("wrongpass"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Auth);
    assert_eq!(ctx.app.session().state(), before);

    // Same once someone is signed in
    let signed_in = ctx.sign_in().await;
    assert!(
        ctx.app
            .session()
            .sign_in(OWNER_EMAIL, &secret("wrongpass"))
            .await
            .is_err()
    );
    assert_eq!(ctx.app.session().state(), signed_in);
}

#[tokio::test]
async fn test_malformed_email_never_reaches_provider() {
    let ctx = TestContext::new().await;
    ctx.auth.fail_next("should stay armed").await;

    let err = ctx
        .app
        .session()
        .sign_in("not-an-email", &secret("whatever"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DashboardError::Validation(ValidationError::Email(_))
    ));

    // The armed failure is still waiting for the first real call
    assert!(
        ctx.app
            .session()
            .sign_in(OWNER_EMAIL, &secret(OWNER_PASSWORD))
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_sign_out_failure_keeps_identity() {
    let ctx = TestContext::signed_in().await;
    ctx.auth.fail_next("network down").await;

    let err = ctx.app.session().sign_out().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
    assert!(ctx.app.session().current_identity().is_some());
}

// =============================================================================
// Sign-up and provider events
// =============================================================================

#[tokio::test]
async fn test_sign_up_signs_in() {
    let ctx = TestContext::new().await;
    let metadata = UserMetadata {
        name: Some("Ana".to_string()),
        restaurant_name: Some("Cantina da Ana".to_string()),
        ..UserMetadata::default()
    };
    let identity = ctx
        .app
        .session()
        .sign_up("ana@example.com", &secret("secret123"), metadata)
        .await
        .unwrap();

    let state = ctx
        .app
        .session()
        .wait_for(|s| s.identity.as_ref().is_some_and(|i| i.id == identity.id))
        .await
        .unwrap();
    let current = state.identity.unwrap();
    assert_eq!(current.email, "ana@example.com");
    assert_eq!(current.user_metadata.restaurant_name.as_deref(), Some("Cantina da Ana"));
}

#[tokio::test]
async fn test_external_sign_out_event() {
    let ctx = TestContext::signed_in().await;
    ctx.auth.emit(AuthEvent::SignedOut);
    ctx.app
        .session()
        .wait_for(|s| s.identity.is_none())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_disposed_session_ignores_events() {
    let ctx = TestContext::new().await;
    ctx.app.dispose();

    ctx.auth
        .sign_in(
            &Email::parse(OWNER_EMAIL).unwrap(),
            &secret(OWNER_PASSWORD),
        )
        .await
        .unwrap();
    tokio::task::yield_now().await;
    assert!(ctx.app.session().current_identity().is_none());
}

//! Route guard and onboarding wizard scenarios.

#![allow(clippy::unwrap_used)]

use restodash_dashboard::onboarding::OnboardingStep;
use restodash_dashboard::{
    DashboardApp, DashboardError, GuardDecision, Route, ValidationError,
};
use restodash_integration_tests::{OWNER_EMAIL, TestContext};

// =============================================================================
// Guard
// =============================================================================

#[tokio::test]
async fn test_loading_before_resolution() {
    let ctx = TestContext::new().await;
    let cold = DashboardApp::in_memory(ctx.backend.clone(), ctx.auth.clone());

    assert_eq!(cold.guard().check("/menus"), GuardDecision::Loading);
    assert_eq!(cold.guard().check("/login"), GuardDecision::Loading);

    cold.init();
    assert_eq!(
        cold.guard().settle("/menus").await.unwrap(),
        GuardDecision::Redirect(Route::Login)
    );
}

#[tokio::test]
async fn test_signed_out_sees_only_public_routes() {
    let ctx = TestContext::new().await;
    let guard = ctx.app.guard();

    for route in Route::ALL {
        let decision = guard.check(route.path());
        match route {
            Route::Login | Route::Register => assert_eq!(decision, GuardDecision::Render(route)),
            _ => assert_eq!(decision, GuardDecision::Redirect(Route::Login), "{route}"),
        }
    }
}

#[tokio::test]
async fn test_signed_in_sees_requested_view() {
    let ctx = TestContext::signed_in().await;
    let guard = ctx.app.guard();

    assert_eq!(guard.check("/campaigns"), GuardDecision::Render(Route::Campaigns));
    assert_eq!(guard.check("/billing?plan=pro"), GuardDecision::Render(Route::Billing));
    assert_eq!(guard.check("/onboarding"), GuardDecision::Render(Route::Onboarding));
    assert_eq!(guard.check("/login"), GuardDecision::Redirect(Route::Dashboard));
    assert_eq!(guard.check("/"), GuardDecision::Redirect(Route::Dashboard));
    assert_eq!(guard.check("/nowhere"), GuardDecision::Redirect(Route::Dashboard));
}

#[tokio::test]
async fn test_guard_follows_sign_out() {
    let ctx = TestContext::signed_in().await;
    let guard = ctx.app.guard();
    assert_eq!(guard.check("/settings"), GuardDecision::Render(Route::Settings));

    ctx.app.session().sign_out().await.unwrap();
    ctx.app
        .session()
        .wait_for(|s| s.identity.is_none())
        .await
        .unwrap();
    assert_eq!(guard.check("/settings"), GuardDecision::Redirect(Route::Login));
}

// =============================================================================
// Onboarding
// =============================================================================

#[tokio::test]
async fn test_empty_cuisine_blocks_first_step() {
    let ctx = TestContext::signed_in().await;
    let mut wizard = ctx.app.onboarding();
    wizard.form_mut().name = "Pizzaria X".to_string();

    assert!(!wizard.is_step_valid());
    assert_eq!(
        wizard.next().unwrap_err(),
        ValidationError::MissingField("cuisine_type")
    );
    assert_eq!(wizard.step(), OnboardingStep::BasicInfo);

    wizard.form_mut().cuisine_type = "pizza".to_string();
    assert_eq!(wizard.next().unwrap(), OnboardingStep::Location);
    assert_eq!(wizard.step().number(), 2);
}

#[tokio::test]
async fn test_full_wizard_creates_restaurant() {
    let ctx = TestContext::signed_in().await;
    let mut wizard = ctx.app.onboarding();
    assert_eq!(wizard.form().email, OWNER_EMAIL);

    let form = wizard.form_mut();
    form.name = "Pizzaria X".to_string();
    form.cuisine_type = "pizza".to_string();
    wizard.next().unwrap();

    // Submitting early is refused
    let restaurant = ctx.app.restaurant();
    assert!(matches!(
        wizard.submit(&restaurant).await,
        Err(DashboardError::Validation(ValidationError::InvalidField { field: "step", .. }))
    ));

    let form = wizard.form_mut();
    form.phone = "(11) 3333-4444".to_string();
    form.address = "Rua Augusta, 100".to_string();
    form.city = "São Paulo".to_string();
    wizard.next().unwrap();
    assert_eq!(wizard.next().unwrap(), OnboardingStep::Review);
    // Last step stays put
    assert_eq!(wizard.next().unwrap(), OnboardingStep::Review);

    let saved = wizard.submit(&restaurant).await.unwrap();
    assert_eq!(saved.id, ctx.owner.id.into());
    assert_eq!(saved.name, "Pizzaria X");
    assert_eq!(saved.city.as_deref(), Some("São Paulo"));
    assert_eq!(saved.email.as_deref(), Some(OWNER_EMAIL));
    assert_eq!(restaurant.data().unwrap(), saved);
}

#[tokio::test]
async fn test_resubmitting_updates_same_row() {
    let ctx = TestContext::with_restaurant().await;
    let mut wizard = ctx.app.onboarding();
    let form = wizard.form_mut();
    form.name = "Pizzaria Y".to_string();
    form.cuisine_type = "pizza".to_string();
    form.phone = "(11) 3333-4444".to_string();
    form.address = "Rua Augusta, 100".to_string();
    form.city = "São Paulo".to_string();
    for _ in 0..3 {
        wizard.next().unwrap();
    }

    let restaurant = ctx.app.restaurant();
    wizard.submit(&restaurant).await.unwrap();
    assert_eq!(
        ctx.backend
            .rows(restodash_dashboard::backend::Table::Restaurants)
            .await
            .len(),
        1
    );
    assert_eq!(restaurant.data().unwrap().name, "Pizzaria Y");
}

#[tokio::test]
async fn test_back_keeps_answers() {
    let ctx = TestContext::signed_in().await;
    let mut wizard = ctx.app.onboarding();
    wizard.form_mut().name = "Pizzaria X".to_string();
    wizard.form_mut().cuisine_type = "pizza".to_string();
    wizard.next().unwrap();

    assert_eq!(wizard.back(), OnboardingStep::BasicInfo);
    assert_eq!(wizard.back(), OnboardingStep::BasicInfo);
    assert_eq!(wizard.form().cuisine_type, "pizza");
}

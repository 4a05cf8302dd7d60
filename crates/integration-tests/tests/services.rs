//! Billing, ads, settings, landing page and overview scenarios.

#![allow(clippy::unwrap_used)]

use chrono::NaiveDate;
use restodash_core::{CampaignObjective, MenuCategory, PlanTier, SubscriptionStatus};
use restodash_dashboard::models::{
    LandingPageDraft, LandingPageTemplate, MenuDraft, NotificationPreferences, Profile,
    RestaurantPatch, SubscriptionDraft,
};
use restodash_dashboard::overview::{CampaignSummary, Overview, ResourceCount};
use restodash_dashboard::services::ads::{AdCampaignSpec, AdStatus, AdsProvider, DateRange};
use restodash_dashboard::services::settings::restaurant_form;
use restodash_dashboard::services::{BillingService, LandingPageList};
use restodash_dashboard::{DashboardError, ErrorKind, ValidationError};
use restodash_integration_tests::{OWNER_EMAIL, TestContext, secret};
use rust_decimal::Decimal;

// =============================================================================
// Billing
// =============================================================================

#[tokio::test]
async fn test_upgrade_from_basic() {
    let ctx = TestContext::with_restaurant().await;
    let subscription = ctx.app.subscription();
    subscription.load().await.unwrap();

    let current = subscription.current_plan();
    assert_eq!(current.id, PlanTier::Basic);
    assert!(matches!(
        ctx.app.billing().upgrade(&current, PlanTier::Basic, None).await,
        Err(DashboardError::Validation(ValidationError::InvalidField { field: "plan", .. }))
    ));

    let checkout = ctx
        .app
        .billing()
        .upgrade(&current, PlanTier::Pro, None)
        .await
        .unwrap();
    assert!(checkout.url.ends_with("/payments/mock-checkout"));
    assert!(checkout.payment_id.starts_with("pay_mock_pro_"));
}

#[tokio::test]
async fn test_summary_tracks_subscription() {
    let ctx = TestContext::with_restaurant().await;
    let subscription = ctx.app.subscription();
    subscription
        .create(&SubscriptionDraft {
            plan_id: PlanTier::Pro,
            status: SubscriptionStatus::Active,
            current_period_end: None,
            external_id: Some("sub_ext_1".to_string()),
        })
        .await
        .unwrap();

    let summary = BillingService::summary(subscription.data().as_ref(), 0);
    assert_eq!(summary.plan.id, PlanTier::Pro);
    assert!(summary.is_active);
    assert!(!summary.views.is_exceeded());

    let none = BillingService::summary(None, 0);
    assert_eq!(none.plan.id, PlanTier::Basic);
    assert!(!none.is_active);
    assert_eq!(BillingService::plans().len(), 3);
}

#[tokio::test]
async fn test_billing_history_and_portal() {
    let ctx = TestContext::new().await;
    let invoices = ctx.app.billing().history("cus_1").await.unwrap();
    assert_eq!(invoices.len(), 3);
    assert_eq!(invoices[0].id, "inv_001");

    let portal = ctx.app.billing().manage_billing("cus_1").await.unwrap();
    assert!(portal.url.ends_with("/customers/cus_1/portal"));
}

// =============================================================================
// Ads
// =============================================================================

#[tokio::test]
async fn test_ads_mock_flow() {
    let ctx = TestContext::new().await;
    let ads = ctx.app.ads();

    let created = ads
        .create_campaign(&AdCampaignSpec {
            name: "Weekend special".to_string(),
            objective: CampaignObjective::Traffic,
            budget: Decimal::new(30, 0),
        })
        .await
        .unwrap();
    assert_eq!(created.status, AdStatus::Paused);
    assert_eq!(created.objective, CampaignObjective::Traffic);

    let ack = ads
        .update_campaign_status(&created.id, AdStatus::Active)
        .await
        .unwrap();
    assert_eq!(ack.id, created.id);
    assert_eq!(ack.applied.status, Some(AdStatus::Active));

    let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
    let (start, stop) = DateRange::Last30Days.bounds(today);
    assert_eq!(stop, today);
    assert_eq!((stop - start).num_days(), 30);

    let insights = ads
        .get_campaign_insights(&created.id, DateRange::default())
        .await
        .unwrap();
    assert_eq!(insights[0].impressions, 15_420);
    assert_eq!(insights[0].spend, Decimal::new(12_750, 2));
}

// =============================================================================
// Settings
// =============================================================================

#[tokio::test]
async fn test_settings_tabs() {
    let ctx = TestContext::with_restaurant().await;
    let settings = ctx.app.settings();

    let form = settings.profile_form().unwrap();
    assert_eq!(form.email, OWNER_EMAIL);

    settings
        .update_profile(&Profile {
            name: "Ana".to_string(),
            ..Profile::default()
        })
        .await
        .unwrap();
    // Metadata writes start from the cached identity, so let the event land
    ctx.app
        .session()
        .wait_for(|s| s.identity.as_ref().is_some_and(|i| i.profile().name == "Ana"))
        .await
        .unwrap();
    settings
        .update_notifications(NotificationPreferences {
            push_orders: false,
            ..NotificationPreferences::default()
        })
        .await
        .unwrap();
    ctx.app
        .session()
        .wait_for(|s| {
            s.identity.as_ref().is_some_and(|i| {
                i.profile().name == "Ana" && !i.notification_preferences().push_orders
            })
        })
        .await
        .unwrap();

    let restaurant = ctx.app.restaurant();
    restaurant.load().await.unwrap();
    let mut form = restaurant_form(restaurant.data().as_ref());
    assert_eq!(form.name.as_deref(), Some("Pizzaria X"));
    form.delivery_fee = Some(Decimal::new(700, 2));
    let saved = settings.update_restaurant(&restaurant, &form).await.unwrap();
    assert_eq!(saved.delivery_fee, Decimal::new(700, 2));
    assert_eq!(saved.cuisine_type.as_deref(), Some("pizza"));
}

#[tokio::test]
async fn test_password_change_and_sign_out() {
    let ctx = TestContext::signed_in().await;
    let settings = ctx.app.settings();

    let err = settings
        .change_password(&secret("abc"), &secret("abc"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    settings
        .change_password(&secret("n3wsecret"), &secret("n3wsecret"))
        .await
        .unwrap();
    settings.sign_out().await.unwrap();
    ctx.app
        .session()
        .wait_for(|s| s.identity.is_none())
        .await
        .unwrap();

    ctx.app
        .session()
        .sign_in(OWNER_EMAIL, &secret("n3wsecret"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_restaurant_tab_requires_name() {
    let ctx = TestContext::signed_in().await;
    let err = ctx
        .app
        .settings()
        .update_restaurant(&ctx.app.restaurant(), &RestaurantPatch::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DashboardError::Validation(ValidationError::MissingField("name"))
    ));
}

// =============================================================================
// Landing pages
// =============================================================================

#[test]
fn test_landing_page_lifecycle() {
    let mut pages = LandingPageList::seeded();
    let id = pages
        .create(&LandingPageDraft::new(
            "Rodízio night",
            "Rodízio Night!",
            LandingPageTemplate::RestaurantPromo,
        ))
        .unwrap()
        .id;
    assert_eq!(pages.pages().len(), 3);

    let copy = pages.duplicate(id).unwrap().id;
    assert!(pages.get(copy).unwrap().name.ends_with(" (Copy)"));
    assert!(pages.delete(id));
    assert!(pages.get(copy).is_some());
    assert_eq!(pages.published_count(), 1);
}

// =============================================================================
// Overview
// =============================================================================

#[tokio::test]
async fn test_overview_counts() {
    let ctx = TestContext::with_restaurant().await;
    let menus = ctx.app.menus();
    menus
        .create(&MenuDraft::new("Pizzas", MenuCategory::MainCourse, Decimal::ZERO))
        .await
        .unwrap();

    let campaigns = ctx.app.campaigns();
    let overview = Overview::load(&menus, &campaigns, &ctx.app.subscription())
        .await
        .unwrap();
    assert_eq!(overview.menus, Some(ResourceCount { total: 1, active: 1 }));
    assert_eq!(overview.campaigns, Some(ResourceCount::default()));
    assert_eq!(overview.plan.id, PlanTier::Basic);

    let summary = CampaignSummary::collect(&campaigns);
    assert_eq!((summary.active, summary.total), (0, 0));
}

#[tokio::test]
async fn test_overview_signed_out_fails() {
    let ctx = TestContext::new().await;
    let result = Overview::load(&ctx.app.menus(), &ctx.app.campaigns(), &ctx.app.subscription()).await;
    assert!(matches!(result, Err(DashboardError::Unauthenticated)));
}

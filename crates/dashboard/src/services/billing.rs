//! Subscription billing.
//!
//! The payment provider sits behind [`BillingProvider`]. The only
//! implementation today is [`MockBilling`], which answers with URLs rooted
//! at the configured environment and canned subscription data; no request
//! leaves the process.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, instrument};

use restodash_core::{Money, PlanTier, SubscriptionStatus};

use crate::config::BillingConfig;
use crate::error::{Result, ValidationError};
use crate::models::{Plan, Subscription};

/// Length of one billing period.
const PERIOD_DAYS: i64 = 30;

/// Errors from the billing provider.
#[derive(Debug, Error)]
pub enum BillingError {
    /// Provider rejected the request.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Provider could not be reached.
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Unknown subscription reference.
    #[error("Subscription not found: {0}")]
    NotFound(String),
}

/// Hosted checkout page for a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub url: String,
    pub payment_id: String,
}

/// Hosted page where the customer manages payment details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalSession {
    pub url: String,
}

/// Subscription as the payment provider sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSubscription {
    pub id: String,
    pub status: SubscriptionStatus,
    pub plan_id: PlanTier,
    pub current_period_end: DateTime<Utc>,
}

/// Payment state of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Paid,
    Pending,
    Failed,
}

/// One past charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub status: InvoiceStatus,
    pub plan: PlanTier,
    /// Billed month, e.g. `Jan 2024`.
    pub period: String,
}

/// Payment provider operations.
#[async_trait]
pub trait BillingProvider: Send + Sync {
    /// Start a checkout for `plan`.
    async fn create_checkout_session(
        &self,
        plan: PlanTier,
        customer_id: Option<&str>,
    ) -> Result<CheckoutSession, BillingError>;

    /// Open the self-service portal for a customer.
    async fn create_customer_portal(&self, customer_id: &str)
    -> Result<PortalSession, BillingError>;

    /// Subscribe a customer to `plan`.
    async fn create_subscription(
        &self,
        customer_id: &str,
        plan: PlanTier,
    ) -> Result<ProviderSubscription, BillingError>;

    /// Look up a subscription by the provider's reference.
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<ProviderSubscription, BillingError>;

    /// Past invoices of a customer, newest first.
    async fn billing_history(&self, customer_id: &str) -> Result<Vec<Invoice>, BillingError>;
}

// =============================================================================
// MockBilling
// =============================================================================

/// Provider stand-in returning canned responses.
#[derive(Clone)]
pub struct MockBilling {
    inner: Arc<MockBillingInner>,
}

struct MockBillingInner {
    base_url: &'static str,
    fail_next: Mutex<Option<String>>,
}

impl MockBilling {
    #[must_use]
    pub fn new(config: &BillingConfig) -> Self {
        if config.api_key.is_none() {
            tracing::debug!("No billing API key; using canned responses");
        }
        Self {
            inner: Arc::new(MockBillingInner {
                base_url: config.base_url(),
                fail_next: Mutex::new(None),
            }),
        }
    }

    /// Make the next call fail with [`BillingError::Unavailable`].
    pub async fn fail_next(&self, message: impl Into<String>) {
        *self.inner.fail_next.lock().await = Some(message.into());
    }

    async fn take_failure(&self) -> Result<(), BillingError> {
        match self.inner.fail_next.lock().await.take() {
            Some(message) => Err(BillingError::Unavailable(message)),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for MockBilling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBilling")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl BillingProvider for MockBilling {
    #[instrument(skip(self))]
    async fn create_checkout_session(
        &self,
        plan: PlanTier,
        customer_id: Option<&str>,
    ) -> Result<CheckoutSession, BillingError> {
        self.take_failure().await?;
        let payment_id = format!("pay_mock_{plan}_{}", Utc::now().timestamp_millis());
        tracing::debug!(
            %payment_id,
            customer = customer_id.unwrap_or("new"),
            "Canned checkout session"
        );
        Ok(CheckoutSession {
            url: format!("{}/payments/mock-checkout", self.inner.base_url),
            payment_id,
        })
    }

    #[instrument(skip(self))]
    async fn create_customer_portal(
        &self,
        customer_id: &str,
    ) -> Result<PortalSession, BillingError> {
        self.take_failure().await?;
        Ok(PortalSession {
            url: format!("{}/customers/{customer_id}/portal", self.inner.base_url),
        })
    }

    #[instrument(skip(self))]
    async fn create_subscription(
        &self,
        customer_id: &str,
        plan: PlanTier,
    ) -> Result<ProviderSubscription, BillingError> {
        self.take_failure().await?;
        Ok(ProviderSubscription {
            id: format!("sub_mock_{}", Utc::now().timestamp_millis()),
            status: SubscriptionStatus::Active,
            plan_id: plan,
            current_period_end: Utc::now() + Duration::days(PERIOD_DAYS),
        })
    }

    #[instrument(skip(self))]
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<ProviderSubscription, BillingError> {
        self.take_failure().await?;
        if subscription_id.trim().is_empty() {
            return Err(BillingError::NotFound(subscription_id.to_string()));
        }
        Ok(ProviderSubscription {
            id: subscription_id.to_string(),
            status: SubscriptionStatus::Active,
            plan_id: PlanTier::Basic,
            current_period_end: Utc::now() + Duration::days(PERIOD_DAYS),
        })
    }

    #[instrument(skip(self))]
    async fn billing_history(&self, customer_id: &str) -> Result<Vec<Invoice>, BillingError> {
        self.take_failure().await?;
        let invoice = |id: &str, (y, m, d): (i32, u32, u32), plan: PlanTier, period: &str| Invoice {
            id: id.to_string(),
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default(),
            amount: Plan::catalog_entry(plan).price,
            status: InvoiceStatus::Paid,
            plan,
            period: period.to_string(),
        };
        Ok(vec![
            invoice("inv_001", (2024, 1, 15), PlanTier::Pro, "Jan 2024"),
            invoice("inv_002", (2023, 12, 15), PlanTier::Pro, "Dec 2023"),
            invoice("inv_003", (2023, 11, 15), PlanTier::Basic, "Nov 2023"),
        ])
    }
}

// =============================================================================
// BillingService
// =============================================================================

/// Landing-page view quota for the month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewsUsage {
    pub used: u64,
    /// `None` is unlimited.
    pub limit: Option<u32>,
}

impl ViewsUsage {
    #[must_use]
    pub fn is_exceeded(&self) -> bool {
        self.limit.is_some_and(|limit| self.used > u64::from(limit))
    }
}

/// What the billing screen shows about the current subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct BillingSummary {
    pub plan: Plan,
    pub is_active: bool,
    pub next_charge: Option<DateTime<Utc>>,
    pub monthly_price: Money,
    pub views: ViewsUsage,
}

/// Billing screen operations on top of a provider.
#[derive(Clone)]
pub struct BillingService {
    provider: Arc<dyn BillingProvider>,
}

impl BillingService {
    #[must_use]
    pub const fn new(provider: Arc<dyn BillingProvider>) -> Self {
        Self { provider }
    }

    /// Plans on offer, cheapest first.
    #[must_use]
    pub fn plans() -> Vec<Plan> {
        Plan::catalog()
    }

    /// The subscribed plan, or the basic plan when there is no active
    /// subscription.
    #[must_use]
    pub fn current_plan(subscription: Option<&Subscription>) -> Plan {
        subscription.map_or_else(
            || Plan::catalog_entry(PlanTier::Basic),
            Subscription::resolved_plan,
        )
    }

    /// Summary of the current subscription with `views_used` views so far.
    #[must_use]
    pub fn summary(subscription: Option<&Subscription>, views_used: u64) -> BillingSummary {
        let plan = Self::current_plan(subscription);
        BillingSummary {
            is_active: subscription.is_some_and(|s| s.status == SubscriptionStatus::Active),
            next_charge: subscription.and_then(|s| s.current_period_end),
            monthly_price: plan.monthly_price(),
            views: ViewsUsage {
                used: views_used,
                limit: plan.limits.monthly_views,
            },
            plan,
        }
    }

    /// Start a checkout for another plan.
    ///
    /// # Errors
    ///
    /// Returns a validation error when `target` is the current plan,
    /// otherwise the provider's error.
    #[instrument(skip(self, current), fields(current = %current.id))]
    pub async fn upgrade(
        &self,
        current: &Plan,
        target: PlanTier,
        customer_id: Option<&str>,
    ) -> Result<CheckoutSession> {
        if current.id == target {
            return Err(ValidationError::InvalidField {
                field: "plan",
                reason: format!("already on the {target} plan"),
            }
            .into());
        }
        let session = self
            .provider
            .create_checkout_session(target, customer_id)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Checkout failed"))?;
        info!(payment_id = %session.payment_id, "Checkout started");
        Ok(session)
    }

    /// Open the billing portal.
    ///
    /// # Errors
    ///
    /// Returns the provider's error.
    #[instrument(skip(self))]
    pub async fn manage_billing(&self, customer_id: &str) -> Result<PortalSession> {
        Ok(self.provider.create_customer_portal(customer_id).await?)
    }

    /// Past invoices.
    ///
    /// # Errors
    ///
    /// Returns the provider's error.
    pub async fn history(&self, customer_id: &str) -> Result<Vec<Invoice>> {
        Ok(self.provider.billing_history(customer_id).await?)
    }
}

impl std::fmt::Debug for BillingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BillingService").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::DashboardError;

    fn sandbox() -> MockBilling {
        MockBilling::new(&BillingConfig {
            api_key: None,
            sandbox: true,
        })
    }

    #[tokio::test]
    async fn test_checkout_uses_environment_url() {
        let session = sandbox()
            .create_checkout_session(PlanTier::Pro, None)
            .await
            .unwrap();
        assert_eq!(session.url, "https://sandbox.asaas.com/api/v3/payments/mock-checkout");
        assert!(session.payment_id.starts_with("pay_mock_pro_"));

        let enterprise = sandbox()
            .create_checkout_session(PlanTier::Enterprise, Some("cus_1"))
            .await
            .unwrap();
        assert!(enterprise.payment_id.starts_with("pay_mock_enterprise_"));

        let production = MockBilling::new(&BillingConfig::default());
        let portal = production.create_customer_portal("cus_1").await.unwrap();
        assert_eq!(portal.url, "https://api.asaas.com/v3/customers/cus_1/portal");
    }

    #[tokio::test]
    async fn test_subscription_period() {
        let billing = sandbox();
        let sub = billing.create_subscription("cus_1", PlanTier::Pro).await.unwrap();
        assert!(sub.id.starts_with("sub_mock_"));
        assert_eq!(sub.plan_id, PlanTier::Pro);
        assert!(sub.current_period_end > Utc::now() + Duration::days(29));

        let fetched = billing.get_subscription("sub_42").await.unwrap();
        assert_eq!(fetched.id, "sub_42");
        assert!(billing.get_subscription("").await.is_err());
    }

    #[tokio::test]
    async fn test_history() {
        let invoices = sandbox().billing_history("cus_1").await.unwrap();
        assert_eq!(invoices.len(), 3);
        assert_eq!(invoices[0].id, "inv_001");
        assert_eq!(invoices[0].amount, Decimal::new(197, 0));
        assert_eq!(invoices[2].amount, Decimal::new(97, 0));
        assert!(invoices.iter().all(|i| i.status == InvoiceStatus::Paid));
    }

    #[tokio::test]
    async fn test_upgrade_rejects_current_plan() {
        let billing = sandbox();
        let service = BillingService::new(Arc::new(billing.clone()));
        let basic = BillingService::current_plan(None);
        assert_eq!(basic.id, PlanTier::Basic);

        assert!(matches!(
            service.upgrade(&basic, PlanTier::Basic, None).await,
            Err(DashboardError::Validation(_))
        ));
        assert!(service.upgrade(&basic, PlanTier::Pro, None).await.is_ok());

        billing.fail_next("gateway timeout").await;
        assert!(matches!(
            service.upgrade(&basic, PlanTier::Pro, None).await,
            Err(DashboardError::Billing(BillingError::Unavailable(_)))
        ));
    }

    #[test]
    fn test_summary_without_subscription() {
        let summary = BillingService::summary(None, 1_247);
        assert_eq!(summary.plan.id, PlanTier::Basic);
        assert!(!summary.is_active);
        assert!(summary.next_charge.is_none());
        assert_eq!(summary.views.limit, Some(1_000));
        assert!(summary.views.is_exceeded());
    }
}

//! Linear onboarding wizard leading to the chat.
//!
//! `Splash → CountrySelection → ProfileSetup → Paywall → Categories → Chat`.
//! Each step persists its answer to the [`ProfileStore`] before advancing, so
//! the chat session later reads everything through
//! [`crate::store::load_context`]. Subscription billing stays behind
//! [`EntitlementGate`].

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::catalog;
use crate::profile::{SelectedCategory, SelectedCountry, UserProfile};
use crate::store::{
    self, ProfileStore, SELECTED_CATEGORY_KEY, SELECTED_COUNTRY_KEY, USER_PROFILE_KEY,
};

/// Entitlement that unlocks the chat.
pub const PRO_ENTITLEMENT: &str = "pro";

/// Wizard screens, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OnboardingStep {
    /// Launch screen.
    Splash,
    /// Destination picker.
    CountrySelection,
    /// Profile questionnaire.
    ProfileSetup,
    /// Subscription offer.
    Paywall,
    /// Topic picker.
    Categories,
    /// The assistant chat.
    Chat,
}

impl OnboardingStep {
    /// Screen that follows this one.
    pub fn next(self) -> Self {
        match self {
            Self::Splash => Self::CountrySelection,
            Self::CountrySelection => Self::ProfileSetup,
            Self::ProfileSetup => Self::Paywall,
            Self::Paywall => Self::Categories,
            Self::Categories | Self::Chat => Self::Chat,
        }
    }
}

/// Subscription packages offered on the paywall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Plan {
    /// Three free days, then weekly billing.
    WeeklyTrial,
    /// One-time purchase.
    Lifetime,
}

impl Plan {
    /// Store package identifier.
    pub fn package_id(self) -> &'static str {
        match self {
            Self::WeeklyTrial => "weekly_trial",
            Self::Lifetime => "lifetime",
        }
    }
}

/// Subscription backend.
#[async_trait]
pub trait EntitlementGate: Send + Sync {
    /// Buy `plan`. Returns the entitlements active afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error when the purchase fails or is cancelled.
    async fn purchase(&self, plan: Plan) -> anyhow::Result<Vec<String>>;

    /// Restore earlier purchases. Returns the active entitlements.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend cannot be reached.
    async fn restore(&self) -> anyhow::Result<Vec<String>>;
}

/// Gate that grants everything; used for demos and local runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct DemoGate;

#[async_trait]
impl EntitlementGate for DemoGate {
    async fn purchase(&self, _plan: Plan) -> anyhow::Result<Vec<String>> {
        Ok(vec![PRO_ENTITLEMENT.to_owned()])
    }

    async fn restore(&self) -> anyhow::Result<Vec<String>> {
        Ok(vec![PRO_ENTITLEMENT.to_owned()])
    }
}

/// Onboarding failures. The step never advances on error.
#[derive(Debug, thiserror::Error)]
pub enum OnboardingError {
    /// The operation belongs to a different step.
    #[error("operation expects step {expected:?}, wizard is at {actual:?}")]
    OutOfOrder {
        /// Step the operation requires.
        expected: OnboardingStep,
        /// Step the wizard is at.
        actual: OnboardingStep,
    },
    /// Country code not in the catalog.
    #[error("unknown country code '{0}'")]
    UnknownCountry(String),
    /// Category key not in the catalog.
    #[error("unknown category '{0}'")]
    UnknownCategory(String),
    /// Purchase or restore did not grant the entitlement.
    #[error("paywall not passed: {0}")]
    Paywall(String),
    /// Persisting an answer failed.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// The onboarding wizard.
pub struct Onboarding {
    step: OnboardingStep,
    store: Arc<dyn ProfileStore>,
    gate: Arc<dyn EntitlementGate>,
}

impl std::fmt::Debug for Onboarding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Onboarding")
            .field("step", &self.step)
            .finish_non_exhaustive()
    }
}

impl Onboarding {
    /// New wizard at the splash screen.
    pub fn new(store: Arc<dyn ProfileStore>, gate: Arc<dyn EntitlementGate>) -> Self {
        Self {
            step: OnboardingStep::Splash,
            store,
            gate,
        }
    }

    /// Current screen.
    pub fn step(&self) -> OnboardingStep {
        self.step
    }

    /// Leave the splash screen.
    ///
    /// # Errors
    ///
    /// [`OnboardingError::OutOfOrder`] unless at the splash.
    pub fn start(&mut self) -> Result<OnboardingStep, OnboardingError> {
        self.require_step(OnboardingStep::Splash)?;
        Ok(self.advance())
    }

    /// Pick the destination by catalog code.
    ///
    /// # Errors
    ///
    /// Out-of-order, unknown code, or storage failure.
    pub async fn select_country(&mut self, code: &str) -> Result<SelectedCountry, OnboardingError> {
        self.require_step(OnboardingStep::CountrySelection)?;
        let country = self.save_country(code).await?;
        self.advance();
        Ok(country)
    }

    /// Save questionnaire answers. Unanswered fields are allowed.
    ///
    /// # Errors
    ///
    /// Out-of-order or storage failure.
    pub async fn complete_profile(
        &mut self,
        profile: &UserProfile,
    ) -> Result<OnboardingStep, OnboardingError> {
        self.require_step(OnboardingStep::ProfileSetup)?;
        store::write_entry(self.store.as_ref(), USER_PROFILE_KEY, profile).await?;
        Ok(self.advance())
    }

    /// Buy `plan` and continue once the `pro` entitlement is active.
    ///
    /// # Errors
    ///
    /// Out-of-order, or [`OnboardingError::Paywall`] when the purchase fails;
    /// the wizard then stays on the paywall.
    pub async fn pass_paywall(&mut self, plan: Plan) -> Result<OnboardingStep, OnboardingError> {
        self.require_step(OnboardingStep::Paywall)?;
        let entitlements = self.gate.purchase(plan).await.map_err(|e| {
            warn!(plan = plan.package_id(), error = %e, "purchase failed");
            OnboardingError::Paywall(e.to_string())
        })?;
        self.unlock(&entitlements, "purchase")
    }

    /// Restore a previous purchase and continue if it carries `pro`.
    ///
    /// # Errors
    ///
    /// Out-of-order, or [`OnboardingError::Paywall`] when restore fails or
    /// finds no `pro` entitlement.
    pub async fn restore(&mut self) -> Result<OnboardingStep, OnboardingError> {
        self.require_step(OnboardingStep::Paywall)?;
        let entitlements = self.gate.restore().await.map_err(|e| {
            warn!(error = %e, "restore failed");
            OnboardingError::Paywall(e.to_string())
        })?;
        self.unlock(&entitlements, "restore")
    }

    /// Pick the chat topic by catalog key and enter the chat.
    ///
    /// # Errors
    ///
    /// Out-of-order, unknown key, or storage failure.
    pub async fn select_category(
        &mut self,
        key: &str,
    ) -> Result<SelectedCategory, OnboardingError> {
        self.require_step(OnboardingStep::Categories)?;
        let category = catalog::category_by_key(key)
            .ok_or_else(|| OnboardingError::UnknownCategory(key.to_owned()))?
            .to_selection();
        store::write_entry(self.store.as_ref(), SELECTED_CATEGORY_KEY, &category).await?;
        self.advance();
        Ok(category)
    }

    /// Switch destination from the topic picker or the chat without moving
    /// the wizard.
    ///
    /// # Errors
    ///
    /// Out-of-order before the topic picker, unknown code, or storage failure.
    pub async fn change_country(&mut self, code: &str) -> Result<SelectedCountry, OnboardingError> {
        if self.step < OnboardingStep::Categories {
            return Err(OnboardingError::OutOfOrder {
                expected: OnboardingStep::Categories,
                actual: self.step,
            });
        }
        self.save_country(code).await
    }

    async fn save_country(&self, code: &str) -> Result<SelectedCountry, OnboardingError> {
        let country = catalog::country_by_code(code)
            .ok_or_else(|| OnboardingError::UnknownCountry(code.to_owned()))?
            .to_selection();
        store::write_entry(self.store.as_ref(), SELECTED_COUNTRY_KEY, &country).await?;
        Ok(country)
    }

    fn unlock(
        &mut self,
        entitlements: &[String],
        via: &str,
    ) -> Result<OnboardingStep, OnboardingError> {
        if entitlements.iter().any(|e| e == PRO_ENTITLEMENT) {
            info!(via, "pro entitlement active");
            Ok(self.advance())
        } else {
            Err(OnboardingError::Paywall(format!(
                "{via} did not grant the '{PRO_ENTITLEMENT}' entitlement"
            )))
        }
    }

    fn require_step(&self, expected: OnboardingStep) -> Result<(), OnboardingError> {
        if self.step == expected {
            Ok(())
        } else {
            Err(OnboardingError::OutOfOrder {
                expected,
                actual: self.step,
            })
        }
    }

    fn advance(&mut self) -> OnboardingStep {
        let next = self.step.next();
        info!(from = ?self.step, to = ?next, "onboarding advanced");
        self.step = next;
        next
    }
}

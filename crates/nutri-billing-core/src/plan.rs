//! Plan catalog for nutri-billing.
//!
//! The catalog is the only place that knows how many credits a purchase is
//! worth. Gateway adapters carry a `plan_id` and nothing else; settlement
//! resolves it here.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::PlanId;

/// Credits in the one-off `basic` plan.
pub const BASIC_PLAN_CREDITS: i64 = 20;

/// Credits in the monthly `pro` plan.
pub const PRO_PLAN_CREDITS: i64 = 100;

/// Currency of the built-in plans.
pub const DEFAULT_CURRENCY: &str = "RUB";

/// Billing interval of a recurring plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingInterval {
    /// Renews every month.
    Month,
    /// Renews every year.
    Year,
}

/// A purchasable credit package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Plan identifier (e.g. `basic`).
    pub plan_id: PlanId,

    /// Human-readable title.
    pub title: String,

    /// Short description shown on the invoice.
    #[serde(default)]
    pub description: String,

    /// Credits granted per purchase or renewal.
    pub credit_count: i64,

    /// Price in minor currency units (kopecks, cents).
    pub price: i64,

    /// ISO 4217 currency code.
    pub currency: String,

    /// Whether the plan renews automatically.
    #[serde(default)]
    pub recurring: bool,

    /// Renewal interval. Present iff `recurring`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<BillingInterval>,
}

impl Plan {
    /// Check the plan's own invariants.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Invalid`] describing the first violated rule.
    pub fn validate(&self) -> Result<(), PlanError> {
        let invalid = |reason: &str| PlanError::Invalid {
            plan_id: self.plan_id.to_string(),
            reason: reason.to_string(),
        };

        if self.credit_count <= 0 {
            return Err(invalid("credit_count must be positive"));
        }
        if self.price <= 0 {
            return Err(invalid("price must be positive"));
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(invalid("currency must be a 3-letter uppercase ISO code"));
        }
        match (self.recurring, self.interval) {
            (true, None) => Err(invalid("recurring plan requires an interval")),
            (false, Some(_)) => Err(invalid("one-off plan must not have an interval")),
            _ => Ok(()),
        }
    }
}

/// Price table selected by deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceProfile {
    /// Live prices.
    Production,
    /// Same prices as production.
    Staging,
    /// Telegram minimum amounts.
    Development,
    /// Telegram minimum amounts.
    Test,
}

impl PriceProfile {
    /// Pick the profile for an `ENVIRONMENT` value.
    ///
    /// `test_mode` forces [`PriceProfile::Test`] regardless of environment.
    /// Unknown or missing environments fall back to development prices.
    #[must_use]
    pub fn detect(environment: Option<&str>, test_mode: bool) -> Self {
        if test_mode {
            return Self::Test;
        }
        environment
            .and_then(|env| env.parse().ok())
            .unwrap_or(Self::Development)
    }

    /// Price of `basic` and `pro` in kopecks.
    #[must_use]
    pub fn prices(self) -> (i64, i64) {
        match self {
            Self::Production | Self::Staging => (9900, 34900),
            Self::Development | Self::Test => (1000, 5000),
        }
    }

    /// Lowercase name of the profile.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Staging => "staging",
            Self::Development => "development",
            Self::Test => "test",
        }
    }
}

impl FromStr for PriceProfile {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            "development" | "dev" => Ok(Self::Development),
            "test" => Ok(Self::Test),
            other => Err(PlanError::Parse(format!("unknown environment: {other}"))),
        }
    }
}

impl fmt::Display for PriceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of plans known to this process.
#[derive(Debug, Clone)]
pub struct PlanCatalog {
    plans: BTreeMap<PlanId, Plan>,
}

impl PlanCatalog {
    /// Build a catalog from a list of plans, validating each one.
    ///
    /// # Errors
    ///
    /// Returns an error if the list is empty, a plan is invalid, or a plan id
    /// appears twice.
    pub fn new(plans: Vec<Plan>) -> Result<Self, PlanError> {
        if plans.is_empty() {
            return Err(PlanError::Empty);
        }
        let mut map = BTreeMap::new();
        for plan in plans {
            plan.validate()?;
            if map.contains_key(&plan.plan_id) {
                return Err(PlanError::Duplicate(plan.plan_id.to_string()));
            }
            map.insert(plan.plan_id.clone(), plan);
        }
        Ok(Self { plans: map })
    }

    /// The product's built-in catalog priced for `profile`.
    #[must_use]
    pub fn builtin(profile: PriceProfile) -> Self {
        let (basic_price, pro_price) = profile.prices();
        let plans = [
            Plan {
                plan_id: PlanId::from_static("basic"),
                title: "Basic Plan".to_string(),
                description: format!("{BASIC_PLAN_CREDITS} credits for food analysis"),
                credit_count: BASIC_PLAN_CREDITS,
                price: basic_price,
                currency: DEFAULT_CURRENCY.to_string(),
                recurring: false,
                interval: None,
            },
            Plan {
                plan_id: PlanId::from_static("pro"),
                title: "Pro Plan".to_string(),
                description: format!("{PRO_PLAN_CREDITS} credits for food analysis"),
                credit_count: PRO_PLAN_CREDITS,
                price: pro_price,
                currency: DEFAULT_CURRENCY.to_string(),
                recurring: true,
                interval: Some(BillingInterval::Month),
            },
        ];
        Self {
            plans: plans
                .into_iter()
                .map(|plan| (plan.plan_id.clone(), plan))
                .collect(),
        }
    }

    /// Parse a catalog from a JSON array of plans.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the plans are invalid.
    pub fn from_json(json: &str) -> Result<Self, PlanError> {
        let plans: Vec<Plan> =
            serde_json::from_str(json).map_err(|e| PlanError::Parse(e.to_string()))?;
        Self::new(plans)
    }

    /// Load a catalog from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or its contents are invalid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PlanError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| PlanError::Io(format!("{}: {e}", path.display())))?;
        Self::from_json(&contents)
    }

    /// Look up a plan by id.
    #[must_use]
    pub fn get_plan(&self, plan_id: &str) -> Option<&Plan> {
        self.plans.get(plan_id)
    }

    /// Iterate over all plans, ordered by id.
    pub fn plans(&self) -> impl Iterator<Item = &Plan> {
        self.plans.values()
    }

    /// Re-check every plan in the catalog.
    ///
    /// # Errors
    ///
    /// Returns the first invalid plan found.
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.plans.is_empty() {
            return Err(PlanError::Empty);
        }
        self.plans.values().try_for_each(Plan::validate)
    }

    /// Number of plans.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plans.len()
    }

    /// Whether the catalog has no plans.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}

/// Errors raised while building a plan catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    /// The catalog has no plans.
    #[error("plan catalog is empty")]
    Empty,

    /// Two plans share an id.
    #[error("duplicate plan id: {0}")]
    Duplicate(String),

    /// A plan violates an invariant.
    #[error("invalid plan {plan_id}: {reason}")]
    Invalid {
        /// Offending plan.
        plan_id: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The catalog file could not be read.
    #[error("failed to read plan catalog: {0}")]
    Io(String),

    /// The catalog could not be parsed.
    #[error("failed to parse plan catalog: {0}")]
    Parse(String),
}

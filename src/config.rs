//! Engine configuration
//!
//! Defaults reproduce the storefront's storage keys and tracking rules, so a
//! browser profile written by an earlier build is picked up unchanged.

use serde::{Deserialize, Serialize};

use crate::Result;

/// Default cap on the durable event log.
pub const DEFAULT_EVENT_LOG_CAPACITY: usize = 1000;

/// Variant reported for visitors outside an experiment's traffic allocation.
pub const DEFAULT_EXCLUDED_VARIANT: &str = "control";

/// Conversion category recorded for tracked button clicks.
pub const DEFAULT_CONVERSION_CATEGORY: &str = "button_click";

/// Id prefixes of elements whose clicks are tracked.
pub const DEFAULT_TRACKED_ID_PREFIXES: [&str; 5] = [
    "hero-cta-",
    "product-cta-",
    "product-add-cart-",
    "checkout-",
    "about-cta",
];

/// Durable storage keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StorageKeys {
    /// Visitor identifier
    pub visitor_id: String,
    /// Assignment map (array of `[experimentId, variantId]` pairs)
    pub assignments: String,
    /// Bounded event log
    pub event_log: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            visitor_id: "ab-testing-user-id".to_string(),
            assignments: "ab-testing-variants".to_string(),
            event_log: "ab-test-analytics".to_string(),
        }
    }
}

/// How a tracked click is mapped back to the experiments that own it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribution {
    /// Exact: read the experiment stamp written onto the element when its
    /// modifications were applied.
    #[default]
    Declared,
    /// Match the clicked id against ids and id prefixes named in modification
    /// selectors.
    Heuristic,
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Durable storage keys
    pub storage: StorageKeys,
    /// Maximum events kept in the durable log (oldest evicted first)
    pub event_log_capacity: usize,
    /// Clicks are tracked only on elements whose id starts with one of these
    pub tracked_id_prefixes: Vec<String>,
    /// Conversion category recorded for tracked clicks
    pub conversion_category: String,
    /// Variant reported for excluded visitors
    pub excluded_variant: String,
    /// Click attribution strategy
    pub attribution: Attribution,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            storage: StorageKeys::default(),
            event_log_capacity: DEFAULT_EVENT_LOG_CAPACITY,
            tracked_id_prefixes: DEFAULT_TRACKED_ID_PREFIXES
                .iter()
                .map(ToString::to_string)
                .collect(),
            conversion_category: DEFAULT_CONVERSION_CATEGORY.to_string(),
            excluded_variant: DEFAULT_EXCLUDED_VARIANT.to_string(),
            attribution: Attribution::default(),
        }
    }
}

impl EngineConfig {
    /// Create a builder starting from the defaults.
    #[must_use]
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Parse a (possibly partial) JSON configuration; missing fields take
    /// their defaults.
    ///
    /// # Errors
    /// Returns `Error::Serialization` for malformed JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Whether clicks on an element with this id are tracked.
    #[must_use]
    pub fn is_tracked_id(&self, element_id: &str) -> bool {
        !element_id.is_empty()
            && self
                .tracked_id_prefixes
                .iter()
                .any(|prefix| element_id.starts_with(prefix.as_str()))
    }
}

/// Builder for `EngineConfig`.
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Set the storage keys.
    #[must_use]
    pub fn storage(mut self, storage: StorageKeys) -> Self {
        self.config.storage = storage;
        self
    }

    /// Set the durable event-log cap.
    #[must_use]
    pub const fn event_log_capacity(mut self, capacity: usize) -> Self {
        self.config.event_log_capacity = capacity;
        self
    }

    /// Replace the tracked id prefixes.
    #[must_use]
    pub fn tracked_id_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.tracked_id_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Set the conversion category for tracked clicks.
    #[must_use]
    pub fn conversion_category(mut self, category: impl Into<String>) -> Self {
        self.config.conversion_category = category.into();
        self
    }

    /// Set the sentinel variant for excluded visitors.
    #[must_use]
    pub fn excluded_variant(mut self, variant_id: impl Into<String>) -> Self {
        self.config.excluded_variant = variant_id.into();
        self
    }

    /// Set the click attribution strategy.
    #[must_use]
    pub const fn attribution(mut self, attribution: Attribution) -> Self {
        self.config.attribution = attribution;
        self
    }

    /// Build the `EngineConfig`.
    #[must_use]
    pub fn build(self) -> EngineConfig {
        self.config
    }
}

//! Event record, page context and clocks

use std::cell::Cell;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// What an event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Visitor was assigned a variant.
    Assignment,
    /// Variant modifications were applied (exposure).
    VariantApplication,
    /// Tracked element was clicked.
    Click,
    /// Conversion attributed to a variant.
    Conversion,
}

impl EventKind {
    /// Wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Assignment => "assignment",
            Self::VariantApplication => "variant_application",
            Self::Click => "click",
            Self::Conversion => "conversion",
        }
    }
}

/// One recorded occurrence.
///
/// Field names on the wire (`testId`, `testName`, ...) match logs written by
/// earlier storefront builds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "type")]
    kind: EventKind,
    #[serde(rename = "testId")]
    experiment_id: String,
    variant_id: String,
    #[serde(rename = "testName", default, skip_serializing_if = "Option::is_none")]
    experiment_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    conversion_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    element_id: Option<String>,
    timestamp: i64,
    url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_agent: Option<String>,
}

impl Event {
    /// Create a builder with the required fields.
    #[must_use]
    pub fn builder(
        kind: EventKind,
        experiment_id: impl Into<String>,
        variant_id: impl Into<String>,
    ) -> EventBuilder {
        EventBuilder::new(kind, experiment_id, variant_id)
    }

    /// Event kind.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.kind
    }

    /// Experiment ID.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    /// Variant ID.
    #[must_use]
    pub fn variant_id(&self) -> &str {
        &self.variant_id
    }

    /// Experiment display name (assignment events).
    #[must_use]
    pub fn experiment_name(&self) -> Option<&str> {
        self.experiment_name.as_deref()
    }

    /// Conversion category (conversion events).
    #[must_use]
    pub fn conversion_type(&self) -> Option<&str> {
        self.conversion_type.as_deref()
    }

    /// Clicked element id (click events).
    #[must_use]
    pub fn element_id(&self) -> Option<&str> {
        self.element_id.as_deref()
    }

    /// Milliseconds since the Unix epoch.
    #[must_use]
    pub const fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Timestamp as a `DateTime`, if in range.
    #[must_use]
    pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp).single()
    }

    /// Page URL at recording time.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Client descriptor (user agent).
    #[must_use]
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }
}

/// Builder for `Event`.
#[derive(Debug)]
pub struct EventBuilder {
    event: Event,
}

impl EventBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(
        kind: EventKind,
        experiment_id: impl Into<String>,
        variant_id: impl Into<String>,
    ) -> Self {
        Self {
            event: Event {
                kind,
                experiment_id: experiment_id.into(),
                variant_id: variant_id.into(),
                experiment_name: None,
                conversion_type: None,
                element_id: None,
                timestamp: 0,
                url: String::new(),
                user_agent: None,
            },
        }
    }

    /// Set the experiment display name.
    #[must_use]
    pub fn experiment_name(mut self, name: impl Into<String>) -> Self {
        self.event.experiment_name = Some(name.into());
        self
    }

    /// Set the conversion category.
    #[must_use]
    pub fn conversion_type(mut self, category: impl Into<String>) -> Self {
        self.event.conversion_type = Some(category.into());
        self
    }

    /// Set the clicked element id.
    #[must_use]
    pub fn element_id(mut self, element_id: impl Into<String>) -> Self {
        self.event.element_id = Some(element_id.into());
        self
    }

    /// Set the timestamp (ms since epoch).
    #[must_use]
    pub const fn timestamp(mut self, timestamp: i64) -> Self {
        self.event.timestamp = timestamp;
        self
    }

    /// Set the page URL.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.event.url = url.into();
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.event.user_agent = Some(user_agent.into());
        self
    }

    /// Build the `Event`.
    #[must_use]
    pub fn build(self) -> Event {
        self.event
    }
}

/// Where events are being recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContext {
    /// Current page URL
    pub url: String,
    /// Client descriptor
    pub user_agent: Option<String>,
}

impl PageContext {
    /// Context for a URL with no user agent.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user_agent: None,
        }
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

/// Wall-clock source.
pub trait Clock {
    /// Current time.
    fn now(&self) -> DateTime<Utc>;

    /// Current time in ms since the Unix epoch.
    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// System clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests.
#[derive(Debug, Clone)]
pub struct FixedClock {
    millis: Cell<i64>,
}

impl FixedClock {
    /// Clock pinned at `millis` since the epoch.
    #[must_use]
    pub const fn new(millis: i64) -> Self {
        Self {
            millis: Cell::new(millis),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, millis: i64) {
        self.millis.set(self.millis.get() + millis);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.millis.get())
            .single()
            .unwrap_or_default()
    }

    fn now_millis(&self) -> i64 {
        self.millis.get()
    }
}

//! Analytics Recorder - in-memory event buffer mirrored to a bounded durable log

use serde_json::Value;
use tracing::{debug, warn};

use super::{Clock, Event, EventKind, PageContext, SystemClock};
use crate::config::DEFAULT_EVENT_LOG_CAPACITY;
use crate::kv::KvStore;
use crate::Result;

/// Records experiment events.
///
/// The in-memory buffer is authoritative for the page; every event is also
/// appended to the durable log, which keeps only the newest `capacity`
/// entries. Recording never fails outward: persistence problems are logged.
pub struct AnalyticsRecorder<S> {
    store: S,
    key: String,
    capacity: usize,
    events: Vec<Event>,
    context: PageContext,
    clock: Box<dyn Clock>,
}

impl<S: KvStore> AnalyticsRecorder<S> {
    /// Create a recorder mirroring into `store` under `key`.
    pub fn new(store: S, key: impl Into<String>, context: PageContext) -> Self {
        Self {
            store,
            key: key.into(),
            capacity: DEFAULT_EVENT_LOG_CAPACITY,
            events: Vec::new(),
            context,
            clock: Box::new(SystemClock),
        }
    }

    /// Set the durable log cap.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Append an event and mirror it to the durable log.
    pub fn record(&mut self, event: Event) {
        debug!(
            kind = event.kind().as_str(),
            experiment_id = event.experiment_id(),
            variant_id = event.variant_id(),
            "experiment event"
        );
        if let Err(e) = self.mirror(&event) {
            warn!(error = %e, key = %self.key, "Failed to store analytics event");
        }
        self.events.push(event);
    }

    fn mirror(&self, event: &Event) -> Result<()> {
        let mut log = match self.store.get(&self.key)? {
            Some(raw) => serde_json::from_str::<Vec<Value>>(&raw).unwrap_or_else(|e| {
                warn!(error = %e, key = %self.key, "Discarding corrupt event log");
                Vec::new()
            }),
            None => Vec::new(),
        };
        log.push(serde_json::to_value(event)?);
        if log.len() > self.capacity {
            let excess = log.len() - self.capacity;
            log.drain(..excess);
        }
        self.store.set(&self.key, serde_json::to_string(&log)?)
    }

    fn stamped(&self, kind: EventKind, experiment_id: &str, variant_id: &str) -> super::EventBuilder {
        Event::builder(kind, experiment_id, variant_id)
            .timestamp(self.clock.now_millis())
            .url(self.context.url.clone())
    }

    /// Record an `assignment` event.
    pub fn track_assignment(&mut self, experiment_id: &str, variant_id: &str, experiment_name: &str) {
        let mut builder = self
            .stamped(EventKind::Assignment, experiment_id, variant_id)
            .experiment_name(experiment_name);
        if let Some(ua) = &self.context.user_agent {
            builder = builder.user_agent(ua.clone());
        }
        self.record(builder.build());
    }

    /// Record a `variant_application` (exposure) event.
    pub fn track_variant_application(&mut self, experiment_id: &str, variant_id: &str) {
        let event = self
            .stamped(EventKind::VariantApplication, experiment_id, variant_id)
            .build();
        self.record(event);
    }

    /// Record a `conversion` event.
    pub fn track_conversion(&mut self, experiment_id: &str, variant_id: &str, conversion_type: &str) {
        let event = self
            .stamped(EventKind::Conversion, experiment_id, variant_id)
            .conversion_type(conversion_type)
            .build();
        self.record(event);
    }

    /// Record a `click` event.
    pub fn track_click(&mut self, experiment_id: &str, variant_id: &str, element_id: &str) {
        let event = self
            .stamped(EventKind::Click, experiment_id, variant_id)
            .element_id(element_id)
            .build();
        self.record(event);
    }

    /// Events recorded on this page, in insertion order.
    #[must_use]
    pub fn all_events(&self) -> &[Event] {
        &self.events
    }

    /// Events for one experiment, in insertion order.
    #[must_use]
    pub fn events_for_experiment(&self, experiment_id: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.experiment_id() == experiment_id)
            .collect()
    }

    /// Read the durable log (across page loads).
    ///
    /// Entries that do not parse as events are skipped.
    ///
    /// # Errors
    /// Returns error if storage cannot be read or the log is not a JSON array
    pub fn persisted_events(&self) -> Result<Vec<Event>> {
        read_log(&self.store, &self.key)
    }

    /// Page context used for new events.
    #[must_use]
    pub const fn context(&self) -> &PageContext {
        &self.context
    }

    /// Point subsequent events at a new URL (client-side navigation).
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.context.url = url.into();
    }

    /// Clock used for timestamps.
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Durable log cap.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Read a durable event log, skipping entries that are not events.
///
/// # Errors
/// Returns error if storage cannot be read or the log is not a JSON array
pub fn read_log<S: KvStore + ?Sized>(store: &S, key: &str) -> Result<Vec<Event>> {
    let Some(raw) = store.get(key)? else {
        return Ok(Vec::new());
    };
    let entries: Vec<Value> = serde_json::from_str(&raw)?;
    Ok(entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(event) => Some(event),
            Err(e) => {
                debug!(error = %e, "Skipping unreadable event log entry");
                None
            }
        })
        .collect())
}

impl<S> std::fmt::Debug for AnalyticsRecorder<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticsRecorder")
            .field("key", &self.key)
            .field("capacity", &self.capacity)
            .field("events", &self.events.len())
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::FixedClock;
    use crate::kv::MemoryKvStore;

    const KEY: &str = "ab-test-analytics";

    fn recorder(kv: &MemoryKvStore) -> AnalyticsRecorder<&MemoryKvStore> {
        AnalyticsRecorder::new(kv, KEY, PageContext::new("https://shop.test/").with_user_agent("ua"))
            .with_clock(Box::new(FixedClock::new(42)))
    }

    #[test]
    fn test_track_helpers_fill_context() {
        let kv = MemoryKvStore::new();
        let mut rec = recorder(&kv);

        rec.track_assignment("exp", "a", "Experiment");
        rec.track_variant_application("exp", "a");
        rec.track_conversion("exp", "a", "button_click");
        rec.track_click("exp", "a", "hero-cta-primary");

        let events = rec.all_events();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0].experiment_name(), Some("Experiment"));
        assert_eq!(events[0].user_agent(), Some("ua"));
        assert!(events[1].user_agent().is_none());
        assert_eq!(events[2].conversion_type(), Some("button_click"));
        assert_eq!(events[3].element_id(), Some("hero-cta-primary"));
        assert!(events.iter().all(|e| e.timestamp() == 42 && e.url() == "https://shop.test/"));
    }

    #[test]
    fn test_log_bound_evicts_oldest() {
        let kv = MemoryKvStore::new();
        let mut rec = recorder(&kv).with_capacity(3);

        for i in 0..5 {
            rec.track_click("exp", "a", &format!("btn-{i}"));
        }

        let persisted = rec.persisted_events().unwrap();
        let ids: Vec<_> = persisted.iter().filter_map(Event::element_id).collect();
        assert_eq!(ids, vec!["btn-2", "btn-3", "btn-4"]);
        assert_eq!(rec.all_events().len(), 5);
    }

    #[test]
    fn test_corrupt_log_is_replaced() {
        let kv = MemoryKvStore::new();
        kv.set(KEY, "not json".to_string()).unwrap();
        let mut rec = recorder(&kv);

        rec.track_variant_application("exp", "a");

        assert_eq!(rec.persisted_events().unwrap().len(), 1);
    }

    #[test]
    fn test_foreign_entries_preserved_but_skipped_on_read() {
        let kv = MemoryKvStore::new();
        kv.set(KEY, r#"[{"note":"manual"}]"#.to_string()).unwrap();
        let mut rec = recorder(&kv);

        rec.track_variant_application("exp", "a");

        let raw: Vec<Value> = serde_json::from_str(&kv.get(KEY).unwrap().unwrap()).unwrap();
        assert_eq!(raw.len(), 2);
        assert_eq!(rec.persisted_events().unwrap().len(), 1);
    }

    #[test]
    fn test_events_for_experiment_filters_in_order() {
        let kv = MemoryKvStore::new();
        let mut rec = recorder(&kv);
        rec.track_click("a", "x", "1");
        rec.track_click("b", "x", "2");
        rec.track_click("a", "y", "3");

        let filtered: Vec<_> = rec
            .events_for_experiment("a")
            .iter()
            .filter_map(|e| e.element_id())
            .collect();
        assert_eq!(filtered, vec!["1", "3"]);
    }
}

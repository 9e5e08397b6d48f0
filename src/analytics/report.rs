//! Reporting - per-variant click and conversion summaries

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::warn;

use super::recorder::read_log;
use super::{Event, EventKind, ExportDocument};
use crate::assignment::{AssignmentMap, AssignmentStore};
use crate::config::StorageKeys;
use crate::kv::KvStore;

/// Number of events shown in a report's recent-activity list by default.
pub const DEFAULT_RECENT_EVENTS: usize = 20;

/// Conversion rate as a percentage with two decimals (`"66.67"`).
///
/// Rounds half up; zero clicks gives `"0.00"`.
#[must_use]
pub fn conversion_rate(conversions: usize, clicks: usize) -> String {
    if clicks == 0 {
        return "0.00".to_string();
    }
    let conversions = conversions as u128;
    let clicks = clicks as u128;
    let hundredths = (conversions * 20_000 + clicks) / (2 * clicks);
    format!("{}.{:02}", hundredths / 100, hundredths % 100)
}

/// Aggregated counts for one variant of one experiment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantStats {
    /// Variant ID
    pub variant_id: String,
    /// Events of any kind
    pub total_events: usize,
    /// Click events
    pub clicks: usize,
    /// Conversion events
    pub conversions: usize,
    /// `conversions / clicks` as a percentage string
    pub conversion_rate: String,
    /// Whether this is the visitor's assigned variant
    pub is_current: bool,
}

/// Per-variant statistics for an experiment, in order of first appearance.
///
/// `is_current` is left `false`; [`AnalyticsReport::build`] fills it in.
#[must_use]
pub fn variant_stats(events: &[Event], experiment_id: &str) -> Vec<VariantStats> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: FxHashMap<&str, (usize, usize, usize)> = FxHashMap::default();

    for event in events.iter().filter(|e| e.experiment_id() == experiment_id) {
        let entry = counts.entry(event.variant_id()).or_insert_with(|| {
            order.push(event.variant_id());
            (0, 0, 0)
        });
        entry.0 += 1;
        match event.kind() {
            EventKind::Click => entry.1 += 1,
            EventKind::Conversion => entry.2 += 1,
            EventKind::Assignment | EventKind::VariantApplication => {}
        }
    }

    order
        .into_iter()
        .map(|variant_id| {
            let (total_events, clicks, conversions) = counts[variant_id];
            VariantStats {
                variant_id: variant_id.to_string(),
                total_events,
                clicks,
                conversions,
                conversion_rate: conversion_rate(conversions, clicks),
                is_current: false,
            }
        })
        .collect()
}

/// Report section for one assigned experiment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentReport {
    /// Experiment ID
    pub experiment_id: String,
    /// Visitor's assigned variant
    pub assigned_variant: String,
    /// Per-variant statistics
    pub variants: Vec<VariantStats>,
    /// Clicks across variants
    pub total_clicks: usize,
    /// Conversions across variants
    pub total_conversions: usize,
    /// Overall conversion rate
    pub conversion_rate: String,
}

/// Report over a visitor's assignments and an event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    experiments: Vec<ExperimentReport>,
    total_events: usize,
    #[serde(skip)]
    events: Vec<Event>,
}

impl AnalyticsReport {
    /// Build a report with one section per assigned experiment.
    #[must_use]
    pub fn build(assignments: &AssignmentMap, events: &[Event]) -> Self {
        let experiments = assignments
            .iter()
            .map(|(experiment_id, assigned)| {
                let mut variants = variant_stats(events, experiment_id);
                for stats in &mut variants {
                    stats.is_current = stats.variant_id == assigned;
                }
                let total_clicks = variants.iter().map(|v| v.clicks).sum();
                let total_conversions = variants.iter().map(|v| v.conversions).sum();
                ExperimentReport {
                    experiment_id: experiment_id.to_string(),
                    assigned_variant: assigned.to_string(),
                    variants,
                    total_clicks,
                    total_conversions,
                    conversion_rate: conversion_rate(total_conversions, total_clicks),
                }
            })
            .collect();

        Self {
            experiments,
            total_events: events.len(),
            events: events.to_vec(),
        }
    }

    /// All experiment sections, in assignment order.
    #[must_use]
    pub fn experiments(&self) -> &[ExperimentReport] {
        &self.experiments
    }

    /// Section for one experiment.
    #[must_use]
    pub fn experiment(&self, experiment_id: &str) -> Option<&ExperimentReport> {
        self.experiments
            .iter()
            .find(|e| e.experiment_id == experiment_id)
    }

    /// Number of events the report covers.
    #[must_use]
    pub const fn total_events(&self) -> usize {
        self.total_events
    }

    /// The newest `limit` events, newest first.
    #[must_use]
    pub fn recent_events(&self, limit: usize) -> Vec<&Event> {
        self.events.iter().rev().take(limit).collect()
    }

    /// Pretty JSON rendering.
    ///
    /// # Errors
    /// Returns `Error::Serialization` if encoding fails
    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Assignments and events as persisted, independent of any live engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalyticsSnapshot {
    /// Persisted assignments
    pub assignments: AssignmentMap,
    /// Persisted event log
    pub events: Vec<Event>,
}

impl AnalyticsSnapshot {
    /// Read both durable records. Unreadable records come back empty.
    pub fn load<S: KvStore>(store: &S, keys: &StorageKeys) -> Self {
        let assignments = AssignmentStore::read(store, &keys.assignments).unwrap_or_else(|e| {
            warn!(error = %e, key = %keys.assignments, "Failed to read assigned variants");
            AssignmentMap::new()
        });
        let events = read_log(store, &keys.event_log).unwrap_or_else(|e| {
            warn!(error = %e, key = %keys.event_log, "Failed to read event log");
            Vec::new()
        });
        Self {
            assignments,
            events,
        }
    }

    /// Build the report.
    #[must_use]
    pub fn report(&self) -> AnalyticsReport {
        AnalyticsReport::build(&self.assignments, &self.events)
    }

    /// Build the export document.
    #[must_use]
    pub fn export(&self, now: DateTime<Utc>, user_agent: Option<String>) -> ExportDocument {
        ExportDocument::new(self.events.clone(), &self.assignments, now, user_agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: EventKind, exp: &str, variant: &str, ts: i64) -> Event {
        Event::builder(kind, exp, variant).timestamp(ts).build()
    }

    #[test]
    fn test_conversion_rate_rounding() {
        assert_eq!(conversion_rate(2, 3), "66.67");
        assert_eq!(conversion_rate(1, 3), "33.33");
        assert_eq!(conversion_rate(1, 8), "12.50");
        assert_eq!(conversion_rate(3, 3), "100.00");
        assert_eq!(conversion_rate(0, 0), "0.00");
        assert_eq!(conversion_rate(5, 0), "0.00");
        // 1/16 = 6.25 exactly; 1/1600 = 0.0625 rounds to 0.06
        assert_eq!(conversion_rate(1, 16), "6.25");
        assert_eq!(conversion_rate(1, 1600), "0.06");
        // 0.005 rounds up
        assert_eq!(conversion_rate(1, 20_000), "0.01");
    }

    #[test]
    fn test_variant_stats_first_appearance_order() {
        let events = vec![
            event(EventKind::Assignment, "exp", "b", 1),
            event(EventKind::Click, "exp", "a", 2),
            event(EventKind::Conversion, "exp", "a", 3),
            event(EventKind::Click, "exp", "b", 4),
            event(EventKind::Click, "other", "a", 5),
        ];

        let stats = variant_stats(&events, "exp");
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].variant_id, "b");
        assert_eq!(stats[0].total_events, 2);
        assert_eq!(stats[0].clicks, 1);
        assert_eq!(stats[1].conversions, 1);
        assert_eq!(stats[1].conversion_rate, "100.00");
    }

    #[test]
    fn test_report_marks_current_and_totals() {
        let assignments: AssignmentMap = [("exp", "a"), ("idle", "control")].into_iter().collect();
        let events = vec![
            event(EventKind::Click, "exp", "a", 1),
            event(EventKind::Click, "exp", "a", 2),
            event(EventKind::Click, "exp", "a", 3),
            event(EventKind::Conversion, "exp", "a", 4),
            event(EventKind::Conversion, "exp", "a", 5),
            event(EventKind::Click, "exp", "b", 6),
        ];

        let report = AnalyticsReport::build(&assignments, &events);
        let exp = report.experiment("exp").unwrap();
        assert_eq!(exp.total_clicks, 4);
        assert_eq!(exp.total_conversions, 2);
        assert_eq!(exp.conversion_rate, "50.00");
        assert!(exp.variants[0].is_current);
        assert_eq!(exp.variants[0].conversion_rate, "66.67");
        assert!(!exp.variants[1].is_current);

        let idle = report.experiment("idle").unwrap();
        assert!(idle.variants.is_empty());
        assert_eq!(idle.conversion_rate, "0.00");
        assert_eq!(report.experiments().len(), 2);
    }

    #[test]
    fn test_recent_events_newest_first() {
        let events: Vec<_> = (0..30)
            .map(|i| event(EventKind::Click, "exp", "a", i))
            .collect();
        let report = AnalyticsReport::build(&AssignmentMap::new(), &events);

        let recent = report.recent_events(DEFAULT_RECENT_EVENTS);
        assert_eq!(recent.len(), 20);
        assert_eq!(recent[0].timestamp(), 29);
        assert_eq!(recent[19].timestamp(), 10);
        assert_eq!(report.total_events(), 30);
    }
}

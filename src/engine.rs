//! Assignment Engine
//!
//! Resolves a visitor's variant for each experiment, applies the variant's
//! modifications to a [`Document`], and records what happened.
//!
//! ## Resolution
//!
//! 1. A stored assignment is returned unchanged (no event).
//! 2. Visitors whose bucket value is not below the traffic allocation are
//!    excluded: they get the configured sentinel (`control`), nothing is
//!    persisted and no event is recorded.
//! 3. Otherwise a uniform draw picks a variant by cumulative weight, the
//!    pairing is persisted and an `assignment` event is recorded.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::analytics::{
    AnalyticsRecorder, AnalyticsReport, Clock, ExportDocument, PageContext, SystemClock,
};
use crate::applier;
use crate::assignment::{bucket, AssignmentMap, AssignmentStore};
use crate::catalog::{Experiment, ExperimentCatalog, Modification};
use crate::config::EngineConfig;
use crate::dom::{stamp_experiment, Document};
use crate::kv::KvStore;
use crate::random::{RandomSource, ThreadRandom};
use crate::visitor::VisitorId;
use crate::Result;

/// How a variant was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    /// Read from the assignment store
    Stored,
    /// Drawn now and persisted
    Assigned,
    /// Visitor outside the traffic allocation (not persisted)
    Excluded,
}

/// Result of [`ExperimentEngine::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    /// Resolved variant ID
    pub variant_id: String,
    /// How it was resolved
    pub source: ResolutionSource,
}

/// Outcome of one experiment during [`ExperimentEngine::run_all`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentOutcome {
    /// Experiment ID
    pub experiment_id: String,
    /// Resolved variant ID
    pub variant_id: String,
    /// How the variant was resolved
    pub source: ResolutionSource,
    /// Elements modified (counted per modification)
    pub elements: usize,
    /// Modifications that failed to apply
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Result of [`ExperimentEngine::apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliedVariant {
    /// Elements modified (counted per modification)
    pub elements: usize,
    /// One entry per modification that failed, in variant order
    pub errors: Vec<String>,
    /// Whether a `variant_application` event was recorded
    pub exposed: bool,
}

/// Per-experiment outcomes of a page run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    outcomes: Vec<ExperimentOutcome>,
}

impl RunSummary {
    /// Outcomes in catalog order.
    #[must_use]
    pub fn outcomes(&self) -> &[ExperimentOutcome] {
        &self.outcomes
    }

    /// Outcome for one experiment.
    #[must_use]
    pub fn outcome(&self, experiment_id: &str) -> Option<&ExperimentOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.experiment_id == experiment_id)
    }

    /// Outcomes with at least one failed modification.
    pub fn failures(&self) -> impl Iterator<Item = &ExperimentOutcome> {
        self.outcomes.iter().filter(|o| !o.errors.is_empty())
    }

    /// Number of experiments run.
    #[must_use]
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether no experiment ran.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// Experiment engine for one visitor on one page.
pub struct ExperimentEngine<S, R = ThreadRandom> {
    catalog: Arc<ExperimentCatalog>,
    config: EngineConfig,
    visitor: VisitorId,
    assignments: AssignmentStore<S>,
    recorder: AnalyticsRecorder<S>,
    random: R,
}

impl<S: KvStore + Clone> ExperimentEngine<S> {
    /// Start building an engine over `store` and `catalog`.
    #[must_use]
    pub fn builder(store: S, catalog: impl Into<Arc<ExperimentCatalog>>) -> EngineBuilder<S> {
        EngineBuilder::new(store, catalog)
    }
}

impl<S: KvStore + Clone, R: RandomSource> ExperimentEngine<S, R> {
    /// Resolve the visitor's variant for an experiment.
    ///
    /// Idempotent once assigned: later calls return the stored variant.
    pub fn resolve(&mut self, experiment: &Experiment) -> Resolution {
        if let Some(stored) = self.assignments.get(experiment.id()) {
            return Resolution {
                variant_id: stored.to_string(),
                source: ResolutionSource::Stored,
            };
        }

        if !bucket::is_included(
            self.visitor.as_str(),
            experiment.id(),
            experiment.traffic_allocation(),
        ) {
            debug!(
                experiment_id = experiment.id(),
                visitor = %self.visitor,
                "Visitor outside traffic allocation"
            );
            return self.excluded();
        }

        let draw = self.random.next_unit();
        let Some(variant) = bucket::select_variant(experiment.variants(), draw) else {
            warn!(experiment_id = experiment.id(), "Experiment has no variants");
            return self.excluded();
        };
        let variant_id = variant.id().to_string();

        self.assignments.set(experiment.id(), &variant_id);
        self.recorder
            .track_assignment(experiment.id(), &variant_id, experiment.name());

        Resolution {
            variant_id,
            source: ResolutionSource::Assigned,
        }
    }

    fn excluded(&self) -> Resolution {
        Resolution {
            variant_id: self.config.excluded_variant.clone(),
            source: ResolutionSource::Excluded,
        }
    }

    /// Apply a variant's modifications, in order, to every matched element.
    ///
    /// Matched elements are stamped with the experiment id. A modification
    /// that fails is logged and skipped; the rest still apply. A
    /// `variant_application` event is recorded unless every modification
    /// failed. An unknown variant is a no-op with no event.
    pub fn apply<D: Document + ?Sized>(
        &mut self,
        doc: &mut D,
        experiment: &Experiment,
        variant_id: &str,
    ) -> AppliedVariant {
        let Some(variant) = experiment.variant(variant_id) else {
            debug!(
                experiment_id = experiment.id(),
                variant_id, "Variant not in experiment, nothing applied"
            );
            return AppliedVariant::default();
        };

        let mut applied = AppliedVariant::default();
        for modification in variant.modifications() {
            match Self::apply_modification(doc, experiment.id(), modification) {
                Ok(elements) => applied.elements += elements,
                Err(e) => {
                    warn!(
                        error = %e,
                        experiment_id = experiment.id(),
                        variant_id,
                        selector = modification.selector(),
                        "Failed to apply modification"
                    );
                    applied.errors.push(e.to_string());
                }
            }
        }

        let modifications = variant.modifications().len();
        if modifications == 0 || applied.errors.len() < modifications {
            self.recorder
                .track_variant_application(experiment.id(), variant_id);
            applied.exposed = true;
        }
        applied
    }

    fn apply_modification<D: Document + ?Sized>(
        doc: &mut D,
        experiment_id: &str,
        modification: &Modification,
    ) -> Result<usize> {
        let elements = applier::apply(doc, modification)?;
        for element in &elements {
            stamp_experiment(doc, element, experiment_id)?;
        }
        Ok(elements.len())
    }

    /// Resolve and apply every active experiment.
    ///
    /// Experiments are independent: a failed modification is reported in the
    /// summary and does not stop the rest.
    pub fn run_all<D: Document + ?Sized>(&mut self, doc: &mut D) -> RunSummary {
        let catalog = Arc::clone(&self.catalog);
        let outcomes = catalog
            .list_active()
            .into_iter()
            .map(|experiment| {
                let resolution = self.resolve(experiment);
                let applied = self.apply(doc, experiment, &resolution.variant_id);
                ExperimentOutcome {
                    experiment_id: experiment.id().to_string(),
                    variant_id: resolution.variant_id,
                    source: resolution.source,
                    elements: applied.elements,
                    errors: applied.errors,
                }
            })
            .collect();
        RunSummary { outcomes }
    }

    /// Persisted variant for an experiment, if any.
    #[must_use]
    pub fn assigned_variant(&self, experiment_id: &str) -> Option<&str> {
        self.assignments.get(experiment_id)
    }

    /// Catalog in use.
    #[must_use]
    pub fn catalog(&self) -> &ExperimentCatalog {
        &self.catalog
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Visitor identifier.
    #[must_use]
    pub const fn visitor(&self) -> &VisitorId {
        &self.visitor
    }

    /// Current assignments.
    #[must_use]
    pub const fn assignments(&self) -> &AssignmentMap {
        self.assignments.assignments()
    }

    /// Event recorder.
    #[must_use]
    pub const fn recorder(&self) -> &AnalyticsRecorder<S> {
        &self.recorder
    }

    pub(crate) fn recorder_mut(&mut self) -> &mut AnalyticsRecorder<S> {
        &mut self.recorder
    }

    /// Export of this page's events and the current assignments.
    #[must_use]
    pub fn export(&self) -> ExportDocument {
        ExportDocument::new(
            self.recorder.all_events().to_vec(),
            self.assignments.assignments(),
            self.recorder.clock().now(),
            self.recorder.context().user_agent.clone(),
        )
    }

    /// Report over this page's events and the current assignments.
    #[must_use]
    pub fn report(&self) -> AnalyticsReport {
        AnalyticsReport::build(self.assignments.assignments(), self.recorder.all_events())
    }
}

impl<S, R> std::fmt::Debug for ExperimentEngine<S, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExperimentEngine")
            .field("visitor", &self.visitor)
            .field("experiments", &self.catalog.len())
            .field("recorder", &self.recorder)
            .finish_non_exhaustive()
    }
}

/// Builder for `ExperimentEngine`.
pub struct EngineBuilder<S, R = ThreadRandom> {
    store: S,
    catalog: Arc<ExperimentCatalog>,
    config: EngineConfig,
    context: PageContext,
    clock: Box<dyn Clock>,
    visitor: Option<VisitorId>,
    random: R,
}

impl<S: KvStore + Clone> EngineBuilder<S> {
    /// Create a builder with default configuration and thread randomness.
    #[must_use]
    pub fn new(store: S, catalog: impl Into<Arc<ExperimentCatalog>>) -> Self {
        Self {
            store,
            catalog: catalog.into(),
            config: EngineConfig::default(),
            context: PageContext::default(),
            clock: Box::new(SystemClock),
            visitor: None,
            random: ThreadRandom::new(),
        }
    }
}

impl<S: KvStore + Clone, R: RandomSource> EngineBuilder<S, R> {
    /// Set the configuration.
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the page context (URL, user agent).
    #[must_use]
    pub fn context(mut self, context: PageContext) -> Self {
        self.context = context;
        self
    }

    /// Set the clock used for event timestamps.
    #[must_use]
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Use a fixed visitor id instead of the persisted one.
    #[must_use]
    pub fn visitor(mut self, visitor: VisitorId) -> Self {
        self.visitor = Some(visitor);
        self
    }

    /// Replace the random source.
    #[must_use]
    pub fn random<R2: RandomSource>(self, random: R2) -> EngineBuilder<S, R2> {
        EngineBuilder {
            store: self.store,
            catalog: self.catalog,
            config: self.config,
            context: self.context,
            clock: self.clock,
            visitor: self.visitor,
            random,
        }
    }

    /// Build the engine, loading the visitor id and persisted assignments.
    #[must_use]
    pub fn build(self) -> ExperimentEngine<S, R> {
        let Self {
            store,
            catalog,
            config,
            context,
            clock,
            visitor,
            mut random,
        } = self;

        let keys = &config.storage;
        let visitor = visitor.unwrap_or_else(|| {
            VisitorId::load_or_create(&store, &keys.visitor_id, &mut random)
        });
        let assignments = AssignmentStore::open(store.clone(), keys.assignments.clone());
        let recorder = AnalyticsRecorder::new(store, keys.event_log.clone(), context)
            .with_capacity(config.event_log_capacity)
            .with_clock(clock);

        ExperimentEngine {
            catalog,
            config,
            visitor,
            assignments,
            recorder,
            random,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{EventKind, FixedClock};
    use crate::catalog::{Modification, Variant};
    use crate::dom::{stamped_experiments, ElementSpec, MemoryDocument};
    use crate::kv::MemoryKvStore;
    use crate::random::SequenceRandom;

    fn two_way(allocation: f64) -> ExperimentCatalog {
        let experiment = Experiment::builder("exp", "Experiment")
            .variant(
                Variant::builder("a", "A")
                    .weight(0.5)
                    .modification(Modification::text("h1", "A"))
                    .build(),
            )
            .variant(
                Variant::builder("b", "B")
                    .weight(0.5)
                    .modification(Modification::text("h1", "B"))
                    .build(),
            )
            .traffic_allocation(allocation)
            .build();
        ExperimentCatalog::new(vec![experiment]).unwrap()
    }

    fn engine(
        kv: &MemoryKvStore,
        catalog: ExperimentCatalog,
        draws: Vec<f64>,
    ) -> ExperimentEngine<&MemoryKvStore, SequenceRandom> {
        ExperimentEngine::builder(kv, catalog)
            .visitor(VisitorId::new("user_test00001"))
            .clock(FixedClock::new(1_000))
            .random(SequenceRandom::new(draws))
            .build()
    }

    #[test]
    fn test_resolve_assigns_then_returns_stored() {
        let kv = MemoryKvStore::new();
        let mut engine = engine(&kv, two_way(1.0), vec![0.7]);
        let catalog = Arc::clone(&engine.catalog);
        let exp = catalog.get("exp").unwrap();

        let first = engine.resolve(exp);
        assert_eq!(first.variant_id, "b");
        assert_eq!(first.source, ResolutionSource::Assigned);

        let second = engine.resolve(exp);
        assert_eq!(second.variant_id, "b");
        assert_eq!(second.source, ResolutionSource::Stored);

        let assignments: Vec<_> = engine
            .recorder()
            .all_events()
            .iter()
            .filter(|e| e.kind() == EventKind::Assignment)
            .collect();
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].experiment_name(), Some("Experiment"));
    }

    #[test]
    fn test_excluded_is_control_and_not_persisted() {
        let kv = MemoryKvStore::new();
        let mut engine = engine(&kv, two_way(0.0), vec![0.1]);
        let catalog = Arc::clone(&engine.catalog);

        let resolution = engine.resolve(catalog.get("exp").unwrap());

        assert_eq!(resolution.variant_id, "control");
        assert_eq!(resolution.source, ResolutionSource::Excluded);
        assert!(engine.assigned_variant("exp").is_none());
        assert!(engine.recorder().all_events().is_empty());
    }

    #[test]
    fn test_apply_stamps_and_records_exposure() {
        let kv = MemoryKvStore::new();
        let mut engine = engine(&kv, two_way(1.0), vec![0.2]);
        let mut doc = MemoryDocument::new().with(ElementSpec::new("h1").text("Welcome"));

        let summary = engine.run_all(&mut doc);

        let outcome = summary.outcome("exp").unwrap();
        assert_eq!(outcome.variant_id, "a");
        assert_eq!(outcome.elements, 1);
        let h1 = doc.query_selector_all("h1").unwrap()[0];
        assert_eq!(doc.text(h1), Some("A"));
        assert_eq!(stamped_experiments(&doc, &h1), vec!["exp"]);

        let kinds: Vec<_> = engine.recorder().all_events().iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec![EventKind::Assignment, EventKind::VariantApplication]);
    }

    #[test]
    fn test_unknown_variant_is_noop() {
        let kv = MemoryKvStore::new();
        let mut engine = engine(&kv, two_way(1.0), vec![0.2]);
        let catalog = Arc::clone(&engine.catalog);
        let mut doc = MemoryDocument::new().with(ElementSpec::new("h1").text("Welcome"));

        let applied = engine.apply(&mut doc, catalog.get("exp").unwrap(), "missing");

        assert_eq!(applied, AppliedVariant::default());
        assert!(engine.recorder().all_events().is_empty());
    }

    #[test]
    fn test_failure_does_not_block_other_experiments() {
        let broken = Experiment::builder("broken", "Broken")
            .variant(
                Variant::builder("a", "A")
                    .modification(Modification::text("main > h1", "x"))
                    .build(),
            )
            .build();
        let fine = Experiment::builder("fine", "Fine")
            .variant(
                Variant::builder("a", "A")
                    .modification(Modification::text("h1", "ok"))
                    .build(),
            )
            .build();
        let catalog = ExperimentCatalog::new(vec![broken, fine]).unwrap();
        let kv = MemoryKvStore::new();
        let mut engine = engine(&kv, catalog, vec![0.5]);
        let mut doc = MemoryDocument::new().with(ElementSpec::new("h1"));

        let summary = engine.run_all(&mut doc);

        assert_eq!(summary.len(), 2);
        assert_eq!(summary.failures().count(), 1);
        assert_eq!(summary.outcome("broken").unwrap().errors.len(), 1);
        assert_eq!(summary.outcome("fine").unwrap().elements, 1);
        assert_eq!(doc.text(doc.query_selector_all("h1").unwrap()[0]), Some("ok"));
    }

    #[test]
    fn test_failed_modification_does_not_skip_the_rest() {
        let partial = Experiment::builder("partial", "Partial")
            .variant(
                Variant::builder("a", "A")
                    .modification(Modification::text("h1", "changed"))
                    .modification(Modification::text("main > p", "unreachable"))
                    .modification(Modification::attribute("h1", "data-x", "1"))
                    .build(),
            )
            .build();
        let kv = MemoryKvStore::new();
        let mut engine = engine(&kv, ExperimentCatalog::new(vec![partial]).unwrap(), vec![0.5]);
        let mut doc = MemoryDocument::new().with(ElementSpec::new("h1").text("Welcome"));

        let summary = engine.run_all(&mut doc);

        let h1 = doc.query_selector_all("h1").unwrap()[0];
        assert_eq!(doc.text(h1), Some("changed"));
        assert_eq!(doc.attribute(&h1, "data-x").as_deref(), Some("1"));

        let outcome = summary.outcome("partial").unwrap();
        assert_eq!(outcome.elements, 2);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].contains("Unsupported selector"));

        let kinds: Vec<_> = engine.recorder().all_events().iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec![EventKind::Assignment, EventKind::VariantApplication]);
    }

    #[test]
    fn test_variant_with_every_modification_failing_is_not_exposed() {
        let broken = Experiment::builder("broken", "Broken")
            .variant(
                Variant::builder("a", "A")
                    .modification(Modification::text("main > h1", "x"))
                    .build(),
            )
            .build();
        let kv = MemoryKvStore::new();
        let mut engine = engine(&kv, ExperimentCatalog::new(vec![broken]).unwrap(), vec![0.5]);
        let catalog = Arc::clone(&engine.catalog);

        let applied = engine.apply(&mut MemoryDocument::new(), catalog.get("broken").unwrap(), "a");

        assert!(!applied.exposed);
        assert_eq!(applied.errors.len(), 1);
        assert!(engine.recorder().all_events().is_empty());
    }

    #[test]
    fn test_inactive_experiments_skipped() {
        let inactive = Experiment::builder("off", "Off")
            .variant(Variant::new("a", "A", 1.0))
            .active(false)
            .build();
        let kv = MemoryKvStore::new();
        let mut engine = engine(&kv, ExperimentCatalog::new(vec![inactive]).unwrap(), vec![0.5]);

        let summary = engine.run_all(&mut MemoryDocument::new());

        assert!(summary.is_empty());
        assert!(engine.assignments().is_empty());
    }
}

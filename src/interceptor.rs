//! Click Interceptor - attributes tracked clicks to running experiments

use serde::Serialize;
use tracing::{debug, warn};

use crate::catalog::ExperimentCatalog;
use crate::config::{Attribution, EngineConfig};
use crate::dom::{stamped_experiments, Document, SelectorList};
use crate::engine::ExperimentEngine;
use crate::kv::KvStore;
use crate::random::RandomSource;

/// A click credited to one experiment's variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickAttribution {
    /// Experiment ID
    pub experiment_id: String,
    /// Visitor's variant
    pub variant_id: String,
    /// Clicked element id
    pub element_id: String,
}

/// Turns clicks on tracked elements into `conversion` and `click` events.
///
/// Inert until [`attach`](Self::attach) is called once the page has mounted;
/// earlier clicks are not tracked.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClickInterceptor {
    attached: bool,
}

impl ClickInterceptor {
    /// Detached interceptor.
    #[must_use]
    pub const fn new() -> Self {
        Self { attached: false }
    }

    /// Start tracking clicks.
    pub fn attach(&mut self) {
        if !self.attached {
            debug!("Click tracking attached");
        }
        self.attached = true;
    }

    /// Whether clicks are tracked.
    #[must_use]
    pub const fn is_attached(&self) -> bool {
        self.attached
    }

    /// Handle a click on `element`.
    ///
    /// For a tracked element, every owning experiment with a persisted
    /// assignment gets a `conversion` event followed by a `click` event.
    /// Returns the attributions made (possibly none).
    pub fn handle_click<S, R, D>(
        &self,
        engine: &mut ExperimentEngine<S, R>,
        doc: &D,
        element: &D::Element,
    ) -> Vec<ClickAttribution>
    where
        S: KvStore + Clone,
        R: RandomSource,
        D: Document + ?Sized,
    {
        if !self.attached {
            return Vec::new();
        }
        let Some(element_id) = doc.element_id(element) else {
            return Vec::new();
        };
        if !engine.config().is_tracked_id(&element_id) {
            return Vec::new();
        }

        let owners = match engine.config().attribution {
            Attribution::Declared => stamped_experiments(doc, element),
            Attribution::Heuristic => heuristic_owners(engine.catalog(), &element_id),
        };

        let category = engine.config().conversion_category.clone();
        let mut attributions = Vec::new();
        for experiment_id in owners {
            let Some(variant_id) = engine.assigned_variant(&experiment_id).map(str::to_string)
            else {
                debug!(%experiment_id, %element_id, "Click on experiment without assignment");
                continue;
            };
            let recorder = engine.recorder_mut();
            recorder.track_conversion(&experiment_id, &variant_id, &category);
            recorder.track_click(&experiment_id, &variant_id, &element_id);
            attributions.push(ClickAttribution {
                experiment_id,
                variant_id,
                element_id: element_id.clone(),
            });
        }
        attributions
    }
}

/// Experiments whose modification selectors name `element_id`, exactly
/// (`#id`, `[id="id"]`) or by prefix (`[id^="prefix"]`).
///
/// Covers every catalog experiment, active or not, in catalog order.
#[must_use]
pub fn heuristic_owners(catalog: &ExperimentCatalog, element_id: &str) -> Vec<String> {
    catalog
        .experiments()
        .iter()
        .filter(|experiment| {
            experiment
                .variants()
                .iter()
                .flat_map(|variant| variant.modifications())
                .any(|modification| match SelectorList::parse(modification.selector()) {
                    Ok(list) => list.id_hints().iter().any(|hint| hint.matches(element_id)),
                    Err(e) => {
                        warn!(error = %e, experiment_id = experiment.id(), "Skipping selector");
                        false
                    }
                })
        })
        .map(|experiment| experiment.id().to_string())
        .collect()
}

/// Selector matching tracked elements, for a delegated listener's `closest()`.
///
/// `hero-cta-` becomes `[id^="hero-cta-"]`; the list is comma-joined.
#[must_use]
pub fn tracked_selector(config: &EngineConfig) -> String {
    config
        .tracked_id_prefixes
        .iter()
        .map(|prefix| format!("[id^=\"{prefix}\"]"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracked_selector() {
        let config = EngineConfig::builder()
            .tracked_id_prefixes(["hero-cta-", "about-cta"])
            .build();
        assert_eq!(
            tracked_selector(&config),
            r#"[id^="hero-cta-"], [id^="about-cta"]"#
        );
    }

    #[test]
    fn test_heuristic_owners_on_storefront() {
        let catalog = ExperimentCatalog::storefront();
        assert_eq!(
            heuristic_owners(&catalog, "hero-cta-primary"),
            vec!["hero-cta-colors"]
        );
        assert_eq!(
            heuristic_owners(&catalog, "product-add-cart-3"),
            vec!["product-cta-colors"]
        );
        assert_eq!(
            heuristic_owners(&catalog, "checkout-complete-btn"),
            vec!["checkout-button-text"]
        );
        assert!(heuristic_owners(&catalog, "about-cta").is_empty());
    }

    #[test]
    fn test_detached_by_default() {
        let mut interceptor = ClickInterceptor::new();
        assert!(!interceptor.is_attached());
        interceptor.attach();
        interceptor.attach();
        assert!(interceptor.is_attached());
    }
}

//! Experiment Catalog
//!
//! Static configuration of experiments, loaded once and never mutated.
//!
//! ## Schema Overview
//!
//! ```text
//! Experiment (1) ──< Variant (N) ──< Modification (N)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use storefront_experiments::catalog::{Experiment, ExperimentCatalog, Modification, Variant};
//!
//! let experiment = Experiment::builder("cta-color", "CTA Color")
//!     .variant(Variant::new("control", "Control", 0.5))
//!     .variant(
//!         Variant::builder("green", "Green")
//!             .weight(0.5)
//!             .modification(Modification::style("#cta", "backgroundColor", "#059669"))
//!             .build(),
//!     )
//!     .build();
//!
//! let catalog = ExperimentCatalog::new(vec![experiment])?;
//! assert_eq!(catalog.list_active().len(), 1);
//! assert!(catalog.get("missing").is_none());
//! # Ok::<(), storefront_experiments::Error>(())
//! ```

mod experiment;
mod modification;
mod storefront;
mod variant;

pub use experiment::{Experiment, ExperimentBuilder};
pub use modification::{ClassAction, Modification, ModificationKind};
pub use variant::{Variant, VariantBuilder};

use rustc_hash::FxHashMap;
use tracing::warn;

use crate::{Error, Result};

/// Read-only set of experiments, indexed by ID.
#[derive(Debug, Clone, Default)]
pub struct ExperimentCatalog {
    experiments: Vec<Experiment>,
    index: FxHashMap<String, usize>,
}

impl ExperimentCatalog {
    /// Build a catalog, rejecting it whole if any experiment is invalid.
    ///
    /// # Errors
    /// Returns `Error::InvalidExperiment` for a duplicate experiment ID or any
    /// experiment failing [`Experiment::validate`].
    pub fn new(experiments: Vec<Experiment>) -> Result<Self> {
        for (i, experiment) in experiments.iter().enumerate() {
            experiment.validate()?;
            if experiments[..i].iter().any(|e| e.id() == experiment.id()) {
                return Err(Error::invalid_experiment(
                    experiment.id(),
                    "duplicate experiment id",
                ));
            }
        }
        Ok(Self::indexed(experiments))
    }

    /// Load a catalog from a JSON array of experiments.
    ///
    /// Each entry is checked on its own: one that fails to deserialize,
    /// fails [`Experiment::validate`], or repeats an earlier ID is logged and
    /// skipped, and the rest still load.
    ///
    /// # Errors
    /// Returns `Error::Serialization` only if the input is not a JSON array
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<serde_json::Value> = serde_json::from_str(json)?;
        let mut experiments: Vec<Experiment> = Vec::with_capacity(entries.len());
        for (position, entry) in entries.into_iter().enumerate() {
            match Self::admit(entry, &experiments) {
                Ok(experiment) => experiments.push(experiment),
                Err(e) => warn!(error = %e, position, "Skipping experiment definition"),
            }
        }
        Ok(Self::indexed(experiments))
    }

    /// Load a catalog from JSON, rejecting it whole if any entry is invalid.
    ///
    /// # Errors
    /// Returns `Error::Serialization` for malformed JSON and
    /// `Error::InvalidExperiment` for invalid definitions.
    pub fn from_json_strict(json: &str) -> Result<Self> {
        let experiments: Vec<Experiment> = serde_json::from_str(json)?;
        Self::new(experiments)
    }

    fn admit(entry: serde_json::Value, admitted: &[Experiment]) -> Result<Experiment> {
        let experiment: Experiment = serde_json::from_value(entry)?;
        experiment.validate()?;
        if admitted.iter().any(|e| e.id() == experiment.id()) {
            return Err(Error::invalid_experiment(
                experiment.id(),
                "duplicate experiment id",
            ));
        }
        Ok(experiment)
    }

    /// The demo storefront's experiments.
    #[must_use]
    pub fn storefront() -> Self {
        Self::indexed(storefront::experiments())
    }

    fn indexed(experiments: Vec<Experiment>) -> Self {
        let index = experiments
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id().to_string(), i))
            .collect();
        Self { experiments, index }
    }

    /// Active experiments, in declaration order.
    #[must_use]
    pub fn list_active(&self) -> Vec<&Experiment> {
        self.experiments.iter().filter(|e| e.is_active()).collect()
    }

    /// All experiments (active or not), in declaration order.
    #[must_use]
    pub fn experiments(&self) -> &[Experiment] {
        &self.experiments
    }

    /// Look up an experiment by ID.
    #[must_use]
    pub fn get(&self, experiment_id: &str) -> Option<&Experiment> {
        self.index
            .get(experiment_id)
            .and_then(|&i| self.experiments.get(i))
    }

    /// Number of experiments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.experiments.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }

    /// Serialize the catalog in its JSON load format.
    ///
    /// # Errors
    /// Returns `Error::Serialization` if serialization fails
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.experiments)?)
    }
}

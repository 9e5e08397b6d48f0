//! Experiment - root entity of the catalog

use serde::{Deserialize, Serialize};

use super::Variant;
use crate::{Error, Result};

/// An A/B experiment.
///
/// `traffic_allocation` is the share of visitors eligible at all; eligible
/// visitors are then split across `variants` by weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experiment {
    id: String,
    name: String,
    variants: Vec<Variant>,
    traffic_allocation: f64,
    is_active: bool,
}

impl Experiment {
    /// Create a builder. Defaults: full traffic, active, no variants.
    #[must_use]
    pub fn builder(id: impl Into<String>, name: impl Into<String>) -> ExperimentBuilder {
        ExperimentBuilder::new(id, name)
    }

    /// Experiment ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Variants in declaration order.
    #[must_use]
    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    /// Share of visitors included, in [0, 1].
    #[must_use]
    pub const fn traffic_allocation(&self) -> f64 {
        self.traffic_allocation
    }

    /// Whether the experiment runs at all.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.is_active
    }

    /// Look up a variant by ID.
    #[must_use]
    pub fn variant(&self, variant_id: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id() == variant_id)
    }

    /// Check structural invariants.
    ///
    /// # Errors
    /// Returns `Error::InvalidExperiment` when the experiment has no variants,
    /// duplicate variant IDs, a negative or non-finite weight, or a traffic
    /// allocation outside [0, 1].
    pub fn validate(&self) -> Result<()> {
        if self.variants.is_empty() {
            return Err(Error::invalid_experiment(&self.id, "no variants"));
        }
        if !(0.0..=1.0).contains(&self.traffic_allocation) {
            return Err(Error::invalid_experiment(
                &self.id,
                format!(
                    "traffic allocation {} outside [0, 1]",
                    self.traffic_allocation
                ),
            ));
        }
        for (i, variant) in self.variants.iter().enumerate() {
            if !variant.weight().is_finite() || variant.weight() < 0.0 {
                return Err(Error::invalid_experiment(
                    &self.id,
                    format!("variant '{}' has weight {}", variant.id(), variant.weight()),
                ));
            }
            if self.variants[..i].iter().any(|v| v.id() == variant.id()) {
                return Err(Error::invalid_experiment(
                    &self.id,
                    format!("duplicate variant id '{}'", variant.id()),
                ));
            }
        }
        Ok(())
    }
}

/// Builder for `Experiment`.
#[derive(Debug)]
pub struct ExperimentBuilder {
    id: String,
    name: String,
    variants: Vec<Variant>,
    traffic_allocation: f64,
    is_active: bool,
}

impl ExperimentBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            variants: Vec::new(),
            traffic_allocation: 1.0,
            is_active: true,
        }
    }

    /// Append a variant.
    #[must_use]
    pub fn variant(mut self, variant: Variant) -> Self {
        self.variants.push(variant);
        self
    }

    /// Set the traffic allocation.
    #[must_use]
    pub const fn traffic_allocation(mut self, allocation: f64) -> Self {
        self.traffic_allocation = allocation;
        self
    }

    /// Set the active flag.
    #[must_use]
    pub const fn active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// Build the `Experiment`.
    #[must_use]
    pub fn build(self) -> Experiment {
        Experiment {
            id: self.id,
            name: self.name,
            variants: self.variants,
            traffic_allocation: self.traffic_allocation,
            is_active: self.is_active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_arm(weight_b: f64) -> Experiment {
        Experiment::builder("exp", "Exp")
            .variant(Variant::new("a", "A", 0.5))
            .variant(Variant::new("b", "B", weight_b))
            .build()
    }

    #[test]
    fn test_builder_defaults() {
        let exp = two_arm(0.5);
        assert!(exp.is_active());
        assert!((exp.traffic_allocation() - 1.0).abs() < f64::EPSILON);
        assert_eq!(exp.variant("b").map(Variant::name), Some("B"));
        assert!(exp.variant("missing").is_none());
        assert!(exp.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_negative_weight() {
        let err = two_arm(-0.1).validate().unwrap_err();
        assert!(err.to_string().contains("weight -0.1"));
    }

    #[test]
    fn test_validate_rejects_nan_weight() {
        assert!(two_arm(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_allocation_out_of_range() {
        let exp = Experiment::builder("exp", "Exp")
            .variant(Variant::new("a", "A", 1.0))
            .traffic_allocation(1.5)
            .build();
        assert!(exp.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_variant() {
        let exp = Experiment::builder("exp", "Exp")
            .variant(Variant::new("a", "A", 1.0))
            .variant(Variant::new("a", "Again", 1.0))
            .build();
        let err = exp.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate variant id 'a'"));
    }

    #[test]
    fn test_validate_rejects_empty() {
        let exp = Experiment::builder("exp", "Exp").build();
        assert!(exp.validate().is_err());
    }

    #[test]
    fn test_zero_weights_are_valid() {
        assert!(two_arm(0.0).validate().is_ok());
    }
}

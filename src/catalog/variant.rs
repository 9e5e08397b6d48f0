//! Variant - one arm of an experiment

use serde::{Deserialize, Serialize};

use super::Modification;

/// A variant of an experiment.
///
/// `weight` is relative: selection walks the cumulative sum, so weights within
/// an experiment need not add up to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    id: String,
    name: String,
    weight: f64,
    #[serde(default)]
    modifications: Vec<Modification>,
}

impl Variant {
    /// Create a variant with no modifications.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, weight: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            weight,
            modifications: Vec::new(),
        }
    }

    /// Create a builder for a variant with modifications.
    #[must_use]
    pub fn builder(id: impl Into<String>, name: impl Into<String>) -> VariantBuilder {
        VariantBuilder::new(id, name)
    }

    /// Variant ID (unique within its experiment).
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Relative weight.
    #[must_use]
    pub const fn weight(&self) -> f64 {
        self.weight
    }

    /// Modifications, in application order.
    #[must_use]
    pub fn modifications(&self) -> &[Modification] {
        &self.modifications
    }
}

/// Builder for `Variant`.
#[derive(Debug)]
pub struct VariantBuilder {
    id: String,
    name: String,
    weight: f64,
    modifications: Vec<Modification>,
}

impl VariantBuilder {
    /// Create a new builder with required fields. Weight defaults to 1.0.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            weight: 1.0,
            modifications: Vec::new(),
        }
    }

    /// Set the relative weight.
    #[must_use]
    pub const fn weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Append a modification.
    #[must_use]
    pub fn modification(mut self, modification: Modification) -> Self {
        self.modifications.push(modification);
        self
    }

    /// Build the `Variant`.
    #[must_use]
    pub fn build(self) -> Variant {
        Variant {
            id: self.id,
            name: self.name,
            weight: self.weight,
            modifications: self.modifications,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_builder() {
        let variant = Variant::builder("variant-a", "Green CTA")
            .weight(0.5)
            .modification(Modification::style("#hero-cta-primary", "backgroundColor", "#059669"))
            .build();

        assert_eq!(variant.id(), "variant-a");
        assert_eq!(variant.name(), "Green CTA");
        assert!((variant.weight() - 0.5).abs() < f64::EPSILON);
        assert_eq!(variant.modifications().len(), 1);
    }

    #[test]
    fn test_variant_missing_modifications_defaults_empty() {
        let v: Variant = serde_json::from_str(r#"{"id":"a","name":"A","weight":1}"#).unwrap();
        assert!(v.modifications().is_empty());
    }
}

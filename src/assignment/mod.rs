//! Visitor assignments
//!
//! - [`AssignmentMap`]: ordered experiment → variant mapping with a fixed
//!   wire format (JSON array of `[experimentId, variantId]` pairs)
//! - [`AssignmentStore`]: the durable copy of that map
//! - [`bucket`]: traffic-allocation hashing and weighted selection

pub mod bucket;
mod store;

pub use store::AssignmentStore;

use serde::{Deserialize, Serialize};

/// Ordered experiment → variant mapping.
///
/// Serialized as `[["experiment", "variant"], ...]` in insertion order. When
/// a persisted list repeats an experiment, the last pair wins and keeps the
/// position of the first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<(String, String)>", into = "Vec<(String, String)>")]
pub struct AssignmentMap {
    entries: Vec<(String, String)>,
}

impl AssignmentMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Variant assigned for an experiment.
    #[must_use]
    pub fn get(&self, experiment_id: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(e, _)| e == experiment_id)
            .map(|(_, v)| v.as_str())
    }

    /// Whether the experiment has an assignment.
    #[must_use]
    pub fn contains(&self, experiment_id: &str) -> bool {
        self.get(experiment_id).is_some()
    }

    /// Insert or replace; a replaced entry keeps its position.
    pub fn insert(&mut self, experiment_id: impl Into<String>, variant_id: impl Into<String>) {
        let experiment_id = experiment_id.into();
        let variant_id = variant_id.into();
        match self.entries.iter_mut().find(|(e, _)| *e == experiment_id) {
            Some(entry) => entry.1 = variant_id,
            None => self.entries.push((experiment_id, variant_id)),
        }
    }

    /// Pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(e, v)| (e.as_str(), v.as_str()))
    }

    /// Experiment IDs in insertion order.
    pub fn experiment_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(e, _)| e.as_str())
    }

    /// Number of assignments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no assignments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// JSON object form (`{"experiment": "variant"}`), used by exports.
    #[must_use]
    pub fn to_object(&self) -> serde_json::Map<String, serde_json::Value> {
        self.entries
            .iter()
            .map(|(e, v)| (e.clone(), serde_json::Value::String(v.clone())))
            .collect()
    }
}

impl From<Vec<(String, String)>> for AssignmentMap {
    fn from(pairs: Vec<(String, String)>) -> Self {
        let mut map = Self::new();
        for (experiment_id, variant_id) in pairs {
            map.insert(experiment_id, variant_id);
        }
        map
    }
}

impl From<AssignmentMap> for Vec<(String, String)> {
    fn from(map: AssignmentMap) -> Self {
        map.entries
    }
}

impl<E: Into<String>, V: Into<String>> FromIterator<(E, V)> for AssignmentMap {
    fn from_iter<I: IntoIterator<Item = (E, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (experiment_id, variant_id) in iter {
            map.insert(experiment_id, variant_id);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format_is_array_of_pairs() {
        let map: AssignmentMap = [("hero-cta-colors", "variant-a"), ("headline-text", "control")]
            .into_iter()
            .collect();

        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(
            json,
            r#"[["hero-cta-colors","variant-a"],["headline-text","control"]]"#
        );

        let parsed: AssignmentMap = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, map);
    }

    #[test]
    fn test_duplicate_pairs_last_wins_first_position() {
        let parsed: AssignmentMap =
            serde_json::from_str(r#"[["a","1"],["b","2"],["a","3"]]"#).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.get("a"), Some("3"));
        assert_eq!(parsed.experiment_ids().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_object_form() {
        let map: AssignmentMap = [("a", "x")].into_iter().collect();
        let obj = map.to_object();
        assert_eq!(obj.get("a"), Some(&serde_json::Value::String("x".into())));
    }

    #[test]
    fn test_malformed_shape_rejected() {
        assert!(serde_json::from_str::<AssignmentMap>(r#"{"a":"b"}"#).is_err());
        assert!(serde_json::from_str::<AssignmentMap>(r#"[["a"]]"#).is_err());
    }
}

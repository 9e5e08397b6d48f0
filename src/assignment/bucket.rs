//! Traffic-allocation bucketing and weighted variant selection

use crate::catalog::Variant;

const I32_MAX: f64 = 2_147_483_647.0;

/// Map (visitor, experiment) to a stable value in [0, 1].
///
/// 32-bit string hash over the UTF-16 units of `visitor_id ‖ experiment_id`
/// (`h = h * 31 + unit`, wrapping), normalised as `|h| / i32::MAX`. The value is
/// a pure function of its inputs, so it is identical across sessions and with
/// ids issued by earlier storefront builds. `i32::MIN` maps just above 1.0,
/// which excludes that visitor from every allocation below 100%.
#[must_use]
pub fn bucket_value(visitor_id: &str, experiment_id: &str) -> f64 {
    let hash = visitor_id
        .encode_utf16()
        .chain(experiment_id.encode_utf16())
        .fold(0i32, |h, unit| {
            h.wrapping_shl(5).wrapping_sub(h).wrapping_add(i32::from(unit))
        });
    f64::from(hash).abs() / I32_MAX
}

/// Whether the visitor falls inside the experiment's traffic allocation.
#[must_use]
pub fn is_included(visitor_id: &str, experiment_id: &str, traffic_allocation: f64) -> bool {
    bucket_value(visitor_id, experiment_id) < traffic_allocation
}

/// Pick a variant for a uniform draw in [0, 1).
///
/// Walks the variants accumulating weights and returns the first whose
/// cumulative weight reaches `draw`. A draw beyond the total (weights summing
/// below the draw, or to zero) falls back to the first variant. `None` only for
/// an empty slice.
#[must_use]
pub fn select_variant(variants: &[Variant], draw: f64) -> Option<&Variant> {
    let mut cumulative = 0.0;
    variants
        .iter()
        .find(|variant| {
            cumulative += variant.weight();
            cumulative >= draw
        })
        .or_else(|| variants.first())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variants(weights: &[f64]) -> Vec<Variant> {
        weights
            .iter()
            .enumerate()
            .map(|(i, &w)| Variant::new(format!("v{i}"), format!("V{i}"), w))
            .collect()
    }

    #[test]
    fn test_bucket_value_known_hash() {
        // "a" -> 97, "ab" -> 97 * 31 + 98 = 3105
        assert!((bucket_value("a", "") - 97.0 / I32_MAX).abs() < 1e-15);
        assert!((bucket_value("a", "b") - 3105.0 / I32_MAX).abs() < 1e-15);
        assert_eq!(bucket_value("a", "b"), bucket_value("ab", ""));
    }

    #[test]
    fn test_bucket_value_wraps_and_stays_bounded() {
        let long = "x".repeat(500);
        let value = bucket_value(&long, "hero-cta-colors");
        assert!((0.0..=1.0 + 1e-9).contains(&value));
    }

    #[test]
    fn test_is_included_bounds() {
        let value = bucket_value("user_abc", "exp");
        assert!(!is_included("user_abc", "exp", 0.0));
        assert!(!is_included("user_abc", "exp", value));
        assert!(is_included("user_abc", "exp", value + 1e-9));
    }

    #[test]
    fn test_select_variant_cumulative() {
        let vs = variants(&[0.33, 0.33, 0.34]);
        assert_eq!(select_variant(&vs, 0.0).unwrap().id(), "v0");
        assert_eq!(select_variant(&vs, 0.33).unwrap().id(), "v0");
        assert_eq!(select_variant(&vs, 0.5).unwrap().id(), "v1");
        assert_eq!(select_variant(&vs, 0.99).unwrap().id(), "v2");
    }

    #[test]
    fn test_select_variant_unnormalised_weights() {
        let vs = variants(&[1.0, 3.0]);
        assert_eq!(select_variant(&vs, 0.5).unwrap().id(), "v0");
    }

    #[test]
    fn test_select_variant_falls_back_to_first() {
        let vs = variants(&[0.2, 0.2]);
        assert_eq!(select_variant(&vs, 0.9).unwrap().id(), "v0");

        let zeros = variants(&[0.0, 0.0]);
        assert_eq!(select_variant(&zeros, 0.7).unwrap().id(), "v0");

        assert!(select_variant(&[], 0.5).is_none());
    }
}

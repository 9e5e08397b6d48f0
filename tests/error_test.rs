//! Tests for error types

use storefront_experiments::{Error, ExperimentCatalog};

#[test]
fn test_storage_error() {
    let error = Error::StorageError("quota exceeded".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Storage error"));
    assert!(error_str.contains("quota exceeded"));
}

#[test]
fn test_unsupported_selector_error() {
    let error = Error::UnsupportedSelector("main > h1".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Unsupported selector"));
    assert!(error_str.contains("main > h1"));
}

#[test]
fn test_invalid_experiment_error() {
    let error = Error::InvalidExperiment {
        experiment_id: "hero-cta-colors".to_string(),
        reason: "no variants".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("Invalid experiment 'hero-cta-colors'"));
    assert!(error_str.contains("no variants"));
}

#[test]
fn test_dom_error() {
    let error = Error::Dom("InvalidCharacterError".to_string());
    assert_eq!(format!("{error}"), "DOM error: InvalidCharacterError");
}

#[test]
fn test_serialization_error_conversion() {
    let json_error = serde_json::from_str::<Vec<String>>("{").unwrap_err();
    let error: Error = json_error.into();
    assert!(format!("{error}").contains("Serialization error"));
}

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let error: Error = io_error.into();
    let error_str = format!("{error}");
    assert!(error_str.contains("IO error"));
}

#[test]
fn test_strict_catalog_load_surfaces_invalid_experiment() {
    let result = ExperimentCatalog::from_json_strict(
        r#"[{"id":"empty","name":"Empty","variants":[],"trafficAllocation":1.0,"isActive":true}]"#,
    );
    assert!(matches!(
        result,
        Err(Error::InvalidExperiment { ref experiment_id, .. }) if experiment_id == "empty"
    ));
}

#[test]
fn test_catalog_load_keeps_valid_experiments() {
    let catalog = ExperimentCatalog::from_json(
        r#"[
            {"id":"empty","name":"Empty","variants":[],"trafficAllocation":1.0,"isActive":true},
            {"id":"headline","name":"Headline","variants":[{"id":"a","name":"A","weight":1.0}],"trafficAllocation":1.0,"isActive":true}
        ]"#,
    )
    .unwrap();
    assert_eq!(catalog.len(), 1);
    assert!(catalog.get("headline").is_some());
}

#[test]
fn test_catalog_load_surfaces_malformed_json() {
    assert!(matches!(
        ExperimentCatalog::from_json("[{"),
        Err(Error::Serialization(_))
    ));
}

#[test]
fn test_error_debug() {
    let error = Error::UnsupportedSelector("a:hover".to_string());
    let debug_str = format!("{error:?}");
    assert!(debug_str.contains("UnsupportedSelector"));
}

#[test]
fn test_result_type_alias() {
    #[allow(clippy::unnecessary_wraps)]
    fn returns_result() -> storefront_experiments::Result<i32> {
        Ok(42)
    }

    assert_eq!(returns_result().unwrap(), 42);
}

#[test]
fn test_result_type_alias_error() {
    fn returns_error() -> storefront_experiments::Result<i32> {
        Err(Error::Dom("detached".to_string()))
    }

    assert!(returns_error().is_err());
}

//! Storefront experiments browser bundle
//!
//! Build with `wasm-pack build --target web` and load from the storefront:
//!
//! ```js
//! const experiments = new StorefrontExperiments();
//! experiments.start();
//! // after the page has rendered
//! experiments.mount_complete();
//! ```

use wasm_bindgen::prelude::*;

// Re-export main types from parent crate
pub use storefront_experiments::wasm::*;

/// Get bundle version
#[wasm_bindgen]
pub fn bundle_version() -> String {
    format!("storefront-experiments-wasm v{}", env!("CARGO_PKG_VERSION"))
}

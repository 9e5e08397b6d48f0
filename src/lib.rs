//! # storefront-experiments: client-side A/B testing for a storefront
//!
//! **Version**: 0.1.0
//!
//! Assigns each visitor a sticky variant per experiment, applies the
//! variant's DOM modifications, and records assignments, exposures, clicks and
//! conversions to a bounded durable log for reporting and export.
//!
//! ## Architecture
//!
//! ```text
//! ExperimentCatalog ──> ExperimentEngine ──> Document (MemoryDocument / browser)
//!                          │   │
//!      AssignmentStore <───┘   └───> AnalyticsRecorder ──> KvStore
//!                                          ▲
//!      PageSession ── ClickInterceptor ────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use storefront_experiments::dom::{ElementSpec, MemoryDocument};
//! use storefront_experiments::kv::MemoryKvStore;
//! use storefront_experiments::{ExperimentCatalog, ExperimentEngine, PageSession};
//!
//! let kv = MemoryKvStore::new();
//! let engine = ExperimentEngine::builder(&kv, ExperimentCatalog::storefront()).build();
//! let mut session = PageSession::new(engine);
//!
//! let mut page = MemoryDocument::new()
//!     .with(ElementSpec::new("h1").text("Welcome to TestStore"))
//!     .with(ElementSpec::new("button").id("hero-cta-primary"));
//! session.load(&mut page);
//! session.mount_complete();
//!
//! let button = page.element_by_id("hero-cta-primary").unwrap();
//! let credited = session.click(&page, &button);
//! assert_eq!(credited[0].experiment_id, "hero-cta-colors");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod analytics;
pub mod applier;
pub mod assignment;
pub mod catalog;
pub mod config;
pub mod dom;
pub mod engine;
pub mod error;
pub mod interceptor;
pub mod kv;
pub mod random;
pub mod session;
pub mod visitor;
#[cfg(all(target_arch = "wasm32", feature = "wasm"))]
pub mod wasm;

pub use analytics::{AnalyticsRecorder, AnalyticsReport, AnalyticsSnapshot, Event, EventKind};
pub use assignment::{AssignmentMap, AssignmentStore};
pub use catalog::{Experiment, ExperimentCatalog, Modification, ModificationKind, Variant};
pub use config::{Attribution, EngineConfig, StorageKeys};
pub use engine::{
    AppliedVariant, EngineBuilder, ExperimentEngine, Resolution, ResolutionSource, RunSummary,
};
pub use error::{Error, Result};
pub use interceptor::{ClickAttribution, ClickInterceptor};
pub use session::PageSession;
pub use visitor::VisitorId;

//! Experiment analytics
//!
//! ## Event flow
//!
//! ```text
//! resolve ──> assignment ─┐
//! apply   ──> variant_application ─┤
//! click   ──> conversion + click ──┴──> AnalyticsRecorder ──> durable log (cap 1000)
//!                                                                 │
//!                                    AnalyticsSnapshot::load <────┘
//!                                      ├─> AnalyticsReport (per-variant stats)
//!                                      └─> ExportDocument (JSON download)
//! ```

mod event;
mod export;
mod recorder;
mod report;

pub use event::{Clock, Event, EventBuilder, EventKind, FixedClock, PageContext, SystemClock};
pub use export::ExportDocument;
pub use recorder::AnalyticsRecorder;
pub use report::{
    conversion_rate, variant_stats, AnalyticsReport, AnalyticsSnapshot, ExperimentReport,
    VariantStats, DEFAULT_RECENT_EVENTS,
};

//! Page session: one engine and one click interceptor for a page lifetime

use tracing::{info, warn};

use crate::dom::Document;
use crate::engine::{ExperimentEngine, RunSummary};
use crate::interceptor::{ClickAttribution, ClickInterceptor};
use crate::kv::KvStore;
use crate::random::{RandomSource, ThreadRandom};

/// Owns the engine for a page and sequences load → mount → clicks.
///
/// The engine is reachable read-only through [`engine`](Self::engine) for
/// diagnostics.
#[derive(Debug)]
pub struct PageSession<S, R = ThreadRandom> {
    engine: ExperimentEngine<S, R>,
    interceptor: ClickInterceptor,
    summary: Option<RunSummary>,
}

impl<S: KvStore + Clone, R: RandomSource> PageSession<S, R> {
    /// Wrap an engine. Nothing runs until [`load`](Self::load).
    #[must_use]
    pub const fn new(engine: ExperimentEngine<S, R>) -> Self {
        Self {
            engine,
            interceptor: ClickInterceptor::new(),
            summary: None,
        }
    }

    /// Run every active experiment against the page.
    ///
    /// Calling again re-runs: stored assignments are reused and exposure is
    /// recorded again.
    pub fn load<D: Document + ?Sized>(&mut self, doc: &mut D) -> &RunSummary {
        let summary = self.engine.run_all(doc);

        let assignments: Vec<String> = self
            .engine
            .assignments()
            .iter()
            .map(|(experiment, variant)| format!("{experiment}={variant}"))
            .collect();
        let logged = match self.engine.recorder().persisted_events() {
            Ok(events) => events.len(),
            Err(e) => {
                warn!(error = %e, "Failed to read event log");
                0
            }
        };
        info!(
            visitor = %self.engine.visitor(),
            experiments = summary.len(),
            failures = summary.failures().count(),
            assignments = ?assignments,
            event_log = logged,
            "Experiments loaded"
        );

        self.summary.insert(summary)
    }

    /// Signal that the page has mounted; clicks are tracked from now on.
    pub fn mount_complete(&mut self) {
        self.interceptor.attach();
    }

    /// Route a click to the interceptor.
    pub fn click<D: Document + ?Sized>(
        &mut self,
        doc: &D,
        element: &D::Element,
    ) -> Vec<ClickAttribution> {
        self.interceptor.handle_click(&mut self.engine, doc, element)
    }

    /// Read-only engine access.
    #[must_use]
    pub const fn engine(&self) -> &ExperimentEngine<S, R> {
        &self.engine
    }

    /// Summary of the last [`load`](Self::load).
    #[must_use]
    pub const fn summary(&self) -> Option<&RunSummary> {
        self.summary.as_ref()
    }

    /// Whether clicks are being tracked.
    #[must_use]
    pub const fn is_mounted(&self) -> bool {
        self.interceptor.is_attached()
    }

    /// Point subsequent events at a new URL (client-side navigation).
    pub fn navigate(&mut self, url: impl Into<String>) {
        self.engine.recorder_mut().set_url(url);
    }
}

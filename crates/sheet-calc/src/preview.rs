//! Debounced preview of the unsaved graph and explicit calculation

use crate::annotate::{apply_results, Annotation};
use crate::debounce::Debouncer;
use crate::error::CalcError;
use crate::evaluator::{calculation_inputs, Evaluator, PendingInputs, PreviewRequest, SweepRequest};
use parking_lot::Mutex;
use sheet_graph::{CalculationResult, EventBus, Graph, GraphEvent, SheetId};
use sheet_sweep::SweepData;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

/// Default quiet period before a preview is sent
pub const DEFAULT_PREVIEW_DELAY: Duration = Duration::from_millis(50);

/// Graph shared between the editor and the preview task
///
/// The lock is never held across an `.await`.
pub type SharedGraph = Arc<Mutex<Graph>>;

struct Inner {
    evaluator: Arc<dyn Evaluator>,
    graph: SharedGraph,
    events: EventBus,
    last: watch::Sender<Option<Arc<CalculationResult>>>,
}

impl Inner {
    fn annotate(&self, result: CalculationResult) -> Annotation {
        let annotation = {
            let mut graph = self.graph.lock();
            apply_results(&mut graph, &result)
        };
        self.events.notify(GraphEvent::Annotated);
        self.last.send_replace(Some(Arc::new(result)));
        annotation
    }

    async fn preview(&self, pending: &PendingInputs) -> Result<Annotation, CalcError> {
        let request = {
            let graph = self.graph.lock();
            PreviewRequest::build(&graph, pending)
        };
        let result = self.evaluator.preview(&request).await?;
        Ok(self.annotate(result))
    }
}

/// Sends previews of the live graph and writes results back onto it
pub struct PreviewPipeline {
    inner: Arc<Inner>,
    debouncer: Debouncer,
}

impl std::fmt::Debug for PreviewPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewPipeline")
            .field("debouncer", &self.debouncer)
            .finish_non_exhaustive()
    }
}

impl PreviewPipeline {
    /// Create pipeline over the shared graph
    #[must_use]
    pub fn new(
        evaluator: Arc<dyn Evaluator>,
        graph: SharedGraph,
        events: EventBus,
        delay: Duration,
    ) -> Self {
        let (last, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                evaluator,
                graph,
                events,
                last,
            }),
            debouncer: Debouncer::new(delay),
        }
    }

    /// Schedule a preview after the quiet period
    ///
    /// Supersedes any preview scheduled earlier. Failures are logged and
    /// swallowed.
    pub fn schedule(&self, pending: PendingInputs) {
        let inner = Arc::clone(&self.inner);
        self.debouncer.schedule(async move {
            if let Err(e) = inner.preview(&pending).await {
                debug!(error = %e, "preview failed");
            }
        });
    }

    /// Drop the scheduled preview, if any
    pub fn cancel(&self) {
        self.debouncer.cancel();
    }

    /// Whether a preview is scheduled or in flight
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Preview immediately, surfacing failures
    ///
    /// # Errors
    /// - any evaluator error
    pub async fn preview_now(&self, pending: &PendingInputs) -> Result<Annotation, CalcError> {
        self.debouncer.cancel();
        self.inner.preview(pending).await
    }

    /// Calculate the saved sheet with the current inputs
    ///
    /// Uses the same annotation rules as previews. Evaluator errors are
    /// returned and may name a node to highlight.
    ///
    /// # Errors
    /// - any evaluator error
    pub async fn calculate(
        &self,
        sheet: SheetId,
        pending: &PendingInputs,
    ) -> Result<Annotation, CalcError> {
        let inputs = {
            let graph = self.inner.graph.lock();
            calculation_inputs(&graph, pending)
        };
        info!(sheet = %sheet, inputs = inputs.len(), "calculating");
        let result = self.inner.evaluator.calculate(sheet, &inputs).await?;
        Ok(self.inner.annotate(result))
    }

    /// Run a sweep against the saved sheet
    ///
    /// # Errors
    /// - any evaluator error, or the error the sweep reported
    pub async fn sweep(&self, sheet: SheetId, request: &SweepRequest) -> Result<SweepData, CalcError> {
        info!(sheet = %sheet, points = request.point_count(), "sweeping");
        self.inner.evaluator.sweep(sheet, request).await?.into_result()
    }

    /// Most recent result
    #[must_use]
    pub fn last_result(&self) -> Option<Arc<CalculationResult>> {
        self.inner.last.borrow().clone()
    }

    /// Watch results as they arrive
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<CalculationResult>>> {
        self.inner.last.subscribe()
    }
}

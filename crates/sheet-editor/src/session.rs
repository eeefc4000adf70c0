//! Editing session for one sheet
//!
//! The session owns the live graph and routes every mutation through the
//! same path: lease check, graph operation, history record, change event,
//! preview schedule. Graph and history locks are taken together and never
//! held across an `.await`.

use crate::config::EditorConfig;
use crate::error::EditorError;
use backon::{ExponentialBuilder, Retryable};
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{json, Value};
use sheet_calc::{
    parse_share_query, Annotation, Evaluator, PendingInputs, PreviewPipeline, SharedGraph,
    ShareStatePublisher, SweepRequest,
};
use sheet_client::{ApiClient, ClientError, SheetStore};
use sheet_graph::{
    CalculationResult, Connection, ConnectionId, EventBus, Graph, GraphError, GraphEvent,
    IntegrityIssue, NewNode, Node, NodeId, NodeKind, NodePatch, Position, Sheet, SheetId,
};
use sheet_history::{graph_actions, GraphAction, History};
use sheet_lease::{Lease, LeaseApi, LeaseSession, LeaseStatus, SessionContext};
use sheet_nested::{ExpectedPorts, ReconcileReport, ResolveError, Resolver, SheetSource};
use sheet_sweep::{ChartPanel, Choice, SweepData, SweepPlanner};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

/// Undelivered events kept per subscriber
const EVENT_CAPACITY: usize = 64;

/// Remote services a session talks to
#[derive(Clone)]
pub struct Backends {
    /// Loads and saves sheets
    pub store: Arc<dyn SheetStore>,
    /// Fetches referenced sheets
    pub source: Arc<dyn SheetSource>,
    /// Evaluates graphs
    pub evaluator: Arc<dyn Evaluator>,
    /// Edit lease server
    pub lease: Arc<dyn LeaseApi>,
}

impl Backends {
    /// Every service served by one HTTP client
    #[must_use]
    pub fn from_client(client: ApiClient) -> Self {
        let client = Arc::new(client);
        Self {
            store: client.clone(),
            source: client.clone(),
            evaluator: client.clone(),
            lease: client,
        }
    }
}

impl std::fmt::Debug for Backends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backends").finish_non_exhaustive()
    }
}

/// What opening a sheet found
#[derive(Debug, Clone)]
pub struct OpenReport {
    /// Reference reconciliation
    pub reconcile: ReconcileReport,
    /// Structural problems in the stored graph
    pub integrity: Vec<IntegrityIssue>,
    /// Lease status right after opening
    pub lease: LeaseStatus,
}

impl OpenReport {
    /// Warning to show the user, if references drifted
    #[must_use]
    pub fn warning(&self) -> Option<String> {
        self.reconcile.warning()
    }
}

/// Live editing session
pub struct Editor {
    config: EditorConfig,
    store: Arc<dyn SheetStore>,
    resolver: Resolver,
    header: Mutex<Sheet>,
    graph: SharedGraph,
    history: Mutex<History<Graph>>,
    pending: Mutex<PendingInputs>,
    events: EventBus,
    preview: PreviewPipeline,
    share: ShareStatePublisher,
    planner: SweepPlanner,
    lease: LeaseSession,
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("sheet", &self.sheet_id())
            .field("lease", &self.lease)
            .finish_non_exhaustive()
    }
}

impl Editor {
    /// Load `sheet`, reconcile its references and open the lease
    ///
    /// Fetch failures of referenced sheets are reported, not fatal.
    ///
    /// # Errors
    /// - `EditorError::Store` when the sheet cannot be loaded
    pub async fn open(
        backends: Backends,
        config: EditorConfig,
        ctx: SessionContext,
        sheet: SheetId,
    ) -> Result<(Self, OpenReport), EditorError> {
        let mut loaded = backends.store.load(sheet).await?;
        let integrity = loaded.graph.check_integrity();
        for issue in &integrity {
            warn!(sheet = %sheet, %issue, "stored graph is inconsistent");
        }

        let resolver = Resolver::new(backends.source);
        let reconcile = resolver.reconcile(&mut loaded.graph).await;
        log_failures(&reconcile);

        let lease = LeaseSession::open(backends.lease, sheet, ctx, config.heartbeat()).await;

        let graph: SharedGraph = Arc::new(Mutex::new(std::mem::take(&mut loaded.graph)));
        let events = EventBus::new(EVENT_CAPACITY);
        let preview = PreviewPipeline::new(
            backends.evaluator,
            Arc::clone(&graph),
            events.clone(),
            config.preview_delay(),
        );

        info!(
            sheet = %sheet,
            name = %loaded.name,
            lease = %lease.status().describe(),
            "sheet opened"
        );
        let report = OpenReport {
            reconcile,
            integrity,
            lease: lease.status(),
        };
        let editor = Self {
            store: backends.store,
            resolver,
            header: Mutex::new(loaded),
            graph,
            history: Mutex::new(History::new(config.history_depth)),
            pending: Mutex::new(PendingInputs::new()),
            events,
            preview,
            share: ShareStatePublisher::new(config.share_delay()),
            planner: SweepPlanner::new(),
            lease,
            config,
        };
        Ok((editor, report))
    }

    /// Open sheet id
    #[must_use]
    pub fn sheet_id(&self) -> SheetId {
        self.header.lock().id
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Copy of the live graph
    #[must_use]
    pub fn graph(&self) -> Graph {
        self.graph.lock().clone()
    }

    /// Copy of one node
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<Node> {
        self.graph.lock().node(id).cloned()
    }

    /// Sheet as it would be saved: live control values folded into data
    #[must_use]
    pub fn snapshot(&self) -> Sheet {
        let mut sheet = self.header.lock().clone();
        sheet.graph = self.graph.lock().clone();
        sheet.graph.flatten_controls();
        sheet
    }

    /// Graph change events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<GraphEvent> {
        self.events.subscribe()
    }

    // ---------------------------------------------------------------------
    // Lease
    // ---------------------------------------------------------------------

    /// Current lease status
    #[must_use]
    pub fn lease_status(&self) -> LeaseStatus {
        self.lease.status()
    }

    /// Whether mutations are blocked
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        !self.lease.is_editable()
    }

    /// Watch lease status changes
    #[must_use]
    pub fn subscribe_lease(&self) -> watch::Receiver<LeaseStatus> {
        self.lease.subscribe()
    }

    /// Force-acquire the lease; callers confirm with the user first
    ///
    /// # Errors
    /// - `EditorError::Lease` when the lease server fails
    pub async fn take_over(&self) -> Result<Lease, EditorError> {
        Ok(self.lease.take_over().await?)
    }

    fn ensure_editable(&self) -> Result<(), EditorError> {
        if self.lease.is_editable() {
            return Ok(());
        }
        let status = self.lease.status();
        Err(EditorError::ReadOnly {
            holder: status.holder().map(str::to_string),
        })
    }

    // ---------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------

    /// Run one recorded mutation
    fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut Graph) -> Result<(T, GraphAction, GraphEvent), EditorError>,
    ) -> Result<T, EditorError> {
        self.ensure_editable()?;
        let (value, event) = {
            let mut graph = self.graph.lock();
            let (value, action, event) = apply(&mut *graph)?;
            debug!(action = action.label(), "recorded");
            self.history.lock().record(action);
            (value, event)
        };
        self.changed(event);
        Ok(value)
    }

    fn changed(&self, event: GraphEvent) {
        let evaluates = event.affects_evaluation();
        self.events.notify(event);
        if evaluates {
            self.preview.schedule(self.pending.lock().clone());
        }
    }

    /// Add a node; input/output/constant labels are suffixed until unique
    ///
    /// Reference nodes keep the ports given here; see
    /// [`Editor::add_reference`].
    ///
    /// # Errors
    /// - `EditorError::ReadOnly` without the lease
    pub fn add_node(&self, request: NewNode) -> Result<NodeId, EditorError> {
        self.mutate(|graph| {
            let id = graph.add_node(request);
            let action = added(graph, "Add node", id)?;
            Ok((id, action, GraphEvent::NodeAdded(id)))
        })
    }

    /// Insert a node as-is (paste, import)
    ///
    /// # Errors
    /// - `EditorError::ReadOnly` without the lease
    /// - `GraphError::DuplicateLabel` when an input/output label is taken
    pub fn paste_node(&self, node: Node) -> Result<NodeId, EditorError> {
        self.mutate(|graph| {
            let id = graph.add_node_exact(node)?;
            let action = added(graph, "Paste node", id)?;
            Ok((id, action, GraphEvent::NodeAdded(id)))
        })
    }

    /// Remove a node and its connections
    ///
    /// Removing an input or output changes the sheet's calling signature and
    /// needs `confirmed`.
    ///
    /// # Errors
    /// - `EditorError::ReadOnly` without the lease
    /// - `EditorError::NeedsConfirmation` for an unconfirmed input/output removal
    /// - `GraphError::NodeNotFound` for an unknown node
    pub fn remove_node(&self, id: NodeId, confirmed: bool) -> Result<Node, EditorError> {
        self.mutate(|graph| {
            if !confirmed && graph.removal_needs_confirmation(id) {
                return Err(EditorError::NeedsConfirmation(format!(
                    "removing node {id} changes the sheet's inputs or outputs"
                )));
            }
            let removed = graph.remove_node(id)?;
            let node = removed.node.clone();
            Ok((node, graph_actions::node_removed(removed), GraphEvent::NodeRemoved(id)))
        })
    }

    /// Patch a node
    ///
    /// Renaming an input/output away from a user-chosen label needs
    /// `confirmed`.
    ///
    /// # Errors
    /// - `EditorError::ReadOnly` without the lease
    /// - `EditorError::NeedsConfirmation` for an unconfirmed rename
    /// - `GraphError::DuplicateLabel` when the new label is taken
    pub fn update_node(
        &self,
        id: NodeId,
        patch: NodePatch,
        confirmed: bool,
    ) -> Result<Vec<Connection>, EditorError> {
        self.mutate(|graph| {
            if let Some(label) = &patch.label {
                if !confirmed && graph.rename_needs_confirmation(id, label) {
                    return Err(EditorError::NeedsConfirmation(format!(
                        "renaming to \"{label}\" changes the sheet's inputs or outputs"
                    )));
                }
            }
            let update = graph.update_node(id, patch)?;
            let pruned = update.pruned.clone();
            Ok((pruned, graph_actions::node_updated(update), GraphEvent::NodeUpdated(id)))
        })
    }

    /// Duplicate a node next to the original, or at `fallback`
    ///
    /// # Errors
    /// - `EditorError::ReadOnly` without the lease
    /// - `GraphError::NodeNotFound` for an unknown node
    pub fn duplicate_node(&self, id: NodeId, fallback: Position) -> Result<NodeId, EditorError> {
        let offset = self.config.duplicate_offset;
        self.mutate(|graph| {
            let copy = graph.duplicate_node(id, offset, fallback)?;
            let action = added(graph, "Duplicate node", copy)?;
            Ok((copy, action, GraphEvent::NodeAdded(copy)))
        })
    }

    /// Connect an output port to an input port
    ///
    /// # Errors
    /// - `EditorError::ReadOnly` without the lease
    /// - any `GraphError` from validation
    pub fn connect(
        &self,
        source: NodeId,
        source_port: &str,
        target: NodeId,
        target_port: &str,
    ) -> Result<ConnectionId, EditorError> {
        self.mutate(|graph| {
            let outcome = graph.connect(source, source_port, target, target_port)?;
            let id = outcome.connection.id;
            Ok((id, graph_actions::connected(outcome), GraphEvent::ConnectionAdded(id)))
        })
    }

    /// Remove one connection
    ///
    /// # Errors
    /// - `EditorError::ReadOnly` without the lease
    /// - `GraphError::ConnectionNotFound` for an unknown connection
    pub fn disconnect(&self, id: ConnectionId) -> Result<(), EditorError> {
        self.mutate(|graph| {
            let connection = graph.disconnect(id)?;
            Ok(((), graph_actions::disconnected(connection), GraphEvent::ConnectionRemoved(id)))
        })
    }

    /// Move a node
    ///
    /// # Errors
    /// - `EditorError::ReadOnly` without the lease
    /// - `GraphError::NodeNotFound` for an unknown node
    pub fn move_node(&self, id: NodeId, to: Position) -> Result<(), EditorError> {
        self.mutate(|graph| {
            let from = graph.node(id).ok_or(GraphError::NodeNotFound(id))?.position;
            graph.set_position(id, to)?;
            Ok(((), graph_actions::node_moved(id, from, to), GraphEvent::NodeMoved(id)))
        })
    }

    /// Point a reference node at another sheet and adopt its ports
    ///
    /// Returns the connections pruned because their port disappeared.
    ///
    /// # Errors
    /// - `EditorError::ReadOnly` without the lease
    /// - `ResolveError::NotAReference` when `id` is not a reference node
    /// - `ResolveError::Fetch` when the target cannot be fetched; the node is left unchanged
    pub async fn change_reference_target(
        &self,
        id: NodeId,
        target: SheetId,
    ) -> Result<Vec<Connection>, EditorError> {
        self.ensure_editable()?;
        let mut candidate = self.node(id).ok_or(GraphError::NodeNotFound(id))?;
        if candidate.kind != NodeKind::Sheet {
            return Err(ResolveError::NotAReference(id).into());
        }
        candidate.data = with_target(candidate.data, target);

        self.resolver.invalidate(target).await;
        let expected = self.resolver.expected_for(&candidate).await?;

        let patch = NodePatch::new()
            .data(candidate.data)
            .inputs(expected.inputs)
            .outputs(expected.outputs);
        let pruned = self.update_node(id, patch, true)?;
        if !pruned.is_empty() {
            warn!(node = %id, pruned = pruned.len(), "reference target changed, connections removed");
        }
        Ok(pruned)
    }

    /// Add a reference to `target` carrying the target's current ports
    ///
    /// The node is labelled after the referenced sheet and recorded as one
    /// "Add node" step.
    ///
    /// # Errors
    /// - `EditorError::ReadOnly` without the lease
    /// - `ResolveError::Fetch` when the target cannot be fetched; nothing is added
    pub async fn add_reference(
        &self,
        target: SheetId,
        position: Option<Position>,
    ) -> Result<NodeId, EditorError> {
        self.ensure_editable()?;
        self.resolver.invalidate(target).await;
        let referenced = self.resolver.fetch(target).await?;
        let expected = ExpectedPorts::of(&referenced.graph);

        let mut request = NewNode::new(NodeKind::Sheet, referenced.name.clone())
            .with_data(with_target(Value::Null, target))
            .with_inputs(expected.inputs)
            .with_outputs(expected.outputs);
        if let Some(position) = position {
            request = request.at(position);
        }
        self.add_node(request)
    }

    /// Re-fetch every referenced sheet and bring reference ports up to date
    ///
    /// Local edits and history are kept; all port changes of one refresh are
    /// a single "Refresh references" step.
    ///
    /// # Errors
    /// - `EditorError::ReadOnly` without the lease
    pub async fn refresh_references(&self) -> Result<ReconcileReport, EditorError> {
        self.ensure_editable()?;
        let snapshot = self.graph();
        self.resolver.begin_pass();
        let plan = self.resolver.plan(&snapshot).await;

        let mut report = ReconcileReport {
            failures: plan.failures,
            ..ReconcileReport::default()
        };
        if !plan.updates.is_empty() {
            self.ensure_editable()?;
            let mut graph = self.graph.lock();
            let mut steps = Vec::new();
            for (id, expected) in plan.updates {
                match graph.node(id) {
                    Some(current) if expected.differs_from(current) => {}
                    Some(_) => continue,
                    None => {
                        report.failures.push((id, GraphError::NodeNotFound(id).into()));
                        continue;
                    }
                }
                let patch = NodePatch::new().inputs(expected.inputs).outputs(expected.outputs);
                match graph.update_node(id, patch) {
                    Ok(update) => {
                        report.updated.push(id);
                        report.pruned.extend(update.pruned.iter().cloned());
                        steps.push(graph_actions::node_updated(update));
                    }
                    Err(e) => report.failures.push((id, e.into())),
                }
            }
            if !steps.is_empty() {
                self.history
                    .lock()
                    .record(GraphAction::batch("Refresh references", steps));
            }
        }

        log_failures(&report);
        if let Some(warning) = report.warning() {
            warn!(sheet = %self.sheet_id(), "{warning}");
        }
        for id in &report.updated {
            self.changed(GraphEvent::NodeUpdated(*id));
        }
        Ok(report)
    }

    // ---------------------------------------------------------------------
    // History
    // ---------------------------------------------------------------------

    /// Undo the last mutation; returns its label
    ///
    /// # Errors
    /// - `EditorError::ReadOnly` without the lease
    /// - `EditorError::History` when the inverse fails; the action stays put
    pub fn undo(&self) -> Result<Option<String>, EditorError> {
        self.ensure_editable()?;
        let label = {
            let mut graph = self.graph.lock();
            self.history.lock().undo(&mut *graph)?
        };
        if label.is_some() {
            self.changed(GraphEvent::Reloaded);
        }
        Ok(label)
    }

    /// Redo the last undone mutation; returns its label
    ///
    /// # Errors
    /// - `EditorError::ReadOnly` without the lease
    /// - `EditorError::History` when the replay fails; the action stays put
    pub fn redo(&self) -> Result<Option<String>, EditorError> {
        self.ensure_editable()?;
        let label = {
            let mut graph = self.graph.lock();
            self.history.lock().redo(&mut *graph)?
        };
        if label.is_some() {
            self.changed(GraphEvent::Reloaded);
        }
        Ok(label)
    }

    /// Label of the action `undo` would revert
    #[must_use]
    pub fn undo_label(&self) -> Option<String> {
        self.history.lock().undo_label().map(str::to_string)
    }

    /// Label of the action `redo` would replay
    #[must_use]
    pub fn redo_label(&self) -> Option<String> {
        self.history.lock().redo_label().map(str::to_string)
    }

    // ---------------------------------------------------------------------
    // Pending inputs
    // ---------------------------------------------------------------------

    /// Propose a value for an input node without editing the sheet
    ///
    /// Allowed while read-only.
    ///
    /// # Errors
    /// - `GraphError::NodeNotFound` for an unknown node
    /// - `EditorError::NotAnInput` when the node is not an input
    pub fn set_pending_input(&self, id: NodeId, value: Value) -> Result<(), EditorError> {
        {
            let graph = self.graph.lock();
            let node = graph.node(id).ok_or(GraphError::NodeNotFound(id))?;
            if node.kind != NodeKind::Input {
                return Err(EditorError::NotAnInput(id));
            }
        }
        self.pending.lock().insert(id, value);
        self.pending_changed();
        Ok(())
    }

    /// Drop the proposed value of an input node
    pub fn clear_pending_input(&self, id: NodeId) {
        if self.pending.lock().remove(&id).is_some() {
            self.pending_changed();
        }
    }

    /// Proposed input values
    #[must_use]
    pub fn pending_inputs(&self) -> PendingInputs {
        self.pending.lock().clone()
    }

    /// Adopt proposed values from a share query; returns how many matched
    ///
    /// Labels without an input node are ignored.
    pub fn apply_share_query(&self, query: &str) -> usize {
        let values = parse_share_query(query);
        let matched: Vec<(NodeId, Value)> = {
            let graph = self.graph.lock();
            values
                .into_iter()
                .filter_map(|(label, value)| {
                    graph
                        .find_by_label(NodeKind::Input, &label)
                        .map(|node| (node.id, value))
                })
                .collect()
        };
        let count = matched.len();
        if count > 0 {
            self.pending.lock().extend(matched);
            self.pending_changed();
        }
        count
    }

    /// Last published share query
    #[must_use]
    pub fn share_query(&self) -> String {
        self.share.current()
    }

    /// Watch share queries
    #[must_use]
    pub fn subscribe_share(&self) -> watch::Receiver<String> {
        self.share.subscribe()
    }

    fn pending_changed(&self) {
        let pending = self.pending.lock().clone();
        {
            let graph = self.graph.lock();
            self.share.update(&graph, &pending);
        }
        self.preview.schedule(pending);
    }

    // ---------------------------------------------------------------------
    // Calculation
    // ---------------------------------------------------------------------

    /// Preview the live graph now instead of waiting for the quiet period
    ///
    /// # Errors
    /// - `EditorError::Calc` when the evaluator fails
    pub async fn preview_now(&self) -> Result<Annotation, EditorError> {
        let pending = self.pending_inputs();
        Ok(self.preview.preview_now(&pending).await?)
    }

    /// Calculate the saved sheet with the proposed inputs
    ///
    /// # Errors
    /// - `EditorError::Calc` when the evaluator fails; [`EditorError::node`]
    ///   names the node to highlight when known
    pub async fn calculate(&self) -> Result<Annotation, EditorError> {
        let pending = self.pending_inputs();
        Ok(self.preview.calculate(self.sheet_id(), &pending).await?)
    }

    /// Most recent calculation or preview result
    #[must_use]
    pub fn last_result(&self) -> Option<Arc<CalculationResult>> {
        self.preview.last_result()
    }

    /// Watch results as they arrive
    #[must_use]
    pub fn subscribe_results(&self) -> watch::Receiver<Option<Arc<CalculationResult>>> {
        self.preview.subscribe()
    }

    /// Run a sweep; proposed inputs pin the other inputs unless the request sets its own
    ///
    /// # Errors
    /// - `EditorError::Calc` when the evaluator or the sweep fails
    pub async fn sweep(&self, request: SweepRequest) -> Result<SweepData, EditorError> {
        let request = if request.input_overrides.is_empty() {
            request.with_overrides(&self.pending_inputs())
        } else {
            request
        };
        Ok(self.preview.sweep(self.sheet_id(), &request).await?)
    }

    /// Chart strategy chosen per output of a sweep
    #[must_use]
    pub fn sweep_choices(&self, data: &SweepData) -> Vec<Choice> {
        self.planner.choose(data)
    }

    /// Chart panels for a sweep
    ///
    /// # Errors
    /// - `EditorError::Sweep` for malformed data or an output no strategy handles
    pub fn sweep_charts(&self, data: &SweepData) -> Result<Vec<ChartPanel>, EditorError> {
        Ok(self.planner.plan(data)?)
    }

    // ---------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------

    /// Save the sheet, retrying transient failures
    ///
    /// Live control values are folded into node data on the saved copy.
    ///
    /// # Errors
    /// - `EditorError::ReadOnly` without the lease
    /// - `EditorError::Store` once attempts are exhausted or on a permanent failure
    pub async fn save(&self) -> Result<(), EditorError> {
        self.ensure_editable()?;
        let sheet = self.snapshot();
        let store = Arc::clone(&self.store);
        let backoff = ExponentialBuilder::default()
            .with_min_delay(self.config.save_backoff())
            .with_max_times(self.config.save_attempts.max(1) - 1);

        (|| async { store.save(&sheet).await })
            .retry(backoff)
            .sleep(tokio::time::sleep)
            .when(ClientError::is_retryable)
            .notify(|err: &ClientError, delay: Duration| {
                warn!(sheet = %sheet.id, error = %err, ?delay, "save failed, retrying");
            })
            .await?;

        if let Err(e) = self.lease.mark_saved(Utc::now()) {
            debug!(sheet = %sheet.id, error = %e, "saved without holding the lease");
        }
        info!(sheet = %sheet.id, nodes = sheet.graph.node_count(), "sheet saved");
        Ok(())
    }

    /// Rename the sheet and save it
    ///
    /// The previous name is restored when the save fails.
    ///
    /// # Errors
    /// - `EditorError::ReadOnly` without the lease
    /// - any error from [`Editor::save`]
    pub async fn rename(&self, name: impl Into<String>) -> Result<(), EditorError> {
        self.ensure_editable()?;
        let name = name.into();
        let previous = std::mem::replace(&mut self.header.lock().name, name.clone());
        if let Err(e) = self.save().await {
            self.header.lock().name = previous;
            return Err(e);
        }
        info!(sheet = %self.sheet_id(), %name, "sheet renamed");
        Ok(())
    }

    /// Discard local changes and load the stored sheet again
    ///
    /// Clears history and proposed inputs.
    ///
    /// # Errors
    /// - `EditorError::Store` when the sheet cannot be loaded
    pub async fn reload(&self) -> Result<ReconcileReport, EditorError> {
        let mut loaded = self.store.load(self.sheet_id()).await?;
        let report = self.resolver.reconcile(&mut loaded.graph).await;
        log_failures(&report);

        self.preview.cancel();
        {
            let mut graph = self.graph.lock();
            *graph = std::mem::take(&mut loaded.graph);
            self.history.lock().clear();
        }
        *self.header.lock() = loaded;
        self.pending.lock().clear();
        self.events.notify(GraphEvent::Reloaded);
        info!(sheet = %self.sheet_id(), "sheet reloaded");
        Ok(report)
    }

    /// End the session: stop previews and release the lease
    pub async fn close(self) {
        self.preview.cancel();
        self.lease.close().await;
    }
}

/// History entry for a node that was just inserted
fn added(graph: &Graph, label: &str, id: NodeId) -> Result<GraphAction, EditorError> {
    let node = graph.node(id).cloned().ok_or(GraphError::NodeNotFound(id))?;
    let index = graph.node_count() - 1;
    Ok(graph_actions::node_added(label, node, index))
}

/// Reference data pointing at `target`, other fields kept
fn with_target(data: Value, target: SheetId) -> Value {
    match data {
        Value::Object(mut map) => {
            map.insert("sheetId".to_string(), json!(target.to_string()));
            Value::Object(map)
        }
        _ => json!({ "sheetId": target.to_string() }),
    }
}

fn log_failures(report: &ReconcileReport) {
    for (node, err) in &report.failures {
        warn!(node = %node, error = %err, "referenced sheet unavailable");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_is_written_into_reference_data() {
        let target = SheetId::new();
        let data = with_target(json!({"sheetId": "old", "versionId": "v1"}), target);
        assert_eq!(data["sheetId"], json!(target.to_string()));
        assert_eq!(data["versionId"], json!("v1"));

        let data = with_target(Value::Null, target);
        assert_eq!(data, json!({ "sheetId": target.to_string() }));
    }

    #[test]
    fn added_records_trailing_index() {
        let mut graph = Graph::new();
        graph.add_node(NewNode::new(NodeKind::Input, "a"));
        let id = graph.add_node(NewNode::new(NodeKind::Input, "b"));
        let action = added(&graph, "Add node", id).unwrap();
        assert_eq!(action.label(), "Add node");

        action.undo(&mut graph).unwrap();
        assert!(!graph.contains_node(id));
        action.redo(&mut graph).unwrap();
        assert_eq!(graph.nodes().last().map(|n| n.id), Some(id));
    }
}

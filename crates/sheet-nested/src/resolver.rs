//! Reference reconciliation against the referenced sheets

use crate::error::ResolveError;
use crate::ports::{apply_expected, ExpectedPorts};
use crate::values::{resolve_inputs, ResolvedInput};
use async_trait::async_trait;
use moka::future::Cache;
use serde_json::Value;
use sheet_graph::{CalculationResult, Connection, Graph, Node, NodeId, NodeKind, Sheet, SheetId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Default number of referenced sheets kept per load pass
pub const DEFAULT_CACHE_CAPACITY: u64 = 256;

/// Where referenced sheets come from
#[async_trait]
pub trait SheetSource: Send + Sync {
    /// Fetch a sheet by id
    async fn fetch_sheet(&self, id: SheetId) -> Result<Sheet, ResolveError>;
}

/// Port updates computed from a graph snapshot
#[derive(Debug, Clone, Default)]
pub struct ReconcilePlan {
    /// Reference nodes whose ports must change
    pub updates: Vec<(NodeId, ExpectedPorts)>,
    /// Reference nodes whose target could not be fetched
    pub failures: Vec<(NodeId, ResolveError)>,
}

impl ReconcilePlan {
    /// Whether applying this plan changes nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    /// Apply the port updates to `graph`
    ///
    /// Nodes removed since the plan was computed are reported as failures.
    pub fn apply(self, graph: &mut Graph) -> ReconcileReport {
        let mut report = ReconcileReport {
            failures: self.failures,
            ..ReconcileReport::default()
        };

        for (node, expected) in self.updates {
            match apply_expected(graph, node, &expected) {
                Ok(pruned) => {
                    for connection in &pruned {
                        warn!(
                            node = %node,
                            source = %connection.source,
                            port = %connection.source_port,
                            "pruned connection to stale reference port"
                        );
                    }
                    report.updated.push(node);
                    report.pruned.extend(pruned);
                }
                Err(e) => report.failures.push((node, e.into())),
            }
        }
        report
    }
}

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    /// Reference nodes whose ports changed
    pub updated: Vec<NodeId>,
    /// Connections removed because their port disappeared
    pub pruned: Vec<Connection>,
    /// Per node failures; reconciliation continued past them
    pub failures: Vec<(NodeId, ResolveError)>,
}

impl ReconcileReport {
    /// User-visible warning, present whenever a connection was pruned
    #[must_use]
    pub fn warning(&self) -> Option<String> {
        match self.pruned.len() {
            0 => None,
            1 => Some(
                "A referenced sheet changed: 1 connection no longer matched and was removed"
                    .to_string(),
            ),
            n => Some(format!(
                "Referenced sheets changed: {n} connections no longer matched and were removed"
            )),
        }
    }
}

/// Resolves sheet-reference nodes against their referenced sheets
///
/// Fetched sheets are cached until [`Resolver::begin_pass`] or
/// [`Resolver::invalidate`].
pub struct Resolver {
    source: Arc<dyn SheetSource>,
    cache: Cache<SheetId, Arc<Sheet>>,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("cached", &self.cache.entry_count())
            .finish_non_exhaustive()
    }
}

impl Resolver {
    /// Create resolver over `source`
    #[must_use]
    pub fn new(source: Arc<dyn SheetSource>) -> Self {
        Self::with_capacity(source, DEFAULT_CACHE_CAPACITY)
    }

    /// Create resolver with a custom cache size
    #[must_use]
    pub fn with_capacity(source: Arc<dyn SheetSource>, capacity: u64) -> Self {
        Self {
            source,
            cache: Cache::new(capacity),
        }
    }

    /// Start a new load pass, forgetting every fetched sheet
    pub fn begin_pass(&self) {
        self.cache.invalidate_all();
    }

    /// Forget one fetched sheet
    pub async fn invalidate(&self, id: SheetId) {
        self.cache.invalidate(&id).await;
    }

    /// Fetch a referenced sheet through the pass cache
    ///
    /// # Errors
    /// - `ResolveError::Fetch` when the source fails
    pub async fn fetch(&self, id: SheetId) -> Result<Arc<Sheet>, ResolveError> {
        let source = Arc::clone(&self.source);
        self.cache
            .try_get_with(id, async move { source.fetch_sheet(id).await.map(Arc::new) })
            .await
            .map_err(|e| (*e).clone())
    }

    /// Expected ports for one reference node
    ///
    /// # Errors
    /// - `ResolveError::NotAReference` when `node` is not a sheet reference
    /// - `ResolveError::NoTarget` when no target sheet is set
    /// - `ResolveError::Fetch` when the target cannot be fetched
    pub async fn expected_for(&self, node: &Node) -> Result<ExpectedPorts, ResolveError> {
        if node.kind != NodeKind::Sheet {
            return Err(ResolveError::NotAReference(node.id));
        }
        let target = node
            .referenced_sheet()
            .ok_or(ResolveError::NoTarget(node.id))?;
        let sheet = self.fetch(target).await?;
        Ok(ExpectedPorts::of(&sheet.graph))
    }

    /// Compute port updates for every reference node in `graph`
    ///
    /// References without a target are skipped. Fetch failures are recorded
    /// per node and not retried.
    pub async fn plan(&self, graph: &Graph) -> ReconcilePlan {
        let mut plan = ReconcilePlan::default();
        for node in graph.nodes_of_kind(NodeKind::Sheet) {
            if node.referenced_sheet().is_none() {
                continue;
            }
            match self.expected_for(node).await {
                Ok(expected) if expected.differs_from(node) => {
                    plan.updates.push((node.id, expected));
                }
                Ok(_) => {}
                Err(e) => {
                    debug!(node = %node.id, error = %e, "reference not reconciled");
                    plan.failures.push((node.id, e));
                }
            }
        }
        plan
    }

    /// Plan and apply reconciliation on an owned graph in one pass
    pub async fn reconcile(&self, graph: &mut Graph) -> ReconcileReport {
        self.begin_pass();
        let plan = self.plan(graph).await;
        plan.apply(graph)
    }

    /// Resolve the inputs of the last reference in `path`, descending level by level
    ///
    /// `path[0]` is a reference node in `root`; each following entry is a
    /// reference node inside the sheet referenced by the previous one. Values
    /// resolved at one level become the input overrides of the next, matched
    /// by the referenced sheet's input labels. `last` only applies to the root
    /// level.
    ///
    /// # Errors
    /// - `ResolveError::Cycle` when the path revisits a sheet
    /// - any error from fetching or resolving a level
    pub async fn resolve_nested_inputs(
        &self,
        root: &Graph,
        root_sheet: Option<SheetId>,
        path: &[NodeId],
        last: Option<&CalculationResult>,
        pending: &HashMap<NodeId, Value>,
    ) -> Result<Vec<ResolvedInput>, ResolveError> {
        let Some((&first, rest)) = path.split_first() else {
            return Ok(Vec::new());
        };

        let mut visited: HashSet<SheetId> = root_sheet.into_iter().collect();
        let mut resolved = resolve_inputs(root, first, last, pending)?;
        let mut holder = root
            .node(first)
            .ok_or(ResolveError::NotAReference(first))?
            .clone();

        for &next in rest {
            let target = holder
                .referenced_sheet()
                .ok_or(ResolveError::NoTarget(holder.id))?;
            if !visited.insert(target) {
                return Err(ResolveError::Cycle(target));
            }
            let sheet = self.fetch(target).await?;

            let overrides: HashMap<NodeId, Value> = resolved
                .iter()
                .filter_map(|input| {
                    let value = input.value.clone()?;
                    let node = sheet.graph.find_by_label(NodeKind::Input, &input.port)?;
                    Some((node.id, value))
                })
                .collect();

            resolved = resolve_inputs(&sheet.graph, next, None, &overrides)?;
            holder = sheet
                .graph
                .node(next)
                .ok_or(ResolveError::NotAReference(next))?
                .clone();
        }

        if let Some(target) = holder.referenced_sheet() {
            if visited.contains(&target) {
                return Err(ResolveError::Cycle(target));
            }
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sheet_graph::{NewNode, Port, PortSide};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Sheets {
        sheets: Mutex<HashMap<SheetId, Sheet>>,
        fetches: AtomicUsize,
    }

    impl Sheets {
        fn put(&self, sheet: Sheet) {
            self.sheets.lock().unwrap().insert(sheet.id, sheet);
        }
    }

    #[async_trait]
    impl SheetSource for Sheets {
        async fn fetch_sheet(&self, id: SheetId) -> Result<Sheet, ResolveError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.sheets
                .lock()
                .unwrap()
                .get(&id)
                .cloned()
                .ok_or_else(|| ResolveError::fetch(id, "404 Not Found"))
        }
    }

    fn callee(inputs: &[&str], outputs: &[&str]) -> Sheet {
        let mut sheet = Sheet::new("callee");
        for label in inputs {
            sheet.graph.add_node(NewNode::new(NodeKind::Input, *label));
        }
        for label in outputs {
            sheet.graph.add_node(NewNode::new(NodeKind::Output, *label));
        }
        sheet
    }

    fn reference(graph: &mut Graph, target: SheetId, inputs: &[&str]) -> NodeId {
        let ports = inputs.iter().map(|name| Port::generic(*name)).collect();
        graph.add_node(
            NewNode::new(NodeKind::Sheet, "ref")
                .with_data(json!({"sheetId": target.to_string()}))
                .with_inputs(ports),
        )
    }

    #[tokio::test]
    async fn renamed_input_prunes_its_connection() {
        let sheets = Arc::new(Sheets::default());
        let target = callee(&["a", "c"], &[]);
        let target_id = target.id;
        sheets.put(target);

        let mut graph = Graph::new();
        let r = reference(&mut graph, target_id, &["a", "b"]);
        let x = graph.add_node(NewNode::new(NodeKind::Constant, "x"));
        let y = graph.add_node(NewNode::new(NodeKind::Constant, "y"));
        graph.connect(x, "value", r, "a").unwrap();
        let stale = graph.connect(y, "value", r, "b").unwrap().connection;

        let resolver = Resolver::new(sheets);
        let report = resolver.reconcile(&mut graph).await;

        assert_eq!(report.updated, vec![r]);
        assert_eq!(report.pruned, vec![stale]);
        assert!(report.warning().is_some());
        let names: Vec<_> = graph.node(r).unwrap().ports(PortSide::Input).names().collect();
        assert_eq!(names, vec!["a", "c"]);
        assert_eq!(graph.connection_count(), 1);
    }

    #[tokio::test]
    async fn matching_ports_leave_graph_alone() {
        let sheets = Arc::new(Sheets::default());
        let target = callee(&["a"], &[]);
        let target_id = target.id;
        sheets.put(target);

        let mut graph = Graph::new();
        reference(&mut graph, target_id, &["a"]);
        let before = graph.clone();

        let report = Resolver::new(sheets).reconcile(&mut graph).await;
        assert!(report.updated.is_empty());
        assert!(report.warning().is_none());
        assert_eq!(graph, before);
    }

    #[tokio::test]
    async fn fetch_failure_is_reported_per_node() {
        let sheets = Arc::new(Sheets::default());
        let present = callee(&["a"], &[]);
        let present_id = present.id;
        sheets.put(present);

        let mut graph = Graph::new();
        let missing = reference(&mut graph, SheetId::new(), &[]);
        let ok = reference(&mut graph, present_id, &[]);

        let report = Resolver::new(sheets).reconcile(&mut graph).await;
        assert_eq!(report.updated, vec![ok]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, missing);
    }

    #[tokio::test]
    async fn one_fetch_per_sheet_per_pass() {
        let sheets = Arc::new(Sheets::default());
        let target = callee(&["a"], &[]);
        let target_id = target.id;
        sheets.put(target);

        let mut graph = Graph::new();
        reference(&mut graph, target_id, &[]);
        reference(&mut graph, target_id, &[]);

        let resolver = Resolver::new(Arc::clone(&sheets) as Arc<dyn SheetSource>);
        resolver.reconcile(&mut graph).await;
        assert_eq!(sheets.fetches.load(Ordering::SeqCst), 1);

        resolver.begin_pass();
        resolver.fetch(target_id).await.unwrap();
        assert_eq!(sheets.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn values_flow_down_two_levels() {
        let sheets = Arc::new(Sheets::default());

        let inner = callee(&["depth"], &["out"]);
        let inner_id = inner.id;
        sheets.put(inner);

        // middle sheet: input "width" feeds a reference to inner's "depth"
        let mut middle = Sheet::new("middle");
        let width = middle.graph.add_node(NewNode::new(NodeKind::Input, "width"));
        let inner_ref = reference(&mut middle.graph, inner_id, &["depth"]);
        middle.graph.connect(width, "value", inner_ref, "depth").unwrap();
        let middle_id = middle.id;
        sheets.put(middle);

        let mut root = Graph::new();
        let k = root.add_node(
            NewNode::new(NodeKind::Constant, "k").with_data(json!({"value": 7})),
        );
        let middle_ref = reference(&mut root, middle_id, &["width"]);
        root.connect(k, "value", middle_ref, "width").unwrap();

        let resolver = Resolver::new(sheets);
        let resolved = resolver
            .resolve_nested_inputs(&root, None, &[middle_ref, inner_ref], None, &HashMap::new())
            .await
            .unwrap();

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].port, "depth");
        assert_eq!(resolved[0].value, Some(json!(7)));
    }

    #[tokio::test]
    async fn self_reference_is_a_cycle() {
        let sheets = Arc::new(Sheets::default());
        let mut looping = Sheet::new("loop");
        let looping_id = looping.id;
        let inner_ref = reference(&mut looping.graph, looping_id, &[]);
        sheets.put(looping.clone());

        let resolver = Resolver::new(sheets);
        let err = resolver
            .resolve_nested_inputs(
                &looping.graph,
                Some(looping_id),
                &[inner_ref],
                None,
                &HashMap::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err, ResolveError::Cycle(looping_id));
    }
}

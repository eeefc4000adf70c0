//! Testing utilities for the sheet workspace
//!
//! Shared fixtures and in-memory fakes of the evaluator, lease server and
//! sheet store.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{json, Value};
use sheet_calc::{
    CalcError, Evaluator, LabeledInputs, PreviewRequest, SweepRequest, SweepResponse,
};
use sheet_client::{ClientError, SheetStore};
use sheet_graph::{
    CalculationResult, Graph, NewNode, NodeId, NodeKind, NodeResult, Port, Sheet, SheetId,
};
use sheet_lease::{Lease, LeaseApi, LeaseError, SessionContext};
use sheet_nested::{ResolveError, SheetSource};
use sheet_sweep::SweepData;
use std::collections::HashMap;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Ids of the nodes in [`sample_sheet`]
#[derive(Debug, Clone, Copy)]
pub struct SampleIds {
    pub rate: NodeId,
    pub base: NodeId,
    pub product: NodeId,
    pub total: NodeId,
}

/// `rate` (input) and `base` (constant) feed `product`, which feeds `total`
pub fn sample_sheet() -> (Sheet, SampleIds) {
    let mut sheet = Sheet::new("sample");
    let graph = &mut sheet.graph;

    let rate = graph.add_node(NewNode::new(NodeKind::Input, "rate").with_data(json!({"value": 2})));
    let base = graph.add_node(NewNode::new(NodeKind::Constant, "base").with_data(json!({"value": 10})));
    let product = graph.add_node(
        NewNode::new(NodeKind::Function, "product")
            .with_inputs(vec![Port::generic("a"), Port::generic("b")])
            .with_data(json!({"code": "a * b"})),
    );
    let total = graph.add_node(NewNode::new(NodeKind::Output, "total"));

    graph.connect(rate, "value", product, "a").unwrap();
    graph.connect(base, "value", product, "b").unwrap();
    graph.connect(product, "result", total, "value").unwrap();

    (
        sheet,
        SampleIds {
            rate,
            base,
            product,
            total,
        },
    )
}

/// Sheet exposing `inputs` as input nodes and `outputs` as output nodes
pub fn callee_sheet(inputs: &[&str], outputs: &[&str]) -> Sheet {
    let mut sheet = Sheet::new("callee");
    for label in inputs {
        sheet.graph.add_node(NewNode::new(NodeKind::Input, *label));
    }
    for label in outputs {
        sheet.graph.add_node(NewNode::new(NodeKind::Output, *label));
    }
    sheet
}

/// Add a sheet-reference node to `target` with generic `inputs` and `outputs`
pub fn add_reference(graph: &mut Graph, target: SheetId, inputs: &[&str], outputs: &[&str]) -> NodeId {
    graph.add_node(
        NewNode::new(NodeKind::Sheet, "reference")
            .with_data(json!({"sheetId": target.to_string()}))
            .with_inputs(inputs.iter().map(|p| Port::generic(*p)).collect())
            .with_outputs(outputs.iter().map(|p| Port::generic(*p)).collect()),
    )
}

/// Result reporting `value` on `node`'s `value` output
pub fn result_with(entries: &[(NodeId, Value)]) -> CalculationResult {
    let mut result = CalculationResult::default();
    for (id, value) in entries {
        let mut entry = NodeResult::default();
        entry.outputs.insert("value".to_string(), value.clone());
        result.results.insert(*id, entry);
    }
    result
}

/// Result reporting an error on `node`
pub fn result_with_error(node: NodeId, message: &str) -> CalculationResult {
    let mut result = CalculationResult::default();
    result.results.insert(
        node,
        NodeResult {
            valid: false,
            error: Some(message.to_string()),
            ..NodeResult::default()
        },
    );
    result
}

// ---------------------------------------------------------------------------
// Sheet store
// ---------------------------------------------------------------------------

/// In-memory sheet store and source
#[derive(Debug, Default)]
pub struct MemorySheets {
    sheets: Mutex<HashMap<SheetId, Sheet>>,
    failing_saves: Mutex<Vec<ClientError>>,
    saves: Mutex<usize>,
    fetches: Mutex<usize>,
}

impl MemorySheets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(self, sheet: Sheet) -> Self {
        self.insert(sheet);
        self
    }

    pub fn insert(&self, sheet: Sheet) {
        self.sheets.lock().insert(sheet.id, sheet);
    }

    pub fn get(&self, id: SheetId) -> Option<Sheet> {
        self.sheets.lock().get(&id).cloned()
    }

    /// Fail the next saves with `errors`, in order
    pub fn fail_saves(&self, errors: Vec<ClientError>) {
        let mut failing = self.failing_saves.lock();
        *failing = errors;
        failing.reverse();
    }

    /// Save attempts so far, failed ones included
    pub fn save_attempts(&self) -> usize {
        *self.saves.lock()
    }

    pub fn fetch_count(&self) -> usize {
        *self.fetches.lock()
    }
}

#[async_trait]
impl SheetStore for MemorySheets {
    async fn load(&self, id: SheetId) -> Result<Sheet, ClientError> {
        *self.fetches.lock() += 1;
        self.get(id).ok_or_else(|| ClientError::Status {
            status: 404,
            message: format!("sheet {id} not found"),
        })
    }

    async fn save(&self, sheet: &Sheet) -> Result<(), ClientError> {
        *self.saves.lock() += 1;
        if let Some(err) = self.failing_saves.lock().pop() {
            return Err(err);
        }
        self.insert(sheet.clone());
        Ok(())
    }
}

#[async_trait]
impl SheetSource for MemorySheets {
    async fn fetch_sheet(&self, id: SheetId) -> Result<Sheet, ResolveError> {
        self.load(id).await.map_err(|e| ResolveError::fetch(id, e))
    }
}

// ---------------------------------------------------------------------------
// Evaluator
// ---------------------------------------------------------------------------

/// Evaluator answering from canned results and recording requests
#[derive(Debug, Default)]
pub struct FakeEvaluator {
    result: Mutex<CalculationResult>,
    failure: Mutex<Option<CalcError>>,
    sweep: Mutex<SweepResponse>,
    previews: Mutex<Vec<PreviewRequest>>,
    calculations: Mutex<Vec<(SheetId, LabeledInputs)>>,
    sweeps: Mutex<Vec<SweepRequest>>,
}

impl FakeEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(&self, result: CalculationResult) {
        *self.result.lock() = result;
        *self.failure.lock() = None;
    }

    pub fn fail(&self, error: CalcError) {
        *self.failure.lock() = Some(error);
    }

    pub fn answer_sweep(&self, data: SweepData) {
        *self.sweep.lock() = SweepResponse {
            results: data,
            error: None,
        };
    }

    pub fn preview_count(&self) -> usize {
        self.previews.lock().len()
    }

    pub fn previews(&self) -> Vec<PreviewRequest> {
        self.previews.lock().clone()
    }

    pub fn last_preview(&self) -> Option<PreviewRequest> {
        self.previews.lock().last().cloned()
    }

    pub fn calculations(&self) -> Vec<(SheetId, LabeledInputs)> {
        self.calculations.lock().clone()
    }

    pub fn sweeps(&self) -> Vec<SweepRequest> {
        self.sweeps.lock().clone()
    }

    fn outcome(&self) -> Result<CalculationResult, CalcError> {
        match self.failure.lock().clone() {
            Some(err) => Err(err),
            None => Ok(self.result.lock().clone()),
        }
    }
}

#[async_trait]
impl Evaluator for FakeEvaluator {
    async fn calculate(
        &self,
        sheet: SheetId,
        inputs: &LabeledInputs,
    ) -> Result<CalculationResult, CalcError> {
        self.calculations.lock().push((sheet, inputs.clone()));
        self.outcome()
    }

    async fn preview(&self, request: &PreviewRequest) -> Result<CalculationResult, CalcError> {
        self.previews.lock().push(request.clone());
        self.outcome()
    }

    async fn sweep(
        &self,
        _sheet: SheetId,
        request: &SweepRequest,
    ) -> Result<SweepResponse, CalcError> {
        self.sweeps.lock().push(request.clone());
        if let Some(err) = self.failure.lock().clone() {
            return Err(err);
        }
        Ok(self.sweep.lock().clone())
    }
}

// ---------------------------------------------------------------------------
// Lease server
// ---------------------------------------------------------------------------

/// In-memory lease server
#[derive(Debug, Default)]
pub struct FakeLeaseServer {
    leases: Mutex<HashMap<SheetId, Lease>>,
    transport_failures: Mutex<usize>,
    fail_release: Mutex<bool>,
    acquires: Mutex<usize>,
    peeks: Mutex<usize>,
    releases: Mutex<usize>,
    peek_delay: Mutex<Option<Duration>>,
}

impl FakeLeaseServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `ctx` the holder, as if another session acquired it
    pub fn seize(&self, sheet: SheetId, ctx: &SessionContext) {
        self.leases.lock().insert(sheet, Lease::new(sheet, ctx));
    }

    /// Drop the lease, as if it expired
    pub fn expire(&self, sheet: SheetId) {
        self.leases.lock().remove(&sheet);
    }

    pub fn holder(&self, sheet: SheetId) -> Option<Lease> {
        self.leases.lock().get(&sheet).cloned()
    }

    /// Fail the next `n` requests with a transport error
    pub fn fail_next(&self, n: usize) {
        *self.transport_failures.lock() = n;
    }

    /// Answer peeks after `delay` with the holder seen when the peek arrived
    pub fn delay_peeks(&self, delay: Duration) {
        *self.peek_delay.lock() = Some(delay);
    }

    pub fn fail_releases(&self) {
        *self.fail_release.lock() = true;
    }

    pub fn acquire_count(&self) -> usize {
        *self.acquires.lock()
    }

    pub fn peek_count(&self) -> usize {
        *self.peeks.lock()
    }

    pub fn release_count(&self) -> usize {
        *self.releases.lock()
    }

    fn transport(&self) -> Result<(), LeaseError> {
        let mut remaining = self.transport_failures.lock();
        if *remaining > 0 {
            *remaining -= 1;
            return Err(LeaseError::Transport("connection reset".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl LeaseApi for FakeLeaseServer {
    async fn peek(&self, sheet: SheetId) -> Result<Option<Lease>, LeaseError> {
        *self.peeks.lock() += 1;
        self.transport()?;
        let seen = self.holder(sheet);
        let delay = *self.peek_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(seen)
    }

    async fn acquire(&self, sheet: SheetId, ctx: &SessionContext) -> Result<Lease, LeaseError> {
        *self.acquires.lock() += 1;
        self.transport()?;
        let mut leases = self.leases.lock();
        match leases.get_mut(&sheet) {
            Some(lease) if lease.is_held_by(ctx) => {
                lease.last_heartbeat = Utc::now();
                Ok(lease.clone())
            }
            Some(lease) => Err(LeaseError::Locked {
                holder: lease.user.clone(),
            }),
            None => {
                let lease = Lease::new(sheet, ctx);
                leases.insert(sheet, lease.clone());
                Ok(lease)
            }
        }
    }

    async fn release(&self, sheet: SheetId, ctx: &SessionContext) -> Result<(), LeaseError> {
        *self.releases.lock() += 1;
        if *self.fail_release.lock() {
            return Err(LeaseError::Transport("release refused".to_string()));
        }
        let mut leases = self.leases.lock();
        if leases.get(&sheet).is_some_and(|l| l.is_held_by(ctx)) {
            leases.remove(&sheet);
        }
        Ok(())
    }

    async fn force(&self, sheet: SheetId, ctx: &SessionContext) -> Result<Lease, LeaseError> {
        self.transport()?;
        let lease = Lease::new(sheet, ctx);
        self.leases.lock().insert(sheet, lease.clone());
        Ok(lease)
    }
}

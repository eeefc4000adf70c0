//! Evaluator seam and request payloads

use crate::error::CalcError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sheet_graph::{CalculationResult, Graph, NodeId, NodeKind, SheetId};
use sheet_sweep::SweepData;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Pending input overrides keyed by input node id
pub type PendingInputs = HashMap<NodeId, Value>;

/// Wire form of one input value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputValue {
    /// Value
    pub value: Value,
}

impl InputValue {
    /// Wrap a value
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self { value }
    }
}

/// Input values keyed by input node label
pub type LabeledInputs = BTreeMap<String, InputValue>;

/// Map pending overrides from node ids to input labels
///
/// Ids that are not input nodes of `graph` are dropped.
#[must_use]
pub fn labeled_overrides(graph: &Graph, pending: &PendingInputs) -> LabeledInputs {
    pending
        .iter()
        .filter_map(|(id, value)| match graph.node(*id) {
            Some(node) if node.kind == NodeKind::Input => {
                Some((node.label.clone(), InputValue::new(value.clone())))
            }
            _ => {
                debug!(node = %id, "dropping override for non-input node");
                None
            }
        })
        .collect()
}

/// Every input node's value, pending override first, keyed by label
///
/// Inputs without any value are left out.
#[must_use]
pub fn calculation_inputs(graph: &Graph, pending: &PendingInputs) -> LabeledInputs {
    graph
        .nodes_of_kind(NodeKind::Input)
        .filter_map(|node| {
            let value = pending.get(&node.id).or_else(|| node.current_value())?;
            Some((node.label.clone(), InputValue::new(value.clone())))
        })
        .collect()
}

/// Preview payload: the unsaved graph plus label-keyed overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewRequest {
    /// Overrides keyed by input label
    pub inputs: LabeledInputs,
    /// Full current graph
    pub graph: Graph,
}

impl PreviewRequest {
    /// Snapshot `graph` with `pending` mapped to labels
    #[must_use]
    pub fn build(graph: &Graph, pending: &PendingInputs) -> Self {
        Self {
            inputs: labeled_overrides(graph, pending),
            graph: graph.clone(),
        }
    }
}

/// Values swept over
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SweepValues {
    /// Evenly spaced range, both ends included
    Range {
        /// First value
        start: f64,
        /// Last value
        end: f64,
        /// Step
        increment: f64,
    },
    /// Explicit values
    Manual {
        /// Values in sweep order
        manual_values: Vec<Value>,
    },
}

/// Sweep request for one input node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRequest {
    /// Input node swept
    pub input_node_id: NodeId,
    /// Values taken by the input
    #[serde(flatten)]
    pub values: SweepValues,
    /// Outputs observed
    #[serde(default)]
    pub output_node_ids: Vec<NodeId>,
    /// Fixed values for the other inputs
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub input_overrides: BTreeMap<NodeId, Value>,
}

impl SweepRequest {
    /// Sweep `input` over `start..=end` in steps of `increment`
    ///
    /// # Errors
    /// - `CalcError::InvalidSweep` for non-finite bounds, a non-positive
    ///   increment or `start > end`
    pub fn range(input: NodeId, start: f64, end: f64, increment: f64) -> Result<Self, CalcError> {
        if !(start.is_finite() && end.is_finite() && increment.is_finite()) {
            return Err(CalcError::InvalidSweep("bounds must be finite".to_string()));
        }
        if increment <= 0.0 {
            return Err(CalcError::InvalidSweep("increment must be positive".to_string()));
        }
        if start > end {
            return Err(CalcError::InvalidSweep(format!(
                "start {start} is after end {end}"
            )));
        }
        Ok(Self::with_values(input, SweepValues::Range { start, end, increment }))
    }

    /// Sweep `input` over explicit values
    ///
    /// # Errors
    /// - `CalcError::InvalidSweep` when `values` is empty
    pub fn manual(input: NodeId, values: Vec<Value>) -> Result<Self, CalcError> {
        if values.is_empty() {
            return Err(CalcError::InvalidSweep("no values to sweep".to_string()));
        }
        Ok(Self::with_values(
            input,
            SweepValues::Manual {
                manual_values: values,
            },
        ))
    }

    fn with_values(input: NodeId, values: SweepValues) -> Self {
        Self {
            input_node_id: input,
            values,
            output_node_ids: Vec::new(),
            input_overrides: BTreeMap::new(),
        }
    }

    /// Set observed outputs
    #[inline]
    #[must_use]
    pub fn with_outputs(mut self, outputs: Vec<NodeId>) -> Self {
        self.output_node_ids = outputs;
        self
    }

    /// Pin other inputs; the swept input is never overridden
    #[must_use]
    pub fn with_overrides(mut self, overrides: &PendingInputs) -> Self {
        self.input_overrides = overrides
            .iter()
            .filter(|(id, _)| **id != self.input_node_id)
            .map(|(id, v)| (*id, v.clone()))
            .collect();
        self
    }

    /// Number of points the sweep evaluates
    #[must_use]
    pub fn point_count(&self) -> usize {
        match &self.values {
            SweepValues::Manual { manual_values } => manual_values.len(),
            SweepValues::Range {
                start,
                end,
                increment,
            } => {
                // Tolerate float drift on the last step
                let steps = ((end - start) / increment + 1e-9).floor();
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let steps = steps.max(0.0) as usize;
                steps + 1
            }
        }
    }
}

/// Sweep endpoint answer
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SweepResponse {
    /// Evaluated table
    #[serde(default)]
    pub results: SweepData,
    /// Failure message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SweepResponse {
    /// Results, or the reported error
    ///
    /// # Errors
    /// - `CalcError::Sweep` when the evaluator reported an error
    pub fn into_result(self) -> Result<SweepData, CalcError> {
        match self.error {
            Some(message) if !message.is_empty() => Err(CalcError::Sweep(message)),
            _ => Ok(self.results),
        }
    }
}

/// Remote evaluator
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Evaluate the saved sheet with label-keyed inputs
    async fn calculate(
        &self,
        sheet: SheetId,
        inputs: &LabeledInputs,
    ) -> Result<CalculationResult, CalcError>;

    /// Evaluate an unsaved graph
    async fn preview(&self, request: &PreviewRequest) -> Result<CalculationResult, CalcError>;

    /// Sweep one input of the saved sheet
    async fn sweep(&self, sheet: SheetId, request: &SweepRequest)
        -> Result<SweepResponse, CalcError>;
}

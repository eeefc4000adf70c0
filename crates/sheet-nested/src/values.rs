//! Values feeding the input ports of a reference node

use crate::error::ResolveError;
use serde_json::Value;
use sheet_graph::{CalculationResult, Graph, NodeId, NodeKind, PortSide};
use std::collections::HashMap;

/// Where a resolved value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    /// Last calculation result of the upstream port
    Live,
    /// Pending override of an upstream input node
    Proposed,
    /// Upstream node's control or stored value
    Static,
    /// Nothing drives the port, or the driver has no value
    Unconnected,
}

/// Value resolved for one input port
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedInput {
    /// Input port name
    pub port: String,
    /// Resolved value
    pub value: Option<Value>,
    /// Origin of `value`
    pub source: ValueSource,
    /// Node driving the port
    pub upstream: Option<NodeId>,
}

/// Resolve the value feeding each input port of `target`, in port order
///
/// Per port the first available of: the last result for the upstream port,
/// a pending override when the upstream is an `input` node, the upstream
/// node's current value.
///
/// # Errors
/// - `ResolveError::NotAReference` when `target` is missing or not a sheet reference
pub fn resolve_inputs(
    graph: &Graph,
    target: NodeId,
    last: Option<&CalculationResult>,
    pending: &HashMap<NodeId, Value>,
) -> Result<Vec<ResolvedInput>, ResolveError> {
    let node = graph
        .node(target)
        .filter(|n| n.kind == NodeKind::Sheet)
        .ok_or(ResolveError::NotAReference(target))?;

    let resolved = node
        .ports(PortSide::Input)
        .names()
        .map(|port| {
            let Some(connection) = graph.driver_of(target, port) else {
                return ResolvedInput {
                    port: port.to_string(),
                    value: None,
                    source: ValueSource::Unconnected,
                    upstream: None,
                };
            };
            let upstream = graph.node(connection.source);

            let live = last
                .and_then(|r| r.output(connection.source, &connection.source_port))
                .map(|v| (v.clone(), ValueSource::Live));
            let proposed = || {
                upstream
                    .filter(|n| n.kind == NodeKind::Input)
                    .and_then(|n| pending.get(&n.id))
                    .map(|v| (v.clone(), ValueSource::Proposed))
            };
            let fixed = || {
                upstream
                    .and_then(|n| n.current_value())
                    .map(|v| (v.clone(), ValueSource::Static))
            };

            let (value, source) = match live.or_else(proposed).or_else(fixed) {
                Some((value, source)) => (Some(value), source),
                None => (None, ValueSource::Unconnected),
            };
            ResolvedInput {
                port: port.to_string(),
                value,
                source,
                upstream: Some(connection.source),
            }
        })
        .collect();
    Ok(resolved)
}

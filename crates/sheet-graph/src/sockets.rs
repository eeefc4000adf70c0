//! Socket synchronization and compatibility
//!
//! Socket sync reconciles a node's port list with a requested list: removed
//! ports lose their connections first, new ports are created, and the final
//! order matches the request exactly.

use crate::error::GraphError;
use crate::graph::Graph;
use crate::ids::NodeId;
use crate::model::{Connection, NodeKind, Port, PortSide, SocketKind};
use std::collections::HashSet;

impl Graph {
    /// Reconcile the ports of `id` with the requested lists
    ///
    /// `None` leaves that side untouched. Returns the connections pruned
    /// because their port disappeared.
    ///
    /// # Errors
    /// - `GraphError::NodeNotFound` for an unknown node
    pub fn sync_sockets(
        &mut self,
        id: NodeId,
        inputs: Option<&[Port]>,
        outputs: Option<&[Port]>,
    ) -> Result<Vec<Connection>, GraphError> {
        if !self.contains_node(id) {
            return Err(GraphError::NodeNotFound(id));
        }

        let mut pruned = Vec::new();
        if let Some(requested) = inputs {
            pruned.extend(self.sync_side(id, PortSide::Input, requested));
        }
        if let Some(requested) = outputs {
            pruned.extend(self.sync_side(id, PortSide::Output, requested));
        }

        if !pruned.is_empty() {
            tracing::debug!(node = %id, pruned = pruned.len(), "socket sync pruned connections");
        }
        Ok(pruned)
    }

    fn sync_side(&mut self, id: NodeId, side: PortSide, requested: &[Port]) -> Vec<Connection> {
        let wanted: HashSet<&str> = requested.iter().map(|p| p.name.as_str()).collect();
        let stale: Vec<String> = self
            .nodes
            .get(&id)
            .map(|n| {
                n.ports(side)
                    .names()
                    .filter(|name| !wanted.contains(name))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        // Connections go before the port so the connection set never dangles
        let mut pruned = Vec::new();
        for name in &stale {
            let doomed: Vec<_> = self
                .connections
                .values()
                .filter(|c| c.uses_port(id, side, name))
                .map(|c| c.id)
                .collect();
            for conn_id in doomed {
                if let Some(conn) = self.connections.shift_remove(&conn_id) {
                    pruned.push(conn);
                }
            }
        }

        if let Some(node) = self.nodes.get_mut(&id) {
            let ports = node.ports_mut(side);
            for name in &stale {
                ports.remove(name);
            }
            for port in requested {
                // Insert also refreshes the socket tag of kept ports
                ports.insert(port.clone());
            }
            let order: Vec<&str> = requested.iter().map(|p| p.name.as_str()).collect();
            ports.reorder(&order);
        }

        pruned
    }
}

/// Check that an output port of `source_kind` may feed an input port of `target_kind`
///
/// # Errors
/// - `GraphError::Incompatible` describing the rejected pairing
pub fn check_compatible(
    source_kind: NodeKind,
    source_socket: SocketKind,
    target_kind: NodeKind,
    target_socket: SocketKind,
) -> Result<(), GraphError> {
    if !source_kind.produces_values() {
        return Err(GraphError::Incompatible(format!(
            "{source_kind} nodes do not produce values"
        )));
    }
    if !target_kind.consumes_values() {
        return Err(GraphError::Incompatible(format!(
            "{target_kind} nodes do not accept values"
        )));
    }

    match (source_socket, target_socket) {
        (SocketKind::SheetIn, _) | (_, SocketKind::SheetOut) => Err(GraphError::Incompatible(
            "sheet sockets are used in the wrong direction".to_string(),
        )),
        (SocketKind::Generic | SocketKind::SheetOut, SocketKind::Generic | SocketKind::SheetIn) => {
            Ok(())
        }
    }
}

/// Socket tag for a port of a sheet-reference node
#[inline]
#[must_use]
pub fn sheet_socket(side: PortSide) -> SocketKind {
    match side {
        PortSide::Input => SocketKind::SheetIn,
        PortSide::Output => SocketKind::SheetOut,
    }
}

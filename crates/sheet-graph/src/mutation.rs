//! Structural mutation operations
//!
//! Every operation keeps the connection set consistent with the port sets:
//! a connection never outlives the port it is bound to. Duplicate input and
//! output labels are rejected, never coerced, except by [`Graph::add_node`]
//! which suffixes the label before inserting.

use crate::error::GraphError;
use crate::graph::Graph;
use crate::ids::{ConnectionId, NodeId};
use crate::model::{Connection, ControlMode, Node, NodeKind, Port, PortSide, Position};
use crate::sockets::check_compatible;
use serde_json::Value;

/// Arguments for [`Graph::add_node`]
#[derive(Debug, Clone, PartialEq)]
pub struct NewNode {
    /// Kind tag
    pub kind: NodeKind,
    /// Requested label (may be suffixed)
    pub label: String,
    /// Input ports in order
    pub inputs: Vec<Port>,
    /// Output ports in order
    pub outputs: Vec<Port>,
    /// Kind-specific payload
    pub data: Value,
    /// Canvas position
    pub position: Option<Position>,
}

impl NewNode {
    /// Node of `kind` with its default ports
    #[must_use]
    pub fn new(kind: NodeKind, label: impl Into<String>) -> Self {
        let (inputs, outputs) = kind.default_ports();
        Self {
            kind,
            label: label.into(),
            inputs,
            outputs,
            data: Value::Null,
            position: None,
        }
    }

    /// Node of `kind` with the kind's default label
    #[must_use]
    pub fn of_kind(kind: NodeKind) -> Self {
        Self::new(kind, kind.default_label())
    }

    /// Set input ports
    #[must_use]
    pub fn with_inputs(mut self, inputs: Vec<Port>) -> Self {
        self.inputs = inputs;
        self
    }

    /// Set output ports
    #[must_use]
    pub fn with_outputs(mut self, outputs: Vec<Port>) -> Self {
        self.outputs = outputs;
        self
    }

    /// Set payload
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Set position
    #[must_use]
    pub fn at(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }
}

/// Partial update for [`Graph::update_node`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodePatch {
    /// New label
    pub label: Option<String>,
    /// New kind
    pub kind: Option<NodeKind>,
    /// New payload
    pub data: Option<Value>,
    /// Requested input ports (socket sync)
    pub inputs: Option<Vec<Port>>,
    /// Requested output ports (socket sync)
    pub outputs: Option<Vec<Port>>,
}

impl NodePatch {
    /// Empty patch
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Change label
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Change kind
    #[must_use]
    pub fn kind(mut self, kind: NodeKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Replace payload
    #[must_use]
    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Request input ports
    #[must_use]
    pub fn inputs(mut self, inputs: Vec<Port>) -> Self {
        self.inputs = Some(inputs);
        self
    }

    /// Request output ports
    #[must_use]
    pub fn outputs(mut self, outputs: Vec<Port>) -> Self {
        self.outputs = Some(outputs);
        self
    }

    /// Whether the patch changes anything port-related
    #[inline]
    #[must_use]
    pub fn touches_ports(&self) -> bool {
        self.inputs.is_some() || self.outputs.is_some()
    }
}

/// Node removed by [`Graph::remove_node`]
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedNode {
    /// Snapshot of the node
    pub node: Node,
    /// Position of the node in graph order
    pub index: usize,
    /// Connections that touched it
    pub connections: Vec<Connection>,
}

/// Outcome of [`Graph::update_node`]
#[derive(Debug, Clone, PartialEq)]
pub struct NodeUpdate {
    /// Node before the patch
    pub before: Node,
    /// Node after the patch
    pub after: Node,
    /// Connections pruned by socket sync
    pub pruned: Vec<Connection>,
}

/// Outcome of [`Graph::connect`]
#[derive(Debug, Clone, PartialEq)]
pub struct Connected {
    /// New connection
    pub connection: Connection,
    /// Previous driver of the target input, now removed
    pub replaced: Option<Connection>,
}

impl Graph {
    /// Whether `label` is used by another node of `kind`
    #[must_use]
    pub fn label_taken(&self, kind: NodeKind, label: &str, exclude: Option<NodeId>) -> bool {
        self.nodes
            .values()
            .any(|n| n.kind == kind && n.label == label && Some(n.id) != exclude)
    }

    /// First of `base`, `base (1)`, `base (2)`, … not used by a node of `kind`
    #[must_use]
    pub fn unique_label(&self, kind: NodeKind, base: &str, exclude: Option<NodeId>) -> String {
        if !self.label_taken(kind, base, exclude) {
            return base.to_string();
        }
        (1u32..)
            .map(|n| format!("{base} ({n})"))
            .find(|candidate| !self.label_taken(kind, candidate, exclude))
            .unwrap_or_else(|| base.to_string())
    }

    /// Add a node under a fresh id
    ///
    /// Input, output and constant labels that collide with an existing node
    /// of the same kind are suffixed `" (n)"` until unique.
    pub fn add_node(&mut self, request: NewNode) -> NodeId {
        let label = if request.kind.suffixes_duplicate_labels() {
            self.unique_label(request.kind, &request.label, None)
        } else {
            request.label
        };

        let node = Node {
            id: NodeId::new(),
            kind: request.kind,
            label,
            inputs: request.inputs.into(),
            outputs: request.outputs.into(),
            data: request.data,
            position: request.position,
            error: None,
            control: None,
        };
        let id = node.id;
        tracing::trace!(node = %id, kind = %node.kind, label = %node.label, "add node");
        self.nodes.insert(id, node);
        id
    }

    /// Insert a fully specified node without relabeling
    ///
    /// # Errors
    /// - `GraphError::NodeExists` if the id is taken
    /// - `GraphError::DuplicateLabel` for a colliding input/output label
    pub fn add_node_exact(&mut self, node: Node) -> Result<NodeId, GraphError> {
        if self.contains_node(node.id) {
            return Err(GraphError::NodeExists(node.id));
        }
        self.ensure_label_free(node.kind, &node.label, None)?;
        let id = node.id;
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Remove a node and every connection touching it
    ///
    /// # Errors
    /// - `GraphError::NodeNotFound` for an unknown node
    pub fn remove_node(&mut self, id: NodeId) -> Result<RemovedNode, GraphError> {
        let index = self.nodes.get_index_of(&id).ok_or(GraphError::NodeNotFound(id))?;

        let touching: Vec<ConnectionId> = self
            .connections
            .values()
            .filter(|c| c.touches(id))
            .map(|c| c.id)
            .collect();
        let connections = touching
            .into_iter()
            .filter_map(|cid| self.connections.shift_remove(&cid))
            .collect();

        let node = self
            .nodes
            .shift_remove(&id)
            .ok_or(GraphError::NodeNotFound(id))?;

        Ok(RemovedNode {
            node,
            index,
            connections,
        })
    }

    /// Whether removing `id` can break sheets that reference this one
    #[must_use]
    pub fn removal_needs_confirmation(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|n| n.kind.requires_unique_label())
    }

    /// Whether renaming `id` to `label` should be confirmed by the user
    ///
    /// Renaming an input/output changes the calling signature of the sheet,
    /// unless the old label is still the just-created default.
    #[must_use]
    pub fn rename_needs_confirmation(&self, id: NodeId, label: &str) -> bool {
        self.node(id).is_some_and(|n| {
            n.kind.requires_unique_label()
                && n.label != label
                && !is_default_label(n.kind, &n.label)
        })
    }

    /// Apply a partial update
    ///
    /// Port lists go through socket sync. A kind change re-initializes the
    /// value control.
    ///
    /// # Errors
    /// - `GraphError::NodeNotFound` for an unknown node
    /// - `GraphError::DuplicateLabel` if the result would duplicate an input/output label
    pub fn update_node(&mut self, id: NodeId, patch: NodePatch) -> Result<NodeUpdate, GraphError> {
        let before = self.node(id).cloned().ok_or(GraphError::NodeNotFound(id))?;

        let kind = patch.kind.unwrap_or(before.kind);
        let label = patch.label.clone().unwrap_or_else(|| before.label.clone());
        if kind != before.kind || label != before.label {
            self.ensure_label_free(kind, &label, Some(id))?;
        }

        let pruned = self.sync_sockets(id, patch.inputs.as_deref(), patch.outputs.as_deref())?;

        let node = self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))?;
        node.label = label;
        if let Some(data) = patch.data {
            node.data = data;
        }
        if kind != node.kind {
            node.kind = kind;
            reinit_control(node);
        }
        let after = node.clone();

        Ok(NodeUpdate {
            before,
            after,
            pruned,
        })
    }

    /// Clone a node under a fresh id
    ///
    /// The copy takes the live control value when present. It is placed at
    /// the original position plus `offset`, or at `fallback` when the
    /// original has no position.
    ///
    /// # Errors
    /// - `GraphError::NodeNotFound` for an unknown node
    pub fn duplicate_node(
        &mut self,
        id: NodeId,
        offset: (f64, f64),
        fallback: Position,
    ) -> Result<NodeId, GraphError> {
        let source = self.node(id).cloned().ok_or(GraphError::NodeNotFound(id))?;

        let label = if source.kind.suffixes_duplicate_labels() {
            self.unique_label(source.kind, &source.label, None)
        } else {
            source.label.clone()
        };

        let mut copy = Node {
            id: NodeId::new(),
            label,
            position: Some(
                source
                    .position
                    .map_or(fallback, |p| p.offset(offset.0, offset.1)),
            ),
            error: None,
            ..source
        };
        if let Some(live) = copy.control.clone() {
            copy.store_value(live);
        }

        let new_id = copy.id;
        self.nodes.insert(new_id, copy);
        Ok(new_id)
    }

    /// Connect an output port to an input port
    ///
    /// An input port has at most one driver; an existing one is replaced.
    ///
    /// # Errors
    /// - `GraphError::NodeNotFound` / `GraphError::PortNotFound` for missing endpoints
    /// - `GraphError::SelfLoop` when source and target are the same node
    /// - `GraphError::Incompatible` for incompatible kinds or sockets
    pub fn connect(
        &mut self,
        source: NodeId,
        source_port: &str,
        target: NodeId,
        target_port: &str,
    ) -> Result<Connected, GraphError> {
        if source == target {
            return Err(GraphError::SelfLoop(source));
        }
        let src = self.node(source).ok_or(GraphError::NodeNotFound(source))?;
        let dst = self.node(target).ok_or(GraphError::NodeNotFound(target))?;
        let out = port_of(src, PortSide::Output, source_port)?;
        let inp = port_of(dst, PortSide::Input, target_port)?;
        check_compatible(src.kind, out.socket, dst.kind, inp.socket)?;

        let replaced = self
            .driver_of(target, target_port)
            .map(|c| c.id)
            .and_then(|cid| self.connections.shift_remove(&cid));

        let connection = Connection::new(source, source_port, target, target_port);
        self.connections.insert(connection.id, connection.clone());
        Ok(Connected {
            connection,
            replaced,
        })
    }

    /// Remove one connection
    ///
    /// # Errors
    /// - `GraphError::ConnectionNotFound` for an unknown connection
    pub fn disconnect(&mut self, id: ConnectionId) -> Result<Connection, GraphError> {
        self.connections
            .shift_remove(&id)
            .ok_or(GraphError::ConnectionNotFound(id))
    }

    /// Re-insert a connection snapshot under its original id
    ///
    /// # Errors
    /// - `GraphError::NodeNotFound` / `GraphError::PortNotFound` for missing endpoints
    pub fn restore_connection(&mut self, connection: Connection) -> Result<(), GraphError> {
        self.check_endpoints(&connection)?;
        self.connections.insert(connection.id, connection);
        Ok(())
    }

    /// Re-insert a removed node and its connections
    ///
    /// # Errors
    /// - `GraphError::NodeExists` if the id is in use
    /// - endpoint errors if a connection cannot be re-bound
    pub fn restore_node(&mut self, removed: RemovedNode) -> Result<(), GraphError> {
        let RemovedNode {
            node,
            index,
            connections,
        } = removed;
        if self.contains_node(node.id) {
            return Err(GraphError::NodeExists(node.id));
        }

        let id = node.id;
        let index = index.min(self.nodes.len());
        self.nodes.shift_insert(index, id, node);

        if let Err(err) = connections.iter().try_for_each(|c| self.check_endpoints(c)) {
            self.nodes.shift_remove(&id);
            return Err(err);
        }
        for connection in connections {
            self.connections.insert(connection.id, connection);
        }
        Ok(())
    }

    /// Overwrite a node with a snapshot and re-bind connections
    ///
    /// Ports are synced to the snapshot first, so connections bound to ports
    /// the snapshot lacks are pruned and returned.
    ///
    /// # Errors
    /// - `GraphError::NodeNotFound` if the node is absent
    pub fn replace_node(
        &mut self,
        snapshot: Node,
        connections: Vec<Connection>,
    ) -> Result<Vec<Connection>, GraphError> {
        let id = snapshot.id;
        let pruned = self.sync_sockets(
            id,
            Some(&snapshot.inputs.to_vec()),
            Some(&snapshot.outputs.to_vec()),
        )?;
        let slot = self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))?;
        *slot = snapshot;
        for connection in connections {
            self.restore_connection(connection)?;
        }
        Ok(pruned)
    }

    /// Move a node
    ///
    /// # Errors
    /// - `GraphError::NodeNotFound` for an unknown node
    pub fn set_position(&mut self, id: NodeId, position: Position) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))?;
        node.position = Some(position);
        Ok(())
    }

    /// Forget a node's position
    ///
    /// # Errors
    /// - `GraphError::NodeNotFound` for an unknown node
    pub fn clear_position(&mut self, id: NodeId) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))?;
        node.position = None;
        Ok(())
    }

    /// Set or clear the evaluation error; returns whether it changed
    ///
    /// # Errors
    /// - `GraphError::NodeNotFound` for an unknown node
    pub fn set_error(&mut self, id: NodeId, error: Option<String>) -> Result<bool, GraphError> {
        let node = self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))?;
        let changed = node.error != error;
        node.error = error;
        Ok(changed)
    }

    /// Set the live control value
    ///
    /// # Errors
    /// - `GraphError::NodeNotFound` for an unknown node
    pub fn set_control(&mut self, id: NodeId, value: Value) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))?;
        node.control = Some(value);
        Ok(())
    }

    /// Fold live control values into `data.value` (save-time flattening)
    pub fn flatten_controls(&mut self) {
        for node in self.nodes.values_mut() {
            if let Some(value) = node.control.clone() {
                node.store_value(value);
            }
        }
    }

    fn ensure_label_free(
        &self,
        kind: NodeKind,
        label: &str,
        exclude: Option<NodeId>,
    ) -> Result<(), GraphError> {
        if kind.requires_unique_label() && self.label_taken(kind, label, exclude) {
            return Err(GraphError::DuplicateLabel {
                kind,
                label: label.to_string(),
            });
        }
        Ok(())
    }

    fn check_endpoints(&self, connection: &Connection) -> Result<(), GraphError> {
        let src = self
            .node(connection.source)
            .ok_or(GraphError::NodeNotFound(connection.source))?;
        port_of(src, PortSide::Output, &connection.source_port)?;
        let dst = self
            .node(connection.target)
            .ok_or(GraphError::NodeNotFound(connection.target))?;
        port_of(dst, PortSide::Input, &connection.target_port)?;
        Ok(())
    }
}

/// Whether `label` is the kind's default label, possibly suffixed
#[must_use]
pub fn is_default_label(kind: NodeKind, label: &str) -> bool {
    let default = kind.default_label();
    if label == default {
        return true;
    }
    label
        .strip_prefix(default)
        .and_then(|rest| rest.strip_prefix(" ("))
        .and_then(|rest| rest.strip_suffix(')'))
        .is_some_and(|n| n.parse::<u32>().is_ok())
}

fn port_of<'a>(node: &'a Node, side: PortSide, name: &str) -> Result<&'a Port, GraphError> {
    node.ports(side).get(name).ok_or_else(|| GraphError::PortNotFound {
        node: node.id,
        side,
        port: name.to_string(),
    })
}

/// Re-initialize the value control after a kind change
///
/// Switching between input and constant keeps the visible value but flips
/// whether it is locally edited or externally driven.
fn reinit_control(node: &mut Node) {
    match node.kind.control_mode() {
        ControlMode::Local | ControlMode::External => {
            let value = node.current_value().cloned().unwrap_or(Value::from(0));
            node.store_value(value);
            node.control = None;
        }
        ControlMode::Computed | ControlMode::None => {
            node.control = None;
        }
    }
}

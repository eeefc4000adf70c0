//! Graph container and read-only queries
//!
//! [`Graph`] holds nodes and connections. It enforces shape only; structural
//! invariants are maintained by the operations in [`crate::mutation`].

use crate::ids::{ConnectionId, NodeId};
use crate::model::{Connection, Node, NodeKind, PortSide};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Nodes and connections of one sheet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "GraphWire", into = "GraphWire")]
pub struct Graph {
    pub(crate) nodes: IndexMap<NodeId, Node>,
    pub(crate) connections: IndexMap<ConnectionId, Connection>,
}

/// Persistence shape: plain arrays
#[derive(Serialize, Deserialize)]
struct GraphWire {
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    connections: Vec<Connection>,
}

impl From<GraphWire> for Graph {
    fn from(wire: GraphWire) -> Self {
        Self::from_parts(wire.nodes, wire.connections)
    }
}

impl From<Graph> for GraphWire {
    fn from(graph: Graph) -> Self {
        Self {
            nodes: graph.nodes.into_values().collect(),
            connections: graph.connections.into_values().collect(),
        }
    }
}

impl Graph {
    /// Create empty graph
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from loaded parts without validation
    ///
    /// Use [`Graph::check_integrity`] to find problems in loaded data.
    #[must_use]
    pub fn from_parts(nodes: Vec<Node>, connections: Vec<Connection>) -> Self {
        Self {
            nodes: nodes.into_iter().map(|n| (n.id, n)).collect(),
            connections: connections.into_iter().map(|c| (c.id, c)).collect(),
        }
    }

    /// Look up a node
    #[inline]
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Check if a node exists
    #[inline]
    #[must_use]
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Look up a connection
    #[inline]
    #[must_use]
    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All connections in insertion order
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Number of nodes
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of connections
    #[inline]
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Connections with `node` as source or target
    #[must_use]
    pub fn connections_touching(&self, node: NodeId) -> Vec<&Connection> {
        self.connections.values().filter(|c| c.touches(node)).collect()
    }

    /// Connections bound to one port
    #[must_use]
    pub fn connections_on_port(&self, node: NodeId, side: PortSide, port: &str) -> Vec<&Connection> {
        self.connections
            .values()
            .filter(|c| c.uses_port(node, side, port))
            .collect()
    }

    /// The connection driving an input port, if any
    #[must_use]
    pub fn driver_of(&self, node: NodeId, port: &str) -> Option<&Connection> {
        self.connections
            .values()
            .find(|c| c.uses_port(node, PortSide::Input, port))
    }

    /// Nodes of one kind
    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(move |n| n.kind == kind)
    }

    /// Find a node by kind and exact label
    #[must_use]
    pub fn find_by_label(&self, kind: NodeKind, label: &str) -> Option<&Node> {
        self.nodes.values().find(|n| n.kind == kind && n.label == label)
    }

    /// Labels of one kind, in node order
    #[must_use]
    pub fn labels_of(&self, kind: NodeKind) -> Vec<String> {
        self.nodes_of_kind(kind).map(|n| n.label.clone()).collect()
    }

    /// Report dangling connections and duplicate input/output labels
    #[must_use]
    pub fn check_integrity(&self) -> Vec<IntegrityIssue> {
        let mut issues = Vec::new();

        for conn in self.connections.values() {
            let source_ok = self
                .nodes
                .get(&conn.source)
                .is_some_and(|n| n.outputs.contains(&conn.source_port));
            let target_ok = self
                .nodes
                .get(&conn.target)
                .is_some_and(|n| n.inputs.contains(&conn.target_port));
            if !source_ok || !target_ok {
                issues.push(IntegrityIssue::DanglingConnection(conn.id));
            }
        }

        let mut seen: HashMap<(NodeKind, &str), NodeId> = HashMap::new();
        for node in self.nodes.values() {
            if !node.kind.requires_unique_label() {
                continue;
            }
            if let Some(first) = seen.insert((node.kind, node.label.as_str()), node.id) {
                issues.push(IntegrityIssue::DuplicateLabel {
                    kind: node.kind,
                    label: node.label.clone(),
                    nodes: (first, node.id),
                });
            }
        }

        issues
    }
}

/// Problem found by [`Graph::check_integrity`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityIssue {
    /// Connection references a missing node or port
    DanglingConnection(ConnectionId),
    /// Two input (or output) nodes share a label
    DuplicateLabel {
        /// Kind of both nodes
        kind: NodeKind,
        /// Shared label
        label: String,
        /// The two nodes
        nodes: (NodeId, NodeId),
    },
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DanglingConnection(id) => write!(f, "connection {id} references a missing port"),
            Self::DuplicateLabel { kind, label, .. } => {
                write!(f, "duplicate {kind} label \"{label}\"")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Port;

    fn pair() -> (Graph, NodeId, NodeId) {
        let a = Node::new(NodeKind::Input, "a");
        let b = Node::new(NodeKind::Output, "b");
        let (ia, ib) = (a.id, b.id);
        let conn = Connection::new(ia, "value", ib, "value");
        (Graph::from_parts(vec![a, b], vec![conn]), ia, ib)
    }

    #[test]
    fn queries_find_connections() {
        let (graph, a, b) = pair();
        assert_eq!(graph.connections_touching(a).len(), 1);
        assert_eq!(graph.connections_on_port(b, PortSide::Input, "value").len(), 1);
        assert!(graph.driver_of(b, "value").is_some());
        assert!(graph.driver_of(a, "value").is_none());
    }

    #[test]
    fn find_by_label_respects_kind() {
        let (graph, a, _) = pair();
        assert_eq!(graph.find_by_label(NodeKind::Input, "a").map(|n| n.id), Some(a));
        assert!(graph.find_by_label(NodeKind::Output, "a").is_none());
    }

    #[test]
    fn integrity_reports_dangling_and_duplicates() {
        let (mut graph, _, b) = pair();
        assert!(graph.check_integrity().is_empty());

        let dup = Node::new(NodeKind::Output, "b");
        graph.nodes.insert(dup.id, dup);
        graph.nodes.get_mut(&b).unwrap().inputs = vec![Port::generic("other")].into();

        let issues = graph.check_integrity();
        assert_eq!(issues.len(), 2);
        assert!(matches!(issues[0], IntegrityIssue::DanglingConnection(_)));
        assert!(matches!(issues[1], IntegrityIssue::DuplicateLabel { .. }));
    }

    #[test]
    fn graph_serializes_as_arrays() {
        let (graph, _, _) = pair();
        let json = serde_json::to_value(&graph).unwrap();
        assert_eq!(json["nodes"].as_array().map(Vec::len), Some(2));
        assert_eq!(json["connections"].as_array().map(Vec::len), Some(1));
        let back: Graph = serde_json::from_value(json).unwrap();
        assert_eq!(back, graph);
    }
}

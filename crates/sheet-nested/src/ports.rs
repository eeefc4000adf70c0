//! Expected ports of a sheet-reference node
//!
//! A referenced sheet is called like a function: its `input` node labels are
//! the parameters, its `output` and `constant` node labels are the results.

use sheet_graph::{sheet_socket, Connection, Graph, GraphError, Node, NodeId, NodeKind, Port, PortSide};
use std::collections::HashSet;

/// Port lists a reference node must expose
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExpectedPorts {
    /// Parameters, in the referenced sheet's node order
    pub inputs: Vec<Port>,
    /// Results, in the referenced sheet's node order
    pub outputs: Vec<Port>,
}

impl ExpectedPorts {
    /// Derive the calling signature of `referenced`
    #[must_use]
    pub fn of(referenced: &Graph) -> Self {
        let inputs = referenced
            .nodes_of_kind(NodeKind::Input)
            .map(|n| Port::new(n.label.clone(), sheet_socket(PortSide::Input)))
            .collect();

        // Outputs and constants may share a label; first one wins
        let mut seen = HashSet::new();
        let outputs = referenced
            .nodes()
            .filter(|n| n.kind.exposed_as_nested_output())
            .filter(|n| seen.insert(n.label.clone()))
            .map(|n| Port::new(n.label.clone(), sheet_socket(PortSide::Output)))
            .collect();

        Self { inputs, outputs }
    }

    /// Whether `node`'s port name sets differ from this signature
    #[must_use]
    pub fn differs_from(&self, node: &Node) -> bool {
        let names = |ports: &[Port]| ports.iter().map(|p| p.name.clone()).collect::<HashSet<_>>();
        let current = |side: PortSide| {
            node.ports(side)
                .names()
                .map(str::to_string)
                .collect::<HashSet<_>>()
        };
        names(&self.inputs) != current(PortSide::Input)
            || names(&self.outputs) != current(PortSide::Output)
    }

    /// Input names
    pub fn input_names(&self) -> impl Iterator<Item = &str> {
        self.inputs.iter().map(|p| p.name.as_str())
    }
}

/// Bring `node`'s ports in line with `expected`
///
/// Does nothing when the name sets already match. Returns the connections
/// pruned by socket sync.
///
/// # Errors
/// - `GraphError::NodeNotFound` for an unknown node
pub fn apply_expected(
    graph: &mut Graph,
    node: NodeId,
    expected: &ExpectedPorts,
) -> Result<Vec<Connection>, GraphError> {
    let current = graph.node(node).ok_or(GraphError::NodeNotFound(node))?;
    if !expected.differs_from(current) {
        return Ok(Vec::new());
    }
    graph.sync_sockets(node, Some(&expected.inputs), Some(&expected.outputs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheet_graph::{NewNode, SocketKind};

    fn referenced(inputs: &[&str], outputs: &[&str], constants: &[&str]) -> Graph {
        let mut graph = Graph::new();
        for label in inputs {
            graph.add_node(NewNode::new(NodeKind::Input, *label));
        }
        for label in outputs {
            graph.add_node(NewNode::new(NodeKind::Output, *label));
        }
        for label in constants {
            graph.add_node(NewNode::new(NodeKind::Constant, *label));
        }
        graph.add_node(NewNode::new(NodeKind::Function, "ignored"));
        graph
    }

    #[test]
    fn signature_uses_inputs_outputs_and_constants() {
        let expected = ExpectedPorts::of(&referenced(&["a", "b"], &["y"], &["pi"]));
        assert_eq!(expected.input_names().collect::<Vec<_>>(), vec!["a", "b"]);
        let outs: Vec<_> = expected.outputs.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(outs, vec!["y", "pi"]);
        assert!(expected.inputs.iter().all(|p| p.socket == SocketKind::SheetIn));
        assert!(expected.outputs.iter().all(|p| p.socket == SocketKind::SheetOut));
    }

    #[test]
    fn shared_output_constant_label_appears_once() {
        let expected = ExpectedPorts::of(&referenced(&[], &["v"], &["v"]));
        assert_eq!(expected.outputs.len(), 1);
    }

    #[test]
    fn differs_ignores_order() {
        let expected = ExpectedPorts::of(&referenced(&["a", "b"], &[], &[]));
        let mut node = sheet_graph::Node::new(NodeKind::Sheet, "s");
        node.inputs = vec![Port::generic("b"), Port::generic("a")].into();
        assert!(!expected.differs_from(&node));
        node.inputs = vec![Port::generic("a")].into();
        assert!(expected.differs_from(&node));
    }
}

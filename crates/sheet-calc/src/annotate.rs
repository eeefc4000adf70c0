//! Writing evaluation results back onto the graph

use sheet_graph::{CalculationResult, Graph, NodeId, NodeKind, NodeResult};
use serde_json::Value;

/// What a result application changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotation {
    /// Nodes whose error changed
    pub errors_changed: Vec<NodeId>,
    /// Output nodes whose value was refreshed
    pub outputs_refreshed: Vec<NodeId>,
    /// First node reporting an error, in graph order
    pub first_error: Option<(NodeId, String)>,
}

/// Value an output node displays
fn output_value(result: &NodeResult) -> Option<&Value> {
    result
        .outputs
        .get("value")
        .or_else(|| result.outputs.values().next())
        .or_else(|| result.inputs.get("value"))
}

/// Annotate every node from `result`
///
/// Errors are set from the node's entry or cleared when it has none. Output
/// nodes get their value refreshed; input nodes keep theirs.
pub fn apply_results(graph: &mut Graph, result: &CalculationResult) -> Annotation {
    let nodes: Vec<(NodeId, NodeKind)> = graph.nodes().map(|n| (n.id, n.kind)).collect();
    let mut annotation = Annotation::default();

    for (id, kind) in nodes {
        let entry = result.get(id);
        let error = entry.and_then(NodeResult::error_message);
        if let Some(message) = &error {
            annotation
                .first_error
                .get_or_insert_with(|| (id, message.clone()));
        }
        if matches!(graph.set_error(id, error), Ok(true)) {
            annotation.errors_changed.push(id);
        }

        if kind != NodeKind::Output {
            continue;
        }
        if let Some(value) = entry.and_then(output_value) {
            if graph.set_control(id, value.clone()).is_ok() {
                annotation.outputs_refreshed.push(id);
            }
        }
    }
    annotation
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use sheet_graph::NewNode;

    fn entry(value: Value, error: Option<&str>) -> NodeResult {
        let mut r = NodeResult::default();
        r.outputs.insert("value".to_string(), value);
        r.error = error.map(str::to_string);
        r.valid = error.is_none();
        r
    }

    #[test]
    fn outputs_refresh_and_inputs_stay() {
        let mut graph = Graph::new();
        let input = graph.add_node(
            NewNode::new(NodeKind::Input, "a").with_data(json!({"value": 1})),
        );
        let output = graph.add_node(NewNode::new(NodeKind::Output, "y"));

        let mut result = CalculationResult::default();
        result.results.insert(input, entry(json!(100), None));
        result.results.insert(output, entry(json!(42), None));

        let annotation = apply_results(&mut graph, &result);
        assert_eq!(annotation.outputs_refreshed, vec![output]);
        assert_eq!(graph.node(output).unwrap().current_value(), Some(&json!(42)));
        assert_eq!(graph.node(input).unwrap().current_value(), Some(&json!(1)));
    }

    #[test]
    fn errors_set_then_cleared() {
        let mut graph = Graph::new();
        let f = graph.add_node(NewNode::new(NodeKind::Function, "f"));

        let mut failing = CalculationResult::default();
        failing.results.insert(f, entry(Value::Null, Some("division by zero")));
        let annotation = apply_results(&mut graph, &failing);
        assert_eq!(annotation.first_error, Some((f, "division by zero".to_string())));
        assert_eq!(graph.node(f).unwrap().error.as_deref(), Some("division by zero"));

        let annotation = apply_results(&mut graph, &CalculationResult::default());
        assert_eq!(annotation.errors_changed, vec![f]);
        assert_eq!(graph.node(f).unwrap().error, None);
    }

    #[test]
    fn invalid_without_message_is_an_error() {
        let mut graph = Graph::new();
        let f = graph.add_node(NewNode::new(NodeKind::Function, "f"));
        let mut result = CalculationResult::default();
        result.results.insert(
            f,
            NodeResult {
                valid: false,
                ..NodeResult::default()
            },
        );
        apply_results(&mut graph, &result);
        assert!(graph.node(f).unwrap().error.is_some());
    }
}

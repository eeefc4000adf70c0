//! Structural invariants under arbitrary edit sequences.
//!
//! Whatever sequence of add/remove/update/connect operations runs, the graph
//! must never hold a connection bound to a missing port, and input/output
//! labels must stay unique per kind.

use proptest::prelude::*;
use sheet_graph::{Graph, IntegrityIssue, NewNode, NodeKind, NodePatch, Port};

const LABELS: [&str; 3] = ["X", "Y", "Z"];
const PORTS: [&str; 4] = ["a", "b", "c", "d"];

#[derive(Debug, Clone)]
enum Op {
    Add { kind: usize, label: usize },
    Remove { pick: usize },
    Relabel { pick: usize, label: usize },
    Repurpose { pick: usize, kind: usize },
    SetInputs { pick: usize, mask: u8 },
    Connect { from: usize, to: usize, port: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..NodeKind::ALL.len(), 0..LABELS.len()).prop_map(|(kind, label)| Op::Add { kind, label }),
        any::<usize>().prop_map(|pick| Op::Remove { pick }),
        (any::<usize>(), 0..LABELS.len()).prop_map(|(pick, label)| Op::Relabel { pick, label }),
        (any::<usize>(), 0..NodeKind::ALL.len()).prop_map(|(pick, kind)| Op::Repurpose { pick, kind }),
        (any::<usize>(), 0u8..16).prop_map(|(pick, mask)| Op::SetInputs { pick, mask }),
        (any::<usize>(), any::<usize>(), 0..PORTS.len())
            .prop_map(|(from, to, port)| Op::Connect { from, to, port }),
    ]
}

fn pick(graph: &Graph, index: usize) -> Option<sheet_graph::NodeId> {
    let count = graph.node_count();
    if count == 0 {
        return None;
    }
    graph.nodes().nth(index % count).map(|n| n.id)
}

fn apply(graph: &mut Graph, op: &Op) {
    match *op {
        Op::Add { kind, label } => {
            graph.add_node(NewNode::new(NodeKind::ALL[kind], LABELS[label]));
        }
        Op::Remove { pick: p } => {
            if let Some(id) = pick(graph, p) {
                graph.remove_node(id).unwrap();
            }
        }
        Op::Relabel { pick: p, label } => {
            if let Some(id) = pick(graph, p) {
                let _ = graph.update_node(id, NodePatch::new().label(LABELS[label]));
            }
        }
        Op::Repurpose { pick: p, kind } => {
            if let Some(id) = pick(graph, p) {
                let _ = graph.update_node(id, NodePatch::new().kind(NodeKind::ALL[kind]));
            }
        }
        Op::SetInputs { pick: p, mask } => {
            if let Some(id) = pick(graph, p) {
                let inputs = PORTS
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| mask & (1 << i) != 0)
                    .map(|(_, name)| Port::generic(*name))
                    .collect();
                graph.update_node(id, NodePatch::new().inputs(inputs)).unwrap();
            }
        }
        Op::Connect { from, to, port } => {
            let (Some(src), Some(dst)) = (pick(graph, from), pick(graph, to)) else {
                return;
            };
            let out = graph
                .node(src)
                .and_then(|n| n.outputs.names().next().map(str::to_string));
            if let Some(out) = out {
                let _ = graph.connect(src, &out, dst, PORTS[port]);
            }
        }
    }
}

proptest! {
    #[test]
    fn prop_no_dangling_connections(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut graph = Graph::new();
        for op in &ops {
            apply(&mut graph, op);
            let issues = graph.check_integrity();
            prop_assert!(
                !issues.iter().any(|i| matches!(i, IntegrityIssue::DanglingConnection(_))),
                "dangling connection after {:?}: {:?}", op, issues
            );
        }
    }

    #[test]
    fn prop_input_output_labels_stay_unique(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut graph = Graph::new();
        for op in &ops {
            apply(&mut graph, op);
        }
        let issues = graph.check_integrity();
        prop_assert!(
            !issues.iter().any(|i| matches!(i, IntegrityIssue::DuplicateLabel { .. })),
            "duplicate labels: {:?}", issues
        );
    }

    #[test]
    fn prop_remove_takes_exactly_touching(ops in prop::collection::vec(op_strategy(), 1..40), victim in any::<usize>()) {
        let mut graph = Graph::new();
        for op in &ops {
            apply(&mut graph, op);
        }
        if let Some(id) = pick(&graph, victim) {
            let before: Vec<_> = graph.connections().cloned().collect();
            let removed = graph.remove_node(id).unwrap();
            let expected_removed: Vec<_> = before.iter().filter(|c| c.touches(id)).cloned().collect();
            let expected_kept: Vec<_> = before.iter().filter(|c| !c.touches(id)).cloned().collect();
            prop_assert_eq!(removed.connections, expected_removed);
            prop_assert_eq!(graph.connections().cloned().collect::<Vec<_>>(), expected_kept);
        }
    }
}

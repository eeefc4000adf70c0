//! Reconciling reference nodes against stored sheets.

use pretty_assertions::assert_eq;
use serde_json::json;
use sheet_graph::{Graph, NewNode, NodeKind, PortSide, SheetId};
use sheet_nested::{Resolver, ValueSource};
use sheet_test_utils::{add_reference, callee_sheet, MemorySheets};
use std::collections::HashMap;
use std::sync::Arc;

fn port_names(graph: &Graph, node: sheet_graph::NodeId, side: PortSide) -> Vec<String> {
    graph
        .node(node)
        .unwrap()
        .ports(side)
        .names()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn changed_callee_prunes_stale_connections() {
    let callee = callee_sheet(&["x", "y"], &["out"]);
    let callee_id = callee.id;
    let sheets = Arc::new(MemorySheets::new().with_sheet(callee));

    let mut graph = Graph::new();
    let rate = graph.add_node(NewNode::new(NodeKind::Input, "rate"));
    let total = graph.add_node(NewNode::new(NodeKind::Output, "total"));
    let reference = add_reference(&mut graph, callee_id, &["x", "y"], &["out"]);
    graph.connect(rate, "value", reference, "x").unwrap();
    graph.connect(rate, "value", reference, "y").unwrap();
    graph.connect(reference, "out", total, "value").unwrap();

    let resolver = Resolver::new(sheets.clone());
    let report = resolver.reconcile(&mut graph).await;
    assert!(report.updated.is_empty());
    assert_eq!(report.warning(), None);

    let mut changed = callee_sheet(&["x", "z"], &["out"]);
    changed.id = callee_id;
    sheets.insert(changed);

    let report = resolver.reconcile(&mut graph).await;
    assert_eq!(report.updated, vec![reference]);
    assert_eq!(report.pruned.len(), 1);
    assert_eq!(report.pruned[0].target_port, "y");
    assert!(report.warning().unwrap().contains("1 connection"));

    assert_eq!(port_names(&graph, reference, PortSide::Input), vec!["x", "z"]);
    assert!(graph.driver_of(reference, "x").is_some());
    assert_eq!(graph.connection_count(), 2);
    assert!(graph.check_integrity().is_empty());
}

#[tokio::test]
async fn missing_callee_is_reported_and_left_alone() {
    let sheets = Arc::new(MemorySheets::new());
    let mut graph = Graph::new();
    let reference = add_reference(&mut graph, SheetId::new(), &["x"], &[]);
    let before = graph.clone();

    let report = Resolver::new(sheets).reconcile(&mut graph).await;
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, reference);
    assert_eq!(graph, before);
}

#[tokio::test]
async fn shared_callee_is_fetched_once_per_pass() {
    let callee = callee_sheet(&["x"], &["out"]);
    let callee_id = callee.id;
    let sheets = Arc::new(MemorySheets::new().with_sheet(callee));

    let mut graph = Graph::new();
    add_reference(&mut graph, callee_id, &[], &[]);
    add_reference(&mut graph, callee_id, &[], &[]);

    let resolver = Resolver::new(sheets.clone());
    let report = resolver.reconcile(&mut graph).await;
    assert_eq!(report.updated.len(), 2);
    assert_eq!(sheets.fetch_count(), 1);

    resolver.reconcile(&mut graph).await;
    assert_eq!(sheets.fetch_count(), 2);
}

#[tokio::test]
async fn nested_inputs_flow_through_levels() {
    let leaf = callee_sheet(&["x"], &["out"]);

    let mut middle = callee_sheet(&["x"], &["out"]);
    let middle_input = middle
        .graph
        .find_by_label(NodeKind::Input, "x")
        .map(|n| n.id)
        .unwrap();
    let inner = add_reference(&mut middle.graph, leaf.id, &["x"], &["out"]);
    middle.graph.connect(middle_input, "value", inner, "x").unwrap();

    let mut root = Graph::new();
    let rate = root.add_node(NewNode::new(NodeKind::Input, "rate").with_data(json!({"value": 2})));
    let outer = add_reference(&mut root, middle.id, &["x"], &["out"]);
    root.connect(rate, "value", outer, "x").unwrap();

    let sheets = Arc::new(MemorySheets::new().with_sheet(leaf).with_sheet(middle));
    let resolver = Resolver::new(sheets);

    let resolved = resolver
        .resolve_nested_inputs(&root, None, &[outer, inner], None, &HashMap::new())
        .await
        .unwrap();
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].port, "x");
    assert_eq!(resolved[0].value, Some(json!(2)));
    assert_eq!(resolved[0].source, ValueSource::Proposed);

    let pending = HashMap::from([(rate, json!(7))]);
    let resolved = resolver
        .resolve_nested_inputs(&root, None, &[outer, inner], None, &pending)
        .await
        .unwrap();
    assert_eq!(resolved[0].value, Some(json!(7)));
}

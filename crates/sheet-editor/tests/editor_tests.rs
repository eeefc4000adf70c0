//! Editing sessions against in-memory backends.

use pretty_assertions::assert_eq;
use serde_json::json;
use sheet_calc::CalcError;
use sheet_client::ClientError;
use sheet_editor::{Backends, Editor, EditorConfig, EditorError};
use sheet_graph::{GraphEvent, NewNode, NodeKind, NodePatch, PortSide, Position, Sheet};
use sheet_lease::{LeaseStatus, SessionContext};
use sheet_test_utils::{
    add_reference, callee_sheet, result_with, result_with_error, sample_sheet, FakeEvaluator,
    FakeLeaseServer, MemorySheets, SampleIds,
};
use std::sync::Arc;
use std::time::Duration;

struct World {
    sheets: Arc<MemorySheets>,
    evaluator: Arc<FakeEvaluator>,
    leases: Arc<FakeLeaseServer>,
}

impl World {
    fn new() -> Self {
        Self {
            sheets: Arc::new(MemorySheets::new()),
            evaluator: Arc::new(FakeEvaluator::new()),
            leases: Arc::new(FakeLeaseServer::new()),
        }
    }

    fn backends(&self) -> Backends {
        Backends {
            store: self.sheets.clone(),
            source: self.sheets.clone(),
            evaluator: self.evaluator.clone(),
            lease: self.leases.clone(),
        }
    }

    fn config() -> EditorConfig {
        EditorConfig::new()
            .with_identity("ann")
            .with_save_retry(3, Duration::from_millis(100))
    }

    async fn open(&self, sheet: &Sheet, who: &str) -> Editor {
        self.sheets.insert(sheet.clone());
        let (editor, _) = Editor::open(
            self.backends(),
            Self::config(),
            SessionContext::new(who),
            sheet.id,
        )
        .await
        .unwrap();
        editor
    }
}

async fn sample(world: &World) -> (Editor, SampleIds) {
    let (sheet, ids) = sample_sheet();
    (world.open(&sheet, "ann").await, ids)
}

#[tokio::test(start_paused = true)]
async fn colliding_labels_are_suffixed_and_undoable() {
    let world = World::new();
    let (editor, _) = sample(&world).await;

    let first = editor.add_node(NewNode::new(NodeKind::Input, "X")).unwrap();
    let second = editor.add_node(NewNode::new(NodeKind::Input, "X")).unwrap();
    let third = editor.add_node(NewNode::new(NodeKind::Input, "X")).unwrap();
    assert_eq!(editor.node(first).unwrap().label, "X");
    assert_eq!(editor.node(second).unwrap().label, "X (1)");
    assert_eq!(editor.node(third).unwrap().label, "X (2)");

    let before = editor.graph();
    assert_eq!(editor.undo_label().as_deref(), Some("Add node"));
    editor.undo().unwrap();
    assert!(editor.node(third).is_none());
    editor.redo().unwrap();
    assert_eq!(editor.graph(), before);
}

#[tokio::test(start_paused = true)]
async fn rapid_edits_send_one_preview() {
    let world = World::new();
    let (editor, ids) = sample(&world).await;
    world.evaluator.answer(result_with(&[(ids.total, json!(42))]));

    for x in 0..5 {
        editor.move_node(ids.rate, Position::new(f64::from(x), 0.0)).unwrap();
        editor.set_pending_input(ids.rate, json!(x)).unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(world.evaluator.preview_count(), 1);
    assert_eq!(world.evaluator.last_preview().unwrap().inputs["rate"].value, json!(4));
    assert_eq!(editor.node(ids.total).unwrap().current_value(), Some(&json!(42)));
}

#[tokio::test(start_paused = true)]
async fn locked_sheet_is_read_only_until_taken_over() {
    let world = World::new();
    let (sheet, _) = sample_sheet();
    world.leases.seize(sheet.id, &SessionContext::new("bob"));
    let editor = world.open(&sheet, "ann").await;

    assert!(editor.is_read_only());
    assert_eq!(editor.lease_status().holder(), Some("bob"));
    let err = editor.add_node(NewNode::of_kind(NodeKind::Function)).unwrap_err();
    assert_eq!(
        err,
        EditorError::ReadOnly {
            holder: Some("bob".to_string())
        }
    );
    assert!(matches!(editor.save().await, Err(EditorError::ReadOnly { .. })));

    editor.take_over().await.unwrap();
    assert!(!editor.is_read_only());
    assert!(matches!(editor.lease_status(), LeaseStatus::Held(_)));
    assert!(editor.add_node(NewNode::of_kind(NodeKind::Function)).is_ok());
}

#[tokio::test(start_paused = true)]
async fn pending_inputs_are_allowed_while_read_only() {
    let world = World::new();
    let (sheet, ids) = sample_sheet();
    world.leases.seize(sheet.id, &SessionContext::new("bob"));
    let editor = world.open(&sheet, "ann").await;

    editor.set_pending_input(ids.rate, json!(9)).unwrap();
    assert_eq!(
        editor.set_pending_input(ids.base, json!(1)),
        Err(EditorError::NotAnInput(ids.base))
    );

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(editor.share_query(), "rate=9");
}

#[tokio::test(start_paused = true)]
async fn share_query_round_trips_into_pending_inputs() {
    let world = World::new();
    let (editor, ids) = sample(&world).await;

    assert_eq!(editor.apply_share_query("?rate=3&unknown=1"), 1);
    assert_eq!(editor.pending_inputs().get(&ids.rate), Some(&json!(3)));
}

#[tokio::test(start_paused = true)]
async fn removing_an_input_needs_confirmation() {
    let world = World::new();
    let (editor, ids) = sample(&world).await;

    let err = editor.remove_node(ids.rate, false).unwrap_err();
    assert!(matches!(err, EditorError::NeedsConfirmation(_)));
    assert!(editor.node(ids.rate).is_some());

    let connections = editor.graph().connection_count();
    editor.remove_node(ids.rate, true).unwrap();
    assert_eq!(editor.graph().connection_count(), connections - 1);

    editor.undo().unwrap();
    assert_eq!(editor.graph().connection_count(), connections);
}

#[tokio::test(start_paused = true)]
async fn renaming_a_fresh_default_needs_no_confirmation() {
    let world = World::new();
    let (editor, ids) = sample(&world).await;
    let fresh = editor.add_node(NewNode::of_kind(NodeKind::Output)).unwrap();

    editor
        .update_node(fresh, NodePatch::new().label("profit"), false)
        .unwrap();
    assert!(matches!(
        editor.update_node(ids.total, NodePatch::new().label("sum"), false),
        Err(EditorError::NeedsConfirmation(_))
    ));
    assert!(matches!(
        editor.update_node(ids.total, NodePatch::new().label("profit"), true),
        Err(EditorError::Graph(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn duplicate_lands_at_offset() {
    let world = World::new();
    let (editor, ids) = sample(&world).await;
    editor.move_node(ids.base, Position::new(100.0, 100.0)).unwrap();

    let copy = editor.duplicate_node(ids.base, Position::default()).unwrap();
    let node = editor.node(copy).unwrap();
    assert_eq!(node.label, "base (1)");
    assert_eq!(node.position, Some(Position::new(140.0, 140.0)));
}

#[tokio::test(start_paused = true)]
async fn open_reconciles_drifted_references() {
    let world = World::new();
    let callee = callee_sheet(&["a", "c"], &["out"]);
    world.sheets.insert(callee.clone());

    let mut sheet = Sheet::new("caller");
    let rate = sheet.graph.add_node(NewNode::new(NodeKind::Input, "rate"));
    let reference = add_reference(&mut sheet.graph, callee.id, &["a", "b"], &["out"]);
    sheet.graph.connect(rate, "value", reference, "b").unwrap();
    world.sheets.insert(sheet.clone());

    let (editor, report) = Editor::open(
        world.backends(),
        World::config(),
        SessionContext::new("ann"),
        sheet.id,
    )
    .await
    .unwrap();

    assert!(report.warning().is_some());
    assert_eq!(report.reconcile.pruned.len(), 1);
    let node = editor.node(reference).unwrap();
    let inputs: Vec<&str> = node.ports(PortSide::Input).names().collect();
    assert_eq!(inputs, vec!["a", "c"]);
    assert_eq!(editor.graph().connection_count(), 0);
    assert!(editor.undo_label().is_none());
}

#[tokio::test(start_paused = true)]
async fn changing_reference_target_adopts_ports_and_undoes() {
    let world = World::new();
    let first = callee_sheet(&["a"], &["out"]);
    let second = callee_sheet(&["q"], &["r"]);
    world.sheets.insert(first.clone());
    world.sheets.insert(second.clone());

    let mut sheet = Sheet::new("caller");
    let rate = sheet.graph.add_node(NewNode::new(NodeKind::Input, "rate"));
    let reference = add_reference(&mut sheet.graph, first.id, &["a"], &["out"]);
    sheet.graph.connect(rate, "value", reference, "a").unwrap();
    let editor = world.open(&sheet, "ann").await;

    let pruned = editor.change_reference_target(reference, second.id).await.unwrap();
    assert_eq!(pruned.len(), 1);
    let node = editor.node(reference).unwrap();
    assert_eq!(node.referenced_sheet(), Some(second.id));
    assert_eq!(node.ports(PortSide::Input).names().collect::<Vec<_>>(), vec!["q"]);

    editor.undo().unwrap();
    let node = editor.node(reference).unwrap();
    assert_eq!(node.referenced_sheet(), Some(first.id));
    assert_eq!(editor.graph().connection_count(), 1);

    let missing = sheet_graph::SheetId::new();
    assert!(matches!(
        editor.change_reference_target(reference, missing).await,
        Err(EditorError::Resolve(_))
    ));
    assert_eq!(editor.node(reference).unwrap().referenced_sheet(), Some(first.id));
}

#[tokio::test(start_paused = true)]
async fn save_retries_transient_failures() {
    let world = World::new();
    let (editor, ids) = sample(&world).await;
    editor
        .update_node(ids.base, NodePatch::new().data(json!({"value": 11})), false)
        .unwrap();
    world.sheets.fail_saves(vec![
        ClientError::Transport("reset".to_string()),
        ClientError::Status {
            status: 503,
            message: "busy".to_string(),
        },
    ]);

    editor.save().await.unwrap();
    assert_eq!(world.sheets.save_attempts(), 3);
    let stored = world.sheets.get(editor.sheet_id()).unwrap();
    assert_eq!(stored.graph.node(ids.base).unwrap().stored_value(), Some(&json!(11)));
    match editor.lease_status() {
        LeaseStatus::Held(lease) => assert!(lease.last_saved_at.is_some()),
        other => panic!("expected held lease, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn save_gives_up_after_three_attempts() {
    let world = World::new();
    let (editor, _) = sample(&world).await;
    world.sheets.fail_saves(vec![ClientError::Transport("down".to_string()); 5]);

    let err = editor.save().await.unwrap_err();
    assert!(matches!(err, EditorError::Store(ClientError::Transport(_))));
    assert_eq!(world.sheets.save_attempts(), 3);
}

#[tokio::test(start_paused = true)]
async fn permanent_save_failure_is_not_retried() {
    let world = World::new();
    let (editor, _) = sample(&world).await;
    world.sheets.fail_saves(vec![ClientError::Status {
        status: 400,
        message: "invalid graph".to_string(),
    }]);

    assert!(editor.save().await.is_err());
    assert_eq!(world.sheets.save_attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn saved_sheet_carries_computed_outputs() {
    let world = World::new();
    let (editor, ids) = sample(&world).await;
    world.evaluator.answer(result_with(&[(ids.total, json!(20))]));

    editor.calculate().await.unwrap();
    editor.save().await.unwrap();

    let stored = world.sheets.get(editor.sheet_id()).unwrap();
    assert_eq!(stored.graph.node(ids.total).unwrap().stored_value(), Some(&json!(20)));
}

#[tokio::test(start_paused = true)]
async fn calculation_errors_name_the_node() {
    let world = World::new();
    let (editor, ids) = sample(&world).await;

    world.evaluator.answer(result_with_error(ids.product, "bad formula"));
    let annotation = editor.calculate().await.unwrap();
    assert_eq!(annotation.first_error.map(|(node, _)| node), Some(ids.product));

    world.evaluator.fail(CalcError::Evaluation {
        message: "unknown function".to_string(),
        node: Some(ids.product),
    });
    let err = editor.calculate().await.unwrap_err();
    assert_eq!(err.node(), Some(ids.product));
}

#[tokio::test(start_paused = true)]
async fn reload_discards_history_and_pending_inputs() {
    let world = World::new();
    let (editor, ids) = sample(&world).await;
    let mut events = editor.subscribe();

    editor.add_node(NewNode::of_kind(NodeKind::Comment)).unwrap();
    editor.set_pending_input(ids.rate, json!(5)).unwrap();
    editor.reload().await.unwrap();

    assert!(editor.undo_label().is_none());
    assert!(editor.pending_inputs().is_empty());
    assert_eq!(editor.graph().node_count(), 4);

    let mut saw_reload = false;
    while let Ok(event) = events.try_recv() {
        saw_reload |= event == GraphEvent::Reloaded;
    }
    assert!(saw_reload);
}

#[tokio::test(start_paused = true)]
async fn close_releases_the_lease() {
    let world = World::new();
    let (sheet, _) = sample_sheet();
    let editor = world.open(&sheet, "ann").await;
    assert!(world.leases.holder(sheet.id).is_some());

    editor.close().await;
    assert!(world.leases.holder(sheet.id).is_none());
}

#[tokio::test(start_paused = true)]
async fn added_reference_carries_target_ports() {
    let world = World::new();
    let callee = callee_sheet(&["a", "b"], &["out"]);
    world.sheets.insert(callee.clone());
    let (editor, _) = sample(&world).await;

    let reference = editor
        .add_reference(callee.id, Some(Position::new(5.0, 5.0)))
        .await
        .unwrap();
    let node = editor.node(reference).unwrap();
    assert_eq!(node.kind, NodeKind::Sheet);
    assert_eq!(node.label, "callee");
    assert_eq!(node.referenced_sheet(), Some(callee.id));
    assert_eq!(node.ports(PortSide::Input).names().collect::<Vec<_>>(), vec!["a", "b"]);
    assert_eq!(node.ports(PortSide::Output).names().collect::<Vec<_>>(), vec!["out"]);

    assert_eq!(editor.undo_label().as_deref(), Some("Add node"));
    editor.undo().unwrap();
    assert!(editor.node(reference).is_none());

    let missing = sheet_graph::SheetId::new();
    let count = editor.graph().node_count();
    assert!(matches!(
        editor.add_reference(missing, None).await,
        Err(EditorError::Resolve(_))
    ));
    assert_eq!(editor.graph().node_count(), count);
}

#[tokio::test(start_paused = true)]
async fn refresh_follows_changed_callee_and_keeps_local_edits() {
    let world = World::new();
    let callee = callee_sheet(&["a", "b"], &["out"]);
    world.sheets.insert(callee.clone());
    let (editor, ids) = sample(&world).await;

    let reference = editor.add_reference(callee.id, None).await.unwrap();
    editor.connect(ids.rate, "value", reference, "b").unwrap();
    let note = editor.add_node(NewNode::new(NodeKind::Comment, "note")).unwrap();

    let mut changed = callee_sheet(&["a", "c"], &["out"]);
    changed.id = callee.id;
    world.sheets.insert(changed);

    let report = editor.refresh_references().await.unwrap();
    assert_eq!(report.updated, vec![reference]);
    assert_eq!(report.pruned.len(), 1);
    assert!(report.warning().is_some());
    let node = editor.node(reference).unwrap();
    assert_eq!(node.ports(PortSide::Input).names().collect::<Vec<_>>(), vec!["a", "c"]);
    assert!(editor.node(note).is_some());
    assert!(editor.graph().driver_of(reference, "b").is_none());

    assert_eq!(editor.undo_label().as_deref(), Some("Refresh references"));
    editor.undo().unwrap();
    let node = editor.node(reference).unwrap();
    assert_eq!(node.ports(PortSide::Input).names().collect::<Vec<_>>(), vec!["a", "b"]);
    assert!(editor.graph().driver_of(reference, "b").is_some());

    editor.redo().unwrap();
    let again = editor.refresh_references().await.unwrap();
    assert!(again.updated.is_empty());
    assert!(again.warning().is_none());
    assert_eq!(editor.undo_label().as_deref(), Some("Refresh references"));
}

#[tokio::test(start_paused = true)]
async fn rename_saves_the_sheet() {
    let world = World::new();
    let (editor, _) = sample(&world).await;

    editor.rename("quarterly").await.unwrap();
    assert_eq!(editor.snapshot().name, "quarterly");
    assert_eq!(world.sheets.get(editor.sheet_id()).unwrap().name, "quarterly");
    assert_eq!(world.sheets.save_attempts(), 1);

    world.sheets.fail_saves(vec![ClientError::Status {
        status: 400,
        message: "bad name".to_string(),
    }]);
    assert!(editor.rename("").await.is_err());
    assert_eq!(editor.snapshot().name, "quarterly");
}

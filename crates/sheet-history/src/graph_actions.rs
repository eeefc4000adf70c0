//! Inverse pairs for graph mutations
//!
//! Each constructor takes the outcome a mutation returned and builds the
//! action that reverses and replays it. Snapshots are cloned on every run so
//! an action can be undone and redone any number of times.

use crate::history::HistoryAction;
use sheet_graph::{Connected, Connection, Graph, Node, NodeId, NodeUpdate, Position, RemovedNode};

/// History step over a graph
pub type GraphAction = HistoryAction<Graph>;

/// A node was added (or duplicated) and sits at `index` in graph order
#[must_use]
pub fn node_added(label: &str, node: Node, index: usize) -> GraphAction {
    let id = node.id;
    let restored = RemovedNode {
        node,
        index,
        connections: Vec::new(),
    };
    HistoryAction::new(
        label,
        move |graph: &mut Graph| {
            graph.remove_node(id)?;
            Ok(())
        },
        move |graph: &mut Graph| {
            graph.restore_node(restored.clone())?;
            Ok(())
        },
    )
}

/// A node and its connections were removed
#[must_use]
pub fn node_removed(removed: RemovedNode) -> GraphAction {
    let id = removed.node.id;
    HistoryAction::new(
        "Remove node",
        move |graph: &mut Graph| {
            graph.restore_node(removed.clone())?;
            Ok(())
        },
        move |graph: &mut Graph| {
            graph.remove_node(id)?;
            Ok(())
        },
    )
}

/// A node was patched; socket sync may have pruned connections
#[must_use]
pub fn node_updated(update: NodeUpdate) -> GraphAction {
    let NodeUpdate {
        before,
        after,
        pruned,
    } = update;
    HistoryAction::new(
        "Edit node",
        move |graph: &mut Graph| {
            graph.replace_node(before.clone(), pruned.clone())?;
            Ok(())
        },
        move |graph: &mut Graph| {
            graph.replace_node(after.clone(), Vec::new())?;
            Ok(())
        },
    )
}

/// A connection was made, possibly replacing the previous driver
#[must_use]
pub fn connected(outcome: Connected) -> GraphAction {
    let Connected {
        connection,
        replaced,
    } = outcome;
    let (undo_conn, undo_replaced) = (connection.clone(), replaced.clone());
    HistoryAction::new(
        "Connect",
        move |graph: &mut Graph| {
            graph.disconnect(undo_conn.id)?;
            if let Some(previous) = &undo_replaced {
                graph.restore_connection(previous.clone())?;
            }
            Ok(())
        },
        move |graph: &mut Graph| {
            if let Some(previous) = &replaced {
                graph.disconnect(previous.id)?;
            }
            graph.restore_connection(connection.clone())?;
            Ok(())
        },
    )
}

/// A connection was removed
#[must_use]
pub fn disconnected(connection: Connection) -> GraphAction {
    let id = connection.id;
    HistoryAction::new(
        "Disconnect",
        move |graph: &mut Graph| {
            graph.restore_connection(connection.clone())?;
            Ok(())
        },
        move |graph: &mut Graph| {
            graph.disconnect(id)?;
            Ok(())
        },
    )
}

/// A node was moved
#[must_use]
pub fn node_moved(id: NodeId, from: Option<Position>, to: Position) -> GraphAction {
    HistoryAction::new(
        "Move node",
        move |graph: &mut Graph| {
            match from {
                Some(position) => graph.set_position(id, position)?,
                None => graph.clear_position(id)?,
            }
            Ok(())
        },
        move |graph: &mut Graph| {
            graph.set_position(id, to)?;
            Ok(())
        },
    )
}

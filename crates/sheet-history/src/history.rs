//! Undo/redo stacks
//!
//! Strict LIFO. Recording a new action discards the redo branch.

use crate::error::HistoryError;
use std::fmt;

/// Closure applying one direction of an action to the target
pub type ActionFn<C> = Box<dyn Fn(&mut C) -> Result<(), HistoryError> + Send + Sync>;

/// Inverse pair for one mutation
///
/// Closures capture ids and value snapshots, never references into the
/// target, so an action stays valid after the node it names was removed and
/// re-added under the same id.
pub struct HistoryAction<C> {
    label: String,
    undo: ActionFn<C>,
    redo: ActionFn<C>,
}

impl<C> HistoryAction<C> {
    /// Create action from its two directions
    pub fn new<U, R>(label: impl Into<String>, undo: U, redo: R) -> Self
    where
        U: Fn(&mut C) -> Result<(), HistoryError> + Send + Sync + 'static,
        R: Fn(&mut C) -> Result<(), HistoryError> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            undo: Box::new(undo),
            redo: Box::new(redo),
        }
    }

    /// Human-readable label ("Add node", …)
    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Run the undo direction
    ///
    /// # Errors
    /// Whatever the closure reports
    pub fn undo(&self, target: &mut C) -> Result<(), HistoryError> {
        (self.undo)(target)
    }

    /// Run the redo direction
    ///
    /// # Errors
    /// Whatever the closure reports
    pub fn redo(&self, target: &mut C) -> Result<(), HistoryError> {
        (self.redo)(target)
    }
}

impl<C: 'static> HistoryAction<C> {
    /// Combine actions into one step
    ///
    /// Undo runs the parts in reverse order, redo in forward order.
    #[must_use]
    pub fn batch(label: impl Into<String>, parts: Vec<HistoryAction<C>>) -> Self {
        let parts = std::sync::Arc::new(parts);
        let undo_parts = std::sync::Arc::clone(&parts);
        Self::new(
            label,
            move |target: &mut C| undo_parts.iter().rev().try_for_each(|a| a.undo(target)),
            move |target: &mut C| parts.iter().try_for_each(|a| a.redo(target)),
        )
    }
}

impl<C> fmt::Debug for HistoryAction<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryAction")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Undo and redo stacks over a target of type `C`
#[derive(Debug)]
pub struct History<C> {
    undo_stack: Vec<HistoryAction<C>>,
    redo_stack: Vec<HistoryAction<C>>,
    max_depth: usize,
}

impl<C> History<C> {
    /// Create history keeping at most `max_depth` undo steps (0 = unbounded)
    #[inline]
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_depth,
        }
    }

    /// Record a mutation that was just applied
    ///
    /// Clears the redo stack.
    pub fn record(&mut self, action: HistoryAction<C>) {
        if !self.redo_stack.is_empty() {
            tracing::trace!(discarded = self.redo_stack.len(), "redo branch discarded");
            self.redo_stack.clear();
        }
        self.undo_stack.push(action);
        if self.max_depth > 0 && self.undo_stack.len() > self.max_depth {
            let excess = self.undo_stack.len() - self.max_depth;
            self.undo_stack.drain(..excess);
        }
    }

    /// Undo the most recent action; returns its label, or `None` if empty
    ///
    /// # Errors
    /// The action's error; the action stays on the undo stack
    pub fn undo(&mut self, target: &mut C) -> Result<Option<String>, HistoryError> {
        let Some(action) = self.undo_stack.pop() else {
            return Ok(None);
        };
        if let Err(err) = action.undo(target) {
            tracing::warn!(action = action.label(), error = %err, "undo failed");
            self.undo_stack.push(action);
            return Err(err);
        }
        let label = action.label().to_string();
        self.redo_stack.push(action);
        Ok(Some(label))
    }

    /// Redo the most recently undone action; returns its label, or `None` if empty
    ///
    /// # Errors
    /// The action's error; the action stays on the redo stack
    pub fn redo(&mut self, target: &mut C) -> Result<Option<String>, HistoryError> {
        let Some(action) = self.redo_stack.pop() else {
            return Ok(None);
        };
        if let Err(err) = action.redo(target) {
            tracing::warn!(action = action.label(), error = %err, "redo failed");
            self.redo_stack.push(action);
            return Err(err);
        }
        let label = action.label().to_string();
        self.undo_stack.push(action);
        Ok(Some(label))
    }

    /// Drop all history (new sheet loaded)
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Whether undo is possible
    #[inline]
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Whether redo is possible
    #[inline]
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Label of the next undo
    #[must_use]
    pub fn undo_label(&self) -> Option<&str> {
        self.undo_stack.last().map(HistoryAction::label)
    }

    /// Label of the next redo
    #[must_use]
    pub fn redo_label(&self) -> Option<&str> {
        self.redo_stack.last().map(HistoryAction::label)
    }

    /// Undo stack depth
    #[inline]
    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    /// Redo stack depth
    #[inline]
    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }
}

impl<C> Default for History<C> {
    fn default() -> Self {
        Self::new(100)
    }
}

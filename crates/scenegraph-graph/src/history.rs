//! Snapshot diffing and undo/redo.
//!
//! Undo works on whole snapshots: an [`UndoCommand`] holds the graph state
//! before and after one logical change, and an [`UndoStack`] owned by the
//! host walks back and forth between them.

use crate::config::GraphConfig;
use crate::graph::Graph;
use crate::snapshot::GraphSnapshot;
use log::debug;
use scenegraph_core::Result;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ============================================================================
// DictDiffer
// ============================================================================

/// Key-level comparison of two ordered maps.
///
/// # Example
///
/// ```rust
/// use scenegraph_graph::DictDiffer;
/// use std::collections::BTreeMap;
///
/// let past = BTreeMap::from([("a", 1), ("b", 2), ("c", 3)]);
/// let current = BTreeMap::from([("a", 1), ("b", 5), ("d", 4)]);
/// let diff = DictDiffer::new(&current, &past);
///
/// assert_eq!(diff.output(), "b changed");
/// assert!(diff.added().contains("d"));
/// assert!(diff.removed().contains("c"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DictDiffer<K: Ord> {
    added: BTreeSet<K>,
    removed: BTreeSet<K>,
    changed: BTreeSet<K>,
    unchanged: BTreeSet<K>,
}

impl<K: Ord + Clone + fmt::Display> DictDiffer<K> {
    /// Compares `current` against `past`.
    pub fn new<V: PartialEq>(current: &BTreeMap<K, V>, past: &BTreeMap<K, V>) -> Self {
        let mut diff = Self {
            added: BTreeSet::new(),
            removed: BTreeSet::new(),
            changed: BTreeSet::new(),
            unchanged: BTreeSet::new(),
        };
        for (key, value) in current {
            match past.get(key) {
                None => diff.added.insert(key.clone()),
                Some(old) if old == value => diff.unchanged.insert(key.clone()),
                Some(_) => diff.changed.insert(key.clone()),
            };
        }
        diff.removed = past
            .keys()
            .filter(|k| !current.contains_key(*k))
            .cloned()
            .collect();
        diff
    }

    /// Keys only in the current map.
    pub fn added(&self) -> &BTreeSet<K> {
        &self.added
    }

    /// Keys only in the past map.
    pub fn removed(&self) -> &BTreeSet<K> {
        &self.removed
    }

    /// Keys in both maps with different values.
    pub fn changed(&self) -> &BTreeSet<K> {
        &self.changed
    }

    /// Keys in both maps with equal values.
    pub fn unchanged(&self) -> &BTreeSet<K> {
        &self.unchanged
    }

    /// Returns true when nothing was added, removed or changed.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    /// Summary of changed keys, e.g. `"a, b changed"`; empty when no key
    /// changed.
    pub fn output(&self) -> String {
        if self.changed.is_empty() {
            return String::new();
        }
        let keys: Vec<String> = self.changed.iter().map(ToString::to_string).collect();
        format!("{} changed", keys.join(", "))
    }
}

// ============================================================================
// UndoCommand
// ============================================================================

/// Lifecycle of an [`UndoCommand`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CommandState {
    /// Recorded; the change is live but the command has not been pushed.
    #[default]
    Pending,
    /// The `after` state is current.
    Applied,
    /// The `before` state is current.
    Undone,
}

/// One undoable change: the graph state on either side of it.
#[derive(Clone, Debug)]
pub struct UndoCommand {
    before: GraphSnapshot,
    after: GraphSnapshot,
    label: String,
    state: CommandState,
}

impl UndoCommand {
    /// Creates a pending command.
    pub fn new(label: impl Into<String>, before: GraphSnapshot, after: GraphSnapshot) -> Self {
        Self {
            before,
            after,
            label: label.into(),
            state: CommandState::Pending,
        }
    }

    /// Display text.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Current state.
    pub fn state(&self) -> CommandState {
        self.state
    }

    /// State before the change.
    pub fn before(&self) -> &GraphSnapshot {
        &self.before
    }

    /// State after the change.
    pub fn after(&self) -> &GraphSnapshot {
        &self.after
    }

    /// Re-applies the change. The first call only marks the command
    /// applied, since the change is already live when it is recorded.
    pub fn redo(&mut self, graph: &mut Graph) -> Result<()> {
        match self.state {
            CommandState::Pending => {}
            CommandState::Undone => graph.restore(&self.after)?,
            CommandState::Applied => return Ok(()),
        }
        self.state = CommandState::Applied;
        Ok(())
    }

    /// Reverts the change.
    pub fn undo(&mut self, graph: &mut Graph) -> Result<()> {
        if self.state == CommandState::Undone {
            return Ok(());
        }
        graph.restore(&self.before)?;
        self.state = CommandState::Undone;
        Ok(())
    }
}

// ============================================================================
// UndoStack
// ============================================================================

/// Bounded undo/redo stack.
///
/// Commands below `index` are applied; the rest form the redo tail,
/// which pushing a new command discards.
#[derive(Clone, Debug, Default)]
pub struct UndoStack {
    commands: Vec<UndoCommand>,
    index: usize,
    limit: usize,
}

impl UndoStack {
    /// Creates a stack holding at most `limit` commands (0 = unbounded).
    pub fn new(limit: usize) -> Self {
        Self {
            commands: Vec::new(),
            index: 0,
            limit,
        }
    }

    /// Creates a stack using the configured undo limit.
    pub fn from_config(config: &GraphConfig) -> Self {
        Self::new(config.undo_limit)
    }

    /// Applies `command` (a no-op for freshly recorded commands) and makes
    /// it the newest entry.
    pub fn push(&mut self, mut command: UndoCommand, graph: &mut Graph) -> Result<()> {
        command.redo(graph)?;
        self.commands.truncate(self.index);
        debug!("Pushing undo command {:?}", command.label());
        self.commands.push(command);
        if self.limit > 0 && self.commands.len() > self.limit {
            let excess = self.commands.len() - self.limit;
            self.commands.drain(..excess);
        }
        self.index = self.commands.len();
        Ok(())
    }

    /// Undoes the newest applied command. Returns false when there is
    /// nothing to undo.
    pub fn undo(&mut self, graph: &mut Graph) -> Result<bool> {
        if self.index == 0 {
            return Ok(false);
        }
        self.commands[self.index - 1].undo(graph)?;
        self.index -= 1;
        Ok(true)
    }

    /// Redoes the oldest undone command. Returns false when there is
    /// nothing to redo.
    pub fn redo(&mut self, graph: &mut Graph) -> Result<bool> {
        let Some(command) = self.commands.get_mut(self.index) else {
            return Ok(false);
        };
        command.redo(graph)?;
        self.index += 1;
        Ok(true)
    }

    /// Returns whether [`undo`](Self::undo) would do anything.
    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    /// Returns whether [`redo`](Self::redo) would do anything.
    pub fn can_redo(&self) -> bool {
        self.index < self.commands.len()
    }

    /// Label of the command [`undo`](Self::undo) would revert.
    pub fn undo_text(&self) -> Option<&str> {
        self.index
            .checked_sub(1)
            .and_then(|i| self.commands.get(i))
            .map(UndoCommand::label)
    }

    /// Label of the command [`redo`](Self::redo) would re-apply.
    pub fn redo_text(&self) -> Option<&str> {
        self.commands.get(self.index).map(UndoCommand::label)
    }

    /// Drops every command.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.index = 0;
    }

    /// Number of commands held.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns true when the stack holds no commands.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Maximum number of commands kept (0 = unbounded).
    pub fn limit(&self) -> usize {
        self.limit
    }
}

// ============================================================================
// Recording
// ============================================================================

impl Graph {
    /// Runs `f` as one undoable change.
    ///
    /// Returns the closure's value and, when the graph actually changed, a
    /// pending [`UndoCommand`] ready for [`UndoStack::push`]. A failing
    /// closure rolls back and records nothing.
    pub fn record<T>(
        &mut self,
        label: impl Into<String>,
        f: impl FnOnce(&mut Graph) -> Result<T>,
    ) -> Result<(T, Option<UndoCommand>)> {
        let before = self.snapshot();
        let value = self.transaction(f)?;
        let after = self.snapshot();
        let command = (before != after).then(|| UndoCommand::new(label, before, after));
        Ok((value, command))
    }
}

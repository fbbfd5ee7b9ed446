// SPDX-License-Identifier: MIT OR Apache-2.0
//! Undo/redo history: commands grouped into transactions.
//!
//! A [`History`] only stores commands. Replaying them needs the whole
//! manager, see [`crate::GraphManager::undo`] and
//! [`crate::GraphManager::redo`].

use crate::geometry::Point;
use crate::id::{ConnectorId, NodeId, PortId, RouterId, SelectableId};
use crate::node::NodeProperty;
use crate::port::{PortFlags, PortValue};
use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Maximum undo history depth
pub const MAX_HISTORY: usize = 100;

/// History errors
#[derive(Debug, Error)]
pub enum HistoryError {
    /// A transaction is already open
    #[error("Transaction '{0}' is still open")]
    TransactionAlreadyOpen(String),

    /// Undo/redo attempted while a transaction is being recorded
    #[error("Cannot replay history while transaction '{0}' is open")]
    ReplayDuringTransaction(String),
}

/// Result type for history operations
pub type Result<T> = std::result::Result<T, HistoryError>;

/// Unique transaction ID, monotonic per history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(u64);

impl TransactionId {
    /// Get the raw ID value
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// One reversible state change.
///
/// Structural commands carry a serialized snapshot of the subtree they
/// create or destroy, so replay rebuilds ports and routers in the same
/// order loading a file would.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// A node (with its ports) was created
    CreateNode {
        /// The node
        node: NodeId,
        /// Snapshot taken right after creation
        snapshot: String,
    },
    /// A node was destroyed
    DestroyNode {
        /// The node
        node: NodeId,
        /// Position in the graph's node list
        index: usize,
        /// Snapshot taken right before destruction
        snapshot: String,
    },
    /// A port was added to an existing node
    CreatePort {
        /// The port
        port: PortId,
        /// Position in the owning node's port list
        index: usize,
        /// Snapshot taken right after creation
        snapshot: String,
    },
    /// A port was removed from a node
    DestroyPort {
        /// The port
        port: PortId,
        /// Position in the owning node's port list
        index: usize,
        /// Snapshot taken right before destruction
        snapshot: String,
    },
    /// A connector was established
    CreateConnector {
        /// The connector
        connector: ConnectorId,
        /// Snapshot with both ends attached
        snapshot: String,
    },
    /// A connector was removed
    DestroyConnector {
        /// The connector
        connector: ConnectorId,
        /// Position in the graph's connector list
        index: usize,
        /// Snapshot including routers
        snapshot: String,
    },
    /// A router was inserted
    CreateRouter {
        /// The router
        router: RouterId,
        /// Snapshot, carries the router index
        snapshot: String,
    },
    /// A router was removed
    DestroyRouter {
        /// The router
        router: RouterId,
        /// Snapshot, carries the router index
        snapshot: String,
    },
    /// A scalar node property changed
    NodeProperty {
        /// The node
        node: NodeId,
        /// Value before
        before: NodeProperty,
        /// Value after
        after: NodeProperty,
    },
    /// A property port's value changed
    PortValue {
        /// The port
        port: PortId,
        /// Value before
        before: Option<PortValue>,
        /// Value after
        after: Option<PortValue>,
    },
    /// A port's connection flags changed
    PortFlags {
        /// The port
        port: PortId,
        /// Flags before
        before: PortFlags,
        /// Flags after
        after: PortFlags,
    },
    /// A selectable moved
    Move {
        /// What moved
        target: SelectableId,
        /// Position before
        before: Point,
        /// Position after
        after: Point,
    },
    /// Selection membership changed; `selected` is the state after
    Selection {
        /// Entity whose membership changed
        target: SelectableId,
        /// Membership after the change
        selected: bool,
    },
    /// Z-order of a graph's selectables was renumbered
    ZOrder {
        /// Z values before
        before: Vec<(SelectableId, i32)>,
        /// Z values after
        after: Vec<(SelectableId, i32)>,
    },
}

impl Command {
    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::CreateNode { .. } => "Creating node",
            Self::DestroyNode { .. } => "Destroying node",
            Self::CreatePort { .. } => "Creating port",
            Self::DestroyPort { .. } => "Destroying port",
            Self::CreateConnector { .. } => "Creating connector",
            Self::DestroyConnector { .. } => "Destroying connector",
            Self::CreateRouter { .. } => "Creating router",
            Self::DestroyRouter { .. } => "Destroying router",
            Self::NodeProperty { .. } => "Setting property",
            Self::PortValue { .. } => "Setting port value",
            Self::PortFlags { .. } => "Setting port flags",
            Self::Move { .. } => "Moving selectable",
            Self::Selection { .. } => "Selection",
            Self::ZOrder { .. } => "Reordering",
        }
    }

    /// Approximate memory held by this command
    pub fn memory_size(&self) -> usize {
        let payload = match self {
            Self::CreateNode { snapshot, .. }
            | Self::DestroyNode { snapshot, .. }
            | Self::CreatePort { snapshot, .. }
            | Self::DestroyPort { snapshot, .. }
            | Self::CreateConnector { snapshot, .. }
            | Self::DestroyConnector { snapshot, .. }
            | Self::CreateRouter { snapshot, .. }
            | Self::DestroyRouter { snapshot, .. } => snapshot.len(),
            Self::ZOrder { before, after } => {
                (before.len() + after.len()) * std::mem::size_of::<(SelectableId, i32)>()
            }
            _ => 0,
        };
        std::mem::size_of::<Self>() + payload
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Group of commands that are undone/redone together
#[derive(Debug, Clone)]
pub struct Transaction {
    /// Transaction ID
    pub id: TransactionId,
    /// Human-readable label
    pub label: String,
    /// Commands, in the order they were recorded
    pub commands: Vec<Command>,
    /// Seconds since the epoch when the transaction was opened
    pub timestamp: u64,
}

impl Transaction {
    fn new(id: TransactionId, label: String) -> Self {
        Self {
            id,
            label,
            commands: Vec::new(),
            timestamp: now_secs(),
        }
    }

    /// Get total memory size of this transaction
    pub fn memory_size(&self) -> usize {
        self.commands.iter().map(Command::memory_size).sum()
    }

    /// Get command count
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// True when no command was recorded
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// History statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryStats {
    /// Transactions in undo stack
    pub undo_count: usize,
    /// Transactions in redo stack
    pub redo_count: usize,
    /// Total memory used by history (bytes)
    pub memory_used: usize,
    /// Maximum history depth
    pub max_depth: usize,
}

/// Undo/redo history of one graph
#[derive(Debug)]
pub struct History {
    undo_stack: VecDeque<Transaction>,
    redo_stack: VecDeque<Transaction>,
    open: Option<Transaction>,
    next_id: u64,
    max_depth: usize,
    memory_used: usize,
    suppressed: u32,
}

impl History {
    /// Create a new history manager
    pub fn new() -> Self {
        Self::with_max_depth(MAX_HISTORY)
    }

    /// Create with custom maximum depth
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            open: None,
            next_id: 1,
            max_depth: max_depth.max(1),
            memory_used: 0,
            suppressed: 0,
        }
    }

    /// Open a transaction; only one may be open at a time
    pub fn begin_transaction(&mut self, label: &str) -> Result<TransactionId> {
        if let Some(open) = &self.open {
            return Err(HistoryError::TransactionAlreadyOpen(open.label.clone()));
        }
        let id = TransactionId(self.next_id);
        self.next_id += 1;
        self.open = Some(Transaction::new(id, label.to_string()));
        Ok(id)
    }

    /// Append a command to the open transaction.
    ///
    /// Outside a transaction, or while recording is suppressed, this is a
    /// no-op and returns false.
    pub fn add_command(&mut self, command: Command) -> bool {
        if self.suppressed > 0 {
            return false;
        }
        match &mut self.open {
            Some(transaction) => {
                transaction.commands.push(command);
                true
            }
            None => false,
        }
    }

    /// Close the open transaction.
    ///
    /// An empty transaction is discarded when `cancel_if_empty` is set;
    /// anything else lands on the undo stack and clears the redo stack.
    /// Returns the committed transaction's id.
    pub fn end_transaction(&mut self, cancel_if_empty: bool) -> Option<TransactionId> {
        let Some(transaction) = self.open.take() else {
            tracing::debug!("end_transaction called with no open transaction");
            return None;
        };
        if transaction.is_empty() && cancel_if_empty {
            return None;
        }

        let id = transaction.id;
        self.redo_stack.clear();
        self.push_undo(transaction);
        self.recount_memory();
        Some(id)
    }

    /// Drop the open transaction without committing it
    pub fn cancel_transaction(&mut self) -> Option<Transaction> {
        self.open.take()
    }

    /// True while a transaction is open
    pub fn in_transaction(&self) -> bool {
        self.open.is_some()
    }

    /// Label of the open transaction
    pub fn open_label(&self) -> Option<&str> {
        self.open.as_ref().map(|t| t.label.as_str())
    }

    /// True when `add_command` would record
    pub fn is_recording(&self) -> bool {
        self.open.is_some() && self.suppressed == 0
    }

    pub(crate) fn suppress(&mut self) {
        self.suppressed += 1;
    }

    pub(crate) fn resume(&mut self) {
        self.suppressed = self.suppressed.saturating_sub(1);
    }

    fn push_undo(&mut self, transaction: Transaction) {
        self.undo_stack.push_back(transaction);
        while self.undo_stack.len() > self.max_depth {
            self.undo_stack.pop_front();
        }
    }

    fn recount_memory(&mut self) {
        self.memory_used = self
            .undo_stack
            .iter()
            .chain(&self.redo_stack)
            .map(Transaction::memory_size)
            .sum();
    }

    pub(crate) fn take_undo(&mut self) -> Option<Transaction> {
        self.undo_stack.pop_back()
    }

    pub(crate) fn take_redo(&mut self) -> Option<Transaction> {
        self.redo_stack.pop_back()
    }

    pub(crate) fn finish_undo(&mut self, transaction: Transaction) {
        self.redo_stack.push_back(transaction);
        self.recount_memory();
    }

    pub(crate) fn finish_redo(&mut self, transaction: Transaction) {
        self.push_undo(transaction);
        self.recount_memory();
    }

    /// Put back a transaction whose undo failed
    pub(crate) fn return_undo(&mut self, transaction: Transaction) {
        self.undo_stack.push_back(transaction);
    }

    /// Put back a transaction whose redo failed
    pub(crate) fn return_redo(&mut self, transaction: Transaction) {
        self.redo_stack.push_back(transaction);
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Get undo stack depth
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Get redo stack depth
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Maximum number of undoable transactions
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Clear all history, including any open transaction
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.open = None;
        self.memory_used = 0;
    }

    /// Get history statistics
    pub fn stats(&self) -> HistoryStats {
        HistoryStats {
            undo_count: self.undo_stack.len(),
            redo_count: self.redo_stack.len(),
            memory_used: self.memory_used,
            max_depth: self.max_depth,
        }
    }

    /// Get label of next undo transaction
    pub fn undo_label(&self) -> Option<&str> {
        self.undo_stack.back().map(|t| t.label.as_str())
    }

    /// Get label of next redo transaction
    pub fn redo_label(&self) -> Option<&str> {
        self.redo_stack.back().map(|t| t.label.as_str())
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select(selected: bool) -> Command {
        Command::Selection {
            target: SelectableId::Node(NodeId::new()),
            selected,
        }
    }

    #[test]
    fn test_add_outside_transaction_is_ignored() {
        let mut history = History::new();
        assert!(!history.add_command(select(true)));
        assert!(history.end_transaction(false).is_none());
        assert!(!history.can_undo());
    }

    #[test]
    fn test_nested_begin_is_rejected() {
        let mut history = History::new();
        history.begin_transaction("Outer").unwrap();
        assert!(matches!(
            history.begin_transaction("Inner"),
            Err(HistoryError::TransactionAlreadyOpen(label)) if label == "Outer"
        ));
    }

    #[test]
    fn test_cancel_if_empty() {
        let mut history = History::new();
        history.begin_transaction("Nothing").unwrap();
        assert!(history.end_transaction(true).is_none());
        assert_eq!(history.undo_depth(), 0);

        history.begin_transaction("Empty but kept").unwrap();
        assert!(history.end_transaction(false).is_some());
        assert_eq!(history.undo_label(), Some("Empty but kept"));
    }

    #[test]
    fn test_commit_clears_redo_and_bounds_depth() {
        let mut history = History::with_max_depth(3);
        for i in 0..5 {
            history.begin_transaction(&format!("T{i}")).unwrap();
            history.add_command(select(true));
            history.end_transaction(true);
        }
        assert_eq!(history.undo_depth(), 3);
        assert_eq!(history.undo_label(), Some("T4"));

        let t = history.take_undo().unwrap();
        history.finish_undo(t);
        assert!(history.can_redo());

        history.begin_transaction("New").unwrap();
        history.add_command(select(false));
        history.end_transaction(true);
        assert!(!history.can_redo());
        assert!(history.stats().memory_used > 0);
    }

    #[test]
    fn test_suppression_blocks_recording() {
        let mut history = History::new();
        history.begin_transaction("Replay").unwrap();
        history.suppress();
        assert!(!history.is_recording());
        assert!(!history.add_command(select(true)));
        history.resume();
        assert!(history.add_command(select(true)));
    }
}

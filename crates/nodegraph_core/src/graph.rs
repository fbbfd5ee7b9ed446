// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph document: ordered ownership lists plus history and selection.

use crate::history::History;
use crate::id::{ConnectorId, GraphId, NodeId, RouterId, SelectableId};
use indexmap::IndexSet;

/// A node graph document
#[derive(Debug)]
pub struct Graph {
    /// Unique graph ID
    pub id: GraphId,
    /// Graph name
    pub name: String,
    pub(crate) nodes: Vec<NodeId>,
    pub(crate) connectors: Vec<ConnectorId>,
    pub(crate) routers: Vec<RouterId>,
    pub(crate) history: History,
    pub(crate) selection: IndexSet<SelectableId>,
}

impl Graph {
    /// Create a new empty graph
    pub(crate) fn new(id: GraphId, name: impl Into<String>, history_capacity: usize) -> Self {
        Self {
            id,
            name: name.into(),
            nodes: Vec::new(),
            connectors: Vec::new(),
            routers: Vec::new(),
            history: History::with_max_depth(history_capacity),
            selection: IndexSet::new(),
        }
    }

    /// Nodes in document order
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Connectors in document order
    pub fn connectors(&self) -> &[ConnectorId] {
        &self.connectors
    }

    /// Routers of every connector, in creation order
    pub fn routers(&self) -> &[RouterId] {
        &self.routers
    }

    /// Undo/redo history
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Selected entities, in selection order
    pub fn selection(&self) -> &IndexSet<SelectableId> {
        &self.selection
    }

    /// Every selectable entity (nodes, then routers)
    pub fn selectables(&self) -> impl Iterator<Item = SelectableId> + '_ {
        self.nodes
            .iter()
            .map(|id| SelectableId::Node(*id))
            .chain(self.routers.iter().map(|id| SelectableId::Router(*id)))
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get the number of connectors
    pub fn connector_count(&self) -> usize {
        self.connectors.len()
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Id-keyed index of every live entity.
//!
//! Ownership is expressed by the ordered id lists inside graphs, nodes and
//! connectors; the registry only resolves ids. Lookups never fail, the
//! `require_*` variants turn a miss into a [`GraphError`].

use crate::connector::Connector;
use crate::error::{GraphError, Result};
use crate::geometry::{Point, Rect};
use crate::graph::Graph;
use crate::id::{ConnectorId, GraphId, NodeId, PortId, RouterId, SelectableId};
use crate::node::Node;
use crate::port::Port;
use crate::router::Router;
use indexmap::IndexMap;
use uuid::Uuid;

/// Maps from id to entity for every kind
#[derive(Debug, Default)]
pub struct Registry {
    pub(crate) graphs: IndexMap<GraphId, Graph>,
    pub(crate) nodes: IndexMap<NodeId, Node>,
    pub(crate) ports: IndexMap<PortId, Port>,
    pub(crate) connectors: IndexMap<ConnectorId, Connector>,
    pub(crate) routers: IndexMap<RouterId, Router>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// True when any entity of any kind uses this uuid
    pub fn is_registered(&self, id: Uuid) -> bool {
        self.graphs.contains_key(&GraphId(id))
            || self.nodes.contains_key(&NodeId(id))
            || self.ports.contains_key(&PortId(id))
            || self.connectors.contains_key(&ConnectorId(id))
            || self.routers.contains_key(&RouterId(id))
    }

    pub(crate) fn ensure_free(&self, id: Uuid) -> Result<()> {
        if self.is_registered(id) {
            return Err(GraphError::DuplicateId(id));
        }
        Ok(())
    }

    /// Find a graph
    pub fn graph(&self, id: GraphId) -> Option<&Graph> {
        self.graphs.get(&id)
    }

    /// Find a node
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Find a port
    pub fn port(&self, id: PortId) -> Option<&Port> {
        self.ports.get(&id)
    }

    /// Find a connector
    pub fn connector(&self, id: ConnectorId) -> Option<&Connector> {
        self.connectors.get(&id)
    }

    /// Find a router
    pub fn router(&self, id: RouterId) -> Option<&Router> {
        self.routers.get(&id)
    }

    /// All graphs, in creation order
    pub fn graphs(&self) -> impl Iterator<Item = &Graph> {
        self.graphs.values()
    }

    pub(crate) fn require_graph(&self, id: GraphId) -> Result<&Graph> {
        self.graphs.get(&id).ok_or(GraphError::UnknownGraph(id))
    }

    pub(crate) fn require_graph_mut(&mut self, id: GraphId) -> Result<&mut Graph> {
        self.graphs.get_mut(&id).ok_or(GraphError::UnknownGraph(id))
    }

    pub(crate) fn require_node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(&id).ok_or(GraphError::UnknownNode(id))
    }

    pub(crate) fn require_node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(&id).ok_or(GraphError::UnknownNode(id))
    }

    pub(crate) fn require_port(&self, id: PortId) -> Result<&Port> {
        self.ports.get(&id).ok_or(GraphError::UnknownPort(id))
    }

    pub(crate) fn require_port_mut(&mut self, id: PortId) -> Result<&mut Port> {
        self.ports.get_mut(&id).ok_or(GraphError::UnknownPort(id))
    }

    pub(crate) fn require_connector(&self, id: ConnectorId) -> Result<&Connector> {
        self.connectors.get(&id).ok_or(GraphError::UnknownConnector(id))
    }

    pub(crate) fn require_connector_mut(&mut self, id: ConnectorId) -> Result<&mut Connector> {
        self.connectors.get_mut(&id).ok_or(GraphError::UnknownConnector(id))
    }

    pub(crate) fn require_router(&self, id: RouterId) -> Result<&Router> {
        self.routers.get(&id).ok_or(GraphError::UnknownRouter(id))
    }

    pub(crate) fn require_router_mut(&mut self, id: RouterId) -> Result<&mut Router> {
        self.routers.get_mut(&id).ok_or(GraphError::UnknownRouter(id))
    }

    /// Graph that owns a port, through its node
    pub fn graph_of_port(&self, port: PortId) -> Option<GraphId> {
        let port = self.ports.get(&port)?;
        self.nodes.get(&port.owner).map(|n| n.owner)
    }

    /// Graph that owns a selectable
    pub fn graph_of_selectable(&self, id: SelectableId) -> Option<GraphId> {
        match id {
            SelectableId::Node(node) => self.nodes.get(&node).map(|n| n.owner),
            SelectableId::Router(router) => self.routers.get(&router).map(|r| r.graph),
        }
    }

    /// True if the selectable is registered
    pub fn contains_selectable(&self, id: SelectableId) -> bool {
        match id {
            SelectableId::Node(node) => self.nodes.contains_key(&node),
            SelectableId::Router(router) => self.routers.contains_key(&router),
        }
    }

    pub(crate) fn position_of(&self, id: SelectableId) -> Option<Point> {
        match id {
            SelectableId::Node(node) => self.nodes.get(&node).map(Node::position),
            SelectableId::Router(router) => self.routers.get(&router).map(Router::position),
        }
    }

    pub(crate) fn set_position(&mut self, id: SelectableId, position: Point) -> Result<()> {
        match id {
            SelectableId::Node(node) => self.require_node_mut(node)?.position = position,
            SelectableId::Router(router) => self.require_router_mut(router)?.position = position,
        }
        Ok(())
    }

    pub(crate) fn bounds_of(&self, id: SelectableId) -> Option<Rect> {
        match id {
            SelectableId::Node(node) => self.nodes.get(&node).map(Node::bounds),
            SelectableId::Router(router) => self.routers.get(&router).map(Router::bounds),
        }
    }

    pub(crate) fn z_of(&self, id: SelectableId) -> Option<i32> {
        match id {
            SelectableId::Node(node) => self.nodes.get(&node).map(Node::z_index),
            SelectableId::Router(router) => self.routers.get(&router).map(Router::z_index),
        }
    }

    pub(crate) fn set_z(&mut self, id: SelectableId, z: i32) {
        match id {
            SelectableId::Node(node) => {
                if let Some(n) = self.nodes.get_mut(&node) {
                    n.z_index = z;
                }
            }
            SelectableId::Router(router) => {
                if let Some(r) = self.routers.get_mut(&router) {
                    r.z_index = z;
                }
            }
        }
    }

    pub(crate) fn set_selected_flag(&mut self, id: SelectableId, selected: bool) {
        match id {
            SelectableId::Node(node) => {
                if let Some(n) = self.nodes.get_mut(&node) {
                    n.is_selected = selected;
                }
            }
            SelectableId::Router(router) => {
                if let Some(r) = self.routers.get_mut(&router) {
                    r.is_selected = selected;
                }
            }
        }
    }

    /// Total number of registered entities
    pub fn len(&self) -> usize {
        self.graphs.len() + self.nodes.len() + self.ports.len() + self.connectors.len() + self.routers.len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Creation and destruction of graphs, nodes, ports, connectors and routers.
//!
//! The public operations cascade children before parents, emit lifecycle
//! events and record history. The `*_raw` and `materialize_*` helpers only
//! keep the registry and the ownership lists consistent; undo/redo and
//! loading go through them, so live edits and replay share one code path.

use crate::connector::Connector;
use crate::error::{GraphError, Result};
use crate::events::GraphEvent;
use crate::geometry::Point;
use crate::graph::Graph;
use crate::history::Command;
use crate::id::{ConnectorId, EntityRef, GraphId, NodeId, PortId, RouterId, SelectableId};
use crate::manager::{GraphManager, InteractionMode};
use crate::node::Node;
use crate::port::{Port, PortSpec};
use crate::router::Router;
use crate::serialization::{self, ConnectorRecord, NodeRecord, SerializeError};
use indexmap::IndexSet;

/// How an entity came into existence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    /// A live edit
    Live,
    /// Rebuilt from serialized form (load, undo, redo)
    Restore,
}

impl Origin {
    fn event(self, entity: EntityRef) -> GraphEvent {
        match self {
            Self::Live => GraphEvent::Created(entity),
            Self::Restore => GraphEvent::Deserialized(entity),
        }
    }
}

fn unresolved_port(id: PortId) -> GraphError {
    SerializeError::UnresolvedReference {
        kind: "port",
        id: id.to_string(),
    }
    .into()
}

impl GraphManager {
    // Graphs

    /// Create an empty graph
    pub fn create_graph(&mut self, name: impl Into<String>) -> GraphId {
        let id = GraphId::new();
        let graph = Graph::new(id, name, self.config().history_capacity);
        tracing::debug!("Created graph '{}' ({id})", graph.name);
        self.registry.graphs.insert(id, graph);
        self.emit(GraphEvent::Created(EntityRef::Graph(id)));
        id
    }

    pub(crate) fn insert_graph(&mut self, id: GraphId, name: &str, origin: Origin) -> Result<GraphId> {
        self.registry.ensure_free(id.uuid())?;
        let graph = Graph::new(id, name, self.config().history_capacity);
        self.registry.graphs.insert(id, graph);
        self.emit(origin.event(EntityRef::Graph(id)));
        Ok(id)
    }

    /// Destroy a graph and everything it owns.
    ///
    /// Any gesture bound to the graph is cancelled first. Nothing is
    /// recorded: the graph's history goes away with it. Returns false if
    /// the graph is unknown.
    pub fn destroy_graph(&mut self, graph: GraphId) -> Result<bool> {
        let Some(g) = self.registry.graph(graph) else {
            return Ok(false);
        };
        let nodes = g.nodes.clone();

        if self.mode.graph() == Some(graph) {
            self.cancel_interaction()?;
        }

        self.emit(GraphEvent::PreDestroy(EntityRef::Graph(graph)));
        self.with_history_suppressed(graph, |manager| {
            for node in nodes {
                manager.destroy_node(node)?;
            }
            Ok::<_, GraphError>(())
        })?;

        if !self.registry.require_graph(graph)?.connectors.is_empty() {
            return Err(GraphError::GraphStillHasConnectors(graph));
        }
        self.registry.graphs.shift_remove(&graph);
        self.emit(GraphEvent::PostDestroy(EntityRef::Graph(graph)));
        tracing::debug!("Destroyed graph {graph}");
        Ok(true)
    }

    // Nodes

    /// Create a node of a registered type at `position`.
    ///
    /// Ports are built from the type's schema, flow ports first. The node
    /// is placed on top of the graph's z-order.
    pub fn create_node(&mut self, graph: GraphId, node_type: &str, position: Point) -> Result<NodeId> {
        self.registry.require_graph(graph)?;
        let node_type = self
            .node_types()
            .get(node_type)
            .cloned()
            .ok_or_else(|| GraphError::UnknownNodeType(node_type.to_string()))?;

        let id = NodeId::new();
        let z_index = self.next_z(graph);
        let node = Node::new(id, graph, &node_type, position, z_index, self.config().default_node_size);
        self.registry.nodes.insert(id, node);
        self.registry.require_graph_mut(graph)?.nodes.push(id);
        self.emit(GraphEvent::Created(EntityRef::Node(id)));

        for spec in node_type.ports_in_creation_order() {
            let port = Port::from_spec(PortId::new(), id, spec);
            let port_id = port.id;
            self.insert_port_raw(port, None)?;
            self.emit(GraphEvent::Created(EntityRef::Port(port_id)));
        }

        if self.is_recording(graph) {
            let snapshot = serialization::node_snapshot(&self.registry, id)?;
            self.record(graph, Command::CreateNode { node: id, snapshot });
        }
        tracing::debug!("Created node {id} ({}) in graph {graph}", node_type.id);
        Ok(id)
    }

    /// Destroy a node, its ports and every connector touching them.
    ///
    /// Returns false if the node is unknown.
    pub fn destroy_node(&mut self, node: NodeId) -> Result<bool> {
        let Some(n) = self.registry.node(node) else {
            return Ok(false);
        };
        let graph = n.owner;
        let ports: Vec<PortId> = n.all_ports().collect();

        self.emit(GraphEvent::PreDestroy(EntityRef::Node(node)));
        self.set_selected(graph, SelectableId::Node(node), false, true)?;
        for connector in self.connectors_on_ports(&ports) {
            self.destroy_connector(connector)?;
        }

        let snapshot = if self.is_recording(graph) {
            Some(serialization::node_snapshot(&self.registry, node)?)
        } else {
            None
        };
        let index = self.remove_node_raw(node)?;
        if let Some(snapshot) = snapshot {
            self.record(graph, Command::DestroyNode { node, index, snapshot });
        }
        self.compact_z_order(graph)?;

        self.emit(GraphEvent::PostDestroy(EntityRef::Node(node)));
        tracing::debug!("Destroyed node {node}");
        Ok(true)
    }

    pub(crate) fn connectors_on_ports(&self, ports: &[PortId]) -> Vec<ConnectorId> {
        let mut found = IndexSet::new();
        for port in ports {
            if let Some(port) = self.registry.port(*port) {
                found.extend(port.connectors.iter().copied());
            }
        }
        found.into_iter().collect()
    }

    /// Remove a node and its ports; returns its former list position
    pub(crate) fn remove_node_raw(&mut self, node: NodeId) -> Result<usize> {
        let n = self.registry.require_node(node)?;
        let graph = n.owner;
        let ports: Vec<PortId> = n.all_ports().collect();

        for connector in self.connectors_on_ports(&ports) {
            self.remove_connector_raw(connector)?;
        }
        for port in ports {
            self.emit(GraphEvent::PreDestroy(EntityRef::Port(port)));
            self.registry.ports.shift_remove(&port);
            self.emit(GraphEvent::PostDestroy(EntityRef::Port(port)));
        }
        self.set_selected(graph, SelectableId::Node(node), false, false)?;

        let g = self.registry.require_graph_mut(graph)?;
        let index = match g.nodes.iter().position(|id| *id == node) {
            Some(index) => {
                g.nodes.remove(index);
                index
            }
            None => g.nodes.len(),
        };
        self.registry.nodes.shift_remove(&node);
        Ok(index)
    }

    /// Register a node and its ports from a record, at `index` in the
    /// graph's node list (appended when `None`)
    pub(crate) fn materialize_node(&mut self, record: NodeRecord, index: Option<usize>, origin: Origin) -> Result<NodeId> {
        let NodeRecord { node, ports } = record;
        let (id, graph) = (node.id, node.owner);

        self.registry.require_graph(graph)?;
        self.registry.ensure_free(id.uuid())?;
        let mut seen = IndexSet::new();
        for port in &ports {
            self.registry.ensure_free(port.id.uuid())?;
            if port.id.uuid() == id.uuid() || !seen.insert(port.id) {
                return Err(GraphError::DuplicateId(port.id.uuid()));
            }
        }

        self.registry.nodes.insert(id, node);
        let g = self.registry.require_graph_mut(graph)?;
        let at = index.unwrap_or(g.nodes.len()).min(g.nodes.len());
        g.nodes.insert(at, id);
        self.emit(origin.event(EntityRef::Node(id)));

        for port in ports {
            let port_id = port.id;
            self.registry.ports.insert(port_id, port);
            self.emit(origin.event(EntityRef::Port(port_id)));
        }
        Ok(id)
    }

    // Ports

    /// Add a port to an existing node, at `index` within its list
    /// (appended when `None`)
    pub fn create_port(&mut self, node: NodeId, spec: &PortSpec, index: Option<usize>) -> Result<PortId> {
        let graph = self.registry.require_node(node)?.owner;
        let port = Port::from_spec(PortId::new(), node, spec);
        let id = port.id;
        let at = self.insert_port_raw(port, index)?;
        self.emit(GraphEvent::Created(EntityRef::Port(id)));

        if self.is_recording(graph) {
            let snapshot = serialization::port_snapshot(&self.registry, id)?;
            self.record(graph, Command::CreatePort { port: id, index: at, snapshot });
        }
        tracing::debug!("Created port '{}' on node {node}", spec.name);
        Ok(id)
    }

    /// Remove a port and every connector on it.
    ///
    /// Returns false if the port is unknown.
    pub fn destroy_port(&mut self, port: PortId) -> Result<bool> {
        let Some(p) = self.registry.port(port) else {
            return Ok(false);
        };
        let connectors = p.connectors.clone();
        let graph = self.registry.require_node(p.owner)?.owner;

        self.emit(GraphEvent::PreDestroy(EntityRef::Port(port)));
        for connector in connectors {
            self.destroy_connector(connector)?;
        }

        let snapshot = if self.is_recording(graph) {
            Some(serialization::port_snapshot(&self.registry, port)?)
        } else {
            None
        };
        let index = self.remove_port_raw(port)?;
        if let Some(snapshot) = snapshot {
            self.record(graph, Command::DestroyPort { port, index, snapshot });
        }

        self.emit(GraphEvent::PostDestroy(EntityRef::Port(port)));
        Ok(true)
    }

    /// Insert a port into its owner's list; returns the position used
    pub(crate) fn insert_port_raw(&mut self, port: Port, index: Option<usize>) -> Result<usize> {
        self.registry.ensure_free(port.id.uuid())?;
        let (id, list) = (port.id, port.list());
        let ports = self.registry.require_node_mut(port.owner)?.ports_mut(list);
        let at = index.unwrap_or(ports.len()).min(ports.len());
        ports.insert(at, id);
        self.registry.ports.insert(id, port);
        Ok(at)
    }

    pub(crate) fn remove_port_raw(&mut self, port: PortId) -> Result<usize> {
        let p = self.registry.require_port(port)?;
        let (owner, list) = (p.owner, p.list());
        for connector in p.connectors.clone() {
            self.remove_connector_raw(connector)?;
        }

        let ports = self.registry.require_node_mut(owner)?.ports_mut(list);
        let index = match ports.iter().position(|id| *id == port) {
            Some(index) => {
                ports.remove(index);
                index
            }
            None => ports.len(),
        };
        self.registry.ports.shift_remove(&port);
        Ok(index)
    }

    pub(crate) fn materialize_port(&mut self, port: Port, index: Option<usize>, origin: Origin) -> Result<PortId> {
        let id = port.id;
        self.insert_port_raw(port, index)?;
        self.emit(origin.event(EntityRef::Port(id)));
        Ok(id)
    }

    // Connectors

    /// Create an unattached connector at the end of the graph's list
    pub(crate) fn create_connector_raw(&mut self, graph: GraphId) -> Result<ConnectorId> {
        let id = ConnectorId::new();
        self.registry.require_graph_mut(graph)?.connectors.push(id);
        self.registry.connectors.insert(id, Connector::new(id, graph));
        self.emit(GraphEvent::Created(EntityRef::Connector(id)));
        Ok(id)
    }

    /// Attach a connector end to a port; the side follows the port's direction
    pub(crate) fn attach_raw(&mut self, connector: ConnectorId, port: PortId) -> Result<()> {
        let is_input = self.registry.require_port(port)?.is_input();
        let c = self.registry.require_connector_mut(connector)?;
        let previous = if is_input {
            c.end_port.replace(port)
        } else {
            c.start_port.replace(port)
        };
        if let Some(previous) = previous.filter(|p| *p != port) {
            if let Some(p) = self.registry.ports.get_mut(&previous) {
                p.connectors.retain(|id| *id != connector);
            }
            self.emit(GraphEvent::Disconnected { connector, port: previous });
        }

        let p = self.registry.require_port_mut(port)?;
        if !p.connectors.contains(&connector) {
            p.connectors.push(connector);
        }
        self.emit(GraphEvent::Connected { connector, port });
        Ok(())
    }

    /// Detach a connector end from a port
    pub(crate) fn detach_raw(&mut self, connector: ConnectorId, port: PortId) -> Result<()> {
        let c = self.registry.require_connector_mut(connector)?;
        if c.start_port == Some(port) {
            c.start_port = None;
        }
        if c.end_port == Some(port) {
            c.end_port = None;
        }
        if let Some(p) = self.registry.ports.get_mut(&port) {
            p.connectors.retain(|id| *id != connector);
        }
        self.emit(GraphEvent::Disconnected { connector, port });
        Ok(())
    }

    /// Destroy a connector and its routers.
    ///
    /// Destroying the connector of an in-progress connection cancels the
    /// gesture instead. Returns false if the connector is unknown.
    pub fn destroy_connector(&mut self, connector: ConnectorId) -> Result<bool> {
        let Some(c) = self.registry.connector(connector) else {
            return Ok(false);
        };
        let graph = c.owner;
        let routers = c.routers.clone();
        if let InteractionMode::Connecting { connector: pending, .. } = self.mode {
            if pending == connector {
                self.cancel_interaction()?;
                return Ok(true);
            }
        }

        self.emit(GraphEvent::PreDestroy(EntityRef::Connector(connector)));
        for router in &routers {
            self.set_selected(graph, SelectableId::Router(*router), false, true)?;
        }

        let snapshot = if self.is_recording(graph) {
            Some(serialization::connector_snapshot(&self.registry, connector)?)
        } else {
            None
        };
        let index = self.remove_connector_raw(connector)?;
        if let Some(snapshot) = snapshot {
            self.record(graph, Command::DestroyConnector { connector, index, snapshot });
        }
        if !routers.is_empty() {
            self.compact_z_order(graph)?;
        }

        self.emit(GraphEvent::PostDestroy(EntityRef::Connector(connector)));
        tracing::debug!("Destroyed connector {connector}");
        Ok(true)
    }

    /// Remove a connector and its routers; returns its former list position
    pub(crate) fn remove_connector_raw(&mut self, connector: ConnectorId) -> Result<usize> {
        let c = self.registry.require_connector(connector)?;
        let graph = c.owner;
        let routers = c.routers.clone();
        let ends: Vec<PortId> = c.start_port.into_iter().chain(c.end_port).collect();

        for router in routers {
            self.emit(GraphEvent::PreDestroy(EntityRef::Router(router)));
            self.remove_router_raw(router)?;
            self.emit(GraphEvent::PostDestroy(EntityRef::Router(router)));
        }
        for port in ends {
            self.detach_raw(connector, port)?;
        }

        let g = self.registry.require_graph_mut(graph)?;
        let index = match g.connectors.iter().position(|id| *id == connector) {
            Some(index) => {
                g.connectors.remove(index);
                index
            }
            None => g.connectors.len(),
        };
        self.registry.connectors.shift_remove(&connector);
        Ok(index)
    }

    /// Register a connector and its routers from a record.
    ///
    /// Both ports must exist in the connector's graph, the start port must
    /// be an output and the end port an input.
    pub(crate) fn materialize_connector(
        &mut self,
        record: ConnectorRecord,
        index: Option<usize>,
        origin: Origin,
    ) -> Result<ConnectorId> {
        let ConnectorRecord { mut connector, routers } = record;
        let (id, graph) = (connector.id, connector.owner);
        let (start, end) = connector
            .ends()
            .ok_or(SerializeError::IncompleteConnector(id))?;

        self.registry.require_graph(graph)?;
        for port in [start, end] {
            if self.registry.graph_of_port(port) != Some(graph) {
                return Err(unresolved_port(port));
            }
        }
        let start_is_input = self.registry.require_port(start)?.is_input();
        let end_is_input = self.registry.require_port(end)?.is_input();
        if start_is_input || !end_is_input {
            return Err(SerializeError::InvalidAttribute {
                element: "Connector".to_string(),
                attribute: if start_is_input { "StartPort" } else { "EndPort" },
                value: if start_is_input { start } else { end }.to_string(),
            }
            .into());
        }
        self.registry.ensure_free(id.uuid())?;
        let mut seen = IndexSet::new();
        for router in &routers {
            self.registry.ensure_free(router.id.uuid())?;
            if !seen.insert(router.id) {
                return Err(GraphError::DuplicateId(router.id.uuid()));
            }
        }

        connector.start_port = None;
        connector.end_port = None;
        connector.routers.clear();
        self.registry.connectors.insert(id, connector);
        let g = self.registry.require_graph_mut(graph)?;
        let at = index.unwrap_or(g.connectors.len()).min(g.connectors.len());
        g.connectors.insert(at, id);
        self.emit(origin.event(EntityRef::Connector(id)));

        self.attach_raw(id, start)?;
        self.attach_raw(id, end)?;
        for router in routers {
            self.materialize_router(router, origin)?;
        }
        Ok(id)
    }

    /// Destroy every connector on a port; returns how many were removed
    pub fn disconnect_all(&mut self, port: PortId) -> Result<usize> {
        let connectors = self.registry.require_port(port)?.connectors.clone();
        if connectors.is_empty() {
            return Ok(0);
        }
        let graph = self
            .registry
            .graph_of_port(port)
            .ok_or(GraphError::UnknownPort(port))?;

        self.with_transaction(graph, "Disconnect", |manager| {
            let mut removed = 0;
            for connector in connectors {
                if manager.destroy_connector(connector)? {
                    removed += 1;
                }
            }
            Ok(removed)
        })
    }

    // Routers

    /// Insert a router at `index` along a connector; later routers shift up
    pub fn create_router(&mut self, connector: ConnectorId, index: usize, position: Point) -> Result<RouterId> {
        let c = self.registry.require_connector(connector)?;
        if index > c.routers.len() {
            return Err(GraphError::RouterIndexOutOfRange { connector, index });
        }
        let graph = c.owner;

        let mut router = Router::new(RouterId::new(), graph, connector, position, index, self.config().router_size);
        router.z_index = self.next_z(graph);
        let id = router.id;
        self.insert_router_raw(router)?;
        self.emit(GraphEvent::Created(EntityRef::Router(id)));

        if self.is_recording(graph) {
            let snapshot = serialization::router_snapshot(&self.registry, id)?;
            self.record(graph, Command::CreateRouter { router: id, snapshot });
        }
        Ok(id)
    }

    /// Remove a router; later routers shift down.
    ///
    /// Returns false if the router is unknown.
    pub fn destroy_router(&mut self, router: RouterId) -> Result<bool> {
        let Some(r) = self.registry.router(router) else {
            return Ok(false);
        };
        let graph = r.graph;

        self.emit(GraphEvent::PreDestroy(EntityRef::Router(router)));
        self.set_selected(graph, SelectableId::Router(router), false, true)?;
        let snapshot = if self.is_recording(graph) {
            Some(serialization::router_snapshot(&self.registry, router)?)
        } else {
            None
        };
        self.remove_router_raw(router)?;
        if let Some(snapshot) = snapshot {
            self.record(graph, Command::DestroyRouter { router, snapshot });
        }
        self.compact_z_order(graph)?;
        self.emit(GraphEvent::PostDestroy(EntityRef::Router(router)));
        Ok(true)
    }

    fn renumber_routers(&mut self, connector: ConnectorId) {
        let Some(c) = self.registry.connectors.get(&connector) else {
            return;
        };
        for (index, id) in c.routers.iter().enumerate() {
            if let Some(r) = self.registry.routers.get_mut(id) {
                r.index = index;
            }
        }
    }

    /// Insert a router at its own index along its connector
    pub(crate) fn insert_router_raw(&mut self, router: Router) -> Result<()> {
        self.registry.ensure_free(router.id.uuid())?;
        let (id, graph, connector) = (router.id, router.graph, router.connector);

        let c = self.registry.require_connector_mut(connector)?;
        let at = router.index.min(c.routers.len());
        c.routers.insert(at, id);
        self.registry.require_graph_mut(graph)?.routers.push(id);
        self.registry.routers.insert(id, router);
        self.renumber_routers(connector);
        Ok(())
    }

    pub(crate) fn remove_router_raw(&mut self, router: RouterId) -> Result<()> {
        let r = self.registry.require_router(router)?;
        let (graph, connector) = (r.graph, r.connector);
        self.set_selected(graph, SelectableId::Router(router), false, false)?;

        if let Some(c) = self.registry.connectors.get_mut(&connector) {
            c.routers.retain(|id| *id != router);
        }
        if let Some(g) = self.registry.graphs.get_mut(&graph) {
            g.routers.retain(|id| *id != router);
        }
        self.registry.routers.shift_remove(&router);
        self.renumber_routers(connector);
        Ok(())
    }

    pub(crate) fn materialize_router(&mut self, router: Router, origin: Origin) -> Result<RouterId> {
        let id = router.id;
        self.insert_router_raw(router)?;
        self.emit(origin.event(EntityRef::Router(id)));
        Ok(id)
    }
}

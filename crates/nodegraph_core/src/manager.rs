// SPDX-License-Identifier: MIT OR Apache-2.0
//! The graph manager: owner of every graph and the single entry point for
//! edits.
//!
//! Structural operations live in [`crate::lifecycle`], connection gestures
//! in [`crate::connection`], selection and dragging in [`crate::selection`],
//! undo/redo in [`crate::replay`]. All of them are `impl GraphManager`
//! blocks over the state defined here.

use crate::config::{EngineConfig, SelectionMode};
use crate::connector::Connector;
use crate::connection::ConnectRule;
use crate::error::{GraphError, Result};
use crate::events::{DragDropPhase, EventBus, EventListener, GraphEvent, ListenerId};
use crate::geometry::{Point, Rect};
use crate::graph::Graph;
use crate::history::{Command, History, HistoryStats, TransactionId};
use crate::id::{ConnectorId, EntityRef, GraphId, NodeId, PortId, RouterId, SelectableId};
use crate::node::{Node, NodeProperty, NodeType, NodeTypeRegistry, Rgb};
use crate::port::{Port, PortFlags, PortKind, PortValue, ValueType};
use crate::registry::Registry;
use crate::router::Router;
use indexmap::{IndexMap, IndexSet};

/// Which gesture, if any, currently owns the input
#[derive(Debug, Clone, Default)]
pub enum InteractionMode {
    /// No gesture in progress
    #[default]
    Idle,
    /// Dragging a new connector out of `anchor`
    Connecting {
        /// Graph being edited
        graph: GraphId,
        /// Port the drag started from
        anchor: PortId,
        /// The in-progress connector
        connector: ConnectorId,
    },
    /// Moving the selected nodes and routers
    DraggingSelectables {
        /// Graph being edited
        graph: GraphId,
        /// Pointer position when the drag started
        origin: Point,
        /// Position of every dragged entity when the drag started
        start_positions: IndexMap<SelectableId, Point>,
    },
    /// Rubber-band selection
    MarqueeSelecting {
        /// Graph being edited
        graph: GraphId,
        /// Marquee anchor corner
        start: Point,
        /// Selection when the marquee started
        original: IndexSet<SelectableId>,
    },
    /// Canvas panning; the engine only tracks the flag
    Panning {
        /// Graph being panned
        graph: GraphId,
    },
}

impl InteractionMode {
    /// Short name used in errors and logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting { .. } => "connecting",
            Self::DraggingSelectables { .. } => "dragging",
            Self::MarqueeSelecting { .. } => "marquee selection",
            Self::Panning { .. } => "panning",
        }
    }

    /// True when no gesture is active
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Graph the active gesture is bound to
    pub fn graph(&self) -> Option<GraphId> {
        match self {
            Self::Idle => None,
            Self::Connecting { graph, .. }
            | Self::DraggingSelectables { graph, .. }
            | Self::MarqueeSelecting { graph, .. }
            | Self::Panning { graph } => Some(*graph),
        }
    }
}

/// Owner of all graphs, the entity registry and the editing state
pub struct GraphManager {
    pub(crate) registry: Registry,
    node_types: NodeTypeRegistry,
    config: EngineConfig,
    pub(crate) mode: InteractionMode,
    events: EventBus,
    pub(crate) rules: IndexMap<String, Box<dyn ConnectRule>>,
}

impl GraphManager {
    /// Create a manager with no graphs and no node types
    pub fn new(config: EngineConfig) -> Self {
        Self {
            registry: Registry::new(),
            node_types: NodeTypeRegistry::new(),
            events: EventBus::new(config.trace_lifecycle),
            config,
            mode: InteractionMode::Idle,
            rules: IndexMap::new(),
        }
    }

    /// Create a manager with the built-in node types registered
    pub fn with_standard_types(config: EngineConfig) -> Self {
        let mut manager = Self::new(config);
        for node_type in crate::catalog::standard_node_types() {
            manager.register_node_type(node_type);
        }
        manager
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Switch the marquee inclusion policy
    pub fn set_selection_mode(&mut self, mode: SelectionMode) {
        self.config.selection_mode = mode;
    }

    /// Register a node type
    pub fn register_node_type(&mut self, node_type: NodeType) {
        tracing::debug!("Registered node type '{}'", node_type.id);
        self.node_types.register(node_type);
    }

    /// Registered node types
    pub fn node_types(&self) -> &NodeTypeRegistry {
        &self.node_types
    }

    /// Register a named connection rule referenced by [`crate::PortSpec::rule`]
    pub fn register_connect_rule(&mut self, name: impl Into<String>, rule: Box<dyn ConnectRule>) {
        self.rules.insert(name.into(), rule);
    }

    /// Read access to every entity
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Active gesture
    pub fn mode(&self) -> &InteractionMode {
        &self.mode
    }

    pub(crate) fn ensure_idle(&self, requested: &'static str) -> Result<()> {
        if self.mode.is_idle() {
            Ok(())
        } else {
            Err(GraphError::ModeBusy {
                active: self.mode.name(),
                requested,
            })
        }
    }

    // Events

    /// Register an event listener
    pub fn subscribe(&mut self, listener: EventListener) -> ListenerId {
        self.events.subscribe(listener)
    }

    /// Remove an event listener
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.events.unsubscribe(id)
    }

    pub(crate) fn emit(&mut self, event: GraphEvent) {
        self.events.emit(event);
    }

    /// Forward a drag-and-drop notification from the presentation layer
    pub fn notify_drag_drop(
        &mut self,
        graph: GraphId,
        phase: DragDropPhase,
        target: Option<EntityRef>,
        position: Point,
        payload: impl Into<String>,
    ) -> Result<()> {
        self.registry.require_graph(graph)?;
        self.emit(GraphEvent::DragDrop {
            graph,
            phase,
            target,
            position,
            payload: payload.into(),
        });
        Ok(())
    }

    // Queries

    /// Ids of every graph, in creation order
    pub fn graphs(&self) -> impl Iterator<Item = GraphId> + '_ {
        self.registry.graphs.keys().copied()
    }

    /// Find a graph
    pub fn graph(&self, id: GraphId) -> Option<&Graph> {
        self.registry.graph(id)
    }

    /// First graph with the given name
    pub fn find_graph_by_name(&self, name: &str) -> Option<GraphId> {
        self.registry.graphs().find(|g| g.name == name).map(|g| g.id)
    }

    /// Find a node
    pub fn find_node(&self, id: NodeId) -> Option<&Node> {
        self.registry.node(id)
    }

    /// Find a port
    pub fn find_port(&self, id: PortId) -> Option<&Port> {
        self.registry.port(id)
    }

    /// Find a port of a node by name
    pub fn find_port_by_name(&self, node: NodeId, name: &str) -> Option<PortId> {
        let node = self.registry.node(node)?;
        node.all_ports()
            .find(|id| self.registry.port(*id).is_some_and(|p| p.name == name))
    }

    /// Find a connector
    pub fn find_connector(&self, id: ConnectorId) -> Option<&Connector> {
        self.registry.connector(id)
    }

    /// Find a router
    pub fn find_router(&self, id: RouterId) -> Option<&Router> {
        self.registry.router(id)
    }

    /// Nodes of a graph whose header matches exactly
    pub fn find_nodes_by_header(&self, graph: GraphId, header: &str) -> Vec<NodeId> {
        let Some(graph) = self.registry.graph(graph) else {
            return Vec::new();
        };
        graph
            .nodes
            .iter()
            .copied()
            .filter(|id| self.registry.node(*id).is_some_and(|n| n.header == header))
            .collect()
    }

    /// Ports at the far end of every attached connector
    pub fn find_connected_ports(&self, port: PortId) -> Vec<PortId> {
        let Some(port) = self.registry.port(port) else {
            return Vec::new();
        };
        port.connectors
            .iter()
            .filter_map(|c| self.registry.connector(*c)?.other_end(port.id))
            .collect()
    }

    /// Bounding box of a graph's nodes and routers, or of the selected ones.
    ///
    /// Returns an empty rectangle at the origin when nothing qualifies.
    pub fn calculate_content_bounds(&self, graph: GraphId, only_selected: bool) -> Rect {
        let Some(graph) = self.registry.graph(graph) else {
            return Rect::default();
        };
        graph
            .selectables()
            .filter(|id| !only_selected || graph.selection.contains(id))
            .filter_map(|id| self.registry.bounds_of(id))
            .reduce(|acc, r| acc.union(&r))
            .unwrap_or_default()
    }

    /// Z value one above the graph's topmost node or router
    pub(crate) fn next_z(&self, graph: GraphId) -> i32 {
        self.registry
            .graph(graph)
            .and_then(|g| g.selectables().filter_map(|id| self.registry.z_of(id)).max())
            .map_or(0, |z| z.saturating_add(1))
    }

    // History

    /// Undo/redo history of a graph
    pub fn history(&self, graph: GraphId) -> Option<&History> {
        self.registry.graph(graph).map(Graph::history)
    }

    /// History statistics of a graph
    pub fn history_stats(&self, graph: GraphId) -> Option<HistoryStats> {
        self.history(graph).map(History::stats)
    }

    /// Open a transaction on a graph
    pub fn begin_transaction(&mut self, graph: GraphId, label: &str) -> Result<TransactionId> {
        let id = self.registry.require_graph_mut(graph)?.history.begin_transaction(label)?;
        tracing::debug!("Begin transaction '{label}'");
        Ok(id)
    }

    /// Close the open transaction of a graph
    pub fn end_transaction(&mut self, graph: GraphId, cancel_if_empty: bool) -> Result<Option<TransactionId>> {
        Ok(self
            .registry
            .require_graph_mut(graph)?
            .history
            .end_transaction(cancel_if_empty))
    }

    /// Append a command to the open transaction; ignored when none is open
    pub fn add_command(&mut self, graph: GraphId, command: Command) -> Result<bool> {
        Ok(self.registry.require_graph_mut(graph)?.history.add_command(command))
    }

    pub(crate) fn is_recording(&self, graph: GraphId) -> bool {
        self.registry
            .graph(graph)
            .is_some_and(|g| g.history.is_recording())
    }

    pub(crate) fn record(&mut self, graph: GraphId, command: Command) {
        if let Some(g) = self.registry.graphs.get_mut(&graph) {
            g.history.add_command(command);
        }
    }

    /// Run `f` inside a transaction, opening one only if none is open.
    ///
    /// A transaction opened here is closed with `cancel_if_empty`, even if
    /// `f` fails, so partial edits stay undoable.
    pub(crate) fn with_transaction<T>(
        &mut self,
        graph: GraphId,
        label: &str,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let history = &mut self.registry.require_graph_mut(graph)?.history;
        let opened = if history.in_transaction() {
            false
        } else {
            history.begin_transaction(label)?;
            true
        };

        let result = f(self);

        if opened {
            if let Some(g) = self.registry.graphs.get_mut(&graph) {
                g.history.end_transaction(true);
            }
        }
        result
    }

    pub(crate) fn with_history_suppressed<T>(&mut self, graph: GraphId, f: impl FnOnce(&mut Self) -> T) -> T {
        if let Some(g) = self.registry.graphs.get_mut(&graph) {
            g.history.suppress();
        }
        let result = f(self);
        if let Some(g) = self.registry.graphs.get_mut(&graph) {
            g.history.resume();
        }
        result
    }

    // Properties

    /// Change a node property, recording it for undo.
    ///
    /// Returns false if the value was already set.
    pub fn set_node_property(&mut self, node: NodeId, value: NodeProperty) -> Result<bool> {
        let current = self.registry.require_node(node)?;
        let before = current.property(&value);
        if before == value {
            return Ok(false);
        }
        let graph = current.owner;

        self.with_transaction(graph, &format!("Set {}", value.name()), |manager| {
            manager.registry.require_node_mut(node)?.set_property(&value);
            manager.record(graph, Command::NodeProperty { node, before, after: value });
            Ok(true)
        })
    }

    /// Rename a node
    pub fn set_header(&mut self, node: NodeId, header: impl Into<String>) -> Result<bool> {
        self.set_node_property(node, NodeProperty::Header(header.into()))
    }

    /// Change both header colours in one transaction
    pub fn set_header_colors(&mut self, node: NodeId, background: Rgb, font: Rgb) -> Result<bool> {
        let graph = self.registry.require_node(node)?.owner;
        self.with_transaction(graph, "Set header colours", |manager| {
            let a = manager.set_node_property(node, NodeProperty::HeaderBackground(background))?;
            let b = manager.set_node_property(node, NodeProperty::HeaderFontColor(font))?;
            Ok(a || b)
        })
    }

    /// Set the value of a property port, recording it for undo.
    ///
    /// The value must have the declared type, unless the port is `Any`.
    pub fn set_port_value(&mut self, port: PortId, value: PortValue) -> Result<bool> {
        let current = self.registry.require_port(port)?;
        let PortKind::Property(slot) = &current.kind else {
            return Err(GraphError::NotAPropertyPort(port));
        };
        let actual = value.value_type();
        if slot.value_type != ValueType::Any && slot.value_type != actual {
            return Err(GraphError::ValueTypeMismatch {
                port,
                expected: slot.value_type.clone(),
                actual,
            });
        }
        if slot.value.as_ref() == Some(&value) {
            return Ok(false);
        }
        let before = slot.value.clone();
        let graph = self
            .registry
            .graph_of_port(port)
            .ok_or(GraphError::UnknownNode(current.owner))?;

        self.with_transaction(graph, "Set value", |manager| {
            manager.write_port_value(port, Some(value.clone()))?;
            manager.record(
                graph,
                Command::PortValue {
                    port,
                    before,
                    after: Some(value),
                },
            );
            Ok(true)
        })
    }

    /// Allow or refuse new connections on a port, recording it for undo.
    ///
    /// Existing connectors are left in place. Returns false if unchanged.
    pub fn set_port_enabled(&mut self, port: PortId, enabled: bool) -> Result<bool> {
        let flags = PortFlags {
            is_port_enabled: enabled,
            ..self.registry.require_port(port)?.flags()
        };
        self.set_port_flags(port, flags, "Set port enabled")
    }

    /// Change how many connectors may end and start at a port.
    ///
    /// Only later connections are affected. Returns false if unchanged.
    pub fn set_port_multiplicity(&mut self, port: PortId, multiple_input: bool, multiple_output: bool) -> Result<bool> {
        let flags = PortFlags {
            allow_multiple_input: multiple_input,
            allow_multiple_output: multiple_output,
            ..self.registry.require_port(port)?.flags()
        };
        self.set_port_flags(port, flags, "Set port multiplicity")
    }

    fn set_port_flags(&mut self, port: PortId, after: PortFlags, label: &str) -> Result<bool> {
        let current = self.registry.require_port(port)?;
        let before = current.flags();
        if before == after {
            return Ok(false);
        }
        let graph = self
            .registry
            .graph_of_port(port)
            .ok_or(GraphError::UnknownNode(current.owner))?;

        self.with_transaction(graph, label, |manager| {
            manager.registry.require_port_mut(port)?.set_flags(after);
            manager.record(graph, Command::PortFlags { port, before, after });
            Ok(true)
        })
    }

    pub(crate) fn write_port_value(&mut self, port: PortId, value: Option<PortValue>) -> Result<()> {
        match &mut self.registry.require_port_mut(port)?.kind {
            PortKind::Property(slot) => {
                slot.value = value;
                Ok(())
            }
            PortKind::Flow => Err(GraphError::NotAPropertyPort(port)),
        }
    }
}

impl Default for GraphManager {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl std::fmt::Debug for GraphManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphManager")
            .field("graphs", &self.registry.graphs.len())
            .field("node_types", &self.node_types.len())
            .field("mode", &self.mode.name())
            .field("rules", &self.rules.keys().collect::<Vec<_>>())
            .field("listeners", &self.events.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;

    fn manager_with_graph() -> (GraphManager, GraphId) {
        let mut manager = GraphManager::with_standard_types(EngineConfig::default());
        let graph = manager.create_graph("Main");
        (manager, graph)
    }

    #[test]
    fn test_lookups_by_name_and_header() {
        let (mut manager, graph) = manager_with_graph();
        let print = manager.create_node(graph, "print", Point::ZERO).unwrap();
        manager.create_node(graph, "add", Point::new(300.0, 0.0)).unwrap();

        assert_eq!(manager.find_graph_by_name("Main"), Some(graph));
        assert_eq!(manager.find_graph_by_name("Other"), None);
        assert_eq!(manager.find_nodes_by_header(graph, "Print"), vec![print]);

        let text = manager.find_port_by_name(print, "Text").unwrap();
        assert_eq!(manager.find_port(text).unwrap().owner, print);
        assert!(manager.find_port_by_name(print, "Missing").is_none());
    }

    #[test]
    fn test_property_setter_records_and_skips_noops() {
        let (mut manager, graph) = manager_with_graph();
        let node = manager.create_node(graph, "print", Point::ZERO).unwrap();
        let depth = manager.history(graph).unwrap().undo_depth();

        assert!(manager.set_header(node, "Log").unwrap());
        assert!(!manager.set_header(node, "Log").unwrap());
        assert_eq!(manager.find_node(node).unwrap().header(), "Log");
        assert_eq!(manager.history(graph).unwrap().undo_depth(), depth + 1);
        assert_eq!(manager.history(graph).unwrap().undo_label(), Some("Set Header"));

        assert!(manager.set_header_colors(node, [10, 20, 30], [1, 2, 3]).unwrap());
        assert_eq!(manager.history(graph).unwrap().undo_depth(), depth + 2);
    }

    #[test]
    fn test_setters_append_to_an_open_transaction() {
        let (mut manager, graph) = manager_with_graph();
        let node = manager.create_node(graph, "print", Point::ZERO).unwrap();

        manager.begin_transaction(graph, "Batch").unwrap();
        manager.set_header(node, "A").unwrap();
        manager
            .set_node_property(node, NodeProperty::Size(Size::new(50.0, 50.0)))
            .unwrap();
        manager.end_transaction(graph, true).unwrap();

        let history = manager.history(graph).unwrap();
        assert_eq!(history.undo_label(), Some("Batch"));
        assert_eq!(history.undo_depth(), 1);
    }

    #[test]
    fn test_set_port_value_is_type_checked() {
        let (mut manager, graph) = manager_with_graph();
        let node = manager.create_node(graph, "int_constant", Point::ZERO).unwrap();
        let value = manager.find_port_by_name(node, "Value").unwrap();

        assert!(manager.set_port_value(value, PortValue::Int(42)).unwrap());
        assert_eq!(manager.find_port(value).unwrap().value(), Some(&PortValue::Int(42)));
        assert!(matches!(
            manager.set_port_value(value, PortValue::String("x".into())),
            Err(GraphError::ValueTypeMismatch { .. })
        ));

        let start = manager.create_node(graph, "start", Point::ZERO).unwrap();
        let exec = manager.find_port_by_name(start, "Exec").unwrap();
        assert!(matches!(
            manager.set_port_value(exec, PortValue::Bool(true)),
            Err(GraphError::NotAPropertyPort(_))
        ));
    }

    #[test]
    fn test_port_flag_setters_record_history() {
        let (mut manager, graph) = manager_with_graph();
        let node = manager.create_node(graph, "int_constant", Point::ZERO).unwrap();
        let value = manager.find_port_by_name(node, "Value").unwrap();
        let original = manager.find_port(value).unwrap().flags();

        assert!(manager.set_port_multiplicity(value, true, false).unwrap());
        assert!(!manager.set_port_multiplicity(value, true, false).unwrap());
        assert!(manager.set_port_enabled(value, false).unwrap());
        let port = manager.find_port(value).unwrap();
        assert!(port.allow_multiple_input && !port.allow_multiple_output && !port.is_port_enabled);
        assert_eq!(manager.history(graph).unwrap().undo_label(), Some("Set port enabled"));

        manager.undo(graph).unwrap();
        assert!(manager.find_port(value).unwrap().is_port_enabled);
        manager.undo(graph).unwrap();
        assert_eq!(manager.find_port(value).unwrap().flags(), original);
        manager.redo(graph).unwrap();
        assert!(!manager.find_port(value).unwrap().allow_multiple_output);
    }

    #[test]
    fn test_content_bounds() {
        let (mut manager, graph) = manager_with_graph();
        assert_eq!(manager.calculate_content_bounds(graph, false), Rect::default());

        let size = manager.config().default_node_size;
        let a = manager.create_node(graph, "print", Point::new(0.0, 0.0)).unwrap();
        manager.create_node(graph, "print", Point::new(400.0, 200.0)).unwrap();

        let all = manager.calculate_content_bounds(graph, false);
        assert_eq!(all.min, Point::new(0.0, 0.0));
        assert_eq!(all.max, Point::new(400.0 + size.width, 200.0 + size.height));

        assert_eq!(manager.calculate_content_bounds(graph, true), Rect::default());
        manager.try_select(a.into(), false, false, false).unwrap();
        let selected = manager.calculate_content_bounds(graph, true);
        assert_eq!(selected.max, Point::new(size.width, size.height));
    }

    #[test]
    fn test_drag_drop_notification_reaches_listeners() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let (mut manager, graph) = manager_with_graph();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        manager.subscribe(Box::new(move |e| {
            if let GraphEvent::DragDrop { phase, payload, .. } = e {
                sink.borrow_mut().push((*phase, payload.clone()));
            }
        }));

        manager
            .notify_drag_drop(graph, DragDropPhase::Drop, None, Point::new(5.0, 5.0), "asset://tex")
            .unwrap();
        assert_eq!(*seen.borrow(), vec![(DragDropPhase::Drop, "asset://tex".to_string())]);
        assert!(manager
            .notify_drag_drop(GraphId::new(), DragDropPhase::Enter, None, Point::ZERO, "")
            .is_err());
    }
}

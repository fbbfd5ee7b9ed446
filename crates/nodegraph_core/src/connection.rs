// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection validation and the connect gesture.
//!
//! A connection is started from one port, follows the pointer while the
//! other end is re-targeted, and is either committed or discarded. The
//! in-progress connector is a real registry entity but is never recorded
//! in history; only a committed connection is.

use crate::error::{GraphError, Result};
use crate::events::GraphEvent;
use crate::history::Command;
use crate::id::{ConnectorId, EntityRef, GraphId, NodeId, PortId};
use crate::manager::{GraphManager, InteractionMode};
use crate::port::{Port, ValueType};
use crate::registry::Registry;
use crate::serialization;
use indexmap::IndexSet;
use std::fmt;

/// Why two ports cannot be connected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectRejection {
    /// One of the ports does not accept connections
    PortDisabled,
    /// Both ends are the same port
    SamePort,
    /// Both ports belong to the same node
    SameNode,
    /// Flow and property ports do not mix
    PortKindMismatch,
    /// Both ports are inputs, or both are outputs
    SameDirection,
    /// The two ports are already connected
    AlreadyConnected,
    /// The output's value cannot flow into the input
    IncompatibleValueType {
        /// Output type
        from: ValueType,
        /// Input type
        to: ValueType,
    },
    /// The connection would close a loop
    Circular,
    /// Refused by a custom rule
    Custom(String),
}

impl fmt::Display for ConnectRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PortDisabled => f.write_str("Port does not accept connections"),
            Self::SamePort => f.write_str("Cannot connect a port to itself"),
            Self::SameNode => f.write_str("Cannot connect ports of the same node"),
            Self::PortKindMismatch => f.write_str("Cannot connect flow and property ports"),
            Self::SameDirection => f.write_str("Ports have the same direction"),
            Self::AlreadyConnected => f.write_str("Ports are already connected"),
            Self::IncompatibleValueType { from, to } => write!(f, "Cannot connect {from} to {to}"),
            Self::Circular => f.write_str("Connection would create a cycle"),
            Self::Custom(reason) => f.write_str(reason),
        }
    }
}

/// Outcome of a connection check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectCheck {
    /// The ports may be connected
    Connectable,
    /// The ports may not be connected
    Rejected(ConnectRejection),
}

impl ConnectCheck {
    /// True if the connection is allowed
    pub fn is_connectable(&self) -> bool {
        matches!(self, Self::Connectable)
    }

    /// The rejection, if any
    pub fn rejection(&self) -> Option<&ConnectRejection> {
        match self {
            Self::Connectable => None,
            Self::Rejected(rejection) => Some(rejection),
        }
    }

    /// Human-readable reason for a rejection
    pub fn reason(&self) -> Option<String> {
        self.rejection().map(ToString::to_string)
    }
}

/// Extra connection constraint, registered by name and referenced from ports.
///
/// Rules see the output side first, whichever end the user dragged from.
pub trait ConnectRule {
    /// Return `Err(reason)` to refuse connecting `output` to `input`
    fn check(&self, registry: &Registry, output: &Port, input: &Port) -> std::result::Result<(), String>;
}

impl<F> ConnectRule for F
where
    F: Fn(&Port, &Port) -> std::result::Result<(), String>,
{
    fn check(&self, _registry: &Registry, output: &Port, input: &Port) -> std::result::Result<(), String> {
        self(output, input)
    }
}

impl GraphManager {
    /// Check whether two ports could be connected, in either order
    pub fn can_connect(&self, a: PortId, b: PortId) -> Result<ConnectCheck> {
        self.check_pair(a, b, None)
    }

    /// Check a candidate port against the active connection's anchor
    pub fn check_connectable(&self, candidate: PortId) -> Result<ConnectCheck> {
        let (_, anchor, connector) = self.connecting()?;
        self.check_pair(anchor, candidate, Some(connector))
    }

    /// Connector of the active connection gesture
    pub fn pending_connector(&self) -> Option<ConnectorId> {
        match self.mode {
            InteractionMode::Connecting { connector, .. } => Some(connector),
            _ => None,
        }
    }

    fn connecting(&self) -> Result<(GraphId, PortId, ConnectorId)> {
        match self.mode {
            InteractionMode::Connecting {
                graph,
                anchor,
                connector,
            } => Ok((graph, anchor, connector)),
            _ => Err(GraphError::NotConnecting),
        }
    }

    fn check_pair(&self, anchor: PortId, candidate: PortId, pending: Option<ConnectorId>) -> Result<ConnectCheck> {
        let a = self.registry.require_port(anchor)?;
        let c = self.registry.require_port(candidate)?;
        let reject = |rejection| Ok(ConnectCheck::Rejected(rejection));

        if anchor == candidate {
            return reject(ConnectRejection::SamePort);
        }
        if a.owner == c.owner {
            return reject(ConnectRejection::SameNode);
        }
        if a.family() != c.family() {
            return reject(ConnectRejection::PortKindMismatch);
        }
        if a.direction == c.direction {
            return reject(ConnectRejection::SameDirection);
        }

        let already = a
            .connectors
            .iter()
            .filter(|id| Some(**id) != pending)
            .filter_map(|id| self.registry.connector(*id))
            .any(|connector| connector.other_end(anchor) == Some(candidate));
        if already {
            return reject(ConnectRejection::AlreadyConnected);
        }

        let (output, input) = if a.is_input() { (c, a) } else { (a, c) };
        if let (Some(from), Some(to)) = (output.value_type(), input.value_type()) {
            if !to.is_assignable_from(from) {
                return reject(ConnectRejection::IncompatibleValueType {
                    from: from.clone(),
                    to: to.clone(),
                });
            }
        }

        let candidate_node = self.registry.require_node(c.owner)?;
        if !candidate_node.allow_circular_connection() && self.reaches(input.owner, output.owner, pending) {
            return reject(ConnectRejection::Circular);
        }

        if !a.is_port_enabled || !c.is_port_enabled {
            return reject(ConnectRejection::PortDisabled);
        }
        for name in [&a.rule, &c.rule].into_iter().flatten() {
            match self.rules.get(name) {
                Some(rule) => {
                    if let Err(reason) = rule.check(&self.registry, output, input) {
                        return reject(ConnectRejection::Custom(reason));
                    }
                }
                None => tracing::warn!("Unknown connection rule '{name}'"),
            }
        }

        Ok(ConnectCheck::Connectable)
    }

    /// True if following connectors downstream from `from` arrives at `target`
    fn reaches(&self, from: NodeId, target: NodeId, skip: Option<ConnectorId>) -> bool {
        let mut visited = IndexSet::new();
        let mut stack = vec![from];

        while let Some(node_id) = stack.pop() {
            if node_id == target {
                return true;
            }
            if !visited.insert(node_id) {
                continue;
            }
            let Some(node) = self.registry.node(node_id) else {
                continue;
            };
            for port_id in node.output_ports() {
                let Some(port) = self.registry.port(port_id) else {
                    continue;
                };
                for connector_id in &port.connectors {
                    if Some(*connector_id) == skip {
                        continue;
                    }
                    let downstream = self
                        .registry
                        .connector(*connector_id)
                        .and_then(|c| c.ends())
                        .filter(|(start, _)| *start == port_id)
                        .and_then(|(_, end)| self.registry.port(end));
                    if let Some(end) = downstream {
                        stack.push(end.owner);
                    }
                }
            }
        }
        false
    }

    /// Start dragging a new connector out of `port`
    pub fn begin_connection(&mut self, port: PortId) -> Result<ConnectorId> {
        self.ensure_idle("connecting")?;
        let graph = self
            .registry
            .graph_of_port(port)
            .ok_or(GraphError::UnknownPort(port))?;

        let connector = self.create_connector_raw(graph)?;
        self.attach_raw(connector, port)?;
        self.mode = InteractionMode::Connecting {
            graph,
            anchor: port,
            connector,
        };
        tracing::debug!("Begin connection from port {port}");
        Ok(connector)
    }

    /// Re-target the free end of the active connection.
    ///
    /// `None` detaches it. Returns true if the free end is now attached to
    /// `candidate`; a rejected candidate leaves it detached.
    pub fn set_other_end(&mut self, candidate: Option<PortId>) -> Result<bool> {
        let (_, anchor, connector) = self.connecting()?;
        self.retarget(anchor, connector, candidate)
    }

    fn retarget(&mut self, anchor: PortId, connector: ConnectorId, candidate: Option<PortId>) -> Result<bool> {
        let current = self.registry.require_connector(connector)?.other_end(anchor);
        if candidate.is_some() && current == candidate {
            return Ok(true);
        }

        let check = match candidate {
            Some(port) => Some(self.check_pair(anchor, port, Some(connector))?),
            None => None,
        };
        if let Some(port) = current {
            self.detach_raw(connector, port)?;
        }
        match (candidate, check) {
            (Some(port), Some(ConnectCheck::Connectable)) => {
                self.attach_raw(connector, port)?;
                Ok(true)
            }
            (Some(port), Some(ConnectCheck::Rejected(rejection))) => {
                tracing::debug!("Port {port} rejected: {rejection}");
                Ok(false)
            }
            _ => Ok(false),
        }
    }

    /// Finish the active connection.
    ///
    /// With `Some(port)` the free end is re-targeted first. If both ends end
    /// up attached the connection is committed as one undoable step, after
    /// removing connectors that the multiplicity flags no longer allow.
    /// Otherwise the in-progress connector is discarded. Returns true if a
    /// connection was made; the gesture is over either way.
    pub fn end_connection(&mut self, candidate: Option<PortId>) -> Result<bool> {
        let (graph, anchor, connector) = self.connecting()?;
        self.mode = InteractionMode::Idle;

        if candidate.is_some() {
            if let Err(e) = self.retarget(anchor, connector, candidate) {
                self.discard_connector(connector)?;
                return Err(e);
            }
        }

        let Some((start, end)) = self.registry.require_connector(connector)?.ends() else {
            self.discard_connector(connector)?;
            tracing::debug!("Connection from port {anchor} discarded");
            return Ok(false);
        };

        self.with_transaction(graph, "Connect", |manager| {
            for (port, keep_many) in [(start, true), (end, false)] {
                let p = manager.registry.require_port(port)?;
                let allowed = if keep_many {
                    p.allow_multiple_output
                } else {
                    p.allow_multiple_input
                };
                if allowed {
                    continue;
                }
                let others: Vec<ConnectorId> = p.connectors.iter().copied().filter(|c| *c != connector).collect();
                for other in others {
                    manager.destroy_connector(other)?;
                }
            }
            if manager.is_recording(graph) {
                let snapshot = serialization::connector_snapshot(&manager.registry, connector)?;
                manager.record(graph, Command::CreateConnector { connector, snapshot });
            }
            Ok(())
        })?;

        tracing::debug!("Connected port {start} to port {end}");
        Ok(true)
    }

    /// Connect two ports in one step, in either order.
    ///
    /// Returns the new connector, or `None` if the check failed.
    pub fn connect(&mut self, from: PortId, to: PortId) -> Result<Option<ConnectorId>> {
        let connector = self.begin_connection(from)?;
        Ok(self.end_connection(Some(to))?.then_some(connector))
    }

    /// Remove an uncommitted connector without recording anything
    pub(crate) fn discard_connector(&mut self, connector: ConnectorId) -> Result<()> {
        if self.registry.connector(connector).is_none() {
            return Ok(());
        }
        self.emit(GraphEvent::PreDestroy(EntityRef::Connector(connector)));
        self.remove_connector_raw(connector)?;
        self.emit(GraphEvent::PostDestroy(EntityRef::Connector(connector)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::geometry::Point;
    use crate::node::NodeType;
    use crate::node::NodeCategory;
    use crate::port::{PortSpec, ValueType};

    fn setup() -> (GraphManager, GraphId) {
        let mut manager = GraphManager::with_standard_types(EngineConfig::default());
        let graph = manager.create_graph("Main");
        (manager, graph)
    }

    fn node(manager: &mut GraphManager, graph: GraphId, kind: &str) -> NodeId {
        manager.create_node(graph, kind, Point::ZERO).unwrap()
    }

    fn port(manager: &GraphManager, node: NodeId, name: &str) -> PortId {
        manager.find_port_by_name(node, name).unwrap()
    }

    fn rejection(manager: &GraphManager, a: PortId, b: PortId) -> Option<ConnectRejection> {
        manager.can_connect(a, b).unwrap().rejection().cloned()
    }

    #[test]
    fn test_structural_checks() {
        let (mut manager, graph) = setup();
        let print = node(&mut manager, graph, "print");
        let other = node(&mut manager, graph, "print");
        let start = node(&mut manager, graph, "start");

        let exec = port(&manager, start, "Exec");
        let print_in = port(&manager, print, "In");
        let print_out = port(&manager, print, "Out");
        let text = port(&manager, print, "Text");

        assert_eq!(rejection(&manager, print_in, print_in), Some(ConnectRejection::SamePort));
        assert_eq!(rejection(&manager, print_out, print_in), Some(ConnectRejection::SameNode));
        assert_eq!(rejection(&manager, exec, text), Some(ConnectRejection::PortKindMismatch));
        assert_eq!(
            rejection(&manager, print_out, port(&manager, other, "Out")),
            Some(ConnectRejection::SameDirection)
        );
        assert_eq!(rejection(&manager, exec, print_in), None);
        assert_eq!(rejection(&manager, print_in, exec), None);
    }

    #[test]
    fn test_disabled_port_is_rejected_after_structural_checks() {
        let (mut manager, graph) = setup();
        let start = node(&mut manager, graph, "start");
        let print = node(&mut manager, graph, "print");
        let (exec, input) = (port(&manager, start, "Exec"), port(&manager, print, "In"));
        assert!(manager.set_port_enabled(input, false).unwrap());

        assert_eq!(rejection(&manager, input, input), Some(ConnectRejection::SamePort));
        assert_eq!(
            rejection(&manager, port(&manager, print, "Out"), input),
            Some(ConnectRejection::SameNode)
        );
        assert_eq!(rejection(&manager, exec, input), Some(ConnectRejection::PortDisabled));

        manager.undo(graph).unwrap();
        assert_eq!(rejection(&manager, exec, input), None);
    }

    #[test]
    fn test_narrowing_value_types_are_rejected() {
        let (mut manager, graph) = setup();
        let float = node(&mut manager, graph, "float_constant");
        let int = node(&mut manager, graph, "int_constant");
        let sink = node(&mut manager, graph, "print");
        let count = manager
            .create_port(sink, &PortSpec::property_input("Count", ValueType::Int), None)
            .unwrap();
        let float_value = port(&manager, float, "Value");

        assert_eq!(
            rejection(&manager, float_value, count),
            Some(ConnectRejection::IncompatibleValueType {
                from: ValueType::Float,
                to: ValueType::Int,
            })
        );
        assert!(manager.connect(float_value, count).unwrap().is_none());
        assert_eq!(rejection(&manager, port(&manager, int, "Value"), count), None);
    }

    #[test]
    fn test_value_type_compatibility() {
        let (mut manager, graph) = setup();
        let int = node(&mut manager, graph, "int_constant");
        let text = node(&mut manager, graph, "text_constant");
        let add = node(&mut manager, graph, "add");

        let int_value = port(&manager, int, "Value");
        let text_value = port(&manager, text, "Value");
        let add_a = port(&manager, add, "A");

        assert_eq!(rejection(&manager, int_value, add_a), None);
        assert_eq!(
            rejection(&manager, text_value, add_a),
            Some(ConnectRejection::IncompatibleValueType {
                from: ValueType::String,
                to: ValueType::Float,
            })
        );
    }

    #[test]
    fn test_already_connected() {
        let (mut manager, graph) = setup();
        let int = node(&mut manager, graph, "int_constant");
        let add = node(&mut manager, graph, "add");
        let (value, a) = (port(&manager, int, "Value"), port(&manager, add, "A"));

        assert!(manager.connect(value, a).unwrap().is_some());
        assert_eq!(rejection(&manager, value, a), Some(ConnectRejection::AlreadyConnected));
        assert!(manager.connect(a, value).unwrap().is_none());
        assert_eq!(manager.graph(graph).unwrap().connector_count(), 1);
    }

    #[test]
    fn test_circular_connection_is_rejected() {
        let (mut manager, graph) = setup();
        let a = node(&mut manager, graph, "print");
        let b = node(&mut manager, graph, "print");
        let c = node(&mut manager, graph, "print");

        manager.connect(port(&manager, a, "Out"), port(&manager, b, "In")).unwrap().unwrap();
        manager.connect(port(&manager, b, "Out"), port(&manager, c, "In")).unwrap().unwrap();

        let closing = (port(&manager, c, "Out"), port(&manager, a, "In"));
        assert_eq!(rejection(&manager, closing.0, closing.1), Some(ConnectRejection::Circular));
        assert!(manager.connect(closing.0, closing.1).unwrap().is_none());
        assert_eq!(manager.graph(graph).unwrap().connector_count(), 2);
        assert!(manager.mode().is_idle());
    }

    #[test]
    fn test_circular_check_follows_property_connectors() {
        let (mut manager, graph) = setup();
        let add = node(&mut manager, graph, "add");
        let other = node(&mut manager, graph, "add");

        manager
            .connect(port(&manager, add, "Result"), port(&manager, other, "A"))
            .unwrap()
            .unwrap();
        assert_eq!(
            rejection(&manager, port(&manager, other, "Result"), port(&manager, add, "B")),
            Some(ConnectRejection::Circular)
        );
    }

    #[test]
    fn test_loop_node_allows_cycles() {
        let (mut manager, graph) = setup();
        let looper = node(&mut manager, graph, "loop");
        let body = node(&mut manager, graph, "print");

        manager
            .connect(port(&manager, looper, "Body"), port(&manager, body, "In"))
            .unwrap()
            .unwrap();
        // Dragging back into the loop node: the candidate permits the cycle
        let back = manager.begin_connection(port(&manager, body, "Out")).unwrap();
        assert!(manager.check_connectable(port(&manager, looper, "In")).unwrap().is_connectable());
        assert!(manager.end_connection(Some(port(&manager, looper, "In"))).unwrap());
        assert!(manager.find_connector(back).unwrap().ends().is_some());
    }

    #[test]
    fn test_single_output_replaces_existing_connector() {
        let (mut manager, graph) = setup();
        let start = node(&mut manager, graph, "start");
        let first = node(&mut manager, graph, "print");
        let second = node(&mut manager, graph, "print");
        let exec = port(&manager, start, "Exec");

        let old = manager.connect(exec, port(&manager, first, "In")).unwrap().unwrap();
        let new = manager.connect(exec, port(&manager, second, "In")).unwrap().unwrap();

        assert!(manager.find_connector(old).is_none());
        assert_eq!(manager.find_port(exec).unwrap().connectors(), &[new]);
        assert!(manager.find_port(port(&manager, first, "In")).unwrap().connectors().is_empty());
    }

    #[test]
    fn test_single_input_replaces_existing_connector() {
        let (mut manager, graph) = setup();
        let one = node(&mut manager, graph, "int_constant");
        let two = node(&mut manager, graph, "int_constant");
        let add = node(&mut manager, graph, "add");
        let a = port(&manager, add, "A");

        manager.connect(port(&manager, one, "Value"), a).unwrap().unwrap();
        let kept = manager.connect(port(&manager, two, "Value"), a).unwrap().unwrap();
        assert_eq!(manager.find_port(a).unwrap().connectors(), &[kept]);
    }

    #[test]
    fn test_gesture_retarget_and_discard() {
        let (mut manager, graph) = setup();
        let start = node(&mut manager, graph, "start");
        let print = node(&mut manager, graph, "print");
        let exec = port(&manager, start, "Exec");
        let print_in = port(&manager, print, "In");

        let connector = manager.begin_connection(exec).unwrap();
        assert_eq!(manager.pending_connector(), Some(connector));
        assert!(matches!(
            manager.begin_connection(print_in),
            Err(GraphError::ModeBusy { active: "connecting", .. })
        ));

        assert!(manager.set_other_end(Some(print_in)).unwrap());
        assert_eq!(manager.find_connector(connector).unwrap().end_port(), Some(print_in));
        assert!(!manager.set_other_end(Some(port(&manager, print, "Text"))).unwrap());
        assert_eq!(manager.find_connector(connector).unwrap().end_port(), None);
        assert!(!manager.set_other_end(None).unwrap());

        assert!(!manager.end_connection(None).unwrap());
        assert!(manager.find_connector(connector).is_none());
        assert!(manager.find_port(exec).unwrap().connectors().is_empty());
        assert!(matches!(manager.end_connection(None), Err(GraphError::NotConnecting)));
        assert!(!manager.history(graph).unwrap().can_undo());
    }

    #[test]
    fn test_committed_connection_is_one_undo_step() {
        let (mut manager, graph) = setup();
        let start = node(&mut manager, graph, "start");
        let first = node(&mut manager, graph, "print");
        let second = node(&mut manager, graph, "print");
        let exec = port(&manager, start, "Exec");

        manager.connect(exec, port(&manager, first, "In")).unwrap().unwrap();
        manager.connect(exec, port(&manager, second, "In")).unwrap().unwrap();
        assert_eq!(manager.history(graph).unwrap().undo_depth(), 2);
        assert_eq!(manager.history(graph).unwrap().undo_label(), Some("Connect"));

        assert!(manager.undo(graph).unwrap());
        let restored = manager.find_port(exec).unwrap().connectors().to_vec();
        assert_eq!(restored.len(), 1);
        assert_eq!(
            manager.find_connector(restored[0]).unwrap().end_port(),
            Some(port(&manager, first, "In"))
        );
    }

    #[test]
    fn test_custom_rule() {
        let (mut manager, graph) = setup();
        manager.register_node_type(
            NodeType::new("even_sink", "Even Sink", NodeCategory::Utility)
                .with_port(PortSpec::property_input("Value", ValueType::Int).with_rule("named_value")),
        );
        manager.register_connect_rule(
            "named_value",
            Box::new(|output: &Port, _input: &Port| {
                if output.name == "Value" {
                    Ok(())
                } else {
                    Err(format!("'{}' is not a value port", output.name))
                }
            }),
        );

        let sink = node(&mut manager, graph, "even_sink");
        let int = node(&mut manager, graph, "int_constant");
        let add = node(&mut manager, graph, "add");
        let input = port(&manager, sink, "Value");

        assert_eq!(rejection(&manager, port(&manager, int, "Value"), input), None);
        let check = manager.can_connect(port(&manager, add, "Result"), input).unwrap();
        assert_eq!(check.reason().as_deref(), Some("'Result' is not a value port"));
    }
    #[test]
    fn test_connect_then_undo_and_redo() {
        let (mut manager, graph) = setup();
        let start = node(&mut manager, graph, "start");
        let print = node(&mut manager, graph, "print");
        let (exec, print_in) = (port(&manager, start, "Exec"), port(&manager, print, "In"));

        let connector = manager.begin_connection(exec).unwrap();
        assert!(manager.end_connection(Some(print_in)).unwrap());
        let wire = manager.find_connector(connector).unwrap();
        assert_eq!((wire.start_port(), wire.end_port()), (Some(exec), Some(print_in)));
        assert_eq!(manager.graph(graph).unwrap().connector_count(), 1);

        assert!(manager.undo(graph).unwrap());
        assert_eq!(manager.graph(graph).unwrap().connector_count(), 0);
        assert!(manager.find_port(exec).unwrap().connectors().is_empty());
        assert!(manager.find_port(print_in).unwrap().connectors().is_empty());

        assert!(manager.redo(graph).unwrap());
        assert_eq!(manager.graph(graph).unwrap().connectors(), &[connector]);
        assert_eq!(manager.find_connector(connector).unwrap().ends(), Some((exec, print_in)));
        assert_eq!(manager.find_port(print_in).unwrap().connectors(), &[connector]);
    }

    #[test]
    fn test_rejected_drop_leaves_nothing_behind() {
        let (mut manager, graph) = setup();
        let int = node(&mut manager, graph, "int_constant");
        let print = node(&mut manager, graph, "print");
        let (value, text) = (port(&manager, int, "Value"), port(&manager, print, "Text"));
        let before = manager.save_to_string().unwrap();

        manager.begin_connection(value).unwrap();
        let check = manager.check_connectable(text).unwrap();
        assert!(!check.is_connectable());
        assert_eq!(
            check.rejection(),
            Some(&ConnectRejection::IncompatibleValueType {
                from: ValueType::Int,
                to: ValueType::String,
            })
        );
        assert!(check.reason().is_some());

        assert!(!manager.end_connection(Some(text)).unwrap());
        assert!(manager.mode().is_idle());
        assert_eq!(manager.graph(graph).unwrap().connector_count(), 0);
        assert!(manager.find_port(value).unwrap().connectors().is_empty());
        assert_eq!(manager.save_to_string().unwrap(), before);
    }
}

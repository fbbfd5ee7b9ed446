// SPDX-License-Identifier: MIT OR Apache-2.0
//! Undo and redo.
//!
//! A transaction is undone by reverting its commands in reverse order and
//! redone by applying them in order, with recording suppressed. Structural
//! commands carry serialized snapshots, so a redone creation brings back the
//! very same ids. Create and destroy steps are idempotent.

use crate::error::Result;
use crate::events::GraphEvent;
use crate::history::{Command, HistoryError, Transaction};
use crate::id::{ConnectorId, EntityRef, GraphId, NodeId, PortId, RouterId, SelectableId};
use crate::lifecycle::Origin;
use crate::manager::GraphManager;
use crate::serialization::{self, parse_connector, parse_node, parse_port, parse_router};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Apply,
    Revert,
}

impl GraphManager {
    /// Undo the latest transaction of a graph.
    ///
    /// Returns false if there is nothing to undo. If a command fails, the
    /// ones already reverted are applied again and the transaction stays
    /// on the undo stack.
    pub fn undo(&mut self, graph: GraphId) -> Result<bool> {
        let Some(transaction) = self.take_for_replay(graph, "undo", true)? else {
            return Ok(false);
        };
        let outcome = self.replay(graph, &transaction, Direction::Revert);
        let history = &mut self.registry.require_graph_mut(graph)?.history;
        if let Err(e) = outcome {
            tracing::warn!("Undo '{}' failed: {e}", transaction.label);
            history.return_undo(transaction);
            return Err(e);
        }

        tracing::debug!("Undo '{}'", transaction.label);
        history.finish_undo(transaction);
        Ok(true)
    }

    /// Redo the latest undone transaction of a graph.
    ///
    /// Returns false if there is nothing to redo. Failure rolls back like
    /// [`undo`](Self::undo) and keeps the transaction on the redo stack.
    pub fn redo(&mut self, graph: GraphId) -> Result<bool> {
        let Some(transaction) = self.take_for_replay(graph, "redo", false)? else {
            return Ok(false);
        };
        let outcome = self.replay(graph, &transaction, Direction::Apply);
        let history = &mut self.registry.require_graph_mut(graph)?.history;
        if let Err(e) = outcome {
            tracing::warn!("Redo '{}' failed: {e}", transaction.label);
            history.return_redo(transaction);
            return Err(e);
        }

        tracing::debug!("Redo '{}'", transaction.label);
        history.finish_redo(transaction);
        Ok(true)
    }

    fn take_for_replay(&mut self, graph: GraphId, requested: &'static str, undo: bool) -> Result<Option<Transaction>> {
        self.ensure_idle(requested)?;
        let history = &mut self.registry.require_graph_mut(graph)?.history;
        if let Some(label) = history.open_label() {
            return Err(HistoryError::ReplayDuringTransaction(label.to_string()).into());
        }
        Ok(if undo { history.take_undo() } else { history.take_redo() })
    }

    fn replay(&mut self, graph: GraphId, transaction: &Transaction, direction: Direction) -> Result<()> {
        let ordered: Vec<&Command> = match direction {
            Direction::Apply => transaction.commands.iter().collect(),
            Direction::Revert => transaction.commands.iter().rev().collect(),
        };
        self.with_history_suppressed(graph, |manager| {
            for (done, command) in ordered.iter().enumerate() {
                if let Err(e) = manager.step(graph, command, direction) {
                    manager.roll_back(graph, &ordered[..done], direction);
                    return Err(e);
                }
            }
            Ok(())
        })
    }

    fn step(&mut self, graph: GraphId, command: &Command, direction: Direction) -> Result<()> {
        match direction {
            Direction::Apply => self.apply_command(graph, command),
            Direction::Revert => self.revert_command(graph, command),
        }
    }

    /// Undo the replayed prefix of a failed replay, latest first
    fn roll_back(&mut self, graph: GraphId, done: &[&Command], direction: Direction) {
        let opposite = match direction {
            Direction::Apply => Direction::Revert,
            Direction::Revert => Direction::Apply,
        };
        for command in done.iter().rev() {
            if let Err(e) = self.step(graph, command, opposite) {
                tracing::error!("Rolling back {} failed: {e}", command.description());
            }
        }
    }

    fn apply_command(&mut self, graph: GraphId, command: &Command) -> Result<()> {
        match command {
            Command::CreateNode { node, snapshot } => self.restore_node(*node, snapshot, None),
            Command::DestroyNode { node, .. } => self.drop_node(*node),
            Command::CreatePort { port, index, snapshot } => self.restore_port(*port, snapshot, *index),
            Command::DestroyPort { port, .. } => self.drop_port(*port),
            Command::CreateConnector { connector, snapshot } => self.restore_connector(*connector, snapshot, None),
            Command::DestroyConnector { connector, .. } => self.drop_connector(*connector),
            Command::CreateRouter { router, snapshot } => self.restore_router(graph, *router, snapshot),
            Command::DestroyRouter { router, .. } => self.drop_router(*router),
            Command::NodeProperty { node, after, .. } => {
                self.registry.require_node_mut(*node)?.set_property(after);
                Ok(())
            }
            Command::PortValue { port, after, .. } => self.write_port_value(*port, after.clone()),
            Command::PortFlags { port, after, .. } => {
                self.registry.require_port_mut(*port)?.set_flags(*after);
                Ok(())
            }
            Command::Move { target, after, .. } => self.registry.set_position(*target, *after),
            Command::Selection { target, selected } => self.replay_selection(graph, *target, *selected),
            Command::ZOrder { after, .. } => {
                self.replay_z_order(after);
                Ok(())
            }
        }
    }

    fn revert_command(&mut self, graph: GraphId, command: &Command) -> Result<()> {
        match command {
            Command::CreateNode { node, .. } => self.drop_node(*node),
            Command::DestroyNode { node, index, snapshot } => self.restore_node(*node, snapshot, Some(*index)),
            Command::CreatePort { port, .. } => self.drop_port(*port),
            Command::DestroyPort { port, index, snapshot } => self.restore_port(*port, snapshot, *index),
            Command::CreateConnector { connector, .. } => self.drop_connector(*connector),
            Command::DestroyConnector {
                connector,
                index,
                snapshot,
            } => self.restore_connector(*connector, snapshot, Some(*index)),
            Command::CreateRouter { router, .. } => self.drop_router(*router),
            Command::DestroyRouter { router, snapshot } => self.restore_router(graph, *router, snapshot),
            Command::NodeProperty { node, before, .. } => {
                self.registry.require_node_mut(*node)?.set_property(before);
                Ok(())
            }
            Command::PortValue { port, before, .. } => self.write_port_value(*port, before.clone()),
            Command::PortFlags { port, before, .. } => {
                self.registry.require_port_mut(*port)?.set_flags(*before);
                Ok(())
            }
            Command::Move { target, before, .. } => self.registry.set_position(*target, *before),
            Command::Selection { target, selected } => self.replay_selection(graph, *target, !*selected),
            Command::ZOrder { before, .. } => {
                self.replay_z_order(before);
                Ok(())
            }
        }
    }

    fn restore_node(&mut self, node: NodeId, snapshot: &str, index: Option<usize>) -> Result<()> {
        if self.registry.node(node).is_some() {
            return Ok(());
        }
        let size = self.config().default_node_size;
        let record = serialization::parse_snapshot(snapshot, |el| parse_node(el, size))?;
        self.materialize_node(record, index, Origin::Restore)?;
        Ok(())
    }

    fn drop_node(&mut self, node: NodeId) -> Result<()> {
        if self.registry.node(node).is_none() {
            return Ok(());
        }
        self.emit(GraphEvent::PreDestroy(EntityRef::Node(node)));
        self.remove_node_raw(node)?;
        self.emit(GraphEvent::PostDestroy(EntityRef::Node(node)));
        Ok(())
    }

    fn restore_port(&mut self, port: PortId, snapshot: &str, index: usize) -> Result<()> {
        if self.registry.port(port).is_some() {
            return Ok(());
        }
        let record = serialization::parse_snapshot(snapshot, parse_port)?;
        self.materialize_port(record, Some(index), Origin::Restore)?;
        Ok(())
    }

    fn drop_port(&mut self, port: PortId) -> Result<()> {
        if self.registry.port(port).is_none() {
            return Ok(());
        }
        self.emit(GraphEvent::PreDestroy(EntityRef::Port(port)));
        self.remove_port_raw(port)?;
        self.emit(GraphEvent::PostDestroy(EntityRef::Port(port)));
        Ok(())
    }

    fn restore_connector(&mut self, connector: ConnectorId, snapshot: &str, index: Option<usize>) -> Result<()> {
        if self.registry.connector(connector).is_some() {
            return Ok(());
        }
        let router_size = self.config().router_size;
        let record = serialization::parse_snapshot(snapshot, |el| parse_connector(el, router_size))?;
        self.materialize_connector(record, index, Origin::Restore)?;
        Ok(())
    }

    fn drop_connector(&mut self, connector: ConnectorId) -> Result<()> {
        self.discard_connector(connector)
    }

    fn restore_router(&mut self, graph: GraphId, router: RouterId, snapshot: &str) -> Result<()> {
        if self.registry.router(router).is_some() {
            return Ok(());
        }
        let size = self.config().router_size;
        let record = serialization::parse_snapshot(snapshot, |el| parse_router(el, graph, size))?;
        self.materialize_router(record, Origin::Restore)?;
        Ok(())
    }

    fn drop_router(&mut self, router: RouterId) -> Result<()> {
        if self.registry.router(router).is_none() {
            return Ok(());
        }
        self.emit(GraphEvent::PreDestroy(EntityRef::Router(router)));
        self.remove_router_raw(router)?;
        self.emit(GraphEvent::PostDestroy(EntityRef::Router(router)));
        Ok(())
    }

    fn replay_selection(&mut self, graph: GraphId, target: SelectableId, selected: bool) -> Result<()> {
        if !self.registry.contains_selectable(target) {
            tracing::debug!("Skipping selection of removed entity {target:?}");
            return Ok(());
        }
        self.set_selected(graph, target, selected, false)?;
        Ok(())
    }

    fn replay_z_order(&mut self, values: &[(SelectableId, i32)]) {
        for (id, z) in values {
            self.registry.set_z(*id, *z);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::error::GraphError;
    use crate::geometry::Point;
    use crate::node::NodeProperty;
    use crate::port::{PortSpec, PortValue, ValueType};

    fn setup() -> (GraphManager, GraphId) {
        let mut manager = GraphManager::with_standard_types(EngineConfig::default());
        let graph = manager.create_graph("Main");
        (manager, graph)
    }

    fn port(manager: &GraphManager, node: NodeId, name: &str) -> PortId {
        manager.find_port_by_name(node, name).unwrap()
    }

    fn saved(manager: &GraphManager) -> String {
        manager.save_to_string().unwrap()
    }

    /// Build a small program as one transaction per step
    fn build(manager: &mut GraphManager, graph: GraphId) -> Vec<NodeId> {
        let mut nodes = Vec::new();
        for (kind, x) in [("start", 0.0), ("print", 250.0), ("text_constant", 0.0)] {
            manager.begin_transaction(graph, "Add node").unwrap();
            nodes.push(manager.create_node(graph, kind, Point::new(x, 150.0)).unwrap());
            manager.end_transaction(graph, true).unwrap();
        }
        manager
            .connect(port(manager, nodes[0], "Exec"), port(manager, nodes[1], "In"))
            .unwrap()
            .unwrap();
        let text = manager
            .connect(port(manager, nodes[2], "Value"), port(manager, nodes[1], "Text"))
            .unwrap()
            .unwrap();
        manager.begin_transaction(graph, "Add router").unwrap();
        manager.create_router(text, 0, Point::new(120.0, 200.0)).unwrap();
        manager.end_transaction(graph, true).unwrap();
        manager
            .set_port_value(port(manager, nodes[2], "Value"), PortValue::String("hello".into()))
            .unwrap();
        manager.set_header(nodes[1], "Say hello").unwrap();
        nodes
    }

    #[test]
    fn test_undo_everything_then_redo_everything() {
        let (mut manager, graph) = setup();
        let empty = saved(&manager);
        build(&mut manager, graph);
        let full = saved(&manager);
        let depth = manager.history(graph).unwrap().undo_depth();
        assert_eq!(depth, 8);

        let mut states = vec![full.clone()];
        while manager.undo(graph).unwrap() {
            states.push(saved(&manager));
        }
        assert_eq!(saved(&manager), empty);
        assert!(manager.registry().nodes.is_empty());
        assert!(manager.registry().ports.is_empty());

        // Each redo lands exactly on the state before the matching undo
        states.pop();
        while manager.redo(graph).unwrap() {
            assert_eq!(Some(saved(&manager)), states.pop());
        }
        assert_eq!(saved(&manager), full);
    }

    #[test]
    fn test_cascade_delete_is_undone_in_one_step() {
        let (mut manager, graph) = setup();
        let nodes = build(&mut manager, graph);
        let before = saved(&manager);

        manager.begin_transaction(graph, "Delete node").unwrap();
        manager.destroy_node(nodes[1]).unwrap();
        manager.end_transaction(graph, true).unwrap();
        assert_eq!(manager.graph(graph).unwrap().connector_count(), 0);
        assert!(manager.registry().routers.is_empty());

        assert!(manager.undo(graph).unwrap());
        assert_eq!(saved(&manager), before);
        assert_eq!(manager.graph(graph).unwrap().nodes(), nodes.as_slice());
    }

    #[test]
    fn test_redo_restores_the_same_ids() {
        let (mut manager, graph) = setup();
        manager.begin_transaction(graph, "Add").unwrap();
        let node = manager.create_node(graph, "branch", Point::ZERO).unwrap();
        manager.end_transaction(graph, true).unwrap();
        let ports: Vec<PortId> = manager.find_node(node).unwrap().all_ports().collect();

        manager.undo(graph).unwrap();
        assert!(manager.find_node(node).is_none());
        manager.redo(graph).unwrap();
        assert_eq!(manager.find_node(node).unwrap().all_ports().collect::<Vec<_>>(), ports);
    }

    #[test]
    fn test_property_and_port_changes() {
        let (mut manager, graph) = setup();
        let node = manager.create_node(graph, "int_constant", Point::ZERO).unwrap();
        let value = port(&manager, node, "Value");
        let original = manager.find_node(node).unwrap().header_background();

        manager.set_port_value(value, PortValue::Int(7)).unwrap();
        manager
            .set_node_property(node, NodeProperty::HeaderBackground([1, 2, 3]))
            .unwrap();
        manager.begin_transaction(graph, "Add port").unwrap();
        let extra = manager
            .create_port(node, &PortSpec::property_input("Min", ValueType::Int), None)
            .unwrap();
        manager.end_transaction(graph, true).unwrap();

        manager.undo(graph).unwrap();
        assert!(manager.find_port(extra).is_none());
        manager.undo(graph).unwrap();
        assert_eq!(manager.find_node(node).unwrap().header_background(), original);
        manager.undo(graph).unwrap();
        assert_eq!(manager.find_port(value).unwrap().value(), Some(&PortValue::Int(0)));

        manager.redo(graph).unwrap();
        manager.redo(graph).unwrap();
        manager.redo(graph).unwrap();
        assert_eq!(manager.find_port(value).unwrap().value(), Some(&PortValue::Int(7)));
        assert!(manager.find_port(extra).is_some());
    }

    #[test]
    fn test_new_commit_clears_redo() {
        let (mut manager, graph) = setup();
        let node = manager.create_node(graph, "print", Point::ZERO).unwrap();
        manager.set_header(node, "One").unwrap();
        manager.undo(graph).unwrap();
        assert!(manager.history(graph).unwrap().can_redo());

        manager.set_header(node, "Two").unwrap();
        assert!(!manager.history(graph).unwrap().can_redo());
        assert!(!manager.redo(graph).unwrap());
    }

    #[test]
    fn test_replay_is_refused_mid_gesture_or_transaction() {
        let (mut manager, graph) = setup();
        let node = manager.create_node(graph, "print", Point::ZERO).unwrap();
        manager.set_header(node, "Renamed").unwrap();

        manager.begin_transaction(graph, "Open").unwrap();
        assert!(matches!(
            manager.undo(graph),
            Err(GraphError::History(HistoryError::ReplayDuringTransaction(_)))
        ));
        manager.end_transaction(graph, true).unwrap();

        manager.begin_connection(port(&manager, node, "Out")).unwrap();
        assert!(matches!(manager.undo(graph), Err(GraphError::ModeBusy { .. })));
        manager.cancel_interaction().unwrap();
        assert!(manager.undo(graph).unwrap());
        assert_eq!(manager.find_node(node).unwrap().header(), "Print");
    }

    #[test]
    fn test_failed_undo_rolls_back() {
        let (mut manager, graph) = setup();
        let node = manager.create_node(graph, "print", Point::ZERO).unwrap();
        let text = port(&manager, node, "Text");

        manager.begin_transaction(graph, "Edit").unwrap();
        manager.set_port_value(text, PortValue::String("hi".into())).unwrap();
        manager.set_header(node, "Log").unwrap();
        manager.end_transaction(graph, true).unwrap();

        // Not recorded: no transaction is open
        assert!(manager.destroy_port(text).unwrap());
        assert!(matches!(manager.undo(graph), Err(GraphError::UnknownPort(_))));

        assert_eq!(manager.find_node(node).unwrap().header(), "Log");
        let history = manager.history(graph).unwrap();
        assert_eq!(history.undo_label(), Some("Edit"));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_empty_history() {
        let (mut manager, graph) = setup();
        assert!(!manager.undo(graph).unwrap());
        assert!(!manager.redo(graph).unwrap());
        assert!(matches!(manager.undo(GraphId::new()), Err(GraphError::UnknownGraph(_))));
    }
}

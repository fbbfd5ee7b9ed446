// SPDX-License-Identifier: MIT OR Apache-2.0
//! Flow execution.
//!
//! Execution follows flow connectors: a node runs, then fires some of its
//! output flow ports, which runs the nodes at the other end. What a node
//! does is up to the host's [`NodeExecutor`]. Execution state changes are
//! reported as events and never recorded in history.

use crate::error::Result;
use crate::events::GraphEvent;
use crate::id::{ConnectorId, GraphId, NodeId};
use crate::manager::GraphManager;
use crate::node::{ExecutionState, Node};
use crate::port::{PortList, PortValue};
use crate::registry::Registry;

/// Maximum length of a chain of flow hops
pub const MAX_EXECUTION_DEPTH: usize = 256;

/// What a node did when executed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Finished; fire these output flow ports, in order
    Executed(Vec<String>),
    /// Chose not to run
    Skipped,
    /// Failed without raising an error
    Failed,
}

impl ExecutionOutcome {
    /// Finished without firing anything
    pub fn done() -> Self {
        Self::Executed(Vec::new())
    }

    /// Finished, firing one output flow port
    pub fn fire(port: impl Into<String>) -> Self {
        Self::Executed(vec![port.into()])
    }
}

/// Error during execution
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// Flow chain too long, usually an unbounded loop
    #[error("Execution chain exceeded {0} hops")]
    DepthExceeded(usize),

    /// Fired an output flow port that does not exist
    #[error("Node {node} has no output flow port named '{port}'")]
    UnknownOutput {
        /// Node that fired
        node: NodeId,
        /// Requested port name
        port: String,
    },

    /// Missing required input
    #[error("Missing required input: {0}")]
    MissingInput(String),

    /// Custom error
    #[error("{0}")]
    Custom(String),
}

/// Host-side behavior of nodes
pub trait NodeExecutor {
    /// Called before `on_execute`
    fn on_pre_execute(&mut self, _node: &Node, _via: Option<ConnectorId>) {}

    /// Run a node. `via` is the connector that triggered it, if any.
    fn on_execute(
        &mut self,
        node: &Node,
        registry: &Registry,
        via: Option<ConnectorId>,
    ) -> std::result::Result<ExecutionOutcome, ExecutionError>;

    /// Called after a successful `on_execute`, before outputs fire
    fn on_post_execute(&mut self, _node: &Node) {}
}

/// Value seen by a property input: the connected output's value, else its own
pub fn resolve_input(registry: &Registry, node: &Node, name: &str) -> Option<PortValue> {
    let port = node
        .ports(PortList::InputProperty)
        .iter()
        .filter_map(|id| registry.port(*id))
        .find(|p| p.name == name)?;

    let upstream = port
        .connectors()
        .iter()
        .filter_map(|id| registry.connector(*id))
        .find_map(|c| c.start_port())
        .and_then(|id| registry.port(id));
    match upstream {
        Some(source) => source.value().cloned(),
        None => port.value().cloned(),
    }
}

impl GraphManager {
    /// Execute a node and everything its fired outputs lead to
    pub fn execute_node(
        &mut self,
        node: NodeId,
        via: Option<ConnectorId>,
        executor: &mut dyn NodeExecutor,
    ) -> Result<ExecutionState> {
        self.execute_at_depth(node, via, executor, 0)
    }

    /// Execute the node at the end of a connector.
    ///
    /// A connector with no end yields `Failed`.
    pub fn execute_connector(&mut self, connector: ConnectorId, executor: &mut dyn NodeExecutor) -> Result<ExecutionState> {
        self.execute_connector_at_depth(connector, executor, 0)
    }

    /// Fire one output flow port of a node by name.
    ///
    /// Returns the state of every node reached directly.
    pub fn fire_output(&mut self, node: NodeId, port: &str, executor: &mut dyn NodeExecutor) -> Result<Vec<ExecutionState>> {
        self.fire_output_at_depth(node, port, executor, 0)
    }

    /// Reset every node of a graph to `ExecutionState::None`
    pub fn reset_execution_states(&mut self, graph: GraphId) -> Result<usize> {
        let nodes = self.registry.require_graph(graph)?.nodes.clone();
        let mut reset = 0;
        for node in nodes {
            if self.registry.require_node(node)?.execution_state() != ExecutionState::None {
                self.set_execution_state(node, ExecutionState::None)?;
                reset += 1;
            }
        }
        Ok(reset)
    }

    fn set_execution_state(&mut self, node: NodeId, state: ExecutionState) -> Result<()> {
        self.registry.require_node_mut(node)?.execution_state = state;
        self.emit(GraphEvent::ExecutionStateChanged { node, state });
        Ok(())
    }

    fn execute_at_depth(
        &mut self,
        node: NodeId,
        via: Option<ConnectorId>,
        executor: &mut dyn NodeExecutor,
        depth: usize,
    ) -> Result<ExecutionState> {
        if depth >= MAX_EXECUTION_DEPTH {
            return Err(ExecutionError::DepthExceeded(MAX_EXECUTION_DEPTH).into());
        }
        self.set_execution_state(node, ExecutionState::Executing)?;

        let n = self.registry.require_node(node)?;
        executor.on_pre_execute(n, via);
        let (state, fired) = match executor.on_execute(n, &self.registry, via) {
            Ok(ExecutionOutcome::Executed(fired)) => (ExecutionState::Executed, fired),
            Ok(ExecutionOutcome::Skipped) => (ExecutionState::Skipped, Vec::new()),
            Ok(ExecutionOutcome::Failed) => (ExecutionState::Failed, Vec::new()),
            Err(e) => {
                tracing::warn!("Node {node} ('{}') failed: {e}", n.header());
                (ExecutionState::Failed, Vec::new())
            }
        };
        self.set_execution_state(node, state)?;

        if state == ExecutionState::Executed {
            executor.on_post_execute(self.registry.require_node(node)?);
            for port in fired {
                self.fire_output_at_depth(node, &port, executor, depth + 1)?;
            }
        }
        Ok(state)
    }

    fn execute_connector_at_depth(
        &mut self,
        connector: ConnectorId,
        executor: &mut dyn NodeExecutor,
        depth: usize,
    ) -> Result<ExecutionState> {
        let end = self
            .registry
            .require_connector(connector)?
            .end_port()
            .and_then(|port| self.registry.port(port))
            .map(|port| port.owner);
        match end {
            Some(node) => self.execute_at_depth(node, Some(connector), executor, depth),
            None => Ok(ExecutionState::Failed),
        }
    }

    fn fire_output_at_depth(
        &mut self,
        node: NodeId,
        name: &str,
        executor: &mut dyn NodeExecutor,
        depth: usize,
    ) -> Result<Vec<ExecutionState>> {
        let n = self.registry.require_node(node)?;
        let connectors = n
            .ports(PortList::OutputFlow)
            .iter()
            .filter_map(|id| self.registry.port(*id))
            .find(|p| p.name == name)
            .map(|p| p.connectors().to_vec())
            .ok_or_else(|| ExecutionError::UnknownOutput {
                node,
                port: name.to_string(),
            })?;

        let mut states = Vec::with_capacity(connectors.len());
        for connector in connectors {
            states.push(self.execute_connector_at_depth(connector, executor, depth)?);
        }
        Ok(states)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::error::GraphError;
    use crate::geometry::Point;
    use crate::id::PortId;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Runs start/print/branch/loop nodes, logging printed text
    #[derive(Default)]
    struct Recorder {
        printed: Vec<String>,
        order: Vec<String>,
        post: usize,
        loop_budget: Option<usize>,
    }

    impl NodeExecutor for Recorder {
        fn on_execute(
            &mut self,
            node: &Node,
            registry: &Registry,
            _via: Option<ConnectorId>,
        ) -> std::result::Result<ExecutionOutcome, ExecutionError> {
            self.order.push(node.node_type.clone());
            match node.node_type.as_str() {
                "start" => Ok(ExecutionOutcome::fire("Exec")),
                "print" => match resolve_input(registry, node, "Text") {
                    Some(PortValue::String(text)) => {
                        self.printed.push(text);
                        Ok(ExecutionOutcome::fire("Out"))
                    }
                    _ => Err(ExecutionError::MissingInput("Text".into())),
                },
                "branch" => Ok(ExecutionOutcome::Executed(vec!["True".into(), "False".into()])),
                "loop" => match self.loop_budget {
                    Some(0) => Ok(ExecutionOutcome::fire("Completed")),
                    Some(n) => {
                        self.loop_budget = Some(n - 1);
                        Ok(ExecutionOutcome::fire("Body"))
                    }
                    None => Ok(ExecutionOutcome::fire("Body")),
                },
                _ => Ok(ExecutionOutcome::Skipped),
            }
        }

        fn on_post_execute(&mut self, _node: &Node) {
            self.post += 1;
        }
    }

    fn port(manager: &GraphManager, node: NodeId, name: &str) -> PortId {
        manager.find_port_by_name(node, name).unwrap()
    }

    fn setup() -> (GraphManager, GraphId) {
        let mut manager = GraphManager::with_standard_types(EngineConfig::default());
        let graph = manager.create_graph("Main");
        (manager, graph)
    }

    #[test]
    fn test_flow_chain_runs_in_order() {
        let (mut manager, graph) = setup();
        let start = manager.create_node(graph, "start", Point::ZERO).unwrap();
        let first = manager.create_node(graph, "print", Point::ZERO).unwrap();
        let second = manager.create_node(graph, "print", Point::ZERO).unwrap();
        let text = manager.create_node(graph, "text_constant", Point::ZERO).unwrap();

        manager.connect(port(&manager, start, "Exec"), port(&manager, first, "In")).unwrap();
        manager.connect(port(&manager, first, "Out"), port(&manager, second, "In")).unwrap();
        manager.connect(port(&manager, text, "Value"), port(&manager, first, "Text")).unwrap();
        manager
            .set_port_value(port(&manager, text, "Value"), PortValue::String("hello".into()))
            .unwrap();
        manager
            .set_port_value(port(&manager, second, "Text"), PortValue::String("world".into()))
            .unwrap();

        let depth = manager.history(graph).unwrap().undo_depth();
        let mut recorder = Recorder::default();
        let state = manager.execute_node(start, None, &mut recorder).unwrap();

        assert_eq!(state, ExecutionState::Executed);
        assert_eq!(recorder.printed, vec!["hello", "world"]);
        assert_eq!(recorder.post, 3);
        assert_eq!(manager.find_node(second).unwrap().execution_state(), ExecutionState::Executed);
        assert_eq!(manager.find_node(text).unwrap().execution_state(), ExecutionState::None);
        assert_eq!(manager.history(graph).unwrap().undo_depth(), depth);
    }

    #[test]
    fn test_failure_stops_the_chain() {
        let (mut manager, graph) = setup();
        let start = manager.create_node(graph, "start", Point::ZERO).unwrap();
        let broken = manager.create_node(graph, "print", Point::ZERO).unwrap();
        let after = manager.create_node(graph, "print", Point::ZERO).unwrap();
        manager.connect(port(&manager, start, "Exec"), port(&manager, broken, "In")).unwrap();
        manager.connect(port(&manager, broken, "Out"), port(&manager, after, "In")).unwrap();
        // "Text" is neither connected nor set
        let mut recorder = Recorder::default();
        manager.execute_node(start, None, &mut recorder).unwrap();

        assert_eq!(manager.find_node(broken).unwrap().execution_state(), ExecutionState::Failed);
        assert_eq!(manager.find_node(after).unwrap().execution_state(), ExecutionState::None);
        assert_eq!(recorder.order, vec!["start", "print"]);
    }

    #[test]
    fn test_events_and_reset() {
        let (mut manager, graph) = setup();
        let start = manager.create_node(graph, "start", Point::ZERO).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        manager.subscribe(Box::new(move |e| {
            if let GraphEvent::ExecutionStateChanged { state, .. } = e {
                sink.borrow_mut().push(*state);
            }
        }));

        manager.execute_node(start, None, &mut Recorder::default()).unwrap();
        assert_eq!(*seen.borrow(), vec![ExecutionState::Executing, ExecutionState::Executed]);

        assert_eq!(manager.reset_execution_states(graph).unwrap(), 1);
        assert_eq!(manager.find_node(start).unwrap().execution_state(), ExecutionState::None);
        assert_eq!(manager.reset_execution_states(graph).unwrap(), 0);
    }

    #[test]
    fn test_unbounded_loop_hits_depth_limit() {
        let (mut manager, graph) = setup();
        let looper = manager.create_node(graph, "loop", Point::ZERO).unwrap();
        let body = manager.create_node(graph, "branch", Point::ZERO).unwrap();
        manager.connect(port(&manager, looper, "Body"), port(&manager, body, "In")).unwrap().unwrap();
        manager.connect(port(&manager, body, "True"), port(&manager, looper, "In")).unwrap().unwrap();

        let mut bounded = Recorder {
            loop_budget: Some(3),
            ..Default::default()
        };
        manager.execute_node(looper, None, &mut bounded).unwrap();
        assert_eq!(bounded.order.iter().filter(|k| *k == "loop").count(), 4);

        let result = manager.execute_node(looper, None, &mut Recorder::default());
        assert!(matches!(
            result,
            Err(GraphError::Execution(ExecutionError::DepthExceeded(MAX_EXECUTION_DEPTH)))
        ));
    }

    #[test]
    fn test_unknown_output_and_dangling_connector() {
        let (mut manager, graph) = setup();
        let start = manager.create_node(graph, "start", Point::ZERO).unwrap();
        assert!(matches!(
            manager.fire_output(start, "Nope", &mut Recorder::default()),
            Err(GraphError::Execution(ExecutionError::UnknownOutput { .. }))
        ));
        assert!(manager.fire_output(start, "Exec", &mut Recorder::default()).unwrap().is_empty());

        let pending = manager.begin_connection(port(&manager, start, "Exec")).unwrap();
        assert_eq!(
            manager.execute_connector(pending, &mut Recorder::default()).unwrap(),
            ExecutionState::Failed
        );
        manager.cancel_interaction().unwrap();
    }
}

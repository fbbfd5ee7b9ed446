// SPDX-License-Identifier: MIT OR Apache-2.0
//! Engine error type.
//!
//! These are hard failures: operating on unknown ids, entering an
//! interaction mode while another is active, or structural load errors.
//! Connection validation never produces one of these, see
//! [`crate::connection::ConnectCheck`].

use crate::execution::ExecutionError;
use crate::history::HistoryError;
use crate::id::{ConnectorId, GraphId, NodeId, PortId, RouterId, SelectableId};
use crate::port::ValueType;
use crate::serialization::SerializeError;

/// Error raised by graph operations
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Graph not found
    #[error("Graph not found: {0}")]
    UnknownGraph(GraphId),

    /// Node not found
    #[error("Node not found: {0}")]
    UnknownNode(NodeId),

    /// Port not found
    #[error("Port not found: {0}")]
    UnknownPort(PortId),

    /// Connector not found
    #[error("Connector not found: {0}")]
    UnknownConnector(ConnectorId),

    /// Router not found
    #[error("Router not found: {0}")]
    UnknownRouter(RouterId),

    /// Selectable not found
    #[error("Selectable not found: {0:?}")]
    UnknownSelectable(SelectableId),

    /// Node type not registered
    #[error("Node type not registered: {0}")]
    UnknownNodeType(String),

    /// An id is already registered
    #[error("Id already in use: {0}")]
    DuplicateId(uuid::Uuid),

    /// Another interaction mode is active
    #[error("Cannot start {requested} while {active} is in progress")]
    ModeBusy {
        /// Mode currently active
        active: &'static str,
        /// Mode that was requested
        requested: &'static str,
    },

    /// A connection operation was called outside a connection gesture
    #[error("No connection is in progress")]
    NotConnecting,

    /// A gesture operation was called while a different mode is active
    #[error("Expected {expected}, but {active} is active")]
    WrongMode {
        /// Mode the operation belongs to
        expected: &'static str,
        /// Mode currently active
        active: &'static str,
    },

    /// Graph destruction left connectors behind
    #[error("Graph {0} still owns connectors")]
    GraphStillHasConnectors(GraphId),

    /// Value does not fit the port's declared type
    #[error("Port {port} expects {expected}, got {actual}")]
    ValueTypeMismatch {
        /// Target port
        port: PortId,
        /// Declared type
        expected: ValueType,
        /// Type of the rejected value
        actual: ValueType,
    },

    /// Operation only valid on property ports
    #[error("Port {0} is not a property port")]
    NotAPropertyPort(PortId),

    /// Router index outside the connector's router list
    #[error("Router index {index} out of range for connector {connector}")]
    RouterIndexOutOfRange {
        /// Owning connector
        connector: ConnectorId,
        /// Requested index
        index: usize,
    },

    /// History error
    #[error("History error: {0}")]
    History(#[from] HistoryError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(#[from] SerializeError),

    /// Execution error
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// I/O error while saving or loading
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for graph operations
pub type Result<T> = std::result::Result<T, GraphError>;

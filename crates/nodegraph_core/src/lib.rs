// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node graph editing engine.
//!
//! This crate holds the document model behind a visual node editor:
//! - Graphs of nodes with typed flow and property ports
//! - Connectors between ports, with optional routing points
//! - Connection validation, including cycle detection
//! - Selection, marquee selection and dragging
//! - Transactional undo/redo
//! - XML persistence
//!
//! ## Architecture
//!
//! [`GraphManager`] owns every graph and a [`Registry`] that maps ids to
//! entities. Entities refer to each other by id only; containment is the
//! ordered id lists inside graphs, nodes and connectors. All edits go
//! through the manager, which keeps both sides of every reference in sync
//! and records reversible commands in the graph's [`History`].
//!
//! Rendering is not part of this crate. A presentation layer subscribes to
//! [`GraphEvent`]s and calls the manager in response to input.

pub mod catalog;
pub mod config;
pub mod connection;
pub mod connector;
pub mod error;
pub mod events;
pub mod execution;
pub mod geometry;
pub mod graph;
pub mod history;
pub mod id;
pub mod lifecycle;
pub mod manager;
pub mod node;
pub mod port;
pub mod registry;
pub mod replay;
pub mod router;
pub mod selection;
pub mod serialization;

pub use config::{EngineConfig, SelectionMode};
pub use connection::{ConnectCheck, ConnectRejection, ConnectRule};
pub use connector::Connector;
pub use error::{GraphError, Result};
pub use events::{GraphEvent, ListenerId};
pub use execution::{ExecutionError, ExecutionOutcome, NodeExecutor};
pub use geometry::{Point, Rect, Size};
pub use graph::Graph;
pub use history::{Command, History, HistoryStats, TransactionId};
pub use id::{ConnectorId, EntityRef, GraphId, NodeId, PortId, RouterId, SelectableId};
pub use manager::{GraphManager, InteractionMode};
pub use node::{ExecutionState, Node, NodeCategory, NodeProperty, NodeType};
pub use port::{Port, PortDirection, PortFlags, PortKind, PortSpec, PortValue, ValueType};
pub use registry::Registry;
pub use router::Router;
pub use serialization::{LoadReport, SerializeError};

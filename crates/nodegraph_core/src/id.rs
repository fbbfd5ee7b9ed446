// SPDX-License-Identifier: MIT OR Apache-2.0
//! Entity identifiers.
//!
//! Every entity kind gets its own newtype over a random v4 [`Uuid`], so a
//! port id can never be handed to a node lookup by accident.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Mint a fresh random id
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Parse an id from its hyphenated text form
            pub fn parse(text: &str) -> Result<Self, uuid::Error> {
                Uuid::parse_str(text).map(Self)
            }

            /// The underlying uuid
            pub fn uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

entity_id!(
    /// Unique identifier for a graph document
    GraphId
);
entity_id!(
    /// Unique identifier for a node
    NodeId
);
entity_id!(
    /// Unique identifier for a port
    PortId
);
entity_id!(
    /// Unique identifier for a connector
    ConnectorId
);
entity_id!(
    /// Unique identifier for a router (connector waypoint)
    RouterId
);

/// Anything that can sit in a selection set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SelectableId {
    /// A node
    Node(NodeId),
    /// A router
    Router(RouterId),
}

impl SelectableId {
    /// The underlying uuid
    pub fn uuid(&self) -> Uuid {
        match self {
            Self::Node(id) => id.0,
            Self::Router(id) => id.0,
        }
    }
}

impl From<NodeId> for SelectableId {
    fn from(id: NodeId) -> Self {
        Self::Node(id)
    }
}

impl From<RouterId> for SelectableId {
    fn from(id: RouterId) -> Self {
        Self::Router(id)
    }
}

/// A reference to any entity, used by lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    /// A graph document
    Graph(GraphId),
    /// A node
    Node(NodeId),
    /// A port
    Port(PortId),
    /// A connector
    Connector(ConnectorId),
    /// A router
    Router(RouterId),
}

impl From<SelectableId> for EntityRef {
    fn from(id: SelectableId) -> Self {
        match id {
            SelectableId::Node(id) => Self::Node(id),
            SelectableId::Router(id) => Self::Router(id),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Graph(id) => write!(f, "graph {id}"),
            Self::Node(id) => write!(f, "node {id}"),
            Self::Port(id) => write!(f, "port {id}"),
            Self::Connector(id) => write!(f, "connector {id}"),
            Self::Router(id) => write!(f, "router {id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_parse_back() {
        let a = NodeId::new();
        let b = NodeId::new();
        assert_ne!(a, b);

        let parsed = NodeId::parse(&a.to_string()).unwrap();
        assert_eq!(parsed, a);
        assert!(PortId::parse("not-a-uuid").is_err());
    }

    #[test]
    fn test_selectable_conversions() {
        let node = NodeId::new();
        let selectable: SelectableId = node.into();
        assert_eq!(selectable.uuid(), node.uuid());
        assert_eq!(EntityRef::from(selectable), EntityRef::Node(node));
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connector (edge) definitions for the graph.

use crate::id::{ConnectorId, GraphId, PortId, RouterId};

/// A directed link from an output port to an input port
#[derive(Debug, Clone)]
pub struct Connector {
    /// Unique connector ID
    pub id: ConnectorId,
    /// Owning graph
    pub owner: GraphId,
    pub(crate) start_port: Option<PortId>,
    pub(crate) end_port: Option<PortId>,
    pub(crate) routers: Vec<RouterId>,
}

impl Connector {
    /// Create an unattached connector
    pub(crate) fn new(id: ConnectorId, owner: GraphId) -> Self {
        Self {
            id,
            owner,
            start_port: None,
            end_port: None,
            routers: Vec::new(),
        }
    }

    /// Output side; `None` only while a connection is being dragged
    pub fn start_port(&self) -> Option<PortId> {
        self.start_port
    }

    /// Input side; `None` only while a connection is being dragged
    pub fn end_port(&self) -> Option<PortId> {
        self.end_port
    }

    /// Both ends, when attached
    pub fn ends(&self) -> Option<(PortId, PortId)> {
        Some((self.start_port?, self.end_port?))
    }

    /// Waypoints, ordered along the path
    pub fn routers(&self) -> &[RouterId] {
        &self.routers
    }

    /// Check if this connector touches a specific port
    pub fn involves_port(&self, port_id: PortId) -> bool {
        self.start_port == Some(port_id) || self.end_port == Some(port_id)
    }

    /// The end opposite to `port_id`
    pub fn other_end(&self, port_id: PortId) -> Option<PortId> {
        if self.start_port == Some(port_id) {
            self.end_port
        } else if self.end_port == Some(port_id) {
            self.start_port
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_other_end() {
        let mut connector = Connector::new(ConnectorId::new(), GraphId::new());
        let (a, b) = (PortId::new(), PortId::new());
        assert!(connector.ends().is_none());

        connector.start_port = Some(a);
        connector.end_port = Some(b);
        assert_eq!(connector.ends(), Some((a, b)));
        assert_eq!(connector.other_end(a), Some(b));
        assert_eq!(connector.other_end(b), Some(a));
        assert_eq!(connector.other_end(PortId::new()), None);
        assert!(connector.involves_port(a));
    }
}

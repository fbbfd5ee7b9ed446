// SPDX-License-Identifier: MIT OR Apache-2.0
//! Routers: selectable waypoints along a connector's path.

use crate::geometry::{Point, Rect, Size};
use crate::id::{ConnectorId, GraphId, RouterId};

/// A waypoint owned by a connector
#[derive(Debug, Clone)]
pub struct Router {
    /// Unique router ID
    pub id: RouterId,
    /// Graph the owning connector belongs to
    pub graph: GraphId,
    /// Owning connector
    pub connector: ConnectorId,
    pub(crate) position: Point,
    pub(crate) index: usize,
    pub(crate) z_index: i32,
    pub(crate) size: Size,
    pub(crate) is_selected: bool,
}

impl Router {
    pub(crate) fn new(
        id: RouterId,
        graph: GraphId,
        connector: ConnectorId,
        position: Point,
        index: usize,
        size: Size,
    ) -> Self {
        Self {
            id,
            graph,
            connector,
            position,
            index,
            z_index: 0,
            size,
            is_selected: false,
        }
    }

    /// Position on the canvas
    pub fn position(&self) -> Point {
        self.position
    }

    /// Order along the connector, contiguous from 0
    pub fn index(&self) -> usize {
        self.index
    }

    /// Stacking order
    pub fn z_index(&self) -> i32 {
        self.z_index
    }

    /// Whether the router is selected
    pub fn is_selected(&self) -> bool {
        self.is_selected
    }

    /// Bounding box, centred on the position
    pub fn bounds(&self) -> Rect {
        let origin = Point::new(
            self.position.x - self.size.width / 2.0,
            self.position.y - self.size.height / 2.0,
        );
        Rect::from_origin_size(origin, self.size)
    }
}

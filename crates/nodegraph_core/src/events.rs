// SPDX-License-Identifier: MIT OR Apache-2.0
//! Notifications emitted to presentation-layer collaborators.

use crate::geometry::Point;
use crate::id::{ConnectorId, EntityRef, GraphId, NodeId, PortId, SelectableId};
use crate::node::ExecutionState;

/// How a selection set changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    /// Entities were added
    Added,
    /// Entities were removed
    Removed,
}

/// Phase of a drag-and-drop pass-through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragDropPhase {
    /// Pointer entered the canvas or an entity
    Enter,
    /// Pointer left
    Leave,
    /// Pointer moved while dragging
    Over,
    /// Payload dropped
    Drop,
}

/// Something that happened inside the engine
#[derive(Debug, Clone, PartialEq)]
pub enum GraphEvent {
    /// An entity was created by a live edit
    Created(EntityRef),
    /// An entity is about to be destroyed
    PreDestroy(EntityRef),
    /// An entity was destroyed
    PostDestroy(EntityRef),
    /// An entity was rebuilt from its serialized form
    Deserialized(EntityRef),
    /// A connector was attached to a port
    Connected {
        /// The connector
        connector: ConnectorId,
        /// The port it attached to
        port: PortId,
    },
    /// A connector was detached from a port
    Disconnected {
        /// The connector
        connector: ConnectorId,
        /// The port it detached from
        port: PortId,
    },
    /// A graph's selection set changed
    SelectionChanged {
        /// Graph whose selection changed
        graph: GraphId,
        /// Entities affected
        changed: Vec<SelectableId>,
        /// Kind of change
        change: SelectionChange,
    },
    /// Drag-and-drop pass-through from the presentation layer
    DragDrop {
        /// Graph under the pointer
        graph: GraphId,
        /// Phase
        phase: DragDropPhase,
        /// Model entity under the pointer, if any
        target: Option<EntityRef>,
        /// Pointer position in graph space
        position: Point,
        /// Opaque payload supplied by the host
        payload: String,
    },
    /// A node's execution state changed
    ExecutionStateChanged {
        /// The node
        node: NodeId,
        /// New state
        state: ExecutionState,
    },
}

/// Handle returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Callback invoked for every event
pub type EventListener = Box<dyn FnMut(&GraphEvent)>;

/// Synchronous fan-out of events to listeners.
///
/// Listeners only see shared references to events, never the manager, so
/// they cannot re-enter the engine while it is mid-operation.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<(ListenerId, EventListener)>,
    next_id: u64,
    trace: bool,
}

impl EventBus {
    /// Create an empty bus
    pub fn new(trace: bool) -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 1,
            trace,
        }
    }

    /// Register a listener
    pub fn subscribe(&mut self, listener: EventListener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Remove a listener; returns false if it was not registered
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Deliver an event to every listener
    pub fn emit(&mut self, event: GraphEvent) {
        if self.trace {
            tracing::trace!(?event, "graph event");
        }
        for (_, listener) in &mut self.listeners {
            listener(&event);
        }
    }

    /// Number of listeners
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// True when nobody listens
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .field("trace", &self.trace)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_subscribe_and_unsubscribe() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new(false);

        let sink = Rc::clone(&seen);
        let id = bus.subscribe(Box::new(move |e| sink.borrow_mut().push(e.clone())));

        let graph = GraphId::new();
        bus.emit(GraphEvent::Created(EntityRef::Graph(graph)));
        assert_eq!(seen.borrow().len(), 1);

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.emit(GraphEvent::PostDestroy(EntityRef::Graph(graph)));
        assert_eq!(seen.borrow().len(), 1);
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the graph framework.

use crate::geometry::{Point, Rect, Size};
use crate::id::{GraphId, NodeId, PortId};
use crate::port::{PortFamily, PortList, PortSpec};
use serde::{Deserialize, Serialize};

/// RGB colour used for node headers
pub type Rgb = [u8; 3];

/// Node type category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeCategory {
    /// Entry points and events
    Event,
    /// Constants and parameters
    Input,
    /// Math operations
    Math,
    /// Logic/flow control
    Logic,
    /// Utility nodes
    Utility,
    /// Custom/user-defined
    Custom,
}

/// Execution status of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExecutionState {
    /// Never executed (or reset)
    #[default]
    None,
    /// Currently running its callbacks
    Executing,
    /// Finished successfully
    Executed,
    /// Finished with an error
    Failed,
    /// Deliberately not run
    Skipped,
}

/// Node type definition
#[derive(Debug, Clone)]
pub struct NodeType {
    /// Unique type identifier
    pub id: String,
    /// Display name, used as the initial header
    pub name: String,
    /// Category
    pub category: NodeCategory,
    /// Description
    pub description: String,
    /// Port schema, in declaration order
    pub ports: Vec<PortSpec>,
    /// Whether connections may close a cycle through this node
    pub allow_circular_connection: bool,
    /// Initial header background colour
    pub header_background: Rgb,
    /// Initial header text colour
    pub header_font_color: Rgb,
}

impl NodeType {
    /// Create a node type with no ports
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: NodeCategory) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            description: String::new(),
            ports: Vec::new(),
            allow_circular_connection: false,
            header_background: [0, 0, 0],
            header_font_color: [255, 255, 255],
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Append a port to the schema
    pub fn with_port(mut self, port: PortSpec) -> Self {
        self.ports.push(port);
        self
    }

    /// Allow cycles through nodes of this type
    pub fn allowing_circular_connection(mut self) -> Self {
        self.allow_circular_connection = true;
        self
    }

    /// Set the header colours
    pub fn with_header_colors(mut self, background: Rgb, font: Rgb) -> Self {
        self.header_background = background;
        self.header_font_color = font;
        self
    }

    /// Port specs in creation order: all flow ports, then all property ports
    pub fn ports_in_creation_order(&self) -> impl Iterator<Item = &PortSpec> {
        let flow = self.ports.iter().filter(|p| p.family() == PortFamily::Flow);
        let property = self.ports.iter().filter(|p| p.family() == PortFamily::Property);
        flow.chain(property)
    }
}

/// A typed, reversible change to one scalar node property
#[derive(Debug, Clone, PartialEq)]
pub enum NodeProperty {
    /// Header text
    Header(String),
    /// Header background colour
    HeaderBackground(Rgb),
    /// Header text colour
    HeaderFontColor(Rgb),
    /// Whether the header may be edited
    AllowEditingHeader(bool),
    /// Whether cycles may pass through the node
    AllowCircularConnection(bool),
    /// Measured size reported by the presentation layer
    Size(Size),
}

impl NodeProperty {
    /// Short name used in logs and transaction labels
    pub fn name(&self) -> &'static str {
        match self {
            Self::Header(_) => "Header",
            Self::HeaderBackground(_) => "HeaderBackgroundColor",
            Self::HeaderFontColor(_) => "HeaderFontColor",
            Self::AllowEditingHeader(_) => "AllowEditingHeader",
            Self::AllowCircularConnection(_) => "AllowCircularConnection",
            Self::Size(_) => "Size",
        }
    }
}

/// A node instance in a graph
#[derive(Debug, Clone)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Owning graph
    pub owner: GraphId,
    /// Node type ID
    pub node_type: String,
    pub(crate) position: Point,
    pub(crate) z_index: i32,
    pub(crate) size: Size,
    pub(crate) header: String,
    pub(crate) header_background: Rgb,
    pub(crate) header_font_color: Rgb,
    pub(crate) allow_editing_header: bool,
    pub(crate) allow_circular_connection: bool,
    pub(crate) execution_state: ExecutionState,
    pub(crate) is_selected: bool,
    pub(crate) input_flow_ports: Vec<PortId>,
    pub(crate) output_flow_ports: Vec<PortId>,
    pub(crate) input_property_ports: Vec<PortId>,
    pub(crate) output_property_ports: Vec<PortId>,
}

impl Node {
    /// Create a portless node from a type definition
    pub(crate) fn new(
        id: NodeId,
        owner: GraphId,
        node_type: &NodeType,
        position: Point,
        z_index: i32,
        size: Size,
    ) -> Self {
        Self {
            id,
            owner,
            node_type: node_type.id.clone(),
            position,
            z_index,
            size,
            header: node_type.name.clone(),
            header_background: node_type.header_background,
            header_font_color: node_type.header_font_color,
            allow_editing_header: true,
            allow_circular_connection: node_type.allow_circular_connection,
            execution_state: ExecutionState::None,
            is_selected: false,
            input_flow_ports: Vec::new(),
            output_flow_ports: Vec::new(),
            input_property_ports: Vec::new(),
            output_property_ports: Vec::new(),
        }
    }

    /// Position of the top-left corner
    pub fn position(&self) -> Point {
        self.position
    }

    /// Stacking order, dense within the graph
    pub fn z_index(&self) -> i32 {
        self.z_index
    }

    /// Size used for bounds
    pub fn size(&self) -> Size {
        self.size
    }

    /// Bounding box on the canvas
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size)
    }

    /// Header text
    pub fn header(&self) -> &str {
        &self.header
    }

    /// Header background colour
    pub fn header_background(&self) -> Rgb {
        self.header_background
    }

    /// Header text colour
    pub fn header_font_color(&self) -> Rgb {
        self.header_font_color
    }

    /// Whether the header may be edited
    pub fn allow_editing_header(&self) -> bool {
        self.allow_editing_header
    }

    /// Whether cycles may pass through this node
    pub fn allow_circular_connection(&self) -> bool {
        self.allow_circular_connection
    }

    /// Current execution state
    pub fn execution_state(&self) -> ExecutionState {
        self.execution_state
    }

    /// Whether the node is in its graph's selection set
    pub fn is_selected(&self) -> bool {
        self.is_selected
    }

    /// Ports of one list, in order
    pub fn ports(&self, list: PortList) -> &[PortId] {
        match list {
            PortList::InputFlow => &self.input_flow_ports,
            PortList::OutputFlow => &self.output_flow_ports,
            PortList::InputProperty => &self.input_property_ports,
            PortList::OutputProperty => &self.output_property_ports,
        }
    }

    pub(crate) fn ports_mut(&mut self, list: PortList) -> &mut Vec<PortId> {
        match list {
            PortList::InputFlow => &mut self.input_flow_ports,
            PortList::OutputFlow => &mut self.output_flow_ports,
            PortList::InputProperty => &mut self.input_property_ports,
            PortList::OutputProperty => &mut self.output_property_ports,
        }
    }

    /// All ports in (input flow, output flow, input property, output property) order
    pub fn all_ports(&self) -> impl Iterator<Item = PortId> + '_ {
        self.input_flow_ports
            .iter()
            .chain(&self.output_flow_ports)
            .chain(&self.input_property_ports)
            .chain(&self.output_property_ports)
            .copied()
    }

    /// Ports leaving the node (output flow, then output property)
    pub fn output_ports(&self) -> impl Iterator<Item = PortId> + '_ {
        self.output_flow_ports
            .iter()
            .chain(&self.output_property_ports)
            .copied()
    }

    /// Current value of the same property as `like`
    pub fn property(&self, like: &NodeProperty) -> NodeProperty {
        match like {
            NodeProperty::Header(_) => NodeProperty::Header(self.header.clone()),
            NodeProperty::HeaderBackground(_) => NodeProperty::HeaderBackground(self.header_background),
            NodeProperty::HeaderFontColor(_) => NodeProperty::HeaderFontColor(self.header_font_color),
            NodeProperty::AllowEditingHeader(_) => NodeProperty::AllowEditingHeader(self.allow_editing_header),
            NodeProperty::AllowCircularConnection(_) => {
                NodeProperty::AllowCircularConnection(self.allow_circular_connection)
            }
            NodeProperty::Size(_) => NodeProperty::Size(self.size),
        }
    }

    pub(crate) fn set_property(&mut self, value: &NodeProperty) {
        match value {
            NodeProperty::Header(v) => self.header = v.clone(),
            NodeProperty::HeaderBackground(v) => self.header_background = *v,
            NodeProperty::HeaderFontColor(v) => self.header_font_color = *v,
            NodeProperty::AllowEditingHeader(v) => self.allow_editing_header = *v,
            NodeProperty::AllowCircularConnection(v) => self.allow_circular_connection = *v,
            NodeProperty::Size(v) => self.size = *v,
        }
    }
}

/// Registry of available node types
#[derive(Debug, Default)]
pub struct NodeTypeRegistry {
    types: indexmap::IndexMap<String, NodeType>,
}

impl NodeTypeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node type, replacing any type with the same id
    pub fn register(&mut self, node_type: NodeType) {
        self.types.insert(node_type.id.clone(), node_type);
    }

    /// Get a node type by ID
    pub fn get(&self, id: &str) -> Option<&NodeType> {
        self.types.get(id)
    }

    /// Get all registered types
    pub fn types(&self) -> impl Iterator<Item = &NodeType> {
        self.types.values()
    }

    /// Get types by category
    pub fn types_in_category(&self, category: NodeCategory) -> impl Iterator<Item = &NodeType> {
        self.types.values().filter(move |t| t.category == category)
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::ValueType;

    fn mixed_type() -> NodeType {
        NodeType::new("mixed", "Mixed", NodeCategory::Utility)
            .with_port(PortSpec::property_input("A", ValueType::Int))
            .with_port(PortSpec::flow_input("In"))
            .with_port(PortSpec::property_output("B", ValueType::Int))
            .with_port(PortSpec::flow_output("Out"))
    }

    #[test]
    fn test_creation_order_puts_flow_ports_first() {
        let names: Vec<_> = mixed_type()
            .ports_in_creation_order()
            .map(|p| p.name.clone())
            .collect();
        assert_eq!(names, ["In", "Out", "A", "B"]);
    }

    #[test]
    fn test_property_round_trip_on_node() {
        let ty = mixed_type();
        let mut node = Node::new(NodeId::new(), GraphId::new(), &ty, Point::ZERO, 0, Size::new(10.0, 10.0));
        assert_eq!(node.header(), "Mixed");

        let before = node.property(&NodeProperty::Header(String::new()));
        node.set_property(&NodeProperty::Header("Renamed".into()));
        assert_eq!(node.header(), "Renamed");
        node.set_property(&before);
        assert_eq!(node.header(), "Mixed");
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = NodeTypeRegistry::new();
        registry.register(mixed_type());
        registry.register(NodeType::new("start", "Start", NodeCategory::Event));

        assert_eq!(registry.len(), 2);
        assert!(registry.get("mixed").is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.types_in_category(NodeCategory::Event).count(), 1);
    }
}

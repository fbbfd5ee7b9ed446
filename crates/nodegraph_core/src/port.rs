// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port definitions for node inputs/outputs.
//!
//! Ports come in two families: flow ports carry control-flow links only,
//! property ports additionally carry a typed value.

use crate::id::{ConnectorId, NodeId, PortId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    /// Input port
    Input,
    /// Output port
    Output,
}

impl PortDirection {
    /// True for [`PortDirection::Input`]
    pub fn is_input(self) -> bool {
        self == Self::Input
    }
}

/// Data type declared by a property port
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// Boolean value
    Bool,
    /// Integer value
    Int,
    /// Floating point value
    Float,
    /// 2D vector
    Vector2,
    /// 3D vector
    Vector3,
    /// 4D vector
    Vector4,
    /// Color (RGBA)
    Color,
    /// String value
    String,
    /// Any type (for generic nodes)
    Any,
    /// Custom, host-defined type
    Custom(String),
}

impl ValueType {
    /// Check whether a value of type `source` may flow into a port of this type
    pub fn is_assignable_from(&self, source: &ValueType) -> bool {
        // Any type can connect to anything
        if matches!(self, Self::Any) || matches!(source, Self::Any) {
            return true;
        }

        if self == source {
            return true;
        }

        // Widening conversions only, source -> target
        match (source, self) {
            (Self::Int, Self::Float) => true,
            (Self::Float, Self::Vector2 | Self::Vector3 | Self::Vector4) => true,
            (Self::Vector2, Self::Vector3 | Self::Vector4) => true,
            (Self::Vector3, Self::Vector4) => true,
            (Self::Color, Self::Vector4) | (Self::Vector4, Self::Color) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("Bool"),
            Self::Int => f.write_str("Int"),
            Self::Float => f.write_str("Float"),
            Self::Vector2 => f.write_str("Vector2"),
            Self::Vector3 => f.write_str("Vector3"),
            Self::Vector4 => f.write_str("Vector4"),
            Self::Color => f.write_str("Color"),
            Self::String => f.write_str("String"),
            Self::Any => f.write_str("Any"),
            Self::Custom(name) => write!(f, "Custom:{name}"),
        }
    }
}

/// Error returned when parsing an unknown value type name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown value type: {0}")]
pub struct UnknownValueType(pub String);

impl FromStr for ValueType {
    type Err = UnknownValueType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Bool" => Self::Bool,
            "Int" => Self::Int,
            "Float" => Self::Float,
            "Vector2" => Self::Vector2,
            "Vector3" => Self::Vector3,
            "Vector4" => Self::Vector4,
            "Color" => Self::Color,
            "String" => Self::String,
            "Any" => Self::Any,
            other => match other.strip_prefix("Custom:") {
                Some(name) if !name.is_empty() => Self::Custom(name.to_string()),
                _ => return Err(UnknownValueType(other.to_string())),
            },
        })
    }
}

/// Value that can be stored in a property port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PortValue {
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i32),
    /// Float
    Float(f32),
    /// 2D vector
    Vector2([f32; 2]),
    /// 3D vector
    Vector3([f32; 3]),
    /// 4D vector
    Vector4([f32; 4]),
    /// Color
    Color([f32; 4]),
    /// String
    String(String),
}

impl PortValue {
    /// Get the value type for this value
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Bool(_) => ValueType::Bool,
            Self::Int(_) => ValueType::Int,
            Self::Float(_) => ValueType::Float,
            Self::Vector2(_) => ValueType::Vector2,
            Self::Vector3(_) => ValueType::Vector3,
            Self::Vector4(_) => ValueType::Vector4,
            Self::Color(_) => ValueType::Color,
            Self::String(_) => ValueType::String,
        }
    }
}

/// Flow or property, without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortFamily {
    /// Control-flow port
    Flow,
    /// Typed value port
    Property,
}

/// Payload carried by property ports
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySlot {
    /// Declared type, checked on connection
    pub value_type: ValueType,
    /// Current value
    pub value: Option<PortValue>,
    /// Whether the presentation layer shows an inline editor
    pub has_editor: bool,
    /// Whether the value is written when the graph is saved
    pub serialize_value: bool,
}

impl PropertySlot {
    /// Create a slot of the given type with no value
    pub fn new(value_type: ValueType) -> Self {
        Self {
            value_type,
            value: None,
            has_editor: true,
            serialize_value: true,
        }
    }
}

/// Port family together with its payload
#[derive(Debug, Clone, PartialEq)]
pub enum PortKind {
    /// Control-flow port
    Flow,
    /// Typed value port
    Property(PropertySlot),
}

impl PortKind {
    /// Family discriminant
    pub fn family(&self) -> PortFamily {
        match self {
            Self::Flow => PortFamily::Flow,
            Self::Property(_) => PortFamily::Property,
        }
    }
}

/// Which of the four ordered port lists of a node a port lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortList {
    /// Input flow ports
    InputFlow,
    /// Output flow ports
    OutputFlow,
    /// Input property ports
    InputProperty,
    /// Output property ports
    OutputProperty,
}

impl PortList {
    /// All lists in serialization order
    pub const ALL: [PortList; 4] = [
        PortList::InputFlow,
        PortList::OutputFlow,
        PortList::InputProperty,
        PortList::OutputProperty,
    ];

    /// List for a given family and direction
    pub fn of(family: PortFamily, direction: PortDirection) -> Self {
        match (family, direction) {
            (PortFamily::Flow, PortDirection::Input) => Self::InputFlow,
            (PortFamily::Flow, PortDirection::Output) => Self::OutputFlow,
            (PortFamily::Property, PortDirection::Input) => Self::InputProperty,
            (PortFamily::Property, PortDirection::Output) => Self::OutputProperty,
        }
    }
}

/// A port on a node
#[derive(Debug, Clone)]
pub struct Port {
    /// Unique port ID
    pub id: PortId,
    /// Owning node
    pub owner: NodeId,
    /// Port name, unique per node by convention
    pub name: String,
    /// Name shown by the presentation layer
    pub display_name: String,
    /// Port direction
    pub direction: PortDirection,
    /// Flow or property payload
    pub kind: PortKind,
    /// Whether more than one connector may end here
    pub allow_multiple_input: bool,
    /// Whether more than one connector may start here
    pub allow_multiple_output: bool,
    /// Whether the port accepts connections
    pub is_port_enabled: bool,
    /// Whether the port's editor is enabled
    pub is_enabled: bool,
    /// Name of a custom connection rule registered on the manager
    pub rule: Option<String>,
    pub(crate) connectors: Vec<ConnectorId>,
}

/// Connection flags of a port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortFlags {
    /// Whether the port accepts connections
    pub is_port_enabled: bool,
    /// Whether more than one connector may end here
    pub allow_multiple_input: bool,
    /// Whether more than one connector may start here
    pub allow_multiple_output: bool,
}

impl Port {
    /// Build a port from a schema entry
    pub fn from_spec(id: PortId, owner: NodeId, spec: &PortSpec) -> Self {
        Self {
            id,
            owner,
            name: spec.name.clone(),
            display_name: spec.display_name.clone(),
            direction: spec.direction,
            kind: spec.kind.clone(),
            allow_multiple_input: spec.allow_multiple_input,
            allow_multiple_output: spec.allow_multiple_output,
            is_port_enabled: spec.is_port_enabled,
            is_enabled: spec.is_enabled,
            rule: spec.rule.clone(),
            connectors: Vec::new(),
        }
    }

    /// Current connection flags
    pub fn flags(&self) -> PortFlags {
        PortFlags {
            is_port_enabled: self.is_port_enabled,
            allow_multiple_input: self.allow_multiple_input,
            allow_multiple_output: self.allow_multiple_output,
        }
    }

    pub(crate) fn set_flags(&mut self, flags: PortFlags) {
        self.is_port_enabled = flags.is_port_enabled;
        self.allow_multiple_input = flags.allow_multiple_input;
        self.allow_multiple_output = flags.allow_multiple_output;
    }

    /// Flow or property
    pub fn family(&self) -> PortFamily {
        self.kind.family()
    }

    /// True for input ports
    pub fn is_input(&self) -> bool {
        self.direction.is_input()
    }

    /// The node list this port lives in
    pub fn list(&self) -> PortList {
        PortList::of(self.family(), self.direction)
    }

    /// Connectors attached to this port, in attach order
    pub fn connectors(&self) -> &[ConnectorId] {
        &self.connectors
    }

    /// Declared value type (property ports only)
    pub fn value_type(&self) -> Option<&ValueType> {
        match &self.kind {
            PortKind::Property(slot) => Some(&slot.value_type),
            PortKind::Flow => None,
        }
    }

    /// Current value (property ports only)
    pub fn value(&self) -> Option<&PortValue> {
        match &self.kind {
            PortKind::Property(slot) => slot.value.as_ref(),
            PortKind::Flow => None,
        }
    }
}

/// Declarative port schema used by node types
#[derive(Debug, Clone, PartialEq)]
pub struct PortSpec {
    /// Port name
    pub name: String,
    /// Display name
    pub display_name: String,
    /// Port direction
    pub direction: PortDirection,
    /// Family and initial payload (the default value for property ports)
    pub kind: PortKind,
    /// Whether more than one connector may end here
    pub allow_multiple_input: bool,
    /// Whether more than one connector may start here
    pub allow_multiple_output: bool,
    /// Whether the port accepts connections
    pub is_port_enabled: bool,
    /// Whether the port's editor is enabled
    pub is_enabled: bool,
    /// Custom connection rule name
    pub rule: Option<String>,
}

impl PortSpec {
    // Flow ports fan in freely but leave through one connector; property
    // ports take one source but feed any number of consumers.
    fn flow(name: impl Into<String>, direction: PortDirection) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            direction,
            kind: PortKind::Flow,
            allow_multiple_input: true,
            allow_multiple_output: false,
            is_port_enabled: true,
            is_enabled: true,
            rule: None,
        }
    }

    fn property(name: impl Into<String>, value_type: ValueType, direction: PortDirection) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            direction,
            kind: PortKind::Property(PropertySlot::new(value_type)),
            allow_multiple_input: false,
            allow_multiple_output: true,
            is_port_enabled: true,
            is_enabled: true,
            rule: None,
        }
    }

    /// Create an input flow port spec
    pub fn flow_input(name: impl Into<String>) -> Self {
        Self::flow(name, PortDirection::Input)
    }

    /// Create an output flow port spec
    pub fn flow_output(name: impl Into<String>) -> Self {
        Self::flow(name, PortDirection::Output)
    }

    /// Create an input property port spec
    pub fn property_input(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::property(name, value_type, PortDirection::Input)
    }

    /// Create an output property port spec
    pub fn property_output(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::property(name, value_type, PortDirection::Output)
    }

    /// Set the display name
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    /// Set the default value (ignored on flow ports)
    pub fn with_default(mut self, value: PortValue) -> Self {
        if let PortKind::Property(slot) = &mut self.kind {
            slot.value = Some(value);
        }
        self
    }

    /// Set both multiplicity flags
    pub fn with_multiplicity(mut self, multiple_input: bool, multiple_output: bool) -> Self {
        self.allow_multiple_input = multiple_input;
        self.allow_multiple_output = multiple_output;
        self
    }

    /// Attach a custom connection rule
    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    /// Flow or property
    pub fn family(&self) -> PortFamily {
        self.kind.family()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_type_assignability() {
        assert!(ValueType::Float.is_assignable_from(&ValueType::Int));
        assert!(!ValueType::Int.is_assignable_from(&ValueType::Float));
        assert!(!ValueType::Float.is_assignable_from(&ValueType::Vector2));
        assert!(ValueType::Vector4.is_assignable_from(&ValueType::Vector2));
        assert!(!ValueType::Vector2.is_assignable_from(&ValueType::Vector4));
        assert!(!ValueType::String.is_assignable_from(&ValueType::Int));
        assert!(ValueType::Any.is_assignable_from(&ValueType::String));
        assert!(ValueType::Custom("Mesh".into()).is_assignable_from(&ValueType::Custom("Mesh".into())));
        assert!(!ValueType::Custom("Mesh".into()).is_assignable_from(&ValueType::Custom("Image".into())));
    }

    #[test]
    fn test_value_type_text_form() {
        for ty in [
            ValueType::Bool,
            ValueType::Vector3,
            ValueType::Any,
            ValueType::Custom("Texture".into()),
        ] {
            assert_eq!(ty.to_string().parse::<ValueType>().unwrap(), ty);
        }
        assert!("Custom:".parse::<ValueType>().is_err());
        assert!("Quaternion".parse::<ValueType>().is_err());
    }

    #[test]
    fn test_spec_defaults_follow_family() {
        let flow = PortSpec::flow_output("Exec");
        assert!(flow.allow_multiple_input && !flow.allow_multiple_output);

        let prop = PortSpec::property_input("A", ValueType::Int).with_default(PortValue::Int(4));
        assert!(!prop.allow_multiple_input && prop.allow_multiple_output);
        match &prop.kind {
            PortKind::Property(slot) => assert_eq!(slot.value, Some(PortValue::Int(4))),
            PortKind::Flow => panic!("expected a property port"),
        }
    }

    #[test]
    fn test_port_list_classification() {
        let node = NodeId::new();
        let port = Port::from_spec(PortId::new(), node, &PortSpec::property_output("Out", ValueType::Float));
        assert_eq!(port.list(), PortList::OutputProperty);
        assert_eq!(port.value_type(), Some(&ValueType::Float));
        assert!(port.connectors().is_empty());
    }
}

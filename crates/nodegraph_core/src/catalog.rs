// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in node types.

use crate::node::{NodeCategory, NodeType, Rgb};
use crate::port::{PortSpec, PortValue, ValueType};

const EVENT_COLOR: Rgb = [170, 40, 40];
const LOGIC_COLOR: Rgb = [90, 90, 110];
const INPUT_COLOR: Rgb = [40, 110, 60];
const MATH_COLOR: Rgb = [40, 80, 150];
const UTILITY_COLOR: Rgb = [120, 90, 40];
const HEADER_TEXT: Rgb = [240, 240, 240];

/// Every built-in node type
pub fn standard_node_types() -> Vec<NodeType> {
    vec![
        // Events
        NodeType::new("start", "Start", NodeCategory::Event)
            .with_description("Entry point of a flow")
            .with_port(PortSpec::flow_output("Exec"))
            .with_header_colors(EVENT_COLOR, HEADER_TEXT),
        // Logic
        NodeType::new("branch", "Branch", NodeCategory::Logic)
            .with_description("Continue on True or False")
            .with_port(PortSpec::flow_input("In"))
            .with_port(PortSpec::property_input("Condition", ValueType::Bool).with_default(PortValue::Bool(false)))
            .with_port(PortSpec::flow_output("True"))
            .with_port(PortSpec::flow_output("False"))
            .with_header_colors(LOGIC_COLOR, HEADER_TEXT),
        NodeType::new("sequence", "Sequence", NodeCategory::Logic)
            .with_description("Fire each output in order")
            .with_port(PortSpec::flow_input("In"))
            .with_port(PortSpec::flow_output("Then 0"))
            .with_port(PortSpec::flow_output("Then 1"))
            .with_header_colors(LOGIC_COLOR, HEADER_TEXT),
        NodeType::new("loop", "Loop", NodeCategory::Logic)
            .with_description("Run the body until done; may feed back into itself")
            .with_port(PortSpec::flow_input("In"))
            .with_port(PortSpec::flow_output("Body"))
            .with_port(PortSpec::flow_output("Completed"))
            .allowing_circular_connection()
            .with_header_colors(LOGIC_COLOR, HEADER_TEXT),
        // Input
        NodeType::new("int_constant", "Integer", NodeCategory::Input)
            .with_port(PortSpec::property_output("Value", ValueType::Int).with_default(PortValue::Int(0)))
            .with_header_colors(INPUT_COLOR, HEADER_TEXT),
        NodeType::new("float_constant", "Float", NodeCategory::Input)
            .with_port(PortSpec::property_output("Value", ValueType::Float).with_default(PortValue::Float(0.0)))
            .with_header_colors(INPUT_COLOR, HEADER_TEXT),
        NodeType::new("text_constant", "Text", NodeCategory::Input)
            .with_port(PortSpec::property_output("Value", ValueType::String).with_default(PortValue::String(String::new())))
            .with_header_colors(INPUT_COLOR, HEADER_TEXT),
        // Math
        NodeType::new("add", "Add", NodeCategory::Math)
            .with_description("A + B")
            .with_port(PortSpec::property_input("A", ValueType::Float).with_default(PortValue::Float(0.0)))
            .with_port(PortSpec::property_input("B", ValueType::Float).with_default(PortValue::Float(0.0)))
            .with_port(PortSpec::property_output("Result", ValueType::Float))
            .with_header_colors(MATH_COLOR, HEADER_TEXT),
        // Utility
        NodeType::new("print", "Print", NodeCategory::Utility)
            .with_description("Print text when triggered")
            .with_port(PortSpec::flow_input("In"))
            .with_port(PortSpec::flow_output("Out"))
            .with_port(PortSpec::property_input("Text", ValueType::String))
            .with_header_colors(UTILITY_COLOR, HEADER_TEXT),
        NodeType::new("to_text", "To Text", NodeCategory::Utility)
            .with_port(PortSpec::property_input("Value", ValueType::Any))
            .with_port(PortSpec::property_output("Text", ValueType::String))
            .with_header_colors(UTILITY_COLOR, HEADER_TEXT),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::PortFamily;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_unique() {
        let types = standard_node_types();
        let ids: HashSet<&str> = types.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids.len(), types.len());
    }

    #[test]
    fn test_port_names_are_unique_per_direction() {
        for node_type in standard_node_types() {
            let mut seen = HashSet::new();
            for port in &node_type.ports {
                assert!(
                    seen.insert((port.direction, port.name.clone())),
                    "{} declares '{}' twice",
                    node_type.id,
                    port.name
                );
            }
        }
    }

    #[test]
    fn test_flow_ports_come_first() {
        let branch = standard_node_types().into_iter().find(|t| t.id == "branch").unwrap();
        let families: Vec<PortFamily> = branch.ports_in_creation_order().map(PortSpec::family).collect();
        assert_eq!(
            families,
            vec![PortFamily::Flow, PortFamily::Flow, PortFamily::Flow, PortFamily::Property]
        );
    }
}

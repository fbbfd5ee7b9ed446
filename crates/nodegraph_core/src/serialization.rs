// SPDX-License-Identifier: MIT OR Apache-2.0
//! XML persistence.
//!
//! Documents are written depth-first with `quick-xml` and read back with
//! `roxmltree`:
//!
//! ```text
//! NodeGraph Version="1"
//!   Graph Id Type Name
//!     Nodes
//!       Node ...attributes
//!         InputFlowPorts / OutputFlowPorts / InputPropertyPorts / OutputPropertyPorts
//!           FlowPort | PropertyPort
//!     Connectors
//!       Connector Id Type Owner StartPort EndPort
//!         Routers
//!           Router
//! ```
//!
//! Reading is two-phase per graph: every node (with its ports) is rebuilt
//! before the first connector is resolved. A node or connector that fails
//! to parse or resolve is skipped and reported in [`LoadReport`]; only a
//! malformed document or a missing root fails the whole load. Unknown
//! attributes are ignored.
//!
//! The same element writers produce the snapshots stored in structural
//! history commands, so undo rebuilds entities exactly the way a load
//! would.

use crate::connector::Connector;
use crate::error::{GraphError, Result};
use crate::geometry::{Point, Size};
use crate::id::{ConnectorId, GraphId, NodeId, PortId, RouterId};
use crate::lifecycle::Origin;
use crate::manager::GraphManager;
use crate::node::{ExecutionState, Node, Rgb};
use crate::port::{Port, PortDirection, PortKind, PortList, PortValue, PropertySlot, ValueType};
use crate::registry::Registry;
use crate::router::Router;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use std::path::Path;
use std::str::FromStr;

/// Format version written on the root element
pub const FORMAT_VERSION: &str = "1";

const ROOT_TAG: &str = "NodeGraph";

/// Serialization errors
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    /// The text is not well-formed XML
    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),

    /// The XML writer failed
    #[error("XML write error: {0}")]
    Write(String),

    /// Root element is missing or has the wrong name
    #[error("Expected root element <{expected}>, found <{found}>")]
    UnexpectedRoot {
        /// Expected tag
        expected: &'static str,
        /// Tag found
        found: String,
    },

    /// An element has the wrong tag
    #[error("Expected <{expected}>, found <{found}>")]
    UnexpectedElement {
        /// Expected tag
        expected: &'static str,
        /// Tag found
        found: String,
    },

    /// A required attribute is absent
    #[error("<{element}> is missing attribute {attribute}")]
    MissingAttribute {
        /// Element tag
        element: String,
        /// Attribute name
        attribute: &'static str,
    },

    /// An attribute could not be parsed
    #[error("<{element}> attribute {attribute} has invalid value '{value}'")]
    InvalidAttribute {
        /// Element tag
        element: String,
        /// Attribute name
        attribute: &'static str,
        /// Offending text
        value: String,
    },

    /// A referenced entity does not exist
    #[error("Unresolved {kind} reference {id}")]
    UnresolvedReference {
        /// Kind of the referenced entity
        kind: &'static str,
        /// Referenced id
        id: String,
    },

    /// A connector without both ends cannot be persisted
    #[error("Connector {0} is not attached at both ends")]
    IncompleteConnector(ConnectorId),

    /// Property value text could not be converted
    #[error("Invalid port value: {0}")]
    Value(String),

    /// Writer produced invalid UTF-8
    #[error("Invalid UTF-8 in output: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

type SerResult<T> = std::result::Result<T, SerializeError>;

/// A node together with its ports, ready to be registered
#[derive(Debug, Clone)]
pub struct NodeRecord {
    /// The node, port lists already filled
    pub node: Node,
    /// Ports, in (input flow, output flow, input property, output property) order
    pub ports: Vec<Port>,
}

/// A connector together with its routers, ready to be registered
#[derive(Debug, Clone)]
pub struct ConnectorRecord {
    /// The connector, both ends set
    pub connector: Connector,
    /// Routers, ordered by index
    pub routers: Vec<Router>,
}

/// Something that was skipped while loading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntity {
    /// Element tag
    pub element: String,
    /// `Id` attribute, when readable
    pub id: Option<String>,
    /// Why it was skipped
    pub reason: String,
}

/// Outcome of a load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Graphs that were created, in document order
    pub graphs: Vec<GraphId>,
    /// Entities that were left out
    pub skipped: Vec<SkippedEntity>,
}

impl LoadReport {
    /// True when nothing was skipped
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

type XmlWriter = Writer<Vec<u8>>;

fn emit(writer: &mut XmlWriter, event: Event<'_>) -> SerResult<()> {
    writer
        .write_event(event)
        .map_err(|e| SerializeError::Write(e.to_string()))
}

fn new_writer() -> XmlWriter {
    Writer::new_with_indent(Vec::new(), b' ', 2)
}

fn finish(writer: XmlWriter) -> SerResult<String> {
    Ok(String::from_utf8(writer.into_inner())?)
}

fn flag(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

fn color_text(rgb: Rgb) -> String {
    format!("#{:02X}{:02X}{:02X}", rgb[0], rgb[1], rgb[2])
}

fn parse_color(text: &str) -> Option<Rgb> {
    let hex = text.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

fn value_text(value: &PortValue) -> SerResult<String> {
    ron::to_string(value).map_err(|e| SerializeError::Value(e.to_string()))
}

fn list_tag(list: PortList) -> &'static str {
    match list {
        PortList::InputFlow => "InputFlowPorts",
        PortList::OutputFlow => "OutputFlowPorts",
        PortList::InputProperty => "InputPropertyPorts",
        PortList::OutputProperty => "OutputPropertyPorts",
    }
}

fn write_port(writer: &mut XmlWriter, port: &Port) -> SerResult<()> {
    let tag = match port.kind {
        PortKind::Flow => "FlowPort",
        PortKind::Property(_) => "PropertyPort",
    };
    let mut el = BytesStart::new(tag);
    el.push_attribute(("Id", port.id.to_string().as_str()));
    el.push_attribute(("Type", tag));
    el.push_attribute(("Owner", port.owner.to_string().as_str()));
    el.push_attribute(("Name", port.name.as_str()));
    el.push_attribute(("DisplayName", port.display_name.as_str()));
    el.push_attribute(("IsInput", flag(port.is_input())));
    el.push_attribute(("AllowMultipleInput", flag(port.allow_multiple_input)));
    el.push_attribute(("AllowMultipleOutput", flag(port.allow_multiple_output)));
    el.push_attribute(("IsPortEnabled", flag(port.is_port_enabled)));
    el.push_attribute(("IsEnabled", flag(port.is_enabled)));
    if let Some(rule) = &port.rule {
        el.push_attribute(("Rule", rule.as_str()));
    }
    if let PortKind::Property(slot) = &port.kind {
        el.push_attribute(("ValueType", slot.value_type.to_string().as_str()));
        el.push_attribute(("HasEditor", flag(slot.has_editor)));
        el.push_attribute(("SerializeValue", flag(slot.serialize_value)));
        if slot.serialize_value {
            if let Some(value) = &slot.value {
                el.push_attribute(("Value", value_text(value)?.as_str()));
            }
        }
    }
    emit(writer, Event::Empty(el))
}

fn write_node(writer: &mut XmlWriter, registry: &Registry, node: &Node) -> SerResult<()> {
    let mut el = BytesStart::new("Node");
    el.push_attribute(("Id", node.id.to_string().as_str()));
    el.push_attribute(("Type", "Node"));
    el.push_attribute(("NodeType", node.node_type.as_str()));
    el.push_attribute(("Owner", node.owner.to_string().as_str()));
    el.push_attribute(("X", node.position.x.to_string().as_str()));
    el.push_attribute(("Y", node.position.y.to_string().as_str()));
    el.push_attribute(("ZIndex", node.z_index.to_string().as_str()));
    el.push_attribute(("Width", node.size.width.to_string().as_str()));
    el.push_attribute(("Height", node.size.height.to_string().as_str()));
    el.push_attribute(("Header", node.header.as_str()));
    el.push_attribute(("HeaderBackgroundColor", color_text(node.header_background).as_str()));
    el.push_attribute(("HeaderFontColor", color_text(node.header_font_color).as_str()));
    el.push_attribute(("AllowEditingHeader", flag(node.allow_editing_header)));
    el.push_attribute(("AllowCircularConnection", flag(node.allow_circular_connection)));
    emit(writer, Event::Start(el))?;

    for list in PortList::ALL {
        let tag = list_tag(list);
        let ids = node.ports(list);
        if ids.is_empty() {
            emit(writer, Event::Empty(BytesStart::new(tag)))?;
            continue;
        }
        emit(writer, Event::Start(BytesStart::new(tag)))?;
        for id in ids {
            let port = registry.port(*id).ok_or_else(|| SerializeError::UnresolvedReference {
                kind: "port",
                id: id.to_string(),
            })?;
            write_port(writer, port)?;
        }
        emit(writer, Event::End(BytesEnd::new(tag)))?;
    }

    emit(writer, Event::End(BytesEnd::new("Node")))
}

fn write_router(writer: &mut XmlWriter, router: &Router) -> SerResult<()> {
    let mut el = BytesStart::new("Router");
    el.push_attribute(("Id", router.id.to_string().as_str()));
    el.push_attribute(("Type", "Router"));
    el.push_attribute(("Owner", router.connector.to_string().as_str()));
    el.push_attribute(("X", router.position.x.to_string().as_str()));
    el.push_attribute(("Y", router.position.y.to_string().as_str()));
    el.push_attribute(("Index", router.index.to_string().as_str()));
    el.push_attribute(("ZIndex", router.z_index.to_string().as_str()));
    emit(writer, Event::Empty(el))
}

fn write_connector(writer: &mut XmlWriter, registry: &Registry, connector: &Connector) -> SerResult<()> {
    let (start, end) = connector
        .ends()
        .ok_or(SerializeError::IncompleteConnector(connector.id))?;

    let mut el = BytesStart::new("Connector");
    el.push_attribute(("Id", connector.id.to_string().as_str()));
    el.push_attribute(("Type", "Connector"));
    el.push_attribute(("Owner", connector.owner.to_string().as_str()));
    el.push_attribute(("StartPort", start.to_string().as_str()));
    el.push_attribute(("EndPort", end.to_string().as_str()));
    emit(writer, Event::Start(el))?;

    if connector.routers.is_empty() {
        emit(writer, Event::Empty(BytesStart::new("Routers")))?;
    } else {
        emit(writer, Event::Start(BytesStart::new("Routers")))?;
        for id in &connector.routers {
            let router = registry.router(*id).ok_or_else(|| SerializeError::UnresolvedReference {
                kind: "router",
                id: id.to_string(),
            })?;
            write_router(writer, router)?;
        }
        emit(writer, Event::End(BytesEnd::new("Routers")))?;
    }

    emit(writer, Event::End(BytesEnd::new("Connector")))
}

fn write_graph(
    writer: &mut XmlWriter,
    registry: &Registry,
    graph: GraphId,
    pending: Option<ConnectorId>,
) -> SerResult<()> {
    let graph = registry.graph(graph).ok_or_else(|| SerializeError::UnresolvedReference {
        kind: "graph",
        id: graph.to_string(),
    })?;

    let mut el = BytesStart::new("Graph");
    el.push_attribute(("Id", graph.id.to_string().as_str()));
    el.push_attribute(("Type", "Graph"));
    el.push_attribute(("Name", graph.name.as_str()));
    emit(writer, Event::Start(el))?;

    emit(writer, Event::Start(BytesStart::new("Nodes")))?;
    for id in &graph.nodes {
        if let Some(node) = registry.node(*id) {
            write_node(writer, registry, node)?;
        }
    }
    emit(writer, Event::End(BytesEnd::new("Nodes")))?;

    emit(writer, Event::Start(BytesStart::new("Connectors")))?;
    for id in &graph.connectors {
        if Some(*id) == pending {
            continue;
        }
        if let Some(connector) = registry.connector(*id) {
            write_connector(writer, registry, connector)?;
        }
    }
    emit(writer, Event::End(BytesEnd::new("Connectors")))?;

    emit(writer, Event::End(BytesEnd::new("Graph")))
}

/// Write the given graphs as one document.
///
/// `pending` is the connector of an unfinished connection, which is never
/// written.
pub fn write_document(registry: &Registry, graphs: &[GraphId], pending: Option<ConnectorId>) -> SerResult<String> {
    let mut writer = new_writer();
    emit(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new(ROOT_TAG);
    root.push_attribute(("Version", FORMAT_VERSION));
    emit(&mut writer, Event::Start(root))?;
    for graph in graphs {
        write_graph(&mut writer, registry, *graph, pending)?;
    }
    emit(&mut writer, Event::End(BytesEnd::new(ROOT_TAG)))?;

    finish(writer)
}

pub(crate) fn node_snapshot(registry: &Registry, node: NodeId) -> SerResult<String> {
    let node = registry.node(node).ok_or_else(|| SerializeError::UnresolvedReference {
        kind: "node",
        id: node.to_string(),
    })?;
    let mut writer = new_writer();
    write_node(&mut writer, registry, node)?;
    finish(writer)
}

pub(crate) fn port_snapshot(registry: &Registry, port: PortId) -> SerResult<String> {
    let port = registry.port(port).ok_or_else(|| SerializeError::UnresolvedReference {
        kind: "port",
        id: port.to_string(),
    })?;
    let mut writer = new_writer();
    write_port(&mut writer, port)?;
    finish(writer)
}

pub(crate) fn connector_snapshot(registry: &Registry, connector: ConnectorId) -> SerResult<String> {
    let connector = registry
        .connector(connector)
        .ok_or_else(|| SerializeError::UnresolvedReference {
            kind: "connector",
            id: connector.to_string(),
        })?;
    let mut writer = new_writer();
    write_connector(&mut writer, registry, connector)?;
    finish(writer)
}

pub(crate) fn router_snapshot(registry: &Registry, router: RouterId) -> SerResult<String> {
    let router = registry.router(router).ok_or_else(|| SerializeError::UnresolvedReference {
        kind: "router",
        id: router.to_string(),
    })?;
    let mut writer = new_writer();
    write_router(&mut writer, router)?;
    finish(writer)
}

type XmlNode<'a, 'input> = roxmltree::Node<'a, 'input>;

fn elements<'a, 'input>(node: XmlNode<'a, 'input>) -> impl Iterator<Item = XmlNode<'a, 'input>> {
    node.children().filter(|c| c.is_element())
}

fn child<'a, 'input>(node: XmlNode<'a, 'input>, tag: &str) -> Option<XmlNode<'a, 'input>> {
    elements(node).find(|c| c.has_tag_name(tag))
}

fn expect_tag(node: XmlNode<'_, '_>, expected: &'static str) -> SerResult<()> {
    if node.has_tag_name(expected) {
        Ok(())
    } else {
        Err(SerializeError::UnexpectedElement {
            expected,
            found: node.tag_name().name().to_string(),
        })
    }
}

fn attr<'a>(node: XmlNode<'a, '_>, name: &'static str) -> SerResult<&'a str> {
    node.attribute(name).ok_or_else(|| SerializeError::MissingAttribute {
        element: node.tag_name().name().to_string(),
        attribute: name,
    })
}

fn invalid(node: XmlNode<'_, '_>, name: &'static str, value: &str) -> SerializeError {
    SerializeError::InvalidAttribute {
        element: node.tag_name().name().to_string(),
        attribute: name,
        value: value.to_string(),
    }
}

fn parsed<T: FromStr>(node: XmlNode<'_, '_>, name: &'static str) -> SerResult<T> {
    let text = attr(node, name)?;
    text.parse().map_err(|_| invalid(node, name, text))
}

fn parsed_or<T: FromStr>(node: XmlNode<'_, '_>, name: &'static str, default: T) -> SerResult<T> {
    match node.attribute(name) {
        Some(text) => text.parse().map_err(|_| invalid(node, name, text)),
        None => Ok(default),
    }
}

fn id_attr<T>(
    node: XmlNode<'_, '_>,
    name: &'static str,
    parse: fn(&str) -> std::result::Result<T, uuid::Error>,
) -> SerResult<T> {
    let text = attr(node, name)?;
    parse(text).map_err(|_| invalid(node, name, text))
}

fn color_attr(node: XmlNode<'_, '_>, name: &'static str, default: Rgb) -> SerResult<Rgb> {
    match node.attribute(name) {
        Some(text) => parse_color(text).ok_or_else(|| invalid(node, name, text)),
        None => Ok(default),
    }
}

/// Parse a `FlowPort` or `PropertyPort` element
pub fn parse_port(node: XmlNode<'_, '_>) -> SerResult<Port> {
    let kind = match node.tag_name().name() {
        "FlowPort" => PortKind::Flow,
        "PropertyPort" => {
            let value_type: ValueType = parsed(node, "ValueType")?;
            let mut slot = PropertySlot::new(value_type);
            slot.has_editor = parsed_or(node, "HasEditor", true)?;
            slot.serialize_value = parsed_or(node, "SerializeValue", true)?;
            if let Some(text) = node.attribute("Value") {
                let value: PortValue =
                    ron::from_str(text).map_err(|e| SerializeError::Value(e.to_string()))?;
                slot.value = Some(value);
            }
            PortKind::Property(slot)
        }
        other => {
            return Err(SerializeError::UnexpectedElement {
                expected: "FlowPort",
                found: other.to_string(),
            })
        }
    };

    let name = attr(node, "Name")?.to_string();
    let direction = if parsed::<bool>(node, "IsInput")? {
        PortDirection::Input
    } else {
        PortDirection::Output
    };
    let flow = matches!(kind, PortKind::Flow);

    Ok(Port {
        id: id_attr(node, "Id", PortId::parse)?,
        owner: id_attr(node, "Owner", NodeId::parse)?,
        display_name: node.attribute("DisplayName").unwrap_or(&name).to_string(),
        name,
        direction,
        kind,
        allow_multiple_input: parsed_or(node, "AllowMultipleInput", flow)?,
        allow_multiple_output: parsed_or(node, "AllowMultipleOutput", !flow)?,
        is_port_enabled: parsed_or(node, "IsPortEnabled", true)?,
        is_enabled: parsed_or(node, "IsEnabled", true)?,
        rule: node.attribute("Rule").map(str::to_string),
        connectors: Vec::new(),
    })
}

/// Parse a `Node` element and its ports.
///
/// `default_size` is used when the element carries no size.
pub fn parse_node(node: XmlNode<'_, '_>, default_size: Size) -> SerResult<NodeRecord> {
    expect_tag(node, "Node")?;

    let id = id_attr(node, "Id", NodeId::parse)?;
    let mut record = NodeRecord {
        node: Node {
            id,
            owner: id_attr(node, "Owner", GraphId::parse)?,
            node_type: attr(node, "NodeType")?.to_string(),
            position: Point::new(parsed(node, "X")?, parsed(node, "Y")?),
            z_index: parsed_or(node, "ZIndex", 0)?,
            size: Size::new(
                parsed_or(node, "Width", default_size.width)?,
                parsed_or(node, "Height", default_size.height)?,
            ),
            header: node.attribute("Header").unwrap_or_default().to_string(),
            header_background: color_attr(node, "HeaderBackgroundColor", [0, 0, 0])?,
            header_font_color: color_attr(node, "HeaderFontColor", [255, 255, 255])?,
            allow_editing_header: parsed_or(node, "AllowEditingHeader", true)?,
            allow_circular_connection: parsed_or(node, "AllowCircularConnection", false)?,
            execution_state: ExecutionState::None,
            is_selected: false,
            input_flow_ports: Vec::new(),
            output_flow_ports: Vec::new(),
            input_property_ports: Vec::new(),
            output_property_ports: Vec::new(),
        },
        ports: Vec::new(),
    };

    for list in PortList::ALL {
        let Some(container) = child(node, list_tag(list)) else {
            continue;
        };
        for el in elements(container) {
            let port = parse_port(el)?;
            if port.owner != id {
                return Err(invalid(el, "Owner", &port.owner.to_string()));
            }
            if port.list() != list {
                return Err(invalid(el, "IsInput", flag(port.is_input())));
            }
            record.node.ports_mut(list).push(port.id);
            record.ports.push(port);
        }
    }

    Ok(record)
}

/// Parse a `Router` element; `graph` is the owning connector's graph
pub fn parse_router(node: XmlNode<'_, '_>, graph: GraphId, size: Size) -> SerResult<Router> {
    expect_tag(node, "Router")?;
    let mut router = Router::new(
        id_attr(node, "Id", RouterId::parse)?,
        graph,
        id_attr(node, "Owner", ConnectorId::parse)?,
        Point::new(parsed(node, "X")?, parsed(node, "Y")?),
        parsed(node, "Index")?,
        size,
    );
    router.z_index = parsed_or(node, "ZIndex", 0)?;
    Ok(router)
}

/// Parse a `Connector` element and its routers
pub fn parse_connector(node: XmlNode<'_, '_>, router_size: Size) -> SerResult<ConnectorRecord> {
    expect_tag(node, "Connector")?;

    let id = id_attr(node, "Id", ConnectorId::parse)?;
    let owner = id_attr(node, "Owner", GraphId::parse)?;
    let mut connector = Connector::new(id, owner);
    connector.start_port = Some(id_attr(node, "StartPort", PortId::parse)?);
    connector.end_port = Some(id_attr(node, "EndPort", PortId::parse)?);

    let mut routers = Vec::new();
    if let Some(container) = child(node, "Routers") {
        for el in elements(container) {
            let router = parse_router(el, owner, router_size)?;
            if router.connector != id {
                return Err(invalid(el, "Owner", &router.connector.to_string()));
            }
            routers.push(router);
        }
    }
    routers.sort_by_key(|r| r.index);
    for (index, router) in routers.iter_mut().enumerate() {
        router.index = index;
    }
    connector.routers = routers.iter().map(|r| r.id).collect();

    Ok(ConnectorRecord { connector, routers })
}

/// Parse a standalone snapshot fragment with the given element parser
pub(crate) fn parse_snapshot<T>(
    text: &str,
    parse: impl FnOnce(XmlNode<'_, '_>) -> SerResult<T>,
) -> SerResult<T> {
    let doc = roxmltree::Document::parse(text)?;
    parse(doc.root_element())
}

fn check_owner(node: XmlNode<'_, '_>, owner: GraphId, graph: GraphId) -> SerResult<()> {
    if owner == graph {
        Ok(())
    } else {
        Err(invalid(node, "Owner", &owner.to_string()))
    }
}

fn skipped(node: XmlNode<'_, '_>, reason: impl ToString) -> SkippedEntity {
    let entity = SkippedEntity {
        element: node.tag_name().name().to_string(),
        id: node.attribute("Id").map(str::to_string),
        reason: reason.to_string(),
    };
    tracing::warn!(
        "Skipping <{}> {}: {}",
        entity.element,
        entity.id.as_deref().unwrap_or("(no id)"),
        entity.reason
    );
    entity
}

impl GraphManager {
    /// Serialize every graph into one document
    pub fn save_to_string(&self) -> Result<String> {
        let graphs: Vec<GraphId> = self.registry.graphs.keys().copied().collect();
        Ok(write_document(&self.registry, &graphs, self.pending_connector())?)
    }

    /// Serialize a single graph
    pub fn save_graph_to_string(&self, graph: GraphId) -> Result<String> {
        self.registry.require_graph(graph)?;
        Ok(write_document(&self.registry, &[graph], self.pending_connector())?)
    }

    /// Save every graph to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = self.save_to_string()?;
        std::fs::write(path, text)?;
        tracing::info!("Saved {} graph(s) to {}", self.registry.graphs.len(), path.display());
        Ok(())
    }

    /// Load every graph from a file
    pub fn load(&mut self, path: &Path) -> Result<LoadReport> {
        let text = std::fs::read_to_string(path)?;
        let report = self.load_from_str(&text)?;
        tracing::info!(
            "Loaded {} graph(s) from {} ({} skipped)",
            report.graphs.len(),
            path.display(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// Rebuild graphs from document text, skipping entities that fail
    pub fn load_from_str(&mut self, text: &str) -> Result<LoadReport> {
        let doc = roxmltree::Document::parse(text).map_err(SerializeError::from)?;
        let root = doc.root_element();
        if !root.has_tag_name(ROOT_TAG) {
            return Err(SerializeError::UnexpectedRoot {
                expected: ROOT_TAG,
                found: root.tag_name().name().to_string(),
            }
            .into());
        }
        if let Some(version) = root.attribute("Version") {
            if version != FORMAT_VERSION {
                tracing::warn!("Reading format version {version}, expected {FORMAT_VERSION}");
            }
        }

        let mut report = LoadReport::default();
        let node_size = self.config().default_node_size;
        let router_size = self.config().router_size;

        for graph_el in elements(root) {
            if !graph_el.has_tag_name("Graph") {
                continue;
            }
            let graph = match id_attr(graph_el, "Id", GraphId::parse) {
                Ok(id) => {
                    let name = graph_el.attribute("Name").unwrap_or_default();
                    match self.insert_graph(id, name, Origin::Restore) {
                        Ok(id) => id,
                        Err(e) => {
                            report.skipped.push(skipped(graph_el, e));
                            continue;
                        }
                    }
                }
                Err(e) => {
                    report.skipped.push(skipped(graph_el, e));
                    continue;
                }
            };
            self.with_history_suppressed(graph, |manager| {
                if let Some(nodes) = child(graph_el, "Nodes") {
                    for el in elements(nodes) {
                        let outcome = parse_node(el, node_size)
                            .and_then(|record| check_owner(el, record.node.owner, graph).map(|()| record))
                            .map_err(GraphError::from)
                            .and_then(|record| manager.materialize_node(record, None, Origin::Restore));
                        if let Err(e) = outcome {
                            report.skipped.push(skipped(el, e));
                        }
                    }
                }
                if let Some(connectors) = child(graph_el, "Connectors") {
                    for el in elements(connectors) {
                        let outcome = parse_connector(el, router_size)
                            .and_then(|record| check_owner(el, record.connector.owner, graph).map(|()| record))
                            .map_err(GraphError::from)
                            .and_then(|record| manager.materialize_connector(record, None, Origin::Restore));
                        if let Err(e) = outcome {
                            report.skipped.push(skipped(el, e));
                        }
                    }
                }
            });
            self.compact_z_order(graph)?;
            report.graphs.push(graph);
        }

        Ok(report)
    }
}

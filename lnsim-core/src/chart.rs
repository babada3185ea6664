//! The visual graph paired with each network.

use crate::model::{NetworkId, NodeKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Every chart, keyed by the id of the network it draws.
pub type Charts = BTreeMap<NetworkId, Chart>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortSide {
    Top,
    Bottom,
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub id: String,
    pub side: PortSide,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeProperties {
    pub kind: NodeKind,
    pub implementation: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartNode {
    pub id: String,
    pub position: Position,
    pub size: Size,
    pub ports: BTreeMap<String, Port>,
    pub properties: NodeProperties,
}

impl ChartNode {
    pub fn kind(&self) -> NodeKind {
        self.properties.kind
    }

    pub fn has_port(&self, port_id: &str) -> bool {
        self.ports.contains_key(port_id)
    }
}

/// One end of a link: a port on a chart node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub node_id: String,
    pub port_id: String,
}

impl Endpoint {
    pub fn new(node_id: impl Into<String>, port_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            port_id: port_id.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    /// A lightning node's binding to its bitcoin backend.
    Backend,
    /// A payment channel between two lightning nodes.
    Channel,
}

impl LinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkKind::Backend => "backend",
            LinkKind::Channel => "channel",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartLink {
    pub id: String,
    pub from: Endpoint,
    pub to: Endpoint,
    pub kind: LinkKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity_sats: Option<u64>,
}

impl ChartLink {
    pub fn touches(&self, node_id: &str) -> bool {
        self.from.node_id == node_id || self.to.node_id == node_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Node,
    Link,
}

/// What is selected or hovered on the chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub entity_type: EntityType,
    pub entity_id: String,
}

impl Selection {
    pub fn node(id: impl Into<String>) -> Self {
        Self {
            entity_type: EntityType::Node,
            entity_id: id.into(),
        }
    }

    pub fn link(id: impl Into<String>) -> Self {
        Self {
            entity_type: EntityType::Link,
            entity_id: id.into(),
        }
    }
}

/// Nodes are keyed by node name, links by their derived id. Mutation goes
/// through [`crate::topology`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    pub(crate) nodes: BTreeMap<String, ChartNode>,
    pub(crate) links: BTreeMap<String, ChartLink>,
    #[serde(default)]
    pub(crate) selected: Option<Selection>,
    #[serde(default)]
    pub(crate) hovered: Option<Selection>,
    pub(crate) scale: f64,
    #[serde(default)]
    pub(crate) offset: Position,
}

impl Default for Chart {
    fn default() -> Self {
        Self {
            nodes: BTreeMap::new(),
            links: BTreeMap::new(),
            selected: None,
            hovered: None,
            scale: 1.0,
            offset: Position::default(),
        }
    }
}

impl Chart {
    pub fn nodes(&self) -> &BTreeMap<String, ChartNode> {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&ChartNode> {
        self.nodes.get(id)
    }

    pub fn links(&self) -> &BTreeMap<String, ChartLink> {
        &self.links
    }

    pub fn link(&self, id: &str) -> Option<&ChartLink> {
        self.links.get(id)
    }

    pub fn has_link(&self, id: &str) -> bool {
        self.links.contains_key(id)
    }

    pub fn selected(&self) -> Option<&Selection> {
        self.selected.as_ref()
    }

    pub fn hovered(&self) -> Option<&Selection> {
        self.hovered.as_ref()
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn offset(&self) -> Position {
        self.offset
    }

    /// Whether `selection` names a node or link present in this chart.
    pub fn resolves(&self, selection: &Selection) -> bool {
        match selection.entity_type {
            EntityType::Node => self.nodes.contains_key(&selection.entity_id),
            EntityType::Link => self.links.contains_key(&selection.entity_id),
        }
    }
}

//! Keeps a network's chart consistent with the network itself.
//!
//! Every operation here is total: operating on an id that does not exist is a
//! no-op, and a call either applies completely or not at all. Cascading effects
//! (links of a removed node, selections of a removed entity) are handled inside
//! the operation that causes them.

use crate::chart::{
    Chart, ChartLink, ChartNode, EntityType, Endpoint, LinkKind, NodeProperties, Port, PortSide,
    Position, Selection, Size,
};
use crate::config::ZoomConfig;
use crate::model::{Network, NodeKind, NodeRef};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

pub const PORT_BACKEND: &str = "backend";
pub const PORT_LEFT: &str = "empty-left";
pub const PORT_RIGHT: &str = "empty-right";

const NODE_SIZE: Size = Size {
    width: 200.0,
    height: 36.0,
};
const GRID_X: f64 = 50.0;
const GRID_SPACING: f64 = 250.0;
const LIGHTNING_ROW_Y: f64 = 50.0;
const BITCOIN_ROW_Y: f64 = 400.0;

/// Id of a link between `from` and `to` of the given kind. Backend links are
/// `<lightning>-<backend>`.
pub fn link_id(from: &str, to: &str, kind: LinkKind) -> String {
    match kind {
        LinkKind::Backend => format!("{}-{}", from, to),
        LinkKind::Channel => format!("{}-{}-channel", from, to),
    }
}

/// Id of the backend connection link of a lightning node.
pub fn backend_link_id(ln_name: &str, backend_name: &str) -> String {
    link_id(ln_name, backend_name, LinkKind::Backend)
}

fn port(id: &str, side: PortSide) -> (String, Port) {
    (
        id.to_string(),
        Port {
            id: id.to_string(),
            side,
        },
    )
}

fn chart_node(node: NodeRef<'_>, position: Position) -> ChartNode {
    let ports: BTreeMap<String, Port> = match node {
        NodeRef::Bitcoin(_) => [port(PORT_BACKEND, PortSide::Top)].into_iter().collect(),
        NodeRef::Lightning(_) => [
            port(PORT_LEFT, PortSide::Left),
            port(PORT_RIGHT, PortSide::Right),
            port(PORT_BACKEND, PortSide::Bottom),
        ]
        .into_iter()
        .collect(),
    };
    ChartNode {
        id: node.name().to_string(),
        position,
        size: NODE_SIZE,
        ports,
        properties: NodeProperties {
            kind: node.kind(),
            implementation: node.implementation().to_string(),
            version: node.version().to_string(),
        },
    }
}

fn grid_position(index: usize, row_y: f64) -> Position {
    Position::new(GRID_X + GRID_SPACING * index as f64, row_y)
}

/// Builds the chart for a freshly created network: lightning nodes on the top
/// row, bitcoin nodes on the bottom row, and one backend link per lightning
/// node. The output depends only on the network.
pub fn init_chart_from_network(network: &Network) -> Chart {
    let mut chart = Chart::default();

    for (i, node) in network.lightning().iter().enumerate() {
        let node = NodeRef::Lightning(node);
        chart
            .nodes
            .insert(node.name().to_string(), chart_node(node, grid_position(i, LIGHTNING_ROW_Y)));
    }
    for (i, node) in network.bitcoin().iter().enumerate() {
        let node = NodeRef::Bitcoin(node);
        chart
            .nodes
            .insert(node.name().to_string(), chart_node(node, grid_position(i, BITCOIN_ROW_Y)));
    }

    for ln in network.lightning() {
        let from = Endpoint::new(&ln.name, PORT_BACKEND);
        let to = Endpoint::new(&ln.backend_name, PORT_BACKEND);
        if add_link(&mut chart, from, to, LinkKind::Backend).is_none() {
            warn!(
                "Network {}: {} has no backend '{}' to link to",
                network.id(),
                ln.name,
                ln.backend_name
            );
        }
    }

    debug!(
        "Initialized chart for network {} with {} nodes and {} links",
        network.id(),
        chart.nodes.len(),
        chart.links.len()
    );
    chart
}

/// Adds a link and returns its id. Adding a link that already exists returns
/// the existing id unchanged. Returns `None` without touching the chart when an
/// endpoint names a missing node or port, or both ends are the same node.
pub fn add_link(chart: &mut Chart, from: Endpoint, to: Endpoint, kind: LinkKind) -> Option<String> {
    if from.node_id == to.node_id {
        return None;
    }
    let valid = |end: &Endpoint| {
        chart
            .nodes
            .get(&end.node_id)
            .is_some_and(|node| node.has_port(&end.port_id))
    };
    if !valid(&from) || !valid(&to) {
        debug!(
            "Not linking {}:{} to {}:{}, endpoint missing",
            from.node_id, from.port_id, to.node_id, to.port_id
        );
        return None;
    }

    let id = link_id(&from.node_id, &to.node_id, kind);
    if !chart.links.contains_key(&id) {
        info!("Adding {} link {}", kind.as_str(), id);
        chart.links.insert(
            id.clone(),
            ChartLink {
                id: id.clone(),
                from,
                to,
                kind,
                capacity_sats: None,
            },
        );
    }
    Some(id)
}

/// Removes a link if present, along with any selection or hover on it.
pub fn remove_link(chart: &mut Chart, link_id: &str) -> Option<ChartLink> {
    let link = chart.links.remove(link_id)?;
    info!("Removed link {}", link_id);
    clear_stale_refs(chart);
    Some(link)
}

/// Outcome of [`remove_node`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeRemoval {
    /// The node is gone from the network and chart together with these links.
    Removed { kind: NodeKind, links: Vec<String> },
    /// The node is a bitcoin backend of the listed lightning nodes and was
    /// left in place.
    InUseAsBackend { dependents: Vec<String> },
    /// Neither the network nor the chart had the node.
    NotFound,
}

/// Removes a node from both the network and its chart, every link touching it,
/// and any selection or hover on the node or those links.
///
/// A bitcoin node still backing lightning nodes is not removed.
pub fn remove_node(chart: &mut Chart, network: &mut Network, node_id: &str) -> NodeRemoval {
    let dependents: Vec<String> = network
        .dependents_of(node_id)
        .into_iter()
        .map(|ln| ln.name.clone())
        .collect();
    if network.bitcoin_node(node_id).is_some() && !dependents.is_empty() {
        warn!(
            "Network {}: {} still backs {}, not removing",
            network.id(),
            node_id,
            dependents.join(", ")
        );
        return NodeRemoval::InUseAsBackend { dependents };
    }

    let from_network = network.remove_node(node_id);
    let from_chart = chart.nodes.remove(node_id);
    let kind = match (from_network, &from_chart) {
        (Some(kind), _) => kind,
        (None, Some(node)) => node.kind(),
        (None, None) => return NodeRemoval::NotFound,
    };

    let links: Vec<String> = chart
        .links
        .values()
        .filter(|link| link.touches(node_id))
        .map(|link| link.id.clone())
        .collect();
    for id in &links {
        chart.links.remove(id);
    }
    clear_stale_refs(chart);

    info!(
        "Network {}: removed {} node {} and {} link(s)",
        network.id(),
        kind.as_str(),
        node_id,
        links.len()
    );
    NodeRemoval::Removed { kind, links }
}

/// Drops `selected`/`hovered` when they point at something no longer present.
fn clear_stale_refs(chart: &mut Chart) {
    if let Some(sel) = &chart.selected
        && !chart.resolves(sel)
    {
        chart.selected = None;
    }
    if let Some(hov) = &chart.hovered
        && !chart.resolves(hov)
    {
        chart.hovered = None;
    }
}

pub fn set_selected(chart: &mut Chart, selection: Option<Selection>) {
    chart.selected = selection;
}

pub fn set_hovered(chart: &mut Chart, hovered: Option<Selection>) {
    chart.hovered = hovered;
}

/// Selected chart node, if the selection is a node.
pub fn selected_node(chart: &Chart) -> Option<&ChartNode> {
    chart
        .selected
        .as_ref()
        .filter(|sel| sel.entity_type == EntityType::Node)
        .and_then(|sel| chart.nodes.get(&sel.entity_id))
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Changes the scale by `delta`, rounded to one decimal and kept within the
/// configured bounds. Returns the new scale.
pub fn zoom(chart: &mut Chart, delta: f64, bounds: &ZoomConfig) -> f64 {
    if !delta.is_finite() {
        return chart.scale;
    }
    // inverted bounds settle on max_scale
    chart.scale = round_tenth(chart.scale + delta)
        .max(bounds.min_scale)
        .min(bounds.max_scale);
    chart.scale
}

pub fn zoom_in(chart: &mut Chart, bounds: &ZoomConfig) -> f64 {
    zoom(chart, bounds.step, bounds)
}

pub fn zoom_out(chart: &mut Chart, bounds: &ZoomConfig) -> f64 {
    zoom(chart, -bounds.step, bounds)
}

pub fn reset_zoom(chart: &mut Chart) {
    chart.scale = 1.0;
}

/// The reset control is only enabled while the chart is zoomed.
pub fn can_reset_zoom(chart: &Chart) -> bool {
    (chart.scale - 1.0).abs() > f64::EPSILON
}

/// Moves a node to `position`. Returns false if the node does not exist.
pub fn move_node(chart: &mut Chart, node_id: &str, position: Position) -> bool {
    match chart.nodes.get_mut(node_id) {
        Some(node) => {
            node.position = position;
            true
        }
        None => false,
    }
}

pub fn pan(chart: &mut Chart, offset: Position) {
    chart.offset = offset;
}

/// Records the capacity of a confirmed channel on its link.
pub(crate) fn set_link_capacity(chart: &mut Chart, link_id: &str, capacity_sats: Option<u64>) {
    if let Some(link) = chart.links.get_mut(link_id) {
        link.capacity_sats = capacity_sats;
    }
}

/// A broken consistency rule between a network and its chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inconsistency {
    MissingBackend { node: String, backend: String },
    MissingBackendLink { node: String, link: String },
    ExtraBackendLink { node: String, link: String },
    DanglingLink { link: String, node: String },
    UnchartedNode { node: String },
    UnknownChartNode { node: String },
    StaleSelection(Selection),
    StaleHover(Selection),
}

/// Lists every broken rule. `pending` names links held by in-progress
/// workflows, which may temporarily add a second backend link.
pub fn audit(network: &Network, chart: &Chart, pending: &[&str]) -> Vec<Inconsistency> {
    let mut issues = Vec::new();

    for name in network.node_names() {
        if !chart.nodes.contains_key(&name) {
            issues.push(Inconsistency::UnchartedNode { node: name });
        }
    }
    for name in chart.nodes.keys() {
        if network.node(name).is_none() {
            issues.push(Inconsistency::UnknownChartNode { node: name.clone() });
        }
    }

    for ln in network.lightning() {
        if network.bitcoin_node(&ln.backend_name).is_none() {
            issues.push(Inconsistency::MissingBackend {
                node: ln.name.clone(),
                backend: ln.backend_name.clone(),
            });
        }
        let expected = backend_link_id(&ln.name, &ln.backend_name);
        let linked = chart.links.get(&expected).is_some_and(|link| {
            link.kind == LinkKind::Backend
                && link.from.node_id == ln.name
                && link.to.node_id == ln.backend_name
        });
        if !linked {
            issues.push(Inconsistency::MissingBackendLink {
                node: ln.name.clone(),
                link: expected.clone(),
            });
        }
        for link in chart.links.values() {
            if link.kind == LinkKind::Backend
                && link.from.node_id == ln.name
                && link.id != expected
                && !pending.contains(&link.id.as_str())
            {
                issues.push(Inconsistency::ExtraBackendLink {
                    node: ln.name.clone(),
                    link: link.id.clone(),
                });
            }
        }
    }

    for link in chart.links.values() {
        for end in [&link.from, &link.to] {
            if !chart.nodes.contains_key(&end.node_id) {
                issues.push(Inconsistency::DanglingLink {
                    link: link.id.clone(),
                    node: end.node_id.clone(),
                });
            }
        }
    }

    if let Some(sel) = &chart.selected
        && !chart.resolves(sel)
    {
        issues.push(Inconsistency::StaleSelection(sel.clone()));
    }
    if let Some(hov) = &chart.hovered
        && !chart.resolves(hov)
    {
        issues.push(Inconsistency::StaleHover(hov.clone()));
    }

    issues
}

//! Channel-graph queries over a chart.

use crate::chart::{Chart, LinkKind};
use crate::model::NodeKind;
use petgraph::algo::has_path_connecting;
use petgraph::graphmap::UnGraphMap;
use petgraph::visit::Bfs;
use std::collections::BTreeSet;

/// Lightning nodes of the chart joined by their channel links.
pub fn channel_graph(chart: &Chart) -> UnGraphMap<&str, u64> {
    let mut graph = UnGraphMap::new();
    for node in chart.nodes().values() {
        if node.kind() == NodeKind::Lightning {
            graph.add_node(node.id.as_str());
        }
    }
    for link in chart.links().values() {
        if link.kind == LinkKind::Channel {
            graph.add_edge(
                link.from.node_id.as_str(),
                link.to.node_id.as_str(),
                link.capacity_sats.unwrap_or_default(),
            );
        }
    }
    graph
}

/// Whether a payment from `from` could be routed to `to` over channels.
pub fn has_channel_route(chart: &Chart, from: &str, to: &str) -> bool {
    let graph = channel_graph(chart);
    if !graph.contains_node(from) || !graph.contains_node(to) {
        return false;
    }
    has_path_connecting(&graph, from, to, None)
}

/// Groups of lightning nodes reachable from each other, each sorted by name.
pub fn channel_components(chart: &Chart) -> Vec<Vec<String>> {
    let graph = channel_graph(chart);
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut components = Vec::new();

    let mut starts: Vec<&str> = graph.nodes().collect();
    starts.sort_unstable();
    for start in starts {
        if seen.contains(start) {
            continue;
        }
        let mut component = Vec::new();
        let mut bfs = Bfs::new(&graph, start);
        while let Some(node) = bfs.next(&graph) {
            seen.insert(node);
            component.push(node.to_string());
        }
        component.sort();
        components.push(component);
    }
    components
}

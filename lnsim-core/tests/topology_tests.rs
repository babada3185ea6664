// Tests for chart topology operations

use lnsim_core::chart::{Endpoint, EntityType, LinkKind, Position, Selection};
use lnsim_core::config::ZoomConfig;
use lnsim_core::model::{Network, NodeKind};
use lnsim_core::network::{NodeCounts, create_network};
use lnsim_core::topology::{
    self, NodeRemoval, PORT_BACKEND, PORT_LEFT, PORT_RIGHT, add_link, audit, can_reset_zoom,
    init_chart_from_network, remove_link, remove_node, reset_zoom, zoom, zoom_in, zoom_out,
};
use std::path::Path;

/// alice and bob (LND), both backed by backend1.
fn test_network() -> Network {
    let counts = NodeCounts {
        lnd: 2,
        c_lightning: 0,
        eclair: 0,
        bitcoind: 1,
    };
    create_network(1, "test network", counts, Path::new("/tmp/lnsim")).unwrap()
}

fn channel(chart: &mut lnsim_core::chart::Chart, from: &str, to: &str) -> String {
    add_link(
        chart,
        Endpoint::new(from, PORT_RIGHT),
        Endpoint::new(to, PORT_LEFT),
        LinkKind::Channel,
    )
    .unwrap()
}

// ============================================================================
// Chart Initialization Tests
// ============================================================================

#[test]
fn test_init_chart_nodes() {
    let network = test_network();
    let chart = init_chart_from_network(&network);

    let names: Vec<&str> = chart.nodes().keys().map(|k| k.as_str()).collect();
    assert_eq!(names, vec!["alice", "backend1", "bob"]);
    assert_eq!(chart.node("alice").unwrap().kind(), NodeKind::Lightning);
    assert_eq!(chart.node("backend1").unwrap().kind(), NodeKind::Bitcoin);
    assert_eq!(chart.scale(), 1.0);
    assert!(chart.selected().is_none());
}

#[test]
fn test_init_chart_one_backend_link_per_lightning_node() {
    let network = test_network();
    let chart = init_chart_from_network(&network);

    assert_eq!(chart.links().len(), network.lightning().len());
    for ln in network.lightning() {
        let id = format!("{}-{}", ln.name, ln.backend_name);
        let link = chart.link(&id).expect("backend link");
        assert_eq!(link.kind, LinkKind::Backend);
        assert_eq!(link.from, Endpoint::new(&ln.name, PORT_BACKEND));
        assert_eq!(link.to, Endpoint::new(&ln.backend_name, PORT_BACKEND));
    }
}

#[test]
fn test_init_chart_is_deterministic() {
    let network = test_network();
    assert_eq!(
        init_chart_from_network(&network),
        init_chart_from_network(&network)
    );
}

#[test]
fn test_init_chart_grid_positions() {
    let chart = init_chart_from_network(&test_network());

    assert_eq!(chart.node("alice").unwrap().position, Position::new(50.0, 50.0));
    assert_eq!(chart.node("bob").unwrap().position, Position::new(300.0, 50.0));
    assert_eq!(
        chart.node("backend1").unwrap().position,
        Position::new(50.0, 400.0)
    );
}

#[test]
fn test_init_chart_ports() {
    let chart = init_chart_from_network(&test_network());

    let alice = chart.node("alice").unwrap();
    assert!(alice.has_port(PORT_LEFT));
    assert!(alice.has_port(PORT_RIGHT));
    assert!(alice.has_port(PORT_BACKEND));

    let backend = chart.node("backend1").unwrap();
    assert!(backend.has_port(PORT_BACKEND));
    assert!(!backend.has_port(PORT_LEFT));
}

#[test]
fn test_init_chart_passes_audit() {
    let network = test_network();
    let chart = init_chart_from_network(&network);
    assert!(audit(&network, &chart, &[]).is_empty());
}

// ============================================================================
// Link Tests
// ============================================================================

#[test]
fn test_add_link_returns_derived_id() {
    let mut chart = init_chart_from_network(&test_network());
    let id = channel(&mut chart, "alice", "bob");

    assert_eq!(id, topology::link_id("alice", "bob", LinkKind::Channel));
    assert!(chart.has_link(&id));
}

#[test]
fn test_add_link_is_idempotent() {
    let mut chart = init_chart_from_network(&test_network());
    let first = channel(&mut chart, "alice", "bob");
    let second = channel(&mut chart, "alice", "bob");

    assert_eq!(first, second);
    assert_eq!(chart.links().len(), 3);
}

#[test]
fn test_add_link_rejects_missing_node() {
    let mut chart = init_chart_from_network(&test_network());
    let before = chart.clone();

    let id = add_link(
        &mut chart,
        Endpoint::new("alice", PORT_RIGHT),
        Endpoint::new("mallory", PORT_LEFT),
        LinkKind::Channel,
    );

    assert!(id.is_none());
    assert_eq!(chart, before);
}

#[test]
fn test_add_link_rejects_missing_port() {
    let mut chart = init_chart_from_network(&test_network());
    let id = add_link(
        &mut chart,
        Endpoint::new("alice", PORT_RIGHT),
        Endpoint::new("backend1", PORT_LEFT),
        LinkKind::Channel,
    );
    assert!(id.is_none());
}

#[test]
fn test_add_link_rejects_self_link() {
    let mut chart = init_chart_from_network(&test_network());
    let id = add_link(
        &mut chart,
        Endpoint::new("alice", PORT_RIGHT),
        Endpoint::new("alice", PORT_LEFT),
        LinkKind::Channel,
    );
    assert!(id.is_none());
}

#[test]
fn test_remove_link() {
    let mut chart = init_chart_from_network(&test_network());
    let id = channel(&mut chart, "alice", "bob");

    let removed = remove_link(&mut chart, &id);
    assert_eq!(removed.map(|l| l.id), Some(id.clone()));
    assert!(!chart.has_link(&id));
}

#[test]
fn test_remove_missing_link_is_noop() {
    let mut chart = init_chart_from_network(&test_network());
    let before = chart.clone();

    assert!(remove_link(&mut chart, "no-such-link").is_none());
    assert_eq!(chart, before);
}

#[test]
fn test_remove_link_clears_selection_and_hover() {
    let mut chart = init_chart_from_network(&test_network());
    let id = channel(&mut chart, "alice", "bob");
    topology::set_selected(&mut chart, Some(Selection::link(&id)));
    topology::set_hovered(&mut chart, Some(Selection::link(&id)));

    remove_link(&mut chart, &id);

    assert!(chart.selected().is_none());
    assert!(chart.hovered().is_none());
}

#[test]
fn test_remove_link_keeps_unrelated_selection() {
    let mut chart = init_chart_from_network(&test_network());
    let id = channel(&mut chart, "alice", "bob");
    topology::set_selected(&mut chart, Some(Selection::node("bob")));

    remove_link(&mut chart, &id);

    assert_eq!(chart.selected(), Some(&Selection::node("bob")));
}

// ============================================================================
// Node Removal Tests
// ============================================================================

#[test]
fn test_remove_node_keeps_other_backend_links() {
    let mut network = test_network();
    let mut chart = init_chart_from_network(&network);

    let outcome = remove_node(&mut chart, &mut network, "alice");

    assert_eq!(
        outcome,
        NodeRemoval::Removed {
            kind: NodeKind::Lightning,
            links: vec!["alice-backend1".to_string()],
        }
    );
    assert!(chart.node("alice").is_none());
    assert!(chart.node("bob").is_some());
    assert!(chart.node("backend1").is_some());
    let links: Vec<&str> = chart.links().keys().map(|k| k.as_str()).collect();
    assert_eq!(links, vec!["bob-backend1"]);
    assert!(network.node("alice").is_none());
    assert!(network.node("backend1").is_some());
}

#[test]
fn test_remove_node_cascades_channel_links() {
    let mut network = test_network();
    let mut chart = init_chart_from_network(&network);
    channel(&mut chart, "alice", "bob");
    channel(&mut chart, "bob", "alice");

    remove_node(&mut chart, &mut network, "bob");

    assert!(chart.links().values().all(|link| !link.touches("bob")));
    assert!(audit(&network, &chart, &[]).is_empty());
}

#[test]
fn test_remove_node_clears_selection_and_hover() {
    let mut network = test_network();
    let mut chart = init_chart_from_network(&network);
    topology::set_selected(&mut chart, Some(Selection::node("alice")));
    topology::set_hovered(&mut chart, Some(Selection::link("alice-backend1")));

    remove_node(&mut chart, &mut network, "alice");

    assert!(chart.selected().is_none());
    assert!(chart.hovered().is_none());
}

#[test]
fn test_remove_unknown_node_is_noop() {
    let mut network = test_network();
    let mut chart = init_chart_from_network(&network);
    let (net_before, chart_before) = (network.clone(), chart.clone());

    assert_eq!(
        remove_node(&mut chart, &mut network, "mallory"),
        NodeRemoval::NotFound
    );
    assert_eq!(network, net_before);
    assert_eq!(chart, chart_before);
}

#[test]
fn test_remove_node_twice() {
    let mut network = test_network();
    let mut chart = init_chart_from_network(&network);

    remove_node(&mut chart, &mut network, "alice");
    assert_eq!(
        remove_node(&mut chart, &mut network, "alice"),
        NodeRemoval::NotFound
    );
}

#[test]
fn test_remove_backend_in_use_is_refused() {
    let mut network = test_network();
    let mut chart = init_chart_from_network(&network);
    let chart_before = chart.clone();

    let outcome = remove_node(&mut chart, &mut network, "backend1");

    assert_eq!(
        outcome,
        NodeRemoval::InUseAsBackend {
            dependents: vec!["alice".to_string(), "bob".to_string()],
        }
    );
    assert_eq!(chart, chart_before);
    assert!(network.bitcoin_node("backend1").is_some());
}

#[test]
fn test_remove_unused_backend() {
    let mut network = test_network();
    let mut chart = init_chart_from_network(&network);
    remove_node(&mut chart, &mut network, "alice");
    remove_node(&mut chart, &mut network, "bob");

    let outcome = remove_node(&mut chart, &mut network, "backend1");

    assert!(matches!(
        outcome,
        NodeRemoval::Removed {
            kind: NodeKind::Bitcoin,
            ..
        }
    ));
    assert!(chart.nodes().is_empty());
    assert!(chart.links().is_empty());
}

// ============================================================================
// Selection Tests
// ============================================================================

#[test]
fn test_set_selected_and_hovered() {
    let mut chart = init_chart_from_network(&test_network());

    topology::set_selected(&mut chart, Some(Selection::node("alice")));
    topology::set_hovered(&mut chart, Some(Selection::link("bob-backend1")));

    assert_eq!(
        topology::selected_node(&chart).map(|n| n.id.as_str()),
        Some("alice")
    );
    assert_eq!(
        chart.hovered().map(|h| h.entity_type),
        Some(EntityType::Link)
    );

    topology::set_selected(&mut chart, None);
    assert!(chart.selected().is_none());
}

#[test]
fn test_selected_node_ignores_links() {
    let mut chart = init_chart_from_network(&test_network());
    topology::set_selected(&mut chart, Some(Selection::link("alice-backend1")));
    assert!(topology::selected_node(&chart).is_none());
}

// ============================================================================
// Zoom and Viewport Tests
// ============================================================================

#[test]
fn test_zoom_sequence() {
    let bounds = ZoomConfig::default();
    let mut chart = init_chart_from_network(&test_network());
    assert_eq!(chart.scale(), 1.0);
    assert!(!can_reset_zoom(&chart));

    assert_eq!(zoom_in(&mut chart, &bounds), 1.1);
    assert!(can_reset_zoom(&chart));

    reset_zoom(&mut chart);
    assert_eq!(chart.scale(), 1.0);
    assert!(!can_reset_zoom(&chart));

    assert_eq!(zoom_out(&mut chart, &bounds), 0.9);
    assert!(can_reset_zoom(&chart));
}

#[test]
fn test_zoom_steps_accumulate_linearly() {
    let bounds = ZoomConfig::default();
    let mut chart = init_chart_from_network(&test_network());

    for _ in 0..3 {
        zoom(&mut chart, 0.1, &bounds);
    }
    assert_eq!(chart.scale(), 1.3);

    for _ in 0..5 {
        zoom(&mut chart, -0.1, &bounds);
    }
    assert_eq!(chart.scale(), 0.8);
}

#[test]
fn test_zoom_is_clamped() {
    let bounds = ZoomConfig {
        min_scale: 0.5,
        max_scale: 2.0,
        step: 0.1,
    };
    let mut chart = init_chart_from_network(&test_network());

    assert_eq!(zoom(&mut chart, -5.0, &bounds), 0.5);
    assert_eq!(zoom(&mut chart, 5.0, &bounds), 2.0);
}

#[test]
fn test_zoom_with_inverted_bounds() {
    let bounds = ZoomConfig {
        min_scale: 2.0,
        max_scale: 0.5,
        step: 0.1,
    };
    let mut chart = init_chart_from_network(&test_network());

    assert_eq!(zoom(&mut chart, 0.1, &bounds), 0.5);
    assert_eq!(zoom(&mut chart, -0.1, &bounds), 0.5);
}

#[test]
fn test_zoom_ignores_non_finite_delta() {
    let bounds = ZoomConfig::default();
    let mut chart = init_chart_from_network(&test_network());

    assert_eq!(zoom(&mut chart, f64::NAN, &bounds), 1.0);
    assert_eq!(zoom(&mut chart, f64::INFINITY, &bounds), 1.0);
}

#[test]
fn test_move_node_and_pan() {
    let mut chart = init_chart_from_network(&test_network());

    assert!(topology::move_node(&mut chart, "alice", Position::new(10.0, 20.0)));
    assert!(!topology::move_node(&mut chart, "mallory", Position::new(1.0, 1.0)));
    assert_eq!(chart.node("alice").unwrap().position, Position::new(10.0, 20.0));

    topology::pan(&mut chart, Position::new(-40.0, 15.5));
    assert_eq!(chart.offset(), Position::new(-40.0, 15.5));
}

// ============================================================================
// Audit Tests
// ============================================================================

#[test]
fn test_audit_reports_missing_backend_link() {
    let network = test_network();
    let mut chart = init_chart_from_network(&network);
    remove_link(&mut chart, "alice-backend1");

    let issues = audit(&network, &chart, &[]);
    assert_eq!(
        issues,
        vec![topology::Inconsistency::MissingBackendLink {
            node: "alice".to_string(),
            link: "alice-backend1".to_string(),
        }]
    );
}

#[test]
fn test_audit_allows_pending_backend_link() {
    let counts = NodeCounts {
        lnd: 1,
        c_lightning: 0,
        eclair: 0,
        bitcoind: 2,
    };
    let network = create_network(1, "two backends", counts, Path::new("/tmp")).unwrap();
    let mut chart = init_chart_from_network(&network);
    let pending = add_link(
        &mut chart,
        Endpoint::new("alice", PORT_BACKEND),
        Endpoint::new("backend2", PORT_BACKEND),
        LinkKind::Backend,
    )
    .unwrap();

    assert_eq!(audit(&network, &chart, &[]).len(), 1);
    assert!(audit(&network, &chart, &[pending.as_str()]).is_empty());
}

// Tests for modal workflows and their pending chart links

use lnsim_core::Store;
use lnsim_core::chart::{Endpoint, LinkKind};
use lnsim_core::config::ZoomConfig;
use lnsim_core::model::NetworkId;
use lnsim_core::network::NodeCounts;
use lnsim_core::store::LinkRouting;
use lnsim_core::topology::{PORT_BACKEND, PORT_LEFT, PORT_RIGHT, NodeRemoval};
use lnsim_core::workflow::{
    AdvancedOptions, ChangeBackend, Confirmation, CreateInvoice, Discard, OpenChannel, PayInvoice,
    SendOnChain, Ticket,
};
use std::path::Path;

/// alice and bob (LND). With one backend both use backend1, with two bob
/// moves to backend2.
fn create_test_store(backends: usize) -> (Store, NetworkId) {
    let mut store = Store::new(ZoomConfig::default());
    let counts = NodeCounts {
        lnd: 2,
        c_lightning: 0,
        eclair: 0,
        bitcoind: backends,
    };
    let id = store
        .create_network("test network", counts, Path::new("/tmp/lnsim"))
        .unwrap();
    (store, id)
}

/// Drags a channel from alice to bob.
fn drag_channel(store: &mut Store, id: NetworkId) -> (String, Ticket) {
    match store.link_completed(
        id,
        Endpoint::new("alice", PORT_RIGHT),
        Endpoint::new("bob", PORT_LEFT),
    ) {
        LinkRouting::OpenChannel { link_id, ticket } => (link_id, ticket),
        other => panic!("expected open channel, got {:?}", other),
    }
}

fn has_link(store: &Store, id: NetworkId, link_id: &str) -> bool {
    store.chart(id).unwrap().has_link(link_id)
}

// ============================================================================
// Open Channel Tests
// ============================================================================

#[test]
fn test_show_open_channel_with_partial_fields() {
    let (mut store, id) = create_test_store(1);
    let mut fields = OpenChannel::new(id);
    fields.to = Some("bob".to_string());

    store.show_open_channel(fields);

    let modal = store.modals().open_channel();
    assert!(modal.is_visible());
    let payload = modal.payload().unwrap();
    assert_eq!(payload.to.as_deref(), Some("bob"));
    assert!(payload.from.is_none());
    assert!(payload.link_id.is_none());
}

#[test]
fn test_show_open_channel_merges_into_visible_workflow() {
    let (mut store, id) = create_test_store(1);
    let mut first = OpenChannel::new(id);
    first.to = Some("bob".to_string());
    let ticket = store.show_open_channel(first);

    let mut second = OpenChannel::new(id);
    second.from = Some("alice".to_string());
    let again = store.show_open_channel(second);

    assert_eq!(ticket, again);
    let payload = store.modals().open_channel().payload().unwrap();
    assert_eq!(payload.from.as_deref(), Some("alice"));
    assert_eq!(payload.to.as_deref(), Some("bob"));
}

#[test]
fn test_drag_between_lightning_nodes_opens_channel_workflow() {
    let (mut store, id) = create_test_store(1);

    let (link_id, ticket) = drag_channel(&mut store, id);

    assert!(has_link(&store, id, &link_id));
    let modal = store.modals().open_channel();
    assert_eq!(modal.ticket(), Some(ticket));
    let payload = modal.payload().unwrap();
    assert_eq!(payload.from.as_deref(), Some("alice"));
    assert_eq!(payload.to.as_deref(), Some("bob"));
    assert_eq!(payload.link_id.as_deref(), Some(link_id.as_str()));
}

#[test]
fn test_hide_open_channel_removes_pending_link() {
    let (mut store, id) = create_test_store(1);
    let (link_id, _) = drag_channel(&mut store, id);

    store.hide_open_channel();

    assert!(!has_link(&store, id, &link_id));
    assert!(!store.modals().open_channel().is_visible());
    assert!(store.audit(id).is_empty());
}

#[test]
fn test_hide_open_channel_without_link_leaves_chart() {
    let (mut store, id) = create_test_store(1);
    let before = store.chart(id).unwrap().clone();
    let mut fields = OpenChannel::new(id);
    fields.to = Some("bob".to_string());
    store.show_open_channel(fields);

    store.hide_open_channel();

    assert_eq!(store.chart(id).unwrap(), &before);
    assert!(!store.modals().open_channel().is_visible());
}

#[test]
fn test_complete_open_channel_finalizes_link() {
    let (mut store, id) = create_test_store(1);
    let (link_id, ticket) = drag_channel(&mut store, id);
    let mut capacity = OpenChannel::new(id);
    capacity.capacity_sats = Some(250_000);
    store.show_open_channel(capacity);

    let outcome = store.complete_open_channel(ticket, Ok(()));

    assert_eq!(outcome, Confirmation::Finalized);
    assert!(!store.modals().open_channel().is_visible());
    let link = store.chart(id).unwrap().link(&link_id).unwrap();
    assert_eq!(link.kind, LinkKind::Channel);
    assert_eq!(link.capacity_sats, Some(250_000));
    assert!(store.audit(id).is_empty());
}

#[test]
fn test_complete_open_channel_without_pending_link_adds_channel() {
    let (mut store, id) = create_test_store(1);
    let mut fields = OpenChannel::new(id);
    fields.from = Some("bob".to_string());
    fields.to = Some("alice".to_string());
    let ticket = store.show_open_channel(fields);

    assert_eq!(store.complete_open_channel(ticket, Ok(())), Confirmation::Finalized);
    assert!(has_link(&store, id, "bob-alice-channel"));
}

#[test]
fn test_complete_open_channel_failure_keeps_link() {
    let (mut store, id) = create_test_store(1);
    let (link_id, ticket) = drag_channel(&mut store, id);

    let outcome = store.complete_open_channel(ticket, Err("insufficient funds".to_string()));

    assert_eq!(outcome, Confirmation::Failed("insufficient funds".to_string()));
    let modal = store.modals().open_channel();
    assert!(modal.is_visible());
    assert_eq!(modal.payload().unwrap().error.as_deref(), Some("insufficient funds"));
    assert!(has_link(&store, id, &link_id));

    assert_eq!(store.complete_open_channel(ticket, Ok(())), Confirmation::Finalized);
    assert!(has_link(&store, id, &link_id));
}

#[test]
fn test_completion_after_cancel_is_discarded() {
    let (mut store, id) = create_test_store(1);
    let (link_id, ticket) = drag_channel(&mut store, id);
    store.hide_open_channel();

    let outcome = store.complete_open_channel(ticket, Ok(()));

    assert_eq!(outcome, Confirmation::Discarded(Discard::NotVisible));
    assert!(!has_link(&store, id, &link_id));
}

#[test]
fn test_completion_with_stale_ticket_is_discarded() {
    let (mut store, id) = create_test_store(1);
    let (_, old_ticket) = drag_channel(&mut store, id);
    store.hide_open_channel();
    let (link_id, new_ticket) = drag_channel(&mut store, id);
    assert_ne!(old_ticket, new_ticket);

    let outcome = store.complete_open_channel(old_ticket, Ok(()));

    assert_eq!(outcome, Confirmation::Discarded(Discard::StaleTicket));
    assert!(store.modals().open_channel().is_visible());
    assert!(has_link(&store, id, &link_id));
}

#[test]
fn test_completion_after_link_removed_is_discarded() {
    let (mut store, id) = create_test_store(1);
    let (link_id, ticket) = drag_channel(&mut store, id);
    assert!(matches!(
        store.remove_node(id, "bob"),
        NodeRemoval::Removed { .. }
    ));

    let outcome = store.complete_open_channel(ticket, Ok(()));

    assert_eq!(outcome, Confirmation::Discarded(Discard::LinkRemoved(link_id)));
    assert!(!store.modals().open_channel().is_visible());
    assert!(store.audit(id).is_empty());
}

#[test]
fn test_new_pending_link_replaces_old_one() {
    let (mut store, id) = create_test_store(1);
    let (first, _) = drag_channel(&mut store, id);

    let second = match store.link_completed(
        id,
        Endpoint::new("bob", PORT_RIGHT),
        Endpoint::new("alice", PORT_LEFT),
    ) {
        LinkRouting::OpenChannel { link_id, .. } => link_id,
        other => panic!("expected open channel, got {:?}", other),
    };

    assert!(!has_link(&store, id, &first));
    assert!(has_link(&store, id, &second));
}

#[test]
fn test_drag_onto_confirmed_channel_is_ignored() {
    let (mut store, id) = create_test_store(1);
    let (link_id, ticket) = drag_channel(&mut store, id);
    assert_eq!(store.complete_open_channel(ticket, Ok(())), Confirmation::Finalized);

    let routing = store.link_completed(
        id,
        Endpoint::new("alice", PORT_RIGHT),
        Endpoint::new("bob", PORT_LEFT),
    );
    store.hide_open_channel();

    assert_eq!(routing, LinkRouting::Ignored);
    assert!(!store.modals().open_channel().is_visible());
    assert!(has_link(&store, id, &link_id));
    assert!(store.audit(id).is_empty());
}

#[test]
fn test_remove_network_closes_its_workflows() {
    let (mut store, id) = create_test_store(1);
    drag_channel(&mut store, id);
    assert!(store.set_active(id));

    assert!(store.remove_network(id).is_some());

    assert!(!store.modals().open_channel().is_visible());
    assert!(store.chart(id).is_none());
    assert!(store.active_id().is_none());
}

// ============================================================================
// Link Routing Tests
// ============================================================================

#[test]
fn test_drag_to_current_backend_is_ignored() {
    let (mut store, id) = create_test_store(1);
    let before = store.chart(id).unwrap().clone();

    let routing = store.link_completed(
        id,
        Endpoint::new("alice", PORT_BACKEND),
        Endpoint::new("backend1", PORT_BACKEND),
    );

    assert_eq!(routing, LinkRouting::Ignored);
    assert_eq!(store.chart(id).unwrap(), &before);
}

#[test]
fn test_drag_between_bitcoin_nodes_is_ignored() {
    let (mut store, id) = create_test_store(2);

    let routing = store.link_completed(
        id,
        Endpoint::new("backend1", PORT_BACKEND),
        Endpoint::new("backend2", PORT_BACKEND),
    );

    assert_eq!(routing, LinkRouting::Ignored);
    assert!(!store.modals().change_backend().is_visible());
}

#[test]
fn test_drag_from_unknown_network_is_ignored() {
    let (mut store, _) = create_test_store(1);
    let routing = store.link_completed(
        42,
        Endpoint::new("alice", PORT_RIGHT),
        Endpoint::new("bob", PORT_LEFT),
    );
    assert_eq!(routing, LinkRouting::Ignored);
}

// ============================================================================
// Change Backend Tests
// ============================================================================

fn drag_backend(store: &mut Store, id: NetworkId) -> (String, Ticket) {
    // backend2 dragged onto alice, reversed endpoint order on purpose
    match store.link_completed(
        id,
        Endpoint::new("backend2", PORT_BACKEND),
        Endpoint::new("alice", PORT_BACKEND),
    ) {
        LinkRouting::ChangeBackend { link_id, ticket } => (link_id, ticket),
        other => panic!("expected change backend, got {:?}", other),
    }
}

#[test]
fn test_drag_to_other_backend_starts_change_backend() {
    let (mut store, id) = create_test_store(2);

    let (link_id, _) = drag_backend(&mut store, id);

    assert_eq!(link_id, "alice-backend2");
    let payload = store.modals().change_backend().payload().unwrap();
    assert_eq!(payload.ln_name.as_deref(), Some("alice"));
    assert_eq!(payload.backend_name.as_deref(), Some("backend2"));
    assert!(store.audit(id).is_empty());
}

#[test]
fn test_complete_change_backend_rebinds_node() {
    let (mut store, id) = create_test_store(2);
    let (link_id, ticket) = drag_backend(&mut store, id);

    assert_eq!(store.complete_change_backend(ticket, Ok(())), Confirmation::Finalized);

    let network = store.network(id).unwrap();
    assert_eq!(network.lightning_node("alice").unwrap().backend_name, "backend2");
    assert!(has_link(&store, id, &link_id));
    assert!(!has_link(&store, id, "alice-backend1"));
    assert!(!store.modals().change_backend().is_visible());
    assert!(store.audit(id).is_empty());
}

#[test]
fn test_drag_onto_pending_backend_link_is_ignored() {
    let (mut store, id) = create_test_store(2);
    let (link_id, ticket) = drag_backend(&mut store, id);

    let routing = store.link_completed(
        id,
        Endpoint::new("alice", PORT_BACKEND),
        Endpoint::new("backend2", PORT_BACKEND),
    );

    assert_eq!(routing, LinkRouting::Ignored);
    assert!(has_link(&store, id, &link_id));
    assert_eq!(store.complete_change_backend(ticket, Ok(())), Confirmation::Finalized);
}

#[test]
fn test_hide_change_backend_restores_chart() {
    let (mut store, id) = create_test_store(2);
    let before = store.chart(id).unwrap().clone();
    drag_backend(&mut store, id);

    store.hide_change_backend();

    assert_eq!(store.chart(id).unwrap(), &before);
    assert_eq!(
        store.network(id).unwrap().lightning_node("alice").unwrap().backend_name,
        "backend1"
    );
}

#[test]
fn test_change_backend_failure_keeps_binding() {
    let (mut store, id) = create_test_store(2);
    let (link_id, ticket) = drag_backend(&mut store, id);

    let outcome = store.complete_change_backend(ticket, Err("node is running".to_string()));

    assert!(matches!(outcome, Confirmation::Failed(_)));
    assert!(has_link(&store, id, &link_id));
    assert!(has_link(&store, id, "alice-backend1"));
    assert_eq!(
        store.network(id).unwrap().lightning_node("alice").unwrap().backend_name,
        "backend1"
    );
}

#[test]
fn test_change_backend_to_non_bitcoin_node_fails() {
    let (mut store, id) = create_test_store(1);
    let mut fields = ChangeBackend::new(id);
    fields.ln_name = Some("alice".to_string());
    fields.backend_name = Some("bob".to_string());
    let ticket = store.show_change_backend(fields);

    let outcome = store.complete_change_backend(ticket, Ok(()));

    assert!(matches!(outcome, Confirmation::Failed(_)));
    assert_eq!(
        store.network(id).unwrap().lightning_node("alice").unwrap().backend_name,
        "backend1"
    );
}

// ============================================================================
// Simple Workflow Tests
// ============================================================================

#[test]
fn test_create_invoice_stays_visible_with_invoice() {
    let (mut store, _) = create_test_store(1);
    let ticket = store.show_create_invoice(CreateInvoice {
        node_name: Some("alice".to_string()),
        amount_sats: Some(1_000),
        ..Default::default()
    });

    let outcome = store.complete_create_invoice(ticket, Ok("lnbcrt10u1p".to_string()));

    assert_eq!(outcome, Confirmation::Finalized);
    let modal = store.modals().create_invoice();
    assert!(modal.is_visible());
    assert_eq!(modal.payload().unwrap().invoice.as_deref(), Some("lnbcrt10u1p"));

    store.hide_create_invoice();
    assert!(!store.modals().create_invoice().is_visible());
}

#[test]
fn test_pay_invoice_hides_on_success() {
    let (mut store, _) = create_test_store(1);
    let ticket = store.show_pay_invoice(PayInvoice {
        node_name: Some("bob".to_string()),
        invoice: Some("lnbcrt10u1p".to_string()),
        ..Default::default()
    });

    assert_eq!(store.complete_pay_invoice(ticket, Ok(())), Confirmation::Finalized);
    assert!(!store.modals().pay_invoice().is_visible());
}

#[test]
fn test_send_on_chain_failure_records_error() {
    let (mut store, _) = create_test_store(1);
    let ticket = store.show_send_on_chain(SendOnChain {
        backend_name: Some("backend1".to_string()),
        to_address: Some("bcrt1qxyz".to_string()),
        amount_sats: Some(50_000),
        ..Default::default()
    });

    let outcome = store.complete_send_on_chain(ticket, Err("no funds".to_string()));

    assert_eq!(outcome, Confirmation::Failed("no funds".to_string()));
    let payload = store.modals().send_on_chain().payload().unwrap();
    assert_eq!(payload.error.as_deref(), Some("no funds"));
}

#[test]
fn test_advanced_options_merge() {
    let (mut store, _) = create_test_store(1);
    store.show_advanced_options(AdvancedOptions {
        node_name: Some("alice".to_string()),
        default_command: Some("lnd --noseedbackup".to_string()),
        ..Default::default()
    });
    store.show_advanced_options(AdvancedOptions {
        command: Some("lnd --noseedbackup --debuglevel=debug".to_string()),
        ..Default::default()
    });

    let payload = store.modals().advanced_options().payload().unwrap();
    assert_eq!(payload.node_name.as_deref(), Some("alice"));
    assert_eq!(payload.default_command.as_deref(), Some("lnd --noseedbackup"));
    assert_eq!(
        payload.command.as_deref(),
        Some("lnd --noseedbackup --debuglevel=debug")
    );
}

#[test]
fn test_image_updates_show_hide() {
    let (mut store, _) = create_test_store(1);
    let ticket = store.show_image_updates();
    assert!(store.modals().image_updates().is_visible());

    store.hide_image_updates();
    assert_eq!(
        store.complete_image_updates(ticket, Ok(())),
        Confirmation::Discarded(Discard::NotVisible)
    );
}

//! The process-wide state container.
//!
//! `Store` owns every network, its chart and the workflow modals. It is the
//! only mutation surface: each method is one complete operation, so callers
//! that share a store behind a lock never observe a half-applied change.

use crate::chart::{Chart, Charts, Endpoint, LinkKind, Position, Selection};
use crate::config::ZoomConfig;
use crate::data::NetworksFile;
use crate::error::{CoreError, Result};
use crate::lifecycle::{self, Transition};
use crate::model::{Network, NetworkId, NodeKind, Status};
use crate::network::{NodeCounts, create_network};
use crate::registry::NetworkRegistry;
use crate::topology::{self, Inconsistency, NodeRemoval, PORT_BACKEND};
use crate::workflow::{
    AdvancedOptions, ChangeBackend, Confirmation, CreateInvoice, Modals, OpenChannel, Outcome,
    PayInvoice, SendOnChain, Ticket,
};
use std::path::Path;
use tracing::{debug, info};

/// What a completed drag between two chart nodes turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkRouting {
    OpenChannel { link_id: String, ticket: Ticket },
    ChangeBackend { link_id: String, ticket: Ticket },
    Ignored,
}

#[derive(Debug, Clone, Default)]
pub struct Store {
    registry: NetworkRegistry,
    charts: Charts,
    active_id: Option<NetworkId>,
    modals: Modals,
    zoom: ZoomConfig,
}

impl Store {
    pub fn new(zoom: ZoomConfig) -> Self {
        Self {
            zoom,
            ..Self::default()
        }
    }

    /// Rebuilds the store from persisted state. Networks without a saved
    /// chart get a fresh one.
    pub fn from_file(file: NetworksFile, zoom: ZoomConfig) -> Self {
        let NetworksFile {
            networks,
            mut charts,
        } = file;
        for network in &networks {
            charts
                .entry(network.id())
                .or_insert_with(|| topology::init_chart_from_network(network));
        }
        charts.retain(|id, _| networks.iter().any(|n| n.id() == *id));
        Self {
            registry: NetworkRegistry::from_networks(networks),
            charts,
            active_id: None,
            modals: Modals::default(),
            zoom,
        }
    }

    /// The persistable snapshot of every network and chart.
    pub fn to_file(&self) -> NetworksFile {
        NetworksFile {
            networks: self.registry.networks().to_vec(),
            charts: self.charts.clone(),
        }
    }

    // Read access

    pub fn networks(&self) -> &[Network] {
        self.registry.networks()
    }

    pub fn network(&self, id: NetworkId) -> Option<&Network> {
        self.registry.get(id)
    }

    pub fn chart(&self, id: NetworkId) -> Option<&Chart> {
        self.charts.get(&id)
    }

    pub fn modals(&self) -> &Modals {
        &self.modals
    }

    pub fn zoom_config(&self) -> &ZoomConfig {
        &self.zoom
    }

    pub fn active_id(&self) -> Option<NetworkId> {
        self.active_id
    }

    pub fn active_chart(&self) -> Option<&Chart> {
        self.active_id.and_then(|id| self.charts.get(&id))
    }

    /// Makes `id` the active network. Refused when it has no chart.
    pub fn set_active(&mut self, id: NetworkId) -> bool {
        if !self.charts.contains_key(&id) {
            return false;
        }
        self.active_id = Some(id);
        true
    }

    // Networks

    /// Registers a network and derives its chart.
    pub fn add_network(&mut self, network: Network) -> Result<NetworkId> {
        let id = network.id();
        let chart = topology::init_chart_from_network(&network);
        self.registry.insert(network)?;
        self.charts.insert(id, chart);
        Ok(id)
    }

    /// Builds a new network under `base_dir` with the next free id.
    pub fn create_network(
        &mut self,
        name: &str,
        counts: NodeCounts,
        base_dir: &Path,
    ) -> Result<NetworkId> {
        let id = self.registry.next_id()?;
        let network = create_network(id, name, counts, base_dir)?;
        self.add_network(network)
    }

    /// Removes a network together with its chart and any workflow bound to it.
    pub fn remove_network(&mut self, id: NetworkId) -> Option<Network> {
        let network = self.registry.remove(id)?;
        self.charts.remove(&id);
        self.modals.forget_network(id);
        if self.active_id == Some(id) {
            self.active_id = None;
        }
        Some(network)
    }

    // Lifecycle

    pub fn set_node_status(
        &mut self,
        network_id: NetworkId,
        node_name: &str,
        target: Status,
        message: Option<String>,
    ) -> Transition {
        match self.registry.get_mut(network_id) {
            Some(network) => lifecycle::transition(network, node_name, target, message),
            None => Transition::UnknownNode,
        }
    }

    pub fn request_start(&mut self, network_id: NetworkId) -> Result<Vec<String>> {
        let network = self.network_mut(network_id)?;
        Ok(lifecycle::request_start(network))
    }

    pub fn request_stop(&mut self, network_id: NetworkId) -> Result<Vec<String>> {
        let network = self.network_mut(network_id)?;
        Ok(lifecycle::request_stop(network))
    }

    pub fn mark_stopped(&mut self, network_id: NetworkId) -> Result<Vec<String>> {
        let network = self.network_mut(network_id)?;
        Ok(lifecycle::mark_stopped(network))
    }

    fn network_mut(&mut self, id: NetworkId) -> Result<&mut Network> {
        self.registry
            .get_mut(id)
            .ok_or(CoreError::NetworkNotFound(id))
    }

    // Topology

    pub fn add_link(
        &mut self,
        network_id: NetworkId,
        from: Endpoint,
        to: Endpoint,
        kind: LinkKind,
    ) -> Option<String> {
        let chart = self.charts.get_mut(&network_id)?;
        topology::add_link(chart, from, to, kind)
    }

    pub fn remove_link(&mut self, network_id: NetworkId, link_id: &str) {
        if let Some(chart) = self.charts.get_mut(&network_id) {
            topology::remove_link(chart, link_id);
        }
    }

    pub fn remove_node(&mut self, network_id: NetworkId, node_name: &str) -> NodeRemoval {
        match (
            self.charts.get_mut(&network_id),
            self.registry.get_mut(network_id),
        ) {
            (Some(chart), Some(network)) => topology::remove_node(chart, network, node_name),
            _ => NodeRemoval::NotFound,
        }
    }

    pub fn set_selected(&mut self, network_id: NetworkId, selection: Option<Selection>) {
        if let Some(chart) = self.charts.get_mut(&network_id) {
            topology::set_selected(chart, selection);
        }
    }

    pub fn set_hovered(&mut self, network_id: NetworkId, hovered: Option<Selection>) {
        if let Some(chart) = self.charts.get_mut(&network_id) {
            topology::set_hovered(chart, hovered);
        }
    }

    pub fn zoom(&mut self, network_id: NetworkId, delta: f64) -> Option<f64> {
        let chart = self.charts.get_mut(&network_id)?;
        Some(topology::zoom(chart, delta, &self.zoom))
    }

    pub fn zoom_in(&mut self, network_id: NetworkId) -> Option<f64> {
        let step = self.zoom.step;
        self.zoom(network_id, step)
    }

    pub fn zoom_out(&mut self, network_id: NetworkId) -> Option<f64> {
        let step = self.zoom.step;
        self.zoom(network_id, -step)
    }

    pub fn reset_zoom(&mut self, network_id: NetworkId) {
        if let Some(chart) = self.charts.get_mut(&network_id) {
            topology::reset_zoom(chart);
        }
    }

    pub fn move_node(&mut self, network_id: NetworkId, node_name: &str, position: Position) -> bool {
        self.charts
            .get_mut(&network_id)
            .is_some_and(|chart| topology::move_node(chart, node_name, position))
    }

    pub fn pan(&mut self, network_id: NetworkId, offset: Position) {
        if let Some(chart) = self.charts.get_mut(&network_id) {
            topology::pan(chart, offset);
        }
    }

    /// Handles a link the user finished dragging between two nodes. Two
    /// lightning nodes start the open-channel workflow; a lightning node and a
    /// bitcoin node other than its backend start the change-backend workflow.
    /// Either way the new link is pending until the workflow completes.
    /// Anything else leaves the chart untouched.
    pub fn link_completed(
        &mut self,
        network_id: NetworkId,
        from: Endpoint,
        to: Endpoint,
    ) -> LinkRouting {
        let Some(network) = self.registry.get(network_id) else {
            return LinkRouting::Ignored;
        };
        let kinds = (
            network.node(&from.node_id).map(|n| n.kind()),
            network.node(&to.node_id).map(|n| n.kind()),
        );

        match kinds {
            (Some(NodeKind::Lightning), Some(NodeKind::Lightning)) => {
                if self.link_exists(network_id, &from.node_id, &to.node_id, LinkKind::Channel) {
                    return LinkRouting::Ignored;
                }
                let Some(link_id) = self.add_link(network_id, from.clone(), to.clone(), LinkKind::Channel)
                else {
                    return LinkRouting::Ignored;
                };
                let mut fields = OpenChannel::new(network_id);
                fields.from = Some(from.node_id);
                fields.to = Some(to.node_id);
                fields.link_id = Some(link_id.clone());
                let ticket = self.modals.show_open_channel(&mut self.charts, fields);
                LinkRouting::OpenChannel { link_id, ticket }
            }
            (Some(NodeKind::Lightning), Some(NodeKind::Bitcoin))
            | (Some(NodeKind::Bitcoin), Some(NodeKind::Lightning)) => {
                let (ln_name, backend_name) = if kinds.0 == Some(NodeKind::Lightning) {
                    (from.node_id, to.node_id)
                } else {
                    (to.node_id, from.node_id)
                };
                let current = network
                    .lightning_node(&ln_name)
                    .map(|ln| ln.backend_name.as_str());
                if current == Some(backend_name.as_str()) {
                    debug!("{} already uses {}", ln_name, backend_name);
                    return LinkRouting::Ignored;
                }
                if self.link_exists(network_id, &ln_name, &backend_name, LinkKind::Backend) {
                    return LinkRouting::Ignored;
                }
                let Some(link_id) = self.add_link(
                    network_id,
                    Endpoint::new(&ln_name, PORT_BACKEND),
                    Endpoint::new(&backend_name, PORT_BACKEND),
                    LinkKind::Backend,
                ) else {
                    return LinkRouting::Ignored;
                };
                let mut fields = ChangeBackend::new(network_id);
                fields.ln_name = Some(ln_name);
                fields.backend_name = Some(backend_name);
                fields.link_id = Some(link_id.clone());
                let ticket = self.modals.show_change_backend(&mut self.charts, fields);
                LinkRouting::ChangeBackend { link_id, ticket }
            }
            _ => LinkRouting::Ignored,
        }
    }

    /// A drag onto a link that is already drawn must not start a workflow,
    /// or cancelling it would remove a link the workflow never created.
    fn link_exists(&self, network_id: NetworkId, from: &str, to: &str, kind: LinkKind) -> bool {
        let exists = self
            .charts
            .get(&network_id)
            .is_some_and(|chart| chart.has_link(&topology::link_id(from, to, kind)));
        if exists {
            debug!("{} link {} -> {} already exists", kind.as_str(), from, to);
        }
        exists
    }

    /// Consistency problems between a network and its chart.
    pub fn audit(&self, network_id: NetworkId) -> Vec<Inconsistency> {
        let (Some(network), Some(chart)) = (self.registry.get(network_id), self.charts.get(&network_id))
        else {
            return Vec::new();
        };
        let pending: Vec<&str> = self
            .modals
            .pending_links()
            .into_iter()
            .filter(|(id, _)| *id == network_id)
            .map(|(_, link)| link)
            .collect();
        topology::audit(network, chart, &pending)
    }

    // Workflows

    pub fn show_open_channel(&mut self, fields: OpenChannel) -> Ticket {
        self.modals.show_open_channel(&mut self.charts, fields)
    }

    pub fn hide_open_channel(&mut self) {
        self.modals.hide_open_channel(&mut self.charts);
    }

    pub fn complete_open_channel(&mut self, ticket: Ticket, result: Outcome) -> Confirmation {
        self.modals
            .complete_open_channel(&self.registry, &mut self.charts, ticket, result)
    }

    pub fn show_change_backend(&mut self, fields: ChangeBackend) -> Ticket {
        self.modals.show_change_backend(&mut self.charts, fields)
    }

    pub fn hide_change_backend(&mut self) {
        self.modals.hide_change_backend(&mut self.charts);
    }

    pub fn complete_change_backend(
        &mut self,
        ticket: Ticket,
        result: Outcome,
    ) -> Confirmation {
        self.modals
            .complete_change_backend(&mut self.registry, &mut self.charts, ticket, result)
    }

    pub fn show_create_invoice(&mut self, fields: CreateInvoice) -> Ticket {
        self.modals.show_create_invoice(fields)
    }

    pub fn hide_create_invoice(&mut self) {
        self.modals.hide_create_invoice();
    }

    pub fn complete_create_invoice(
        &mut self,
        ticket: Ticket,
        result: Outcome<String>,
    ) -> Confirmation {
        self.modals.complete_create_invoice(ticket, result)
    }

    pub fn show_pay_invoice(&mut self, fields: PayInvoice) -> Ticket {
        self.modals.show_pay_invoice(fields)
    }

    pub fn hide_pay_invoice(&mut self) {
        self.modals.hide_pay_invoice();
    }

    pub fn complete_pay_invoice(&mut self, ticket: Ticket, result: Outcome) -> Confirmation {
        self.modals.complete_pay_invoice(ticket, result)
    }

    pub fn show_advanced_options(&mut self, fields: AdvancedOptions) -> Ticket {
        self.modals.show_advanced_options(fields)
    }

    pub fn hide_advanced_options(&mut self) {
        self.modals.hide_advanced_options();
    }

    pub fn complete_advanced_options(
        &mut self,
        ticket: Ticket,
        result: Outcome,
    ) -> Confirmation {
        self.modals.complete_advanced_options(ticket, result)
    }

    pub fn show_image_updates(&mut self) -> Ticket {
        self.modals.show_image_updates()
    }

    pub fn hide_image_updates(&mut self) {
        self.modals.hide_image_updates();
    }

    pub fn complete_image_updates(
        &mut self,
        ticket: Ticket,
        result: Outcome,
    ) -> Confirmation {
        self.modals.complete_image_updates(ticket, result)
    }

    pub fn show_send_on_chain(&mut self, fields: SendOnChain) -> Ticket {
        self.modals.show_send_on_chain(fields)
    }

    pub fn hide_send_on_chain(&mut self) {
        self.modals.hide_send_on_chain();
    }

    pub fn complete_send_on_chain(
        &mut self,
        ticket: Ticket,
        result: Outcome,
    ) -> Confirmation {
        self.modals.complete_send_on_chain(ticket, result)
    }
}

impl From<NetworksFile> for Store {
    fn from(file: NetworksFile) -> Self {
        info!("Restoring {} network(s)", file.networks.len());
        Store::from_file(file, ZoomConfig::default())
    }
}

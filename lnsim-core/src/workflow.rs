//! Transient user workflows shown as modals.
//!
//! Each workflow is either hidden or visible with a typed payload. Opening a
//! channel and changing a backend may hold a pending chart link; hiding those
//! workflows removes the link before the payload is dropped, and completions
//! re-check that the link still exists before anything durable is recorded.

use crate::chart::{Charts, Endpoint, LinkKind};
use crate::model::{NetworkId, NodeKind};
use crate::registry::NetworkRegistry;
use crate::topology::{self, PORT_BACKEND, PORT_LEFT, PORT_RIGHT};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What an executor reports for a workflow: its result, or a message to show
/// on the workflow.
pub type Outcome<T = ()> = Result<T, String>;

/// Identifies one visible instance of a workflow. A completion carrying a
/// ticket from an earlier instance is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(Uuid);

impl Ticket {
    fn issue() -> Self {
        Ticket(Uuid::new_v4())
    }
}

impl std::fmt::Display for Ticket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Field-wise update of a workflow payload.
pub trait Payload: Clone {
    /// Overwrites every field that is set in `other`.
    fn merge(&mut self, other: Self);
    fn set_error(&mut self, message: String);
    fn error(&self) -> Option<&str>;
}

macro_rules! payload {
    ($name:ident { $($field:ident),* $(,)? }) => {
        impl Payload for $name {
            #[allow(unused_variables)]
            fn merge(&mut self, other: Self) {
                $(
                    if other.$field.is_some() {
                        self.$field = other.$field;
                    }
                )*
            }

            fn set_error(&mut self, message: String) {
                self.error = Some(message);
            }

            fn error(&self) -> Option<&str> {
                self.error.as_deref()
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq)]
pub enum Modal<P> {
    Hidden,
    Visible { ticket: Ticket, payload: P },
}

impl<P> Default for Modal<P> {
    fn default() -> Self {
        Modal::Hidden
    }
}

impl<P: Payload> Modal<P> {
    pub fn is_visible(&self) -> bool {
        matches!(self, Modal::Visible { .. })
    }

    pub fn payload(&self) -> Option<&P> {
        match self {
            Modal::Visible { payload, .. } => Some(payload),
            Modal::Hidden => None,
        }
    }

    pub fn ticket(&self) -> Option<Ticket> {
        match self {
            Modal::Visible { ticket, .. } => Some(*ticket),
            Modal::Hidden => None,
        }
    }

    /// Shows the workflow. A hidden workflow starts from `fields` with a new
    /// ticket; a visible one merges `fields` into its payload.
    fn show(&mut self, fields: P) -> Ticket {
        match self {
            Modal::Visible { ticket, payload } => {
                payload.merge(fields);
                *ticket
            }
            Modal::Hidden => {
                let ticket = Ticket::issue();
                *self = Modal::Visible {
                    ticket,
                    payload: fields,
                };
                ticket
            }
        }
    }

    /// Hides the workflow and hands back the payload it held.
    fn take(&mut self) -> Option<P> {
        match std::mem::take(self) {
            Modal::Visible { payload, .. } => Some(payload),
            Modal::Hidden => None,
        }
    }

    /// Payload of the instance identified by `ticket`.
    fn checked(&self, ticket: Ticket) -> Result<P, Discard> {
        match self {
            Modal::Visible { ticket: t, payload } if *t == ticket => Ok(payload.clone()),
            Modal::Visible { .. } => Err(Discard::StaleTicket),
            Modal::Hidden => Err(Discard::NotVisible),
        }
    }

    fn fail(&mut self, message: String) -> Confirmation {
        if let Modal::Visible { payload, .. } = self {
            payload.set_error(message.clone());
        }
        Confirmation::Failed(message)
    }
}

/// What happens to a workflow once its executor succeeded.
enum After {
    Hide,
    KeepVisible,
}

/// Outcome of completing a workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    /// The action is recorded.
    Finalized,
    /// The action failed; the workflow stays visible with the error attached
    /// and keeps its pending link for a retry.
    Failed(String),
    /// The completion no longer matches a live workflow and was dropped.
    Discarded(Discard),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discard {
    NotVisible,
    StaleTicket,
    LinkRemoved(String),
    NetworkRemoved(NetworkId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenChannel {
    pub network_id: NetworkId,
    pub from: Option<String>,
    pub to: Option<String>,
    pub link_id: Option<String>,
    pub capacity_sats: Option<u64>,
    pub error: Option<String>,
}
payload!(OpenChannel { from, to, link_id, capacity_sats });

impl OpenChannel {
    pub fn new(network_id: NetworkId) -> Self {
        Self {
            network_id,
            from: None,
            to: None,
            link_id: None,
            capacity_sats: None,
            error: None,
        }
    }

    /// The request an executor needs, or a message naming what is missing.
    pub fn order(&self) -> Outcome<ChannelOrder> {
        let from = self.from.clone().ok_or("select the source node")?;
        let to = self.to.clone().ok_or("select the destination node")?;
        let capacity_sats = self.capacity_sats.ok_or("enter the channel capacity")?;
        Ok(ChannelOrder {
            network_id: self.network_id,
            from,
            to,
            capacity_sats,
        })
    }
}

/// A complete request to open a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOrder {
    pub network_id: NetworkId,
    pub from: String,
    pub to: String,
    pub capacity_sats: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeBackend {
    pub network_id: NetworkId,
    pub ln_name: Option<String>,
    pub backend_name: Option<String>,
    pub link_id: Option<String>,
    pub error: Option<String>,
}
payload!(ChangeBackend { ln_name, backend_name, link_id });

impl ChangeBackend {
    pub fn new(network_id: NetworkId) -> Self {
        Self {
            network_id,
            ln_name: None,
            backend_name: None,
            link_id: None,
            error: None,
        }
    }

    pub fn order(&self) -> Outcome<BackendOrder> {
        let ln_name = self.ln_name.clone().ok_or("select the lightning node")?;
        let backend_name = self.backend_name.clone().ok_or("select the bitcoin node")?;
        Ok(BackendOrder {
            network_id: self.network_id,
            ln_name,
            backend_name,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendOrder {
    pub network_id: NetworkId,
    pub ln_name: String,
    pub backend_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateInvoice {
    pub node_name: Option<String>,
    pub amount_sats: Option<u64>,
    /// Set once the invoice has been created.
    pub invoice: Option<String>,
    pub error: Option<String>,
}
payload!(CreateInvoice { node_name, amount_sats, invoice });

impl CreateInvoice {
    pub fn order(&self) -> Outcome<InvoiceOrder> {
        let node_name = self.node_name.clone().ok_or("select the lightning node")?;
        let amount_sats = self.amount_sats.ok_or("enter the invoice amount")?;
        Ok(InvoiceOrder {
            node_name,
            amount_sats,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceOrder {
    pub node_name: String,
    pub amount_sats: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayInvoice {
    pub node_name: Option<String>,
    pub invoice: Option<String>,
    pub error: Option<String>,
}
payload!(PayInvoice { node_name, invoice });

impl PayInvoice {
    pub fn order(&self) -> Outcome<PaymentOrder> {
        let node_name = self.node_name.clone().ok_or("select the paying node")?;
        let invoice = self
            .invoice
            .clone()
            .filter(|invoice| !invoice.trim().is_empty())
            .ok_or("paste the invoice to pay")?;
        Ok(PaymentOrder { node_name, invoice })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentOrder {
    pub node_name: String,
    pub invoice: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvancedOptions {
    pub node_name: Option<String>,
    pub command: Option<String>,
    pub default_command: Option<String>,
    pub error: Option<String>,
}
payload!(AdvancedOptions { node_name, command, default_command });

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOnChain {
    pub backend_name: Option<String>,
    pub to_address: Option<String>,
    pub amount_sats: Option<u64>,
    pub error: Option<String>,
}
payload!(SendOnChain { backend_name, to_address, amount_sats });

impl SendOnChain {
    pub fn order(&self) -> Outcome<OnChainOrder> {
        let backend_name = self.backend_name.clone().ok_or("select the bitcoin node")?;
        let to_address = self.to_address.clone().ok_or("enter the destination address")?;
        let amount_sats = self.amount_sats.ok_or("enter the amount")?;
        Ok(OnChainOrder {
            backend_name,
            to_address,
            amount_sats,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnChainOrder {
    pub backend_name: String,
    pub to_address: String,
    pub amount_sats: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageUpdates {
    pub error: Option<String>,
}
payload!(ImageUpdates {});

/// One instance of every workflow.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Modals {
    pub(crate) open_channel: Modal<OpenChannel>,
    pub(crate) change_backend: Modal<ChangeBackend>,
    pub(crate) create_invoice: Modal<CreateInvoice>,
    pub(crate) pay_invoice: Modal<PayInvoice>,
    pub(crate) advanced_options: Modal<AdvancedOptions>,
    pub(crate) image_updates: Modal<ImageUpdates>,
    pub(crate) send_on_chain: Modal<SendOnChain>,
}

/// Removes the pending link a workflow was holding.
fn compensate(charts: &mut Charts, network_id: NetworkId, link_id: Option<&str>) {
    let Some(link_id) = link_id else {
        return;
    };
    if let Some(chart) = charts.get_mut(&network_id)
        && topology::remove_link(chart, link_id).is_some()
    {
        info!("Network {}: dropped pending link {}", network_id, link_id);
    }
}

impl Modals {
    pub fn open_channel(&self) -> &Modal<OpenChannel> {
        &self.open_channel
    }

    pub fn change_backend(&self) -> &Modal<ChangeBackend> {
        &self.change_backend
    }

    pub fn create_invoice(&self) -> &Modal<CreateInvoice> {
        &self.create_invoice
    }

    pub fn pay_invoice(&self) -> &Modal<PayInvoice> {
        &self.pay_invoice
    }

    pub fn advanced_options(&self) -> &Modal<AdvancedOptions> {
        &self.advanced_options
    }

    pub fn image_updates(&self) -> &Modal<ImageUpdates> {
        &self.image_updates
    }

    pub fn send_on_chain(&self) -> &Modal<SendOnChain> {
        &self.send_on_chain
    }

    /// Links held by in-progress workflows, with the network they belong to.
    pub fn pending_links(&self) -> Vec<(NetworkId, &str)> {
        let mut links = Vec::new();
        if let Some(p) = self.open_channel.payload()
            && let Some(id) = &p.link_id
        {
            links.push((p.network_id, id.as_str()));
        }
        if let Some(p) = self.change_backend.payload()
            && let Some(id) = &p.link_id
        {
            links.push((p.network_id, id.as_str()));
        }
        links
    }

    // Open channel

    /// Shows the open-channel workflow. When the workflow is already showing
    /// for another network, or `fields` replaces its pending link, the old
    /// pending link is removed first.
    pub fn show_open_channel(&mut self, charts: &mut Charts, fields: OpenChannel) -> Ticket {
        if let Some(current) = self.open_channel.payload() {
            if current.network_id != fields.network_id {
                self.hide_open_channel(charts);
            } else if fields.link_id.is_some() && fields.link_id != current.link_id {
                compensate(charts, current.network_id, current.link_id.as_deref());
            }
        }
        let ticket = self.open_channel.show(fields);
        debug!("Showing open channel workflow {}", ticket);
        ticket
    }

    /// Cancels the open-channel workflow, removing its pending link.
    pub fn hide_open_channel(&mut self, charts: &mut Charts) {
        if let Some(payload) = self.open_channel.take() {
            compensate(charts, payload.network_id, payload.link_id.as_deref());
            debug!("Closed open channel workflow");
        }
    }

    /// Records the executor result for the open-channel instance `ticket`.
    pub fn complete_open_channel(
        &mut self,
        registry: &NetworkRegistry,
        charts: &mut Charts,
        ticket: Ticket,
        result: Outcome,
    ) -> Confirmation {
        let payload = match self.open_channel.checked(ticket) {
            Ok(payload) => payload,
            Err(reason) => return discarded("open channel", reason),
        };
        let network_id = payload.network_id;
        let (Some(network), Some(chart)) = (registry.get(network_id), charts.get_mut(&network_id))
        else {
            self.open_channel.take();
            return discarded("open channel", Discard::NetworkRemoved(network_id));
        };
        if let Some(link_id) = &payload.link_id
            && !chart.has_link(link_id)
        {
            self.open_channel.take();
            return discarded("open channel", Discard::LinkRemoved(link_id.clone()));
        }
        if let Err(message) = result {
            warn!("Opening channel failed: {}", message);
            return self.open_channel.fail(message);
        }

        let link_id = match payload.link_id {
            Some(link_id) => link_id,
            None => {
                let ends = payload.from.as_deref().zip(payload.to.as_deref());
                let linked = ends
                    .filter(|(from, to)| {
                        network.lightning_node(from).is_some() && network.lightning_node(to).is_some()
                    })
                    .and_then(|(from, to)| {
                        topology::add_link(
                            chart,
                            Endpoint::new(from, PORT_RIGHT),
                            Endpoint::new(to, PORT_LEFT),
                            LinkKind::Channel,
                        )
                    });
                match linked {
                    Some(link_id) => link_id,
                    None => {
                        return self
                            .open_channel
                            .fail("a channel needs two lightning nodes".to_string());
                    }
                }
            }
        };
        topology::set_link_capacity(chart, &link_id, payload.capacity_sats);
        self.open_channel.take();
        info!("Network {}: channel {} opened", network_id, link_id);
        Confirmation::Finalized
    }

    // Change backend

    pub fn show_change_backend(&mut self, charts: &mut Charts, fields: ChangeBackend) -> Ticket {
        if let Some(current) = self.change_backend.payload() {
            if current.network_id != fields.network_id {
                self.hide_change_backend(charts);
            } else if fields.link_id.is_some() && fields.link_id != current.link_id {
                compensate(charts, current.network_id, current.link_id.as_deref());
            }
        }
        let ticket = self.change_backend.show(fields);
        debug!("Showing change backend workflow {}", ticket);
        ticket
    }

    /// Cancels the change-backend workflow, removing its pending link.
    pub fn hide_change_backend(&mut self, charts: &mut Charts) {
        if let Some(payload) = self.change_backend.take() {
            compensate(charts, payload.network_id, payload.link_id.as_deref());
            debug!("Closed change backend workflow");
        }
    }

    /// Records the executor result for the change-backend instance `ticket`.
    /// On success the lightning node is rebound and its old backend link is
    /// replaced by the new one.
    pub fn complete_change_backend(
        &mut self,
        registry: &mut NetworkRegistry,
        charts: &mut Charts,
        ticket: Ticket,
        result: Outcome,
    ) -> Confirmation {
        let payload = match self.change_backend.checked(ticket) {
            Ok(payload) => payload,
            Err(reason) => return discarded("change backend", reason),
        };
        let network_id = payload.network_id;
        let (Some(network), Some(chart)) =
            (registry.get_mut(network_id), charts.get_mut(&network_id))
        else {
            self.change_backend.take();
            return discarded("change backend", Discard::NetworkRemoved(network_id));
        };
        if let Some(link_id) = &payload.link_id
            && !chart.has_link(link_id)
        {
            self.change_backend.take();
            return discarded("change backend", Discard::LinkRemoved(link_id.clone()));
        }
        if let Err(message) = result {
            warn!("Changing backend failed: {}", message);
            return self.change_backend.fail(message);
        }

        let order = match payload.order() {
            Ok(order) => order,
            Err(message) => return self.change_backend.fail(message),
        };
        let Some(old_backend) = network
            .lightning_node(&order.ln_name)
            .map(|ln| ln.backend_name.clone())
        else {
            return self
                .change_backend
                .fail(format!("{} is not a lightning node", order.ln_name));
        };
        let backend_is_bitcoin = network
            .node(&order.backend_name)
            .is_some_and(|node| node.kind() == NodeKind::Bitcoin);
        if !backend_is_bitcoin || !network.set_backend(&order.ln_name, &order.backend_name) {
            return self
                .change_backend
                .fail(format!("{} is not a bitcoin node", order.backend_name));
        }

        let new_link = topology::add_link(
            chart,
            Endpoint::new(&order.ln_name, PORT_BACKEND),
            Endpoint::new(&order.backend_name, PORT_BACKEND),
            LinkKind::Backend,
        );
        if let Some(pending) = &payload.link_id
            && new_link.as_deref() != Some(pending.as_str())
        {
            topology::remove_link(chart, pending);
        }
        if old_backend != order.backend_name {
            topology::remove_link(chart, &topology::backend_link_id(&order.ln_name, &old_backend));
        }
        self.change_backend.take();
        info!(
            "Network {}: {} now syncs against {}",
            network_id, order.ln_name, order.backend_name
        );
        Confirmation::Finalized
    }

    // Invoices, on-chain sends, node options and image updates hold no chart
    // links; hiding them just drops the payload.

    pub fn show_create_invoice(&mut self, fields: CreateInvoice) -> Ticket {
        self.create_invoice.show(fields)
    }

    pub fn hide_create_invoice(&mut self) {
        self.create_invoice.take();
    }

    /// On success the invoice is stored and the workflow stays visible so it
    /// can be copied.
    pub fn complete_create_invoice(
        &mut self,
        ticket: Ticket,
        result: Outcome<String>,
    ) -> Confirmation {
        complete_simple(&mut self.create_invoice, "create invoice", ticket, result, |p, invoice| {
            p.invoice = Some(invoice);
            p.error = None;
            After::KeepVisible
        })
    }

    pub fn show_pay_invoice(&mut self, fields: PayInvoice) -> Ticket {
        self.pay_invoice.show(fields)
    }

    pub fn hide_pay_invoice(&mut self) {
        self.pay_invoice.take();
    }

    pub fn complete_pay_invoice(&mut self, ticket: Ticket, result: Outcome) -> Confirmation {
        complete_simple(&mut self.pay_invoice, "pay invoice", ticket, result, |_, _| After::Hide)
    }

    pub fn show_advanced_options(&mut self, fields: AdvancedOptions) -> Ticket {
        self.advanced_options.show(fields)
    }

    pub fn hide_advanced_options(&mut self) {
        self.advanced_options.take();
    }

    pub fn complete_advanced_options(
        &mut self,
        ticket: Ticket,
        result: Outcome,
    ) -> Confirmation {
        complete_simple(&mut self.advanced_options, "advanced options", ticket, result, |_, _| {
            After::Hide
        })
    }

    pub fn show_image_updates(&mut self) -> Ticket {
        self.image_updates.show(ImageUpdates::default())
    }

    pub fn hide_image_updates(&mut self) {
        self.image_updates.take();
    }

    pub fn complete_image_updates(
        &mut self,
        ticket: Ticket,
        result: Outcome,
    ) -> Confirmation {
        complete_simple(&mut self.image_updates, "image updates", ticket, result, |_, _| After::Hide)
    }

    pub fn show_send_on_chain(&mut self, fields: SendOnChain) -> Ticket {
        self.send_on_chain.show(fields)
    }

    pub fn hide_send_on_chain(&mut self) {
        self.send_on_chain.take();
    }

    pub fn complete_send_on_chain(
        &mut self,
        ticket: Ticket,
        result: Outcome,
    ) -> Confirmation {
        complete_simple(&mut self.send_on_chain, "send on-chain", ticket, result, |_, _| After::Hide)
    }

    /// Closes any chart-bound workflow of a network that is going away.
    pub(crate) fn forget_network(&mut self, network_id: NetworkId) {
        if self
            .open_channel
            .payload()
            .is_some_and(|p| p.network_id == network_id)
        {
            self.open_channel.take();
        }
        if self
            .change_backend
            .payload()
            .is_some_and(|p| p.network_id == network_id)
        {
            self.change_backend.take();
        }
    }
}

fn discarded(workflow: &str, reason: Discard) -> Confirmation {
    warn!("Discarding {} completion: {:?}", workflow, reason);
    Confirmation::Discarded(reason)
}

fn complete_simple<P: Payload, T>(
    modal: &mut Modal<P>,
    workflow: &str,
    ticket: Ticket,
    result: Outcome<T>,
    on_success: impl FnOnce(&mut P, T) -> After,
) -> Confirmation {
    if let Err(reason) = modal.checked(ticket) {
        return discarded(workflow, reason);
    }
    let value = match result {
        Ok(value) => value,
        Err(message) => {
            warn!("{} failed: {}", workflow, message);
            return modal.fail(message);
        }
    };
    if let Modal::Visible { payload, .. } = modal
        && let After::Hide = on_success(payload, value)
    {
        modal.take();
    }
    info!("{} completed", workflow);
    Confirmation::Finalized
}

//! Runs confirmed workflows against an executor and reports the outcome back
//! into the store.
//!
//! A confirmation snapshots the workflow's ticket and order, releases the
//! store, awaits the executor, then completes the workflow with the ticket it
//! started from. If the workflow was cancelled or replaced in the meantime,
//! the store discards the late result.

use crate::monitor::SharedStore;
use lnsim_core::Store;
use lnsim_core::model::Status;
use lnsim_core::workflow::{
    BackendOrder, ChangeBackend, ChannelOrder, Confirmation, CreateInvoice, Discard, InvoiceOrder,
    Modal, Modals, OnChainOrder, OpenChannel, Outcome, PayInvoice, Payload, PaymentOrder,
    SendOnChain, Ticket,
};
use std::future::Future;
use tracing::{debug, warn};

/// Performs the real action behind a workflow.
pub trait WorkflowExecutor: Send + Sync {
    fn open_channel(&self, order: ChannelOrder) -> impl Future<Output = Outcome> + Send;

    fn change_backend(&self, order: BackendOrder) -> impl Future<Output = Outcome> + Send;

    /// Returns the encoded invoice.
    fn create_invoice(&self, order: InvoiceOrder) -> impl Future<Output = Outcome<String>> + Send {
        std::future::ready(Err(format!(
            "cannot create invoices on {}",
            order.node_name
        )))
    }

    fn pay_invoice(&self, order: PaymentOrder) -> impl Future<Output = Outcome> + Send {
        std::future::ready(Err(format!("cannot pay invoices from {}", order.node_name)))
    }

    fn send_on_chain(&self, order: OnChainOrder) -> impl Future<Output = Outcome> + Send {
        std::future::ready(Err(format!(
            "cannot send on-chain from {}",
            order.backend_name
        )))
    }
}

async fn confirm<P, O, T, F, Fut>(
    store: &SharedStore,
    workflow: &str,
    modal: fn(&Modals) -> &Modal<P>,
    order: fn(&P) -> Outcome<O>,
    run: F,
    complete: fn(&mut Store, Ticket, Outcome<T>) -> Confirmation,
) -> Confirmation
where
    P: Payload,
    F: FnOnce(O) -> Fut,
    Fut: Future<Output = Outcome<T>>,
{
    let (ticket, order) = {
        let store = store.lock().await;
        let modal = modal(store.modals());
        match (modal.ticket(), modal.payload()) {
            (Some(ticket), Some(payload)) => (ticket, order(payload)),
            _ => {
                warn!("No visible {} workflow to confirm", workflow);
                return Confirmation::Discarded(Discard::NotVisible);
            }
        }
    };

    debug!("Executing {} for workflow {}", workflow, ticket);
    let result = match order {
        Ok(order) => run(order).await,
        Err(message) => Err(message),
    };

    let mut store = store.lock().await;
    complete(&mut *store, ticket, result)
}

pub async fn confirm_open_channel<E: WorkflowExecutor>(
    store: &SharedStore,
    executor: &E,
) -> Confirmation {
    confirm(
        store,
        "open channel",
        Modals::open_channel,
        OpenChannel::order,
        |order| executor.open_channel(order),
        Store::complete_open_channel,
    )
    .await
}

pub async fn confirm_change_backend<E: WorkflowExecutor>(
    store: &SharedStore,
    executor: &E,
) -> Confirmation {
    confirm(
        store,
        "change backend",
        Modals::change_backend,
        ChangeBackend::order,
        |order| executor.change_backend(order),
        Store::complete_change_backend,
    )
    .await
}

pub async fn confirm_create_invoice<E: WorkflowExecutor>(
    store: &SharedStore,
    executor: &E,
) -> Confirmation {
    confirm(
        store,
        "create invoice",
        Modals::create_invoice,
        CreateInvoice::order,
        |order| executor.create_invoice(order),
        Store::complete_create_invoice,
    )
    .await
}

pub async fn confirm_pay_invoice<E: WorkflowExecutor>(
    store: &SharedStore,
    executor: &E,
) -> Confirmation {
    confirm(
        store,
        "pay invoice",
        Modals::pay_invoice,
        PayInvoice::order,
        |order| executor.pay_invoice(order),
        Store::complete_pay_invoice,
    )
    .await
}

pub async fn confirm_send_on_chain<E: WorkflowExecutor>(
    store: &SharedStore,
    executor: &E,
) -> Confirmation {
    confirm(
        store,
        "send on-chain",
        Modals::send_on_chain,
        SendOnChain::order,
        |order| executor.send_on_chain(order),
        Store::complete_send_on_chain,
    )
    .await
}

/// Handles the actions that need no running daemon. A backend change is
/// accepted while the network is stopped; everything else is refused.
#[derive(Clone)]
pub struct OfflineExecutor {
    store: SharedStore,
}

impl OfflineExecutor {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

impl WorkflowExecutor for OfflineExecutor {
    async fn open_channel(&self, order: ChannelOrder) -> Outcome {
        Err(format!(
            "opening a channel from {} to {} needs a running network",
            order.from, order.to
        ))
    }

    async fn change_backend(&self, order: BackendOrder) -> Outcome {
        let store = self.store.lock().await;
        match store.network(order.network_id).map(|n| n.status()) {
            Some(Status::Stopped) => Ok(()),
            Some(status) => Err(format!(
                "stop network {} before changing backends (it is {})",
                order.network_id, status
            )),
            None => Err(format!("network {} not found", order.network_id)),
        }
    }
}

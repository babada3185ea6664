//! Drives network start and stop, turning probe results into node status
//! transitions.

use crate::error::{ProbeError, Result};
use crate::probe::HttpProbe;
use futures::future::join_all;
use lnsim_core::Store;
use lnsim_core::connection::connection_info;
use lnsim_core::model::{NetworkId, Status};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

/// The store shared between the UI side and the async collaborators. Never
/// held across an await on external work.
pub type SharedStore = Arc<Mutex<Store>>;

/// Maps a node name and its default probe URL to the URL actually polled.
pub type UrlResolver = Arc<dyn Fn(&str, &Url) -> Url + Send + Sync>;
/// Called after each node settles into its new status.
pub type StatusCallback = Arc<dyn Fn(&str, Status) + Send + Sync>;

pub fn shared(store: Store) -> SharedStore {
    Arc::new(Mutex::new(store))
}

pub struct NetworkMonitor {
    store: SharedStore,
    probe: HttpProbe,
    resolver: Option<UrlResolver>,
    status_callback: Option<StatusCallback>,
}

impl NetworkMonitor {
    pub fn new(store: SharedStore, probe: HttpProbe) -> Self {
        Self {
            store,
            probe,
            resolver: None,
            status_callback: None,
        }
    }

    pub fn with_resolver(mut self, resolver: UrlResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_status_callback(mut self, callback: StatusCallback) -> Self {
        self.status_callback = Some(callback);
        self
    }

    /// Moves every stopped or failed node of the network to Starting, probes
    /// them concurrently and records Started or Error for each. A node that
    /// fails does not affect the others. Returns the resulting network status.
    pub async fn start_network(&self, network_id: NetworkId) -> Result<Status> {
        let targets = {
            let mut store = self.store.lock().await;
            let names = store.request_start(network_id)?;
            let network = store
                .network(network_id)
                .ok_or(ProbeError::NetworkNotFound(network_id))?;

            let mut targets = Vec::with_capacity(names.len());
            for name in names {
                let Some(node) = network.node(&name) else {
                    continue;
                };
                let url = connection_info(node)
                    .map(|info| self.resolve(&name, info.probe_url()))
                    .map_err(|e| e.to_string());
                targets.push((name, url));
            }
            targets
        };
        info!("Network {}: probing {} node(s)", network_id, targets.len());

        let handles: Vec<_> = targets
            .into_iter()
            .map(|(name, url)| {
                let probe = self.probe.clone();
                let store = self.store.clone();
                let callback = self.status_callback.clone();

                tokio::spawn(async move {
                    let outcome = match url {
                        Ok(url) => probe
                            .wait_until_online(&url)
                            .await
                            .map_err(|e| e.to_string()),
                        Err(message) => Err(message),
                    };
                    let (target, message) = match outcome {
                        Ok(()) => (Status::Started, None),
                        Err(message) => {
                            warn!("Network {}: {} failed to start: {}", network_id, name, message);
                            (Status::Error, Some(message))
                        }
                    };

                    store
                        .lock()
                        .await
                        .set_node_status(network_id, &name, target, message);
                    if let Some(ref callback) = callback {
                        callback(&name, target);
                    }
                })
            })
            .collect();

        for handle in join_all(handles).await {
            handle?;
        }

        self.status(network_id).await
    }

    /// Stops every started node. Stopping the processes is up to the container
    /// runtime, so nodes pass through Stopping straight to Stopped.
    pub async fn stop_network(&self, network_id: NetworkId) -> Result<Status> {
        let stopped = {
            let mut store = self.store.lock().await;
            let stopping = store.request_stop(network_id)?;
            debug!("Network {}: stopping {}", network_id, stopping.join(", "));
            store.mark_stopped(network_id)?
        };

        if let Some(ref callback) = self.status_callback {
            for name in &stopped {
                callback(name, Status::Stopped);
            }
        }
        info!("Network {}: stopped {} node(s)", network_id, stopped.len());

        self.status(network_id).await
    }

    async fn status(&self, network_id: NetworkId) -> Result<Status> {
        self.store
            .lock()
            .await
            .network(network_id)
            .map(|network| network.status())
            .ok_or(ProbeError::NetworkNotFound(network_id))
    }

    fn resolve(&self, name: &str, url: &Url) -> Url {
        match &self.resolver {
            Some(resolver) => resolver(name, url),
            None => url.clone(),
        }
    }
}

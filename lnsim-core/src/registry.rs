use crate::error::{CoreError, Result};
use crate::model::{Network, NetworkId};
use tracing::info;

/// The ordered set of logical networks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkRegistry {
    networks: Vec<Network>,
}

impl NetworkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_networks(networks: Vec<Network>) -> Self {
        Self { networks }
    }

    pub fn networks(&self) -> &[Network] {
        &self.networks
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }

    pub fn get(&self, id: NetworkId) -> Option<&Network> {
        self.networks.iter().find(|n| n.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: NetworkId) -> Option<&mut Network> {
        self.networks.iter_mut().find(|n| n.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Network> {
        self.networks.iter().find(|n| n.name == name)
    }

    /// Smallest id greater than every id in use, starting at 1.
    pub fn next_id(&self) -> Result<NetworkId> {
        let max = self.networks.iter().map(|n| n.id).max().unwrap_or(0);
        max.checked_add(1).ok_or(CoreError::IdsExhausted)
    }

    pub fn insert(&mut self, network: Network) -> Result<()> {
        if self.get(network.id).is_some() {
            return Err(CoreError::DuplicateNetwork(network.id));
        }
        info!("Registered network {} '{}'", network.id, network.name);
        self.networks.push(network);
        Ok(())
    }

    pub fn remove(&mut self, id: NetworkId) -> Option<Network> {
        let idx = self.networks.iter().position(|n| n.id == id)?;
        let network = self.networks.remove(idx);
        info!("Removed network {} '{}'", network.id, network.name);
        Some(network)
    }

    pub fn into_networks(self) -> Vec<Network> {
        self.networks
    }
}

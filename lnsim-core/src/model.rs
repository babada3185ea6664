use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub type NetworkId = u32;

/// Runtime status of a single node. The network status is derived from these,
/// see [`crate::lifecycle::aggregate_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Starting,
    Started,
    Stopping,
    Stopped,
    Error,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Starting => "Starting",
            Status::Started => "Started",
            Status::Stopping => "Stopping",
            Status::Stopped => "Stopped",
            Status::Error => "Error",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Bitcoin,
    Lightning,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Bitcoin => "bitcoin",
            NodeKind::Lightning => "lightning",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BitcoinImpl {
    Bitcoind,
    Btcd,
}

impl BitcoinImpl {
    pub fn as_str(&self) -> &'static str {
        match self {
            BitcoinImpl::Bitcoind => "bitcoind",
            BitcoinImpl::Btcd => "btcd",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitcoinPorts {
    pub rpc: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BitcoinNode {
    pub id: u32,
    pub name: String,
    pub version: String,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
    pub implementation: BitcoinImpl,
    pub ports: BitcoinPorts,
}

/// Implementation-specific settings of a lightning node. Each variant carries
/// only the connection fields that implementation exposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "implementation")]
pub enum LightningImpl {
    #[serde(rename = "LND")]
    Lnd {
        tls_path: PathBuf,
        macaroon_path: PathBuf,
        grpc_port: u16,
        rest_port: u16,
    },
    #[serde(rename = "c-lightning")]
    CLightning { macaroon_path: PathBuf, rest_port: u16 },
    #[serde(rename = "eclair")]
    Eclair { rest_port: u16 },
}

impl LightningImpl {
    pub fn as_str(&self) -> &'static str {
        match self {
            LightningImpl::Lnd { .. } => "LND",
            LightningImpl::CLightning { .. } => "c-lightning",
            LightningImpl::Eclair { .. } => "eclair",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightningNode {
    pub id: u32,
    pub name: String,
    pub version: String,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
    /// Name of the bitcoin node this node syncs against.
    pub backend_name: String,
    #[serde(flatten)]
    pub implementation: LightningImpl,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkNodes {
    pub bitcoin: Vec<BitcoinNode>,
    pub lightning: Vec<LightningNode>,
}

/// A logical network definition. Fields are only mutable inside this crate so
/// that every change goes through the registry, lifecycle and topology
/// operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub(crate) id: NetworkId,
    pub(crate) name: String,
    pub(crate) path: PathBuf,
    pub(crate) nodes: NetworkNodes,
}

/// Borrowed view over either kind of node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeRef<'a> {
    Bitcoin(&'a BitcoinNode),
    Lightning(&'a LightningNode),
}

impl<'a> NodeRef<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            NodeRef::Bitcoin(node) => &node.name,
            NodeRef::Lightning(node) => &node.name,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            NodeRef::Bitcoin(_) => NodeKind::Bitcoin,
            NodeRef::Lightning(_) => NodeKind::Lightning,
        }
    }

    pub fn status(&self) -> Status {
        match self {
            NodeRef::Bitcoin(node) => node.status,
            NodeRef::Lightning(node) => node.status,
        }
    }

    pub fn error_msg(&self) -> Option<&'a str> {
        match self {
            NodeRef::Bitcoin(node) => node.error_msg.as_deref(),
            NodeRef::Lightning(node) => node.error_msg.as_deref(),
        }
    }

    pub fn version(&self) -> &'a str {
        match self {
            NodeRef::Bitcoin(node) => &node.version,
            NodeRef::Lightning(node) => &node.version,
        }
    }

    pub fn implementation(&self) -> &'static str {
        match self {
            NodeRef::Bitcoin(node) => node.implementation.as_str(),
            NodeRef::Lightning(node) => node.implementation.as_str(),
        }
    }
}

impl Network {
    pub fn new(id: NetworkId, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id,
            name: name.into(),
            path: path.into(),
            nodes: NetworkNodes::default(),
        }
    }

    pub fn id(&self) -> NetworkId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bitcoin(&self) -> &[BitcoinNode] {
        &self.nodes.bitcoin
    }

    pub fn lightning(&self) -> &[LightningNode] {
        &self.nodes.lightning
    }

    /// Iterates bitcoin nodes first, then lightning nodes.
    pub fn nodes(&self) -> impl Iterator<Item = NodeRef<'_>> {
        self.nodes
            .bitcoin
            .iter()
            .map(NodeRef::Bitcoin)
            .chain(self.nodes.lightning.iter().map(NodeRef::Lightning))
    }

    pub fn node(&self, name: &str) -> Option<NodeRef<'_>> {
        self.nodes().find(|node| node.name() == name)
    }

    pub fn bitcoin_node(&self, name: &str) -> Option<&BitcoinNode> {
        self.nodes.bitcoin.iter().find(|node| node.name == name)
    }

    pub fn lightning_node(&self, name: &str) -> Option<&LightningNode> {
        self.nodes.lightning.iter().find(|node| node.name == name)
    }

    /// Lightning nodes whose backend is `backend_name`.
    pub fn dependents_of(&self, backend_name: &str) -> Vec<&LightningNode> {
        self.nodes
            .lightning
            .iter()
            .filter(|node| node.backend_name == backend_name)
            .collect()
    }

    pub fn status(&self) -> Status {
        crate::lifecycle::aggregate_status(self.nodes().map(|node| node.status()))
    }

    pub(crate) fn add_bitcoin(&mut self, node: BitcoinNode) {
        self.nodes.bitcoin.push(node);
    }

    pub(crate) fn add_lightning(&mut self, node: LightningNode) {
        self.nodes.lightning.push(node);
    }

    /// Drops the named node from whichever list holds it.
    pub(crate) fn remove_node(&mut self, name: &str) -> Option<NodeKind> {
        if let Some(idx) = self.nodes.lightning.iter().position(|n| n.name == name) {
            self.nodes.lightning.remove(idx);
            return Some(NodeKind::Lightning);
        }
        if let Some(idx) = self.nodes.bitcoin.iter().position(|n| n.name == name) {
            self.nodes.bitcoin.remove(idx);
            return Some(NodeKind::Bitcoin);
        }
        None
    }

    pub(crate) fn set_backend(&mut self, ln_name: &str, backend_name: &str) -> bool {
        if self.bitcoin_node(backend_name).is_none() {
            return false;
        }
        match self.nodes.lightning.iter_mut().find(|n| n.name == ln_name) {
            Some(node) => {
                node.backend_name = backend_name.to_string();
                true
            }
            None => false,
        }
    }

    /// Mutable access to the status fields of a node.
    pub(crate) fn status_slot(&mut self, name: &str) -> Option<(&mut Status, &mut Option<String>)> {
        if let Some(node) = self.nodes.bitcoin.iter_mut().find(|n| n.name == name) {
            return Some((&mut node.status, &mut node.error_msg));
        }
        self.nodes
            .lightning
            .iter_mut()
            .find(|n| n.name == name)
            .map(|node| (&mut node.status, &mut node.error_msg))
    }

    pub(crate) fn node_names(&self) -> Vec<String> {
        self.nodes().map(|node| node.name().to_string()).collect()
    }
}

//! Building new networks with deterministic names, versions and ports.

use crate::error::{CoreError, Result};
use crate::model::{
    BitcoinImpl, BitcoinNode, BitcoinPorts, LightningImpl, LightningNode, Network, NetworkId,
    Status,
};
use std::path::Path;
use tracing::info;

const LIGHTNING_NAMES: [&str; 10] = [
    "alice", "bob", "carol", "dave", "erin", "frank", "grace", "heidi", "ivan", "judy",
];

pub const BITCOIND_VERSION: &str = "27.0";
pub const LND_VERSION: &str = "0.18.0-beta";
pub const CLIGHTNING_VERSION: &str = "24.05";
pub const ECLAIR_VERSION: &str = "0.10.0";

const BITCOIND_RPC_BASE: u16 = 18443;
const LND_GRPC_BASE: u16 = 10001;
const LND_REST_BASE: u16 = 8081;
const CLIGHTNING_REST_BASE: u16 = 8181;
const ECLAIR_REST_BASE: u16 = 8281;

/// How many nodes of each implementation a new network starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeCounts {
    pub lnd: usize,
    pub c_lightning: usize,
    pub eclair: usize,
    pub bitcoind: usize,
}

impl Default for NodeCounts {
    fn default() -> Self {
        Self {
            lnd: 1,
            c_lightning: 1,
            eclair: 1,
            bitcoind: 1,
        }
    }
}

impl NodeCounts {
    pub fn lightning(&self) -> usize {
        self.lnd + self.c_lightning + self.eclair
    }
}

/// Name for the `index`-th lightning node of a network.
pub fn lightning_name(index: usize) -> String {
    LIGHTNING_NAMES
        .get(index)
        .map(|name| name.to_string())
        .unwrap_or_else(|| format!("node-{}", index + 1))
}

/// Name for the `index`-th bitcoin node of a network.
pub fn bitcoin_name(index: usize) -> String {
    format!("backend{}", index + 1)
}

/// Creates a network with the requested node counts. Node data lives under
/// `base_dir/<id>`. Lightning nodes are spread round-robin over the bitcoin
/// nodes, LND first, then c-lightning, then eclair.
pub fn create_network(
    id: NetworkId,
    name: &str,
    counts: NodeCounts,
    base_dir: &Path,
) -> Result<Network> {
    if counts.bitcoind == 0 && counts.lightning() > 0 {
        return Err(CoreError::NoBackend(counts.lightning()));
    }

    let path = base_dir.join(id.to_string());
    let mut network = Network::new(id, name, &path);
    let mut next_id = 0u32;

    for i in 0..counts.bitcoind {
        network.add_bitcoin(BitcoinNode {
            id: next_id,
            name: bitcoin_name(i),
            version: BITCOIND_VERSION.to_string(),
            status: Status::Stopped,
            error_msg: None,
            implementation: BitcoinImpl::Bitcoind,
            ports: BitcoinPorts {
                rpc: allocate_port(BITCOIND_RPC_BASE, i, "bitcoind")?,
            },
        });
        next_id += 1;
    }

    let flavors = [
        (Flavor::Lnd, counts.lnd),
        (Flavor::CLightning, counts.c_lightning),
        (Flavor::Eclair, counts.eclair),
    ];
    let mut ln_index = 0usize;
    for (flavor, count) in flavors {
        for i in 0..count {
            let node_name = lightning_name(ln_index);
            let implementation = flavor.implementation(i, &path, &node_name)?;
            network.add_lightning(LightningNode {
                id: next_id,
                name: node_name,
                version: flavor.version().to_string(),
                status: Status::Stopped,
                error_msg: None,
                backend_name: bitcoin_name(ln_index % counts.bitcoind),
                implementation,
            });
            next_id += 1;
            ln_index += 1;
        }
    }

    info!(
        "Created network {} '{}' with {} bitcoin and {} lightning nodes",
        id,
        name,
        counts.bitcoind,
        counts.lightning()
    );
    Ok(network)
}

#[derive(Debug, Clone, Copy)]
enum Flavor {
    Lnd,
    CLightning,
    Eclair,
}

impl Flavor {
    fn version(self) -> &'static str {
        match self {
            Flavor::Lnd => LND_VERSION,
            Flavor::CLightning => CLIGHTNING_VERSION,
            Flavor::Eclair => ECLAIR_VERSION,
        }
    }

    /// Settings for the `i`-th node of this flavor.
    fn implementation(self, i: usize, network_dir: &Path, node_name: &str) -> Result<LightningImpl> {
        let implementation = match self {
            Flavor::Lnd => {
                let dir = network_dir.join("volumes").join("lnd").join(node_name);
                LightningImpl::Lnd {
                    tls_path: dir.join("tls.cert"),
                    macaroon_path: dir
                        .join("data")
                        .join("chain")
                        .join("bitcoin")
                        .join("regtest")
                        .join("admin.macaroon"),
                    grpc_port: allocate_port(LND_GRPC_BASE, i, "LND")?,
                    rest_port: allocate_port(LND_REST_BASE, i, "LND")?,
                }
            }
            Flavor::CLightning => {
                let dir = network_dir.join("volumes").join("c-lightning").join(node_name);
                LightningImpl::CLightning {
                    macaroon_path: dir.join("rest-api").join("access.macaroon"),
                    rest_port: allocate_port(CLIGHTNING_REST_BASE, i, "c-lightning")?,
                }
            }
            Flavor::Eclair => LightningImpl::Eclair {
                rest_port: allocate_port(ECLAIR_REST_BASE, i, "eclair")?,
            },
        };
        Ok(implementation)
    }
}

/// Port of the `i`-th node counted up from `base`.
fn allocate_port(base: u16, i: usize, implementation: &'static str) -> Result<u16> {
    u16::try_from(i)
        .ok()
        .and_then(|offset| base.checked_add(offset))
        .ok_or(CoreError::PortRange(implementation))
}

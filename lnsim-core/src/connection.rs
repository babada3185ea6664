//! Connection details for talking to a node's daemon from the host.

use crate::error::Result;
use crate::model::{BitcoinImpl, LightningImpl, NodeRef};
use std::path::PathBuf;
use url::Url;

pub const LOCAL_HOST: &str = "127.0.0.1";

/// How to reach a node, per implementation.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionInfo {
    Bitcoind {
        rpc: Url,
    },
    Btcd {
        rpc: Url,
    },
    Lnd {
        grpc: Url,
        rest: Url,
        tls_cert: PathBuf,
        admin_macaroon: PathBuf,
    },
    CLightning {
        rest: Url,
        macaroon: PathBuf,
    },
    Eclair {
        rest: Url,
    },
}

impl ConnectionInfo {
    /// Endpoint a readiness probe should poll.
    pub fn probe_url(&self) -> &Url {
        match self {
            ConnectionInfo::Bitcoind { rpc } | ConnectionInfo::Btcd { rpc } => rpc,
            ConnectionInfo::Lnd { rest, .. } => rest,
            ConnectionInfo::CLightning { rest, .. } => rest,
            ConnectionInfo::Eclair { rest } => rest,
        }
    }
}

/// Assembles the connection info for `node`.
pub fn connection_info(node: NodeRef<'_>) -> Result<ConnectionInfo> {
    let info = match node {
        NodeRef::Bitcoin(btc) => {
            let rpc = local_url("http", btc.ports.rpc)?;
            match btc.implementation {
                BitcoinImpl::Bitcoind => ConnectionInfo::Bitcoind { rpc },
                BitcoinImpl::Btcd => ConnectionInfo::Btcd { rpc },
            }
        }
        NodeRef::Lightning(ln) => match &ln.implementation {
            LightningImpl::Lnd {
                tls_path,
                macaroon_path,
                grpc_port,
                rest_port,
            } => ConnectionInfo::Lnd {
                grpc: local_url("https", *grpc_port)?,
                rest: local_url("https", *rest_port)?,
                tls_cert: tls_path.clone(),
                admin_macaroon: macaroon_path.clone(),
            },
            LightningImpl::CLightning {
                macaroon_path,
                rest_port,
            } => ConnectionInfo::CLightning {
                rest: local_url("http", *rest_port)?,
                macaroon: macaroon_path.clone(),
            },
            LightningImpl::Eclair { rest_port } => ConnectionInfo::Eclair {
                rest: local_url("http", *rest_port)?,
            },
        },
    };
    Ok(info)
}

fn local_url(scheme: &str, port: u16) -> Result<Url> {
    Ok(Url::parse(&format!("{}://{}:{}/", scheme, LOCAL_HOST, port))?)
}

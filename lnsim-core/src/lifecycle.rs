//! Legal node status transitions and the network-level status policy.

use crate::model::{Network, Status};
use tracing::{debug, info, warn};

/// Result of applying a target status to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The status changed.
    Applied,
    /// The node already had the target status.
    Unchanged,
    /// The move is not a legal transition; nothing changed.
    Rejected,
    /// No node with that name exists in the network.
    UnknownNode,
}

/// Whether `from -> to` is one of the allowed lifecycle edges.
pub fn is_legal(from: Status, to: Status) -> bool {
    use Status::*;
    matches!(
        (from, to),
        (Stopped, Starting)
            | (Starting, Started)
            | (Started, Stopping)
            | (Stopping, Stopped)
            | (Error, Starting)
            | (_, Error)
    )
}

/// Applies `target` to the status slot. Setting the status a node already has
/// is a no-op, which makes late or duplicated completions harmless.
pub(crate) fn apply(
    status: &mut Status,
    error_msg: &mut Option<String>,
    target: Status,
    message: Option<String>,
) -> Transition {
    if *status == target {
        return Transition::Unchanged;
    }
    if !is_legal(*status, target) {
        return Transition::Rejected;
    }
    *status = target;
    *error_msg = match target {
        Status::Error => Some(message.unwrap_or_else(|| "unknown error".to_string())),
        _ => None,
    };
    Transition::Applied
}

/// Moves the named node of `network` to `target`.
///
/// `message` is recorded when the target is [`Status::Error`] and ignored
/// otherwise.
pub fn transition(
    network: &mut Network,
    node_name: &str,
    target: Status,
    message: Option<String>,
) -> Transition {
    let network_id = network.id;
    let Some((status, error_msg)) = network.status_slot(node_name) else {
        debug!("Network {}: no node '{}' to move to {}", network_id, node_name, target);
        return Transition::UnknownNode;
    };
    let from = *status;
    let outcome = apply(status, error_msg, target, message);
    match outcome {
        Transition::Applied => {
            info!("Network {}: {} {} -> {}", network_id, node_name, from, target)
        }
        Transition::Rejected => warn!(
            "Network {}: ignoring illegal transition of {} from {} to {}",
            network_id, node_name, from, target
        ),
        Transition::Unchanged | Transition::UnknownNode => {}
    }
    outcome
}

/// Network status from its node statuses, highest precedence first:
/// Error, Starting, Stopping, then Started when every node is started.
/// Anything else, including a network without nodes, is Stopped.
pub fn aggregate_status(statuses: impl IntoIterator<Item = Status>) -> Status {
    let mut any = false;
    let mut all_started = true;
    let mut starting = false;
    let mut stopping = false;
    for status in statuses {
        any = true;
        match status {
            Status::Error => return Status::Error,
            Status::Starting => starting = true,
            Status::Stopping => stopping = true,
            Status::Started => {}
            Status::Stopped => {}
        }
        all_started &= status == Status::Started;
    }
    if starting {
        Status::Starting
    } else if stopping {
        Status::Stopping
    } else if any && all_started {
        Status::Started
    } else {
        Status::Stopped
    }
}

/// Moves every Stopped or Error node to Starting and returns their names.
pub fn request_start(network: &mut Network) -> Vec<String> {
    move_all(network, &[Status::Stopped, Status::Error], Status::Starting)
}

/// Moves every Started node to Stopping and returns their names.
pub fn request_stop(network: &mut Network) -> Vec<String> {
    move_all(network, &[Status::Started], Status::Stopping)
}

/// Completes a stop: every Stopping node becomes Stopped.
pub fn mark_stopped(network: &mut Network) -> Vec<String> {
    move_all(network, &[Status::Stopping], Status::Stopped)
}

fn move_all(network: &mut Network, from: &[Status], target: Status) -> Vec<String> {
    let names: Vec<String> = network
        .nodes()
        .filter(|node| from.contains(&node.status()))
        .map(|node| node.name().to_string())
        .collect();
    for name in &names {
        transition(network, name, target, None);
    }
    names
}

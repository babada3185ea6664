use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use colored::{ColoredString, Colorize};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use lnsim_core::Store;
use lnsim_core::chart::{Chart, Endpoint, LinkKind};
use lnsim_core::config::{CONFIG_FILE, Config, expand_path};
use lnsim_core::connection::{ConnectionInfo, connection_info};
use lnsim_core::data::{Database, NetworksFile};
use lnsim_core::graph::channel_components;
use lnsim_core::model::{Network, NetworkId, NodeRef, Status};
use lnsim_core::network::NodeCounts;
use lnsim_core::store::LinkRouting;
use lnsim_core::topology::{NodeRemoval, PORT_BACKEND};
use lnsim_core::workflow::Confirmation;
use lnsim_probe::executor::confirm_change_backend;
use lnsim_probe::monitor::{NetworkMonitor, StatusCallback, shared};
use lnsim_probe::{HttpProbe, OfflineExecutor};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

// Helpers shared by the handlers

/// Reads the config from `data_dir`. The directory given on the command line
/// takes precedence over the one stored in the file.
pub fn load_config(data_dir: &str) -> Result<Config> {
    let dir = expand_path(data_dir);
    let mut config = Config::load(&dir.join(CONFIG_FILE))?;
    config.data_dir = dir;
    Ok(config)
}

/// Opens the database and restores every network from it.
pub fn open_store(config: &Config) -> Result<(Database, Store)> {
    let db_path = config.database_path();
    if !Database::exists(&db_path) {
        bail!(
            "no database at {}, run `lnsim init` first",
            db_path.display()
        );
    }
    let db = Database::new(&db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    let store = Store::from_file(db.load()?, config.zoom);
    Ok((db, store))
}

pub fn save_store(db: &mut Database, store: &Store) -> Result<()> {
    db.save(&store.to_file()).context("failed to save networks")
}

pub fn status_label(status: Status) -> ColoredString {
    match status {
        Status::Started => status.as_str().green().bold(),
        Status::Starting | Status::Stopping => status.as_str().yellow(),
        Status::Stopped => status.as_str().dimmed(),
        Status::Error => status.as_str().red().bold(),
    }
}

/// One line per network for `lnsim network list`.
pub fn network_summary(network: &Network) -> String {
    format!(
        "{:>3}  {:<20} {:<9} {} lightning / {} bitcoin",
        network.id(),
        network.name(),
        network.status().as_str(),
        network.lightning().len(),
        network.bitcoin().len()
    )
}

fn describe_connection(info: &ConnectionInfo) -> String {
    match info {
        ConnectionInfo::Bitcoind { rpc } | ConnectionInfo::Btcd { rpc } => {
            format!("rpc {}", rpc)
        }
        ConnectionInfo::Lnd {
            grpc,
            rest,
            tls_cert,
            admin_macaroon,
        } => format!(
            "grpc {}  rest {}\n      tls {}\n      macaroon {}",
            grpc,
            rest,
            tls_cert.display(),
            admin_macaroon.display()
        ),
        ConnectionInfo::CLightning { rest, macaroon } => {
            format!("rest {}\n      macaroon {}", rest, macaroon.display())
        }
        ConnectionInfo::Eclair { rest } => format!("rest {}", rest),
    }
}

fn node_line(node: NodeRef<'_>) -> String {
    let mut line = format!(
        "  {:<10} {:<12} {:<12} {}",
        node.name(),
        node.implementation(),
        node.version(),
        node.status().as_str()
    );
    if let NodeRef::Lightning(ln) = node {
        let _ = write!(line, "  backend {}", ln.backend_name);
    }
    if let Some(message) = node.error_msg() {
        let _ = write!(line, "  ({})", message);
    }
    line
}

/// Full description of a network for `lnsim network show`.
pub fn network_report(network: &Network, chart: &Chart) -> String {
    let mut report = String::new();
    let _ = writeln!(
        report,
        "Network {} '{}': {}",
        network.id(),
        network.name(),
        network.status().as_str()
    );
    let _ = writeln!(report, "Path: {}", network.path().display());

    report.push_str("\nNodes:\n");
    for node in network.lightning() {
        let _ = writeln!(report, "{}", node_line(NodeRef::Lightning(node)));
    }
    for node in network.bitcoin() {
        let _ = writeln!(report, "{}", node_line(NodeRef::Bitcoin(node)));
    }

    report.push_str("\nLinks:\n");
    for link in chart.links().values() {
        let capacity = link
            .capacity_sats
            .map(|sats| format!(" ({} sats)", sats))
            .unwrap_or_default();
        let _ = writeln!(
            report,
            "  {:<8} {} -> {}{}",
            link.kind.as_str(),
            link.from.node_id,
            link.to.node_id,
            capacity
        );
    }

    let has_channels = chart.links().values().any(|l| l.kind == LinkKind::Channel);
    if has_channels {
        report.push_str("\nChannel groups:\n");
        for group in channel_components(chart) {
            let _ = writeln!(report, "  {}", group.join(", "));
        }
    }

    report.push_str("\nConnections:\n");
    for node in network.nodes() {
        match connection_info(node) {
            Ok(info) => {
                let _ = writeln!(report, "  {:<10} {}", node.name(), describe_connection(&info));
            }
            Err(e) => {
                let _ = writeln!(report, "  {:<10} unavailable: {}", node.name(), e);
            }
        }
    }
    report
}

/// Every broken network/chart rule in `store`, one line each.
pub fn audit_report(store: &Store) -> Vec<String> {
    store
        .networks()
        .iter()
        .flat_map(|network| {
            store
                .audit(network.id())
                .into_iter()
                .map(move |issue| format!("network {}: {:?}", network.id(), issue))
        })
        .collect()
}

pub fn describe_removal(name: &str, outcome: &NodeRemoval) -> String {
    match outcome {
        NodeRemoval::Removed { kind, links } => format!(
            "Removed {} node {} and {} link(s)",
            kind.as_str(),
            name,
            links.len()
        ),
        NodeRemoval::InUseAsBackend { dependents } => format!(
            "{} is the backend of {}; move those nodes first",
            name,
            dependents.join(", ")
        ),
        NodeRemoval::NotFound => format!("No node named {}", name),
    }
}

fn node_counts(args: &ArgMatches) -> NodeCounts {
    let count = |name: &str| args.get_one::<usize>(name).copied().unwrap_or_default();
    NodeCounts {
        lnd: count("lnd"),
        c_lightning: count("c-lightning"),
        eclair: count("eclair"),
        bitcoind: count("bitcoind"),
    }
}

fn network_id(args: &ArgMatches) -> Result<NetworkId> {
    args.get_one::<u32>("id")
        .copied()
        .context("a network id is required")
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a str> {
    args.get_one::<String>(name)
        .map(String::as_str)
        .with_context(|| format!("--{} is required", name))
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

// Handlers

pub fn handle_init(args: &ArgMatches, config: &Config) -> Result<()> {
    print_divider();
    println!("{}", "  LNSIM INITIALIZATION".bright_white().bold());
    print_divider();
    println!();

    let force = args.get_flag("force");
    let data_dir = &config.data_dir;
    fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create {}", data_dir.display()))?;
    fs::create_dir_all(config.networks_dir())?;
    println!(
        "{} Data directory: {}",
        "✓".green().bold(),
        data_dir.display().to_string().bright_white()
    );

    let config_path = config.config_path();
    if config_path.exists() {
        println!("{} Keeping existing {}", "→".blue(), config_path.display());
    } else {
        config.save(&config_path)?;
        println!("{} Wrote {}", "✓".green().bold(), config_path.display());
    }

    let db_path = config.database_path();
    if Database::exists(&db_path) {
        if !force {
            println!(
                "{} Database already exists at {} (use --force to recreate it)",
                "⚠".yellow().bold(),
                db_path.display()
            );
            return Ok(());
        }
        Database::drop(&db_path)?;
        println!("{} Deleted existing database", "✓".green().bold());
    }
    Database::new(&db_path)?;
    println!("{} Database: {}", "✓".green().bold(), db_path.display());
    Ok(())
}

pub fn handle_network_create(args: &ArgMatches, config: &Config) -> Result<()> {
    let name = required(args, "name")?;
    let counts = node_counts(args);
    let (mut db, mut store) = open_store(config)?;

    if store.networks().iter().any(|n| n.name() == name) {
        bail!("a network named '{}' already exists", name);
    }
    let id = store.create_network(name, counts, &config.networks_dir())?;
    save_store(&mut db, &store)?;

    println!(
        "{} Created network {} '{}' with {} lightning and {} bitcoin node(s)",
        "✓".green().bold(),
        id,
        name,
        counts.lightning(),
        counts.bitcoind
    );
    Ok(())
}

pub fn handle_network_list(config: &Config) -> Result<()> {
    let (_db, store) = open_store(config)?;
    if store.networks().is_empty() {
        println!("No networks yet. Create one with `lnsim network create -n <NAME>`.");
        return Ok(());
    }
    for network in store.networks() {
        println!("{}", network_summary(network));
    }
    Ok(())
}

pub fn handle_network_show(args: &ArgMatches, config: &Config) -> Result<()> {
    let id = network_id(args)?;
    let (_db, store) = open_store(config)?;
    let (Some(network), Some(chart)) = (store.network(id), store.chart(id)) else {
        bail!("network {} not found", id);
    };

    print!("{}", network_report(network, chart));
    let issues = store.audit(id);
    if !issues.is_empty() {
        println!("\n{}", "⚠ Inconsistencies".yellow().bold());
        for issue in issues {
            println!("  {:?}", issue);
        }
    }
    Ok(())
}

pub fn handle_network_remove(args: &ArgMatches, config: &Config) -> Result<()> {
    let id = network_id(args)?;
    let (mut db, mut store) = open_store(config)?;
    let Some(network) = store.remove_network(id) else {
        bail!("network {} not found", id);
    };
    save_store(&mut db, &store)?;
    println!(
        "{} Removed network {} '{}'",
        "✓".green().bold(),
        id,
        network.name()
    );
    Ok(())
}

pub fn handle_node_remove(args: &ArgMatches, config: &Config) -> Result<()> {
    let id = network_id(args)?;
    let name = required(args, "name")?;
    let (mut db, mut store) = open_store(config)?;

    let outcome = store.remove_node(id, name);
    let message = describe_removal(name, &outcome);
    match outcome {
        NodeRemoval::Removed { .. } => {
            save_store(&mut db, &store)?;
            println!("{} {}", "✓".green().bold(), message);
            Ok(())
        }
        _ => bail!(message),
    }
}

pub async fn handle_backend_change(args: &ArgMatches, config: &Config) -> Result<()> {
    let id = network_id(args)?;
    let node = required(args, "node")?;
    let backend = required(args, "backend")?;
    let (mut db, store) = open_store(config)?;
    let store = shared(store);

    let routing = store.lock().await.link_completed(
        id,
        Endpoint::new(node, PORT_BACKEND),
        Endpoint::new(backend, PORT_BACKEND),
    );
    if !matches!(routing, LinkRouting::ChangeBackend { .. }) {
        bail!(
            "cannot move {} to {}: it must be a lightning node and {} a bitcoin node other than its current backend",
            node,
            backend,
            backend
        );
    }

    let executor = OfflineExecutor::new(store.clone());
    let confirmation = confirm_change_backend(&store, &executor).await;
    let mut store = store.lock().await;
    match confirmation {
        Confirmation::Finalized => {
            save_store(&mut db, &store)?;
            println!(
                "{} {} now syncs against {}",
                "✓".green().bold(),
                node,
                backend
            );
            Ok(())
        }
        Confirmation::Failed(message) => {
            store.hide_change_backend();
            bail!(message)
        }
        Confirmation::Discarded(reason) => bail!("backend change discarded: {:?}", reason),
    }
}

pub async fn handle_start(args: &ArgMatches, config: &Config) -> Result<()> {
    let id = network_id(args)?;
    let (mut db, store) = open_store(config)?;
    let Some(network) = store.network(id) else {
        bail!("network {} not found", id);
    };

    let multi = MultiProgress::new();
    let mut bars = HashMap::new();
    for node in network.nodes() {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.set_style(spinner_style());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_message(format!("{}: starting", node.name()));
        bars.insert(node.name().to_string(), bar);
    }
    let bars = Arc::new(bars);

    let bars_clone = bars.clone();
    let callback: StatusCallback = Arc::new(move |name: &str, status: Status| {
        if let Some(bar) = bars_clone.get(name) {
            bar.finish_with_message(format!("{}: {}", name, status_label(status)));
        }
    });

    let store = shared(store);
    let probe = HttpProbe::from_config(&config.probe)?;
    let monitor = NetworkMonitor::new(store.clone(), probe).with_status_callback(callback);
    let status = monitor.start_network(id).await?;

    // nodes that were already running never report back
    for bar in bars.values() {
        if !bar.is_finished() {
            bar.finish_and_clear();
        }
    }

    let store = store.lock().await;
    save_store(&mut db, &store)?;
    println!("\nNetwork {} is {}", id, status_label(status));
    if status == Status::Error {
        if let Some(network) = store.network(id) {
            for node in network.nodes().filter(|n| n.status() == Status::Error) {
                println!(
                    "  {} {}: {}",
                    "✗".red().bold(),
                    node.name(),
                    node.error_msg().unwrap_or("unknown error")
                );
            }
        }
    }
    Ok(())
}

pub async fn handle_stop(args: &ArgMatches, config: &Config) -> Result<()> {
    let id = network_id(args)?;
    let (mut db, store) = open_store(config)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(spinner_style());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!("Stopping network {}", id));

    let store = shared(store);
    let probe = HttpProbe::from_config(&config.probe)?;
    let status = NetworkMonitor::new(store.clone(), probe)
        .stop_network(id)
        .await?;
    spinner.finish_and_clear();

    save_store(&mut db, &*store.lock().await)?;
    println!("Network {} is {}", id, status_label(status));
    Ok(())
}

pub fn handle_export(args: &ArgMatches, config: &Config) -> Result<()> {
    let output = args
        .get_one::<PathBuf>("output")
        .context("--output is required")?;
    let (_db, store) = open_store(config)?;

    store.to_file().write_json(output)?;
    println!(
        "{} Exported {} network(s) to {}",
        "✓".green().bold(),
        store.networks().len(),
        output.display()
    );
    Ok(())
}

pub fn handle_import(args: &ArgMatches, config: &Config) -> Result<()> {
    let input = args.get_one::<PathBuf>("PATH").context("a file is required")?;
    let file = NetworksFile::read_json(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let (mut db, _) = open_store(config)?;

    let store = Store::from_file(file, config.zoom);
    let issues = audit_report(&store);
    if !issues.is_empty() {
        println!("{}", "⚠ Inconsistencies".yellow().bold());
        for issue in &issues {
            println!("  {}", issue);
        }
        bail!(
            "{} is not a consistent export ({} issue(s)), nothing was imported",
            input.display(),
            issues.len()
        );
    }
    save_store(&mut db, &store)?;
    println!(
        "{} Imported {} network(s) from {}",
        "✓".green().bold(),
        store.networks().len(),
        input.display()
    );
    Ok(())
}

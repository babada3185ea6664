use clap::ArgMatches;
use colored::Colorize;
use commands::command_argument_builder;
use lnsim::handlers::*;
use lnsim_core::config::Config;
use lnsim_core::print_banner;
use tracing::Level;

mod commands;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    if chosen_command.get_flag("verbose") {
        tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt::init();
    }

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    if chosen_command.subcommand().is_none() {
        return;
    }

    let data_dir = chosen_command
        .get_one::<String>("data-dir")
        .map(String::as_str)
        .unwrap_or(lnsim_core::config::DEFAULT_DATA_DIR);
    let config = match load_config(data_dir) {
        Ok(config) => config,
        Err(e) => exit_with(e),
    };

    if let Err(e) = dispatch(&chosen_command, &config).await {
        exit_with(e);
    }
}

async fn dispatch(chosen_command: &ArgMatches, config: &Config) -> anyhow::Result<()> {
    match chosen_command.subcommand() {
        Some(("init", primary_command)) => handle_init(primary_command, config),
        Some(("network", primary_command)) => match primary_command.subcommand() {
            Some(("create", secondary_command)) => handle_network_create(secondary_command, config),
            Some(("list", _)) => handle_network_list(config),
            Some(("show", secondary_command)) => handle_network_show(secondary_command, config),
            Some(("remove", secondary_command)) => handle_network_remove(secondary_command, config),
            _ => unreachable!("clap should ensure we don't get here"),
        },
        Some(("node", primary_command)) => match primary_command.subcommand() {
            Some(("remove", secondary_command)) => handle_node_remove(secondary_command, config),
            _ => unreachable!("clap should ensure we don't get here"),
        },
        Some(("backend", primary_command)) => match primary_command.subcommand() {
            Some(("change", secondary_command)) => {
                handle_backend_change(secondary_command, config).await
            }
            _ => unreachable!("clap should ensure we don't get here"),
        },
        Some(("start", primary_command)) => handle_start(primary_command, config).await,
        Some(("stop", primary_command)) => handle_stop(primary_command, config).await,
        Some(("export", primary_command)) => handle_export(primary_command, config),
        Some(("import", primary_command)) => handle_import(primary_command, config),
        _ => unreachable!("clap should ensure we don't get here"),
    }
}

fn exit_with(e: anyhow::Error) -> ! {
    eprintln!("{} {:#}", "✗".red().bold(), e);
    std::process::exit(1);
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

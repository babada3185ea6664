use crate::CLAP_STYLING;
use clap::{arg, command};
use std::path::PathBuf;

fn network_id_arg() -> clap::Arg {
    arg!(-i --"id" <NETWORK_ID>)
        .required(true)
        .help("The id of the network")
        .value_parser(clap::value_parser!(u32))
}

fn count_arg(name: &'static str, help: &'static str, default: &'static str) -> clap::Arg {
    clap::Arg::new(name)
        .long(name)
        .value_name("COUNT")
        .help(help)
        .value_parser(clap::value_parser!(usize))
        .default_value(default)
}

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("lnsim")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("lnsim")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .arg(arg!(-v --"verbose" "Log every state change to stderr").required(false))
        .arg(
            arg!(-d --"data-dir" <PATH>)
                .required(false)
                .global(true)
                .help("Directory holding the lnsim config and database")
                .default_value("~/.lnsim"),
        )
        .subcommand_required(false)
        .subcommand(
            command!("init")
                .about("Initializes the lnsim config and database")
                .arg(
                    arg!(-f --"force")
                        .help("Overwrites any existing database in the data directory")
                        .required(false),
                ),
        )
        .subcommand(
            command!("network")
                .about("Manage simulated networks")
                .subcommand_required(true)
                .subcommand(
                    command!("create")
                        .about("Creates a network of lightning nodes and their bitcoin backends")
                        .arg(
                            arg!(-n --"name" <NAME>)
                                .required(true)
                                .help("The name of the network"),
                        )
                        .arg(count_arg("lnd", "Number of LND nodes", "1"))
                        .arg(count_arg("c-lightning", "Number of c-lightning nodes", "1"))
                        .arg(count_arg("eclair", "Number of eclair nodes", "1"))
                        .arg(count_arg("bitcoind", "Number of bitcoind backends", "1")),
                )
                .subcommand(command!("list").about("Lists all networks"))
                .subcommand(
                    command!("show")
                        .about("Shows the nodes, links and connection details of a network")
                        .arg(network_id_arg()),
                )
                .subcommand(
                    command!("remove")
                        .about("Removes a network")
                        .arg(network_id_arg()),
                ),
        )
        .subcommand(
            command!("node")
                .about("Manage nodes of a network")
                .subcommand_required(true)
                .subcommand(
                    command!("remove")
                        .about("Removes a node and every link touching it")
                        .arg(network_id_arg())
                        .arg(
                            arg!(-n --"name" <NODE>)
                                .required(true)
                                .help("The name of the node"),
                        ),
                ),
        )
        .subcommand(
            command!("backend")
                .about("Manage lightning node backends")
                .subcommand_required(true)
                .subcommand(
                    command!("change")
                        .about("Moves a lightning node to another bitcoin backend")
                        .arg(network_id_arg())
                        .arg(
                            arg!(-n --"node" <NODE>)
                                .required(true)
                                .help("The lightning node to move"),
                        )
                        .arg(
                            arg!(-b --"backend" <BACKEND>)
                                .required(true)
                                .help("The bitcoin node to sync against"),
                        ),
                ),
        )
        .subcommand(
            command!("start")
                .about("Starts a network and waits for every node to come online")
                .arg(network_id_arg()),
        )
        .subcommand(
            command!("stop")
                .about("Stops a network")
                .arg(network_id_arg()),
        )
        .subcommand(
            command!("export")
                .about("Writes every network and chart to a JSON file")
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(true)
                        .help("Destination file")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            command!("import")
                .about("Replaces every network and chart with the contents of a JSON export")
                .arg(
                    arg!(<PATH>)
                        .required(true)
                        .help("File written by `lnsim export`")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
}

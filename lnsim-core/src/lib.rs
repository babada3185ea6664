use colored::Colorize;

pub mod chart;
pub mod config;
pub mod connection;
pub mod data;
pub mod error;
pub mod graph;
pub mod lifecycle;
pub mod model;
pub mod network;
pub mod registry;
pub mod store;
pub mod topology;
pub mod workflow;

pub use error::{CoreError, Result};
pub use store::Store;

pub fn print_banner() {
    let banner = r#"
    ╔══════════════════════════════════════╗
    ║             L N S I M                ║
    ║                                      ║
    ║    simulated lightning networks      ║
    ╚══════════════════════════════════════╝
    "#;
    println!("{}", banner.bright_yellow().bold());
}

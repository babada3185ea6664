// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export the helpers the handlers are built from
pub use handlers::{
    audit_report, describe_removal, load_config, network_report, network_summary, open_store,
    save_store,
};

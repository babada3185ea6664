pub mod error;
pub mod executor;
pub mod monitor;
pub mod probe;

pub use error::ProbeError;
pub use executor::{OfflineExecutor, WorkflowExecutor};
pub use monitor::{NetworkMonitor, SharedStore};
pub use probe::HttpProbe;

mod runtime;
mod service;
mod shutdown;
mod startup;
mod state;
mod types;


pub use runtime::ShutdownRequester;
pub use service::ZonewatchService;
pub use types::{ComponentState, ShutdownReason};

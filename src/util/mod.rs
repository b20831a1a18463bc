//! Utility functions and helpers.

mod hostname;
mod logging;
mod shutdown;

pub use hostname::resolve_hostname;
pub use logging::init_logging;
pub use shutdown::ShutdownSignal;

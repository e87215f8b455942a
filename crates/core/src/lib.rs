// Convoy Core - Queue Logic & Ports
// NO transport, NO infrastructure dependencies

pub mod application;
pub mod domain;
pub mod port;

pub use domain::error::{DomainError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Ambient infrastructure shared by every crate in the workspace:
//! environment configuration, the log sink, and CA bundle discovery.

pub mod ca;
pub mod config;
pub mod logging;

pub use config::{Config, LogFormat, PollMode};
pub use logging::Logger;

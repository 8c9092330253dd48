pub mod config;
pub mod logging;
pub mod server;

pub use config::{parse_target, Config, ConfigError, RedirectRule, TargetConfig};
pub use server::{router, run_server, App, ServeError};

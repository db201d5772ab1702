pub mod config;
pub mod logging;
pub mod telemetry;

pub use config::{Environment, env_or, env_parse_or};
pub use logging::setup_logging;
pub use telemetry::TelemetryGuard;

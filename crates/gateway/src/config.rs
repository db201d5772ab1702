use common::{env_or, env_parse_or};
use inference::DetectorConfig;
use std::env;

pub use common::Environment;

/// Largest accepted request body: the platform's private-endpoint payload cap.
pub const MAX_REQUEST_SIZE: usize = 10 * 1024 * 1024;

pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_HEALTH_ROUTE: &str = "/health";
pub const DEFAULT_PREDICT_ROUTE: &str = "/predict";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub environment: Environment,
    pub http_port: u16,
    pub health_route: String,
    pub predict_route: String,
    pub otel_endpoint: Option<String>,
    pub detector: DetectorConfig,
}

impl GatewayConfig {
    /// Load configuration from the `AIP_*` variables the serving platform injects,
    /// plus the detector settings.
    pub fn from_env() -> Self {
        Self {
            environment: Environment::from_env(),
            http_port: env_parse_or("AIP_HTTP_PORT", DEFAULT_HTTP_PORT),
            health_route: normalize_route(&env_or("AIP_HEALTH_ROUTE", DEFAULT_HEALTH_ROUTE)),
            predict_route: normalize_route(&env_or("AIP_PREDICT_ROUTE", DEFAULT_PREDICT_ROUTE)),
            otel_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .ok()
                .filter(|s| !s.is_empty()),
            detector: DetectorConfig::from_env(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            http_port: DEFAULT_HTTP_PORT,
            health_route: DEFAULT_HEALTH_ROUTE.to_string(),
            predict_route: DEFAULT_PREDICT_ROUTE.to_string(),
            otel_endpoint: None,
            detector: DetectorConfig::default(),
        }
    }
}

/// Routes must start with `/` for the router to accept them.
fn normalize_route(route: &str) -> String {
    let route = route.trim();
    if route.starts_with('/') {
        route.to_string()
    } else {
        format!("/{route}")
    }
}

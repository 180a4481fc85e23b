//! OpenTelemetry Tracing Integration
//!
//! Installs the `tracing` subscriber: an `EnvFilter` plus a fmt layer, and
//! optionally an OTLP exporter for distributed tracing.
//!
//! # Environment Variables
//!
//! - `OTEL_ENABLED`: Set to "true" to export spans (default: false)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: http://localhost:4317)
//! - `OTEL_SERVICE_NAME`: Service name for traces (default: tradepulse-feed)
//!
//! # Usage
//!
//! ```ignore
//! use tradepulse_feed::infrastructure::telemetry;
//!
//! // Initialize at startup (returns guard that must be kept alive)
//! let _guard = telemetry::init();
//! ```

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::infrastructure::config::{EnvLookup, ProcessEnv};

/// Log levels applied on top of `RUST_LOG`, one per crate target.
const DEFAULT_DIRECTIVES: [&str; 4] = [
    "tradepulse_feed=info",
    "tradepulse_watch=info",
    "tungstenite=warn",
    "hyper=warn",
];

/// Service name for OpenTelemetry traces.
const DEFAULT_SERVICE_NAME: &str = "tradepulse-feed";

/// Default OTLP gRPC endpoint.
const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4317";

/// Guard that shuts down OpenTelemetry when dropped.
pub struct TelemetryGuard {
    tracer_provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.tracer_provider.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("Failed to shutdown OpenTelemetry tracer provider: {e}");
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Whether OpenTelemetry export is enabled.
    pub enabled: bool,
    /// OTLP exporter endpoint.
    pub otlp_endpoint: String,
    /// Service name for traces.
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            otlp_endpoint: DEFAULT_OTLP_ENDPOINT.to_string(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(&ProcessEnv)
    }

    /// Create configuration from an arbitrary variable source.
    #[must_use]
    pub fn from_lookup(env: &impl EnvLookup) -> Self {
        let defaults = Self::default();

        let enabled = env
            .get("OTEL_ENABLED")
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));

        Self {
            enabled,
            otlp_endpoint: env
                .get("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or(defaults.otlp_endpoint),
            service_name: env
                .get("OTEL_SERVICE_NAME")
                .unwrap_or(defaults.service_name),
        }
    }

    /// Override the service name unless `OTEL_SERVICE_NAME` set one.
    #[must_use]
    pub fn with_default_service_name(mut self, name: &str) -> Self {
        if self.service_name == DEFAULT_SERVICE_NAME {
            self.service_name = name.to_string();
        }
        self
    }
}

/// Initialize telemetry with default configuration from environment.
///
/// Returns a guard that must be kept alive for the duration of the program.
/// When the guard is dropped, OpenTelemetry will be properly shut down.
#[must_use]
pub fn init() -> TelemetryGuard {
    init_with_config(TelemetryConfig::from_env())
}

/// Initialize telemetry with custom configuration.
///
/// Returns a guard that must be kept alive for the duration of the program.
#[must_use]
#[allow(clippy::expect_used)]
pub fn init_with_config(config: TelemetryConfig) -> TelemetryGuard {
    let env_filter = DEFAULT_DIRECTIVES
        .iter()
        .fold(EnvFilter::from_default_env(), |filter, directive| {
            filter.add_directive(directive.parse().expect("static log directive is valid"))
        });

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if !config.enabled {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();

        return TelemetryGuard {
            tracer_provider: None,
        };
    }

    let otlp_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&config.otlp_endpoint)
        .build()
        .expect("Failed to create OTLP exporter");

    let tracer_provider = SdkTracerProvider::builder()
        .with_batch_exporter(otlp_exporter)
        .with_resource(
            opentelemetry_sdk::Resource::builder()
                .with_service_name(config.service_name.clone())
                .build(),
        )
        .build();

    let tracer = tracer_provider.tracer(config.service_name);
    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(otel_layer)
        .init();

    TelemetryGuard {
        tracer_provider: Some(tracer_provider),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directives_cover_both_binaries() {
        for directive in DEFAULT_DIRECTIVES {
            assert!(
                directive.parse::<tracing_subscriber::filter::Directive>().is_ok(),
                "{directive}"
            );
        }
        assert!(DEFAULT_DIRECTIVES.contains(&"tradepulse_feed=info"));
        assert!(DEFAULT_DIRECTIVES.contains(&"tradepulse_watch=info"));
    }

    #[test]
    fn default_config_is_disabled() {
        let config = TelemetryConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.otlp_endpoint, DEFAULT_OTLP_ENDPOINT);
        assert_eq!(config.service_name, DEFAULT_SERVICE_NAME);
    }

    #[test]
    fn enabled_only_when_true() {
        let on = TelemetryConfig::from_lookup(&|key: &str| {
            (key == "OTEL_ENABLED").then(|| "TRUE".to_string())
        });
        let off = TelemetryConfig::from_lookup(&|key: &str| {
            (key == "OTEL_ENABLED").then(|| "yes".to_string())
        });
        assert!(on.enabled);
        assert!(!off.enabled);
    }

    #[test]
    fn explicit_service_name_wins() {
        let config = TelemetryConfig::from_lookup(&|key: &str| {
            (key == "OTEL_SERVICE_NAME").then(|| "custom".to_string())
        })
        .with_default_service_name("tradepulse-watch");
        assert_eq!(config.service_name, "custom");

        let config = TelemetryConfig::default().with_default_service_name("tradepulse-watch");
        assert_eq!(config.service_name, "tradepulse-watch");
    }
}

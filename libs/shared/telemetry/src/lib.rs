// [libs/shared/telemetry/src/lib.rs]
//! Tracing/log initialization for the guardian workspace.
//!
//! Mirrors the teacher's `heimdall` observer: a dynamic `EnvFilter` layered
//! with either a compact human-readable formatter or a flat JSON formatter,
//! plus a panic hook that routes thread collapses through `tracing` instead
//! of letting them vanish into stderr unattributed.

use std::panic;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt as formatting_layer, EnvFilter};

/// Output format for structured logs, set via `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    pub fn parse(raw: &str) -> LogFormat {
        match raw.to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

/// Initializes the global tracing subscriber for `service_name`.
///
/// `level` is the default directive used when `RUST_LOG` is unset (e.g.
/// `"info"`, `"debug"`); `format` selects between the two renderers.
/// Panics if a global subscriber has already been installed — callers are
/// expected to invoke this exactly once, from the composition root.
pub fn init_tracing(service_name: &str, level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("{service_name}={level},tower_http=warn,hyper=warn").into()
    });

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(formatting_layer::layer().json().flatten_event(true))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(formatting_layer::layer().compact().with_target(false))
                .init();
        }
    }

    install_panic_hook(service_name);

    tracing::info!(service = service_name, "telemetry initialized");
}

fn install_panic_hook(service_name: &str) {
    let service = service_name.to_string();

    panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_else(|| "unknown".to_string());

        let payload = panic_info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| panic_info.payload().downcast_ref::<String>().map(|s| s.as_str()))
            .unwrap_or("<non-string panic payload>");

        tracing::error!(
            target: "panic",
            service = %service,
            location = %location,
            "thread panicked: {payload}"
        );
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_formats() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("text"), LogFormat::Text);
        assert_eq!(LogFormat::parse("garbage"), LogFormat::Text);
    }
}

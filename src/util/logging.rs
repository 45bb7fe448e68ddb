//! Structured logging setup
//!
//! Logs go to stderr so command output on stdout stays machine-readable.
//! `RUST_LOG`, when set, takes precedence over the configured level.
//!
//! ```no_run
//! use aquasense::util::logging;
//!
//! // AQUASENSE_LOG_LEVEL=debug AQUASENSE_LOG_JSON=true
//! logging::init_from_env();
//! tracing::info!("started");
//! ```

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Crates whose debug output drowns out ours
const NOISY_TARGETS: &[&str] = &["h2", "hyper", "hyper_util", "reqwest", "rustls"];

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Minimum level for this crate's events
    pub level: Level,

    /// One JSON object per event instead of human-readable lines
    pub use_json: bool,

    /// Include the module target (e.g. `aquasense::ai::transport`)
    pub include_target: bool,

    /// Include file and line number
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: true,
            include_location: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Reads `AQUASENSE_LOG_LEVEL` and `AQUASENSE_LOG_JSON`
    pub fn from_env() -> Self {
        let level = env::var("AQUASENSE_LOG_LEVEL")
            .map(|s| parse_level(&s))
            .unwrap_or(Level::INFO);

        let use_json = env::var("AQUASENSE_LOG_JSON")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(false);

        Self {
            level,
            use_json,
            // Location is only worth the noise when debugging
            include_location: level >= Level::DEBUG,
            ..Default::default()
        }
    }
}

/// Parses a level name case-insensitively, defaulting to INFO
pub fn parse_level(level_str: &str) -> Level {
    match level_str.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

/// Filter for `config`, honoring `RUST_LOG` when it is set
pub fn build_filter(config: &LoggingConfig) -> EnvFilter {
    if env::var("RUST_LOG").is_ok() {
        return EnvFilter::from_default_env();
    }

    let mut directives = vec![format!("aquasense={}", config.level)];
    directives.extend(NOISY_TARGETS.iter().map(|t| format!("{}=warn", t)));

    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(config.level).into())
        .parse_lossy(directives.join(","))
}

/// Installs the global subscriber. Later calls are no-ops.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = build_filter(&config);

        let layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(config.include_target)
            .with_file(config.include_location)
            .with_line_number(config.include_location);

        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(layer.json())
                .init();
        } else {
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
    });
}

pub fn init_from_env() {
    init_logging(LoggingConfig::from_env());
}

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct LoggingConfig {
    /// A level (`trace`, `debug`, `info`, `warn`/`warning`, `error`) or an
    /// `EnvFilter` directive string such as `info,sift.complete=trace`.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Emit one JSON object per event instead of text lines.
    #[serde(default)]
    pub json: bool,

    #[serde(default = "default_true")]
    pub stderr: bool,

    /// Append-only log file. When it cannot be opened the other sinks still
    /// work and a warning is logged once the subscriber is up.
    #[serde(default)]
    #[schemars(with = "Option<String>")]
    pub file: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
            stderr: true,
            file: None,
        }
    }
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_owned()
    }

    /// `level` as filter directives: level names are canonicalized, anything
    /// else passes through untouched.
    pub(crate) fn directives(&self) -> &str {
        let level = self.level.trim();
        match level.to_ascii_lowercase().as_str() {
            "" | "info" => "info",
            "trace" => "trace",
            "debug" => "debug",
            "warn" | "warning" => "warn",
            "error" => "error",
            _ => level,
        }
    }

    /// The filter for this config with `RUST_LOG` merged in.
    pub fn env_filter(&self) -> EnvFilter {
        let rust_log = std::env::var("RUST_LOG").ok();
        self.env_filter_with(rust_log.as_deref())
    }

    /// Config directives first, then `rust_log`, so `RUST_LOG` wins for
    /// targets both mention. Unparsable input degrades to the config alone,
    /// then to `info`.
    fn env_filter_with(&self, rust_log: Option<&str>) -> EnvFilter {
        let own = self.directives();
        let merged = rust_log
            .map(str::trim)
            .filter(|extra| !extra.is_empty())
            .and_then(|extra| EnvFilter::try_new(format!("{own},{extra}")).ok());
        merged
            .or_else(|| EnvFilter::try_new(own).ok())
            .unwrap_or_else(|| EnvFilter::default().add_directive(LevelFilter::INFO.into()))
    }
}

/// Combine the configured sinks. The error is the log file's open failure.
fn sinks(config: &LoggingConfig) -> (BoxMakeWriter, Option<std::io::Error>) {
    let stderr = config.stderr.then(|| {
        if cfg!(debug_assertions) {
            // Lets `cargo test` capture output.
            BoxMakeWriter::new(tracing_subscriber::fmt::writer::TestWriter::with_stderr)
        } else {
            BoxMakeWriter::new(std::io::stderr)
        }
    });

    let (file, open_error) = match &config.file {
        None => (None, None),
        Some(path) => match std::fs::OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => (Some(Arc::new(file)), None),
            Err(err) => (None, Some(err)),
        },
    };

    let writer = match (stderr, file) {
        (Some(stderr), Some(file)) => BoxMakeWriter::new(stderr.and(file)),
        (Some(stderr), None) => stderr,
        (None, Some(file)) => BoxMakeWriter::new(file),
        (None, None) => BoxMakeWriter::new(std::io::sink),
    };
    (writer, open_error)
}

static INSTALLED: OnceLock<()> = OnceLock::new();

/// Install the global `tracing` subscriber described by `config`.
///
/// Only the first call in a process has an effect.
pub fn init_tracing(config: &LoggingConfig) {
    INSTALLED.get_or_init(|| {
        let (writer, open_error) = sinks(config);
        let layer: Box<dyn tracing_subscriber::Layer<_> + Send + Sync> = if config.json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .boxed()
        };

        let installed = tracing_subscriber::registry()
            .with(config.env_filter())
            .with(layer)
            .try_init()
            .is_ok();
        if let (true, Some(err), Some(path)) = (installed, open_error, &config.file) {
            tracing::warn!(
                target: "sift.config",
                path = %path.display(),
                error = %err,
                "cannot open log file; logging to the remaining sinks"
            );
        }
    });
}

//! Logging configuration for the monitor.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the binary (or any embedding application) through [`setup::init_logging`].

/// Truncates a string to at most `max_length` bytes, on a character boundary.
///
/// Used for error text and other unbounded values before they are logged.
pub fn truncate_field(value: &str, max_length: usize) -> String {
    if value.len() <= max_length {
        return value.to_string();
    }
    let mut end = max_length;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...(truncated)", &value[..end])
}

/// Subscriber setup.
pub mod setup {
    use tracing::Level;

    /// Configuration for the global subscriber.
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        /// Log level for everything outside this crate
        pub level: Level,
        /// Log level for the `dq_monitor` target
        pub monitor_level: Level,
        /// Whether to emit JSON lines instead of human-readable output
        pub json_format: bool,
        /// Environment filter override
        pub env_filter: Option<String>,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: Level::INFO,
                monitor_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }
    }

    impl LoggingConfig {
        /// JSON output with dependencies at `warn` and this crate at `info`.
        pub fn production() -> Self {
            Self {
                level: Level::WARN,
                monitor_level: Level::INFO,
                json_format: true,
                env_filter: None,
            }
        }

        pub fn with_level(mut self, level: Level) -> Self {
            self.level = level;
            self
        }

        pub fn with_monitor_level(mut self, level: Level) -> Self {
            self.monitor_level = level;
            self
        }

        pub fn with_json_format(mut self, enabled: bool) -> Self {
            self.json_format = enabled;
            self
        }

        pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
            self.env_filter = Some(filter.into());
            self
        }

        /// Builds the environment filter string, e.g. `info,dq_monitor=debug`.
        pub fn env_filter(&self) -> String {
            if let Some(ref filter) = self.env_filter {
                filter.clone()
            } else {
                format!(
                    "{},dq_monitor={}",
                    self.level.as_str().to_lowercase(),
                    self.monitor_level.as_str().to_lowercase()
                )
            }
        }
    }

    /// Installs a global subscriber.
    ///
    /// `RUST_LOG` takes precedence over the configured filter.
    ///
    /// ```rust,no_run
    /// use dq_monitor::logging::setup::{init_logging, LoggingConfig};
    ///
    /// init_logging(LoggingConfig::default().with_json_format(true)).unwrap();
    /// ```
    pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

        let fmt_layer = if config.json_format {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .boxed()
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;

        Ok(())
    }
}

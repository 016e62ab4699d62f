use crate::config::{Config, LogFormat};
use log::{LevelFilter, Log, Metadata, Record};
use serde::Serialize;
use simplelog::{self, ConfigBuilder, LevelPadding, SharedLogger, TargetPadding};
use std::io::Write;

/// Modules to filter out from logging when not in Trace mode.
/// These are typically verbose dependencies that clutter normal log output.
const FILTERED_MODULES: &[&str] = &["hyper", "axum", "tower", "tokio", "mio", "reqwest"];

/// Width the component (log target) column is padded to in progressive output.
const COMPONENT_WIDTH: usize = 8;

pub struct Logger {}

impl Logger {
    /// Initializes the global logger with configuration based on the provided Config.
    ///
    /// When the log level is set to Trace, all logs including dependency logs are shown.
    /// For all other log levels, verbose dependency logs are filtered out. A disabled
    /// logger installs nothing and turns the `log` facade off. Calling this more than
    /// once keeps the first installed logger.
    pub fn init_logger(config: &Config) {
        if !config.log_enabled {
            log::set_max_level(LevelFilter::Off);
            return;
        }

        let log_level_filter = Self::convert_level_filter(config.log_level_filter);
        let apply_filters = Self::should_filter_dependencies(config.log_level_filter);

        let result = match config.log_format {
            LogFormat::Progressive => simplelog::TermLogger::init(
                log_level_filter,
                Self::build_log_config(apply_filters),
                simplelog::TerminalMode::Stderr,
                simplelog::ColorChoice::Auto,
            ),
            LogFormat::Json => simplelog::CombinedLogger::init(vec![JsonLogger::new(
                config.log_level_filter,
                apply_filters,
            )]),
        };

        if result.is_err() {
            log::debug!("Logger already installed; keeping the existing one");
        }
    }

    /// Converts log::LevelFilter to simplelog::LevelFilter.
    fn convert_level_filter(level: LevelFilter) -> simplelog::LevelFilter {
        match level {
            LevelFilter::Off => simplelog::LevelFilter::Off,
            LevelFilter::Error => simplelog::LevelFilter::Error,
            LevelFilter::Warn => simplelog::LevelFilter::Warn,
            LevelFilter::Info => simplelog::LevelFilter::Info,
            LevelFilter::Debug => simplelog::LevelFilter::Debug,
            LevelFilter::Trace => simplelog::LevelFilter::Trace,
        }
    }

    /// Determines whether dependency logging should be filtered.
    ///
    /// Returns `false` for Trace level (show all logs), `true` for all other levels.
    fn should_filter_dependencies(level: LevelFilter) -> bool {
        level != LevelFilter::Trace
    }

    /// Builds the progressive line layout: target, RFC 3339 time, padded level.
    ///
    /// When `apply_filters` is true, logs from noisy dependencies are suppressed.
    fn build_log_config(apply_filters: bool) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder
            .set_time_format_rfc3339()
            .set_target_level(LevelFilter::Error)
            .set_target_padding(TargetPadding::Right(COMPONENT_WIDTH))
            .set_level_padding(LevelPadding::Right)
            .set_thread_level(LevelFilter::Off);

        if apply_filters {
            for module in FILTERED_MODULES {
                builder.add_filter_ignore_str(module);
            }
        }

        builder.build()
    }
}

/// One structured log line.
#[derive(Serialize)]
struct JsonLine<'a> {
    timestamp: String,
    level: String,
    component: &'a str,
    message: String,
}

/// Writes each record as a single JSON object on stderr.
pub struct JsonLogger {
    level: LevelFilter,
    apply_filters: bool,
}

impl JsonLogger {
    pub fn new(level: LevelFilter, apply_filters: bool) -> Box<JsonLogger> {
        Box::new(JsonLogger {
            level,
            apply_filters,
        })
    }

    fn is_filtered(&self, target: &str) -> bool {
        self.apply_filters && FILTERED_MODULES.iter().any(|module| target.starts_with(module))
    }

    fn format(record: &Record<'_>) -> Option<String> {
        let line = JsonLine {
            timestamp: chrono::Utc::now().to_rfc3339(),
            level: record.level().as_str().to_lowercase(),
            component: record.target(),
            message: record.args().to_string(),
        };
        serde_json::to_string(&line).ok()
    }
}

impl Log for JsonLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level && !self.is_filtered(metadata.target())
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Some(line) = Self::format(record) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{line}");
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

impl SharedLogger for JsonLogger {
    fn level(&self) -> LevelFilter {
        self.level
    }

    fn config(&self) -> Option<&simplelog::Config> {
        None
    }

    fn as_log(self: Box<Self>) -> Box<dyn Log> {
        Box::new(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filtered_modules_contains_expected_dependencies() {
        for module in ["hyper", "axum", "tower", "tokio"] {
            assert!(
                FILTERED_MODULES.contains(&module),
                "{module} should be filtered"
            );
        }
    }

    #[test]
    fn test_should_filter_dependencies_trace_level_disables_filtering() {
        // Trace level should NOT filter - we want to see everything for deep debugging
        assert!(
            !Logger::should_filter_dependencies(LevelFilter::Trace),
            "Trace level should disable filtering"
        );
    }

    #[test]
    fn test_should_filter_dependencies_other_levels_enable_filtering() {
        for level in [
            LevelFilter::Off,
            LevelFilter::Error,
            LevelFilter::Warn,
            LevelFilter::Info,
            LevelFilter::Debug,
        ] {
            assert!(
                Logger::should_filter_dependencies(level),
                "{level} should enable filtering"
            );
        }
    }

    #[test]
    fn test_build_log_config_does_not_panic() {
        let _with_filters = Logger::build_log_config(true);
        let _without_filters = Logger::build_log_config(false);
    }

    #[test]
    fn test_json_logger_respects_level_and_filters() {
        let logger = JsonLogger::new(LevelFilter::Info, true);

        let info = Metadata::builder().level(log::Level::Info).target("engine").build();
        let debug = Metadata::builder().level(log::Level::Debug).target("engine").build();
        let noisy = Metadata::builder().level(log::Level::Info).target("hyper::proto").build();

        assert!(logger.enabled(&info));
        assert!(!logger.enabled(&debug));
        assert!(!logger.enabled(&noisy));
    }

    #[test]
    fn test_json_line_shape() {
        let line = JsonLogger::format(
            &Record::builder()
                .args(format_args!("Joining meeting: abc"))
                .level(log::Level::Warn)
                .target("client")
                .build(),
        )
        .unwrap();

        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["level"], "warn");
        assert_eq!(value["component"], "client");
        assert_eq!(value["message"], "Joining meeting: abc");
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_convert_level_filter_all_variants() {
        for level in [
            LevelFilter::Off,
            LevelFilter::Error,
            LevelFilter::Warn,
            LevelFilter::Info,
            LevelFilter::Debug,
            LevelFilter::Trace,
        ] {
            assert_eq!(Logger::convert_level_filter(level) as u8, level as u8);
        }
    }
}

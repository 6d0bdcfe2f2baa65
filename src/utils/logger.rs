use crate::utils::error::{DraftError, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init_cli_logger(verbose: bool) {
    init_cli_logger_with_level(verbose, None);
}

/// 與 `init_cli_logger` 相同，另外接受設定檔中的 log level（RUST_LOG 與 --verbose 優先）
pub fn init_cli_logger_with_level(verbose: bool, level: Option<&str>) {
    tracing_subscriber::registry()
        .with(default_filter(verbose, level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// JSON lines, for runs whose log is collected by another tool
pub fn init_json_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(default_filter(verbose, None))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .json(),
        )
        .init();
}

/// A bare level such as `debug` applies to this crate only; anything with
/// `=` or `,` is taken as a full filter directive.
pub fn fallback_directive(verbose: bool, level: Option<&str>) -> String {
    if verbose {
        return "diplo_draft=debug,info".to_string();
    }
    match level.map(str::trim).filter(|l| !l.is_empty()) {
        Some(level) if level.contains('=') || level.contains(',') => level.to_string(),
        Some(level) => format!("diplo_draft={},info", level),
        None => "diplo_draft=info".to_string(),
    }
}

/// Rejects a configured level the subscriber would not understand.
pub fn validate_level(level: &str) -> Result<()> {
    EnvFilter::try_new(fallback_directive(false, Some(level)))
        .map(|_| ())
        .map_err(|e| DraftError::ConfigError {
            message: format!("invalid log level '{}': {}", level, e),
        })
}

fn default_filter(verbose: bool, level: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directive = fallback_directive(verbose, level);
        EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("diplo_draft=info"))
    })
}

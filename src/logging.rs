use anyhow::{Result, anyhow};
use std::env;
use std::io::IsTerminal;
use tracing::level_filters::LevelFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

/// `json` and `text` are honoured as given; anything else picks text for an
/// interactive terminal and JSON otherwise.
pub fn resolve_format(raw: Option<&str>, stdout_is_terminal: bool) -> LogFormat {
    match raw.map(str::trim) {
        Some("json") => LogFormat::Json,
        Some("text") => LogFormat::Text,
        _ if stdout_is_terminal => LogFormat::Text,
        _ => LogFormat::Json,
    }
}

pub fn parse_level(raw: Option<&str>) -> LevelFilter {
    let normalized = raw.map(|v| v.trim().to_ascii_uppercase()).unwrap_or_default();
    match normalized.as_str() {
        "DEBUG" => LevelFilter::DEBUG,
        "WARN" => LevelFilter::WARN,
        "ERROR" => LevelFilter::ERROR,
        _ => LevelFilter::INFO,
    }
}

pub fn init_from_env() -> Result<()> {
    let stdout_is_terminal = std::io::stdout().is_terminal();
    let format = resolve_format(
        env::var("LDPA_LOG_FORMAT").ok().as_deref(),
        stdout_is_terminal,
    );
    let level = parse_level(env::var("LDPA_LOG_LEVEL").ok().as_deref());

    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stdout)
        .with_target(false);

    let installed = match format {
        LogFormat::Json => builder.json().flatten_event(true).try_init(),
        LogFormat::Text => builder.with_ansi(stdout_is_terminal).try_init(),
    };
    installed.map_err(|err| anyhow!("failed to install log subscriber: {err}"))
}

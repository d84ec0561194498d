use std::str::FromStr;
use tracing::Level;

/// JSON lines for CloudWatch. `LOG_LEVEL` overrides the default of INFO.
pub fn init() {
    let level = std::env::var("LOG_LEVEL")
        .ok()
        .and_then(|value| Level::from_str(&value).ok())
        .unwrap_or(Level::INFO);

    tracing_subscriber::fmt()
        .json()
        .with_max_level(level)
        .with_current_span(false)
        .with_span_list(false)
        .with_ansi(false)
        .without_time()
        .with_target(false)
        .with_line_number(true)
        .init();
}

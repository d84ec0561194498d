use thiserror::Error;

/// Failures that abort a run. Pipelines return `anyhow::Result`, so callers
/// recover the category with `downcast_ref::<BenchmarkError>()`.
#[derive(Debug, Error)]
pub enum BenchmarkError {
    #[error("Expected environment variable {0} is not set")]
    MissingEnvVar(String),

    #[error("No client configured for region {0}")]
    UnknownRegion(String),

    #[error("No deployed function with logical id {logical_id} in region {region}")]
    Resolution { logical_id: String, region: String },

    #[error("{call} in {region} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        call: String,
        region: String,
        attempts: u32,
        last_error: String,
    },

    #[error("No traces found for {function} in {region} within the lookback window")]
    NoTraces { function: String, region: String },

    #[error("Trace {trace_id} is malformed: {reason}")]
    MalformedTrace { trace_id: String, reason: String },

    #[error("Configuration {configuration_id} in {region} captured {found} timings, expected {expected}")]
    AggregationShape {
        configuration_id: String,
        region: String,
        found: usize,
        expected: usize,
    },

    #[error("All {total} {operation} failed")]
    AllFailed { operation: String, total: usize },
}

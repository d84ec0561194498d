use crate::trace::TraceTimingRecord;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use shared::error::BenchmarkError;
use shared::matrix::{BenchmarkConfiguration, RuntimeKind, INSTANCES_PER_CONFIGURATION};

/// One published row per configuration: the median instance's timing plus
/// the spread of the other instances. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedReportRow {
    pub region: String,
    pub runtime: RuntimeKind,
    #[serde(with = "memory_mb")]
    pub memory: u16,
    pub package_size: String,
    #[serde(with = "yes_no")]
    pub vpc: bool,
    #[serde(rename = "generatorID")]
    pub generator_id: String,
    pub system_duration: f64,
    pub user_duration: f64,
    pub total_duration: f64,
    pub trace_id: String,
    pub start_time: f64,
    pub start_full_date_time: String,
    pub min_other_system_durations: f64,
    pub max_other_system_durations: f64,
    pub timings_captured: usize,
}

mod yes_no {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "yes" } else { "no" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        match String::deserialize(deserializer)?.as_str() {
            "yes" => Ok(true),
            "no" => Ok(false),
            other => Err(D::Error::custom(format!("expected yes or no, got {other}"))),
        }
    }
}

// Published as "256", not 256.
mod memory_mb {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u16, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u16, D::Error> {
        let value = String::deserialize(deserializer)?;
        value
            .parse()
            .map_err(|_| D::Error::custom(format!("expected memory size in MB, got {value}")))
    }
}

pub fn merge_instance_timings(
    configuration: &BenchmarkConfiguration,
    timings: &[TraceTimingRecord],
) -> Result<AggregatedReportRow> {
    let configuration_id = configuration.configuration_id();
    let instance_prefix = format!("{}I", configuration_id);

    let mut for_configuration: Vec<&TraceTimingRecord> = timings
        .iter()
        .filter(|t| t.region == configuration.region && t.generator_id.starts_with(&instance_prefix))
        .collect();

    let expected = INSTANCES_PER_CONFIGURATION as usize;
    if for_configuration.len() != expected {
        return Err(BenchmarkError::AggregationShape {
            configuration_id,
            region: configuration.region.clone(),
            found: for_configuration.len(),
            expected,
        }
        .into());
    }

    for_configuration.sort_by(|a, b| a.system_duration.total_cmp(&b.system_duration));
    let min = for_configuration[0];
    let median = for_configuration[expected / 2];
    let max = for_configuration[expected - 1];

    Ok(AggregatedReportRow {
        region: median.region.clone(),
        runtime: median.runtime,
        memory: median.memory,
        package_size: median.package_size.clone(),
        vpc: median.vpc,
        generator_id: configuration_id,
        system_duration: median.system_duration,
        user_duration: median.user_duration,
        total_duration: median.total_duration,
        trace_id: median.trace_id.clone(),
        start_time: median.start_time,
        start_full_date_time: median.start_full_date_time.clone(),
        min_other_system_durations: min.system_duration,
        max_other_system_durations: max.system_duration,
        timings_captured: for_configuration.len(),
    })
}

pub fn aggregate_timings(
    configurations: &[BenchmarkConfiguration],
    timings: &[TraceTimingRecord],
) -> Result<Vec<AggregatedReportRow>> {
    configurations
        .iter()
        .map(|configuration| merge_instance_timings(configuration, timings))
        .collect()
}

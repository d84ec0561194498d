use crate::xray::{Trace, TraceQuery, MAX_TRACE_IDS_PER_BATCH};
use anyhow::Result;
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use shared::error::BenchmarkError;
use shared::matrix::RuntimeKind;
use shared::outcome::settle_all;
use shared::page::drain_pages;
use shared::regional::Regional;
use shared::resolver::ResolvedInstance;
use shared::retry::RetryPolicy;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Origin of the segment covering the whole invocation, system time included.
pub const INVOCATION_ORIGIN: &str = "AWS::Lambda";
/// Origin of the segment covering only the function's own code.
pub const FUNCTION_ORIGIN: &str = "AWS::Lambda::Function";

pub const TRACE_LOOKBACK: Duration = Duration::from_secs(60 * 60);

/// Timing of one invocation of one generator instance.
///
/// ```text
/// AWS::Lambda           : |------------------------------------------|
/// AWS::Lambda::Function :                  |-------------------------|
///                          (    system     )(          user          )
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TraceTimingRecord {
    pub generator_id: String,
    pub runtime: RuntimeKind,
    pub memory: u16,
    pub package_size: String,
    pub region: String,
    pub vpc: bool,
    pub system_duration: f64,
    pub user_duration: f64,
    pub total_duration: f64,
    pub trace_id: String,
    pub start_time: f64,
    pub start_full_date_time: String,
}

#[derive(Debug, Deserialize)]
struct SegmentDocument {
    origin: Option<String>,
    start_time: f64,
    end_time: Option<f64>,
    #[serde(default)]
    subsegments: Vec<SubsegmentDocument>,
}

#[derive(Debug, Deserialize)]
struct SubsegmentDocument {
    end_time: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SegmentTiming {
    pub origin: Option<String>,
    pub start_time: f64,
    pub end_time: f64,
}

impl SegmentTiming {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// Subsegments can end after the end time recorded on their parent, so the
/// segment ends at the latest of all of them.
pub fn process_segment(trace_id: &str, document: &str) -> Result<SegmentTiming> {
    let document: SegmentDocument =
        serde_json::from_str(document).map_err(|err| BenchmarkError::MalformedTrace {
            trace_id: trace_id.to_string(),
            reason: format!("unreadable segment document: {err}"),
        })?;

    let end_time = document
        .end_time
        .into_iter()
        .chain(document.subsegments.iter().filter_map(|s| s.end_time))
        .reduce(f64::max)
        .ok_or_else(|| BenchmarkError::MalformedTrace {
            trace_id: trace_id.to_string(),
            reason: "segment has no end time".to_string(),
        })?;

    Ok(SegmentTiming {
        origin: document.origin,
        start_time: document.start_time,
        end_time,
    })
}

pub fn to_3dp(value: f64) -> f64 {
    (value * 1000.0 + 0.5).floor() / 1000.0
}

pub fn process_trace(trace: &Trace, instance: &ResolvedInstance) -> Result<TraceTimingRecord> {
    let segments = trace
        .segment_documents
        .iter()
        .map(|document| process_segment(&trace.id, document))
        .collect::<Result<Vec<_>>>()?;

    let find = |origin: &str| {
        segments
            .iter()
            .find(|s| s.origin.as_deref() == Some(origin))
            .ok_or_else(|| BenchmarkError::MalformedTrace {
                trace_id: trace.id.clone(),
                reason: format!("no {origin} segment"),
            })
    };
    let invocation = find(INVOCATION_ORIGIN)?;
    let function = find(FUNCTION_ORIGIN)?;

    let total_duration = invocation.duration();
    let user_duration = function.duration();
    let configuration = &instance.configuration;

    Ok(TraceTimingRecord {
        generator_id: instance.instance_id.clone(),
        runtime: configuration.runtime,
        memory: configuration.memory,
        package_size: configuration.package_size.to_string(),
        region: configuration.region.clone(),
        vpc: configuration.vpc,
        system_duration: to_3dp(total_duration - user_duration),
        user_duration: to_3dp(user_duration),
        total_duration: to_3dp(total_duration),
        trace_id: trace.id.clone(),
        start_time: invocation.start_time,
        start_full_date_time: human_time(invocation.start_time),
    })
}

fn human_time(epoch_seconds: f64) -> String {
    let seconds = epoch_seconds.floor();
    let nanos = ((epoch_seconds - seconds) * 1e9) as u32;
    Utc.timestamp_opt(seconds as i64, nanos)
        .single()
        .map(|time| time.format("%a %b %d %Y %H:%M:%S UTC").to_string())
        .unwrap_or_default()
}

pub fn epoch_now() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

/// The most recent complete invocation of `instance` within the lookback
/// window ending when `clock` is read. Traces that cannot be split into
/// system and user time are skipped.
pub async fn collect_instance_timing<Q, C>(
    traces: &Regional<Q>,
    instance: &ResolvedInstance,
    policy: RetryPolicy,
    clock: &C,
) -> Result<TraceTimingRecord>
where
    Q: TraceQuery,
    C: Fn() -> f64,
{
    let region = instance.region();
    let client = traces.get(region)?;
    let filter = format!("service(\"{}\")", instance.function);
    let now = clock();
    let start = now - TRACE_LOOKBACK.as_secs_f64();

    let trace_ids = {
        let filter = &filter;
        drain_pages(|token| async move {
            policy
                .run("getTraceSummaries", region, || {
                    client.search_trace_summaries(filter, start, now, token.clone())
                })
                .await
        })
        .await?
    };
    debug!(function = %instance.function, region, traces = trace_ids.len(), "Trace summaries found");

    let mut fetched = Vec::with_capacity(trace_ids.len());
    for batch in trace_ids.chunks(MAX_TRACE_IDS_PER_BATCH) {
        let batch_traces = drain_pages(|token| async move {
            policy
                .run("batchGetTraces", region, || {
                    client.fetch_traces(batch, token.clone())
                })
                .await
        })
        .await?;
        fetched.extend(batch_traces);
    }

    let mut last_malformed = None;
    let latest = fetched
        .iter()
        .filter_map(|trace| match process_trace(trace, instance) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(trace_id = %trace.id, function = %instance.function, region, error = %err, "Skipping trace");
                last_malformed = Some(err);
                None
            }
        })
        .max_by(|a, b| a.start_time.total_cmp(&b.start_time));

    match (latest, last_malformed) {
        (Some(record), _) => Ok(record),
        (None, Some(err)) => Err(err),
        (None, None) => Err(BenchmarkError::NoTraces {
            function: instance.function.clone(),
            region: region.to_string(),
        }
        .into()),
    }
}

/// Collects every instance concurrently. Instances without usable traces are
/// logged and left out, exhausted retries abort the run.
pub async fn collect_timings<Q, C>(
    traces: &Regional<Q>,
    instances: &[ResolvedInstance],
    policy: RetryPolicy,
    clock: &C,
) -> Result<Vec<TraceTimingRecord>>
where
    Q: TraceQuery,
    C: Fn() -> f64,
{
    let mut settled = settle_all(instances.iter().map(|instance| {
        (
            format!("{} ({})", instance.instance_id, instance.region()),
            collect_instance_timing(traces, instance, policy, clock),
        )
    }))
    .await;
    settled.log_failures("collect timings");

    let exhausted = settled.failed.iter().position(|(_, err)| {
        matches!(
            err.downcast_ref::<BenchmarkError>(),
            Some(BenchmarkError::RetriesExhausted { .. })
        )
    });
    if let Some(index) = exhausted {
        return Err(settled.failed.swap_remove(index).1);
    }

    info!(
        collected = settled.succeeded.len(),
        failed = settled.failed.len(),
        "Timings collected"
    );
    Ok(settled.succeeded)
}

//! In-memory stand-ins for X-Ray and S3.

use crate::aggregate::AggregatedReportRow;
use crate::trace::{TraceTimingRecord, FUNCTION_ORIGIN, INVOCATION_ORIGIN};
use crate::xray::{Trace, TraceQuery};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::json;
use shared::matrix::{BenchmarkConfiguration, RuntimeKind};
use shared::page::Page;
use shared::resolver::ResolvedInstance;
use shared::s3::ObjectStore;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

const PAGE_SIZE: usize = 2;

pub fn segment(origin: &str, start: f64, end: f64) -> String {
    json!({
        "id": "53995c3f42cd8ad8",
        "origin": origin,
        "start_time": start,
        "end_time": end,
    })
    .to_string()
}

pub fn instance(configuration: BenchmarkConfiguration, instance_index: u8) -> ResolvedInstance {
    let instance_id = configuration.instance_id(instance_index);
    ResolvedInstance {
        function: format!("fn-{}", instance_id),
        configuration,
        instance_index,
        instance_id,
    }
}

pub fn record(
    configuration: &BenchmarkConfiguration,
    instance_index: u8,
    system_duration: f64,
    trace_id: &str,
) -> TraceTimingRecord {
    TraceTimingRecord {
        generator_id: configuration.instance_id(instance_index),
        runtime: configuration.runtime,
        memory: configuration.memory,
        package_size: configuration.package_size.to_string(),
        region: configuration.region.clone(),
        vpc: configuration.vpc,
        system_duration,
        user_duration: 0.1,
        total_duration: system_duration + 0.1,
        trace_id: trace_id.to_string(),
        start_time: 1547535600.0,
        start_full_date_time: "Tue Jan 15 2019 07:00:00 UTC".to_string(),
    }
}

pub fn row(region: &str, runtime: RuntimeKind, memory: u16, system_duration: f64) -> AggregatedReportRow {
    let configuration = BenchmarkConfiguration::new(runtime, memory, true, region);
    AggregatedReportRow {
        region: region.to_string(),
        runtime,
        memory,
        package_size: configuration.package_size.to_string(),
        vpc: configuration.vpc,
        generator_id: configuration.configuration_id(),
        system_duration,
        user_duration: 0.012,
        total_duration: system_duration + 0.012,
        trace_id: "1-5c3d8a4f-8b7e1a0c2d3e4f5a6b7c8d9e".to_string(),
        start_time: 1547535600.123,
        start_full_date_time: "Tue Jan 15 2019 07:00:00 UTC".to_string(),
        min_other_system_durations: system_duration / 2.0,
        max_other_system_durations: system_duration * 2.0,
        timings_captured: 3,
    }
}

#[derive(Default)]
struct TraceState {
    traces: Vec<(String, Trace)>,
    failing_searches: u32,
    searches: Vec<(String, f64, f64)>,
    batch_sizes: Vec<usize>,
}

/// Search results are paged two ids at a time.
#[derive(Clone, Default)]
pub struct FakeTraces {
    state: Arc<Mutex<TraceState>>,
}

impl FakeTraces {
    pub fn add_invocation(&self, function: &str, trace_id: &str, start: f64, total: f64, user: f64) {
        let end = start + total;
        self.add_trace(
            function,
            Trace {
                id: trace_id.to_string(),
                segment_documents: vec![
                    segment(INVOCATION_ORIGIN, start, end),
                    segment(FUNCTION_ORIGIN, end - user, end),
                ],
            },
        );
    }

    pub fn add_trace(&self, function: &str, trace: Trace) {
        self.state
            .lock()
            .unwrap()
            .traces
            .push((function.to_string(), trace));
    }

    pub fn fail_next_searches(&self, count: u32) {
        self.state.lock().unwrap().failing_searches = count;
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.state.lock().unwrap().batch_sizes.clone()
    }

    pub fn last_search(&self) -> (String, f64, f64) {
        self.state.lock().unwrap().searches.last().cloned().unwrap()
    }
}

#[async_trait]
impl TraceQuery for FakeTraces {
    async fn search_trace_summaries(
        &self,
        filter_expression: &str,
        start_time: f64,
        end_time: f64,
        next_token: Option<String>,
    ) -> Result<Page<String>> {
        let mut state = self.state.lock().unwrap();
        state
            .searches
            .push((filter_expression.to_string(), start_time, end_time));

        if state.failing_searches > 0 {
            state.failing_searches -= 1;
            return Err(anyhow!("ThrottledException: Rate exceeded"));
        }

        let ids: Vec<String> = state
            .traces
            .iter()
            .filter(|(function, _)| filter_expression == format!("service(\"{}\")", function))
            .map(|(_, trace)| trace.id.clone())
            .collect();

        let start: usize = next_token.map(|t| t.parse()).transpose()?.unwrap_or(0);
        let end = (start + PAGE_SIZE).min(ids.len());
        Ok(Page {
            items: ids[start..end].to_vec(),
            next_token: (end < ids.len()).then(|| end.to_string()),
        })
    }

    async fn fetch_traces(
        &self,
        trace_ids: &[String],
        _next_token: Option<String>,
    ) -> Result<Page<Trace>> {
        let mut state = self.state.lock().unwrap();
        state.batch_sizes.push(trace_ids.len());

        let traces = state
            .traces
            .iter()
            .filter(|(_, trace)| trace_ids.contains(&trace.id))
            .map(|(_, trace)| trace.clone())
            .collect();
        Ok(Page::last(traces))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub body: String,
    pub content_type: String,
    pub cache_control: String,
}

/// Listing is paged two keys at a time.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    list_calls: Mutex<usize>,
}

impl MemoryStore {
    pub fn with_keys(keys: &[&str]) -> Self {
        let store = Self::default();
        {
            let mut objects = store.objects.lock().unwrap();
            for key in keys {
                objects.insert(
                    key.to_string(),
                    StoredObject {
                        body: String::new(),
                        content_type: "application/json".to_string(),
                        cache_control: String::new(),
                    },
                );
            }
        }
        store
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn list_calls(&self) -> usize {
        *self.list_calls.lock().unwrap()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        cache_control: &str,
    ) -> Result<()> {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                body: String::from_utf8(body)?,
                content_type: content_type.to_string(),
                cache_control: cache_control.to_string(),
            },
        );
        Ok(())
    }

    async fn list_objects(
        &self,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<Page<String>> {
        *self.list_calls.lock().unwrap() += 1;

        let keys: Vec<String> = self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();

        let start: usize = continuation_token.map(|t| t.parse()).transpose()?.unwrap_or(0);
        let end = (start + PAGE_SIZE).min(keys.len());
        Ok(Page {
            items: keys[start..end].to_vec(),
            next_token: (end < keys.len()).then(|| end.to_string()),
        })
    }
}

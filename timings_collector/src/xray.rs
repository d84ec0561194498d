use anyhow::Result;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_xray::config::Region;
use aws_sdk_xray::primitives::DateTime;
use shared::page::Page;

/// BatchGetTraces rejects requests for more ids than this.
pub const MAX_TRACE_IDS_PER_BATCH: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub id: String,
    pub segment_documents: Vec<String>,
}

#[async_trait]
pub trait TraceQuery: Send + Sync {
    async fn search_trace_summaries(
        &self,
        filter_expression: &str,
        start_time: f64,
        end_time: f64,
        next_token: Option<String>,
    ) -> Result<Page<String>>;

    async fn fetch_traces(
        &self,
        trace_ids: &[String],
        next_token: Option<String>,
    ) -> Result<Page<Trace>>;
}

pub struct XRayTraces {
    client: aws_sdk_xray::Client,
}

impl XRayTraces {
    pub fn new(sdk_config: &SdkConfig, region: &str) -> Self {
        let config = aws_sdk_xray::config::Builder::from(sdk_config)
            .region(Region::new(region.to_string()))
            .build();
        Self {
            client: aws_sdk_xray::Client::from_conf(config),
        }
    }
}

#[async_trait]
impl TraceQuery for XRayTraces {
    async fn search_trace_summaries(
        &self,
        filter_expression: &str,
        start_time: f64,
        end_time: f64,
        next_token: Option<String>,
    ) -> Result<Page<String>> {
        let response = self
            .client
            .get_trace_summaries()
            .start_time(DateTime::from_secs_f64(start_time))
            .end_time(DateTime::from_secs_f64(end_time))
            .filter_expression(filter_expression)
            .set_next_token(next_token)
            .send()
            .await?;

        let items = response
            .trace_summaries
            .unwrap_or_default()
            .into_iter()
            .filter_map(|summary| summary.id)
            .collect();

        Ok(Page {
            items,
            next_token: response.next_token,
        })
    }

    async fn fetch_traces(
        &self,
        trace_ids: &[String],
        next_token: Option<String>,
    ) -> Result<Page<Trace>> {
        let response = self
            .client
            .batch_get_traces()
            .set_trace_ids(Some(trace_ids.to_vec()))
            .set_next_token(next_token)
            .send()
            .await?;

        let items = response
            .traces
            .unwrap_or_default()
            .into_iter()
            .filter_map(|trace| {
                Some(Trace {
                    id: trace.id?,
                    segment_documents: trace
                        .segments
                        .unwrap_or_default()
                        .into_iter()
                        .filter_map(|segment| segment.document)
                        .collect(),
                })
            })
            .collect();

        Ok(Page {
            items,
            next_token: response.next_token,
        })
    }
}

mod aggregate;
mod publish;
mod render;
mod trace;
mod xray;

#[cfg(test)]
mod testing;

use crate::aggregate::{aggregate_timings, AggregatedReportRow};
use crate::publish::{publish_report, update_indexes, Partition};
use crate::trace::{collect_timings, epoch_now};
use crate::xray::{TraceQuery, XRayTraces};
use anyhow::Result;
use chrono::{DateTime, Utc};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use shared::config::Config;
use shared::matrix::build_matrix;
use shared::regional::Regional;
use shared::resolver::{resolve_instances, CloudFormationStacks, StackResources};
use shared::retry::RetryPolicy;
use shared::s3::{ObjectStore, S3Store};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Error> {
    shared::log::init();

    lambda_runtime::run(service_fn(func)).await?;
    Ok(())
}

async fn func(_event: LambdaEvent<Value>) -> Result<()> {
    let config = Config::from_env()?;
    let bucket_name = shared::config::bucket_name()?;
    let sdk_config = aws_config::load_from_env().await;

    let stacks = Regional::build(&config.regions, |region| {
        CloudFormationStacks::new(&sdk_config, region)
    });
    let traces = Regional::build(&config.regions, |region| XRayTraces::new(&sdk_config, region));
    let store = S3Store::new(&sdk_config, &bucket_name);

    let rows = collect_and_publish(
        &stacks,
        &traces,
        &store,
        &config,
        RetryPolicy::standard(),
        Utc::now(),
    )
    .await?;
    info!(rows = rows.len(), bucket = %bucket_name, "Timings published");

    Ok(())
}

async fn collect_and_publish<S, Q, O>(
    stacks: &Regional<S>,
    traces: &Regional<Q>,
    store: &O,
    config: &Config,
    policy: RetryPolicy,
    now: DateTime<Utc>,
) -> Result<Vec<AggregatedReportRow>>
where
    S: StackResources,
    Q: TraceQuery,
    O: ObjectStore,
{
    let partition = Partition::at(now);

    let configurations = build_matrix(&config.regions);
    let instances =
        resolve_instances(stacks, &config.stack_names, &config.regions, &configurations).await?;
    info!(
        configurations = configurations.len(),
        instances = instances.len(),
        "Collecting timings"
    );

    let timings = collect_timings(traces, &instances, policy, &epoch_now).await?;
    let rows = aggregate_timings(&configurations, &timings)?;

    publish_report(store, &rows, &partition).await?;
    update_indexes(store).await?;

    Ok(rows)
}

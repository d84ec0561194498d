use anyhow::Result;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_lambda::config::Region;
use aws_sdk_lambda::types::InvocationType;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use shared::config::Config;
use shared::error::BenchmarkError;
use shared::matrix::build_matrix;
use shared::outcome::settle_all;
use shared::regional::Regional;
use shared::resolver::{resolve_instances, CloudFormationStacks, ResolvedInstance, StackResources};
use shared::retry::RetryPolicy;
use tracing::info;

#[async_trait]
trait FunctionInvoker: Send + Sync {
    /// Fire and forget, the function's result is never awaited.
    async fn invoke_async(&self, function: &str) -> Result<()>;
}

struct LambdaInvoker {
    client: aws_sdk_lambda::Client,
}

impl LambdaInvoker {
    fn new(sdk_config: &SdkConfig, region: &str) -> Self {
        let config = aws_sdk_lambda::config::Builder::from(sdk_config)
            .region(Region::new(region.to_string()))
            .build();
        Self {
            client: aws_sdk_lambda::Client::from_conf(config),
        }
    }
}

#[async_trait]
impl FunctionInvoker for LambdaInvoker {
    async fn invoke_async(&self, function: &str) -> Result<()> {
        self.client
            .invoke()
            .function_name(function)
            .invocation_type(InvocationType::Event)
            .send()
            .await?;
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq)]
struct InvocationSummary {
    invoked: usize,
    failed: usize,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    shared::log::init();

    lambda_runtime::run(service_fn(func)).await?;
    Ok(())
}

async fn func(_event: LambdaEvent<Value>) -> Result<()> {
    let config = Config::from_env()?;
    let sdk_config = aws_config::load_from_env().await;

    let stacks = Regional::build(&config.regions, |region| {
        CloudFormationStacks::new(&sdk_config, region)
    });
    let invokers = Regional::build(&config.regions, |region| {
        LambdaInvoker::new(&sdk_config, region)
    });

    let summary = invoke_generators(&stacks, &invokers, &config, RetryPolicy::standard()).await?;
    info!(
        invoked = summary.invoked,
        failed = summary.failed,
        "Generator invocations complete"
    );

    Ok(())
}

/// Resolution failures abort the run. Invocation failures are logged and
/// counted, the batch only fails when nothing could be invoked.
async fn invoke_generators<S, I>(
    stacks: &Regional<S>,
    invokers: &Regional<I>,
    config: &Config,
    policy: RetryPolicy,
) -> Result<InvocationSummary>
where
    S: StackResources,
    I: FunctionInvoker,
{
    let configurations = build_matrix(&config.regions);
    let instances =
        resolve_instances(stacks, &config.stack_names, &config.regions, &configurations).await?;
    info!(instances = instances.len(), "Invoking generators");

    let settled = settle_all(instances.iter().map(|instance| {
        (
            format!("{} ({})", instance.function, instance.region()),
            invoke_generator(invokers, instance, policy),
        )
    }))
    .await;
    settled.log_failures("invoke generator");

    if settled.all_failed() {
        return Err(BenchmarkError::AllFailed {
            operation: "generator invocations".to_string(),
            total: settled.total(),
        }
        .into());
    }

    Ok(InvocationSummary {
        invoked: settled.succeeded.len(),
        failed: settled.failed.len(),
    })
}

async fn invoke_generator<I>(
    invokers: &Regional<I>,
    instance: &ResolvedInstance,
    policy: RetryPolicy,
) -> Result<()>
where
    I: FunctionInvoker,
{
    let invoker = invokers.get(instance.region())?;
    info!(
        function = %instance.function,
        region = instance.region(),
        "Invoking generator function"
    );
    policy
        .run("invoke", instance.region(), || {
            invoker.invoke_async(&instance.function)
        })
        .await
}

use crate::error::BenchmarkError;
use crate::matrix::{BenchmarkConfiguration, INSTANCES_PER_CONFIGURATION};
use crate::page::{drain_pages, Page};
use crate::regional::Regional;
use anyhow::Result;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_cloudformation::config::Region;
use futures::future::try_join_all;
use std::collections::HashMap;
use tracing::{debug, info};

pub const LAMBDA_FUNCTION_TYPE: &str = "AWS::Lambda::Function";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackResource {
    pub logical_id: String,
    pub physical_id: String,
    pub resource_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInstance {
    pub configuration: BenchmarkConfiguration,
    pub instance_index: u8,
    /// Logical id in the generator stack, `{configuration_id}I{instance_index}`.
    pub instance_id: String,
    pub function: String,
}

impl ResolvedInstance {
    pub fn region(&self) -> &str {
        &self.configuration.region
    }
}

#[async_trait]
pub trait StackResources: Send + Sync {
    async fn list_stack_resources(
        &self,
        stack_name: &str,
        next_token: Option<String>,
    ) -> Result<Page<StackResource>>;
}

pub struct CloudFormationStacks {
    client: aws_sdk_cloudformation::Client,
}

impl CloudFormationStacks {
    pub fn new(sdk_config: &SdkConfig, region: &str) -> Self {
        let config = aws_sdk_cloudformation::config::Builder::from(sdk_config)
            .region(Region::new(region.to_string()))
            .build();
        Self {
            client: aws_sdk_cloudformation::Client::from_conf(config),
        }
    }
}

#[async_trait]
impl StackResources for CloudFormationStacks {
    async fn list_stack_resources(
        &self,
        stack_name: &str,
        next_token: Option<String>,
    ) -> Result<Page<StackResource>> {
        let response = self
            .client
            .list_stack_resources()
            .stack_name(stack_name)
            .set_next_token(next_token)
            .send()
            .await?;

        let items = response
            .stack_resource_summaries
            .unwrap_or_default()
            .into_iter()
            .filter_map(|summary| {
                Some(StackResource {
                    logical_id: summary.logical_resource_id?,
                    physical_id: summary.physical_resource_id?,
                    resource_type: summary.resource_type?,
                })
            })
            .collect();

        Ok(Page {
            items,
            next_token: response.next_token,
        })
    }
}

pub async fn functions_in_stack<S>(stacks: &S, stack_name: &str) -> Result<Vec<StackResource>>
where
    S: StackResources + ?Sized,
{
    let resources = drain_pages(|token| stacks.list_stack_resources(stack_name, token)).await?;

    Ok(resources
        .into_iter()
        .filter(|r| r.resource_type == LAMBDA_FUNCTION_TYPE)
        .collect())
}

/// Binds every configuration to its deployed replicas. Regions are resolved
/// concurrently; a single missing function fails the whole run.
pub async fn resolve_instances<S>(
    stacks: &Regional<S>,
    stack_names: &[String],
    regions: &[String],
    configurations: &[BenchmarkConfiguration],
) -> Result<Vec<ResolvedInstance>>
where
    S: StackResources,
{
    let per_region = try_join_all(regions.iter().map(|region| async move {
        let client = stacks.get(region)?;
        let in_region: Vec<&BenchmarkConfiguration> = configurations
            .iter()
            .filter(|c| &c.region == region)
            .collect();
        resolve_region(client, stack_names, region, &in_region).await
    }))
    .await?;

    Ok(per_region.into_iter().flatten().collect())
}

async fn resolve_region<S>(
    stacks: &S,
    stack_names: &[String],
    region: &str,
    configurations: &[&BenchmarkConfiguration],
) -> Result<Vec<ResolvedInstance>>
where
    S: StackResources + ?Sized,
{
    let mut functions = HashMap::new();
    for stack_name in stack_names {
        let found = functions_in_stack(stacks, stack_name).await?;
        debug!(region, stack_name = %stack_name, functions = found.len(), "Listed stack functions");
        functions.extend(found.into_iter().map(|r| (r.logical_id, r.physical_id)));
    }

    let mut instances = Vec::with_capacity(configurations.len() * INSTANCES_PER_CONFIGURATION as usize);
    for configuration in configurations {
        for instance_index in 1..=INSTANCES_PER_CONFIGURATION {
            let instance_id = configuration.instance_id(instance_index);
            let function = functions
                .get(&instance_id)
                .cloned()
                .ok_or_else(|| BenchmarkError::Resolution {
                    logical_id: instance_id.clone(),
                    region: region.to_string(),
                })?;

            instances.push(ResolvedInstance {
                configuration: (*configuration).clone(),
                instance_index,
                instance_id,
                function,
            });
        }
    }

    info!(region, instances = instances.len(), "Resolved generator instances");
    Ok(instances)
}

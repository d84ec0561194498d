use crate::error::BenchmarkError;
use crate::matrix::RuntimeKind;

/// Regions the benchmark runs in. X-Ray is not available in eu-west-3.
pub const DEFAULT_REGIONS: [&str; 7] = [
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "eu-central-1",
    "eu-west-1",
    "eu-west-2",
];

pub const BUCKET_NAME: &str = "BUCKET_NAME";
pub const REGIONS: &str = "REGIONS";
pub const SLACK_URL: &str = "SLACK_URL";
pub const SLACK_CHANNEL: &str = "SLACK_CHANNEL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// One generator stack per runtime, in `RuntimeKind::ALL` order.
    pub stack_names: Vec<String>,
    pub regions: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, BenchmarkError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, BenchmarkError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let stack_names = RuntimeKind::ALL
            .iter()
            .map(|runtime| get_and_check(&lookup, runtime.stack_env_var()))
            .collect::<Result<Vec<_>, _>>()?;

        let regions = match lookup(REGIONS).filter(|value| !value.trim().is_empty()) {
            Some(value) => value
                .split(',')
                .map(str::trim)
                .filter(|region| !region.is_empty())
                .map(str::to_string)
                .collect(),
            None => DEFAULT_REGIONS.iter().map(|r| r.to_string()).collect(),
        };

        Ok(Self {
            stack_names,
            regions,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifierConfig {
    pub slack_url: String,
    pub slack_channel: String,
}

impl NotifierConfig {
    pub fn from_env() -> Result<Self, BenchmarkError> {
        let lookup = |name: &str| std::env::var(name).ok();
        Ok(Self {
            slack_url: get_and_check(&lookup, SLACK_URL)?,
            slack_channel: get_and_check(&lookup, SLACK_CHANNEL)?,
        })
    }
}

pub fn bucket_name() -> Result<String, BenchmarkError> {
    get_and_check(&|name: &str| std::env::var(name).ok(), BUCKET_NAME)
}

/// Empty values are treated the same as unset ones.
pub fn get_and_check<F>(lookup: &F, name: &str) -> Result<String, BenchmarkError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| BenchmarkError::MissingEnvVar(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn reads_stacks_in_runtime_order_and_defaults_regions() {
        let config = Config::from_lookup(lookup_from(&[
            ("NODE8_GENERATOR_STACK_NAME", "node-stack"),
            ("JAVA8_GENERATOR_STACK_NAME", "java-stack"),
        ]))
        .unwrap();

        assert_eq!(config.stack_names, vec!["node-stack", "java-stack"]);
        assert_eq!(config.regions.len(), DEFAULT_REGIONS.len());
        assert_eq!(config.regions[0], "us-east-1");
    }

    #[test]
    fn regions_can_be_overridden() {
        let config = Config::from_lookup(lookup_from(&[
            ("NODE8_GENERATOR_STACK_NAME", "node-stack"),
            ("JAVA8_GENERATOR_STACK_NAME", "java-stack"),
            ("REGIONS", "us-west-2, eu-west-1,"),
        ]))
        .unwrap();

        assert_eq!(config.regions, vec!["us-west-2", "eu-west-1"]);
    }

    #[test]
    fn empty_stack_name_is_missing() {
        let err = Config::from_lookup(lookup_from(&[
            ("NODE8_GENERATOR_STACK_NAME", "node-stack"),
            ("JAVA8_GENERATOR_STACK_NAME", ""),
        ]))
        .unwrap_err();

        assert!(
            matches!(err, BenchmarkError::MissingEnvVar(ref name) if name == "JAVA8_GENERATOR_STACK_NAME")
        );
    }
}

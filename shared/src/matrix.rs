use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const MEMORY_SIZES: [u16; 3] = [256, 1024, 3008];
pub const NETWORK_ISOLATION_STATES: [bool; 2] = [true, false];
pub const PACKAGE_SIZE: &str = "small";

/// Deployed replicas per configuration; the median of these is reported.
pub const INSTANCES_PER_CONFIGURATION: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RuntimeKind {
    #[serde(rename = "NodeJS8")]
    NodeJs8,
    #[serde(rename = "Java8")]
    Java8,
}

impl RuntimeKind {
    pub const ALL: [RuntimeKind; 2] = [RuntimeKind::NodeJs8, RuntimeKind::Java8];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeKind::NodeJs8 => "NodeJS8",
            RuntimeKind::Java8 => "Java8",
        }
    }

    pub fn stack_env_var(&self) -> &'static str {
        match self {
            RuntimeKind::NodeJs8 => "NODE8_GENERATOR_STACK_NAME",
            RuntimeKind::Java8 => "JAVA8_GENERATOR_STACK_NAME",
        }
    }
}

impl Display for RuntimeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkConfiguration {
    pub runtime: RuntimeKind,
    pub memory: u16,
    pub vpc: bool,
    pub package_size: &'static str,
    pub region: String,
}

impl BenchmarkConfiguration {
    pub fn new(runtime: RuntimeKind, memory: u16, vpc: bool, region: &str) -> Self {
        Self {
            runtime,
            memory,
            vpc,
            package_size: PACKAGE_SIZE,
            region: region.to_string(),
        }
    }

    /// `NodeJS8M256VTrue`. Region is not part of the id, each region carries
    /// its own copy of the generator stacks.
    pub fn configuration_id(&self) -> String {
        format!(
            "{}M{}V{}",
            self.runtime,
            self.memory,
            if self.vpc { "True" } else { "False" }
        )
    }

    /// Logical resource id of one deployed replica, `NodeJS8M256VTrueI2`.
    pub fn instance_id(&self, instance_index: u8) -> String {
        format!("{}I{}", self.configuration_id(), instance_index)
    }
}

/// region × memory × isolation × runtime, in that nesting order.
pub fn build_matrix(regions: &[String]) -> Vec<BenchmarkConfiguration> {
    let mut configurations = Vec::with_capacity(
        regions.len() * MEMORY_SIZES.len() * NETWORK_ISOLATION_STATES.len() * RuntimeKind::ALL.len(),
    );

    for region in regions {
        for memory in MEMORY_SIZES {
            for vpc in NETWORK_ISOLATION_STATES {
                for runtime in RuntimeKind::ALL {
                    configurations.push(BenchmarkConfiguration::new(runtime, memory, vpc, region));
                }
            }
        }
    }

    configurations
}

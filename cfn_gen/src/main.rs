use anyhow::Result;
use serde::{Deserialize, Serialize};
use shared::matrix::{
    BenchmarkConfiguration, RuntimeKind, INSTANCES_PER_CONFIGURATION, MEMORY_SIZES,
    NETWORK_ISOLATION_STATES,
};
use std::fs;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Serialize, Deserialize)]
struct Parameters {
    code_bucket: String,
    log_retention_in_days: u16,
    vpc_subnet_ids: Vec<String>,
    vpc_security_group_ids: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    runtime_kind: RuntimeKind,
    path: String,
    runtime: String,
    handler: String,
    code_key: String,
}

fn main() -> Result<()> {
    let parameters = load_parameters()?;
    let manifests = load_manifests()?;

    for manifest in &manifests {
        let cfn = build_cloudformation(&parameters, manifest);
        let path = PathBuf::from("generators").join(&manifest.path).join("template.yml");
        create_template_file(&path, &cfn)?;
        println!("{} generator stack written to {}", manifest.runtime_kind, path.display());
    }

    Ok(())
}

fn load_parameters() -> Result<Parameters> {
    let parameters = fs::read_to_string("parameters.yml")?;
    let parameters: Parameters = serde_yaml::from_str(&parameters)?;

    Ok(parameters)
}

fn load_manifests() -> Result<Vec<Manifest>> {
    let manifests: Vec<Manifest> = WalkDir::new("generators/")
        .max_depth(2)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && e.file_name() == "manifest.yml")
        .filter_map(|e| load_manifest(e.path()).ok())
        .collect();

    Ok(manifests)
}

fn load_manifest(path: &Path) -> Result<Manifest> {
    let manifest = fs::read_to_string(path)?;
    let manifest: Manifest = serde_yaml::from_str(&manifest)?;

    Ok(manifest)
}

fn yaml_list(items: &[String]) -> String {
    format!("[{}]", items.join(", "))
}

/// One stack per runtime, deployed into every benchmark region. Function
/// logical ids are the instance ids the collector resolves.
fn build_cloudformation(parameters: &Parameters, manifest: &Manifest) -> String {
    let mut builder = String::new();

    builder.push_str(&format!(
        r#"---
AWSTemplateFormatVersion: 2010-09-09
Transform: AWS::Serverless-2016-10-31
Description: Lambda Benchmarking | {} generators
Globals:
  Function:
    Runtime: {}
    Handler: {}
    Timeout: 10
    Tracing: Active
    CodeUri:
      Bucket: !Sub "{}-${{AWS::Region}}"
      Key: {}
Resources:"#,
        manifest.runtime_kind,
        &manifest.runtime,
        &manifest.handler,
        &parameters.code_bucket,
        &manifest.code_key
    ));

    builder.push_str(&format!(
        r#"
  RoleGenerator:
    Type: AWS::IAM::Role
    Properties:
      RoleName: !Sub "iam-${{AWS::Region}}-lambda-benchmark-{}-generator-role"
      Path: /
      AssumeRolePolicyDocument:
        Version: 2012-10-17
        Statement:
          - Effect: Allow
            Principal:
              Service: lambda.amazonaws.com
            Action: sts:AssumeRole
      ManagedPolicyArns:
        - arn:aws:iam::aws:policy/service-role/AWSLambdaVPCAccessExecutionRole
        - arn:aws:iam::aws:policy/AWSXrayWriteOnlyAccess"#,
        &manifest.path
    ));

    for memory in MEMORY_SIZES {
        for vpc in NETWORK_ISOLATION_STATES {
            // Stacks are region independent, the region is never part of the id
            let configuration = BenchmarkConfiguration::new(manifest.runtime_kind, memory, vpc, "");

            for instance_index in 1..=INSTANCES_PER_CONFIGURATION {
                let logical_id = configuration.instance_id(instance_index);

                builder.push_str(&format!(
                    r#"
  {}:
    Type: AWS::Serverless::Function
    Properties:
      Description: Lambda Benchmarking | {} | {}MB | VPC {} | Instance {}
      MemorySize: {}
      Role: !GetAtt RoleGenerator.Arn"#,
                    logical_id,
                    manifest.runtime_kind,
                    memory,
                    if vpc { "yes" } else { "no" },
                    instance_index,
                    memory
                ));

                if vpc {
                    builder.push_str(&format!(
                        r#"
      VpcConfig:
        SubnetIds: {}
        SecurityGroupIds: {}"#,
                        yaml_list(&parameters.vpc_subnet_ids),
                        yaml_list(&parameters.vpc_security_group_ids)
                    ));
                }

                builder.push_str(&format!(
                    r#"
  Logs{}:
    Type: AWS::Logs::LogGroup
    Properties:
      LogGroupName: !Sub "/aws/lambda/${{{}}}"
      RetentionInDays: {}"#,
                    logical_id, logical_id, &parameters.log_retention_in_days
                ));
            }
        }
    }

    builder.push('\n');
    builder
}

fn create_template_file(path: &Path, content: &str) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;

    Ok(())
}

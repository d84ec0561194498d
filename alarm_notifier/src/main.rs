use anyhow::{anyhow, Result};
use async_trait::async_trait;
use aws_lambda_events::sns::SnsEvent;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use shared::config::NotifierConfig;
use tokio::sync::OnceCell;
use tracing::{error, info};

/// The CloudWatch alarm state change carried in the SNS message body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AlarmMessage {
    alarm_name: String,
    new_state_value: String,
    new_state_reason: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct ChatMessage {
    channel: String,
    text: String,
}

impl ChatMessage {
    fn for_alarm(alarm: &AlarmMessage, channel: &str) -> Self {
        Self {
            channel: channel.to_string(),
            text: format!(
                "{} state is now {}: {}",
                alarm.alarm_name, alarm.new_state_value, alarm.new_state_reason
            ),
        }
    }
}

#[async_trait]
trait ChatWebhook: Send + Sync {
    async fn post(&self, message: &ChatMessage) -> Result<StatusCode>;
}

struct SlackWebhook {
    client: reqwest::Client,
    url: String,
}

#[async_trait]
impl ChatWebhook for SlackWebhook {
    async fn post(&self, message: &ChatMessage) -> Result<StatusCode> {
        let response = self.client.post(&self.url).json(message).send().await?;
        Ok(response.status())
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    shared::log::init();

    lambda_runtime::run(service_fn(func)).await?;
    Ok(())
}

static CONFIG: OnceCell<NotifierConfig> = OnceCell::const_new();
async fn get_config() -> Result<&'static NotifierConfig> {
    Ok(CONFIG
        .get_or_try_init(|| async { NotifierConfig::from_env() })
        .await?)
}

async fn func(event: LambdaEvent<SnsEvent>) -> Result<()> {
    let config = get_config().await?;
    let record = event
        .payload
        .records
        .first()
        .ok_or_else(|| anyhow!("SNS event has no records"))?;

    let webhook = SlackWebhook {
        client: reqwest::Client::new(),
        url: config.slack_url.clone(),
    };
    notify(&webhook, &config.slack_channel, &record.sns.message).await
}

/// Client errors are logged and swallowed since a retry would fail the same
/// way. Server errors fail the invocation so that Lambda retries it.
async fn notify<W>(webhook: &W, channel: &str, sns_message: &str) -> Result<()>
where
    W: ChatWebhook + ?Sized,
{
    let alarm: AlarmMessage = serde_json::from_str(sns_message)?;
    let message = ChatMessage::for_alarm(&alarm, channel);
    let status = webhook.post(&message).await?;

    if status.is_success() || status.is_redirection() || status.is_informational() {
        info!(alarm = %alarm.alarm_name, "Message posted successfully");
        Ok(())
    } else if status.is_client_error() {
        error!(
            status = status.as_u16(),
            reason = status.canonical_reason().unwrap_or_default(),
            "Error posting message to chat webhook"
        );
        Ok(())
    } else {
        Err(anyhow!(
            "Server error when processing message: {} - {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or_default()
        ))
    }
}

use crate::page::{drain_pages, Page};
use anyhow::Result;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_smithy_http::byte_stream::ByteStream;
use tracing::info;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        cache_control: &str,
    ) -> Result<()>;

    async fn list_objects(
        &self,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<Page<String>>;
}

pub async fn list_keys<O>(store: &O, prefix: &str) -> Result<Vec<String>>
where
    O: ObjectStore + ?Sized,
{
    drain_pages(|token| store.list_objects(prefix, token)).await
}

pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Store {
    pub fn new(sdk_config: &SdkConfig, bucket: &str) -> Self {
        Self {
            client: aws_sdk_s3::Client::new(sdk_config),
            bucket: bucket.to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        cache_control: &str,
    ) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .cache_control(cache_control)
            .body(ByteStream::from(body))
            .send()
            .await?;

        info!(bucket = %self.bucket, key, "Object written");
        Ok(())
    }

    async fn list_objects(
        &self,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<Page<String>> {
        let response = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .set_continuation_token(continuation_token)
            .send()
            .await?;

        let items = response
            .contents
            .unwrap_or_default()
            .into_iter()
            .filter_map(|object| object.key)
            .collect();

        let next_token = if response.is_truncated {
            response.next_continuation_token
        } else {
            None
        };

        Ok(Page { items, next_token })
    }
}

use anyhow::Error;
use futures::future::join_all;
use std::fmt::Display;
use std::future::Future;
use tracing::error;

#[derive(Debug)]
pub struct Settled<K, T> {
    pub succeeded: Vec<T>,
    pub failed: Vec<(K, Error)>,
}

impl<K, T> Settled<K, T> {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn all_failed(&self) -> bool {
        self.succeeded.is_empty() && !self.failed.is_empty()
    }
}

impl<K: Display, T> Settled<K, T> {
    pub fn log_failures(&self, operation: &str) {
        for (key, err) in &self.failed {
            error!(operation, item = %key, "Failed: {:#}", err);
        }
    }
}

pub async fn settle_all<K, T, Fut, I>(tasks: I) -> Settled<K, T>
where
    I: IntoIterator<Item = (K, Fut)>,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let (keys, futures): (Vec<K>, Vec<Fut>) = tasks.into_iter().unzip();
    let results = join_all(futures).await;

    let mut succeeded = Vec::new();
    let mut failed = Vec::new();
    for (key, result) in keys.into_iter().zip(results) {
        match result {
            Ok(value) => succeeded.push(value),
            Err(err) => failed.push((key, err)),
        }
    }

    Settled { succeeded, failed }
}

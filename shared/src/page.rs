use anyhow::Result;
use std::future::Future;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_token: None,
        }
    }
}

pub async fn drain_pages<T, F, Fut>(mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut continuation_token = None;
    let mut items = Vec::new();

    loop {
        let page = fetch(continuation_token.take()).await?;
        items.extend(page.items);

        match page.next_token {
            Some(token) if !token.is_empty() => continuation_token = Some(token),
            _ => break,
        }
    }

    Ok(items)
}

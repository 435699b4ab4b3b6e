//! Cursor-following pagination shared by every listing call.

use std::future::Future;

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_page_token: Option<String>) -> Self {
        Page {
            items,
            next_page_token,
        }
    }

    pub fn last(items: Vec<T>) -> Self {
        Page::new(items, None)
    }
}

/// Request pages until the remote stops returning a continuation token,
/// handing every page to `visit` in the order received.
///
/// An empty token is treated the same as a missing one. Returns the number of
/// pages fetched.
pub async fn for_each_page<T, E, F, Fut, V>(mut fetch_page: F, mut visit: V) -> Result<usize, E>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
    V: FnMut(Vec<T>),
{
    let mut page_token: Option<String> = None;
    let mut pages = 0;
    loop {
        let page = fetch_page(page_token.take()).await?;
        pages += 1;
        visit(page.items);
        match page.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => break,
        }
    }
    Ok(pages)
}

/// Accumulate every page into one vector.
pub async fn collect_pages<T, E, F, Fut>(fetch_page: F) -> Result<Vec<T>, E>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
{
    let mut all = Vec::new();
    for_each_page(fetch_page, |items| all.extend(items)).await?;
    Ok(all)
}

/// Count the items across every page without keeping them.
pub async fn count_pages<T, E, F, Fut>(fetch_page: F) -> Result<usize, E>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
{
    let mut count = 0;
    for_each_page(fetch_page, |items| count += items.len()).await?;
    Ok(count)
}

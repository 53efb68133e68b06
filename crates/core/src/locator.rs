//! Pagination walking.
//!
//! Responsibilities:
//! - Locate the entry at a 0-based index across a chain of search result pages
//! - Visit every page of a search, for sweeps that need all results
//!
//! Both walks are explicit loops bounded by a hop limit. Each hop is one network round trip, and
//! a failed fetch at any hop fails the whole walk.

use crate::fetcher::ResourceFetcher;
use crate::{SyncError, SyncResult};
use fhir::Page;
use serde_json::Value;

/// Return the entry at `index` counting from the first entry of `first_page`.
///
/// The page must already be the right search (patient, concept, descending date). `next` links
/// are followed only while `index` lies past the entries seen so far.
///
/// # Errors
///
/// - [`SyncError::EmptyPage`] if a page in the chain has no entries,
/// - [`SyncError::OutOfRange`] if the chain ends before `index`,
/// - [`SyncError::PageLimitExceeded`] if more than `max_hops` links would be followed,
/// - any error from fetching or decoding a subsequent page.
pub async fn locate(
    fetcher: &dyn ResourceFetcher,
    first_page: Page,
    index: usize,
    max_hops: usize,
) -> SyncResult<Value> {
    let mut page = first_page;
    let mut remaining = index;
    let mut hops = 0usize;

    loop {
        let count = page.len();
        if count == 0 {
            return Err(SyncError::EmptyPage);
        }
        if remaining < count {
            return page
                .into_entries()
                .into_iter()
                .nth(remaining)
                .ok_or(SyncError::OutOfRange { index });
        }

        remaining -= count;
        let next = match page.next_url() {
            Some(url) => url.to_string(),
            None => return Err(SyncError::OutOfRange { index }),
        };
        if hops >= max_hops {
            return Err(SyncError::PageLimitExceeded(max_hops));
        }
        hops += 1;

        tracing::debug!("following next link (hop {hops}, {remaining} entries to skip)");
        page = fetcher.fetch_page(&next).await?;
    }
}

/// Fetch the page at `url`, then [`locate`] from it.
pub async fn locate_at(
    fetcher: &dyn ResourceFetcher,
    url: &str,
    index: usize,
    max_hops: usize,
) -> SyncResult<Value> {
    let first_page = fetcher.fetch_page(url).await?;
    locate(fetcher, first_page, index, max_hops).await
}

/// Fetch `url` and every page linked from it by `next`, calling `visit` on each page in order.
///
/// Empty pages are visited like any other; the walk ends at the first page without a `next`
/// link.
pub async fn walk_pages<V>(
    fetcher: &dyn ResourceFetcher,
    url: &str,
    max_hops: usize,
    mut visit: V,
) -> SyncResult<usize>
where
    V: FnMut(&Page) -> SyncResult<()> + Send,
{
    let mut page = fetcher.fetch_page(url).await?;
    let mut pages = 1usize;

    loop {
        visit(&page)?;

        let Some(next) = page.next_url().map(str::to_string) else {
            return Ok(pages);
        };
        if pages > max_hops {
            return Err(SyncError::PageLimitExceeded(max_hops));
        }

        tracing::debug!("fetching page {}", pages + 1);
        page = fetcher.fetch_page(&next).await?;
        pages += 1;
    }
}

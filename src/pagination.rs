//! Lazy, marker-driven listings of functions and versions.
//!
//! Pages are fetched one at a time, only once the previously fetched page has been consumed, so a
//! function with thousands of versions never has more than one page in memory.

use crate::api::{FunctionDescriptor, LambdaApi, Page, VersionDescriptor};
use anyhow::Result;
use log::trace;
use std::collections::VecDeque;
use std::future::Future;

/// Pull-based cursor over a paginated listing.
///
/// The first fetch is made with no marker; the listing ends after a page that returns no marker.
#[derive(Debug)]
pub struct PageCursor<T> {
    buffer: VecDeque<T>,
    next_marker: Option<String>,
    pages_fetched: usize,
}

impl<T> Default for PageCursor<T> {
    fn default() -> Self {
        Self {
            buffer: VecDeque::new(),
            next_marker: None,
            pages_fetched: 0,
        }
    }
}

impl<T> PageCursor<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    fn is_exhausted(&self) -> bool {
        self.pages_fetched > 0 && self.next_marker.is_none()
    }

    /// Yields the next item, calling `fetch` with the current marker whenever the buffered page
    /// runs dry. Empty pages that still carry a marker are skipped over.
    pub async fn next_with<F, Fut>(&mut self, mut fetch: F) -> Result<Option<T>>
    where
        F: FnMut(Option<String>) -> Fut,
        Fut: Future<Output = Result<Page<T>>>,
    {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Ok(Some(item));
            }

            if self.is_exhausted() {
                return Ok(None);
            }

            let page = fetch(self.next_marker.clone()).await?;
            self.pages_fetched += 1;
            self.next_marker = page.next_marker.filter(|marker| !marker.is_empty());
            self.buffer.extend(page.items);
        }
    }
}

/// Lists every function in the region the client is scoped to.
pub struct FunctionLister<'a, A: ?Sized> {
    api: &'a A,
    cursor: PageCursor<FunctionDescriptor>,
}

impl<'a, A: LambdaApi + ?Sized> FunctionLister<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self {
            api,
            cursor: PageCursor::new(),
        }
    }

    pub async fn next(&mut self) -> Result<Option<FunctionDescriptor>> {
        let api = self.api;
        self.cursor
            .next_with(move |marker| {
                trace!("Listing functions (marker={marker:?})");
                api.list_functions(marker)
            })
            .await
    }

    pub fn pages_fetched(&self) -> usize {
        self.cursor.pages_fetched()
    }
}

/// Lists the versions of a single function, oldest first.
pub struct VersionLister<'a, A: ?Sized> {
    api: &'a A,
    function_arn: &'a str,
    cursor: PageCursor<VersionDescriptor>,
}

impl<'a, A: LambdaApi + ?Sized> VersionLister<'a, A> {
    pub fn new(api: &'a A, function: &'a FunctionDescriptor) -> Self {
        Self {
            api,
            function_arn: &function.arn,
            cursor: PageCursor::new(),
        }
    }

    pub async fn next(&mut self) -> Result<Option<VersionDescriptor>> {
        let api = self.api;
        let function_arn = self.function_arn;
        self.cursor
            .next_with(move |marker| {
                trace!("Listing versions of {function_arn} (marker={marker:?})");
                api.list_versions_by_function(function_arn, marker)
            })
            .await
    }

    pub fn pages_fetched(&self) -> usize {
        self.cursor.pages_fetched()
    }
}

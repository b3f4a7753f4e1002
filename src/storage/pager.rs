//! Marker-based pagination over `StorageFacade::list_by_prefix`.

use super::facade::StorageFacade;
use crate::error::StorageResult;

/// Pull-based cursor over every stored content id starting with a prefix.
///
/// Each `next_page` call fetches one page. Enumeration ends after a page shorter than
/// `per_page`; that final page (possibly empty) is still returned before `None`.
pub struct PrefixPager<'a> {
    storage: &'a dyn StorageFacade,
    prefix: String,
    per_page: usize,
    marker: Option<String>,
    done: bool,
    pages_fetched: usize,
}

impl<'a> PrefixPager<'a> {
    pub fn new(storage: &'a dyn StorageFacade, prefix: &str, per_page: usize) -> Self {
        Self {
            storage,
            prefix: prefix.to_string(),
            per_page: per_page.max(1),
            marker: None,
            done: false,
            pages_fetched: 0,
        }
    }

    pub async fn next_page(&mut self) -> StorageResult<Option<Vec<String>>> {
        if self.done {
            return Ok(None);
        }

        let page = self
            .storage
            .list_by_prefix(&self.prefix, self.marker.as_deref(), self.per_page)
            .await?;
        self.pages_fetched += 1;

        if page.ids.len() < self.per_page {
            self.done = true;
        } else {
            self.marker = page.marker;
        }

        tracing::debug!(
            "Listed page {} under prefix {:?}: {} ids",
            self.pages_fetched,
            self.prefix,
            page.ids.len()
        );
        Ok(Some(page.ids))
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }
}

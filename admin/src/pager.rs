//! Cursor over ATOM feeds paged with `$top`/`$skip`.
//!
//! Feeds carry no total count and no next link, so the end of a listing is
//! inferred: an empty page, or a page shorter than the requested size (a
//! "light page"), ends it. A listing whose length is an exact multiple of the
//! page size therefore costs one extra request that comes back empty.

use crate::atom::{AtomDocument, EntityManager};
use crate::errors::AdminError;

/// Stateful page cursor owned by a single consumer.
///
/// # Examples
///
/// ```no_run
/// # async fn example(client: admin::AdminClient) -> Result<(), admin::AdminError> {
/// let mut pager = client.list_queues(None);
/// while let Some(page) = pager.next_page().await? {
///     for queue in page {
///         println!("{}", queue.name);
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct Pager<D, T> {
    entity_manager: EntityManager,
    base_path: String,
    page_size: usize,
    skip: usize,
    done: bool,
    page_len: fn(&D) -> usize,
    convert: fn(D) -> Result<Vec<T>, AdminError>,
}

impl<D: AtomDocument, T> Pager<D, T> {
    /// `page_len` counts the items of a fetched page and `convert` turns the
    /// page into caller facing items.
    pub fn new(
        entity_manager: EntityManager,
        base_path: impl Into<String>,
        page_size: usize,
        page_len: fn(&D) -> usize,
        convert: fn(D) -> Result<Vec<T>, AdminError>,
    ) -> Self {
        Self {
            entity_manager,
            base_path: base_path.into(),
            page_size: page_size.max(1),
            skip: 0,
            done: false,
            page_len,
            convert,
        }
    }

    /// Whether another call to [`next_page`](Self::next_page) may return items.
    pub fn more(&self) -> bool {
        !self.done
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Fetches the next page.
    ///
    /// Returns `Ok(None)` once the listing is exhausted; after that no further
    /// requests are made. A failed fetch leaves the cursor where it was, so the
    /// same page can be retried.
    pub async fn next_page(&mut self) -> Result<Option<Vec<T>>, AdminError> {
        if self.done {
            return Ok(None);
        }

        let path = self.page_path();
        let page: D = self.entity_manager.get(&path, &[]).await?;
        let count = (self.page_len)(&page);

        if count == 0 {
            log::debug!("{} exhausted after {} items", self.base_path, self.skip);
            self.done = true;
            return Ok(None);
        }

        let items = (self.convert)(page)?;
        self.skip += count;
        if count < self.page_size {
            self.done = true;
        }
        Ok(Some(items))
    }

    /// Drains the remaining pages into one list.
    pub async fn collect_all(&mut self) -> Result<Vec<T>, AdminError> {
        let mut items = Vec::new();
        while let Some(page) = self.next_page().await? {
            items.extend(page);
        }
        Ok(items)
    }

    fn page_path(&self) -> String {
        if self.skip == 0 {
            format!("{}?$top={}", self.base_path, self.page_size)
        } else {
            format!("{}?$top={}&$skip={}", self.base_path, self.page_size, self.skip)
        }
    }
}

impl<D, T> std::fmt::Debug for Pager<D, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pager")
            .field("base_path", &self.base_path)
            .field("page_size", &self.page_size)
            .field("skip", &self.skip)
            .field("done", &self.done)
            .finish()
    }
}

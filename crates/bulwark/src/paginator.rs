//! Page-by-page traversal of list endpoints.

use crate::client::Client;
use bulwark_core::RequestSpec;
use bulwark_error::BulwarkResult;
use bulwark_interface::ResultMapper;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Default number of items requested per page.
pub const DEFAULT_PAGE_SIZE: usize = 20;

type HasNextFn<T> = Box<dyn Fn(Option<&T>) -> bool + Send + Sync>;
type NextTokenFn<T, K> = Box<dyn Fn(&T, &K, usize) -> K + Send + Sync>;
type PrevTokenFn<K> = Box<dyn Fn(&K, usize) -> Option<K> + Send + Sync>;
type PageArgsFn<K> = Box<dyn Fn(&K, usize) -> Vec<(String, String)> + Send + Sync>;

/// Walks a paged endpoint through a [`Client`].
///
/// Each page is one mapped call, so throttling, concurrency limits, retries
/// and replay apply per page. The endpoint template receives the page token
/// and size as placeholder arguments, `{token}` and `{limit}` by default or
/// `{offset}` and `{limit}` for [`Paginator::offset`].
///
/// `has_next` sees the last fetched page (`None` before the first fetch) and
/// decides whether [`next_page`](Self::next_page) dispatches at all.
///
/// # Example
///
/// ```no_run
/// use bulwark::{Client, JsonParser, Method, Paginator, RequestSpec};
/// use std::sync::Arc;
///
/// # async fn demo(client: Client) -> bulwark::BulwarkResult<()> {
/// let spec = RequestSpec::new(Method::Get, "/pokemon?offset={offset}&limit={limit}");
/// let mut pages = Paginator::<Vec<String>, usize>::offset(
///     client,
///     spec,
///     Arc::new(JsonParser::<Vec<String>>::new()),
///     |last: Option<&Vec<String>>| last.is_none_or(|page| page.len() == 20),
/// );
/// while let Some(page) = pages.next_page().await? {
///     println!("{} names", page.len());
/// }
/// # Ok(())
/// # }
/// ```
pub struct Paginator<T, K> {
    client: Client,
    spec: RequestSpec,
    mapper: Arc<dyn ResultMapper<T>>,
    page_size: usize,
    token: K,
    last: Option<T>,
    has_next: HasNextFn<T>,
    next_token: NextTokenFn<T, K>,
    prev_token: Option<PrevTokenFn<K>>,
    page_args: PageArgsFn<K>,
}

impl<T, K: fmt::Debug> fmt::Debug for Paginator<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Paginator")
            .field("endpoint", self.spec.endpoint())
            .field("page_size", &self.page_size)
            .field("token", &self.token)
            .field("fetched", &self.last.is_some())
            .finish()
    }
}

impl<T, K> Paginator<T, K>
where
    T: Clone,
    K: fmt::Display + 'static,
{
    /// Token-driven pagination starting at `initial`.
    ///
    /// `next_token` derives the following token from the page just fetched,
    /// the token that fetched it and the page size. Going backwards is
    /// disabled until [`with_prev_token`](Self::with_prev_token) is set.
    pub fn new(
        client: Client,
        spec: RequestSpec,
        mapper: Arc<dyn ResultMapper<T>>,
        initial: K,
        has_next: impl Fn(Option<&T>) -> bool + Send + Sync + 'static,
        next_token: impl Fn(&T, &K, usize) -> K + Send + Sync + 'static,
    ) -> Self {
        Self {
            client,
            spec,
            mapper,
            page_size: DEFAULT_PAGE_SIZE,
            token: initial,
            last: None,
            has_next: Box::new(has_next),
            next_token: Box::new(next_token),
            prev_token: None,
            page_args: Box::new(|token: &K, size: usize| {
                vec![
                    ("token".to_string(), token.to_string()),
                    ("limit".to_string(), size.to_string()),
                ]
            }),
        }
    }
}

impl<T: Clone> Paginator<T, usize> {
    /// Offset pagination: the token is the index of the first item.
    ///
    /// Each page advances the offset by the page size, and going back is
    /// possible while the offset is above zero.
    pub fn offset(
        client: Client,
        spec: RequestSpec,
        mapper: Arc<dyn ResultMapper<T>>,
        has_next: impl Fn(Option<&T>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::new(client, spec, mapper, 0, has_next, |_, offset, size| offset + size)
            .with_prev_token(|offset, size| (*offset > 0).then(|| offset.saturating_sub(size)))
            .with_page_args(|offset, size| {
                vec![
                    ("offset".to_string(), offset.to_string()),
                    ("limit".to_string(), size.to_string()),
                ]
            })
    }
}

impl<T: Clone, K> Paginator<T, K> {
    /// Requests `page_size` items per page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Enables [`prev_page`](Self::prev_page); `None` means there is no
    /// earlier page.
    pub fn with_prev_token(
        mut self,
        prev_token: impl Fn(&K, usize) -> Option<K> + Send + Sync + 'static,
    ) -> Self {
        self.prev_token = Some(Box::new(prev_token));
        self
    }

    /// Replaces the placeholder arguments built from a token and page size.
    pub fn with_page_args(
        mut self,
        page_args: impl Fn(&K, usize) -> Vec<(String, String)> + Send + Sync + 'static,
    ) -> Self {
        self.page_args = Box::new(page_args);
        self
    }

    /// Token the next fetch will use.
    pub fn token(&self) -> &K {
        &self.token
    }

    /// Items requested per page.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Jumps to `token`; the next [`next_page`](Self::next_page) fetches it.
    pub fn set_page(&mut self, token: K) {
        self.token = token;
    }

    async fn fetch(&mut self) -> BulwarkResult<Option<T>> {
        let spec = (self.page_args)(&self.token, self.page_size)
            .into_iter()
            .fold(self.spec.clone(), |spec, (name, value)| spec.with_arg(name, value));
        debug!(endpoint = %spec.endpoint(), args = ?spec.args(), "Fetching page");
        let page = self
            .client
            .request_mapped(&spec, None, self.mapper.as_ref())
            .await?;
        self.last = page.clone();
        Ok(page)
    }

    /// Fetches the page at the current token and advances past it.
    ///
    /// Returns `Ok(None)` without dispatching when `has_next` says the walk
    /// is over, and `Ok(None)` when the call yields no value.
    ///
    /// # Errors
    ///
    /// See [`Client::request_mapped`]. The token is left unchanged.
    pub async fn next_page(&mut self) -> BulwarkResult<Option<T>> {
        if !(self.has_next)(self.last.as_ref()) {
            debug!("No further pages");
            return Ok(None);
        }
        let page = self.fetch().await?;
        if let Some(page) = &page {
            self.token = (self.next_token)(page, &self.token, self.page_size);
        }
        Ok(page)
    }

    /// Steps the token back one page and fetches it.
    ///
    /// Returns `Ok(None)` without dispatching when there is no earlier page.
    ///
    /// # Errors
    ///
    /// See [`Client::request_mapped`].
    pub async fn prev_page(&mut self) -> BulwarkResult<Option<T>> {
        let previous = self
            .prev_token
            .as_ref()
            .and_then(|prev| prev(&self.token, self.page_size));
        let Some(previous) = previous else {
            debug!("No earlier page");
            return Ok(None);
        };
        self.token = previous;
        self.fetch().await
    }
}

//! Pagination cursor unification
//!
//! Vendors page their list APIs four ways: an opaque `NextToken`, a
//! `Marker`/`NextMarker` pair, plain offset/limit with an optional total, or
//! a 1-based page number with a page size.
//! Adapters describe each fetched page as a [`Page`] and [`paginate`] turns
//! the fetch function into one lazy stream of items.

use crate::error::{CloudError, Result};
use futures_util::stream::{self, Stream, TryStreamExt};
use std::future::Future;

/// Position of the next page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    /// Opaque continuation token (`NextToken`)
    Token(String),
    /// Marker returned as `NextMarker`
    Marker(String),
    /// Offset/limit window
    Offset { offset: u64, limit: u64 },
    /// 1-based page number (`PageNumber`/`PageSize`)
    PageNumber { page: u64, size: u64 },
}

impl Cursor {
    /// Empty tokens and markers mean "no further page"
    pub fn is_empty(&self) -> bool {
        match self {
            Cursor::Token(token) | Cursor::Marker(token) => token.is_empty(),
            Cursor::Offset { .. } | Cursor::PageNumber { .. } => false,
        }
    }

    pub fn as_token(&self) -> Option<&str> {
        match self {
            Cursor::Token(token) | Cursor::Marker(token) => Some(token.as_str()),
            Cursor::Offset { .. } | Cursor::PageNumber { .. } => None,
        }
    }

    pub fn as_page_number(&self) -> Option<(u64, u64)> {
        match self {
            Cursor::PageNumber { page, size } => Some((*page, *size)),
            _ => None,
        }
    }

    pub fn as_offset(&self) -> Option<(u64, u64)> {
        match self {
            Cursor::Offset { offset, limit } => Some((*offset, *limit)),
            _ => None,
        }
    }
}

/// One page of a list call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<Cursor>,
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Token-paged result; more pages follow iff the token is non-empty
    pub fn with_token(items: Vec<T>, next_token: impl Into<String>) -> Self {
        let token = next_token.into();
        Self::continuing(items, Cursor::Token(token))
    }

    /// Marker-paged result; more pages follow iff the marker is non-empty
    pub fn with_marker(items: Vec<T>, next_marker: impl Into<String>) -> Self {
        let marker = next_marker.into();
        Self::continuing(items, Cursor::Marker(marker))
    }

    /// Offset-paged result.
    ///
    /// With a vendor-reported `total` more pages follow iff the next offset
    /// is below it; without one, iff the page came back full.
    pub fn with_offset(items: Vec<T>, offset: u64, limit: u64, total: Option<u64>) -> Self {
        let next = offset + items.len() as u64;
        let has_more = match total {
            Some(total) => next < total,
            None => limit > 0 && items.len() as u64 >= limit,
        };
        Self {
            items,
            next: has_more.then_some(Cursor::Offset {
                offset: next,
                limit,
            }),
            has_more,
        }
    }

    /// Page-number result.
    ///
    /// The next request asks for `page + 1` however many items came back, so
    /// a short page is never fetched twice. With a vendor-reported `total`
    /// more pages follow iff `page * size` is below it; without one, iff the
    /// page came back full.
    pub fn with_page_number(items: Vec<T>, page: u64, size: u64, total: Option<u64>) -> Self {
        let has_more = match total {
            Some(total) => page.saturating_mul(size) < total,
            None => size > 0 && items.len() as u64 >= size,
        };
        Self {
            items,
            next: has_more.then_some(Cursor::PageNumber {
                page: page + 1,
                size,
            }),
            has_more,
        }
    }

    /// Final page
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next: None,
            has_more: false,
        }
    }

    fn continuing(items: Vec<T>, cursor: Cursor) -> Self {
        if cursor.is_empty() {
            return Self::last(items);
        }
        Self {
            items,
            next: Some(cursor),
            has_more: true,
        }
    }

    /// Cursor for the following page, if iteration should continue
    pub fn continuation(&self) -> Option<Cursor> {
        if !self.has_more || self.items.is_empty() {
            return None;
        }
        self.next.clone().filter(|cursor| !cursor.is_empty())
    }
}

/// Lazily walk every page starting at `initial`.
///
/// Items come out in page order. The stream ends when a page reports no
/// more results, returns no next cursor (or an empty one), or comes back
/// empty. A fetch error is yielded once and ends the stream; nothing is
/// retried here.
pub fn paginate<'a, T, F, Fut>(
    initial: Option<Cursor>,
    fetch: F,
) -> impl Stream<Item = Result<T>> + 'a
where
    T: 'a,
    F: FnMut(Option<Cursor>) -> Fut + 'a,
    Fut: Future<Output = Result<Page<T>>> + 'a,
{
    stream::try_unfold(
        (fetch, Some(initial), 0usize),
        |(mut fetch, cursor, pages)| async move {
            let Some(cursor) = cursor else {
                return Ok::<_, CloudError>(None);
            };

            let page = fetch(cursor).await?;
            let next = page.continuation();
            tracing::debug!(
                "fetched page {} with {} items (more: {})",
                pages + 1,
                page.items.len(),
                next.is_some()
            );

            let items = stream::iter(page.items.into_iter().map(Ok::<T, CloudError>));
            Ok(Some((items, (fetch, next.map(Some), pages + 1))))
        },
    )
    .try_flatten()
}

/// Collect every item of a paginated listing, or the first error
pub async fn fetch_all<T, F, Fut>(initial: Option<Cursor>, fetch: F) -> Result<Vec<T>>
where
    F: FnMut(Option<Cursor>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    paginate(initial, fetch).try_collect().await
}

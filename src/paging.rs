//! Incremental loading of catalog listings.
//!
//! [`MoviePageSource`] knows how to fetch one page of a category;
//! [`PagedMovieList`] drives it forward one page at a time for an
//! infinite-scroll consumer. The feed is append-only: there is no previous
//! page key and [`MoviePageSource::load_before`] never hits the network.

use std::{collections::HashSet, future::Future, sync::Arc};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    error::{AppError, AppResult},
    models::{CatalogMovie, SortCriteria},
    tmdb::CatalogApi,
};

pub const FIRST_PAGE: u32 = 1;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    pub movies: Vec<CatalogMovie>,
    /// `None` once the catalog reports no further pages.
    pub next_key: Option<u32>,
}

#[derive(Clone)]
pub struct MoviePageSource {
    client: Arc<dyn CatalogApi>,
    category: &'static str,
}

impl MoviePageSource {
    pub fn new(client: Arc<dyn CatalogApi>, criteria: SortCriteria) -> AppResult<Self> {
        let category = criteria.catalog_path().ok_or_else(|| {
            AppError::Config(format!("`{criteria}` is not a catalog listing"))
        })?;
        Ok(Self { client, category })
    }

    pub fn category(&self) -> &'static str {
        self.category
    }

    pub async fn load_initial(&self) -> AppResult<Page> {
        self.load(FIRST_PAGE).await
    }

    pub async fn load_after(&self, key: u32) -> AppResult<Page> {
        self.load(key).await
    }

    pub async fn load_before(&self, _key: u32) -> AppResult<Page> {
        Ok(Page::default())
    }

    async fn load(&self, page: u32) -> AppResult<Page> {
        let resp = self.client.list_movies(self.category, page).await?;

        let last_page = resp.total_pages > 0 && page >= resp.total_pages;
        // There is no page after u32::MAX; treat it as the end of the feed.
        let next_key = if resp.results.is_empty() || last_page { None } else { page.checked_add(1) };

        debug!(
            category = self.category,
            page,
            count = resp.results.len(),
            total_pages = resp.total_pages,
            "loaded catalog page"
        );

        Ok(Page { movies: resp.results, next_key })
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Cursor {
    Initial,
    After(u32),
    End,
}

/// A growing list of catalog movies for one category.
///
/// Loads are serialized through `&mut self`. Failures are logged and
/// swallowed: the cursor does not move, so the next [`load_more`] retries the
/// same page. Cancelling the list's token aborts an in-flight load and
/// discards its result.
///
/// [`load_more`]: PagedMovieList::load_more
pub struct PagedMovieList {
    source: MoviePageSource,
    movies: Vec<CatalogMovie>,
    seen: HashSet<i32>,
    cursor: Cursor,
    cancel: CancellationToken,
}

impl PagedMovieList {
    pub fn new(source: MoviePageSource, cancel: CancellationToken) -> Self {
        Self { source, movies: Vec::new(), seen: HashSet::new(), cursor: Cursor::Initial, cancel }
    }

    pub fn category(&self) -> &'static str {
        self.source.category()
    }

    pub fn movies(&self) -> &[CatalogMovie] {
        &self.movies
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor == Cursor::End
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Fetches the next page and appends it. Returns how many movies were
    /// added; zero on failure, cancellation or end of feed.
    pub async fn load_more(&mut self) -> usize {
        let category = self.category();

        let result = match self.cursor {
            Cursor::End => return 0,
            Cursor::Initial => cancellable(&self.cancel, self.source.load_initial()).await,
            Cursor::After(key) => cancellable(&self.cancel, self.source.load_after(key)).await,
        };

        let page = match result {
            Ok(page) => page,
            Err(AppError::Cancelled) => {
                debug!(category, "page load cancelled");
                return 0;
            },
            Err(err) => {
                warn!(category, error = %err, offline = err.is_offline(), "page load failed");
                return 0;
            },
        };

        self.cursor = page.next_key.map_or(Cursor::End, Cursor::After);

        let before = self.movies.len();
        for movie in page.movies {
            if self.seen.insert(movie.id) {
                self.movies.push(movie);
            } else {
                debug!(category, movie_id = movie.id, "skipping duplicate movie");
            }
        }
        self.movies.len() - before
    }
}

/// Runs `fut` unless `cancel` fires first, in which case `fut` is dropped.
pub(crate) async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = AppResult<T>>,
) -> AppResult<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AppError::Cancelled),
        res = fut => res,
    }
}

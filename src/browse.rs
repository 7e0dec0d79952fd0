use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    error::AppResult,
    models::SortCriteria,
    paging::{MoviePageSource, PagedMovieList},
    prefs::Preferences,
    tmdb::CatalogApi,
};

/// Owns the listing for the active sort criteria.
///
/// Changing the criteria persists it, cancels the current list (dropping any
/// page still in flight) and starts a fresh one from page 1. `Favorites` has
/// no catalog list; consumers read the favorites store instead.
pub struct Browser {
    client: Arc<dyn CatalogApi>,
    prefs: Preferences,
    cancel: CancellationToken,
    criteria: SortCriteria,
    list: Option<PagedMovieList>,
}

impl Browser {
    /// Restores the persisted criteria.
    pub async fn open(
        client: Arc<dyn CatalogApi>,
        prefs: Preferences,
        cancel: &CancellationToken,
    ) -> AppResult<Self> {
        let criteria = prefs.sort_criteria().await?;
        let cancel = cancel.child_token();
        let list = build_list(&client, criteria, &cancel)?;
        Ok(Self { client, prefs, cancel, criteria, list })
    }

    pub fn criteria(&self) -> SortCriteria {
        self.criteria
    }

    pub fn list(&self) -> Option<&PagedMovieList> {
        self.list.as_ref()
    }

    pub fn list_mut(&mut self) -> Option<&mut PagedMovieList> {
        self.list.as_mut()
    }

    pub async fn select(&mut self, criteria: SortCriteria) -> AppResult<()> {
        self.prefs.set_sort_criteria(criteria).await?;
        if criteria == self.criteria && self.list.as_ref().is_none_or(|l| !l.is_cancelled()) {
            return Ok(());
        }

        if let Some(old) = self.list.take() {
            old.cancel();
        }
        info!(from = %self.criteria, to = %criteria, "sort criteria changed");

        self.criteria = criteria;
        self.list = build_list(&self.client, criteria, &self.cancel)?;
        Ok(())
    }
}

impl Drop for Browser {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn build_list(
    client: &Arc<dyn CatalogApi>,
    criteria: SortCriteria,
    cancel: &CancellationToken,
) -> AppResult<Option<PagedMovieList>> {
    if criteria.catalog_path().is_none() {
        return Ok(None);
    }
    let source = MoviePageSource::new(client.clone(), criteria)?;
    Ok(Some(PagedMovieList::new(source, cancel.child_token())))
}

//! Movie detail loading and the favorite toggle that lives on it.

use futures::{StreamExt, future, stream::BoxStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    error::{AppError, AppResult},
    favorites::{FavoriteState, FavoritesStore, NewFavorite},
    models::{self, CatalogMovieDetails, Review, Video},
    paging::cancellable,
    tmdb::CatalogApi,
};

/// Details, videos and reviews for one movie plus the display strings
/// derived from them.
#[derive(Clone, Debug, PartialEq)]
pub struct MovieDetail {
    pub details: CatalogMovieDetails,
    pub videos: Vec<Video>,
    pub reviews: Vec<Review>,
    pub runtime: String,
    pub release_year: String,
    pub genre: String,
}

impl MovieDetail {
    pub fn new(details: CatalogMovieDetails, videos: Vec<Video>, reviews: Vec<Review>) -> Self {
        let runtime = models::format_runtime(details.runtime);
        let release_year = models::release_year(&details.movie.release_date);
        let genre = models::genre_list(&details.genres);
        Self { details, videos, reviews, runtime, release_year, genre }
    }

    pub fn movie_id(&self) -> i32 {
        self.details.movie.id
    }

    pub fn trailers(&self) -> impl Iterator<Item = &Video> {
        self.videos.iter().filter(|v| v.is_trailer())
    }

    /// Favorite record carrying the strings already shown for this movie.
    pub fn to_favorite(&self) -> NewFavorite {
        NewFavorite::from_movie(
            &self.details.movie,
            self.runtime.clone(),
            self.release_year.clone(),
            self.genre.clone(),
        )
    }
}

/// An open detail view. Dropping it cancels anything it still has running,
/// including its favorite observation streams.
pub struct MovieDetailSession {
    detail: MovieDetail,
    store: FavoritesStore,
    cancel: CancellationToken,
}

impl MovieDetailSession {
    /// Fetches details (with credits), videos and reviews concurrently.
    ///
    /// Details are required; videos and reviews degrade to empty lists when
    /// their requests fail.
    pub async fn open(
        client: &dyn CatalogApi,
        store: FavoritesStore,
        movie_id: i32,
        parent: &CancellationToken,
    ) -> AppResult<Self> {
        let cancel = parent.child_token();

        let detail = cancellable(&cancel, async {
            let (details, videos, reviews) = tokio::join!(
                client.movie_details(movie_id),
                client.movie_videos(movie_id),
                client.movie_reviews(movie_id),
            );

            let videos = videos.unwrap_or_else(|err| {
                warn!(movie_id, error = %err, "failed to load videos");
                Vec::new()
            });
            let reviews = reviews.unwrap_or_else(|err| {
                warn!(movie_id, error = %err, "failed to load reviews");
                Vec::new()
            });

            Ok::<_, AppError>(MovieDetail::new(details?, videos, reviews))
        })
        .await?;

        debug!(
            movie_id,
            videos = detail.videos.len(),
            reviews = detail.reviews.len(),
            "movie detail loaded"
        );

        Ok(Self { detail, store, cancel })
    }

    pub fn detail(&self) -> &MovieDetail {
        &self.detail
    }

    /// Live favorite flag for this movie: the current value first, then a new
    /// value after every change to the favorites table. Ends when the session
    /// is dropped.
    pub fn is_favorite(&self) -> BoxStream<'static, bool> {
        let movie_id = self.detail.movie_id();
        self.store
            .observe_by_movie_id(movie_id)
            .filter_map(move |row| {
                future::ready(match row {
                    Ok(row) => Some(row.is_some()),
                    Err(err) => {
                        warn!(movie_id, error = %err, "favorite lookup failed");
                        None
                    },
                })
            })
            .take_until(self.cancel.clone().cancelled_owned())
            .boxed()
    }

    pub async fn toggle_favorite(&self) -> AppResult<FavoriteState> {
        self.store.toggle(self.detail.to_favorite()).await
    }
}

impl Drop for MovieDetailSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

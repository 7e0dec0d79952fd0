use std::{future::Future, sync::Arc};

use futures::{
    StreamExt,
    stream::{self, BoxStream},
};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait, sea_query::OnConflict,
};
use tokio::sync::watch;
use tracing::debug;

use crate::{
    db::Database,
    entities::favorite,
    error::AppResult,
    models::{self, CatalogMovie, CatalogMovieDetails},
};

/// Insert payload for a favorite. The display strings are computed once, when
/// the movie is favorited, and never refreshed from the catalog.
#[derive(Clone, Debug, PartialEq)]
pub struct NewFavorite {
    pub movie_id: i32,
    pub original_title: String,
    pub title: String,
    pub poster_path: Option<String>,
    pub overview: String,
    pub vote_average: f64,
    pub release_date: String,
    pub backdrop_path: Option<String>,
    pub runtime: String,
    pub release_year: String,
    pub genre: String,
}

impl NewFavorite {
    pub fn from_movie(movie: &CatalogMovie, runtime: String, release_year: String, genre: String) -> Self {
        Self {
            movie_id: movie.id,
            original_title: movie.original_title.clone(),
            title: movie.title.clone(),
            poster_path: movie.poster_path.clone(),
            overview: movie.overview.clone(),
            vote_average: movie.vote_average,
            release_date: movie.release_date.clone(),
            backdrop_path: movie.backdrop_path.clone(),
            runtime,
            release_year,
            genre,
        }
    }

    pub fn from_details(details: &CatalogMovieDetails) -> Self {
        Self::from_movie(
            &details.movie,
            models::format_runtime(details.runtime),
            models::release_year(&details.movie.release_date),
            models::genre_list(&details.genres),
        )
    }

    fn into_active_model(self, date: i64) -> favorite::ActiveModel {
        favorite::ActiveModel {
            id: Default::default(),
            movie_id: Set(self.movie_id),
            original_title: Set(self.original_title),
            title: Set(self.title),
            poster_path: Set(self.poster_path),
            overview: Set(self.overview),
            vote_average: Set(self.vote_average),
            release_date: Set(self.release_date),
            backdrop_path: Set(self.backdrop_path),
            date: Set(date),
            runtime: Set(self.runtime),
            release_year: Set(self.release_year),
            genre: Set(self.genre),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FavoriteState {
    Added,
    Removed,
}

/// Local favorites table with live queries.
///
/// Every mutation bumps a revision counter; the `observe_*` streams re-run
/// their query after each bump, so an observer is at most one update behind
/// any writer on the same database.
#[derive(Clone)]
pub struct FavoritesStore {
    db: DatabaseConnection,
    revision: Arc<watch::Sender<u64>>,
}

impl FavoritesStore {
    /// Stores built from the same [`Database`] (or its clones) share one
    /// change feed, so observers see writes made through any of them.
    pub fn new(db: &Database) -> Self {
        Self { db: db.conn().clone(), revision: db.favorites_revision() }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Newest first.
    pub async fn all(&self) -> AppResult<Vec<favorite::Model>> {
        let rows = favorite::Entity::find()
            .order_by_desc(favorite::Column::Date)
            .order_by_desc(favorite::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows)
    }

    pub async fn find_by_movie_id(&self, movie_id: i32) -> AppResult<Option<favorite::Model>> {
        let row = favorite::Entity::find()
            .filter(favorite::Column::MovieId.eq(movie_id))
            .one(&self.db)
            .await?;
        Ok(row)
    }

    pub fn observe_all(&self) -> BoxStream<'static, AppResult<Vec<favorite::Model>>> {
        self.observe(|store| async move { store.all().await })
    }

    pub fn observe_by_movie_id(
        &self,
        movie_id: i32,
    ) -> BoxStream<'static, AppResult<Option<favorite::Model>>> {
        self.observe(move |store| async move { store.find_by_movie_id(movie_id).await })
    }

    /// Stores the favorite, replacing the display fields of an existing row
    /// for the same movie. The original favoriting time is kept.
    pub async fn insert(&self, fav: NewFavorite) -> AppResult<favorite::Model> {
        let movie_id = fav.movie_id;

        favorite::Entity::insert(fav.into_active_model(now_sec()))
            .on_conflict(
                OnConflict::column(favorite::Column::MovieId)
                    .update_columns([
                        favorite::Column::OriginalTitle,
                        favorite::Column::Title,
                        favorite::Column::PosterPath,
                        favorite::Column::Overview,
                        favorite::Column::VoteAverage,
                        favorite::Column::ReleaseDate,
                        favorite::Column::BackdropPath,
                        favorite::Column::Runtime,
                        favorite::Column::ReleaseYear,
                        favorite::Column::Genre,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;

        self.notify();
        debug!(movie_id, "favorite stored");

        let row = self.find_by_movie_id(movie_id).await?.ok_or_else(|| {
            DbErr::RecordNotFound(format!("favorite for movie {movie_id} after insert"))
        })?;
        Ok(row)
    }

    /// Deletes by local row id. Returns whether a row was removed.
    pub async fn delete(&self, id: i32) -> AppResult<bool> {
        let res = favorite::Entity::delete_by_id(id).exec(&self.db).await?;
        if res.rows_affected > 0 {
            self.notify();
            debug!(id, "favorite deleted");
        }
        Ok(res.rows_affected > 0)
    }

    pub async fn delete_by_movie_id(&self, movie_id: i32) -> AppResult<bool> {
        let res = favorite::Entity::delete_many()
            .filter(favorite::Column::MovieId.eq(movie_id))
            .exec(&self.db)
            .await?;
        if res.rows_affected > 0 {
            self.notify();
            debug!(movie_id, "favorite deleted");
        }
        Ok(res.rows_affected > 0)
    }

    /// Adds the movie if it is not a favorite, removes it otherwise, in one
    /// transaction keyed by the catalog id.
    pub async fn toggle(&self, fav: NewFavorite) -> AppResult<FavoriteState> {
        let movie_id = fav.movie_id;
        let txn = self.db.begin().await?;

        let removed = favorite::Entity::delete_many()
            .filter(favorite::Column::MovieId.eq(movie_id))
            .exec(&txn)
            .await?;

        let state = if removed.rows_affected > 0 {
            FavoriteState::Removed
        } else {
            favorite::Entity::insert(fav.into_active_model(now_sec())).exec(&txn).await?;
            FavoriteState::Added
        };

        txn.commit().await?;
        self.notify();
        debug!(movie_id, ?state, "favorite toggled");
        Ok(state)
    }

    fn notify(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    fn observe<T, F, Fut>(&self, query: F) -> BoxStream<'static, AppResult<T>>
    where
        T: Send + 'static,
        F: Fn(FavoritesStore) -> Fut + Send + 'static,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
    {
        let rx = self.revision.subscribe();
        stream::unfold((self.clone(), rx, query, true), |(store, mut rx, query, first)| async move {
            if !first && rx.changed().await.is_err() {
                return None;
            }
            // Changes landing while the query runs trigger another round.
            let _ = rx.borrow_and_update();
            let fut = query(store.clone());
            let item = fut.await;
            Some((item, (store, rx, query, false)))
        })
        .boxed()
    }
}

fn now_sec() -> i64 {
    jiff::Timestamp::now().as_second()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::db;

    fn fight_club() -> NewFavorite {
        let details: CatalogMovieDetails =
            serde_json::from_str(include_str!("../tests/fixtures/movie_550.json")).unwrap();
        NewFavorite::from_details(&details)
    }

    async fn count_for(store: &FavoritesStore, movie_id: i32) -> usize {
        favorite::Entity::find()
            .filter(favorite::Column::MovieId.eq(movie_id))
            .all(store.db())
            .await
            .unwrap()
            .len()
    }

    #[test]
    fn derived_strings_come_from_details() {
        let fav = fight_club();
        assert_eq!(fav.movie_id, 550);
        assert_eq!(fav.runtime, "2h 19m");
        assert_eq!(fav.release_year, "1999");
        assert_eq!(fav.genre, "Drama, Thriller");
    }

    #[test]
    fn empty_genres_give_empty_genre_string() {
        let details: CatalogMovieDetails =
            serde_json::from_str(include_str!("../tests/fixtures/movie_13_no_genres.json")).unwrap();
        let fav = NewFavorite::from_details(&details);
        assert_eq!(fav.genre, "");
        assert_eq!(fav.runtime, "");
        assert_eq!(fav.release_year, "1994");
    }

    #[tokio::test]
    async fn toggle_on_then_off_leaves_no_rows() {
        let store = FavoritesStore::new(&db::memory().await);

        assert_eq!(store.toggle(fight_club()).await.unwrap(), FavoriteState::Added);
        assert_eq!(count_for(&store, 550).await, 1);

        assert_eq!(store.toggle(fight_club()).await.unwrap(), FavoriteState::Removed);
        assert_eq!(count_for(&store, 550).await, 0);
    }

    #[tokio::test]
    async fn inserting_twice_keeps_one_row() {
        let store = FavoritesStore::new(&db::memory().await);

        let first = store.insert(fight_club()).await.unwrap();
        let mut renamed = fight_club();
        renamed.title = "Fight Club (Director's Cut)".into();
        let second = store.insert(renamed).await.unwrap();

        assert_eq!(count_for(&store, 550).await, 1);
        assert_eq!(first.id, second.id);
        assert_eq!(first.date, second.date);
        assert_eq!(second.title, "Fight Club (Director's Cut)");
    }

    #[tokio::test]
    async fn raw_duplicate_insert_is_rejected() {
        let store = FavoritesStore::new(&db::memory().await);
        store.insert(fight_club()).await.unwrap();

        let dup = favorite::Entity::insert(fight_club().into_active_model(0)).exec(store.db()).await;
        assert!(dup.is_err());
    }

    #[tokio::test]
    async fn delete_by_local_id_and_movie_id() {
        let store = FavoritesStore::new(&db::memory().await);
        let row = store.insert(fight_club()).await.unwrap();

        assert!(store.delete(row.id).await.unwrap());
        assert!(!store.delete(row.id).await.unwrap());

        store.insert(fight_club()).await.unwrap();
        assert!(store.delete_by_movie_id(550).await.unwrap());
        assert!(store.find_by_movie_id(550).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn all_lists_newest_first() {
        let store = FavoritesStore::new(&db::memory().await);
        let mut older = fight_club();
        older.movie_id = 1;
        store.insert(older).await.unwrap();
        store.insert(fight_club()).await.unwrap();

        let ids: Vec<i32> = store.all().await.unwrap().iter().map(|f| f.movie_id).collect();
        assert_eq!(ids, vec![550, 1]);
    }

    #[tokio::test]
    async fn observer_sees_mutations_from_another_handle() {
        let store = FavoritesStore::new(&db::memory().await);
        let writer = store.clone();
        let mut watch = store.observe_by_movie_id(550);

        assert!(watch.next().await.unwrap().unwrap().is_none());

        writer.toggle(fight_club()).await.unwrap();
        let seen = tokio::time::timeout(Duration::from_secs(5), watch.next()).await.unwrap();
        assert_eq!(seen.unwrap().unwrap().map(|f| f.movie_id), Some(550));

        writer.delete_by_movie_id(550).await.unwrap();
        let seen = tokio::time::timeout(Duration::from_secs(5), watch.next()).await.unwrap();
        assert!(seen.unwrap().unwrap().is_none());
    }

    #[tokio::test]
    async fn stores_over_one_database_share_updates() {
        let db = db::memory().await;
        let reader = FavoritesStore::new(&db);
        let writer = FavoritesStore::new(&db.clone());
        let mut watch = reader.observe_by_movie_id(550);
        assert!(watch.next().await.unwrap().unwrap().is_none());

        writer.insert(fight_club()).await.unwrap();
        let seen = tokio::time::timeout(Duration::from_secs(5), watch.next()).await.unwrap();
        assert_eq!(seen.unwrap().unwrap().map(|f| f.movie_id), Some(550));

        writer.toggle(fight_club()).await.unwrap();
        let seen = tokio::time::timeout(Duration::from_secs(5), watch.next()).await.unwrap();
        assert!(seen.unwrap().unwrap().is_none());
    }

    #[tokio::test]
    async fn observe_all_tracks_row_count() {
        let store = FavoritesStore::new(&db::memory().await);
        let mut all = store.observe_all();
        assert!(all.next().await.unwrap().unwrap().is_empty());

        store.insert(fight_club()).await.unwrap();
        assert_eq!(all.next().await.unwrap().unwrap().len(), 1);
    }
}

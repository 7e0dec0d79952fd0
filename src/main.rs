use std::sync::Arc;

use clap::{Parser, Subcommand};
use cinelist::{
    browse::Browser,
    config::Config,
    db::Database,
    detail::MovieDetailSession,
    entities::favorite,
    favorites::{FavoriteState, FavoritesStore},
    models::{self, CatalogMovie, ImageSize, SortCriteria},
    prefs::Preferences,
    tmdb::{CatalogApi, TmdbClient},
};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "cinelist", version, about = "Browse the movie catalog and keep local favorites")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List movies for a sort criteria (the saved one by default).
    Browse {
        #[arg(short, long)]
        category: Option<SortCriteria>,
        #[arg(short, long, default_value_t = 1)]
        pages: u32,
    },
    /// Show details, cast, trailers and reviews for a movie.
    Details { movie_id: i32 },
    /// Add the movie to favorites, or remove it if it already is one.
    Favorite { movie_id: i32 },
    /// List favorites, newest first.
    Favorites,
    /// Remove a favorite by catalog id.
    Remove { movie_id: i32 },
    /// Show or change the saved sort criteria.
    Category { criteria: Option<SortCriteria> },
}

struct App {
    config: Arc<Config>,
    tmdb: Arc<TmdbClient>,
    store: FavoritesStore,
    prefs: Preferences,
    cancel: CancellationToken,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,cinelist=debug,sqlx=warn".to_string()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Arc::new(Config::from_env()?);

    let http = reqwest::Client::builder()
        .user_agent("cinelist/0.1")
        .timeout(config.http_timeout)
        .build()?;

    let db = Database::connect(&config.database_url).await?;

    let tmdb = Arc::new(TmdbClient::new(
        http,
        config.tmdb_api_key.clone(),
        config.tmdb_base_url.clone(),
        config.tmdb_language.clone(),
        config.tmdb_rps,
    ));

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted");
            on_interrupt.cancel();
        }
    });

    let app = App {
        config,
        tmdb,
        store: FavoritesStore::new(&db),
        prefs: Preferences::new(&db),
        cancel,
    };

    match cli.command {
        Command::Browse { category, pages } => app.browse(category, pages).await,
        Command::Details { movie_id } => app.details(movie_id).await,
        Command::Favorite { movie_id } => app.toggle(movie_id).await,
        Command::Favorites => app.favorites().await,
        Command::Remove { movie_id } => app.remove(movie_id).await,
        Command::Category { criteria } => app.category(criteria).await,
    }
}

impl App {
    fn catalog(&self) -> Arc<dyn CatalogApi> {
        self.tmdb.clone()
    }

    async fn offline_banner(&self) {
        if !self.tmdb.is_reachable().await {
            println!("! No connection to the movie catalog. Check your network and try again.");
        }
    }

    async fn browse(&self, category: Option<SortCriteria>, pages: u32) -> anyhow::Result<()> {
        let mut browser = Browser::open(self.catalog(), self.prefs.clone(), &self.cancel).await?;
        if let Some(criteria) = category {
            browser.select(criteria).await?;
        }

        let criteria = browser.criteria();
        let Some(list) = browser.list_mut() else {
            return self.favorites().await;
        };

        for _ in 0..pages.max(1) {
            if list.load_more().await == 0 && (list.is_exhausted() || list.is_cancelled()) {
                break;
            }
        }

        if list.movies().is_empty() {
            self.offline_banner().await;
            println!("No movies found for {criteria}.");
            return Ok(());
        }

        println!("{criteria}:");
        for movie in list.movies() {
            print_movie_line(movie);
        }
        Ok(())
    }

    async fn details(&self, movie_id: i32) -> anyhow::Result<()> {
        let session = match self.open(movie_id).await {
            Ok(session) => session,
            Err(err) => {
                self.offline_banner().await;
                return Err(err);
            },
        };
        let detail = session.detail();
        let movie = &detail.details.movie;

        let is_favorite = session.is_favorite().next().await.unwrap_or(false);

        println!("{} ({}){}", movie.title, detail.release_year, if is_favorite { "  ★" } else { "" });
        if movie.original_title != movie.title && !movie.original_title.is_empty() {
            println!("  original title: {}", movie.original_title);
        }
        if let Some(tagline) = detail.details.tagline.as_deref().filter(|t| !t.is_empty()) {
            println!("  \"{tagline}\"");
        }
        println!(
            "  {:.1}/10 ({} votes)  {}  {}",
            movie.vote_average, detail.details.vote_count, detail.runtime, detail.genre
        );
        println!("  status: {}", detail.details.status);
        if detail.details.budget > 0 {
            println!("  budget: ${}  revenue: ${}", detail.details.budget, detail.details.revenue);
        }
        if let Some(poster) = &movie.poster_path {
            println!(
                "  poster: {}",
                models::image_url(&self.config.tmdb_image_base_url, poster, ImageSize::Poster)
            );
        }
        println!();
        println!("{}", movie.overview);

        let directors: Vec<&str> =
            detail.details.credits.directors().map(|d| d.name.as_str()).collect();
        if !directors.is_empty() {
            println!();
            println!("Directed by {}", directors.join(", "));
        }

        println!();
        println!("Cast:");
        if detail.details.credits.cast.is_empty() {
            println!("  no cast information");
        }
        for member in detail.details.credits.cast.iter().take(10) {
            println!("  {} as {}", member.name, member.character);
        }

        println!();
        println!("Trailers:");
        let mut trailers = detail.trailers().peekable();
        if trailers.peek().is_none() {
            println!("  no trailers");
        }
        for video in trailers {
            match video.youtube_url() {
                Some(url) => println!("  {} {}", video.name, url),
                None => println!("  {} ({})", video.name, video.site),
            }
        }

        println!();
        println!("Reviews:");
        if detail.reviews.is_empty() {
            println!("  no reviews");
        }
        for review in &detail.reviews {
            let excerpt: String = review.content.chars().take(200).collect();
            println!("  {}: {}", review.author, excerpt.replace('\n', " "));
        }
        Ok(())
    }

    async fn toggle(&self, movie_id: i32) -> anyhow::Result<()> {
        let session = self.open(movie_id).await?;
        let title = session.detail().details.movie.title.clone();
        match session.toggle_favorite().await? {
            FavoriteState::Added => println!("Added {title} to favorites."),
            FavoriteState::Removed => println!("Removed {title} from favorites."),
        }
        Ok(())
    }

    async fn favorites(&self) -> anyhow::Result<()> {
        let favorites = self.store.all().await?;
        if favorites.is_empty() {
            println!("No favorites yet.");
            return Ok(());
        }
        println!("favorites:");
        for fav in &favorites {
            print_favorite_line(fav);
        }
        Ok(())
    }

    async fn remove(&self, movie_id: i32) -> anyhow::Result<()> {
        if self.store.delete_by_movie_id(movie_id).await? {
            println!("Removed {movie_id} from favorites.");
        } else {
            println!("{movie_id} is not a favorite.");
        }
        Ok(())
    }

    async fn category(&self, criteria: Option<SortCriteria>) -> anyhow::Result<()> {
        match criteria {
            Some(criteria) => {
                self.prefs.set_sort_criteria(criteria).await?;
                println!("Sort criteria set to {criteria}.");
            },
            None => println!("{}", self.prefs.sort_criteria().await?),
        }
        Ok(())
    }

    async fn open(&self, movie_id: i32) -> anyhow::Result<MovieDetailSession> {
        let session =
            MovieDetailSession::open(self.tmdb.as_ref(), self.store.clone(), movie_id, &self.cancel)
                .await?;
        Ok(session)
    }
}

fn print_movie_line(movie: &CatalogMovie) {
    let year = models::release_year(&movie.release_date);
    println!("  {:>8}  {:.1}  {} ({})", movie.id, movie.vote_average, movie.title, year);
}

fn print_favorite_line(fav: &favorite::Model) {
    let added = jiff::Timestamp::from_second(fav.date)
        .map(|ts| ts.strftime("%Y-%m-%d").to_string())
        .unwrap_or_default();
    println!(
        "  {:>8}  {:.1}  {} ({})  {}  {}  added {}",
        fav.movie_id, fav.vote_average, fav.title, fav.release_year, fav.runtime, fav.genre, added
    );
}

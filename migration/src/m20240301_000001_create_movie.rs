use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Movie::Table)
                    .if_not_exists()
                    .col(pk_auto(Movie::Id))
                    .col(integer(Movie::MovieId))
                    .col(string(Movie::OriginalTitle))
                    .col(string(Movie::Title))
                    .col(string_null(Movie::PosterPath))
                    .col(text(Movie::Overview))
                    .col(double(Movie::VoteAverage))
                    .col(string(Movie::ReleaseDate))
                    .col(string_null(Movie::BackdropPath))
                    .col(big_integer(Movie::Date))
                    .col(string(Movie::Runtime))
                    .col(string(Movie::ReleaseYear))
                    .col(string(Movie::Genre))
                    .to_owned(),
            )
            .await?;

        // One favorite per catalog movie.
        manager
            .create_index(
                Index::create()
                    .name("idx_movie_movie_id_unique")
                    .table(Movie::Table)
                    .col(Movie::MovieId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movie_date")
                    .table(Movie::Table)
                    .col(Movie::Date)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Movie::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Movie {
    Table,
    Id,
    MovieId,
    OriginalTitle,
    Title,
    PosterPath,
    Overview,
    VoteAverage,
    ReleaseDate,
    BackdropPath,
    Date,
    Runtime,
    ReleaseYear,
    Genre,
}

use sea_orm::entity::prelude::*;

/// A locally bookmarked catalog movie. `movie_id` is the catalog id and is
/// unique; the display strings are frozen at the time of favoriting.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "movie")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub movie_id: i32,
    pub original_title: String,
    pub title: String,
    pub poster_path: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub overview: String,
    #[sea_orm(column_type = "Double")]
    pub vote_average: f64,
    pub release_date: String,
    pub backdrop_path: Option<String>,
    pub date: i64,
    pub runtime: String,
    pub release_year: String,
    pub genre: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

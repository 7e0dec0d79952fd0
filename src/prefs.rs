use sea_orm::{DatabaseConnection, EntityTrait, Set, sea_query::OnConflict};
use tracing::warn;

use crate::{db::Database, entities::setting, error::AppResult, models::SortCriteria};

const SORT_CRITERIA_KEY: &str = "sort_criteria";

/// Key-value user settings.
#[derive(Clone)]
pub struct Preferences {
    db: DatabaseConnection,
}

impl Preferences {
    pub fn new(db: &Database) -> Self {
        Self { db: db.conn().clone() }
    }

    /// The persisted sort criteria, `popular` when unset or unrecognised.
    pub async fn sort_criteria(&self) -> AppResult<SortCriteria> {
        let Some(value) = self.get(SORT_CRITERIA_KEY).await? else {
            return Ok(SortCriteria::default());
        };
        Ok(value.parse().unwrap_or_else(|_| {
            warn!(%value, "ignoring unknown stored sort criteria");
            SortCriteria::default()
        }))
    }

    pub async fn set_sort_criteria(&self, criteria: SortCriteria) -> AppResult<()> {
        self.set(SORT_CRITERIA_KEY, criteria.as_str()).await
    }

    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let row = setting::Entity::find_by_id(key.to_string()).one(&self.db).await?;
        Ok(row.map(|r| r.value))
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let model = setting::ActiveModel { key: Set(key.to_string()), value: Set(value.to_string()) };

        setting::Entity::insert(model)
            .on_conflict(
                OnConflict::column(setting::Column::Key)
                    .update_column(setting::Column::Value)
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;

        Ok(())
    }
}

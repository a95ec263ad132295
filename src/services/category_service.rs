use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::db::repository;
use crate::error::AppError;
use crate::models::{Category, NewCategoryRequest};

pub struct CategoryService {
    db: SqlitePool,
}

impl CategoryService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> Result<Vec<Category>, AppError> {
        Ok(repository::fetch_categories(&self.db).await?)
    }

    pub async fn create(&self, req: NewCategoryRequest) -> Result<Category, AppError> {
        let category = repository::insert_category(&self.db, req).await?;
        debug!("created category {}", category.id);
        Ok(category)
    }

    /// Detaches every todo of the category, then removes it, in one
    /// transaction. Deleting an unknown id succeeds and changes nothing.
    pub async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let mut tx = self.db.begin().await?;

        let detached = repository::detach_todos(&mut *tx, id).await?;
        let deleted = repository::delete_category(&mut *tx, id).await?;

        tx.commit().await?;

        if deleted {
            info!("deleted category {} ({} todos detached)", id, detached);
        } else {
            debug!("category {} did not exist", id);
        }
        Ok(true)
    }
}

use sqlx::SqlitePool;
use tracing::debug;

use crate::db::repository;
use crate::error::AppError;
use crate::models::{
    NewTodoRequest, Todo, TodoFilter, TodoQueryParams, UNCATEGORIZED, UpdateTodoRequest,
};

pub struct TodoService {
    db: SqlitePool,
}

impl TodoService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// All todos matching the query, newest first, categories attached.
    pub async fn list(&self, params: TodoQueryParams) -> Result<Vec<Todo>, AppError> {
        let filter = TodoFilter::try_from(params)?;
        Ok(repository::fetch_todos(&self.db, &filter).await?)
    }

    /// The returned todo does not carry its category; reads and updates do.
    pub async fn create(&self, req: NewTodoRequest) -> Result<Todo, AppError> {
        let mut tx = self.db.begin().await?;

        ensure_category(&mut tx, req.category_id()).await?;
        let todo = repository::insert_todo(&mut *tx, req).await?;

        tx.commit().await?;
        debug!("created todo {}", todo.id);
        Ok(todo)
    }

    /// Applies only the fields present in `changes` and returns the stored
    /// todo with its category.
    pub async fn update(&self, id: i64, changes: UpdateTodoRequest) -> Result<Todo, AppError> {
        let mut tx = self.db.begin().await?;

        if !repository::todo_exists(&mut *tx, id).await? {
            return Err(todo_not_found(id));
        }
        if let Some(category_id) = changes.category_id() {
            ensure_category(&mut tx, category_id).await?;
        }
        repository::update_todo(&mut *tx, id, &changes).await?;

        tx.commit().await?;
        debug!("updated todo {}", id);

        repository::find_todo_by_id(&self.db, id)
            .await?
            .ok_or_else(|| todo_not_found(id))
    }

    pub async fn delete(&self, id: i64) -> Result<bool, AppError> {
        if !repository::delete_todo(&self.db, id).await? {
            return Err(todo_not_found(id));
        }
        debug!("deleted todo {}", id);
        Ok(true)
    }
}

async fn ensure_category(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    category_id: i64,
) -> Result<(), AppError> {
    if category_id == UNCATEGORIZED || repository::category_exists(&mut **tx, category_id).await? {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "category {category_id} does not exist"
        )))
    }
}

fn todo_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("todo {id} not found"))
}

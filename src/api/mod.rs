mod extract;

use axum::Json;
use axum::routing::{delete, put};
use axum::{Router, extract::State, http::StatusCode, routing::get};

use crate::error::AppError;
use crate::models::*;
use crate::services::{CategoryService, TodoService};
use crate::state::AppState;

use extract::{AppJson, AppPath, AppQuery};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/categories", get(list_categories).post(create_category))
        .route("/api/categories/{id}", delete(delete_category))
        .route("/api/todos", get(list_todos).post(create_todo))
        .route("/api/todos/{id}", put(update_todo).delete(delete_todo))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<DataResponse<Vec<Category>>>, AppError> {
    let categories = CategoryService::new(state.db).list().await?;
    Ok(Json(DataResponse::new(categories)))
}

async fn create_category(
    State(state): State<AppState>,
    AppJson(req): AppJson<NewCategoryRequest>,
) -> Result<Json<DataResponse<Category>>, AppError> {
    let category = CategoryService::new(state.db).create(req).await?;
    Ok(Json(DataResponse::new(category)))
}

async fn delete_category(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<DataResponse<bool>>, AppError> {
    let ok = CategoryService::new(state.db).delete(id).await?;
    Ok(Json(DataResponse::new(ok)))
}

async fn list_todos(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<TodoQueryParams>,
) -> Result<Json<DataResponse<Vec<Todo>>>, AppError> {
    let todos = TodoService::new(state.db).list(params).await?;
    Ok(Json(DataResponse::new(todos)))
}

async fn create_todo(
    State(state): State<AppState>,
    AppJson(req): AppJson<NewTodoRequest>,
) -> Result<Json<DataResponse<Todo>>, AppError> {
    let todo = TodoService::new(state.db).create(req).await?;
    Ok(Json(DataResponse::new(todo)))
}

async fn update_todo(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    AppJson(changes): AppJson<UpdateTodoRequest>,
) -> Result<Json<DataResponse<Todo>>, AppError> {
    let todo = TodoService::new(state.db).update(id, changes).await?;
    Ok(Json(DataResponse::new(todo)))
}

async fn delete_todo(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<DataResponse<bool>>, AppError> {
    let ok = TodoService::new(state.db).delete(id).await?;
    Ok(Json(DataResponse::new(ok)))
}

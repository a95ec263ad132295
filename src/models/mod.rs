pub mod category;
pub mod todo;

use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;

pub use category::{Category, NewCategoryRequest};
pub use todo::{NewTodoRequest, Todo, TodoFilter, TodoQueryParams, UpdateTodoRequest, UNCATEGORIZED};

/// Envelope for every successful response: `{"data": ...}`.
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Current time at the precision the database stores.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

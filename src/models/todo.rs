use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;
use crate::models::Category;

/// `category_id` value meaning "no category assigned".
pub const UNCATEGORIZED: i64 = 0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub priority: String,
    pub category_id: i64,
    /// Attached on reads and after updates; `None` for uncategorized todos
    /// and for the record returned by create.
    pub category: Option<Category>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTodoRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub category_id: Option<i64>,
}

impl NewTodoRequest {
    pub fn category_id(&self) -> i64 {
        self.category_id.unwrap_or(UNCATEGORIZED)
    }
}

/// Field mask for a partial update. An absent field is left alone; for the
/// nullable fields an explicit `null` is a change (clear / detach), for the
/// others it is rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateTodoRequest {
    #[serde(default, deserialize_with = "present")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub completed: Option<bool>,
    #[serde(default, deserialize_with = "present")]
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub category_id: Option<Option<i64>>,
}

impl UpdateTodoRequest {
    /// The category the todo should point at after the update, if the
    /// update touches it at all.
    pub fn category_id(&self) -> Option<i64> {
        self.category_id.map(|id| id.unwrap_or(UNCATEGORIZED))
    }
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Raw `GET /api/todos` query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TodoQueryParams {
    pub category_id: Option<String>,
    pub search: Option<String>,
}

/// Validated filters for listing todos. Both filters apply together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TodoFilter {
    pub category_id: Option<i64>,
    pub search: Option<String>,
}

impl TryFrom<TodoQueryParams> for TodoFilter {
    type Error = AppError;

    fn try_from(params: TodoQueryParams) -> Result<Self, Self::Error> {
        let category_id = match params.category_id.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => {
                let id = raw.parse::<i64>().map_err(|_| {
                    AppError::BadRequest(format!("invalid category_id: {raw}"))
                })?;
                (id != UNCATEGORIZED).then_some(id)
            }
        };
        let search = params.search.filter(|s| !s.is_empty());

        Ok(Self { category_id, search })
    }
}

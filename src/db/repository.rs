use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteExecutor, SqlitePool};

use crate::models::{
    self, Category, NewCategoryRequest, NewTodoRequest, Todo, TodoFilter, UpdateTodoRequest,
};

const TODO_SELECT: &str = r#"
    SELECT
        t.id, t.title, t.description, t.completed, t.priority, t.category_id,
        t.created_at, t.updated_at,
        c.id AS cat_id,
        c.name AS cat_name,
        c.color AS cat_color,
        c.created_at AS cat_created_at,
        c.updated_at AS cat_updated_at
    FROM todos t
    LEFT JOIN categories c ON c.id = t.category_id
"#;

/// A todo joined with its (optional) category.
#[derive(Debug, FromRow)]
struct TodoRow {
    id: i64,
    title: String,
    description: Option<String>,
    completed: bool,
    priority: String,
    category_id: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    cat_id: Option<i64>,
    cat_name: Option<String>,
    cat_color: Option<String>,
    cat_created_at: Option<DateTime<Utc>>,
    cat_updated_at: Option<DateTime<Utc>>,
}

impl From<TodoRow> for Todo {
    fn from(row: TodoRow) -> Self {
        let category = match (row.cat_id, row.cat_created_at, row.cat_updated_at) {
            (Some(id), Some(created_at), Some(updated_at)) => Some(Category {
                id,
                name: row.cat_name.unwrap_or_default(),
                color: row.cat_color.unwrap_or_default(),
                created_at,
                updated_at,
            }),
            _ => None,
        };

        Todo {
            id: row.id,
            title: row.title,
            description: row.description,
            completed: row.completed,
            priority: row.priority,
            category_id: row.category_id,
            category,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Fixed-width UTC text, so `ORDER BY created_at` is chronological.
fn stamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Unicode-aware, case-insensitive substring match against an already
/// lowercased `needle`. SQLite's `LOWER` and `LIKE` only fold ASCII, so the
/// search filter runs here.
fn title_contains(title: &str, needle: &str) -> bool {
    title.to_lowercase().contains(needle)
}

pub async fn fetch_categories(db: &SqlitePool) -> Result<Vec<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(
        "SELECT id, name, color, created_at, updated_at FROM categories ORDER BY id",
    )
    .fetch_all(db)
    .await
}

pub async fn find_category_by_id<'e, E>(db: E, id: i64) -> Result<Option<Category>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Category>(
        "SELECT id, name, color, created_at, updated_at FROM categories WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn category_exists<'e, E>(db: E, id: i64) -> Result<bool, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let (exists,): (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM categories WHERE id = ?)")
            .bind(id)
            .fetch_one(db)
            .await?;
    Ok(exists)
}

pub async fn insert_category(
    db: &SqlitePool,
    req: NewCategoryRequest,
) -> Result<Category, sqlx::Error> {
    let now = models::now();

    let id = sqlx::query(
        r#"
        INSERT INTO categories (name, color, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?3)
        "#,
    )
    .bind(&req.name)
    .bind(&req.color)
    .bind(stamp(&now))
    .execute(db)
    .await?
    .last_insert_rowid();

    Ok(Category {
        id,
        name: req.name,
        color: req.color,
        created_at: now,
        updated_at: now,
    })
}

/// Points every todo of `category_id` at the sentinel. Returns how many
/// todos were detached.
pub async fn detach_todos<'e, E>(db: E, category_id: i64) -> Result<u64, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE todos
        SET category_id = ?1,
            updated_at = ?2
        WHERE category_id = ?3
        "#,
    )
    .bind(models::UNCATEGORIZED)
    .bind(stamp(&models::now()))
    .bind(category_id)
    .execute(db)
    .await?;

    Ok(result.rows_affected())
}

pub async fn delete_category<'e, E>(db: E, id: i64) -> Result<bool, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

/// Todos matching `filter`, newest first, each with its category attached.
pub async fn fetch_todos(db: &SqlitePool, filter: &TodoFilter) -> Result<Vec<Todo>, sqlx::Error> {
    let mut query = QueryBuilder::<Sqlite>::new(TODO_SELECT);
    query.push(" WHERE 1 = 1");

    if let Some(category_id) = filter.category_id {
        query.push(" AND t.category_id = ").push_bind(category_id);
    }
    query.push(" ORDER BY t.created_at DESC, t.id ASC");

    let rows: Vec<TodoRow> = query.build_query_as().fetch_all(db).await?;
    let needle = filter.search.as_deref().map(str::to_lowercase);

    Ok(rows
        .into_iter()
        .filter(|row| match &needle {
            Some(needle) => title_contains(&row.title, needle),
            None => true,
        })
        .map(Todo::from)
        .collect())
}

pub async fn find_todo_by_id<'e, E>(db: E, id: i64) -> Result<Option<Todo>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("{TODO_SELECT} WHERE t.id = ?");
    let row: Option<TodoRow> = sqlx::query_as(&sql).bind(id).fetch_optional(db).await?;
    Ok(row.map(Todo::from))
}

pub async fn todo_exists<'e, E>(db: E, id: i64) -> Result<bool, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM todos WHERE id = ?)")
        .bind(id)
        .fetch_one(db)
        .await?;
    Ok(exists)
}

/// Stores a new todo. The returned record has no category attached.
pub async fn insert_todo<'e, E>(db: E, req: NewTodoRequest) -> Result<Todo, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = models::now();
    let completed = req.completed.unwrap_or(false);
    let category_id = req.category_id();

    let id = sqlx::query(
        r#"
        INSERT INTO todos
            (title, description, completed, priority, category_id, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
        "#,
    )
    .bind(&req.title)
    .bind(&req.description)
    .bind(completed)
    .bind(&req.priority)
    .bind(category_id)
    .bind(stamp(&now))
    .execute(db)
    .await?
    .last_insert_rowid();

    Ok(Todo {
        id,
        title: req.title,
        description: req.description,
        completed,
        priority: req.priority,
        category_id,
        category: None,
        created_at: now,
        updated_at: now,
    })
}

/// Writes only the fields present in `changes`, always bumping
/// `updated_at`. Returns false when no todo has that id.
pub async fn update_todo<'e, E>(
    db: E,
    id: i64,
    changes: &UpdateTodoRequest,
) -> Result<bool, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let mut query = QueryBuilder::<Sqlite>::new("UPDATE todos SET ");
    let mut set = query.separated(", ");

    if let Some(title) = &changes.title {
        set.push("title = ").push_bind_unseparated(title.clone());
    }
    if let Some(description) = &changes.description {
        set.push("description = ")
            .push_bind_unseparated(description.clone());
    }
    if let Some(completed) = changes.completed {
        set.push("completed = ").push_bind_unseparated(completed);
    }
    if let Some(priority) = &changes.priority {
        set.push("priority = ").push_bind_unseparated(priority.clone());
    }
    if let Some(category_id) = changes.category_id() {
        set.push("category_id = ").push_bind_unseparated(category_id);
    }
    set.push("updated_at = ")
        .push_bind_unseparated(stamp(&models::now()));

    query.push(" WHERE id = ").push_bind(id);

    let result = query.build().execute(db).await?.rows_affected();
    Ok(result > 0)
}

pub async fn delete_todo(db: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM todos WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;

    async fn setup_test_db() -> SqlitePool {
        connect_in_memory()
            .await
            .expect("Failed to create test db")
    }

    fn todo_req(title: &str, category_id: i64) -> NewTodoRequest {
        NewTodoRequest {
            title: title.to_string(),
            category_id: Some(category_id),
            ..Default::default()
        }
    }

    async fn insert_todo_at(pool: &SqlitePool, title: &str, created_at: &str) -> i64 {
        sqlx::query(
            "INSERT INTO todos (title, created_at, updated_at) VALUES (?1, ?2, ?2)",
        )
        .bind(title)
        .bind(created_at)
        .execute(pool)
        .await
        .expect("Failed to insert todo")
        .last_insert_rowid()
    }

    #[test]
    fn title_contains_folds_unicode_case() {
        assert!(title_contains("ÄPFEL kaufen", "äpfel"));
        assert!(title_contains("xxABCxx", "abc"));
        assert!(!title_contains("xyz", "abc"));
    }

    #[test]
    fn stamp_is_fixed_width() {
        let whole = DateTime::parse_from_rfc3339("2026-01-10T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(stamp(&whole), "2026-01-10T08:00:00.000000Z");
    }

    #[tokio::test]
    async fn test_insert_and_fetch_category() {
        let pool = setup_test_db().await;

        let req = NewCategoryRequest {
            name: "Work".to_string(),
            color: "#fff".to_string(),
        };
        let category = insert_category(&pool, req)
            .await
            .expect("Failed to insert category");
        assert_eq!(category.id, 1);
        assert_eq!(category.created_at, category.updated_at);

        let categories = fetch_categories(&pool)
            .await
            .expect("Failed to fetch categories");
        assert_eq!(categories, vec![category.clone()]);

        let found = find_category_by_id(&pool, category.id)
            .await
            .expect("Failed to find category");
        assert_eq!(found, Some(category));
    }

    #[tokio::test]
    async fn test_insert_todo_defaults() {
        let pool = setup_test_db().await;

        let todo = insert_todo(&pool, todo_req("Write spec", 0))
            .await
            .expect("Failed to insert todo");
        assert!(!todo.completed);
        assert_eq!(todo.category_id, 0);
        assert!(todo.category.is_none());

        let stored = find_todo_by_id(&pool, todo.id)
            .await
            .expect("Failed to find todo")
            .expect("Todo not found");
        assert_eq!(stored, todo);
    }

    #[tokio::test]
    async fn test_find_todo_attaches_category() {
        let pool = setup_test_db().await;

        let category = insert_category(
            &pool,
            NewCategoryRequest {
                name: "Home".to_string(),
                color: "green".to_string(),
            },
        )
        .await
        .expect("Failed to insert category");
        let todo = insert_todo(&pool, todo_req("Dishes", category.id))
            .await
            .expect("Failed to insert todo");

        let stored = find_todo_by_id(&pool, todo.id)
            .await
            .expect("Failed to find todo")
            .expect("Todo not found");
        assert_eq!(stored.category, Some(category));
    }

    #[tokio::test]
    async fn test_fetch_todos_orders_newest_first() {
        let pool = setup_test_db().await;

        let old = insert_todo_at(&pool, "old", "2026-01-01T00:00:00.000000Z").await;
        let tie_a = insert_todo_at(&pool, "tie a", "2026-01-02T00:00:00.000000Z").await;
        let tie_b = insert_todo_at(&pool, "tie b", "2026-01-02T00:00:00.000000Z").await;
        let new = insert_todo_at(&pool, "new", "2026-01-03T00:00:00.000000Z").await;

        let ids: Vec<i64> = fetch_todos(&pool, &TodoFilter::default())
            .await
            .expect("Failed to fetch todos")
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![new, tie_a, tie_b, old]);
    }

    #[tokio::test]
    async fn test_fetch_todos_search_is_case_insensitive_substring() {
        let pool = setup_test_db().await;

        for title in ["ABCdef", "xxabcxx", "xyz", "a%c"] {
            insert_todo(&pool, todo_req(title, 0))
                .await
                .expect("Failed to insert todo");
        }

        let search = |s: &str| TodoFilter {
            category_id: None,
            search: Some(s.to_string()),
        };

        let mut titles: Vec<String> = fetch_todos(&pool, &search("abc"))
            .await
            .expect("Failed to fetch todos")
            .into_iter()
            .map(|t| t.title)
            .collect();
        titles.sort();
        assert_eq!(titles, vec!["ABCdef", "xxabcxx"]);

        // `%` is matched literally, not as a wildcard.
        let literal = fetch_todos(&pool, &search("a%c"))
            .await
            .expect("Failed to fetch todos");
        assert_eq!(literal.len(), 1);
        assert_eq!(literal[0].title, "a%c");
    }

    #[tokio::test]
    async fn test_fetch_todos_search_folds_non_ascii_case() {
        let pool = setup_test_db().await;

        for title in ["ÄPFEL kaufen", "Birnen kaufen"] {
            insert_todo(&pool, todo_req(title, 0))
                .await
                .expect("Failed to insert todo");
        }

        let filter = TodoFilter {
            category_id: None,
            search: Some("äpfel".to_string()),
        };
        let hits = fetch_todos(&pool, &filter)
            .await
            .expect("Failed to fetch todos");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "ÄPFEL kaufen");
    }

    #[tokio::test]
    async fn test_detach_then_delete_category() {
        let pool = setup_test_db().await;

        let category = insert_category(&pool, NewCategoryRequest::default())
            .await
            .expect("Failed to insert category");
        for title in ["one", "two"] {
            insert_todo(&pool, todo_req(title, category.id))
                .await
                .expect("Failed to insert todo");
        }
        insert_todo(&pool, todo_req("other", 0))
            .await
            .expect("Failed to insert todo");

        let detached = detach_todos(&pool, category.id)
            .await
            .expect("Failed to detach todos");
        assert_eq!(detached, 2);

        assert!(delete_category(&pool, category.id).await.unwrap());
        assert!(!delete_category(&pool, category.id).await.unwrap());
        assert!(!category_exists(&pool, category.id).await.unwrap());
        assert!(find_category_by_id(&pool, category.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_todo_writes_only_present_fields() {
        let pool = setup_test_db().await;

        let todo = insert_todo(
            &pool,
            NewTodoRequest {
                title: "Draft".to_string(),
                description: Some("first pass".to_string()),
                priority: "high".to_string(),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to insert todo");

        let changes = UpdateTodoRequest {
            completed: Some(true),
            description: Some(None),
            ..Default::default()
        };
        assert!(update_todo(&pool, todo.id, &changes).await.unwrap());

        let updated = find_todo_by_id(&pool, todo.id)
            .await
            .unwrap()
            .expect("Todo not found");
        assert!(updated.completed);
        assert_eq!(updated.description, None);
        assert_eq!(updated.title, "Draft");
        assert_eq!(updated.priority, "high");
        assert_eq!(updated.created_at, todo.created_at);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_todo() {
        let pool = setup_test_db().await;

        let changes = UpdateTodoRequest {
            title: Some("ghost".to_string()),
            ..Default::default()
        };
        assert!(!update_todo(&pool, 42, &changes).await.unwrap());
        assert!(!delete_todo(&pool, 42).await.unwrap());
        assert!(!todo_exists(&pool, 42).await.unwrap());
    }
}

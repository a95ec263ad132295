pub mod category_service;
pub mod todo_service;

pub use category_service::CategoryService;
pub use todo_service::TodoService;

pub mod parser;
pub mod task;

pub use task::{TaskEntity, delete_task, is_valid_task_id, load_all_tasks, load_task, save_task};

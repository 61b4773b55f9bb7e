//! 任务存储：异步、可观察的仓库接口
//!
//! 表单只依赖 [`TaskRepository`]，应用使用基于 markdown 目录的
//! [`FileTaskRepository`]。

mod file;
#[cfg(test)]
pub mod memory;
mod watchers;

pub use file::FileTaskRepository;
pub use watchers::TaskWatchers;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::models::Task;

/// 某个任务 id 的最新存储值，流不会结束
pub type TaskStream = BoxStream<'static, Option<Task>>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("task not found: {0}")]
    NotFound(String),

    #[error("invalid task id: {0:?}")]
    InvalidId(String),

    #[error("storage error: {0}")]
    Persistence(String),
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Observe one task. Emits the current value right away, then on every
    /// change; `None` while no task with this id is stored. Only the newest
    /// value is kept for a slow consumer.
    fn observe_by_id(&self, id: &str) -> TaskStream;

    /// 按 `task.id` 插入或替换
    async fn save(&self, task: Task) -> Result<(), RepositoryError>;

    /// 删除任务，不存在时返回 `NotFound`
    async fn delete_by_id(&self, id: &str) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Task>, RepositoryError>;

    /// 全部任务：有截止日期的按日期排在前面，其余按标题
    async fn find_all(&self) -> Result<Vec<Task>, RepositoryError>;
}

pub(crate) fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        let due = match (a.due_date, b.due_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        };
        due.then_with(|| a.title.cmp(&b.title))
            .then_with(|| a.id.cmp(&b.id))
    });
}

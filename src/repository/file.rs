use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use super::{RepositoryError, TaskRepository, TaskStream, TaskWatchers, sort_tasks};
use crate::fs::{self, TaskEntity};
use crate::models::Task;

/// Markdown 文件仓库：每个任务一个 `<id>.md`，都放在同一个目录
pub struct FileTaskRepository {
    tasks_dir: Arc<PathBuf>,
    watchers: TaskWatchers,
}

impl FileTaskRepository {
    /// 打开任务目录，不存在时创建
    pub fn open(tasks_dir: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let tasks_dir = tasks_dir.into();
        std::fs::create_dir_all(&tasks_dir).map_err(|e| {
            RepositoryError::Persistence(format!("{}: {}", tasks_dir.display(), e))
        })?;

        tracing::debug!(dir = %tasks_dir.display(), "opened task store");

        Ok(Self {
            tasks_dir: Arc::new(tasks_dir),
            watchers: TaskWatchers::new(),
        })
    }

    pub fn tasks_dir(&self) -> &Path {
        &self.tasks_dir
    }

    /// 阻塞的文件 I/O 放到 blocking 线程池执行
    async fn blocking<T, F>(&self, op: F) -> Result<T, RepositoryError>
    where
        T: Send + 'static,
        F: FnOnce(&Path) -> Result<T, RepositoryError> + Send + 'static,
    {
        let dir = Arc::clone(&self.tasks_dir);
        tokio::task::spawn_blocking(move || op(dir.as_path()))
            .await
            .map_err(|e| RepositoryError::Persistence(e.to_string()))?
    }
}

fn check_id(id: &str) -> Result<(), RepositoryError> {
    if fs::is_valid_task_id(id) {
        Ok(())
    } else {
        Err(RepositoryError::InvalidId(id.to_string()))
    }
}

#[async_trait]
impl TaskRepository for FileTaskRepository {
    fn observe_by_id(&self, id: &str) -> TaskStream {
        let tasks_dir = Arc::clone(&self.tasks_dir);
        self.watchers.observe(id, || {
            if !fs::is_valid_task_id(id) {
                tracing::warn!(id, "observing an invalid task id");
                return None;
            }
            match fs::load_task(&tasks_dir, id) {
                Ok(entity) => entity.map(Task::from),
                Err(e) => {
                    tracing::warn!(id, error = %e, "failed to load observed task");
                    None
                }
            }
        })
    }

    async fn save(&self, task: Task) -> Result<(), RepositoryError> {
        check_id(&task.id)?;

        let id = task.id.clone();
        let stored = self
            .blocking(move |dir| {
                // 旧文件读不出来时直接覆盖
                let existing = fs::load_task(dir, &task.id).unwrap_or_else(|e| {
                    tracing::warn!(id = %task.id, error = %e, "overwriting unreadable task file");
                    None
                });
                let entity = TaskEntity::from_task(task, existing.as_ref(), Utc::now().timestamp());
                fs::save_task(dir, &entity).map_err(RepositoryError::Persistence)?;
                Ok(Task::from(entity))
            })
            .await?;

        tracing::info!(id = %id, "task saved");
        // 观察者拿到的是实际写入的内容
        self.watchers.publish(&id, Some(stored));
        Ok(())
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), RepositoryError> {
        check_id(id)?;

        let owned = id.to_string();
        let removed = self
            .blocking(move |dir| fs::delete_task(dir, &owned).map_err(RepositoryError::Persistence))
            .await?;

        if !removed {
            return Err(RepositoryError::NotFound(id.to_string()));
        }

        tracing::info!(id, "task deleted");
        self.watchers.publish(id, None);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Task>, RepositoryError> {
        check_id(id)?;

        let owned = id.to_string();
        self.blocking(move |dir| {
            fs::load_task(dir, &owned)
                .map(|entity| entity.map(Task::from))
                .map_err(RepositoryError::Persistence)
        })
        .await
    }

    async fn find_all(&self) -> Result<Vec<Task>, RepositoryError> {
        let mut tasks: Vec<Task> = self
            .blocking(|dir| fs::load_all_tasks(dir).map_err(RepositoryError::Persistence))
            .await?
            .into_iter()
            .map(Task::from)
            .collect();

        sort_tasks(&mut tasks);
        Ok(tasks)
    }
}

//! 测试用的内存仓库，可以模拟写入失败和慢写入

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use super::{RepositoryError, TaskRepository, TaskStream, TaskWatchers, sort_tasks};
use crate::models::Task;

#[derive(Default)]
pub struct InMemoryTaskRepository {
    tasks: Mutex<HashMap<String, Task>>,
    watchers: TaskWatchers,
    saved: Mutex<Vec<Task>>,
    deleted: Mutex<Vec<String>>,
    fail_writes: AtomicBool,
    gate: Mutex<Option<Arc<Semaphore>>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_task(task: Task) -> Self {
        let repo = Self::new();
        repo.tasks.lock().insert(task.id.clone(), task);
        repo
    }

    /// 模拟其他地方对任务的修改
    pub fn emit(&self, id: &str, task: Option<Task>) {
        match &task {
            Some(t) => {
                self.tasks.lock().insert(id.to_string(), t.clone());
            }
            None => {
                self.tasks.lock().remove(id);
            }
        }
        self.watchers.publish(id, task);
    }

    /// 之后的保存/删除都返回存储错误
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// 写入阻塞，直到返回的信号量有许可
    pub fn hold_writes(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    pub fn saved(&self) -> Vec<Task> {
        self.saved.lock().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn writes_in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    async fn enter_write(&self) -> Result<(), RepositoryError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            let _ = gate.acquire().await;
        }

        if self.fail_writes.load(Ordering::SeqCst) {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            return Err(RepositoryError::Persistence("disk is full".to_string()));
        }
        Ok(())
    }

    fn leave_write(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    fn observe_by_id(&self, id: &str) -> TaskStream {
        self.watchers.observe(id, || self.tasks.lock().get(id).cloned())
    }

    async fn save(&self, task: Task) -> Result<(), RepositoryError> {
        self.enter_write().await?;

        let id = task.id.clone();
        self.saved.lock().push(task.clone());
        self.tasks.lock().insert(id.clone(), task.clone());
        self.watchers.publish(&id, Some(task));

        self.leave_write();
        Ok(())
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), RepositoryError> {
        self.enter_write().await?;

        let removed = self.tasks.lock().remove(id);
        self.leave_write();

        match removed {
            Some(_) => {
                self.deleted.lock().push(id.to_string());
                self.watchers.publish(id, None);
                Ok(())
            }
            None => Err(RepositoryError::NotFound(id.to_string())),
        }
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Task>, RepositoryError> {
        Ok(self.tasks.lock().get(id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Task>, RepositoryError> {
        let mut tasks: Vec<Task> = self.tasks.lock().values().cloned().collect();
        sort_tasks(&mut tasks);
        Ok(tasks)
    }
}

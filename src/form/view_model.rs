//! View-model behind the task form.
//!
//! Owns the form's [`FormUiState`], folds user [`FormEvent`]s and stored task
//! updates into it, and issues save/delete calls to the repository. Every
//! mutation happens under one lock and publishes a full snapshot through a
//! `watch` channel, so readers never see a half-applied update.

use std::future::Future;
use std::sync::Arc;

use futures::StreamExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::event::FormEvent;
use super::state::{EDITING_TITLE, FormUiState};
use crate::models::Task;
use crate::repository::{RepositoryError, TaskRepository};
use crate::utils::format_due_date;

/// What happens when the stored task changes while the form is open
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum LateEmissionPolicy {
    /// Fields the user already edited keep the user's text
    #[default]
    KeepEdits,
    /// Every update replaces title, description and due date
    Overwrite,
}

struct FormModel {
    ui: FormUiState,
    /// Raw value behind `ui.due_date`
    due_date: Option<i64>,
    /// Id for a task that has never been stored, reused on retries
    generated_id: Option<String>,
    title_edited: bool,
    description_edited: bool,
    due_date_edited: bool,
    closed: bool,
}

impl FormModel {
    fn accepts_changes(&self) -> bool {
        !self.closed && !self.ui.is_saved_or_deleted
    }
}

struct Shared {
    repository: Arc<dyn TaskRepository>,
    task_id: Option<String>,
    policy: LateEmissionPolicy,
    model: Mutex<FormModel>,
    ui_tx: watch::Sender<FormUiState>,
}

impl Shared {
    /// Apply `change` and publish the result. No-op once the form is finished
    /// or torn down.
    fn update(&self, change: impl FnOnce(&mut FormModel)) -> bool {
        let mut model = self.model.lock();
        if !model.accepts_changes() {
            return false;
        }
        change(&mut *model);
        self.ui_tx.send_replace(model.ui.clone());
        true
    }

    fn apply_stored(&self, task: Task) {
        let overwrite = self.policy == LateEmissionPolicy::Overwrite;
        let applied = self.update(|m| {
            m.ui.top_app_bar_title = EDITING_TITLE.to_string();
            m.ui.is_delete_enabled = true;
            if overwrite || !m.title_edited {
                m.ui.title = task.title;
            }
            if overwrite || !m.description_edited {
                m.ui.description = task.description.unwrap_or_default();
            }
            if overwrite || !m.due_date_edited {
                m.due_date = task.due_date;
                m.ui.due_date = format_due_date(task.due_date);
            }
        });
        if !applied {
            debug!(id = %task.id, "ignoring stored task update for a finished form");
        }
    }

    /// Flag a save/delete as running. `None` when the form is finished or
    /// another operation is still in flight.
    fn begin_operation<T>(
        &self,
        kind: &'static str,
        prepare: impl FnOnce(&mut FormModel) -> T,
    ) -> Option<T> {
        let mut model = self.model.lock();
        if !model.accepts_changes() {
            debug!(kind, "form already finished; dropping request");
            return None;
        }
        if model.ui.is_processing {
            debug!(kind, "another operation is in flight; dropping request");
            return None;
        }

        model.ui.is_processing = true;
        model.ui.error = None;
        let prepared = prepare(&mut *model);
        self.ui_tx.send_replace(model.ui.clone());
        Some(prepared)
    }

    fn finish_operation(&self, kind: &'static str, result: Result<(), RepositoryError>) {
        let mut model = self.model.lock();
        if model.closed {
            return;
        }

        model.ui.is_processing = false;
        match result {
            Ok(()) => {
                info!(kind, "task form operation completed");
                model.ui.is_saved_or_deleted = true;
            }
            Err(e) => {
                warn!(kind, error = %e, "task form operation failed");
                model.ui.error = Some(format!("Could not {} the task: {}", kind, e));
            }
        }
        self.ui_tx.send_replace(model.ui.clone());
    }
}

/// View-model for one open task form.
///
/// Created by the screen that shows the form and closed with [`close`]
/// (or by dropping it), which stops the stored-task subscription and abandons
/// any save/delete still running.
///
/// [`close`]: TaskFormViewModel::close
pub struct TaskFormViewModel {
    shared: Arc<Shared>,
    runtime: Handle,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskFormViewModel {
    /// `task_id` is `None` for a new task. Background work runs on `runtime`.
    pub fn new(
        repository: Arc<dyn TaskRepository>,
        task_id: Option<String>,
        policy: LateEmissionPolicy,
        runtime: Handle,
    ) -> Self {
        let (ui_tx, _) = watch::channel(FormUiState::default());
        let model = FormModel {
            ui: FormUiState::default(),
            due_date: None,
            generated_id: None,
            title_edited: false,
            description_edited: false,
            due_date_edited: false,
            closed: false,
        };

        let view_model = Self {
            shared: Arc::new(Shared {
                repository,
                task_id,
                policy,
                model: Mutex::new(model),
                ui_tx,
            }),
            runtime,
            tasks: Mutex::new(Vec::new()),
        };

        if let Some(id) = view_model.shared.task_id.clone() {
            view_model.observe_stored_task(id);
        }

        view_model
    }

    pub fn task_id(&self) -> Option<&str> {
        self.shared.task_id.as_deref()
    }

    /// Receiver for the state stream; starts at the current snapshot
    pub fn ui_state(&self) -> watch::Receiver<FormUiState> {
        self.shared.ui_tx.subscribe()
    }

    pub fn snapshot(&self) -> FormUiState {
        self.shared.ui_tx.borrow().clone()
    }

    pub fn on_event(&self, event: FormEvent) {
        match event {
            FormEvent::TitleChanged(title) => {
                self.shared.update(|m| {
                    m.ui.title = title;
                    m.title_edited = true;
                });
            }
            FormEvent::DescriptionChanged(description) => {
                self.shared.update(|m| {
                    m.ui.description = description;
                    m.description_edited = true;
                });
            }
            FormEvent::DueDateChanged(due_date) => {
                self.shared.update(|m| {
                    m.due_date = due_date;
                    m.ui.due_date = format_due_date(due_date);
                    m.due_date_edited = true;
                });
            }
            FormEvent::Save => self.save(),
            FormEvent::Delete => self.delete(),
        }
    }

    /// Tear down: no state changes after this returns
    pub fn close(&self) {
        {
            let mut model = self.shared.model.lock();
            if model.closed {
                return;
            }
            model.closed = true;
        }

        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        debug!(id = ?self.shared.task_id, "task form closed");
    }

    fn observe_stored_task(&self, id: String) {
        let mut stored = self.shared.repository.observe_by_id(&id);
        let shared = Arc::clone(&self.shared);

        self.spawn(async move {
            while let Some(task) = stored.next().await {
                match task {
                    Some(task) => shared.apply_stored(task),
                    // 还没保存过：表单继续按新建处理
                    None => debug!(id = %id, "no stored task for id"),
                }
            }
        });
    }

    fn save(&self) {
        let task_id = self.shared.task_id.clone();
        let Some(task) = self.shared.begin_operation("save", |m| Task {
            id: task_id
                .unwrap_or_else(|| m.generated_id.get_or_insert_with(Task::generate_id).clone()),
            title: m.ui.title.clone(),
            description: Some(m.ui.description.clone()).filter(|d| !d.is_empty()),
            due_date: m.due_date,
        }) else {
            return;
        };

        debug!(id = %task.id, "saving task");
        let shared = Arc::clone(&self.shared);
        self.spawn(async move {
            let result = shared.repository.save(task).await;
            shared.finish_operation("save", result);
        });
    }

    fn delete(&self) {
        let Some(id) = self.shared.task_id.clone() else {
            // 没有可删除的任务，界面在这种模式下不提供删除
            debug!("delete requested for an unsaved task; ignoring");
            return;
        };
        if self.shared.begin_operation("delete", |_| ()).is_none() {
            return;
        }

        debug!(id = %id, "deleting task");
        let shared = Arc::clone(&self.shared);
        self.spawn(async move {
            let result = shared.repository.delete_by_id(&id).await;
            shared.finish_operation("delete", result);
        });
    }

    fn spawn(&self, future: impl Future<Output = ()> + Send + 'static) {
        let mut tasks = self.tasks.lock();
        tasks.retain(|task| !task.is_finished());
        tasks.push(self.runtime.spawn(future));
    }
}

impl Drop for TaskFormViewModel {
    fn drop(&mut self) {
        self.close();
    }
}
